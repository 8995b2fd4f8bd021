//! Command-level tests: labels, config discovery, and command output.

use std::path::PathBuf;

use podctl::commands::{self, deploy::CreateDeployment, pod::CreatePod};
use podctl::config::StateConfig;
use podctl::labels::{format_labels, labels_or_app, parse_labels};
use podctl::{OutputFormat, PodgridConfig, Session};
use podgrid_persist::BackendKind;
use podgrid_state::{ClusterState, PodPhase, PodUid, RestartPolicy};

fn cluster_with_node() -> ClusterState {
    let state = ClusterState::new();
    commands::node::add(&state, "n1", 4, 4096, "zone=a", OutputFormat::Table).unwrap();
    state
}

fn pod_args(name: &str, cpu: u64) -> CreatePod {
    CreatePod {
        name: name.to_string(),
        image: "nginx".to_string(),
        cpu,
        mem: 128,
        labels: "app=web".to_string(),
        restart_policy: RestartPolicy::Always,
        health_check: false,
    }
}

// ── Labels ─────────────────────────────────────────────────────

#[test]
fn labels_parse_and_format() {
    let labels = parse_labels(" app = web , tier=backend,,").unwrap();
    assert_eq!(labels.get("app").map(String::as_str), Some("web"));
    assert_eq!(format_labels(&labels), "app=web,tier=backend");
    assert!(parse_labels("").unwrap().is_empty());
    assert_eq!(format_labels(&parse_labels("").unwrap()), "<none>");
}

#[test]
fn labels_reject_malformed_pairs() {
    assert!(parse_labels("app").is_err());
    assert!(parse_labels("=web").is_err());
}

#[test]
fn labels_default_to_app_name() {
    let labels = labels_or_app("", "api").unwrap();
    assert_eq!(format_labels(&labels), "app=api");
    assert_eq!(format_labels(&labels_or_app("role=db", "api").unwrap()), "role=db");
}

// ── Config ─────────────────────────────────────────────────────

#[test]
fn config_discovery_prefers_explicit_then_default_file() {
    let dir = tempfile::tempdir().unwrap();

    let none = PodgridConfig::discover(None, dir.path()).unwrap();
    assert_eq!(none, PodgridConfig::default());

    std::fs::write(
        dir.path().join("podgrid.toml"),
        "[state]\nbackend = \"json\"\npath = \"cluster.json\"\n\n[control_loop]\ninterval_secs = 2\n",
    )
    .unwrap();
    let found = PodgridConfig::discover(None, dir.path()).unwrap();
    assert_eq!(found.state.backend, BackendKind::Json);
    assert_eq!(found.control_loop.interval_secs, 2);

    let explicit = dir.path().join("other.toml");
    std::fs::write(&explicit, "[log]\nfilter = \"debug\"\n").unwrap();
    let cfg = PodgridConfig::discover(Some(&explicit), dir.path()).unwrap();
    assert_eq!(cfg.log.filter, "debug");
    assert_eq!(cfg.state.backend, BackendKind::Redb);

    assert!(PodgridConfig::discover(Some(&dir.path().join("missing.toml")), dir.path()).is_err());
}

#[test]
fn flags_override_file() {
    let cfg = PodgridConfig::default().with_overrides(Some(BackendKind::Json), Some(PathBuf::from("/tmp/x.json")));
    assert_eq!(cfg.state.backend, BackendKind::Json);
    assert_eq!(cfg.state.path, PathBuf::from("/tmp/x.json"));
}

// ── Commands ───────────────────────────────────────────────────

#[test]
fn node_list_shows_usage() {
    let state = cluster_with_node();
    commands::pod::create(&state, pod_args("a", 1), OutputFormat::Table).unwrap();

    let out = commands::node::list(&state, OutputFormat::Table).unwrap();
    assert!(out.contains("NAME"));
    assert!(out.contains("1/4"));
    assert!(out.contains("zone=a"));

    assert_eq!(commands::node::list(&ClusterState::new(), OutputFormat::Table).unwrap(), "No nodes present");
}

#[test]
fn adding_node_schedules_pending_pods() {
    let state = ClusterState::new();
    state.add_pod(podgrid_state::PodSpec::new("waiting", "nginx", 1, 64));

    let out = commands::node::add(&state, "n1", 2, 1024, "", OutputFormat::Table).unwrap();

    assert_eq!(out, "Added node n1 (1 pending pods scheduled)");
    assert!(state.pods()[0].is_running());
}

#[test]
fn pod_create_reports_phase() {
    let state = cluster_with_node();
    let ok = commands::pod::create(&state, pod_args("a", 1), OutputFormat::Table).unwrap();
    assert_eq!(ok, "Created pod pod-1 -> Running");

    let too_big = commands::pod::create(&state, pod_args("b", 16), OutputFormat::Table).unwrap();
    assert!(too_big.starts_with("Created pod pod-2 -> Failed"));
}

#[test]
fn pod_lifecycle_commands() {
    let state = cluster_with_node();
    commands::pod::create(&state, pod_args("a", 1), OutputFormat::Table).unwrap();

    let health = commands::pod::health(&state, PodUid(1), OutputFormat::Table).unwrap();
    assert_eq!(health, "Pod pod-1 is healthy");

    let restarted = commands::pod::restart(&state, PodUid(1), OutputFormat::Table).unwrap();
    assert_eq!(restarted, "Restarted pod pod-1 as pod-2 -> Running (restarts: 1)");

    commands::pod::delete(&state, PodUid(2), OutputFormat::Table).unwrap();
    assert!(commands::pod::delete(&state, PodUid(2), OutputFormat::Table).is_err());
}

#[test]
fn restart_never_surfaces_policy_error() {
    let state = cluster_with_node();
    let mut args = pod_args("job", 1);
    args.restart_policy = RestartPolicy::Never;
    commands::pod::create(&state, args, OutputFormat::Table).unwrap();

    let err = commands::pod::restart(&state, PodUid(1), OutputFormat::Table).unwrap_err();
    assert!(err.to_string().contains("policy violation"));
}

#[test]
fn explain_lists_rejections() {
    let state = cluster_with_node();
    commands::node::add(&state, "small", 1, 512, "", OutputFormat::Table).unwrap();
    commands::pod::create(&state, pod_args("big", 2), OutputFormat::Table).unwrap();

    let json = commands::pod::explain(&state, PodUid(1), OutputFormat::Json).unwrap();
    let rows: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(rows[0]["node"], "n1");
    assert_eq!(rows[0]["reason"], "eligible");
    assert_eq!(rows[1]["node"], "small");
    assert_eq!(rows[1]["reason"], "insufficient resources");
    assert!(commands::pod::explain(&state, PodUid(9), OutputFormat::Table).is_err());
}

#[test]
fn deploy_and_route() {
    let state = cluster_with_node();
    let created = commands::deploy::create(
        &state,
        CreateDeployment {
            name: "web".to_string(),
            image: "nginx".to_string(),
            replicas: 2,
            cpu: 1,
            mem: 128,
            selector: String::new(),
            labels: String::new(),
        },
        OutputFormat::Table,
    )
    .unwrap();
    assert_eq!(created, "Created deployment web with 2 replicas (2 scheduled, 0 failed)");

    commands::service::create(&state, "web", "", 80, None, OutputFormat::Table).unwrap();
    let routes = commands::service::route(&state, "web", 3, OutputFormat::Table).unwrap();
    assert_eq!(routes, "Request 1 -> pod-1\nRequest 2 -> pod-2\nRequest 3 -> pod-1");

    let list = commands::deploy::list(&state, OutputFormat::Table).unwrap();
    assert!(list.contains("2/2"));

    let scaled = commands::deploy::scale(&state, "web", 1, OutputFormat::Table).unwrap();
    assert_eq!(scaled, "Scaled web to 1 replicas (+0 -1)");
    assert_eq!(state.pods().len(), 1);
}

#[test]
fn service_commands_render_json() {
    let state = cluster_with_node();
    let json = commands::service::create(&state, "db", "app=db", 5432, Some(15432), OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["virtual_ip"], "10.96.0.1");
    assert_eq!(value["target_port"], 15432);

    assert!(commands::service::route(&state, "db", 1, OutputFormat::Table).is_err());
    commands::service::delete(&state, "db", OutputFormat::Table).unwrap();
    assert_eq!(
        commands::service::list(&state, OutputFormat::Table).unwrap(),
        "No services present"
    );
}

#[test]
fn service_list_reads_without_mutating() {
    let state = cluster_with_node();
    commands::pod::create(&state, pod_args("a", 1), OutputFormat::Table).unwrap();
    commands::service::create(&state, "web", "", 80, Some(8080), OutputFormat::Table).unwrap();
    commands::pod::create(&state, pod_args("b", 1), OutputFormat::Table).unwrap();
    let before = state.snapshot();

    let out = commands::service::list(&state, OutputFormat::Table).unwrap();

    assert!(out.contains("10.96.0.1"));
    assert!(out.contains("80->8080"));
    assert!(out.contains("pod-1,pod-2"));
    assert_eq!(state.snapshot(), before);
}

#[test]
fn status_json_has_totals() {
    let state = cluster_with_node();
    commands::pod::create(&state, pod_args("a", 1), OutputFormat::Table).unwrap();
    commands::pod::create(&state, pod_args("b", 8), OutputFormat::Table).unwrap();

    let json = commands::status::show(&state, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["capacity"]["cpu_used"], 1);
    assert_eq!(value["capacity"]["cpu_total"], 4);
    assert_eq!(value["pods"]["running"], 1);
    assert_eq!(value["pods"]["failed"], 1);

    let text = commands::status::show(&state, OutputFormat::Table).unwrap();
    assert!(text.contains("CPU: 1/4, Mem: 128/4096"));
}

#[test]
fn state_save_and_load_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap.json");
    let state = cluster_with_node();
    commands::pod::create(&state, pod_args("a", 1), OutputFormat::Table).unwrap();
    commands::state::save(&state, &path).unwrap();

    let other = ClusterState::new();
    let msg = commands::state::load(&other, &path).unwrap();

    assert!(msg.ends_with("(1 nodes, 1 pods)"));
    assert_eq!(other.snapshot(), state.snapshot());
    assert!(commands::state::load(&other, &dir.path().join("nope.json")).is_err());
}

#[test]
fn session_persists_between_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let config = StateConfig {
        backend: BackendKind::Json,
        path: dir.path().join("cluster.json"),
    };

    {
        let session = Session::open(&config).unwrap();
        commands::node::add(session.state(), "n1", 2, 1024, "", OutputFormat::Table).unwrap();
        commands::pod::create(session.state(), pod_args("a", 1), OutputFormat::Table).unwrap();
        session.save().unwrap();
    }

    let session = Session::open(&config).unwrap();
    let pods = session.state().pods();
    assert_eq!(pods.len(), 1);
    assert_eq!(pods[0].status.phase, PodPhase::Running);
    assert_eq!(session.state().get_node("n1").unwrap().cpu_allocated, 1);
}

#[test]
fn demo_walkthrough() {
    let out = commands::demo::run().unwrap();

    assert!(out.contains("node-a: CPU 2/4, Mem 256/4096"));
    assert!(out.contains("node-b: CPU 1/2, Mem 128/2048"));
    assert!(out.contains("pod-2: web-2 on node-b (Running)"));
    assert!(out.contains("web: VIP 10.96.0.1, Endpoints: [pod-1, pod-2, pod-3]"));
    assert!(out.contains("Request 1 -> pod-1\nRequest 2 -> pod-2\nRequest 3 -> pod-3"));
    assert!(out.ends_with("CPU: 3/6, Mem: 384/6144"));
}
