//! Control loop wired to the real reconcile and schedule operations.

use std::time::Duration;

use podgrid_controller::reconcile_deployments;
use podgrid_persist::*;
use podgrid_scheduler::schedule_pending_pods;
use podgrid_state::*;
use tokio::sync::watch;

fn wired(backend: Box<dyn StateBackend>) -> ControlLoop {
    ControlLoop::new(
        backend,
        Box::new(|state: &ClusterState| {
            reconcile_deployments(state);
        }),
        Box::new(|state: &ClusterState| {
            schedule_pending_pods(state);
        }),
    )
}

fn seed() -> ClusterState {
    let app = Labels::from([("app".to_string(), "web".to_string())]);
    let state = ClusterState::new();
    state.add_node(Node::new("n1", 4, 4096)).unwrap();
    state
        .add_deployment(Deployment {
            name: "web".to_string(),
            image: "nginx".to_string(),
            replicas: 3,
            selector: app.clone(),
            labels: app,
            cpu_request: 1,
            mem_request: 128,
        })
        .unwrap();
    state
}

#[test]
fn iteration_converges_and_persists_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cluster.json");
    JsonFileBackend::new(&path).save(&seed()).unwrap();

    let control = wired(Box::new(JsonFileBackend::new(&path)));
    control.iterate().unwrap();

    let saved = JsonFileBackend::new(&path).load().unwrap();
    assert_eq!(saved.pods().len(), 3);
    assert!(saved.pods().iter().all(|p| p.is_running()));
    assert_eq!(saved.get_node("n1").unwrap().cpu_allocated, 3);

    // Converged state stays put on the next tick.
    control.iterate().unwrap();
    assert_eq!(JsonFileBackend::new(&path).load().unwrap().snapshot(), saved.snapshot());
}

#[test]
fn iteration_on_redb_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("podgrid.redb");
    {
        let backend = open_backend(BackendKind::Redb, &path).unwrap();
        backend.save(&seed()).unwrap();
    }

    let control = wired(open_backend(BackendKind::Redb, &path).unwrap());
    let state = control.iterate().unwrap();

    assert_eq!(state.pods().len(), 3);
    assert_eq!(control.backend().load().unwrap().snapshot(), state.snapshot());
}

#[tokio::test]
async fn run_until_shutdown_on_empty_backend() {
    let control = wired(Box::new(RedbBackend::open_in_memory().unwrap()));
    let (tx, rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let n = control.run(Duration::from_millis(5), rx).await;
        (n, control)
    });
    tokio::time::sleep(Duration::from_millis(30)).await;
    tx.send(true).unwrap();

    let (iterations, control) = task.await.unwrap();
    assert!(iterations.unwrap() >= 1);
    assert!(control.backend().load().unwrap().pods().is_empty());
}
