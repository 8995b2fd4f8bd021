use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use podctl::commands::{self, deploy::CreateDeployment, pod::CreatePod};
use podctl::{OutputFormat, PodgridConfig, Session};
use podgrid_persist::BackendKind;
use podgrid_state::{ClusterState, PodUid, RestartPolicy};

#[derive(Parser)]
#[command(
    name = "podctl",
    about = "podgrid — a miniature cluster orchestrator",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ./podgrid.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// State backend: redb or json
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    /// Path of the state file
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage nodes
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Manage pods
    Pod {
        #[command(subcommand)]
        action: PodAction,
    },
    /// Manage deployments
    Deploy {
        #[command(subcommand)]
        action: DeployAction,
    },
    /// Manage services and route requests
    Service {
        #[command(subcommand)]
        action: ServiceAction,
    },
    /// Show resource usage across the cluster
    Status,
    /// Export or import a JSON snapshot
    State {
        #[command(subcommand)]
        action: StateAction,
    },
    /// Run the reconcile/schedule loop against the state backend
    ControlLoop {
        /// Seconds between iterations (default from config)
        #[arg(long)]
        interval: Option<u64>,
        /// Run a single iteration and exit
        #[arg(long)]
        once: bool,
    },
    /// Walk through a small in-memory cluster
    Demo,
}

#[derive(Subcommand)]
enum NodeAction {
    /// Add a node; Pending pods are scheduled onto it
    Add {
        name: String,
        /// CPU capacity
        #[arg(long, default_value = "4")]
        cpu: u64,
        /// Memory capacity in MB
        #[arg(long, default_value = "4096")]
        mem: u64,
        /// Comma-separated key=value labels
        #[arg(long, default_value = "")]
        labels: String,
    },
    /// List nodes
    List,
    /// Remove a node and reschedule its pods
    Remove { name: String },
}

#[derive(Subcommand)]
enum PodAction {
    /// Create a pod and schedule it
    Create {
        name: String,
        /// Container image
        #[arg(long)]
        image: String,
        /// CPU request
        #[arg(long, default_value = "1")]
        cpu: u64,
        /// Memory request in MB
        #[arg(long, default_value = "128")]
        mem: u64,
        /// Comma-separated key=value labels
        #[arg(long, default_value = "")]
        labels: String,
        /// always, on-failure or never
        #[arg(long, default_value = "always")]
        restart_policy: RestartPolicy,
        /// Enable the default health check
        #[arg(long)]
        health_check: bool,
    },
    /// List pods
    List,
    /// Delete a pod
    Delete { uid: PodUid },
    /// Mark a Running pod healthy
    Health { uid: PodUid },
    /// Recreate a pod from its spec
    Restart { uid: PodUid },
    /// Show which nodes could host a pod and why others cannot
    Explain { uid: PodUid },
}

#[derive(Subcommand)]
enum DeployAction {
    /// Create a deployment and reconcile it
    Create {
        name: String,
        /// Container image
        #[arg(long)]
        image: String,
        /// Desired replica count
        #[arg(long, default_value = "1")]
        replicas: u32,
        /// CPU request per pod
        #[arg(long, default_value = "1")]
        cpu: u64,
        /// Memory request per pod in MB
        #[arg(long, default_value = "128")]
        mem: u64,
        /// Selector labels (default app=<name>)
        #[arg(long, default_value = "")]
        selector: String,
        /// Pod template labels (default app=<name>)
        #[arg(long, default_value = "")]
        labels: String,
    },
    /// Change the replica count and reconcile
    Scale {
        name: String,
        #[arg(long)]
        replicas: u32,
    },
    /// List deployments
    List,
}

#[derive(Subcommand)]
enum ServiceAction {
    /// Create a service over pods matching a selector
    Create {
        name: String,
        /// Selector labels (default app=<name>)
        #[arg(long, default_value = "")]
        selector: String,
        #[arg(long, default_value = "80")]
        port: u16,
        /// Defaults to --port
        #[arg(long)]
        target_port: Option<u16>,
    },
    /// List services
    List,
    /// Route requests round-robin and print the chosen pods
    Route {
        name: String,
        #[arg(long, default_value = "1")]
        count: usize,
    },
    /// Delete a service
    Delete { name: String },
}

#[derive(Subcommand)]
enum StateAction {
    /// Write the current state to a JSON file
    Save { path: PathBuf },
    /// Replace the current state with a JSON file
    Load { path: PathBuf },
}

impl Command {
    /// Whether the loaded state must be written back afterwards.
    fn mutates(&self) -> bool {
        match self {
            Command::Node { action } => !matches!(action, NodeAction::List),
            Command::Pod { action } => !matches!(action, PodAction::List | PodAction::Explain { .. }),
            Command::Deploy { action } => !matches!(action, DeployAction::List),
            // Routing advances the round-robin cursor.
            Command::Service { action } => !matches!(action, ServiceAction::List),
            Command::State { action } => matches!(action, StateAction::Load { .. }),
            Command::Status | Command::ControlLoop { .. } | Command::Demo => false,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = PodgridConfig::discover(cli.config.as_deref(), &std::env::current_dir()?)?
        .with_overrides(cli.backend, cli.state);

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.log.filter))?;
    let logs = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);
    if config.log.json {
        logs.json().init();
    } else {
        logs.init();
    }

    let output = match cli.command {
        Command::Demo => commands::demo::run()?,
        Command::ControlLoop { interval, once } => {
            commands::control_loop::run(&config, interval, once).await?
        }
        command => {
            let session = Session::open(&config.state)?;
            let text = dispatch(session.state(), &command, cli.output)?;
            if command.mutates() {
                session.save()?;
                debug!(path = %config.state.path.display(), "state saved");
            }
            text
        }
    };

    println!("{output}");
    Ok(())
}

fn dispatch(state: &ClusterState, command: &Command, format: OutputFormat) -> anyhow::Result<String> {
    match command {
        Command::Node { action } => match action {
            NodeAction::Add {
                name,
                cpu,
                mem,
                labels,
            } => commands::node::add(state, name, *cpu, *mem, labels, format),
            NodeAction::List => commands::node::list(state, format),
            NodeAction::Remove { name } => commands::node::remove(state, name, format),
        },
        Command::Pod { action } => match action {
            PodAction::Create {
                name,
                image,
                cpu,
                mem,
                labels,
                restart_policy,
                health_check,
            } => commands::pod::create(
                state,
                CreatePod {
                    name: name.clone(),
                    image: image.clone(),
                    cpu: *cpu,
                    mem: *mem,
                    labels: labels.clone(),
                    restart_policy: *restart_policy,
                    health_check: *health_check,
                },
                format,
            ),
            PodAction::List => commands::pod::list(state, format),
            PodAction::Delete { uid } => commands::pod::delete(state, *uid, format),
            PodAction::Health { uid } => commands::pod::health(state, *uid, format),
            PodAction::Restart { uid } => commands::pod::restart(state, *uid, format),
            PodAction::Explain { uid } => commands::pod::explain(state, *uid, format),
        },
        Command::Deploy { action } => match action {
            DeployAction::Create {
                name,
                image,
                replicas,
                cpu,
                mem,
                selector,
                labels,
            } => commands::deploy::create(
                state,
                CreateDeployment {
                    name: name.clone(),
                    image: image.clone(),
                    replicas: *replicas,
                    cpu: *cpu,
                    mem: *mem,
                    selector: selector.clone(),
                    labels: labels.clone(),
                },
                format,
            ),
            DeployAction::Scale { name, replicas } => commands::deploy::scale(state, name, *replicas, format),
            DeployAction::List => commands::deploy::list(state, format),
        },
        Command::Service { action } => match action {
            ServiceAction::Create {
                name,
                selector,
                port,
                target_port,
            } => commands::service::create(state, name, selector, *port, *target_port, format),
            ServiceAction::List => commands::service::list(state, format),
            ServiceAction::Route { name, count } => commands::service::route(state, name, *count, format),
            ServiceAction::Delete { name } => commands::service::delete(state, name, format),
        },
        Command::Status => commands::status::show(state, format),
        Command::State { action } => match action {
            StateAction::Save { path } => commands::state::save(state, path),
            StateAction::Load { path } => commands::state::load(state, path),
        },
        Command::ControlLoop { .. } | Command::Demo => {
            anyhow::bail!("this command does not run against a loaded session")
        }
    }
}
