//! CLI command definitions and dispatch.

mod container;
mod mounts;
mod pid;
mod ps;
mod stats;
mod status;
mod version;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use ctrlink_client::{CallContext, Client};
use ctrlink_core::ConnectionConfig;

/// ctrlink - query a containerd daemon over its Unix socket.
#[derive(Parser)]
#[command(name = "ctrlink", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// containerd API socket
    #[arg(long = "containerd", env = "CONTAINERD_ADDRESS", global = true)]
    pub address: Option<PathBuf>,

    /// Namespace every call is scoped to
    #[arg(long = "containerd-namespace", env = "CONTAINERD_NAMESPACE", global = true)]
    pub namespace: Option<String>,

    /// Connect timeout in milliseconds
    #[arg(long, global = true)]
    pub connect_timeout_ms: Option<u64>,

    /// Connection settings file (JSON or YAML); flags take precedence
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Deadline for each call in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,
}

impl ConnectionArgs {
    /// Build connection parameters from the config file and flags.
    pub fn resolve(&self) -> ctrlink_core::Result<ConnectionConfig> {
        let mut config = match &self.config {
            Some(path) => ConnectionConfig::from_file(path)?,
            None => ConnectionConfig::default(),
        };

        if let Some(address) = &self.address {
            config.address = address.clone();
        }
        if let Some(namespace) = &self.namespace {
            config.namespace = namespace.clone();
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }

    /// Call context carrying the per-call deadline, cancelled on Ctrl-C.
    pub fn context(&self) -> CallContext {
        let token = CancellationToken::new();
        let on_signal = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("Interrupted, cancelling in-flight call");
                on_signal.cancel();
            }
        });

        let ctx = CallContext::background().with_cancellation(token);
        match self.timeout_ms {
            Some(ms) => ctx.with_timeout(Duration::from_millis(ms)),
            None => ctx,
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Show client and daemon versions
    Version(version::VersionArgs),
    /// Show a container's metadata as JSON
    Container(container::ContainerArgs),
    /// Print the pid of a container's task
    Pid(pid::PidArgs),
    /// Show the mounts of a snapshot as JSON
    Mounts(mounts::MountsArgs),
    /// Show CRI container status as JSON
    Status(status::StatusArgs),
    /// Show CRI container stats as JSON
    Stats(stats::StatsArgs),
    /// List containers in the namespace
    Ps(ps::PsArgs),
}

/// Obtain the process-wide client for the resolved connection.
pub(crate) async fn connect(
    args: &ConnectionArgs,
) -> Result<Arc<Client>, Box<dyn std::error::Error>> {
    let config = args.resolve()?;
    tracing::debug!(
        socket = %config.address.display(),
        namespace = %config.namespace,
        "Connecting to containerd"
    );
    Ok(ctrlink_client::client_with_config(&config).await?)
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let Cli { connection, command } = cli;
    match command {
        Command::Version(args) => version::execute(args, &connection).await,
        Command::Container(args) => container::execute(args, &connection).await,
        Command::Pid(args) => pid::execute(args, &connection).await,
        Command::Mounts(args) => mounts::execute(args, &connection).await,
        Command::Status(args) => status::execute(args, &connection).await,
        Command::Stats(args) => stats::execute(args, &connection).await,
        Command::Ps(args) => ps::execute(args, &connection).await,
    }
}
