use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dmfs::config::Config;
use dmfs::fuse::{MountOutcome, MountSupervisor};
use dmfs::remote::{HttpRemoteStore, OwnerScope};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "dmfs")]
#[command(about = "Mount DataManager namespaces and groups as a directory tree")]
struct Cli {
    /// Mount point; overrides `fuse.mount_point` from the configuration.
    mountpoint: Option<PathBuf>,

    /// Configuration file (TOML, YAML or JSON).
    #[arg(long, env = "DMFS_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging for dmfs itself.
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Debug logging for the FUSE layer.
    #[arg(long, default_value_t = false)]
    debug_fs: bool,

    /// Log as JSON lines.
    #[arg(long, default_value_t = false)]
    log_json: bool,
}

fn init_tracing(cli: &Cli) {
    let mut default_filter = if cli.debug { "dmfs=debug" } else { "dmfs=info" }.to_string();
    if cli.debug_fs {
        default_filter.push_str(",fuser=debug");
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(mountpoint) = cli.mountpoint {
        config.fuse.mount_point = mountpoint;
    }

    tracing::info!(
        remote = %config.remote.url,
        mount_point = %config.fuse.mount_point.display(),
        "Starting dmfs"
    );

    let remote = HttpRemoteStore::new(&config.remote).context("Failed to create remote client")?;
    let naming = OwnerScope::new(&config.remote.username);
    let supervisor = MountSupervisor::new(Arc::new(config), Arc::new(remote), Arc::new(naming));

    match supervisor.mount().await {
        Ok(MountOutcome::Interrupted { unmount_attempts }) => {
            tracing::info!(unmount_attempts, "dmfs stopped");
            Ok(())
        }
        Ok(MountOutcome::ExternalUnmount) => {
            tracing::info!("dmfs stopped after an external unmount");
            Ok(())
        }
        Err(err) => {
            tracing::error!(error = %err, "dmfs failed");
            Err(err).context("Mount failed")
        }
    }
}
