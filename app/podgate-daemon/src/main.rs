use anyhow::{Context, Result};
use clap::Parser;
use podgate_core::{Config, VarlinkBackend};
use podgate_docker::{DockerApiServer, ServerConfig};
use std::os::fd::{FromRawFd, RawFd};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::UnixListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// First file descriptor passed by systemd socket activation.
const SD_LISTEN_FDS_START: RawFd = 3;

#[derive(Debug, Parser)]
#[command(name = "podgate")]
#[command(author, version, about, long_about = None)]
pub struct DaemonArgs {
    /// Unix socket path for the Docker API (default: /var/run/docker.sock).
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Varlink address of the Podman service.
    #[arg(long)]
    pub podman_address: Option<String>,

    /// Configuration file to load instead of the system and user files.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = DaemonArgs::parse();
    let config = load_config(&args)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(&config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    run(config).await
}

fn load_config(args: &DaemonArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };

    if let Some(socket) = &args.socket {
        config.docker.socket_path.clone_from(socket);
    }
    if let Some(address) = &args.podman_address {
        config.podman.address.clone_from(address);
    }
    Ok(config)
}

fn default_filter(level: &str) -> String {
    format!("podgate={level},podgate_core={level},podgate_docker={level},tower_http=warn")
}

async fn run(config: Config) -> Result<()> {
    info!("Starting podgate...");

    // Connects lazily; startup never waits for Podman.
    let backend = Arc::new(VarlinkBackend::new(config.podman.address.clone()));
    info!(address = %backend.address(), "Podman backend configured");

    let server = DockerApiServer::new(
        ServerConfig {
            socket_path: config.docker.socket_path.clone(),
        },
        backend,
    );

    let (listener, activated) = match activated_listener()? {
        Some(listener) => {
            info!("Using socket passed by systemd");
            (listener, true)
        }
        None => (server.bind().context("Failed to bind Docker API socket")?, false),
    };

    server
        .serve(listener, shutdown_signal())
        .await
        .context("Docker API server failed")?;

    // An inherited socket belongs to systemd.
    if !activated {
        let path = server.socket_path();
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove socket {}: {}", path.display(), e);
            }
        }
    }

    info!("podgate stopped");
    Ok(())
}

/// Adopts the first socket passed by systemd, if this process was socket
/// activated.
fn activated_listener() -> Result<Option<UnixListener>> {
    let for_us = std::env::var("LISTEN_PID")
        .ok()
        .and_then(|pid| pid.parse::<u32>().ok())
        .is_some_and(|pid| pid == std::process::id());
    let fds = std::env::var("LISTEN_FDS")
        .ok()
        .and_then(|n| n.parse::<u32>().ok())
        .unwrap_or(0);

    if !for_us || fds == 0 {
        return Ok(None);
    }
    if fds > 1 {
        warn!(fds, "Socket activation passed several sockets; using the first");
    }

    // SAFETY: systemd guarantees fd 3 is an open listening socket owned by
    // this process when LISTEN_PID matches and LISTEN_FDS >= 1.
    let std_listener =
        unsafe { std::os::unix::net::UnixListener::from_raw_fd(SD_LISTEN_FDS_START) };
    std_listener
        .set_nonblocking(true)
        .context("Failed to configure activated socket")?;
    let listener =
        UnixListener::from_std(std_listener).context("Failed to adopt activated socket")?;
    Ok(Some(listener))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_config() {
        let args = DaemonArgs::parse_from([
            "podgate",
            "--config",
            "/nonexistent/podgate.toml",
            "--socket",
            "/tmp/podgate-test.sock",
            "--podman-address",
            "unix:/tmp/io.podman",
        ]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.docker.socket_path, PathBuf::from("/tmp/podgate-test.sock"));
        assert_eq!(config.podman.address, "unix:/tmp/io.podman");
    }

    #[test]
    fn default_filter_uses_level() {
        assert!(default_filter("debug").starts_with("podgate=debug,"));
    }
}
