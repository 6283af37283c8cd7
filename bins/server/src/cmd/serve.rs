use std::time::Duration;

use tokio_util::sync::CancellationToken;

use broker::{BrokerConfig, Listener};

use crate::config::ServeArgs;
use crate::error::ServerError;

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("rivulet-server starting");

    // --- Load config ---
    let mut config = BrokerConfig::load(&args.config)?;
    if let Some(listen) = args.listen {
        config.listen = listen;
        config.validate()?;
    }
    tracing::info!(
        config = %args.config,
        listen = %config.listen,
        replicas = config.replicas.len(),
        "loaded config"
    );

    // --- CancellationToken for graceful shutdown ---
    let token = CancellationToken::new();

    // --- Bind listener, build store and replication ---
    let listener = Listener::bind(&config).await?;
    let mut handle = tokio::spawn(listener.run(token.clone()));
    tracing::info!("server ready");

    wait_for_shutdown().await?;
    tracing::info!("shutting down...");

    // Loops see the token on their next iteration; blocked reads are not interrupted.
    token.cancel();

    if tokio::time::timeout(Duration::from_secs(5), &mut handle).await.is_err() {
        tracing::warn!("listener did not stop in time, aborting");
        handle.abort();
    }

    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<(), ServerError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = sigterm.recv() => tracing::info!("SIGTERM received"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<(), ServerError> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
