use std::net::SocketAddr;

use anyhow::Context;

use roster_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before logging init so RUST_LOG / LOG_FORMAT may come from `.env`.
    let _ = dotenvy::dotenv();
    roster_observability::init();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return Err(e.into());
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, backend = config.backend.as_str(), "listening");

    if let Err(e) = roster_api::app::serve(config, listener).await {
        tracing::error!(error = %format!("{e:#}"), "server exited with error");
        return Err(e);
    }
    Ok(())
}
