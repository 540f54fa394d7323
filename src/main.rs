use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use ziz_backend::core::config::{port_from_env, AppConfig, AppPaths, ConfigService};
use ziz_backend::secrets::GcpSecretManager;
use ziz_backend::server;
use ziz_backend::state::{spawn_session_sweeper, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    let config_service = ConfigService::new(paths.clone());
    let (config, config_error) = match config_service.load_config() {
        Ok(config) => (config, None),
        Err(err) => {
            let mut config = AppConfig::default();
            config.paths.index_dir = paths.resolve(&config.paths.index_dir);
            config.paths.static_dir = paths.resolve(&config.paths.static_dir);
            (config, Some(err))
        }
    };
    ziz_backend::core::logging::init(&config.logging);

    if let Some(err) = config_error {
        tracing::warn!(
            "Failed to load {}: {}; using defaults",
            config_service.config_path().display(),
            err
        );
    }
    tracing::info!("Project root: {}", paths.project_root.display());

    let secrets = GcpSecretManager::new(Duration::from_secs(config.llm.request_timeout_secs));
    let state = AppState::initialize(config, &secrets).await;
    spawn_session_sweeper(state.clone());

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], port_from_env()));
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!(
        "Listening on {} (chain {})",
        addr,
        state.chain.state().label()
    );

    let app: Router = server::router(state);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
