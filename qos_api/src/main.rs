use qos_api::config::ServeConfig;
use qos_api::{model, router, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = ServeConfig::from_env();
    let state = AppState {
        artifact: model::load_or_unhealthy(&cfg.model_path),
        log_predictions: cfg.log_predictions,
    };
    if state.artifact.is_none() {
        tracing::warn!("serving without a model; /predict will answer 500");
    }

    let app = router(state);

    let addr = cfg.socket_addr();
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
