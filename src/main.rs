use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use llm_chat_backend::{
    config::AppConfig,
    routes,
    services::{generator::GenerationAdapter, hf_model::HttpTextModel},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;

    let model = HttpTextModel::load(config.model.clone()).context("failed to load text model")?;
    info!(url = model.url(), "using inference endpoint");

    let generator = GenerationAdapter::new();
    generator.init(Arc::new(model))?;

    let state: SharedState = Arc::new(
        AppState::new(generator.clone(), config.generation.clone())
            .with_persist_turns(config.persist_turns),
    );

    let app = routes::create_router().with_state(Arc::clone(&state));

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "chat backend listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;

    generator.shutdown();
    Ok(())
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown requested, cancelling pending generations");
    state.begin_shutdown();
}
