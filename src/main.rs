use funlets::server::{build_router, AppState};
use funlets::{Environment, ServerError, Settings};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,funlets=debug".into()))
        .init();

    if let Err(e) = run_server().await {
        error!("CRITICAL FUNLET SERVER ERROR: {}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<(), ServerError> {
    let settings = Settings::load()?;
    let addr = settings.server.bind_addr.clone();
    let app = build_router(AppState::new(settings, Environment::from_process()));

    let listener = TcpListener::bind(&addr).await.map_err(|source| ServerError::Bind {
        addr: addr.clone(),
        source,
    })?;
    info!("Funlets listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    info!("Funlets server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
    }
}
