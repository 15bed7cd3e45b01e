use std::sync::Arc;
use tmgmt_connector::{InMemoryJobStore, TranslationJob};
use tmgmt_connector_web::{AppState, router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// JSON file with an array of jobs to serve
const ENV_JOBS: &str = "TMGMT_CONNECTOR_JOBS";
const ENV_LISTEN: &str = "TMGMT_CONNECTOR_LISTEN";
const DEFAULT_LISTEN: &str = "127.0.0.1:3000";

fn load_jobs() -> Result<Vec<TranslationJob>, Box<dyn std::error::Error>> {
    let Ok(path) = std::env::var(ENV_JOBS) else {
        return Ok(Vec::new());
    };
    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read {} ({}): {}", ENV_JOBS, path, e))?;
    Ok(serde_json::from_str(&content)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let jobs = load_jobs()?;
    info!("Loaded {} translation jobs", jobs.len());
    let state = AppState::new(Arc::new(InMemoryJobStore::with_jobs(jobs)));

    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = std::env::var(ENV_LISTEN).unwrap_or_else(|_| DEFAULT_LISTEN.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Translation callback server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
