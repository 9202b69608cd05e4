use clap::Parser;
use shoebox_core::Config;
use state::{App, AppState};
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

mod photos;
mod settings;
mod state;

/// shoebox headless server — photo/video backup over HTTP.
#[derive(Parser)]
#[command(name = "shoebox-server")]
struct Args {
    /// Address to bind the server to.
    #[arg(long, default_value = "0.0.0.0", env = "SHOEBOX_BIND")]
    bind: String,

    /// Port for the API server.
    #[arg(long, default_value = "3001", env = "SHOEBOX_PORT")]
    port: u16,

    /// Path to the config document. Defaults to ~/.shoebox/config.json.
    #[arg(long, env = "SHOEBOX_CONFIG")]
    config_path: Option<PathBuf>,

    /// Storage root override. Takes precedence over the configured custom
    /// path without persisting it.
    #[arg(long, env = "SHOEBOX_STORAGE")]
    storage_path: Option<PathBuf>,
}

fn configure_logging() {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_target(false)
        .with_file(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() {
    configure_logging();
    let args = Args::parse();

    info!("shoebox-server starting");

    let config_path = args
        .config_path
        .unwrap_or_else(|| Config::default_config_dir().join("config.json"));
    let mut config = Config::load(config_path);
    if let Some(storage_path) = args.storage_path {
        config.custom_storage_path = Some(storage_path);
    }

    info!("Storage root: {}", config.storage_root().display());

    let app = App::from_config(config).await.unwrap_or_else(|e| {
        error!("Failed to prepare storage root: {e}");
        std::process::exit(1);
    });
    let state = AppState::new(app);

    let router = axum::Router::new()
        .route("/health", axum::routing::get(health))
        .nest("/api/photos", photos::router())
        .nest("/api/settings", settings::router())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", args.bind, args.port);
    info!("Binding to {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {addr}: {e}");
            std::process::exit(1);
        });

    info!("shoebox-server listening on http://{addr}");
    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
