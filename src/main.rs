//! Severity API
//!
//! REST API and dashboard CLI for road accident severity prediction.

mod auth;
mod cli;
mod client;
mod config;
mod features;
mod history;
mod model;
mod routes;
mod storage;
mod types;

use axum::{routing::get, routing::post, Router};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::model::create_shared_model;
use crate::routes::AppState;
use crate::storage::Repository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => run_server(Some(host), Some(port)).await,
        Commands::Register {
            name,
            email,
            password,
        } => cli::run_register(name, email, password).await,
        Commands::Login { email, password } => cli::run_login(email, password).await,
        Commands::Logout => cli::run_logout().await,
        Commands::Predict { input, format } => cli::run_predict(input, format).await,
        Commands::History {
            severity,
            page,
            format,
            fixture,
        } => cli::run_history(severity, page, format, fixture).await,
        Commands::Dashboard { format, fixture } => cli::run_dashboard(format, fixture).await,
        Commands::ChangePassword {
            current,
            new,
            confirm,
        } => cli::run_change_password(current, new, confirm).await,
    }
}

/// Run the API server.
async fn run_server(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "severity_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = AppConfig::load()?;

    // Override with CLI args
    if let Some(h) = host {
        config.server.host = h;
    }
    if let Some(p) = port {
        config.server.port = p;
    }

    tracing::info!("Configuration loaded");

    // Load model
    let model = create_shared_model(config.model.weights.as_deref())?;
    match &config.model.weights {
        Some(path) => tracing::info!("Model weights loaded from: {}", path),
        None => tracing::info!("Using built-in model weights"),
    }

    // Open storage
    let repo = Repository::new(Path::new(&config.storage.db_path))?;
    tracing::info!("Database opened at: {}", config.storage.db_path);

    // Create application state
    let state = Arc::new(AppState {
        model,
        repo: Mutex::new(repo),
        config: config.clone(),
    });

    // Build router
    let app = Router::new()
        .route("/", get(routes::home))
        .route("/health", get(routes::health))
        .route("/api/register", post(routes::register))
        .route("/api/login", post(routes::login))
        .route("/api/predict", post(routes::predict))
        .route("/api/history", get(routes::history))
        .route("/api/change-password", post(routes::change_password))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
