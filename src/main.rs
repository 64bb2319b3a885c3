mod config;
mod convert;
mod diary;
mod periodic;
mod store;
mod task;
mod tasks;

use anyhow::Result;
use axum::Router;
use axum::routing::get_service;
use std::fs;
use std::path::PathBuf;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::tasks::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let timezone = std::env::var("TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
    config::init_timezone(&timezone);

    let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
    fs::create_dir_all(&data_dir)?;
    let state = AppState::new(&data_dir);
    println!("Data directory: {}", data_dir.display());

    fs::create_dir_all("static")?;
    let static_dir = ServeDir::new("static");

    // API routes first; everything else falls through to the UI assets
    let app = Router::new()
        .merge(tasks::router())
        .merge(diary::router())
        .with_state(state)
        .fallback_service(get_service(static_dir))
        .layer(CorsLayer::permissive());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    println!("Server running on http://localhost:{}", port);
    axum::serve(listener, app).await?;

    Ok(())
}
