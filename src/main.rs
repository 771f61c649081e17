// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::application::dashboard_service::DashboardService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::headless_host::HeadlessHost;
use crate::infrastructure::http_fetcher::HttpFetcher;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    column_range, column_values, delete_chart, get_chart, get_dashboard, get_status, health_check,
    list_columns, list_elements, load_dashboard, post_chart, post_numeric_filter, put_dashboard,
    put_fill, put_filter, put_filter_value, put_table, put_view, save_dashboard, select_chart_row,
    view_data,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = load_app_config()?;

    // Create collaborators (infrastructure layer)
    let host = Arc::new(HeadlessHost::new());
    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(
        config.loader.request_timeout_secs,
    ))?);

    // Create services (application layer)
    let dashboard_service =
        DashboardService::new(host.clone(), fetcher).with_listener(host.clone());

    if let Some(url) = &config.loader.initial_dashboard {
        let result = dashboard_service.load_from_url(url).await;
        match result.message {
            None => tracing::info!("Loaded initial dashboard from {}", url),
            Some(message) => tracing::warn!("Starting with an empty dashboard: {}", message),
        }
    }

    // Create application state
    let state = Arc::new(AppState {
        dashboard_service,
        host,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(get_status))
        .route("/dashboard", get(get_dashboard).put(put_dashboard))
        .route("/dashboard/fill", put(put_fill))
        .route("/dashboard/save", post(save_dashboard))
        .route("/dashboard/load", post(load_dashboard))
        .route("/elements", get(list_elements))
        .route("/columns", get(list_columns))
        .route("/tables/:name", put(put_table))
        .route("/tables/:table/columns/:column/values", get(column_values))
        .route("/tables/:table/columns/:column/range", get(column_range))
        .route("/views/:name", put(put_view))
        .route("/views/:name/data", get(view_data))
        .route("/filters/:name", put(put_filter))
        .route("/filters/:name/value", put(put_filter_value))
        .route("/filters/:name/slider", post(post_numeric_filter))
        .route("/charts/:name", get(get_chart).post(post_chart).delete(delete_chart))
        .route("/charts/:name/select", post(select_chart_row))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind_address.parse()?;
    tracing::info!("Starting dashboard-engine service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
