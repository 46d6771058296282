pub mod api;
pub mod models;
pub mod services;

use std::sync::Arc;

use common::Result;
use common::config::Settings;
use services::{PgReportingStore, ReportingService};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Serves the reporting API over the warehouse until ctrl-c.
pub async fn run_reporting_api(settings: &Settings) -> Result<()> {
    let pool = etl::utils::pool::connect("warehouse", &settings.warehouse).await?;
    let store = Arc::new(PgReportingStore::new(pool));
    let service = Arc::new(ReportingService::new(store.clone(), &settings.api));

    let api_router = api::routes(service);

    let addr = format!("{}:{}", settings.api.host, settings.api.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        %addr,
        max_page_size = settings.api.max_page_size,
        "Reporting API listening"
    );

    let served = axum::serve(listener, api_router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    store.close().await;
    info!("Reporting API stopped");
    Ok(served?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for ctrl-c; shutting down");
    }
}
