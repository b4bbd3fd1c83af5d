//! Application startup and lifecycle management.

use axum::{
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};
use rental_core::error::AppError;
use rental_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::billing::BillingEngine;
use crate::config::BillingConfig;
use crate::handlers;
use crate::services::{BillingStore, Database};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: BillingConfig,
    pub engine: BillingEngine,
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Connect to Postgres, run migrations and bind the HTTP listener.
    pub async fn build(config: BillingConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to database");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        Self::build_with_store(config, Arc::new(db)).await
    }

    /// Bind the HTTP listener over an already constructed store
    /// (port 0 = random port for testing).
    pub async fn build_with_store(
        config: BillingConfig,
        store: Arc<dyn BillingStore>,
    ) -> Result<Self, AppError> {
        let rules = config.billing;
        let engine = BillingEngine::new(store)
            .with_rate_resolution(rules.rate_resolution)
            .with_due_day(rules.due_day)
            .with_batch_concurrency(rules.batch_concurrency);

        let address = config.common.bind_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(address = %address, error = %e, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(
            http_port = http_port,
            rate_resolution = rules.rate_resolution.as_str(),
            due_day = rules.due_day,
            batch_concurrency = rules.batch_concurrency,
            "Rental billing service listening"
        );

        Ok(Self {
            http_port,
            listener,
            state: AppState { config, engine },
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }


    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.listener, router).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/bills/rooms/:room_id/generate",
            post(handlers::generate_bill_for_room),
        )
        .route("/bills/generate", post(handlers::generate_bills_for_rooms))
        .route(
            "/bills/generate/active",
            post(handlers::generate_bills_for_active_rooms),
        )
        .route("/bills/room", get(handlers::get_bill_by_room))
        .route("/bills/statistics", get(handlers::get_bill_statistics))
        .route(
            "/utility-rates",
            post(handlers::create_utility_rate).get(handlers::list_utility_rates),
        )
        .route(
            "/utility-rates/current/:kind",
            get(handlers::get_current_utility_rate),
        )
        .route(
            "/utility-rates/history/:kind",
            get(handlers::get_utility_rate_history),
        )
        .route(
            "/utility-rates/:rate_id",
            delete(handlers::delete_utility_rate),
        )
        .route("/meter-readings", post(handlers::record_meter_reading))
        .route(
            "/meter-readings/rooms/:room_id/latest",
            get(handlers::get_latest_meter_reading),
        )
        .layer(
            // Outermost first: the request id must exist before the trace span.
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(make_request_span::<axum::body::Body>),
                )
                .layer(from_fn(security_headers_middleware))
                .layer(from_fn(metrics_middleware)),
        )
        .with_state(state)
}
