//! Prometheus metrics for rental-billing-service.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_counter_vec, register_histogram_vec, register_int_counter_vec,
    CounterVec, Encoder, HistogramVec, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "rental_billing_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Single-room generations by outcome (`generated` or an error kind)
pub static BILLS_GENERATED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Billed amount by item type
pub static BILLED_AMOUNT_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Batch runs by scope (`rooms` or `active`)
pub static BATCH_RUNS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Error counter for alerting
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    BILLS_GENERATED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "rental_billing_bills_generated_total",
                "Single-room bill generations by outcome"
            ),
            &["outcome"]
        )
        .expect("Failed to register BILLS_GENERATED_TOTAL")
    });

    BILLED_AMOUNT_TOTAL.get_or_init(|| {
        register_counter_vec!(
            opts!(
                "rental_billing_billed_amount_total",
                "Total billed amount by item type"
            ),
            &["item_type"]
        )
        .expect("Failed to register BILLED_AMOUNT_TOTAL")
    });

    BATCH_RUNS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("rental_billing_batch_runs_total", "Batch generation runs"),
            &["scope"]
        )
        .expect("Failed to register BATCH_RUNS_TOTAL")
    });

    ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "rental_billing_errors_total",
                "Total errors by type for alerting"
            ),
            &["error_type", "operation"]
        )
        .expect("Failed to register ERRORS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_bill_generated(outcome: &str) {
    if let Some(counter) = BILLS_GENERATED_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_billed_amount(item_type: &str, amount: f64) {
    if let Some(counter) = BILLED_AMOUNT_TOTAL.get() {
        counter.with_label_values(&[item_type]).inc_by(amount.abs());
    }
}

pub fn record_batch_run(scope: &str) {
    if let Some(counter) = BATCH_RUNS_TOTAL.get() {
        counter.with_label_values(&[scope]).inc();
    }
}

/// Record an error for alerting.
pub fn record_error(error_type: &str, operation: &str) {
    if let Some(counter) = ERRORS_TOTAL.get() {
        counter.with_label_values(&[error_type, operation]).inc();
    }
}
