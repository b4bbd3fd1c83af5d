//! Services module for rental-billing-service.

pub mod database;
pub mod metrics;
pub mod store;

pub use database::Database;
pub use metrics::{
    get_metrics, init_metrics, record_batch_run, record_bill_generated, record_billed_amount,
    record_error,
};
pub use store::{
    BillingStore, ContractStore, MeterReadingStore, OutstandingPaymentStore, UtilityRateStore,
};
