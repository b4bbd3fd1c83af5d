//! Domain models for rental-billing-service.

mod bill;
mod contract;
mod meter_reading;
mod outstanding_payment;
mod utility_rate;

pub use bill::{
    BatchBillError, BatchBillResult, BatchSummary, BillItem, BillItemType, BillLookup,
    BillStatistics, GeneratedBill, MonthlyBill, MonthlyBillStatistics,
};
pub use contract::{ActiveContract, Contract, ContractStatus};
pub use meter_reading::{MeterReading, RecordMeterReading};
pub use outstanding_payment::{
    CreateOutstandingPayment, OutstandingPayment, OutstandingPaymentDetail, PaymentStatus,
};
pub use utility_rate::{CreateUtilityRate, UtilityKind, UtilityRate};
