//! Persistence seams used by the billing engine.
//!
//! [`Database`](super::Database) implements them over Postgres; tests plug in
//! an in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rental_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    ActiveContract, Contract, CreateOutstandingPayment, CreateUtilityRate, MeterReading,
    OutstandingPayment, OutstandingPaymentDetail, RecordMeterReading, UtilityKind, UtilityRate,
};

#[async_trait]
pub trait ContractStore: Send + Sync {
    /// The room's active contract joined with room and tenant details.
    async fn find_active_contract_by_room(
        &self,
        room_id: Uuid,
    ) -> Result<Option<ActiveContract>, AppError>;

    /// Distinct ids of rooms with at least one active contract, ordered by id.
    async fn find_active_contract_room_ids(&self) -> Result<Vec<Uuid>, AppError>;

    async fn find_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, AppError>;
}

#[async_trait]
pub trait MeterReadingStore: Send + Sync {
    /// Reading whose `month` lies in `[start, end)`.
    async fn find_reading_in_window(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<MeterReading>, AppError>;

    /// Most recently recorded reading for the room.
    async fn find_latest_reading(&self, room_id: Uuid) -> Result<Option<MeterReading>, AppError>;

    /// Returns `AppError::Conflict` when the room already has a reading for
    /// that month.
    async fn create_reading(&self, input: &RecordMeterReading) -> Result<MeterReading, AppError>;
}

#[async_trait]
pub trait UtilityRateStore: Send + Sync {
    /// Rate of `kind` with the greatest `effective_from <= as_of`.
    async fn find_latest_rate(
        &self,
        kind: UtilityKind,
        as_of: DateTime<Utc>,
    ) -> Result<Option<UtilityRate>, AppError>;

    async fn create_rate(&self, input: &CreateUtilityRate) -> Result<UtilityRate, AppError>;

    /// All rates, by kind then newest first.
    async fn list_rates(&self) -> Result<Vec<UtilityRate>, AppError>;

    /// Rates of `kind` with `effective_from` in `[start, end]`, newest first.
    async fn rate_history(
        &self,
        kind: UtilityKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UtilityRate>, AppError>;

    async fn find_rate(&self, rate_id: Uuid) -> Result<Option<UtilityRate>, AppError>;

    /// Returns false when no rate had that id.
    async fn delete_rate(&self, rate_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait OutstandingPaymentStore: Send + Sync {
    /// Returns `AppError::Conflict` when the room already has a bill for
    /// `input.billed_month`.
    async fn create_outstanding_payment(
        &self,
        input: &CreateOutstandingPayment,
    ) -> Result<OutstandingPayment, AppError>;

    /// The room's bill for the month starting `billed_month`, whatever its due
    /// date or contract.
    async fn find_bill_for_room_month(
        &self,
        room_id: Uuid,
        billed_month: NaiveDate,
    ) -> Result<Option<OutstandingPayment>, AppError>;

    /// First payment on any of the room's contracts due in `[start, end)`.
    async fn find_payment_by_room_in_due_window(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<OutstandingPaymentDetail>, AppError>;

    /// Every payment due in `[start, end)`, ordered by room number.
    async fn find_payments_in_due_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OutstandingPaymentDetail>, AppError>;
}

/// Everything the billing service needs from persistence.
#[async_trait]
pub trait BillingStore:
    ContractStore + MeterReadingStore + UtilityRateStore + OutstandingPaymentStore
{
    async fn health_check(&self) -> Result<(), AppError>;
}
