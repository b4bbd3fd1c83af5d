//! Meter reading model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One room's water and electric meter values for one billing month.
///
/// `month` is always the first day of the month it covers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MeterReading {
    pub reading_id: Uuid,
    pub room_id: Uuid,
    pub contract_id: Uuid,
    pub month: NaiveDate,
    pub water_old: Decimal,
    pub water_new: Decimal,
    pub electric_old: Decimal,
    pub electric_new: Decimal,
    pub recorded_date: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording a meter reading.
#[derive(Debug, Clone)]
pub struct RecordMeterReading {
    pub room_id: Uuid,
    pub contract_id: Uuid,
    pub month: NaiveDate,
    pub water_old: Decimal,
    pub water_new: Decimal,
    pub electric_old: Decimal,
    pub electric_new: Decimal,
    pub recorded_date: DateTime<Utc>,
}
