use chrono::{DateTime, NaiveDate, Utc};
use rental_core::error::AppError;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::bills::validate_request;
use crate::models::{CreateUtilityRate, RecordMeterReading, UtilityKind};

fn parse_kind(kind: &str) -> Result<UtilityKind, AppError> {
    UtilityKind::parse(kind).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Invalid utility type '{}', expected water or electric",
            kind
        ))
    })
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("{} is required", field)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUtilityRateRequest {
    #[validate(required(message = "kind is required"))]
    pub kind: Option<String>,
    #[validate(required(message = "rate_per_unit is required"))]
    pub rate_per_unit: Option<Decimal>,
    /// Defaults to now.
    pub effective_from: Option<DateTime<Utc>>,
}

impl CreateUtilityRateRequest {
    pub fn into_input(self) -> Result<CreateUtilityRate, AppError> {
        validate_request(&self)?;
        Ok(CreateUtilityRate {
            kind: parse_kind(&required(self.kind, "kind")?)?,
            rate_per_unit: required(self.rate_per_unit, "rate_per_unit")?,
            effective_from: self.effective_from.unwrap_or_else(Utc::now),
        })
    }
}

/// Path segment naming a utility kind.
pub fn kind_from_path(kind: &str) -> Result<UtilityKind, AppError> {
    parse_kind(kind)
}

#[derive(Debug, Deserialize, Validate)]
pub struct RateHistoryQuery {
    #[validate(required(message = "start is required"))]
    pub start: Option<DateTime<Utc>>,
    #[validate(required(message = "end is required"))]
    pub end: Option<DateTime<Utc>>,
}

impl RateHistoryQuery {
    pub fn into_range(self) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        validate_request(&self)?;
        Ok((required(self.start, "start")?, required(self.end, "end")?))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordMeterReadingRequest {
    #[validate(required(message = "room_id is required"))]
    pub room_id: Option<Uuid>,
    #[validate(required(message = "contract_id is required"))]
    pub contract_id: Option<Uuid>,
    #[validate(required(message = "month is required"))]
    pub month: Option<NaiveDate>,
    #[validate(required(message = "water_old is required"))]
    pub water_old: Option<Decimal>,
    #[validate(required(message = "water_new is required"))]
    pub water_new: Option<Decimal>,
    #[validate(required(message = "electric_old is required"))]
    pub electric_old: Option<Decimal>,
    #[validate(required(message = "electric_new is required"))]
    pub electric_new: Option<Decimal>,
    /// Defaults to now.
    pub recorded_date: Option<DateTime<Utc>>,
}

impl RecordMeterReadingRequest {
    pub fn into_input(self) -> Result<RecordMeterReading, AppError> {
        validate_request(&self)?;
        Ok(RecordMeterReading {
            room_id: required(self.room_id, "room_id")?,
            contract_id: required(self.contract_id, "contract_id")?,
            month: required(self.month, "month")?,
            water_old: required(self.water_old, "water_old")?,
            water_new: required(self.water_new, "water_new")?,
            electric_old: required(self.electric_old, "electric_old")?,
            electric_new: required(self.electric_new, "electric_new")?,
            recorded_date: self.recorded_date.unwrap_or_else(Utc::now),
        })
    }
}
