//! Rate and meter reading management. Bills are priced from these, so they
//! share the engine's store.

use chrono::{DateTime, Utc};
use rental_core::error::AppError;
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{BillingEngine, BillingError, BillingPeriod};
use crate::models::{
    ContractStatus, CreateUtilityRate, MeterReading, RecordMeterReading, UtilityKind, UtilityRate,
};

/// Column precision of `utility_rates.rate_per_unit`: NUMERIC(14, 4).
const RATE_SCALE: u32 = 4;
const RATE_INTEGER_DIGITS: u32 = 10;
/// Column precision of the meter reading values: NUMERIC(14, 2).
const READING_SCALE: u32 = 2;
const READING_INTEGER_DIGITS: u32 = 12;

impl BillingEngine {
    #[instrument(skip(self, input), fields(kind = %input.kind))]
    pub async fn create_utility_rate(
        &self,
        input: CreateUtilityRate,
    ) -> Result<UtilityRate, AppError> {
        if input.rate_per_unit <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "rate_per_unit must be greater than 0"
            )));
        }
        check_fits_column(
            "rate_per_unit",
            input.rate_per_unit,
            RATE_SCALE,
            RATE_INTEGER_DIGITS,
        )?;

        let rate = self.store().create_rate(&input).await?;
        info!(
            rate_id = %rate.rate_id,
            rate_per_unit = %rate.rate_per_unit,
            effective_from = %rate.effective_from,
            "Utility rate created"
        );
        Ok(rate)
    }

    #[instrument(skip(self))]
    pub async fn list_utility_rates(&self) -> Result<Vec<UtilityRate>, AppError> {
        self.store().list_rates().await
    }

    /// Rate of `kind` in force right now.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn current_utility_rate(&self, kind: UtilityKind) -> Result<UtilityRate, AppError> {
        self.store()
            .find_latest_rate(kind, Utc::now())
            .await?
            .ok_or_else(|| AppError::from(BillingError::RateNotFound(kind)))
    }

    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn utility_rate_history(
        &self,
        kind: UtilityKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UtilityRate>, AppError> {
        if start > end {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "start must not be after end"
            )));
        }
        self.store().rate_history(kind, start, end).await
    }

    /// Delete a rate unless it is the one currently in force for its kind.
    #[instrument(skip(self), fields(rate_id = %rate_id))]
    pub async fn delete_utility_rate(&self, rate_id: Uuid) -> Result<(), AppError> {
        let rate = self
            .store()
            .find_rate(rate_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Utility rate not found")))?;

        if let Some(kind) = rate.utility_kind() {
            let current = self.store().find_latest_rate(kind, Utc::now()).await?;
            if current.is_some_and(|c| c.rate_id == rate_id) {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Cannot delete the {} rate currently in force",
                    kind
                )));
            }
        }

        if !self.store().delete_rate(rate_id).await? {
            return Err(AppError::NotFound(anyhow::anyhow!("Utility rate not found")));
        }

        info!("Utility rate deleted");
        Ok(())
    }

    /// Record a room's reading for a month. `input.month` may be any day of
    /// that month; it is stored as the first.
    #[instrument(skip(self, input), fields(room_id = %input.room_id, contract_id = %input.contract_id))]
    pub async fn record_meter_reading(
        &self,
        mut input: RecordMeterReading,
    ) -> Result<MeterReading, AppError> {
        let contract = self
            .store()
            .find_contract(input.contract_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract not found")))?;

        if contract.room_id != input.room_id {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Contract does not belong to this room"
            )));
        }
        if contract.contract_status() != ContractStatus::Active {
            return Err(BillingError::ContractInactive {
                contract_id: contract.contract_id,
            }
            .into());
        }

        validate_reading_values(&input)?;

        input.month = BillingPeriod::containing(input.month)?.start();

        let reading = self.store().create_reading(&input).await?;
        info!(
            reading_id = %reading.reading_id,
            month = %reading.month,
            "Meter reading recorded"
        );
        Ok(reading)
    }

    #[instrument(skip(self), fields(room_id = %room_id))]
    pub async fn latest_meter_reading(&self, room_id: Uuid) -> Result<MeterReading, AppError> {
        self.store()
            .find_latest_reading(room_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No meter reading for this room")))
    }
}

fn validate_reading_values(input: &RecordMeterReading) -> Result<(), AppError> {
    let values = [
        ("water_old", input.water_old),
        ("water_new", input.water_new),
        ("electric_old", input.electric_old),
        ("electric_new", input.electric_new),
    ];
    if let Some((field, _)) = values.iter().find(|(_, v)| *v < Decimal::ZERO) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "{} must not be negative",
            field
        )));
    }
    for (field, value) in values {
        check_fits_column(field, value, READING_SCALE, READING_INTEGER_DIGITS)?;
    }
    if input.water_new <= input.water_old {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "New water reading must be higher than old reading"
        )));
    }
    if input.electric_new <= input.electric_old {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "New electric reading must be higher than old reading"
        )));
    }
    Ok(())
}

/// Reject values the NUMERIC column would round or overflow, so what is stored
/// is exactly what was submitted. Trailing zeros do not count towards the scale.
fn check_fits_column(
    field: &str,
    value: Decimal,
    scale: u32,
    integer_digits: u32,
) -> Result<(), AppError> {
    if value.normalize().scale() > scale {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "{} allows at most {} decimal places",
            field,
            scale
        )));
    }
    if value.abs() >= Decimal::from(10_i64.pow(integer_digits)) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "{} must be below 10^{}",
            field,
            integer_digits
        )));
    }
    Ok(())
}
