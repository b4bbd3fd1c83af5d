//! Monthly billing engine.
//!
//! The calculator prices utility usage, the generator turns one room's active
//! contract and meter readings into an outstanding payment, and the batch
//! generator fans that out over many rooms. Statistics and lookup read the
//! payments back.

mod admin;
mod batch;
mod calculator;
mod generator;
mod period;
mod statistics;

use rental_core::error::AppError;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::models::UtilityKind;

pub use calculator::UtilityCharge;
pub use generator::BillingEngine;
pub use period::{BillingPeriod, MAX_YEAR, MIN_YEAR};
pub use statistics::summarise;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("No utility rate configured for {0}")]
    RateNotFound(UtilityKind),

    #[error("No active contract found for room {room_id}")]
    NoActiveContract { room_id: Uuid },

    #[error("No meter reading for room {room_id} in {period}")]
    MeterReadingMissing { room_id: Uuid, period: BillingPeriod },

    #[error("No bill found for room {room_id} in {period}")]
    BillNotFound { room_id: Uuid, period: BillingPeriod },

    #[error("A bill for room {room_id} in {period} already exists")]
    DuplicateBill { room_id: Uuid, period: BillingPeriod },

    #[error("Contract {contract_id} is not active")]
    ContractInactive { contract_id: Uuid },

    #[error("Invalid billing period: {0}")]
    InvalidPeriod(String),

    #[error(transparent)]
    Store(#[from] AppError),
}

impl BillingError {
    /// Label used for error metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BillingError::RateNotFound(_) => "rate_not_found",
            BillingError::NoActiveContract { .. } => "no_active_contract",
            BillingError::MeterReadingMissing { .. } => "meter_reading_missing",
            BillingError::BillNotFound { .. } => "bill_not_found",
            BillingError::DuplicateBill { .. } => "duplicate_bill",
            BillingError::ContractInactive { .. } => "contract_inactive",
            BillingError::InvalidPeriod(_) => "invalid_period",
            BillingError::Store(_) => "store",
        }
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Store(inner) => inner,
            BillingError::RateNotFound(_)
            | BillingError::NoActiveContract { .. }
            | BillingError::MeterReadingMissing { .. }
            | BillingError::BillNotFound { .. } => AppError::NotFound(anyhow::anyhow!("{}", err)),
            BillingError::DuplicateBill { .. } => AppError::Conflict(anyhow::anyhow!("{}", err)),
            BillingError::ContractInactive { .. } | BillingError::InvalidPeriod(_) => {
                AppError::BadRequest(anyhow::anyhow!("{}", err))
            }
        }
    }
}

/// Which point in time utility rates are resolved against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RateResolution {
    /// Rate in force at the first instant of the billed month.
    #[default]
    BilledMonth,
    /// Rate in force at generation time, whatever month is billed.
    LatestKnown,
}

impl RateResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateResolution::BilledMonth => "billed_month",
            RateResolution::LatestKnown => "latest_known",
        }
    }
}

impl FromStr for RateResolution {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "billed_month" => Ok(RateResolution::BilledMonth),
            "latest_known" => Ok(RateResolution::LatestKnown),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "Unknown rate resolution '{}', expected billed_month or latest_known",
                other
            ))),
        }
    }
}
