use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{BillingEngine, BillingError};
use crate::models::UtilityKind;

/// Priced usage of one utility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtilityCharge {
    pub kind: UtilityKind,
    pub usage: Decimal,
    pub rate: Decimal,
    pub cost: Decimal,
}

impl UtilityCharge {
    /// `usage = max(0, new - old)` and `cost = usage * rate`, without rounding.
    pub fn compute(kind: UtilityKind, old: Decimal, new: Decimal, rate: Decimal) -> Self {
        let usage = (new - old).max(Decimal::ZERO);
        Self {
            kind,
            usage,
            rate,
            cost: usage * rate,
        }
    }
}

impl BillingEngine {
    /// Price the usage between two readings with the rate of `kind` in force at
    /// `as_of`.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn calculate_utility_cost(
        &self,
        old: Decimal,
        new: Decimal,
        kind: UtilityKind,
        as_of: DateTime<Utc>,
    ) -> Result<UtilityCharge, BillingError> {
        let rate = self
            .store()
            .find_latest_rate(kind, as_of)
            .await?
            .ok_or(BillingError::RateNotFound(kind))?;

        Ok(UtilityCharge::compute(kind, old, new, rate.rate_per_unit))
    }
}
