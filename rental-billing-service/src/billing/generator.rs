use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rental_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{BillingError, BillingPeriod, RateResolution, UtilityCharge};
use crate::models::{
    BillItem, BillItemType, CreateOutstandingPayment, GeneratedBill, MonthlyBill, PaymentStatus,
    UtilityKind,
};
use crate::services::{record_bill_generated, record_billed_amount, record_error, BillingStore};

pub const DEFAULT_DUE_DAY: u32 = 5;

/// Monthly billing engine over a [`BillingStore`].
#[derive(Clone)]
pub struct BillingEngine {
    store: Arc<dyn BillingStore>,
    rate_resolution: RateResolution,
    due_day: u32,
    batch_concurrency: usize,
}

impl BillingEngine {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self {
            store,
            rate_resolution: RateResolution::default(),
            due_day: DEFAULT_DUE_DAY,
            batch_concurrency: 1,
        }
    }

    pub fn with_rate_resolution(mut self, rate_resolution: RateResolution) -> Self {
        self.rate_resolution = rate_resolution;
        self
    }

    /// Day of the following month bills fall due, clamped to 1..=28.
    pub fn with_due_day(mut self, due_day: u32) -> Self {
        self.due_day = due_day.clamp(1, 28);
        self
    }

    /// Rooms generated at once in a batch, clamped to 1..=32.
    pub fn with_batch_concurrency(mut self, batch_concurrency: usize) -> Self {
        self.batch_concurrency = batch_concurrency.clamp(1, 32);
        self
    }

    pub fn store(&self) -> &Arc<dyn BillingStore> {
        &self.store
    }

    pub fn batch_concurrency(&self) -> usize {
        self.batch_concurrency
    }

    /// Instant utility rates are resolved at when billing `period`.
    pub fn rate_reference_time(&self, period: BillingPeriod) -> DateTime<Utc> {
        match self.rate_resolution {
            RateResolution::BilledMonth => period.start_instant(),
            RateResolution::LatestKnown => Utc::now(),
        }
    }

    /// Bill one room for one month and persist the outstanding payment.
    ///
    /// Nothing is written unless every lookup and calculation succeeds.
    #[instrument(skip(self), fields(room_id = %room_id, period = %period))]
    pub async fn generate_monthly_bill_for_room(
        &self,
        room_id: Uuid,
        period: BillingPeriod,
    ) -> Result<GeneratedBill, BillingError> {
        let result = self.build_and_persist(room_id, period).await;

        match &result {
            Ok(generated) => {
                record_bill_generated("generated");
                for item in &generated.bill.items {
                    record_billed_amount(
                        item.item_type.as_str(),
                        item.amount.to_f64().unwrap_or_default(),
                    );
                }
            }
            Err(e) => {
                record_bill_generated(e.kind());
                record_error(e.kind(), "generate_monthly_bill_for_room");
                warn!(error = %e, "Bill generation failed");
            }
        }

        result
    }

    async fn build_and_persist(
        &self,
        room_id: Uuid,
        period: BillingPeriod,
    ) -> Result<GeneratedBill, BillingError> {
        let contract = self
            .store
            .find_active_contract_by_room(room_id)
            .await?
            .ok_or(BillingError::NoActiveContract { room_id })?;

        let current = self
            .store
            .find_reading_in_window(room_id, period.start(), period.end())
            .await?
            .ok_or(BillingError::MeterReadingMissing { room_id, period })?;

        let previous_period = period.previous();
        let previous = self
            .store
            .find_reading_in_window(room_id, previous_period.start(), previous_period.end())
            .await?;

        // Baselines come from last month's closing values, not this reading's
        // own `*_old` fields.
        let water_old = previous
            .as_ref()
            .map(|r| r.water_new)
            .unwrap_or(Decimal::ZERO);
        let electric_old = previous
            .as_ref()
            .map(|r| r.electric_new)
            .unwrap_or(Decimal::ZERO);

        let as_of = self.rate_reference_time(period);
        let water = self
            .calculate_utility_cost(water_old, current.water_new, UtilityKind::Water, as_of)
            .await?;
        let electric = self
            .calculate_utility_cost(
                electric_old,
                current.electric_new,
                UtilityKind::Electric,
                as_of,
            )
            .await?;

        let rent = contract.room_price.unwrap_or(Decimal::ZERO);
        let items = bill_items(&contract.room_number, period, rent, &[water, electric]);
        let total_amount: Decimal = items.iter().map(|item| item.amount).sum();
        let due_date = period.due_date(self.due_day);

        if self
            .store
            .find_bill_for_room_month(room_id, period.start())
            .await?
            .is_some()
        {
            return Err(BillingError::DuplicateBill { room_id, period });
        }

        let outstanding_payment = self
            .store
            .create_outstanding_payment(&CreateOutstandingPayment {
                contract_id: contract.contract_id,
                room_id,
                billed_month: period.start(),
                due_date,
                amount_due: total_amount,
                status: PaymentStatus::Unpaid,
            })
            .await
            .map_err(|e| match e {
                // A concurrent generation won the race for this room and month.
                AppError::Conflict(_) => BillingError::DuplicateBill { room_id, period },
                other => BillingError::Store(other),
            })?;

        info!(
            outstanding_payment_id = %outstanding_payment.outstanding_payment_id,
            contract_id = %contract.contract_id,
            total_amount = %total_amount,
            due_date = %due_date,
            "Monthly bill generated"
        );

        let bill = MonthlyBill {
            outstanding_payment_id: outstanding_payment.outstanding_payment_id,
            room_id,
            room_number: contract.room_number.clone(),
            tenant_name: contract.tenant_name.clone(),
            month: period.month(),
            year: period.year(),
            due_date,
            total_amount,
            items,
        };

        Ok(GeneratedBill {
            bill,
            contract,
            outstanding_payment,
        })
    }
}

/// Rent plus utility lines, keeping only those with a positive amount.
fn bill_items(
    room_number: &str,
    period: BillingPeriod,
    rent: Decimal,
    charges: &[UtilityCharge],
) -> Vec<BillItem> {
    let mut items = Vec::with_capacity(1 + charges.len());

    if rent > Decimal::ZERO {
        items.push(BillItem {
            description: format!("Room rent {} - {}", room_number, period),
            amount: rent,
            item_type: BillItemType::RoomRent,
            usage: None,
            rate: None,
        });
    }

    for charge in charges.iter().filter(|c| c.cost > Decimal::ZERO) {
        let (label, item_type) = match charge.kind {
            UtilityKind::Water => ("Water", BillItemType::Water),
            UtilityKind::Electric => ("Electricity", BillItemType::Electric),
        };
        items.push(BillItem {
            description: format!(
                "{} {} ({} units x {})",
                label, period, charge.usage, charge.rate
            ),
            amount: charge.cost,
            item_type,
            usage: Some(charge.usage),
            rate: Some(charge.rate),
        });
    }

    items
}
