use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use super::{BillingEngine, BillingError, BillingPeriod};
use crate::models::{
    BillLookup, BillStatistics, MonthlyBillStatistics, OutstandingPaymentDetail, PaymentStatus,
};

impl BillingEngine {
    /// The room's payment due within `period`, with the room's reading for that
    /// month if one was recorded.
    #[instrument(skip(self), fields(room_id = %room_id, period = %period))]
    pub async fn get_monthly_bill_by_room(
        &self,
        room_id: Uuid,
        period: BillingPeriod,
    ) -> Result<BillLookup, BillingError> {
        let outstanding_payment = self
            .store()
            .find_payment_by_room_in_due_window(room_id, period.start(), period.end())
            .await?
            .ok_or(BillingError::BillNotFound { room_id, period })?;

        let meter_reading = self
            .store()
            .find_reading_in_window(room_id, period.start(), period.end())
            .await?;

        Ok(BillLookup {
            outstanding_payment,
            meter_reading,
        })
    }

    /// Aggregates over every payment due within `period`.
    #[instrument(skip(self), fields(period = %period))]
    pub async fn get_monthly_bill_statistics(
        &self,
        period: BillingPeriod,
    ) -> Result<MonthlyBillStatistics, BillingError> {
        let bills = self
            .store()
            .find_payments_in_due_window(period.start(), period.end())
            .await?;

        let statistics = summarise(&bills, Utc::now().date_naive());

        Ok(MonthlyBillStatistics {
            month: period.month(),
            year: period.year(),
            statistics,
            bills,
        })
    }
}

/// Counts and totals for a set of payments as seen on `today`.
///
/// A bill counts as overdue only when its status is overdue and its due date
/// has passed.
pub fn summarise(bills: &[OutstandingPaymentDetail], today: NaiveDate) -> BillStatistics {
    let mut stats = BillStatistics {
        total_bills: bills.len(),
        ..Default::default()
    };

    for bill in bills {
        stats.total_amount += bill.amount_due;
        match bill.payment_status() {
            PaymentStatus::Paid => stats.paid_bills += 1,
            PaymentStatus::Unpaid => stats.unpaid_bills += 1,
            PaymentStatus::PartiallyPaid => stats.partially_paid_bills += 1,
            PaymentStatus::Overdue if today > bill.due_date => stats.overdue_bills += 1,
            PaymentStatus::Overdue => {}
        }
    }

    stats.collection_rate = if stats.total_bills == 0 {
        0.0
    } else {
        (Decimal::from(stats.paid_bills as u64) / Decimal::from(stats.total_bills as u64)
            * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or_default()
    };

    stats
}
