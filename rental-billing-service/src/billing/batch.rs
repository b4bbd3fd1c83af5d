use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{BillingEngine, BillingError, BillingPeriod};
use crate::models::{BatchBillError, BatchBillResult, BatchSummary, GeneratedBill};
use crate::services::record_batch_run;

impl BillingEngine {
    /// Bill every room in `room_ids`. A failing room is recorded in `errors`
    /// and does not stop the others; bills already created stay persisted.
    ///
    /// Successes follow input order and errors follow encounter order, for
    /// any batch concurrency.
    #[instrument(skip(self, room_ids), fields(rooms = room_ids.len(), period = %period))]
    pub async fn generate_monthly_bills_for_rooms(
        &self,
        room_ids: &[Uuid],
        period: BillingPeriod,
    ) -> BatchBillResult {
        record_batch_run("rooms");
        self.run_batch(room_ids, period).await
    }

    /// Bill every room that has an active contract.
    #[instrument(skip(self), fields(period = %period))]
    pub async fn generate_monthly_bills_for_all_active_rooms(
        &self,
        period: BillingPeriod,
    ) -> Result<BatchBillResult, BillingError> {
        record_batch_run("active");

        let room_ids = self.store().find_active_contract_room_ids().await?;
        if room_ids.is_empty() {
            info!("No active contracts to bill");
            return Ok(BatchBillResult::default());
        }

        Ok(self.run_batch(&room_ids, period).await)
    }

    async fn run_batch(&self, room_ids: &[Uuid], period: BillingPeriod) -> BatchBillResult {
        let outcomes: Vec<(Uuid, Result<GeneratedBill, BillingError>)> =
            stream::iter(room_ids.iter().copied())
                .map(|room_id| async move {
                    let outcome = self.generate_monthly_bill_for_room(room_id, period).await;
                    (room_id, outcome)
                })
                .buffered(self.batch_concurrency())
                .collect()
                .await;

        let result = aggregate(room_ids.len(), outcomes);

        info!(
            total_rooms = result.summary.total_rooms,
            success_count = result.summary.success_count,
            error_count = result.summary.error_count,
            total_amount = %result.summary.total_amount,
            "Batch bill generation finished"
        );

        result
    }
}

fn aggregate(
    total_rooms: usize,
    outcomes: Vec<(Uuid, Result<GeneratedBill, BillingError>)>,
) -> BatchBillResult {
    let mut success = Vec::new();
    let mut errors = Vec::new();

    for (room_id, outcome) in outcomes {
        match outcome {
            Ok(generated) => success.push(generated),
            Err(e) => errors.push(BatchBillError {
                room_id,
                error: e.to_string(),
            }),
        }
    }

    let total_amount: Decimal = success.iter().map(|g| g.bill.total_amount).sum();

    BatchBillResult {
        summary: BatchSummary {
            total_rooms,
            success_count: success.len(),
            error_count: errors.len(),
            total_amount,
        },
        success,
        errors,
    }
}
