//! Database service for rental-billing-service.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rental_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    ActiveContract, Contract, CreateOutstandingPayment, CreateUtilityRate, MeterReading,
    OutstandingPayment, OutstandingPaymentDetail, RecordMeterReading, UtilityKind, UtilityRate,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::{
    BillingStore, ContractStore, MeterReadingStore, OutstandingPaymentStore, UtilityRateStore,
};

const PAYMENT_DETAIL_COLUMNS: &str = r#"
    op.outstanding_payment_id, op.contract_id, op.due_date, op.amount_due, op.status, op.created_utc,
    c.room_id, r.room_number, c.tenant_id, t.name AS tenant_name
"#;

const PAYMENT_DETAIL_JOINS: &str = r#"
    FROM outstanding_payments op
    JOIN contracts c ON c.contract_id = op.contract_id
    JOIN rooms r ON r.room_id = c.room_id
    JOIN tenants t ON t.tenant_id = c.tenant_id
"#;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "rental-billing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

// =========================================================================
// Contracts
// =========================================================================

#[async_trait]
impl ContractStore for Database {
    #[instrument(skip(self), fields(room_id = %room_id))]
    async fn find_active_contract_by_room(
        &self,
        room_id: Uuid,
    ) -> Result<Option<ActiveContract>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_active_contract_by_room"])
            .start_timer();

        let contract = sqlx::query_as::<_, ActiveContract>(
            r#"
            SELECT c.contract_id, c.room_id, c.tenant_id, c.status, c.start_date, c.end_date,
                   r.room_number, r.price AS room_price, t.name AS tenant_name
            FROM contracts c
            JOIN rooms r ON r.room_id = c.room_id
            JOIN tenants t ON t.tenant_id = c.tenant_id
            WHERE c.room_id = $1 AND c.status = 'active'
            ORDER BY c.start_date DESC
            LIMIT 1
            "#,
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get active contract: {}", e))
        })?;

        timer.observe_duration();

        Ok(contract)
    }

    #[instrument(skip(self))]
    async fn find_active_contract_room_ids(&self) -> Result<Vec<Uuid>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_active_contract_room_ids"])
            .start_timer();

        let room_ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT room_id
            FROM contracts
            WHERE status = 'active'
            ORDER BY room_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list active rooms: {}", e))
        })?;

        timer.observe_duration();

        Ok(room_ids)
    }

    #[instrument(skip(self), fields(contract_id = %contract_id))]
    async fn find_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_contract"])
            .start_timer();

        let contract = sqlx::query_as::<_, Contract>(
            r#"
            SELECT contract_id, room_id, tenant_id, status, start_date, end_date
            FROM contracts
            WHERE contract_id = $1
            "#,
        )
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get contract: {}", e)))?;

        timer.observe_duration();

        Ok(contract)
    }
}

// =========================================================================
// Meter readings
// =========================================================================

#[async_trait]
impl MeterReadingStore for Database {
    #[instrument(skip(self), fields(room_id = %room_id, start = %start, end = %end))]
    async fn find_reading_in_window(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<MeterReading>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_reading_in_window"])
            .start_timer();

        let reading = sqlx::query_as::<_, MeterReading>(
            r#"
            SELECT reading_id, room_id, contract_id, month, water_old, water_new, electric_old, electric_new, recorded_date, created_utc
            FROM meter_readings
            WHERE room_id = $1 AND month >= $2 AND month < $3
            ORDER BY month
            LIMIT 1
            "#,
        )
        .bind(room_id)
        .bind(start)
        .bind(end)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get meter reading: {}", e))
        })?;

        timer.observe_duration();

        Ok(reading)
    }

    #[instrument(skip(self), fields(room_id = %room_id))]
    async fn find_latest_reading(&self, room_id: Uuid) -> Result<Option<MeterReading>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_latest_reading"])
            .start_timer();

        let reading = sqlx::query_as::<_, MeterReading>(
            r#"
            SELECT reading_id, room_id, contract_id, month, water_old, water_new, electric_old, electric_new, recorded_date, created_utc
            FROM meter_readings
            WHERE room_id = $1
            ORDER BY recorded_date DESC
            LIMIT 1
            "#,
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get latest meter reading: {}", e))
        })?;

        timer.observe_duration();

        Ok(reading)
    }

    #[instrument(skip(self, input), fields(room_id = %input.room_id, month = %input.month))]
    async fn create_reading(&self, input: &RecordMeterReading) -> Result<MeterReading, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_reading"])
            .start_timer();

        let reading_id = Uuid::new_v4();
        let reading = sqlx::query_as::<_, MeterReading>(
            r#"
            INSERT INTO meter_readings (reading_id, room_id, contract_id, month, water_old, water_new, electric_old, electric_new, recorded_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING reading_id, room_id, contract_id, month, water_old, water_new, electric_old, electric_new, recorded_date, created_utc
            "#,
        )
        .bind(reading_id)
        .bind(input.room_id)
        .bind(input.contract_id)
        .bind(input.month)
        .bind(input.water_old)
        .bind(input.water_new)
        .bind(input.electric_old)
        .bind(input.electric_new)
        .bind(input.recorded_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "A meter reading for this room and month already exists"
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to record meter reading: {}", e)),
        })?;

        timer.observe_duration();

        Ok(reading)
    }
}

// =========================================================================
// Utility rates
// =========================================================================

#[async_trait]
impl UtilityRateStore for Database {
    #[instrument(skip(self), fields(kind = %kind, as_of = %as_of))]
    async fn find_latest_rate(
        &self,
        kind: UtilityKind,
        as_of: DateTime<Utc>,
    ) -> Result<Option<UtilityRate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_latest_rate"])
            .start_timer();

        let rate = sqlx::query_as::<_, UtilityRate>(
            r#"
            SELECT rate_id, kind, rate_per_unit, effective_from, created_utc
            FROM utility_rates
            WHERE kind = $1 AND effective_from <= $2
            ORDER BY effective_from DESC, created_utc DESC
            LIMIT 1
            "#,
        )
        .bind(kind.as_str())
        .bind(as_of)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get utility rate: {}", e))
        })?;

        timer.observe_duration();

        Ok(rate)
    }

    #[instrument(skip(self, input), fields(kind = %input.kind))]
    async fn create_rate(&self, input: &CreateUtilityRate) -> Result<UtilityRate, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_rate"])
            .start_timer();

        let rate_id = Uuid::new_v4();
        let rate = sqlx::query_as::<_, UtilityRate>(
            r#"
            INSERT INTO utility_rates (rate_id, kind, rate_per_unit, effective_from)
            VALUES ($1, $2, $3, $4)
            RETURNING rate_id, kind, rate_per_unit, effective_from, created_utc
            "#,
        )
        .bind(rate_id)
        .bind(input.kind.as_str())
        .bind(input.rate_per_unit)
        .bind(input.effective_from)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create utility rate: {}", e))
        })?;

        timer.observe_duration();

        Ok(rate)
    }

    #[instrument(skip(self))]
    async fn list_rates(&self) -> Result<Vec<UtilityRate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_rates"])
            .start_timer();

        let rates = sqlx::query_as::<_, UtilityRate>(
            r#"
            SELECT rate_id, kind, rate_per_unit, effective_from, created_utc
            FROM utility_rates
            ORDER BY kind ASC, effective_from DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list utility rates: {}", e))
        })?;

        timer.observe_duration();

        Ok(rates)
    }

    #[instrument(skip(self), fields(kind = %kind))]
    async fn rate_history(
        &self,
        kind: UtilityKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UtilityRate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["rate_history"])
            .start_timer();

        let rates = sqlx::query_as::<_, UtilityRate>(
            r#"
            SELECT rate_id, kind, rate_per_unit, effective_from, created_utc
            FROM utility_rates
            WHERE kind = $1 AND effective_from >= $2 AND effective_from <= $3
            ORDER BY effective_from DESC
            "#,
        )
        .bind(kind.as_str())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get rate history: {}", e))
        })?;

        timer.observe_duration();

        Ok(rates)
    }

    #[instrument(skip(self), fields(rate_id = %rate_id))]
    async fn find_rate(&self, rate_id: Uuid) -> Result<Option<UtilityRate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_rate"])
            .start_timer();

        let rate = sqlx::query_as::<_, UtilityRate>(
            r#"
            SELECT rate_id, kind, rate_per_unit, effective_from, created_utc
            FROM utility_rates
            WHERE rate_id = $1
            "#,
        )
        .bind(rate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get utility rate: {}", e))
        })?;

        timer.observe_duration();

        Ok(rate)
    }

    #[instrument(skip(self), fields(rate_id = %rate_id))]
    async fn delete_rate(&self, rate_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_rate"])
            .start_timer();

        let result = sqlx::query("DELETE FROM utility_rates WHERE rate_id = $1")
            .bind(rate_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete utility rate: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }
}

// =========================================================================
// Outstanding payments
// =========================================================================

#[async_trait]
impl OutstandingPaymentStore for Database {
    #[instrument(
        skip(self, input),
        fields(room_id = %input.room_id, billed_month = %input.billed_month)
    )]
    async fn create_outstanding_payment(
        &self,
        input: &CreateOutstandingPayment,
    ) -> Result<OutstandingPayment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_outstanding_payment"])
            .start_timer();

        let outstanding_payment_id = Uuid::new_v4();
        let payment = sqlx::query_as::<_, OutstandingPayment>(
            r#"
            INSERT INTO outstanding_payments
                (outstanding_payment_id, contract_id, due_date, amount_due, status, billed_room_id, billed_month)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING outstanding_payment_id, contract_id, due_date, amount_due, status, billed_month, created_utc
            "#,
        )
        .bind(outstanding_payment_id)
        .bind(input.contract_id)
        .bind(input.due_date)
        .bind(input.amount_due)
        .bind(input.status.as_str())
        .bind(input.room_id)
        .bind(input.billed_month)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Room already has a bill for the month starting {}",
                    input.billed_month
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!(
                "Failed to create outstanding payment: {}",
                e
            )),
        })?;

        timer.observe_duration();

        Ok(payment)
    }

    #[instrument(skip(self), fields(room_id = %room_id, billed_month = %billed_month))]
    async fn find_bill_for_room_month(
        &self,
        room_id: Uuid,
        billed_month: NaiveDate,
    ) -> Result<Option<OutstandingPayment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_bill_for_room_month"])
            .start_timer();

        let payment = sqlx::query_as::<_, OutstandingPayment>(
            r#"
            SELECT outstanding_payment_id, contract_id, due_date, amount_due, status, billed_month, created_utc
            FROM outstanding_payments
            WHERE billed_room_id = $1 AND billed_month = $2
            "#,
        )
        .bind(room_id)
        .bind(billed_month)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get outstanding payment: {}", e))
        })?;

        timer.observe_duration();

        Ok(payment)
    }

    #[instrument(skip(self), fields(room_id = %room_id, start = %start, end = %end))]
    async fn find_payment_by_room_in_due_window(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<OutstandingPaymentDetail>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_payment_by_room_in_due_window"])
            .start_timer();

        let query = format!(
            "SELECT {} {} WHERE c.room_id = $1 AND op.due_date >= $2 AND op.due_date < $3 \
             ORDER BY op.due_date, op.created_utc LIMIT 1",
            PAYMENT_DETAIL_COLUMNS, PAYMENT_DETAIL_JOINS
        );
        let payment = sqlx::query_as::<_, OutstandingPaymentDetail>(&query)
            .bind(room_id)
            .bind(start)
            .bind(end)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to get room bill: {}", e))
            })?;

        timer.observe_duration();

        Ok(payment)
    }

    #[instrument(skip(self), fields(start = %start, end = %end))]
    async fn find_payments_in_due_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OutstandingPaymentDetail>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_payments_in_due_window"])
            .start_timer();

        let query = format!(
            "SELECT {} {} WHERE op.due_date >= $1 AND op.due_date < $2 \
             ORDER BY r.room_number, op.due_date",
            PAYMENT_DETAIL_COLUMNS, PAYMENT_DETAIL_JOINS
        );
        let payments = sqlx::query_as::<_, OutstandingPaymentDetail>(&query)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to list bills: {}", e))
            })?;

        timer.observe_duration();

        Ok(payments)
    }
}

#[async_trait]
impl BillingStore for Database {
    /// Check database health.
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }
}
