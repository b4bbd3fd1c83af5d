//! PostgreSQL-backed test application.
//!
//! Each app runs the real `Application::build` against its own schema so the
//! migrations and SQL of `Database` are exercised. Tests using it return early
//! when `TEST_DATABASE_URL` is not set.

use super::{date, test_config, RoomFixture};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rental_billing_service::billing::BillingEngine;
use rental_billing_service::config::BillingRules;
use rental_billing_service::models::{ContractStatus, PaymentStatus, UtilityKind};
use rental_billing_service::services::{init_metrics, Database};
use rental_billing_service::startup::Application;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

// Counter for unique schema names
static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Database URL for PostgreSQL tests, if configured.
pub fn get_test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .ok()
        .filter(|url| !url.is_empty())
}

/// Generate a unique schema name for test isolation.
fn unique_schema_name() -> String {
    let counter = SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("test_rental_billing_{}_{}", std::process::id(), counter)
}

pub struct PgTestApp {
    pub address: String,
    pub client: reqwest::Client,
    /// Pool on the test schema, for seeding and assertions.
    pub pool: PgPool,
    pub db: Database,
    base_url: String,
    schema_name: String,
}

impl PgTestApp {
    /// Spawn the application over a fresh schema, or `None` without a database.
    pub async fn spawn() -> Option<Self> {
        let Some(base_url) = get_test_database_url() else {
            eprintln!("TEST_DATABASE_URL not set, skipping PostgreSQL test");
            return None;
        };

        init_metrics();
        let schema_name = unique_schema_name();

        let setup = PgPoolOptions::new()
            .max_connections(1)
            .connect(&base_url)
            .await
            .expect("Failed to connect to test database");
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema_name))
            .execute(&setup)
            .await
            .ok();
        sqlx::query(&format!("CREATE SCHEMA {}", schema_name))
            .execute(&setup)
            .await
            .expect("Failed to create test schema");
        setup.close().await;

        // Use ? or & depending on whether URL already has query parameters
        let separator = if base_url.contains('?') { "&" } else { "?" };
        let db_url = format!(
            "{}{}options=-c search_path%3D{}",
            base_url, separator, schema_name
        );

        let mut config = test_config(BillingRules::default());
        config.database.url = db_url.clone();
        config.database.max_connections = 5;
        config.database.min_connections = 1;

        // Runs the migrations into the test schema.
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let address = format!("http://127.0.0.1:{}", app.http_port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        let db = Database::new(&db_url, 2, 1)
            .await
            .expect("Failed to create test database");
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&db_url)
            .await
            .expect("Failed to connect to test schema");

        Some(PgTestApp {
            address,
            client,
            pool,
            db,
            base_url,
            schema_name,
        })
    }

    /// Engine over the Postgres store, for calls that bypass HTTP.
    pub fn engine(&self) -> BillingEngine {
        BillingEngine::new(Arc::new(self.db.clone()))
    }

    pub async fn seed_room(&self, room_number: &str, price: Option<Decimal>) -> Uuid {
        let room_id = Uuid::new_v4();
        sqlx::query("INSERT INTO rooms (room_id, room_number, price) VALUES ($1, $2, $3)")
            .bind(room_id)
            .bind(room_number)
            .bind(price)
            .execute(&self.pool)
            .await
            .expect("Failed to seed room");
        room_id
    }

    pub async fn seed_tenant(&self, name: &str) -> Uuid {
        let tenant_id = Uuid::new_v4();
        sqlx::query("INSERT INTO tenants (tenant_id, name) VALUES ($1, $2)")
            .bind(tenant_id)
            .bind(name)
            .execute(&self.pool)
            .await
            .expect("Failed to seed tenant");
        tenant_id
    }

    pub async fn seed_contract(&self, room_id: Uuid, tenant_id: Uuid, status: ContractStatus) -> Uuid {
        let contract_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO contracts (contract_id, room_id, tenant_id, status, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(contract_id)
        .bind(room_id)
        .bind(tenant_id)
        .bind(status.as_str())
        .bind(date(2023, 1, 1))
        .bind(date(2026, 12, 31))
        .execute(&self.pool)
        .await
        .expect("Failed to seed contract");
        contract_id
    }

    pub async fn seed_rented_room(&self, room_number: &str, rent: Option<Decimal>) -> RoomFixture {
        let room_id = self.seed_room(room_number, rent).await;
        let tenant_id = self
            .seed_tenant(&format!("Tenant of {}", room_number))
            .await;
        let contract_id = self
            .seed_contract(room_id, tenant_id, ContractStatus::Active)
            .await;
        RoomFixture {
            room_id,
            tenant_id,
            contract_id,
        }
    }

    pub async fn seed_rate(&self, kind: UtilityKind, rate_per_unit: Decimal, effective_from: DateTime<Utc>) {
        sqlx::query(
            "INSERT INTO utility_rates (rate_id, kind, rate_per_unit, effective_from) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(kind.as_str())
        .bind(rate_per_unit)
        .bind(effective_from)
        .execute(&self.pool)
        .await
        .expect("Failed to seed utility rate");
    }

    /// Water at 2,000 and electricity at 800 per unit, in force since 2020.
    pub async fn seed_standard_rates(&self) {
        let since = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        self.seed_rate(UtilityKind::Water, dec!(2000), since).await;
        self.seed_rate(UtilityKind::Electric, dec!(800), since).await;
    }

    pub async fn seed_reading(
        &self,
        room: &RoomFixture,
        month: NaiveDate,
        water: (Decimal, Decimal),
        electric: (Decimal, Decimal),
    ) {
        sqlx::query(
            r#"
            INSERT INTO meter_readings
                (reading_id, room_id, contract_id, month, water_old, water_new, electric_old, electric_new, recorded_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(room.room_id)
        .bind(room.contract_id)
        .bind(month)
        .bind(water.0)
        .bind(water.1)
        .bind(electric.0)
        .bind(electric.1)
        .bind(Utc.from_utc_datetime(&month.and_hms_opt(12, 0, 0).unwrap()))
        .execute(&self.pool)
        .await
        .expect("Failed to seed meter reading");
    }

    /// Room "101" at 500,000 rent with readings for `year`-`month` and the
    /// month before: water 10 -> 15, electricity 100 -> 140.
    pub async fn seed_room_101(&self, month: u32, year: i32) -> RoomFixture {
        let room = self.seed_rented_room("101", Some(dec!(500000))).await;
        let current = date(year, month, 1);
        let previous = current - chrono::Months::new(1);
        self.seed_reading(&room, previous, (dec!(0), dec!(10)), (dec!(0), dec!(100)))
            .await;
        self.seed_reading(&room, current, (dec!(10), dec!(15)), (dec!(100), dec!(140)))
            .await;
        room
    }

    /// A payment raised outside the bill generator; its billed columns stay NULL.
    pub async fn seed_external_payment(&self, contract_id: Uuid, due_date: NaiveDate, amount_due: Decimal) {
        sqlx::query(
            r#"
            INSERT INTO outstanding_payments (outstanding_payment_id, contract_id, due_date, amount_due, status)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(contract_id)
        .bind(due_date)
        .bind(amount_due)
        .bind(PaymentStatus::Unpaid.as_str())
        .execute(&self.pool)
        .await
        .expect("Failed to seed outstanding payment");
    }

    pub async fn payment_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM outstanding_payments")
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count outstanding payments")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Cleanup test resources (schema).
    pub async fn cleanup(&self) {
        self.pool.close().await;

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.base_url)
            .await
            .ok();

        if let Some(pool) = pool {
            let _ = sqlx::query(&format!(
                "DROP SCHEMA IF EXISTS {} CASCADE",
                self.schema_name
            ))
            .execute(&pool)
            .await;
            pool.close().await;
        }
    }
}
