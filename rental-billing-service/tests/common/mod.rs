//! Test helper module for rental-billing-service integration tests.
//!
//! Provides an in-memory store implementing every store trait and a
//! `TestApp` that serves the real router over it on a random port.

#![allow(dead_code)]

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rental_billing_service::billing::BillingEngine;
use rental_billing_service::config::{BillingConfig, BillingRules, DatabaseConfig};
use rental_billing_service::models::{
    ActiveContract, Contract, ContractStatus, CreateOutstandingPayment, CreateUtilityRate,
    MeterReading, OutstandingPayment, OutstandingPaymentDetail, PaymentStatus,
    RecordMeterReading, UtilityKind, UtilityRate,
};
use rental_billing_service::services::{
    init_metrics, BillingStore, ContractStore, MeterReadingStore, OutstandingPaymentStore,
    UtilityRateStore,
};
use rental_billing_service::startup::Application;
use rental_core::config::ServerConfig;
use rental_core::error::AppError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn instant(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

#[derive(Clone)]
struct Room {
    room_number: String,
    price: Option<Decimal>,
}

#[derive(Default)]
struct StoreState {
    rooms: HashMap<Uuid, Room>,
    tenants: HashMap<Uuid, String>,
    contracts: Vec<Contract>,
    rates: Vec<UtilityRate>,
    readings: Vec<MeterReading>,
    payments: Vec<OutstandingPayment>,
    /// Billed room of each monthly bill, by payment id.
    billed_rooms: HashMap<Uuid, Uuid>,
}

/// In-memory stand-in for the Postgres store. Enforces the same uniqueness
/// rules as the schema.
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    healthy: AtomicBool,
    hide_existing_payments: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            healthy: AtomicBool::new(true),
            hide_existing_payments: AtomicBool::new(false),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_room(&self, room_number: &str, price: Option<Decimal>) -> Uuid {
        let room_id = Uuid::new_v4();
        self.state.lock().unwrap().rooms.insert(
            room_id,
            Room {
                room_number: room_number.to_string(),
                price,
            },
        );
        room_id
    }

    pub fn add_tenant(&self, name: &str) -> Uuid {
        let tenant_id = Uuid::new_v4();
        self.state
            .lock()
            .unwrap()
            .tenants
            .insert(tenant_id, name.to_string());
        tenant_id
    }

    pub fn add_contract(&self, room_id: Uuid, tenant_id: Uuid, status: ContractStatus) -> Uuid {
        let contract_id = Uuid::new_v4();
        self.state.lock().unwrap().contracts.push(Contract {
            contract_id,
            room_id,
            tenant_id,
            status: status.as_str().to_string(),
            start_date: date(2023, 1, 1),
            end_date: date(2026, 12, 31),
        });
        contract_id
    }

    pub fn add_rate(&self, kind: UtilityKind, rate_per_unit: Decimal, effective_from: DateTime<Utc>) -> Uuid {
        let rate_id = Uuid::new_v4();
        self.state.lock().unwrap().rates.push(UtilityRate {
            rate_id,
            kind: kind.as_str().to_string(),
            rate_per_unit,
            effective_from,
            created_utc: Utc::now(),
        });
        rate_id
    }

    /// Seed a reading directly, bypassing the recording rules.
    pub fn add_reading(
        &self,
        room_id: Uuid,
        contract_id: Uuid,
        month: NaiveDate,
        water: (Decimal, Decimal),
        electric: (Decimal, Decimal),
    ) -> Uuid {
        let reading_id = Uuid::new_v4();
        self.state.lock().unwrap().readings.push(MeterReading {
            reading_id,
            room_id,
            contract_id,
            month,
            water_old: water.0,
            water_new: water.1,
            electric_old: electric.0,
            electric_new: electric.1,
            recorded_date: Utc.from_utc_datetime(&month.and_hms_opt(12, 0, 0).unwrap()),
            created_utc: Utc::now(),
        });
        reading_id
    }

    /// Seed a payment raised outside the bill generator, such as a deposit.
    pub fn add_external_payment(&self, contract_id: Uuid, due_date: NaiveDate, amount_due: Decimal) -> Uuid {
        let outstanding_payment_id = Uuid::new_v4();
        self.state.lock().unwrap().payments.push(OutstandingPayment {
            outstanding_payment_id,
            contract_id,
            due_date,
            amount_due,
            status: PaymentStatus::Unpaid.as_str().to_string(),
            billed_month: None,
            created_utc: Utc::now(),
        });
        outstanding_payment_id
    }

    pub fn payments(&self) -> Vec<OutstandingPayment> {
        self.state.lock().unwrap().payments.clone()
    }

    pub fn set_payment_status(&self, outstanding_payment_id: Uuid, status: PaymentStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(payment) = state
            .payments
            .iter_mut()
            .find(|p| p.outstanding_payment_id == outstanding_payment_id)
        {
            payment.status = status.as_str().to_string();
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Make the existence check miss so only the uniqueness rule on insert
    /// catches a second bill, as when two generations race.
    pub fn hide_existing_payments(&self, hide: bool) {
        self.hide_existing_payments.store(hide, Ordering::SeqCst);
    }

    fn bill_for_room_month(
        state: &StoreState,
        room_id: Uuid,
        billed_month: NaiveDate,
    ) -> Option<&OutstandingPayment> {
        state.payments.iter().find(|p| {
            p.billed_month == Some(billed_month)
                && state.billed_rooms.get(&p.outstanding_payment_id) == Some(&room_id)
        })
    }

    fn detail(state: &StoreState, payment: &OutstandingPayment) -> Option<OutstandingPaymentDetail> {
        let contract = state
            .contracts
            .iter()
            .find(|c| c.contract_id == payment.contract_id)?;
        let room = state.rooms.get(&contract.room_id)?;
        let tenant_name = state.tenants.get(&contract.tenant_id)?;
        Some(OutstandingPaymentDetail {
            outstanding_payment_id: payment.outstanding_payment_id,
            contract_id: payment.contract_id,
            due_date: payment.due_date,
            amount_due: payment.amount_due,
            status: payment.status.clone(),
            created_utc: payment.created_utc,
            room_id: contract.room_id,
            room_number: room.room_number.clone(),
            tenant_id: contract.tenant_id,
            tenant_name: tenant_name.clone(),
        })
    }
}

#[async_trait]
impl ContractStore for InMemoryStore {
    async fn find_active_contract_by_room(
        &self,
        room_id: Uuid,
    ) -> Result<Option<ActiveContract>, AppError> {
        let state = self.state.lock().unwrap();
        let contract = state
            .contracts
            .iter()
            .filter(|c| c.room_id == room_id && c.contract_status() == ContractStatus::Active)
            .max_by_key(|c| c.start_date);

        Ok(contract.and_then(|c| {
            let room = state.rooms.get(&c.room_id)?;
            let tenant_name = state.tenants.get(&c.tenant_id)?;
            Some(ActiveContract {
                contract_id: c.contract_id,
                room_id: c.room_id,
                tenant_id: c.tenant_id,
                status: c.status.clone(),
                start_date: c.start_date,
                end_date: c.end_date,
                room_number: room.room_number.clone(),
                room_price: room.price,
                tenant_name: tenant_name.clone(),
            })
        }))
    }

    async fn find_active_contract_room_ids(&self) -> Result<Vec<Uuid>, AppError> {
        let state = self.state.lock().unwrap();
        let mut room_ids: Vec<Uuid> = state
            .contracts
            .iter()
            .filter(|c| c.contract_status() == ContractStatus::Active)
            .map(|c| c.room_id)
            .collect();
        room_ids.sort();
        room_ids.dedup();
        Ok(room_ids)
    }

    async fn find_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .contracts
            .iter()
            .find(|c| c.contract_id == contract_id)
            .cloned())
    }
}

#[async_trait]
impl MeterReadingStore for InMemoryStore {
    async fn find_reading_in_window(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<MeterReading>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .readings
            .iter()
            .filter(|r| r.room_id == room_id && r.month >= start && r.month < end)
            .min_by_key(|r| r.month)
            .cloned())
    }

    async fn find_latest_reading(&self, room_id: Uuid) -> Result<Option<MeterReading>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .readings
            .iter()
            .filter(|r| r.room_id == room_id)
            .max_by_key(|r| r.recorded_date)
            .cloned())
    }

    async fn create_reading(&self, input: &RecordMeterReading) -> Result<MeterReading, AppError> {
        let mut state = self.state.lock().unwrap();
        if state
            .readings
            .iter()
            .any(|r| r.room_id == input.room_id && r.month == input.month)
        {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "A meter reading for this room and month already exists"
            )));
        }

        let reading = MeterReading {
            reading_id: Uuid::new_v4(),
            room_id: input.room_id,
            contract_id: input.contract_id,
            month: input.month,
            water_old: input.water_old,
            water_new: input.water_new,
            electric_old: input.electric_old,
            electric_new: input.electric_new,
            recorded_date: input.recorded_date,
            created_utc: Utc::now(),
        };
        state.readings.push(reading.clone());
        Ok(reading)
    }
}

#[async_trait]
impl UtilityRateStore for InMemoryStore {
    async fn find_latest_rate(
        &self,
        kind: UtilityKind,
        as_of: DateTime<Utc>,
    ) -> Result<Option<UtilityRate>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .rates
            .iter()
            .filter(|r| r.kind == kind.as_str() && r.effective_from <= as_of)
            .max_by_key(|r| (r.effective_from, r.created_utc))
            .cloned())
    }

    async fn create_rate(&self, input: &CreateUtilityRate) -> Result<UtilityRate, AppError> {
        let rate = UtilityRate {
            rate_id: Uuid::new_v4(),
            kind: input.kind.as_str().to_string(),
            rate_per_unit: input.rate_per_unit,
            effective_from: input.effective_from,
            created_utc: Utc::now(),
        };
        self.state.lock().unwrap().rates.push(rate.clone());
        Ok(rate)
    }

    async fn list_rates(&self) -> Result<Vec<UtilityRate>, AppError> {
        let mut rates = self.state.lock().unwrap().rates.clone();
        rates.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| b.effective_from.cmp(&a.effective_from))
        });
        Ok(rates)
    }

    async fn rate_history(
        &self,
        kind: UtilityKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UtilityRate>, AppError> {
        let state = self.state.lock().unwrap();
        let mut rates: Vec<UtilityRate> = state
            .rates
            .iter()
            .filter(|r| {
                r.kind == kind.as_str() && r.effective_from >= start && r.effective_from <= end
            })
            .cloned()
            .collect();
        rates.sort_by(|a, b| b.effective_from.cmp(&a.effective_from));
        Ok(rates)
    }

    async fn find_rate(&self, rate_id: Uuid) -> Result<Option<UtilityRate>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state.rates.iter().find(|r| r.rate_id == rate_id).cloned())
    }

    async fn delete_rate(&self, rate_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().unwrap();
        let before = state.rates.len();
        state.rates.retain(|r| r.rate_id != rate_id);
        Ok(state.rates.len() < before)
    }
}

#[async_trait]
impl OutstandingPaymentStore for InMemoryStore {
    async fn create_outstanding_payment(
        &self,
        input: &CreateOutstandingPayment,
    ) -> Result<OutstandingPayment, AppError> {
        let mut state = self.state.lock().unwrap();
        if Self::bill_for_room_month(&state, input.room_id, input.billed_month).is_some() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Room already has a bill for the month starting {}",
                input.billed_month
            )));
        }

        let payment = OutstandingPayment {
            outstanding_payment_id: Uuid::new_v4(),
            contract_id: input.contract_id,
            due_date: input.due_date,
            amount_due: input.amount_due,
            status: input.status.as_str().to_string(),
            billed_month: Some(input.billed_month),
            created_utc: Utc::now(),
        };
        state
            .billed_rooms
            .insert(payment.outstanding_payment_id, input.room_id);
        state.payments.push(payment.clone());
        Ok(payment)
    }

    async fn find_bill_for_room_month(
        &self,
        room_id: Uuid,
        billed_month: NaiveDate,
    ) -> Result<Option<OutstandingPayment>, AppError> {
        if self.hide_existing_payments.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let state = self.state.lock().unwrap();
        Ok(Self::bill_for_room_month(&state, room_id, billed_month).cloned())
    }

    async fn find_payment_by_room_in_due_window(
        &self,
        room_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<OutstandingPaymentDetail>, AppError> {
        let state = self.state.lock().unwrap();
        let mut details: Vec<OutstandingPaymentDetail> = state
            .payments
            .iter()
            .filter(|p| p.due_date >= start && p.due_date < end)
            .filter_map(|p| Self::detail(&state, p))
            .filter(|d| d.room_id == room_id)
            .collect();
        details.sort_by_key(|d| (d.due_date, d.created_utc));
        Ok(details.into_iter().next())
    }

    async fn find_payments_in_due_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OutstandingPaymentDetail>, AppError> {
        let state = self.state.lock().unwrap();
        let mut details: Vec<OutstandingPaymentDetail> = state
            .payments
            .iter()
            .filter(|p| p.due_date >= start && p.due_date < end)
            .filter_map(|p| Self::detail(&state, p))
            .collect();
        details.sort_by(|a, b| {
            a.room_number
                .cmp(&b.room_number)
                .then_with(|| a.due_date.cmp(&b.due_date))
        });
        Ok(details)
    }
}

#[async_trait]
impl BillingStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::DatabaseError(anyhow::anyhow!("store offline")))
        }
    }
}

/// Ids of a seeded room with an active contract.
#[derive(Debug, Clone, Copy)]
pub struct RoomFixture {
    pub room_id: Uuid,
    pub tenant_id: Uuid,
    pub contract_id: Uuid,
}

/// Water at 2,000 and electricity at 800 per unit, in force since 2020.
pub fn seed_standard_rates(store: &InMemoryStore) {
    store.add_rate(UtilityKind::Water, dec!(2000), instant(2020, 1, 1));
    store.add_rate(UtilityKind::Electric, dec!(800), instant(2020, 1, 1));
}

pub fn seed_rented_room(store: &InMemoryStore, room_number: &str, rent: Option<Decimal>) -> RoomFixture {
    let room_id = store.add_room(room_number, rent);
    let tenant_id = store.add_tenant(&format!("Tenant of {}", room_number));
    let contract_id = store.add_contract(room_id, tenant_id, ContractStatus::Active);
    RoomFixture {
        room_id,
        tenant_id,
        contract_id,
    }
}

/// Room "101" at 500,000 rent with readings for `year`-`month` and the month
/// before: water 10 -> 15, electricity 100 -> 140.
pub fn seed_room_101(store: &InMemoryStore, month: u32, year: i32) -> RoomFixture {
    let room = seed_rented_room(store, "101", Some(dec!(500000)));
    let current = date(year, month, 1);
    let previous = date(year, month, 1) - chrono::Months::new(1);
    store.add_reading(
        room.room_id,
        room.contract_id,
        previous,
        (dec!(0), dec!(10)),
        (dec!(0), dec!(100)),
    );
    store.add_reading(
        room.room_id,
        room.contract_id,
        current,
        (dec!(10), dec!(15)),
        (dec!(100), dec!(140)),
    );
    room
}

pub fn engine(store: &Arc<InMemoryStore>) -> BillingEngine {
    init_metrics();
    BillingEngine::new(store.clone())
}

pub fn test_config(rules: BillingRules) -> BillingConfig {
    BillingConfig {
        common: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
        },
        service_name: "rental-billing-service-test".to_string(),
        log_level: "warn".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 0,
        },
        billing: rules,
    }
}

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<InMemoryStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(BillingRules::default()).await
    }

    /// Spawn the application over a fresh in-memory store on a random port.
    pub async fn spawn_with(rules: BillingRules) -> Self {
        init_metrics();

        let store = InMemoryStore::new();
        let app = Application::build_with_store(test_config(rules), store.clone())
            .await
            .expect("Failed to build test application");

        let port = app.http_port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();

        // Wait for HTTP server to be ready by polling health endpoint
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            store,
            client,
        }
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

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Parse a money field from a JSON body; amounts are serialised as strings.
pub fn amount(value: &serde_json::Value) -> Decimal {
    value
        .as_str()
        .expect("amount should be a string")
        .parse()
        .expect("amount should be a decimal")
}
