//! HTTP handlers for rental-billing-service.

pub mod bills;
pub mod health;
pub mod meter_readings;
pub mod utility_rates;

pub use bills::{
    generate_bill_for_room, generate_bills_for_active_rooms, generate_bills_for_rooms,
    get_bill_by_room, get_bill_statistics,
};
pub use health::{health_check, metrics, readiness_check};
pub use meter_readings::{get_latest_meter_reading, record_meter_reading};
pub use utility_rates::{
    create_utility_rate, delete_utility_rate, get_current_utility_rate,
    get_utility_rate_history, list_utility_rates,
};
