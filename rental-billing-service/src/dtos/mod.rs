//! Request shapes. Fields are optional so a missing value is reported as a
//! 400 naming the field, then each request is converted into typed input.

pub mod admin;
pub mod bills;

pub use admin::{
    kind_from_path, CreateUtilityRateRequest, RateHistoryQuery, RecordMeterReadingRequest,
};
pub use bills::{
    BillQuery, GenerateBillRequest, GenerateBillsCommand, GenerateBillsRequest, StatisticsQuery,
};
