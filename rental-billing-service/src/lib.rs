//! Rental billing service: monthly rent and utility bills for rooms with
//! active contracts.

pub mod billing;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
