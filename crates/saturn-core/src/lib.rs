pub mod account;
pub mod anomaly;
pub mod channel;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod health;
pub mod incident;
pub mod maintenance;
pub mod monitor;
pub mod ping;
pub mod rate_limit;
pub mod redact;
pub mod robots;
pub mod schedule;
pub mod store;
pub mod token;
pub mod types;
pub mod webhook;
pub mod welford;

pub use error::{Result, SaturnError};
