//! Payment Highway card payment gateway for a web store
//!
//! Builds signed redirects to the hosted card forms, verifies and commits
//! the returns, charges saved card tokens, and refunds paid orders.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod payments;

pub use error::{GatewayError, GatewayResult};
