//! Vendor API clients

pub mod payment_highway;

pub use payment_highway::{PaymentHighwayClient, PaymentHighwayConfig};
