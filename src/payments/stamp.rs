//! Per-request timestamp and request id
//!
//! Every signed form and API call carries `sph-timestamp` and
//! `sph-request-id`. They are drawn from a [`StampSource`] so form output
//! stays reproducible under a fixed source.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStamp {
    /// UTC, `YYYY-MM-DDTHH:MM:SSZ`
    pub timestamp: String,
    pub request_id: String,
}

impl RequestStamp {
    pub fn at(time: DateTime<Utc>, request_id: impl Into<String>) -> Self {
        Self {
            timestamp: time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            request_id: request_id.into(),
        }
    }
}

pub trait StampSource: Send + Sync {
    fn stamp(&self) -> RequestStamp;
}

/// Wall clock plus a random UUID
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemStamp;

impl StampSource for SystemStamp {
    fn stamp(&self) -> RequestStamp {
        RequestStamp::at(Utc::now(), Uuid::new_v4().to_string())
    }
}

/// Always returns the same stamp
#[derive(Debug, Clone)]
pub struct FixedStamp(pub RequestStamp);

impl StampSource for FixedStamp {
    fn stamp(&self) -> RequestStamp {
        self.0.clone()
    }
}
