//! Transient error banners.
//!
//! Errors shown to users are plain messages that dismiss themselves after a
//! short interval.

use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

pub const BANNER_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub message: String,
    #[serde(rename = "dismissAfterMs", serialize_with = "as_millis")]
    pub ttl: Duration,
    #[serde(skip)]
    pub raised_at: Instant,
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl Banner {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_ttl(message, BANNER_TTL)
    }

    pub fn with_ttl(message: impl Into<String>, ttl: Duration) -> Self {
        Self { message: message.into(), ttl, raised_at: Instant::now() }
    }

    pub fn is_visible_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) < self.ttl
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible_at(Instant::now())
    }
}
