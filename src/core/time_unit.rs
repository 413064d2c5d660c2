use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Saturates instead of overflowing.
    pub fn to_duration(self, amount: u64) -> Duration {
        match self {
            TimeUnit::Nanoseconds => Duration::from_nanos(amount),
            TimeUnit::Microseconds => Duration::from_micros(amount),
            TimeUnit::Milliseconds => Duration::from_millis(amount),
            TimeUnit::Seconds => Duration::from_secs(amount),
            TimeUnit::Minutes => Duration::from_secs(amount.saturating_mul(60)),
            TimeUnit::Hours => Duration::from_secs(amount.saturating_mul(60 * 60)),
            TimeUnit::Days => Duration::from_secs(amount.saturating_mul(24 * 60 * 60)),
        }
    }
}
