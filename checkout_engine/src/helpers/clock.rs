use chrono::{DateTime, Utc};

/// A source of the current time. The rate cache and webhook signature checks read time through this trait so that
/// tests can move it around freely.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
