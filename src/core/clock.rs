//! Wall-clock source used by time-based rotation
//!
//! Production code reads the local system time. Tests substitute a
//! [`ManualClock`] and move it forward explicitly.

use chrono::{Duration, Local, NaiveDateTime};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Source of the current local date and time
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> NaiveDateTime;
}

/// Shared clock handle
pub type ClockRef = Arc<dyn Clock>;

/// Reads the system's local time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
///
/// Cloning shares the same underlying time, so a test can keep one handle
/// while a sink holds another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}
