//! Wall-clock source in epoch seconds
//!
//! Decisions in the state machine and the scheduler take `now` as an argument;
//! only the monitor loop asks a `Clock` for it.

use std::sync::Arc;

pub trait Clock: Send + Sync {
    /// Current time in whole seconds since the Unix epoch
    fn now(&self) -> i64;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock that follows the tokio timer, so paused test time moves it too
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    base_epoch: i64,
    started: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(base_epoch: i64) -> Self {
        Self {
            base_epoch,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> i64 {
        let elapsed = self.started.elapsed().as_secs();
        self.base_epoch + i64::try_from(elapsed).unwrap_or(i64::MAX - self.base_epoch)
    }
}

pub type SharedClock = Arc<dyn Clock>;

pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}
