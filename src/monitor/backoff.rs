use std::time::Duration;

const MAX_LEVEL: u32 = 3;

/// Bounded exponential backoff after a failed cycle: `base * 10^level` seconds
#[derive(Debug, Clone)]
pub struct Backoff {
    base_secs: u64,
    level: u32,
}

impl Backoff {
    pub const fn new(base_secs: u64) -> Self {
        Self {
            base_secs,
            level: 1,
        }
    }

    /// Raise the level (capped) and return the delay for it
    pub fn next_delay(&mut self) -> Duration {
        self.level = (self.level + 1).min(MAX_LEVEL);
        Duration::from_secs(self.base_secs.saturating_mul(10u64.pow(self.level)))
    }

    pub const fn reset(&mut self) {
        self.level = 1;
    }

    pub const fn level(&self) -> u32 {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_to_cap_and_resets() {
        let mut backoff = Backoff::new(6);
        assert_eq!(backoff.next_delay(), Duration::from_secs(600));
        assert_eq!(backoff.next_delay(), Duration::from_secs(6000));
        assert_eq!(backoff.next_delay(), Duration::from_secs(6000));
        assert_eq!(backoff.level(), 3);
        backoff.reset();
        assert_eq!(backoff.level(), 1);
        assert_eq!(backoff.next_delay(), Duration::from_secs(600));
    }
}
