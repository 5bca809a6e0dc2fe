//! Interval table: how long to sleep in each monitor state and how often a
//! full refresh is forced.
//!
//! Keys are the state names (`Unknown`, `inactive`, `to_sleep`, `recent`,
//! `charging`, `running`, `prep`, `disaster`), `<state>_poll` for a
//! state-specific full-refresh period, `any_poll` for the general one and
//! `recent_window` for the recency window. The table is built once at startup
//! and shared read-only afterwards.

use crate::error::{Result, VigilError};
use crate::monitor::MonitorState;
use std::collections::HashMap;
use std::time::Duration;

const ANY_POLL: &str = "any_poll";
const RECENT_WINDOW: &str = "recent_window";
const POLL_SUFFIX: &str = "_poll";

/// Longest accepted interval: thirty days
pub const MAX_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTable {
    sleep: HashMap<MonitorState, u64>,
    poll: HashMap<MonitorState, u64>,
    any_poll: u64,
    recent_window: u64,
}

impl Default for IntervalTable {
    fn default() -> Self {
        let sleep = HashMap::from([
            (MonitorState::Unknown, 60),
            (MonitorState::Inactive, 120),
            (MonitorState::ToSleep, 300),
            (MonitorState::Recent, 60),
            (MonitorState::Charging, 300),
            (MonitorState::Running, 30),
            (MonitorState::Prep, 30),
            (MonitorState::Disaster, 60),
        ]);
        let poll = HashMap::from([(MonitorState::Charging, 1800), (MonitorState::Running, 600)]);
        Self {
            sleep,
            poll,
            any_poll: 3600,
            recent_window: 600,
        }
    }
}

impl IntervalTable {
    /// Seconds to sleep after a cycle that started in `state`
    pub fn sleep_secs(&self, state: MonitorState) -> u64 {
        self.sleep.get(&state).copied().unwrap_or(self.any_poll)
    }

    pub fn sleep(&self, state: MonitorState) -> Duration {
        Duration::from_secs(self.sleep_secs(state))
    }

    /// Age after which a full refresh is forced while in `state`: the
    /// state's own period or `any_poll`, whichever is shorter
    pub fn full_refresh_secs(&self, state: MonitorState) -> u64 {
        self.poll
            .get(&state)
            .map_or(self.any_poll, |&secs| secs.min(self.any_poll))
    }

    /// How long after the last activity the vehicle still counts as recent
    pub const fn recent_window_secs(&self) -> u64 {
        self.recent_window
    }

    /// Set a single named interval
    pub fn set(&mut self, key: &str, secs: u64) -> Result<()> {
        if secs == 0 {
            return Err(VigilError::validation(
                format!("intervals.{key}"),
                "Must be greater than 0".to_string(),
            ));
        }
        if secs > MAX_INTERVAL_SECS {
            return Err(VigilError::validation(
                format!("intervals.{key}"),
                format!("Must be at most {MAX_INTERVAL_SECS}"),
            ));
        }
        if key == ANY_POLL {
            self.any_poll = secs;
        } else if key == RECENT_WINDOW {
            self.recent_window = secs;
        } else if let Some(state) = MonitorState::from_name(key) {
            self.sleep.insert(state, secs);
        } else if let Some(state) = key
            .strip_suffix(POLL_SUFFIX)
            .and_then(MonitorState::from_name)
        {
            self.poll.insert(state, secs);
        } else {
            return Err(VigilError::config(format!("Unknown interval key: {key}")));
        }
        Ok(())
    }

    /// Apply named overrides on top of the current values
    pub fn apply_overrides<'a, I>(&mut self, overrides: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a String, &'a u64)>,
    {
        for (key, secs) in overrides {
            self.set(key, *secs)?;
        }
        Ok(())
    }
}

/// Parse `key=seconds` pairs separated by commas or whitespace
pub fn parse_overrides(raw: &str) -> Result<Vec<(String, u64)>> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| VigilError::config(format!("Expected key=seconds, got '{part}'")))?;
            let secs = value.trim().parse::<u64>().map_err(|_| {
                VigilError::config(format!("Interval '{key}' is not a whole number: '{value}'"))
            })?;
            Ok((key.trim().to_string(), secs))
        })
        .collect()
}
