//! Next-state rules
//!
//! [`StateMachine::step`] is pure: given the previous state, what the last poll
//! asked for, the snapshot it returned, and the activity timers, it yields the
//! next state, the scope of the next poll and the updated timers.

use super::types::{MonitorState, Scope};
use crate::intervals::IntervalTable;
use crate::vehicle::{Category, VehicleSnapshot};
use std::sync::Arc;

/// Timestamps the rules depend on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityTimers {
    /// Last poll that requested every category
    pub last_full: Option<i64>,
    /// Last time climate, charging or driving was observed
    pub last_active: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next_state: MonitorState,
    pub next_scope: Scope,
    pub timers: ActivityTimers,
}

#[derive(Debug, Clone)]
pub struct StateMachine {
    intervals: Arc<IntervalTable>,
}

impl StateMachine {
    pub const fn new(intervals: Arc<IntervalTable>) -> Self {
        Self { intervals }
    }

    pub fn step(
        &self,
        previous: MonitorState,
        polled: Scope,
        snapshot: &VehicleSnapshot,
        timers: ActivityTimers,
        now: i64,
    ) -> Transition {
        let mut timers = timers;
        if polled == Scope::Full {
            timers.last_full = Some(now);
        }

        let previous = match previous {
            MonitorState::Disaster => MonitorState::Unknown,
            other => other,
        };

        let mut next = if snapshot.state.is_dormant() {
            MonitorState::Inactive
        } else if previous == MonitorState::ToSleep {
            MonitorState::Unknown
        } else if previous == MonitorState::Inactive && polled != Scope::Full {
            MonitorState::Unknown
        } else {
            MonitorState::ToSleep
        };

        let window = as_secs(self.intervals.recent_window_secs());
        if timers.last_active.is_some_and(|t| now.saturating_sub(t) <= window) {
            next = MonitorState::Recent;
        }
        if snapshot.climate_on() {
            next = MonitorState::Recent;
            timers.last_active = Some(now);
        }
        if snapshot.charging() {
            next = MonitorState::Charging;
            timers.last_active = Some(now);
        }
        if snapshot.gear_engaged() {
            next = MonitorState::Running;
            timers.last_active = Some(now);
        }

        Transition {
            next_state: next,
            next_scope: self.scope_for(next, timers, now),
            timers,
        }
    }

    /// Scope of the poll made while in `state`
    pub fn scope_for(&self, state: MonitorState, timers: ActivityTimers, now: i64) -> Scope {
        let refresh = as_secs(self.intervals.full_refresh_secs(state));
        if timers.last_full.is_some_and(|t| now.saturating_sub(t) > refresh) {
            return Scope::Full;
        }
        base_scope(state)
    }
}

fn as_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

const fn base_scope(state: MonitorState) -> Scope {
    match state {
        MonitorState::Unknown
        | MonitorState::Prep
        | MonitorState::Recent
        | MonitorState::Disaster => Scope::Full,
        MonitorState::Charging => Scope::Partial(Category::ChargeState),
        MonitorState::Running => Scope::Partial(Category::DriveState),
        MonitorState::Inactive | MonitorState::ToSleep => Scope::None,
    }
}
