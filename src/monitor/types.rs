use crate::scheduler::ActionValue;
use crate::vehicle::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-vehicle monitoring state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonitorState {
    /// Nothing trusted yet; poll everything
    #[default]
    Unknown,
    /// Vehicle reported asleep, offline or inactive
    #[serde(rename = "inactive")]
    Inactive,
    /// Idle and expected to fall asleep
    #[serde(rename = "to_sleep")]
    ToSleep,
    /// Something happened within the recency window
    #[serde(rename = "recent")]
    Recent,
    #[serde(rename = "charging")]
    Charging,
    /// Drive gear engaged
    #[serde(rename = "running")]
    Running,
    /// Preparing for a departure or a conditioning request
    #[serde(rename = "prep")]
    Prep,
    /// Recovering from a failed cycle
    #[serde(rename = "disaster")]
    Disaster,
}

impl MonitorState {
    pub const ALL: [Self; 8] = [
        Self::Unknown,
        Self::Inactive,
        Self::ToSleep,
        Self::Recent,
        Self::Charging,
        Self::Running,
        Self::Prep,
        Self::Disaster,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Inactive => "inactive",
            Self::ToSleep => "to_sleep",
            Self::Recent => "recent",
            Self::Charging => "charging",
            Self::Running => "running",
            Self::Prep => "prep",
            Self::Disaster => "disaster",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which telemetry the next poll requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Overall state only
    None,
    Partial(Category),
    Full,
}

impl Scope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Partial(category) => category.as_str(),
            Self::Full => "full",
        }
    }
}

/// A command routed to one vehicle's monitor
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleCommand {
    /// Precondition now
    AutoCondition {
        level: Option<ActionValue>,
        temp: Option<f64>,
        autoresetlimit: Option<ActionValue>,
    },
    /// Be ready by `departure_time`
    Departure {
        departure_time: ActionValue,
        departure_level: Option<ActionValue>,
        autoresetlimit: Option<ActionValue>,
    },
    Quit,
}

impl VehicleCommand {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AutoCondition { .. } => "autocondition",
            Self::Departure { .. } => "departure",
            Self::Quit => "quit",
        }
    }
}
