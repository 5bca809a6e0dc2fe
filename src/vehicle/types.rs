use serde::{Deserialize, Serialize};

/// Overall reachability reported by the vehicle API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleState {
    /// Awake and answering data requests
    #[serde(alias = "awake")]
    Online,
    Asleep,
    Offline,
    Inactive,
    #[serde(other)]
    Unknown,
}

impl VehicleState {
    /// Asleep, offline or inactive: data requests would not be answered
    pub const fn is_dormant(self) -> bool {
        matches!(self, Self::Asleep | Self::Offline | Self::Inactive)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Asleep => "asleep",
            Self::Offline => "offline",
            Self::Inactive => "inactive",
            Self::Unknown => "unknown",
        }
    }
}

/// Gear selector position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftState {
    #[serde(rename = "P")]
    Park,
    #[serde(rename = "D")]
    Drive,
    #[serde(rename = "R")]
    Reverse,
    #[serde(rename = "N")]
    Neutral,
}

/// Charging sub-state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeState {
    /// Configured charge limit in percent
    pub charge_limit_soc: i64,
    /// Usable battery level in percent
    pub usable_battery_level: i64,
    /// Charger power in kW; absent when no charger is attached
    #[serde(default)]
    pub charger_power: Option<f64>,
    #[serde(default)]
    pub battery_level: Option<i64>,
    #[serde(default)]
    pub charging_state: Option<String>,
}

impl ChargeState {
    pub fn is_drawing_power(&self) -> bool {
        self.charger_power.is_some_and(|p| p > 0.0)
    }
}

/// Climate sub-state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateState {
    pub is_climate_on: bool,
    #[serde(default)]
    pub inside_temp: Option<f64>,
    #[serde(default)]
    pub driver_temp_setting: Option<f64>,
}

/// Drive sub-state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveState {
    #[serde(default)]
    pub shift_state: Option<ShiftState>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl DriveState {
    /// Drive, reverse or neutral selected
    pub fn gear_engaged(&self) -> bool {
        matches!(
            self.shift_state,
            Some(ShiftState::Drive | ShiftState::Reverse | ShiftState::Neutral)
        )
    }
}

/// Telemetry categories that can be requested individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Overall state only; answered without waking the vehicle
    State,
    ChargeState,
    ClimateState,
    DriveState,
}

impl Category {
    /// Categories that make up a full snapshot
    pub const DATA: [Self; 3] = [Self::ChargeState, Self::ClimateState, Self::DriveState];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::ChargeState => "charge_state",
            Self::ClimateState => "climate_state",
            Self::DriveState => "drive_state",
        }
    }
}

/// A single point-in-time read of vehicle telemetry.
///
/// Only the categories that were requested are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub state: VehicleState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_state: Option<ChargeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate_state: Option<ClimateState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_state: Option<DriveState>,
    /// Epoch seconds at retrieval
    pub retrieved_at: i64,
}

impl VehicleSnapshot {
    /// Snapshot carrying only the overall state
    pub const fn state_only(state: VehicleState, retrieved_at: i64) -> Self {
        Self {
            state,
            charge_state: None,
            climate_state: None,
            drive_state: None,
            retrieved_at,
        }
    }

    pub fn climate_on(&self) -> bool {
        self.climate_state.as_ref().is_some_and(|c| c.is_climate_on)
    }

    pub fn charging(&self) -> bool {
        self.charge_state
            .as_ref()
            .is_some_and(ChargeState::is_drawing_power)
    }

    pub fn gear_engaged(&self) -> bool {
        self.drive_state.as_ref().is_some_and(DriveState::gear_engaged)
    }
}

/// Identity of a vehicle on the account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleIdentity {
    /// API id, addressed as `carid` on the command channel
    pub id: u64,
    #[serde(default)]
    pub vin: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl VehicleIdentity {
    /// Name used in logs and the merged view
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.vin.clone())
            .unwrap_or_else(|| self.id.to_string())
    }
}
