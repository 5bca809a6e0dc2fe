//! Latest-known view of every vehicle
//!
//! Each category keeps its own timestamp; categories may be of different ages
//! and callers must not assume they agree with each other. A vehicle's entry
//! is written only by that vehicle's monitor.

use crate::monitor::MonitorState;
use crate::scheduler::{ActionError, OutstandingActions};
use crate::vehicle::{ChargeState, ClimateState, DriveState, VehicleSnapshot, VehicleState};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleView {
    /// Display name, or the id when the vehicle has none
    pub label: String,
    pub state: Option<VehicleState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_state: Option<ChargeState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub climate_state: Option<ClimateState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_state: Option<DriveState>,
    /// Retrieval time per category
    pub updated_at: BTreeMap<&'static str, i64>,
    pub current_state: MonitorState,
    pub last_active_time: Option<i64>,
    pub pending: OutstandingActions,
}

impl VehicleView {
    /// Fold the categories present in `snapshot` into the view
    pub fn merge(&mut self, snapshot: &VehicleSnapshot) {
        let at = snapshot.retrieved_at;
        self.state = Some(snapshot.state);
        self.updated_at.insert("state", at);
        if let Some(charge) = &snapshot.charge_state {
            self.charge_state = Some(charge.clone());
            self.updated_at.insert("charge_state", at);
        }
        if let Some(climate) = &snapshot.climate_state {
            self.climate_state = Some(climate.clone());
            self.updated_at.insert("climate_state", at);
        }
        if let Some(drive) = &snapshot.drive_state {
            self.drive_state = Some(drive.clone());
            self.updated_at.insert("drive_state", at);
        }
    }

    pub fn charge_limit(&self) -> Result<i64, ActionError> {
        self.charge_state
            .as_ref()
            .map(|c| c.charge_limit_soc)
            .ok_or(ActionError::MissingData("charge_state.charge_limit_soc"))
    }

    pub fn usable_level(&self) -> Result<i64, ActionError> {
        self.charge_state
            .as_ref()
            .map(|c| c.usable_battery_level)
            .ok_or(ActionError::MissingData("charge_state.usable_battery_level"))
    }

    pub fn climate_on(&self) -> bool {
        self.climate_state.as_ref().is_some_and(|c| c.is_climate_on)
    }

    pub fn gear_engaged(&self) -> bool {
        self.drive_state.as_ref().is_some_and(DriveState::gear_engaged)
    }

    /// Record a charge limit the vehicle accepted
    pub fn note_charge_limit(&mut self, percent: i64) {
        if let Some(charge) = self.charge_state.as_mut() {
            charge.charge_limit_soc = percent;
        }
    }

    /// Record that climate was switched on
    pub fn note_climate_on(&mut self) {
        match self.climate_state.as_mut() {
            Some(climate) => climate.is_climate_on = true,
            None => {
                self.climate_state = Some(ClimateState {
                    is_climate_on: true,
                    inside_temp: None,
                    driver_temp_setting: None,
                });
            }
        }
    }
}

/// Views of all vehicles keyed by vehicle id, shared with the command listener
#[derive(Debug, Clone, Default)]
pub struct SharedView {
    inner: Arc<RwLock<BTreeMap<u64, VehicleView>>>,
}

impl SharedView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, id: u64, view: &VehicleView) {
        self.inner.write().await.insert(id, view.clone());
    }

    pub async fn get(&self, id: u64) -> Option<VehicleView> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Every view as one JSON object
    pub async fn snapshot_json(&self) -> Value {
        let guard = self.inner.read().await;
        serde_json::to_value(&*guard).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn charge(limit: i64, usable: i64) -> ChargeState {
        ChargeState {
            charge_limit_soc: limit,
            usable_battery_level: usable,
            charger_power: None,
            battery_level: None,
            charging_state: None,
        }
    }

    #[test]
    fn merge_keeps_older_categories() {
        let mut view = VehicleView::default();
        let mut full = VehicleSnapshot::state_only(VehicleState::Online, 100);
        full.charge_state = Some(charge(70, 40));
        view.merge(&full);

        view.merge(&VehicleSnapshot::state_only(VehicleState::Asleep, 200));
        assert_eq!(view.state, Some(VehicleState::Asleep));
        assert_eq!(view.charge_limit(), Ok(70));
        assert_eq!(view.updated_at.get("state"), Some(&200));
        assert_eq!(view.updated_at.get("charge_state"), Some(&100));
    }

    #[test]
    fn missing_charge_data() {
        let view = VehicleView::default();
        assert_eq!(
            view.charge_limit(),
            Err(ActionError::MissingData("charge_state.charge_limit_soc"))
        );
    }

    #[test]
    fn optimistic_updates() {
        let mut view = VehicleView {
            charge_state: Some(charge(70, 40)),
            ..Default::default()
        };
        view.note_charge_limit(80);
        view.note_climate_on();
        assert_eq!(view.charge_limit(), Ok(80));
        assert!(view.climate_on());
    }

    #[tokio::test]
    async fn shared_view_serializes_by_id() {
        let shared = SharedView::new();
        let view = VehicleView {
            label: "Blue".into(),
            current_state: MonitorState::Charging,
            ..Default::default()
        };
        shared.publish(101, &view).await;
        let json = shared.snapshot_json().await;
        assert_eq!(json["101"]["current_state"], "charging");
        assert_eq!(json["101"]["label"], "Blue");
        assert!(shared.get(202).await.is_none());
    }

    #[tokio::test]
    async fn same_display_name_keeps_both_vehicles() {
        let shared = SharedView::new();
        let running = VehicleView {
            label: "Model 3".into(),
            current_state: MonitorState::Running,
            ..Default::default()
        };
        let asleep = VehicleView {
            label: "Model 3".into(),
            current_state: MonitorState::Inactive,
            ..Default::default()
        };
        shared.publish(1, &running).await;
        shared.publish(2, &asleep).await;
        assert_eq!(
            shared.get(1).await.map(|v| v.current_state),
            Some(MonitorState::Running)
        );
        assert_eq!(
            shared.get(2).await.map(|v| v.current_state),
            Some(MonitorState::Inactive)
        );
        let json = shared.snapshot_json().await;
        assert_eq!(json.as_object().map(|m| m.len()), Some(2));
    }
}
