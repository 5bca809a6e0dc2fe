use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Mutex;
use vigil::error::Result;
use vigil::scheduler::{
    ActionValue, OutstandingActions, PlannedCommand, Scheduler, calculate_delta_s,
};
use vigil::vehicle::{
    Category, ChargeState, ClimateState, DriveState, ShiftState, VehicleClient, VehicleIdentity,
    VehicleSnapshot, VehicleState,
};
use vigil::view::VehicleView;

const NOW: i64 = 1_700_000_000;

struct RecordingClient {
    identity: VehicleIdentity,
    sent: Mutex<Vec<(String, Value)>>,
}

impl RecordingClient {
    fn new() -> Self {
        Self {
            identity: VehicleIdentity {
                id: 1,
                vin: None,
                display_name: Some("Blue".into()),
            },
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl VehicleClient for RecordingClient {
    fn identity(&self) -> &VehicleIdentity {
        &self.identity
    }

    async fn get_full_snapshot(&self) -> Result<VehicleSnapshot> {
        Ok(VehicleSnapshot::state_only(VehicleState::Online, NOW))
    }

    async fn get_category(&self, _category: Category) -> Result<VehicleSnapshot> {
        Ok(VehicleSnapshot::state_only(VehicleState::Online, NOW))
    }

    async fn wake(&self) -> Result<()> {
        Ok(())
    }

    async fn send_command(&self, name: &str, params: Value) -> Result<()> {
        self.sent.lock().unwrap().push((name.to_string(), params));
        Ok(())
    }
}

fn view(limit: i64, usable: i64) -> VehicleView {
    let mut snapshot = VehicleSnapshot::state_only(VehicleState::Online, NOW);
    snapshot.charge_state = Some(ChargeState {
        charge_limit_soc: limit,
        usable_battery_level: usable,
        charger_power: None,
        battery_level: None,
        charging_state: None,
    });
    snapshot.climate_state = Some(ClimateState {
        is_climate_on: false,
        inside_temp: None,
        driver_temp_setting: None,
    });
    let mut view = VehicleView::default();
    view.merge(&snapshot);
    view
}

fn departing_in(secs: i64) -> OutstandingActions {
    let mut actions = OutstandingActions::default();
    actions.set_departure(ActionValue::from(NOW + secs), None);
    actions
}

#[test]
fn charge_time_model_reference_points() {
    assert!(calculate_delta_s(80, 80) < 0);
    assert_eq!(calculate_delta_s(100, 96), 45 * 60);
    assert_eq!(calculate_delta_s(96, 86), 6 * 60 * 60);
}

#[test]
fn departure_defers_until_charge_start() {
    let scheduler = Scheduler::new("Blue");
    let view = view(70, 75);
    let mut actions = departing_in(3600);

    // Target 80 from 75 needs 5 * 2160 s, more than the hour left
    let charge_start = NOW + 3600 - calculate_delta_s(80, 75);
    assert!(charge_start < NOW);

    let commands = scheduler.plan(&mut actions, &view, NOW);
    assert_eq!(
        commands,
        vec![PlannedCommand::SetChargeLimit {
            percent: 80,
            previous: 70
        }]
    );
    assert_eq!(actions.next_action_time, Some(NOW + 3600 - 300));
}

#[test]
fn departure_far_ahead_only_registers_wakeups() {
    let scheduler = Scheduler::new("Blue");
    let view = view(70, 79);
    let mut actions = departing_in(3600);

    let charge_start = NOW + 3600 - calculate_delta_s(80, 79);
    assert_eq!(charge_start, NOW + 3600 - 2160);

    let commands = scheduler.plan(&mut actions, &view, NOW);
    assert!(commands.is_empty());
    assert_eq!(actions.next_action_time, Some(charge_start));

    let commands = scheduler.plan(&mut actions, &view, charge_start - 1);
    assert!(commands.is_empty());

    let commands = scheduler.plan(&mut actions, &view, charge_start);
    assert_eq!(
        commands,
        vec![PlannedCommand::SetChargeLimit {
            percent: 80,
            previous: 70
        }]
    );
    assert_eq!(actions.next_action_time, Some(NOW + 3600 - 300));
}

#[test]
fn requested_level_is_clamped() {
    let scheduler = Scheduler::new("Blue");
    let view = view(70, 40);
    let mut actions = OutstandingActions::default();
    actions.set_departure(ActionValue::from(NOW + 60), Some(ActionValue(json!(120))));
    let commands = scheduler.plan(&mut actions, &view, NOW);
    assert!(commands.contains(&PlannedCommand::SetChargeLimit {
        percent: 100,
        previous: 70
    }));
    assert!(commands.contains(&PlannedCommand::StartClimate));
}

#[test]
fn malformed_level_falls_back_to_default() {
    let scheduler = Scheduler::new("Blue");
    let view = view(78, 40);
    let mut actions = OutstandingActions::default();
    actions.set_departure(ActionValue::from(NOW + 600), Some(ActionValue(json!("lots"))));
    let commands = scheduler.plan(&mut actions, &view, NOW);
    assert!(actions.departure_time.is_some());
    assert!(actions.departure_level.is_none());
    assert_eq!(
        commands[0],
        PlannedCommand::SetChargeLimit {
            percent: 83,
            previous: 78
        }
    );
}

#[tokio::test]
async fn rerunning_with_unchanged_clock_is_idempotent() {
    let scheduler = Scheduler::new("Blue");
    let client = RecordingClient::new();
    let mut view = view(70, 60);
    let mut actions = departing_in(200);

    scheduler
        .evaluate(&client, &mut actions, &mut view, NOW)
        .await
        .unwrap();
    let after_first = actions.clone();
    assert_eq!(
        client.sent(),
        vec![
            ("set_charge_limit".to_string(), json!({"percent": 80})),
            ("auto_conditioning_start".to_string(), json!({})),
        ]
    );
    assert_eq!(actions.autoresetlimit, Some(ActionValue::from(70)));

    scheduler
        .evaluate(&client, &mut actions, &mut view, NOW)
        .await
        .unwrap();
    assert_eq!(actions, after_first);
    assert_eq!(client.sent().len(), 2);
}

#[tokio::test]
async fn autoreset_restores_limit_when_driving() {
    let scheduler = Scheduler::new("Blue");
    let client = RecordingClient::new();
    let mut view = view(80, 79);
    let mut actions = OutstandingActions::default();
    actions.set_autoreset(ActionValue::from(70));

    scheduler
        .evaluate(&client, &mut actions, &mut view, NOW)
        .await
        .unwrap();
    assert!(client.sent().is_empty());
    assert!(actions.has_pending());

    view.merge(&VehicleSnapshot {
        drive_state: Some(DriveState {
            shift_state: Some(ShiftState::Drive),
            speed: Some(12.0),
            latitude: None,
            longitude: None,
        }),
        ..VehicleSnapshot::state_only(VehicleState::Online, NOW + 10)
    });
    scheduler
        .evaluate(&client, &mut actions, &mut view, NOW + 10)
        .await
        .unwrap();
    assert_eq!(
        client.sent(),
        vec![("set_charge_limit".to_string(), json!({"percent": 70}))]
    );
    assert!(!actions.has_pending());
    assert_eq!(view.charge_limit(), Ok(70));
}

#[test]
fn malformed_autoreset_is_cleared() {
    let scheduler = Scheduler::new("Blue");
    let mut actions = OutstandingActions::default();
    actions.set_autoreset(ActionValue(json!({"percent": 70})));
    let commands = scheduler.plan(&mut actions, &view(80, 50), NOW);
    assert!(commands.is_empty());
    assert!(actions.autoresetlimit.is_none());
}

#[test]
fn far_future_departure_without_charging_need_waits() {
    let scheduler = Scheduler::new("Blue");
    let view = view(70, 90);
    let mut actions = OutstandingActions::default();
    actions.set_departure(ActionValue::from(i64::MAX), None);

    let commands = scheduler.plan(&mut actions, &view, NOW);
    assert!(commands.is_empty());
    assert!(actions.departure_time.is_some());
    assert_eq!(actions.next_action_time, Some(i64::MAX - 300));
}
