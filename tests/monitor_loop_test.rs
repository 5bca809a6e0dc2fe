use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use vigil::clock::TokioClock;
use vigil::error::{Result, VigilError};
use vigil::intervals::IntervalTable;
use vigil::monitor::{MonitorContext, MonitorState, VehicleCommand, VehicleMonitor};
use vigil::scheduler::ActionValue;
use vigil::sink::RecordSink;
use vigil::vehicle::{
    Category, ChargeState, ClimateState, VehicleClient, VehicleIdentity, VehicleSnapshot,
    VehicleState,
};
use vigil::view::SharedView;

const NOW: i64 = 1_700_000_000;

/// In-memory vehicle whose answers the test controls
struct ScriptedClient {
    identity: VehicleIdentity,
    current: Mutex<VehicleSnapshot>,
    wake_failures: AtomicUsize,
    wakes: AtomicUsize,
    calls: Mutex<Vec<String>>,
    sent: Mutex<Vec<(String, Value)>>,
}

impl ScriptedClient {
    fn new(snapshot: VehicleSnapshot) -> Arc<Self> {
        Arc::new(Self {
            identity: VehicleIdentity {
                id: 7,
                vin: Some("5YJ3E1EA7KF000007".into()),
                display_name: Some("Blue".into()),
            },
            current: Mutex::new(snapshot),
            wake_failures: AtomicUsize::new(0),
            wakes: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<(String, Value)> {
        self.sent.lock().unwrap().clone()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VehicleClient for ScriptedClient {
    fn identity(&self) -> &VehicleIdentity {
        &self.identity
    }

    async fn get_full_snapshot(&self) -> Result<VehicleSnapshot> {
        self.calls.lock().unwrap().push("full".into());
        Ok(self.current.lock().unwrap().clone())
    }

    async fn get_category(&self, category: Category) -> Result<VehicleSnapshot> {
        self.calls.lock().unwrap().push(category.as_str().into());
        let current = self.current.lock().unwrap().clone();
        let mut snapshot = VehicleSnapshot::state_only(current.state, current.retrieved_at);
        match category {
            Category::State => {}
            Category::ChargeState => snapshot.charge_state = current.charge_state,
            Category::ClimateState => snapshot.climate_state = current.climate_state,
            Category::DriveState => snapshot.drive_state = current.drive_state,
        }
        Ok(snapshot)
    }

    async fn wake(&self) -> Result<()> {
        self.wakes.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .wake_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(VigilError::network("vehicle unreachable"));
        }
        Ok(())
    }

    async fn send_command(&self, name: &str, params: Value) -> Result<()> {
        self.sent.lock().unwrap().push((name.to_string(), params));
        Ok(())
    }
}

fn parked(limit: i64, usable: i64) -> VehicleSnapshot {
    VehicleSnapshot {
        charge_state: Some(ChargeState {
            charge_limit_soc: limit,
            usable_battery_level: usable,
            charger_power: None,
            battery_level: Some(usable + 1),
            charging_state: Some("Stopped".into()),
        }),
        climate_state: Some(ClimateState {
            is_climate_on: false,
            inside_temp: Some(15.0),
            driver_temp_setting: Some(20.0),
        }),
        ..VehicleSnapshot::state_only(VehicleState::Online, NOW)
    }
}

struct Harness {
    _records: TempDir,
    view: SharedView,
    queue: mpsc::Sender<VehicleCommand>,
    task: tokio::task::JoinHandle<()>,
}

fn start(client: Arc<ScriptedClient>) -> Harness {
    let records = TempDir::new().unwrap();
    let view = SharedView::new();
    let ctx = MonitorContext {
        intervals: Arc::new(IntervalTable::default()),
        view: view.clone(),
        sink: Arc::new(RecordSink::new(records.path(), "test").unwrap()),
        clock: Arc::new(TokioClock::starting_at(NOW)),
        backoff_base_secs: 6,
    };
    let (queue, rx) = mpsc::channel(8);
    let monitor = VehicleMonitor::new(client, ctx, rx);
    Harness {
        _records: records,
        view,
        queue,
        task: tokio::spawn(monitor.run()),
    }
}

impl Harness {
    async fn state(&self) -> Option<MonitorState> {
        self.view.get(7).await.map(|v| v.current_state)
    }

    async fn quit(self) {
        self.queue.send(VehicleCommand::Quit).await.unwrap();
        timeout(Duration::from_secs(5), self.task)
            .await
            .expect("monitor did not stop")
            .unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn autocondition_without_level_raises_limit_by_five() {
    let client = ScriptedClient::new(parked(78, 60));
    let harness = start(client.clone());
    harness
        .queue
        .send(VehicleCommand::AutoCondition {
            level: None,
            temp: None,
            autoresetlimit: None,
        })
        .await
        .unwrap();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(
        client.sent(),
        vec![
            ("set_charge_limit".to_string(), json!({"percent": 83})),
            ("auto_conditioning_start".to_string(), json!({})),
        ]
    );
    let view = harness.view.get(7).await.unwrap();
    assert_eq!(view.current_state, MonitorState::Prep);
    assert_eq!(view.pending.autoresetlimit, Some(ActionValue::from(78)));
    assert!(view.climate_on());
    harness.quit().await;
}

#[tokio::test(start_paused = true)]
async fn autocondition_with_temp_sets_temps() {
    let client = ScriptedClient::new(parked(90, 60));
    let harness = start(client.clone());
    harness
        .queue
        .send(VehicleCommand::AutoCondition {
            level: Some(ActionValue::from(90)),
            temp: Some(21.0),
            autoresetlimit: None,
        })
        .await
        .unwrap();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(
        client.sent(),
        vec![
            (
                "set_temps".to_string(),
                json!({"driver_temp": 21.0, "passenger_temp": 21.0})
            ),
            ("auto_conditioning_start".to_string(), json!({})),
        ]
    );
    harness.quit().await;
}

#[tokio::test(start_paused = true)]
async fn asleep_vehicle_is_only_checked_for_state() {
    let client = ScriptedClient::new(VehicleSnapshot::state_only(VehicleState::Asleep, NOW));
    let harness = start(client.clone());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.state().await, Some(MonitorState::Inactive));

    // First sleep follows the Unknown interval, then state-only polls
    sleep(Duration::from_secs(60)).await;
    assert_eq!(client.calls(), vec!["full", "state"]);
    assert_eq!(harness.state().await, Some(MonitorState::Inactive));
    harness.quit().await;
}

#[tokio::test(start_paused = true)]
async fn failed_cycle_enters_disaster_and_backs_off() {
    let client = ScriptedClient::new(parked(80, 60));
    client.wake_failures.store(1, Ordering::SeqCst);
    let harness = start(client.clone());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.state().await, Some(MonitorState::Disaster));
    assert_eq!(client.wakes.load(Ordering::SeqCst), 1);

    sleep(Duration::from_secs(598)).await;
    assert_eq!(client.wakes.load(Ordering::SeqCst), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(client.wakes.load(Ordering::SeqCst), 2);
    assert_eq!(harness.state().await, Some(MonitorState::ToSleep));
    harness.quit().await;
}

#[tokio::test(start_paused = true)]
async fn departure_interrupts_sleep() {
    let client = ScriptedClient::new(parked(70, 50));
    let harness = start(client.clone());

    sleep(Duration::from_secs(1)).await;
    assert!(client.sent().is_empty());

    harness
        .queue
        .send(VehicleCommand::Departure {
            departure_time: ActionValue::from(NOW + 3600),
            departure_level: None,
            autoresetlimit: None,
        })
        .await
        .unwrap();
    sleep(Duration::from_secs(1)).await;

    assert_eq!(
        client.sent(),
        vec![("set_charge_limit".to_string(), json!({"percent": 80}))]
    );
    let view = harness.view.get(7).await.unwrap();
    assert_eq!(view.current_state, MonitorState::Prep);
    assert_eq!(view.pending.next_action_time, Some(NOW + 3600 - 300));
    harness.quit().await;
}

#[tokio::test(start_paused = true)]
async fn far_future_departure_keeps_monitor_alive() {
    let client = ScriptedClient::new(parked(70, 90));
    let harness = start(client.clone());
    harness
        .queue
        .send(VehicleCommand::Departure {
            departure_time: ActionValue::from(i64::MAX),
            departure_level: None,
            autoresetlimit: None,
        })
        .await
        .unwrap();

    sleep(Duration::from_secs(1)).await;
    assert!(client.sent().is_empty());
    assert_eq!(harness.state().await, Some(MonitorState::Prep));

    // Next poll still follows the interval table
    sleep(Duration::from_secs(60)).await;
    assert_eq!(client.calls(), vec!["full", "full"]);
    harness.quit().await;
}
