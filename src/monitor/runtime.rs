use super::backoff::Backoff;
use super::machine::{ActivityTimers, StateMachine};
use super::types::{MonitorState, Scope, VehicleCommand};
use crate::clock::SharedClock;
use crate::error::Result;
use crate::intervals::IntervalTable;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::scheduler::{OutstandingActions, Scheduler};
use crate::sink::{PollRecord, RecordSink};
use crate::vehicle::{Category, VehicleClient, VehicleSnapshot};
use crate::view::{SharedView, VehicleView};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until};

/// Everything the vehicle tasks share, created once at startup
#[derive(Clone)]
pub struct MonitorContext {
    pub intervals: Arc<IntervalTable>,
    pub view: SharedView,
    pub sink: Arc<RecordSink>,
    pub clock: SharedClock,
    pub backoff_base_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flow {
    Continue,
    Quit,
}

/// Monitoring loop for one vehicle
pub struct VehicleMonitor {
    pub(super) client: Arc<dyn VehicleClient>,
    id: u64,
    label: String,
    ctx: MonitorContext,
    machine: StateMachine,
    pub(super) scheduler: Scheduler,
    queue: mpsc::Receiver<VehicleCommand>,
    pending: Option<VehicleCommand>,
    pub(super) state: MonitorState,
    timers: ActivityTimers,
    pub(super) view: VehicleView,
    pub(super) actions: OutstandingActions,
    backoff: Backoff,
    pub(super) logger: StructuredLogger,
}

impl VehicleMonitor {
    pub fn new(
        client: Arc<dyn VehicleClient>,
        ctx: MonitorContext,
        queue: mpsc::Receiver<VehicleCommand>,
    ) -> Self {
        let id = client.identity().id;
        let label = client.identity().label();
        let context = LogContext::new("monitor")
            .with_vehicle(&label)
            .with_field("carid", id.to_string());
        Self {
            machine: StateMachine::new(ctx.intervals.clone()),
            scheduler: Scheduler::new(&label),
            logger: get_logger_with_context(context),
            backoff: Backoff::new(ctx.backoff_base_secs),
            client,
            id,
            ctx,
            queue,
            pending: None,
            state: MonitorState::Unknown,
            timers: ActivityTimers::default(),
            view: VehicleView {
                label: label.clone(),
                ..Default::default()
            },
            label,
            actions: OutstandingActions::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run until a `quit` command arrives.
    ///
    /// A failed session is logged, followed by a backoff sleep, and restarted
    /// in the `disaster` state.
    pub async fn run(mut self) {
        self.logger.info("Monitor started");
        loop {
            match self.run_session().await {
                Ok(()) => {
                    self.logger.info("Quit received, monitor stopping");
                    return;
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    self.logger.error(&format!(
                        "Cycle failed in state {}: {e}; retrying in {}s",
                        self.state,
                        delay.as_secs()
                    ));
                    self.state = MonitorState::Disaster;
                    self.view.current_state = self.state;
                    self.ctx.view.publish(self.id, &self.view).await;
                    sleep(delay).await;
                }
            }
        }
    }

    async fn run_session(&mut self) -> Result<()> {
        self.client.wake().await?;
        let mut snapshot = self.client.get_full_snapshot().await?;
        let mut polled = Scope::Full;

        loop {
            let now = self.ctx.clock.now();
            let previous = self.state;
            self.view.merge(&snapshot);

            let transition = self
                .machine
                .step(previous, polled, &snapshot, self.timers, now);
            if transition.next_state != previous {
                self.logger.debug(&format!(
                    "State {previous} -> {}",
                    transition.next_state
                ));
            }
            self.state = transition.next_state;
            self.timers = transition.timers;
            let mut next_scope = transition.next_scope;

            let command = self.pending.take().or_else(|| self.queue.try_recv().ok());
            if let Some(command) = command {
                if self.apply_command(command).await? == Flow::Quit {
                    return Ok(());
                }
                next_scope = self.machine.scope_for(self.state, self.timers, now);
            }

            if self.actions.has_pending() {
                self.scheduler
                    .evaluate(self.client.as_ref(), &mut self.actions, &mut self.view, now)
                    .await?;
            } else {
                self.actions.clear_next_action();
            }

            self.publish(now, polled, &snapshot).await?;
            self.backoff.reset();

            self.wait(self.deadline(previous, now)).await;
            if matches!(self.pending, Some(VehicleCommand::Quit)) {
                return Ok(());
            }

            snapshot = self.fetch(next_scope).await?;
            polled = next_scope;
        }
    }

    async fn fetch(&self, scope: Scope) -> Result<VehicleSnapshot> {
        match scope {
            Scope::Full => self.client.get_full_snapshot().await,
            Scope::Partial(category) => self.client.get_category(category).await,
            Scope::None => self.client.get_category(Category::State).await,
        }
    }

    async fn publish(&mut self, now: i64, polled: Scope, snapshot: &VehicleSnapshot) -> Result<()> {
        self.view.current_state = self.state;
        self.view.last_active_time = self.timers.last_active;
        self.view.pending = self.actions.clone();
        self.ctx.view.publish(self.id, &self.view).await;

        self.ctx.sink.write_record(&PollRecord {
            ts: now,
            vehicle: &self.label,
            state: self.state,
            scope: polled.as_str(),
            data: snapshot,
        })
    }

    /// End of this cycle's sleep: the previous state's interval, or earlier
    /// when the scheduler wants to act sooner
    fn deadline(&self, previous: MonitorState, now: i64) -> Instant {
        let start = Instant::now();
        let mut deadline = start + self.ctx.intervals.sleep(previous);
        if let Some(at) = self.actions.next_action_time {
            let wait = u64::try_from(at.saturating_sub(now)).unwrap_or(0);
            // A wake-up too far ahead to represent cannot be earlier than the interval
            if let Some(wake) = start.checked_add(Duration::from_secs(wait)) {
                deadline = deadline.min(wake);
            }
        }
        deadline
    }

    /// Sleep until `deadline` or until a command arrives
    async fn wait(&mut self, deadline: Instant) {
        if self.pending.is_some() {
            return;
        }
        tokio::select! {
            _ = sleep_until(deadline) => {}
            received = self.queue.recv() => match received {
                Some(command) => self.pending = Some(command),
                None => sleep_until(deadline).await,
            },
        }
    }
}
