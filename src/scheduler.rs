//! Outstanding-action scheduler
//!
//! Each cycle the scheduler looks at a vehicle's pending directives and the
//! latest merged view, decides which vehicle commands are due, and records the
//! earliest time it wants to be woken for the rest. Planning is pure; only
//! [`Scheduler::execute`] talks to the vehicle.

mod actions;
mod charge_model;

pub use actions::{ActionError, ActionField, ActionValue, OutstandingActions};
pub use charge_model::{calculate_delta_s, clamp_level, default_target_level};

use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::vehicle::VehicleClient;
use crate::view::VehicleView;
use serde_json::{Value, json};

/// Climate starts this many seconds before departure
pub const CLIMATE_LEAD_SECS: i64 = 300;

/// A vehicle command the scheduler decided to issue
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedCommand {
    /// Raise or lower the limit, remembering `previous` for the auto-reset
    SetChargeLimit { percent: i64, previous: i64 },
    /// Put back the limit that was in place before a departure
    RestoreChargeLimit { percent: i64 },
    SetTemps { celsius: f64 },
    StartClimate,
}

impl PlannedCommand {
    /// Command name on the vehicle API
    pub const fn api_name(&self) -> &'static str {
        match self {
            Self::SetChargeLimit { .. } | Self::RestoreChargeLimit { .. } => "set_charge_limit",
            Self::SetTemps { .. } => "set_temps",
            Self::StartClimate => "auto_conditioning_start",
        }
    }

    pub fn params(&self) -> Value {
        match self {
            Self::SetChargeLimit { percent, .. } | Self::RestoreChargeLimit { percent } => {
                json!({ "percent": percent })
            }
            Self::SetTemps { celsius } => json!({ "driver_temp": celsius, "passenger_temp": celsius }),
            Self::StartClimate => json!({}),
        }
    }
}

pub struct Scheduler {
    logger: StructuredLogger,
}

impl Scheduler {
    pub fn new(vehicle: &str) -> Self {
        Self {
            logger: get_logger("scheduler").for_vehicle(vehicle),
        }
    }

    /// Decide which commands are due at `now`.
    ///
    /// Invalid or expired fields are cleared from `actions`; the wake-up time
    /// is recomputed from scratch.
    pub fn plan(
        &self,
        actions: &mut OutstandingActions,
        view: &VehicleView,
        now: i64,
    ) -> Vec<PlannedCommand> {
        actions.clear_next_action();
        let mut commands = Vec::new();

        if actions.departure_time.is_some() {
            if let Err(e) = self.plan_departure(actions, view, now, &mut commands) {
                self.logger
                    .warn(&format!("Discarding departure: {e}"));
                actions.clear_departure();
            }
        }

        if let Some(limit) = &actions.autoresetlimit {
            match limit.as_int(ActionField::AutoResetLimit) {
                Ok(percent) if view.gear_engaged() => {
                    commands.push(PlannedCommand::RestoreChargeLimit { percent });
                }
                Ok(_) => {}
                Err(e) => {
                    self.logger.warn(&format!("Discarding auto-reset: {e}"));
                    actions.clear_autoreset();
                }
            }
        }

        commands
    }

    fn plan_departure(
        &self,
        actions: &mut OutstandingActions,
        view: &VehicleView,
        now: i64,
        commands: &mut Vec<PlannedCommand>,
    ) -> std::result::Result<(), ActionError> {
        let Some(time) = &actions.departure_time else {
            return Ok(());
        };
        let departure_time = time.as_int(ActionField::DepartureTime)?;
        if departure_time <= now {
            self.logger
                .info(&format!("Departure time {departure_time} has passed"));
            actions.clear_departure();
            return Ok(());
        }

        let limit = view.charge_limit()?;
        let usable = view.usable_level()?;
        let level = match actions
            .departure_level
            .as_ref()
            .map(|l| l.as_int(ActionField::DepartureLevel))
        {
            Some(Ok(level)) => clamp_level(level),
            Some(Err(e)) => {
                self.logger
                    .warn(&format!("Ignoring departure level: {e}"));
                actions.clear_departure_level();
                default_target_level(limit)
            }
            None => default_target_level(limit),
        };

        let charge_start = departure_time.saturating_sub(calculate_delta_s(level, usable));
        if now >= charge_start {
            if limit != level {
                commands.push(PlannedCommand::SetChargeLimit {
                    percent: level,
                    previous: limit,
                });
            }
        } else {
            actions.register_wake_candidate(charge_start);
        }

        let climate_start = departure_time.saturating_sub(CLIMATE_LEAD_SECS);
        if now >= climate_start {
            if !view.climate_on() {
                commands.push(PlannedCommand::StartClimate);
            }
        } else {
            actions.register_wake_candidate(climate_start);
        }
        Ok(())
    }

    /// Send one command and fold its effect into `actions` and `view`
    pub async fn execute(
        &self,
        client: &dyn VehicleClient,
        command: &PlannedCommand,
        actions: &mut OutstandingActions,
        view: &mut VehicleView,
    ) -> Result<()> {
        self.logger
            .info(&format!("Issuing {} {}", command.api_name(), command.params()));
        client
            .send_command(command.api_name(), command.params())
            .await?;

        match command {
            PlannedCommand::SetChargeLimit { percent, previous } => {
                actions.remember_limit(*previous);
                view.note_charge_limit(*percent);
            }
            PlannedCommand::RestoreChargeLimit { percent } => {
                actions.clear_autoreset();
                view.note_charge_limit(*percent);
            }
            PlannedCommand::SetTemps { .. } => {}
            PlannedCommand::StartClimate => view.note_climate_on(),
        }
        Ok(())
    }

    /// Plan and execute everything due at `now`
    pub async fn evaluate(
        &self,
        client: &dyn VehicleClient,
        actions: &mut OutstandingActions,
        view: &mut VehicleView,
        now: i64,
    ) -> Result<()> {
        for command in self.plan(actions, view, now) {
            self.execute(client, &command, actions, view).await?;
        }
        Ok(())
    }
}
