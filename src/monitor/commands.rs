use super::runtime::{Flow, VehicleMonitor};
use super::types::{MonitorState, VehicleCommand};
use crate::error::Result;
use crate::scheduler::{
    ActionField, ActionValue, PlannedCommand, clamp_level, default_target_level,
};

impl VehicleMonitor {
    /// Apply one queued command
    pub(super) async fn apply_command(&mut self, command: VehicleCommand) -> Result<Flow> {
        self.logger
            .info(&format!("Applying {} command", command.name()));
        match command {
            VehicleCommand::Departure {
                departure_time,
                departure_level,
                autoresetlimit,
            } => {
                self.actions.set_departure(departure_time, departure_level);
                if let Some(limit) = autoresetlimit {
                    self.actions.set_autoreset(limit);
                }
            }
            VehicleCommand::AutoCondition {
                level,
                temp,
                autoresetlimit,
            } => self.autocondition(level, temp, autoresetlimit).await?,
            VehicleCommand::Quit => return Ok(Flow::Quit),
        }
        self.state = MonitorState::Prep;
        Ok(Flow::Continue)
    }

    async fn autocondition(
        &mut self,
        level: Option<ActionValue>,
        temp: Option<f64>,
        autoresetlimit: Option<ActionValue>,
    ) -> Result<()> {
        if let Some(limit) = autoresetlimit {
            self.actions.set_autoreset(limit);
        }

        let mut commands = Vec::new();
        match self.view.charge_limit() {
            Ok(limit) => {
                let target = match level.map(|l| l.as_int(ActionField::Level)) {
                    Some(Ok(requested)) => clamp_level(requested),
                    Some(Err(e)) => {
                        self.logger.warn(&format!("Ignoring level: {e}"));
                        default_target_level(limit)
                    }
                    None => default_target_level(limit),
                };
                if target != limit {
                    commands.push(PlannedCommand::SetChargeLimit {
                        percent: target,
                        previous: limit,
                    });
                }
            }
            Err(e) => self
                .logger
                .warn(&format!("Leaving charge limit unchanged: {e}")),
        }
        if let Some(celsius) = temp {
            commands.push(PlannedCommand::SetTemps { celsius });
        }
        commands.push(PlannedCommand::StartClimate);

        for command in &commands {
            self.scheduler
                .execute(
                    self.client.as_ref(),
                    command,
                    &mut self.actions,
                    &mut self.view,
                )
                .await?;
        }
        Ok(())
    }
}
