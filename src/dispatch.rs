//! External command channel
//!
//! A datagram listener validates each request, resolves the target vehicle
//! and hands the command to that vehicle's queue. Every request gets a reply:
//! a list whose first element is `"Success"` or an error tag.

mod request;

pub use request::{
    CommandRequest, DispatchError, RequestKind, Selector, VALID_COMMANDS, parse_request,
};

use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::monitor::VehicleCommand;
use crate::view::SharedView;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;

const MAX_DATAGRAM: usize = 64 * 1024;

/// Sending side of one vehicle's queue
#[derive(Debug, Clone)]
pub struct VehicleHandle {
    pub id: u64,
    pub label: String,
    pub queue: mpsc::Sender<VehicleCommand>,
}

/// What the listener does after replying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    Quit,
}

pub struct Dispatcher {
    vehicles: Vec<VehicleHandle>,
    view: SharedView,
    send_timeout: Duration,
    logger: StructuredLogger,
}

impl Dispatcher {
    pub fn new(vehicles: Vec<VehicleHandle>, view: SharedView, send_timeout: Duration) -> Self {
        Self {
            vehicles,
            view,
            send_timeout,
            logger: get_logger("dispatch"),
        }
    }

    /// Reply to one request
    pub async fn handle(&self, payload: &[u8]) -> (Value, Disposition) {
        match self.route(payload).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.logger.warn(&format!("Rejected request: {e}"));
                (e.response(), Disposition::Continue)
            }
        }
    }

    async fn route(&self, payload: &[u8]) -> std::result::Result<(Value, Disposition), DispatchError> {
        let request = parse_request(payload)?;
        let command = match request.kind {
            RequestKind::Get => {
                let view = self.view.snapshot_json().await;
                return Ok((json!(["Success", view]), Disposition::Continue));
            }
            RequestKind::Vehicle(command) => command,
        };

        let vehicle = self.resolve(request.selector)?;
        let disposition = match command {
            VehicleCommand::Quit => Disposition::Quit,
            _ => Disposition::Continue,
        };
        self.logger
            .info(&format!("Queueing {} for {}", command.name(), vehicle.label));

        match timeout(self.send_timeout, vehicle.queue.send(command)).await {
            Ok(Ok(())) => Ok((json!(["Success"]), disposition)),
            // The process exits on quit whether or not the monitor heard it
            _ if disposition == Disposition::Quit => Ok((json!(["Success"]), disposition)),
            _ => Err(DispatchError::Unavailable),
        }
    }

    fn resolve(&self, selector: Selector) -> std::result::Result<&VehicleHandle, DispatchError> {
        let found = match selector {
            Selector::Id(id) => self.vehicles.iter().find(|v| v.id == id),
            Selector::Position(pos) => self.vehicles.get(pos),
        };
        found.ok_or(DispatchError::UnknownVehicle)
    }

    /// Answer datagrams on `socket` until a `quit` has been forwarded
    pub async fn serve(&self, socket: UdpSocket) -> Result<()> {
        self.logger
            .info(&format!("Listening for commands on {}", socket.local_addr()?));
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, peer) = socket.recv_from(&mut buf).await?;
            let (reply, disposition) = self.handle(&buf[..len]).await;
            let bytes = serde_json::to_vec(&reply)?;
            if let Err(e) = socket.send_to(&bytes, peer).await {
                self.logger
                    .warn(&format!("Failed to reply to {peer}: {e}"));
            }
            if disposition == Disposition::Quit {
                self.logger.info("Quit forwarded, listener stopping");
                return Ok(());
            }
        }
    }
}
