use crate::monitor::VehicleCommand;
use crate::scheduler::ActionValue;
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Commands accepted on the channel
pub const VALID_COMMANDS: [&str; 4] = ["get", "autocondition", "departure", "quit"];

/// A rejected request; [`DispatchError::tag`] is the wire error tag
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Format error: {0}")]
    Format(String),

    #[error("Missing command")]
    MissingCommand,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown vehicle")]
    UnknownVehicle,

    /// The vehicle's queue is full or its monitor has stopped
    #[error("Vehicle unavailable")]
    Unavailable,
}

impl DispatchError {
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Format(_) => "Format error",
            Self::MissingCommand => "Missing command",
            Self::UnknownCommand(_) => "Unknown command",
            Self::UnknownVehicle => "Unknown vehicle",
            Self::Unavailable => "Vehicle unavailable",
        }
    }

    /// Reply sent back to the requester
    pub fn response(&self) -> Value {
        match self {
            Self::Format(detail) => json!([self.tag(), detail]),
            Self::UnknownCommand(_) => json!([self.tag(), VALID_COMMANDS]),
            _ => json!([self.tag()]),
        }
    }
}

/// How the request names its vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// `carid`: the API id
    Id(u64),
    /// `carpos`: index in discovery order
    Position(usize),
}

impl Default for Selector {
    fn default() -> Self {
        Self::Position(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    /// Answered from the merged view
    Get,
    /// Routed to one vehicle's queue
    Vehicle(VehicleCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    pub kind: RequestKind,
    pub selector: Selector,
}

/// Validate a raw request.
///
/// Checks run in order: the payload is a JSON object, `cmd` is present, `cmd`
/// is known, the command's own fields, then the vehicle selector. A `carid`
/// takes precedence over a `carpos`.
pub fn parse_request(payload: &[u8]) -> Result<CommandRequest, DispatchError> {
    let value: Value =
        serde_json::from_slice(payload).map_err(|e| DispatchError::Format(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(DispatchError::Format("request must be an object".to_string()));
    };

    let cmd = match fields.get("cmd") {
        None | Some(Value::Null) => return Err(DispatchError::MissingCommand),
        Some(Value::String(s)) => s.as_str(),
        Some(other) => return Err(DispatchError::UnknownCommand(other.to_string())),
    };

    let kind = match cmd {
        "get" => RequestKind::Get,
        "quit" => RequestKind::Vehicle(VehicleCommand::Quit),
        "autocondition" => RequestKind::Vehicle(VehicleCommand::AutoCondition {
            level: action_value(&fields, "level"),
            temp: temperature(&fields)?,
            autoresetlimit: action_value(&fields, "autoresetlimit"),
        }),
        "departure" => RequestKind::Vehicle(VehicleCommand::Departure {
            departure_time: action_value(&fields, "departure_time").ok_or_else(|| {
                DispatchError::Format("departure requires departure_time".to_string())
            })?,
            departure_level: action_value(&fields, "departure_level"),
            autoresetlimit: action_value(&fields, "autoresetlimit"),
        }),
        other => return Err(DispatchError::UnknownCommand(other.to_string())),
    };

    Ok(CommandRequest {
        kind,
        selector: selector(&fields)?,
    })
}

fn action_value(fields: &Map<String, Value>, key: &str) -> Option<ActionValue> {
    match fields.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => Some(ActionValue(v.clone())),
    }
}

fn temperature(fields: &Map<String, Value>) -> Result<Option<f64>, DispatchError> {
    match fields.get("temp") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DispatchError::Format(format!("temp is not a number: {s}"))),
        Some(other) => Err(DispatchError::Format(format!("temp is not a number: {other}"))),
    }
}

fn selector(fields: &Map<String, Value>) -> Result<Selector, DispatchError> {
    if let Some(id) = fields.get("carid").filter(|v| !v.is_null()) {
        return unsigned(id).map(Selector::Id);
    }
    if let Some(pos) = fields.get("carpos").filter(|v| !v.is_null()) {
        return unsigned(pos)
            .and_then(|p| usize::try_from(p).map_err(|_| DispatchError::UnknownVehicle))
            .map(Selector::Position);
    }
    Ok(Selector::default())
}

fn unsigned(value: &Value) -> Result<u64, DispatchError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or(DispatchError::UnknownVehicle)
}
