use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A field as supplied on the command channel, validated only when used.
///
/// Integers, floats without a fractional part and integer strings are
/// accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionValue(pub Value);

impl ActionValue {
    pub fn as_int(&self, field: ActionField) -> Result<i64, ActionError> {
        let parsed = match &self.0 {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| ActionError::NotAnInteger {
            field,
            value: self.0.to_string(),
        })
    }
}

impl From<i64> for ActionValue {
    fn from(v: i64) -> Self {
        Self(Value::from(v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionField {
    DepartureTime,
    DepartureLevel,
    AutoResetLimit,
    Level,
}

impl fmt::Display for ActionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DepartureTime => "departure_time",
            Self::DepartureLevel => "departure_level",
            Self::AutoResetLimit => "autoresetlimit",
            Self::Level => "level",
        })
    }
}

/// A pending action that cannot be evaluated; the offending fields are dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{field} is not an integer: {value}")]
    NotAnInteger { field: ActionField, value: String },

    #[error("merged view has no {0}")]
    MissingData(&'static str),
}

/// Deferred directives for one vehicle. Absent fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutstandingActions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<ActionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_level: Option<ActionValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoresetlimit: Option<ActionValue>,
    /// Earliest time the scheduler wants to run again, recomputed every cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_action_time: Option<i64>,
}

impl OutstandingActions {
    /// Whether anything is left for the scheduler to evaluate
    pub const fn has_pending(&self) -> bool {
        self.departure_time.is_some() || self.autoresetlimit.is_some()
    }

    pub fn set_departure(&mut self, time: ActionValue, level: Option<ActionValue>) {
        self.departure_time = Some(time);
        self.departure_level = level;
    }

    pub fn clear_departure(&mut self) {
        self.departure_time = None;
        self.departure_level = None;
    }

    pub fn clear_departure_level(&mut self) {
        self.departure_level = None;
    }

    pub fn set_autoreset(&mut self, limit: ActionValue) {
        self.autoresetlimit = Some(limit);
    }

    /// Remember `limit` for the auto-reset unless one is already pending
    pub fn remember_limit(&mut self, limit: i64) {
        if self.autoresetlimit.is_none() {
            self.autoresetlimit = Some(limit.into());
        }
    }

    pub fn clear_autoreset(&mut self) {
        self.autoresetlimit = None;
    }

    pub fn clear_next_action(&mut self) {
        self.next_action_time = None;
    }

    /// Keep the earliest of the registered wake-up candidates
    pub fn register_wake_candidate(&mut self, at: i64) {
        self.next_action_time = Some(self.next_action_time.map_or(at, |t| t.min(at)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_forms() {
        let field = ActionField::DepartureTime;
        assert_eq!(ActionValue(json!(1700000000)).as_int(field), Ok(1700000000));
        assert_eq!(ActionValue(json!(80.0)).as_int(field), Ok(80));
        assert_eq!(ActionValue(json!(" 75 ")).as_int(field), Ok(75));
        assert!(ActionValue(json!(80.5)).as_int(field).is_err());
        assert!(ActionValue(json!("soon")).as_int(field).is_err());
        assert!(ActionValue(json!(null)).as_int(field).is_err());
    }

    #[test]
    fn wake_candidate_keeps_minimum() {
        let mut actions = OutstandingActions::default();
        actions.register_wake_candidate(200);
        actions.register_wake_candidate(100);
        actions.register_wake_candidate(300);
        assert_eq!(actions.next_action_time, Some(100));
        actions.clear_next_action();
        assert_eq!(actions.next_action_time, None);
    }

    #[test]
    fn remember_limit_keeps_first() {
        let mut actions = OutstandingActions::default();
        actions.remember_limit(70);
        actions.remember_limit(90);
        assert_eq!(actions.autoresetlimit, Some(ActionValue::from(70)));
        assert!(actions.has_pending());
        actions.clear_autoreset();
        assert!(!actions.has_pending());
    }

    #[test]
    fn error_names_field() {
        let err = ActionValue(json!("x"))
            .as_int(ActionField::AutoResetLimit)
            .unwrap_err();
        assert_eq!(err.to_string(), "autoresetlimit is not an integer: \"x\"");
    }
}
