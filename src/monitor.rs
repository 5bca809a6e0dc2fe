//! Per-vehicle monitoring
//!
//! Each vehicle gets its own [`VehicleMonitor`] task. The task polls the
//! vehicle, feeds the [`StateMachine`] and the scheduler, applies commands from
//! its queue, and sleeps for the interval of the state it was in.

mod backoff;
mod commands;
mod machine;
mod runtime;
mod types;

pub use backoff::Backoff;
pub use machine::{ActivityTimers, StateMachine, Transition};
pub use runtime::{MonitorContext, VehicleMonitor};
pub use types::{MonitorState, Scope, VehicleCommand};
