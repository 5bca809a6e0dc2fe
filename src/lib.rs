//! # Vigil - adaptive vehicle monitor
//!
//! Vigil keeps track of one or more vehicles through their owner API. How
//! often and how much it polls depends on what each vehicle appears to be
//! doing, and it carries out deferred actions such as raising the charge limit
//! ahead of a departure or starting climate control.
//!
//! ## Architecture
//!
//! - `intervals`: sleep and full-refresh periods per monitoring state
//! - `monitor`: the per-vehicle state machine and its task loop
//! - `scheduler`: departure and auto-reset actions
//! - `dispatch`: the datagram command channel and per-vehicle queues
//! - `view`: latest-known data of every vehicle
//! - `sink`: the per-poll JSON record stream
//! - `vehicle`: the vehicle API client
//! - `config`, `logging`, `error`, `clock`: supporting pieces

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod intervals;
pub mod logging;
pub mod monitor;
pub mod scheduler;
pub mod sink;
pub mod vehicle;
pub mod view;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, VigilError};
pub use monitor::{MonitorContext, MonitorState, VehicleMonitor};
