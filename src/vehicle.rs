//! Vehicle API integration for Vigil
//!
//! The monitor only talks to vehicles through the [`VehicleClient`] trait.
//! [`HttpVehicleClient`] implements it against an owner-style REST API; tests
//! substitute scripted fakes.

pub mod http;
pub mod types;

use crate::error::Result;

pub use http::{ApiSession, HttpVehicleClient, discover_vehicles};
pub use types::{
    Category, ChargeState, ClimateState, DriveState, ShiftState, VehicleIdentity, VehicleSnapshot,
    VehicleState,
};

/// Vehicle client trait
///
/// Every call may take a while; implementations retry transient transport
/// failures themselves and report anything left over as an error.
#[async_trait::async_trait]
pub trait VehicleClient: Send + Sync {
    /// Identity of the vehicle this client talks to
    fn identity(&self) -> &VehicleIdentity;

    /// All data categories. A dormant vehicle yields a state-only snapshot.
    async fn get_full_snapshot(&self) -> Result<VehicleSnapshot>;

    /// A single category plus the overall state
    async fn get_category(&self, category: Category) -> Result<VehicleSnapshot>;

    /// Wake the vehicle and wait until it reports online
    async fn wake(&self) -> Result<()>;

    /// Issue a vehicle command such as `set_charge_limit`
    async fn send_command(&self, name: &str, params: serde_json::Value) -> Result<()>;
}
