//! Flood damage and life-loss estimation for inventories of structures.

pub mod compute;
pub mod curve;
pub mod damage_function;
pub mod distribution;
pub mod error;
pub mod hazards;
pub mod lifeloss;
pub mod occupancy;
pub mod pipeline;
pub mod rng;
pub mod scenario;
pub mod sink;
pub mod structures;
pub mod uncertain_curve;

pub use compute::{compute_asset, compute_ead, ComputeSettings, ResultRecord};
pub use error::{ConsequencesError, Result};
pub use pipeline::{Pipeline, RunSummary};
pub use scenario::{Scenario, ScenarioLoader};
