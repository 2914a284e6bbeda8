//! Library error type.

use thiserror::Error;

use crate::hazards::HazardParameter;

#[derive(Debug, Error)]
pub enum ConsequencesError {
    /// Malformed curve, distribution or damage function. Raised at construction.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The hazard lacks a parameter the computation strictly requires.
    #[error("hazard event does not carry required parameter '{0}'")]
    MissingCapability(HazardParameter),
    #[error("occupancy type '{0}' is not defined")]
    UnresolvedOccupancyType(String),
    #[error("occupancy type '{occupancy_type}' has no '{component}' damage function family")]
    MissingComponent {
        occupancy_type: String,
        component: String,
    },
    #[error("sampling error: {0}")]
    Sampling(String),
}

impl ConsequencesError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        ConsequencesError::Configuration(msg.into())
    }

    /// Errors that only affect the asset being computed.
    pub fn is_per_asset(&self) -> bool {
        matches!(
            self,
            ConsequencesError::MissingCapability(_) | ConsequencesError::Sampling(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ConsequencesError>;
