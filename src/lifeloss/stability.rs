//! Structural stability under combined depth and velocity loading.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConsequencesError, Result};
use crate::hazards::{HazardEvent, HazardParameter};
use crate::structures::ConstructionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityState {
    Stable,
    Collapsed,
}

impl StabilityState {
    pub fn name(self) -> &'static str {
        match self {
            StabilityState::Stable => "stable",
            StabilityState::Collapsed => "collapsed",
        }
    }
}

impl fmt::Display for StabilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Thresholds above which a building class is considered to fail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityCriteria {
    #[serde(default)]
    pub minimum_velocity: f64,
    #[serde(default)]
    pub minimum_depth: f64,
    pub dv_threshold: f64,
}

impl StabilityCriteria {
    pub const WOOD_UNANCHORED: StabilityCriteria = StabilityCriteria {
        minimum_velocity: 0.0,
        minimum_depth: 0.0,
        dv_threshold: 32.3,
    };

    pub const WOOD_ANCHORED: StabilityCriteria = StabilityCriteria {
        minimum_velocity: 0.0,
        minimum_depth: 0.0,
        dv_threshold: 43.1,
    };

    pub const MASONRY_CONCRETE_BRICK: StabilityCriteria = StabilityCriteria {
        minimum_velocity: 6.6,
        minimum_depth: 0.0,
        dv_threshold: 75.3,
    };

    pub fn validate(&self) -> Result<()> {
        let values = [self.minimum_velocity, self.minimum_depth, self.dv_threshold];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ConsequencesError::configuration(format!(
                "stability criteria must be finite and non-negative: {self:?}"
            )));
        }
        Ok(())
    }

    /// Requires Depth and DV on the event. When the event carries no velocity,
    /// one is derived as DV / depth (or DV itself for zero depth); the derived
    /// value only feeds the threshold comparison.
    pub fn evaluate(&self, event: &HazardEvent) -> Result<StabilityState> {
        let depth = event.require(HazardParameter::Depth)?;
        let dv = event.require(HazardParameter::Dv)?;
        let velocity = if event.has(HazardParameter::Velocity) {
            event.require(HazardParameter::Velocity)?
        } else if depth == 0.0 {
            dv
        } else {
            dv / depth
        };

        if depth > self.minimum_depth
            && velocity > self.minimum_velocity
            && dv >= self.dv_threshold
        {
            Ok(StabilityState::Collapsed)
        } else {
            Ok(StabilityState::Stable)
        }
    }
}

/// Criteria per construction type.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityTable {
    criteria: HashMap<ConstructionType, StabilityCriteria>,
}

impl Default for StabilityTable {
    fn default() -> Self {
        let criteria = HashMap::from([
            (ConstructionType::Wood, StabilityCriteria::WOOD_UNANCHORED),
            (ConstructionType::Manufactured, StabilityCriteria::WOOD_UNANCHORED),
            (ConstructionType::WoodAnchored, StabilityCriteria::WOOD_ANCHORED),
            (ConstructionType::Masonry, StabilityCriteria::MASONRY_CONCRETE_BRICK),
            (ConstructionType::Concrete, StabilityCriteria::MASONRY_CONCRETE_BRICK),
            (ConstructionType::Steel, StabilityCriteria::MASONRY_CONCRETE_BRICK),
        ]);
        Self { criteria }
    }
}

impl StabilityTable {
    pub fn with_override(
        mut self,
        construction_type: ConstructionType,
        criteria: StabilityCriteria,
    ) -> Result<Self> {
        criteria.validate()?;
        self.criteria.insert(construction_type, criteria);
        Ok(self)
    }

    pub fn criteria(&self, construction_type: ConstructionType) -> StabilityCriteria {
        self.criteria
            .get(&construction_type)
            .copied()
            .unwrap_or(StabilityCriteria::WOOD_UNANCHORED)
    }

    pub fn evaluate(
        &self,
        construction_type: ConstructionType,
        event: &HazardEvent,
    ) -> Result<StabilityState> {
        self.criteria(construction_type).evaluate(event)
    }
}
