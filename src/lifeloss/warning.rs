//! Warning and evacuation: who is still in the structure when water arrives.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{ConsequencesError, Result};
use crate::rng::RandomSource;
use crate::structures::PopulationSet;

/// Reduces the exposed population before fatalities are computed.
pub trait WarningSystem: Send + Sync {
    fn name(&self) -> &str;

    fn warn(&self, population: PopulationSet, rng: &mut dyn RngCore) -> PopulationSet;
}

/// Everybody stays.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWarning;

impl WarningSystem for NoWarning {
    fn name(&self) -> &str {
        "none"
    }

    fn warn(&self, population: PopulationSet, _rng: &mut dyn RngCore) -> PopulationSet {
        population
    }
}

/// Each individual independently complies (leaves) with probability `rate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ComplianceWarning {
    rate: f64,
}

impl ComplianceWarning {
    pub fn new(rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConsequencesError::configuration(format!(
                "compliance rate {rate} outside [0, 1]"
            )));
        }
        Ok(Self { rate })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl TryFrom<f64> for ComplianceWarning {
    type Error = ConsequencesError;

    fn try_from(value: f64) -> Result<Self> {
        ComplianceWarning::new(value)
    }
}

impl From<ComplianceWarning> for f64 {
    fn from(value: ComplianceWarning) -> Self {
        value.rate
    }
}

impl WarningSystem for ComplianceWarning {
    fn name(&self) -> &str {
        "compliance"
    }

    fn warn(&self, population: PopulationSet, rng: &mut dyn RngCore) -> PopulationSet {
        apply_compliance(population, self.rate, rng)
    }
}

/// One Bernoulli trial per individual: someone stays iff their draw exceeds
/// `rate`. Buckets consume the rng in order 2am u65, 2am o65, 2pm u65, 2pm o65.
pub fn apply_compliance<R: RngCore + ?Sized>(
    population: PopulationSet,
    rate: f64,
    rng: &mut R,
) -> PopulationSet {
    if rate <= 0.0 {
        return population;
    }
    if rate >= 1.0 {
        return PopulationSet::default();
    }

    let mut remaining = [0u32; 4];
    for (kept, &count) in remaining.iter_mut().zip(population.buckets().iter()) {
        for _ in 0..count {
            if rng.next_float() > rate {
                *kept += 1;
            }
        }
    }
    PopulationSet::from_buckets(remaining)
}
