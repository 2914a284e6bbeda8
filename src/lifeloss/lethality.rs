//! Lethality zones and the fatality-rate curves sampled for them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::error::{ConsequencesError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LethalityZone {
    High,
    Low,
}

impl LethalityZone {
    pub fn name(self) -> &'static str {
        match self {
            LethalityZone::High => "high",
            LethalityZone::Low => "low",
        }
    }
}

impl fmt::Display for LethalityZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fatality rate as a function of the cumulative exceedance probability.
///
/// A draw `p` in `[0, 1)` is mapped through the curve, so the curve's x axis
/// must cover `[0, 1]`. Rates are clamped to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Curve", into = "Curve")]
pub struct LethalityCurve {
    curve: Curve,
}

impl LethalityCurve {
    pub fn new(curve: Curve) -> Result<Self> {
        let xs = curve.xs();
        let first = xs.first().copied().unwrap_or(f64::NAN);
        let last = xs.last().copied().unwrap_or(f64::NAN);
        if !(first <= 0.0 && last >= 1.0) {
            return Err(ConsequencesError::configuration(format!(
                "lethality curve must span [0, 1], got [{first}, {last}]"
            )));
        }
        Ok(Self { curve })
    }

    /// The draw is the position on the curve.
    pub fn sample_rate(&self, draw: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&draw) {
            return Err(ConsequencesError::Sampling(format!(
                "lethality draw {draw} outside [0, 1]"
            )));
        }
        let rate = self.curve.sample(draw);
        Ok(rate.clamp(0.0, 1.0))
    }
}

impl TryFrom<Curve> for LethalityCurve {
    type Error = ConsequencesError;

    fn try_from(value: Curve) -> Result<Self> {
        LethalityCurve::new(value)
    }
}

impl From<LethalityCurve> for Curve {
    fn from(value: LethalityCurve) -> Self {
        value.curve
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LethalityCurves {
    pub high: LethalityCurve,
    pub low: LethalityCurve,
}

impl LethalityCurves {
    pub fn for_zone(&self, zone: LethalityZone) -> &LethalityCurve {
        match zone {
            LethalityZone::High => &self.high,
            LethalityZone::Low => &self.low,
        }
    }
}
