//! Curves whose knot values are distributions, collapsed to paired curves by one draw.

use serde::{Deserialize, Serialize};

use crate::curve::{validate_knots, Curve};
use crate::distribution::ValueDistribution;
use crate::error::{ConsequencesError, Result};

/// A curve whose y-values are distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncertainCurveDef", into = "UncertainCurveDef")]
pub struct UncertainCurve {
    xs: Vec<f64>,
    ys: Vec<ValueDistribution>,
}

#[derive(Serialize, Deserialize)]
struct UncertainCurveDef {
    xs: Vec<f64>,
    ys: Vec<ValueDistribution>,
}

impl TryFrom<UncertainCurveDef> for UncertainCurve {
    type Error = ConsequencesError;

    fn try_from(value: UncertainCurveDef) -> Result<Self> {
        UncertainCurve::new(value.xs, value.ys)
    }
}

impl From<UncertainCurve> for UncertainCurveDef {
    fn from(value: UncertainCurve) -> Self {
        UncertainCurveDef {
            xs: value.xs,
            ys: value.ys,
        }
    }
}

impl UncertainCurve {
    pub fn new(xs: Vec<f64>, ys: Vec<ValueDistribution>) -> Result<Self> {
        validate_knots(&xs, ys.len())?;
        for distribution in &ys {
            distribution.validate()?;
        }
        Ok(Self { xs, ys })
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn distributions(&self) -> &[ValueDistribution] {
        &self.ys
    }

    /// Inverts every knot's distribution at the same `draw`, so one draw moves
    /// the whole curve together.
    pub fn collapse(&self, draw: f64) -> Result<Curve> {
        let ys = self
            .ys
            .iter()
            .map(|distribution| distribution.inv_cdf(draw))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Curve::from_validated(self.xs.clone(), ys))
    }

    pub fn central_tendency(&self) -> Curve {
        let ys = self
            .ys
            .iter()
            .map(ValueDistribution::central_tendency)
            .collect();
        Curve::from_validated(self.xs.clone(), ys)
    }
}
