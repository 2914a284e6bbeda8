//! Paired-data curves sampled by linear interpolation.

use serde::{Deserialize, Serialize};

use crate::error::{ConsequencesError, Result};

/// Ordered `(x, y)` knots with strictly increasing `x`.
///
/// Below the first knot a curve samples to zero, at or above the last knot it
/// holds the last `y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CurveDef", into = "CurveDef")]
pub struct Curve {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct CurveDef {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl TryFrom<CurveDef> for Curve {
    type Error = ConsequencesError;

    fn try_from(value: CurveDef) -> Result<Self> {
        Curve::new(value.xs, value.ys)
    }
}

impl From<Curve> for CurveDef {
    fn from(value: Curve) -> Self {
        CurveDef {
            xs: value.xs,
            ys: value.ys,
        }
    }
}

impl Curve {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self> {
        validate_knots(&xs, ys.len())?;
        if let Some(y) = ys.iter().find(|y| !y.is_finite()) {
            return Err(ConsequencesError::configuration(format!(
                "curve value {y} is not finite"
            )));
        }
        Ok(Self { xs, ys })
    }

    /// Knots already checked by [`validate_knots`].
    pub(crate) fn from_validated(xs: Vec<f64>, ys: Vec<f64>) -> Self {
        debug_assert_eq!(xs.len(), ys.len());
        Self { xs, ys }
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// NaN in gives NaN out.
    pub fn sample(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        let last = self.xs.len() - 1;
        if x < self.xs[0] {
            return 0.0;
        }
        if x >= self.xs[last] {
            return self.ys[last];
        }
        match self.xs.binary_search_by(|knot| knot.total_cmp(&x)) {
            Ok(index) => self.ys[index],
            Err(upper) => {
                let lower = upper - 1;
                let t = (x - self.xs[lower]) / (self.xs[upper] - self.xs[lower]);
                self.ys[lower] + t * (self.ys[upper] - self.ys[lower])
            }
        }
    }

    pub fn is_monotonic(&self) -> bool {
        self.ys.windows(2).all(|pair| pair[1] >= pair[0])
    }

    /// Ratchets `y` up to the running maximum, starting from zero.
    pub fn force_non_negative_monotonic(&mut self) {
        let mut running_max = 0.0_f64;
        for y in self.ys.iter_mut() {
            running_max = running_max.max(*y);
            *y = running_max;
        }
    }
}

/// Shared knot validation for paired and uncertain curves.
pub(crate) fn validate_knots(xs: &[f64], y_len: usize) -> Result<()> {
    if xs.is_empty() {
        return Err(ConsequencesError::configuration("curve must have at least one knot"));
    }
    if xs.len() != y_len {
        return Err(ConsequencesError::configuration(format!(
            "curve has {} x values but {} y values",
            xs.len(),
            y_len
        )));
    }
    if let Some(x) = xs.iter().find(|x| !x.is_finite()) {
        return Err(ConsequencesError::configuration(format!(
            "curve knot {x} is not finite"
        )));
    }
    if let Some(pair) = xs.windows(2).find(|pair| pair[1] <= pair[0]) {
        return Err(ConsequencesError::configuration(format!(
            "curve knots must be strictly increasing, found {} then {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> Curve {
        Curve::new(vec![1.0, 2.0, 3.0, 4.0], vec![10.0, 20.0, 30.0, 40.0]).unwrap()
    }

    #[test]
    fn samples_inside_and_outside_range() {
        let curve = linear();
        assert_eq!(curve.sample(2.5), 25.0);
        assert_eq!(curve.sample(0.99), 0.0);
        assert_eq!(curve.sample(4.1), 40.0);
        assert_eq!(curve.sample(4.0), 40.0);
    }

    #[test]
    fn exact_knots_return_stored_values() {
        let curve = Curve::new(vec![0.0, 0.3, 0.7, 1.1], vec![0.1, 0.2, 0.35, 0.9]).unwrap();
        for (x, y) in curve.xs().iter().zip(curve.ys()) {
            assert_eq!(curve.sample(*x), *y);
        }
    }

    #[test]
    fn below_first_knot_is_zero_even_when_first_y_is_not() {
        let curve = Curve::new(vec![-2.0, 0.0, 2.0], vec![5.0, 15.0, 50.0]).unwrap();
        assert_eq!(curve.sample(-2.01), 0.0);
        assert_eq!(curve.sample(-2.0), 5.0);
        assert_eq!(curve.sample(1.0), 32.5);
    }

    #[test]
    fn single_knot_curve_is_a_step() {
        let curve = Curve::new(vec![3.0], vec![12.0]).unwrap();
        assert_eq!(curve.sample(2.9), 0.0);
        assert_eq!(curve.sample(3.0), 12.0);
        assert_eq!(curve.sample(100.0), 12.0);
    }

    #[test]
    fn nan_input_does_not_index_past_the_knots() {
        let curve = Curve::new(vec![0.0, 1.0], vec![0.0, 50.0]).unwrap();
        assert!(curve.sample(f64::NAN).is_nan());
        assert!(curve.sample(-f64::NAN).is_nan());
        assert_eq!(curve.sample(f64::INFINITY), 50.0);
        assert_eq!(curve.sample(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn construction_rejects_malformed_knots() {
        assert!(Curve::new(vec![], vec![]).is_err());
        assert!(Curve::new(vec![1.0, 2.0], vec![1.0]).is_err());
        assert!(Curve::new(vec![1.0, 1.0], vec![1.0, 2.0]).is_err());
        assert!(Curve::new(vec![2.0, 1.0], vec![1.0, 2.0]).is_err());
        assert!(Curve::new(vec![1.0, f64::NAN], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn ratchet_repairs_non_monotonic_curves() {
        let mut curve =
            Curve::new(vec![0.0, 1.0, 2.0, 3.0, 4.0], vec![-1.0, 20.0, 15.0, 30.0, 25.0]).unwrap();
        assert!(!curve.is_monotonic());
        curve.force_non_negative_monotonic();
        assert!(curve.is_monotonic());
        assert_eq!(curve.ys(), &[0.0, 20.0, 20.0, 30.0, 30.0]);
    }

    #[test]
    fn deserialization_validates() {
        let ok: Curve = serde_yaml::from_str("xs: [0, 1]\nys: [0, 50]").unwrap();
        assert_eq!(ok.sample(0.5), 25.0);
        let bad: std::result::Result<Curve, _> = serde_yaml::from_str("xs: [0, 1]\nys: [0]");
        assert!(bad.is_err());
    }
}
