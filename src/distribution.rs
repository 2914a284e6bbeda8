//! Value distributions used by stochastic assets and uncertain curves.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, LogNormal, Normal, Triangular, Uniform};

use crate::error::{ConsequencesError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueDistribution {
    Deterministic { value: f64 },
    Normal { mean: f64, std_dev: f64 },
    Uniform { min: f64, max: f64 },
    Triangular { min: f64, most_likely: f64, max: f64 },
    /// Parameters of the underlying normal.
    LogNormal { mu: f64, sigma: f64 },
}

impl ValueDistribution {
    pub fn deterministic(value: f64) -> Self {
        ValueDistribution::Deterministic { value }
    }

    /// All mass at a single point.
    pub fn is_degenerate(&self) -> bool {
        match *self {
            ValueDistribution::Deterministic { .. } => true,
            ValueDistribution::Normal { std_dev, .. } => std_dev == 0.0,
            ValueDistribution::Uniform { min, max } => min == max,
            ValueDistribution::Triangular { min, max, .. } => min == max,
            ValueDistribution::LogNormal { sigma, .. } => sigma == 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let finite = match *self {
            ValueDistribution::Deterministic { value } => value.is_finite(),
            ValueDistribution::Normal { mean, std_dev } => mean.is_finite() && std_dev.is_finite(),
            ValueDistribution::Uniform { min, max } => min.is_finite() && max.is_finite(),
            ValueDistribution::Triangular {
                min,
                most_likely,
                max,
            } => min.is_finite() && most_likely.is_finite() && max.is_finite(),
            ValueDistribution::LogNormal { mu, sigma } => mu.is_finite() && sigma.is_finite(),
        };
        if !finite {
            return Err(ConsequencesError::configuration(format!(
                "distribution {self:?} has non-finite parameters"
            )));
        }
        match *self {
            ValueDistribution::Normal { std_dev, .. } if std_dev < 0.0 => Err(
                ConsequencesError::configuration(format!("normal std_dev {std_dev} is negative")),
            ),
            ValueDistribution::Uniform { min, max } if min > max => Err(
                ConsequencesError::configuration(format!("uniform min {min} exceeds max {max}")),
            ),
            ValueDistribution::Triangular {
                min,
                most_likely,
                max,
            } if !(min <= most_likely && most_likely <= max) => {
                Err(ConsequencesError::configuration(format!(
                    "triangular most_likely {most_likely} outside [{min}, {max}]"
                )))
            }
            ValueDistribution::LogNormal { sigma, .. } if sigma < 0.0 => Err(
                ConsequencesError::configuration(format!("lognormal sigma {sigma} is negative")),
            ),
            _ => Ok(()),
        }
    }

    /// Inverse cumulative distribution at probability `p`.
    pub fn inv_cdf(&self, p: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&p) {
            return Err(ConsequencesError::Sampling(format!(
                "probability {p} outside [0, 1]"
            )));
        }
        if self.is_degenerate() {
            return Ok(self.central_tendency());
        }
        let value = match *self {
            ValueDistribution::Deterministic { value } => value,
            ValueDistribution::Normal { mean, std_dev } => Normal::new(mean, std_dev)
                .map_err(|err| sampling_error("normal", err))?
                .inverse_cdf(p),
            ValueDistribution::Uniform { min, max } => Uniform::new(min, max)
                .map_err(|err| sampling_error("uniform", err))?
                .inverse_cdf(p),
            ValueDistribution::Triangular {
                min,
                most_likely,
                max,
            } => Triangular::new(min, max, most_likely)
                .map_err(|err| sampling_error("triangular", err))?
                .inverse_cdf(p),
            ValueDistribution::LogNormal { mu, sigma } => LogNormal::new(mu, sigma)
                .map_err(|err| sampling_error("lognormal", err))?
                .inverse_cdf(p),
        };
        if !value.is_finite() {
            return Err(ConsequencesError::Sampling(format!(
                "{self:?} cannot invert probability {p}"
            )));
        }
        Ok(value)
    }

    /// Mean for normal and uniform, mode for triangular, median for lognormal.
    pub fn central_tendency(&self) -> f64 {
        match *self {
            ValueDistribution::Deterministic { value } => value,
            ValueDistribution::Normal { mean, .. } => mean,
            ValueDistribution::Uniform { min, max } => (min + max) / 2.0,
            ValueDistribution::Triangular { most_likely, .. } => most_likely,
            ValueDistribution::LogNormal { mu, .. } => mu.exp(),
        }
    }
}

impl From<f64> for ValueDistribution {
    fn from(value: f64) -> Self {
        ValueDistribution::deterministic(value)
    }
}

fn sampling_error(kind: &str, err: impl std::fmt::Display) -> ConsequencesError {
    ConsequencesError::Sampling(format!("invalid {kind} distribution: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_median_is_mean() {
        let dist = ValueDistribution::Normal {
            mean: 100.0,
            std_dev: 15.0,
        };
        assert!((dist.inv_cdf(0.5).unwrap() - 100.0).abs() < 1e-9);
        assert!(dist.inv_cdf(0.9).unwrap() > 100.0);
        assert!(dist.inv_cdf(0.1).unwrap() < 100.0);
    }

    #[test]
    fn uniform_inverts_linearly() {
        let dist = ValueDistribution::Uniform {
            min: 10.0,
            max: 20.0,
        };
        assert!((dist.inv_cdf(0.25).unwrap() - 12.5).abs() < 1e-9);
        assert_eq!(dist.central_tendency(), 15.0);
    }

    #[test]
    fn triangular_respects_bounds() {
        let dist = ValueDistribution::Triangular {
            min: 0.0,
            most_likely: 2.0,
            max: 6.0,
        };
        let low = dist.inv_cdf(0.01).unwrap();
        let high = dist.inv_cdf(0.99).unwrap();
        assert!(low >= 0.0 && low < 2.0);
        assert!(high > 2.0 && high <= 6.0);
        assert_eq!(dist.central_tendency(), 2.0);
    }

    #[test]
    fn degenerate_distributions_ignore_the_draw() {
        let point_normal = ValueDistribution::Normal {
            mean: 4.0,
            std_dev: 0.0,
        };
        let point_uniform = ValueDistribution::Uniform { min: 7.0, max: 7.0 };
        for p in [0.0, 0.1, 0.5, 0.999, 1.0] {
            assert_eq!(point_normal.inv_cdf(p).unwrap(), 4.0);
            assert_eq!(point_uniform.inv_cdf(p).unwrap(), 7.0);
            assert_eq!(ValueDistribution::deterministic(3.0).inv_cdf(p).unwrap(), 3.0);
        }
    }

    #[test]
    fn out_of_range_and_unbounded_draws_are_sampling_errors() {
        let dist = ValueDistribution::Normal {
            mean: 0.0,
            std_dev: 1.0,
        };
        assert!(matches!(dist.inv_cdf(1.5), Err(ConsequencesError::Sampling(_))));
        assert!(matches!(dist.inv_cdf(1.0), Err(ConsequencesError::Sampling(_))));
    }

    #[test]
    fn validation_catches_bad_parameters() {
        assert!(ValueDistribution::Normal {
            mean: 0.0,
            std_dev: -1.0
        }
        .validate()
        .is_err());
        assert!(ValueDistribution::Triangular {
            min: 0.0,
            most_likely: 9.0,
            max: 5.0
        }
        .validate()
        .is_err());
        assert!(ValueDistribution::Uniform { min: 1.0, max: 2.0 }
            .validate()
            .is_ok());
    }

    #[test]
    fn deserializes_tagged_yaml() {
        let dist: ValueDistribution =
            serde_yaml::from_str("type: triangular\nmin: 1\nmost_likely: 2\nmax: 4").unwrap();
        assert_eq!(
            dist,
            ValueDistribution::Triangular {
                min: 1.0,
                most_likely: 2.0,
                max: 4.0
            }
        );
    }
}
