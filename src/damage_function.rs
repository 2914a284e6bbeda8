//! Damage functions and families keyed by hazard parameter signature.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::curve::Curve;
use crate::error::{ConsequencesError, Result};
use crate::hazards::{HazardEvent, HazardParameter, HazardParameterSet};
use crate::uncertain_curve::UncertainCurve;

/// Either a realized curve or one that still carries uncertainty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueSampler {
    Paired(Curve),
    Uncertain(UncertainCurve),
}

impl ValueSampler {
    pub fn collapse(&self, draw: f64) -> Result<Curve> {
        match self {
            ValueSampler::Paired(curve) => Ok(curve.clone()),
            ValueSampler::Uncertain(uncertain) => uncertain.collapse(draw),
        }
    }

    pub fn central_tendency(&self) -> Curve {
        match self {
            ValueSampler::Paired(curve) => curve.clone(),
            ValueSampler::Uncertain(uncertain) => uncertain.central_tendency(),
        }
    }
}

impl From<Curve> for ValueSampler {
    fn from(value: Curve) -> Self {
        ValueSampler::Paired(value)
    }
}

impl From<UncertainCurve> for ValueSampler {
    fn from(value: UncertainCurve) -> Self {
        ValueSampler::Uncertain(value)
    }
}

/// A curve plus the hazard parameter that drives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageFunction<S> {
    #[serde(default)]
    pub source: String,
    #[serde(default = "default_driver")]
    pub driver: HazardParameter,
    pub sampler: S,
}

fn default_driver() -> HazardParameter {
    HazardParameter::Depth
}

impl<S> DamageFunction<S> {
    pub fn new(source: impl Into<String>, driver: HazardParameter, sampler: S) -> Self {
        Self {
            source: source.into(),
            driver,
            sampler,
        }
    }

    /// Depth-driven curves are sampled at depth above the first floor; every
    /// other driver uses the raw event value.
    pub fn driver_value(&self, event: &HazardEvent, foundation_height: f64) -> Result<f64> {
        let raw = event.require(self.driver)?;
        Ok(match self.driver {
            HazardParameter::Depth => raw - foundation_height,
            _ => raw,
        })
    }

    fn validate(&self) -> Result<()> {
        if !self.driver.is_numeric() {
            return Err(ConsequencesError::configuration(format!(
                "damage function '{}' is driven by non-numeric parameter '{}'",
                self.source, self.driver
            )));
        }
        Ok(())
    }

    fn try_map<T>(&self, f: impl Fn(&S) -> Result<T>) -> Result<DamageFunction<T>> {
        Ok(DamageFunction {
            source: self.source.clone(),
            driver: self.driver,
            sampler: f(&self.sampler)?,
        })
    }
}

impl DamageFunction<Curve> {
    /// Damage in the curve's units (percent) for this event.
    pub fn sample(&self, event: &HazardEvent, foundation_height: f64) -> Result<f64> {
        Ok(self
            .sampler
            .sample(self.driver_value(event, foundation_height)?))
    }
}

/// Damage functions keyed by the exact parameter set of the hazard, with a
/// required default used whenever no key matches.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageFunctionFamily<S> {
    default: DamageFunction<S>,
    functions: HashMap<HazardParameterSet, DamageFunction<S>>,
}

pub type StochasticDamageFunctionFamily = DamageFunctionFamily<ValueSampler>;
pub type DeterministicDamageFunctionFamily = DamageFunctionFamily<Curve>;

impl<S> DamageFunctionFamily<S> {
    pub fn new(default: DamageFunction<S>) -> Result<Self> {
        default.validate()?;
        Ok(Self {
            default,
            functions: HashMap::new(),
        })
    }

    pub fn with_function(
        mut self,
        parameters: HazardParameterSet,
        function: DamageFunction<S>,
    ) -> Result<Self> {
        function.validate()?;
        if self.functions.contains_key(&parameters) {
            return Err(ConsequencesError::configuration(format!(
                "damage function family already has an entry for '{parameters}'"
            )));
        }
        self.functions.insert(parameters, function);
        Ok(self)
    }

    /// No partial matching: an event carrying any parameter the family was not
    /// keyed for falls back to the default.
    pub fn resolve(&self, event: &HazardEvent) -> &DamageFunction<S> {
        self.resolve_parameters(event.parameters())
    }

    pub fn resolve_parameters(&self, parameters: HazardParameterSet) -> &DamageFunction<S> {
        self.functions.get(&parameters).unwrap_or(&self.default)
    }

    pub fn default_function(&self) -> &DamageFunction<S> {
        &self.default
    }

    pub fn keys(&self) -> impl Iterator<Item = &HazardParameterSet> {
        self.functions.keys()
    }

    fn try_map<T>(&self, f: impl Fn(&S) -> Result<T>) -> Result<DamageFunctionFamily<T>> {
        let default = self.default.try_map(&f)?;
        let functions = self
            .functions
            .iter()
            .map(|(key, function)| Ok((*key, function.try_map(&f)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(DamageFunctionFamily { default, functions })
    }
}

impl StochasticDamageFunctionFamily {
    pub fn collapse(&self, draw: f64) -> Result<DeterministicDamageFunctionFamily> {
        self.try_map(|sampler| sampler.collapse(draw))
    }

    pub fn central_tendency(&self) -> DeterministicDamageFunctionFamily {
        DamageFunctionFamily {
            default: DamageFunction {
                source: self.default.source.clone(),
                driver: self.default.driver,
                sampler: self.default.sampler.central_tendency(),
            },
            functions: self
                .functions
                .iter()
                .map(|(key, function)| {
                    (
                        *key,
                        DamageFunction {
                            source: function.source.clone(),
                            driver: function.driver,
                            sampler: function.sampler.central_tendency(),
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct FamilyDef {
    default: DamageFunction<ValueSampler>,
    #[serde(default)]
    functions: Vec<KeyedFunctionDef>,
}

#[derive(Deserialize)]
struct KeyedFunctionDef {
    parameters: HazardParameterSet,
    #[serde(flatten)]
    function: DamageFunction<ValueSampler>,
}

impl<'de> Deserialize<'de> for StochasticDamageFunctionFamily {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let def = FamilyDef::deserialize(deserializer)?;
        let mut family = DamageFunctionFamily::new(def.default).map_err(serde::de::Error::custom)?;
        for keyed in def.functions {
            family = family
                .with_function(keyed.parameters, keyed.function)
                .map_err(serde::de::Error::custom)?;
        }
        Ok(family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::ValueDistribution;

    fn curve(ys: &[f64]) -> Curve {
        let xs = (0..ys.len()).map(|i| i as f64).collect();
        Curve::new(xs, ys.to_vec()).unwrap()
    }

    fn family() -> DeterministicDamageFunctionFamily {
        DamageFunctionFamily::new(DamageFunction::new(
            "depth only",
            HazardParameter::Depth,
            curve(&[0.0, 10.0, 20.0]),
        ))
        .unwrap()
        .with_function(
            HazardParameterSet::of(&[HazardParameter::Depth, HazardParameter::WaveHeight]),
            DamageFunction::new("coastal", HazardParameter::Depth, curve(&[0.0, 50.0, 90.0])),
        )
        .unwrap()
        .with_function(
            HazardParameterSet::of(&[HazardParameter::Erosion]),
            DamageFunction::new("erosion", HazardParameter::Erosion, curve(&[0.0, 100.0])),
        )
        .unwrap()
    }

    #[test]
    fn exact_match_resolves_keyed_function() {
        let family = family();
        let event = HazardEvent::depth_event(1.0).with_wave_height(4.0);
        assert_eq!(family.resolve(&event).source, "coastal");
    }

    #[test]
    fn extra_parameters_fall_back_to_default() {
        let family = family();
        let event = HazardEvent::depth_event(1.0)
            .with_wave_height(4.0)
            .with_salinity(true);
        assert_eq!(family.resolve(&event).source, "depth only");
        assert_eq!(
            family.resolve(&HazardEvent::depth_event(1.0)).source,
            "depth only"
        );
    }

    #[test]
    fn driver_selects_sampling_input() {
        let family = family();
        let depth = HazardEvent::depth_event(3.0);
        let sampled = family.resolve(&depth).sample(&depth, 1.0).unwrap();
        assert_eq!(sampled, 20.0);

        let erosion = HazardEvent::new().with_erosion(0.5);
        let sampled = family.resolve(&erosion).sample(&erosion, 1.0).unwrap();
        assert_eq!(sampled, 50.0);
    }

    #[test]
    fn non_numeric_driver_is_a_configuration_error() {
        let result = DamageFunctionFamily::new(DamageFunction::new(
            "salt",
            HazardParameter::Salinity,
            curve(&[0.0, 1.0]),
        ));
        assert!(matches!(result, Err(ConsequencesError::Configuration(_))));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let result = family().with_function(
            HazardParameterSet::of(&[HazardParameter::Erosion]),
            DamageFunction::new("again", HazardParameter::Erosion, curve(&[0.0])),
        );
        assert!(result.is_err());
    }

    #[test]
    fn stochastic_family_collapses_every_entry() {
        let uncertain = UncertainCurve::new(
            vec![0.0, 1.0],
            vec![
                ValueDistribution::deterministic(0.0),
                ValueDistribution::Uniform {
                    min: 20.0,
                    max: 40.0,
                },
            ],
        )
        .unwrap();
        let family = StochasticDamageFunctionFamily::new(DamageFunction::new(
            "uncertain",
            HazardParameter::Depth,
            ValueSampler::from(uncertain),
        ))
        .unwrap()
        .with_function(
            HazardParameterSet::of(&[HazardParameter::Erosion]),
            DamageFunction::new(
                "paired",
                HazardParameter::Erosion,
                ValueSampler::from(curve(&[0.0, 100.0])),
            ),
        )
        .unwrap();

        let collapsed = family.collapse(0.75).unwrap();
        let collapsed_ys = collapsed.default_function().sampler.ys();
        assert_eq!(collapsed_ys[0], 0.0);
        assert!((collapsed_ys[1] - 35.0).abs() < 1e-6);
        let central = family.central_tendency();
        assert_eq!(central.default_function().sampler.ys(), &[0.0, 30.0]);
        let erosion = HazardParameterSet::of(&[HazardParameter::Erosion]);
        assert_eq!(
            collapsed.resolve_parameters(erosion).sampler,
            curve(&[0.0, 100.0])
        );
    }

    #[test]
    fn family_deserializes_from_yaml() {
        let yaml = r#"
default:
  source: generic
  sampler:
    kind: paired
    xs: [0, 10]
    ys: [0, 100]
functions:
  - parameters: [depth, velocity]
    source: fast water
    sampler:
      kind: uncertain
      xs: [0, 10]
      ys:
        - type: deterministic
          value: 0
        - type: normal
          mean: 100
          std_dev: 5
"#;
        let family: StochasticDamageFunctionFamily = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(family.default_function().driver, HazardParameter::Depth);
        let event = HazardEvent::depth_event(2.0).with_velocity(3.0);
        assert_eq!(family.resolve(&event).source, "fast water");
    }
}
