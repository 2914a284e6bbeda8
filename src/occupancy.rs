//! Occupancy types: named bundles of damage function families.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::curve::Curve;
use crate::damage_function::{DamageFunctionFamily, ValueSampler};
use crate::error::{ConsequencesError, Result};

pub const STRUCTURE_COMPONENT: &str = "structure";
pub const CONTENTS_COMPONENT: &str = "contents";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(bound(deserialize = "DamageFunctionFamily<S>: Deserialize<'de>"))]
pub struct OccupancyType<S> {
    pub name: String,
    components: HashMap<String, DamageFunctionFamily<S>>,
}

pub type StochasticOccupancyType = OccupancyType<ValueSampler>;
pub type DeterministicOccupancyType = OccupancyType<Curve>;

impl<S> OccupancyType<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: HashMap::new(),
        }
    }

    pub fn with_component(
        mut self,
        component: impl Into<String>,
        family: DamageFunctionFamily<S>,
    ) -> Self {
        self.components.insert(component.into(), family);
        self
    }

    pub fn component(&self, component: &str) -> Result<&DamageFunctionFamily<S>> {
        self.components
            .get(component)
            .ok_or_else(|| ConsequencesError::MissingComponent {
                occupancy_type: self.name.clone(),
                component: component.to_string(),
            })
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Structure and contents families must both exist before the type is used.
    pub fn validate(&self) -> Result<()> {
        self.component(STRUCTURE_COMPONENT)?;
        self.component(CONTENTS_COMPONENT)?;
        Ok(())
    }
}

impl StochasticOccupancyType {
    /// Collapses every family with one shared draw.
    pub fn sample(&self, draw: f64) -> Result<DeterministicOccupancyType> {
        let components = self
            .components
            .iter()
            .map(|(name, family)| Ok((name.clone(), family.collapse(draw)?)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(OccupancyType {
            name: self.name.clone(),
            components,
        })
    }

    pub fn central_tendency(&self) -> DeterministicOccupancyType {
        OccupancyType {
            name: self.name.clone(),
            components: self
                .components
                .iter()
                .map(|(name, family)| (name.clone(), family.central_tendency()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyResolution {
    Exact,
    Substituted,
}

/// Occupancy types by name plus the documented default used for unknown names.
#[derive(Debug, Clone)]
pub struct OccupancyTypeMap {
    types: HashMap<String, Arc<StochasticOccupancyType>>,
    default_name: String,
}

impl OccupancyTypeMap {
    pub fn new(
        types: impl IntoIterator<Item = StochasticOccupancyType>,
        default_name: impl Into<String>,
    ) -> Result<Self> {
        let default_name = default_name.into();
        let mut map = HashMap::new();
        for occupancy_type in types {
            occupancy_type.validate()?;
            let name = occupancy_type.name.clone();
            if map.insert(name.clone(), Arc::new(occupancy_type)).is_some() {
                return Err(ConsequencesError::configuration(format!(
                    "occupancy type '{name}' defined more than once"
                )));
            }
        }
        if !map.contains_key(&default_name) {
            return Err(ConsequencesError::configuration(format!(
                "default occupancy type '{default_name}' is not defined"
            )));
        }
        Ok(Self {
            types: map,
            default_name,
        })
    }

    pub fn get(&self, name: &str) -> Result<Arc<StochasticOccupancyType>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| ConsequencesError::UnresolvedOccupancyType(name.to_string()))
    }

    /// Looks up `name`, substituting the default type when it is unknown.
    pub fn resolve(&self, name: &str) -> (Arc<StochasticOccupancyType>, OccupancyResolution) {
        match self.get(name) {
            Ok(occupancy_type) => (occupancy_type, OccupancyResolution::Exact),
            Err(err) => {
                warn!(
                    requested = name,
                    substitute = %self.default_name,
                    error = %err,
                    "substituting default occupancy type"
                );
                (
                    Arc::clone(&self.types[&self.default_name]),
                    OccupancyResolution::Substituted,
                )
            }
        }
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage_function::DamageFunction;
    use crate::distribution::ValueDistribution;
    use crate::hazards::HazardParameter;
    use crate::uncertain_curve::UncertainCurve;

    fn family(max: f64) -> DamageFunctionFamily<ValueSampler> {
        let uncertain = UncertainCurve::new(
            vec![0.0, 8.0],
            vec![
                ValueDistribution::deterministic(0.0),
                ValueDistribution::Uniform {
                    min: max - 10.0,
                    max,
                },
            ],
        )
        .unwrap();
        DamageFunctionFamily::new(DamageFunction::new(
            "test",
            HazardParameter::Depth,
            ValueSampler::from(uncertain),
        ))
        .unwrap()
    }

    fn residential() -> StochasticOccupancyType {
        OccupancyType::new("RES1")
            .with_component(STRUCTURE_COMPONENT, family(60.0))
            .with_component(CONTENTS_COMPONENT, family(80.0))
    }

    #[test]
    fn sampling_shares_one_draw_across_components() {
        let sampled = residential().sample(1.0).unwrap();
        let structure = sampled.component(STRUCTURE_COMPONENT).unwrap();
        let contents = sampled.component(CONTENTS_COMPONENT).unwrap();
        assert!((structure.default_function().sampler.ys()[1] - 60.0).abs() < 1e-6);
        assert!((contents.default_function().sampler.ys()[1] - 80.0).abs() < 1e-6);
    }

    #[test]
    fn missing_component_is_reported() {
        let partial =
            OccupancyType::new("COM1").with_component(STRUCTURE_COMPONENT, family(50.0));
        assert!(matches!(
            partial.validate(),
            Err(ConsequencesError::MissingComponent { .. })
        ));
    }

    #[test]
    fn unknown_names_resolve_to_default() {
        let map = OccupancyTypeMap::new([residential()], "RES1").unwrap();
        let (found, resolution) = map.resolve("RES1");
        assert_eq!(found.name, "RES1");
        assert_eq!(resolution, OccupancyResolution::Exact);

        let (substitute, resolution) = map.resolve("IND7");
        assert_eq!(substitute.name, "RES1");
        assert_eq!(resolution, OccupancyResolution::Substituted);
        assert!(matches!(
            map.get("IND7"),
            Err(ConsequencesError::UnresolvedOccupancyType(_))
        ));
    }

    #[test]
    fn map_requires_its_default() {
        assert!(OccupancyTypeMap::new([residential()], "COM1").is_err());
    }
}
