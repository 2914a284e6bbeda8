//! Structures at risk: stochastic inventory records and their sampled form.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::distribution::ValueDistribution;
use crate::error::Result;
use crate::hazards::{HazardEvent, HazardParameter, Location};
use crate::occupancy::{
    DeterministicOccupancyType, StochasticOccupancyType, CONTENTS_COMPONENT, STRUCTURE_COMPONENT,
};
use crate::rng::RandomSource;

/// Wave height assumed for V-prefixed FIRM zones when the event carries none.
pub const V_ZONE_WAVE_HEIGHT: f64 = 3.0;

/// Occupants by time of day (2am / 2pm) and age (under / over 65).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PopulationSet {
    #[serde(default)]
    pub pop2am_u65: u32,
    #[serde(default)]
    pub pop2am_o65: u32,
    #[serde(default)]
    pub pop2pm_u65: u32,
    #[serde(default)]
    pub pop2pm_o65: u32,
}

impl PopulationSet {
    pub fn new(pop2am_u65: u32, pop2am_o65: u32, pop2pm_u65: u32, pop2pm_o65: u32) -> Self {
        Self {
            pop2am_u65,
            pop2am_o65,
            pop2pm_u65,
            pop2pm_o65,
        }
    }

    /// Buckets in the order randomness is consumed: 2am u65, 2am o65, 2pm u65, 2pm o65.
    pub fn buckets(&self) -> [u32; 4] {
        [
            self.pop2am_u65,
            self.pop2am_o65,
            self.pop2pm_u65,
            self.pop2pm_o65,
        ]
    }

    pub fn from_buckets(buckets: [u32; 4]) -> Self {
        Self::new(buckets[0], buckets[1], buckets[2], buckets[3])
    }

    pub fn total(&self) -> u64 {
        self.buckets().iter().map(|&count| count as u64).sum()
    }

    pub fn night_total(&self) -> u64 {
        self.pop2am_u65 as u64 + self.pop2am_o65 as u64
    }

    pub fn day_total(&self) -> u64 {
        self.pop2pm_u65 as u64 + self.pop2pm_o65 as u64
    }

    pub fn is_within(&self, other: &PopulationSet) -> bool {
        self.buckets()
            .iter()
            .zip(other.buckets().iter())
            .all(|(mine, theirs)| mine <= theirs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionType {
    #[default]
    Wood,
    WoodAnchored,
    Masonry,
    Concrete,
    Steel,
    Manufactured,
}

impl ConstructionType {
    pub fn name(self) -> &'static str {
        match self {
            ConstructionType::Wood => "wood",
            ConstructionType::WoodAnchored => "wood_anchored",
            ConstructionType::Masonry => "masonry",
            ConstructionType::Concrete => "concrete",
            ConstructionType::Steel => "steel",
            ConstructionType::Manufactured => "manufactured",
        }
    }
}

/// How a stochastic asset is turned into a deterministic one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    Seeded(u64),
    CentralTendency,
}

/// An inventory record whose values may be uncertain.
#[derive(Debug, Clone)]
pub struct StochasticAsset {
    pub name: String,
    pub location: Location,
    pub damage_category: String,
    /// Occupancy type named by the inventory, which may differ from the
    /// resolved type when the default was substituted.
    pub requested_occupancy: String,
    pub occupancy_type: Arc<StochasticOccupancyType>,
    pub structure_value: ValueDistribution,
    pub content_value: ValueDistribution,
    pub foundation_height: ValueDistribution,
    pub construction_type: ConstructionType,
    pub num_stories: u32,
    pub firm_zone: Option<String>,
    pub population: PopulationSet,
}

impl StochasticAsset {
    pub fn occupancy_substituted(&self) -> bool {
        self.requested_occupancy != self.occupancy_type.name
    }

    /// Draws structure value, content value, foundation height and then the
    /// occupancy curves, in that order, from a stream seeded by `seed`.
    pub fn sample(&self, mode: SamplingMode) -> Result<DeterministicAsset> {
        let (structure_value, content_value, foundation_height, occupancy_type) = match mode {
            SamplingMode::Seeded(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let structure_value = self.structure_value.inv_cdf(rng.next_float())?;
                let content_value = self.content_value.inv_cdf(rng.next_float())?;
                let foundation_height = self.foundation_height.inv_cdf(rng.next_float())?;
                let occupancy_type = self.occupancy_type.sample(rng.next_float())?;
                (
                    structure_value,
                    content_value,
                    foundation_height,
                    occupancy_type,
                )
            }
            SamplingMode::CentralTendency => (
                self.structure_value.central_tendency(),
                self.content_value.central_tendency(),
                self.foundation_height.central_tendency(),
                self.occupancy_type.central_tendency(),
            ),
        };

        Ok(DeterministicAsset {
            name: self.name.clone(),
            location: self.location,
            damage_category: self.damage_category.clone(),
            occupancy_substituted: self.occupancy_substituted(),
            occupancy_type,
            structure_value,
            content_value,
            foundation_height,
            construction_type: self.construction_type,
            num_stories: self.num_stories,
            firm_zone: self.firm_zone.clone(),
            population: self.population,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeterministicAsset {
    pub name: String,
    pub location: Location,
    pub damage_category: String,
    pub occupancy_substituted: bool,
    pub occupancy_type: DeterministicOccupancyType,
    pub structure_value: f64,
    pub content_value: f64,
    pub foundation_height: f64,
    pub construction_type: ConstructionType,
    pub num_stories: u32,
    pub firm_zone: Option<String>,
    pub population: PopulationSet,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DamageResult {
    pub structure_damage: f64,
    pub content_damage: f64,
    /// Fractions of value lost, in `[0, 1]` for well-formed curves.
    pub structure_damage_fraction: f64,
    pub content_damage_fraction: f64,
}

impl DeterministicAsset {
    pub fn in_v_zone(&self) -> bool {
        self.firm_zone
            .as_deref()
            .map(|zone| zone.trim().to_ascii_uppercase().starts_with('V'))
            .unwrap_or(false)
    }

    /// The event damage functions are resolved against. Depth-only coastal
    /// events in V zones are treated as carrying a breaking wave.
    pub fn effective_event(&self, event: &HazardEvent) -> HazardEvent {
        if self.in_v_zone()
            && event.has(HazardParameter::Depth)
            && !event.has(HazardParameter::WaveHeight)
        {
            event.clone().with_wave_height(V_ZONE_WAVE_HEIGHT)
        } else {
            event.clone()
        }
    }

    pub fn compute_damage(&self, event: &HazardEvent) -> Result<DamageResult> {
        let event = self.effective_event(event);
        let structure_family = self.occupancy_type.component(STRUCTURE_COMPONENT)?;
        let contents_family = self.occupancy_type.component(CONTENTS_COMPONENT)?;

        let structure_fraction = structure_family
            .resolve(&event)
            .sample(&event, self.foundation_height)?
            / 100.0;
        let content_fraction = contents_family
            .resolve(&event)
            .sample(&event, self.foundation_height)?
            / 100.0;

        Ok(DamageResult {
            structure_damage: structure_fraction * self.structure_value,
            content_damage: content_fraction * self.content_value,
            structure_damage_fraction: structure_fraction,
            content_damage_fraction: content_fraction,
        })
    }
}
