//! YAML scenarios and the builders that turn them into runnable parts.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::compute::{ComputeSettings, InMemoryAssetProvider};
use crate::distribution::ValueDistribution;
use crate::hazards::{
    BoundingBox, GriddedHazardProvider, HazardEvent, HazardProvider, Location,
    UniformHazardProvider,
};
use crate::lifeloss::{
    ComplianceWarning, LethalityCurves, LifeLossEngine, NoWarning, StabilityCriteria,
    StabilityTable, WarningSystem,
};
use crate::occupancy::{OccupancyResolution, OccupancyTypeMap, StochasticOccupancyType};
use crate::rng::RngManager;
use crate::structures::{ConstructionType, PopulationSet, StochasticAsset};

fn default_log_level() -> String {
    "info".to_string()
}

fn default_num_stories() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default)]
    pub central_tendency: bool,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub default_occupancy_type: String,
    pub occupancy_types: Vec<StochasticOccupancyType>,
    pub hazard: HazardConfig,
    #[serde(default)]
    pub life_loss: Option<LifeLossConfig>,
    pub assets: Vec<AssetConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HazardConfig {
    Uniform {
        event: HazardEvent,
        boundary: BoundingBox,
    },
    Gridded {
        origin: Location,
        cell_size: f64,
        columns: usize,
        cells: Vec<Option<HazardEvent>>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct LifeLossConfig {
    #[serde(default)]
    pub compliance_rate: Option<ComplianceWarning>,
    pub lethality: LethalityCurves,
    #[serde(default)]
    pub stability: HashMap<ConstructionType, StabilityCriteria>,
}

/// A value given either as a plain number or as a distribution.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ValueInput {
    Fixed(f64),
    Distribution(ValueDistribution),
}

impl From<ValueInput> for ValueDistribution {
    fn from(value: ValueInput) -> Self {
        match value {
            ValueInput::Fixed(value) => ValueDistribution::deterministic(value),
            ValueInput::Distribution(distribution) => distribution,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub damage_category: String,
    pub occupancy_type: String,
    pub structure_value: ValueInput,
    pub content_value: ValueInput,
    pub foundation_height: ValueInput,
    #[serde(default)]
    pub construction_type: ConstructionType,
    #[serde(default = "default_num_stories")]
    pub num_stories: u32,
    #[serde(default)]
    pub firm_zone: Option<String>,
    #[serde(default)]
    pub population: PopulationSet,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn build_occupancy_map(&self) -> Result<OccupancyTypeMap> {
        OccupancyTypeMap::new(
            self.occupancy_types.iter().cloned(),
            self.default_occupancy_type.clone(),
        )
        .with_context(|| format!("Invalid occupancy types in scenario '{}'", self.name))
    }

    /// Resolves every asset's occupancy type; unknown names get the default.
    pub fn build_assets(
        &self,
        occupancy_types: &OccupancyTypeMap,
    ) -> Result<Vec<StochasticAsset>> {
        self.assets
            .iter()
            .map(|config| {
                let structure_value: ValueDistribution = config.structure_value.clone().into();
                let content_value: ValueDistribution = config.content_value.clone().into();
                let foundation_height: ValueDistribution =
                    config.foundation_height.clone().into();
                for distribution in [&structure_value, &content_value, &foundation_height] {
                    distribution
                        .validate()
                        .with_context(|| format!("Invalid values for asset '{}'", config.name))?;
                }

                let (occupancy_type, resolution) =
                    occupancy_types.resolve(&config.occupancy_type);
                if resolution == OccupancyResolution::Substituted {
                    tracing::debug!(asset = %config.name, "asset uses substituted occupancy type");
                }

                Ok(StochasticAsset {
                    name: config.name.clone(),
                    location: Location::new(config.x, config.y),
                    damage_category: config.damage_category.clone(),
                    requested_occupancy: config.occupancy_type.clone(),
                    occupancy_type,
                    structure_value,
                    content_value,
                    foundation_height,
                    construction_type: config.construction_type,
                    num_stories: config.num_stories,
                    firm_zone: config.firm_zone.clone(),
                    population: config.population,
                })
            })
            .collect()
    }

    pub fn build_asset_provider(&self) -> Result<InMemoryAssetProvider> {
        let occupancy_types = self.build_occupancy_map()?;
        Ok(InMemoryAssetProvider::new(self.build_assets(&occupancy_types)?))
    }

    pub fn build_hazard(&self) -> Result<Arc<dyn HazardProvider>> {
        let provider: Arc<dyn HazardProvider> = match &self.hazard {
            HazardConfig::Uniform { event, boundary } => {
                Arc::new(UniformHazardProvider::new(event.clone(), *boundary))
            }
            HazardConfig::Gridded {
                origin,
                cell_size,
                columns,
                cells,
            } => Arc::new(
                GriddedHazardProvider::new(*origin, *cell_size, *columns, cells.clone())
                    .context("Invalid hazard grid")?,
            ),
        };
        Ok(provider)
    }

    pub fn build_life_loss(&self) -> Result<Option<LifeLossEngine>> {
        let Some(config) = &self.life_loss else {
            return Ok(None);
        };

        let mut stability = StabilityTable::default();
        for (construction_type, criteria) in &config.stability {
            stability = stability
                .with_override(*construction_type, *criteria)
                .with_context(|| {
                    format!("Invalid stability criteria for '{}'", construction_type.name())
                })?;
        }

        let warning: Arc<dyn WarningSystem> = match config.compliance_rate {
            Some(compliance) => Arc::new(compliance),
            None => Arc::new(NoWarning),
        };

        Ok(Some(
            LifeLossEngine::new(config.lethality.clone())
                .with_stability(stability)
                .with_warning(warning),
        ))
    }

    /// Overrides come from the command line; `None` keeps the scenario value.
    pub fn compute_settings(
        &self,
        seed: Option<u64>,
        central_tendency: bool,
        life_loss: bool,
    ) -> Result<ComputeSettings> {
        let life_loss = if life_loss {
            self.build_life_loss()?.map(Arc::new)
        } else {
            None
        };
        Ok(ComputeSettings {
            rng: RngManager::new(seed.unwrap_or(self.seed)),
            central_tendency: central_tendency || self.central_tendency,
            life_loss,
        })
    }
}
