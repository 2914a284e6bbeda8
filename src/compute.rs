//! Per-asset computation, result records and expected annual damage.

use std::ops::ControlFlow;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{ConsequencesError, Result};
use crate::hazards::{BoundingBox, HazardEvent, HazardProvider};
use crate::lifeloss::{LifeLossEngine, LifeLossResult};
use crate::rng::{RngManager, RngStream};
use crate::structures::{DamageResult, DeterministicAsset, SamplingMode, StochasticAsset};

pub const DAMAGE_FIELDS: [&str; 17] = [
    "name",
    "x",
    "y",
    "damage_category",
    "occupancy_type",
    "structure_value",
    "content_value",
    "foundation_height",
    "structure_damage",
    "content_damage",
    "s_dam_per",
    "c_dam_per",
    "pop2amu65",
    "pop2amo65",
    "pop2pmu65",
    "pop2pmo65",
    "occupancy_substituted",
];

pub const LIFE_LOSS_FIELDS: [&str; 7] = [
    "stability",
    "lethality_zone",
    "population_period",
    "warning",
    "ll_u65",
    "ll_o65",
    "ll_tot",
];

/// Area under a damage-frequency curve.
///
/// `frequencies` are annual exceedance probabilities in decreasing order,
/// paired with the damage of each event. The curve is closed with a triangle
/// up to frequency 1 and a rectangle down to frequency 0.
pub fn compute_ead(damages: &[f64], frequencies: &[f64]) -> Result<f64> {
    if damages.len() != frequencies.len() || damages.is_empty() {
        return Err(ConsequencesError::configuration(format!(
            "expected annual damage needs matching, non-empty inputs (got {} damages, {} frequencies)",
            damages.len(),
            frequencies.len()
        )));
    }
    if frequencies.iter().any(|f| !(0.0..=1.0).contains(f))
        || frequencies.windows(2).any(|pair| pair[1] > pair[0])
    {
        return Err(ConsequencesError::configuration(
            "frequencies must lie in [0, 1] and be non-increasing",
        ));
    }

    let mut ead = 0.0;
    let (mut x1, mut y1) = (frequencies[0], damages[0]);
    if x1 != 1.0 {
        ead += (1.0 - x1) * y1 / 2.0;
    }
    for (&frequency, &damage) in frequencies.iter().zip(damages).skip(1) {
        let width = x1 - frequency;
        ead += width * y1 + width * (damage - y1) / 2.0;
        x1 = frequency;
        y1 = damage;
    }
    if x1 != 0.0 {
        ead += x1 * y1;
    }
    Ok(ead)
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ExpectedAnnualDamage {
    pub structure: f64,
    pub content: f64,
}

/// EAD of one asset over a set of events keyed by exceedance frequency.
/// Events may be given in any order.
pub fn expected_annual_damage(
    asset: &DeterministicAsset,
    events: &[(f64, HazardEvent)],
) -> Result<ExpectedAnnualDamage> {
    let mut ordered: Vec<&(f64, HazardEvent)> = events.iter().collect();
    ordered.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut frequencies = Vec::with_capacity(ordered.len());
    let mut structure = Vec::with_capacity(ordered.len());
    let mut content = Vec::with_capacity(ordered.len());
    for (frequency, event) in ordered {
        let damage = asset.compute_damage(event)?;
        frequencies.push(*frequency);
        structure.push(damage.structure_damage);
        content.push(damage.content_damage);
    }

    Ok(ExpectedAnnualDamage {
        structure: compute_ead(&structure, &frequencies)?,
        content: compute_ead(&content, &frequencies)?,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Integer(u64),
    Bool(bool),
    Null,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(value as u64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Flat, ordered record emitted for every computed asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRecord {
    fields: Vec<(&'static str, FieldValue)>,
}

impl ResultRecord {
    pub fn push(&mut self, name: &'static str, value: impl Into<FieldValue>) {
        self.fields.push((name, value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn damage(asset: &DeterministicAsset, damage: &DamageResult) -> Self {
        let mut record = ResultRecord::default();
        record.push("name", asset.name.as_str());
        record.push("x", asset.location.x);
        record.push("y", asset.location.y);
        record.push("damage_category", asset.damage_category.as_str());
        record.push("occupancy_type", asset.occupancy_type.name.as_str());
        record.push("structure_value", asset.structure_value);
        record.push("content_value", asset.content_value);
        record.push("foundation_height", asset.foundation_height);
        record.push("structure_damage", damage.structure_damage);
        record.push("content_damage", damage.content_damage);
        record.push("s_dam_per", damage.structure_damage_fraction * 100.0);
        record.push("c_dam_per", damage.content_damage_fraction * 100.0);
        record.push("pop2amu65", asset.population.pop2am_u65);
        record.push("pop2amo65", asset.population.pop2am_o65);
        record.push("pop2pmu65", asset.population.pop2pm_u65);
        record.push("pop2pmo65", asset.population.pop2pm_o65);
        record.push("occupancy_substituted", asset.occupancy_substituted);
        record
    }

    pub fn append_life_loss(&mut self, life_loss: &LifeLossResult) {
        self.push("stability", life_loss.stability.name());
        self.push(
            "lethality_zone",
            life_loss.lethality_zone.map(|zone| zone.name()),
        );
        self.push("population_period", life_loss.population_period.name());
        self.push("warning", life_loss.warning.as_str());
        self.push("ll_u65", life_loss.fatalities_u65);
        self.push("ll_o65", life_loss.fatalities_o65);
        self.push("ll_tot", life_loss.fatalities_total);
    }
}

impl Serialize for ResultRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionSelector {
    All,
    Within(BoundingBox),
}

impl RegionSelector {
    pub fn selects(&self, asset: &StochasticAsset) -> bool {
        match self {
            RegionSelector::All => true,
            RegionSelector::Within(boundary) => boundary.contains(asset.location),
        }
    }
}

/// Push-style, single-pass source of inventory records.
pub trait AssetStreamProvider: Send + Sync {
    /// Calls `callback` once per selected asset until the stream ends or the
    /// callback breaks.
    fn for_region(
        &self,
        selector: &RegionSelector,
        callback: &mut dyn FnMut(StochasticAsset) -> ControlFlow<()>,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAssetProvider {
    assets: Vec<StochasticAsset>,
}

impl InMemoryAssetProvider {
    pub fn new(assets: Vec<StochasticAsset>) -> Self {
        Self { assets }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetStreamProvider for InMemoryAssetProvider {
    fn for_region(
        &self,
        selector: &RegionSelector,
        callback: &mut dyn FnMut(StochasticAsset) -> ControlFlow<()>,
    ) -> Result<()> {
        for asset in self.assets.iter().filter(|asset| selector.selects(asset)) {
            if callback(asset.clone()).is_break() {
                break;
            }
        }
        Ok(())
    }
}

/// Run-wide settings shared by every worker.
#[derive(Debug, Clone, Default)]
pub struct ComputeSettings {
    pub rng: RngManager,
    pub central_tendency: bool,
    pub life_loss: Option<Arc<LifeLossEngine>>,
}

impl ComputeSettings {
    pub fn sampling_mode(&self, asset_index: u64) -> SamplingMode {
        if self.central_tendency {
            SamplingMode::CentralTendency
        } else {
            SamplingMode::Seeded(self.rng.asset_seed(asset_index, RngStream::Sampling))
        }
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = DAMAGE_FIELDS.to_vec();
        if self.life_loss.is_some() {
            names.extend(LIFE_LOSS_FIELDS);
        }
        names
    }
}

/// Samples, damages and (optionally) computes life loss for one asset.
/// `Ok(None)` when the hazard does not reach the asset.
pub fn compute_asset(
    asset_index: u64,
    asset: &StochasticAsset,
    hazard: &dyn HazardProvider,
    settings: &ComputeSettings,
) -> Result<Option<ResultRecord>> {
    let Some(event) = hazard.provide_hazard(asset.location)? else {
        return Ok(None);
    };

    let deterministic = asset.sample(settings.sampling_mode(asset_index))?;
    let damage = deterministic.compute_damage(&event)?;
    let mut record = ResultRecord::damage(&deterministic, &damage);

    if let Some(engine) = &settings.life_loss {
        let mut warning_rng = settings.rng.asset_rng(asset_index, RngStream::Warning);
        let mut lethality_rng = settings.rng.asset_rng(asset_index, RngStream::Lethality);
        let life_loss = engine.compute_life_loss(
            &event,
            &deterministic,
            &mut warning_rng,
            &mut lethality_rng,
        )?;
        record.append_life_loss(&life_loss);
    }

    Ok(Some(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ead_of_reference_curve() {
        let ead = compute_ead(&[1.0, 2.0, 3.0, 4.0], &[0.75, 0.5, 0.25, 0.0]).unwrap();
        assert!((ead - 2.0).abs() < 1e-12);
    }

    #[test]
    fn ead_closes_with_rectangle() {
        // single event at 10%: triangle 0.9 * 10 / 2 + rectangle 0.1 * 10
        let ead = compute_ead(&[10.0], &[0.1]).unwrap();
        assert!((ead - 5.5).abs() < 1e-12);
    }

    #[test]
    fn ead_starting_at_frequency_one_keeps_the_first_damage() {
        let flat = compute_ead(&[10.0, 10.0], &[1.0, 0.0]).unwrap();
        assert!((flat - 10.0).abs() < 1e-12);
        // trapezoid 0.5 * (8 + 4) / 2 + rectangle 0.5 * 4
        let ead = compute_ead(&[8.0, 4.0], &[1.0, 0.5]).unwrap();
        assert!((ead - 5.0).abs() < 1e-12);
    }

    #[test]
    fn ead_rejects_bad_input() {
        assert!(compute_ead(&[1.0, 2.0], &[0.5]).is_err());
        assert!(compute_ead(&[], &[]).is_err());
        assert!(compute_ead(&[1.0, 2.0], &[0.1, 0.5]).is_err());
    }

    #[test]
    fn record_serializes_in_field_order() {
        let mut record = ResultRecord::default();
        record.push("name", "a");
        record.push("x", 1.5);
        record.push("ll_tot", 3u64);
        record.push("lethality_zone", None::<&str>);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"name":"a","x":1.5,"ll_tot":3,"lethality_zone":null}"#);
        assert_eq!(record.get("x"), Some(&FieldValue::Number(1.5)));
        assert_eq!(record.names().collect::<Vec<_>>(), ["name", "x", "ll_tot", "lethality_zone"]);
    }
}
