//! Life loss: warning, structural stability, submergence and lethality.

mod lethality;
mod stability;
mod warning;

use std::fmt;
use std::sync::Arc;

use chrono::Timelike;
use rand::RngCore;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::hazards::{HazardEvent, HazardParameter};
use crate::rng::RandomSource;
use crate::structures::{DeterministicAsset, PopulationSet};

pub use lethality::{LethalityCurve, LethalityCurves, LethalityZone};
pub use stability::{StabilityCriteria, StabilityState, StabilityTable};
pub use warning::{apply_compliance, ComplianceWarning, NoWarning, WarningSystem};

/// Height of one story, in feet.
pub const STORY_HEIGHT: f64 = 9.0;
/// Reach above the first floor for people who cannot move upstairs, in feet.
pub const IMMOBILE_REACH: f64 = 2.0;

const DAY_START_HOUR: u32 = 8;
const DAY_END_HOUR: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mobility {
    Mobile,
    Immobile,
}

/// Whether occupants can move within or away from the structure after the
/// water arrives. Every asset is treated as mobile for now.
pub fn mobility_of(_asset: &DeterministicAsset) -> Mobility {
    Mobility::Mobile
}

/// Depth at which the occupants run out of places to go.
pub fn submergence_threshold(asset: &DeterministicAsset, mobility: Mobility) -> f64 {
    match mobility {
        Mobility::Mobile => asset.foundation_height + asset.num_stories.max(1) as f64 * STORY_HEIGHT,
        Mobility::Immobile => asset.foundation_height + IMMOBILE_REACH,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationPeriod {
    Day,
    Night,
}

impl PopulationPeriod {
    /// Day when the water arrives between 08:00 and 17:59 UTC; night otherwise,
    /// including events without an arrival time.
    pub fn of(event: &HazardEvent) -> Self {
        match event.arrival_time() {
            Some(arrival) if (DAY_START_HOUR..DAY_END_HOUR).contains(&arrival.hour()) => {
                PopulationPeriod::Day
            }
            _ => PopulationPeriod::Night,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PopulationPeriod::Day => "day",
            PopulationPeriod::Night => "night",
        }
    }

    /// (under 65, over 65) for this period.
    pub fn split(self, population: &PopulationSet) -> (u32, u32) {
        match self {
            PopulationPeriod::Day => (population.pop2pm_u65, population.pop2pm_o65),
            PopulationPeriod::Night => (population.pop2am_u65, population.pop2am_o65),
        }
    }
}

impl fmt::Display for PopulationPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fatalities {
    pub zone: Option<LethalityZone>,
    pub rate: f64,
    pub by_bucket: PopulationSet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifeLossResult {
    pub stability: StabilityState,
    pub lethality_zone: Option<LethalityZone>,
    pub population_period: PopulationPeriod,
    pub warning: String,
    /// Occupants left after warning.
    pub remaining: PopulationSet,
    pub by_bucket: PopulationSet,
    pub fatalities_u65: u64,
    pub fatalities_o65: u64,
    pub fatalities_total: u64,
}

pub struct LifeLossEngine {
    stability: StabilityTable,
    lethality: LethalityCurves,
    warning: Arc<dyn WarningSystem>,
}

impl fmt::Debug for LifeLossEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifeLossEngine")
            .field("stability", &self.stability)
            .field("lethality", &self.lethality)
            .field("warning", &self.warning.name())
            .finish()
    }
}

impl LifeLossEngine {
    pub fn new(lethality: LethalityCurves) -> Self {
        Self {
            stability: StabilityTable::default(),
            lethality,
            warning: Arc::new(NoWarning),
        }
    }

    pub fn with_stability(mut self, stability: StabilityTable) -> Self {
        self.stability = stability;
        self
    }

    pub fn with_warning(mut self, warning: Arc<dyn WarningSystem>) -> Self {
        self.warning = warning;
        self
    }

    pub fn stability_table(&self) -> &StabilityTable {
        &self.stability
    }

    /// Collapse needs both DV and Depth; events without DV are treated as
    /// leaving the structure standing.
    pub fn evaluate_stability(
        &self,
        event: &HazardEvent,
        asset: &DeterministicAsset,
    ) -> Result<StabilityState> {
        event.require(HazardParameter::Depth)?;
        if event.has(HazardParameter::Dv) {
            self.stability.evaluate(asset.construction_type, event)
        } else {
            Ok(StabilityState::Stable)
        }
    }

    /// Fatalities among `population` given the structure's state. Exactly one
    /// lethality draw is consumed when a zone applies, none otherwise.
    pub fn compute_fatalities<R: RngCore + ?Sized>(
        &self,
        event: &HazardEvent,
        asset: &DeterministicAsset,
        population: PopulationSet,
        stability: StabilityState,
        rng: &mut R,
    ) -> Result<Fatalities> {
        let depth = event.require(HazardParameter::Depth)?;
        let zone = match stability {
            StabilityState::Collapsed => Some(LethalityZone::High),
            StabilityState::Stable => {
                let threshold = submergence_threshold(asset, mobility_of(asset));
                (depth > threshold).then_some(LethalityZone::Low)
            }
        };

        let Some(zone) = zone else {
            return Ok(Fatalities {
                zone: None,
                rate: 0.0,
                by_bucket: PopulationSet::default(),
            });
        };

        let rate = self.lethality.for_zone(zone).sample_rate(rng.next_float())?;
        let mut buckets = population.buckets();
        for count in buckets.iter_mut() {
            let lost = (*count as f64 * rate).round() as u32;
            *count = lost.min(*count);
        }

        Ok(Fatalities {
            zone: Some(zone),
            rate,
            by_bucket: PopulationSet::from_buckets(buckets),
        })
    }

    pub fn compute_life_loss<W, L>(
        &self,
        event: &HazardEvent,
        asset: &DeterministicAsset,
        warning_rng: &mut W,
        lethality_rng: &mut L,
    ) -> Result<LifeLossResult>
    where
        W: RngCore,
        L: RngCore + ?Sized,
    {
        let stability = self.evaluate_stability(event, asset)?;
        let remaining = self.warning.warn(asset.population, warning_rng);
        let fatalities =
            self.compute_fatalities(event, asset, remaining, stability, lethality_rng)?;

        let period = PopulationPeriod::of(event);
        let (u65, o65) = period.split(&fatalities.by_bucket);
        debug!(
            asset = %asset.name,
            %stability,
            zone = ?fatalities.zone,
            rate = fatalities.rate,
            %period,
            "computed life loss"
        );

        Ok(LifeLossResult {
            stability,
            lethality_zone: fatalities.zone,
            population_period: period,
            warning: self.warning.name().to_string(),
            remaining,
            by_bucket: fatalities.by_bucket,
            fatalities_u65: u65 as u64,
            fatalities_o65: o65 as u64,
            fatalities_total: u65 as u64 + o65 as u64,
        })
    }
}
