//! Hazard events and the parameters they carry.
//!
//! A [`HazardEvent`] only ever reports the parameters whose values were set, so
//! the [`HazardParameterSet`] used to key damage function families cannot drift
//! from the accessors.

mod provider;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConsequencesError, Result};

pub use provider::{
    BoundingBox, GriddedHazardProvider, HazardProvider, Location, UniformHazardProvider,
};

/// Returned by numeric accessors for parameters the event does not carry.
pub const MISSING_VALUE: f64 = -901.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardParameter {
    Depth,
    Velocity,
    ArrivalTime,
    Erosion,
    Duration,
    WaveHeight,
    Salinity,
    Qualitative,
    #[serde(rename = "dv")]
    Dv,
}

impl HazardParameter {
    pub const ALL: [HazardParameter; 9] = [
        HazardParameter::Depth,
        HazardParameter::Velocity,
        HazardParameter::ArrivalTime,
        HazardParameter::Erosion,
        HazardParameter::Duration,
        HazardParameter::WaveHeight,
        HazardParameter::Salinity,
        HazardParameter::Qualitative,
        HazardParameter::Dv,
    ];

    pub fn name(self) -> &'static str {
        match self {
            HazardParameter::Depth => "depth",
            HazardParameter::Velocity => "velocity",
            HazardParameter::ArrivalTime => "arrival_time",
            HazardParameter::Erosion => "erosion",
            HazardParameter::Duration => "duration",
            HazardParameter::WaveHeight => "wave_height",
            HazardParameter::Salinity => "salinity",
            HazardParameter::Qualitative => "qualitative",
            HazardParameter::Dv => "dv",
        }
    }

    /// Parameters whose value can drive a damage curve.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            HazardParameter::Depth
                | HazardParameter::Velocity
                | HazardParameter::Erosion
                | HazardParameter::Duration
                | HazardParameter::WaveHeight
                | HazardParameter::Dv
        )
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for HazardParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of hazard parameters. Equality is exact membership equality, which is
/// what damage function families key on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<HazardParameter>", into = "Vec<HazardParameter>")]
pub struct HazardParameterSet {
    bits: u16,
}

impl HazardParameterSet {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub fn of(parameters: &[HazardParameter]) -> Self {
        parameters.iter().copied().collect()
    }

    pub fn with(mut self, parameter: HazardParameter) -> Self {
        self.bits |= parameter.bit();
        self
    }

    pub fn has(&self, parameter: HazardParameter) -> bool {
        self.bits & parameter.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = HazardParameter> + '_ {
        HazardParameter::ALL
            .into_iter()
            .filter(move |parameter| self.has(*parameter))
    }
}

impl FromIterator<HazardParameter> for HazardParameterSet {
    fn from_iter<T: IntoIterator<Item = HazardParameter>>(iter: T) -> Self {
        iter.into_iter()
            .fold(HazardParameterSet::empty(), |set, parameter| set.with(parameter))
    }
}

impl From<Vec<HazardParameter>> for HazardParameterSet {
    fn from(value: Vec<HazardParameter>) -> Self {
        value.into_iter().collect()
    }
}

impl From<HazardParameterSet> for Vec<HazardParameter> {
    fn from(value: HazardParameterSet) -> Self {
        value.iter().collect()
    }
}

impl fmt::Display for HazardParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(HazardParameter::name).collect();
        f.write_str(&names.join("|"))
    }
}

/// An immutable hazard observation at one location.
///
/// Depth, velocity, wave height and DV are in feet / feet per second, duration
/// in hours and erosion in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HazardEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    depth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    velocity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arrival_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    erosion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    wave_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    salinity: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    qualitative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dv: Option<f64>,
}

impl HazardEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth_event(depth: f64) -> Self {
        Self::new().with_depth(depth)
    }

    pub fn with_depth(self, depth: f64) -> Self {
        Self {
            depth: Some(depth),
            ..self
        }
    }

    pub fn with_velocity(self, velocity: f64) -> Self {
        Self {
            velocity: Some(velocity),
            ..self
        }
    }

    pub fn with_arrival_time(self, arrival_time: DateTime<Utc>) -> Self {
        Self {
            arrival_time: Some(arrival_time),
            ..self
        }
    }

    pub fn with_erosion(self, erosion: f64) -> Self {
        Self {
            erosion: Some(erosion),
            ..self
        }
    }

    pub fn with_duration(self, duration: f64) -> Self {
        Self {
            duration: Some(duration),
            ..self
        }
    }

    pub fn with_wave_height(self, wave_height: f64) -> Self {
        Self {
            wave_height: Some(wave_height),
            ..self
        }
    }

    pub fn with_salinity(self, salinity: bool) -> Self {
        Self {
            salinity: Some(salinity),
            ..self
        }
    }

    pub fn with_qualitative(self, qualitative: impl Into<String>) -> Self {
        Self {
            qualitative: Some(qualitative.into()),
            ..self
        }
    }

    pub fn with_dv(self, dv: f64) -> Self {
        Self { dv: Some(dv), ..self }
    }

    pub fn parameters(&self) -> HazardParameterSet {
        let mut set = HazardParameterSet::empty();
        let carried = [
            (HazardParameter::Depth, self.depth.is_some()),
            (HazardParameter::Velocity, self.velocity.is_some()),
            (HazardParameter::ArrivalTime, self.arrival_time.is_some()),
            (HazardParameter::Erosion, self.erosion.is_some()),
            (HazardParameter::Duration, self.duration.is_some()),
            (HazardParameter::WaveHeight, self.wave_height.is_some()),
            (HazardParameter::Salinity, self.salinity.is_some()),
            (HazardParameter::Qualitative, self.qualitative.is_some()),
            (HazardParameter::Dv, self.dv.is_some()),
        ];
        for (parameter, present) in carried {
            if present {
                set = set.with(parameter);
            }
        }
        set
    }

    pub fn has(&self, parameter: HazardParameter) -> bool {
        self.parameters().has(parameter)
    }

    pub fn depth(&self) -> f64 {
        self.depth.unwrap_or(MISSING_VALUE)
    }

    pub fn velocity(&self) -> f64 {
        self.velocity.unwrap_or(MISSING_VALUE)
    }

    pub fn arrival_time(&self) -> Option<DateTime<Utc>> {
        self.arrival_time
    }

    pub fn erosion(&self) -> f64 {
        self.erosion.unwrap_or(MISSING_VALUE)
    }

    pub fn duration(&self) -> f64 {
        self.duration.unwrap_or(MISSING_VALUE)
    }

    pub fn wave_height(&self) -> f64 {
        self.wave_height.unwrap_or(MISSING_VALUE)
    }

    pub fn salinity(&self) -> bool {
        self.salinity.unwrap_or(false)
    }

    pub fn qualitative(&self) -> &str {
        self.qualitative.as_deref().unwrap_or("")
    }

    pub fn dv(&self) -> f64 {
        self.dv.unwrap_or(MISSING_VALUE)
    }

    /// Value of a numeric parameter, failing when the event does not carry it
    /// or carries a non-finite value.
    pub fn require(&self, parameter: HazardParameter) -> Result<f64> {
        let value = match parameter {
            HazardParameter::Depth => self.depth,
            HazardParameter::Velocity => self.velocity,
            HazardParameter::Erosion => self.erosion,
            HazardParameter::Duration => self.duration,
            HazardParameter::WaveHeight => self.wave_height,
            HazardParameter::Dv => self.dv,
            HazardParameter::ArrivalTime
            | HazardParameter::Salinity
            | HazardParameter::Qualitative => {
                return Err(ConsequencesError::configuration(format!(
                    "hazard parameter '{parameter}' has no numeric value"
                )))
            }
        };
        let value = value.ok_or(ConsequencesError::MissingCapability(parameter))?;
        if !value.is_finite() {
            return Err(ConsequencesError::Sampling(format!(
                "hazard parameter '{parameter}' is not finite ({value})"
            )));
        }
        Ok(value)
    }
}

impl fmt::Display for HazardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hazard[{}]", self.parameters())?;
        for parameter in self.parameters().iter() {
            if let Ok(value) = self.require(parameter) {
                write!(f, " {parameter}={value:.2}")?;
            }
        }
        Ok(())
    }
}
