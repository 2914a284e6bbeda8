//! Hazard providers: where hazard events come from for a location.

use serde::{Deserialize, Serialize};

use super::HazardEvent;
use crate::error::{ConsequencesError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        if !(min_x <= max_x && min_y <= max_y) {
            return Err(ConsequencesError::configuration(format!(
                "bounding box minimum ({min_x}, {min_y}) exceeds maximum ({max_x}, {max_y})"
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn contains(&self, location: Location) -> bool {
        location.x >= self.min_x
            && location.x <= self.max_x
            && location.y >= self.min_y
            && location.y <= self.max_y
    }
}

/// Source of hazard events by location. Implementations are shared read-only
/// across pipeline workers.
pub trait HazardProvider: Send + Sync {
    /// `Ok(None)` when the location holds no hazard.
    fn provide_hazard(&self, location: Location) -> Result<Option<HazardEvent>>;

    fn hazard_boundary(&self) -> BoundingBox;
}

/// Same event everywhere inside the boundary.
pub struct UniformHazardProvider {
    event: HazardEvent,
    boundary: BoundingBox,
}

impl UniformHazardProvider {
    pub fn new(event: HazardEvent, boundary: BoundingBox) -> Self {
        Self { event, boundary }
    }
}

impl HazardProvider for UniformHazardProvider {
    fn provide_hazard(&self, location: Location) -> Result<Option<HazardEvent>> {
        if self.boundary.contains(location) {
            Ok(Some(self.event.clone()))
        } else {
            Ok(None)
        }
    }

    fn hazard_boundary(&self) -> BoundingBox {
        self.boundary
    }
}

/// Regular in-memory grid of events, row-major from the lower-left origin.
/// Empty cells hold no hazard.
pub struct GriddedHazardProvider {
    origin: Location,
    cell_size: f64,
    columns: usize,
    rows: usize,
    cells: Vec<Option<HazardEvent>>,
}

impl GriddedHazardProvider {
    pub fn new(
        origin: Location,
        cell_size: f64,
        columns: usize,
        cells: Vec<Option<HazardEvent>>,
    ) -> Result<Self> {
        if !(cell_size > 0.0) {
            return Err(ConsequencesError::configuration(format!(
                "grid cell size must be positive, got {cell_size}"
            )));
        }
        if columns == 0 || cells.is_empty() || cells.len() % columns != 0 {
            return Err(ConsequencesError::configuration(format!(
                "grid of {} cells cannot be split into {columns} columns",
                cells.len()
            )));
        }
        let rows = cells.len() / columns;
        Ok(Self {
            origin,
            cell_size,
            columns,
            rows,
            cells,
        })
    }

    fn cell_index(&self, location: Location) -> Option<usize> {
        let column = ((location.x - self.origin.x) / self.cell_size).floor();
        let row = ((location.y - self.origin.y) / self.cell_size).floor();
        if column < 0.0 || row < 0.0 {
            return None;
        }
        let (column, row) = (column as usize, row as usize);
        if column >= self.columns || row >= self.rows {
            return None;
        }
        Some(row * self.columns + column)
    }
}

impl HazardProvider for GriddedHazardProvider {
    fn provide_hazard(&self, location: Location) -> Result<Option<HazardEvent>> {
        Ok(self
            .cell_index(location)
            .and_then(|index| self.cells[index].clone()))
    }

    fn hazard_boundary(&self) -> BoundingBox {
        BoundingBox {
            min_x: self.origin.x,
            min_y: self.origin.y,
            max_x: self.origin.x + self.columns as f64 * self.cell_size,
            max_y: self.origin.y + self.rows as f64 * self.cell_size,
        }
    }
}
