//! Tunable parameters for the energy grid.
//!
//! Collects the spatial-index and change-tracking knobs into a single
//! [`GridParams`] value owned by `PowerGrid`. Params can be built in code or
//! loaded from a JSON document; missing fields fall back to the defaults in
//! `config`.

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_CELL_SIZE, DEFAULT_MOVEMENT_THRESHOLD, MAX_CELL_SIZE};
use crate::error::GridError;
use crate::spatial_index::CandidatePolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    /// Edge length of a spatial-index cell in world units.
    pub cell_size: f32,
    /// Planar displacement below which a move is ignored.
    pub movement_threshold: f32,
    /// Which index cells a consumer consults for candidate producers.
    pub candidate_policy: CandidatePolicy,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            movement_threshold: DEFAULT_MOVEMENT_THRESHOLD,
            candidate_policy: CandidatePolicy::default(),
        }
    }
}

impl GridParams {
    /// Parse params from JSON and validate them.
    pub fn from_json(json: &str) -> Result<Self, GridError> {
        let params: GridParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), GridError> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 || self.cell_size > MAX_CELL_SIZE {
            return Err(GridError::InvalidCellSize(self.cell_size));
        }
        if !self.movement_threshold.is_finite() || self.movement_threshold < 0.0 {
            return Err(GridError::InvalidMovementThreshold(self.movement_threshold));
        }
        Ok(())
    }

    #[inline]
    pub fn movement_threshold_sq(&self) -> f32 {
        self.movement_threshold * self.movement_threshold
    }
}
