//! Uniform-grid spatial index over the planar (x, z) plane.
//!
//! Producers paint themselves into every cell their broadcast circle's
//! bounding square overlaps. Consumers look up candidates by cell, and the
//! resolver rechecks exact distance, so the index only has to be
//! conservative for the cells it is asked about.
//!
//! Cells hold indices into the producer sequence the index was built from,
//! in insertion order, so a sorted producer sequence yields sorted
//! per-cell candidate lists.
//!
//! A producer whose square would cover more than `MAX_PAINTED_CELLS` cells
//! is not painted at all; it goes on a grid-wide list that every lookup
//! consults. Producers at a non-finite position are never indexed.

use bevy::prelude::*;
use bevy::utils::HashMap;
use serde::{Deserialize, Serialize};

use crate::config::MAX_PAINTED_CELLS;

/// Which cells a consumer consults when gathering candidate producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CandidatePolicy {
    /// Only the consumer's occupied cell. A producer that reaches the
    /// consumer but never painted that cell is missed (see
    /// [`occupied_cell`]).
    #[default]
    OwnCell,
    /// The occupied cell and its eight neighbours. Never misses a producer
    /// whose circle reaches the consumer.
    Neighborhood,
}

/// Cell containing `position`, rounding toward negative infinity. Used when
/// painting producers.
#[inline]
pub fn cell_of(position: Vec2, cell_size: f32) -> IVec2 {
    IVec2::new(
        (position.x / cell_size).floor() as i32,
        (position.y / cell_size).floor() as i32,
    )
}

/// Cell a consumer is looked up in.
///
/// Truncates toward zero, so on the negative side of an axis a consumer in
/// `(-cell_size, 0)` is looked up in cell 0 while producers paint it as
/// cell -1. Under [`CandidatePolicy::OwnCell`] this is the cell-boundary
/// miss; [`CandidatePolicy::Neighborhood`] covers it.
#[inline]
pub fn occupied_cell(position: Vec2, cell_size: f32) -> IVec2 {
    IVec2::new(
        (position.x / cell_size).trunc() as i32,
        (position.y / cell_size).trunc() as i32,
    )
}

#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    cells: HashMap<IVec2, Vec<usize>>,
    /// Producers too wide to paint, in insertion order.
    global: Vec<usize>,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CELL_SIZE)
    }
}

impl SpatialIndex {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::default(),
            global: Vec::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Rebuild from `(position, broadcast_radius)` pairs. The i-th pair is
    /// stored as index `i`.
    ///
    /// Cell vectors are cleared and reused; cells that end up empty are
    /// dropped.
    pub fn rebuild<I>(&mut self, producers: I, cell_size: f32)
    where
        I: IntoIterator<Item = (Vec2, f32)>,
    {
        self.cell_size = cell_size;
        for list in self.cells.values_mut() {
            list.clear();
        }
        self.global.clear();

        for (idx, (position, radius)) in producers.into_iter().enumerate() {
            if !position.is_finite() {
                continue;
            }
            let reach = Vec2::splat(radius.max(0.0));
            let min = cell_of(position - reach, cell_size);
            let max = cell_of(position + reach, cell_size);
            // Casts saturate, so an infinite reach spans the whole i32 range.
            let width = i64::from(max.x) - i64::from(min.x) + 1;
            let height = i64::from(max.y) - i64::from(min.y) + 1;
            if width.saturating_mul(height) > MAX_PAINTED_CELLS {
                self.global.push(idx);
                continue;
            }
            for cy in min.y..=max.y {
                for cx in min.x..=max.x {
                    self.cells.entry(IVec2::new(cx, cy)).or_default().push(idx);
                }
            }
        }

        self.cells.retain(|_, list| !list.is_empty());
    }

    /// Producers painted into `cell`.
    pub fn query(&self, cell: IVec2) -> &[usize] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Producers on the grid-wide list.
    pub fn global(&self) -> &[usize] {
        &self.global
    }

    /// Fill `out` with candidate producer indices for a consumer at
    /// `position`, in ascending index order. A non-finite position has no
    /// candidates.
    pub fn candidates(&self, position: Vec2, policy: CandidatePolicy, out: &mut Vec<usize>) {
        out.clear();
        if !position.is_finite() {
            return;
        }
        let cell = occupied_cell(position, self.cell_size);
        match policy {
            CandidatePolicy::OwnCell => {
                out.extend_from_slice(self.query(cell));
                if !self.global.is_empty() {
                    out.extend_from_slice(&self.global);
                    out.sort_unstable();
                }
            }
            CandidatePolicy::Neighborhood => {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        out.extend_from_slice(self.query(cell + IVec2::new(dx, dy)));
                    }
                }
                out.extend_from_slice(&self.global);
                out.sort_unstable();
                out.dedup();
            }
        }
    }

    pub fn occupied_cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Total painted entries across all cells.
    pub fn entry_count(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.global.clear();
    }
}
