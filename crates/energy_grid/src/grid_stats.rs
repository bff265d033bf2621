//! Grid-wide supply/demand summary for dashboards and debug overlays.
//!
//! Recomputed from `PowerGrid` whenever a `PowerGridResolved` event is seen,
//! so it always describes the most recent completed pass.

use bevy::prelude::*;

use crate::events::PowerGridResolved;
use crate::grid_manager::PowerGrid;

/// Fraction of capacity in use above which the grid counts as strained.
const STRAINED_UTILIZATION: f32 = 0.9;

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct PowerGridStats {
    pub producer_count: u32,
    pub consumer_count: u32,
    pub powered_consumers: u32,
    pub unpowered_consumers: u32,
    /// Sum of `max_capacity` over all producers.
    pub total_capacity: u64,
    /// Sum of `current_load` over all producers.
    pub total_load: u64,
    /// Sum of requirements over all consumers.
    pub total_demand: u64,
    /// Requirement of unpowered consumers.
    pub unmet_demand: u64,
    /// Pass the numbers were taken from.
    pub pass: u64,
}

impl PowerGridStats {
    pub fn from_grid(grid: &PowerGrid) -> Self {
        let mut stats = Self {
            producer_count: grid.producer_count() as u32,
            consumer_count: grid.consumer_count() as u32,
            pass: grid.passes(),
            ..Default::default()
        };
        for (_, producer) in grid.producers() {
            stats.total_capacity += u64::from(producer.max_capacity);
            stats.total_load += u64::from(producer.current_load());
        }
        for (_, consumer) in grid.consumers() {
            stats.total_demand += u64::from(consumer.total_requirement);
            if consumer.is_powered() {
                stats.powered_consumers += 1;
            } else {
                stats.unpowered_consumers += 1;
                stats.unmet_demand += u64::from(consumer.total_requirement);
            }
        }
        stats
    }

    /// Load over capacity, 0.0 without capacity.
    pub fn utilization(&self) -> f32 {
        if self.total_capacity == 0 {
            0.0
        } else {
            self.total_load as f32 / self.total_capacity as f32
        }
    }

    /// Share of consumers powered, 1.0 without consumers.
    pub fn coverage(&self) -> f32 {
        if self.consumer_count == 0 {
            1.0
        } else {
            self.powered_consumers as f32 / self.consumer_count as f32
        }
    }

    pub fn is_strained(&self) -> bool {
        self.unpowered_consumers > 0 || self.utilization() > STRAINED_UTILIZATION
    }
}

pub fn update_grid_stats(
    mut resolved: EventReader<PowerGridResolved>,
    grid: Res<PowerGrid>,
    mut stats: ResMut<PowerGridStats>,
) {
    if resolved.read().count() == 0 {
        return;
    }
    *stats = PowerGridStats::from_grid(&grid);
}
