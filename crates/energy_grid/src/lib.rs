//! Spatially-aware energy grid resolution for Bevy apps.
//!
//! Producers broadcast capacity within a radius, consumers request a fixed
//! amount with a priority, and each dirty `FixedUpdate` tick a greedy pass
//! allocates supply (highest priority first) and publishes a connection graph.

use bevy::prelude::*;

pub mod components;
pub mod config;
pub mod connection_graph;
pub mod entries;
pub mod error;
pub mod events;
pub mod grid_manager;
pub mod grid_params;
pub mod grid_stats;
pub mod resolver;
pub mod simulation_sets;
pub mod spatial_index;
pub mod systems;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

pub use components::{ConsumerPowerState, PowerConsumer, PowerProducer, ProducerLoadState};
pub use connection_graph::ConnectionGraph;
pub use entries::{ConsumerEntry, ConsumerPriority, ProducerEntry};
pub use error::GridError;
pub use events::PowerGridResolved;
pub use grid_manager::PowerGrid;
pub use grid_params::GridParams;
pub use grid_stats::PowerGridStats;
pub use resolver::ResolutionReport;
pub use simulation_sets::SimulationSet;
pub use spatial_index::{CandidatePolicy, SpatialIndex};

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// Registers the grid resources, the `PowerGridResolved` event and the
/// `FixedUpdate` systems.
///
/// Insert a `PowerGrid` built with `PowerGrid::new` before adding the plugin
/// to run with non-default `GridParams`.
pub struct EnergyGridPlugin;

impl Plugin for EnergyGridPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<grid_manager::PowerGrid>()
            .init_resource::<grid_stats::PowerGridStats>()
            .add_event::<events::PowerGridResolved>()
            .configure_sets(
                FixedUpdate,
                (
                    SimulationSet::PreSim,
                    SimulationSet::Simulation,
                    SimulationSet::PostSim,
                )
                    .chain(),
            )
            .add_systems(
                FixedUpdate,
                (
                    systems::unregister_removed,
                    systems::register_new_producers,
                    systems::register_new_consumers,
                    systems::prune_stale_handles,
                )
                    .chain()
                    .in_set(SimulationSet::PreSim),
            )
            .add_systems(
                FixedUpdate,
                (
                    systems::sync_producer_changes,
                    systems::sync_consumer_changes,
                    systems::track_movement,
                    systems::resolve_power_grid
                        .after(systems::sync_producer_changes)
                        .after(systems::sync_consumer_changes)
                        .after(systems::track_movement),
                )
                    .in_set(SimulationSet::Simulation),
            )
            .add_systems(
                FixedUpdate,
                grid_stats::update_grid_stats.in_set(SimulationSet::PostSim),
            );

        let params = app.world().resource::<grid_manager::PowerGrid>().params();
        info!(
            "Energy grid ready: cell size {}, movement threshold {}, {:?} candidates",
            params.cell_size, params.movement_threshold, params.candidate_policy
        );
    }
}
