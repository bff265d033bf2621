//! Systems bridging ECS entities and the `PowerGrid` registries.

use bevy::ecs::entity::Entities;
use bevy::prelude::*;

use crate::components::{ConsumerPowerState, PowerConsumer, PowerProducer, ProducerLoadState};
use crate::entries::planar;
use crate::events::PowerGridResolved;
use crate::grid_manager::PowerGrid;

// =============================================================================
// Registry membership (PreSim)
// =============================================================================

/// Unregister handles whose producer/consumer component was removed or whose
/// entity was despawned. Runs before registration so a component removed and
/// re-inserted within one tick ends up registered.
pub fn unregister_removed(
    mut grid: ResMut<PowerGrid>,
    mut removed_producers: RemovedComponents<PowerProducer>,
    mut removed_consumers: RemovedComponents<PowerConsumer>,
) {
    for entity in removed_producers.read() {
        grid.unregister_producer(entity);
    }
    for entity in removed_consumers.read() {
        grid.unregister_consumer(entity);
    }
}

/// Producers need a `Transform` to be placed on the grid. Registration fires
/// when either component arrives, so a `Transform` inserted after the
/// producer still registers it.
///
/// Positions are read from the local `Transform`, which equals the world
/// position only for entities without a `Parent`.
pub fn register_new_producers(
    mut grid: ResMut<PowerGrid>,
    added: Query<
        (Entity, &PowerProducer, &Transform, Has<Parent>),
        Or<(Added<PowerProducer>, Added<Transform>)>,
    >,
) {
    for (entity, producer, transform, has_parent) in &added {
        if has_parent {
            warn!("PowerGrid: producer {:?} has a parent; using its local translation", entity);
        }
        grid.register_producer(entity, producer.to_entry(transform));
    }
}

/// Consumer counterpart of `register_new_producers`.
pub fn register_new_consumers(
    mut grid: ResMut<PowerGrid>,
    added: Query<
        (Entity, &PowerConsumer, &Transform, Has<Parent>),
        Or<(Added<PowerConsumer>, Added<Transform>)>,
    >,
) {
    for (entity, consumer, transform, has_parent) in &added {
        if has_parent {
            warn!("PowerGrid: consumer {:?} has a parent; using its local translation", entity);
        }
        grid.register_consumer(entity, consumer.to_entry(transform));
    }
}

/// Drop registry entries whose entity no longer exists.
pub fn prune_stale_handles(mut grid: ResMut<PowerGrid>, entities: &Entities) {
    let dropped = grid.retain_live(|entity| entities.contains(entity));
    if dropped > 0 {
        warn!("PowerGrid: pruned {} stale handle(s)", dropped);
    }
}

// =============================================================================
// Change signals (Simulation)
// =============================================================================

pub fn sync_producer_changes(
    mut grid: ResMut<PowerGrid>,
    changed: Query<(Entity, &PowerProducer), Changed<PowerProducer>>,
) {
    for (entity, producer) in &changed {
        let result = grid
            .set_producer_capacity(entity, producer.max_capacity)
            .and_then(|()| grid.set_producer_radius(entity, producer.broadcast_radius))
            .and_then(|()| grid.set_producer_mobile(entity, producer.is_mobile));
        if let Err(err) = result {
            debug!("PowerGrid: ignoring producer change: {}", err);
        }
    }
}

pub fn sync_consumer_changes(
    mut grid: ResMut<PowerGrid>,
    changed: Query<(Entity, &PowerConsumer), Changed<PowerConsumer>>,
) {
    for (entity, consumer) in &changed {
        let result = grid
            .set_consumer_requirement(entity, consumer.requirement)
            .and_then(|()| grid.set_consumer_priority(entity, consumer.priority));
        if let Err(err) = result {
            debug!("PowerGrid: ignoring consumer change: {}", err);
        }
    }
}

/// Forward planar movement; `PowerGrid` ignores moves under the threshold.
pub fn track_movement(
    mut grid: ResMut<PowerGrid>,
    producers: Query<(Entity, &Transform), (Changed<Transform>, With<PowerProducer>)>,
    consumers: Query<(Entity, &Transform), (Changed<Transform>, With<PowerConsumer>)>,
) {
    for (entity, transform) in &producers {
        if let Err(err) = grid.move_producer(entity, planar(transform.translation)) {
            debug!("PowerGrid: ignoring producer move: {}", err);
        }
    }
    for (entity, transform) in &consumers {
        if let Err(err) = grid.move_consumer(entity, planar(transform.translation)) {
            debug!("PowerGrid: ignoring consumer move: {}", err);
        }
    }
}

// =============================================================================
// Resolution (Simulation, after all change signals)
// =============================================================================

/// Run at most one resolution pass, write the outcome back onto the
/// entities and announce it with a single `PowerGridResolved`.
///
/// Handles without a live component (registered directly through the
/// `PowerGrid` API, or losing their component mid-tick) are skipped.
pub fn resolve_power_grid(
    mut commands: Commands,
    mut grid: ResMut<PowerGrid>,
    mut resolved: EventWriter<PowerGridResolved>,
    mut consumer_states: Query<Option<&mut ConsumerPowerState>, With<PowerConsumer>>,
    mut producer_states: Query<Option<&mut ProducerLoadState>, With<PowerProducer>>,
) {
    let Some(report) = grid.resolve_if_dirty() else {
        return;
    };

    for (entity, consumer) in grid.consumers() {
        let state = ConsumerPowerState {
            is_powered: consumer.is_powered(),
        };
        match consumer_states.get_mut(entity) {
            Ok(Some(mut current)) => {
                current.set_if_neq(state);
            }
            Ok(None) => {
                commands.entity(entity).insert(state);
            }
            Err(_) => {}
        }
    }

    for (entity, producer) in grid.producers() {
        let state = ProducerLoadState {
            current_load: producer.current_load(),
            max_capacity: producer.max_capacity,
        };
        match producer_states.get_mut(entity) {
            Ok(Some(mut current)) => {
                current.set_if_neq(state);
            }
            Ok(None) => {
                commands.entity(entity).insert(state);
            }
            Err(_) => {}
        }
    }

    debug!(
        "PowerGrid pass {}: {} powered, {} unpowered, {} links, {} allocated, {} unmet",
        report.pass,
        report.powered,
        report.unpowered,
        report.links,
        report.allocated,
        report.unmet_demand
    );
    resolved.send(PowerGridResolved);
}
