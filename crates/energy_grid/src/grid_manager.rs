//! `PowerGrid`: owner of the producer/consumer registries.
//!
//! Every mutation marks the grid dirty; `resolve_if_dirty` runs at most one
//! resolution pass and clears the flag. Reads only ever observe the state
//! left by the last completed pass, since a pass runs to completion inside a
//! single `&mut self` call.

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::connection_graph::ConnectionGraph;
use crate::entries::{sanitize_radius, ConsumerEntry, ConsumerPriority, ProducerEntry};
use crate::error::GridError;
use crate::grid_params::GridParams;
use crate::resolver::{resolve_allocations, ResolutionReport};
use crate::spatial_index::SpatialIndex;

#[derive(Resource, Debug, Default)]
pub struct PowerGrid {
    producers: BTreeMap<Entity, ProducerEntry>,
    consumers: BTreeMap<Entity, ConsumerEntry>,
    connections: ConnectionGraph,
    index: SpatialIndex,
    params: GridParams,
    dirty: bool,
    passes: u64,
    last_report: ResolutionReport,
}

impl PowerGrid {
    pub fn new(params: GridParams) -> Result<Self, GridError> {
        params.validate()?;
        Ok(Self {
            index: SpatialIndex::new(params.cell_size),
            params,
            ..Default::default()
        })
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register or replace a producer. Returns `true` if the handle was new.
    /// A replaced producer's links are dropped as in `unregister_producer`.
    pub fn register_producer(&mut self, entity: Entity, entry: ProducerEntry) -> bool {
        self.dirty = true;
        if self.producers.insert(entity, entry).is_none() {
            return true;
        }
        let detached = self.connections.detach_where(|_| false, |p| p == entity);
        self.release(detached);
        false
    }

    /// Unregister a producer. Consumers it was supplying lose their whole
    /// allocation right away (loads drawn from other producers are released
    /// too) and read as unpowered until the next pass.
    pub fn unregister_producer(&mut self, entity: Entity) -> Option<ProducerEntry> {
        self.dirty = true;
        let removed = self.producers.remove(&entity);
        if removed.is_some() {
            let detached = self.connections.detach_where(|_| false, |p| p == entity);
            self.release(detached);
        }
        removed
    }

    /// Register or replace a consumer. Returns `true` if the handle was new.
    /// A replaced consumer's allocation is released.
    pub fn register_consumer(&mut self, entity: Entity, entry: ConsumerEntry) -> bool {
        self.dirty = true;
        let is_new = self.consumers.insert(entity, entry).is_none();
        if let Some(supply) = self.connections.remove_consumer(entity) {
            self.release([(entity, supply)]);
        }
        is_new
    }

    /// Unregister a consumer. Its graph entry goes away and the load it drew
    /// is released from its producers immediately.
    pub fn unregister_consumer(&mut self, entity: Entity) -> Option<ConsumerEntry> {
        self.dirty = true;
        let removed = self.consumers.remove(&entity);
        if let Some(supply) = self.connections.remove_consumer(entity) {
            self.release([(entity, supply)]);
        }
        removed
    }

    /// Drop every entry whose handle fails `is_live`, with the same graph
    /// and load bookkeeping as the unregister calls. Returns how many were
    /// dropped.
    pub fn retain_live(&mut self, mut is_live: impl FnMut(Entity) -> bool) -> usize {
        let before = self.producers.len() + self.consumers.len();
        self.producers.retain(|&entity, _| is_live(entity));
        self.consumers.retain(|&entity, _| is_live(entity));
        let dropped = before - (self.producers.len() + self.consumers.len());
        if dropped > 0 {
            let producers = &self.producers;
            let consumers = &self.consumers;
            let detached = self.connections.detach_where(
                |c| !consumers.contains_key(&c),
                |p| !producers.contains_key(&p),
            );
            self.release(detached);
            self.dirty = true;
        }
        dropped
    }

    // Keeps `total_from(p) == current_load(p)` between passes.
    fn release(&mut self, detached: impl IntoIterator<Item = (Entity, BTreeMap<Entity, u32>)>) {
        for (consumer, supply) in detached {
            for (producer, amount) in supply {
                if let Some(entry) = self.producers.get_mut(&producer) {
                    entry.current_load = entry.current_load.saturating_sub(amount);
                }
            }
            if let Some(entry) = self.consumers.get_mut(&consumer) {
                entry.is_powered = false;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Change signals
    // -----------------------------------------------------------------------

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_producer_capacity(&mut self, entity: Entity, capacity: u32) -> Result<(), GridError> {
        let producer = self
            .producers
            .get_mut(&entity)
            .ok_or(GridError::UnknownProducer(entity))?;
        if producer.max_capacity != capacity {
            producer.max_capacity = capacity;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn set_producer_radius(&mut self, entity: Entity, radius: f32) -> Result<(), GridError> {
        let producer = self
            .producers
            .get_mut(&entity)
            .ok_or(GridError::UnknownProducer(entity))?;
        let radius = sanitize_radius(radius);
        if producer.broadcast_radius != radius {
            producer.broadcast_radius = radius;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn set_producer_mobile(&mut self, entity: Entity, is_mobile: bool) -> Result<(), GridError> {
        let producer = self
            .producers
            .get_mut(&entity)
            .ok_or(GridError::UnknownProducer(entity))?;
        if producer.is_mobile != is_mobile {
            producer.is_mobile = is_mobile;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn set_consumer_requirement(
        &mut self,
        entity: Entity,
        requirement: u32,
    ) -> Result<(), GridError> {
        let consumer = self
            .consumers
            .get_mut(&entity)
            .ok_or(GridError::UnknownConsumer(entity))?;
        if consumer.total_requirement != requirement {
            consumer.total_requirement = requirement;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn set_consumer_priority(
        &mut self,
        entity: Entity,
        priority: ConsumerPriority,
    ) -> Result<(), GridError> {
        let consumer = self
            .consumers
            .get_mut(&entity)
            .ok_or(GridError::UnknownConsumer(entity))?;
        if consumer.priority != priority {
            consumer.priority = priority;
            self.dirty = true;
        }
        Ok(())
    }

    /// Apply a producer move. Displacements at or below the movement
    /// threshold are ignored and do not update the stored position, so slow
    /// drift accumulates until it crosses the threshold.
    ///
    /// Moves to or from a non-finite position always apply, so such an entity
    /// is unreachable while its position is bad and recovers on the next move.
    ///
    /// Returns whether the move was applied.
    pub fn move_producer(&mut self, entity: Entity, position: Vec2) -> Result<bool, GridError> {
        let threshold_sq = self.params.movement_threshold_sq();
        let producer = self
            .producers
            .get_mut(&entity)
            .ok_or(GridError::UnknownProducer(entity))?;
        let moved = exceeds_threshold(producer.position, position, threshold_sq);
        if moved {
            producer.position = position;
            self.dirty = true;
        }
        Ok(moved)
    }

    /// Consumer counterpart of [`PowerGrid::move_producer`].
    pub fn move_consumer(&mut self, entity: Entity, position: Vec2) -> Result<bool, GridError> {
        let threshold_sq = self.params.movement_threshold_sq();
        let consumer = self
            .consumers
            .get_mut(&entity)
            .ok_or(GridError::UnknownConsumer(entity))?;
        let moved = exceeds_threshold(consumer.position, position, threshold_sq);
        if moved {
            consumer.position = position;
            self.dirty = true;
        }
        Ok(moved)
    }

    pub fn params(&self) -> &GridParams {
        &self.params
    }

    /// Replace the params. Invalid params leave the grid untouched.
    pub fn set_params(&mut self, params: GridParams) -> Result<(), GridError> {
        if let Err(err) = params.validate() {
            warn!("PowerGrid: rejected params: {}", err);
            return Err(err);
        }
        if self.params != params {
            self.params = params;
            self.dirty = true;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    /// Run a pass if anything changed since the last one.
    pub fn resolve_if_dirty(&mut self) -> Option<ResolutionReport> {
        if !self.dirty {
            return None;
        }
        Some(self.resolve())
    }

    /// Run a pass unconditionally and publish the new graph.
    pub fn resolve(&mut self) -> ResolutionReport {
        self.passes += 1;
        let (graph, report) = resolve_allocations(
            &mut self.producers,
            &mut self.consumers,
            &mut self.index,
            &self.params,
            self.passes,
        );
        self.connections = graph;
        self.last_report = report.clone();
        self.dirty = false;
        report
    }

    // -----------------------------------------------------------------------
    // Read-only views
    // -----------------------------------------------------------------------

    pub fn producers(&self) -> impl Iterator<Item = (Entity, &ProducerEntry)> {
        self.producers.iter().map(|(e, p)| (*e, p))
    }

    pub fn consumers(&self) -> impl Iterator<Item = (Entity, &ConsumerEntry)> {
        self.consumers.iter().map(|(e, c)| (*e, c))
    }

    pub fn producer(&self, entity: Entity) -> Option<&ProducerEntry> {
        self.producers.get(&entity)
    }

    pub fn consumer(&self, entity: Entity) -> Option<&ConsumerEntry> {
        self.consumers.get(&entity)
    }

    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    pub fn connections(&self) -> &ConnectionGraph {
        &self.connections
    }

    pub fn is_powered(&self, consumer: Entity) -> Option<bool> {
        self.consumers.get(&consumer).map(ConsumerEntry::is_powered)
    }

    pub fn current_load(&self, producer: Entity) -> Option<u32> {
        self.producers.get(&producer).map(ProducerEntry::current_load)
    }

    pub fn available_capacity(&self, producer: Entity) -> Option<u32> {
        self.producers
            .get(&producer)
            .map(ProducerEntry::available_capacity)
    }

    pub fn load_ratio(&self, producer: Entity) -> Option<f32> {
        self.producers.get(&producer).map(ProducerEntry::load_ratio)
    }

    /// Number of passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn last_report(&self) -> &ResolutionReport {
        &self.last_report
    }

    /// Spatial index as built by the last pass (debug overlays).
    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.index
    }
}

fn exceeds_threshold(from: Vec2, to: Vec2, threshold_sq: f32) -> bool {
    let distance_sq = from.distance_squared(to);
    distance_sq.is_nan() || distance_sq > threshold_sq
}
