//! # TestGrid: headless integration test harness for the energy grid
//!
//! Wraps a `bevy::app::App` with `MinimalPlugins` + `EnergyGridPlugin` so
//! tests can spawn producers and consumers, advance the `FixedUpdate`
//! schedule deterministically, and assert on the resulting ECS state.

use bevy::app::App;
use bevy::prelude::*;

use crate::components::{ConsumerPowerState, PowerConsumer, PowerProducer, ProducerLoadState};
use crate::entries::ConsumerPriority;
use crate::error::GridError;
use crate::events::PowerGridResolved;
use crate::grid_manager::PowerGrid;
use crate::grid_params::GridParams;
use crate::grid_stats::PowerGridStats;
use crate::EnergyGridPlugin;

/// A headless Bevy App wrapping `EnergyGridPlugin`.
///
/// Planar coordinates map to `Transform` translation `(x, 0.0, y)`.
pub struct TestGrid {
    app: App,
}

impl Default for TestGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl TestGrid {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Empty grid with default parameters.
    pub fn new() -> Self {
        Self::build(PowerGrid::default())
    }

    /// Empty grid with custom parameters. Panics on invalid parameters.
    pub fn with_params(params: GridParams) -> Self {
        match PowerGrid::new(params) {
            Ok(grid) => Self::build(grid),
            Err(err) => panic!("invalid grid parameters: {err}"),
        }
    }

    fn build(grid: PowerGrid) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        // Inserted BEFORE the plugin so init_resource keeps it.
        app.insert_resource(grid);
        app.add_plugins(EnergyGridPlugin);
        app.update();
        Self { app }
    }

    // -----------------------------------------------------------------------
    // World setup
    // -----------------------------------------------------------------------

    pub fn spawn_producer(&mut self, x: f32, y: f32, capacity: u32, radius: f32) -> Entity {
        self.spawn_at(x, y, PowerProducer::fixed(capacity, radius))
    }

    pub fn spawn_mobile_producer(&mut self, x: f32, y: f32, capacity: u32, radius: f32) -> Entity {
        self.spawn_at(x, y, PowerProducer::mobile(capacity, radius))
    }

    pub fn spawn_consumer(
        &mut self,
        x: f32,
        y: f32,
        requirement: u32,
        priority: ConsumerPriority,
    ) -> Entity {
        self.spawn_at(x, y, PowerConsumer::new(requirement, priority))
    }

    fn spawn_at(&mut self, x: f32, y: f32, component: impl Component) -> Entity {
        self.app
            .world_mut()
            .spawn((component, Transform::from_xyz(x, 0.0, y)))
            .id()
    }

    pub fn despawn(&mut self, entity: Entity) -> bool {
        self.app.world_mut().despawn(entity)
    }

    /// Set the planar position of an entity's `Transform`.
    pub fn move_entity(&mut self, entity: Entity, x: f32, y: f32) {
        if let Some(mut transform) = self.app.world_mut().get_mut::<Transform>(entity) {
            transform.translation.x = x;
            transform.translation.z = y;
        }
    }

    pub fn set_requirement(&mut self, entity: Entity, requirement: u32) {
        if let Some(mut consumer) = self.app.world_mut().get_mut::<PowerConsumer>(entity) {
            consumer.requirement = requirement;
        }
    }

    pub fn set_priority(&mut self, entity: Entity, priority: ConsumerPriority) {
        if let Some(mut consumer) = self.app.world_mut().get_mut::<PowerConsumer>(entity) {
            consumer.priority = priority;
        }
    }

    pub fn set_capacity(&mut self, entity: Entity, capacity: u32) {
        if let Some(mut producer) = self.app.world_mut().get_mut::<PowerProducer>(entity) {
            producer.max_capacity = capacity;
        }
    }

    // -----------------------------------------------------------------------
    // Simulation control
    // -----------------------------------------------------------------------

    /// Run `FixedUpdate` exactly `n` times, independent of wall-clock time.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.world_mut().run_schedule(FixedUpdate);
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn grid(&self) -> &PowerGrid {
        self.app.world().resource::<PowerGrid>()
    }

    pub fn grid_mut(&mut self) -> Mut<'_, PowerGrid> {
        self.app.world_mut().resource_mut::<PowerGrid>()
    }

    pub fn stats(&self) -> &PowerGridStats {
        self.app.world().resource::<PowerGridStats>()
    }

    pub fn set_params(&mut self, params: GridParams) -> Result<(), GridError> {
        self.grid_mut().set_params(params)
    }

    /// Powered flag as written onto the entity, `None` before the first pass
    /// that saw it.
    pub fn is_powered(&self, entity: Entity) -> Option<bool> {
        self.app
            .world()
            .get::<ConsumerPowerState>(entity)
            .map(|state| state.is_powered)
    }

    pub fn load_state(&self, entity: Entity) -> Option<ProducerLoadState> {
        self.app.world().get::<ProducerLoadState>(entity).copied()
    }

    /// Number of `PowerGridResolved` events buffered since construction.
    pub fn resolved_event_count(&self) -> usize {
        self.app.world().resource::<Events<PowerGridResolved>>().len()
    }

    // -----------------------------------------------------------------------
    // Assertions
    // -----------------------------------------------------------------------

    pub fn assert_powered(&self, entity: Entity) {
        assert_eq!(
            self.is_powered(entity),
            Some(true),
            "consumer {entity:?} should be powered"
        );
    }

    pub fn assert_unpowered(&self, entity: Entity) {
        assert_eq!(
            self.is_powered(entity),
            Some(false),
            "consumer {entity:?} should be unpowered"
        );
    }

    pub fn assert_load(&self, entity: Entity, expected: u32) {
        let load = self.load_state(entity).map(|state| state.current_load);
        assert_eq!(load, Some(expected), "producer {entity:?} load mismatch");
    }
}
