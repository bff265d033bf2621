//! ECS components for entities that take part in the energy grid.
//!
//! Hosts attach `PowerProducer` / `PowerConsumer` together with a
//! `Transform`; the grid systems mirror them into `PowerGrid` and write the
//! outcome of each resolution pass back as `ProducerLoadState` /
//! `ConsumerPowerState`.
//!
//! Grid entities are expected to be top-level: positions come from the local
//! `Transform`, and a parented entity is placed at its local translation.

use bevy::prelude::*;

use crate::entries::{planar, ConsumerEntry, ConsumerPriority, ProducerEntry};

/// Energy source. Position comes from the entity's local `Transform`.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct PowerProducer {
    pub max_capacity: u32,
    pub broadcast_radius: f32,
    pub is_mobile: bool,
}

impl PowerProducer {
    pub fn fixed(max_capacity: u32, broadcast_radius: f32) -> Self {
        Self {
            max_capacity,
            broadcast_radius,
            is_mobile: false,
        }
    }

    pub fn mobile(max_capacity: u32, broadcast_radius: f32) -> Self {
        Self {
            max_capacity,
            broadcast_radius,
            is_mobile: true,
        }
    }

    pub(crate) fn to_entry(&self, transform: &Transform) -> ProducerEntry {
        let position = planar(transform.translation);
        if self.is_mobile {
            ProducerEntry::mobile(position, self.max_capacity, self.broadcast_radius)
        } else {
            ProducerEntry::new(position, self.max_capacity, self.broadcast_radius)
        }
    }
}

/// Energy sink. Position comes from the entity's local `Transform`.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct PowerConsumer {
    pub requirement: u32,
    pub priority: ConsumerPriority,
}

impl PowerConsumer {
    pub fn new(requirement: u32, priority: ConsumerPriority) -> Self {
        Self {
            requirement,
            priority,
        }
    }

    pub(crate) fn to_entry(&self, transform: &Transform) -> ConsumerEntry {
        ConsumerEntry::new(planar(transform.translation), self.requirement, self.priority)
    }
}

/// Written after each resolution pass.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConsumerPowerState {
    pub is_powered: bool,
}

/// Written after each resolution pass.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProducerLoadState {
    pub current_load: u32,
    pub max_capacity: u32,
}

impl ProducerLoadState {
    pub fn available(&self) -> u32 {
        self.max_capacity.saturating_sub(self.current_load)
    }

    pub fn load_ratio(&self) -> f32 {
        if self.max_capacity == 0 {
            0.0
        } else {
            self.current_load as f32 / self.max_capacity as f32
        }
    }
}
