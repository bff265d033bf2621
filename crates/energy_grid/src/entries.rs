//! Registry entries for producers and consumers.
//!
//! These are plain value types: the host owns the entities they describe and
//! `PowerGrid` keys them by `Entity`. Positions are planar (x, z); the
//! vertical axis never takes part in distance checks.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Project a 3D world translation onto the planar (x, z) grid.
#[inline]
pub fn planar(translation: Vec3) -> Vec2 {
    Vec2::new(translation.x, translation.z)
}

// =============================================================================
// ConsumerPriority
// =============================================================================

/// Allocation order for consumers. Higher variants are served first.
///
/// Declared low-to-high so the derived `Ord` gives
/// `Critical > Standard > Low > Background`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum ConsumerPriority {
    Background,
    Low,
    #[default]
    Standard,
    Critical,
}

// =============================================================================
// ProducerEntry
// =============================================================================

/// One energy source.
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerEntry {
    pub position: Vec2,
    pub max_capacity: u32,
    pub broadcast_radius: f32,
    /// Mobile producers are drawn from before fixed ones.
    pub is_mobile: bool,
    pub(crate) current_load: u32,
}

impl ProducerEntry {
    /// A fixed producer. Negative or NaN radii clamp to zero; an infinite
    /// radius reaches every finite position.
    pub fn new(position: Vec2, max_capacity: u32, broadcast_radius: f32) -> Self {
        Self {
            position,
            max_capacity,
            broadcast_radius: sanitize_radius(broadcast_radius),
            is_mobile: false,
            current_load: 0,
        }
    }

    pub fn mobile(position: Vec2, max_capacity: u32, broadcast_radius: f32) -> Self {
        Self {
            is_mobile: true,
            ..Self::new(position, max_capacity, broadcast_radius)
        }
    }

    /// Load assigned by the last resolution pass.
    pub fn current_load(&self) -> u32 {
        self.current_load
    }

    pub fn available_capacity(&self) -> u32 {
        self.max_capacity.saturating_sub(self.current_load)
    }

    /// Fraction of capacity in use, 0.0 for a zero-capacity producer.
    pub fn load_ratio(&self) -> f32 {
        if self.max_capacity == 0 {
            0.0
        } else {
            self.current_load as f32 / self.max_capacity as f32
        }
    }

    /// Exact reach test used by the resolver. The radius is re-sanitized
    /// since the field is public.
    #[inline]
    pub fn reaches(&self, point: Vec2) -> bool {
        let radius = sanitize_radius(self.broadcast_radius);
        within_reach(self.position, radius * radius, point)
    }
}

pub(crate) fn sanitize_radius(radius: f32) -> f32 {
    // NaN.max(0.0) is 0.0
    radius.max(0.0)
}

/// Inclusive distance test. Non-finite positions never reach or get
/// reached, and a NaN distance counts as out of range.
#[inline]
pub(crate) fn within_reach(center: Vec2, radius_sq: f32, point: Vec2) -> bool {
    center.is_finite() && point.is_finite() && center.distance_squared(point) <= radius_sq
}

// =============================================================================
// ConsumerEntry
// =============================================================================

/// One energy sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerEntry {
    pub position: Vec2,
    pub total_requirement: u32,
    pub priority: ConsumerPriority,
    pub(crate) is_powered: bool,
}

impl ConsumerEntry {
    /// A consumer starts unpowered until the next resolution pass.
    pub fn new(position: Vec2, total_requirement: u32, priority: ConsumerPriority) -> Self {
        Self {
            position,
            total_requirement,
            priority,
            is_powered: false,
        }
    }

    /// Whether the last resolution pass fully satisfied this consumer.
    pub fn is_powered(&self) -> bool {
        self.is_powered
    }
}
