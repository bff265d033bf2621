//! Allocation resolver.
//!
//! Greedy, priority-ordered matching of consumers to producers:
//!
//! 1. Snapshot both registries into vectors.
//! 2. Reset producer loads.
//! 3. Sort producers (mobile first, then capacity descending) and consumers
//!    (priority descending, then planar x ascending). Both sorts are stable,
//!    so exact ties fall back to handle order.
//! 4. Rebuild the spatial index from the sorted producers.
//! 5. For each consumer, draw from candidates in order until satisfied.
//!    Loads are taken tentatively and rolled back if the consumer cannot be
//!    fully satisfied.
//! 6. Write loads and power state back into the registries.
//!
//! The result is not a maximum matching: an earlier consumer can starve a
//! later one even when another assignment would satisfy both.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::connection_graph::ConnectionGraph;
use crate::entries::{
    sanitize_radius, within_reach, ConsumerEntry, ConsumerPriority, ProducerEntry,
};
use crate::grid_params::GridParams;
use crate::spatial_index::SpatialIndex;

/// Summary of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Sequence number of the pass, starting at 1.
    pub pass: u64,
    pub powered: u32,
    pub unpowered: u32,
    /// Edges in the resulting connection graph.
    pub links: u32,
    /// Total units allocated across all producers.
    pub allocated: u64,
    /// Requirement of consumers left unpowered.
    pub unmet_demand: u64,
}

/// Working copy of a producer for the duration of a pass.
struct SupplySlot {
    entity: Entity,
    position: Vec2,
    radius: f32,
    radius_sq: f32,
    max_capacity: u32,
    is_mobile: bool,
    load: u32,
}

impl SupplySlot {
    #[inline]
    fn available(&self) -> u32 {
        self.max_capacity.saturating_sub(self.load)
    }
}

struct DemandSlot {
    entity: Entity,
    position: Vec2,
    requirement: u32,
    priority: ConsumerPriority,
}

fn producer_order(a: &SupplySlot, b: &SupplySlot) -> Ordering {
    b.is_mobile
        .cmp(&a.is_mobile)
        .then_with(|| b.max_capacity.cmp(&a.max_capacity))
}

fn consumer_order(a: &DemandSlot, b: &DemandSlot) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.position.x.total_cmp(&b.position.x))
}

/// Run one resolution pass over the registries.
///
/// `pass` is recorded in the report. The index is rebuilt in place so its
/// backing storage is reused between passes.
pub fn resolve_allocations(
    producers: &mut BTreeMap<Entity, ProducerEntry>,
    consumers: &mut BTreeMap<Entity, ConsumerEntry>,
    index: &mut SpatialIndex,
    params: &GridParams,
    pass: u64,
) -> (ConnectionGraph, ResolutionReport) {
    let mut supply: Vec<SupplySlot> = producers
        .iter()
        .map(|(&entity, p)| {
            // The field is public, so constructor sanitizing can be bypassed.
            let radius = sanitize_radius(p.broadcast_radius);
            SupplySlot {
                entity,
                position: p.position,
                radius,
                radius_sq: radius * radius,
                max_capacity: p.max_capacity,
                is_mobile: p.is_mobile,
                load: 0,
            }
        })
        .collect();
    let mut demand: Vec<DemandSlot> = consumers
        .iter()
        .map(|(&entity, c)| DemandSlot {
            entity,
            position: c.position,
            requirement: c.total_requirement,
            priority: c.priority,
        })
        .collect();

    supply.sort_by(producer_order);
    demand.sort_by(consumer_order);

    index.rebuild(
        supply.iter().map(|s| (s.position, s.radius)),
        params.cell_size,
    );

    let mut graph = ConnectionGraph::new();
    let mut report = ResolutionReport {
        pass,
        ..Default::default()
    };
    let mut powered: Vec<(Entity, bool)> = Vec::with_capacity(demand.len());
    let mut candidates: Vec<usize> = Vec::new();
    let mut pending: Vec<(usize, u32)> = Vec::new();

    for consumer in &demand {
        if consumer.requirement == 0 {
            powered.push((consumer.entity, true));
            report.powered += 1;
            continue;
        }

        index.candidates(consumer.position, params.candidate_policy, &mut candidates);

        pending.clear();
        let mut fulfilled: u32 = 0;
        for &slot_idx in &candidates {
            let slot = &mut supply[slot_idx];
            if !within_reach(slot.position, slot.radius_sq, consumer.position) {
                continue;
            }
            let available = slot.available();
            if available == 0 {
                continue;
            }
            let take = available.min(consumer.requirement - fulfilled);
            slot.load += take;
            fulfilled += take;
            pending.push((slot_idx, take));
            if fulfilled >= consumer.requirement {
                break;
            }
        }

        if fulfilled >= consumer.requirement {
            graph.commit(
                consumer.entity,
                pending.iter().map(|&(idx, amount)| (supply[idx].entity, amount)),
            );
            report.allocated += u64::from(fulfilled);
            report.powered += 1;
            powered.push((consumer.entity, true));
        } else {
            for &(idx, amount) in &pending {
                supply[idx].load -= amount;
            }
            report.unmet_demand += u64::from(consumer.requirement);
            report.unpowered += 1;
            powered.push((consumer.entity, false));
        }
    }

    for slot in &supply {
        if let Some(entry) = producers.get_mut(&slot.entity) {
            entry.current_load = slot.load;
        }
    }
    for (entity, is_powered) in powered {
        if let Some(entry) = consumers.get_mut(&entity) {
            entry.is_powered = is_powered;
        }
    }

    report.links = graph.link_count() as u32;
    (graph, report)
}
