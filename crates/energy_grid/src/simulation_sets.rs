//! Deterministic ordering of the grid systems via `SystemSet` phases.
//!
//! ```text
//! PreSim  →  Simulation  →  PostSim
//! ```
//!
//! * **PreSim** – Registry membership: newly added producers/consumers are
//!   registered, removed or despawned ones unregistered, stale handles
//!   pruned.
//! * **Simulation** – Change signals (capacity, radius, requirement,
//!   priority, movement) followed by the resolution pass. Resolution is
//!   ordered after every signal system so a change applied this tick is
//!   resolved this tick.
//! * **PostSim** – Read-only aggregation of the published graph.

use bevy::prelude::*;

/// Ordered phases for grid systems in the `FixedUpdate` schedule.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    PreSim,
    Simulation,
    PostSim,
}
