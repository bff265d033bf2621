use bevy::prelude::*;

/// Sent once after every completed resolution pass. Readers re-query
/// `PowerGrid` for the new connection graph.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerGridResolved;
