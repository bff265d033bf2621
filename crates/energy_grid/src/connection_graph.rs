//! Output of a resolution pass: which producers power which consumers, and
//! by how much.

use std::collections::BTreeMap;

use bevy::prelude::*;

/// Consumer → (producer → allocated amount).
///
/// Only fully satisfied consumers with a non-zero requirement appear. Every
/// stored amount is > 0 and a consumer's amounts sum to its requirement at
/// resolution time. Ordered maps keep iteration stable across passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionGraph {
    links: BTreeMap<Entity, BTreeMap<Entity, u32>>,
}

impl ConnectionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed allocation. Zero amounts are dropped and repeated
    /// producers accumulate.
    pub(crate) fn commit<I>(&mut self, consumer: Entity, allocations: I)
    where
        I: IntoIterator<Item = (Entity, u32)>,
    {
        let mut supply = BTreeMap::new();
        for (producer, amount) in allocations {
            if amount > 0 {
                *supply.entry(producer).or_insert(0) += amount;
            }
        }
        if !supply.is_empty() {
            self.links.insert(consumer, supply);
        }
    }

    /// Remove `consumer` and return what it drew.
    pub(crate) fn remove_consumer(&mut self, consumer: Entity) -> Option<BTreeMap<Entity, u32>> {
        self.links.remove(&consumer)
    }

    /// Remove, in one sweep, every consumer that is gone or draws from a
    /// producer that is gone. Returns the removed entries.
    pub(crate) fn detach_where(
        &mut self,
        mut consumer_gone: impl FnMut(Entity) -> bool,
        mut producer_gone: impl FnMut(Entity) -> bool,
    ) -> Vec<(Entity, BTreeMap<Entity, u32>)> {
        let mut detached = Vec::new();
        self.links.retain(|&consumer, supply| {
            if consumer_gone(consumer) || supply.keys().any(|&producer| producer_gone(producer)) {
                detached.push((consumer, std::mem::take(supply)));
                false
            } else {
                true
            }
        });
        detached
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Number of consumers present in the graph.
    pub fn consumer_count(&self) -> usize {
        self.links.len()
    }

    /// Number of (consumer, producer) edges.
    pub fn link_count(&self) -> usize {
        self.links.values().map(BTreeMap::len).sum()
    }

    pub fn contains_consumer(&self, consumer: Entity) -> bool {
        self.links.contains_key(&consumer)
    }

    /// Producers powering `consumer` and the amount each supplies.
    pub fn allocations_for(&self, consumer: Entity) -> Option<&BTreeMap<Entity, u32>> {
        self.links.get(&consumer)
    }

    /// Sum allocated to `consumer`, 0 if absent.
    pub fn total_for(&self, consumer: Entity) -> u32 {
        self.links
            .get(&consumer)
            .map(|supply| supply.values().sum())
            .unwrap_or(0)
    }

    /// Amount `producer` supplies to `consumer`, 0 if not linked.
    pub fn amount(&self, consumer: Entity, producer: Entity) -> u32 {
        self.links
            .get(&consumer)
            .and_then(|supply| supply.get(&producer))
            .copied()
            .unwrap_or(0)
    }

    /// Consumers `producer` supplies, with amounts.
    pub fn consumers_of(&self, producer: Entity) -> impl Iterator<Item = (Entity, u32)> + '_ {
        self.links.iter().filter_map(move |(consumer, supply)| {
            supply.get(&producer).map(|amount| (*consumer, *amount))
        })
    }

    /// Sum `producer` supplies across all consumers.
    pub fn total_from(&self, producer: Entity) -> u32 {
        self.consumers_of(producer).map(|(_, amount)| amount).sum()
    }

    /// Flattened `(consumer, producer, amount)` edges in stable order.
    pub fn links(&self) -> impl Iterator<Item = (Entity, Entity, u32)> + '_ {
        self.links.iter().flat_map(|(consumer, supply)| {
            supply
                .iter()
                .map(move |(producer, amount)| (*consumer, *producer, *amount))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &BTreeMap<Entity, u32>)> {
        self.links.iter().map(|(consumer, supply)| (*consumer, supply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(n: u32) -> Entity {
        Entity::from_raw(n)
    }

    #[test]
    fn test_commit_and_lookup() {
        let mut graph = ConnectionGraph::new();
        graph.commit(e(10), [(e(1), 30), (e(2), 20)]);

        assert!(graph.contains_consumer(e(10)));
        assert_eq!(graph.total_for(e(10)), 50);
        assert_eq!(graph.amount(e(10), e(1)), 30);
        assert_eq!(graph.amount(e(10), e(3)), 0);
        assert_eq!(graph.link_count(), 2);
        assert_eq!(graph.consumer_count(), 1);
    }

    #[test]
    fn test_commit_drops_zero_amounts() {
        let mut graph = ConnectionGraph::new();
        graph.commit(e(10), [(e(1), 0)]);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_commit_accumulates_repeated_producer() {
        let mut graph = ConnectionGraph::new();
        graph.commit(e(10), [(e(1), 5), (e(1), 7)]);
        assert_eq!(graph.amount(e(10), e(1)), 12);
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn test_reverse_lookup() {
        let mut graph = ConnectionGraph::new();
        graph.commit(e(10), [(e(1), 30)]);
        graph.commit(e(11), [(e(1), 15), (e(2), 5)]);

        let served: Vec<_> = graph.consumers_of(e(1)).collect();
        assert_eq!(served, vec![(e(10), 30), (e(11), 15)]);
        assert_eq!(graph.total_from(e(1)), 45);
        assert_eq!(graph.total_from(e(3)), 0);
    }

    #[test]
    fn test_links_are_ordered() {
        let mut graph = ConnectionGraph::new();
        graph.commit(e(20), [(e(2), 1)]);
        graph.commit(e(10), [(e(3), 2), (e(1), 3)]);

        let links: Vec<_> = graph.links().collect();
        assert_eq!(
            links,
            vec![(e(10), e(1), 3), (e(10), e(3), 2), (e(20), e(2), 1)]
        );
    }

    #[test]
    fn test_remove_consumer_returns_allocations() {
        let mut graph = ConnectionGraph::new();
        graph.commit(e(10), [(e(1), 30), (e(2), 20)]);
        graph.commit(e(11), [(e(1), 5)]);

        let removed = graph.remove_consumer(e(10)).expect("was linked");
        assert_eq!(removed.get(&e(2)), Some(&20));
        assert_eq!(graph.total_from(e(1)), 5);
        assert!(graph.remove_consumer(e(10)).is_none());
    }

    #[test]
    fn test_detach_by_producer_takes_whole_consumers() {
        let mut graph = ConnectionGraph::new();
        graph.commit(e(10), [(e(1), 30), (e(2), 20)]);
        graph.commit(e(11), [(e(2), 5)]);
        graph.commit(e(12), [(e(3), 7)]);

        let detached = graph.detach_where(|c| c == e(12), |p| p == e(1));
        let consumers: Vec<_> = detached.iter().map(|(c, _)| *c).collect();
        assert_eq!(consumers, vec![e(10), e(12)]);
        assert_eq!(detached[0].1.values().sum::<u32>(), 50);
        assert_eq!(graph.consumer_count(), 1);
        assert_eq!(graph.total_from(e(2)), 5);
    }
}
