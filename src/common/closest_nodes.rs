use std::{cmp::Ordering, vec::IntoIter};

use super::{distance_cmp, Node, ProximityHash};

/// Upper bound on the upfront allocation of a [ClosestNodes].
const PREALLOCATED_NODES: usize = 200;

#[derive(Debug, Clone)]
/// Nodes kept sorted nearest-first relative to a lookup target.
pub struct ClosestNodes {
    target: ProximityHash,
    nodes: Vec<Node>,
    capacity: Option<usize>,
}

impl ClosestNodes {
    pub fn new(target: ProximityHash) -> Self {
        Self {
            target,
            nodes: Vec::with_capacity(PREALLOCATED_NODES),
            capacity: None,
        }
    }

    /// Keep at most `capacity` nodes, dropping the farthest ones.
    ///
    /// Memory grows with the nodes actually added, so any `capacity` is fine.
    pub fn with_capacity(target: ProximityHash, capacity: usize) -> Self {
        Self {
            target,
            nodes: Vec::with_capacity(capacity.min(PREALLOCATED_NODES)),
            capacity: Some(capacity),
        }
    }

    // === Getters ===

    pub fn target(&self) -> &ProximityHash {
        &self.target
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // === Public Methods ===

    /// Insert a node at its sorted position, returns `false` if a node with the
    /// same id is already present or the node is too far to fit.
    pub fn add(&mut self, node: Node) -> bool {
        let position = self.nodes.binary_search_by(|probe| {
            if probe.id() == node.id() {
                Ordering::Equal
            } else {
                distance_cmp(&self.target, probe.hash(), node.hash())
            }
        });

        match position {
            Ok(_) => false,
            Err(pos) => {
                if let Some(capacity) = self.capacity {
                    if pos >= capacity {
                        return false;
                    }
                }

                self.nodes.insert(pos, node);

                if let Some(capacity) = self.capacity {
                    self.nodes.truncate(capacity);
                }

                true
            }
        }
    }
}

impl Extend<Node> for ClosestNodes {
    fn extend<T: IntoIterator<Item = Node>>(&mut self, iter: T) {
        for node in iter {
            self.add(node);
        }
    }
}

impl IntoIterator for ClosestNodes {
    type Item = Node;
    type IntoIter = IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ClosestNodes {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

/// Sort `nodes` nearest-first relative to `target`.
///
/// Stable, so nodes at equal distance keep their relative order.
pub fn sort_by_proximity(target: &ProximityHash, nodes: &mut [Node]) {
    nodes.sort_by(|a, b| distance_cmp(target, a.hash(), b.hash()));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sorted(target: &ProximityHash, nodes: &[Node]) {
        for pair in nodes.windows(2) {
            assert_ne!(
                distance_cmp(target, pair[0].hash(), pair[1].hash()),
                Ordering::Greater
            );
        }
    }

    #[test]
    fn add() {
        let target = ProximityHash::random();

        let mut closest_nodes = ClosestNodes::new(target);

        for _ in 0..10 {
            let node = Node::random();
            assert!(closest_nodes.add(node.clone()));
            assert!(!closest_nodes.add(node));
        }

        assert_eq!(closest_nodes.len(), 10);
        assert_sorted(&target, closest_nodes.nodes());

        let distances = closest_nodes
            .nodes()
            .iter()
            .map(|n| n.hash().log_distance(&target))
            .collect::<Vec<_>>();

        let mut sorted = distances.clone();
        sorted.sort();

        assert_eq!(sorted, distances);
    }

    #[test]
    fn capacity_keeps_nearest() {
        let target = ProximityHash::random();
        let nodes: Vec<Node> = (0..50).map(Node::unique).collect();

        let mut bounded = ClosestNodes::with_capacity(target, 8);
        bounded.extend(nodes.iter().cloned());

        let mut all = nodes;
        sort_by_proximity(&target, &mut all);

        assert_eq!(bounded.nodes(), &all[..8]);
    }

    #[test]
    fn unbounded_capacity_does_not_preallocate() {
        let target = ProximityHash::random();
        let nodes: Vec<Node> = (0..10).map(Node::unique).collect();

        let mut closest = ClosestNodes::with_capacity(target, usize::MAX);
        closest.extend(nodes.iter().cloned());

        assert_eq!(closest.len(), 10);
        assert_sorted(&target, closest.nodes());
    }

    #[test]
    fn target_node_comes_first() {
        let nodes: Vec<Node> = (0..20).map(Node::unique).collect();
        let target = *nodes[13].hash();

        let mut closest = ClosestNodes::new(target);
        closest.extend(nodes.iter().cloned());

        assert_eq!(closest.nodes()[0], nodes[13]);
        assert_sorted(&target, closest.nodes());
    }

    #[test]
    fn sort_is_repeatable() {
        let target = ProximityHash::random();
        let nodes: Vec<Node> = (0..30).map(Node::unique).collect();

        let mut first = nodes.clone();
        sort_by_proximity(&target, &mut first);

        let mut second = nodes.into_iter().rev().collect::<Vec<_>>();
        sort_by_proximity(&target, &mut second);

        assert_eq!(first, second);
        assert_sorted(&target, &first);
    }
}
