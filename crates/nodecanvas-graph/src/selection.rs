//! Selection set and z-order bookkeeping for stacked annotation nodes.

use nodecanvas_core::NodeId;
use std::collections::BTreeMap;

/// Insertion-ordered set of selected nodes.
///
/// Every mutator returns whether the membership actually changed so callers
/// only announce real changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    nodes: Vec<NodeId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The node when exactly one is selected.
    pub fn single(&self) -> Option<NodeId> {
        match self.nodes.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    pub fn select_only(&mut self, node: NodeId) -> bool {
        if self.nodes == [node] {
            return false;
        }
        self.nodes.clear();
        self.nodes.push(node);
        true
    }

    pub fn add(&mut self, node: NodeId) -> bool {
        if self.contains(node) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    pub fn remove(&mut self, node: NodeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|&n| n != node);
        self.nodes.len() != before
    }

    pub fn clear(&mut self) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        self.nodes.clear();
        true
    }

    /// Replace the selection with `nodes`, dropping duplicates.
    pub fn set(&mut self, nodes: impl IntoIterator<Item = NodeId>) -> bool {
        let mut next = Selection::new();
        next.extend(nodes);
        if next == *self {
            return false;
        }
        *self = next;
        true
    }

    pub fn extend(&mut self, nodes: impl IntoIterator<Item = NodeId>) -> bool {
        let mut changed = false;
        for node in nodes {
            changed |= self.add(node);
        }
        changed
    }

    /// Select exactly the nodes of `all` that are not selected now.
    pub fn invert(&mut self, all: &[NodeId]) -> bool {
        let inverted: Vec<NodeId> = all.iter().copied().filter(|&n| !self.contains(n)).collect();
        self.set(inverted)
    }

    pub fn select_all(&mut self, all: &[NodeId]) -> bool {
        self.set(all.iter().copied())
    }

    /// Drop every node `keep` rejects. Used to prune vanished views.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId) -> bool) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|&n| keep(n));
        self.nodes.len() != before
    }
}

/// Rewrite z-orders into dense ranks `0..n`, keeping relative order. Ties are
/// broken by node id.
pub fn rank_transform(z_orders: &mut BTreeMap<NodeId, i32>) {
    let mut ordered: Vec<(i32, NodeId)> = z_orders.iter().map(|(&id, &z)| (z, id)).collect();
    ordered.sort();
    for (rank, (_, id)) in ordered.into_iter().enumerate() {
        z_orders.insert(id, rank as i32);
    }
}

/// Layer each node is drawn on: its rank, lifted above every unselected node
/// when selected. Expects ranked input.
pub fn display_layers(
    z_orders: &BTreeMap<NodeId, i32>,
    selection: &Selection,
) -> BTreeMap<NodeId, i32> {
    let lift = z_orders.len() as i32;
    z_orders
        .iter()
        .map(|(&id, &rank)| {
            let layer = if selection.contains(id) {
                rank + lift
            } else {
                rank
            };
            (id, layer)
        })
        .collect()
}

fn set_extremal(z_orders: &mut BTreeMap<NodeId, i32>, nodes: &[NodeId], value: i32) -> bool {
    let mut updated = false;
    for node in nodes {
        if let Some(z) = z_orders.get_mut(node) {
            *z = value;
            updated = true;
        }
    }
    if updated {
        rank_transform(z_orders);
    }
    updated
}

pub fn send_to_front(z_orders: &mut BTreeMap<NodeId, i32>, nodes: &[NodeId]) -> bool {
    set_extremal(z_orders, nodes, i32::MAX)
}

pub fn send_to_back(z_orders: &mut BTreeMap<NodeId, i32>, nodes: &[NodeId]) -> bool {
    set_extremal(z_orders, nodes, i32::MIN)
}

/// Move each node one step, swapping with whichever node holds the target
/// rank. Nodes are processed starting with the one already furthest in the
/// direction of travel.
fn shift(z_orders: &mut BTreeMap<NodeId, i32>, nodes: &[NodeId], step: i32) -> bool {
    rank_transform(z_orders);
    let mut moving: Vec<(i32, NodeId)> = nodes
        .iter()
        .filter_map(|id| z_orders.get(id).map(|&z| (z, *id)))
        .collect();
    if moving.is_empty() {
        return false;
    }
    moving.sort();
    if step > 0 {
        moving.reverse();
    }
    let mut by_rank: BTreeMap<i32, NodeId> = z_orders.iter().map(|(&id, &z)| (z, id)).collect();
    for (_, id) in moving {
        let Some(&old) = z_orders.get(&id) else {
            continue;
        };
        let new = old.saturating_add(step);
        if let Some(existing) = by_rank.get(&new).copied() {
            z_orders.insert(existing, old);
            by_rank.insert(old, existing);
        } else {
            by_rank.remove(&old);
        }
        z_orders.insert(id, new);
        by_rank.insert(new, id);
    }
    rank_transform(z_orders);
    true
}

pub fn raise(z_orders: &mut BTreeMap<NodeId, i32>, nodes: &[NodeId]) -> bool {
    shift(z_orders, nodes, 1)
}

pub fn lower(z_orders: &mut BTreeMap<NodeId, i32>, nodes: &[NodeId]) -> bool {
    shift(z_orders, nodes, -1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn z(entries: &[(i64, i32)]) -> BTreeMap<NodeId, i32> {
        entries.iter().map(|&(id, z)| (NodeId(id), z)).collect()
    }

    fn ranks(map: &BTreeMap<NodeId, i32>) -> Vec<(i64, i32)> {
        map.iter().map(|(id, z)| (id.0, *z)).collect()
    }

    #[test]
    fn test_selection_keeps_insertion_order() {
        let mut selection = Selection::new();
        assert!(selection.add(NodeId(3)));
        assert!(selection.add(NodeId(1)));
        assert!(!selection.add(NodeId(3)));
        assert_eq!(selection.as_slice(), &[NodeId(3), NodeId(1)]);
        assert!(selection.remove(NodeId(3)));
        assert!(!selection.remove(NodeId(3)));
        assert_eq!(selection.single(), Some(NodeId(1)));
    }

    #[test]
    fn test_select_only_and_clear_report_changes() {
        let mut selection = Selection::new();
        assert!(!selection.clear());
        assert!(selection.select_only(NodeId(1)));
        assert!(!selection.select_only(NodeId(1)));
        assert!(selection.clear());
        assert!(selection.is_empty());
    }

    #[test]
    fn test_invert_and_select_all() {
        let all = [NodeId(1), NodeId(2), NodeId(3)];
        let mut selection = Selection::new();
        selection.add(NodeId(2));
        assert!(selection.invert(&all));
        assert_eq!(selection.as_slice(), &[NodeId(1), NodeId(3)]);
        assert!(selection.select_all(&all));
        assert!(!selection.select_all(&all));
        assert_eq!(selection.len(), 3);
    }

    #[test]
    fn test_rank_transform_is_dense() {
        let mut map = z(&[(1, 40), (2, -7), (3, 40), (4, 12)]);
        rank_transform(&mut map);
        assert_eq!(ranks(&map), vec![(1, 2), (2, 0), (3, 3), (4, 1)]);
    }

    #[test]
    fn test_selected_nodes_are_lifted() {
        let map = z(&[(1, 0), (2, 1), (3, 2)]);
        let mut selection = Selection::new();
        selection.add(NodeId(1));
        let layers = display_layers(&map, &selection);
        assert!(layers[&NodeId(1)] > layers[&NodeId(3)]);
        assert!(layers[&NodeId(2)] < layers[&NodeId(3)]);
    }

    #[test]
    fn test_front_and_back() {
        let mut map = z(&[(1, 0), (2, 1), (3, 2)]);
        assert!(send_to_front(&mut map, &[NodeId(1)]));
        assert_eq!(ranks(&map), vec![(1, 2), (2, 0), (3, 1)]);
        assert!(send_to_back(&mut map, &[NodeId(3)]));
        assert_eq!(ranks(&map), vec![(1, 2), (2, 1), (3, 0)]);
        assert!(!send_to_front(&mut map, &[NodeId(99)]));
    }

    #[test]
    fn test_raise_and_lower_swap_neighbours() {
        let mut map = z(&[(1, 0), (2, 1), (3, 2)]);
        assert!(raise(&mut map, &[NodeId(1)]));
        assert_eq!(ranks(&map), vec![(1, 1), (2, 0), (3, 2)]);
        assert!(lower(&mut map, &[NodeId(3)]));
        assert_eq!(ranks(&map), vec![(1, 2), (2, 0), (3, 1)]);
        // Already on top: stays on top.
        assert!(raise(&mut map, &[NodeId(1)]));
        assert_eq!(map[&NodeId(1)], 2);
    }

    #[test]
    fn test_raise_adjacent_group_moves_together() {
        let mut map = z(&[(1, 0), (2, 1), (3, 2), (4, 3)]);
        raise(&mut map, &[NodeId(1), NodeId(2)]);
        assert_eq!(ranks(&map), vec![(1, 1), (2, 2), (3, 0), (4, 3)]);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Add(i64),
        Remove(i64),
        Clear,
        Delete(i64),
        SelectOnly(i64),
        Invert,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0i64..10).prop_map(Op::Add),
            (0i64..10).prop_map(Op::Remove),
            Just(Op::Clear),
            (0i64..10).prop_map(Op::Delete),
            (0i64..10).prop_map(Op::SelectOnly),
            Just(Op::Invert),
        ]
    }

    proptest! {
        #[test]
        fn prop_selection_stays_within_views(ops in prop::collection::vec(op_strategy(), 0..60)) {
            let mut views: Vec<NodeId> = (0..10).map(NodeId).collect();
            let mut selection = Selection::new();
            for op in ops {
                match op {
                    Op::Add(id) if views.contains(&NodeId(id)) => { selection.add(NodeId(id)); }
                    Op::SelectOnly(id) if views.contains(&NodeId(id)) => { selection.select_only(NodeId(id)); }
                    Op::Add(_) | Op::SelectOnly(_) => {}
                    Op::Remove(id) => { selection.remove(NodeId(id)); }
                    Op::Clear => { selection.clear(); }
                    Op::Invert => { selection.invert(&views); }
                    Op::Delete(id) => {
                        views.retain(|&n| n != NodeId(id));
                        selection.retain(|n| views.contains(&n));
                    }
                }
                for node in selection.iter() {
                    prop_assert!(views.contains(&node));
                }
            }
        }

        #[test]
        fn prop_front_wins_over_rest(
            zs in prop::collection::vec(-100i32..100, 1..12),
            picks in prop::collection::vec(any::<bool>(), 12),
        ) {
            let mut map: BTreeMap<NodeId, i32> =
                zs.iter().enumerate().map(|(i, &z)| (NodeId(i as i64), z)).collect();
            let front: Vec<NodeId> = map.keys().copied().filter(|id| picks[id.0 as usize]).collect();
            send_to_front(&mut map, &front);
            let ranks: Vec<i32> = {
                let mut r: Vec<i32> = map.values().copied().collect();
                r.sort();
                r
            };
            prop_assert_eq!(ranks, (0..map.len() as i32).collect::<Vec<_>>());
            for id in &front {
                for (other, z) in &map {
                    if !front.contains(other) {
                        prop_assert!(map[id] > *z);
                    }
                }
            }
        }
    }
}
