use nodecanvas_core::{GridPoint, GridSize, NodeId};
use std::collections::HashMap;

/// A node as seen by a layout strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: NodeId,
    pub name: String,
    pub size: GridSize,
}

/// Pluggable layout strategy. Runs synchronously and returns new grid
/// locations; nodes it leaves out keep their position.
pub trait Layouter {
    fn layout(&self, nodes: &[LayoutNode], edges: &[(NodeId, NodeId)]) -> Vec<(NodeId, GridPoint)>;
}

/// Rows by longest path from the sources, columns by name within a row.
pub struct LayeredLayouter {
    pub origin: GridPoint,
    /// Empty cells between neighbours in a row.
    pub column_gap: i32,
    /// Empty rows between layers.
    pub row_gap: i32,
}

impl Default for LayeredLayouter {
    fn default() -> Self {
        Self {
            origin: GridPoint::new(1, 1),
            column_gap: Self::DEFAULT_COLUMN_GAP,
            row_gap: Self::DEFAULT_ROW_GAP,
        }
    }
}

impl LayeredLayouter {
    pub const DEFAULT_COLUMN_GAP: i32 = 2;
    pub const DEFAULT_ROW_GAP: i32 = 2;

    fn assign_ranks(nodes: &[LayoutNode], edges: &[(NodeId, NodeId)]) -> HashMap<NodeId, i32> {
        let mut ranks: HashMap<NodeId, i32> = nodes.iter().map(|n| (n.id, 0)).collect();

        // Cycles never settle; the bound keeps them finite.
        let max_iterations = nodes.len() + 2;
        let mut converged = false;
        for _ in 0..max_iterations {
            let mut changed = false;
            for (source, target) in edges {
                if source == target {
                    continue;
                }
                if let (Some(&source_rank), Some(&target_rank)) =
                    (ranks.get(source), ranks.get(target))
                    && target_rank <= source_rank
                {
                    ranks.insert(*target, source_rank + 1);
                    changed = true;
                }
            }
            if !changed {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(
                "Layer ranking did not converge after {} iterations",
                max_iterations
            );
        }

        Self::compress_ranks(&mut ranks);
        ranks
    }

    fn compress_ranks(ranks: &mut HashMap<NodeId, i32>) {
        let mut unique: Vec<i32> = ranks.values().copied().collect();
        unique.sort_unstable();
        unique.dedup();
        let remap: HashMap<i32, i32> = unique
            .iter()
            .enumerate()
            .map(|(i, rank)| (*rank, i as i32))
            .collect();
        for rank in ranks.values_mut() {
            if let Some(new_rank) = remap.get(rank) {
                *rank = *new_rank;
            }
        }
    }
}

impl Layouter for LayeredLayouter {
    fn layout(&self, nodes: &[LayoutNode], edges: &[(NodeId, NodeId)]) -> Vec<(NodeId, GridPoint)> {
        if nodes.is_empty() {
            return Vec::new();
        }
        let ranks = Self::assign_ranks(nodes, edges);

        let mut layers: Vec<Vec<&LayoutNode>> = Vec::new();
        for node in nodes {
            let rank = ranks.get(&node.id).copied().unwrap_or(0).max(0) as usize;
            if layers.len() <= rank {
                layers.resize_with(rank + 1, Vec::new);
            }
            layers[rank].push(node);
        }

        let mut positions = Vec::with_capacity(nodes.len());
        let mut y = self.origin.y;
        for layer in &mut layers {
            layer.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            let mut x = self.origin.x;
            let mut height = 0;
            for node in layer.iter() {
                positions.push((node.id, GridPoint::new(x, y)));
                x += node.size.width.max(1) + self.column_gap;
                height = height.max(node.size.height);
            }
            y += height + self.row_gap;
        }

        tracing::debug!("Laid out {} nodes in {} layers", positions.len(), layers.len());
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, name: &str) -> LayoutNode {
        LayoutNode {
            id: NodeId(id),
            name: name.to_string(),
            size: GridSize::new(4, 3),
        }
    }

    fn position_of(result: &[(NodeId, GridPoint)], id: i64) -> GridPoint {
        result
            .iter()
            .find(|(n, _)| *n == NodeId(id))
            .map(|(_, p)| *p)
            .unwrap()
    }

    #[test]
    fn test_chain_is_stacked() {
        let layouter = LayeredLayouter::default();
        let nodes = [node(1, "Load"), node(2, "Blur"), node(3, "Save")];
        let edges = [(NodeId(1), NodeId(2)), (NodeId(2), NodeId(3))];
        let result = layouter.layout(&nodes, &edges);
        assert_eq!(position_of(&result, 1), GridPoint::new(1, 1));
        assert_eq!(position_of(&result, 2), GridPoint::new(1, 6));
        assert_eq!(position_of(&result, 3), GridPoint::new(1, 11));
    }

    #[test]
    fn test_siblings_share_a_row() {
        let layouter = LayeredLayouter::default();
        let nodes = [node(1, "Load"), node(2, "Mask"), node(3, "Blur")];
        let edges = [(NodeId(1), NodeId(2)), (NodeId(1), NodeId(3))];
        let result = layouter.layout(&nodes, &edges);
        // Sorted by name inside the row.
        assert_eq!(position_of(&result, 3), GridPoint::new(1, 6));
        assert_eq!(position_of(&result, 2), GridPoint::new(7, 6));
    }

    #[test]
    fn test_degenerate_input() {
        let layouter = LayeredLayouter::default();
        assert!(layouter.layout(&[], &[]).is_empty());

        // A cycle and a dangling edge still produce a position per node.
        let nodes = [node(1, "A"), node(2, "B")];
        let edges = [
            (NodeId(1), NodeId(2)),
            (NodeId(2), NodeId(1)),
            (NodeId(2), NodeId(42)),
        ];
        let result = layouter.layout(&nodes, &edges);
        assert_eq!(result.len(), 2);
    }
}
