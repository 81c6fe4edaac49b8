use crate::node_view::{ActiveArea, ActiveAreaKind, NodeView};
use nodecanvas_core::{NodeId, Rect, Vec2};
use std::collections::BTreeMap;

/// Specificity of an area kind. Lower wins.
fn priority(kind: &ActiveAreaKind) -> u8 {
    match kind {
        ActiveAreaKind::ResizeHandle(_) => 0,
        ActiveAreaKind::Port { .. } => 1,
        ActiveAreaKind::AddPortButton { .. } => 2,
        ActiveAreaKind::Body => 3,
    }
}

/// Most specific active area of `view` under a canvas point.
///
/// Resize handles are only considered when `resizable` is set, i.e. when the
/// node is the sole selected resizable node.
pub fn pick_area(view: &NodeView, point: Vec2, resizable: bool) -> Option<ActiveArea> {
    let handles = if resizable {
        view.resize_handles()
    } else {
        Vec::new()
    };
    handles
        .iter()
        .chain(view.areas().iter())
        .filter(|area| area.rect.contains(point))
        .min_by_key(|area| priority(&area.kind))
        .copied()
}

/// Resolves canvas points to nodes and active areas.
///
/// `order` is the render order: later entries are drawn on top and win.
#[derive(Debug, Clone, Copy)]
pub struct HitTester<'a> {
    views: &'a BTreeMap<NodeId, NodeView>,
    order: &'a [NodeId],
    resize_target: Option<NodeId>,
}

impl<'a> HitTester<'a> {
    pub fn new(
        views: &'a BTreeMap<NodeId, NodeView>,
        order: &'a [NodeId],
        resize_target: Option<NodeId>,
    ) -> Self {
        Self {
            views,
            order,
            resize_target,
        }
    }

    fn topmost(&self) -> impl Iterator<Item = &'a NodeView> + 'a {
        let views = self.views;
        let order = self.order;
        order.iter().rev().filter_map(move |id| views.get(id))
    }

    /// Topmost node whose bounds contain the point.
    pub fn node_at(&self, point: Vec2) -> Option<NodeId> {
        self.topmost()
            .find(|view| view.bounds().contains(point))
            .map(|view| view.node)
    }

    /// Most specific area under the point. Resize handles of the resize target
    /// sit outside its bounds and are tested first.
    pub fn area_at(&self, point: Vec2) -> Option<ActiveArea> {
        if let Some(target) = self.resize_target.and_then(|id| self.views.get(&id)) {
            let handle = target
                .resize_handles()
                .into_iter()
                .find(|area| area.rect.contains(point));
            if handle.is_some() {
                return handle;
            }
        }
        let view = self.topmost().find(|view| view.bounds().contains(point))?;
        pick_area(view, point, false)
    }

    /// Nodes whose bounds intersect a canvas rectangle, in render order.
    pub fn nodes_in(&self, rect: Rect) -> Vec<NodeId> {
        self.order
            .iter()
            .filter_map(|id| self.views.get(id))
            .filter(|view| view.bounds().intersects(&rect))
            .map(|view| view.node)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ViewTransform;
    use crate::model::{NodeInfo, PortInfo};
    use crate::node_view::ResizeAnchor;
    use nodecanvas_core::{GraphId, GridPoint, GridSize, NodeKind, PortDirection, PortId};

    fn make_view(id: i64, kind: NodeKind, at: (i32, i32), editable: bool) -> NodeView {
        let t = ViewTransform::new(25, 25);
        let info = NodeInfo {
            id: NodeId(id),
            graph: GraphId(0),
            name: format!("Node {id}"),
            kind,
            locked: false,
            inputs_editable: editable,
            outputs_editable: false,
            location: Some(GridPoint::new(at.0, at.1)),
            size: Some(GridSize::new(6, 4)),
            z_order: 0,
        };
        let inputs = vec![PortInfo {
            id: PortId(id * 10),
            node: NodeId(id),
            direction: PortDirection::Input,
            name: "In".to_string(),
        }];
        let outputs = vec![PortInfo {
            id: PortId(id * 10 + 1),
            node: NodeId(id),
            direction: PortDirection::Output,
            name: "Out".to_string(),
        }];
        NodeView::new(&info, inputs, outputs, &t)
    }

    fn views_of(list: Vec<NodeView>) -> (BTreeMap<NodeId, NodeView>, Vec<NodeId>) {
        let order = list.iter().map(|v| v.node).collect();
        (list.into_iter().map(|v| (v.node, v)).collect(), order)
    }

    #[test]
    fn test_port_beats_body() {
        let (views, order) = views_of(vec![make_view(1, NodeKind::Regular, (0, 0), false)]);
        let tester = HitTester::new(&views, &order, None);
        let port = tester.area_at(Vec2::new(10.0, 10.0)).unwrap();
        assert_eq!(port.port(), Some((PortId(10), PortDirection::Input)));
        // Middle row has no ports.
        let body = tester.area_at(Vec2::new(10.0, 37.0)).unwrap();
        assert_eq!(body.kind, ActiveAreaKind::Body);
        let out = tester.area_at(Vec2::new(10.0, 70.0)).unwrap();
        assert_eq!(out.port(), Some((PortId(11), PortDirection::Output)));
    }

    #[test]
    fn test_add_port_button_is_hit() {
        let view = make_view(1, NodeKind::Regular, (0, 0), true);
        let button = view.add_port_area(PortDirection::Input).unwrap().rect;
        let hit = pick_area(&view, button.center(), false).unwrap();
        assert_eq!(
            hit.kind,
            ActiveAreaKind::AddPortButton {
                direction: PortDirection::Input
            }
        );
    }

    #[test]
    fn test_topmost_node_wins() {
        let (views, order) = views_of(vec![
            make_view(1, NodeKind::Annotation, (0, 0), false),
            make_view(2, NodeKind::Annotation, (2, 1), false),
        ]);
        let tester = HitTester::new(&views, &order, None);
        assert_eq!(tester.node_at(Vec2::new(60.0, 40.0)), Some(NodeId(2)));
        assert_eq!(tester.node_at(Vec2::new(10.0, 10.0)), Some(NodeId(1)));
        assert_eq!(tester.node_at(Vec2::new(1000.0, 10.0)), None);
    }

    #[test]
    fn test_resize_handles_only_for_target() {
        let (views, order) = views_of(vec![make_view(1, NodeKind::Annotation, (2, 2), false)]);
        let bounds = views[&NodeId(1)].bounds();
        let corner = ResizeAnchor::BottomRight.handle_center(bounds);

        let without = HitTester::new(&views, &order, None);
        assert_eq!(without.area_at(corner), None);

        let with = HitTester::new(&views, &order, Some(NodeId(1)));
        assert_eq!(
            with.area_at(corner).unwrap().kind,
            ActiveAreaKind::ResizeHandle(ResizeAnchor::BottomRight)
        );
    }

    #[test]
    fn test_nodes_in_rect() {
        let (views, order) = views_of(vec![
            make_view(1, NodeKind::Annotation, (0, 0), false),
            make_view(2, NodeKind::Annotation, (20, 0), false),
            make_view(3, NodeKind::Annotation, (0, 10), false),
        ]);
        let tester = HitTester::new(&views, &order, None);
        let rect = Rect::from_points(Vec2::new(-5.0, -5.0), Vec2::new(60.0, 300.0));
        assert_eq!(tester.nodes_in(rect), vec![NodeId(1), NodeId(3)]);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::coords::ViewTransform;
    use crate::model::{NodeInfo, PortInfo};
    use nodecanvas_core::{GraphId, GridPoint, NodeKind, PortDirection, PortId};
    use proptest::prelude::*;

    fn regular_view() -> NodeView {
        let t = ViewTransform::new(25, 25);
        let info = NodeInfo {
            id: NodeId(1),
            graph: GraphId(0),
            name: "Threshold".to_string(),
            kind: NodeKind::Regular,
            locked: false,
            inputs_editable: true,
            outputs_editable: false,
            location: Some(GridPoint::new(1, 1)),
            size: None,
            z_order: 0,
        };
        let port = |id, direction| PortInfo {
            id: PortId(id),
            node: NodeId(1),
            direction,
            name: "Data".to_string(),
        };
        NodeView::new(
            &info,
            vec![port(1, PortDirection::Input), port(2, PortDirection::Input)],
            vec![port(3, PortDirection::Output)],
            &t,
        )
    }

    proptest! {
        #[test]
        fn prop_hit_is_stable_and_contains_point(x in 0.0f32..300.0, y in 0.0f32..150.0) {
            let view = regular_view();
            let point = Vec2::new(x, y);
            let first = pick_area(&view, point, true);
            let second = pick_area(&view, point, true);
            prop_assert_eq!(first, second);
            if let Some(area) = first {
                prop_assert!(area.rect.contains(point));
            }
        }
    }
}
