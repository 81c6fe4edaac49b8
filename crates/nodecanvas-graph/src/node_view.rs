//! Per-node visual state: grid position and size, port layout and the
//! cached active areas used for hit testing.

use crate::coords::ViewTransform;
use crate::model::{NodeInfo, PortInfo};
use nodecanvas_core::{
    GraphId, GridPoint, GridRect, GridSize, NodeId, NodeKind, PortDirection, PortId, Rect, Vec2,
};

/// Regular nodes are three rows tall: inputs in row 0, outputs in row 2.
pub const NODE_ROWS: i32 = 3;
pub const CHAR_WIDTH: f32 = 7.0;
pub const SLOT_ICON_WIDTH: f32 = 22.0;
pub const SLOT_PADDING: f32 = 16.0;
pub const ADD_PORT_BUTTON_WIDTH: f32 = 22.0;
/// Horizontal inset of an edge endpoint range inside its port.
pub const PORT_INSET: f32 = 8.0;
pub const RESIZE_HANDLE_DISTANCE: f32 = 12.0;
pub const RESIZE_HANDLE_SIZE: f32 = 10.0;
pub const DEFAULT_ANNOTATION_SIZE: GridSize = GridSize::new(6, 3);

/// Which edge or corner of a node a resize handle drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeAnchor {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl ResizeAnchor {
    pub const ALL: [ResizeAnchor; 8] = [
        ResizeAnchor::TopLeft,
        ResizeAnchor::TopCenter,
        ResizeAnchor::TopRight,
        ResizeAnchor::CenterLeft,
        ResizeAnchor::CenterRight,
        ResizeAnchor::BottomLeft,
        ResizeAnchor::BottomCenter,
        ResizeAnchor::BottomRight,
    ];

    fn moves_left(self) -> bool {
        matches!(
            self,
            ResizeAnchor::TopLeft | ResizeAnchor::CenterLeft | ResizeAnchor::BottomLeft
        )
    }

    fn moves_right(self) -> bool {
        matches!(
            self,
            ResizeAnchor::TopRight | ResizeAnchor::CenterRight | ResizeAnchor::BottomRight
        )
    }

    fn moves_top(self) -> bool {
        matches!(
            self,
            ResizeAnchor::TopLeft | ResizeAnchor::TopCenter | ResizeAnchor::TopRight
        )
    }

    fn moves_bottom(self) -> bool {
        matches!(
            self,
            ResizeAnchor::BottomLeft | ResizeAnchor::BottomCenter | ResizeAnchor::BottomRight
        )
    }

    /// Apply a grid delta to `start`. Returns `None` when the result would
    /// have a non-positive width or height.
    pub fn apply(self, start: GridRect, dx: i32, dy: i32) -> Option<GridRect> {
        let mut rect = start;
        if self.moves_left() {
            rect.x += dx;
            rect.width -= dx;
        }
        if self.moves_right() {
            rect.width += dx;
        }
        if self.moves_top() {
            rect.y += dy;
            rect.height -= dy;
        }
        if self.moves_bottom() {
            rect.height += dy;
        }
        (rect.width > 0 && rect.height > 0).then_some(rect)
    }

    /// Center of the handle, `RESIZE_HANDLE_DISTANCE` outside `bounds`.
    pub fn handle_center(self, bounds: Rect) -> Vec2 {
        let center = bounds.center();
        let x = if self.moves_left() {
            bounds.min.x - RESIZE_HANDLE_DISTANCE
        } else if self.moves_right() {
            bounds.max.x + RESIZE_HANDLE_DISTANCE
        } else {
            center.x
        };
        let y = if self.moves_top() {
            bounds.min.y - RESIZE_HANDLE_DISTANCE
        } else if self.moves_bottom() {
            bounds.max.y + RESIZE_HANDLE_DISTANCE
        } else {
            center.y
        };
        Vec2::new(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveAreaKind {
    Body,
    Port {
        port: PortId,
        direction: PortDirection,
    },
    AddPortButton {
        direction: PortDirection,
    },
    ResizeHandle(ResizeAnchor),
}

/// An interactive sub-region of a node, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveArea {
    pub node: NodeId,
    pub kind: ActiveAreaKind,
    pub rect: Rect,
}

impl ActiveArea {
    pub fn port(&self) -> Option<(PortId, PortDirection)> {
        match self.kind {
            ActiveAreaKind::Port { port, direction } => Some((port, direction)),
            _ => None,
        }
    }
}

/// Where along a node edge an edge endpoint may sit, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortRange {
    pub y: f32,
    pub center: f32,
    pub min: f32,
    pub max: f32,
}

impl PortRange {
    pub fn from_slot(slot: Rect, y: f32, inset: f32) -> Self {
        let center = slot.center().x;
        let (min, max) = if slot.width() > 2.0 * inset {
            (slot.min.x + inset, slot.max.x - inset)
        } else {
            (center, center)
        };
        Self { y, center, min, max }
    }

    pub fn point(&self) -> Vec2 {
        Vec2::new(self.center, self.y)
    }
}

fn text_width(text: &str) -> f32 {
    text.chars().count() as f32 * CHAR_WIDTH
}

fn slot_width(name: &str) -> f32 {
    text_width(name) + 2.0 * SLOT_ICON_WIDTH + SLOT_PADDING
}

#[derive(Debug, Clone)]
pub struct NodeView {
    pub node: NodeId,
    pub graph: GraphId,
    pub name: String,
    pub kind: NodeKind,
    pub locked: bool,
    pub z_order: i32,
    position: GridPoint,
    size: GridSize,
    inputs: Vec<PortInfo>,
    outputs: Vec<PortInfo>,
    inputs_editable: bool,
    outputs_editable: bool,
    bounds: Rect,
    areas: Vec<ActiveArea>,
}

impl NodeView {
    pub fn new(
        info: &NodeInfo,
        inputs: Vec<PortInfo>,
        outputs: Vec<PortInfo>,
        transform: &ViewTransform,
    ) -> Self {
        let mut view = Self {
            node: info.id,
            graph: info.graph,
            name: String::new(),
            kind: info.kind,
            locked: false,
            z_order: 0,
            position: info.location.unwrap_or(GridPoint::ORIGIN),
            size: GridSize::new(1, NODE_ROWS),
            inputs: Vec::new(),
            outputs: Vec::new(),
            inputs_editable: false,
            outputs_editable: false,
            bounds: Rect::NOTHING,
            areas: Vec::new(),
        };
        view.refresh(info, inputs, outputs, transform);
        view
    }

    /// Re-read node metadata and ports. The position is left alone.
    pub fn refresh(
        &mut self,
        info: &NodeInfo,
        inputs: Vec<PortInfo>,
        outputs: Vec<PortInfo>,
        transform: &ViewTransform,
    ) {
        self.graph = info.graph;
        self.name = info.name.clone();
        self.kind = info.kind;
        self.locked = info.locked;
        self.z_order = info.z_order;
        self.inputs_editable = info.inputs_editable;
        self.outputs_editable = info.outputs_editable;
        if self.is_annotation() {
            self.inputs.clear();
            self.outputs.clear();
            self.size = info.size.unwrap_or(DEFAULT_ANNOTATION_SIZE);
        } else {
            self.inputs = inputs;
            self.outputs = outputs;
            self.size = GridSize::new(self.natural_width(transform.cell().x), NODE_ROWS);
        }
        self.relayout(transform);
    }

    pub fn is_annotation(&self) -> bool {
        self.kind == NodeKind::Annotation
    }

    pub fn is_comment(&self) -> bool {
        self.kind == NodeKind::Comment
    }

    pub fn position(&self) -> GridPoint {
        self.position
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn grid_rect(&self) -> GridRect {
        GridRect::from_origin_size(self.position, self.size)
    }

    /// Bounds in canvas pixels.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn areas(&self) -> &[ActiveArea] {
        &self.areas
    }

    pub fn ports(&self, direction: PortDirection) -> &[PortInfo] {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    pub fn ports_editable(&self, direction: PortDirection) -> bool {
        match direction {
            PortDirection::Input => self.inputs_editable,
            PortDirection::Output => self.outputs_editable,
        }
    }

    pub fn has_port(&self, port: PortId) -> bool {
        self.inputs.iter().chain(self.outputs.iter()).any(|p| p.id == port)
    }

    pub fn move_to(&mut self, position: GridPoint, transform: &ViewTransform) {
        self.position = position;
        self.relayout(transform);
    }

    pub fn resize_to(&mut self, size: GridSize, transform: &ViewTransform) {
        self.size = size;
        self.relayout(transform);
    }

    fn natural_width(&self, cell_width: f32) -> i32 {
        let title = SLOT_ICON_WIDTH + text_width(&self.name) + SLOT_PADDING;
        let row = |direction: PortDirection| {
            let ports: f32 = self.ports(direction).iter().map(|p| slot_width(&p.name)).sum();
            let button = if self.ports_editable(direction) {
                ADD_PORT_BUTTON_WIDTH
            } else {
                0.0
            };
            ports + button
        };
        let width = title
            .max(row(PortDirection::Input))
            .max(row(PortDirection::Output));
        ((width / cell_width).ceil() as i32).max(1)
    }

    /// Recompute canvas-space bounds and active areas.
    pub fn relayout(&mut self, transform: &ViewTransform) {
        self.bounds = transform.grid_rect_to_canvas(self.grid_rect());
        self.areas.clear();
        if !self.is_annotation() {
            let row_height = transform.zoomed_cell().y;
            for direction in [PortDirection::Input, PortDirection::Output] {
                let row = if direction.is_input() { 0 } else { NODE_ROWS - 1 };
                let top = self.bounds.min.y + row as f32 * row_height;
                self.layout_row(direction, top, row_height, transform.zoom());
            }
        }
        self.areas.push(ActiveArea {
            node: self.node,
            kind: ActiveAreaKind::Body,
            rect: self.bounds,
        });
    }

    fn layout_row(&mut self, direction: PortDirection, top: f32, height: f32, zoom: f32) {
        let editable = self.ports_editable(direction);
        let ports = self.ports(direction);
        let total = self.bounds.width();
        let button = if !editable {
            0.0
        } else if ports.is_empty() {
            total
        } else {
            ADD_PORT_BUTTON_WIDTH * zoom
        };
        let natural: Vec<f32> = ports.iter().map(|p| slot_width(&p.name)).collect();
        let natural_sum: f32 = natural.iter().sum();
        let scale = if natural_sum > 0.0 {
            (total - button).max(0.0) / natural_sum
        } else {
            0.0
        };
        let mut x = self.bounds.min.x;
        let mut areas = Vec::with_capacity(ports.len() + 1);
        for (port, width) in ports.iter().zip(natural) {
            let w = width * scale;
            areas.push(ActiveArea {
                node: self.node,
                kind: ActiveAreaKind::Port {
                    port: port.id,
                    direction,
                },
                rect: Rect::from_pos_size(Vec2::new(x, top), Vec2::new(w, height)),
            });
            x += w;
        }
        if editable {
            areas.push(ActiveArea {
                node: self.node,
                kind: ActiveAreaKind::AddPortButton { direction },
                rect: Rect::from_pos_size(Vec2::new(x, top), Vec2::new(button, height)),
            });
        }
        self.areas.extend(areas);
    }

    pub fn port_area(&self, port: PortId) -> Option<&ActiveArea> {
        self.areas
            .iter()
            .find(|a| matches!(a.kind, ActiveAreaKind::Port { port: p, .. } if p == port))
    }

    pub fn add_port_area(&self, direction: PortDirection) -> Option<&ActiveArea> {
        self.areas.iter().find(
            |a| matches!(a.kind, ActiveAreaKind::AddPortButton { direction: d } if d == direction),
        )
    }

    /// Endpoint range of a port: top edge for inputs, bottom edge for outputs.
    pub fn port_range(&self, port: PortId, zoom: f32) -> Option<PortRange> {
        let area = self.port_area(port)?;
        let (_, direction) = area.port()?;
        let y = if direction.is_input() {
            self.bounds.min.y
        } else {
            self.bounds.max.y
        };
        Some(PortRange::from_slot(area.rect, y, PORT_INSET * zoom))
    }

    /// Handles for all eight anchors. Their size does not scale with zoom.
    pub fn resize_handles(&self) -> Vec<ActiveArea> {
        let half = RESIZE_HANDLE_SIZE / 2.0;
        ResizeAnchor::ALL
            .iter()
            .map(|&anchor| {
                let c = anchor.handle_center(self.bounds);
                ActiveArea {
                    node: self.node,
                    kind: ActiveAreaKind::ResizeHandle(anchor),
                    rect: Rect::from_min_max(
                        Vec2::new(c.x - half, c.y - half),
                        Vec2::new(c.x + half, c.y + half),
                    ),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(kind: NodeKind) -> NodeInfo {
        NodeInfo {
            id: NodeId(1),
            graph: GraphId(0),
            name: "Gaussian blur".to_string(),
            kind,
            locked: false,
            inputs_editable: false,
            outputs_editable: false,
            location: Some(GridPoint::new(2, 4)),
            size: None,
            z_order: 0,
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn port(id: i64, direction: PortDirection, name: &str) -> PortInfo {
        PortInfo {
            id: PortId(id),
            node: NodeId(1),
            direction,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_regular_node_geometry() {
        let t = ViewTransform::new(25, 25);
        let view = NodeView::new(
            &info(NodeKind::Regular),
            vec![port(10, PortDirection::Input, "Input")],
            vec![port(11, PortDirection::Output, "Output")],
            &t,
        );
        assert_eq!(view.position(), GridPoint::new(2, 4));
        // Title: 22 + 13*7 + 16 = 129 px -> 6 cells. Output slot: 6*7 + 60 = 102 px.
        assert_eq!(view.size(), GridSize::new(6, 3));
        assert_eq!(view.bounds(), Rect::from_pos_size(Vec2::new(50.0, 100.0), Vec2::new(150.0, 75.0)));

        let input = view.port_area(PortId(10)).unwrap();
        assert_eq!(input.rect.min, Vec2::new(50.0, 100.0));
        assert!(approx(input.rect.width(), 150.0));
        let output = view.port_area(PortId(11)).unwrap();
        assert_eq!(output.rect.min.y, 150.0);

        let range = view.port_range(PortId(11), 1.0).unwrap();
        assert_eq!(range.y, 175.0);
        assert!(approx(range.center, 125.0));
        assert!(approx(range.min, 58.0));
        assert!(approx(range.max, 192.0));
    }

    #[test]
    fn test_add_port_button_keeps_width() {
        let t = ViewTransform::new(25, 25);
        let mut node = info(NodeKind::Regular);
        node.inputs_editable = true;
        let view = NodeView::new(
            &node,
            vec![
                port(10, PortDirection::Input, "A"),
                port(12, PortDirection::Input, "B"),
            ],
            vec![],
            &t,
        );
        let button = view.add_port_area(PortDirection::Input).unwrap();
        assert_eq!(button.rect.width(), ADD_PORT_BUTTON_WIDTH);
        assert_eq!(button.rect.max.x, view.bounds().max.x);
        let a = view.port_area(PortId(10)).unwrap().rect.width();
        let b = view.port_area(PortId(12)).unwrap().rect.width();
        assert!((a - b).abs() < 1e-3);
        assert!((a + b + ADD_PORT_BUTTON_WIDTH - view.bounds().width()).abs() < 1e-3);
    }

    #[test]
    fn test_annotation_uses_stored_size_and_has_no_ports() {
        let t = ViewTransform::new(25, 25);
        let mut node = info(NodeKind::Annotation);
        node.size = Some(GridSize::new(10, 8));
        let view = NodeView::new(&node, vec![port(10, PortDirection::Input, "In")], vec![], &t);
        assert_eq!(view.size(), GridSize::new(10, 8));
        assert_eq!(view.areas().len(), 1);
        assert_eq!(view.areas()[0].kind, ActiveAreaKind::Body);
    }

    #[test]
    fn test_areas_follow_zoom() {
        let mut t = ViewTransform::new(25, 25);
        let mut view = NodeView::new(&info(NodeKind::Regular), vec![], vec![], &t);
        t.set_zoom(2.0);
        view.relayout(&t);
        assert_eq!(view.bounds().min, Vec2::new(100.0, 200.0));
        assert_eq!(view.bounds().width(), 300.0);
    }

    #[test]
    fn test_resize_anchor_deltas() {
        let start = GridRect::new(2, 2, 4, 4);
        assert_eq!(
            ResizeAnchor::BottomRight.apply(start, 2, 3),
            Some(GridRect::new(2, 2, 6, 7))
        );
        assert_eq!(
            ResizeAnchor::TopLeft.apply(start, 1, -1),
            Some(GridRect::new(3, 1, 3, 5))
        );
        assert_eq!(
            ResizeAnchor::TopCenter.apply(start, 5, 1),
            Some(GridRect::new(2, 3, 4, 3))
        );
        assert_eq!(
            ResizeAnchor::CenterRight.apply(start, -1, 7),
            Some(GridRect::new(2, 2, 3, 4))
        );
    }

    #[test]
    fn test_resize_rejects_non_positive_extent() {
        let start = GridRect::new(2, 2, 4, 4);
        for anchor in ResizeAnchor::ALL {
            let (dx, dy) = match anchor {
                ResizeAnchor::TopLeft | ResizeAnchor::CenterLeft | ResizeAnchor::BottomLeft => {
                    (4, 0)
                }
                ResizeAnchor::TopRight | ResizeAnchor::CenterRight | ResizeAnchor::BottomRight => {
                    (-4, 0)
                }
                ResizeAnchor::TopCenter => (0, 4),
                ResizeAnchor::BottomCenter => (0, -4),
            };
            assert_eq!(anchor.apply(start, dx, dy), None, "{anchor:?}");
        }
    }

    #[test]
    fn test_resize_handles_sit_outside_bounds() {
        let t = ViewTransform::new(25, 25);
        let view = NodeView::new(&info(NodeKind::Annotation), vec![], vec![], &t);
        let handles = view.resize_handles();
        assert_eq!(handles.len(), 8);
        let bounds = view.bounds();
        for handle in handles {
            assert!(!bounds.contains(handle.rect.center()));
        }
    }
}
