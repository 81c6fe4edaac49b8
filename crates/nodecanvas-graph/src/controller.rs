//! Pointer and keyboard handling for [`GraphCanvas`].
//!
//! One drag session at a time. The active [`Tool`], if any, sees every event
//! first and may consume it.

use crate::canvas::GraphCanvas;
use crate::hit_tester::HitTester;
use crate::model::{GraphModel, Journal};
use crate::node_view::{ActiveArea, ActiveAreaKind, NodeView, ResizeAnchor};
use nodecanvas_core::{CanvasError, GridRect, NodeId, PortDirection, PortId, Rect, Vec2};
use nodecanvas_events::{CanvasEvent, NodeUiAction};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
        alt: false,
    };
}

/// A pointer event in screen coordinates.
#[derive(Debug, Clone, Copy)]
pub struct PointerEvent {
    pub position: Vec2,
    pub button: PointerButton,
    pub modifiers: Modifiers,
    pub click_count: u32,
    pub time: Instant,
}

impl PointerEvent {
    pub fn new(position: Vec2, button: PointerButton) -> Self {
        Self {
            position,
            button,
            modifiers: Modifiers::NONE,
            click_count: 1,
            time: Instant::now(),
        }
    }

    pub fn primary(position: Vec2) -> Self {
        Self::new(position, PointerButton::Primary)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_clicks(mut self, click_count: u32) -> Self {
        self.click_count = click_count;
        self
    }

    pub fn at(mut self, time: Instant) -> Self {
        self.time = time;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Escape,
    A,
}

/// Pointer shape the host should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorHint {
    #[default]
    Default,
    Crosshair,
    Move,
    Resize(ResizeAnchor),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hover {
    pub node: Option<NodeId>,
    pub area: Option<ActiveArea>,
}

/// The drag in progress, with everything it needs to continue or commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragSession {
    #[default]
    None,
    MoveNodes {
        /// Node origin minus pointer, canvas pixels.
        offsets: Vec<(NodeId, Vec2)>,
        snapshot_taken: bool,
    },
    ConnectPort {
        source: ActiveArea,
        target: Option<ActiveArea>,
        /// Last pointer position, canvas pixels.
        pointer: Vec2,
    },
    ResizeNode {
        node: NodeId,
        anchor: ResizeAnchor,
        start: GridRect,
        origin: Vec2,
        snapshot_taken: bool,
    },
    MarqueeSelect {
        anchor: Vec2,
        current: Option<Vec2>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    MarqueeSelecting,
    DraggingNodes,
    DraggingConnection,
    ResizingNode,
}

impl DragSession {
    pub fn state(&self) -> InteractionState {
        match self {
            DragSession::None => InteractionState::Idle,
            DragSession::MoveNodes { .. } => InteractionState::DraggingNodes,
            DragSession::ConnectPort { .. } => InteractionState::DraggingConnection,
            DragSession::ResizeNode { .. } => InteractionState::ResizingNode,
            DragSession::MarqueeSelect { .. } => InteractionState::MarqueeSelecting,
        }
    }

    /// Marquee rectangle in canvas pixels, once the pointer has moved.
    pub fn marquee(&self) -> Option<Rect> {
        match self {
            DragSession::MarqueeSelect {
                anchor,
                current: Some(current),
            } => Some(Rect::from_points(*anchor, *current)),
            _ => None,
        }
    }
}

/// An editing mode that can take over pointer handling.
///
/// Every handler returns whether it consumed the event. Points are in canvas
/// pixels.
pub trait Tool {
    fn name(&self) -> &str;

    fn allows_node_drag(&self) -> bool {
        true
    }

    fn allows_connection_drag(&self) -> bool {
        true
    }

    fn can_render_edge(&self, _source: PortId, _target: PortId) -> bool {
        true
    }

    fn pointer_pressed(&mut self, _event: &PointerEvent, _point: Vec2) -> bool {
        false
    }

    fn pointer_dragged(&mut self, _event: &PointerEvent, _point: Vec2) -> bool {
        false
    }

    fn pointer_released(&mut self, _event: &PointerEvent, _point: Vec2) -> bool {
        false
    }

    fn pointer_moved(&mut self, _event: &PointerEvent, _point: Vec2) -> bool {
        false
    }

    fn pointer_clicked(&mut self, _event: &PointerEvent, _point: Vec2) -> bool {
        false
    }

    fn key_pressed(&mut self, _key: Key, _modifiers: Modifiers) -> bool {
        false
    }
}

fn area_under(
    view: &NodeView,
    point: Vec2,
    wanted: impl Fn(&ActiveAreaKind) -> bool,
) -> Option<ActiveArea> {
    view.areas()
        .iter()
        .find(|area| wanted(&area.kind) && area.rect.contains(point))
        .copied()
}

/// Drop target for a connection dragged from `source` while the pointer is
/// over `hovered`, a node other than the source's.
///
/// Tiers, in order: the hovered node's only port of the opposite direction
/// when its ports are fixed; a port on the node already targeted last frame
/// (keeping that target when the pointer is between ports); the port
/// directly under the pointer; an add-port button under the pointer.
pub fn snap_connection_target(
    source: &ActiveArea,
    hovered: &NodeView,
    point: Vec2,
    previous: Option<&ActiveArea>,
) -> Option<ActiveArea> {
    let (_, source_direction) = source.port()?;
    let wanted = source_direction.opposite();
    let mut target = previous.copied();
    let mut snapped = false;

    let ports = hovered.ports(wanted);
    if ports.len() == 1 && !hovered.ports_editable(wanted) {
        target = hovered.port_area(ports[0].id).copied();
        snapped = target.is_some();
    }

    if target.is_some_and(|t| t.node == hovered.node) {
        let add_port = area_under(hovered, point, |k| {
            matches!(k, ActiveAreaKind::AddPortButton { .. })
        });
        if add_port.is_none() {
            if let Some(port) = area_under(hovered, point, |k| {
                matches!(k, ActiveAreaKind::Port { direction, .. } if *direction == wanted)
            }) {
                target = Some(port);
            }
            snapped = true;
        }
    }

    if !snapped {
        target = area_under(hovered, point, |k| {
            matches!(k, ActiveAreaKind::Port { direction, .. } if *direction == wanted)
        });
        snapped = target.is_some();
    }

    if !snapped {
        target = area_under(hovered, point, |k| {
            matches!(k, ActiveAreaKind::AddPortButton { direction } if *direction == wanted)
        });
    }

    target
}

impl GraphCanvas {
    pub fn interaction_state(&self) -> InteractionState {
        self.session.state()
    }

    pub fn drag_session(&self) -> &DragSession {
        &self.session
    }

    pub fn cursor_hint(&self) -> CursorHint {
        self.cursor_hint
    }

    pub fn hover(&self) -> Hover {
        self.hover
    }

    fn tool_consumes(&mut self, f: impl FnOnce(&mut dyn Tool) -> bool) -> bool {
        match self.tool.as_mut() {
            Some(tool) => f(tool.as_mut()),
            None => false,
        }
    }

    fn tool_allows(&self, f: impl FnOnce(&dyn Tool) -> bool) -> bool {
        self.tool.as_ref().is_none_or(|tool| f(tool.as_ref()))
    }

    /// Stop the current drag. Changes already applied stay applied.
    pub fn cancel_drag(&mut self) {
        if self.session != DragSession::None {
            tracing::debug!("Drag cancelled");
        }
        self.session = DragSession::None;
        self.cursor_hint = CursorHint::Default;
        self.canvas_updated();
    }

    pub fn pointer_pressed(&mut self, event: PointerEvent) {
        if self.disposed {
            return;
        }
        let point = self.transform.screen_to_canvas(event.position);
        if self.tool_consumes(|tool| tool.pointer_pressed(&event, point)) {
            self.session = DragSession::None;
            return;
        }
        if event.button != PointerButton::Primary {
            return;
        }

        let order = self.pickable_order();
        let resize_target = self.resize_target();
        let tester = HitTester::new(&self.views, &order, resize_target);
        let area = tester.area_at(point);
        let node = tester.node_at(point);

        if let Some(area) = area
            && let ActiveAreaKind::ResizeHandle(anchor) = area.kind
            && Some(area.node) == resize_target
            && let Some(view) = self.views.get(&area.node)
        {
            tracing::debug!("Resizing node {} from {:?}", area.node, anchor);
            self.session = DragSession::ResizeNode {
                node: area.node,
                anchor,
                start: view.grid_rect(),
                origin: point,
                snapshot_taken: false,
            };
            self.cursor_hint = CursorHint::Resize(anchor);
            return;
        }

        let Some(node) = node else {
            self.session = DragSession::MarqueeSelect {
                anchor: point,
                current: None,
            };
            return;
        };

        if event.modifiers.shift {
            if self.selection.contains(node) {
                // A deselected node is never dragged.
                self.remove_from_selection(node);
                self.session = DragSession::None;
                return;
            }
            self.add_to_selection(node);
        } else if self.selection.len() <= 1 || !self.selection.contains(node) {
            self.select_only(node);
        }

        if self.tool_allows(|tool| tool.allows_connection_drag())
            && let Some(area) = area
            && area.port().is_some()
        {
            tracing::debug!("Connection drag from {:?}", area.kind);
            self.session = DragSession::ConnectPort {
                source: area,
                target: None,
                pointer: point,
            };
            self.cursor_hint = CursorHint::Crosshair;
            return;
        }

        if !self.tool_allows(|tool| tool.allows_node_drag()) {
            self.session = DragSession::None;
            return;
        }
        let offsets: Vec<(NodeId, Vec2)> = self
            .selection
            .iter()
            .filter_map(|id| self.views.get(&id))
            .filter(|view| !view.locked)
            .map(|view| (view.node, view.bounds().min - point))
            .collect();
        self.session = if offsets.is_empty() {
            DragSession::MarqueeSelect {
                anchor: point,
                current: None,
            }
        } else {
            DragSession::MoveNodes {
                offsets,
                snapshot_taken: false,
            }
        };
    }

    pub fn pointer_dragged(
        &mut self,
        graph: &mut dyn GraphModel,
        journal: &mut dyn Journal,
        event: PointerEvent,
    ) {
        if self.disposed {
            return;
        }
        let point = self.transform.screen_to_canvas(event.position);
        if self.tool_consumes(|tool| tool.pointer_dragged(&event, point)) {
            return;
        }

        let mut session = std::mem::take(&mut self.session);
        match &mut session {
            DragSession::None => {}
            DragSession::ResizeNode {
                node,
                anchor,
                start,
                origin,
                snapshot_taken,
            } => {
                self.resize_step(
                    graph,
                    journal,
                    *node,
                    *anchor,
                    *start,
                    point - *origin,
                    snapshot_taken,
                );
            }
            DragSession::ConnectPort {
                source,
                target,
                pointer,
            } => {
                *pointer = point;
                *target = self.connection_target(source, point, target.as_ref());
                self.cursor_hint = CursorHint::Crosshair;
                self.canvas_updated();
            }
            DragSession::MoveNodes {
                offsets,
                snapshot_taken,
            } => {
                self.cursor_hint = CursorHint::Move;
                let delta = offsets.iter().find_map(|(id, offset)| {
                    let view = self.views.get(id)?;
                    let wanted = self.transform.canvas_to_grid(*offset + point);
                    let current = view.position();
                    let delta = (wanted.x - current.x, wanted.y - current.y);
                    (delta != (0, 0)).then_some(delta)
                });
                if let Some(delta) = delta {
                    let nodes: Vec<NodeId> = offsets.iter().map(|(id, _)| *id).collect();
                    self.apply_node_delta(
                        graph,
                        journal,
                        &nodes,
                        delta,
                        Some(event.time),
                        snapshot_taken,
                    );
                }
            }
            DragSession::MarqueeSelect { current, .. } => {
                *current = Some(point);
                self.canvas_updated();
            }
        }
        self.session = session;
    }

    fn connection_target(
        &self,
        source: &ActiveArea,
        point: Vec2,
        previous: Option<&ActiveArea>,
    ) -> Option<ActiveArea> {
        let hovered = self.node_at(point)?;
        if hovered == source.node {
            return None;
        }
        let view = self.views.get(&hovered)?;
        snap_connection_target(source, view, point, previous)
    }

    #[allow(clippy::too_many_arguments)]
    fn resize_step(
        &mut self,
        graph: &mut dyn GraphModel,
        journal: &mut dyn Journal,
        node: NodeId,
        anchor: ResizeAnchor,
        start: GridRect,
        moved: Vec2,
        snapshot_taken: &mut bool,
    ) {
        let cell = self.transform.zoomed_cell();
        let dx = (moved.x / cell.x).round() as i32;
        let dy = (moved.y / cell.y).round() as i32;
        let Some(rect) = anchor.apply(start, dx, dy) else {
            return;
        };
        let transform = self.transform;
        let Some(view) = self.views.get_mut(&node) else {
            return;
        };
        if view.grid_rect() == rect {
            return;
        }
        if !*snapshot_taken {
            journal.snapshot(
                "Resize node",
                "Resized a graph annotation",
                self.scope,
                Some("actions/transform-scale.png"),
            );
            *snapshot_taken = true;
        }
        view.move_to(rect.origin(), &transform);
        view.resize_to(rect.size(), &transform);
        if let Err(e) = graph
            .set_location(node, rect.origin())
            .and_then(|_| graph.set_size(node, rect.size()))
        {
            tracing::warn!("Failed to store bounds of node {}: {}", node, e);
        }
        self.update_extent();
        self.canvas_updated();
    }

    pub fn pointer_released(
        &mut self,
        graph: &mut dyn GraphModel,
        journal: &mut dyn Journal,
        event: PointerEvent,
    ) {
        if self.disposed {
            return;
        }
        let point = self.transform.screen_to_canvas(event.position);
        if let DragSession::ResizeNode { node, .. } = self.session {
            tracing::debug!("Resize of node {} finished", node);
            self.session = DragSession::None;
            self.cursor_hint = CursorHint::Default;
            return;
        }
        if self.tool_consumes(|tool| tool.pointer_released(&event, point)) {
            self.session = DragSession::None;
            return;
        }

        let session = std::mem::take(&mut self.session);
        self.cursor_hint = CursorHint::Default;
        if event.button != PointerButton::Primary {
            return;
        }

        match session {
            DragSession::ConnectPort {
                source,
                target: Some(target),
                ..
            } => {
                let changed = match (source.port(), target.kind) {
                    (Some((from, _)), ActiveAreaKind::Port { port, .. }) => {
                        self.toggle_connection(graph, journal, from, port)
                    }
                    (Some(_), ActiveAreaKind::AddPortButton { direction }) => {
                        self.connect_to_new_port(graph, journal, &source, target.node, direction)
                    }
                    _ => false,
                };
                if changed {
                    self.process_notifications(graph);
                }
            }
            DragSession::ConnectPort { target: None, .. } => {
                tracing::debug!("Connection dropped without a target");
            }
            DragSession::MarqueeSelect {
                anchor,
                current: Some(_),
            } => {
                self.finish_marquee(Rect::from_points(anchor, point), point, event.modifiers.shift);
            }
            DragSession::MarqueeSelect { current: None, .. } => {
                if self.node_at(point).is_none() {
                    self.clear_selection();
                }
            }
            DragSession::MoveNodes { snapshot_taken, .. } => {
                if snapshot_taken {
                    tracing::debug!("Node drag finished");
                }
            }
            DragSession::ResizeNode { .. } | DragSession::None => {}
        }
        self.canvas_updated();
    }

    fn finish_marquee(&mut self, rect: Rect, release: Vec2, extend: bool) {
        let order = self.pickable_order();
        let hits = HitTester::new(&self.views, &order, None).nodes_in(rect);
        if hits.is_empty() {
            // An empty sweep ending on a node counts as a click on it.
            if self.node_at(release).is_none() {
                self.clear_selection();
            }
            return;
        }
        let changed = if extend {
            self.selection.extend(hits)
        } else {
            self.selection.set(hits)
        };
        if changed {
            self.selection_changed();
        }
    }

    /// Connect two ports, or disconnect them if already connected.
    /// Rejections are recorded in [`GraphCanvas::last_rejection`].
    pub fn toggle_connection(
        &mut self,
        graph: &mut dyn GraphModel,
        journal: &mut dyn Journal,
        a: PortId,
        b: PortId,
    ) -> bool {
        let (Some(port_a), Some(port_b)) = (graph.port(a), graph.port(b)) else {
            tracing::warn!("Connection between unknown ports {} and {}", a, b);
            return false;
        };
        let graph_a = self.views.get(&port_a.node).map(|v| v.graph);
        let graph_b = self.views.get(&port_b.node).map(|v| v.graph);
        if graph_a.is_none() || graph_a != graph_b {
            return self.reject(CanvasError::ForeignGraph { from: a, to: b });
        }
        if port_a.direction == port_b.direction {
            return self.reject(CanvasError::SameDirection {
                from: a,
                to: b,
                direction: port_a.direction,
            });
        }
        let (source, target) = if port_a.direction == PortDirection::Output {
            (a, b)
        } else {
            (b, a)
        };

        if graph.contains_edge(source, target) {
            journal.snapshot(
                "Disconnect",
                "Disconnected two ports",
                self.scope,
                Some("actions/disconnect.png"),
            );
            return match graph.disconnect(source, target, true) {
                Ok(()) => {
                    tracing::debug!("Disconnected {} -> {}", source, target);
                    true
                }
                Err(e) => {
                    tracing::warn!("Disconnect failed: {}", e);
                    false
                }
            };
        }

        if let Err(e) = graph.can_connect(source, target) {
            return self.reject(e);
        }
        journal.snapshot(
            "Connect",
            "Connected two ports",
            self.scope,
            Some("actions/connect.png"),
        );
        match graph.connect(source, target) {
            Ok(()) => {
                tracing::debug!("Connected {} -> {}", source, target);
                self.last_rejection = None;
                true
            }
            Err(e) => self.reject(e),
        }
    }

    fn connect_to_new_port(
        &mut self,
        graph: &mut dyn GraphModel,
        journal: &mut dyn Journal,
        source: &ActiveArea,
        node: NodeId,
        direction: PortDirection,
    ) -> bool {
        let Some((source_port, source_direction)) = source.port() else {
            return false;
        };
        if direction != source_direction.opposite() {
            return false;
        }
        let Some(info) = graph.node(node) else {
            return self.reject(CanvasError::UnknownNode(node));
        };
        if !info.ports_editable(direction) {
            return self.reject(CanvasError::PortsNotEditable { node, direction });
        }
        journal.snapshot(
            "Connect",
            "Connected to a new port",
            self.scope,
            Some("actions/connect.png"),
        );
        let port = match graph.add_port(node, direction, source_port) {
            Ok(port) => port,
            Err(e) => return self.reject(e),
        };
        let (from, to) = match source_direction {
            PortDirection::Output => (source_port, port),
            PortDirection::Input => (port, source_port),
        };
        match graph.connect(from, to) {
            Ok(()) => {
                tracing::debug!("Connected {} -> new port {}", from, to);
                true
            }
            Err(e) => self.reject(e),
        }
    }

    fn reject(&mut self, error: CanvasError) -> bool {
        tracing::info!("Connection rejected: {}", error);
        self.last_rejection = Some(error);
        false
    }

    pub fn pointer_clicked(&mut self, event: PointerEvent) {
        if self.disposed {
            return;
        }
        let point = self.transform.screen_to_canvas(event.position);
        if self.tool_consumes(|tool| tool.pointer_clicked(&event, point)) {
            return;
        }
        let node = self.node_at(point);
        match event.button {
            PointerButton::Primary if event.click_count >= 2 => {
                if node.is_some() {
                    self.emit(CanvasEvent::NodeUiActionRequested {
                        node,
                        action: NodeUiAction::DefaultAction,
                    });
                }
            }
            PointerButton::Primary => {
                self.cursor.set_position(point);
                self.canvas_updated();
            }
            PointerButton::Secondary => {
                if self.selection.len() <= 1 {
                    match node {
                        Some(node) => self.select_only(node),
                        None => self.clear_selection(),
                    }
                }
                self.cursor.set_position(point);
                self.emit(CanvasEvent::NodeUiActionRequested {
                    node,
                    action: NodeUiAction::OpenContextMenu { position: point },
                });
            }
            PointerButton::Middle => {}
        }
    }

    pub fn pointer_moved(&mut self, event: PointerEvent) {
        if self.disposed {
            return;
        }
        let point = self.transform.screen_to_canvas(event.position);
        if self.tool_consumes(|tool| tool.pointer_moved(&event, point)) {
            return;
        }
        let order = self.pickable_order();
        let area = HitTester::new(&self.views, &order, self.resize_target()).area_at(point);
        let hover = Hover {
            node: area.map(|a| a.node),
            area,
        };
        self.cursor_hint = match area.map(|a| a.kind) {
            Some(ActiveAreaKind::ResizeHandle(anchor)) => CursorHint::Resize(anchor),
            _ => CursorHint::Default,
        };
        if hover != self.hover {
            self.hover = hover;
            self.canvas_updated();
        }
    }

    /// Returns whether the key was handled.
    pub fn key_pressed(
        &mut self,
        graph: &mut dyn GraphModel,
        journal: &mut dyn Journal,
        key: Key,
        modifiers: Modifiers,
    ) -> bool {
        if self.disposed {
            return false;
        }
        if self.tool_consumes(|tool| tool.key_pressed(key, modifiers)) {
            return true;
        }
        match key {
            Key::Escape => {
                self.cancel_drag();
                true
            }
            Key::Left => self.move_selection(graph, journal, -1, 0),
            Key::Right => self.move_selection(graph, journal, 1, 0),
            Key::Up => self.move_selection(graph, journal, 0, -1),
            Key::Down => self.move_selection(graph, journal, 0, 1),
            Key::A if modifiers.ctrl => {
                self.select_all();
                true
            }
            Key::A => false,
        }
    }
}
