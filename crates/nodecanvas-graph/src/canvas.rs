//! The graph canvas: view state over an externally owned [`GraphModel`].
//!
//! Holds one [`NodeView`] per visible node, the selection, zoom and scroll,
//! the edit cursor and the active drag session. Pointer handling lives in
//! [`crate::controller`], painting in [`crate::render`].

use crate::controller::{CursorHint, DragSession, Hover, Tool};
use crate::coords::{EditCursor, ViewTransform, ZOOM_STEP};
use crate::edge_router::EdgeCandidate;
use crate::hit_tester::HitTester;
use crate::layout::{LayoutNode, Layouter};
use crate::model::{GraphModel, Journal};
use crate::node_view::NodeView;
use crate::placement;
use crate::selection::{self, Selection};
use crate::settings::CanvasSettings;
use crate::style::Theme;
use crossbeam_channel::Receiver;
use nodecanvas_core::{
    CanvasError, GridPoint, GridRect, NodeId, PortDirection, PortId, Rect, ScopeId, Vec2,
};
use nodecanvas_events::{CanvasEvent, EventBus, GraphNotification};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub struct GraphCanvas {
    pub(crate) settings: CanvasSettings,
    pub(crate) theme: Theme,
    pub(crate) scope: ScopeId,
    pub(crate) transform: ViewTransform,
    pub(crate) cursor: EditCursor,
    pub(crate) views: BTreeMap<NodeId, NodeView>,
    pub(crate) selection: Selection,
    pub(crate) session: DragSession,
    pub(crate) hover: Hover,
    pub(crate) cursor_hint: CursorHint,
    pub(crate) tool: Option<Box<dyn Tool>>,
    pub(crate) layouter: Option<Box<dyn Layouter>>,
    pub(crate) events: EventBus<CanvasEvent>,
    pub(crate) notifications: Option<Receiver<GraphNotification>>,
    pub(crate) viewport_size: Option<Vec2>,
    pub(crate) scheduled_selection: Vec<NodeId>,
    pub(crate) last_expansion: Option<Instant>,
    pub(crate) last_rejection: Option<CanvasError>,
    pub(crate) extent: GridPoint,
    pub(crate) disposed: bool,
}

impl GraphCanvas {
    pub fn new(settings: CanvasSettings, theme: Theme, scope: ScopeId) -> Self {
        let transform = ViewTransform::new(settings.grid_width, settings.grid_height);
        Self {
            settings,
            theme,
            scope,
            transform,
            cursor: EditCursor::new(),
            views: BTreeMap::new(),
            selection: Selection::new(),
            session: DragSession::None,
            hover: Hover::default(),
            cursor_hint: CursorHint::Default,
            tool: None,
            layouter: None,
            events: EventBus::new(),
            notifications: None,
            viewport_size: None,
            scheduled_selection: Vec::new(),
            last_expansion: None,
            last_rejection: None,
            extent: GridPoint::ORIGIN,
            disposed: false,
        }
    }

    pub fn with_layouter(mut self, layouter: Box<dyn Layouter>) -> Self {
        self.layouter = Some(layouter);
        self
    }

    pub fn set_tool(&mut self, tool: Option<Box<dyn Tool>>) {
        self.tool = tool;
    }

    pub fn settings(&self) -> &CanvasSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut CanvasSettings {
        &mut self.settings
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    /// Shared handle to the edit cursor.
    pub fn cursor(&self) -> &EditCursor {
        &self.cursor
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn views(&self) -> &BTreeMap<NodeId, NodeView> {
        &self.views
    }

    pub fn view(&self, node: NodeId) -> Option<&NodeView> {
        self.views.get(&node)
    }

    pub fn events(&self) -> &EventBus<CanvasEvent> {
        &self.events
    }

    /// The most recent connection attempt the graph refused.
    pub fn last_rejection(&self) -> Option<&CanvasError> {
        self.last_rejection.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub(crate) fn emit(&self, event: CanvasEvent) {
        self.events.publish(event);
    }

    pub(crate) fn canvas_updated(&self) {
        self.emit(CanvasEvent::CanvasUpdated);
    }

    pub(crate) fn selection_changed(&mut self) {
        self.update_annotation_layers_local();
        self.emit(CanvasEvent::SelectionChanged {
            selection: self.selection.as_slice().to_vec(),
        });
        self.canvas_updated();
    }

    // ========================================================================
    // Graph synchronisation
    // ========================================================================

    /// Subscribe to the model's notifications and build the initial views.
    pub fn attach(&mut self, graph: &mut dyn GraphModel) {
        self.notifications = Some(graph.subscribe());
        self.disposed = false;
        self.sync(graph);
    }

    /// Handle every queued model notification. Returns whether any arrived.
    pub fn process_notifications(&mut self, graph: &mut dyn GraphModel) -> bool {
        if self.disposed {
            return false;
        }
        let Some(rx) = &self.notifications else {
            return false;
        };
        let pending: Vec<GraphNotification> = rx.try_iter().collect();
        if pending.is_empty() {
            return false;
        }
        self.sync(graph);
        for note in pending {
            if let GraphNotification::NodeConnected { source, target } = note {
                self.on_node_connected(graph, source, target);
            }
        }
        true
    }

    /// Bring the views in line with the model: stored locations first, then
    /// removals, then additions.
    pub fn sync(&mut self, graph: &mut dyn GraphModel) {
        if self.disposed {
            return;
        }
        let transform = self.transform;

        let mut removed = Vec::new();
        for (id, view) in self.views.iter_mut() {
            match graph.node(*id) {
                Some(info) if graph.is_visible(*id, self.scope) => {
                    let inputs = graph.ports(*id, PortDirection::Input);
                    let outputs = graph.ports(*id, PortDirection::Output);
                    view.refresh(&info, inputs, outputs, &transform);
                    if let Some(location) = info.location {
                        view.move_to(location, &transform);
                    }
                }
                _ => removed.push(*id),
            }
        }

        if !removed.is_empty() {
            for id in &removed {
                self.views.remove(id);
                if self.hover.node == Some(*id) {
                    self.hover = Hover::default();
                }
            }
            tracing::debug!("Removed {} node views", removed.len());
            let views = &self.views;
            if self.selection.retain(|id| views.contains_key(&id)) {
                self.selection_changed();
            } else {
                self.canvas_updated();
            }
        }

        let mut newly_placed = Vec::new();
        let mut added = 0usize;
        for info in graph.nodes() {
            if self.views.contains_key(&info.id) || !graph.is_visible(info.id, self.scope) {
                continue;
            }
            let inputs = graph.ports(info.id, PortDirection::Input);
            let outputs = graph.ports(info.id, PortDirection::Output);
            let view = NodeView::new(&info, inputs, outputs, &transform);
            self.views.insert(info.id, view);
            added += 1;
            if info.location.is_none() {
                self.auto_place(graph, info.id, true);
                newly_placed.push(info.id);
            }
        }

        if !newly_placed.is_empty() && newly_placed.len() == self.views.len() {
            self.auto_layout_all(graph);
        }
        self.update_annotation_layers(graph);
        if added > 0 {
            tracing::debug!("Added {} node views", added);
            self.canvas_updated();
        }
        self.update_extent();
        self.apply_scheduled_selection();
    }

    /// Select these nodes once their views exist, e.g. after a paste.
    pub fn schedule_selection(&mut self, nodes: Vec<NodeId>) {
        self.scheduled_selection = nodes;
    }

    fn apply_scheduled_selection(&mut self) {
        if self.scheduled_selection.is_empty() {
            return;
        }
        let scheduled = std::mem::take(&mut self.scheduled_selection);
        let present: Vec<NodeId> = scheduled
            .into_iter()
            .filter(|id| self.views.contains_key(id))
            .collect();
        if self.selection.set(present) {
            self.selection_changed();
        }
    }

    /// Drop the model subscription and any in-flight drag without committing it.
    pub fn dispose(&mut self) {
        self.notifications = None;
        if !matches!(self.session, DragSession::None) {
            tracing::debug!("Discarding drag session on dispose");
        }
        self.session = DragSession::None;
        self.disposed = true;
    }

    fn on_node_connected(&mut self, graph: &mut dyn GraphModel, source: PortId, target: PortId) {
        let (Some(source_info), Some(target_info)) = (graph.port(source), graph.port(target)) else {
            return;
        };
        let (Some(source_view), Some(target_view)) = (
            self.views.get(&source_info.node),
            self.views.get(&target_info.node),
        ) else {
            return;
        };
        let source_rect = source_view.grid_rect();
        let target_rect = target_view.grid_rect();
        if target_rect.y >= source_rect.bottom() + 1 {
            return;
        }
        if !self.settings.layout_after_connect {
            return;
        }
        if source_view.is_comment() || target_view.is_comment() {
            return;
        }

        let backup = self.cursor.get();
        let below = GridPoint::new(target_rect.x, target_rect.bottom() + 4);
        self.cursor.set_position(self.transform.grid_to_canvas(below));
        self.auto_place_adjacent(graph, source, target);
        self.auto_expand_left_top(graph);
        self.cursor.set(backup);
        self.canvas_updated();
    }

    // ========================================================================
    // Geometry and placement
    // ========================================================================

    pub fn set_viewport_size(&mut self, size: Vec2) {
        self.viewport_size = Some(size);
    }

    /// Visible part of the canvas in canvas pixels.
    pub fn visible_rect(&self) -> Option<Rect> {
        self.viewport_size
            .map(|size| Rect::from_pos_size(self.transform.scroll(), size))
    }

    pub fn visible_grid_rect(&self) -> Option<GridRect> {
        self.visible_rect()
            .map(|rect| self.transform.canvas_rect_to_grid(rect))
    }

    pub fn scroll_to(&mut self, scroll: Vec2) {
        self.transform
            .set_scroll(Vec2::new(scroll.x.max(0.0), scroll.y.max(0.0)));
    }

    pub fn scroll_by(&mut self, delta: Vec2) {
        self.scroll_to(self.transform.scroll() + delta);
    }

    fn cursor_grid(&self) -> Option<GridPoint> {
        self.cursor.get().map(|p| self.transform.canvas_to_grid(p))
    }

    /// Move a view and store its new location in the model.
    pub(crate) fn place_node(
        &mut self,
        graph: &mut dyn GraphModel,
        node: NodeId,
        position: GridPoint,
    ) -> bool {
        let Some(view) = self.views.get_mut(&node) else {
            return false;
        };
        if view.position() == position {
            return false;
        }
        view.move_to(position, &self.transform);
        if let Err(e) = graph.set_location(node, position) {
            tracing::warn!("Failed to store location of node {}: {}", node, e);
        }
        true
    }

    fn other_rects(&self, except: &[NodeId]) -> Vec<GridRect> {
        self.views
            .values()
            .filter(|v| !except.contains(&v.node))
            .map(|v| v.grid_rect())
            .collect()
    }

    /// Position a node: its stored location unless `forced`, otherwise the
    /// first free slot right of the edit cursor.
    pub fn auto_place(&mut self, graph: &mut dyn GraphModel, node: NodeId, forced: bool) {
        if !forced && let Some(location) = graph.node(node).and_then(|info| info.location) {
            self.place_node(graph, node, location);
            return;
        }
        let Some(view) = self.views.get(&node) else {
            return;
        };
        let viewport = self.visible_grid_rect();
        let seed = placement::placement_seed(self.cursor_grid(), viewport);
        let candidate = GridRect::from_origin_size(seed, view.size());
        let occupied = self.other_rects(&[node]);
        let position = placement::find_free_slot(candidate, &occupied, viewport);
        tracing::debug!("Auto-placed node {} at ({}, {})", node, position.x, position.y);
        self.place_node(graph, node, position);
        self.update_extent();
    }

    /// Put the node owning `target_port` directly below the node owning
    /// `source_port`, ports aligned.
    pub fn auto_place_adjacent(
        &mut self,
        graph: &mut dyn GraphModel,
        source_port: PortId,
        target_port: PortId,
    ) {
        let (Some(source_info), Some(target_info)) = (graph.port(source_port), graph.port(target_port))
        else {
            return;
        };
        let (source, target) = (source_info.node, target_info.node);
        let zoom = self.transform.zoom();
        let offsets = self.views.get(&source).zip(self.views.get(&target)).and_then(|(s, t)| {
            let source_range = s.port_range(source_port, zoom)?;
            let target_range = t.port_range(target_port, zoom)?;
            Some((
                s.grid_rect(),
                t.size(),
                source_range.center - s.bounds().min.x,
                target_range.center - t.bounds().min.x,
            ))
        });
        let Some((source_rect, target_size, source_offset, target_offset)) = offsets else {
            self.auto_place(graph, target, true);
            return;
        };

        let seed = placement::adjacent_seed(
            source_rect,
            source_offset,
            target_offset,
            self.transform.zoomed_cell().x,
        );
        let candidate = GridRect::from_origin_size(seed, target_size);

        if !self.settings.auto_layout_moves_other_nodes {
            let occupied = self.other_rects(&[target]);
            let position = placement::find_free_slot(candidate, &occupied, self.visible_grid_rect());
            self.place_node(graph, target, position);
            return;
        }

        let occupied = self.other_rects(&[target]);
        if !occupied.iter().any(|r| r.intersects(&candidate)) {
            self.place_node(graph, target, seed);
            return;
        }
        let line = source_rect.bottom();
        let below: Vec<(NodeId, GridRect)> = self
            .views
            .values()
            .filter(|v| v.node != source && v.node != target && v.position().y >= line)
            .map(|v| (v.node, v.grid_rect()))
            .collect();
        let rects: Vec<GridRect> = below.iter().map(|(_, r)| *r).collect();
        let Some(rows) = placement::push_down_rows(line, &rects, target_size.height) else {
            self.auto_place(graph, target, true);
            return;
        };
        for (id, rect) in below {
            self.place_node(graph, id, rect.origin().offset(0, rows));
        }
        let occupied = self.other_rects(&[target]);
        if occupied.iter().any(|r| r.intersects(&candidate)) {
            self.auto_place(graph, target, true);
        } else {
            self.place_node(graph, target, seed);
        }
        self.update_extent();
    }

    /// Shift every node not in `except`, and the edit cursor, by whole cells.
    pub(crate) fn expand_left_top(
        &mut self,
        graph: &mut dyn GraphModel,
        dx: i32,
        dy: i32,
        except: &[NodeId],
    ) {
        if dx == 0 && dy == 0 {
            return;
        }
        let targets: Vec<(NodeId, GridPoint)> = self
            .views
            .values()
            .filter(|v| !except.contains(&v.node))
            .map(|v| (v.node, v.position().offset(dx, dy)))
            .collect();
        for (id, position) in targets {
            self.place_node(graph, id, position);
        }
        self.cursor
            .translate(self.transform.grid_to_canvas(GridPoint::new(dx, dy)));
        tracing::debug!("Expanded canvas by ({}, {})", dx, dy);
    }

    /// Translate everything right/down so no node has a negative coordinate.
    pub fn auto_expand_left_top(&mut self, graph: &mut dyn GraphModel) {
        let rects = self.other_rects(&[]);
        let (dx, dy) = placement::negative_overflow(&rects);
        self.expand_left_top(graph, dx, dy, &[]);
        self.update_extent();
    }

    /// Translate all nodes so the top-left-most one sits at grid (1, 1).
    pub fn crop(&mut self, graph: &mut dyn GraphModel) {
        let rects = self.other_rects(&[]);
        let Some((dx, dy)) = placement::crop_offset(&rects) else {
            return;
        };
        let targets: Vec<(NodeId, GridPoint)> = self
            .views
            .values()
            .map(|v| (v.node, v.position().offset(dx, dy)))
            .collect();
        for (id, position) in targets {
            self.place_node(graph, id, position);
        }
        self.cursor
            .set_position(self.transform.grid_to_canvas(GridPoint::new(1, 1)));
        self.extent = GridPoint::ORIGIN;
        self.update_extent();
        self.canvas_updated();
    }

    pub(crate) fn update_extent(&mut self) {
        let rects = self.other_rects(&[]);
        let extent = placement::content_extent(&rects);
        self.extent = GridPoint::new(self.extent.x.max(extent.x), self.extent.y.max(extent.y));
    }

    /// Scrollable size of the canvas in canvas pixels. Never shrinks while
    /// nodes are moved around.
    pub fn preferred_size(&self) -> Vec2 {
        self.transform.grid_to_canvas(self.extent)
    }

    /// Lay out every node with the configured layouter.
    pub fn auto_layout_all(&mut self, graph: &mut dyn GraphModel) {
        let Some(layouter) = self.layouter.take() else {
            return;
        };
        let nodes: Vec<LayoutNode> = self
            .views
            .values()
            .map(|v| LayoutNode {
                id: v.node,
                name: v.name.clone(),
                size: v.size(),
            })
            .collect();
        let edges: Vec<(NodeId, NodeId)> = graph
            .edges()
            .into_iter()
            .filter_map(|e| Some((graph.port(e.source)?.node, graph.port(e.target)?.node)))
            .collect();
        for (id, position) in layouter.layout(&nodes, &edges) {
            self.place_node(graph, id, position);
        }
        self.layouter = Some(layouter);
        self.update_extent();
        self.canvas_updated();
    }

    /// Move each selected, unlocked node along `(dx, dy)`.
    ///
    /// Nodes that would leave the grid stay at the border and the rest of
    /// the canvas is shifted instead. `now` throttles that shift; `None`
    /// applies it unconditionally. The first real change records a
    /// "Move nodes" snapshot, tracked through `snapshot_taken`.
    pub(crate) fn apply_node_delta(
        &mut self,
        graph: &mut dyn GraphModel,
        journal: &mut dyn Journal,
        nodes: &[NodeId],
        (dx, dy): (i32, i32),
        now: Option<Instant>,
        snapshot_taken: &mut bool,
    ) -> bool {
        let mut targets: Vec<(NodeId, GridRect)> = nodes
            .iter()
            .filter_map(|id| self.views.get(id))
            .filter(|v| !v.locked)
            .map(|v| (v.node, v.grid_rect().moved_to(v.position().offset(dx, dy))))
            .collect();
        if targets.is_empty() {
            return false;
        }

        let (ox, oy) = placement::negative_overflow(targets.iter().map(|(_, r)| r));
        let mut expand = false;
        if ox != 0 || oy != 0 {
            let throttle = Duration::from_millis(self.settings.expansion_throttle_ms);
            expand = match (now, self.last_expansion) {
                (None, _) | (Some(_), None) => true,
                (Some(now), Some(last)) => now.duration_since(last) >= throttle,
            };
            for (_, rect) in targets.iter_mut() {
                *rect = rect.moved_to(rect.origin().offset(ox, oy));
            }
        }

        let moved = targets.iter().any(|(id, rect)| {
            self.views
                .get(id)
                .is_some_and(|v| v.position() != rect.origin())
        });
        if !moved && !expand {
            return false;
        }
        if !*snapshot_taken {
            journal.snapshot(
                "Move nodes",
                "Nodes were dragged with the mouse",
                self.scope,
                Some("actions/transform-move.png"),
            );
            *snapshot_taken = true;
        }
        if expand {
            let moving: Vec<NodeId> = targets.iter().map(|(id, _)| *id).collect();
            self.expand_left_top(graph, ox, oy, &moving);
            self.last_expansion = now;
        }
        for (id, rect) in targets {
            self.place_node(graph, id, rect.origin());
        }
        self.update_extent();
        self.canvas_updated();
        true
    }

    /// Keyboard nudge of the selection by whole cells.
    pub fn move_selection(
        &mut self,
        graph: &mut dyn GraphModel,
        journal: &mut dyn Journal,
        dx: i32,
        dy: i32,
    ) -> bool {
        let nodes = self.selection.as_slice().to_vec();
        let mut snapshot_taken = false;
        self.apply_node_delta(graph, journal, &nodes, (dx, dy), None, &mut snapshot_taken)
    }

    // ========================================================================
    // Zoom
    // ========================================================================

    /// Set the zoom, optionally keeping the canvas point under a screen
    /// position fixed. Returns the applied zoom.
    pub fn set_zoom(&mut self, zoom: f32, focal_screen: Option<Vec2>) -> f32 {
        let old = self.transform.zoom();
        let applied = match focal_screen {
            Some(focal) => self.transform.zoom_around(zoom, focal),
            None => self.transform.set_zoom(zoom),
        };
        if applied == old {
            return applied;
        }
        self.cursor.rescale(applied / old);
        self.relayout_views();
        self.emit(CanvasEvent::ZoomChanged { zoom: applied });
        self.canvas_updated();
        applied
    }

    pub(crate) fn relayout_views(&mut self) {
        let transform = self.transform;
        for view in self.views.values_mut() {
            view.relayout(&transform);
        }
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.set_zoom(self.transform.zoom() + ZOOM_STEP, None)
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.set_zoom(self.transform.zoom() - ZOOM_STEP, None)
    }

    pub fn reset_zoom(&mut self) -> f32 {
        self.set_zoom(1.0, None)
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select_only(&mut self, node: NodeId) {
        if self.views.contains_key(&node) && self.selection.select_only(node) {
            self.selection_changed();
        }
    }

    pub fn add_to_selection(&mut self, node: NodeId) {
        if self.views.contains_key(&node) && self.selection.add(node) {
            self.selection_changed();
        }
    }

    pub fn remove_from_selection(&mut self, node: NodeId) {
        if self.selection.remove(node) {
            self.selection_changed();
        }
    }

    pub fn clear_selection(&mut self) {
        if self.selection.clear() {
            self.selection_changed();
        }
    }

    pub fn invert_selection(&mut self) {
        let all: Vec<NodeId> = self.views.keys().copied().collect();
        if self.selection.invert(&all) {
            self.selection_changed();
        }
    }

    pub fn select_all(&mut self) {
        let all: Vec<NodeId> = self.views.keys().copied().collect();
        if self.selection.select_all(&all) {
            self.selection_changed();
        }
    }

    /// The sole selected node when it can be resized.
    pub fn resize_target(&self) -> Option<NodeId> {
        if self.settings.graph_annotations_locked {
            return None;
        }
        let node = self.selection.single()?;
        let view = self.views.get(&node)?;
        (view.is_annotation() && !view.locked).then_some(node)
    }

    // ========================================================================
    // Z-order
    // ========================================================================

    fn annotation_z_orders(&self) -> BTreeMap<NodeId, i32> {
        self.views
            .values()
            .filter(|v| v.is_annotation())
            .map(|v| (v.node, v.z_order))
            .collect()
    }

    fn update_annotation_layers_local(&mut self) {
        let mut z_orders = self.annotation_z_orders();
        selection::rank_transform(&mut z_orders);
        for (id, z) in z_orders {
            if let Some(view) = self.views.get_mut(&id) {
                view.z_order = z;
            }
        }
    }

    /// Rank-transform annotation z-orders and store changes in the model.
    pub(crate) fn update_annotation_layers(&mut self, graph: &mut dyn GraphModel) {
        let mut z_orders = self.annotation_z_orders();
        selection::rank_transform(&mut z_orders);
        self.store_z_orders(graph, z_orders);
    }

    fn store_z_orders(&mut self, graph: &mut dyn GraphModel, z_orders: BTreeMap<NodeId, i32>) {
        for (id, z) in z_orders {
            let Some(view) = self.views.get_mut(&id) else {
                continue;
            };
            if view.z_order == z {
                continue;
            }
            view.z_order = z;
            if let Err(e) = graph.set_z_order(id, z) {
                tracing::warn!("Failed to store z-order of node {}: {}", id, e);
            }
        }
    }

    fn selected_movable_annotations(&self) -> Vec<NodeId> {
        self.selection
            .iter()
            .filter(|id| {
                self.views
                    .get(id)
                    .is_some_and(|v| v.is_annotation() && !v.locked)
            })
            .collect()
    }

    fn reorder_selection(
        &mut self,
        graph: &mut dyn GraphModel,
        journal: &mut dyn Journal,
        label: &str,
        description: &str,
        icon: &str,
        apply: fn(&mut BTreeMap<NodeId, i32>, &[NodeId]) -> bool,
    ) -> bool {
        let nodes = self.selected_movable_annotations();
        if nodes.is_empty() {
            return false;
        }
        journal.snapshot(label, description, self.scope, Some(icon));
        let mut z_orders = self.annotation_z_orders();
        selection::rank_transform(&mut z_orders);
        if !apply(&mut z_orders, &nodes) {
            return false;
        }
        self.store_z_orders(graph, z_orders);
        self.canvas_updated();
        true
    }

    pub fn send_selection_to_front(
        &mut self,
        graph: &mut dyn GraphModel,
        journal: &mut dyn Journal,
    ) -> bool {
        self.reorder_selection(
            graph,
            journal,
            "Send selected nodes to foreground",
            "Sent a selection of graph annotations to the foreground",
            "actions/object-order-front.png",
            selection::send_to_front,
        )
    }

    pub fn send_selection_to_back(
        &mut self,
        graph: &mut dyn GraphModel,
        journal: &mut dyn Journal,
    ) -> bool {
        self.reorder_selection(
            graph,
            journal,
            "Send selected nodes to background",
            "Sent a selection of graph annotations to the background",
            "actions/object-order-back.png",
            selection::send_to_back,
        )
    }

    pub fn raise_selection(&mut self, graph: &mut dyn GraphModel, journal: &mut dyn Journal) -> bool {
        self.reorder_selection(
            graph,
            journal,
            "Raise selected nodes",
            "Raised a selection of graph annotations",
            "actions/object-order-raise.png",
            selection::raise,
        )
    }

    pub fn lower_selection(&mut self, graph: &mut dyn GraphModel, journal: &mut dyn Journal) -> bool {
        self.reorder_selection(
            graph,
            journal,
            "Lower selected nodes",
            "Lowered a selection of graph annotations",
            "actions/object-order-lower.png",
            selection::lower,
        )
    }

    /// Paint and hit-test order, bottom first: annotations by display layer,
    /// then the other nodes, selected ones last.
    pub fn render_order(&self) -> Vec<NodeId> {
        let z_orders = self.annotation_z_orders();
        let layers = selection::display_layers(&z_orders, &self.selection);
        let mut annotations: Vec<(i32, NodeId)> =
            layers.into_iter().map(|(id, layer)| (layer, id)).collect();
        annotations.sort();

        let mut order: Vec<NodeId> = annotations.into_iter().map(|(_, id)| id).collect();
        order.extend(
            self.views
                .values()
                .filter(|v| !v.is_annotation() && !self.selection.contains(v.node))
                .map(|v| v.node),
        );
        order.extend(self.selection.iter().filter(|id| {
            self.views
                .get(id)
                .is_some_and(|v| !v.is_annotation())
        }));
        order
    }

    /// Render order minus nodes the pointer must ignore.
    pub(crate) fn pickable_order(&self) -> Vec<NodeId> {
        let locked = self.settings.graph_annotations_locked;
        self.render_order()
            .into_iter()
            .filter(|id| {
                !locked || self.views.get(id).is_some_and(|v| !v.is_annotation())
            })
            .collect()
    }

    pub fn node_at(&self, canvas_point: Vec2) -> Option<NodeId> {
        let order = self.pickable_order();
        HitTester::new(&self.views, &order, None).node_at(canvas_point)
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Edges whose endpoints resolve to views this frame. Desynchronised
    /// edges are logged and skipped.
    pub(crate) fn edge_candidates(
        &self,
        graph: &dyn GraphModel,
        only_selected: bool,
    ) -> Vec<EdgeCandidate> {
        let zoom = self.transform.zoom();
        let mut candidates = Vec::new();
        for edge in graph.edges() {
            if let Some(tool) = &self.tool
                && !tool.can_render_edge(edge.source, edge.target)
            {
                continue;
            }
            let (Some(source), Some(target)) = (graph.port(edge.source), graph.port(edge.target))
            else {
                tracing::warn!(
                    "Edge {} -> {} references a missing port",
                    edge.source,
                    edge.target
                );
                continue;
            };
            if only_selected
                && !self.selection.contains(source.node)
                && !self.selection.contains(target.node)
            {
                continue;
            }
            let (Some(source_view), Some(target_view)) =
                (self.views.get(&source.node), self.views.get(&target.node))
            else {
                if graph.is_visible(source.node, self.scope)
                    && graph.is_visible(target.node, self.scope)
                {
                    tracing::warn!(
                        "Edge {} -> {} has no node view",
                        edge.source,
                        edge.target
                    );
                }
                continue;
            };
            let (Some(source_range), Some(target_range)) = (
                source_view.port_range(edge.source, zoom),
                target_view.port_range(edge.target, zoom),
            ) else {
                tracing::warn!(
                    "Edge {} -> {} has no port area",
                    edge.source,
                    edge.target
                );
                continue;
            };
            candidates.push(EdgeCandidate {
                source: edge.source,
                target: edge.target,
                source_node: source.node,
                target_node: target.node,
                source_range,
                target_range,
                source_bounds: source_view.bounds(),
                visibility: edge.visibility,
                shape: edge.shape.unwrap_or(self.settings.default_edge_shape),
                compatibility: edge.compatibility,
                comment: source_view.is_comment() || target_view.is_comment(),
                label: edge.label,
            });
        }
        candidates
    }
}
