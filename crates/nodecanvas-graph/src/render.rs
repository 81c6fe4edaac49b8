//! Painting the canvas and its minimap onto an abstract [`Surface`].

use crate::canvas::GraphCanvas;
use crate::controller::DragSession;
use crate::edge_router::{
    self, ARROW_HEAD_SHIFT, EDGE_WIDTH, EdgeMuteMode, EdgePass, PlannedEdge, SELECTED_EDGE_WIDTH,
};
use crate::model::GraphModel;
use crate::node_view::{ActiveAreaKind, NodeView};
use crate::style::Color;
use nodecanvas_core::{NodeKind, PortDirection, Rect, Vec2};

pub const NODE_TEXT_SIZE: f32 = 12.0;
pub const PORT_TEXT_SIZE: f32 = 10.0;
pub const LABEL_TEXT_SIZE: f32 = 10.0;
const TEXT_INSET: f32 = 6.0;
const CURSOR_RADIUS: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub dashed: bool,
}

impl Stroke {
    pub const fn solid(width: f32) -> Self {
        Self {
            width,
            dashed: false,
        }
    }

    pub const fn dashed(width: f32) -> Self {
        Self {
            width,
            dashed: true,
        }
    }
}

/// Drawing backend. Coordinates are surface pixels.
pub trait Surface {
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_rect(&mut self, rect: Rect, color: Color, stroke: Stroke);
    fn fill_ellipse(&mut self, rect: Rect, color: Color);
    fn stroke_ellipse(&mut self, rect: Rect, color: Color, stroke: Stroke);
    fn polyline(&mut self, points: &[Vec2], color: Color, stroke: Stroke);
    fn polygon(&mut self, points: &[Vec2], color: Color);
    /// `position` is the left end of the text baseline's vertical center.
    fn text(&mut self, position: Vec2, text: &str, size: f32, color: Color);
}

/// Forwards to another surface with every coordinate shifted.
pub struct Translated<'a> {
    inner: &'a mut dyn Surface,
    offset: Vec2,
}

impl<'a> Translated<'a> {
    pub fn new(inner: &'a mut dyn Surface, offset: Vec2) -> Self {
        Self { inner, offset }
    }

    fn points(&self, points: &[Vec2]) -> Vec<Vec2> {
        points.iter().map(|p| *p + self.offset).collect()
    }
}

impl Surface for Translated<'_> {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.inner.fill_rect(rect.translate(self.offset), color);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, stroke: Stroke) {
        self.inner.stroke_rect(rect.translate(self.offset), color, stroke);
    }

    fn fill_ellipse(&mut self, rect: Rect, color: Color) {
        self.inner.fill_ellipse(rect.translate(self.offset), color);
    }

    fn stroke_ellipse(&mut self, rect: Rect, color: Color, stroke: Stroke) {
        self.inner
            .stroke_ellipse(rect.translate(self.offset), color, stroke);
    }

    fn polyline(&mut self, points: &[Vec2], color: Color, stroke: Stroke) {
        let points = self.points(points);
        self.inner.polyline(&points, color, stroke);
    }

    fn polygon(&mut self, points: &[Vec2], color: Color) {
        let points = self.points(points);
        self.inner.polygon(&points, color);
    }

    fn text(&mut self, position: Vec2, text: &str, size: f32, color: Color) {
        self.inner.text(position + self.offset, text, size, color);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
        stroke: Stroke,
    },
    FillEllipse {
        rect: Rect,
        color: Color,
    },
    StrokeEllipse {
        rect: Rect,
        color: Color,
        stroke: Stroke,
    },
    Polyline {
        points: Vec<Vec2>,
        color: Color,
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Vec2>,
        color: Color,
    },
    Text {
        position: Vec2,
        text: String,
        size: f32,
        color: Color,
    },
}

/// Records draw commands instead of drawing them.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    pub commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn polylines(&self) -> impl Iterator<Item = (&[Vec2], Color, Stroke)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Polyline {
                points,
                color,
                stroke,
            } => Some((points.as_slice(), *color, *stroke)),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Surface for DisplayList {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, stroke: Stroke) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            color,
            stroke,
        });
    }

    fn fill_ellipse(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillEllipse { rect, color });
    }

    fn stroke_ellipse(&mut self, rect: Rect, color: Color, stroke: Stroke) {
        self.commands.push(DrawCommand::StrokeEllipse {
            rect,
            color,
            stroke,
        });
    }

    fn polyline(&mut self, points: &[Vec2], color: Color, stroke: Stroke) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            color,
            stroke,
        });
    }

    fn polygon(&mut self, points: &[Vec2], color: Color) {
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            color,
        });
    }

    fn text(&mut self, position: Vec2, text: &str, size: f32, color: Color) {
        self.commands.push(DrawCommand::Text {
            position,
            text: text.to_string(),
            size,
            color,
        });
    }
}

/// The edge being dragged out, in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionPreview {
    pub points: Vec<Vec2>,
    /// Dropping here would remove an existing edge.
    pub disconnect: bool,
}

fn paint_edge(surface: &mut dyn Surface, edge: &PlannedEdge) {
    let stroke = Stroke {
        width: edge.style.width,
        dashed: edge.style.dashed,
    };
    surface.polyline(&edge.points, edge.style.color, stroke);
    let Some(end) = edge.end() else {
        return;
    };
    if edge.style.arrow_head {
        let tip = Vec2::new(end.x, end.y - ARROW_HEAD_SHIFT);
        surface.polygon(&edge_router::arrow_head(tip), edge.style.color);
    }
    if let Some(label) = &edge.label {
        surface.text(
            Vec2::new(end.x + TEXT_INSET, end.y),
            label,
            LABEL_TEXT_SIZE,
            edge.style.color,
        );
    }
}

impl GraphCanvas {
    /// Paint the visible canvas. Surface (0, 0) is the top-left of the viewport.
    pub fn paint(&self, graph: &dyn GraphModel, surface: &mut dyn Surface) {
        let mut surface = Translated::new(surface, Vec2::ZERO - self.transform.scroll());
        self.paint_scene(graph, &mut surface, true);
    }

    /// Everything in canvas pixels. `overlays` adds interaction feedback:
    /// selection, hover, marquee, edit cursor and resize handles.
    pub(crate) fn paint_scene(&self, graph: &dyn GraphModel, surface: &mut dyn Surface, overlays: bool) {
        surface.fill_rect(
            Rect::from_pos_size(Vec2::ZERO, self.preferred_size()),
            self.theme.background,
        );
        self.paint_edges(graph, surface, overlays);
        if overlays && let Some(preview) = self.connection_preview(graph) {
            let color = if preview.disconnect {
                self.theme.disconnect_preview
            } else {
                self.theme.connect_preview
            };
            surface.polyline(&preview.points, color, Stroke::solid(SELECTED_EDGE_WIDTH));
        }

        for id in self.render_order() {
            if let Some(view) = self.views.get(&id) {
                self.paint_node(view, surface, overlays);
            }
        }
        if !overlays {
            return;
        }

        for id in self.selection.iter() {
            let Some(view) = self.views.get(&id) else {
                continue;
            };
            let bounds = view.bounds().expand(2.0);
            surface.stroke_rect(bounds, self.theme.selection, Stroke::solid(2.0));
            if view.is_annotation() {
                surface.text(
                    Vec2::new(bounds.min.x, bounds.min.y - LABEL_TEXT_SIZE),
                    &format!("z {}", view.z_order),
                    LABEL_TEXT_SIZE,
                    self.theme.selection,
                );
            }
        }

        if let Some(marquee) = self.session.marquee() {
            surface.fill_rect(marquee, self.theme.marquee_fill);
            surface.stroke_rect(marquee, self.theme.marquee_border, Stroke::dashed(1.0));
        }

        if let Some(cursor) = self.cursor.get() {
            let r = CURSOR_RADIUS;
            surface.stroke_ellipse(
                Rect::from_min_max(cursor - Vec2::new(r, r), cursor + Vec2::new(r, r)),
                self.theme.cursor,
                Stroke::solid(1.5),
            );
        }

        if let Some(view) = self.resize_target().and_then(|id| self.views.get(&id)) {
            for handle in view.resize_handles() {
                surface.fill_rect(handle.rect, self.theme.resize_handle);
            }
        }
    }

    fn paint_edges(&self, graph: &dyn GraphModel, surface: &mut dyn Surface, overlays: bool) {
        let buffer = self.transform.zoomed_cell().y / 2.0;
        let has_selection = overlays && !self.selection.is_empty();

        let all = self.edge_candidates(graph, false);
        let mute = if has_selection && self.settings.auto_mute_by_selection {
            EdgeMuteMode::ForceMuted
        } else {
            EdgeMuteMode::Auto
        };
        let main = EdgePass {
            mute,
            multicolor: false,
            multicolor_count: all.len(),
            arrows: true,
            auto_hide: self.settings.auto_hide_edges,
            width: EDGE_WIDTH,
            buffer,
        };
        for edge in edge_router::plan_edges(&all, &main, &self.settings, &self.theme) {
            paint_edge(surface, &edge);
        }

        if !has_selection {
            return;
        }
        let selected = self.edge_candidates(graph, true);
        let pass = EdgePass {
            mute: EdgeMuteMode::ForceVisible,
            multicolor: self.settings.color_selected_node_edges,
            multicolor_count: selected.len(),
            arrows: true,
            auto_hide: false,
            width: SELECTED_EDGE_WIDTH,
            buffer,
        };
        for edge in edge_router::plan_edges(&selected, &pass, &self.settings, &self.theme) {
            paint_edge(surface, &edge);
        }
    }

    /// Route of the connection being dragged: to the snapped port, or to
    /// the pointer when there is no target yet.
    pub fn connection_preview(&self, graph: &dyn GraphModel) -> Option<ConnectionPreview> {
        let DragSession::ConnectPort {
            source,
            target,
            pointer,
        } = &self.session
        else {
            return None;
        };
        let zoom = self.transform.zoom();
        let (source_port, source_direction) = source.port()?;
        let source_view = self.views.get(&source.node)?;
        let from = source_view.port_range(source_port, zoom)?;

        let Some((target_port, _)) = target.and_then(|t| t.port()) else {
            let to = target.map_or(*pointer, |t| t.rect.center());
            return Some(ConnectionPreview {
                points: vec![from.point(), to],
                disconnect: false,
            });
        };
        let target_view = self.views.get(&target.as_ref()?.node)?;
        let to = target_view.port_range(target_port, zoom)?;

        let (output, output_view, input, output_port, input_port) = match source_direction {
            PortDirection::Output => (from, source_view, to, source_port, target_port),
            PortDirection::Input => (to, target_view, from, target_port, source_port),
        };
        let points = edge_router::route(
            self.settings.default_edge_shape,
            output.point(),
            output_view.bounds(),
            input.point(),
            self.transform.zoomed_cell().y / 2.0,
            false,
        );
        Some(ConnectionPreview {
            points,
            disconnect: graph.contains_edge(output_port, input_port),
        })
    }

    fn paint_node(&self, view: &NodeView, surface: &mut dyn Surface, overlays: bool) {
        let zoom = self.transform.zoom();
        let bounds = view.bounds();
        let fill = match view.kind {
            NodeKind::Regular => self.theme.node_fill,
            NodeKind::Annotation => self.theme.annotation_fill,
            NodeKind::Comment => self.theme.comment_fill,
        };
        surface.fill_rect(bounds, fill);
        surface.stroke_rect(bounds, self.theme.node_border, Stroke::solid(1.0));

        for area in view.areas() {
            match area.kind {
                ActiveAreaKind::Port { port, direction } => {
                    surface.fill_rect(area.rect, self.theme.port_fill);
                    surface.stroke_rect(area.rect, self.theme.port_border, Stroke::solid(1.0));
                    if let Some(info) = view.ports(direction).iter().find(|p| p.id == port) {
                        surface.text(
                            Vec2::new(area.rect.min.x + TEXT_INSET * zoom, area.rect.center().y),
                            &info.name,
                            PORT_TEXT_SIZE * zoom,
                            self.theme.node_text,
                        );
                    }
                }
                ActiveAreaKind::AddPortButton { .. } => {
                    surface.fill_rect(area.rect, self.theme.add_port_fill);
                    surface.text(
                        Vec2::new(area.rect.center().x - 3.0 * zoom, area.rect.center().y),
                        "+",
                        PORT_TEXT_SIZE * zoom,
                        self.theme.node_text,
                    );
                }
                ActiveAreaKind::Body | ActiveAreaKind::ResizeHandle(_) => {}
            }
        }

        let title_y = if view.is_annotation() {
            bounds.min.y + self.transform.zoomed_cell().y / 2.0
        } else {
            bounds.center().y
        };
        surface.text(
            Vec2::new(bounds.min.x + TEXT_INSET * zoom, title_y),
            &view.name,
            NODE_TEXT_SIZE * zoom,
            self.theme.node_text,
        );

        if overlays
            && self.hover.node == Some(view.node)
            && let Some(area) = self.hover.area
        {
            surface.fill_rect(area.rect, self.theme.hover);
        }
    }

    // ========================================================================
    // Minimap
    // ========================================================================

    /// Overview of the whole canvas at `canvas × scale + offset`.
    pub fn paint_minimap(
        &self,
        graph: &dyn GraphModel,
        surface: &mut dyn Surface,
        scale: f32,
        offset: Vec2,
    ) {
        let map = |p: Vec2| p * scale + offset;
        let map_rect = |r: Rect| Rect::from_min_max(map(r.min), map(r.max));

        let pass = EdgePass {
            mute: EdgeMuteMode::ForceVisible,
            multicolor: false,
            multicolor_count: 0,
            arrows: false,
            auto_hide: false,
            width: 1.0,
            buffer: self.transform.zoomed_cell().y / 2.0,
        };
        let candidates = self.edge_candidates(graph, false);
        for edge in edge_router::plan_edges(&candidates, &pass, &self.settings, &self.theme) {
            let points: Vec<Vec2> = edge.points.iter().map(|p| map(*p)).collect();
            surface.polyline(&points, self.theme.minimap_edge, Stroke::solid(1.0));
        }

        for id in self.render_order() {
            let Some(view) = self.views.get(&id) else {
                continue;
            };
            let rect = map_rect(view.bounds());
            surface.fill_rect(rect, self.theme.minimap_node);
            if self.selection.contains(id) {
                surface.stroke_rect(rect, self.theme.minimap_selection, Stroke::solid(3.0));
            }
        }

        if let Some(visible) = self.visible_rect() {
            surface.stroke_rect(map_rect(visible), self.theme.selection, Stroke::solid(1.0));
        }
    }

    /// Largest scale at which the whole canvas fits into `size`.
    pub fn minimap_scale_to_fit(&self, size: Vec2) -> f32 {
        let extent = self.preferred_size();
        if extent.x <= 0.0 || extent.y <= 0.0 {
            return 1.0;
        }
        (size.x / extent.x).min(size.y / extent.y)
    }

    pub fn minimap_to_canvas(&self, point: Vec2, scale: f32, offset: Vec2) -> Vec2 {
        if scale <= 0.0 {
            return Vec2::ZERO;
        }
        (point - offset) * (1.0 / scale)
    }

    /// Center the viewport on the canvas point under a minimap click.
    pub fn scroll_to_minimap_point(&mut self, point: Vec2, scale: f32, offset: Vec2) {
        let target = self.minimap_to_canvas(point, scale, offset);
        let half = self.viewport_size.unwrap_or(Vec2::ZERO) * 0.5;
        self.scroll_to(target - half);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{PointerButton, PointerEvent, Tool};
    use crate::memory::MemoryGraph;
    use crate::settings::CanvasSettings;
    use crate::style::Theme;
    use nodecanvas_core::{GraphId, GridPoint, NodeId, PortId, ScopeId};

    fn setup() -> (MemoryGraph, GraphCanvas, NodeId, NodeId, PortId, PortId) {
        let mut graph = MemoryGraph::new(GraphId(1));
        let a = graph.add_node("Load", NodeKind::Regular);
        let b = graph.add_node("Blur", NodeKind::Regular);
        graph
            .edit_node(a, |n| n.location = Some(GridPoint::new(1, 1)))
            .unwrap();
        graph
            .edit_node(b, |n| n.location = Some(GridPoint::new(1, 6)))
            .unwrap();
        let out = graph.add_output(a, "Image", "image").unwrap();
        let input = graph.add_input(b, "Image", "image").unwrap();
        graph.connect(out, input).unwrap();
        let mut canvas =
            GraphCanvas::new(CanvasSettings::default(), Theme::default(), ScopeId::new());
        canvas.attach(&mut graph);
        (graph, canvas, a, b, out, input)
    }

    #[test]
    fn test_paint_draws_edges_with_arrow() {
        let (graph, canvas, ..) = setup();
        let mut list = DisplayList::new();
        canvas.paint(&graph, &mut list);

        let edges: Vec<_> = list.polylines().collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].1, Theme::default().trivial_edge);
        assert!(!edges[0].2.dashed);
        assert!(list
            .commands
            .iter()
            .any(|c| matches!(c, DrawCommand::Polygon { .. })));
        let texts: Vec<&str> = list.texts().collect();
        assert!(texts.contains(&"Load"));
        assert!(texts.contains(&"Blur"));
    }

    struct HideEdgesFrom(PortId);

    impl Tool for HideEdgesFrom {
        fn name(&self) -> &str {
            "hide-edges"
        }

        fn can_render_edge(&self, source: PortId, _target: PortId) -> bool {
            source != self.0
        }
    }

    #[test]
    fn test_tool_can_veto_edges() {
        let (graph, mut canvas, _, _, out, _) = setup();
        canvas.set_tool(Some(Box::new(HideEdgesFrom(out))));
        assert!(canvas.edge_candidates(&graph, false).is_empty());

        let mut list = DisplayList::new();
        canvas.paint(&graph, &mut list);
        assert_eq!(list.polylines().count(), 0);
        let texts: Vec<&str> = list.texts().collect();
        assert!(texts.contains(&"Load"));

        canvas.set_tool(None);
        assert_eq!(canvas.edge_candidates(&graph, false).len(), 1);
    }

    #[test]
    fn test_selection_mutes_then_recolors_edges() {
        let (graph, mut canvas, a, ..) = setup();
        canvas.select_only(a);
        let mut list = DisplayList::new();
        canvas.paint(&graph, &mut list);

        let edges: Vec<_> = list.polylines().collect();
        assert_eq!(edges.len(), 2);
        // Muted main pass, then the selected pass on top.
        assert!(edges[0].2.dashed);
        assert_eq!(edges[0].1, Theme::default().hidden_edge);
        assert_eq!(edges[1].2.width, SELECTED_EDGE_WIDTH);
        assert!(list.texts().any(|t| t == "Load"));
    }

    #[test]
    fn test_paint_is_offset_by_scroll() {
        let (graph, mut canvas, a, ..) = setup();
        canvas.scroll_to(Vec2::new(10.0, 20.0));
        let mut list = DisplayList::new();
        canvas.paint(&graph, &mut list);
        let bounds = canvas.view(a).unwrap().bounds();
        assert!(list.commands.iter().any(|c| matches!(
            c,
            DrawCommand::FillRect { rect, .. } if rect.min == bounds.min - Vec2::new(10.0, 20.0)
        )));
    }

    #[test]
    fn test_connection_preview() {
        let (graph, mut canvas, a, b, out, input) = setup();
        let start = canvas.view(a).unwrap().port_area(out).unwrap().rect.center();
        canvas.pointer_pressed(PointerEvent::new(start, PointerButton::Primary));
        let preview = canvas.connection_preview(&graph).unwrap();
        assert_eq!(preview.points.len(), 2);
        assert!(!preview.disconnect);

        let mut graph = graph;
        let mut journal = graph.journal();
        let port = canvas.view(b).unwrap().port_area(input).unwrap().rect.center();
        canvas.pointer_dragged(&mut graph, &mut journal, PointerEvent::primary(port));
        let preview = canvas.connection_preview(&graph).unwrap();
        assert!(preview.disconnect);
    }

    #[test]
    fn test_minimap() {
        let (graph, mut canvas, a, ..) = setup();
        canvas.select_only(a);
        let scale = canvas.minimap_scale_to_fit(Vec2::new(100.0, 100.0));
        assert!(scale > 0.0 && scale <= 1.0);

        let mut list = DisplayList::new();
        canvas.paint_minimap(&graph, &mut list, scale, Vec2::new(5.0, 5.0));
        let edges: Vec<_> = list.polylines().collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].1, Theme::default().minimap_edge);
        let outlined = list.commands.iter().filter(|c| matches!(
            c,
            DrawCommand::StrokeRect { stroke, .. } if stroke.width == 3.0
        ));
        assert_eq!(outlined.count(), 1);

        let canvas_point = canvas.minimap_to_canvas(Vec2::new(55.0, 25.0), 0.5, Vec2::new(5.0, 5.0));
        assert_eq!(canvas_point, Vec2::new(100.0, 40.0));

        canvas.set_viewport_size(Vec2::new(40.0, 20.0));
        canvas.scroll_to_minimap_point(Vec2::new(55.0, 25.0), 0.5, Vec2::new(5.0, 5.0));
        assert_eq!(canvas.transform().scroll(), Vec2::new(80.0, 30.0));
    }

    #[test]
    fn test_desynced_edge_is_skipped() {
        let (mut graph, mut canvas, _, b, ..) = setup();
        // Remove the node without letting the canvas resync.
        graph.remove_node(b).unwrap();
        let mut list = DisplayList::new();
        canvas.paint(&graph, &mut list);
        assert_eq!(list.polylines().count(), 0);
        canvas.process_notifications(&mut graph);
        assert!(canvas.view(b).is_none());
    }
}
