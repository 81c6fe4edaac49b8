//! Whole-canvas snapshots: standalone SVG documents and PNG images.
//!
//! Both render the full canvas extent at zoom 1 without interaction
//! overlays. PNG rasterisation goes through `tiny-skia`, which has no text
//! support, so labels only appear in SVG output.

use crate::canvas::GraphCanvas;
use crate::coords::ViewTransform;
use crate::model::GraphModel;
use crate::render::{Stroke, Surface};
use crate::style::Color;
use anyhow::{Context, Result, anyhow, bail};
use nodecanvas_core::{Rect, Vec2};
use std::fmt::Write as _;
use std::path::Path;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, StrokeDash, Transform};

const DASH_PATTERN: [f32; 2] = [6.0, 4.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Svg,
    Png,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "svg" => Some(ExportFormat::Svg),
            "png" => Some(ExportFormat::Png),
            _ => None,
        }
    }
}

fn escape_xml(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn opacity(color: Color) -> f32 {
    color.a as f32 / 255.0
}

fn svg_points(points: &[Vec2]) -> String {
    points
        .iter()
        .map(|p| format!("{:.1},{:.1}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn svg_stroke(color: Color, stroke: Stroke) -> String {
    let mut attrs = format!(
        "stroke=\"{}\" stroke-opacity=\"{:.3}\" stroke-width=\"{:.1}\"",
        color.to_hex(),
        opacity(color),
        stroke.width
    );
    if stroke.dashed {
        attrs.push_str(&format!(
            " stroke-dasharray=\"{} {}\"",
            DASH_PATTERN[0], DASH_PATTERN[1]
        ));
    }
    attrs
}

/// Accumulates SVG elements.
pub struct SvgSurface {
    body: String,
    size: Vec2,
}

impl SvgSurface {
    pub fn new(size: Vec2) -> Self {
        Self {
            body: String::new(),
            size,
        }
    }

    /// The complete document.
    pub fn finish(self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" font-family="system-ui, sans-serif">
{body}</svg>
"#,
            w = self.size.x,
            h = self.size.y,
            body = self.body
        )
    }
}

impl Surface for SvgSurface {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let _ = writeln!(
            self.body,
            "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\" fill-opacity=\"{:.3}\" />",
            rect.min.x,
            rect.min.y,
            rect.width(),
            rect.height(),
            color.to_hex(),
            opacity(color)
        );
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, stroke: Stroke) {
        let _ = writeln!(
            self.body,
            "  <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"none\" {} />",
            rect.min.x,
            rect.min.y,
            rect.width(),
            rect.height(),
            svg_stroke(color, stroke)
        );
    }

    fn fill_ellipse(&mut self, rect: Rect, color: Color) {
        let c = rect.center();
        let _ = writeln!(
            self.body,
            "  <ellipse cx=\"{:.1}\" cy=\"{:.1}\" rx=\"{:.1}\" ry=\"{:.1}\" fill=\"{}\" fill-opacity=\"{:.3}\" />",
            c.x,
            c.y,
            rect.width() / 2.0,
            rect.height() / 2.0,
            color.to_hex(),
            opacity(color)
        );
    }

    fn stroke_ellipse(&mut self, rect: Rect, color: Color, stroke: Stroke) {
        let c = rect.center();
        let _ = writeln!(
            self.body,
            "  <ellipse cx=\"{:.1}\" cy=\"{:.1}\" rx=\"{:.1}\" ry=\"{:.1}\" fill=\"none\" {} />",
            c.x,
            c.y,
            rect.width() / 2.0,
            rect.height() / 2.0,
            svg_stroke(color, stroke)
        );
    }

    fn polyline(&mut self, points: &[Vec2], color: Color, stroke: Stroke) {
        let _ = writeln!(
            self.body,
            "  <polyline points=\"{}\" fill=\"none\" {} />",
            svg_points(points),
            svg_stroke(color, stroke)
        );
    }

    fn polygon(&mut self, points: &[Vec2], color: Color) {
        let _ = writeln!(
            self.body,
            "  <polygon points=\"{}\" fill=\"{}\" fill-opacity=\"{:.3}\" />",
            svg_points(points),
            color.to_hex(),
            opacity(color)
        );
    }

    fn text(&mut self, position: Vec2, text: &str, size: f32, color: Color) {
        let _ = writeln!(
            self.body,
            "  <text x=\"{:.1}\" y=\"{:.1}\" font-size=\"{:.1}\" fill=\"{}\" dominant-baseline=\"middle\">{}</text>",
            position.x,
            position.y,
            size,
            color.to_hex(),
            escape_xml(text)
        );
    }
}

/// Rasterises onto a `tiny-skia` pixmap. Text is skipped.
pub struct PixmapSurface {
    pixmap: Pixmap,
    transform: Transform,
}

impl PixmapSurface {
    /// A surface for `size` logical pixels drawn at `scale`.
    pub fn new(size: Vec2, scale: f32) -> Result<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            bail!("scale must be greater than zero when rendering PNG output");
        }
        let width = (size.x * scale).ceil();
        let height = (size.y * scale).ceil();
        if !width.is_finite() || !height.is_finite() {
            bail!("scaled dimensions are not finite; try a smaller scale factor");
        }
        if width < 1.0 || height < 1.0 {
            bail!("scaled dimensions collapsed below 1px; try a larger scale factor");
        }
        if width > u32::MAX as f32 || height > u32::MAX as f32 {
            bail!("scaled dimensions exceed supported limits; try a smaller scale factor");
        }
        let (width, height) = (width as u32, height as u32);
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("failed to allocate {width}x{height} surface for PNG export"))?;
        Ok(Self {
            pixmap,
            transform: Transform::from_scale(scale, scale),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|err| anyhow!("failed to encode PNG output: {err}"))
    }

    fn paint(color: Color) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;
        paint
    }

    fn stroke(stroke: Stroke) -> tiny_skia::Stroke {
        tiny_skia::Stroke {
            width: stroke.width,
            dash: if stroke.dashed {
                StrokeDash::new(DASH_PATTERN.to_vec(), 0.0)
            } else {
                None
            },
            ..tiny_skia::Stroke::default()
        }
    }

    fn rect_path(rect: Rect) -> Option<tiny_skia::Path> {
        tiny_skia::Rect::from_ltrb(rect.min.x, rect.min.y, rect.max.x, rect.max.y)
            .map(PathBuilder::from_rect)
    }

    fn oval_path(rect: Rect) -> Option<tiny_skia::Path> {
        tiny_skia::Rect::from_ltrb(rect.min.x, rect.min.y, rect.max.x, rect.max.y)
            .and_then(PathBuilder::from_oval)
    }

    fn line_path(points: &[Vec2], close: bool) -> Option<tiny_skia::Path> {
        let (first, rest) = points.split_first()?;
        let mut builder = PathBuilder::new();
        builder.move_to(first.x, first.y);
        for p in rest {
            builder.line_to(p.x, p.y);
        }
        if close {
            builder.close();
        }
        builder.finish()
    }

    fn fill(&mut self, path: Option<tiny_skia::Path>, color: Color) {
        if let Some(path) = path {
            self.pixmap.fill_path(
                &path,
                &Self::paint(color),
                FillRule::Winding,
                self.transform,
                None,
            );
        }
    }

    fn outline(&mut self, path: Option<tiny_skia::Path>, color: Color, stroke: Stroke) {
        if let Some(path) = path {
            self.pixmap.stroke_path(
                &path,
                &Self::paint(color),
                &Self::stroke(stroke),
                self.transform,
                None,
            );
        }
    }
}

impl Surface for PixmapSurface {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.fill(Self::rect_path(rect), color);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, stroke: Stroke) {
        self.outline(Self::rect_path(rect), color, stroke);
    }

    fn fill_ellipse(&mut self, rect: Rect, color: Color) {
        self.fill(Self::oval_path(rect), color);
    }

    fn stroke_ellipse(&mut self, rect: Rect, color: Color, stroke: Stroke) {
        self.outline(Self::oval_path(rect), color, stroke);
    }

    fn polyline(&mut self, points: &[Vec2], color: Color, stroke: Stroke) {
        self.outline(Self::line_path(points, false), color, stroke);
    }

    fn polygon(&mut self, points: &[Vec2], color: Color) {
        self.fill(Self::line_path(points, true), color);
    }

    fn text(&mut self, _position: Vec2, _text: &str, _size: f32, _color: Color) {}
}

impl GraphCanvas {
    /// Run `f` with zoom 1 and no scroll, then restore the view.
    fn with_unit_transform<R>(&mut self, f: impl FnOnce(&Self) -> R) -> R {
        let saved = self.transform;
        self.transform = ViewTransform::new(self.settings.grid_width, self.settings.grid_height);
        self.relayout_views();
        let result = f(self);
        self.transform = saved;
        self.relayout_views();
        result
    }

    pub fn export_svg(&mut self, graph: &dyn GraphModel) -> String {
        self.with_unit_transform(|canvas| {
            let mut surface = SvgSurface::new(canvas.preferred_size());
            canvas.paint_scene(graph, &mut surface, false);
            surface.finish()
        })
    }

    /// PNG bytes of the whole canvas at `scale` device pixels per canvas pixel.
    pub fn export_png(&mut self, graph: &dyn GraphModel, scale: f32) -> Result<Vec<u8>> {
        self.with_unit_transform(|canvas| {
            let mut surface = PixmapSurface::new(canvas.preferred_size(), scale)?;
            canvas.paint_scene(graph, &mut surface, false);
            surface.encode_png()
        })
    }

    pub fn export_to_file(
        &mut self,
        graph: &dyn GraphModel,
        path: &Path,
        format: ExportFormat,
        scale: f32,
    ) -> Result<()> {
        let bytes = match format {
            ExportFormat::Svg => self.export_svg(graph).into_bytes(),
            ExportFormat::Png => self.export_png(graph, scale)?,
        };
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("Exported canvas to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;
    use crate::settings::CanvasSettings;
    use crate::style::Theme;
    use nodecanvas_core::{GraphId, GridPoint, NodeKind, ScopeId};

    fn canvas_with_graph() -> (MemoryGraph, GraphCanvas) {
        let mut graph = MemoryGraph::new(GraphId(1));
        let a = graph.add_node("Load <raw>", NodeKind::Regular);
        let b = graph.add_node("Save", NodeKind::Regular);
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
        (graph, canvas)
    }

    #[test]
    fn test_export_svg() {
        let (graph, mut canvas) = canvas_with_graph();
        let unzoomed = canvas.preferred_size();
        canvas.set_zoom(2.0, None);
        let zoomed_bounds: Vec<Rect> = canvas.views().values().map(|v| v.bounds()).collect();

        let svg = canvas.export_svg(&graph);
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Load &lt;raw&gt;"));
        assert!(svg.contains("<polyline"));
        assert!(svg.contains(&format!(
            "width=\"{:.0}\" height=\"{:.0}\"",
            unzoomed.x, unzoomed.y
        )));

        // View state is restored.
        assert_eq!(canvas.transform().zoom(), 2.0);
        let bounds: Vec<Rect> = canvas.views().values().map(|v| v.bounds()).collect();
        assert_eq!(bounds, zoomed_bounds);
    }

    #[test]
    fn test_export_png() {
        let (graph, mut canvas) = canvas_with_graph();
        let png = canvas.export_png(&graph, 2.0).unwrap();
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_export_png_rejects_bad_scale() {
        let (graph, mut canvas) = canvas_with_graph();
        assert!(canvas.export_png(&graph, 0.0).is_err());
        assert!(canvas.export_png(&graph, f32::NAN).is_err());
    }

    #[test]
    fn test_pixmap_surface_size() {
        let surface = PixmapSurface::new(Vec2::new(100.0, 50.0), 1.5).unwrap();
        assert_eq!((surface.width(), surface.height()), (150, 75));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out.SVG")), Some(ExportFormat::Svg));
        assert_eq!(ExportFormat::from_path(Path::new("a/b.png")), Some(ExportFormat::Png));
        assert_eq!(ExportFormat::from_path(Path::new("notes.txt")), None);
    }
}
