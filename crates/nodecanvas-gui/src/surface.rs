use eframe::egui;
use nodecanvas_core::{Rect, Vec2};
use nodecanvas_graph::{Color, Stroke, Surface};

const DASH_LENGTH: f32 = 6.0;
const GAP_LENGTH: f32 = 4.0;

pub fn to_color32(color: Color) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

/// Paints surface coordinates relative to `origin` on screen.
pub struct EguiSurface<'a> {
    painter: &'a egui::Painter,
    origin: egui::Pos2,
}

impl<'a> EguiSurface<'a> {
    pub fn new(painter: &'a egui::Painter, origin: egui::Pos2) -> Self {
        Self { painter, origin }
    }

    fn pos(&self, p: Vec2) -> egui::Pos2 {
        self.origin + egui::vec2(p.x, p.y)
    }

    fn rect(&self, r: Rect) -> egui::Rect {
        egui::Rect::from_min_max(self.pos(r.min), self.pos(r.max))
    }
}

impl Surface for EguiSurface<'_> {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.painter.rect_filled(self.rect(rect), 0.0, to_color32(color));
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, stroke: Stroke) {
        if stroke.dashed {
            let r = self.rect(rect);
            let corners = [r.left_top(), r.right_top(), r.right_bottom(), r.left_bottom(), r.left_top()];
            self.painter.extend(egui::Shape::dashed_line(
                &corners,
                egui::Stroke::new(stroke.width, to_color32(color)),
                DASH_LENGTH,
                GAP_LENGTH,
            ));
            return;
        }
        self.painter.rect_stroke(
            self.rect(rect),
            0.0,
            egui::Stroke::new(stroke.width, to_color32(color)),
            egui::StrokeKind::Middle,
        );
    }

    fn fill_ellipse(&mut self, rect: Rect, color: Color) {
        let r = self.rect(rect);
        self.painter
            .circle_filled(r.center(), r.width().min(r.height()) / 2.0, to_color32(color));
    }

    fn stroke_ellipse(&mut self, rect: Rect, color: Color, stroke: Stroke) {
        let r = self.rect(rect);
        self.painter.circle_stroke(
            r.center(),
            r.width().min(r.height()) / 2.0,
            egui::Stroke::new(stroke.width, to_color32(color)),
        );
    }

    fn polyline(&mut self, points: &[Vec2], color: Color, stroke: Stroke) {
        let points: Vec<egui::Pos2> = points.iter().map(|p| self.pos(*p)).collect();
        let egui_stroke = egui::Stroke::new(stroke.width, to_color32(color));
        if stroke.dashed {
            self.painter.extend(egui::Shape::dashed_line(
                &points,
                egui_stroke,
                DASH_LENGTH,
                GAP_LENGTH,
            ));
        } else {
            self.painter.add(egui::Shape::line(points, egui_stroke));
        }
    }

    fn polygon(&mut self, points: &[Vec2], color: Color) {
        let points: Vec<egui::Pos2> = points.iter().map(|p| self.pos(*p)).collect();
        self.painter.add(egui::Shape::convex_polygon(
            points,
            to_color32(color),
            egui::Stroke::NONE,
        ));
    }

    fn text(&mut self, position: Vec2, text: &str, size: f32, color: Color) {
        self.painter.text(
            self.pos(position),
            egui::Align2::LEFT_CENTER,
            text,
            egui::FontId::proportional(size),
            to_color32(color),
        );
    }
}
