//! Drives a [`GraphCanvas`] from egui input and paints it.

use crate::surface::{EguiSurface, to_color32};
use eframe::egui;
use nodecanvas_core::Vec2;
use nodecanvas_graph::{
    CursorHint, GraphCanvas, GraphModel, Journal, Key, Modifiers, PointerButton, PointerEvent,
    ResizeAnchor,
};

const MINIMAP_SIZE: egui::Vec2 = egui::vec2(200.0, 140.0);
const MINIMAP_MARGIN: f32 = 12.0;

fn modifiers(input: &egui::InputState) -> Modifiers {
    Modifiers {
        shift: input.modifiers.shift,
        ctrl: input.modifiers.command,
        alt: input.modifiers.alt,
    }
}

fn cursor_icon(hint: CursorHint) -> egui::CursorIcon {
    match hint {
        CursorHint::Default => egui::CursorIcon::Default,
        CursorHint::Crosshair => egui::CursorIcon::Crosshair,
        CursorHint::Move => egui::CursorIcon::Grabbing,
        CursorHint::Resize(anchor) => match anchor {
            ResizeAnchor::TopLeft | ResizeAnchor::BottomRight => egui::CursorIcon::ResizeNwSe,
            ResizeAnchor::TopRight | ResizeAnchor::BottomLeft => egui::CursorIcon::ResizeNeSw,
            ResizeAnchor::TopCenter | ResizeAnchor::BottomCenter => {
                egui::CursorIcon::ResizeVertical
            }
            ResizeAnchor::CenterLeft | ResizeAnchor::CenterRight => {
                egui::CursorIcon::ResizeHorizontal
            }
        },
    }
}

const KEYS: [(egui::Key, Key); 6] = [
    (egui::Key::ArrowLeft, Key::Left),
    (egui::Key::ArrowRight, Key::Right),
    (egui::Key::ArrowUp, Key::Up),
    (egui::Key::ArrowDown, Key::Down),
    (egui::Key::Escape, Key::Escape),
    (egui::Key::A, Key::A),
];

pub struct CanvasWidget {
    /// The primary button went down over the canvas and is still held.
    pressed: bool,
    pub show_minimap: bool,
}

impl Default for CanvasWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasWidget {
    pub fn new() -> Self {
        Self {
            pressed: false,
            show_minimap: true,
        }
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        canvas: &mut GraphCanvas,
        graph: &mut dyn GraphModel,
        journal: &mut dyn Journal,
    ) -> egui::Response {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        canvas.set_viewport_size(Vec2::new(rect.width(), rect.height()));
        canvas.process_notifications(graph);

        let local = |pos: egui::Pos2| Vec2::new(pos.x - rect.min.x, pos.y - rect.min.y);
        let mods = ui.input(modifiers);

        if let Some(hover) = response.hover_pos() {
            let zoom_delta = ui.input(|i| i.zoom_delta());
            let scroll = ui.input(|i| i.smooth_scroll_delta);
            if (zoom_delta - 1.0).abs() > f32::EPSILON {
                let zoom = canvas.transform().zoom() * zoom_delta;
                canvas.set_zoom(zoom, Some(local(hover)));
            } else if scroll != egui::Vec2::ZERO {
                canvas.scroll_by(Vec2::new(-scroll.x, -scroll.y));
            }
            if !self.pressed {
                canvas.pointer_moved(PointerEvent::primary(local(hover)).with_modifiers(mods));
            }
        }

        let (pressed, released, origin) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.press_origin(),
            )
        });
        if pressed && response.hovered() {
            let at = origin.map(local).unwrap_or(Vec2::ZERO);
            canvas.pointer_pressed(PointerEvent::primary(at).with_modifiers(mods));
            self.pressed = true;
        }
        if self.pressed
            && response.dragged_by(egui::PointerButton::Primary)
            && let Some(pos) = response.interact_pointer_pos()
        {
            canvas.pointer_dragged(
                graph,
                journal,
                PointerEvent::primary(local(pos)).with_modifiers(mods),
            );
        }
        if self.pressed && released {
            let at = ui
                .input(|i| i.pointer.interact_pos())
                .map(local)
                .unwrap_or(Vec2::ZERO);
            canvas.pointer_released(graph, journal, PointerEvent::primary(at).with_modifiers(mods));
            self.pressed = false;
        }

        if let Some(pos) = response.interact_pointer_pos() {
            let at = local(pos);
            if response.double_clicked() {
                canvas.pointer_clicked(PointerEvent::primary(at).with_clicks(2));
            } else if response.clicked() {
                canvas.pointer_clicked(PointerEvent::primary(at).with_modifiers(mods));
            } else if response.secondary_clicked() {
                canvas.pointer_clicked(PointerEvent::new(at, PointerButton::Secondary));
            }
        }

        if response.hovered() || response.has_focus() {
            for (egui_key, key) in KEYS {
                if ui.input(|i| i.key_pressed(egui_key)) {
                    canvas.key_pressed(graph, journal, key, mods);
                }
            }
        }

        if response.hovered() {
            ui.ctx().set_cursor_icon(cursor_icon(canvas.cursor_hint()));
        }

        let painter = ui.painter_at(rect);
        let mut surface = EguiSurface::new(&painter, rect.min);
        canvas.paint(graph, &mut surface);

        if self.show_minimap {
            self.show_minimap(ui, rect, canvas, graph);
        }
        response
    }

    fn show_minimap(
        &mut self,
        ui: &mut egui::Ui,
        canvas_rect: egui::Rect,
        canvas: &mut GraphCanvas,
        graph: &dyn GraphModel,
    ) {
        let min = canvas_rect.right_bottom()
            - MINIMAP_SIZE
            - egui::vec2(MINIMAP_MARGIN, MINIMAP_MARGIN);
        let rect = egui::Rect::from_min_size(min, MINIMAP_SIZE);
        if !canvas_rect.contains_rect(rect) {
            return;
        }
        let response = ui.interact(rect, ui.id().with("minimap"), egui::Sense::click_and_drag());
        let scale = canvas.minimap_scale_to_fit(Vec2::new(rect.width(), rect.height()));
        if (response.clicked() || response.dragged())
            && let Some(pos) = response.interact_pointer_pos()
        {
            let local = Vec2::new(pos.x - rect.min.x, pos.y - rect.min.y);
            canvas.scroll_to_minimap_point(local, scale, Vec2::ZERO);
        }

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 4.0, to_color32(canvas.theme().background));
        let mut surface = EguiSurface::new(&painter, rect.min);
        canvas.paint_minimap(graph, &mut surface, scale, Vec2::ZERO);
        painter.rect_stroke(
            rect,
            4.0,
            egui::Stroke::new(1.0, to_color32(canvas.theme().node_border)),
            egui::StrokeKind::Inside,
        );
    }
}
