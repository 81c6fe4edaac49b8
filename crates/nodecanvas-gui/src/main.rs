#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::Result;
use eframe::egui;
use nodecanvas_core::{GraphId, GridPoint, GridSize, NodeKind, ScopeId};
use nodecanvas_events::{CanvasEvent, NodeUiAction};
use nodecanvas_graph::{
    CanvasSettings, ExportFormat, GraphCanvas, GraphModel, Journal, LayeredLayouter, MemoryGraph,
    MemoryJournal, Theme,
};
use std::path::Path;

mod surface;
mod widget;

use widget::CanvasWidget;

fn demo_graph() -> Result<MemoryGraph> {
    let mut graph = MemoryGraph::new(GraphId(1));

    let load = graph.add_node("Load Image", NodeKind::Regular);
    let blur = graph.add_node("Gaussian Blur", NodeKind::Regular);
    let mask = graph.add_node("Threshold Mask", NodeKind::Regular);
    let save = graph.add_node("Save Image", NodeKind::Regular);
    let note = graph.add_node("Preprocessing", NodeKind::Annotation);

    let loaded = graph.add_output(load, "Image", "image")?;
    let blur_in = graph.add_input(blur, "Image", "image")?;
    graph.add_input(blur, "Radius", "float")?;
    let blurred = graph.add_output(blur, "Image", "image")?;
    let mask_in = graph.add_input(mask, "Image", "image")?;
    let masked = graph.add_output(mask, "Mask", "image")?;
    let save_in = graph.add_input(save, "Image", "image")?;
    let save_mask = graph.add_input(save, "Mask", "image")?;

    for (node, x, y) in [(load, 2, 2), (blur, 2, 7), (mask, 12, 7), (save, 2, 12)] {
        graph.edit_node(node, |n| n.location = Some(GridPoint::new(x, y)))?;
    }
    graph.edit_node(note, |n| {
        n.location = Some(GridPoint::new(1, 1));
        n.size = Some(GridSize::new(22, 10));
        n.z_order = -1;
    })?;
    graph.edit_node(save, |n| n.inputs_editable = true)?;

    graph.connect(loaded, blur_in)?;
    graph.connect(loaded, mask_in)?;
    graph.connect(blurred, save_in)?;
    graph.connect(masked, save_mask)?;
    Ok(graph)
}

struct CanvasApp {
    graph: MemoryGraph,
    journal: MemoryJournal,
    canvas: GraphCanvas,
    widget: CanvasWidget,
    status: String,
}

impl CanvasApp {
    fn new(graph: MemoryGraph) -> Self {
        let mut graph = graph;
        let journal = graph.journal();
        let mut canvas = GraphCanvas::new(CanvasSettings::load(), Theme::default(), ScopeId::new())
            .with_layouter(Box::new(LayeredLayouter::default()));
        canvas.attach(&mut graph);
        Self {
            graph,
            journal,
            canvas,
            widget: CanvasWidget::new(),
            status: String::new(),
        }
    }

    fn handle_events(&mut self) {
        for event in self.canvas.events().drain() {
            match event {
                CanvasEvent::SelectionChanged { selection } => {
                    self.status = format!("{} selected", selection.len());
                }
                CanvasEvent::ZoomChanged { zoom } => {
                    self.status = format!("Zoom {:.0}%", zoom * 100.0);
                }
                CanvasEvent::NodeUiActionRequested { node, action } => match action {
                    NodeUiAction::DefaultAction => {
                        if let Some(info) = node.and_then(|id| self.graph.node(id)) {
                            self.status = format!("Open {}", info.name);
                        }
                    }
                    other => tracing::debug!("Ignoring node action {:?}", other),
                },
                CanvasEvent::CanvasUpdated => {}
            }
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Zoom in").clicked() {
                self.canvas.zoom_in();
            }
            if ui.button("Zoom out").clicked() {
                self.canvas.zoom_out();
            }
            if ui.button("100%").clicked() {
                self.canvas.reset_zoom();
            }
            ui.separator();
            if ui.button("Layout").clicked() {
                self.canvas.auto_layout_all(&mut self.graph);
            }
            if ui.button("Crop").clicked() {
                self.canvas.crop(&mut self.graph);
            }
            if ui.button("To front").clicked() {
                self.canvas
                    .send_selection_to_front(&mut self.graph, &mut self.journal);
            }
            if ui.button("To back").clicked() {
                self.canvas
                    .send_selection_to_back(&mut self.graph, &mut self.journal);
            }
            ui.separator();
            let scope = self.canvas.scope();
            if ui.button("Undo").clicked() && !self.journal.undo(scope) {
                self.status = "Nothing to undo".to_string();
            }
            if ui.button("Redo").clicked() && !self.journal.redo(scope) {
                self.status = "Nothing to redo".to_string();
            }
            ui.separator();
            if ui.button("Export SVG").clicked() {
                self.export(Path::new("canvas.svg"), ExportFormat::Svg);
            }
            if ui.button("Export PNG").clicked() {
                self.export(Path::new("canvas.png"), ExportFormat::Png);
            }
            ui.checkbox(&mut self.widget.show_minimap, "Minimap");
            if ui.button("Save settings").clicked()
                && let Err(err) = self.canvas.settings().save()
            {
                tracing::warn!("Failed to save canvas settings: {err:#}");
            }
        });
    }

    fn export(&mut self, path: &Path, format: ExportFormat) {
        self.status = match self.canvas.export_to_file(&self.graph, path, format, 2.0) {
            Ok(()) => format!("Exported {}", path.display()),
            Err(err) => {
                tracing::error!("Export failed: {err:#}");
                format!("Export failed: {err}")
            }
        };
    }
}

impl eframe::App for CanvasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status);
                if let Some(error) = self.canvas.last_rejection() {
                    ui.separator();
                    ui.colored_label(egui::Color32::RED, error.to_string());
                }
            });
        });
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.widget
                    .show(ui, &mut self.canvas, &mut self.graph, &mut self.journal);
            });
        self.handle_events();
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt::init();

    let graph = match demo_graph() {
        Ok(graph) => graph,
        Err(err) => {
            tracing::error!("Failed to build demo graph: {err:#}");
            MemoryGraph::new(GraphId(1))
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 720.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Node Canvas",
        options,
        Box::new(|_cc| Ok(Box::new(CanvasApp::new(graph)))),
    )
}
