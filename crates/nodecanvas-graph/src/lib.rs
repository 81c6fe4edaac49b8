pub mod canvas;
pub mod controller;
pub mod coords;
pub mod edge_router;
pub mod export;
pub mod hit_tester;
pub mod layout;
pub mod memory;
pub mod model;
pub mod node_view;
pub mod placement;
pub mod render;
pub mod selection;
pub mod settings;
pub mod style;

pub use canvas::GraphCanvas;
pub use controller::{
    CursorHint, DragSession, Hover, InteractionState, Key, Modifiers, PointerButton, PointerEvent,
    Tool, snap_connection_target,
};
pub use coords::{EditCursor, MAX_ZOOM, MIN_ZOOM, ViewTransform, ZOOM_STEP};
pub use edge_router::{EdgeCandidate, EdgeMuteMode, EdgePass, PlannedEdge, dice_score, plan_edges};
pub use export::{ExportFormat, PixmapSurface, SvgSurface};
pub use hit_tester::HitTester;
pub use layout::{LayeredLayouter, LayoutNode, Layouter};
pub use memory::{GraphDocument, MemoryGraph, MemoryJournal};
pub use model::{EdgeInfo, GraphModel, Journal, NoJournal, NodeInfo, PortInfo};
pub use node_view::{ActiveArea, ActiveAreaKind, NodeView, PortRange, ResizeAnchor};
pub use render::{DisplayList, DrawCommand, Stroke, Surface};
pub use selection::Selection;
pub use settings::CanvasSettings;
pub use style::{Color, EdgeStyle, Theme};
