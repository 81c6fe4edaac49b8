//! Collaborator seams: the externally owned graph model and the undo journal.
//!
//! The canvas never owns graph data. It reads nodes, ports and edges through
//! [`GraphModel`] by stable id and keeps only view state keyed by those ids.

use crossbeam_channel::Receiver;
use nodecanvas_core::{
    CanvasError, Compatibility, EdgeShape, EdgeVisibility, GraphId, GridPoint, GridSize, NodeId,
    NodeKind, PortDirection, PortId, ScopeId,
};
use nodecanvas_events::GraphNotification;

/// Snapshot of one node as the canvas needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub graph: GraphId,
    pub name: String,
    pub kind: NodeKind,
    pub locked: bool,
    pub inputs_editable: bool,
    pub outputs_editable: bool,
    /// Location remembered by the model, in grid cells.
    pub location: Option<GridPoint>,
    /// Explicit size, only meaningful for annotations.
    pub size: Option<GridSize>,
    pub z_order: i32,
}

impl NodeInfo {
    pub fn ports_editable(&self, direction: PortDirection) -> bool {
        match direction {
            PortDirection::Input => self.inputs_editable,
            PortDirection::Output => self.outputs_editable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortInfo {
    pub id: PortId,
    pub node: NodeId,
    pub direction: PortDirection,
    pub name: String,
}

/// One edge between an output port (`source`) and an input port (`target`).
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeInfo {
    pub source: PortId,
    pub target: PortId,
    pub visibility: EdgeVisibility,
    pub shape: Option<EdgeShape>,
    pub compatibility: Compatibility,
    pub label: Option<String>,
}

/// The graph the canvas renders and edits.
pub trait GraphModel {
    fn nodes(&self) -> Vec<NodeInfo>;

    fn node(&self, id: NodeId) -> Option<NodeInfo>;

    fn port(&self, id: PortId) -> Option<PortInfo>;

    /// Ports of one direction, in display order.
    fn ports(&self, node: NodeId, direction: PortDirection) -> Vec<PortInfo>;

    fn edges(&self) -> Vec<EdgeInfo>;

    fn is_visible(&self, node: NodeId, scope: ScopeId) -> bool;

    fn contains_edge(&self, source: PortId, target: PortId) -> bool;

    /// Policy check run before [`GraphModel::connect`]. The error carries a
    /// user-facing reason.
    fn can_connect(&self, source: PortId, target: PortId) -> Result<(), CanvasError> {
        let _ = (source, target);
        Ok(())
    }

    fn connect(&mut self, source: PortId, target: PortId) -> Result<(), CanvasError>;

    fn disconnect(&mut self, source: PortId, target: PortId, cascade: bool)
    -> Result<(), CanvasError>;

    /// Create a new port on `node` shaped like `like`.
    fn add_port(
        &mut self,
        node: NodeId,
        direction: PortDirection,
        like: PortId,
    ) -> Result<PortId, CanvasError>;

    fn set_location(&mut self, node: NodeId, location: GridPoint) -> Result<(), CanvasError>;

    fn set_size(&mut self, node: NodeId, size: GridSize) -> Result<(), CanvasError>;

    fn set_z_order(&mut self, node: NodeId, z_order: i32) -> Result<(), CanvasError>;

    /// A channel of change notifications. Dropping the receiver unsubscribes.
    fn subscribe(&mut self) -> Receiver<GraphNotification>;
}

/// Undo journal. `snapshot` is called before a mutating interaction commits.
pub trait Journal {
    fn snapshot(&mut self, label: &str, description: &str, scope: ScopeId, icon: Option<&str>);

    fn undo(&mut self, scope: ScopeId) -> bool;

    fn redo(&mut self, scope: ScopeId) -> bool;
}

/// A journal that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoJournal;

impl Journal for NoJournal {
    fn snapshot(&mut self, _label: &str, _description: &str, _scope: ScopeId, _icon: Option<&str>) {}

    fn undo(&mut self, _scope: ScopeId) -> bool {
        false
    }

    fn redo(&mut self, _scope: ScopeId) -> bool {
        false
    }
}
