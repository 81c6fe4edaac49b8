//! In-memory [`GraphModel`] and [`Journal`] used by tests, the demo and the CLI.

use crate::model::{EdgeInfo, GraphModel, Journal, NodeInfo, PortInfo};
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use nodecanvas_core::{
    CanvasError, Compatibility, EdgeShape, EdgeVisibility, GraphId, GridPoint, GridSize, NodeId,
    NodeKind, PortDirection, PortId, ScopeId,
};
use nodecanvas_events::GraphNotification;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Port type accepted by every other type.
pub const ANY_TYPE: &str = "any";
const NUMERIC_TYPES: [&str; 3] = ["int", "float", "double"];

fn default_type() -> String {
    ANY_TYPE.to_string()
}

fn default_graph() -> GraphId {
    GraphId(0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortRecord {
    pub id: PortId,
    pub name: String,
    #[serde(default = "default_type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub kind: NodeKind,
    /// Overrides the document graph.
    #[serde(default)]
    pub graph: Option<GraphId>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub inputs_editable: bool,
    #[serde(default)]
    pub outputs_editable: bool,
    #[serde(default)]
    pub location: Option<GridPoint>,
    #[serde(default)]
    pub size: Option<GridSize>,
    #[serde(default)]
    pub z_order: i32,
    /// Only visible in this scope. `None` means visible everywhere.
    #[serde(default)]
    pub scope: Option<ScopeId>,
    #[serde(default)]
    pub inputs: Vec<PortRecord>,
    #[serde(default)]
    pub outputs: Vec<PortRecord>,
}

impl NodeRecord {
    pub fn new(id: NodeId, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            graph: None,
            locked: false,
            inputs_editable: false,
            outputs_editable: false,
            location: None,
            size: None,
            z_order: 0,
            scope: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    fn ports(&self, direction: PortDirection) -> &Vec<PortRecord> {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    fn ports_mut(&mut self, direction: PortDirection) -> &mut Vec<PortRecord> {
        match direction {
            PortDirection::Input => &mut self.inputs,
            PortDirection::Output => &mut self.outputs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: PortId,
    pub target: PortId,
    #[serde(default)]
    pub visibility: EdgeVisibility,
    #[serde(default)]
    pub shape: Option<EdgeShape>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Serialized form of a [`MemoryGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default = "default_graph")]
    pub graph: GraphId,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl Default for GraphDocument {
    fn default() -> Self {
        Self {
            graph: default_graph(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

/// How data converts between two port types.
pub fn compatibility(from: &str, to: &str) -> Compatibility {
    if from == to || from == ANY_TYPE || to == ANY_TYPE {
        Compatibility::Trivial
    } else if NUMERIC_TYPES.contains(&from) && NUMERIC_TYPES.contains(&to) {
        Compatibility::Lossy
    } else {
        Compatibility::Incompatible
    }
}

#[derive(Debug, Default)]
struct GraphState {
    doc: GraphDocument,
    next_id: i64,
    subscribers: Vec<Sender<GraphNotification>>,
}

impl GraphState {
    fn from_document(doc: GraphDocument) -> Self {
        let max_node = doc.nodes.iter().map(|n| n.id.0).max().unwrap_or(0);
        let max_port = doc
            .nodes
            .iter()
            .flat_map(|n| n.inputs.iter().chain(n.outputs.iter()))
            .map(|p| p.id.0)
            .max()
            .unwrap_or(0);
        Self {
            doc,
            next_id: max_node.max(max_port) + 1,
            subscribers: Vec::new(),
        }
    }

    fn allocate(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn notify(&mut self, note: GraphNotification) {
        self.subscribers.retain(|tx| tx.send(note.clone()).is_ok());
    }

    fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.doc.nodes.iter().find(|n| n.id == id)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord, CanvasError> {
        self.doc
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(CanvasError::UnknownNode(id))
    }

    fn port(&self, id: PortId) -> Option<(&NodeRecord, PortDirection, &PortRecord)> {
        self.doc.nodes.iter().find_map(|node| {
            [PortDirection::Input, PortDirection::Output]
                .into_iter()
                .find_map(|direction| {
                    node.ports(direction)
                        .iter()
                        .find(|p| p.id == id)
                        .map(|p| (node, direction, p))
                })
        })
    }

    fn graph_of(&self, node: &NodeRecord) -> GraphId {
        node.graph.unwrap_or(self.doc.graph)
    }

    fn node_info(&self, node: &NodeRecord) -> NodeInfo {
        NodeInfo {
            id: node.id,
            graph: self.graph_of(node),
            name: node.name.clone(),
            kind: node.kind,
            locked: node.locked,
            inputs_editable: node.inputs_editable,
            outputs_editable: node.outputs_editable,
            location: node.location,
            size: node.size,
            z_order: node.z_order,
        }
    }

    fn contains_edge(&self, source: PortId, target: PortId) -> bool {
        self.doc
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target)
    }

    fn edge_compatibility(&self, source: PortId, target: PortId) -> Compatibility {
        match (self.port(source), self.port(target)) {
            (Some((_, _, s)), Some((_, _, t))) => compatibility(&s.type_name, &t.type_name),
            _ => Compatibility::Trivial,
        }
    }

    fn can_connect(&self, source: PortId, target: PortId) -> Result<(), CanvasError> {
        let (source_node, source_dir, source_port) =
            self.port(source).ok_or(CanvasError::UnknownPort(source))?;
        let (target_node, target_dir, target_port) =
            self.port(target).ok_or(CanvasError::UnknownPort(target))?;
        if self.graph_of(source_node) != self.graph_of(target_node) {
            return Err(CanvasError::ForeignGraph {
                from: source,
                to: target,
            });
        }
        if source_dir == target_dir {
            return Err(CanvasError::SameDirection {
                from: source,
                to: target,
                direction: source_dir,
            });
        }
        let reject = |reason: String| CanvasError::Incompatible {
            from: source,
            to: target,
            reason,
        };
        if source_dir != PortDirection::Output {
            return Err(reject("the source must be an output".to_string()));
        }
        if source_node.id == target_node.id {
            return Err(reject("a node cannot be connected to itself".to_string()));
        }
        if self
            .doc
            .edges
            .iter()
            .any(|e| e.target == target && e.source != source)
        {
            return Err(reject(format!("{} is already connected", target_port.name)));
        }
        if compatibility(&source_port.type_name, &target_port.type_name)
            == Compatibility::Incompatible
        {
            return Err(reject(format!(
                "{} cannot be converted to {}",
                source_port.type_name, target_port.type_name
            )));
        }
        Ok(())
    }
}

/// A graph held entirely in memory. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    state: Arc<RwLock<GraphState>>,
}

impl MemoryGraph {
    pub fn new(graph: GraphId) -> Self {
        Self::from_document(GraphDocument {
            graph,
            ..GraphDocument::default()
        })
    }

    pub fn from_document(doc: GraphDocument) -> Self {
        Self {
            state: Arc::new(RwLock::new(GraphState::from_document(doc))),
        }
    }

    pub fn document(&self) -> GraphDocument {
        self.state.read().doc.clone()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: GraphDocument = serde_json::from_str(json).context("parsing graph document")?;
        Ok(Self::from_document(doc))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.state.read().doc)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let graph = Self::from_json(&content)?;
        tracing::info!("Loaded graph from {:?}", path);
        Ok(graph)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("writing {}", path.display()))
    }

    pub fn add_node(&self, name: &str, kind: NodeKind) -> NodeId {
        let mut state = self.state.write();
        let id = NodeId(state.allocate());
        state.doc.nodes.push(NodeRecord::new(id, name, kind));
        state.notify(GraphNotification::GraphChanged);
        id
    }

    pub fn add_input(&self, node: NodeId, name: &str, type_name: &str) -> Result<PortId, CanvasError> {
        self.add_port_record(node, PortDirection::Input, name, type_name)
    }

    pub fn add_output(&self, node: NodeId, name: &str, type_name: &str) -> Result<PortId, CanvasError> {
        self.add_port_record(node, PortDirection::Output, name, type_name)
    }

    fn add_port_record(
        &self,
        node: NodeId,
        direction: PortDirection,
        name: &str,
        type_name: &str,
    ) -> Result<PortId, CanvasError> {
        let mut state = self.state.write();
        let id = PortId(state.allocate());
        state.node_mut(node)?.ports_mut(direction).push(PortRecord {
            id,
            name: name.to_string(),
            type_name: type_name.to_string(),
        });
        state.notify(GraphNotification::GraphChanged);
        Ok(id)
    }

    /// Change a node record in place and notify subscribers.
    pub fn edit_node(
        &self,
        node: NodeId,
        edit: impl FnOnce(&mut NodeRecord),
    ) -> Result<(), CanvasError> {
        let mut state = self.state.write();
        edit(state.node_mut(node)?);
        state.notify(GraphNotification::GraphChanged);
        Ok(())
    }

    pub fn remove_node(&self, node: NodeId) -> Result<(), CanvasError> {
        let mut state = self.state.write();
        let index = state
            .doc
            .nodes
            .iter()
            .position(|n| n.id == node)
            .ok_or(CanvasError::UnknownNode(node))?;
        let removed = state.doc.nodes.remove(index);
        let ports: Vec<PortId> = removed
            .inputs
            .iter()
            .chain(removed.outputs.iter())
            .map(|p| p.id)
            .collect();
        state
            .doc
            .edges
            .retain(|e| !ports.contains(&e.source) && !ports.contains(&e.target));
        state.notify(GraphNotification::GraphChanged);
        Ok(())
    }

    pub fn set_edge_visibility(
        &self,
        source: PortId,
        target: PortId,
        visibility: EdgeVisibility,
    ) -> bool {
        let mut state = self.state.write();
        let Some(edge) = state
            .doc
            .edges
            .iter_mut()
            .find(|e| e.source == source && e.target == target)
        else {
            return false;
        };
        edge.visibility = visibility;
        state.notify(GraphNotification::GraphChanged);
        true
    }

    /// Push a notification to every subscriber.
    pub fn notify(&self, note: GraphNotification) {
        self.state.write().notify(note);
    }

    /// A journal that snapshots and restores this graph.
    pub fn journal(&self) -> MemoryJournal {
        MemoryJournal {
            state: Arc::clone(&self.state),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }
}

impl GraphModel for MemoryGraph {
    fn nodes(&self) -> Vec<NodeInfo> {
        let state = self.state.read();
        state.doc.nodes.iter().map(|n| state.node_info(n)).collect()
    }

    fn node(&self, id: NodeId) -> Option<NodeInfo> {
        let state = self.state.read();
        state.node(id).map(|n| state.node_info(n))
    }

    fn port(&self, id: PortId) -> Option<PortInfo> {
        let state = self.state.read();
        state.port(id).map(|(node, direction, port)| PortInfo {
            id: port.id,
            node: node.id,
            direction,
            name: port.name.clone(),
        })
    }

    fn ports(&self, node: NodeId, direction: PortDirection) -> Vec<PortInfo> {
        let state = self.state.read();
        let Some(record) = state.node(node) else {
            return Vec::new();
        };
        record
            .ports(direction)
            .iter()
            .map(|p| PortInfo {
                id: p.id,
                node,
                direction,
                name: p.name.clone(),
            })
            .collect()
    }

    fn edges(&self) -> Vec<EdgeInfo> {
        let state = self.state.read();
        state
            .doc
            .edges
            .iter()
            .map(|e| EdgeInfo {
                source: e.source,
                target: e.target,
                visibility: e.visibility,
                shape: e.shape,
                compatibility: state.edge_compatibility(e.source, e.target),
                label: e.label.clone(),
            })
            .collect()
    }

    fn is_visible(&self, node: NodeId, scope: ScopeId) -> bool {
        self.state
            .read()
            .node(node)
            .is_some_and(|n| n.scope.is_none_or(|s| s == scope))
    }

    fn contains_edge(&self, source: PortId, target: PortId) -> bool {
        self.state.read().contains_edge(source, target)
    }

    fn can_connect(&self, source: PortId, target: PortId) -> Result<(), CanvasError> {
        self.state.read().can_connect(source, target)
    }

    fn connect(&mut self, source: PortId, target: PortId) -> Result<(), CanvasError> {
        let mut state = self.state.write();
        state.can_connect(source, target)?;
        if state.contains_edge(source, target) {
            return Ok(());
        }
        state.doc.edges.push(EdgeRecord {
            source,
            target,
            visibility: EdgeVisibility::default(),
            shape: None,
            label: None,
        });
        state.notify(GraphNotification::GraphChanged);
        state.notify(GraphNotification::NodeConnected { source, target });
        Ok(())
    }

    fn disconnect(
        &mut self,
        source: PortId,
        target: PortId,
        cascade: bool,
    ) -> Result<(), CanvasError> {
        let mut state = self.state.write();
        if state.port(source).is_none() {
            return Err(CanvasError::UnknownPort(source));
        }
        if state.port(target).is_none() {
            return Err(CanvasError::UnknownPort(target));
        }
        let before = state.doc.edges.len();
        state
            .doc
            .edges
            .retain(|e| !(e.source == source && e.target == target));
        if state.doc.edges.len() == before {
            tracing::debug!("No edge between {} and {} to disconnect", source, target);
            return Ok(());
        }
        if cascade {
            state.notify(GraphNotification::GraphChanged);
        }
        Ok(())
    }

    fn add_port(
        &mut self,
        node: NodeId,
        direction: PortDirection,
        like: PortId,
    ) -> Result<PortId, CanvasError> {
        let mut state = self.state.write();
        let (base, type_name) = state
            .port(like)
            .map(|(_, _, p)| (p.name.clone(), p.type_name.clone()))
            .ok_or(CanvasError::UnknownPort(like))?;
        let record = state.node(node).ok_or(CanvasError::UnknownNode(node))?;
        let editable = match direction {
            PortDirection::Input => record.inputs_editable,
            PortDirection::Output => record.outputs_editable,
        };
        if !editable {
            return Err(CanvasError::PortsNotEditable { node, direction });
        }
        let taken: Vec<String> = record.ports(direction).iter().map(|p| p.name.clone()).collect();
        let mut name = base.clone();
        let mut counter = 2;
        while taken.contains(&name) {
            name = format!("{base} {counter}");
            counter += 1;
        }
        let id = PortId(state.allocate());
        state.node_mut(node)?.ports_mut(direction).push(PortRecord {
            id,
            name,
            type_name,
        });
        state.notify(GraphNotification::GraphChanged);
        Ok(id)
    }

    fn set_location(&mut self, node: NodeId, location: GridPoint) -> Result<(), CanvasError> {
        self.state.write().node_mut(node)?.location = Some(location);
        Ok(())
    }

    fn set_size(&mut self, node: NodeId, size: GridSize) -> Result<(), CanvasError> {
        self.state.write().node_mut(node)?.size = Some(size);
        Ok(())
    }

    fn set_z_order(&mut self, node: NodeId, z_order: i32) -> Result<(), CanvasError> {
        self.state.write().node_mut(node)?.z_order = z_order;
        Ok(())
    }

    fn subscribe(&mut self) -> Receiver<GraphNotification> {
        let (tx, rx) = unbounded();
        self.state.write().subscribers.push(tx);
        rx
    }
}

#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub label: String,
    pub description: String,
    pub scope: ScopeId,
    pub icon: Option<String>,
    document: GraphDocument,
}

/// Undo journal over a [`MemoryGraph`], restoring whole-document snapshots.
#[derive(Debug)]
pub struct MemoryJournal {
    state: Arc<RwLock<GraphState>>,
    undo_stack: Vec<JournalEntry>,
    redo_stack: Vec<JournalEntry>,
}

impl MemoryJournal {
    /// Labels of the undoable snapshots, oldest first.
    pub fn labels(&self) -> Vec<String> {
        self.undo_stack.iter().map(|e| e.label.clone()).collect()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.undo_stack
    }

    fn swap(
        &mut self,
        scope: ScopeId,
        from_redo: bool,
    ) -> bool {
        let (source, target) = if from_redo {
            (&mut self.redo_stack, &mut self.undo_stack)
        } else {
            (&mut self.undo_stack, &mut self.redo_stack)
        };
        let Some(index) = source.iter().rposition(|e| e.scope == scope) else {
            return false;
        };
        let entry = source.remove(index);
        let mut state = self.state.write();
        let current = std::mem::replace(&mut state.doc, entry.document.clone());
        target.push(JournalEntry {
            document: current,
            ..entry
        });
        state.notify(GraphNotification::GraphChanged);
        true
    }
}

impl Journal for MemoryJournal {
    fn snapshot(&mut self, label: &str, description: &str, scope: ScopeId, icon: Option<&str>) {
        tracing::debug!("Journal snapshot: {}", label);
        let document = self.state.read().doc.clone();
        self.undo_stack.push(JournalEntry {
            label: label.to_string(),
            description: description.to_string(),
            scope,
            icon: icon.map(str::to_string),
            document,
        });
        self.redo_stack.clear();
    }

    fn undo(&mut self, scope: ScopeId) -> bool {
        self.swap(scope, false)
    }

    fn redo(&mut self, scope: ScopeId) -> bool {
        self.swap(scope, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_nodes() -> (MemoryGraph, PortId, PortId) {
        let graph = MemoryGraph::new(GraphId(1));
        let a = graph.add_node("A", NodeKind::Regular);
        let b = graph.add_node("B", NodeKind::Regular);
        let out = graph.add_output(a, "Output", "image").unwrap();
        let input = graph.add_input(b, "Input", "image").unwrap();
        (graph, out, input)
    }

    #[test]
    fn test_compatibility_rules() {
        assert_eq!(compatibility("image", "image"), Compatibility::Trivial);
        assert_eq!(compatibility("image", ANY_TYPE), Compatibility::Trivial);
        assert_eq!(compatibility("int", "float"), Compatibility::Lossy);
        assert_eq!(compatibility("table", "image"), Compatibility::Incompatible);
    }

    #[test]
    fn test_connect_and_disconnect() {
        let (mut graph, out, input) = two_nodes();
        graph.connect(out, input).unwrap();
        assert!(graph.contains_edge(out, input));
        assert_eq!(graph.edges().len(), 1);
        graph.disconnect(out, input, true).unwrap();
        assert!(!graph.contains_edge(out, input));
    }

    #[test]
    fn test_connect_rejects_incompatible_types() {
        let graph = MemoryGraph::new(GraphId(1));
        let a = graph.add_node("A", NodeKind::Regular);
        let b = graph.add_node("B", NodeKind::Regular);
        let out = graph.add_output(a, "Table", "table").unwrap();
        let input = graph.add_input(b, "Image", "image").unwrap();
        let err = graph.can_connect(out, input).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Cannot connect {out} to {input}: table cannot be converted to image")
        );
    }

    #[test]
    fn test_connect_rejects_same_direction_and_foreign_graph() {
        let (graph, out, _) = two_nodes();
        let c = graph.add_node("C", NodeKind::Regular);
        let other_out = graph.add_output(c, "Output", "image").unwrap();
        assert!(matches!(
            graph.can_connect(out, other_out),
            Err(CanvasError::SameDirection { .. })
        ));

        let d = graph.add_node("D", NodeKind::Regular);
        let foreign_in = graph.add_input(d, "Input", "image").unwrap();
        graph.edit_node(d, |n| n.graph = Some(GraphId(99))).unwrap();
        assert!(matches!(
            graph.can_connect(out, foreign_in),
            Err(CanvasError::ForeignGraph { .. })
        ));
    }

    #[test]
    fn test_input_accepts_single_source() {
        let (mut graph, out, input) = two_nodes();
        let c = graph.add_node("C", NodeKind::Regular);
        let other_out = graph.add_output(c, "Output", "image").unwrap();
        graph.connect(out, input).unwrap();
        assert!(graph.connect(other_out, input).is_err());
    }

    #[test]
    fn test_add_port_requires_editable_and_names_uniquely() {
        let (mut graph, out, input) = two_nodes();
        let b = graph.port(input).unwrap().node;
        assert!(matches!(
            graph.add_port(b, PortDirection::Input, out),
            Err(CanvasError::PortsNotEditable { .. })
        ));
        graph.edit_node(b, |n| n.inputs_editable = true).unwrap();
        // `out` is named "Output"; the second copy gets a suffix.
        let first = graph.add_port(b, PortDirection::Input, out).unwrap();
        let second = graph.add_port(b, PortDirection::Input, out).unwrap();
        assert_eq!(graph.port(first).unwrap().name, "Output");
        assert_eq!(graph.port(second).unwrap().name, "Output 2");
        assert_eq!(graph.ports(b, PortDirection::Input).len(), 3);
    }

    #[test]
    fn test_subscribers_receive_notifications() {
        let (mut graph, out, input) = two_nodes();
        let rx = graph.subscribe();
        graph.connect(out, input).unwrap();
        let notes: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            notes,
            vec![
                GraphNotification::GraphChanged,
                GraphNotification::NodeConnected {
                    source: out,
                    target: input
                }
            ]
        );
        drop(rx);
        graph.notify(GraphNotification::LayoutFinished);
        assert!(graph.state.read().subscribers.is_empty());
    }

    #[test]
    fn test_remove_node_drops_its_edges() {
        let (mut graph, out, input) = two_nodes();
        graph.connect(out, input).unwrap();
        let a = graph.port(out).unwrap().node;
        graph.remove_node(a).unwrap();
        assert!(graph.edges().is_empty());
        assert!(graph.node(a).is_none());
    }

    #[test]
    fn test_scope_visibility() {
        let graph = MemoryGraph::new(GraphId(1));
        let a = graph.add_node("A", NodeKind::Regular);
        let scope = ScopeId::new();
        assert!(graph.is_visible(a, scope));
        graph.edit_node(a, |n| n.scope = Some(ScopeId::new())).unwrap();
        assert!(!graph.is_visible(a, scope));
    }

    #[test]
    fn test_journal_undo_redo() {
        let (mut graph, out, input) = two_nodes();
        let mut journal = graph.journal();
        let scope = ScopeId::new();
        journal.snapshot("Connect", "", scope, None);
        graph.connect(out, input).unwrap();
        assert_eq!(journal.labels(), vec!["Connect".to_string()]);

        assert!(journal.undo(scope));
        assert!(!graph.contains_edge(out, input));
        assert!(journal.redo(scope));
        assert!(graph.contains_edge(out, input));
        assert!(!journal.redo(scope));
        assert!(!journal.undo(ScopeId::new()));
    }

    #[test]
    fn test_document_json_round_trip() {
        let (mut graph, out, input) = two_nodes();
        graph.connect(out, input).unwrap();
        let json = graph.to_json().unwrap();
        let loaded = MemoryGraph::from_json(&json).unwrap();
        assert_eq!(loaded.document(), graph.document());
        // Fresh ids continue after the largest stored id.
        let c = loaded.add_node("C", NodeKind::Comment);
        assert!(c.0 > input.0);
    }

    #[test]
    fn test_minimal_document_uses_defaults() {
        let graph = MemoryGraph::from_json(
            r#"{ "nodes": [ { "id": 1, "name": "A", "outputs": [ { "id": 2, "name": "Out" } ] } ] }"#,
        )
        .unwrap();
        let node = graph.node(NodeId(1)).unwrap();
        assert_eq!(node.kind, NodeKind::Regular);
        assert_eq!(node.graph, GraphId(0));
        assert_eq!(graph.ports(NodeId(1), PortDirection::Output).len(), 1);
    }
}
