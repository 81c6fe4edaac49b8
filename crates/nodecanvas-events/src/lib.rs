use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use nodecanvas_core::{NodeId, PortId, Vec2};
use serde::{Deserialize, Serialize};

/// What an observer is asked to do with a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeUiAction {
    /// Open the context menu for the current selection at a canvas position.
    OpenContextMenu { position: Vec2 },
    /// Activate the node's default action (double click).
    DefaultAction,
}

/// Events published by the canvas to its observers.
///
/// Delivery is ordered: a `SelectionChanged` caused by an interaction is always
/// queued before the `CanvasUpdated` that follows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CanvasEvent {
    SelectionChanged {
        selection: Vec<NodeId>,
    },
    CanvasUpdated,
    ZoomChanged {
        zoom: f32,
    },
    NodeUiActionRequested {
        node: Option<NodeId>,
        action: NodeUiAction,
    },
}

/// Change notifications sent by the external graph model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphNotification {
    /// Nodes, ports or edges were added, removed or changed.
    GraphChanged,
    /// A new edge between two ports was created.
    NodeConnected { source: PortId, target: PortId },
    /// A long-running layout finished and node locations should be re-read.
    LayoutFinished,
}

#[derive(Debug, Clone)]
pub struct EventBus<E> {
    tx: Sender<E>,
    rx: Receiver<E>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<E> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<E> {
        self.rx.clone()
    }

    pub fn publish(&self, event: E) {
        if self.tx.send(event).is_err() {
            tracing::warn!("Event bus has no receivers left");
        }
    }

    /// Take every event queued so far.
    pub fn drain(&self) -> Vec<E> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    /// Dispatch all pending events to a listener.
    /// This is useful for processing events in the UI loop.
    pub fn dispatch_to<L: EventListener<E>>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

/// Trait for components that respond to events.
/// Implement this to receive events from an [`EventBus`].
pub trait EventListener<E> {
    fn handle_event(&mut self, event: &E);
}
