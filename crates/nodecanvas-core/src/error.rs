use crate::{NodeId, PortDirection, PortId};
use thiserror::Error;

/// Errors reported by the canvas and its graph model.
///
/// Most of these are policy rejections: the interaction that caused them is
/// dropped and the graph stays untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CanvasError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("Unknown port: {0}")]
    UnknownPort(PortId),
    #[error("Ports {from} and {to} belong to different graphs")]
    ForeignGraph { from: PortId, to: PortId },
    #[error("Ports {from} and {to} are both {direction}s")]
    SameDirection {
        from: PortId,
        to: PortId,
        direction: PortDirection,
    },
    #[error("Cannot connect {from} to {to}: {reason}")]
    Incompatible {
        from: PortId,
        to: PortId,
        reason: String,
    },
    #[error("Node {node} does not accept new {direction} ports")]
    PortsNotEditable {
        node: NodeId,
        direction: PortDirection,
    },
    #[error("Node {0} is locked")]
    Locked(NodeId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CanvasError::Incompatible {
            from: PortId(1),
            to: PortId(2),
            reason: "Table cannot be converted to Image".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot connect 1 to 2: Table cannot be converted to Image"
        );

        let err = CanvasError::SameDirection {
            from: PortId(3),
            to: PortId(4),
            direction: PortDirection::Input,
        };
        assert_eq!(err.to_string(), "Ports 3 and 4 are both inputs");
    }
}
