//! Error types for Rivulet graphs

use thiserror::Error;

use crate::NodeId;

/// Error type returned by user transformations
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core Rivulet errors
#[derive(Error, Debug)]
pub enum RivuletError {
    // Transformation errors
    #[error("Transform failed on node {node}: {source}")]
    Transform {
        node: NodeId,
        #[source]
        source: BoxError,
    },

    // Topology errors
    #[error("Linking node {from} to node {to} would create a cycle")]
    CycleDetected { from: NodeId, to: NodeId },

    #[error("Node {0} cannot be linked to itself")]
    SelfLink(NodeId),

    #[error("Cannot build a sequence from zero nodes")]
    EmptySequence,

    #[error("Node {0} is not a managed node")]
    NotManaged(NodeId),

    // Scheduling errors
    #[error("No tokio runtime available to schedule poll loops")]
    NoRuntime,

    // Setup errors
    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Result type for Rivulet operations
pub type RivuletResult<T> = Result<T, RivuletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_error_keeps_source() {
        let err = RivuletError::Transform {
            node: NodeId::new(7),
            source: "boom".into(),
        };
        assert_eq!(err.to_string(), "Transform failed on node 7: boom");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_cycle_message() {
        let err = RivuletError::CycleDetected {
            from: NodeId::new(3),
            to: NodeId::new(1),
        };
        assert_eq!(
            err.to_string(),
            "Linking node 3 to node 1 would create a cycle"
        );
    }
}
