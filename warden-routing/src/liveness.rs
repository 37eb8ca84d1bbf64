//! Node liveness gate.
//!
//! Answers whether a node is online according to the liveness tracker. The
//! staleness threshold belongs to the tracker: a node whose heartbeat expired
//! simply has no record.

use std::fmt;
use std::sync::Arc;

use warden_core::{Error, NodeId, Result};
use warden_meta::{LivenessSource, NodeRecord};

/// Converts an optional node record into a typed availability outcome.
///
/// # Errors
/// Returns `NodeOffline` if there is no record.
pub fn check_node_available(node_id: NodeId, record: Option<NodeRecord>) -> Result<NodeRecord> {
    record.ok_or(Error::NodeOffline { node_id })
}

/// Read-only view of node liveness.
#[derive(Clone)]
pub struct LivenessGate {
    source: Arc<dyn LivenessSource>,
}

impl LivenessGate {
    /// Creates a gate over a liveness source.
    #[must_use]
    pub fn new(source: Arc<dyn LivenessSource>) -> Self {
        Self { source }
    }

    /// Returns true if the node is currently online.
    #[must_use]
    pub fn is_available(&self, node_id: NodeId) -> bool {
        self.source.get(node_id).is_some()
    }

    /// Returns the node's record.
    ///
    /// # Errors
    /// Returns `NodeOffline` if the node is not online.
    pub fn check(&self, node_id: NodeId) -> Result<NodeRecord> {
        check_node_available(node_id, self.source.get(node_id))
    }
}

impl fmt::Debug for LivenessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivenessGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use warden_meta::InMemoryNodeManager;

    use super::*;

    #[test]
    fn test_registered_node_is_available() {
        let nodes = InMemoryNodeManager::new();
        nodes.register(NodeId::new(1), "10.0.0.1:21123", 0);
        let gate = LivenessGate::new(Arc::new(nodes));

        assert!(gate.is_available(NodeId::new(1)));
        assert_eq!(gate.check(NodeId::new(1)).unwrap().address, "10.0.0.1:21123");
    }

    #[test]
    fn test_unknown_node_is_offline() {
        let gate = LivenessGate::new(Arc::new(InMemoryNodeManager::new()));

        assert!(!gate.is_available(NodeId::new(7)));
        assert_eq!(
            gate.check(NodeId::new(7)),
            Err(Error::NodeOffline {
                node_id: NodeId::new(7)
            })
        );
    }

    #[test]
    fn test_gate_observes_expiry() {
        let nodes = InMemoryNodeManager::new();
        nodes.register(NodeId::new(1), "10.0.0.1:21123", 0);
        let gate = LivenessGate::new(Arc::new(nodes.clone()));
        assert!(gate.is_available(NodeId::new(1)));

        nodes.expire_stale(10_000_000, 1_000_000);
        assert!(!gate.is_available(NodeId::new(1)));
    }

    #[test]
    fn test_check_node_available() {
        let record = NodeRecord::new(NodeId::new(2), "10.0.0.2:21123", 0);
        assert!(check_node_available(NodeId::new(2), Some(record)).is_ok());
        assert!(matches!(
            check_node_available(NodeId::new(2), None),
            Err(Error::NodeOffline { .. })
        ));
    }
}
