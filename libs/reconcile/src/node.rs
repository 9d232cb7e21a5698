//! Node view and the cluster API seam.
//!
//! The engine only needs two things from the cluster: read a node by name and
//! submit a status patch for it. [`NodeApi`] captures exactly that, so the
//! kube client lives in the service crate and tests can use an in-memory fake.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

/// Read-only view of a node at reconcile time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSnapshot {
    /// Node name.
    pub name: String,

    /// Node labels.
    pub labels: BTreeMap<String, String>,

    /// `status.capacity`, resource name -> canonical quantity string.
    pub capacity: BTreeMap<String, String>,
}

impl NodeSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Current capacity for a resource, if reported.
    pub fn capacity_of(&self, resource: &str) -> Option<&str> {
        self.capacity.get(resource).map(String::as_str)
    }
}

/// Errors reported by a [`NodeApi`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NodeApiError {
    /// The node does not exist (anymore).
    #[error("node not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency check failed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The API server rejected the request.
    #[error("api error ({code}): {message}")]
    Api { code: u16, message: String },

    /// The request never got a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The patch document could not be turned into a request body.
    #[error("invalid patch: {0}")]
    InvalidPatch(String),
}

/// Cluster access needed by the reconciler.
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Fetch a node by name. `Ok(None)` means the node does not exist.
    async fn fetch_node(&self, name: &str) -> Result<Option<NodeSnapshot>, NodeApiError>;

    /// Apply a JSON Patch document to the node's `status` subresource.
    async fn submit_status_patch(
        &self,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), NodeApiError>;
}
