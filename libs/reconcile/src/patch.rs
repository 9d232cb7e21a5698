//! JSON Patch construction for node status capacity.

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// JSON Patch operation kinds used by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Add or replace a member.
    Add,
}

/// A single JSON Patch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    pub value: String,
}

impl PatchOperation {
    /// Set `status.capacity[resource]` to `value`.
    pub fn add_capacity(resource: &str, value: &str) -> Self {
        Self {
            op: PatchOp::Add,
            path: capacity_path(resource),
            value: value.to_string(),
        }
    }
}

/// Escape one JSON Pointer reference token (RFC 6901).
pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Pointer to a resource under the node's status capacity.
pub fn capacity_path(resource: &str) -> String {
    format!("/status/capacity/{}", escape_pointer_segment(resource))
}

/// Encode operations into the JSON Patch wire document.
pub fn encode_patch(ops: &[PatchOperation]) -> Result<serde_json::Value, ReconcileError> {
    Ok(serde_json::to_value(ops)?)
}
