//! Test fixtures for the node operator.
//!
//! - [`NodeSnapshotBuilder`]: terse node construction.
//! - [`FakeNodeApi`]: in-memory [`NodeApi`] that records patches, applies
//!   `add` operations to its own nodes and can inject failures or delays.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ebsop_reconcile::{NodeApi, NodeApiError, NodeSnapshot, PatchOp, PatchOperation};

/// Preferred instance type label.
pub const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";

/// Legacy instance type label.
pub const LEGACY_INSTANCE_TYPE_LABEL: &str = "beta.kubernetes.io/instance-type";

const CAPACITY_PREFIX: &str = "/status/capacity/";

/// Builder for [`NodeSnapshot`].
#[derive(Debug, Clone)]
pub struct NodeSnapshotBuilder {
    node: NodeSnapshot,
}

impl NodeSnapshotBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            node: NodeSnapshot::new(name),
        }
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.node.labels.insert(key.to_string(), value.to_string());
        self
    }

    /// Set the preferred instance type label.
    pub fn instance_type(self, instance_type: &str) -> Self {
        self.label(INSTANCE_TYPE_LABEL, instance_type)
    }

    /// Set the legacy instance type label.
    pub fn legacy_instance_type(self, instance_type: &str) -> Self {
        self.label(LEGACY_INSTANCE_TYPE_LABEL, instance_type)
    }

    pub fn capacity(mut self, resource: &str, quantity: &str) -> Self {
        self.node
            .capacity
            .insert(resource.to_string(), quantity.to_string());
        self
    }

    pub fn build(self) -> NodeSnapshot {
        self.node
    }
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, NodeSnapshot>,
    patches: Vec<(String, serde_json::Value)>,
    fetch_errors: VecDeque<NodeApiError>,
    submit_errors: VecDeque<NodeApiError>,
    fetches: usize,
}

/// In-memory cluster.
#[derive(Debug, Default)]
pub struct FakeNodeApi {
    state: Mutex<State>,
    delay: Option<Duration>,
    submit_delay: Option<Duration>,
}

impl FakeNodeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fake holding `nodes`.
    pub fn with_nodes(nodes: impl IntoIterator<Item = NodeSnapshot>) -> Self {
        let fake = Self::new();
        for node in nodes {
            fake.insert(node);
        }
        fake
    }

    /// Delay every call by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay only submits by `delay`, on top of any [`Self::with_delay`].
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub fn insert(&self, node: NodeSnapshot) {
        self.lock().nodes.insert(node.name.clone(), node);
    }

    pub fn remove(&self, name: &str) -> Option<NodeSnapshot> {
        self.lock().nodes.remove(name)
    }

    pub fn node(&self, name: &str) -> Option<NodeSnapshot> {
        self.lock().nodes.get(name).cloned()
    }

    /// Fail the next fetch with `err`.
    pub fn fail_next_fetch(&self, err: NodeApiError) {
        self.lock().fetch_errors.push_back(err);
    }

    /// Fail the next submit with `err`.
    pub fn fail_next_submit(&self, err: NodeApiError) {
        self.lock().submit_errors.push_back(err);
    }

    /// Patches accepted so far, in order.
    pub fn patches(&self) -> Vec<(String, serde_json::Value)> {
        self.lock().patches.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl NodeApi for FakeNodeApi {
    async fn fetch_node(&self, name: &str) -> Result<Option<NodeSnapshot>, NodeApiError> {
        self.pause().await;
        let mut state = self.lock();
        state.fetches += 1;
        if let Some(err) = state.fetch_errors.pop_front() {
            return Err(err);
        }
        Ok(state.nodes.get(name).cloned())
    }

    async fn submit_status_patch(
        &self,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), NodeApiError> {
        self.pause().await;
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.lock();
        if let Some(err) = state.submit_errors.pop_front() {
            return Err(err);
        }

        let ops: Vec<PatchOperation> = serde_json::from_value(patch.clone())
            .map_err(|e| NodeApiError::InvalidPatch(e.to_string()))?;
        let node = state
            .nodes
            .get_mut(name)
            .ok_or_else(|| NodeApiError::NotFound(name.to_string()))?;

        for op in &ops {
            let resource = op
                .path
                .strip_prefix(CAPACITY_PREFIX)
                .filter(|segment| !segment.contains('/'))
                .ok_or_else(|| NodeApiError::InvalidPatch(format!("unsupported path {}", op.path)))?;
            match op.op {
                PatchOp::Add => {
                    node.capacity
                        .insert(unescape_pointer_segment(resource), op.value.clone());
                }
            }
        }

        state.patches.push((name.to_string(), patch.clone()));
        Ok(())
    }
}

fn unescape_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use ebsop_reconcile::encode_patch;

    use super::*;

    #[tokio::test]
    async fn test_fake_applies_add_patch() {
        let fake = FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("n1").build()]);
        let patch =
            encode_patch(&[PatchOperation::add_capacity("example.com/slots", "7")]).unwrap();

        fake.submit_status_patch("n1", &patch).await.unwrap();

        let node = fake.node("n1").unwrap();
        assert_eq!(node.capacity_of("example.com/slots"), Some("7"));
        assert_eq!(fake.patches().len(), 1);
    }

    #[tokio::test]
    async fn test_fake_missing_node() {
        let fake = FakeNodeApi::new();
        assert_eq!(fake.fetch_node("n1").await.unwrap(), None);

        let patch = encode_patch(&[PatchOperation::add_capacity("r", "1")]).unwrap();
        let err = fake.submit_status_patch("n1", &patch).await.unwrap_err();
        assert_eq!(err, NodeApiError::NotFound("n1".to_string()));
    }

    #[tokio::test]
    async fn test_fake_injected_errors_are_consumed() {
        let fake = FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("n1").build()]);
        fake.fail_next_fetch(NodeApiError::Transport("reset".to_string()));

        assert!(fake.fetch_node("n1").await.is_err());
        assert!(fake.fetch_node("n1").await.unwrap().is_some());
        assert_eq!(fake.fetch_count(), 2);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape_pointer_segment("a~0b~1c"), "a~b/c");
        assert_eq!(unescape_pointer_segment("~01"), "~1");
    }
}
