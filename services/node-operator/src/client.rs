//! Kubernetes-backed node API.

use async_trait::async_trait;
use ebsop_reconcile::{NodeApi, NodeApiError, NodeSnapshot};
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use tracing::debug;

/// Field manager recorded on status patches.
pub const FIELD_MANAGER: &str = "ebs-node-operator";

/// [`NodeApi`] over the cluster API server.
#[derive(Clone)]
pub struct KubeNodeApi {
    nodes: Api<Node>,
}

impl KubeNodeApi {
    pub fn new(client: Client) -> Self {
        Self {
            nodes: Api::all(client),
        }
    }
}

#[async_trait]
impl NodeApi for KubeNodeApi {
    async fn fetch_node(&self, name: &str) -> Result<Option<NodeSnapshot>, NodeApiError> {
        let node = self.nodes.get_opt(name).await.map_err(map_kube_error)?;
        Ok(node.as_ref().map(snapshot_from_node))
    }

    async fn submit_status_patch(
        &self,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), NodeApiError> {
        let patch: json_patch::Patch = serde_json::from_value(patch.clone())
            .map_err(|e| NodeApiError::InvalidPatch(e.to_string()))?;
        let params = status_patch_params();

        let node = self
            .nodes
            .patch_status(name, &params, &Patch::Json::<()>(patch))
            .await
            .map_err(map_kube_error)?;
        debug!(
            node = %name,
            resource_version = ?node.metadata.resource_version,
            "Status patch accepted"
        );
        Ok(())
    }
}

/// Parameters for capacity status patches.
pub fn status_patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

/// Project a node object onto the fields the engine reads.
pub fn snapshot_from_node(node: &Node) -> NodeSnapshot {
    let capacity = node
        .status
        .as_ref()
        .and_then(|status| status.capacity.as_ref())
        .map(|capacity| {
            capacity
                .iter()
                .map(|(resource, quantity)| (resource.clone(), quantity.0.clone()))
                .collect()
        })
        .unwrap_or_default();

    NodeSnapshot {
        name: node.metadata.name.clone().unwrap_or_default(),
        labels: node.metadata.labels.clone().unwrap_or_default(),
        capacity,
    }
}

/// Classify a client error for the engine.
pub fn map_kube_error(err: kube::Error) -> NodeApiError {
    match err {
        kube::Error::Api(resp) => match resp.code {
            404 => NodeApiError::NotFound(resp.message),
            409 => NodeApiError::Conflict(resp.message),
            422 => NodeApiError::InvalidPatch(resp.message),
            code => NodeApiError::Api {
                code,
                message: resp.message,
            },
        },
        other => NodeApiError::Transport(other.to_string()),
    }
}
