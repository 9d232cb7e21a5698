//! Reconciliation engine.
//!
//! One invocation walks `Fetching -> Resolving -> Deciding -> Patching` for a
//! single node and ends either with a [`ReconcileOutcome`] or a
//! [`ReconcileError`]. Nothing is kept between invocations; running twice on
//! the same state is a no-op the second time.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument};

use crate::drift::CapacityDecision;
use crate::error::{ReconcileError, ReconcilePhase};
use crate::node::{NodeApi, NodeApiError};
use crate::patch::{encode_patch, PatchOperation};
use crate::resolver::{resolve_instance_type, INSTANCE_TYPE_LABELS};
use crate::table::CapacityTable;

/// Extended resource advertised on nodes by default.
pub const DEFAULT_RESOURCE_NAME: &str = "eks.ebsnodeoperator/attachments";

/// Default deadline for a single API call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Engine settings.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Extended resource to manage, unescaped.
    pub resource_name: String,

    /// Instance type label keys, most preferred first.
    pub label_keys: Vec<String>,

    /// Deadline applied to each fetch and submit.
    pub request_timeout: Duration,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            resource_name: DEFAULT_RESOURCE_NAME.to_string(),
            label_keys: INSTANCE_TYPE_LABELS.iter().map(|k| k.to_string()).collect(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// How a successful reconcile ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The node no longer exists.
    NodeGone,

    /// None of the instance type labels is set.
    NoInstanceType,

    /// The instance type is not in the capacity table.
    UnknownInstanceType { instance_type: String },

    /// Capacity already matches the table.
    InSync {
        instance_type: String,
        capacity: String,
    },

    /// Capacity was corrected.
    Patched {
        instance_type: String,
        previous: Option<String>,
        capacity: String,
    },
}

impl ReconcileOutcome {
    /// True if a patch was submitted.
    pub fn is_patched(&self) -> bool {
        matches!(self, Self::Patched { .. })
    }
}

/// Reconciles node capacity against the capacity table.
pub struct Reconciler {
    api: Arc<dyn NodeApi>,
    table: Arc<CapacityTable>,
    settings: ReconcilerSettings,
}

impl Reconciler {
    pub fn new(
        api: Arc<dyn NodeApi>,
        table: Arc<CapacityTable>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            api,
            table,
            settings,
        }
    }

    /// Reconcile one node by name.
    #[instrument(skip_all, fields(node = %name))]
    pub async fn reconcile(&self, name: &str) -> Result<ReconcileOutcome, ReconcileError> {
        // Fetching
        let fetched = self
            .bounded(ReconcilePhase::Fetching, self.api.fetch_node(name))
            .await?;
        let node = match fetched {
            Ok(Some(node)) => node,
            Ok(None) | Err(NodeApiError::NotFound(_)) => {
                debug!("Node not found, nothing to do");
                return Ok(ReconcileOutcome::NodeGone);
            }
            Err(e) => {
                return Err(ReconcileError::Fetch {
                    node: name.to_string(),
                    message: e.to_string(),
                })
            }
        };

        // Resolving
        let label_keys = self.settings.label_keys.as_slice();
        let Some(instance_type) = resolve_instance_type(&node.labels, label_keys) else {
            debug!("No instance type label, skipping");
            return Ok(ReconcileOutcome::NoInstanceType);
        };

        // Deciding
        let current = node.capacity_of(&self.settings.resource_name);
        let decision = CapacityDecision::evaluate(&self.table, instance_type, current);
        let Some(target) = decision.target_capacity() else {
            debug!(instance_type, "Instance type not in capacity table, skipping");
            return Ok(ReconcileOutcome::UnknownInstanceType {
                instance_type: instance_type.to_string(),
            });
        };
        if !decision.needs_update() {
            debug!(instance_type, capacity = %target, "Capacity already set");
            return Ok(ReconcileOutcome::InSync {
                instance_type: instance_type.to_string(),
                capacity: target.to_string(),
            });
        }

        // Patching
        info!(
            instance_type,
            current = ?decision.current_capacity(),
            target = %target,
            "Node capacity must be set"
        );
        let op = PatchOperation::add_capacity(&self.settings.resource_name, target);
        let patch = encode_patch(&[op]).inspect_err(|e| {
            error!(error = %e, "Failed to encode capacity patch");
        })?;

        let submitted = self
            .bounded(
                ReconcilePhase::Patching,
                self.api.submit_status_patch(name, &patch),
            )
            .await?;
        match submitted {
            Ok(()) => {}
            Err(NodeApiError::NotFound(_)) => {
                debug!("Node deleted before patch, nothing to do");
                return Ok(ReconcileOutcome::NodeGone);
            }
            Err(NodeApiError::Conflict(message)) => {
                return Err(ReconcileError::Conflict {
                    node: name.to_string(),
                    message,
                })
            }
            Err(NodeApiError::InvalidPatch(message)) => {
                error!(error = %message, "Capacity patch rejected as malformed");
                return Err(ReconcileError::Serialization(message));
            }
            Err(e) => {
                return Err(ReconcileError::Submit {
                    node: name.to_string(),
                    message: e.to_string(),
                })
            }
        }

        info!(instance_type, capacity = %target, "Node capacity patched");
        Ok(ReconcileOutcome::Patched {
            instance_type: instance_type.to_string(),
            previous: decision.current_capacity().map(str::to_string),
            capacity: target.to_string(),
        })
    }

    /// Run `fut` under the request deadline.
    async fn bounded<F, T>(&self, phase: ReconcilePhase, fut: F) -> Result<T, ReconcileError>
    where
        F: Future<Output = T>,
    {
        let started = Instant::now();
        tokio::time::timeout(self.settings.request_timeout, fut)
            .await
            .map_err(|_| ReconcileError::Timeout {
                phase,
                elapsed: started.elapsed(),
            })
    }
}
