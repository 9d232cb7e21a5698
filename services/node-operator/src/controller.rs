//! Node controller wiring.
//!
//! kube-runtime watches `Node` objects and runs at most one reconcile per node
//! at a time. Each delivery is handed to the [`Reconciler`] by name; failures
//! are requeued with a per-node exponential backoff.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use ebsop_reconcile::{
    CapacityTable, NodeApi, NodeBackoff, ReconcileError, ReconcileOutcome, Reconciler,
};
use futures_util::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::runtime::controller::{self, Action, Controller};
use kube::runtime::watcher;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, error, info, warn};

use crate::client::KubeNodeApi;
use crate::config::Config;

/// Shared state handed to every reconcile.
pub struct Context {
    reconciler: Reconciler,
    backoff: Mutex<NodeBackoff>,
    resync_interval: Option<Duration>,
}

impl Context {
    pub fn new(api: Arc<dyn NodeApi>, table: Arc<CapacityTable>, config: &Config) -> Self {
        Self {
            reconciler: Reconciler::new(api, table, config.reconciler_settings()),
            backoff: Mutex::new(NodeBackoff::new(config.backoff_base, config.backoff_max)),
            resync_interval: config.resync_interval,
        }
    }

    /// Consecutive failures recorded for a node.
    pub fn failures(&self, node: &str) -> u32 {
        self.backoff().failures(node)
    }

    fn backoff(&self) -> std::sync::MutexGuard<'_, NodeBackoff> {
        self.backoff.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reconcile a delivered node.
pub async fn reconcile_node(node: Arc<Node>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let name = node.name_any();
    let outcome = ctx.reconciler.reconcile(&name).await?;
    ctx.backoff().clear(&name);

    Ok(match (outcome, ctx.resync_interval) {
        (ReconcileOutcome::NodeGone, _) | (_, None) => Action::await_change(),
        (_, Some(interval)) => Action::requeue(interval),
    })
}

/// Pick the requeue delay for a failed reconcile.
pub fn error_policy(node: Arc<Node>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    let name = node.name_any();
    let mut backoff = ctx.backoff();
    backoff.prune();

    let delay = if err.is_retryable() {
        let delay = backoff.record_failure(&name);
        warn!(
            node = %name,
            error = %err,
            retry_in_ms = delay.as_millis() as u64,
            "Reconcile failed, requeueing"
        );
        delay
    } else {
        let delay = backoff.max_delay();
        error!(
            node = %name,
            error = %err,
            retry_in_ms = delay.as_millis() as u64,
            "Reconcile hit an internal error"
        );
        delay
    };

    Action::requeue(delay)
}

/// Run the node controller until a shutdown signal arrives.
pub async fn run(client: Client, config: &Config) -> anyhow::Result<()> {
    let nodes: Api<Node> = Api::all(client.clone());
    let mut watcher_config = watcher::Config::default();
    if let Some(selector) = &config.node_label_selector {
        watcher_config = watcher_config.labels(selector);
    }

    let table = Arc::new(CapacityTable::builtin());
    info!(
        instance_types = table.len(),
        resource = %config.resource_name,
        "Capacity table loaded"
    );

    let ctx = Arc::new(Context::new(
        Arc::new(KubeNodeApi::new(client)),
        table,
        config,
    ));

    Controller::new(nodes, watcher_config)
        .shutdown_on_signal()
        .run(reconcile_node, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((node, _)) => debug!(node = %node.name, "Reconciled"),
                // Already reported by error_policy
                Err(controller::Error::ReconcilerFailed(_, _)) => {}
                Err(e) => warn!(error = %e, "Controller error"),
            }
        })
        .await;

    info!("Node controller stopped");
    Ok(())
}
