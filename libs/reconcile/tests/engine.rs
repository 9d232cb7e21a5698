//! Engine tests against the in-memory node API.
//!
//! These cover the whole invocation: fetch, resolve, decide, patch, and the
//! way API failures surface to the caller.

use std::sync::Arc;
use std::time::Duration;

use ebsop_reconcile::{
    CapacityTable, NodeApiError, ReconcileError, ReconcileOutcome, ReconcilePhase, Reconciler,
    ReconcilerSettings, DEFAULT_RESOURCE_NAME,
};
use ebsop_testing::{FakeNodeApi, NodeSnapshotBuilder};
use serde_json::json;

fn reconciler(api: &Arc<FakeNodeApi>) -> Reconciler {
    Reconciler::new(
        api.clone(),
        Arc::new(CapacityTable::builtin()),
        ReconcilerSettings::default(),
    )
}

#[tokio::test]
async fn test_c5_large_without_capacity_is_patched() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .instance_type("c5.large")
        .build()]));

    let outcome = reconciler(&api).reconcile("node-a").await.unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Patched {
            instance_type: "c5.large".to_string(),
            previous: None,
            capacity: "24".to_string(),
        }
    );
    assert_eq!(
        api.patches(),
        vec![(
            "node-a".to_string(),
            json!([{
                "op": "add",
                "path": "/status/capacity/eks.ebsnodeoperator~1attachments",
                "value": "24"
            }])
        )]
    );
}

#[tokio::test]
async fn test_i3_16xlarge_in_sync() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .instance_type("i3.16xlarge")
        .capacity(DEFAULT_RESOURCE_NAME, "16")
        .build()]));

    let outcome = reconciler(&api).reconcile("node-a").await.unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::InSync {
            instance_type: "i3.16xlarge".to_string(),
            capacity: "16".to_string(),
        }
    );
    assert!(api.patches().is_empty());
}

#[tokio::test]
async fn test_wrong_capacity_is_corrected() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .instance_type("m5d.large")
        .capacity(DEFAULT_RESOURCE_NAME, "25")
        .build()]));

    let outcome = reconciler(&api).reconcile("node-a").await.unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::Patched {
            instance_type: "m5d.large".to_string(),
            previous: Some("25".to_string()),
            capacity: "23".to_string(),
        }
    );
}

#[tokio::test]
async fn test_second_run_is_noop() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .instance_type("r5.large")
        .capacity("cpu", "2")
        .build()]));
    let reconciler = reconciler(&api);

    assert!(reconciler.reconcile("node-a").await.unwrap().is_patched());
    let second = reconciler.reconcile("node-a").await.unwrap();

    assert!(matches!(second, ReconcileOutcome::InSync { .. }));
    assert_eq!(api.patches().len(), 1);
    let node = api.node("node-a").unwrap();
    assert_eq!(node.capacity_of(DEFAULT_RESOURCE_NAME), Some("24"));
    assert_eq!(node.capacity_of("cpu"), Some("2"));
}

#[tokio::test]
async fn test_no_instance_type_label() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .label("kubernetes.io/os", "linux")
        .build()]));

    let outcome = reconciler(&api).reconcile("node-a").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::NoInstanceType);
    assert!(api.patches().is_empty());
}

#[tokio::test]
async fn test_unknown_instance_type_is_left_alone() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .instance_type("x99.enormous")
        .capacity(DEFAULT_RESOURCE_NAME, "3")
        .build()]));

    let outcome = reconciler(&api).reconcile("node-a").await.unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::UnknownInstanceType {
            instance_type: "x99.enormous".to_string()
        }
    );
    assert!(api.patches().is_empty());
}

#[tokio::test]
async fn test_legacy_label_only() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .legacy_instance_type("t3.nano")
        .build()]));

    let outcome = reconciler(&api).reconcile("node-a").await.unwrap();

    assert!(matches!(
        outcome,
        ReconcileOutcome::Patched { ref capacity, .. } if capacity == "25"
    ));
}

#[tokio::test]
async fn test_preferred_label_wins_over_legacy() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .instance_type("i3.16xlarge")
        .legacy_instance_type("t3.nano")
        .build()]));

    let outcome = reconciler(&api).reconcile("node-a").await.unwrap();

    assert!(matches!(
        outcome,
        ReconcileOutcome::Patched { ref instance_type, ref capacity, .. }
            if instance_type == "i3.16xlarge" && capacity == "16"
    ));
}

#[tokio::test]
async fn test_missing_node_is_done() {
    let api = Arc::new(FakeNodeApi::new());

    let outcome = reconciler(&api).reconcile("node-gone").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::NodeGone);
    assert_eq!(api.fetch_count(), 1);
    assert!(api.patches().is_empty());
}

#[tokio::test]
async fn test_not_found_on_submit_is_done() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .instance_type("c5.large")
        .build()]));
    api.fail_next_submit(NodeApiError::NotFound("node-a".to_string()));

    let outcome = reconciler(&api).reconcile("node-a").await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::NodeGone);
}

#[tokio::test]
async fn test_fetch_failure_surfaces() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .instance_type("c5.large")
        .build()]));
    api.fail_next_fetch(NodeApiError::Transport("connection reset".to_string()));

    let err = reconciler(&api).reconcile("node-a").await.unwrap_err();

    assert!(matches!(err, ReconcileError::Fetch { ref node, .. } if node == "node-a"));
    assert!(err.is_retryable());
    assert!(api.patches().is_empty());
}

#[tokio::test]
async fn test_conflict_surfaces_and_retry_converges() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .instance_type("c5.large")
        .build()]));
    api.fail_next_submit(NodeApiError::Conflict("object has been modified".to_string()));
    let reconciler = reconciler(&api);

    let err = reconciler.reconcile("node-a").await.unwrap_err();
    assert!(matches!(err, ReconcileError::Conflict { .. }));
    assert!(err.is_retryable());

    assert!(reconciler.reconcile("node-a").await.unwrap().is_patched());
    assert!(matches!(
        reconciler.reconcile("node-a").await.unwrap(),
        ReconcileOutcome::InSync { .. }
    ));
}

#[tokio::test]
async fn test_api_error_on_submit() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .instance_type("c5.large")
        .build()]));
    api.fail_next_submit(NodeApiError::Api {
        code: 500,
        message: "etcdserver: request timed out".to_string(),
    });

    let err = reconciler(&api).reconcile("node-a").await.unwrap_err();

    assert!(matches!(err, ReconcileError::Submit { .. }));
}

#[tokio::test]
async fn test_invalid_patch_is_not_retryable() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .instance_type("c5.large")
        .build()]));
    api.fail_next_submit(NodeApiError::InvalidPatch("bad pointer".to_string()));

    let err = reconciler(&api).reconcile("node-a").await.unwrap_err();

    assert!(matches!(err, ReconcileError::Serialization(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_slow_fetch_times_out() {
    let api = Arc::new(
        FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
            .instance_type("c5.large")
            .build()])
        .with_delay(Duration::from_millis(500)),
    );
    let reconciler = Reconciler::new(
        api.clone(),
        Arc::new(CapacityTable::builtin()),
        ReconcilerSettings {
            request_timeout: Duration::from_millis(20),
            ..Default::default()
        },
    );

    let err = reconciler.reconcile("node-a").await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Timeout {
            phase: ReconcilePhase::Fetching,
            ..
        }
    ));
    assert!(api.patches().is_empty());
}

#[tokio::test]
async fn test_slow_submit_times_out() {
    let api = Arc::new(
        FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
            .instance_type("c5.large")
            .build()])
        .with_submit_delay(Duration::from_millis(500)),
    );
    let reconciler = Reconciler::new(
        api.clone(),
        Arc::new(CapacityTable::builtin()),
        ReconcilerSettings {
            request_timeout: Duration::from_millis(50),
            ..Default::default()
        },
    );

    let err = reconciler.reconcile("node-a").await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Timeout {
            phase: ReconcilePhase::Patching,
            ..
        }
    ));
    assert!(err.is_retryable());
    assert!(api.patches().is_empty());
    assert_eq!(
        api.node("node-a").unwrap().capacity_of(DEFAULT_RESOURCE_NAME),
        None
    );
}

#[tokio::test]
async fn test_custom_resource_and_table() {
    let api = Arc::new(FakeNodeApi::with_nodes([NodeSnapshotBuilder::new("node-a")
        .label("example.com/machine", "tiny")
        .build()]));
    let reconciler = Reconciler::new(
        api.clone(),
        Arc::new(CapacityTable::from_entries([("tiny", "2")])),
        ReconcilerSettings {
            resource_name: "example.com/disks".to_string(),
            label_keys: vec!["example.com/machine".to_string()],
            ..Default::default()
        },
    );

    assert!(reconciler.reconcile("node-a").await.unwrap().is_patched());
    assert_eq!(
        api.patches()[0].1,
        json!([{"op": "add", "path": "/status/capacity/example.com~1disks", "value": "2"}])
    );
}

#[tokio::test]
async fn test_concurrent_nodes() {
    let api = Arc::new(FakeNodeApi::with_nodes((0..16).map(|i| {
        NodeSnapshotBuilder::new(&format!("node-{i}"))
            .instance_type(if i % 2 == 0 { "c5.large" } else { "i3.8xlarge" })
            .build()
    })));
    let reconciler = Arc::new(reconciler(&api));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let reconciler = Arc::clone(&reconciler);
            tokio::spawn(async move { reconciler.reconcile(&format!("node-{i}")).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_patched());
    }

    assert_eq!(api.patches().len(), 16);
    assert_eq!(
        api.node("node-3").unwrap().capacity_of(DEFAULT_RESOURCE_NAME),
        Some("19")
    );
}
