//! Node capacity reconciliation.
//!
//! Keeps the `eks.ebsnodeoperator/attachments` extended resource on each node
//! equal to the number of EBS volumes its instance type can still attach.
//!
//! - **Capacity table**: static instance type -> volume count lookup.
//! - **Resolver**: picks the instance type from an ordered list of labels.
//! - **Drift**: textual comparison of current vs target capacity.
//! - **Patch**: a single JSON Patch `add` on `/status/capacity/<resource>`.
//! - **Engine**: fetch, decide and patch one node per invocation.
//!
//! # Invariants
//!
//! - The capacity table never changes at runtime
//! - Unknown instance types are never patched
//! - Reconciling an already corrected node is a no-op

pub mod backoff;
pub mod drift;
pub mod engine;
pub mod error;
pub mod node;
pub mod patch;
pub mod resolver;
pub mod table;

pub use backoff::NodeBackoff;
pub use drift::{needs_update, CapacityDecision};
pub use engine::{
    ReconcileOutcome, Reconciler, ReconcilerSettings, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_RESOURCE_NAME,
};
pub use error::{ReconcileError, ReconcilePhase};
pub use node::{NodeApi, NodeApiError, NodeSnapshot};
pub use patch::{capacity_path, encode_patch, escape_pointer_segment, PatchOp, PatchOperation};
pub use resolver::{resolve_instance_type, INSTANCE_TYPE_LABELS};
pub use table::CapacityTable;
