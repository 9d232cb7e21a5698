//! EBS node operator.
//!
//! Watches cluster nodes and keeps the `eks.ebsnodeoperator/attachments`
//! extended resource in each node's status capacity equal to the number of
//! EBS volumes its instance type can attach, so pods requesting that resource
//! are never scheduled past the attachment limit.
//!
//! ## Modules
//!
//! - `config`: env-driven configuration
//! - `client`: [`NodeApi`](ebsop_reconcile::NodeApi) over the Kubernetes API
//! - `controller`: kube-runtime controller, requeue and backoff policy

pub mod client;
pub mod config;
pub mod controller;

pub use client::KubeNodeApi;
pub use config::Config;
