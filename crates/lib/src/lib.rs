//! tgsync-lib: Core types and logic for tgsync
//!
//! This crate reconciles a single load balancer target group toward a
//! declared configuration:
//! - `DesiredState`: the normalized configuration for one invocation
//! - `OperationEnvelope`: pending operations and state carried across retries
//! - `ControlPlane`: the remote API boundary, with a local file-backed implementation
//! - `reconcile`: the controller and execution loop tying them together

pub mod attributes;
pub mod client;
pub mod config;
pub mod consts;
pub mod desired;
pub mod diff;
pub mod envelope;
pub mod paths;
pub mod reconcile;
