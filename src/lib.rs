//! HTTP façade over a Kubernetes control plane.
//!
//! Exposes scale, create, read, list and delete for Deployments plus pod
//! listing, all scoped by namespace.

pub mod cli;
pub mod cluster;
pub mod config;
pub mod facade;
pub mod server;
