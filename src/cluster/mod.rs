//! # Cluster access
//!
//! The façade never talks to the Kubernetes API directly. It goes through the
//! [`ClusterClient`] trait, which exposes exactly the namespaced operations the
//! lifecycle endpoints need:
//!
//! - Deployments: get, list, create, delete
//! - Deployment scale subresource: replace
//! - Pods: list
//!
//! Two implementations ship with the crate:
//!
//! - [`KubeClusterClient`]: backed by a `kube::Client` (production)
//! - [`InMemoryClusterClient`]: an in-process store answering with the same
//!   status codes the API server uses (sandbox mode and tests)

pub mod kube_client;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v1::Scale;
use k8s_openapi::api::core::v1::Pod;
use serde::Serialize;
use thiserror::Error;

pub use kube_client::KubeClusterClient;
pub use memory::InMemoryClusterClient;

/// A failure reported by the control plane itself.
///
/// Carries the API server's status code and message, plus the raw `Status`
/// body when one was returned.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct ClusterFailure {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ClusterFailure {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            body: None,
        }
    }

    /// Build a failure the way the API server reports it: a message plus a
    /// `Status` object as the response body.
    pub fn status(code: u16, reason: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let body = serde_json::json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": message,
            "reason": reason,
            "code": code,
        });
        Self {
            code,
            message,
            body: Some(body.to_string()),
        }
    }

    pub fn not_found(resource: &str, name: &str) -> Self {
        Self::status(404, "NotFound", format!("{} \"{}\" not found", resource, name))
    }

    pub fn already_exists(resource: &str, name: &str) -> Self {
        Self::status(
            409,
            "AlreadyExists",
            format!("{} \"{}\" already exists", resource, name),
        )
    }
}

/// Errors returned by a [`ClusterClient`]
#[derive(Error, Debug, Clone)]
pub enum ClusterError {
    /// The API server answered with a failure status
    #[error(transparent)]
    Api(#[from] ClusterFailure),

    /// The request never produced an API answer (connection, TLS, encoding)
    #[error("Cluster client error: {0}")]
    Client(String),
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => {
                let body = serde_json::to_string(&response).ok();
                ClusterError::Api(ClusterFailure {
                    code: response.code,
                    message: response.message,
                    body,
                })
            }
            other => ClusterError::Client(other.to_string()),
        }
    }
}

/// Namespaced operations against the control plane.
///
/// Implementations must be safe to share across concurrently handled requests.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClusterError>;

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, ClusterError>;

    async fn get_deployment(&self, namespace: &str, name: &str)
        -> Result<Deployment, ClusterError>;

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, ClusterError>;

    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;

    /// Replace the `scale` subresource of a deployment
    async fn replace_scale(
        &self,
        namespace: &str,
        name: &str,
        scale: &Scale,
    ) -> Result<Scale, ClusterError>;
}

/// Cluster client handle shared by all request handlers
pub type SharedClusterClient = Arc<dyn ClusterClient>;

// ============================================================================
// Mock implementation for testing
// ============================================================================
