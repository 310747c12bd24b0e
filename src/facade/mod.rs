//! Deployment lifecycle façade
//!
//! Turns a lifecycle intent (scale, create, read, list, delete) into a single
//! validated cluster call and hands back either the cluster's answer or its
//! failure, unchanged. The façade keeps no state of its own.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentStrategy};
use k8s_openapi::api::autoscaling::v1::{Scale, ScaleSpec};
use k8s_openapi::api::core::v1::{Pod, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::cluster::{ClusterError, ClusterFailure, SharedClusterClient};

/// Strategy type injected when a deployment is submitted without one
pub const DEFAULT_STRATEGY_TYPE: &str = "RollingUpdate";

/// Errors surfaced by the façade
#[derive(Error, Debug)]
pub enum FacadeError {
    /// Client input rejected before any cluster call was made
    #[error("{0}")]
    Validation(String),

    /// The cluster rejected the operation. `name` is the submitted resource
    /// name when the operation carried a payload.
    #[error("{failure}")]
    Cluster {
        name: Option<String>,
        #[source]
        failure: ClusterFailure,
    },

    /// Anything that is not a cluster answer
    #[error("{0}")]
    Unclassified(String),
}

impl FacadeError {
    pub fn cluster_failure(&self) -> Option<&ClusterFailure> {
        match self {
            FacadeError::Cluster { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

impl From<ClusterError> for FacadeError {
    fn from(err: ClusterError) -> Self {
        match err {
            ClusterError::Api(failure) => FacadeError::Cluster {
                name: None,
                failure,
            },
            ClusterError::Client(msg) => FacadeError::Unclassified(msg),
        }
    }
}

/// Check the creation invariants, in order, failing on the first violation.
pub fn validate_deployment(deployment: Option<Deployment>) -> Result<Deployment, FacadeError> {
    let deployment = deployment
        .ok_or_else(|| FacadeError::Validation("Deployment cannot be null".to_string()))?;

    if deployment
        .metadata
        .name
        .as_deref()
        .map_or(true, str::is_empty)
    {
        return Err(FacadeError::Validation(
            "Deployment must have a name in metadata".to_string(),
        ));
    }

    let has_template = deployment
        .spec
        .as_ref()
        .is_some_and(|spec| spec.template != PodTemplateSpec::default());
    if !has_template {
        return Err(FacadeError::Validation(
            "Deployment must have a spec and template".to_string(),
        ));
    }

    Ok(deployment)
}

/// Give the deployment a `RollingUpdate` strategy if it has none.
///
/// Idempotent; a strategy that already names a type is left untouched.
pub fn apply_default_strategy(deployment: &mut Deployment) {
    if let Some(spec) = deployment.spec.as_mut() {
        let strategy = spec
            .strategy
            .get_or_insert_with(DeploymentStrategy::default);
        if strategy.type_.is_none() {
            strategy.type_ = Some(DEFAULT_STRATEGY_TYPE.to_string());
        }
    }
}

/// Scale subresource body requesting `replicas`
fn scale_for(namespace: &str, name: &str, replicas: i32) -> Scale {
    Scale {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(ScaleSpec {
            replicas: Some(replicas),
        }),
        status: None,
    }
}

/// The lifecycle operations exposed over HTTP
#[derive(Clone)]
pub struct OrchestrationFacade {
    client: SharedClusterClient,
}

impl OrchestrationFacade {
    pub fn new(client: SharedClusterClient) -> Self {
        Self { client }
    }

    /// Set the replica count of a deployment.
    ///
    /// The count is passed through as given; the cluster decides whether it
    /// is acceptable.
    pub async fn scale_deployment(
        &self,
        namespace: &str,
        name: &str,
        replicas: i32,
    ) -> Result<(), FacadeError> {
        info!(
            "Scaling deployment {} in namespace {} to {} replicas",
            name, namespace, replicas
        );
        let scale = scale_for(namespace, name, replicas);
        self.client.replace_scale(namespace, name, &scale).await?;
        info!(
            "Successfully scaled deployment {} to {} replicas",
            name, replicas
        );
        Ok(())
    }

    /// Pods in the namespace, in the order the cluster returns them
    pub async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, FacadeError> {
        debug!("Getting pods in namespace: {}", namespace);
        Ok(self.client.list_pods(namespace).await?)
    }

    pub async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, FacadeError> {
        debug!("Getting deployments in namespace: {}", namespace);
        Ok(self.client.list_deployments(namespace).await?)
    }

    /// Validate, default and submit a new deployment.
    ///
    /// `None` stands for a request that carried no descriptor at all.
    pub async fn create_deployment(
        &self,
        namespace: &str,
        deployment: Option<Deployment>,
    ) -> Result<Deployment, FacadeError> {
        debug!("Creating deployment in namespace: {}", namespace);
        let mut deployment = validate_deployment(deployment)?;
        apply_default_strategy(&mut deployment);

        let name = deployment.metadata.name.clone().unwrap_or_default();
        debug!("Deployment details - Name: {}, Namespace: {}", name, namespace);

        match self.client.create_deployment(namespace, &deployment).await {
            Ok(created) => {
                info!(
                    "Successfully created deployment {} in namespace {}",
                    name, namespace
                );
                Ok(created)
            }
            Err(ClusterError::Api(failure)) => {
                error!(
                    "Failed to create deployment {} in namespace {}: {} (Code: {}, Response: {})",
                    name,
                    namespace,
                    failure.message,
                    failure.code,
                    failure.body.as_deref().unwrap_or("")
                );
                Err(FacadeError::Cluster {
                    name: Some(name),
                    failure,
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Delete a deployment. A missing deployment is reported by the cluster.
    pub async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<(), FacadeError> {
        info!("Deleting deployment {} from namespace {}", name, namespace);
        self.client.delete_deployment(namespace, name).await?;
        info!("Successfully deleted deployment {}", name);
        Ok(())
    }

    pub async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Deployment, FacadeError> {
        debug!("Getting deployment {} in namespace: {}", name, namespace);
        Ok(self.client.get_deployment(namespace, name).await?)
    }
}
