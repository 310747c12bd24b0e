//! In-memory cluster client
//!
//! Keeps deployments and pods in process, keyed by qualified name
//! (`namespace/name`). Failures use the same codes and messages the API
//! server would produce, so the façade and its HTTP layer behave the same
//! against this store as against a real cluster.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentStatus};
use k8s_openapi::api::autoscaling::v1::Scale;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use tracing::debug;

use super::{ClusterClient, ClusterError, ClusterFailure};

const DEPLOYMENT_RESOURCE: &str = "deployments.apps";

fn qualified_name(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

#[derive(Clone, Default)]
pub struct InMemoryClusterClient {
    deployments: Arc<DashMap<String, Deployment>>,
    pods: Arc<DashMap<String, Pod>>,
}

impl InMemoryClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pod into the store. Pods without a name are ignored.
    pub fn with_pod(self, namespace: &str, mut pod: Pod) -> Self {
        if let Some(name) = pod.metadata.name.clone() {
            pod.metadata.namespace = Some(namespace.to_string());
            self.pods.insert(qualified_name(namespace, &name), pod);
        }
        self
    }

    /// Number of deployments across all namespaces
    pub fn deployment_count(&self) -> usize {
        self.deployments.len()
    }

    fn in_namespace<T: Clone>(
        map: &DashMap<String, T>,
        namespace: &str,
        name_of: impl Fn(&T) -> Option<String>,
    ) -> Vec<T> {
        let prefix = format!("{}/", namespace);
        let mut items: Vec<T> = map
            .iter()
            .filter(|r| r.key().starts_with(&prefix))
            .map(|r| r.value().clone())
            .collect();
        // The API server lists in key order
        items.sort_by_key(|item| name_of(item));
        items
    }
}

#[async_trait]
impl ClusterClient for InMemoryClusterClient {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClusterError> {
        Ok(Self::in_namespace(&self.pods, namespace, |p| {
            p.metadata.name.clone()
        }))
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, ClusterError> {
        Ok(Self::in_namespace(&self.deployments, namespace, |d| {
            d.metadata.name.clone()
        }))
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Deployment, ClusterError> {
        self.deployments
            .get(&qualified_name(namespace, name))
            .map(|r| r.value().clone())
            .ok_or_else(|| ClusterFailure::not_found(DEPLOYMENT_RESOURCE, name).into())
    }

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, ClusterError> {
        let name = match deployment.metadata.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(ClusterFailure::status(
                    422,
                    "Invalid",
                    "Deployment.apps \"\" is invalid: metadata.name: Required value: name or generateName is required",
                )
                .into())
            }
        };

        if let Some(ns) = deployment.metadata.namespace.as_deref() {
            if ns != namespace {
                return Err(ClusterFailure::status(
                    400,
                    "BadRequest",
                    "the namespace of the provided object does not match the namespace sent on the request",
                )
                .into());
            }
        }

        let key = qualified_name(namespace, &name);
        if self.deployments.contains_key(&key) {
            return Err(ClusterFailure::already_exists(DEPLOYMENT_RESOURCE, &name).into());
        }

        let mut created = deployment.clone();
        created.metadata.namespace = Some(namespace.to_string());
        created.metadata.creation_timestamp = Some(Time(Utc::now()));
        created.metadata.generation = Some(1);
        created.status = Some(DeploymentStatus::default());
        if let Some(spec) = created.spec.as_mut() {
            spec.replicas.get_or_insert(1);
        }

        debug!("Stored deployment {}", key);
        self.deployments.insert(key, created.clone());
        Ok(created)
    }

    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.deployments
            .remove(&qualified_name(namespace, name))
            .map(|_| ())
            .ok_or_else(|| ClusterFailure::not_found(DEPLOYMENT_RESOURCE, name).into())
    }

    async fn replace_scale(
        &self,
        namespace: &str,
        name: &str,
        scale: &Scale,
    ) -> Result<Scale, ClusterError> {
        let replicas = scale.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
        if replicas < 0 {
            return Err(ClusterFailure::status(
                422,
                "Invalid",
                format!(
                    "Scale.autoscaling \"{}\" is invalid: spec.replicas: Invalid value: {}: must be greater than or equal to 0",
                    name, replicas
                ),
            )
            .into());
        }

        let mut deployment = self
            .deployments
            .get_mut(&qualified_name(namespace, name))
            .ok_or_else(|| ClusterFailure::not_found(DEPLOYMENT_RESOURCE, name))?;

        if let Some(spec) = deployment.spec.as_mut() {
            spec.replicas = Some(replicas);
        }
        let generation = deployment.metadata.generation.unwrap_or(0) + 1;
        deployment.metadata.generation = Some(generation);

        let mut applied = scale.clone();
        applied.metadata.namespace = Some(namespace.to_string());
        Ok(applied)
    }
}
