//! Kubernetes-backed cluster client
//!
//! Wraps a kube-rs `Client`. The client is cheap to clone and pools its
//! connections internally, so one instance serves every request.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v1::Scale;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use super::{ClusterClient, ClusterError};
use crate::config::KubeSettings;

#[derive(Clone)]
pub struct KubeClusterClient {
    inner: Client,
}

impl KubeClusterClient {
    /// Wrap an already configured kube-rs client
    pub fn new(client: Client) -> Self {
        Self { inner: client }
    }

    /// Build a client from the configured kubeconfig/context.
    ///
    /// With an explicit kubeconfig path the file is read directly. Otherwise
    /// the usual inference applies: `KUBECONFIG`, `~/.kube/config`, then the
    /// in-cluster service account.
    pub async fn connect(settings: &KubeSettings) -> Result<Self, ClusterError> {
        let options = KubeConfigOptions {
            context: settings.context.clone(),
            ..Default::default()
        };

        let config = match (&settings.kubeconfig, &settings.context) {
            (Some(path), _) => {
                debug!("Loading kubeconfig from {}", path.display());
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    ClusterError::Client(format!(
                        "Failed to read kubeconfig {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| {
                        ClusterError::Client(format!("Failed to load kubeconfig: {}", e))
                    })?
            }
            (None, Some(context)) => {
                debug!("Loading kubeconfig context {}", context);
                Config::from_kubeconfig(&options).await.map_err(|e| {
                    ClusterError::Client(format!("Failed to load context {}: {}", context, e))
                })?
            }
            (None, None) => Config::infer().await.map_err(|e| {
                ClusterError::Client(format!("Failed to infer cluster config: {}", e))
            })?,
        };

        debug!("Using API server {}", config.cluster_url);

        let client = Client::try_from(config)
            .map_err(|e| ClusterError::Client(format!("Failed to create client: {}", e)))?;

        Ok(Self::new(client))
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.inner.clone(), namespace)
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.inner.clone(), namespace)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClusterError> {
        let list = self.pods(namespace).list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, ClusterError> {
        let list = self
            .deployments(namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Deployment, ClusterError> {
        Ok(self.deployments(namespace).get(name).await?)
    }

    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Deployment, ClusterError> {
        Ok(self
            .deployments(namespace)
            .create(&PostParams::default(), deployment)
            .await?)
    }

    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        self.deployments(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn replace_scale(
        &self,
        namespace: &str,
        name: &str,
        scale: &Scale,
    ) -> Result<Scale, ClusterError> {
        let data = serde_json::to_vec(scale)
            .map_err(|e| ClusterError::Client(format!("Failed to encode scale: {}", e)))?;
        Ok(self
            .deployments(namespace)
            .replace_scale(name, &PostParams::default(), data)
            .await?)
    }
}
