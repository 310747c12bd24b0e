//! Lifecycle endpoints under `/api/orchestration`
//!
//! Each handler parses its parameters, calls exactly one façade operation and
//! renders the outcome. Cluster failures on read, delete, scale and pod
//! listing are reported as 500; create and deployment listing forward the
//! cluster's own status code.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use k8s_openapi::api::apps::v1::Deployment;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::facade::FacadeError;
use crate::server::error::{handle_panic, status_from_code, ApiError, FailureBody};
use crate::server::state::AppState;

/// Message returned after a successful create
pub const CREATED_MESSAGE: &str = "Deployment created successfully";

#[derive(Debug, Deserialize)]
pub struct ScaleParams {
    pub replicas: i32,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub message: String,
    pub name: String,
}

/// Condensed view of a deployment used by the list endpoint
#[derive(Debug, Serialize, PartialEq)]
pub struct DeploymentSummary {
    pub name: Option<String>,
    pub replicas: Option<String>,
}

impl From<&Deployment> for DeploymentSummary {
    fn from(deployment: &Deployment) -> Self {
        Self {
            name: deployment.metadata.name.clone(),
            replicas: deployment
                .spec
                .as_ref()
                .and_then(|s| s.replicas)
                .map(|r| r.to_string()),
        }
    }
}

/// Render a façade error for the endpoints that collapse cluster failures
/// into a generic server error.
fn collapsed(err: FacadeError) -> Response {
    match err {
        FacadeError::Cluster { failure, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(FailureBody::new(failure.message)),
        )
            .into_response(),
        other => ApiError::from(other).into_response(),
    }
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn scale_deployment(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
    params: Result<Query<ScaleParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };
    info!(
        "Scaling deployment {} to {} replicas in namespace: {}",
        name, params.replicas, namespace
    );

    match state
        .facade
        .scale_deployment(&namespace, &name, params.replicas)
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            error!(
                "Failed to scale deployment {} in namespace {}: {}",
                name, namespace, e
            );
            collapsed(e)
        }
    }
}

pub async fn list_pods(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Response {
    info!("Listing pods in namespace: {}", namespace);
    match state.facade.list_pods(&namespace).await {
        Ok(pods) => Json(pods).into_response(),
        Err(e) => {
            error!("Failed to get pods in namespace {}: {}", namespace, e);
            collapsed(e)
        }
    }
}

pub async fn create_deployment(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    payload: Result<Json<Option<Deployment>>, JsonRejection>,
) -> Response {
    info!("Creating deployment in namespace: {}", namespace);
    let Json(deployment) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return ApiError::from(rejection).into_response(),
    };

    match state.facade.create_deployment(&namespace, deployment).await {
        Ok(created) => Json(CreatedResponse {
            message: CREATED_MESSAGE.to_string(),
            name: created.metadata.name.unwrap_or_default(),
        })
        .into_response(),
        Err(FacadeError::Cluster { failure, .. }) => {
            error!(
                "Failed to create deployment in namespace {}: {}",
                namespace, failure
            );
            (
                status_from_code(failure.code),
                Json(FailureBody::new(failure.message)),
            )
                .into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn delete_deployment(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Response {
    info!("Deleting deployment {} in namespace: {}", name, namespace);
    match state.facade.delete_deployment(&namespace, &name).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            error!(
                "Failed to delete deployment {} in namespace {}: {}",
                name, namespace, e
            );
            collapsed(e)
        }
    }
}

pub async fn get_deployment(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Response {
    info!("Getting deployment {} in namespace: {}", name, namespace);
    match state.facade.get_deployment(&namespace, &name).await {
        Ok(deployment) => Json(deployment).into_response(),
        Err(e) => {
            error!(
                "Failed to get deployment {} in namespace {}: {}",
                name, namespace, e
            );
            collapsed(e)
        }
    }
}

pub async fn list_deployments(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Response {
    info!("Listing deployments in namespace: {}", namespace);
    match state.facade.list_deployments(&namespace).await {
        Ok(deployments) => {
            let summaries: Vec<DeploymentSummary> =
                deployments.iter().map(DeploymentSummary::from).collect();
            Json(summaries).into_response()
        }
        Err(FacadeError::Cluster { failure, .. }) => {
            error!(
                "Failed to get deployments in namespace {}: {}",
                namespace, failure
            );
            (
                status_from_code(failure.code),
                Json(vec![FailureBody::new(failure.message)]),
            )
                .into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Routes nested under `/api/orchestration`
fn orchestration_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/deployments/{namespace}/{name}/scale",
            post(scale_deployment),
        )
        .route("/pods/{namespace}", get(list_pods))
        .route(
            "/deployments/{namespace}",
            get(list_deployments).post(create_deployment),
        )
        .route(
            "/deployments/{namespace}/{name}",
            get(get_deployment).delete(delete_deployment),
        )
}

/// Create the Axum router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/orchestration", orchestration_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{body::Body, body::to_bytes, http::Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::cluster::mock::RecordingClusterClient;
    use crate::cluster::{ClusterFailure, InMemoryClusterClient};

    fn create_test_app() -> Router {
        create_router(AppState::new(Arc::new(InMemoryClusterClient::new())))
    }

    fn failing_app(code: u16, message: &str) -> Router {
        let failure = ClusterFailure::new(code, message);
        let client = RecordingClusterClient::failing(failure.into());
        create_router(AppState::new(Arc::new(client)))
    }

    fn web_deployment() -> Value {
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web"},
            "spec": {
                "replicas": 3,
                "selector": {"matchLabels": {"app": "web"}},
                "template": {
                    "metadata": {"labels": {"app": "web"}},
                    "spec": {"containers": [{"name": "web", "image": "nginx:1.27"}]}
                }
            }
        })
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app.oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_deployment() {
        let app = create_test_app();

        let response = app
            .oneshot(post_json(
                "/api/orchestration/deployments/default",
                &web_deployment(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Deployment created successfully");
        assert_eq!(body["name"], "web");
    }

    #[tokio::test]
    async fn test_create_then_get_has_default_strategy() {
        let app = create_test_app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/orchestration/deployments/default",
                &web_deployment(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_request("/api/orchestration/deployments/default/web"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["spec"]["strategy"]["type"], "RollingUpdate");
        assert_eq!(body["spec"]["replicas"], 3);
    }

    #[tokio::test]
    async fn test_create_null_body_is_bad_request() {
        let app = create_test_app();

        let response = app
            .oneshot(post_json(
                "/api/orchestration/deployments/default",
                &Value::Null,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Deployment cannot be null");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_create_without_name_is_bad_request() {
        let app = create_test_app();
        let mut deployment = web_deployment();
        deployment["metadata"] = json!({});

        let response = app
            .oneshot(post_json(
                "/api/orchestration/deployments/default",
                &deployment,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Deployment must have a name in metadata");
    }

    #[tokio::test]
    async fn test_create_without_template_is_bad_request() {
        let app = create_test_app();
        let deployment = json!({"metadata": {"name": "web"}, "spec": {"replicas": 1}});

        let response = app
            .oneshot(post_json(
                "/api/orchestration/deployments/default",
                &deployment,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_malformed_json() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/orchestration/deployments/default")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("JSON processing error"));
    }

    #[tokio::test]
    async fn test_create_duplicate_forwards_conflict() {
        let app = create_test_app();

        for expected in [StatusCode::OK, StatusCode::CONFLICT] {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/api/orchestration/deployments/default",
                    &web_deployment(),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }
    }

    #[tokio::test]
    async fn test_scale_deployment() {
        let app = create_test_app();
        app.clone()
            .oneshot(post_json(
                "/api/orchestration/deployments/default",
                &web_deployment(),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/orchestration/deployments/default/web/scale?replicas=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_request("/api/orchestration/deployments/default"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body, json!([{"name": "web", "replicas": "5"}]));
    }

    #[tokio::test]
    async fn test_scale_non_numeric_replicas() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/orchestration/deployments/default/web/scale?replicas=many")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request parameter"));
    }

    #[tokio::test]
    async fn test_scale_missing_deployment_is_server_error() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/orchestration/deployments/default/web/scale?replicas=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_list_pods_empty_namespace() {
        let app = create_test_app();

        let response = app
            .oneshot(get_request("/api/orchestration/pods/default"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_list_pods_returns_pods() {
        let mut pod = k8s_openapi::api::core::v1::Pod::default();
        pod.metadata.name = Some("web-7d9c".to_string());
        let client = InMemoryClusterClient::new().with_pod("default", pod);
        let app = create_router(AppState::new(Arc::new(client)));

        let response = app
            .oneshot(get_request("/api/orchestration/pods/default"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body[0]["metadata"]["name"], "web-7d9c");
        assert_eq!(body[0]["metadata"]["namespace"], "default");
    }

    #[tokio::test]
    async fn test_delete_deployment() {
        let app = create_test_app();
        app.clone()
            .oneshot(post_json(
                "/api/orchestration/deployments/default",
                &web_deployment(),
            ))
            .await
            .unwrap();

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri("/api/orchestration/deployments/default/web")
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_not_found_collapses_on_get() {
        let app = failing_app(404, "Not Found");

        let response = app
            .oneshot(get_request("/api/orchestration/deployments/default/web"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({"error": "Not Found"}));
    }

    #[tokio::test]
    async fn test_not_found_forwarded_on_create() {
        let app = failing_app(404, "Not Found");

        let response = app
            .oneshot(post_json(
                "/api/orchestration/deployments/default",
                &web_deployment(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!({"error": "Not Found"}));
    }

    #[tokio::test]
    async fn test_not_found_forwarded_on_list_deployments() {
        let app = failing_app(404, "Not Found");

        let response = app
            .oneshot(get_request("/api/orchestration/deployments/default"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await, json!([{"error": "Not Found"}]));
    }

    #[tokio::test]
    async fn test_not_found_collapses_on_list_pods() {
        let app = failing_app(404, "Not Found");

        let response = app
            .oneshot(get_request("/api/orchestration/pods/default"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_summary_without_replicas() {
        let mut deployment = Deployment::default();
        deployment.metadata.name = Some("web".to_string());

        let summary = DeploymentSummary::from(&deployment);
        assert_eq!(summary.name.as_deref(), Some("web"));
        assert_eq!(summary.replicas, None);
    }
}
