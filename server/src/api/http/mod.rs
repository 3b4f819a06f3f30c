//! HTTP API handlers

mod agent_config;
mod authorize;
mod health;
mod reconcile;
mod workspace;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Proxy authorization
        .route("/workspaces/authorize", post(authorize::authorize))
        // Workspace routes
        .route("/workspaces", post(workspace::create_workspace))
        .route("/workspaces", get(workspace::list_workspaces))
        .route("/workspaces/{id}", get(workspace::get_workspace))
        .route("/workspaces/{id}/desired_state", put(workspace::update_desired_state))
        .route("/workspaces/{id}/agent_config", get(workspace::get_agent_config))
        .route("/workspaces/{id}/variables", get(workspace::list_variables))
        // Agent routes
        .route(
            "/agents/{agent_id}/workspaces_agent_config",
            put(agent_config::put_agent_config),
        )
        .route(
            "/agents/{agent_id}/workspaces_agent_config",
            get(agent_config::get_agent_config),
        )
        .route("/agents/{agent_id}/reconcile", post(reconcile::reconcile));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::infra::sqlite::create_test_pool;

    async fn router() -> Router {
        let pool = create_test_pool().await;
        let state = AppState::build(Arc::new(Config::default()), pool).unwrap();
        create_router(state)
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn setup_agent(router: &Router, per_user_quota: i64) {
        let (status, _) = send(
            router,
            Method::PUT,
            "/api/v1/agents/1/workspaces_agent_config",
            Some(json!({
                "enabled": true,
                "dns_zone": "ws.example.com",
                "workspaces_per_user_quota": per_user_quota,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    async fn create_workspace(router: &Router, user_id: i64) -> (StatusCode, Value) {
        send(
            router,
            Method::POST,
            "/api/v1/workspaces",
            Some(json!({
                "user_id": user_id,
                "project_id": 3,
                "cluster_agent_id": 1,
                "devfile": "schemaVersion: 2.2.0",
                "variables": [{ "key": "TOKEN", "value": "abc" }],
            })),
        )
        .await
    }

    #[tokio::test]
    async fn test_health() {
        let router = router().await;
        let (status, body) = send(&router, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_then_authorize() {
        let router = router().await;
        setup_agent(&router, -1).await;

        let (status, workspace) = create_workspace(&router, 123).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(workspace["desired_state"], "Running");
        assert_eq!(workspace["actual_state"], "CreationRequested");
        let name = workspace["name"].as_str().unwrap().to_string();
        let id = workspace["id"].as_i64().unwrap();

        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/workspaces/authorize",
            Some(json!({
                "workspace_host": format!("60001-{}.ws.example.com", name),
                "user_id": 123,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "success",
                "payload": {
                    "status": "AUTHORIZED",
                    "info": { "port": "60001", "workspace_id": id }
                }
            })
        );

        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/workspaces/authorize",
            Some(json!({ "workspace_host": "workspace.example.com", "user_id": 123 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "success", "payload": { "status": "INVALID_HOST", "info": {} } })
        );
    }

    #[tokio::test]
    async fn test_quota_exceeded() {
        let router = router().await;
        setup_agent(&router, 1).await;

        let (status, _) = create_workspace(&router, 7).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = create_workspace(&router, 7).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], 2003);
    }

    #[tokio::test]
    async fn test_desired_state_and_variables() {
        let router = router().await;
        setup_agent(&router, -1).await;
        let (_, workspace) = create_workspace(&router, 7).await;
        let id = workspace["id"].as_i64().unwrap();

        let uri = format!("/api/v1/workspaces/{}/desired_state", id);
        let (status, body) = send(
            &router,
            Method::PUT,
            &uri,
            Some(json!({ "desired_state": "Terminated" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["desired_state"], "Terminated");

        let (status, body) = send(
            &router,
            Method::PUT,
            &uri,
            Some(json!({ "desired_state": "Running" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], 2004);

        let (status, body) = send(
            &router,
            Method::GET,
            &format!("/api/v1/workspaces/{}/variables", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["variables"][0]["key"], "TOKEN");
        assert_eq!(body["variables"][0]["value"], "abc");
        assert_eq!(body["variables"][0]["variable_type"], "environment");
    }

    #[tokio::test]
    async fn test_agent_config_and_reconcile() {
        let router = router().await;

        let (status, body) = send(
            &router,
            Method::GET,
            "/api/v1/agents/1/workspaces_agent_config",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 3001);

        setup_agent(&router, -1).await;
        setup_agent(&router, 5).await;
        let (status, body) = send(
            &router,
            Method::GET,
            "/api/v1/agents/1/workspaces_agent_config",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["versions_count"], 1);
        assert_eq!(body["workspaces_per_user_quota"], 5);

        let (_, workspace) = create_workspace(&router, 7).await;
        let (status, body) = send(
            &router,
            Method::GET,
            &format!("/api/v1/workspaces/{}/agent_config", workspace["id"]),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["workspaces_agent_config_version"], 1);
        assert_eq!(body["from_history"], false);

        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/agents/1/reconcile",
            Some(json!({
                "update_type": "full",
                "workspace_agent_infos": [
                    { "name": workspace["name"], "actual_state": "Starting" }
                ],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let infos = body["workspace_rails_infos"].as_array().unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0]["actual_state"], "Starting");
        assert_eq!(infos[0]["include_all_resources"], true);
    }

    #[tokio::test]
    async fn test_unknown_workspace() {
        let router = router().await;
        let (status, body) = send(&router, Method::GET, "/api/v1/workspaces/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 2001);
    }

    #[tokio::test]
    async fn test_duplicate_variable_keys_are_rejected() {
        let router = router().await;
        setup_agent(&router, -1).await;

        let (status, body) = send(
            &router,
            Method::POST,
            "/api/v1/workspaces",
            Some(json!({
                "user_id": 7,
                "project_id": 3,
                "cluster_agent_id": 1,
                "devfile": "schemaVersion: 2.2.0",
                "variables": [
                    { "key": "TOKEN", "value": "a" },
                    { "key": "TOKEN", "value": "b" }
                ],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 1002);
    }
}
