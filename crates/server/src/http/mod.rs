use axum::{Router, extract::DefaultBodyLimit, middleware::from_fn_with_state, routing::get};
use tower_http::trace::TraceLayer;

use crate::{DeploymentImpl, routes};

pub mod auth;

const MAX_REQUEST_BODY_BYTES: usize = 50 * 1024 * 1024;

pub fn router(deployment: DeploymentImpl) -> Router {
    let public_api = routes::auth::public_router();

    let protected_api = Router::new()
        .merge(routes::auth::session_router())
        .merge(routes::dashboard::router())
        .merge(routes::projects::router(&deployment))
        .merge(routes::boards::router(&deployment))
        .merge(routes::tasks::router(&deployment))
        .merge(routes::workers::router(&deployment))
        .merge(routes::teams::router(&deployment))
        .merge(routes::task_types::router(&deployment))
        .merge(routes::positions::router(&deployment))
        .merge(routes::attachments::router(&deployment))
        .layer(from_fn_with_state(
            deployment.clone(),
            auth::require_session_auth,
        ));

    let api_routes = public_api.merge(protected_api);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{DeploymentImpl, test_support::TestEnvGuard};
    use deployment::Deployment as _;

    async fn setup() -> (TestEnvGuard, Router) {
        let temp_root = std::env::temp_dir().join(format!("workboard-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&temp_root).unwrap();
        let env_guard = TestEnvGuard::new(&temp_root);

        let deployment = DeploymentImpl::new().await.unwrap();
        let app = super::router(deployment);
        (env_guard, app)
    }

    async fn request(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn register_and_login(app: &Router, username: &str) -> String {
        let (status, _) = request(
            app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "123QWEasd!",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = request(
            app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": username, "password": "123QWEasd!"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    fn future_deadline() -> String {
        (chrono::Utc::now().date_naive() + chrono::Duration::days(7)).to_string()
    }

    async fn create_project(app: &Router, token: &str, name: &str) -> Value {
        let (status, body) = request(
            app,
            "POST",
            "/api/projects",
            Some(token),
            Some(json!({
                "name": name,
                "description": "a project",
                "deadline": future_deadline(),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["data"].clone()
    }

    #[tokio::test]
    async fn health_is_public() {
        let (_guard, app) = setup().await;
        let (status, body) = request(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
    }

    #[tokio::test]
    async fn api_requires_a_session() {
        let (_guard, app) = setup().await;
        let (status, body) = request(&app, "GET", "/api/dashboard", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Unauthorized"));
    }

    #[tokio::test]
    async fn register_login_logout_flow() {
        let (_guard, app) = setup().await;
        let token = register_and_login(&app, "alice").await;

        let (status, body) = request(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], json!("alice"));

        let (status, _) = request(&app, "POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = request(&app, "GET", "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (_guard, app) = setup().await;
        register_and_login(&app, "bob").await;

        let (status, body) = request(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "bob", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn creating_a_project_auto_creates_a_team_and_rejects_duplicates() {
        let (_guard, app) = setup().await;
        let token = register_and_login(&app, "carol").await;

        let project = create_project(&app, &token, "Apollo").await;
        assert!(project["team_id"].is_string());

        let (status, _) = request(
            &app,
            "POST",
            "/api/projects",
            Some(&token),
            Some(json!({
                "name": "Apollo",
                "description": "again",
                "deadline": future_deadline(),
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = request(
            &app,
            "POST",
            "/api/projects",
            Some(&token),
            Some(json!({
                "name": "Too late",
                "description": "past deadline",
                "deadline": "2000-01-01",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn non_owner_cannot_update_or_delete_a_project() {
        let (_guard, app) = setup().await;
        let owner_token = register_and_login(&app, "owner").await;
        let outsider_token = register_and_login(&app, "outsider").await;

        let project = create_project(&app, &owner_token, "Fortress").await;
        let project_id = project["id"].as_str().unwrap().to_string();

        let (status, _) = request(
            &app,
            "PUT",
            &format!("/api/projects/{project_id}"),
            Some(&outsider_token),
            Some(json!({"name": "Hijacked"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = request(
            &app,
            "DELETE",
            &format!("/api/projects/{project_id}"),
            Some(&outsider_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // The project is unchanged and still present.
        let (status, body) = request(
            &app,
            "GET",
            &format!("/api/projects/{project_id}"),
            Some(&owner_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], json!("Fortress"));
    }

    #[tokio::test]
    async fn team_toggle_gates_board_creation_and_is_an_involution() {
        let (_guard, app) = setup().await;
        let owner_token = register_and_login(&app, "lead").await;
        let member_token = register_and_login(&app, "newcomer").await;

        let project = create_project(&app, &owner_token, "Shared").await;
        let project_id = project["id"].as_str().unwrap().to_string();

        // Not yet a member: board creation is forbidden.
        let (status, _) = request(
            &app,
            "POST",
            &format!("/api/projects/{project_id}/boards"),
            Some(&member_token),
            Some(json!({"name": "Backlog"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = request(
            &app,
            "POST",
            &format!("/api/projects/{project_id}/team/toggle"),
            Some(&member_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["change"], json!("joined"));

        let (status, _) = request(
            &app,
            "POST",
            &format!("/api/projects/{project_id}/boards"),
            Some(&member_token),
            Some(json!({"name": "Backlog"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        // Second toggle restores the original state.
        let (status, body) = request(
            &app,
            "POST",
            &format!("/api/projects/{project_id}/team/toggle"),
            Some(&member_token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["change"], json!("left"));

        let (status, _) = request(
            &app,
            "POST",
            &format!("/api/projects/{project_id}/boards"),
            Some(&member_token),
            Some(json!({"name": "Another"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn task_creation_accepts_multipart_attachments() {
        let (_guard, app) = setup().await;
        let token = register_and_login(&app, "uploader").await;

        let project = create_project(&app, &token, "Uploads").await;
        let project_id = project["id"].as_str().unwrap().to_string();

        let (status, body) = request(
            &app,
            "POST",
            &format!("/api/projects/{project_id}/boards"),
            Some(&token),
            Some(json!({"name": "Inbox"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let board_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = request(
            &app,
            "POST",
            "/api/task-types",
            Some(&token),
            Some(json!({"name": "Bug"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let task_type_id = body["data"]["id"].as_str().unwrap().to_string();

        let task_json = json!({
            "name": "With attachment",
            "description": "multipart",
            "deadline": future_deadline(),
            "task_type_id": task_type_id,
        })
        .to_string();

        let boundary = "workboard-test-boundary";
        let multipart_body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"task\"\r\n\
             Content-Type: application/json\r\n\r\n\
             {task_json}\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"files\"; filename=\"notes.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             hello attachment\r\n\
             --{boundary}--\r\n"
        );

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/boards/{board_id}/tasks"))
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(multipart_body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        let task_id = body["data"]["id"].as_str().unwrap();
        let attachments = body["data"]["attachments"].as_array().unwrap();
        assert_eq!(attachments.len(), 1);
        let attachment_name = attachments[0]["name"].as_str().unwrap();
        assert!(attachment_name.starts_with(&format!("{task_id}:")));

        let attachment_id = attachments[0]["id"].as_str().unwrap();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/attachments/{attachment_id}/file"))
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let file_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&file_bytes[..], b"hello attachment");
    }
}
