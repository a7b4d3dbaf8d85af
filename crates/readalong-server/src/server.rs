use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use readalong_auth::TokenService;
use readalong_store::Database;

use crate::handlers::{auth, sessions, stories};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    /// Port to bind; 0 asks the OS for a free one.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

/// Shared application state passed to Axum handlers.
/// Each request-scoped handler receives a clone via `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tokens: TokenService,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/stories", get(stories::list).post(stories::create))
        .route(
            "/api/stories/{id}",
            get(stories::get).put(stories::update).delete(stories::remove),
        )
        .route("/api/sessions/analyze", post(sessions::analyze))
        .route("/api/sessions", get(sessions::list))
        .route("/api/sessions/stats", get(sessions::stats))
        .route("/api/sessions/{id}", get(sessions::detail))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Create and start the server. Returns a handle that keeps it alive.
pub async fn start(
    config: ServerConfig,
    db: Database,
    tokens: TokenService,
) -> Result<ServerHandle, std::io::Error> {
    let state = AppState { db, tokens };
    let router = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "readalong server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server_handle,
    })
}

/// Handle returned by `start()` — dropping it does not stop the server,
/// but it exposes the bound port for callers that asked for port 0.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

/// Liveness probe; requires no authentication.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    // A cheap query proves the database handle is usable.
    let db_ok = state
        .db
        .with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(readalong_store::StoreError::from)
        })
        .is_ok();

    let status = if db_ok { "ok" } else { "degraded" };
    let code = if db_ok {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(serde_json::json!({ "status": status })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use readalong_core::Role;

    async fn spawn() -> (reqwest::Client, String, ServerHandle) {
        let db = Database::in_memory().unwrap();
        let tokens = TokenService::new("test-secret");
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        };
        let handle = start(config, db, tokens).await.unwrap();
        let base = format!("http://127.0.0.1:{}", handle.port);
        (reqwest::Client::new(), base, handle)
    }

    async fn register(
        client: &reqwest::Client,
        base: &str,
        email: &str,
        role: Role,
    ) -> String {
        let resp = client
            .post(format!("{base}/api/auth/register"))
            .json(&serde_json::json!({
                "name": "Test User",
                "email": email,
                "password": "password123",
                "role": role,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: serde_json::Value = resp.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_story(
        client: &reqwest::Client,
        base: &str,
        admin_token: &str,
        title: &str,
        text: &str,
    ) -> i64 {
        let resp = client
            .post(format!("{base}/api/stories"))
            .bearer_auth(admin_token)
            .json(&serde_json::json!({ "title": title, "text": text }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: serde_json::Value = resp.json().await.unwrap();
        body["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn server_starts_and_serves_health() {
        let (client, base, _handle) = spawn().await;
        let resp = client
            .get(format!("{base}/api/health"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn register_then_login() {
        let (client, base, _handle) = spawn().await;
        let _ = register(&client, &base, "student@example.com", Role::Student).await;

        let resp = client
            .post(format!("{base}/api/auth/login"))
            .json(&serde_json::json!({
                "email": "student@example.com",
                "password": "password123",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["token"].as_str().is_some());
        assert_eq!(body["user"]["email"], "student@example.com");
        assert_eq!(body["user"]["role"], "student");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let (client, base, _handle) = spawn().await;
        let _ = register(&client, &base, "dup@example.com", Role::Student).await;

        let resp = client
            .post(format!("{base}/api/auth/register"))
            .json(&serde_json::json!({
                "name": "Again",
                "email": "dup@example.com",
                "password": "other",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 409);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (client, base, _handle) = spawn().await;
        let _ = register(&client, &base, "student@example.com", Role::Student).await;

        let resp = client
            .post(format!("{base}/api/auth/login"))
            .json(&serde_json::json!({
                "email": "student@example.com",
                "password": "wrong",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let (client, base, _handle) = spawn().await;
        let resp = client
            .get(format!("{base}/api/stories"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);

        let resp = client
            .get(format!("{base}/api/sessions"))
            .bearer_auth("not-a-real-token")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
    }

    #[tokio::test]
    async fn students_cannot_manage_stories() {
        let (client, base, _handle) = spawn().await;
        let token = register(&client, &base, "student@example.com", Role::Student).await;

        let resp = client
            .post(format!("{base}/api/stories"))
            .bearer_auth(&token)
            .json(&serde_json::json!({ "title": "T", "text": "t" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 403);
    }

    #[tokio::test]
    async fn story_crud_roundtrip() {
        let (client, base, _handle) = spawn().await;
        let admin = register(&client, &base, "admin@example.com", Role::Admin).await;

        let id = create_story(&client, &base, &admin, "The Fox", "the quick brown fox").await;

        let resp = client
            .get(format!("{base}/api/stories/{id}"))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["title"], "The Fox");
        assert_eq!(body["text"], "the quick brown fox");
        assert_eq!(body["difficulty"], "beginner");

        let resp = client
            .put(format!("{base}/api/stories/{id}"))
            .bearer_auth(&admin)
            .json(&serde_json::json!({
                "title": "The Fox, Revised",
                "text": "the quick brown fox jumps",
                "difficulty": "intermediate",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 204);

        let resp = client
            .get(format!("{base}/api/stories"))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        let list: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["title"], "The Fox, Revised");
        // Summaries do not carry the full text.
        assert!(list[0].get("text").is_none());

        let resp = client
            .delete(format!("{base}/api/stories/{id}"))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 204);

        let resp = client
            .get(format!("{base}/api/stories/{id}"))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn analyze_scores_and_persists() {
        let (client, base, _handle) = spawn().await;
        let admin = register(&client, &base, "admin@example.com", Role::Admin).await;
        let student = register(&client, &base, "student@example.com", Role::Student).await;
        let story_id = create_story(&client, &base, &admin, "Cat", "The cat sat.").await;

        let resp = client
            .post(format!("{base}/api/sessions/analyze"))
            .bearer_auth(&student)
            .json(&serde_json::json!({
                "story_id": story_id,
                "spoken_text": "the car sat",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["accuracy"], 66.67);
        assert_eq!(body["correct_words"], 2);
        assert_eq!(body["total_words"], 3);
        assert_eq!(body["mistakes"], 1);
        assert_eq!(body["mistakes_details"][0]["expected"], "cat");
        assert_eq!(body["mistakes_details"][0]["spoken"], "car");
        let session_id = body["session_id"].as_i64().unwrap();

        // History lists the session with its story title.
        let resp = client
            .get(format!("{base}/api/sessions"))
            .bearer_auth(&student)
            .send()
            .await
            .unwrap();
        let sessions: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(sessions.as_array().unwrap().len(), 1);
        assert_eq!(sessions[0]["story_title"], "Cat");

        // Detail includes the ordered mismatch log and the story text.
        let resp = client
            .get(format!("{base}/api/sessions/{session_id}"))
            .bearer_auth(&student)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let detail: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(detail["story_text"], "The cat sat.");
        assert_eq!(detail["mistakes_detail"][0]["expected_word"], "cat");
        assert_eq!(detail["mistakes_detail"][0]["position"], 1);

        // Stats aggregate the single session.
        let resp = client
            .get(format!("{base}/api/sessions/stats"))
            .bearer_auth(&student)
            .send()
            .await
            .unwrap();
        let stats: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(stats["total_sessions"], 1);
        assert_eq!(stats["average_accuracy"], 66.67);
    }

    #[tokio::test]
    async fn analyze_unknown_story_is_404_and_persists_nothing() {
        let (client, base, _handle) = spawn().await;
        let student = register(&client, &base, "student@example.com", Role::Student).await;

        let resp = client
            .post(format!("{base}/api/sessions/analyze"))
            .bearer_auth(&student)
            .json(&serde_json::json!({
                "story_id": 999,
                "spoken_text": "anything",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);

        let resp = client
            .get(format!("{base}/api/sessions"))
            .bearer_auth(&student)
            .send()
            .await
            .unwrap();
        let sessions: serde_json::Value = resp.json().await.unwrap();
        assert!(sessions.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_transcript_scores_zero() {
        let (client, base, _handle) = spawn().await;
        let admin = register(&client, &base, "admin@example.com", Role::Admin).await;
        let story_id = create_story(&client, &base, &admin, "Hello", "hello world").await;

        let resp = client
            .post(format!("{base}/api/sessions/analyze"))
            .bearer_auth(&admin)
            .json(&serde_json::json!({
                "story_id": story_id,
                "spoken_text": "",
            }))
            .send()
            .await
            .unwrap();
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["accuracy"], 0.0);
        assert_eq!(body["mistakes"], 2);
        assert_eq!(body["mistakes_details"][0]["spoken"], "");
    }

    #[tokio::test]
    async fn sessions_are_scoped_to_their_owner() {
        let (client, base, _handle) = spawn().await;
        let admin = register(&client, &base, "admin@example.com", Role::Admin).await;
        let reader = register(&client, &base, "reader@example.com", Role::Student).await;
        let other = register(&client, &base, "other@example.com", Role::Student).await;
        let story_id = create_story(&client, &base, &admin, "S", "one two three").await;

        let resp = client
            .post(format!("{base}/api/sessions/analyze"))
            .bearer_auth(&reader)
            .json(&serde_json::json!({ "story_id": story_id, "spoken_text": "one two three" }))
            .send()
            .await
            .unwrap();
        let session_id = resp.json::<serde_json::Value>().await.unwrap()["session_id"]
            .as_i64()
            .unwrap();

        let resp = client
            .get(format!("{base}/api/sessions/{session_id}"))
            .bearer_auth(&other)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }
}
