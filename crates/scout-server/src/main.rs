use std::sync::Arc;

use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};

use scout_client::{ApiError, ExportFilter, HelpScoutClient, Status, DEFAULT_BASE_URL};
use scout_engine::{Exporter, ProgressBroadcaster};

/// Runtime settings, all read from the environment.
struct ServerConfig {
    port: u16,
    upstream_url: String,
    serve_static: bool,
    static_dir: String,
}

impl ServerConfig {
    fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3001);
        let upstream_url =
            std::env::var("SCOUT_UPSTREAM_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let serve_static = std::env::var("NODE_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        let static_dir =
            std::env::var("SCOUT_STATIC_DIR").unwrap_or_else(|_| "frontend/dist".to_string());
        Self {
            port,
            upstream_url,
            serve_static,
            static_dir,
        }
    }
}

#[derive(Clone)]
struct AppState {
    client: HelpScoutClient,
    exporter: Arc<Exporter<HelpScoutClient>>,
    progress: ProgressBroadcaster,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::from_env();

    let client = HelpScoutClient::with_base_url(&config.upstream_url);
    let progress = ProgressBroadcaster::new();
    let exporter = Arc::new(Exporter::new(client.clone(), progress.clone()));
    let state = AppState {
        client,
        exporter,
        progress,
    };

    let mut app = Router::new()
        .route("/api/auth", post(auth))
        .route("/api/conversations", get(conversations))
        .route("/api/count-conversations", get(count_conversations))
        .route("/api/tags", get(tags))
        .route("/api/tags-with-counts", get(tags_with_counts))
        .route("/api/conversation-count", get(conversation_count))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_methods(Any)
                .allow_headers(Any)
                .allow_origin(Any),
        );

    if config.serve_static {
        let index = format!("{}/index.html", config.static_dir);
        app = app.fallback_service(
            ServeDir::new(&config.static_dir).fallback(ServeFile::new(index)),
        );
        info!("serving static assets from {}", config.static_dir);
    }

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("listening on port {}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest {
    app_id: String,
    app_secret: String,
}

async fn auth(State(state): State<AppState>, Json(body): Json<AuthRequest>) -> Response {
    match state
        .client
        .authenticate(&body.app_id, &body.app_secret)
        .await
    {
        Ok(token) => (StatusCode::OK, Json(json!(token))).into_response(),
        Err(err) => {
            warn!("authentication failed: {}", err);
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Authentication failed" })),
            )
                .into_response()
        }
    }
}

/// Query string accepted by the export and count endpoints. `tags` is a
/// comma-separated list of slugs.
#[derive(Debug, Default, Deserialize)]
struct FilterParams {
    from: Option<chrono::NaiveDate>,
    to: Option<chrono::NaiveDate>,
    tags: Option<String>,
    status: Option<Status>,
}

impl FilterParams {
    fn into_filter(self) -> ExportFilter {
        let tag_slugs = self
            .tags
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        ExportFilter {
            from: self.from,
            to: self.to,
            tag_slugs,
            status: self.status.unwrap_or_default(),
        }
    }
}

async fn conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<FilterParams>,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return missing_token();
    };

    let filter = params.into_filter();
    match state.exporter.run(&token, &filter).await {
        Ok(conversations) => (
            StatusCode::OK,
            Json(json!({ "_embedded": { "conversations": conversations } })),
        )
            .into_response(),
        Err(err) => map_api_error(err),
    }
}

async fn count_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<FilterParams>,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return missing_token();
    };

    let filter = params.into_filter();
    match state.exporter.count_candidates(&token, &filter).await {
        Ok(count) => (StatusCode::OK, Json(json!({ "count": count }))).into_response(),
        Err(err) => map_api_error(err),
    }
}

async fn tags(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return missing_token();
    };

    match state.client.list_tags(&token, 1).await {
        Ok(page) => (
            StatusCode::OK,
            Json(json!({
                "_embedded": { "tags": page.items },
                "page": { "number": page.page_number, "totalPages": page.total_pages },
            })),
        )
            .into_response(),
        Err(err) => map_api_error(err),
    }
}

async fn tags_with_counts(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return missing_token();
    };

    match state.exporter.tag_catalog(&token).await {
        Ok(catalog) => (
            StatusCode::OK,
            Json(json!({ "_embedded": { "tags": catalog } })),
        )
            .into_response(),
        Err(err) => map_api_error(err),
    }
}

#[derive(Debug, Deserialize)]
struct TagCountParams {
    tags: Option<String>,
}

async fn conversation_count(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<TagCountParams>,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return missing_token();
    };
    let Some(tag) = params.tags.filter(|t| !t.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Tag parameter is required" })),
        )
            .into_response();
    };

    match state.exporter.count_for_tag(&token, &tag).await {
        Ok(count) => (StatusCode::OK, Json(json!({ "count": count }))).into_response(),
        Err(err) => map_api_error(err),
    }
}

async fn ws_upgrade(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| push_session(socket, state.progress.clone()))
}

/// Push-only session: every broadcast event goes out as a JSON text frame,
/// inbound frames are drained and ignored until the client closes.
async fn push_session(mut socket: WebSocket, progress: ProgressBroadcaster) {
    let (id, mut events) = progress.subscribe();
    info!(
        "websocket client connected ({} active)",
        progress.subscriber_count()
    );

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(p) => p,
                    Err(err) => {
                        error!("failed to serialize progress event: {}", err);
                        continue;
                    }
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    progress.unsubscribe(id);
    info!(
        "websocket client disconnected ({} active)",
        progress.subscriber_count()
    );
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?;
    value.split_whitespace().nth(1).map(str::to_string)
}

fn missing_token() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "No token provided" })),
    )
        .into_response()
}

/// Relay upstream failures with their original status where one exists,
/// otherwise answer 502.
fn map_api_error(err: ApiError) -> Response {
    let (status, message) = match &err {
        ApiError::Auth => (StatusCode::UNAUTHORIZED, "Authentication failed".to_string()),
        ApiError::Upstream { status, body } => {
            let code = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
            let message = if body.is_empty() {
                "Upstream request failed".to_string()
            } else {
                body.clone()
            };
            (code, message)
        }
        ApiError::Transport(inner) => (StatusCode::BAD_GATEWAY, inner.to_string()),
    };
    warn!("request failed: {}", err);
    (status, Json(json!({ "error": message }))).into_response()
}
