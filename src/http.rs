//! HTTP transport for the trustcard service.
//!
//! Axum router over [`Advisor`] and [`SessionStore`]. Sessions are keyed by
//! the `trustcard_sid` cookie, which is set whenever the request did not carry
//! a live session id. Uploads are read into memory and base64-encoded; nothing
//! is written to disk.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, HeaderValue, Method, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::advisor::{Advisor, AnalyzeOutcome, AnalyzeRequest, BuildRequest};
use crate::clients::Attachment;
use crate::config::Config;
use crate::error::{Result, TrustcardError};
use crate::guidance::{Tone, known_builders};
use crate::schemas::Scorecard;
use crate::sessions::{SessionSnapshot, SessionStore};

pub const SESSION_COOKIE: &str = "trustcard_sid";
const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 30;
const MAX_ATTACHMENTS: usize = 6;
const TEASER_WORDS: usize = 6;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub advisor: Arc<Advisor>,
    pub sessions: Arc<SessionStore>,
}

impl HttpState {
    pub fn new(advisor: Advisor) -> Self {
        let sessions = SessionStore::new(
            advisor.config().sessions.capacity,
            advisor.config().sessions.default_subscribed,
        );
        Self {
            advisor: Arc::new(advisor),
            sessions: Arc::new(sessions),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzeBody {
    pub prompt: String,
    pub tone: String,
    pub builder: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BuildBody {
    pub prompt: String,
    pub tone: String,
    pub builder: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct VariantQuery {
    pub tone: Option<String>,
    pub builder: Option<String>,
}

/// Session id from the Cookie header, if any
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == SESSION_COOKIE)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn set_cookie_value(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_MAX_AGE_SECS}")
}

/// JSON response, with a fresh session cookie when the id changed
fn with_session(body: Value, session: &SessionSnapshot, incoming: Option<&str>) -> Response {
    let mut resp = Json(body).into_response();
    if incoming != Some(session.id.as_str())
        && let Ok(v) = HeaderValue::from_str(&set_cookie_value(&session.id))
    {
        resp.headers_mut().insert(header::SET_COOKIE, v);
    }
    resp
}

/// Opening words of a locked summary
fn teaser(summary: &str) -> String {
    let words: Vec<&str> = summary.split_whitespace().collect();
    if words.len() <= TEASER_WORDS {
        return summary.trim().to_string();
    }
    format!("{}…", words[..TEASER_WORDS].join(" "))
}

/// Scorecard JSON with each locked insight marked for the session. Locked
/// insights keep their title but only a teaser of the summary.
pub fn scorecard_view(card: &Scorecard, subscribed: bool) -> Result<Value> {
    let mut value = serde_json::to_value(card)?;
    if let Some(items) = value
        .get_mut("lockedInsights")
        .and_then(Value::as_array_mut)
    {
        for item in items.iter_mut().filter_map(Value::as_object_mut) {
            item.insert("locked".to_string(), Value::Bool(!subscribed));
            if subscribed {
                continue;
            }
            let short = item.get("summary").and_then(Value::as_str).map(teaser);
            if let Some(short) = short {
                item.insert("summary".to_string(), Value::String(short));
            }
        }
    }
    Ok(value)
}

fn session_json(s: &SessionSnapshot) -> Value {
    json!({
        "id": s.id,
        "subscribed": s.subscribed,
        "analyses": s.analyses,
        "builds": s.builds,
        "historyLen": s.history_len,
        "lastBuildId": s.last_build_id,
    })
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Info endpoint
pub async fn info_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let advisor = &state.advisor;
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "model": {
            "configured": advisor.model_name().is_some(),
            "name": advisor.model_name(),
            "timeoutMs": advisor.config().model.timeout_ms,
        },
        "seedPool": advisor.seed_pool(),
        "tones": Tone::all().iter().map(Tone::as_str).collect::<Vec<_>>(),
        "builders": known_builders(),
    }))
}

async fn read_multipart(mut multipart: Multipart) -> Result<AnalyzeBody> {
    let mut body = AnalyzeBody::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prompt" => body.prompt = field.text().await?,
            "tone" => body.tone = field.text().await?,
            "builder" => body.builder = field.text().await?,
            "files" | "files[]" | "file" => {
                let display_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    continue;
                }
                if body.attachments.len() >= MAX_ATTACHMENTS {
                    return Err(TrustcardError::Upload {
                        message: format!("at most {MAX_ATTACHMENTS} files per request"),
                    });
                }
                body.attachments.push(Attachment {
                    display_name,
                    mime_type,
                    base64_payload: STANDARD.encode(&bytes),
                });
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }
    Ok(body)
}

async fn run_analyze(state: &HttpState, headers: &HeaderMap, body: AnalyzeBody) -> Result<Response> {
    let incoming = session_cookie(headers);
    let session = state.sessions.get_or_create(incoming.as_deref()).await;
    let history = state.sessions.history(&session.id).await;
    let prompt = body.prompt.clone();
    let tone = Tone::from_key(&body.tone);

    let AnalyzeOutcome {
        scorecard,
        source,
        seed,
    } = state
        .advisor
        .analyze(AnalyzeRequest {
            prompt: body.prompt,
            tone: body.tone,
            builder: body.builder.clone(),
            attachments: body.attachments,
            history,
        })
        .await?;

    let s = &scorecard.scores;
    let summary = format!(
        "Scores: confidence {}, pushiness {}, clarity {}. Top flag: {}",
        s.confidence,
        s.pushiness,
        s.clarity,
        scorecard
            .flags
            .first()
            .map(|f| f.title.as_str())
            .unwrap_or("none")
    );
    state
        .sessions
        .record_analysis(&session.id, &prompt, &summary)
        .await;
    let session = state
        .sessions
        .snapshot(&session.id)
        .await
        .unwrap_or(session);

    let body = json!({
        "scorecard": scorecard_view(&scorecard, session.subscribed)?,
        "source": source,
        "seed": seed,
        "tone": tone.as_str(),
        "builder": body.builder,
        "session": session_json(&session),
    });
    Ok(with_session(body, &session, incoming.as_deref()))
}

/// Multipart analysis: `prompt`, `tone`, `builder` and any number of `files`
pub async fn analyze_handler(
    State(state): State<HttpState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response> {
    let body = read_multipart(multipart).await?;
    run_analyze(&state, &headers, body).await
}

/// Same as [`analyze_handler`] with a JSON body and pre-encoded attachments
pub async fn analyze_json_handler(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Json(body): Json<AnalyzeBody>,
) -> Result<Response> {
    run_analyze(&state, &headers, body).await
}

pub async fn build_handler(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Json(body): Json<BuildBody>,
) -> Result<Response> {
    let incoming = session_cookie(&headers);
    let session = state.sessions.get_or_create(incoming.as_deref()).await;
    let history = state.sessions.history(&session.id).await;

    let outcome = state
        .advisor
        .build(BuildRequest {
            prompt: body.prompt.clone(),
            tone: body.tone,
            builder: body.builder,
            history,
        })
        .await?;

    state
        .sessions
        .record_build(&session.id, &body.prompt, &outcome.plan)
        .await;
    let session = state
        .sessions
        .snapshot(&session.id)
        .await
        .unwrap_or(session);

    let body = json!({
        "plan": outcome.plan,
        "source": outcome.source,
        "session": session_json(&session),
    });
    Ok(with_session(body, &session, incoming.as_deref()))
}

/// Deterministic demo variant for a fixed seed
pub async fn variant_handler(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Path(seed): Path<i64>,
    Query(q): Query<VariantQuery>,
) -> Result<Response> {
    let incoming = session_cookie(&headers);
    let session = state.sessions.get_or_create(incoming.as_deref()).await;
    let tone = q.tone.unwrap_or_default();
    let builder = q.builder.unwrap_or_default();
    let card = state.advisor.variant(seed, &tone, &builder);
    let body = json!({
        "seed": seed,
        "scorecard": scorecard_view(&card, session.subscribed)?,
        "source": "fallback",
    });
    Ok(with_session(body, &session, incoming.as_deref()))
}

pub async fn session_handler(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let incoming = session_cookie(&headers);
    let session = state.sessions.get_or_create(incoming.as_deref()).await;
    let last_build = state.sessions.last_build(&session.id).await;
    let mut body = session_json(&session);
    body["lastBuild"] = serde_json::to_value(last_build).unwrap_or(Value::Null);
    with_session(body, &session, incoming.as_deref())
}

async fn log_requests(req: axum::http::Request<Body>, next: middleware::Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let resp = next.run(req).await;
    tracing::info!(
        %method,
        path = %path,
        status = resp.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    resp
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    layer.allow_origin(parsed).allow_credentials(true)
}

/// Router with every route and layer, ready to serve or to drive in tests
pub fn router(state: HttpState) -> Router {
    let config = state.advisor.config();
    let body_limit = config.server.body_limit_bytes;
    let cors = cors_layer(&config.server.cors_origins);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/analyze/json", post(analyze_json_handler))
        .route("/api/build", post(build_handler))
        .route("/api/variant/:seed", get(variant_handler))
        .route("/api/session", get(session_handler))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_requests))
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(config: Config) -> Result<()> {
    let bind = config.server.bind.clone();
    let advisor = Advisor::from_config(config)?;
    let app = router(HttpState::new(advisor));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener on {}: {}", bind, e))?;

    tracing::info!("Starting trustcard HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
