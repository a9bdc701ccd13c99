//! Request-scoped middleware: request IDs, bearer auth, and per-client
//! rate limiting.
//!
//! Rejections reuse the [`ApiError`] envelope so clients see one error
//! shape regardless of which layer refused the request.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::ApiError;

/// Request ID carried through extensions and echoed on the response.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// API key auth settings used by middleware.
#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<HashSet<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Reads `AMBER_API_KEYS` (comma-separated bearer tokens).
    ///
    /// Development tolerates an empty set and turns auth off for local
    /// iteration; any other environment refuses to start without keys.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let keys = parse_api_keys(&std::env::var("AMBER_API_KEYS").unwrap_or_default());

        if !keys.is_empty() {
            return Ok(Self {
                api_keys: Arc::new(keys),
                enabled: true,
            });
        }

        anyhow::ensure!(
            is_development,
            "AMBER_API_KEYS is required outside development; provide comma-separated bearer tokens"
        );
        tracing::warn!("AMBER_API_KEYS not set; bearer auth disabled in development environment");
        Ok(Self {
            api_keys: Arc::new(HashSet::new()),
            enabled: false,
        })
    }

    fn allows(&self, token: &str) -> bool {
        self.api_keys.contains(token)
    }
}

fn parse_api_keys(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
}

/// Fixed-window request limiter with one window per client.
///
/// Clients are keyed by bearer token, so one caller exhausting its budget
/// never starves the others; unauthenticated requests share a single
/// anonymous window. Limits come from [`amber_core::AppConfig`].
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: u32,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub fn from_app_config(config: &amber_core::AppConfig) -> Self {
        Self::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        )
    }

    /// Records one request for `client`. Returns `false` when the client's
    /// current window is already full.
    async fn try_acquire(&self, client: &str) -> bool {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        let window = windows.entry(client.to_owned()).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if now.duration_since(window.started_at) >= self.window {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.max_requests {
            return false;
        }
        window.count += 1;
        true
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// An incoming `x-request-id` header wins; otherwise a fresh `UUIDv4` is
/// generated. The ID is stored as a [`RequestId`] extension, echoed on the
/// response header, and attached to a tracing span so every log line
/// emitted while handling the request carries it.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let span = tracing::info_span!("http_request", request_id = %id);
    let mut res = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", value);
    }

    res
}

/// Middleware enforcing Bearer token auth when enabled.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let authorized =
        bearer_token(req.headers().get(AUTHORIZATION)).is_some_and(|token| auth.allows(token));

    if authorized {
        next.run(req).await
    } else {
        unauthorized_response(&req)
    }
}

/// Middleware enforcing the per-client request budget.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let client = bearer_token(req.headers().get(AUTHORIZATION))
        .unwrap_or("anonymous")
        .to_owned();

    if rate_limit.try_acquire(&client).await {
        next.run(req).await
    } else {
        tracing::warn!(client = %client, "rate limit exceeded");
        ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded").into_response()
    }
}

fn unauthorized_response(req: &Request) -> Response {
    ApiError::new(
        request_id_of(req),
        "unauthorized",
        "missing or invalid bearer token",
    )
    .into_response()
}

/// The request's [`RequestId`], set by the outermost layer. Empty only if
/// a route is wired up without the `request_id` middleware.
fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map_or_else(String::new, |id| id.0.clone())
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|token| !token.trim().is_empty())
}
