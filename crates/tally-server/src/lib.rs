//! Tally Web Server
//!
//! Axum-based REST/WebSocket API for the Tally conversational finance
//! tracker, plus the background machinery behind it: the channel session
//! manager, the message ingestion pipeline, and the reminder scheduler.
//!
//! Security features:
//! - API-key authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Input validation (pagination limits)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use tally_core::{extract::ExtractionBackend, Database, ExtractorClient, Settings};

pub mod broadcast;
pub mod channel;
mod handlers;
pub mod notify;
pub mod pipeline;
pub mod scheduler;
mod ws;

pub use scheduler::{start_reminder_scheduler, SchedulerHandle};

use broadcast::EventBroadcaster;
use channel::{ChannelClient, ChannelConnectionManager};
use notify::NotificationDispatcher;
use pipeline::{spawn_ingest_loop, MessageIngestionPipeline};

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Queue depth between the channel manager and the ingestion loop
const INGEST_QUEUE_DEPTH: usize = 64;

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys accepted as "Bearer <key>" in the Authorization header
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub settings: Settings,
    pub manager: Arc<ChannelConnectionManager>,
    pub broadcaster: Arc<EventBroadcaster>,
    pub pipeline: Arc<MessageIngestionPipeline>,
    pub dispatcher: NotificationDispatcher,
}

/// Generic success response body
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Authentication middleware - validates API keys
///
/// Keys are compared in constant time to prevent timing attacks.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key using constant-time comparison
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    valid_keys.iter().any(|valid| {
        provided.len() == valid.len()
            && provided.as_bytes().ct_eq(valid.as_bytes()).into()
    })
}

/// Everything needed to run or test the server
pub struct App {
    pub router: Router,
    pub state: Arc<AppState>,
}

/// Build the application: state, background wiring, and router.
///
/// The extractor and channel provider are injected so tests can use mocks.
pub fn build_app(
    db: Database,
    settings: Settings,
    config: ServerConfig,
    extractor: ExtractorClient,
    provider: ChannelClient,
    static_dir: Option<&str>,
) -> App {
    let broadcaster = Arc::new(EventBroadcaster::new());

    let (ingest_tx, ingest_rx) = tokio::sync::mpsc::channel(INGEST_QUEUE_DEPTH);
    let manager = Arc::new(ChannelConnectionManager::new(
        provider,
        &settings,
        Arc::clone(&broadcaster),
        ingest_tx,
    ));
    let dispatcher = NotificationDispatcher::new(Arc::clone(&manager));

    let pipeline = Arc::new(MessageIngestionPipeline::new(
        db.clone(),
        extractor,
        Arc::clone(&broadcaster),
        dispatcher.clone(),
        settings.clone(),
    ));
    spawn_ingest_loop(Arc::clone(&pipeline), ingest_rx);

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        settings,
        manager,
        broadcaster,
        pipeline,
        dispatcher,
    });

    let api_routes = Router::new()
        // Channel session
        .route("/channel/status", get(handlers::get_channel_status))
        .route("/channel/connect", post(handlers::connect_channel))
        .route("/channel/disconnect", post(handlers::disconnect_channel))
        .route("/channel/reconnect", post(handlers::reconnect_channel))
        .route("/channel/event", post(handlers::channel_event))
        .route("/channel/inbound", post(handlers::inbound_message))
        // Transactions and summary
        .route(
            "/transactions",
            get(handlers::list_transactions)
                .post(handlers::create_transaction)
                .delete(handlers::clear_transactions),
        )
        .route("/transactions/:id", delete(handlers::delete_transaction))
        .route("/summary", get(handlers::get_summary))
        // Chat ingestion
        .route("/messages", post(handlers::post_message))
        // Alerts
        .route("/alerts", get(handlers::list_alerts))
        .route("/alerts/:id/read", post(handlers::mark_alert_read))
        // Reminders
        .route(
            "/reminders",
            get(handlers::list_reminders).post(handlers::create_reminder),
        )
        .route("/reminders/:id/complete", post(handlers::complete_reminder))
        .route("/reminders/:id/cancel", post(handlers::cancel_reminder));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let mut router = Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ))
        // The event stream authenticates by owner scoping only; dashboards
        // hold no API key in the browser
        .route("/ws", get(ws::ws_upgrade))
        .with_state(Arc::clone(&state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    App { router, state }
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("Authentication disabled - do not expose to network!");
    }

    let settings = Settings::from_env();

    let extractor = match ExtractorClient::from_env() {
        Some(client) => {
            if client.health_check().await {
                info!("Extraction backend connected: {} ({})", client.host(), client.model());
            } else {
                warn!(
                    "Extraction backend configured but not responding: {}",
                    client.host()
                );
            }
            client
        }
        None => {
            warn!("No extraction backend configured (set OLLAMA_HOST), using mock extractor");
            ExtractorClient::mock()
        }
    };

    let provider = match ChannelClient::from_env() {
        Some(client) => client,
        None => {
            warn!("No channel gateway configured (set TALLY_GATEWAY_URL), using mock provider");
            ChannelClient::mock()
        }
    };

    let app = build_app(db.clone(), settings.clone(), config, extractor, provider, static_dir);

    let _scheduler = start_reminder_scheduler(
        db,
        app.state.dispatcher.clone(),
        Arc::clone(&app.state.broadcaster),
        settings,
    );

    let addr = format!("{}:{}", host, port);
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.router).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_gateway(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        // Ledger errors carry client-facing status semantics
        if let Some(core) = err.downcast_ref::<tally_core::Error>() {
            match core {
                tally_core::Error::NotFound(msg) => {
                    return Self {
                        status: StatusCode::NOT_FOUND,
                        message: msg.clone(),
                        internal: None,
                    }
                }
                tally_core::Error::InvalidData(msg) => {
                    return Self {
                        status: StatusCode::BAD_REQUEST,
                        message: msg.clone(),
                        internal: None,
                    }
                }
                _ => {}
            }
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
