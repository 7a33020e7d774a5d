use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::EventSink;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    ip_rate_limit_middleware, metrics_handler, metrics_middleware, rate_limit_middleware,
    require_user_auth, security_headers_middleware, trace_id, RateLimiterState,
};
use crate::routes::{
    activity_logs, attachments, auth, health, internal_messages, messages, notifications,
    tickets, users, webhook,
};
use crate::services::{EmailService, FileStore, FilesystemStore, NotificationDispatcher};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    /// Per-user limiter for authenticated routes.
    pub rate_limiter: Option<Arc<RateLimiterState>>,
    /// Per-IP limiter for login, forgot-password and the webhook.
    pub ip_rate_limiter: Option<Arc<RateLimiterState>>,
    pub storage: Arc<dyn FileStore>,
    pub email: EmailService,
    pub events: Arc<dyn EventSink>,
}

impl AppState {
    /// Wires the production collaborators: filesystem storage and the
    /// notification dispatcher as event sink.
    pub fn new(config: Config, pool: PgPool) -> Self {
        let config = Arc::new(config);
        let email = EmailService::new(config.email.clone());
        let storage: Arc<dyn FileStore> =
            Arc::new(FilesystemStore::new(config.uploads.storage_root.clone()));
        let events: Arc<dyn EventSink> =
            Arc::new(NotificationDispatcher::new(pool.clone(), email.clone()));

        Self {
            rate_limiter: RateLimiterState::new(config.security.rate_limit_per_minute).map(Arc::new),
            ip_rate_limiter: RateLimiterState::new(config.security.login_rate_limit_per_minute)
                .map(Arc::new),
            pool,
            config,
            storage,
            email,
            events,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn FileStore>) -> Self {
        self.storage = storage;
        self
    }

    /// Replaces the event sink, e.g. with a recording sink in tests.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    create_router(AppState::new(config, pool))
}

pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Authenticated routes
    // Middleware order: auth runs first, then rate limiting (which needs the user)
    let protected_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/password/change", post(auth::change_password))
        .route(
            "/me",
            get(users::get_current_user).put(users::update_current_user),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/tickets",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route(
            "/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route(
            "/tickets/:id/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route(
            "/tickets/:id/messages-internal",
            get(internal_messages::list_messages).post(internal_messages::post_message),
        )
        .route(
            "/tickets/:id/messages-internal/:message_id",
            axum::routing::delete(internal_messages::delete_message),
        )
        .route(
            "/tickets/:id/attachments",
            get(attachments::list_attachments).post(attachments::upload_attachments),
        )
        .route(
            "/tickets/:id/activity-logs",
            get(activity_logs::ticket_activity_logs),
        )
        .route(
            "/attachments/:id",
            get(attachments::show_attachment).delete(attachments::delete_attachment),
        )
        .route(
            "/attachments/:id/download",
            get(attachments::download_attachment),
        )
        .route(
            "/message-attachments/:id/download",
            get(attachments::download_message_attachment),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread", get(notifications::list_unread))
        .route("/notifications/count", get(notifications::unread_count))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/:id/read", post(notifications::mark_read))
        .route(
            "/notifications/:id",
            axum::routing::delete(notifications::delete_notification),
        )
        .route("/activity-logs", get(activity_logs::list_activity_logs))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        // Auth runs first (outermost layer = runs first)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    // Public entry points limited per client IP
    let throttled_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/password/forgot", post(auth::forgot_password))
        .route("/webhook/whatsapp", post(webhook::receive_whatsapp))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            ip_rate_limit_middleware,
        ));

    let public_routes = Router::new()
        .route("/password/verify-token", get(auth::verify_token))
        .route("/password/reset", post(auth::reset_password))
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live));

    let api = Router::new()
        .merge(public_routes)
        .merge(throttled_routes)
        .merge(protected_routes);

    Router::new()
        .nest("/api", api)
        .route("/metrics", get(metrics_handler))
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
        .layer(middleware::from_fn(security_headers_middleware)) // Security headers
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware)) // Prometheus metrics
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id)) // Request ID and logging
        .layer(cors)
        .with_state(state)
}
