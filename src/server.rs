use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::{self, TokenKeys};
use crate::config::Config;
use crate::intake::Intake;
use crate::{community, complaints, insights};

const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

/// Shared per-process state; the pool hands each request its own connection.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: PgPool,
    pub intake: Intake,
    pub tokens: Arc<TokenKeys>,
}

pub fn router(state: AppState) -> anyhow::Result<Router> {
    let origin: HeaderValue = state
        .config
        .cors_origin
        .parse()
        .with_context(|| format!("invalid CORS_ORIGIN {:?}", state.config.cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);
    let uploads = ServeDir::new(&state.config.upload_dir);

    let router = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/login", post(auth::login))
        // Complaints
        .route("/api/complaints", post(complaints::submit_complaint))
        .route("/api/complaints/:id", get(complaints::get_complaint))
        .route("/api/complaints/:id/comments", get(complaints::comments))
        .route("/api/complaints/:id/evidence", get(complaints::evidence))
        .route("/api/complaints/:id/rate", post(complaints::rate_complaint))
        .route("/api/user/complaints", get(complaints::user_complaints))
        .route("/api/complaints-with-location", get(complaints::complaints_with_location))
        // Triage
        .route("/api/police/complaints", get(complaints::police_complaints))
        .route("/api/police/complaints/:id/comment", post(complaints::add_comment))
        .route("/api/police/complaints/:id/close", post(complaints::close_complaint))
        .route("/api/users/:id/tags", get(complaints::user_tags))
        .route("/api/rewards", post(community::create_reward))
        // Analytics
        .route("/api/dashboard", get(insights::dashboard))
        .route("/api/integrity-index", get(insights::integrity_index))
        .route("/api/risk-analysis", get(insights::risk_analysis))
        .route("/api/anomalies", get(insights::anomalies))
        .route("/api/complaints-by-type", get(insights::complaints_by_type))
        .route("/api/trend-data", get(insights::trend_data))
        .route("/api/resolution-time", get(insights::resolution_time))
        .route("/api/official-performance", get(insights::official_performance))
        .route("/api/departments", get(insights::departments))
        .route(
            "/api/department-performance/:department",
            get(insights::department_performance),
        )
        .route("/api/systemic-flaw-analysis", get(insights::systemic_flaw_analysis))
        // Community
        .route(
            "/api/community-reports",
            get(community::community_reports).post(community::submit_community_report),
        )
        .route("/api/services", get(community::services))
        .route("/api/feedback", post(community::submit_feedback))
        .route("/api/most-wanted", get(community::most_wanted))
        .route("/api/most-wanted/:id", get(community::most_wanted_details))
        .route("/api/legal-guidance", post(community::legal_guidance))
        .route("/api/protection-assessment", post(community::protection_assessment))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(router)
}

pub async fn serve(config: Config, pool: PgPool) -> anyhow::Result<()> {
    let tokens = TokenKeys::new(config.require_jwt_secret()?, config.jwt_expiry_hours);
    let intake = Intake::from_config(&config)?;

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("failed to create {}", config.upload_dir.display()))?;

    let bind_address = config.bind_address.clone();
    let state = AppState {
        config: Arc::new(config),
        pool,
        intake,
        tokens: Arc::new(tokens),
    };
    let app = router(state)?;

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!(address = %bind_address, "complaint portal listening");

    axum::serve(listener, app).await?;
    Ok(())
}
