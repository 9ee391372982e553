use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::analytics;
use crate::auth::OfficialUser;
use crate::db;
use crate::error::ApiError;
use crate::models::{
    Anomaly, ChartSeries, DashboardSummary, DepartmentPerformance, DepartmentStat,
    OfficialPerformance, TypeRisk,
};
use crate::server::AppState;

pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardSummary>, ApiError> {
    let snapshot = db::load_snapshot(&state.pool).await?;
    Ok(Json(analytics::dashboard_summary(&snapshot)))
}

pub async fn integrity_index(
    State(state): State<AppState>,
) -> Result<Json<Vec<DepartmentStat>>, ApiError> {
    let facts = db::load_complaint_facts(&state.pool).await?;
    Ok(Json(analytics::integrity_index(&facts)))
}

pub async fn risk_analysis(State(state): State<AppState>) -> Result<Json<Vec<TypeRisk>>, ApiError> {
    let facts = db::load_complaint_facts(&state.pool).await?;
    Ok(Json(analytics::risk_by_type(&facts)))
}

pub async fn anomalies(State(state): State<AppState>) -> Result<Json<Vec<Anomaly>>, ApiError> {
    let facts = db::load_complaint_facts(&state.pool).await?;
    Ok(Json(analytics::detect_anomalies(&facts, analytics::today())))
}

pub async fn complaints_by_type(
    State(state): State<AppState>,
) -> Result<Json<ChartSeries<i64>>, ApiError> {
    let facts = db::load_complaint_facts(&state.pool).await?;
    Ok(Json(
        analytics::complaints_by_type(&facts)
            .into_iter()
            .map(|entry| (entry.complaint_type, entry.count))
            .collect(),
    ))
}

pub async fn trend_data(State(state): State<AppState>) -> Result<Json<ChartSeries<i64>>, ApiError> {
    let facts = db::load_complaint_facts(&state.pool).await?;
    Ok(Json(
        analytics::daily_trend(&facts, analytics::today())
            .into_iter()
            .map(|day| (day.date.to_string(), day.count))
            .collect(),
    ))
}

pub async fn resolution_time(
    State(state): State<AppState>,
) -> Result<Json<ChartSeries<f64>>, ApiError> {
    let facts = db::load_complaint_facts(&state.pool).await?;
    Ok(Json(
        analytics::resolution_times(&facts)
            .into_iter()
            .map(|entry| (entry.complaint_type, entry.avg_days))
            .collect(),
    ))
}

pub async fn official_performance(
    State(state): State<AppState>,
) -> Result<Json<Vec<OfficialPerformance>>, ApiError> {
    let officials = db::complaint_handlers(&state.pool).await?;
    let facts = db::load_complaint_facts(&state.pool).await?;
    Ok(Json(analytics::official_performance(&facts, &officials)))
}

pub async fn departments(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(db::departments(&state.pool).await?))
}

pub async fn department_performance(
    State(state): State<AppState>,
    Path(department): Path<String>,
) -> Result<Json<DepartmentPerformance>, ApiError> {
    let facts = db::load_complaint_facts(&state.pool).await?;
    Ok(Json(analytics::department_performance(&facts, &department)))
}

pub async fn systemic_flaw_analysis(
    State(state): State<AppState>,
    _official: OfficialUser,
) -> Result<Json<Value>, ApiError> {
    let digests = db::complaint_digests(&state.pool).await?;
    let analysis = state.intake.systemic_flaws(&digests).await;
    Ok(Json(json!({ "analysis": analysis })))
}
