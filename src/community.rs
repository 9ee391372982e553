use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::OfficialUser;
use crate::db;
use crate::error::ApiError;
use crate::guidance::{self, LegalGuidance, ProtectionAssessment, Service};
use crate::models::{CommunityReport, MostWanted, NewCommunityReport, NewFeedback, Reward};
use crate::server::AppState;

fn require_text(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("Missing field: {field}")));
    }
    Ok(())
}

pub async fn community_reports(
    State(state): State<AppState>,
) -> Result<Json<Vec<CommunityReport>>, ApiError> {
    Ok(Json(db::community_reports(&state.pool).await?))
}

pub async fn submit_community_report(
    State(state): State<AppState>,
    Json(report): Json<NewCommunityReport>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_text(&report.location, "location")?;
    require_text(&report.issue, "issue")?;
    require_text(&report.description, "description")?;

    let report = NewCommunityReport {
        description: state.intake.redact(&report.description),
        ..report
    };
    let id = db::create_community_report(&state.pool, &report).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id, "status": "submitted" }))))
}

pub async fn services() -> Json<Vec<Service>> {
    Json(guidance::services())
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(feedback): Json<NewFeedback>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_text(&feedback.service_name, "service")?;
    if !(1..=5).contains(&feedback.rating) {
        return Err(ApiError::BadRequest("Rating must be between 1 and 5".into()));
    }

    let id = db::create_feedback(&state.pool, &feedback).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id, "status": "submitted" }))))
}

pub async fn most_wanted(State(state): State<AppState>) -> Result<Json<Vec<MostWanted>>, ApiError> {
    Ok(Json(db::active_most_wanted(&state.pool).await?))
}

pub async fn most_wanted_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MostWanted>, ApiError> {
    db::find_most_wanted(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Criminal".into()))
}

#[derive(Debug, Deserialize)]
pub struct RewardRequest {
    pub complaint_id: Uuid,
    pub amount: i64,
}

pub async fn create_reward(
    State(state): State<AppState>,
    _official: OfficialUser,
    Json(req): Json<RewardRequest>,
) -> Result<(StatusCode, Json<Reward>), ApiError> {
    if req.amount < 0 {
        return Err(ApiError::BadRequest("Reward amount cannot be negative".into()));
    }
    if db::find_complaint(&state.pool, req.complaint_id).await?.is_none() {
        return Err(ApiError::NotFound("Complaint".into()));
    }

    let reward = db::create_reward(&state.pool, req.complaint_id, req.amount).await?;
    Ok((StatusCode::CREATED, Json(reward)))
}

#[derive(Debug, Deserialize)]
pub struct GuidanceRequest {
    #[serde(rename = "type", default)]
    pub complaint_type: String,
}

pub async fn legal_guidance(Json(req): Json<GuidanceRequest>) -> Json<LegalGuidance> {
    Json(guidance::legal_guidance(&req.complaint_type))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionRequest {
    pub anonymity_level: Option<String>,
    #[serde(default)]
    pub complaint_type: Option<String>,
}

pub async fn protection_assessment(Json(req): Json<ProtectionRequest>) -> Json<ProtectionAssessment> {
    Json(guidance::protection_assessment(
        req.anonymity_level.as_deref(),
        req.complaint_type.as_deref().unwrap_or_default(),
    ))
}
