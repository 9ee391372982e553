use std::collections::HashMap;
use std::path::Path as FsPath;

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{AuthUser, OfficialUser};
use crate::db::{self, CloseOutcome};
use crate::error::ApiError;
use crate::intake::{IntakeReceipt, IntakeRequest};
use crate::models::{
    Comment, Complaint, ComplaintStatus, ComplaintWithOwner, Evidence, Role, TagCount,
};
use crate::server::AppState;

const EVIDENCE_FIELD: &str = "evidence";

/// Evidence held in memory until the store has accepted the request.
#[derive(Debug)]
struct PendingUpload {
    stored_name: String,
    bytes: Bytes,
}

/// Text fields and buffered evidence from a multipart submission.
#[derive(Debug, Default)]
pub struct SubmittedForm {
    fields: HashMap<String, String>,
    uploads: Vec<PendingUpload>,
}

impl SubmittedForm {
    /// Names the evidence will be stored under once written.
    fn evidence_names(&self) -> Vec<String> {
        self.uploads
            .iter()
            .map(|upload| upload.stored_name.clone())
            .collect()
    }

    /// Writes buffered evidence to `upload_dir`. Called only after the store write succeeded.
    async fn write_uploads(self, upload_dir: &FsPath) -> Result<(), ApiError> {
        for upload in self.uploads {
            tokio::fs::write(upload_dir.join(&upload.stored_name), &upload.bytes)
                .await
                .map_err(|err| ApiError::Internal(format!("failed to store evidence: {err}")))?;
        }
        Ok(())
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> Result<&str, ApiError> {
        self.text(name)
            .ok_or_else(|| ApiError::BadRequest(format!("Missing field: {name}")))
    }

    fn coordinate(&self, name: &str) -> Result<Option<f64>, ApiError> {
        self.text(name)
            .map(|raw| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| ApiError::BadRequest(format!("Invalid {name}: {raw}")))
            })
            .transpose()
    }
}

/// Reduces an uploaded file name to a safe basename.
pub fn sanitize_file_name(original: &str) -> Option<String> {
    let base = original.rsplit(|ch| ch == '/' || ch == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter_map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => Some(ch),
            ' ' => Some('_'),
            _ => None,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

async fn read_form(mut multipart: Multipart) -> Result<SubmittedForm, ApiError> {
    let mut form = SubmittedForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name != EVIDENCE_FIELD {
            let value = field
                .text()
                .await
                .map_err(|err| ApiError::BadRequest(err.to_string()))?;
            form.fields.insert(name, value);
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;
        if original.is_empty() && bytes.is_empty() {
            continue;
        }

        let safe_name = sanitize_file_name(&original)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid evidence file name: {original}")))?;
        form.uploads.push(PendingUpload {
            stored_name: format!("{}_{}", Uuid::new_v4().simple(), safe_name),
            bytes,
        });
    }

    Ok(form)
}

/// Loads a complaint the caller may see: citizens only their own.
async fn visible_complaint(state: &AppState, user: AuthUser, id: Uuid) -> Result<Complaint, ApiError> {
    let complaint = db::find_complaint(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Complaint".into()))?;
    if user.role == Role::Citizen && complaint.user_id != user.id {
        return Err(ApiError::Forbidden);
    }
    Ok(complaint)
}

pub async fn submit_complaint(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<IntakeReceipt>), ApiError> {
    let form = read_form(multipart).await?;

    let request = IntakeRequest {
        complaint_type: form.required("type")?.to_lowercase(),
        description: form.required("description")?.to_string(),
        latitude: form.coordinate("latitude")?,
        longitude: form.coordinate("longitude")?,
        evidence: form.evidence_names(),
    };

    let citizen = db::find_user(&state.pool, user.id)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let receipt = state.intake.submit(&state.pool, &citizen, request).await?;
    form.write_uploads(&state.config.upload_dir).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn get_complaint(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Complaint>, ApiError> {
    db::find_complaint(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Complaint".into()))
}

pub async fn user_complaints(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    Ok(Json(db::complaints_for_user(&state.pool, user.id).await?))
}

pub async fn police_complaints(
    State(state): State<AppState>,
    _official: OfficialUser,
) -> Result<Json<Vec<ComplaintWithOwner>>, ApiError> {
    Ok(Json(db::all_complaints_with_owner(&state.pool).await?))
}

pub async fn add_comment(
    State(state): State<AppState>,
    OfficialUser(official): OfficialUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = read_form(multipart).await?;
    let body = form.required("comment")?;

    if !db::add_official_comment(&state.pool, id, official.id, body, &form.evidence_names()).await? {
        return Err(ApiError::NotFound("Complaint".into()));
    }
    form.write_uploads(&state.config.upload_dir).await?;
    tracing::info!(complaint_id = %id, official_id = %official.id, "official comment added");
    Ok(Json(json!({ "success": true })))
}

pub async fn close_complaint(
    State(state): State<AppState>,
    OfficialUser(official): OfficialUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let form = read_form(multipart).await?;
    let resolution = form.required("resolution")?;

    let outcome =
        db::close_complaint(&state.pool, id, official.id, resolution, &form.evidence_names()).await?;
    close_result(outcome)?;
    form.write_uploads(&state.config.upload_dir).await?;
    tracing::info!(complaint_id = %id, official_id = %official.id, "complaint resolved");
    Ok(Json(json!({ "success": true })))
}

fn close_result(outcome: CloseOutcome) -> Result<(), ApiError> {
    match outcome {
        CloseOutcome::Closed => Ok(()),
        CloseOutcome::AlreadyResolved => {
            Err(ApiError::BadRequest("Complaint is already resolved".into()))
        }
        CloseOutcome::NotFound => Err(ApiError::NotFound("Complaint".into())),
    }
}

pub async fn comments(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    visible_complaint(&state, user, id).await?;
    Ok(Json(db::comments_for(&state.pool, id).await?))
}

pub async fn evidence(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Evidence>>, ApiError> {
    visible_complaint(&state, user, id).await?;
    Ok(Json(db::evidence_for(&state.pool, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i32,
}

pub async fn rate_complaint(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RatingRequest>,
) -> Result<Json<Value>, ApiError> {
    if !(1..=5).contains(&req.rating) {
        return Err(ApiError::BadRequest("Rating must be between 1 and 5".into()));
    }

    let complaint = db::find_complaint(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Complaint".into()))?;
    if complaint.user_id != user.id {
        return Err(ApiError::Forbidden);
    }
    if complaint.status != ComplaintStatus::Resolved {
        return Err(ApiError::BadRequest("Only resolved complaints can be rated".into()));
    }

    // Owner and status are checked again inside the UPDATE.
    if !db::rate_complaint(&state.pool, id, user.id, req.rating).await? {
        return Err(ApiError::BadRequest("Only resolved complaints can be rated".into()));
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn user_tags(
    State(state): State<AppState>,
    _official: OfficialUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<TagCount>>, ApiError> {
    Ok(Json(db::tag_counts_for_user(&state.pool, user_id).await?))
}

pub async fn complaints_with_location(
    State(state): State<AppState>,
) -> Result<Json<Vec<Complaint>>, ApiError> {
    Ok(Json(db::complaints_with_location(&state.pool).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_reduced_to_safe_basenames() {
        assert_eq!(sanitize_file_name("receipt.pdf").as_deref(), Some("receipt.pdf"));
        assert_eq!(
            sanitize_file_name("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_file_name("C:\\Users\\me\\bribe photo.jpg").as_deref(),
            Some("bribe_photo.jpg")
        );
        assert_eq!(sanitize_file_name(".hidden").as_deref(), Some("hidden"));
        assert_eq!(sanitize_file_name("..").as_deref(), None);
        assert_eq!(sanitize_file_name("").as_deref(), None);
    }

    #[test]
    fn closing_outcomes_map_to_responses() {
        assert!(close_result(CloseOutcome::Closed).is_ok());
        assert!(matches!(
            close_result(CloseOutcome::AlreadyResolved),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            close_result(CloseOutcome::NotFound),
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn buffered_evidence_is_written_only_on_request() {
        let dir = std::env::temp_dir().join(format!("portal-uploads-{}", Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let form = SubmittedForm {
            fields: HashMap::new(),
            uploads: vec![PendingUpload {
                stored_name: "abc_receipt.pdf".into(),
                bytes: Bytes::from_static(b"%PDF"),
            }],
        };
        assert_eq!(form.evidence_names(), vec!["abc_receipt.pdf".to_string()]);
        assert!(!dir.join("abc_receipt.pdf").exists());

        form.write_uploads(&dir).await.unwrap();
        assert_eq!(tokio::fs::read(dir.join("abc_receipt.pdf")).await.unwrap(), b"%PDF");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn form_fields_are_trimmed_and_validated() {
        let mut form = SubmittedForm::default();
        form.fields.insert("type".into(), "  bribery ".into());
        form.fields.insert("description".into(), "   ".into());
        form.fields.insert("latitude".into(), "19.07".into());
        form.fields.insert("longitude".into(), "east".into());

        assert_eq!(form.required("type").unwrap(), "bribery");
        assert!(matches!(form.required("description"), Err(ApiError::BadRequest(_))));
        assert_eq!(form.coordinate("latitude").unwrap(), Some(19.07));
        assert!(form.coordinate("longitude").is_err());
        assert_eq!(form.coordinate("altitude").unwrap(), None);
    }
}
