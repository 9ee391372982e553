use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Police,
    Official,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Police => "police",
            Role::Official => "official",
        }
    }

    /// Police officers and officials may triage and close complaints.
    pub fn handles_complaints(self) -> bool {
        matches!(self, Role::Police | Role::Official)
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "citizen" => Ok(Role::Citizen),
            "police" => Ok(Role::Police),
            "official" => Ok(Role::Official),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplaintStatus {
    Submitted,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl ComplaintStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplaintStatus::Submitted => "Submitted",
            ComplaintStatus::InProgress => "In Progress",
            ComplaintStatus::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplaintStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Submitted" => Ok(ComplaintStatus::Submitted),
            "In Progress" => Ok(ComplaintStatus::InProgress),
            "Resolved" => Ok(ComplaintStatus::Resolved),
            other => Err(UnknownVariant {
                kind: "complaint status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardStatus {
    Pending,
    Distributed,
}

impl RewardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardStatus::Pending => "Pending",
            RewardStatus::Distributed => "Distributed",
        }
    }
}

impl FromStr for RewardStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Pending" => Ok(RewardStatus::Pending),
            "Distributed" => Ok(RewardStatus::Distributed),
            other => Err(UnknownVariant {
                kind: "reward status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub national_id: Option<String>,
    pub role: Role,
    pub name: String,
}

/// User as returned to clients, without credentials.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub national_id: Option<String>,
    pub role: Role,
    pub name: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            national_id: user.national_id,
            role: user.role,
            name: user.name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Complaint {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub complaint_type: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub assigned_official_id: Option<Uuid>,
    pub department: Option<String>,
    pub satisfaction_rating: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplaintWithOwner {
    #[serde(flatten)]
    pub complaint: Complaint,
    pub user_name: String,
}

#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub complaint_type: String,
    pub description: String,
    pub user_id: Uuid,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub department: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Evidence {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TagCount {
    pub tag_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reward {
    pub id: Uuid,
    pub complaint_id: Uuid,
    pub amount: i64,
    pub status: RewardStatus,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MostWanted {
    pub id: Uuid,
    pub name: String,
    pub crime: String,
    pub description: String,
    pub last_seen: Option<String>,
    pub reward_amount: i64,
    pub status: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommunityReport {
    pub id: Uuid,
    pub location: String,
    pub issue: String,
    pub severity: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCommunityReport {
    pub location: String,
    pub issue: String,
    pub severity: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    #[serde(rename = "service")]
    pub service_name: String,
    pub rating: i32,
    pub comments: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
}

/// Complaint columns consumed by the aggregation functions.
#[derive(Debug, Clone)]
pub struct ComplaintFact {
    pub complaint_type: String,
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub department: Option<String>,
    pub satisfaction_rating: Option<i32>,
    pub assigned_official_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct RewardFact {
    pub amount: i64,
    pub status: RewardStatus,
}

/// Everything the dashboard reads, loaded in one pass and released before aggregation.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub complaints: Vec<ComplaintFact>,
    pub rewards: Vec<RewardFact>,
    pub feedback_ratings: Vec<i32>,
    pub most_wanted_statuses: Vec<String>,
    pub community_report_statuses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_complaints: i64,
    pub resolved_complaints: i64,
    pub in_progress_complaints: i64,
    pub submitted_complaints: i64,
    pub rewards_distributed: i64,
    pub most_wanted_count: i64,
    pub pending_reports: i64,
    pub avg_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentStat {
    pub department: String,
    pub total_complaints: i64,
    pub resolved_complaints: i64,
    pub avg_satisfaction: Option<f64>,
    pub integrity_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeRisk {
    #[serde(rename = "type")]
    pub complaint_type: String,
    pub total: i64,
    pub resolved: i64,
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnomalySeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub date: NaiveDate,
    pub count: i64,
    pub severity: AnomalySeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionTime {
    #[serde(rename = "type")]
    pub complaint_type: String,
    pub avg_days: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub complaint_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfficialPerformance {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub assigned_complaints: i64,
    pub resolved: i64,
    pub resolution_rate: f64,
    pub avg_resolution_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentPerformance {
    pub department: String,
    pub total_complaints: i64,
    pub resolved: i64,
    pub resolution_rate: f64,
    pub avg_resolution_time: f64,
    pub satisfaction: f64,
}

/// Parallel label/value arrays, the shape chart widgets consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries<T> {
    pub labels: Vec<String>,
    pub data: Vec<T>,
}

impl<T> FromIterator<(String, T)> for ChartSeries<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let (labels, data) = iter.into_iter().unzip();
        Self { labels, data }
    }
}

/// Condensed complaint used when asking the analyzer for systemic patterns.
#[derive(Debug, Clone, Serialize)]
pub struct ComplaintDigest {
    #[serde(rename = "type")]
    pub complaint_type: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub department: Option<String>,
}
