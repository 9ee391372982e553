use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use uuid::Uuid;

use crate::auth;
use crate::intake::department_for;
use crate::models::{
    Comment, CommunityReport, Complaint, ComplaintDigest, ComplaintFact, ComplaintStatus,
    ComplaintWithOwner, Evidence, MostWanted, NewCommunityReport, NewComplaint, NewFeedback,
    Reward, RewardFact, RewardStatus, Role, StoreSnapshot, TagCount, UnknownVariant, User,
    UserProfile,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<UnknownVariant> for StoreError {
    fn from(err: UnknownVariant) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

const COMPLAINT_COLUMNS: &str = "c.id, c.complaint_type, c.description, c.status, \
     c.created_at, c.updated_at, c.user_id, c.latitude, c.longitude, \
     c.assigned_official_id, c.department, c.satisfaction_rating";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn parse_column<T>(row: &PgRow, column: &str) -> StoreResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.try_get(column)?;
    Ok(raw.parse()?)
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        national_id: row.try_get("national_id")?,
        role: parse_column(row, "role")?,
        name: row.try_get("name")?,
    })
}

fn complaint_from_row(row: &PgRow) -> StoreResult<Complaint> {
    Ok(Complaint {
        id: row.try_get("id")?,
        complaint_type: row.try_get("complaint_type")?,
        description: row.try_get("description")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        user_id: row.try_get("user_id")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        assigned_official_id: row.try_get("assigned_official_id")?,
        department: row.try_get("department")?,
        satisfaction_rating: row.try_get("satisfaction_rating")?,
    })
}

fn fact_from_row(row: &PgRow) -> StoreResult<ComplaintFact> {
    Ok(ComplaintFact {
        complaint_type: row.try_get("complaint_type")?,
        status: parse_column(row, "status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        department: row.try_get("department")?,
        satisfaction_rating: row.try_get("satisfaction_rating")?,
        assigned_official_id: row.try_get("assigned_official_id")?,
    })
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> StoreResult<Option<User>> {
    let row = sqlx::query(
        "SELECT id, email, password_hash, national_id, role, name \
         FROM complaint_portal.users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn find_user(pool: &PgPool, id: Uuid) -> StoreResult<Option<User>> {
    let row = sqlx::query(
        "SELECT id, email, password_hash, national_id, role, name \
         FROM complaint_portal.users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Users who can be assigned complaints, in name order.
pub async fn complaint_handlers(pool: &PgPool) -> StoreResult<Vec<UserProfile>> {
    let rows = sqlx::query(
        "SELECT id, email, password_hash, national_id, role, name \
         FROM complaint_portal.users WHERE role IN ('police', 'official') \
         ORDER BY name, id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| user_from_row(row).map(UserProfile::from))
        .collect()
}

pub async fn tag_counts_for_user(pool: &PgPool, user_id: Uuid) -> StoreResult<Vec<TagCount>> {
    let tags = sqlx::query_as::<_, TagCount>(
        "SELECT tag_type, COUNT(*) AS count FROM complaint_portal.user_tags \
         WHERE user_id = $1 GROUP BY tag_type ORDER BY tag_type",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(tags)
}

// ---------------------------------------------------------------------------
// Complaints
// ---------------------------------------------------------------------------

async fn insert_evidence(
    conn: &mut PgConnection,
    complaint_id: Uuid,
    file_names: &[String],
) -> Result<(), sqlx::Error> {
    for file_name in file_names {
        sqlx::query(
            "INSERT INTO complaint_portal.evidence (id, complaint_id, file_name) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::new_v4())
        .bind(complaint_id)
        .bind(file_name)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn create_complaint(
    pool: &PgPool,
    complaint: &NewComplaint,
    evidence: &[String],
) -> StoreResult<Complaint> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        INSERT INTO complaint_portal.complaints AS c
        (id, complaint_type, description, status, created_at, updated_at,
         user_id, latitude, longitude, department)
        VALUES ($1, $2, $3, $4, now(), now(), $5, $6, $7, $8)
        RETURNING c.id, c.complaint_type, c.description, c.status, c.created_at,
                  c.updated_at, c.user_id, c.latitude, c.longitude,
                  c.assigned_official_id, c.department, c.satisfaction_rating
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&complaint.complaint_type)
    .bind(&complaint.description)
    .bind(ComplaintStatus::Submitted.as_str())
    .bind(complaint.user_id)
    .bind(complaint.latitude)
    .bind(complaint.longitude)
    .bind(&complaint.department)
    .fetch_one(&mut *tx)
    .await?;
    let created = complaint_from_row(&row)?;

    insert_evidence(&mut tx, created.id, evidence).await?;
    tx.commit().await?;

    Ok(created)
}

pub async fn find_complaint(pool: &PgPool, id: Uuid) -> StoreResult<Option<Complaint>> {
    let query = format!("SELECT {COMPLAINT_COLUMNS} FROM complaint_portal.complaints c WHERE c.id = $1");
    let row = sqlx::query(&query).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(complaint_from_row).transpose()
}

pub async fn complaints_for_user(pool: &PgPool, user_id: Uuid) -> StoreResult<Vec<Complaint>> {
    let query = format!(
        "SELECT {COMPLAINT_COLUMNS} FROM complaint_portal.complaints c \
         WHERE c.user_id = $1 ORDER BY c.created_at DESC"
    );
    let rows = sqlx::query(&query).bind(user_id).fetch_all(pool).await?;
    rows.iter().map(complaint_from_row).collect()
}

pub async fn all_complaints_with_owner(pool: &PgPool) -> StoreResult<Vec<ComplaintWithOwner>> {
    let query = format!(
        "SELECT {COMPLAINT_COLUMNS}, u.name AS user_name \
         FROM complaint_portal.complaints c \
         JOIN complaint_portal.users u ON u.id = c.user_id \
         ORDER BY c.created_at DESC"
    );
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    rows.iter()
        .map(|row| -> StoreResult<ComplaintWithOwner> {
            Ok(ComplaintWithOwner {
                complaint: complaint_from_row(row)?,
                user_name: row.try_get("user_name")?,
            })
        })
        .collect()
}

pub async fn complaints_with_location(pool: &PgPool) -> StoreResult<Vec<Complaint>> {
    let query = format!(
        "SELECT {COMPLAINT_COLUMNS} FROM complaint_portal.complaints c \
         WHERE c.latitude IS NOT NULL AND c.longitude IS NOT NULL \
         ORDER BY c.created_at"
    );
    let rows = sqlx::query(&query).fetch_all(pool).await?;
    rows.iter().map(complaint_from_row).collect()
}

pub async fn complaint_digests(pool: &PgPool) -> StoreResult<Vec<ComplaintDigest>> {
    let rows = sqlx::query(
        "SELECT complaint_type, description, status, department \
         FROM complaint_portal.complaints ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> StoreResult<ComplaintDigest> {
            Ok(ComplaintDigest {
                complaint_type: row.try_get("complaint_type")?,
                description: row.try_get("description")?,
                status: parse_column(row, "status")?,
                department: row.try_get("department")?,
            })
        })
        .collect()
}

/// Records an official's comment.
///
/// The first official to comment is assigned the complaint together with the
/// department attributed from its type; bribery complaints also tag that
/// official. Open complaints move to In Progress. Returns `false` when the
/// complaint does not exist.
pub async fn add_official_comment(
    pool: &PgPool,
    complaint_id: Uuid,
    official_id: Uuid,
    body: &str,
    evidence: &[String],
) -> StoreResult<bool> {
    let mut tx = pool.begin().await?;

    let Some(row) = sqlx::query(
        "SELECT complaint_type, assigned_official_id FROM complaint_portal.complaints \
         WHERE id = $1 FOR UPDATE",
    )
    .bind(complaint_id)
    .fetch_optional(&mut *tx)
    .await?
    else {
        return Ok(false);
    };

    let complaint_type: String = row.try_get("complaint_type")?;
    let assigned: Option<Uuid> = row.try_get("assigned_official_id")?;

    insert_comment(&mut tx, complaint_id, official_id, body).await?;

    if assigned.is_none() {
        if complaint_type == "bribery" {
            sqlx::query(
                "INSERT INTO complaint_portal.user_tags (id, user_id, tag_type, complaint_id, created_at) \
                 VALUES ($1, $2, $3, $4, now())",
            )
            .bind(Uuid::new_v4())
            .bind(official_id)
            .bind("bribery_complaint")
            .bind(complaint_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "UPDATE complaint_portal.complaints SET assigned_official_id = $1, department = $2 \
             WHERE id = $3",
        )
        .bind(official_id)
        .bind(department_for(&complaint_type))
        .bind(complaint_id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "UPDATE complaint_portal.complaints SET status = $1, updated_at = now() \
         WHERE id = $2 AND status <> $3",
    )
    .bind(ComplaintStatus::InProgress.as_str())
    .bind(complaint_id)
    .bind(ComplaintStatus::Resolved.as_str())
    .execute(&mut *tx)
    .await?;

    insert_evidence(&mut tx, complaint_id, evidence).await?;
    tx.commit().await?;
    Ok(true)
}

/// Result of an attempt to resolve a complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    AlreadyResolved,
    NotFound,
}

impl CloseOutcome {
    /// Outcome decided by the current status alone, or `None` when the complaint can be closed.
    fn blocked_by(current: Option<ComplaintStatus>) -> Option<Self> {
        match current {
            None => Some(CloseOutcome::NotFound),
            Some(ComplaintStatus::Resolved) => Some(CloseOutcome::AlreadyResolved),
            Some(_) => None,
        }
    }
}

/// Resolves a complaint with a closing statement.
///
/// A complaint that is already resolved keeps its `updated_at` and gets no
/// second resolution comment.
pub async fn close_complaint(
    pool: &PgPool,
    complaint_id: Uuid,
    official_id: Uuid,
    resolution: &str,
    evidence: &[String],
) -> StoreResult<CloseOutcome> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query(
        "SELECT status FROM complaint_portal.complaints WHERE id = $1 FOR UPDATE",
    )
    .bind(complaint_id)
    .fetch_optional(&mut *tx)
    .await?
    .map(|row| parse_column::<ComplaintStatus>(&row, "status"))
    .transpose()?;

    if let Some(outcome) = CloseOutcome::blocked_by(current) {
        return Ok(outcome);
    }

    sqlx::query(
        "UPDATE complaint_portal.complaints \
         SET status = $1, updated_at = now(), \
             assigned_official_id = COALESCE(assigned_official_id, $2) \
         WHERE id = $3 AND status <> $1",
    )
    .bind(ComplaintStatus::Resolved.as_str())
    .bind(official_id)
    .bind(complaint_id)
    .execute(&mut *tx)
    .await?;

    insert_comment(&mut tx, complaint_id, official_id, &format!("RESOLUTION: {resolution}")).await?;
    insert_evidence(&mut tx, complaint_id, evidence).await?;
    tx.commit().await?;
    Ok(CloseOutcome::Closed)
}

async fn insert_comment(
    conn: &mut PgConnection,
    complaint_id: Uuid,
    user_id: Uuid,
    body: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO complaint_portal.comments (id, complaint_id, user_id, body, created_at) \
         VALUES ($1, $2, $3, $4, now())",
    )
    .bind(Uuid::new_v4())
    .bind(complaint_id)
    .bind(user_id)
    .bind(body)
    .execute(conn)
    .await?;
    Ok(())
}

/// Sets the owner's satisfaction rating. Only resolved complaints accept one.
pub async fn rate_complaint(
    pool: &PgPool,
    complaint_id: Uuid,
    owner_id: Uuid,
    rating: i32,
) -> StoreResult<bool> {
    let result = sqlx::query(
        "UPDATE complaint_portal.complaints SET satisfaction_rating = $1 \
         WHERE id = $2 AND user_id = $3 AND status = $4",
    )
    .bind(rating)
    .bind(complaint_id)
    .bind(owner_id)
    .bind(ComplaintStatus::Resolved.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn comments_for(pool: &PgPool, complaint_id: Uuid) -> StoreResult<Vec<Comment>> {
    let rows = sqlx::query(
        "SELECT cm.id, cm.complaint_id, cm.user_id, cm.body, cm.created_at, u.name, u.role \
         FROM complaint_portal.comments cm \
         JOIN complaint_portal.users u ON u.id = cm.user_id \
         WHERE cm.complaint_id = $1 ORDER BY cm.created_at",
    )
    .bind(complaint_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| -> StoreResult<Comment> {
            Ok(Comment {
                id: row.try_get("id")?,
                complaint_id: row.try_get("complaint_id")?,
                user_id: row.try_get("user_id")?,
                body: row.try_get("body")?,
                created_at: row.try_get("created_at")?,
                name: row.try_get("name")?,
                role: parse_column::<Role>(row, "role")?,
            })
        })
        .collect()
}

pub async fn evidence_for(pool: &PgPool, complaint_id: Uuid) -> StoreResult<Vec<Evidence>> {
    let evidence = sqlx::query_as::<_, Evidence>(
        "SELECT id, complaint_id, file_name FROM complaint_portal.evidence \
         WHERE complaint_id = $1 ORDER BY file_name",
    )
    .bind(complaint_id)
    .fetch_all(pool)
    .await?;
    Ok(evidence)
}

// ---------------------------------------------------------------------------
// Rewards, community and accountability tables
// ---------------------------------------------------------------------------

pub async fn create_reward(pool: &PgPool, complaint_id: Uuid, amount: i64) -> StoreResult<Reward> {
    let row = sqlx::query(
        "INSERT INTO complaint_portal.rewards (id, complaint_id, amount, status) \
         VALUES ($1, $2, $3, $4) RETURNING id, complaint_id, amount, status",
    )
    .bind(Uuid::new_v4())
    .bind(complaint_id)
    .bind(amount)
    .bind(RewardStatus::Pending.as_str())
    .fetch_one(pool)
    .await?;

    Ok(Reward {
        id: row.try_get("id")?,
        complaint_id: row.try_get("complaint_id")?,
        amount: row.try_get("amount")?,
        status: parse_column(&row, "status")?,
    })
}

pub async fn community_reports(pool: &PgPool) -> StoreResult<Vec<CommunityReport>> {
    let reports = sqlx::query_as::<_, CommunityReport>(
        "SELECT id, location, issue, severity, description, status, created_at \
         FROM complaint_portal.community_reports ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(reports)
}

pub async fn create_community_report(pool: &PgPool, report: &NewCommunityReport) -> StoreResult<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO complaint_portal.community_reports \
         (id, location, issue, severity, description, status, created_at) \
         VALUES ($1, $2, $3, $4, $5, 'Pending', now())",
    )
    .bind(id)
    .bind(&report.location)
    .bind(&report.issue)
    .bind(&report.severity)
    .bind(&report.description)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn create_feedback(pool: &PgPool, feedback: &NewFeedback) -> StoreResult<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO complaint_portal.feedback \
         (id, service_name, rating, comments, anonymous, created_at) \
         VALUES ($1, $2, $3, $4, $5, now())",
    )
    .bind(id)
    .bind(&feedback.service_name)
    .bind(feedback.rating)
    .bind(&feedback.comments)
    .bind(feedback.anonymous)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn active_most_wanted(pool: &PgPool) -> StoreResult<Vec<MostWanted>> {
    let entries = sqlx::query_as::<_, MostWanted>(
        "SELECT id, name, crime, description, last_seen, reward_amount, status, image_url \
         FROM complaint_portal.most_wanted WHERE status = 'Active' \
         ORDER BY reward_amount DESC, name",
    )
    .fetch_all(pool)
    .await?;
    Ok(entries)
}

pub async fn find_most_wanted(pool: &PgPool, id: Uuid) -> StoreResult<Option<MostWanted>> {
    let entry = sqlx::query_as::<_, MostWanted>(
        "SELECT id, name, crime, description, last_seen, reward_amount, status, image_url \
         FROM complaint_portal.most_wanted WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(entry)
}

pub async fn departments(pool: &PgPool) -> StoreResult<Vec<String>> {
    let rows = sqlx::query(
        "SELECT DISTINCT department FROM complaint_portal.officials ORDER BY department",
    )
    .fetch_all(pool)
    .await?;
    rows.iter()
        .map(|row| row.try_get("department").map_err(StoreError::from))
        .collect()
}

// ---------------------------------------------------------------------------
// Aggregation feed
// ---------------------------------------------------------------------------

async fn fetch_facts(conn: &mut PgConnection) -> StoreResult<Vec<ComplaintFact>> {
    let rows = sqlx::query(
        "SELECT complaint_type, status, created_at, updated_at, department, \
         satisfaction_rating, assigned_official_id \
         FROM complaint_portal.complaints ORDER BY created_at, id",
    )
    .fetch_all(conn)
    .await?;
    rows.iter().map(fact_from_row).collect()
}

pub async fn load_complaint_facts(pool: &PgPool) -> StoreResult<Vec<ComplaintFact>> {
    let mut conn = pool.acquire().await?;
    fetch_facts(&mut conn).await
}

/// Reads every table the dashboard summarizes over a single pooled connection.
pub async fn load_snapshot(pool: &PgPool) -> StoreResult<StoreSnapshot> {
    let mut conn = pool.acquire().await?;

    let complaints = fetch_facts(&mut conn).await?;

    let rewards = sqlx::query("SELECT amount, status FROM complaint_portal.rewards")
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(|row| -> StoreResult<RewardFact> {
            Ok(RewardFact {
                amount: row.try_get("amount")?,
                status: parse_column(row, "status")?,
            })
        })
        .collect::<StoreResult<Vec<_>>>()?;

    let feedback_ratings = sqlx::query_scalar::<_, i32>("SELECT rating FROM complaint_portal.feedback")
        .fetch_all(&mut *conn)
        .await?;
    let most_wanted_statuses =
        sqlx::query_scalar::<_, String>("SELECT status FROM complaint_portal.most_wanted")
            .fetch_all(&mut *conn)
            .await?;
    let community_report_statuses =
        sqlx::query_scalar::<_, String>("SELECT status FROM complaint_portal.community_reports")
            .fetch_all(&mut *conn)
            .await?;

    Ok(StoreSnapshot {
        complaints,
        rewards,
        feedback_ratings,
        most_wanted_statuses,
        community_report_statuses,
    })
}

// ---------------------------------------------------------------------------
// Seed and bulk import
// ---------------------------------------------------------------------------

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let password_hash = auth::hash_password("password123").context("failed to hash seed password")?;

    let users = vec![
        (
            Uuid::parse_str("6a1f3c2e-8d4b-4b7a-9e21-0f5c7d9a1b01")?,
            "citizen@example.com",
            "123456789012",
            Role::Citizen,
            "Rajesh Kumar",
        ),
        (
            Uuid::parse_str("6a1f3c2e-8d4b-4b7a-9e21-0f5c7d9a1b02")?,
            "police@example.com",
            "123456789013",
            Role::Police,
            "Inspector Sharma",
        ),
        (
            Uuid::parse_str("6a1f3c2e-8d4b-4b7a-9e21-0f5c7d9a1b03")?,
            "official@example.com",
            "123456789014",
            Role::Official,
            "Officer Singh",
        ),
    ];

    for (id, email, national_id, role, name) in &users {
        sqlx::query(
            r#"
            INSERT INTO complaint_portal.users (id, email, password_hash, national_id, role, name)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name, role = EXCLUDED.role
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(&password_hash)
        .bind(national_id)
        .bind(role.as_str())
        .bind(name)
        .execute(pool)
        .await?;
    }

    let citizen_id = users[0].0;
    let police_id = users[1].0;
    let now = Utc::now();

    let complaints = vec![
        (
            "seed-complaint-001",
            "bribery",
            "Officer asked for a payment of 5000 to approve license",
            ComplaintStatus::Resolved,
            now - Duration::days(6),
            now - Duration::days(2),
            Some((19.0760, 72.8777)),
            Some(police_id),
            Some(4),
        ),
        (
            "seed-complaint-002",
            "delay",
            "Passport application pending for 3 months",
            ComplaintStatus::InProgress,
            now - Duration::days(3),
            now - Duration::days(1),
            Some((28.6139, 77.2090)),
            None,
            None,
        ),
        (
            "seed-complaint-003",
            "nepotism",
            "Contract awarded to a relative of the ward officer",
            ComplaintStatus::Submitted,
            now,
            now,
            None,
            None,
            None,
        ),
    ];

    for (source_key, complaint_type, description, status, created_at, updated_at, location, assignee, rating) in
        complaints
    {
        sqlx::query(
            r#"
            INSERT INTO complaint_portal.complaints
            (id, complaint_type, description, status, created_at, updated_at, user_id,
             latitude, longitude, assigned_official_id, department, satisfaction_rating, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(complaint_type)
        .bind(description)
        .bind(status.as_str())
        .bind(created_at)
        .bind(updated_at)
        .bind(citizen_id)
        .bind(location.map(|(lat, _)| lat))
        .bind(location.map(|(_, lon)| lon))
        .bind(assignee)
        .bind(department_for(complaint_type))
        .bind(rating)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let rewarded = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM complaint_portal.complaints WHERE source_key = 'seed-complaint-001'",
    )
    .fetch_one(pool)
    .await?;
    sqlx::query(
        "INSERT INTO complaint_portal.rewards (id, complaint_id, amount, status, source_key) \
         VALUES ($1, $2, 5000, 'Distributed', 'seed-reward-001') ON CONFLICT (source_key) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(rewarded)
    .execute(pool)
    .await?;

    let most_wanted = vec![
        ("Vijay Mallya", "Financial Fraud", "Wanted for bank fraud and money laundering", "London, UK"),
        ("Nirav Modi", "Punjab National Bank Scam", "Wanted for bank fraud", "Unknown"),
        ("Mehul Choksi", "Punjab National Bank Scam", "Wanted for bank fraud", "Antigua"),
    ];
    for (name, crime, description, last_seen) in most_wanted {
        sqlx::query(
            r#"
            INSERT INTO complaint_portal.most_wanted
            (id, name, crime, description, last_seen, reward_amount, status)
            VALUES ($1, $2, $3, $4, $5, 5000000, 'Active')
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(crime)
        .bind(description)
        .bind(last_seen)
        .execute(pool)
        .await?;
    }

    let officials = vec![
        ("Rakesh Asthana", "Police", "Special Director", 85.5),
        ("Alok Verma", "Passport Office", "Director", 78.2),
    ];
    for (name, department, position, score) in officials {
        sqlx::query(
            r#"
            INSERT INTO complaint_portal.officials (id, name, department, position, performance_score)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(department)
        .bind(position)
        .bind(score)
        .execute(pool)
        .await?;
    }

    let reports = vec![
        ("seed-report-001", "Mumbai", "Bribe at RTO office", "High",
         "Officials asking for bribes to issue driving licenses", "Pending"),
        ("seed-report-002", "Delhi", "Harassment", "Medium",
         "Citizens being harassed by police for no reason", "Investigating"),
    ];
    for (source_key, location, issue, severity, description, status) in reports {
        sqlx::query(
            r#"
            INSERT INTO complaint_portal.community_reports
            (id, location, issue, severity, description, status, created_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, now(), $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(location)
        .bind(issue)
        .bind(severity)
        .bind(description)
        .bind(status)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let feedback = vec![
        ("seed-feedback-001", "Passport Office", 2, "Very slow service, staff not helpful", false),
        ("seed-feedback-002", "RTO", 4, "Process was smooth, but took longer than expected", true),
    ];
    for (source_key, service, rating, comments, anonymous) in feedback {
        sqlx::query(
            r#"
            INSERT INTO complaint_portal.feedback
            (id, service_name, rating, comments, anonymous, created_at, source_key)
            VALUES ($1, $2, $3, $4, $5, now(), $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(service)
        .bind(rating)
        .bind(comments)
        .bind(anonymous)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

#[derive(Debug, serde::Deserialize)]
pub struct ImportRow {
    pub citizen_email: String,
    pub complaint_type: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub department: Option<String>,
    pub satisfaction_rating: Option<i32>,
    pub source_key: Option<String>,
}

/// Checks an import row the same way intake would before it reaches the store.
pub fn validate_import_row(row: &ImportRow) -> anyhow::Result<ComplaintStatus> {
    let status: ComplaintStatus = row.status.trim().parse()?;

    if let Some(rating) = row.satisfaction_rating {
        if !(1..=5).contains(&rating) {
            anyhow::bail!("satisfaction rating {rating} is outside 1-5");
        }
        if status != ComplaintStatus::Resolved {
            anyhow::bail!("only resolved complaints can carry a satisfaction rating");
        }
    }

    if let Some(updated_at) = row.updated_at {
        if updated_at < row.created_at {
            anyhow::bail!("updated_at precedes created_at");
        }
    }

    Ok(status)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<ImportRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("line {line}: malformed row"))?;
        let status = validate_import_row(&row).with_context(|| format!("line {line}: invalid row"))?;

        let citizen = find_user_by_email(pool, &row.citizen_email)
            .await?
            .with_context(|| format!("line {line}: unknown citizen {}", row.citizen_email))?;

        let source_key = row
            .source_key
            .clone()
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        let department = row
            .department
            .clone()
            .unwrap_or_else(|| department_for(&row.complaint_type).to_string());

        let result = sqlx::query(
            r#"
            INSERT INTO complaint_portal.complaints
            (id, complaint_type, description, status, created_at, updated_at, user_id,
             department, satisfaction_rating, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.complaint_type)
        .bind(&row.description)
        .bind(status.as_str())
        .bind(row.created_at)
        .bind(row.updated_at.unwrap_or(row.created_at))
        .bind(citizen.id)
        .bind(department)
        .bind(row.satisfaction_rating)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    tracing::info!(inserted, path = %csv_path.display(), "complaint import finished");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn import_row(status: &str, rating: Option<i32>) -> ImportRow {
        let created_at = Utc::now() - Duration::days(4);
        ImportRow {
            citizen_email: "citizen@example.com".into(),
            complaint_type: "bribery".into(),
            description: "Clerk demanded cash".into(),
            status: status.into(),
            created_at,
            updated_at: Some(created_at + Duration::days(2)),
            department: None,
            satisfaction_rating: rating,
            source_key: Some("csv-1".into()),
        }
    }

    #[test]
    fn resolved_rows_may_carry_ratings() {
        let status = validate_import_row(&import_row("Resolved", Some(5))).unwrap();
        assert_eq!(status, ComplaintStatus::Resolved);
    }

    #[test]
    fn ratings_on_open_complaints_are_rejected() {
        assert!(validate_import_row(&import_row("In Progress", Some(3))).is_err());
        assert!(validate_import_row(&import_row("Resolved", Some(9))).is_err());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = validate_import_row(&import_row("Closed", None)).unwrap_err();
        assert!(err.to_string().contains("Closed"));
    }

    #[test]
    fn only_open_complaints_can_be_closed() {
        assert_eq!(CloseOutcome::blocked_by(None), Some(CloseOutcome::NotFound));
        assert_eq!(
            CloseOutcome::blocked_by(Some(ComplaintStatus::Resolved)),
            Some(CloseOutcome::AlreadyResolved)
        );
        assert_eq!(CloseOutcome::blocked_by(Some(ComplaintStatus::Submitted)), None);
        assert_eq!(CloseOutcome::blocked_by(Some(ComplaintStatus::InProgress)), None);
    }

    #[test]
    fn unknown_enum_text_becomes_corrupt_store_error() {
        let err = StoreError::from("Lost".parse::<ComplaintStatus>().unwrap_err());
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
