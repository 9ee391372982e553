use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as Email, Tokio1Executor};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::db::{self, StoreError};
use crate::models::{ComplaintDigest, ComplaintStatus, NewComplaint, User};

const EXTERNAL_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Department that handles a complaint type by default.
pub fn department_for(complaint_type: &str) -> &'static str {
    match complaint_type {
        "bribery" | "harassment" => "Police",
        "delay" => "Passport Office",
        "nepotism" => "Municipal Corporation",
        "embezzlement" => "Finance Ministry",
        _ => "General Administration",
    }
}

// ---------------------------------------------------------------------------
// Redaction
// ---------------------------------------------------------------------------

pub trait Redactor: Send + Sync {
    fn redact(&self, text: &str) -> String;
}

/// Replaces recognisable personal identifiers with `<ENTITY_TYPE>` placeholders.
pub struct PatternRedactor {
    patterns: Vec<(Regex, &'static str)>,
}

impl PatternRedactor {
    pub fn new() -> Result<Self, regex::Error> {
        // Longer digit runs go first so a card number is not read as an ID.
        let patterns = vec![
            (
                Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")?,
                "<EMAIL_ADDRESS>",
            ),
            (Regex::new(r"\b(?:\d[ -]?){12,15}\d\b")?, "<CREDIT_CARD>"),
            (Regex::new(r"\b\d{4}[ -]?\d{4}[ -]?\d{4}\b")?, "<IN_AADHAAR>"),
            (
                Regex::new(r"(?:\+\d{1,3}[ -]?)?\b\d{3}[ -]?\d{3}[ -]?\d{4}\b")?,
                "<PHONE_NUMBER>",
            ),
        ];
        Ok(Self { patterns })
    }
}

impl Redactor for PatternRedactor {
    fn redact(&self, text: &str) -> String {
        self.patterns
            .iter()
            .fold(text.to_string(), |acc, (pattern, placeholder)| {
                pattern.replace_all(&acc, *placeholder).into_owned()
            })
    }
}

// ---------------------------------------------------------------------------
// Language-model analysis
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("analysis service is not configured")]
    Unconfigured,

    #[error("analysis request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("analysis service returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, prompt: &str) -> Result<String, AnalysisError>;
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

impl GeminiAnalyzer {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    async fn analyze(&self, prompt: &str) -> Result<String, AnalysisError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response: GenerateResponse = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.text().ok_or(AnalysisError::EmptyResponse)
    }
}

/// Stand-in used when no API key is configured.
pub struct UnconfiguredAnalyzer;

#[async_trait]
impl Analyzer for UnconfiguredAnalyzer {
    async fn analyze(&self, _prompt: &str) -> Result<String, AnalysisError> {
        Err(AnalysisError::Unconfigured)
    }
}

pub fn complaint_prompt(description: &str) -> String {
    format!(
        "Analyze the following corruption complaint and provide:\n\
         1. Intent (e.g., bribery request, service delay, harassment)\n\
         2. Severity (low, medium, high)\n\
         3. Suggested action (e.g., file FIR, RTI, departmental complaint)\n\n\
         Complaint: {description}\n"
    )
}

pub fn systemic_flaw_prompt(complaints_json: &str) -> String {
    format!(
        "As a systemic flaw analyst, identify root causes and process vulnerabilities \
         from a list of corruption complaints.\n\
         Look for clusters of similar issues (same complaint type, same department, \
         recurring keywords) and identify 1-3 potential systemic flaws.\n\
         For each flaw provide:\n\
         1. Flaw Description: a brief summary of the recurring problem.\n\
         2. Evidence: the complaint types or keywords that point to this flaw.\n\
         3. Policy Recommendation: a concrete, actionable policy change.\n\n\
         Complaints Data: {complaints_json}\n"
    )
}

fn analysis_text(result: Result<String, AnalysisError>) -> String {
    match result {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, "complaint analysis failed");
            format!("Error analyzing complaint: {err}")
        }
    }
}

pub fn fir_draft(complaint_type: &str, redacted_description: &str, analysis: &str) -> String {
    format!(
        "FIR DRAFT\n\n\
         Complaint Type: {complaint_type}\n\
         Description: {redacted_description}\n\n\
         Analysis: {analysis}\n\n\
         This is an auto-generated FIR draft based on the complaint submitted.\n"
    )
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build mail: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), NotifyError>;
}

/// Sends plain-text mail over SMTP with STARTTLS.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .timeout(Some(EXTERNAL_CALL_TIMEOUT))
            .build();
        Ok(Self {
            transport,
            from: username.parse()?,
        })
    }
}

/// Builds the outgoing mail for `message`.
pub fn build_email(from: &Mailbox, message: &Message) -> Result<Email, NotifyError> {
    let email = Email::builder()
        .from(from.clone())
        .to(message.to.parse()?)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())?;
    Ok(email)
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, message: Message) -> Result<(), NotifyError> {
        let email = build_email(&self.from, &message)?;
        self.transport.send(email).await?;
        tracing::info!(to = %message.to, "confirmation sent");
        Ok(())
    }
}

/// Logs and drops messages; used when SMTP credentials are not configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: Message) -> Result<(), NotifyError> {
        tracing::warn!(
            to = %message.to,
            subject = %message.subject,
            "EMAIL_USER or EMAIL_PASSWORD not set, skipping notification"
        );
        Ok(())
    }
}

pub fn confirmation_message(to: &str, complaint_id: Uuid, fir_draft: &str) -> Message {
    Message {
        to: to.to_string(),
        subject: format!("Complaint Registered Successfully (ID: {complaint_id})"),
        body: format!(
            "Dear Citizen,\n\n\
             Thank you for submitting your complaint. It has been registered with the ID: {complaint_id}.\n\n\
             Please find a copy of the auto-generated preliminary FIR draft below for your records.\n\
             --------------------------------------------------\n\
             {fir_draft}\n\
             --------------------------------------------------\n\n\
             We will keep you updated on the progress.\n"
        ),
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct IntakeRequest {
    pub complaint_type: String,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntakeReceipt {
    pub id: Uuid,
    pub status: ComplaintStatus,
    pub analysis: String,
    pub fir_draft: String,
}

/// Redaction, analysis, persistence and notification for new complaints.
#[derive(Clone)]
pub struct Intake {
    redactor: Arc<dyn Redactor>,
    analyzer: Arc<dyn Analyzer>,
    notifier: Arc<dyn Notifier>,
}

impl Intake {
    pub fn new(
        redactor: Arc<dyn Redactor>,
        analyzer: Arc<dyn Analyzer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            redactor,
            analyzer,
            notifier,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(EXTERNAL_CALL_TIMEOUT)
            .build()?;

        let analyzer: Arc<dyn Analyzer> = match &config.gemini_api_key {
            Some(key) => Arc::new(GeminiAnalyzer::new(
                client,
                key.clone(),
                config.gemini_model.clone(),
            )),
            None => {
                tracing::warn!("GEMINI_API_KEY not set, complaint analysis disabled");
                Arc::new(UnconfiguredAnalyzer)
            }
        };
        let notifier: Arc<dyn Notifier> = match config.smtp_credentials() {
            Some((username, password)) => Arc::new(SmtpNotifier::new(
                &config.smtp_host,
                config.smtp_port,
                username,
                password,
            )?),
            None => {
                tracing::warn!("EMAIL_USER or EMAIL_PASSWORD not set, confirmations disabled");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self::new(Arc::new(PatternRedactor::new()?), analyzer, notifier))
    }

    pub fn redact(&self, text: &str) -> String {
        self.redactor.redact(text)
    }

    /// Runs the full intake for `citizen`. External calls happen before the
    /// store write or after it in a detached task, never inside it.
    pub async fn submit(
        &self,
        pool: &PgPool,
        citizen: &User,
        request: IntakeRequest,
    ) -> Result<IntakeReceipt, StoreError> {
        let redacted = self.redactor.redact(&request.description);
        let analysis = analysis_text(self.analyzer.analyze(&complaint_prompt(&redacted)).await);
        let fir_draft = fir_draft(&request.complaint_type, &redacted, &analysis);

        let complaint = db::create_complaint(
            pool,
            &NewComplaint {
                department: department_for(&request.complaint_type).to_string(),
                complaint_type: request.complaint_type,
                description: redacted,
                user_id: citizen.id,
                latitude: request.latitude,
                longitude: request.longitude,
            },
            &request.evidence,
        )
        .await?;
        tracing::info!(complaint_id = %complaint.id, complaint_type = %complaint.complaint_type, "complaint registered");

        let notifier = Arc::clone(&self.notifier);
        let message = confirmation_message(&citizen.email, complaint.id, &fir_draft);
        tokio::spawn(async move {
            if let Err(err) = notifier.send(message).await {
                tracing::error!(error = %err, "failed to send confirmation");
            }
        });

        Ok(IntakeReceipt {
            id: complaint.id,
            status: complaint.status,
            analysis,
            fir_draft,
        })
    }

    pub async fn systemic_flaws(&self, complaints: &[ComplaintDigest]) -> String {
        let complaints_json = match serde_json::to_string_pretty(complaints) {
            Ok(json) => json,
            Err(err) => return format!("Error analyzing for systemic flaws: {err}"),
        };
        match self.analyzer.analyze(&systemic_flaw_prompt(&complaints_json)).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "systemic flaw analysis failed");
                format!("Error analyzing for systemic flaws: {err}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CannedAnalyzer(&'static str);

    #[async_trait]
    impl Analyzer for CannedAnalyzer {
        async fn analyze(&self, prompt: &str) -> Result<String, AnalysisError> {
            assert!(prompt.contains("Complaints Data"));
            Ok(self.0.to_string())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<Message>>);

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: Message) -> Result<(), NotifyError> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }
    }

    #[test]
    fn departments_follow_complaint_type() {
        assert_eq!(department_for("bribery"), "Police");
        assert_eq!(department_for("harassment"), "Police");
        assert_eq!(department_for("delay"), "Passport Office");
        assert_eq!(department_for("nepotism"), "Municipal Corporation");
        assert_eq!(department_for("embezzlement"), "Finance Ministry");
        assert_eq!(department_for("extortion"), "General Administration");
    }

    #[test]
    fn redactor_masks_contact_details_and_ids() {
        let redactor = PatternRedactor::new().unwrap();
        let text = "Reach me at ravi.k@example.org or +91 9876543210. \
                    Aadhaar 1234 5678 9012, card 4111 1111 1111 1111. He took 5000 rupees.";
        let redacted = redactor.redact(text);

        assert!(redacted.contains("<EMAIL_ADDRESS>"));
        assert!(redacted.contains("<PHONE_NUMBER>"));
        assert!(redacted.contains("<IN_AADHAAR>"));
        assert!(redacted.contains("<CREDIT_CARD>"));
        assert!(!redacted.contains("ravi.k"));
        assert!(!redacted.contains("9876543210"));
        assert!(redacted.contains("5000 rupees"));
    }

    #[test]
    fn analysis_failures_become_text() {
        let text = analysis_text(Err(AnalysisError::Unconfigured));
        assert!(text.starts_with("Error analyzing complaint"));
        assert_eq!(analysis_text(Ok("High severity".into())), "High severity");
    }

    #[test]
    fn gemini_response_text_is_joined() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Intent: bribery. "},{"text":"Severity: high"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Intent: bribery. Severity: high"));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.text().is_none());
    }

    #[test]
    fn fir_draft_and_confirmation_carry_the_redacted_text() {
        let draft = fir_draft("bribery", "Clerk asked <PHONE_NUMBER> for cash", "Severity: high");
        assert!(draft.starts_with("FIR DRAFT"));
        assert!(draft.contains("Complaint Type: bribery"));

        let id = Uuid::new_v4();
        let message = confirmation_message("citizen@example.com", id, &draft);
        assert_eq!(message.to, "citizen@example.com");
        assert!(message.subject.contains(&id.to_string()));
        assert!(message.body.contains("Clerk asked <PHONE_NUMBER> for cash"));
    }

    #[test]
    fn confirmation_mail_is_plain_text_from_the_sender() {
        let from: Mailbox = "portal@example.com".parse().unwrap();
        let message = confirmation_message("citizen@example.com", Uuid::new_v4(), "FIR DRAFT");
        let email = build_email(&from, &message).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("From: portal@example.com"));
        assert!(raw.contains("To: citizen@example.com"));
        assert!(raw.contains("Subject: Complaint Registered Successfully"));
        assert!(raw.contains("Content-Type: text/plain"));
    }

    #[test]
    fn malformed_recipient_is_an_address_error() {
        let from: Mailbox = "portal@example.com".parse().unwrap();
        let message = confirmation_message("not an address", Uuid::new_v4(), "FIR DRAFT");
        assert!(matches!(build_email(&from, &message), Err(NotifyError::Address(_))));
    }

    #[tokio::test]
    async fn smtp_notifier_builds_without_connecting() {
        let notifier = SmtpNotifier::new("smtp.example.com", 587, "portal@example.com", "secret");
        assert!(notifier.is_ok());
        assert!(SmtpNotifier::new("smtp.example.com", 587, "no-at-sign", "secret").is_err());
    }

    #[tokio::test]
    async fn systemic_flaws_uses_analyzer_output() {
        let intake = Intake::new(
            Arc::new(PatternRedactor::new().unwrap()),
            Arc::new(CannedAnalyzer("Flaw: licence desk discretion")),
            Arc::new(RecordingNotifier::default()),
        );
        let digests = vec![ComplaintDigest {
            complaint_type: "bribery".into(),
            description: "Payment demanded at licence desk".into(),
            status: ComplaintStatus::Submitted,
            department: Some("Police".into()),
        }];
        assert_eq!(intake.systemic_flaws(&digests).await, "Flaw: licence desk discretion");
    }

    #[tokio::test]
    async fn systemic_flaws_reports_unconfigured_analyzer() {
        let intake = Intake::new(
            Arc::new(PatternRedactor::new().unwrap()),
            Arc::new(UnconfiguredAnalyzer),
            Arc::new(LogNotifier),
        );
        let text = intake.systemic_flaws(&[]).await;
        assert!(text.starts_with("Error analyzing for systemic flaws"));
    }
}
