use std::fmt::Write;

use chrono::NaiveDate;

use crate::analytics;
use crate::models::{AnomalySeverity, StoreSnapshot};

pub fn build_report(snapshot: &StoreSnapshot, today: NaiveDate) -> String {
    let summary = analytics::dashboard_summary(snapshot);
    let index = analytics::integrity_index(&snapshot.complaints);
    let risks = analytics::risk_by_type(&snapshot.complaints);
    let anomalies = analytics::detect_anomalies(&snapshot.complaints, today);
    let resolution = analytics::resolution_times(&snapshot.complaints);

    let mut output = String::new();

    let _ = writeln!(output, "# Complaint Portal Report");
    let _ = writeln!(
        output,
        "Generated {} (anomaly window {} to {})",
        today,
        analytics::window_start(today),
        today
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(
        output,
        "- Complaints: {} total, {} submitted, {} in progress, {} resolved",
        summary.total_complaints,
        summary.submitted_complaints,
        summary.in_progress_complaints,
        summary.resolved_complaints
    );
    let _ = writeln!(output, "- Rewards distributed: {}", summary.rewards_distributed);
    let _ = writeln!(output, "- Active most-wanted entries: {}", summary.most_wanted_count);
    let _ = writeln!(output, "- Pending community reports: {}", summary.pending_reports);
    let _ = writeln!(output, "- Average service feedback: {:.1}", summary.avg_rating);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Integrity Index");

    if index.is_empty() {
        let _ = writeln!(output, "No complaints have a department yet.");
    } else {
        for department in &index {
            let satisfaction = department
                .avg_satisfaction
                .map(|value| format!("{value:.1}"))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = writeln!(
                output,
                "- {}: score {:.1} ({} of {} resolved, satisfaction {})",
                department.department,
                department.integrity_score,
                department.resolved_complaints,
                department.total_complaints,
                satisfaction
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk by Complaint Type");

    if risks.is_empty() {
        let _ = writeln!(output, "No complaints recorded.");
    } else {
        let mut ranked = risks.clone();
        ranked.sort_by(|a, b| {
            b.risk_score
                .partial_cmp(&a.risk_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for risk in &ranked {
            let _ = writeln!(
                output,
                "- {}: risk {:.2} ({} of {} resolved)",
                risk.complaint_type, risk.risk_score, risk.resolved, risk.total
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Volume Anomalies");

    if anomalies.is_empty() {
        let _ = writeln!(output, "No unusual spikes in the last {} days.", analytics::ANOMALY_WINDOW_DAYS);
    } else {
        for anomaly in &anomalies {
            let label = match anomaly.severity {
                AnomalySeverity::High => "High",
                AnomalySeverity::Medium => "Medium",
            };
            let _ = writeln!(
                output,
                "- {}: {} complaints ({})",
                anomaly.date, anomaly.count, label
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Resolution Time");

    if resolution.is_empty() {
        let _ = writeln!(output, "No resolved complaints yet.");
    } else {
        for entry in &resolution {
            let _ = writeln!(
                output,
                "- {}: {:.1} days on average",
                entry.complaint_type, entry.avg_days
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplaintFact, ComplaintStatus};
    use chrono::Duration;

    fn complaint(status: ComplaintStatus, rating: Option<i32>, days_open: i64) -> ComplaintFact {
        let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        let created_at = (today - Duration::days(days_open))
            .and_hms_opt(8, 0, 0)
            .unwrap()
            .and_utc();
        ComplaintFact {
            complaint_type: "bribery".to_string(),
            status,
            created_at,
            updated_at: created_at + Duration::days(days_open),
            department: Some("Police".to_string()),
            satisfaction_rating: rating,
            assigned_official_id: None,
        }
    }

    #[test]
    fn empty_store_report_has_placeholders() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        let report = build_report(&StoreSnapshot::default(), today);
        assert!(report.starts_with("# Complaint Portal Report"));
        assert!(report.contains("No complaints have a department yet."));
        assert!(report.contains("No unusual spikes in the last 30 days."));
        assert!(report.contains("No resolved complaints yet."));
    }

    #[test]
    fn report_lists_department_scores() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        let snapshot = StoreSnapshot {
            complaints: vec![
                complaint(ComplaintStatus::Resolved, Some(5), 2),
                complaint(ComplaintStatus::InProgress, None, 1),
            ],
            ..StoreSnapshot::default()
        };
        let report = build_report(&snapshot, today);
        assert!(report.contains("- Police: score 75.0 (1 of 2 resolved, satisfaction 5.0)"));
        assert!(report.contains("- bribery: risk 50.00 (1 of 2 resolved)"));
        assert!(report.contains("- bribery: 2.0 days on average"));
    }
}
