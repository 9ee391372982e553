use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate, Utc};

use crate::models::{
    Anomaly, AnomalySeverity, ComplaintFact, ComplaintStatus, DailyCount, DashboardSummary,
    DepartmentPerformance, DepartmentStat, OfficialPerformance, ResolutionTime, RewardStatus,
    StoreSnapshot, TypeCount, TypeRisk, UserProfile,
};

/// Length of the trailing window, today included, used for trends and anomalies.
pub const ANOMALY_WINDOW_DAYS: i64 = 30;

const MEDIUM_SPIKE_FACTOR: f64 = 1.5;
const HIGH_SPIKE_FACTOR: f64 = 2.0;
const MAX_RATING: f64 = 5.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    total: i64,
    resolved: i64,
    rating_sum: i64,
    rating_count: i64,
    elapsed_days: f64,
}

impl Tally {
    fn record(&mut self, fact: &ComplaintFact) {
        self.total += 1;
        if fact.status == ComplaintStatus::Resolved {
            self.resolved += 1;
            self.elapsed_days += elapsed_days(fact);
            if let Some(rating) = fact.satisfaction_rating {
                self.rating_sum += i64::from(rating);
                self.rating_count += 1;
            }
        }
    }

    fn resolution_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.resolved as f64 / self.total as f64 * 100.0
        }
    }

    fn avg_rating(&self) -> Option<f64> {
        if self.rating_count == 0 {
            None
        } else {
            Some(self.rating_sum as f64 / self.rating_count as f64)
        }
    }

    fn avg_resolution_days(&self) -> f64 {
        if self.resolved == 0 {
            0.0
        } else {
            self.elapsed_days / self.resolved as f64
        }
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn elapsed_days(fact: &ComplaintFact) -> f64 {
    (fact.updated_at - fact.created_at).num_seconds() as f64 / SECONDS_PER_DAY
}

pub fn dashboard_summary(snapshot: &StoreSnapshot) -> DashboardSummary {
    let mut summary = DashboardSummary {
        total_complaints: 0,
        resolved_complaints: 0,
        in_progress_complaints: 0,
        submitted_complaints: 0,
        rewards_distributed: 0,
        most_wanted_count: 0,
        pending_reports: 0,
        avg_rating: 0.0,
    };

    for complaint in &snapshot.complaints {
        summary.total_complaints += 1;
        match complaint.status {
            ComplaintStatus::Submitted => summary.submitted_complaints += 1,
            ComplaintStatus::InProgress => summary.in_progress_complaints += 1,
            ComplaintStatus::Resolved => summary.resolved_complaints += 1,
        }
    }

    summary.rewards_distributed = snapshot
        .rewards
        .iter()
        .filter(|reward| reward.status == RewardStatus::Distributed)
        .map(|reward| reward.amount)
        .sum();
    summary.most_wanted_count = snapshot
        .most_wanted_statuses
        .iter()
        .filter(|status| status.as_str() == "Active")
        .count() as i64;
    summary.pending_reports = snapshot
        .community_report_statuses
        .iter()
        .filter(|status| status.as_str() == "Pending")
        .count() as i64;

    if !snapshot.feedback_ratings.is_empty() {
        let total: i64 = snapshot.feedback_ratings.iter().map(|r| i64::from(*r)).sum();
        summary.avg_rating = round_to(
            total as f64 / snapshot.feedback_ratings.len() as f64,
            1,
        );
    }

    summary
}

/// Departments ranked by a 50/50 blend of resolution rate and satisfaction.
///
/// Complaints without a department are ignored. Departments appear in order of
/// first occurrence before the stable descending sort, so equal scores keep
/// that order.
pub fn integrity_index(complaints: &[ComplaintFact]) -> Vec<DepartmentStat> {
    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<&str, Tally> = HashMap::new();

    for complaint in complaints {
        let Some(department) = complaint.department.as_deref() else {
            continue;
        };
        if !tallies.contains_key(department) {
            order.push(department.to_string());
        }
        tallies.entry(department).or_default().record(complaint);
    }

    let mut index: Vec<DepartmentStat> = order
        .into_iter()
        .map(|department| {
            let tally = tallies
                .get(department.as_str())
                .copied()
                .unwrap_or_default();
            let avg_satisfaction = tally.avg_rating();
            let satisfaction_score = avg_satisfaction.unwrap_or(0.0) / MAX_RATING * 100.0;
            let integrity_score = 0.5 * tally.resolution_rate() + 0.5 * satisfaction_score;
            DepartmentStat {
                department,
                total_complaints: tally.total,
                resolved_complaints: tally.resolved,
                avg_satisfaction,
                integrity_score: round_to(integrity_score, 1),
            }
        })
        .collect();

    index.sort_by(|a, b| {
        b.integrity_score
            .partial_cmp(&a.integrity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    index
}

fn tally_by_type(complaints: &[ComplaintFact]) -> BTreeMap<&str, Tally> {
    let mut tallies: BTreeMap<&str, Tally> = BTreeMap::new();
    for complaint in complaints {
        tallies
            .entry(complaint.complaint_type.as_str())
            .or_default()
            .record(complaint);
    }
    tallies
}

/// Unresolved share per complaint type, ordered by type name.
pub fn risk_by_type(complaints: &[ComplaintFact]) -> Vec<TypeRisk> {
    tally_by_type(complaints)
        .into_iter()
        .map(|(complaint_type, tally)| TypeRisk {
            complaint_type: complaint_type.to_string(),
            total: tally.total,
            resolved: tally.resolved,
            risk_score: if tally.total == 0 {
                0.0
            } else {
                round_to(100.0 - tally.resolution_rate(), 2)
            },
        })
        .collect()
}

pub fn window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(ANOMALY_WINDOW_DAYS - 1)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Complaints per creation date inside the trailing window.
///
/// Dates without complaints are absent rather than zero-filled.
pub fn daily_trend(complaints: &[ComplaintFact], today: NaiveDate) -> Vec<DailyCount> {
    let start = window_start(today);
    let mut counts: BTreeMap<NaiveDate, i64> = BTreeMap::new();

    for complaint in complaints {
        let date = complaint.created_at.date_naive();
        if date < start || date > today {
            continue;
        }
        *counts.entry(date).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

pub fn detect_anomalies(complaints: &[ComplaintFact], today: NaiveDate) -> Vec<Anomaly> {
    let series = daily_trend(complaints, today);
    if series.is_empty() {
        return Vec::new();
    }

    let total: i64 = series.iter().map(|day| day.count).sum();
    let mean = total as f64 / series.len() as f64;

    series
        .into_iter()
        .filter(|day| day.count as f64 > mean * MEDIUM_SPIKE_FACTOR)
        .map(|day| Anomaly {
            date: day.date,
            count: day.count,
            severity: if day.count as f64 > mean * HIGH_SPIKE_FACTOR {
                AnomalySeverity::High
            } else {
                AnomalySeverity::Medium
            },
        })
        .collect()
}

/// Mean days from creation to last update for resolved complaints, per type.
///
/// Types without a resolved complaint are omitted.
pub fn resolution_times(complaints: &[ComplaintFact]) -> Vec<ResolutionTime> {
    tally_by_type(complaints)
        .into_iter()
        .filter(|(_, tally)| tally.resolved > 0)
        .map(|(complaint_type, tally)| ResolutionTime {
            complaint_type: complaint_type.to_string(),
            avg_days: round_to(tally.avg_resolution_days(), 1),
        })
        .collect()
}

pub fn complaints_by_type(complaints: &[ComplaintFact]) -> Vec<TypeCount> {
    let mut counts: Vec<TypeCount> = tally_by_type(complaints)
        .into_iter()
        .map(|(complaint_type, tally)| TypeCount {
            complaint_type: complaint_type.to_string(),
            count: tally.total,
        })
        .collect();
    // BTreeMap order already sorts names, the stable sort keeps it for ties.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

pub fn official_performance(
    complaints: &[ComplaintFact],
    officials: &[UserProfile],
) -> Vec<OfficialPerformance> {
    let mut tallies: HashMap<uuid::Uuid, Tally> = HashMap::new();
    for complaint in complaints {
        if let Some(official_id) = complaint.assigned_official_id {
            tallies.entry(official_id).or_default().record(complaint);
        }
    }

    officials
        .iter()
        .map(|official| {
            let tally = tallies.get(&official.id).copied().unwrap_or_default();
            OfficialPerformance {
                id: official.id,
                name: official.name.clone(),
                role: official.role,
                assigned_complaints: tally.total,
                resolved: tally.resolved,
                resolution_rate: round_to(tally.resolution_rate(), 2),
                avg_resolution_time: round_to(tally.avg_resolution_days(), 1),
            }
        })
        .collect()
}

pub fn department_performance(
    complaints: &[ComplaintFact],
    department: &str,
) -> DepartmentPerformance {
    let mut tally = Tally::default();
    for complaint in complaints {
        if complaint.department.as_deref() == Some(department) {
            tally.record(complaint);
        }
    }

    DepartmentPerformance {
        department: department.to_string(),
        total_complaints: tally.total,
        resolved: tally.resolved,
        resolution_rate: round_to(tally.resolution_rate(), 2),
        avg_resolution_time: round_to(tally.avg_resolution_days(), 1),
        satisfaction: round_to(tally.avg_rating().unwrap_or(0.0), 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RewardFact, Role};
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
        date.and_hms_opt(hour, 0, 0).unwrap().and_utc()
    }

    fn reference_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    fn fact(complaint_type: &str, status: ComplaintStatus, department: Option<&str>) -> ComplaintFact {
        let created = at(reference_day(), 9);
        ComplaintFact {
            complaint_type: complaint_type.to_string(),
            status,
            created_at: created,
            updated_at: created,
            department: department.map(str::to_string),
            satisfaction_rating: None,
            assigned_official_id: None,
        }
    }

    fn resolved_after(complaint_type: &str, days: i64) -> ComplaintFact {
        let mut complaint = fact(complaint_type, ComplaintStatus::Resolved, Some("Police"));
        complaint.updated_at = complaint.created_at + Duration::days(days);
        complaint
    }

    fn created_on(date: NaiveDate) -> ComplaintFact {
        let mut complaint = fact("bribery", ComplaintStatus::Submitted, Some("Police"));
        complaint.created_at = at(date, 12);
        complaint.updated_at = complaint.created_at;
        complaint
    }

    #[test]
    fn empty_store_yields_zeroed_dashboard() {
        let summary = dashboard_summary(&StoreSnapshot::default());
        assert_eq!(summary.total_complaints, 0);
        assert_eq!(summary.rewards_distributed, 0);
        assert_eq!(summary.most_wanted_count, 0);
        assert_eq!(summary.pending_reports, 0);
        assert_eq!(summary.avg_rating, 0.0);
    }

    #[test]
    fn dashboard_status_counts_add_up() {
        let snapshot = StoreSnapshot {
            complaints: vec![
                fact("bribery", ComplaintStatus::Resolved, Some("Police")),
                fact("delay", ComplaintStatus::InProgress, Some("Passport Office")),
                fact("delay", ComplaintStatus::Submitted, None),
                fact("nepotism", ComplaintStatus::Submitted, None),
            ],
            rewards: vec![
                RewardFact {
                    amount: 5000,
                    status: RewardStatus::Distributed,
                },
                RewardFact {
                    amount: 700,
                    status: RewardStatus::Pending,
                },
            ],
            feedback_ratings: vec![2, 4, 4],
            most_wanted_statuses: vec!["Active".into(), "Captured".into(), "Active".into()],
            community_report_statuses: vec!["Pending".into(), "Investigating".into()],
        };

        let summary = dashboard_summary(&snapshot);
        assert_eq!(
            summary.resolved_complaints + summary.in_progress_complaints + summary.submitted_complaints,
            summary.total_complaints
        );
        assert_eq!(summary.total_complaints, 4);
        assert_eq!(summary.submitted_complaints, 2);
        assert_eq!(summary.rewards_distributed, 5000);
        assert_eq!(summary.most_wanted_count, 2);
        assert_eq!(summary.pending_reports, 1);
        assert_eq!(summary.avg_rating, 3.3);
    }

    #[test]
    fn integrity_blends_resolution_and_satisfaction() {
        let mut rated = fact("bribery", ComplaintStatus::Resolved, Some("Police"));
        rated.satisfaction_rating = Some(5);
        let open = fact("bribery", ComplaintStatus::InProgress, Some("Police"));

        let index = integrity_index(&[rated, open]);
        assert_eq!(index.len(), 1);
        assert_eq!(index[0].department, "Police");
        assert_eq!(index[0].total_complaints, 2);
        assert_eq!(index[0].resolved_complaints, 1);
        assert_eq!(index[0].avg_satisfaction, Some(5.0));
        assert_eq!(index[0].integrity_score, 75.0);
    }

    #[test]
    fn integrity_sorts_descending_and_keeps_ties_in_first_seen_order() {
        let complaints = vec![
            fact("delay", ComplaintStatus::Submitted, Some("Passport Office")),
            fact("nepotism", ComplaintStatus::Submitted, Some("Municipal Corporation")),
            fact("bribery", ComplaintStatus::Resolved, Some("Police")),
            fact("misc", ComplaintStatus::Resolved, None),
        ];

        let index = integrity_index(&complaints);
        let names: Vec<&str> = index.iter().map(|d| d.department.as_str()).collect();
        assert_eq!(names, vec!["Police", "Passport Office", "Municipal Corporation"]);
        assert_eq!(index[0].integrity_score, 50.0);
        assert_eq!(index[0].avg_satisfaction, None);
        assert!(index.iter().all(|d| (0.0..=100.0).contains(&d.integrity_score)));
    }

    #[test]
    fn risk_score_tracks_unresolved_share() {
        let mut complaints: Vec<ComplaintFact> = (0..4)
            .map(|_| fact("delay", ComplaintStatus::Submitted, None))
            .collect();
        complaints.extend((0..4).map(|_| fact("bribery", ComplaintStatus::Resolved, None)));
        complaints.push(fact("nepotism", ComplaintStatus::Resolved, None));
        complaints.push(fact("nepotism", ComplaintStatus::Submitted, None));
        complaints.push(fact("nepotism", ComplaintStatus::InProgress, None));

        let risks = risk_by_type(&complaints);
        let by_type: HashMap<&str, f64> = risks
            .iter()
            .map(|r| (r.complaint_type.as_str(), r.risk_score))
            .collect();
        assert_eq!(by_type["delay"], 100.0);
        assert_eq!(by_type["bribery"], 0.0);
        assert_eq!(by_type["nepotism"], 66.67);
        assert_eq!(risks[0].complaint_type, "bribery");
    }

    #[test]
    fn flat_series_has_no_anomalies() {
        let today = reference_day();
        let complaints: Vec<ComplaintFact> = (0..ANOMALY_WINDOW_DAYS)
            .flat_map(|offset| {
                let day = today - Duration::days(offset);
                vec![created_on(day), created_on(day), created_on(day)]
            })
            .collect();

        assert_eq!(daily_trend(&complaints, today).len(), 30);
        assert!(detect_anomalies(&complaints, today).is_empty());
    }

    #[test]
    fn spikes_are_graded_against_mean_of_active_days() {
        let today = reference_day();
        let mut complaints = Vec::new();
        for offset in 1..=4 {
            complaints.push(created_on(today - Duration::days(offset)));
        }
        // Mean over five active days is (4 + 3) / 5 = 1.4.
        for _ in 0..3 {
            complaints.push(created_on(today));
        }
        let anomalies = detect_anomalies(&complaints, today);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].date, today);
        assert_eq!(anomalies[0].count, 3);
        assert_eq!(anomalies[0].severity, AnomalySeverity::High);

        // Mean over three active days is (1 + 1 + 3) / 3, so 3 is a medium spike.
        let medium = vec![
            created_on(today - Duration::days(2)),
            created_on(today - Duration::days(1)),
            created_on(today),
            created_on(today),
            created_on(today),
        ];
        let anomalies = detect_anomalies(&medium, today);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].severity, AnomalySeverity::Medium);
    }

    #[test]
    fn trend_ignores_days_outside_window() {
        let today = reference_day();
        let complaints = vec![
            created_on(today - Duration::days(30)),
            created_on(today - Duration::days(29)),
            created_on(today + Duration::days(1)),
            created_on(today - Duration::days(3)),
            created_on(today - Duration::days(3)),
        ];
        let trend = daily_trend(&complaints, today);
        assert_eq!(
            trend,
            vec![
                DailyCount {
                    date: window_start(today),
                    count: 1
                },
                DailyCount {
                    date: today - Duration::days(3),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn resolution_time_averages_resolved_and_omits_open_types() {
        let complaints = vec![
            resolved_after("bribery", 2),
            resolved_after("bribery", 4),
            fact("delay", ComplaintStatus::InProgress, None),
        ];
        let times = resolution_times(&complaints);
        assert_eq!(
            times,
            vec![ResolutionTime {
                complaint_type: "bribery".to_string(),
                avg_days: 3.0
            }]
        );
    }

    #[test]
    fn counts_by_type_rank_by_volume() {
        let complaints = vec![
            fact("delay", ComplaintStatus::Submitted, None),
            fact("bribery", ComplaintStatus::Submitted, None),
            fact("delay", ComplaintStatus::Submitted, None),
            fact("harassment", ComplaintStatus::Submitted, None),
        ];
        let counts = complaints_by_type(&complaints);
        let labels: Vec<&str> = counts.iter().map(|c| c.complaint_type.as_str()).collect();
        assert_eq!(labels, vec!["delay", "bribery", "harassment"]);
    }

    #[test]
    fn official_performance_includes_idle_officials() {
        let busy = UserProfile {
            id: Uuid::new_v4(),
            email: "police@example.com".into(),
            national_id: None,
            role: Role::Police,
            name: "Inspector Sharma".into(),
        };
        let idle = UserProfile {
            id: Uuid::new_v4(),
            email: "official@example.com".into(),
            national_id: None,
            role: Role::Official,
            name: "Officer Singh".into(),
        };
        let mut first = resolved_after("bribery", 2);
        first.assigned_official_id = Some(busy.id);
        let mut second = fact("bribery", ComplaintStatus::InProgress, Some("Police"));
        second.assigned_official_id = Some(busy.id);

        let performance = official_performance(&[first, second], &[busy, idle]);
        assert_eq!(performance[0].assigned_complaints, 2);
        assert_eq!(performance[0].resolution_rate, 50.0);
        assert_eq!(performance[0].avg_resolution_time, 2.0);
        assert_eq!(performance[1].assigned_complaints, 0);
        assert_eq!(performance[1].resolution_rate, 0.0);
    }

    #[test]
    fn unknown_department_performance_is_zeroed() {
        let complaints = vec![resolved_after("bribery", 1)];
        let performance = department_performance(&complaints, "Water Board");
        assert_eq!(performance.total_complaints, 0);
        assert_eq!(performance.resolution_rate, 0.0);
        assert_eq!(performance.satisfaction, 0.0);

        let mut rated = resolved_after("bribery", 3);
        rated.satisfaction_rating = Some(4);
        let performance = department_performance(&[rated], "Police");
        assert_eq!(performance.resolution_rate, 100.0);
        assert_eq!(performance.avg_resolution_time, 3.0);
        assert_eq!(performance.satisfaction, 4.0);
    }

    #[test]
    fn aggregations_are_idempotent() {
        let today = reference_day();
        let complaints = vec![
            resolved_after("bribery", 2),
            created_on(today),
            fact("delay", ComplaintStatus::Submitted, Some("Passport Office")),
        ];
        assert_eq!(integrity_index(&complaints), integrity_index(&complaints));
        assert_eq!(risk_by_type(&complaints), risk_by_type(&complaints));
        assert_eq!(
            detect_anomalies(&complaints, today),
            detect_anomalies(&complaints, today)
        );
        assert_eq!(resolution_times(&complaints), resolution_times(&complaints));
    }

    #[test]
    fn rounding_matches_reported_precision() {
        assert_eq!(round_to(66.666_666, 2), 66.67);
        assert_eq!(round_to(3.25, 1), 3.3);
        assert_eq!(round_to(0.0, 1), 0.0);
    }
}
