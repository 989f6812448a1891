//! Low-average alerts.

use crate::config::Thresholds;
use crate::partition::StudentOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An alert record as stored by the notification backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub issued_by: String,
    pub title: String,
    pub message: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub student_id: String,
    pub read: bool,
}

impl Alert {
    fn new(title: &str, message: String, student_id: &str, at: DateTime<Utc>) -> Self {
        Alert {
            issued_by: "system".to_string(),
            title: title.to_string(),
            message,
            timestamp: at.to_rfc3339(),
            student_id: student_id.to_string(),
            read: false,
        }
    }
}

/// Alerts for every written student whose averages fall below the thresholds.
pub fn build_alerts(outcomes: &[StudentOutcome], thresholds: &Thresholds) -> Vec<Alert> {
    build_alerts_at(outcomes, thresholds, Utc::now())
}

/// Same as [`build_alerts`] with a fixed timestamp.
pub fn build_alerts_at(
    outcomes: &[StudentOutcome],
    thresholds: &Thresholds,
    at: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for outcome in outcomes {
        let StudentOutcome::Written {
            intake,
            student_no,
            averages,
            ..
        } = outcome
        else {
            continue;
        };

        if let Some(attendance) = averages.attendance.filter(|a| *a < thresholds.min_attendance) {
            alerts.push(Alert::new(
                "Low attendance",
                format!(
                    "Student {student_no} ({intake}) has an average attendance of {attendance:.2}, below the minimum of {}",
                    thresholds.min_attendance
                ),
                student_no,
                at,
            ));
        }
        if let Some(grade) = averages.grade.filter(|g| *g < thresholds.min_grade) {
            alerts.push(Alert::new(
                "Low grade",
                format!(
                    "Student {student_no} ({intake}) has an average grade of {grade:.2}, below the minimum of {}",
                    thresholds.min_grade
                ),
                student_no,
                at,
            ));
        }
    }

    if !alerts.is_empty() {
        tracing::info!(count = alerts.len(), "built alerts");
    }
    alerts
}
