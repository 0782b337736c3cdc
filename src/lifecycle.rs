//! Weekly report state machine: `draft -> submitted -> reviewed -> {approved, rejected}`.
//!
//! Transitions are pure functions over an owned `WeeklyReport` value; handlers
//! apply them and persist the returned report. Ownership and assignment checks
//! stay at the handler boundary, transition legality lives here.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::authz::Role;
use crate::errors::AppError;
use crate::models::report::{Grade, ReportStatus, ReviewDecision, WeeklyReport};
use crate::validate;

/// Editable fields of an update request after payload validation.
#[derive(Debug, Default, Clone)]
pub struct ReportPatch {
    pub week_number: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub content: Option<String>,
    pub status: Option<ReportStatus>,
}

/// Stamp submission time when a report is created directly as submitted.
pub fn initialize(mut report: WeeklyReport, now: DateTime<Utc>) -> WeeklyReport {
    if report.status == ReportStatus::Submitted {
        report.submitted_at = Some(now);
    }
    report
}

/// Student edits are legal only while the report is a draft or merely
/// submitted; once reviewed the report is immutable to its owner. Admin
/// updates bypass the guard.
pub fn apply_update(
    mut report: WeeklyReport,
    patch: ReportPatch,
    actor: Role,
    now: DateTime<Utc>,
) -> Result<WeeklyReport, AppError> {
    let editable = matches!(report.status, ReportStatus::Draft | ReportStatus::Submitted);
    if !editable && actor != Role::Admin {
        return Err(AppError::invalid_transition("cannot edit reviewed reports"));
    }

    if let Some(week_number) = patch.week_number {
        report.week_number = week_number;
    }
    if let Some(start_date) = patch.start_date {
        report.start_date = start_date;
    }
    if let Some(end_date) = patch.end_date {
        report.end_date = end_date;
    }
    if let Some(content) = patch.content {
        report.content = content;
    }
    if let Some(status) = patch.status {
        if status == ReportStatus::Submitted && report.status == ReportStatus::Draft {
            report.submitted_at = Some(now);
        }
        report.status = status;
    }

    // the merged record must still satisfy the date invariant
    validate::check_date_range(report.start_date, report.end_date)
        .map_err(|_| AppError::validation_single("end_date", "date_range", "end date must be after start date"))?;

    report.updated_at = now;
    Ok(report)
}

/// Academic review: records feedback, stamps the comment date, and moves the
/// report forward. A grade implies approval; an explicit decision can reject;
/// neither leaves the report at `reviewed`.
pub fn academic_review(
    mut report: WeeklyReport,
    feedback: &str,
    grade: Option<Grade>,
    decision: Option<ReviewDecision>,
    now: DateTime<Utc>,
) -> Result<WeeklyReport, AppError> {
    match report.status {
        ReportStatus::Draft => {
            return Err(AppError::invalid_transition(
                "report has not been submitted for review",
            ));
        }
        ReportStatus::Approved | ReportStatus::Rejected => {
            return Err(AppError::invalid_transition("report review is already finalized"));
        }
        ReportStatus::Submitted | ReportStatus::Reviewed => {}
    }

    report.academic_feedback = Some(feedback.to_string());
    report.supervisor_feedback = Some(feedback.to_string());
    report.academic_comment_date = Some(now);
    if report.reviewed_at.is_none() {
        report.reviewed_at = Some(now);
    }

    report.status = match (grade, decision) {
        (Some(grade), _) => {
            report.grade = Some(grade);
            ReportStatus::Approved
        }
        (None, Some(ReviewDecision::Approved)) => ReportStatus::Approved,
        (None, Some(ReviewDecision::Rejected)) => ReportStatus::Rejected,
        (None, None) => ReportStatus::Reviewed,
    };

    report.updated_at = now;
    Ok(report)
}

/// Industrial comments attach workplace feedback without changing `status`.
pub fn industrial_comment(
    mut report: WeeklyReport,
    feedback: &str,
    supervisor_id: Uuid,
    now: DateTime<Utc>,
) -> Result<WeeklyReport, AppError> {
    if report.status == ReportStatus::Draft {
        return Err(AppError::invalid_transition(
            "report has not been submitted for review",
        ));
    }

    report.industrial_supervisor_feedback = Some(feedback.to_string());
    report.industrial_supervisor_id = Some(supervisor_id);
    report.industrial_comment_date = Some(now);
    report.updated_at = now;
    Ok(report)
}

/// Students may delete drafts only; admin may delete at any status.
pub fn ensure_deletable(report: &WeeklyReport, actor: Role) -> Result<(), AppError> {
    if actor == Role::Admin {
        return Ok(());
    }
    if report.status != ReportStatus::Draft {
        return Err(AppError::invalid_transition("can only delete draft reports"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap()
    }

    fn report(status: ReportStatus) -> WeeklyReport {
        let created = Utc.with_ymd_and_hms(2026, 8, 1, 9, 0, 0).unwrap();
        WeeklyReport {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            week_number: 1,
            start_date: NaiveDate::from_ymd_opt(2026, 8, 3).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
            content: "x".repeat(60),
            status,
            supervisor_feedback: None,
            academic_feedback: None,
            academic_comment_date: None,
            industrial_supervisor_feedback: None,
            industrial_supervisor_id: None,
            industrial_comment_date: None,
            grade: None,
            attachments: Vec::new(),
            submitted_at: None,
            reviewed_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn creating_as_submitted_stamps_submitted_at() {
        let initialized = initialize(report(ReportStatus::Submitted), now());
        assert_eq!(initialized.submitted_at, Some(now()));

        let draft = initialize(report(ReportStatus::Draft), now());
        assert_eq!(draft.submitted_at, None);
    }

    #[test]
    fn submitting_a_draft_stamps_submitted_at() {
        let patch = ReportPatch {
            status: Some(ReportStatus::Submitted),
            ..Default::default()
        };
        let updated = apply_update(report(ReportStatus::Draft), patch, Role::Student, now()).unwrap();
        assert_eq!(updated.status, ReportStatus::Submitted);
        assert_eq!(updated.submitted_at, Some(now()));
    }

    #[test]
    fn reviewed_report_is_immutable_to_student() {
        let patch = ReportPatch {
            content: Some("y".repeat(60)),
            ..Default::default()
        };
        let err =
            apply_update(report(ReportStatus::Reviewed), patch, Role::Student, now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn admin_bypasses_reviewed_immutability() {
        let patch = ReportPatch {
            content: Some("y".repeat(60)),
            ..Default::default()
        };
        let updated =
            apply_update(report(ReportStatus::Reviewed), patch, Role::Admin, now()).unwrap();
        assert!(updated.content.starts_with('y'));
    }

    #[test]
    fn update_rejects_equal_dates() {
        let patch = ReportPatch {
            end_date: Some(NaiveDate::from_ymd_opt(2026, 8, 3).unwrap()),
            ..Default::default()
        };
        let err = apply_update(report(ReportStatus::Draft), patch, Role::Student, now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn review_with_grade_approves() {
        let reviewed =
            academic_review(report(ReportStatus::Submitted), "solid work this week", Some(Grade::B), None, now())
                .unwrap();
        assert_eq!(reviewed.status, ReportStatus::Approved);
        assert_eq!(reviewed.grade, Some(Grade::B));
        assert_eq!(reviewed.academic_comment_date, Some(now()));
        assert_eq!(reviewed.reviewed_at, Some(now()));
        assert_eq!(reviewed.academic_feedback.as_deref(), Some("solid work this week"));
    }

    #[test]
    fn review_without_grade_marks_reviewed() {
        let reviewed =
            academic_review(report(ReportStatus::Submitted), "needs more detail", None, None, now()).unwrap();
        assert_eq!(reviewed.status, ReportStatus::Reviewed);
        assert_eq!(reviewed.grade, None);
    }

    #[test]
    fn review_can_reject_explicitly() {
        let reviewed = academic_review(
            report(ReportStatus::Submitted),
            "does not reflect the week's work",
            None,
            Some(ReviewDecision::Rejected),
            now(),
        )
        .unwrap();
        assert_eq!(reviewed.status, ReportStatus::Rejected);
    }

    #[test]
    fn draft_cannot_be_reviewed() {
        let err = academic_review(report(ReportStatus::Draft), "too early for feedback", None, None, now())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[test]
    fn finalized_report_cannot_be_re_reviewed() {
        for status in [ReportStatus::Approved, ReportStatus::Rejected] {
            let err =
                academic_review(report(status), "second thoughts", None, None, now()).unwrap_err();
            assert!(matches!(err, AppError::InvalidTransition(_)));
        }
    }

    #[test]
    fn re_review_keeps_original_reviewed_at() {
        let first = academic_review(report(ReportStatus::Submitted), "first pass notes", None, None, now())
            .unwrap();
        let later = now() + chrono::Duration::hours(2);
        let second = academic_review(first, "follow-up notes", Some(Grade::A), None, later).unwrap();
        assert_eq!(second.reviewed_at, Some(now()));
        assert_eq!(second.academic_comment_date, Some(later));
    }

    #[test]
    fn industrial_comment_does_not_change_status() {
        let supervisor = Uuid::new_v4();
        let commented = industrial_comment(
            report(ReportStatus::Submitted),
            "good on-site engagement",
            supervisor,
            now(),
        )
        .unwrap();
        assert_eq!(commented.status, ReportStatus::Submitted);
        assert_eq!(commented.industrial_supervisor_id, Some(supervisor));
        assert_eq!(commented.industrial_comment_date, Some(now()));
    }

    #[test]
    fn delete_rules() {
        assert!(ensure_deletable(&report(ReportStatus::Draft), Role::Student).is_ok());
        assert!(ensure_deletable(&report(ReportStatus::Submitted), Role::Student).is_err());
        assert!(ensure_deletable(&report(ReportStatus::Reviewed), Role::Admin).is_ok());
    }
}
