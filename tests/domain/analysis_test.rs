use serde_json::json;

use boardlens::domain::{
    Analysis, AnalysisReport, AnalysisStatus, CompanyId, DocumentType, Finding, FindingKind,
    FindingStatus, Severity, UserId,
};

fn new_analysis() -> Analysis {
    Analysis::new(
        CompanyId::new(),
        UserId::new("analyst"),
        Vec::new(),
        DocumentType::Minutes,
        "Q1 board pack".to_string(),
    )
}

fn report(summary: &str, recommendations: &[&str], review: bool) -> AnalysisReport {
    AnalysisReport {
        executive_summary: summary.to_string(),
        key_findings: Vec::new(),
        recommendations: recommendations.iter().map(|r| r.to_string()).collect(),
        requires_human_review: review,
    }
}

#[test]
fn given_new_analysis_when_created_then_status_is_pending() {
    let analysis = new_analysis();

    assert_eq!(analysis.status, AnalysisStatus::Pending);
    assert!(analysis.started_at.is_none());
}

#[test]
fn given_pending_analysis_when_started_then_in_progress_with_start_time() {
    let mut analysis = new_analysis();

    analysis.start().unwrap();

    assert_eq!(analysis.status, AnalysisStatus::InProgress);
    assert!(analysis.started_at.is_some());
}

#[test]
fn given_running_analysis_when_finished_without_review_then_completed() {
    let mut analysis = new_analysis();
    analysis.start().unwrap();

    analysis.finish(report("All good", &["Keep going"], false)).unwrap();

    assert_eq!(analysis.status, AnalysisStatus::Completed);
    assert_eq!(analysis.summary.as_deref(), Some("All good"));
    assert_eq!(analysis.recommendations, vec!["Keep going"]);
    assert!(analysis.completed_at.is_some());
}

#[test]
fn given_running_analysis_when_report_requests_review_then_needs_review() {
    let mut analysis = new_analysis();
    analysis.start().unwrap();

    analysis.finish(report("Concerns", &[], true)).unwrap();

    assert_eq!(analysis.status, AnalysisStatus::NeedsReview);
}

#[test]
fn given_running_analysis_when_failed_then_error_message_is_kept() {
    let mut analysis = new_analysis();
    analysis.start().unwrap();

    analysis.fail("model unavailable").unwrap();

    assert_eq!(analysis.status, AnalysisStatus::Failed);
    assert_eq!(analysis.error_message.as_deref(), Some("model unavailable"));
}

#[test]
fn given_pending_analysis_when_finishing_directly_then_transition_is_rejected() {
    let mut analysis = new_analysis();

    let err = analysis.finish(report("x", &[], false)).unwrap_err();

    assert_eq!(err.from, AnalysisStatus::Pending);
    assert_eq!(err.to, AnalysisStatus::Completed);
    assert_eq!(analysis.status, AnalysisStatus::Pending);
}

#[test]
fn given_completed_analysis_when_failing_then_transition_is_rejected() {
    let mut analysis = new_analysis();
    analysis.start().unwrap();
    analysis.finish(report("done", &[], false)).unwrap();

    assert!(analysis.fail("late error").is_err());
    assert_eq!(analysis.status, AnalysisStatus::Completed);
}

#[test]
fn given_statuses_when_checking_terminal_then_only_settled_states_are_terminal() {
    assert!(!AnalysisStatus::Pending.is_terminal());
    assert!(!AnalysisStatus::InProgress.is_terminal());
    assert!(AnalysisStatus::NeedsReview.is_terminal());
    assert!(AnalysisStatus::Completed.is_terminal());
    assert!(AnalysisStatus::Failed.is_terminal());
}

#[test]
fn given_status_strings_when_parsing_then_round_trip_through_display() {
    for status in [
        AnalysisStatus::Pending,
        AnalysisStatus::InProgress,
        AnalysisStatus::NeedsReview,
        AnalysisStatus::Completed,
        AnalysisStatus::Failed,
    ] {
        assert_eq!(status.to_string().parse::<AnalysisStatus>().unwrap(), status);
    }
    assert!("done".parse::<AnalysisStatus>().is_err());
}

#[test]
fn given_chunk_reports_when_merging_then_summaries_join_and_recommendations_dedupe() {
    let merged = AnalysisReport::merge(vec![
        report("Part one.", &["Hire CFO", "Review audit"], false),
        report("  ", &["Review audit"], true),
        report("Part three.", &["Update charter"], false),
    ]);

    assert_eq!(merged.executive_summary, "Part one.\n\nPart three.");
    assert_eq!(merged.recommendations, vec!["Hire CFO", "Review audit", "Update charter"]);
    assert!(merged.requires_human_review);
}

#[test]
fn given_model_payload_when_deserializing_report_then_finding_defaults_to_open() {
    let payload = json!({
        "executiveSummary": "Revenue fell.",
        "keyFindings": [{
            "type": "financial_discrepancy",
            "severity": "high",
            "title": "Revenue mismatch",
            "description": "Totals differ between sheets.",
            "location": "[File: budget.xlsx, Sheet: Revenue]"
        }],
        "recommendations": ["Reconcile totals"],
        "requiresHumanReview": false
    });

    let parsed: AnalysisReport = serde_json::from_value(payload).unwrap();

    let finding: &Finding = &parsed.key_findings[0];
    assert_eq!(finding.kind, FindingKind::FinancialDiscrepancy);
    assert_eq!(finding.severity, Severity::High);
    assert_eq!(finding.status, FindingStatus::Open);
    assert_eq!(finding.suggested_action, None);
}
