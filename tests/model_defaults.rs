use inspection_report::model::InspectionReport;
use regex::Regex;

#[test]
fn empty_object_gets_generated_defaults() {
    let report = InspectionReport::from_json_str("{}").expect("parse");
    let ts = Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").unwrap();
    let id = Regex::new(r"^AI-\d{14}$").unwrap();
    assert!(ts.is_match(&report.timestamp), "{}", report.timestamp);
    assert!(id.is_match(&report.report_id), "{}", report.report_id);
    assert!(report.location.is_none());
    assert!(report.inspector.is_none());
    assert!(report.violations.is_empty());
    assert_eq!(report.summary.total_score.to_string(), "0");
    assert_eq!(report.summary.total_count(), 0);
}

#[test]
fn nulls_are_treated_as_absent() {
    let raw = r#"{
        "timestamp": null,
        "report_id": null,
        "violations": [{"category": null, "regulations": null, "suggestions": null}],
        "summary": {"total_score": null, "severe_count": null, "priority_actions": null}
    }"#;
    let report = InspectionReport::from_json_str(raw).expect("parse");
    assert!(report.report_id.starts_with("AI-"));
    assert_eq!(report.violations.len(), 1);
    assert!(report.violations[0].category.is_none());
    assert!(report.violations[0].regulations.is_empty());
    assert_eq!(report.summary.total_score.to_string(), "0");
}

#[test]
fn camel_case_aliases_are_accepted() {
    let raw = r#"{
        "reportId": "R-1",
        "violations": [{"type": "severe", "riskLevel": "extreme"}],
        "summary": {"totalScore": 72.5, "severeCount": 1, "normalCount": 2}
    }"#;
    let report = InspectionReport::from_json_str(raw).expect("parse");
    assert_eq!(report.report_id, "R-1");
    assert_eq!(report.violations[0].kind.as_deref(), Some("severe"));
    assert_eq!(report.violations[0].risk_level.as_deref(), Some("extreme"));
    assert_eq!(report.summary.total_score.to_string(), "72.5");
    assert_eq!(report.summary.total_count(), 3);
}

#[test]
fn analysis_envelope_is_unwrapped() {
    let raw = r#"{
        "analysis": {
            "violations": [{"category": "PPE"}],
            "summary": {"total_score": 80, "normal_count": 1}
        },
        "timestamp": "2025-08-14 22:30:00"
    }"#;
    let report = InspectionReport::from_json_str(raw).expect("parse");
    assert_eq!(report.timestamp, "2025-08-14 22:30:00");
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.summary.normal_count, 1);
}

#[test]
fn regulation_fields_default_to_empty() {
    let raw = r#"{"violations": [{"regulations": [{"code": "JGJ59"}]}]}"#;
    let report = InspectionReport::from_json_str(raw).expect("parse");
    let reg = &report.violations[0].regulations[0];
    assert_eq!(reg.code, "JGJ59");
    assert_eq!(reg.article, "");
    assert_eq!(reg.content, "");
}

#[test]
fn invalid_json_is_an_error() {
    assert!(InspectionReport::from_json_str("{not json").is_err());
}

#[test]
fn sample_round_trips_through_json() {
    let sample = InspectionReport::sample();
    let raw = serde_json::to_string(&sample).unwrap();
    let back = InspectionReport::from_json_str(&raw).unwrap();
    assert_eq!(back, sample);
}

#[test]
fn score_and_counts_accept_strings_and_floats() {
    let raw = r#"{
        "summary": {"total_score": " 85 ", "severe_count": 2.0, "normal_count": "3"}
    }"#;
    let report = InspectionReport::from_json_str(raw).expect("parse");
    assert_eq!(report.summary.total_score.to_string(), "85");
    assert_eq!(report.summary.severe_count, 2);
    assert_eq!(report.summary.normal_count, 3);
    assert_eq!(report.summary.total_count(), 5);
}

#[test]
fn unusable_score_and_counts_read_as_zero() {
    let raw = r#"{
        "summary": {"total_score": true, "severe_count": -1, "normal_count": "many"}
    }"#;
    let report = InspectionReport::from_json_str(raw).expect("parse");
    assert_eq!(report.summary.total_score.to_string(), "0");
    assert_eq!(report.summary.severe_count, 0);
    assert_eq!(report.summary.normal_count, 0);

    let blank = InspectionReport::from_json_str(r#"{"summary": {"total_score": "  "}}"#)
        .expect("parse");
    assert_eq!(blank.summary.total_score.to_string(), "0");
}

#[test]
fn fractional_and_oversized_counts_are_clamped() {
    let raw = r#"{"summary": {"severe_count": 1.9, "normal_count": 1e12}}"#;
    let report = InspectionReport::from_json_str(raw).expect("parse");
    assert_eq!(report.summary.severe_count, 1);
    assert_eq!(report.summary.normal_count, u32::MAX);
}
