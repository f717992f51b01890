/// Recovered anomalies are returned to the caller and logged as warnings
use anyhow::Result;
use serde_json::json;
use tracing_test::traced_test;

use spark_history_mcp::models::{ApplicationAttemptInfo, JobData, VersionInfo};
use spark_history_mcp::sql::Metric;
use spark_history_mcp::{normalize, normalize_list, Anomaly, Timestamp};

#[test]
#[traced_test]
fn test_malformed_timestamp_is_kept_and_logged() -> Result<()> {
    let normalized = normalize::<ApplicationAttemptInfo>(&json!({
        "startTime": "yesterday-ish GMT",
        "duration": 0
    }))?;
    assert_eq!(
        normalized.value.start_time,
        Some(Timestamp::Raw("yesterday-ish GMT".to_string()))
    );
    assert!(matches!(
        &normalized.warnings[..],
        [Anomaly::MalformedTimestamp { raw, .. }] if raw == "yesterday-ish GMT"
    ));
    assert!(logs_contain("attempt.start_time: malformed timestamp"));
    Ok(())
}

#[test]
#[traced_test]
fn test_unrecognised_timestamp_text_is_silent() -> Result<()> {
    let normalized = normalize::<JobData>(&json!({
        "jobId": 1, "name": "j", "status": "UNKNOWN",
        "submissionTime": "2024-01-15 10:30:00"
    }))?;
    assert!(normalized.warnings.is_empty());
    assert!(!logs_contain("malformed timestamp"));
    Ok(())
}

#[test]
#[traced_test]
fn test_strict_entity_logs_unknown_fields() -> Result<()> {
    let normalized = normalize::<VersionInfo>(&json!({"spark": "3.5.1", "scala": "2.12"}))?;
    assert_eq!(normalized.value.spark, "3.5.1");
    assert_eq!(normalized.warnings.len(), 1);
    assert!(logs_contain(r#"version["scala"]: field not declared by VersionInfo"#));

    let metrics = normalize_list::<Metric>(&json!([
        {"name": "rows", "value": "10"},
        {"name": "time", "value": "2 ms", "unit": "ms"}
    ]))?;
    assert_eq!(metrics.value.len(), 2);
    assert_eq!(metrics.warnings[0].path().to_string(), r#"metric[1]["unit"]"#);
    Ok(())
}

#[test]
#[traced_test]
fn test_inconsistent_counters_are_warnings_not_failures() -> Result<()> {
    let normalized = normalize::<JobData>(&json!({
        "jobId": 3, "name": "retry-heavy", "status": "SUCCEEDED",
        "numTasks": 10, "numCompletedTasks": 10, "numFailedTasks": 3,
        "submissionTime": 1705314660000i64, "completionTime": 1705314600000i64
    }))?;
    assert_eq!(normalized.value.num_failed_tasks, Some(3));
    assert_eq!(normalized.warnings.len(), 2);
    assert!(logs_contain("job.num_tasks: sub-counts sum to 13 but total is 10"));
    assert!(logs_contain("job.completion_time: completion_time precedes submission_time"));
    Ok(())
}

#[test]
#[traced_test]
fn test_rejection_is_logged_at_debug() {
    let err = normalize::<JobData>(&json!({"name": "no id"})).unwrap_err();
    assert_eq!(err.field_errors().len(), 2);
    assert!(logs_contain("JobData rejected with 2 error(s)"));
}
