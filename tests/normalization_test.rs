/// End-to-end normalization through the public API and the schema registry
use anyhow::Result;
use serde_json::{json, Value};
use std::collections::BTreeSet;

use spark_history_mcp::models::{
    ApplicationInfo, ExecutorSummary, JobData, JobExecutionStatus, StageStatus,
};
use spark_history_mcp::stages::StageData;
use spark_history_mcp::{normalize, to_wire, EntityKind, FieldErrorKind, SchemaRegistry};

fn stage_payload() -> Value {
    json!({
        "status": "ACTIVE",
        "stageId": 4,
        "attemptId": 1,
        "numTasks": 3,
        "numActiveTasks": 1,
        "numCompleteTasks": 2,
        "executorRunTime": 5400,
        "shuffleReadBytes": 1048576,
        "name": "reduceByKey at job.py:88",
        "details": "org.apache.spark.rdd.RDD.reduceByKey",
        "tasks": {
            "0": {
                "taskId": 0, "index": 0, "attempt": 0,
                "host": "w1", "status": "SUCCESS", "speculative": false,
                "taskMetrics": {
                    "executorRunTime": 2000,
                    "shuffleReadMetrics": {"remoteBytesRead": 512, "localBytesRead": 0}
                }
            },
            "1": {
                "taskId": 1, "index": 1, "attempt": 0,
                "host": "w2", "status": "SUCCESS", "speculative": false
            },
            "2": {
                "taskId": 2, "index": 2, "attempt": 1,
                "host": "w1", "status": "RUNNING", "speculative": true,
                "executorLogs": {"stdout": "http://w1/stdout"}
            }
        },
        "executorSummary": {
            "1": {"taskTime": 4000, "succeededTasks": 2, "isExcludedForStage": false,
                  "peakMemoryMetrics": {"JVMHeapMemory": 2048}}
        },
        "killedTasksSummary": {"preempted": 1},
        "taskMetricsDistributions": {
            "quantiles": [0.25, 0.5, 0.75],
            "executorRunTime": [1000.0, 2000.0, 2400.0]
        }
    })
}

/// Every non-null key of `input` is present in `output` with an equal value.
fn assert_reproduced(input: &Value, output: &Value, at: &str, skip: &[&str]) {
    match (input, output) {
        (Value::Object(i), Value::Object(o)) => {
            for (key, value) in i {
                if value.is_null() || skip.contains(&key.as_str()) {
                    continue;
                }
                let emitted = o.get(key).unwrap_or_else(|| {
                    panic!("{}.{} was not re-emitted under its wire name", at, key)
                });
                assert_reproduced(value, emitted, &format!("{}.{}", at, key), skip);
            }
        }
        (Value::Array(i), Value::Array(o)) => {
            assert_eq!(i.len(), o.len(), "{} changed length", at);
            for (n, (a, b)) in i.iter().zip(o).enumerate() {
                assert_reproduced(a, b, &format!("{}[{}]", at, n), skip);
            }
        }
        (a, b) => assert_eq!(a, b, "{} changed value", at),
    }
}

#[test]
fn test_job_scenario_through_registry() -> Result<()> {
    let payload = json!({
        "jobId": 7, "name": "job7", "status": "running", "stageIds": [1, 2],
        "numTasks": 10, "numActiveTasks": 3, "numCompletedTasks": 7
    });
    let job = normalize::<JobData>(&payload)?.value;
    assert_eq!(job.job_id, 7);
    assert_eq!(job.status, JobExecutionStatus::Running);
    assert_eq!(job.stage_ids, Some(vec![1, 2]));
    assert_eq!(
        (job.num_tasks, job.num_active_tasks, job.num_completed_tasks),
        (Some(10), Some(3), Some(7))
    );

    let erased = SchemaRegistry::global().normalize(EntityKind::JobData, &payload)?;
    assert_eq!(erased.value, to_wire(&job)?);
    Ok(())
}

#[test]
fn test_stage_scenario_every_task_key_resolves() -> Result<()> {
    let stage = normalize::<StageData>(&stage_payload())?.value;
    assert_eq!(stage.status, StageStatus::Active);

    let tasks = stage.tasks.as_ref().expect("tasks");
    let keys: BTreeSet<&str> = tasks.keys().map(String::as_str).collect();
    assert_eq!(keys, BTreeSet::from(["0", "1", "2"]));
    for (key, task) in tasks {
        assert_eq!(key, &task.task_id.to_string());
    }
    assert_eq!(tasks["2"].executor_logs["stdout"], "http://w1/stdout");
    assert_eq!(stage.killed_tasks_summary["preempted"], 1);
    assert_eq!(
        stage.task_metrics_distributions.as_ref().unwrap().median_duration(),
        None
    );
    Ok(())
}

#[test]
fn test_wire_round_trip_reproduces_present_fields() -> Result<()> {
    let registry = SchemaRegistry::global();

    let stage = stage_payload();
    let out = registry.normalize(EntityKind::StageData, &stage)?;
    assert_reproduced(&stage, &out.value, "stage", &[]);

    let executor = json!({
        "id": "1", "hostPort": "w1:7337", "isActive": true, "totalGCTime": 321,
        "isBlacklisted": false, "blacklistedInStages": [3],
        "isExcluded": false, "excludedInStages": [],
        "memoryMetrics": {"usedOnHeapStorageMemory": 10, "totalOnHeapStorageMemory": 100},
        "attributes": {"CONTAINER_ID": "c_01"},
        "resources": {"gpu": {"name": "gpu", "addresses": ["0"]}}
    });
    let out = registry.normalize(EntityKind::ExecutorSummary, &executor)?;
    assert_reproduced(&executor, &out.value, "executor", &[]);

    let app = json!({
        "id": "app-1", "name": "etl", "memoryPerExecutorMB": 2048, "coresPerExecutor": 2,
        "attempts": [{"attemptId": "1", "duration": 10, "sparkUser": "etl", "completed": false}]
    });
    let out = registry.normalize(EntityKind::ApplicationInfo, &app)?;
    assert_reproduced(&app, &out.value, "application", &[]);

    let sql = json!({
        "id": 1, "status": "RUNNING", "planDescription": "== Physical Plan ==",
        "submissionTime": "2024-01-15T10:30:00.000GMT", "durationMilliSeconds": 42,
        "runningJobIds": [5], "nodes": [], "edges": [{"fromId": 0, "toId": 1}]
    });
    let out = registry.normalize(EntityKind::ExecutionData, &sql)?;
    assert_reproduced(&sql, &out.value, "sql", &["submissionTime"]);
    assert_eq!(out.value["submissionTime"], json!("2024-01-15T10:30:00+00:00"));
    Ok(())
}

#[test]
fn test_emitted_keys_are_declared_aliases() -> Result<()> {
    let registry = SchemaRegistry::global();
    let out = registry.normalize(EntityKind::StageData, &stage_payload())?;
    let schema = registry.get(EntityKind::StageData);
    let aliases: BTreeSet<&str> = schema.fields.iter().map(|f| f.alias).collect();
    for key in out.value.as_object().unwrap().keys() {
        assert!(aliases.contains(key.as_str()), "{} is not a wire alias of StageData", key);
    }
    Ok(())
}

#[test]
fn test_missing_required_fields_always_fail() {
    let registry = SchemaRegistry::global();
    for schema in registry.iter() {
        let result = registry.normalize(schema.kind, &json!({}));
        let required: BTreeSet<String> = schema
            .required_fields()
            .map(|f| format!("{}.{}", schema.label, f.name))
            .collect();

        if required.is_empty() {
            assert!(result.is_ok(), "{} should accept an empty payload", schema.name);
            continue;
        }

        let err = match result {
            Ok(partial) => panic!("{} built from an empty payload: {}", schema.name, partial.value),
            Err(err) => err,
        };
        assert_eq!(err.entity(), schema.name);
        let reported: BTreeSet<String> = err
            .field_errors()
            .iter()
            .map(|e| e.path.to_string())
            .collect();
        assert_eq!(reported, required, "{}", schema.name);
        assert!(err.field_errors().iter().all(|e| matches!(
            e.kind,
            FieldErrorKind::MissingRequiredField { entity } if entity == schema.name
        )));
    }
}

#[test]
fn test_undeclared_keys_are_ignored_by_lenient_entities() -> Result<()> {
    let mut payload = stage_payload();
    payload["someFutureCounter"] = json!(99);
    payload["tasks"]["0"]["gpuSeconds"] = json!(1.5);
    let normalized = normalize::<StageData>(&payload)?;
    assert!(normalized.warnings.is_empty());

    let wire = to_wire(&normalized.value)?;
    assert!(wire.get("someFutureCounter").is_none());
    Ok(())
}

#[test]
fn test_one_bad_element_fails_the_list() {
    let registry = SchemaRegistry::global();
    let payload = json!([
        {"id": "1", "attributes": {}, "resources": {}},
        {"id": "2", "attributes": {}, "resources": {}, "totalCores": "eight"}
    ]);
    let err = registry
        .normalize_list(EntityKind::ExecutorSummary, &payload)
        .unwrap_err();
    assert_eq!(err.field_errors().len(), 1);
    assert_eq!(err.field_errors()[0].path.to_string(), "executor[1].total_cores");
    assert!(err.to_string().contains("ExecutorSummary failed to normalize"));
}

#[test]
fn test_executor_exclusion_terms_coexist() -> Result<()> {
    let executor = normalize::<ExecutorSummary>(&json!({
        "id": "5", "isExcluded": true, "excludedInStages": [1, 2],
        "blacklistedInStages": [2, 9], "attributes": {}, "resources": {}
    }))?
    .value;
    assert!(executor.is_excluded_any());
    assert_eq!(executor.all_excluded_stages(), BTreeSet::from([1, 2, 9]));
    Ok(())
}

#[test]
fn test_application_attempt_newest_first() -> Result<()> {
    let app = normalize::<ApplicationInfo>(&json!({
        "id": "app-2", "name": "retried",
        "attempts": [
            {"attemptId": "2", "duration": 50, "completed": false},
            {"attemptId": "1", "duration": 10, "completed": true, "endTime": 1705314600000i64}
        ]
    }))?
    .value;
    assert_eq!(app.latest_attempt().unwrap().attempt_id.as_deref(), Some("2"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_normalization_is_independent() -> Result<()> {
    let handles: Vec<_> = (0..16)
        .map(|i| {
            tokio::task::spawn_blocking(move || {
                let mut payload = stage_payload();
                payload["stageId"] = json!(i);
                SchemaRegistry::global().normalize(EntityKind::StageData, &payload)
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let normalized = handle.await??;
        assert_eq!(normalized.value["stageId"], json!(i));
        assert!(normalized.warnings.is_empty());
    }
    Ok(())
}
