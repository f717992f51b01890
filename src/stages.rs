//! Stages, the tasks they run and their per-executor breakdowns.

use std::collections::HashMap;

use serde::Serialize;

use crate::coerce::Timestamp;
use crate::error::{Anomaly, FieldPath};
use crate::metrics::{ExecutorMetricsDistributions, TaskMetricDistributions, TaskMetrics};
use crate::models::{ExecutorMetrics, StageStatus, TaskStatus};
use crate::schema::{
    check_non_negative, check_ordered, check_sub_counts, Entity, FieldSpec, Reader,
};

/// Stage information, keyed by `(stage_id, attempt_id)`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageData {
    pub status: StageStatus,
    pub stage_id: i64,
    pub attempt_id: i64,
    pub num_tasks: Option<i64>,
    pub num_active_tasks: Option<i64>,
    pub num_complete_tasks: Option<i64>,
    pub num_failed_tasks: Option<i64>,
    pub num_killed_tasks: Option<i64>,
    pub num_completed_indices: Option<i64>,

    pub submission_time: Option<Timestamp>,
    pub first_task_launched_time: Option<Timestamp>,
    pub completion_time: Option<Timestamp>,
    pub failure_reason: Option<String>,

    pub executor_deserialize_time: Option<i64>,
    pub executor_deserialize_cpu_time: Option<i64>,
    pub executor_run_time: Option<i64>,
    pub executor_cpu_time: Option<i64>,
    pub result_size: Option<i64>,
    pub jvm_gc_time: Option<i64>,
    pub result_serialization_time: Option<i64>,
    pub memory_bytes_spilled: Option<i64>,
    pub disk_bytes_spilled: Option<i64>,
    pub peak_execution_memory: Option<i64>,
    pub input_bytes: Option<i64>,
    pub input_records: Option<i64>,
    pub output_bytes: Option<i64>,
    pub output_records: Option<i64>,
    pub shuffle_remote_blocks_fetched: Option<i64>,
    pub shuffle_local_blocks_fetched: Option<i64>,
    pub shuffle_fetch_wait_time: Option<i64>,
    pub shuffle_remote_bytes_read: Option<i64>,
    pub shuffle_remote_bytes_read_to_disk: Option<i64>,
    pub shuffle_local_bytes_read: Option<i64>,
    pub shuffle_read_bytes: Option<i64>,
    pub shuffle_read_records: Option<i64>,
    pub shuffle_corrupt_merged_block_chunks: i64,
    pub shuffle_merged_fetch_fallback_count: i64,
    pub shuffle_merged_remote_blocks_fetched: i64,
    pub shuffle_merged_local_blocks_fetched: i64,
    pub shuffle_merged_remote_chunks_fetched: i64,
    pub shuffle_merged_local_chunks_fetched: i64,
    pub shuffle_merged_remote_bytes_read: i64,
    pub shuffle_merged_local_bytes_read: i64,
    pub shuffle_remote_reqs_duration: i64,
    pub shuffle_merged_remote_reqs_duration: i64,
    pub shuffle_write_bytes: Option<i64>,
    pub shuffle_write_time: Option<i64>,
    pub shuffle_write_records: Option<i64>,

    pub name: String,
    pub description: Option<String>,
    pub details: String,
    pub scheduling_pool: Option<String>,

    pub accumulator_updates: Option<Vec<AccumulableInfo>>,
    /// Tasks keyed by their stringified id.
    pub tasks: Option<HashMap<String, TaskData>>,
    pub executor_summary: Option<HashMap<String, ExecutorStageSummary>>,
    pub speculation_summary: Option<SpeculationStageSummary>,
    pub killed_tasks_summary: HashMap<String, i64>,
    pub resource_profile_id: Option<i64>,
    pub peak_executor_metrics: Option<ExecutorMetrics>,
    pub task_metrics_distributions: Option<TaskMetricDistributions>,
    pub executor_metrics_distributions: Option<ExecutorMetricsDistributions>,
    pub is_shuffle_push_enabled: bool,
    pub shuffle_mergers_count: i64,
}

impl StageData {
    /// The `(stage_id, attempt_id)` pair that identifies a stage attempt.
    pub fn key(&self) -> (i64, i64) {
        (self.stage_id, self.attempt_id)
    }

    /// Time from submission to completion, when both are known instants.
    pub fn duration_ms(&self) -> Option<i64> {
        let start = self.submission_time.as_ref()?.epoch_millis()?;
        let end = self.completion_time.as_ref()?.epoch_millis()?;
        end.checked_sub(start)
    }

    /// Tasks that finished in the given state.
    pub fn tasks_with_status(&self, status: TaskStatus) -> impl Iterator<Item = &TaskData> {
        self.tasks
            .iter()
            .flat_map(|tasks| tasks.values())
            .filter(move |task| task.status == status)
    }

    pub fn total_spilled_bytes(&self) -> i64 {
        self.memory_bytes_spilled
            .unwrap_or(0)
            .saturating_add(self.disk_bytes_spilled.unwrap_or(0))
    }
}

impl Entity for StageData {
    const NAME: &'static str = "StageData";
    const LABEL: &'static str = "stage";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("status", "status"),
        FieldSpec::required("stage_id", "stageId"),
        FieldSpec::required("attempt_id", "attemptId"),
        FieldSpec::optional("num_tasks", "numTasks"),
        FieldSpec::optional("num_active_tasks", "numActiveTasks"),
        FieldSpec::optional("num_complete_tasks", "numCompleteTasks"),
        FieldSpec::optional("num_failed_tasks", "numFailedTasks"),
        FieldSpec::optional("num_killed_tasks", "numKilledTasks"),
        FieldSpec::optional("num_completed_indices", "numCompletedIndices"),
        FieldSpec::optional("submission_time", "submissionTime"),
        FieldSpec::optional("first_task_launched_time", "firstTaskLaunchedTime"),
        FieldSpec::optional("completion_time", "completionTime"),
        FieldSpec::optional("failure_reason", "failureReason"),
        FieldSpec::optional("executor_deserialize_time", "executorDeserializeTime"),
        FieldSpec::optional("executor_deserialize_cpu_time", "executorDeserializeCpuTime"),
        FieldSpec::optional("executor_run_time", "executorRunTime"),
        FieldSpec::optional("executor_cpu_time", "executorCpuTime"),
        FieldSpec::optional("result_size", "resultSize"),
        FieldSpec::optional("jvm_gc_time", "jvmGcTime"),
        FieldSpec::optional("result_serialization_time", "resultSerializationTime"),
        FieldSpec::optional("memory_bytes_spilled", "memoryBytesSpilled"),
        FieldSpec::optional("disk_bytes_spilled", "diskBytesSpilled"),
        FieldSpec::optional("peak_execution_memory", "peakExecutionMemory"),
        FieldSpec::optional("input_bytes", "inputBytes"),
        FieldSpec::optional("input_records", "inputRecords"),
        FieldSpec::optional("output_bytes", "outputBytes"),
        FieldSpec::optional("output_records", "outputRecords"),
        FieldSpec::optional("shuffle_remote_blocks_fetched", "shuffleRemoteBlocksFetched"),
        FieldSpec::optional("shuffle_local_blocks_fetched", "shuffleLocalBlocksFetched"),
        FieldSpec::optional("shuffle_fetch_wait_time", "shuffleFetchWaitTime"),
        FieldSpec::optional("shuffle_remote_bytes_read", "shuffleRemoteBytesRead"),
        FieldSpec::optional("shuffle_remote_bytes_read_to_disk", "shuffleRemoteBytesReadToDisk"),
        FieldSpec::optional("shuffle_local_bytes_read", "shuffleLocalBytesRead"),
        FieldSpec::optional("shuffle_read_bytes", "shuffleReadBytes"),
        FieldSpec::optional("shuffle_read_records", "shuffleReadRecords"),
        FieldSpec::optional(
            "shuffle_corrupt_merged_block_chunks",
            "shuffleCorruptMergedBlockChunks",
        ),
        FieldSpec::optional(
            "shuffle_merged_fetch_fallback_count",
            "shuffleMergedFetchFallbackCount",
        ),
        FieldSpec::optional(
            "shuffle_merged_remote_blocks_fetched",
            "shuffleMergedRemoteBlocksFetched",
        ),
        FieldSpec::optional(
            "shuffle_merged_local_blocks_fetched",
            "shuffleMergedLocalBlocksFetched",
        ),
        FieldSpec::optional(
            "shuffle_merged_remote_chunks_fetched",
            "shuffleMergedRemoteChunksFetched",
        ),
        FieldSpec::optional(
            "shuffle_merged_local_chunks_fetched",
            "shuffleMergedLocalChunksFetched",
        ),
        FieldSpec::optional("shuffle_merged_remote_bytes_read", "shuffleMergedRemoteBytesRead"),
        FieldSpec::optional("shuffle_merged_local_bytes_read", "shuffleMergedLocalBytesRead"),
        FieldSpec::optional("shuffle_remote_reqs_duration", "shuffleRemoteReqsDuration"),
        FieldSpec::optional(
            "shuffle_merged_remote_reqs_duration",
            "shuffleMergedRemoteReqsDuration",
        ),
        FieldSpec::optional("shuffle_write_bytes", "shuffleWriteBytes"),
        FieldSpec::optional("shuffle_write_time", "shuffleWriteTime"),
        FieldSpec::optional("shuffle_write_records", "shuffleWriteRecords"),
        FieldSpec::required("name", "name"),
        FieldSpec::optional("description", "description"),
        FieldSpec::required("details", "details"),
        FieldSpec::optional("scheduling_pool", "schedulingPool"),
        FieldSpec::optional("accumulator_updates", "accumulatorUpdates"),
        FieldSpec::optional("tasks", "tasks"),
        FieldSpec::optional("executor_summary", "executorSummary"),
        FieldSpec::optional("speculation_summary", "speculationSummary"),
        FieldSpec::optional("killed_tasks_summary", "killedTasksSummary"),
        FieldSpec::optional("resource_profile_id", "resourceProfileId"),
        FieldSpec::optional("peak_executor_metrics", "peakExecutorMetrics"),
        FieldSpec::optional("task_metrics_distributions", "taskMetricsDistributions"),
        FieldSpec::optional("executor_metrics_distributions", "executorMetricsDistributions"),
        FieldSpec::optional("is_shuffle_push_enabled", "isShufflePushEnabled"),
        FieldSpec::optional("shuffle_mergers_count", "shuffleMergersCount"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let status = r.required_enum("status");
        let stage_id = r.required("stage_id");
        let attempt_id = r.required("attempt_id");
        let name = r.required("name");
        let details = r.required("details");
        Some(Self {
            num_tasks: r.optional("num_tasks"),
            num_active_tasks: r.optional("num_active_tasks"),
            num_complete_tasks: r.optional("num_complete_tasks"),
            num_failed_tasks: r.optional("num_failed_tasks"),
            num_killed_tasks: r.optional("num_killed_tasks"),
            num_completed_indices: r.optional("num_completed_indices"),
            submission_time: r.optional("submission_time"),
            first_task_launched_time: r.optional("first_task_launched_time"),
            completion_time: r.optional("completion_time"),
            failure_reason: r.optional("failure_reason"),
            executor_deserialize_time: r.optional("executor_deserialize_time"),
            executor_deserialize_cpu_time: r.optional("executor_deserialize_cpu_time"),
            executor_run_time: r.optional("executor_run_time"),
            executor_cpu_time: r.optional("executor_cpu_time"),
            result_size: r.optional("result_size"),
            jvm_gc_time: r.optional("jvm_gc_time"),
            result_serialization_time: r.optional("result_serialization_time"),
            memory_bytes_spilled: r.optional("memory_bytes_spilled"),
            disk_bytes_spilled: r.optional("disk_bytes_spilled"),
            peak_execution_memory: r.optional("peak_execution_memory"),
            input_bytes: r.optional("input_bytes"),
            input_records: r.optional("input_records"),
            output_bytes: r.optional("output_bytes"),
            output_records: r.optional("output_records"),
            shuffle_remote_blocks_fetched: r.optional("shuffle_remote_blocks_fetched"),
            shuffle_local_blocks_fetched: r.optional("shuffle_local_blocks_fetched"),
            shuffle_fetch_wait_time: r.optional("shuffle_fetch_wait_time"),
            shuffle_remote_bytes_read: r.optional("shuffle_remote_bytes_read"),
            shuffle_remote_bytes_read_to_disk: r.optional("shuffle_remote_bytes_read_to_disk"),
            shuffle_local_bytes_read: r.optional("shuffle_local_bytes_read"),
            shuffle_read_bytes: r.optional("shuffle_read_bytes"),
            shuffle_read_records: r.optional("shuffle_read_records"),
            shuffle_corrupt_merged_block_chunks: r.defaulted("shuffle_corrupt_merged_block_chunks"),
            shuffle_merged_fetch_fallback_count: r.defaulted("shuffle_merged_fetch_fallback_count"),
            shuffle_merged_remote_blocks_fetched: r
                .defaulted("shuffle_merged_remote_blocks_fetched"),
            shuffle_merged_local_blocks_fetched: r.defaulted("shuffle_merged_local_blocks_fetched"),
            shuffle_merged_remote_chunks_fetched: r
                .defaulted("shuffle_merged_remote_chunks_fetched"),
            shuffle_merged_local_chunks_fetched: r.defaulted("shuffle_merged_local_chunks_fetched"),
            shuffle_merged_remote_bytes_read: r.defaulted("shuffle_merged_remote_bytes_read"),
            shuffle_merged_local_bytes_read: r.defaulted("shuffle_merged_local_bytes_read"),
            shuffle_remote_reqs_duration: r.defaulted("shuffle_remote_reqs_duration"),
            shuffle_merged_remote_reqs_duration: r.defaulted("shuffle_merged_remote_reqs_duration"),
            shuffle_write_bytes: r.optional("shuffle_write_bytes"),
            shuffle_write_time: r.optional("shuffle_write_time"),
            shuffle_write_records: r.optional("shuffle_write_records"),
            description: r.optional("description"),
            scheduling_pool: r.optional("scheduling_pool"),
            accumulator_updates: r.optional("accumulator_updates"),
            tasks: r.optional("tasks"),
            executor_summary: r.optional("executor_summary"),
            speculation_summary: r.optional("speculation_summary"),
            killed_tasks_summary: r.defaulted("killed_tasks_summary"),
            resource_profile_id: r.optional("resource_profile_id"),
            peak_executor_metrics: r.optional("peak_executor_metrics"),
            task_metrics_distributions: r.optional("task_metrics_distributions"),
            executor_metrics_distributions: r.optional("executor_metrics_distributions"),
            is_shuffle_push_enabled: r.defaulted("is_shuffle_push_enabled"),
            shuffle_mergers_count: r.defaulted("shuffle_mergers_count"),
            status: status?,
            stage_id: stage_id?,
            attempt_id: attempt_id?,
            name: name?,
            details: details?,
        })
    }

    fn check(&self, path: &FieldPath, warnings: &mut Vec<Anomaly>) {
        check_non_negative(
            path,
            warnings,
            &[
                ("num_tasks", self.num_tasks),
                ("num_active_tasks", self.num_active_tasks),
                ("num_complete_tasks", self.num_complete_tasks),
                ("num_failed_tasks", self.num_failed_tasks),
                ("num_killed_tasks", self.num_killed_tasks),
            ],
        );
        check_sub_counts(
            path,
            warnings,
            ("num_tasks", self.num_tasks),
            &[
                self.num_active_tasks,
                self.num_complete_tasks,
                self.num_failed_tasks,
                self.num_killed_tasks,
            ],
        );
        check_ordered(
            path,
            warnings,
            ("submission_time", self.submission_time.as_ref()),
            ("first_task_launched_time", self.first_task_launched_time.as_ref()),
        );
        check_ordered(
            path,
            warnings,
            ("submission_time", self.submission_time.as_ref()),
            ("completion_time", self.completion_time.as_ref()),
        );
    }
}

/// One stage's totals for a single executor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorStageSummary {
    pub task_time: Option<i64>,
    pub failed_tasks: Option<i64>,
    pub succeeded_tasks: Option<i64>,
    pub killed_tasks: Option<i64>,
    pub input_bytes: Option<i64>,
    pub input_records: Option<i64>,
    pub output_bytes: Option<i64>,
    pub output_records: Option<i64>,
    pub shuffle_read: Option<i64>,
    pub shuffle_read_records: Option<i64>,
    pub shuffle_write: Option<i64>,
    pub shuffle_write_records: Option<i64>,
    pub memory_bytes_spilled: Option<i64>,
    pub disk_bytes_spilled: Option<i64>,
    /// Pre-3.1 name of `is_excluded_for_stage`.
    pub is_blacklisted_for_stage: Option<bool>,
    pub peak_memory_metrics: Option<ExecutorMetrics>,
    pub is_excluded_for_stage: Option<bool>,
}

impl ExecutorStageSummary {
    pub fn is_excluded_any(&self) -> bool {
        self.is_excluded_for_stage.unwrap_or(false)
            || self.is_blacklisted_for_stage.unwrap_or(false)
    }
}

impl Entity for ExecutorStageSummary {
    const NAME: &'static str = "ExecutorStageSummary";
    const LABEL: &'static str = "executor_stage_summary";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("task_time", "taskTime"),
        FieldSpec::optional("failed_tasks", "failedTasks"),
        FieldSpec::optional("succeeded_tasks", "succeededTasks"),
        FieldSpec::optional("killed_tasks", "killedTasks"),
        FieldSpec::optional("input_bytes", "inputBytes"),
        FieldSpec::optional("input_records", "inputRecords"),
        FieldSpec::optional("output_bytes", "outputBytes"),
        FieldSpec::optional("output_records", "outputRecords"),
        FieldSpec::optional("shuffle_read", "shuffleRead"),
        FieldSpec::optional("shuffle_read_records", "shuffleReadRecords"),
        FieldSpec::optional("shuffle_write", "shuffleWrite"),
        FieldSpec::optional("shuffle_write_records", "shuffleWriteRecords"),
        FieldSpec::optional("memory_bytes_spilled", "memoryBytesSpilled"),
        FieldSpec::optional("disk_bytes_spilled", "diskBytesSpilled"),
        FieldSpec::optional("is_blacklisted_for_stage", "isBlacklistedForStage"),
        FieldSpec::optional("peak_memory_metrics", "peakMemoryMetrics"),
        FieldSpec::optional("is_excluded_for_stage", "isExcludedForStage"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            task_time: r.optional("task_time"),
            failed_tasks: r.optional("failed_tasks"),
            succeeded_tasks: r.optional("succeeded_tasks"),
            killed_tasks: r.optional("killed_tasks"),
            input_bytes: r.optional("input_bytes"),
            input_records: r.optional("input_records"),
            output_bytes: r.optional("output_bytes"),
            output_records: r.optional("output_records"),
            shuffle_read: r.optional("shuffle_read"),
            shuffle_read_records: r.optional("shuffle_read_records"),
            shuffle_write: r.optional("shuffle_write"),
            shuffle_write_records: r.optional("shuffle_write_records"),
            memory_bytes_spilled: r.optional("memory_bytes_spilled"),
            disk_bytes_spilled: r.optional("disk_bytes_spilled"),
            is_blacklisted_for_stage: r.optional("is_blacklisted_for_stage"),
            peak_memory_metrics: r.optional("peak_memory_metrics"),
            is_excluded_for_stage: r.optional("is_excluded_for_stage"),
        })
    }

    fn check(&self, path: &FieldPath, warnings: &mut Vec<Anomaly>) {
        check_non_negative(
            path,
            warnings,
            &[
                ("failed_tasks", self.failed_tasks),
                ("succeeded_tasks", self.succeeded_tasks),
                ("killed_tasks", self.killed_tasks),
            ],
        );
    }
}

/// Counters for speculative task copies within a stage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeculationStageSummary {
    pub num_tasks: Option<i64>,
    pub num_active_tasks: Option<i64>,
    pub num_completed_tasks: Option<i64>,
    pub num_failed_tasks: Option<i64>,
    pub num_killed_tasks: Option<i64>,
}

impl Entity for SpeculationStageSummary {
    const NAME: &'static str = "SpeculationStageSummary";
    const LABEL: &'static str = "speculation_summary";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("num_tasks", "numTasks"),
        FieldSpec::optional("num_active_tasks", "numActiveTasks"),
        FieldSpec::optional("num_completed_tasks", "numCompletedTasks"),
        FieldSpec::optional("num_failed_tasks", "numFailedTasks"),
        FieldSpec::optional("num_killed_tasks", "numKilledTasks"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            num_tasks: r.optional("num_tasks"),
            num_active_tasks: r.optional("num_active_tasks"),
            num_completed_tasks: r.optional("num_completed_tasks"),
            num_failed_tasks: r.optional("num_failed_tasks"),
            num_killed_tasks: r.optional("num_killed_tasks"),
        })
    }

    fn check(&self, path: &FieldPath, warnings: &mut Vec<Anomaly>) {
        check_sub_counts(
            path,
            warnings,
            ("num_tasks", self.num_tasks),
            &[
                self.num_active_tasks,
                self.num_completed_tasks,
                self.num_failed_tasks,
                self.num_killed_tasks,
            ],
        );
    }
}

/// A single task attempt. `(index, attempt)` identifies a retry of the same
/// partition within a stage attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskData {
    pub task_id: i64,
    pub index: i64,
    pub attempt: i64,
    pub partition_id: Option<i64>,
    pub launch_time: Option<Timestamp>,
    pub result_fetch_start: Option<Timestamp>,
    pub duration: Option<i64>,
    pub executor_id: Option<String>,
    pub host: String,
    pub status: TaskStatus,
    pub task_locality: Option<String>,
    pub speculative: bool,
    pub accumulator_updates: Option<Vec<AccumulableInfo>>,
    pub error_message: Option<String>,
    pub task_metrics: Option<TaskMetrics>,
    pub executor_logs: HashMap<String, String>,
    pub scheduler_delay: i64,
    pub getting_result_time: i64,
}

impl TaskData {
    pub fn retry_key(&self) -> (i64, i64) {
        (self.index, self.attempt)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TaskStatus::Failed | TaskStatus::Killed)
    }
}

impl Entity for TaskData {
    const NAME: &'static str = "TaskData";
    const LABEL: &'static str = "task";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("task_id", "taskId"),
        FieldSpec::required("index", "index"),
        FieldSpec::required("attempt", "attempt"),
        FieldSpec::optional("partition_id", "partitionId"),
        FieldSpec::optional("launch_time", "launchTime"),
        FieldSpec::optional("result_fetch_start", "resultFetchStart"),
        FieldSpec::optional("duration", "duration"),
        FieldSpec::optional("executor_id", "executorId"),
        FieldSpec::required("host", "host"),
        FieldSpec::required("status", "status"),
        FieldSpec::optional("task_locality", "taskLocality"),
        FieldSpec::required("speculative", "speculative"),
        FieldSpec::optional("accumulator_updates", "accumulatorUpdates"),
        FieldSpec::optional("error_message", "errorMessage"),
        FieldSpec::optional("task_metrics", "taskMetrics"),
        FieldSpec::optional("executor_logs", "executorLogs"),
        FieldSpec::optional("scheduler_delay", "schedulerDelay"),
        FieldSpec::optional("getting_result_time", "gettingResultTime"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let task_id = r.required("task_id");
        let index = r.required("index");
        let attempt = r.required("attempt");
        let host = r.required("host");
        let status = r.required_enum("status");
        let speculative = r.required("speculative");
        Some(Self {
            partition_id: r.optional("partition_id"),
            launch_time: r.optional("launch_time"),
            result_fetch_start: r.optional("result_fetch_start"),
            duration: r.optional("duration"),
            executor_id: r.optional("executor_id"),
            task_locality: r.optional("task_locality"),
            accumulator_updates: r.optional("accumulator_updates"),
            error_message: r.optional("error_message"),
            task_metrics: r.optional("task_metrics"),
            executor_logs: r.defaulted("executor_logs"),
            scheduler_delay: r.defaulted("scheduler_delay"),
            getting_result_time: r.defaulted("getting_result_time"),
            task_id: task_id?,
            index: index?,
            attempt: attempt?,
            host: host?,
            status: status?,
            speculative: speculative?,
        })
    }

    fn check(&self, path: &FieldPath, warnings: &mut Vec<Anomaly>) {
        check_non_negative(path, warnings, &[("duration", self.duration)]);
    }
}

/// A named accumulator value as shown in the UI. Values are pre-rendered text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccumulableInfo {
    pub id: i64,
    pub name: String,
    pub update: Option<String>,
    pub value: String,
}

impl Entity for AccumulableInfo {
    const NAME: &'static str = "AccumulableInfo";
    const LABEL: &'static str = "accumulable";
    const STRICT: bool = true;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("id", "id"),
        FieldSpec::required("name", "name"),
        FieldSpec::optional("update", "update"),
        FieldSpec::required("value", "value"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let id = r.required("id");
        let name = r.required("name");
        let value = r.required("value");
        Some(Self {
            update: r.optional("update"),
            id: id?,
            name: name?,
            value: value?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldErrorKind;
    use crate::schema::normalize;
    use serde_json::{json, Value};

    fn task(id: i64, status: &str) -> Value {
        json!({
            "taskId": id,
            "index": id,
            "attempt": 0,
            "launchTime": "2024-01-15T10:30:01.000GMT",
            "duration": 250,
            "executorId": "1",
            "host": "worker-1",
            "status": status,
            "taskLocality": "PROCESS_LOCAL",
            "speculative": false,
            "taskMetrics": {"executorRunTime": 200, "shuffleReadMetrics": {"remoteBytesRead": 10}}
        })
    }

    #[test]
    fn test_stage_scenario_with_task_map() {
        let payload = json!({
            "status": "ACTIVE",
            "stageId": 3,
            "attemptId": 0,
            "numTasks": 2,
            "numActiveTasks": 1,
            "numCompleteTasks": 1,
            "name": "map at etl.py:42",
            "details": "org.apache.spark.rdd.RDD.map",
            "submissionTime": "2024-01-15T10:30:00.000GMT",
            "tasks": {"0": task(0, "SUCCESS"), "1": task(1, "RUNNING")},
            "executorSummary": {
                "1": {"taskTime": 500, "succeededTasks": 1, "isBlacklistedForStage": false}
            }
        });
        let normalized = normalize::<StageData>(&payload).unwrap();
        assert!(normalized.warnings.is_empty(), "{:?}", normalized.warnings);

        let stage = normalized.value;
        assert_eq!(stage.status, StageStatus::Active);
        assert_eq!(stage.key(), (3, 0));
        let tasks = stage.tasks.as_ref().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks["1"].status, TaskStatus::Running);
        assert_eq!(stage.tasks_with_status(TaskStatus::Success).count(), 1);
        assert!(!stage.executor_summary.as_ref().unwrap()["1"].is_excluded_any());

        assert!(stage.killed_tasks_summary.is_empty());
        assert!(!stage.is_shuffle_push_enabled);
        assert_eq!(stage.shuffle_mergers_count, 0);
        assert_eq!(stage.shuffle_merged_remote_bytes_read, 0);
    }

    #[test]
    fn test_nested_task_failure_carries_full_path() {
        let mut bad = task(3, "SUCCESS");
        bad["taskMetrics"]["shuffleReadMetrics"]["remoteBytesRead"] = json!("lots");
        let payload = json!({
            "status": "COMPLETE",
            "stageId": 1,
            "attemptId": 0,
            "name": "s",
            "details": "",
            "tasks": {"3": bad}
        });
        let err = normalize::<StageData>(&payload).unwrap_err();
        assert_eq!(err.entity(), "StageData");
        let cause = err.first_cause().unwrap();
        assert_eq!(
            cause.path.to_string(),
            r#"stage.tasks["3"].task_metrics.shuffle_read_metrics.remote_bytes_read"#
        );
        assert!(matches!(cause.kind, FieldErrorKind::TypeMismatch { expected: "integer", .. }));
    }

    #[test]
    fn test_missing_task_host_fails_stage() {
        let mut bad = task(0, "FAILED");
        bad.as_object_mut().unwrap().remove("host");
        let payload = json!({
            "status": "FAILED",
            "stageId": 1,
            "attemptId": 1,
            "name": "s",
            "details": "",
            "tasks": {"0": bad}
        });
        let err = normalize::<StageData>(&payload).unwrap_err();
        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].path.to_string(), r#"stage.tasks["0"].host"#);
        assert!(err.field_errors()[0].is_missing());
    }

    #[test]
    fn test_task_defaults() {
        let payload = json!({
            "taskId": 9, "index": 4, "attempt": 1,
            "host": "h", "status": "killed", "speculative": true
        });
        let task = normalize::<TaskData>(&payload).unwrap().value;
        assert_eq!(task.retry_key(), (4, 1));
        assert!(task.is_failed());
        assert!(task.executor_logs.is_empty());
        assert_eq!(task.scheduler_delay, 0);
        assert_eq!(task.getting_result_time, 0);
    }

    #[test]
    fn test_stage_counters_exceeding_total_warn() {
        let payload = json!({
            "status": "COMPLETE",
            "stageId": 2,
            "attemptId": 0,
            "name": "s",
            "details": "",
            "numTasks": 2,
            "numCompleteTasks": 2,
            "numFailedTasks": 1,
            "submissionTime": "2024-01-15T10:31:00.000GMT",
            "completionTime": "2024-01-15T10:30:00.000GMT"
        });
        let normalized = normalize::<StageData>(&payload).unwrap();
        let paths: Vec<String> = normalized
            .warnings
            .iter()
            .map(|w| w.path().to_string())
            .collect();
        assert_eq!(paths, vec!["stage.num_tasks", "stage.completion_time"]);
        assert_eq!(normalized.value.duration_ms(), Some(-60_000));
    }

    #[test]
    fn test_huge_counters_do_not_overflow() {
        let payload = json!({
            "status": "ACTIVE",
            "stageId": 3,
            "attemptId": 0,
            "name": "s",
            "details": "",
            "numTasks": 5,
            "numActiveTasks": i64::MAX,
            "numCompleteTasks": i64::MAX,
            "memoryBytesSpilled": i64::MAX,
            "diskBytesSpilled": i64::MAX
        });
        let normalized = normalize::<StageData>(&payload).unwrap();
        assert_eq!(normalized.warnings.len(), 1);
        assert_eq!(normalized.warnings[0].path().to_string(), "stage.num_tasks");
        assert_eq!(normalized.value.total_spilled_bytes(), i64::MAX);
    }

    #[test]
    fn test_accumulable_is_strict() {
        let payload = json!({"id": 1, "name": "records", "value": "10", "metricType": "sum"});
        let normalized = normalize::<AccumulableInfo>(&payload).unwrap();
        assert_eq!(normalized.value.value, "10");
        assert_eq!(normalized.warnings.len(), 1);
        assert_eq!(
            normalized.warnings[0].to_string(),
            r#"accumulable["metricType"]: field not declared by AccumulableInfo"#
        );
    }
}
