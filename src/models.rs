use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::coerce::{Timestamp, WireEnum};
use crate::error::{Anomaly, FieldPath};
use crate::schema::{
    check_non_negative, check_ordered, check_sub_counts, Entity, FieldSpec, Reader,
};

/// Job status enum
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobExecutionStatus {
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl WireEnum for JobExecutionStatus {
    const ENUM_NAME: &'static str = "JobExecutionStatus";
    const MEMBERS: &'static [Self] = &[Self::Running, Self::Succeeded, Self::Failed, Self::Unknown];

    fn value(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Stage status enum
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum StageStatus {
    Pending,
    Active,
    Complete,
    Skipped,
    Failed,
}

impl WireEnum for StageStatus {
    const ENUM_NAME: &'static str = "StageStatus";
    const MEMBERS: &'static [Self] = &[
        Self::Pending,
        Self::Active,
        Self::Complete,
        Self::Skipped,
        Self::Failed,
    ];

    fn value(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Complete => "COMPLETE",
            Self::Skipped => "SKIPPED",
            Self::Failed => "FAILED",
        }
    }
}

/// Task status enum
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Running,
    Killed,
    Failed,
    Success,
    Unknown,
}

impl WireEnum for TaskStatus {
    const ENUM_NAME: &'static str = "TaskStatus";
    const MEMBERS: &'static [Self] = &[
        Self::Running,
        Self::Killed,
        Self::Failed,
        Self::Success,
        Self::Unknown,
    ];

    fn value(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Killed => "KILLED",
            Self::Failed => "FAILED",
            Self::Success => "SUCCESS",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Sort order of the task list endpoint. Accepts the short `runtime` and
/// `-runtime` spellings older clients send.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskSorting {
    Id,
    IncreasingRuntime,
    DecreasingRuntime,
}

impl WireEnum for TaskSorting {
    const ENUM_NAME: &'static str = "TaskSorting";
    const MEMBERS: &'static [Self] = &[Self::Id, Self::IncreasingRuntime, Self::DecreasingRuntime];

    fn value(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::IncreasingRuntime => "INCREASING_RUNTIME",
            Self::DecreasingRuntime => "DECREASING_RUNTIME",
        }
    }

    fn aliases() -> &'static [(&'static str, Self)] {
        &[
            ("runtime", Self::IncreasingRuntime),
            ("-runtime", Self::DecreasingRuntime),
        ]
    }
}

/// Application status enum
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApplicationStatus {
    Completed,
    Running,
}

impl WireEnum for ApplicationStatus {
    const ENUM_NAME: &'static str = "ApplicationStatus";
    const MEMBERS: &'static [Self] = &[Self::Completed, Self::Running];

    fn value(self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Running => "RUNNING",
        }
    }
}

/// Query-parameter form of a status filter, e.g. `status=running`.
pub fn query_param<E: WireEnum>(member: E) -> String {
    member.value().to_lowercase()
}

/// Represents a Spark application with its metadata and attempts
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationInfo {
    pub id: String,
    pub name: String,
    pub cores_granted: Option<i64>,
    pub max_cores: Option<i64>,
    pub cores_per_executor: Option<i64>,
    #[serde(rename = "memoryPerExecutorMB")]
    pub memory_per_executor_mb: Option<i64>,
    pub attempts: Vec<ApplicationAttemptInfo>,
}

impl ApplicationInfo {
    /// The most recent attempt. Spark lists attempts newest first.
    pub fn latest_attempt(&self) -> Option<&ApplicationAttemptInfo> {
        self.attempts.first()
    }

    pub fn status(&self) -> Option<ApplicationStatus> {
        self.latest_attempt().map(|attempt| {
            if attempt.completed {
                ApplicationStatus::Completed
            } else {
                ApplicationStatus::Running
            }
        })
    }
}

impl Entity for ApplicationInfo {
    const NAME: &'static str = "ApplicationInfo";
    const LABEL: &'static str = "application";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("id", "id"),
        FieldSpec::required("name", "name"),
        FieldSpec::optional("cores_granted", "coresGranted"),
        FieldSpec::optional("max_cores", "maxCores"),
        FieldSpec::optional("cores_per_executor", "coresPerExecutor"),
        FieldSpec::optional("memory_per_executor_mb", "memoryPerExecutorMB"),
        FieldSpec::required("attempts", "attempts"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let id = r.required("id");
        let name = r.required("name");
        let attempts = r.required("attempts");
        Some(Self {
            cores_granted: r.optional("cores_granted"),
            max_cores: r.optional("max_cores"),
            cores_per_executor: r.optional("cores_per_executor"),
            memory_per_executor_mb: r.optional("memory_per_executor_mb"),
            id: id?,
            name: name?,
            attempts: attempts?,
        })
    }

    fn check(&self, path: &FieldPath, warnings: &mut Vec<Anomaly>) {
        if self.attempts.is_empty() {
            warnings.push(Anomaly::Inconsistent {
                path: path.field("attempts"),
                detail: "application has no attempts".to_string(),
            });
        }
    }
}

/// Represents a single attempt of a Spark application
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationAttemptInfo {
    pub attempt_id: Option<String>,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub last_updated: Option<Timestamp>,
    pub duration: i64,
    pub spark_user: Option<String>,
    pub app_spark_version: Option<String>,
    pub completed: bool,
}

impl Entity for ApplicationAttemptInfo {
    const NAME: &'static str = "ApplicationAttemptInfo";
    const LABEL: &'static str = "attempt";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("attempt_id", "attemptId"),
        FieldSpec::optional("start_time", "startTime"),
        FieldSpec::optional("end_time", "endTime"),
        FieldSpec::optional("last_updated", "lastUpdated"),
        FieldSpec::required("duration", "duration"),
        FieldSpec::optional("spark_user", "sparkUser"),
        FieldSpec::optional("app_spark_version", "appSparkVersion"),
        FieldSpec::optional("completed", "completed"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let duration = r.required("duration");
        Some(Self {
            attempt_id: r.optional("attempt_id"),
            start_time: r.optional("start_time"),
            end_time: r.optional("end_time"),
            last_updated: r.optional("last_updated"),
            spark_user: r.optional("spark_user"),
            app_spark_version: r.optional("app_spark_version"),
            completed: r.defaulted("completed"),
            duration: duration?,
        })
    }

    /// Running attempts are reported with an end time of `-1` ms
    /// (`1969-12-31T23:59:59.999GMT`). That sentinel is not treated as an end
    /// time by either check.
    fn check(&self, path: &FieldPath, warnings: &mut Vec<Anomaly>) {
        let end_time = self
            .end_time
            .as_ref()
            .filter(|end| end.epoch_millis().map_or(true, |millis| millis >= 0));
        check_ordered(
            path,
            warnings,
            ("start_time", self.start_time.as_ref()),
            ("end_time", end_time),
        );
        let ended = end_time.and_then(Timestamp::epoch_millis).is_some();
        if self.completed && self.end_time.is_none() {
            warnings.push(Anomaly::Inconsistent {
                path: path.field("completed"),
                detail: "attempt is completed but has no end_time".to_string(),
            });
        } else if !self.completed && ended {
            warnings.push(Anomaly::Inconsistent {
                path: path.field("completed"),
                detail: "attempt has an end_time but is not completed".to_string(),
            });
        }
    }
}

/// A resource profile with its executor and task requirements
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProfileInfo {
    pub id: i64,
    pub executor_resources: Option<HashMap<String, ExecutorResourceRequest>>,
    pub task_resources: Option<HashMap<String, TaskResourceRequest>>,
}

impl Entity for ResourceProfileInfo {
    const NAME: &'static str = "ResourceProfileInfo";
    const LABEL: &'static str = "resource_profile";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("id", "id"),
        FieldSpec::optional("executor_resources", "executorResources"),
        FieldSpec::optional("task_resources", "taskResources"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let id = r.required("id");
        Some(Self {
            executor_resources: r.optional("executor_resources"),
            task_resources: r.optional("task_resources"),
            id: id?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorResourceRequest {
    pub resource_name: String,
    pub amount: i64,
    pub discovery_script: Option<String>,
    pub vendor: Option<String>,
}

impl Entity for ExecutorResourceRequest {
    const NAME: &'static str = "ExecutorResourceRequest";
    const LABEL: &'static str = "executor_resource";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("resource_name", "resourceName"),
        FieldSpec::required("amount", "amount"),
        FieldSpec::optional("discovery_script", "discoveryScript"),
        FieldSpec::optional("vendor", "vendor"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let resource_name = r.required("resource_name");
        let amount = r.required("amount");
        Some(Self {
            discovery_script: r.optional("discovery_script"),
            vendor: r.optional("vendor"),
            resource_name: resource_name?,
            amount: amount?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResourceRequest {
    pub resource_name: String,
    pub amount: f64,
}

impl Entity for TaskResourceRequest {
    const NAME: &'static str = "TaskResourceRequest";
    const LABEL: &'static str = "task_resource";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("resource_name", "resourceName"),
        FieldSpec::required("amount", "amount"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let resource_name = r.required("resource_name");
        let amount = r.required("amount");
        Some(Self {
            resource_name: resource_name?,
            amount: amount?,
        })
    }
}

/// Resource information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceInformation {
    pub name: String,
    pub addresses: Vec<String>,
}

impl Entity for ResourceInformation {
    const NAME: &'static str = "ResourceInformation";
    const LABEL: &'static str = "resource";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("name", "name"),
        FieldSpec::optional("addresses", "addresses"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let name = r.required("name");
        Some(Self {
            addresses: r.defaulted("addresses"),
            name: name?,
        })
    }
}

/// Peak executor metrics, keyed by metric name (`JVMHeapMemory`, ...).
///
/// Spark sends the metrics as a flat object; some clients wrap them as
/// `{"metrics": {...}}`. Both are accepted and the flat form is emitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExecutorMetrics {
    pub metrics: HashMap<String, i64>,
}

impl ExecutorMetrics {
    pub fn get(&self, name: &str) -> Option<i64> {
        self.metrics.get(name).copied()
    }
}

impl Entity for ExecutorMetrics {
    const NAME: &'static str = "ExecutorMetrics";
    const LABEL: &'static str = "executor_metrics";
    const FIELDS: &'static [FieldSpec] = &[FieldSpec::optional("metrics", "metrics")];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let wrapped = r.payload().len() == 1
            && r.payload().get("metrics").is_some_and(|v| v.is_object());
        let metrics = if wrapped {
            r.defaulted("metrics")
        } else {
            r.entries()
        };
        Some(Self { metrics })
    }
}

/// Executor summary information
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorSummary {
    pub id: String,
    pub host_port: Option<String>,
    pub is_active: Option<bool>,
    pub rdd_blocks: Option<i64>,
    pub memory_used: Option<i64>,
    pub disk_used: Option<i64>,
    pub total_cores: Option<i64>,
    pub max_tasks: Option<i64>,
    pub active_tasks: Option<i64>,
    pub failed_tasks: Option<i64>,
    pub completed_tasks: Option<i64>,
    pub total_tasks: Option<i64>,
    pub total_duration: Option<i64>,
    #[serde(rename = "totalGCTime")]
    pub total_gc_time: Option<i64>,
    pub total_input_bytes: Option<i64>,
    pub total_shuffle_read: Option<i64>,
    pub total_shuffle_write: Option<i64>,
    /// Pre-3.1 name of `is_excluded`.
    pub is_blacklisted: Option<bool>,
    pub max_memory: Option<i64>,
    pub add_time: Option<Timestamp>,
    pub remove_time: Option<Timestamp>,
    pub remove_reason: Option<String>,
    pub executor_logs: Option<HashMap<String, String>>,
    pub memory_metrics: Option<MemoryMetrics>,
    /// Pre-3.1 name of `excluded_in_stages`.
    pub blacklisted_in_stages: BTreeSet<i64>,
    pub peak_memory_metrics: Option<ExecutorMetrics>,
    pub attributes: HashMap<String, String>,
    pub resources: HashMap<String, ResourceInformation>,
    pub resource_profile_id: Option<i64>,
    pub is_excluded: Option<bool>,
    pub excluded_in_stages: BTreeSet<i64>,
}

impl ExecutorSummary {
    /// Excluded under either the current or the legacy terminology.
    pub fn is_excluded_any(&self) -> bool {
        self.is_excluded.unwrap_or(false) || self.is_blacklisted.unwrap_or(false)
    }

    /// Stages the executor is excluded from, under either terminology.
    pub fn all_excluded_stages(&self) -> BTreeSet<i64> {
        self.excluded_in_stages
            .union(&self.blacklisted_in_stages)
            .copied()
            .collect()
    }

    pub fn is_driver(&self) -> bool {
        self.id == "driver"
    }
}

impl Entity for ExecutorSummary {
    const NAME: &'static str = "ExecutorSummary";
    const LABEL: &'static str = "executor";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("id", "id"),
        FieldSpec::optional("host_port", "hostPort"),
        FieldSpec::optional("is_active", "isActive"),
        FieldSpec::optional("rdd_blocks", "rddBlocks"),
        FieldSpec::optional("memory_used", "memoryUsed"),
        FieldSpec::optional("disk_used", "diskUsed"),
        FieldSpec::optional("total_cores", "totalCores"),
        FieldSpec::optional("max_tasks", "maxTasks"),
        FieldSpec::optional("active_tasks", "activeTasks"),
        FieldSpec::optional("failed_tasks", "failedTasks"),
        FieldSpec::optional("completed_tasks", "completedTasks"),
        FieldSpec::optional("total_tasks", "totalTasks"),
        FieldSpec::optional("total_duration", "totalDuration"),
        FieldSpec::optional("total_gc_time", "totalGCTime"),
        FieldSpec::optional("total_input_bytes", "totalInputBytes"),
        FieldSpec::optional("total_shuffle_read", "totalShuffleRead"),
        FieldSpec::optional("total_shuffle_write", "totalShuffleWrite"),
        FieldSpec::optional("is_blacklisted", "isBlacklisted"),
        FieldSpec::optional("max_memory", "maxMemory"),
        FieldSpec::optional("add_time", "addTime"),
        FieldSpec::optional("remove_time", "removeTime"),
        FieldSpec::optional("remove_reason", "removeReason"),
        FieldSpec::optional("executor_logs", "executorLogs"),
        FieldSpec::optional("memory_metrics", "memoryMetrics"),
        FieldSpec::optional("blacklisted_in_stages", "blacklistedInStages"),
        FieldSpec::optional("peak_memory_metrics", "peakMemoryMetrics"),
        FieldSpec::required("attributes", "attributes"),
        FieldSpec::required("resources", "resources"),
        FieldSpec::optional("resource_profile_id", "resourceProfileId"),
        FieldSpec::optional("is_excluded", "isExcluded"),
        FieldSpec::optional("excluded_in_stages", "excludedInStages"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let id = r.required("id");
        let attributes = r.required("attributes");
        let resources = r.required("resources");
        Some(Self {
            host_port: r.optional("host_port"),
            is_active: r.optional("is_active"),
            rdd_blocks: r.optional("rdd_blocks"),
            memory_used: r.optional("memory_used"),
            disk_used: r.optional("disk_used"),
            total_cores: r.optional("total_cores"),
            max_tasks: r.optional("max_tasks"),
            active_tasks: r.optional("active_tasks"),
            failed_tasks: r.optional("failed_tasks"),
            completed_tasks: r.optional("completed_tasks"),
            total_tasks: r.optional("total_tasks"),
            total_duration: r.optional("total_duration"),
            total_gc_time: r.optional("total_gc_time"),
            total_input_bytes: r.optional("total_input_bytes"),
            total_shuffle_read: r.optional("total_shuffle_read"),
            total_shuffle_write: r.optional("total_shuffle_write"),
            is_blacklisted: r.optional("is_blacklisted"),
            max_memory: r.optional("max_memory"),
            add_time: r.optional("add_time"),
            remove_time: r.optional("remove_time"),
            remove_reason: r.optional("remove_reason"),
            executor_logs: r.optional("executor_logs"),
            memory_metrics: r.optional("memory_metrics"),
            blacklisted_in_stages: r.defaulted("blacklisted_in_stages"),
            peak_memory_metrics: r.optional("peak_memory_metrics"),
            resource_profile_id: r.optional("resource_profile_id"),
            is_excluded: r.optional("is_excluded"),
            excluded_in_stages: r.defaulted("excluded_in_stages"),
            id: id?,
            attributes: attributes?,
            resources: resources?,
        })
    }

    fn check(&self, path: &FieldPath, warnings: &mut Vec<Anomaly>) {
        check_ordered(
            path,
            warnings,
            ("add_time", self.add_time.as_ref()),
            ("remove_time", self.remove_time.as_ref()),
        );
        check_non_negative(
            path,
            warnings,
            &[
                ("active_tasks", self.active_tasks),
                ("failed_tasks", self.failed_tasks),
                ("completed_tasks", self.completed_tasks),
                ("total_tasks", self.total_tasks),
            ],
        );
    }
}

/// Memory metrics for executors
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetrics {
    pub used_on_heap_storage_memory: Option<i64>,
    pub used_off_heap_storage_memory: Option<i64>,
    pub total_on_heap_storage_memory: Option<i64>,
    pub total_off_heap_storage_memory: Option<i64>,
}

impl Entity for MemoryMetrics {
    const NAME: &'static str = "MemoryMetrics";
    const LABEL: &'static str = "memory_metrics";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("used_on_heap_storage_memory", "usedOnHeapStorageMemory"),
        FieldSpec::optional("used_off_heap_storage_memory", "usedOffHeapStorageMemory"),
        FieldSpec::optional("total_on_heap_storage_memory", "totalOnHeapStorageMemory"),
        FieldSpec::optional("total_off_heap_storage_memory", "totalOffHeapStorageMemory"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            used_on_heap_storage_memory: r.optional("used_on_heap_storage_memory"),
            used_off_heap_storage_memory: r.optional("used_off_heap_storage_memory"),
            total_on_heap_storage_memory: r.optional("total_on_heap_storage_memory"),
            total_off_heap_storage_memory: r.optional("total_off_heap_storage_memory"),
        })
    }
}

/// A non-executor process (e.g. an external shuffle service)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSummary {
    pub id: String,
    pub host_port: Option<String>,
    pub is_active: Option<bool>,
    pub total_cores: Option<i64>,
    pub add_time: Option<Timestamp>,
    pub remove_time: Option<Timestamp>,
    pub process_logs: Option<HashMap<String, String>>,
}

impl Entity for ProcessSummary {
    const NAME: &'static str = "ProcessSummary";
    const LABEL: &'static str = "process";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("id", "id"),
        FieldSpec::optional("host_port", "hostPort"),
        FieldSpec::optional("is_active", "isActive"),
        FieldSpec::optional("total_cores", "totalCores"),
        FieldSpec::optional("add_time", "addTime"),
        FieldSpec::optional("remove_time", "removeTime"),
        FieldSpec::optional("process_logs", "processLogs"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let id = r.required("id");
        Some(Self {
            host_port: r.optional("host_port"),
            is_active: r.optional("is_active"),
            total_cores: r.optional("total_cores"),
            add_time: r.optional("add_time"),
            remove_time: r.optional("remove_time"),
            process_logs: r.optional("process_logs"),
            id: id?,
        })
    }

    fn check(&self, path: &FieldPath, warnings: &mut Vec<Anomaly>) {
        check_ordered(
            path,
            warnings,
            ("add_time", self.add_time.as_ref()),
            ("remove_time", self.remove_time.as_ref()),
        );
    }
}

/// Job information
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    pub job_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub submission_time: Option<Timestamp>,
    pub completion_time: Option<Timestamp>,
    /// Stages by id; the stages themselves are fetched separately.
    pub stage_ids: Option<Vec<i64>>,
    pub job_group: Option<String>,
    pub job_tags: Vec<String>,
    pub status: JobExecutionStatus,
    pub num_tasks: Option<i64>,
    pub num_active_tasks: Option<i64>,
    pub num_completed_tasks: Option<i64>,
    pub num_skipped_tasks: Option<i64>,
    pub num_failed_tasks: Option<i64>,
    pub num_killed_tasks: Option<i64>,
    pub num_completed_indices: Option<i64>,
    pub num_active_stages: Option<i64>,
    pub num_completed_stages: Option<i64>,
    pub num_skipped_stages: Option<i64>,
    pub num_failed_stages: Option<i64>,
    pub killed_tasks_summary: HashMap<String, i64>,
}

impl JobData {
    /// Wall-clock duration, when both ends are known instants.
    pub fn duration_ms(&self) -> Option<i64> {
        let start = self.submission_time.as_ref()?.epoch_millis()?;
        let end = self.completion_time.as_ref()?.epoch_millis()?;
        end.checked_sub(start)
    }
}

impl Entity for JobData {
    const NAME: &'static str = "JobData";
    const LABEL: &'static str = "job";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("job_id", "jobId"),
        FieldSpec::required("name", "name"),
        FieldSpec::optional("description", "description"),
        FieldSpec::optional("submission_time", "submissionTime"),
        FieldSpec::optional("completion_time", "completionTime"),
        FieldSpec::optional("stage_ids", "stageIds"),
        FieldSpec::optional("job_group", "jobGroup"),
        FieldSpec::optional("job_tags", "jobTags"),
        FieldSpec::required("status", "status"),
        FieldSpec::optional("num_tasks", "numTasks"),
        FieldSpec::optional("num_active_tasks", "numActiveTasks"),
        FieldSpec::optional("num_completed_tasks", "numCompletedTasks"),
        FieldSpec::optional("num_skipped_tasks", "numSkippedTasks"),
        FieldSpec::optional("num_failed_tasks", "numFailedTasks"),
        FieldSpec::optional("num_killed_tasks", "numKilledTasks"),
        FieldSpec::optional("num_completed_indices", "numCompletedIndices"),
        FieldSpec::optional("num_active_stages", "numActiveStages"),
        FieldSpec::optional("num_completed_stages", "numCompletedStages"),
        FieldSpec::optional("num_skipped_stages", "numSkippedStages"),
        FieldSpec::optional("num_failed_stages", "numFailedStages"),
        FieldSpec::optional("killed_tasks_summary", "killedTasksSummary"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let job_id = r.required("job_id");
        let name = r.required("name");
        let status = r.required_enum("status");
        Some(Self {
            description: r.optional("description"),
            submission_time: r.optional("submission_time"),
            completion_time: r.optional("completion_time"),
            stage_ids: r.optional("stage_ids"),
            job_group: r.optional("job_group"),
            job_tags: r.defaulted("job_tags"),
            num_tasks: r.optional("num_tasks"),
            num_active_tasks: r.optional("num_active_tasks"),
            num_completed_tasks: r.optional("num_completed_tasks"),
            num_skipped_tasks: r.optional("num_skipped_tasks"),
            num_failed_tasks: r.optional("num_failed_tasks"),
            num_killed_tasks: r.optional("num_killed_tasks"),
            num_completed_indices: r.optional("num_completed_indices"),
            num_active_stages: r.optional("num_active_stages"),
            num_completed_stages: r.optional("num_completed_stages"),
            num_skipped_stages: r.optional("num_skipped_stages"),
            num_failed_stages: r.optional("num_failed_stages"),
            killed_tasks_summary: r.defaulted("killed_tasks_summary"),
            job_id: job_id?,
            name: name?,
            status: status?,
        })
    }

    fn check(&self, path: &FieldPath, warnings: &mut Vec<Anomaly>) {
        check_non_negative(
            path,
            warnings,
            &[
                ("num_tasks", self.num_tasks),
                ("num_active_tasks", self.num_active_tasks),
                ("num_completed_tasks", self.num_completed_tasks),
                ("num_skipped_tasks", self.num_skipped_tasks),
                ("num_failed_tasks", self.num_failed_tasks),
                ("num_killed_tasks", self.num_killed_tasks),
                ("num_active_stages", self.num_active_stages),
                ("num_completed_stages", self.num_completed_stages),
                ("num_skipped_stages", self.num_skipped_stages),
                ("num_failed_stages", self.num_failed_stages),
            ],
        );
        check_sub_counts(
            path,
            warnings,
            ("num_tasks", self.num_tasks),
            &[
                self.num_active_tasks,
                self.num_completed_tasks,
                self.num_failed_tasks,
                self.num_killed_tasks,
                self.num_skipped_tasks,
            ],
        );
        check_ordered(
            path,
            warnings,
            ("submission_time", self.submission_time.as_ref()),
            ("completion_time", self.completion_time.as_ref()),
        );
    }
}

/// RDD storage information
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RddStorageInfo {
    pub id: i64,
    pub name: String,
    pub num_partitions: Option<i64>,
    pub num_cached_partitions: Option<i64>,
    pub storage_level: Option<String>,
    pub memory_used: Option<i64>,
    pub disk_used: Option<i64>,
    pub data_distribution: Option<Vec<RddDataDistribution>>,
    pub partitions: Option<Vec<RddPartitionInfo>>,
}

impl Entity for RddStorageInfo {
    const NAME: &'static str = "RDDStorageInfo";
    const LABEL: &'static str = "rdd";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("id", "id"),
        FieldSpec::required("name", "name"),
        FieldSpec::optional("num_partitions", "numPartitions"),
        FieldSpec::optional("num_cached_partitions", "numCachedPartitions"),
        FieldSpec::optional("storage_level", "storageLevel"),
        FieldSpec::optional("memory_used", "memoryUsed"),
        FieldSpec::optional("disk_used", "diskUsed"),
        FieldSpec::optional("data_distribution", "dataDistribution"),
        FieldSpec::optional("partitions", "partitions"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let id = r.required("id");
        let name = r.required("name");
        Some(Self {
            num_partitions: r.optional("num_partitions"),
            num_cached_partitions: r.optional("num_cached_partitions"),
            storage_level: r.optional("storage_level"),
            memory_used: r.optional("memory_used"),
            disk_used: r.optional("disk_used"),
            data_distribution: r.optional("data_distribution"),
            partitions: r.optional("partitions"),
            id: id?,
            name: name?,
        })
    }
}

/// RDD data distribution per executor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RddDataDistribution {
    pub address: String,
    pub memory_used: Option<i64>,
    pub memory_remaining: Option<i64>,
    pub disk_used: Option<i64>,
    pub on_heap_memory_used: Option<i64>,
    pub off_heap_memory_used: Option<i64>,
    pub on_heap_memory_remaining: Option<i64>,
    pub off_heap_memory_remaining: Option<i64>,
}

impl Entity for RddDataDistribution {
    const NAME: &'static str = "RDDDataDistribution";
    const LABEL: &'static str = "rdd_distribution";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("address", "address"),
        FieldSpec::optional("memory_used", "memoryUsed"),
        FieldSpec::optional("memory_remaining", "memoryRemaining"),
        FieldSpec::optional("disk_used", "diskUsed"),
        FieldSpec::optional("on_heap_memory_used", "onHeapMemoryUsed"),
        FieldSpec::optional("off_heap_memory_used", "offHeapMemoryUsed"),
        FieldSpec::optional("on_heap_memory_remaining", "onHeapMemoryRemaining"),
        FieldSpec::optional("off_heap_memory_remaining", "offHeapMemoryRemaining"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let address = r.required("address");
        Some(Self {
            memory_used: r.optional("memory_used"),
            memory_remaining: r.optional("memory_remaining"),
            disk_used: r.optional("disk_used"),
            on_heap_memory_used: r.optional("on_heap_memory_used"),
            off_heap_memory_used: r.optional("off_heap_memory_used"),
            on_heap_memory_remaining: r.optional("on_heap_memory_remaining"),
            off_heap_memory_remaining: r.optional("off_heap_memory_remaining"),
            address: address?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RddPartitionInfo {
    pub block_name: Option<String>,
    pub storage_level: Option<String>,
    pub memory_used: Option<i64>,
    pub disk_used: Option<i64>,
    pub executors: Vec<String>,
}

impl Entity for RddPartitionInfo {
    const NAME: &'static str = "RDDPartitionInfo";
    const LABEL: &'static str = "rdd_partition";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("block_name", "blockName"),
        FieldSpec::optional("storage_level", "storageLevel"),
        FieldSpec::optional("memory_used", "memoryUsed"),
        FieldSpec::optional("disk_used", "diskUsed"),
        FieldSpec::required("executors", "executors"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let executors = r.required("executors");
        Some(Self {
            block_name: r.optional("block_name"),
            storage_level: r.optional("storage_level"),
            memory_used: r.optional("memory_used"),
            disk_used: r.optional("disk_used"),
            executors: executors?,
        })
    }
}

/// Version information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionInfo {
    pub spark: String,
}

impl Entity for VersionInfo {
    const NAME: &'static str = "VersionInfo";
    const LABEL: &'static str = "version";
    const STRICT: bool = true;
    const FIELDS: &'static [FieldSpec] = &[FieldSpec::required("spark", "spark")];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let spark = r.required("spark");
        Some(Self { spark: spark? })
    }
}

/// Application environment information
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationEnvironmentInfo {
    pub runtime: RuntimeInfo,
    pub spark_properties: Option<Vec<(String, String)>>,
    pub hadoop_properties: Option<Vec<(String, String)>>,
    pub system_properties: Option<Vec<(String, String)>>,
    pub metrics_properties: Option<Vec<(String, String)>>,
    pub classpath_entries: Option<Vec<(String, String)>>,
    pub resource_profiles: Option<Vec<ResourceProfileInfo>>,
}

impl ApplicationEnvironmentInfo {
    pub fn spark_property(&self, key: &str) -> Option<&str> {
        self.spark_properties
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl Entity for ApplicationEnvironmentInfo {
    const NAME: &'static str = "ApplicationEnvironmentInfo";
    const LABEL: &'static str = "environment";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("runtime", "runtime"),
        FieldSpec::optional("spark_properties", "sparkProperties"),
        FieldSpec::optional("hadoop_properties", "hadoopProperties"),
        FieldSpec::optional("system_properties", "systemProperties"),
        FieldSpec::optional("metrics_properties", "metricsProperties"),
        FieldSpec::optional("classpath_entries", "classpathEntries"),
        FieldSpec::optional("resource_profiles", "resourceProfiles"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let runtime = r.required("runtime");
        Some(Self {
            spark_properties: r.optional("spark_properties"),
            hadoop_properties: r.optional("hadoop_properties"),
            system_properties: r.optional("system_properties"),
            metrics_properties: r.optional("metrics_properties"),
            classpath_entries: r.optional("classpath_entries"),
            resource_profiles: r.optional("resource_profiles"),
            runtime: runtime?,
        })
    }
}

/// Runtime information
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    pub java_version: Option<String>,
    pub java_home: Option<String>,
    pub scala_version: Option<String>,
}

impl Entity for RuntimeInfo {
    const NAME: &'static str = "RuntimeInfo";
    const LABEL: &'static str = "runtime";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("java_version", "javaVersion"),
        FieldSpec::optional("java_home", "javaHome"),
        FieldSpec::optional("scala_version", "scalaVersion"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            java_version: r.optional("java_version"),
            java_home: r.optional("java_home"),
            scala_version: r.optional("scala_version"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::normalize;
    use serde_json::json;

    #[test]
    fn test_job_scenario() {
        let payload = json!({
            "jobId": 7,
            "name": "job7",
            "status": "running",
            "stageIds": [1, 2],
            "numTasks": 10,
            "numActiveTasks": 3,
            "numCompletedTasks": 7
        });
        let normalized = normalize::<JobData>(&payload).unwrap();
        let job = normalized.value;
        assert_eq!(job.job_id, 7);
        assert_eq!(job.name, "job7");
        assert_eq!(job.status, JobExecutionStatus::Running);
        assert_eq!(job.stage_ids, Some(vec![1, 2]));
        assert_eq!(job.num_tasks, Some(10));
        assert_eq!(job.num_active_tasks, Some(3));
        assert_eq!(job.num_completed_tasks, Some(7));
        assert!(job.killed_tasks_summary.is_empty());
        assert!(job.job_tags.is_empty());
        assert!(normalized.warnings.is_empty());
    }

    #[test]
    fn test_job_counter_overflow_is_a_warning() {
        let payload = json!({
            "jobId": 1,
            "name": "retried",
            "status": "SUCCEEDED",
            "numTasks": 4,
            "numCompletedTasks": 4,
            "numFailedTasks": 2,
            "numActiveTasks": -1
        });
        let normalized = normalize::<JobData>(&payload).unwrap();
        let details: Vec<String> = normalized.warnings.iter().map(|w| w.to_string()).collect();
        assert_eq!(details.len(), 2, "{:?}", details);
        assert!(details.iter().any(|d| d.starts_with("job.num_active_tasks")));
        assert!(details.iter().any(|d| d.starts_with("job.num_tasks")));
    }

    #[test]
    fn test_attempt_completed_flag_is_literal() {
        let payload = json!({"startTime": 1705314600000i64, "duration": 5});
        let attempt = normalize::<ApplicationAttemptInfo>(&payload).unwrap().value;
        assert!(!attempt.completed);
        assert!(attempt.start_time.is_some());
        assert!(attempt.end_time.is_none());

        let flagged = json!({"startTime": 1705314600000i64, "duration": 5, "completed": true});
        let normalized = normalize::<ApplicationAttemptInfo>(&flagged).unwrap();
        assert!(normalized.value.completed);
        assert_eq!(normalized.warnings.len(), 1);
    }

    #[test]
    fn test_attempt_end_before_start_warns() {
        let payload = json!({
            "startTime": "2024-01-15T10:35:00.000GMT",
            "endTime": "2024-01-15T10:30:00.000GMT",
            "duration": 0,
            "completed": true
        });
        let normalized = normalize::<ApplicationAttemptInfo>(&payload).unwrap();
        let details: Vec<String> = normalized.warnings.iter().map(|w| w.to_string()).collect();
        assert_eq!(
            details,
            vec!["attempt.end_time: end_time precedes start_time".to_string()]
        );
    }

    #[test]
    fn test_running_attempt_sentinel_end_time() {
        let running = json!({
            "startTime": "2024-01-15T10:30:00.000GMT",
            "endTime": "1969-12-31T23:59:59.999GMT",
            "duration": 0,
            "completed": false
        });
        let normalized = normalize::<ApplicationAttemptInfo>(&running).unwrap();
        assert!(normalized.warnings.is_empty(), "{:?}", normalized.warnings);

        let ended = json!({
            "startTime": "2024-01-15T10:30:00.000GMT",
            "endTime": "2024-01-15T10:35:00.000GMT",
            "duration": 300000,
            "completed": false
        });
        let normalized = normalize::<ApplicationAttemptInfo>(&ended).unwrap();
        assert_eq!(normalized.warnings.len(), 1);
        assert_eq!(normalized.warnings[0].path().to_string(), "attempt.completed");
    }

    #[test]
    fn test_job_sub_counts_beyond_i64_warn() {
        let payload = json!({
            "jobId": 1,
            "name": "j",
            "status": "RUNNING",
            "numTasks": 10,
            "numActiveTasks": i64::MAX,
            "numCompletedTasks": 1
        });
        let normalized = normalize::<JobData>(&payload).unwrap();
        assert_eq!(normalized.warnings.len(), 1);
        assert_eq!(
            normalized.warnings[0].to_string(),
            "job.num_tasks: sub-counts sum to 9223372036854775808 but total is 10"
        );
    }

    #[test]
    fn test_application_with_attempts() {
        let payload = json!({
            "id": "app-20240115103000-0001",
            "name": "etl",
            "memoryPerExecutorMB": 4096,
            "attempts": [{
                "attemptId": "1",
                "startTime": "2024-01-15T10:30:00.000GMT",
                "endTime": "2024-01-15T10:35:00.000GMT",
                "lastUpdated": "2024-01-15T10:35:00.000GMT",
                "duration": 300000,
                "sparkUser": "etl",
                "completed": true,
                "appSparkVersion": "3.5.1"
            }]
        });
        let app = normalize::<ApplicationInfo>(&payload).unwrap().value;
        assert_eq!(app.memory_per_executor_mb, Some(4096));
        assert_eq!(app.status(), Some(ApplicationStatus::Completed));
        let attempt = app.latest_attempt().unwrap();
        assert_eq!(attempt.start_time.as_ref().unwrap().offset_seconds(), Some(0));
    }

    #[test]
    fn test_executor_legacy_and_current_exclusion() {
        let payload = json!({
            "id": "3",
            "hostPort": "worker-3:40123",
            "isBlacklisted": true,
            "blacklistedInStages": [4, 2],
            "excludedInStages": [5],
            "attributes": {},
            "resources": {"gpu": {"name": "gpu", "addresses": ["0", "1"]}},
            "peakMemoryMetrics": {"JVMHeapMemory": 1024, "JVMOffHeapMemory": 64},
            "addTime": 1705314600000i64
        });
        let executor = normalize::<ExecutorSummary>(&payload).unwrap().value;
        assert!(executor.is_excluded_any());
        assert_eq!(
            executor.all_excluded_stages().into_iter().collect::<Vec<_>>(),
            vec![2, 4, 5]
        );
        assert_eq!(executor.resources["gpu"].addresses, vec!["0", "1"]);
        assert_eq!(
            executor.peak_memory_metrics.as_ref().unwrap().get("JVMHeapMemory"),
            Some(1024)
        );
    }

    #[test]
    fn test_remove_before_add_warns() {
        let executor = json!({
            "id": "4",
            "attributes": {},
            "resources": {},
            "addTime": 1705314600000i64,
            "removeTime": 1705314500000i64
        });
        let normalized = normalize::<ExecutorSummary>(&executor).unwrap();
        assert_eq!(normalized.warnings.len(), 1);
        assert_eq!(
            normalized.warnings[0].to_string(),
            "executor.remove_time: remove_time precedes add_time"
        );

        let process = json!({
            "id": "shuffle-1",
            "addTime": "2024-01-15T10:30:00.000GMT",
            "removeTime": "2024-01-15T10:29:59.000GMT"
        });
        let normalized = normalize::<ProcessSummary>(&process).unwrap();
        assert_eq!(normalized.warnings.len(), 1);
        assert_eq!(
            normalized.warnings[0].to_string(),
            "process.remove_time: remove_time precedes add_time"
        );
    }

    #[test]
    fn test_executor_defaults_exclusion_sets_to_empty() {
        let payload = json!({"id": "driver", "attributes": {}, "resources": {}});
        let executor = normalize::<ExecutorSummary>(&payload).unwrap().value;
        assert!(executor.is_driver());
        assert!(executor.excluded_in_stages.is_empty());
        assert!(executor.blacklisted_in_stages.is_empty());
        assert!(!executor.is_excluded_any());
    }

    #[test]
    fn test_executor_metrics_wrapped_encoding() {
        let payload = json!({"metrics": {"JVMHeapMemory": 7}});
        let metrics = normalize::<ExecutorMetrics>(&payload).unwrap().value;
        assert_eq!(metrics.get("JVMHeapMemory"), Some(7));
        assert_eq!(
            serde_json::to_value(&metrics).unwrap(),
            json!({"JVMHeapMemory": 7})
        );
    }

    #[test]
    fn test_environment_with_resource_profiles() {
        let payload = json!({
            "runtime": {"javaVersion": "17.0.9", "scalaVersion": "version 2.12.18"},
            "sparkProperties": [["spark.app.name", "etl"], ["spark.executor.cores", "4"]],
            "resourceProfiles": [{
                "id": 0,
                "executorResources": {
                    "cores": {
                        "resourceName": "cores",
                        "amount": 4,
                        "discoveryScript": "",
                        "vendor": ""
                    }
                },
                "taskResources": {"cpus": {"resourceName": "cpus", "amount": 1.0}}
            }]
        });
        let env = normalize::<ApplicationEnvironmentInfo>(&payload).unwrap().value;
        assert_eq!(env.runtime.java_version.as_deref(), Some("17.0.9"));
        assert_eq!(env.spark_property("spark.executor.cores"), Some("4"));
        let profile = &env.resource_profiles.as_ref().unwrap()[0];
        assert_eq!(profile.executor_resources.as_ref().unwrap()["cores"].amount, 4);
        assert_eq!(profile.task_resources.as_ref().unwrap()["cpus"].amount, 1.0);
    }

    #[test]
    fn test_query_param() {
        assert_eq!(query_param(StageStatus::Active), "active");
        assert_eq!(query_param(TaskSorting::DecreasingRuntime), "decreasing_runtime");
    }
}
