//! Per-task metrics and their quantile distributions across a stage.

use serde::Serialize;

use crate::models::ExecutorMetrics;
use crate::schema::{Entity, FieldSpec, Reader};

/// Task metrics reported for one task attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetrics {
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
    pub input_metrics: Option<InputMetrics>,
    pub output_metrics: Option<OutputMetrics>,
    pub shuffle_read_metrics: Option<ShuffleReadMetrics>,
    pub shuffle_write_metrics: Option<ShuffleWriteMetrics>,
}

impl TaskMetrics {
    pub fn spilled_bytes(&self) -> i64 {
        self.memory_bytes_spilled
            .unwrap_or(0)
            .saturating_add(self.disk_bytes_spilled.unwrap_or(0))
    }
}

impl Entity for TaskMetrics {
    const NAME: &'static str = "TaskMetrics";
    const LABEL: &'static str = "task_metrics";
    const FIELDS: &'static [FieldSpec] = &[
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
        FieldSpec::optional("input_metrics", "inputMetrics"),
        FieldSpec::optional("output_metrics", "outputMetrics"),
        FieldSpec::optional("shuffle_read_metrics", "shuffleReadMetrics"),
        FieldSpec::optional("shuffle_write_metrics", "shuffleWriteMetrics"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
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
            input_metrics: r.optional("input_metrics"),
            output_metrics: r.optional("output_metrics"),
            shuffle_read_metrics: r.optional("shuffle_read_metrics"),
            shuffle_write_metrics: r.optional("shuffle_write_metrics"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMetrics {
    pub bytes_read: Option<i64>,
    pub records_read: Option<i64>,
}

impl Entity for InputMetrics {
    const NAME: &'static str = "InputMetrics";
    const LABEL: &'static str = "input_metrics";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("bytes_read", "bytesRead"),
        FieldSpec::optional("records_read", "recordsRead"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            bytes_read: r.optional("bytes_read"),
            records_read: r.optional("records_read"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMetrics {
    pub bytes_written: Option<i64>,
    pub records_written: Option<i64>,
}

impl Entity for OutputMetrics {
    const NAME: &'static str = "OutputMetrics";
    const LABEL: &'static str = "output_metrics";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("bytes_written", "bytesWritten"),
        FieldSpec::optional("records_written", "recordsWritten"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            bytes_written: r.optional("bytes_written"),
            records_written: r.optional("records_written"),
        })
    }
}

/// Shuffle read metrics, including the push-based shuffle sub-metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShuffleReadMetrics {
    pub remote_blocks_fetched: Option<i64>,
    pub local_blocks_fetched: Option<i64>,
    pub fetch_wait_time: Option<i64>,
    pub remote_bytes_read: Option<i64>,
    pub remote_bytes_read_to_disk: Option<i64>,
    pub local_bytes_read: Option<i64>,
    pub records_read: Option<i64>,
    pub remote_reqs_duration: Option<i64>,
    pub shuffle_push_read_metrics: Option<ShufflePushReadMetrics>,
}

impl ShuffleReadMetrics {
    pub fn total_bytes_read(&self) -> i64 {
        self.remote_bytes_read
            .unwrap_or(0)
            .saturating_add(self.local_bytes_read.unwrap_or(0))
    }
}

impl Entity for ShuffleReadMetrics {
    const NAME: &'static str = "ShuffleReadMetrics";
    const LABEL: &'static str = "shuffle_read_metrics";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("remote_blocks_fetched", "remoteBlocksFetched"),
        FieldSpec::optional("local_blocks_fetched", "localBlocksFetched"),
        FieldSpec::optional("fetch_wait_time", "fetchWaitTime"),
        FieldSpec::optional("remote_bytes_read", "remoteBytesRead"),
        FieldSpec::optional("remote_bytes_read_to_disk", "remoteBytesReadToDisk"),
        FieldSpec::optional("local_bytes_read", "localBytesRead"),
        FieldSpec::optional("records_read", "recordsRead"),
        FieldSpec::optional("remote_reqs_duration", "remoteReqsDuration"),
        FieldSpec::optional("shuffle_push_read_metrics", "shufflePushReadMetrics"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            remote_blocks_fetched: r.optional("remote_blocks_fetched"),
            local_blocks_fetched: r.optional("local_blocks_fetched"),
            fetch_wait_time: r.optional("fetch_wait_time"),
            remote_bytes_read: r.optional("remote_bytes_read"),
            remote_bytes_read_to_disk: r.optional("remote_bytes_read_to_disk"),
            local_bytes_read: r.optional("local_bytes_read"),
            records_read: r.optional("records_read"),
            remote_reqs_duration: r.optional("remote_reqs_duration"),
            shuffle_push_read_metrics: r.optional("shuffle_push_read_metrics"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShufflePushReadMetrics {
    pub corrupt_merged_block_chunks: Option<i64>,
    pub merged_fetch_fallback_count: Option<i64>,
    pub remote_merged_blocks_fetched: Option<i64>,
    pub local_merged_blocks_fetched: Option<i64>,
    pub remote_merged_chunks_fetched: Option<i64>,
    pub local_merged_chunks_fetched: Option<i64>,
    pub remote_merged_bytes_read: Option<i64>,
    pub local_merged_bytes_read: Option<i64>,
    pub remote_merged_reqs_duration: Option<i64>,
}

impl Entity for ShufflePushReadMetrics {
    const NAME: &'static str = "ShufflePushReadMetrics";
    const LABEL: &'static str = "shuffle_push_read_metrics";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("corrupt_merged_block_chunks", "corruptMergedBlockChunks"),
        FieldSpec::optional("merged_fetch_fallback_count", "mergedFetchFallbackCount"),
        FieldSpec::optional("remote_merged_blocks_fetched", "remoteMergedBlocksFetched"),
        FieldSpec::optional("local_merged_blocks_fetched", "localMergedBlocksFetched"),
        FieldSpec::optional("remote_merged_chunks_fetched", "remoteMergedChunksFetched"),
        FieldSpec::optional("local_merged_chunks_fetched", "localMergedChunksFetched"),
        FieldSpec::optional("remote_merged_bytes_read", "remoteMergedBytesRead"),
        FieldSpec::optional("local_merged_bytes_read", "localMergedBytesRead"),
        FieldSpec::optional("remote_merged_reqs_duration", "remoteMergedReqsDuration"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            corrupt_merged_block_chunks: r.optional("corrupt_merged_block_chunks"),
            merged_fetch_fallback_count: r.optional("merged_fetch_fallback_count"),
            remote_merged_blocks_fetched: r.optional("remote_merged_blocks_fetched"),
            local_merged_blocks_fetched: r.optional("local_merged_blocks_fetched"),
            remote_merged_chunks_fetched: r.optional("remote_merged_chunks_fetched"),
            local_merged_chunks_fetched: r.optional("local_merged_chunks_fetched"),
            remote_merged_bytes_read: r.optional("remote_merged_bytes_read"),
            local_merged_bytes_read: r.optional("local_merged_bytes_read"),
            remote_merged_reqs_duration: r.optional("remote_merged_reqs_duration"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShuffleWriteMetrics {
    pub bytes_written: Option<i64>,
    pub write_time: Option<i64>,
    pub records_written: Option<i64>,
}

impl Entity for ShuffleWriteMetrics {
    const NAME: &'static str = "ShuffleWriteMetrics";
    const LABEL: &'static str = "shuffle_write_metrics";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("bytes_written", "bytesWritten"),
        FieldSpec::optional("write_time", "writeTime"),
        FieldSpec::optional("records_written", "recordsWritten"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            bytes_written: r.optional("bytes_written"),
            write_time: r.optional("write_time"),
            records_written: r.optional("records_written"),
        })
    }
}

/// Quantile summaries of task metrics across a stage. Each series holds one
/// value per entry of `quantiles`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetricDistributions {
    pub quantiles: Option<Vec<f64>>,
    pub duration: Option<Vec<f64>>,
    pub executor_deserialize_time: Option<Vec<f64>>,
    pub executor_deserialize_cpu_time: Option<Vec<f64>>,
    pub executor_run_time: Option<Vec<f64>>,
    pub executor_cpu_time: Option<Vec<f64>>,
    pub result_size: Option<Vec<f64>>,
    pub jvm_gc_time: Option<Vec<f64>>,
    pub result_serialization_time: Option<Vec<f64>>,
    pub getting_result_time: Option<Vec<f64>>,
    pub scheduler_delay: Option<Vec<f64>>,
    pub peak_execution_memory: Option<Vec<f64>>,
    pub memory_bytes_spilled: Option<Vec<f64>>,
    pub disk_bytes_spilled: Option<Vec<f64>>,
    pub input_metrics: Option<InputMetricDistributions>,
    pub output_metrics: Option<OutputMetricDistributions>,
    pub shuffle_read_metrics: Option<ShuffleReadMetricDistributions>,
    pub shuffle_write_metrics: Option<ShuffleWriteMetricDistributions>,
}

impl TaskMetricDistributions {
    /// Value of `series` at `quantile`, when that quantile was requested.
    pub fn at(&self, series: &[f64], quantile: f64) -> Option<f64> {
        quantile_value(self.quantiles.as_deref()?, series, quantile)
    }

    /// Median task duration.
    pub fn median_duration(&self) -> Option<f64> {
        self.at(self.duration.as_deref()?, 0.5)
    }
}

pub(crate) fn quantile_value(quantiles: &[f64], series: &[f64], quantile: f64) -> Option<f64> {
    let index = quantiles
        .iter()
        .position(|q| (q - quantile).abs() < 1e-9)?;
    series.get(index).copied()
}

impl Entity for TaskMetricDistributions {
    const NAME: &'static str = "TaskMetricDistributions";
    const LABEL: &'static str = "task_metric_distributions";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("quantiles", "quantiles"),
        FieldSpec::optional("duration", "duration"),
        FieldSpec::optional("executor_deserialize_time", "executorDeserializeTime"),
        FieldSpec::optional("executor_deserialize_cpu_time", "executorDeserializeCpuTime"),
        FieldSpec::optional("executor_run_time", "executorRunTime"),
        FieldSpec::optional("executor_cpu_time", "executorCpuTime"),
        FieldSpec::optional("result_size", "resultSize"),
        FieldSpec::optional("jvm_gc_time", "jvmGcTime"),
        FieldSpec::optional("result_serialization_time", "resultSerializationTime"),
        FieldSpec::optional("getting_result_time", "gettingResultTime"),
        FieldSpec::optional("scheduler_delay", "schedulerDelay"),
        FieldSpec::optional("peak_execution_memory", "peakExecutionMemory"),
        FieldSpec::optional("memory_bytes_spilled", "memoryBytesSpilled"),
        FieldSpec::optional("disk_bytes_spilled", "diskBytesSpilled"),
        FieldSpec::optional("input_metrics", "inputMetrics"),
        FieldSpec::optional("output_metrics", "outputMetrics"),
        FieldSpec::optional("shuffle_read_metrics", "shuffleReadMetrics"),
        FieldSpec::optional("shuffle_write_metrics", "shuffleWriteMetrics"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            quantiles: r.optional("quantiles"),
            duration: r.optional("duration"),
            executor_deserialize_time: r.optional("executor_deserialize_time"),
            executor_deserialize_cpu_time: r.optional("executor_deserialize_cpu_time"),
            executor_run_time: r.optional("executor_run_time"),
            executor_cpu_time: r.optional("executor_cpu_time"),
            result_size: r.optional("result_size"),
            jvm_gc_time: r.optional("jvm_gc_time"),
            result_serialization_time: r.optional("result_serialization_time"),
            getting_result_time: r.optional("getting_result_time"),
            scheduler_delay: r.optional("scheduler_delay"),
            peak_execution_memory: r.optional("peak_execution_memory"),
            memory_bytes_spilled: r.optional("memory_bytes_spilled"),
            disk_bytes_spilled: r.optional("disk_bytes_spilled"),
            input_metrics: r.optional("input_metrics"),
            output_metrics: r.optional("output_metrics"),
            shuffle_read_metrics: r.optional("shuffle_read_metrics"),
            shuffle_write_metrics: r.optional("shuffle_write_metrics"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputMetricDistributions {
    pub bytes_read: Option<Vec<f64>>,
    pub records_read: Option<Vec<f64>>,
}

impl Entity for InputMetricDistributions {
    const NAME: &'static str = "InputMetricDistributions";
    const LABEL: &'static str = "input_metric_distributions";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("bytes_read", "bytesRead"),
        FieldSpec::optional("records_read", "recordsRead"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            bytes_read: r.optional("bytes_read"),
            records_read: r.optional("records_read"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMetricDistributions {
    pub bytes_written: Option<Vec<f64>>,
    pub records_written: Option<Vec<f64>>,
}

impl Entity for OutputMetricDistributions {
    const NAME: &'static str = "OutputMetricDistributions";
    const LABEL: &'static str = "output_metric_distributions";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("bytes_written", "bytesWritten"),
        FieldSpec::optional("records_written", "recordsWritten"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            bytes_written: r.optional("bytes_written"),
            records_written: r.optional("records_written"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShuffleReadMetricDistributions {
    pub read_bytes: Option<Vec<f64>>,
    pub read_records: Option<Vec<f64>>,
    pub remote_blocks_fetched: Option<Vec<f64>>,
    pub local_blocks_fetched: Option<Vec<f64>>,
    pub fetch_wait_time: Option<Vec<f64>>,
    pub remote_bytes_read: Option<Vec<f64>>,
    pub remote_bytes_read_to_disk: Option<Vec<f64>>,
    pub total_blocks_fetched: Option<Vec<f64>>,
    pub remote_reqs_duration: Option<Vec<f64>>,
    pub shuffle_push_read_metrics_dist: Option<ShufflePushReadMetricDistributions>,
}

impl Entity for ShuffleReadMetricDistributions {
    const NAME: &'static str = "ShuffleReadMetricDistributions";
    const LABEL: &'static str = "shuffle_read_metric_distributions";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("read_bytes", "readBytes"),
        FieldSpec::optional("read_records", "readRecords"),
        FieldSpec::optional("remote_blocks_fetched", "remoteBlocksFetched"),
        FieldSpec::optional("local_blocks_fetched", "localBlocksFetched"),
        FieldSpec::optional("fetch_wait_time", "fetchWaitTime"),
        FieldSpec::optional("remote_bytes_read", "remoteBytesRead"),
        FieldSpec::optional("remote_bytes_read_to_disk", "remoteBytesReadToDisk"),
        FieldSpec::optional("total_blocks_fetched", "totalBlocksFetched"),
        FieldSpec::optional("remote_reqs_duration", "remoteReqsDuration"),
        FieldSpec::optional("shuffle_push_read_metrics_dist", "shufflePushReadMetricsDist"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            read_bytes: r.optional("read_bytes"),
            read_records: r.optional("read_records"),
            remote_blocks_fetched: r.optional("remote_blocks_fetched"),
            local_blocks_fetched: r.optional("local_blocks_fetched"),
            fetch_wait_time: r.optional("fetch_wait_time"),
            remote_bytes_read: r.optional("remote_bytes_read"),
            remote_bytes_read_to_disk: r.optional("remote_bytes_read_to_disk"),
            total_blocks_fetched: r.optional("total_blocks_fetched"),
            remote_reqs_duration: r.optional("remote_reqs_duration"),
            shuffle_push_read_metrics_dist: r.optional("shuffle_push_read_metrics_dist"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShufflePushReadMetricDistributions {
    pub corrupt_merged_block_chunks: Option<Vec<f64>>,
    pub merged_fetch_fallback_count: Option<Vec<f64>>,
    pub remote_merged_blocks_fetched: Option<Vec<f64>>,
    pub local_merged_blocks_fetched: Option<Vec<f64>>,
    pub remote_merged_chunks_fetched: Option<Vec<f64>>,
    pub local_merged_chunks_fetched: Option<Vec<f64>>,
    pub remote_merged_bytes_read: Option<Vec<f64>>,
    pub local_merged_bytes_read: Option<Vec<f64>>,
    pub remote_merged_reqs_duration: Option<Vec<f64>>,
}

impl Entity for ShufflePushReadMetricDistributions {
    const NAME: &'static str = "ShufflePushReadMetricDistributions";
    const LABEL: &'static str = "shuffle_push_read_metric_distributions";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("corrupt_merged_block_chunks", "corruptMergedBlockChunks"),
        FieldSpec::optional("merged_fetch_fallback_count", "mergedFetchFallbackCount"),
        FieldSpec::optional("remote_merged_blocks_fetched", "remoteMergedBlocksFetched"),
        FieldSpec::optional("local_merged_blocks_fetched", "localMergedBlocksFetched"),
        FieldSpec::optional("remote_merged_chunks_fetched", "remoteMergedChunksFetched"),
        FieldSpec::optional("local_merged_chunks_fetched", "localMergedChunksFetched"),
        FieldSpec::optional("remote_merged_bytes_read", "remoteMergedBytesRead"),
        FieldSpec::optional("local_merged_bytes_read", "localMergedBytesRead"),
        FieldSpec::optional("remote_merged_reqs_duration", "remoteMergedReqsDuration"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            corrupt_merged_block_chunks: r.optional("corrupt_merged_block_chunks"),
            merged_fetch_fallback_count: r.optional("merged_fetch_fallback_count"),
            remote_merged_blocks_fetched: r.optional("remote_merged_blocks_fetched"),
            local_merged_blocks_fetched: r.optional("local_merged_blocks_fetched"),
            remote_merged_chunks_fetched: r.optional("remote_merged_chunks_fetched"),
            local_merged_chunks_fetched: r.optional("local_merged_chunks_fetched"),
            remote_merged_bytes_read: r.optional("remote_merged_bytes_read"),
            local_merged_bytes_read: r.optional("local_merged_bytes_read"),
            remote_merged_reqs_duration: r.optional("remote_merged_reqs_duration"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShuffleWriteMetricDistributions {
    pub write_bytes: Option<Vec<f64>>,
    pub write_records: Option<Vec<f64>>,
    pub write_time: Option<Vec<f64>>,
}

impl Entity for ShuffleWriteMetricDistributions {
    const NAME: &'static str = "ShuffleWriteMetricDistributions";
    const LABEL: &'static str = "shuffle_write_metric_distributions";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::optional("write_bytes", "writeBytes"),
        FieldSpec::optional("write_records", "writeRecords"),
        FieldSpec::optional("write_time", "writeTime"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        Some(Self {
            write_bytes: r.optional("write_bytes"),
            write_records: r.optional("write_records"),
            write_time: r.optional("write_time"),
        })
    }
}

/// Quantile summaries of per-executor stage totals
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorMetricsDistributions {
    pub quantiles: Vec<f64>,
    pub task_time: Option<Vec<f64>>,
    pub failed_tasks: Option<Vec<f64>>,
    pub succeeded_tasks: Option<Vec<f64>>,
    pub killed_tasks: Option<Vec<f64>>,
    pub input_bytes: Option<Vec<f64>>,
    pub input_records: Option<Vec<f64>>,
    pub output_bytes: Option<Vec<f64>>,
    pub output_records: Option<Vec<f64>>,
    pub shuffle_read: Option<Vec<f64>>,
    pub shuffle_read_records: Option<Vec<f64>>,
    pub shuffle_write: Option<Vec<f64>>,
    pub shuffle_write_records: Option<Vec<f64>>,
    pub memory_bytes_spilled: Option<Vec<f64>>,
    pub disk_bytes_spilled: Option<Vec<f64>>,
    pub peak_memory_metrics: Option<ExecutorPeakMetricsDistributions>,
}

impl ExecutorMetricsDistributions {
    pub fn at(&self, series: &[f64], quantile: f64) -> Option<f64> {
        quantile_value(&self.quantiles, series, quantile)
    }
}

impl Entity for ExecutorMetricsDistributions {
    const NAME: &'static str = "ExecutorMetricsDistributions";
    const LABEL: &'static str = "executor_metrics_distributions";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("quantiles", "quantiles"),
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
        FieldSpec::optional("peak_memory_metrics", "peakMemoryMetrics"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let quantiles = r.required("quantiles");
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
            peak_memory_metrics: r.optional("peak_memory_metrics"),
            quantiles: quantiles?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorPeakMetricsDistributions {
    pub quantiles: Vec<f64>,
    pub executor_metrics: Option<Vec<ExecutorMetrics>>,
}

impl Entity for ExecutorPeakMetricsDistributions {
    const NAME: &'static str = "ExecutorPeakMetricsDistributions";
    const LABEL: &'static str = "executor_peak_metrics_distributions";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("quantiles", "quantiles"),
        FieldSpec::optional("executor_metrics", "executorMetrics"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let quantiles = r.required("quantiles");
        Some(Self {
            executor_metrics: r.optional("executor_metrics"),
            quantiles: quantiles?,
        })
    }
}
