//! SQL executions and their physical plan graphs.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use crate::coerce::{Timestamp, WireEnum};
use crate::error::{Anomaly, FieldPath};
use crate::schema::{check_non_negative, Entity, FieldSpec, Reader};

/// SQL execution status enum
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl WireEnum for SqlExecutionStatus {
    const ENUM_NAME: &'static str = "SQLExecutionStatus";
    const MEMBERS: &'static [Self] = &[Self::Running, Self::Completed, Self::Failed];

    fn value(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

/// A metric shown on a plan node, value pre-rendered by Spark
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub value: String,
}

impl Entity for Metric {
    const NAME: &'static str = "Metric";
    const LABEL: &'static str = "metric";
    const STRICT: bool = true;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("name", "name"),
        FieldSpec::required("value", "value"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let name = r.required("name");
        let value = r.required("value");
        Some(Self {
            name: name?,
            value: value?,
        })
    }
}

/// A node of a SQL execution plan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_id: i64,
    pub node_name: String,
    pub whole_stage_codegen_id: Option<i64>,
    pub metrics: Vec<Metric>,
}

impl Node {
    pub fn metric(&self, name: &str) -> Option<&str> {
        self.metrics
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.value.as_str())
    }
}

impl Entity for Node {
    const NAME: &'static str = "Node";
    const LABEL: &'static str = "node";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("node_id", "nodeId"),
        FieldSpec::required("node_name", "nodeName"),
        FieldSpec::optional("whole_stage_codegen_id", "wholeStageCodegenId"),
        FieldSpec::required("metrics", "metrics"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let node_id = r.required("node_id");
        let node_name = r.required("node_name");
        let metrics = r.required("metrics");
        Some(Self {
            whole_stage_codegen_id: r.optional("whole_stage_codegen_id"),
            node_id: node_id?,
            node_name: node_name?,
            metrics: metrics?,
        })
    }
}

/// A directed `from_id -> to_id` edge between plan nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SparkPlanGraphEdge {
    pub from_id: i64,
    pub to_id: i64,
}

impl Entity for SparkPlanGraphEdge {
    const NAME: &'static str = "SparkPlanGraphEdge";
    const LABEL: &'static str = "edge";
    const STRICT: bool = true;
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("from_id", "fromId"),
        FieldSpec::required("to_id", "toId"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let from_id = r.required("from_id");
        let to_id = r.required("to_id");
        Some(Self {
            from_id: from_id?,
            to_id: to_id?,
        })
    }
}

/// Edges with an endpoint outside `nodes`. These are legal: Spark elides
/// some plan nodes from the summary view.
fn dangling<'a>(nodes: &[Node], edges: &'a [SparkPlanGraphEdge]) -> Vec<&'a SparkPlanGraphEdge> {
    let ids: HashSet<i64> = nodes.iter().map(|n| n.node_id).collect();
    edges
        .iter()
        .filter(|e| !ids.contains(&e.from_id) || !ids.contains(&e.to_id))
        .collect()
}

/// A SQL query execution with its plan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionData {
    pub id: i64,
    pub status: SqlExecutionStatus,
    pub description: Option<String>,
    pub plan_description: String,
    pub submission_time: Timestamp,
    #[serde(rename = "durationMilliSeconds")]
    pub duration: Option<i64>,
    pub running_job_ids: Vec<i64>,
    pub success_job_ids: Vec<i64>,
    pub failed_job_ids: Vec<i64>,
    pub nodes: Vec<Node>,
    pub edges: Vec<SparkPlanGraphEdge>,
}

impl ExecutionData {
    pub fn node(&self, node_id: i64) -> Option<&Node> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    pub fn dangling_edges(&self) -> Vec<&SparkPlanGraphEdge> {
        dangling(&self.nodes, &self.edges)
    }

    /// Nodes feeding directly into `node_id`.
    pub fn children(&self, node_id: i64) -> impl Iterator<Item = i64> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.to_id == node_id)
            .map(|e| e.from_id)
    }

    /// Every job the execution spawned, whatever its outcome.
    pub fn job_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.running_job_ids
            .iter()
            .chain(&self.success_job_ids)
            .chain(&self.failed_job_ids)
            .copied()
    }
}

impl Entity for ExecutionData {
    const NAME: &'static str = "ExecutionData";
    const LABEL: &'static str = "sql";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("id", "id"),
        FieldSpec::required("status", "status"),
        FieldSpec::optional("description", "description"),
        FieldSpec::required("plan_description", "planDescription"),
        FieldSpec::required("submission_time", "submissionTime"),
        FieldSpec::optional("duration", "durationMilliSeconds"),
        FieldSpec::optional("running_job_ids", "runningJobIds"),
        FieldSpec::optional("success_job_ids", "successJobIds"),
        FieldSpec::optional("failed_job_ids", "failedJobIds"),
        FieldSpec::required("nodes", "nodes"),
        FieldSpec::required("edges", "edges"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let id = r.required("id");
        let status = r.required_enum("status");
        let plan_description = r.required("plan_description");
        let submission_time = r.required("submission_time");
        let nodes = r.required("nodes");
        let edges = r.required("edges");
        Some(Self {
            description: r.optional("description"),
            duration: r.optional("duration"),
            running_job_ids: r.defaulted("running_job_ids"),
            success_job_ids: r.defaulted("success_job_ids"),
            failed_job_ids: r.defaulted("failed_job_ids"),
            id: id?,
            status: status?,
            plan_description: plan_description?,
            submission_time: submission_time?,
            nodes: nodes?,
            edges: edges?,
        })
    }

    fn check(&self, path: &FieldPath, warnings: &mut Vec<Anomaly>) {
        check_non_negative(path, warnings, &[("duration", self.duration)]);
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.node_id) {
                warnings.push(Anomaly::Inconsistent {
                    path: path.field("nodes"),
                    detail: format!("node id {} appears more than once", node.node_id),
                });
            }
        }
    }
}

/// The plan graph as rendered by the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SparkPlanGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<SparkPlanGraphEdge>,
    pub all_nodes: Vec<Node>,
}

impl SparkPlanGraph {
    pub fn dangling_edges(&self) -> Vec<&SparkPlanGraphEdge> {
        dangling(&self.nodes, &self.edges)
    }
}

impl Entity for SparkPlanGraph {
    const NAME: &'static str = "SparkPlanGraph";
    const LABEL: &'static str = "plan_graph";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("nodes", "nodes"),
        FieldSpec::required("edges", "edges"),
        FieldSpec::optional("all_nodes", "allNodes"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let nodes = r.required("nodes");
        let edges = r.required("edges");
        Some(Self {
            all_nodes: r.defaulted("all_nodes"),
            nodes: nodes?,
            edges: edges?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SparkPlanGraphNode {
    pub id: i64,
    pub name: String,
    /// Metric descriptors, kept opaque.
    pub metrics: Vec<Value>,
}

impl Entity for SparkPlanGraphNode {
    const NAME: &'static str = "SparkPlanGraphNode";
    const LABEL: &'static str = "plan_node";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("id", "id"),
        FieldSpec::required("name", "name"),
        FieldSpec::optional("metrics", "metrics"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let id = r.required("id");
        let name = r.required("name");
        Some(Self {
            metrics: r.defaulted("metrics"),
            id: id?,
            name: name?,
        })
    }
}

/// A group of plan nodes, such as one whole-stage-codegen block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SparkPlanGraphCluster {
    pub id: i64,
    pub name: String,
    pub metrics: Vec<Value>,
    pub nodes: Vec<SparkPlanGraphNode>,
}

impl Entity for SparkPlanGraphCluster {
    const NAME: &'static str = "SparkPlanGraphCluster";
    const LABEL: &'static str = "plan_cluster";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::required("id", "id"),
        FieldSpec::required("name", "name"),
        FieldSpec::optional("metrics", "metrics"),
        FieldSpec::required("nodes", "nodes"),
    ];

    fn read(r: &mut Reader<'_>) -> Option<Self> {
        let id = r.required("id");
        let name = r.required("name");
        let nodes = r.required("nodes");
        Some(Self {
            metrics: r.defaulted("metrics"),
            id: id?,
            name: name?,
            nodes: nodes?,
        })
    }
}
