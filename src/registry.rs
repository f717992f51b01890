//! The closed set of entity types, addressable by name at runtime.
//!
//! Callers that only know an entity by name (the CLI, a tool layer) go
//! through [`SchemaRegistry`], which hands back wire-aliased JSON. The
//! registry is built once per process and read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::NormalizeError;
use crate::metrics::*;
use crate::models::*;
use crate::schema::{normalize, normalize_list, to_wire, Entity, FieldSpec, Normalized};
use crate::sql::*;
use crate::stages::*;
use crate::threads::*;

type NormalizeFn = fn(&Value) -> Result<Normalized<Value>, NormalizeError>;

macro_rules! entity_kinds {
    ($($kind:ident => $ty:ty),* $(,)?) => {
        /// Every entity type the layer can build.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EntityKind {
            $($kind),*
        }

        impl EntityKind {
            pub const ALL: &'static [EntityKind] = &[$(EntityKind::$kind),*];

            fn schema(self) -> EntitySchema {
                match self {
                    $(EntityKind::$kind => EntitySchema::of::<$ty>(self)),*
                }
            }
        }
    };
}

entity_kinds! {
    ApplicationInfo => ApplicationInfo,
    ApplicationAttemptInfo => ApplicationAttemptInfo,
    ResourceProfileInfo => ResourceProfileInfo,
    ExecutorResourceRequest => ExecutorResourceRequest,
    TaskResourceRequest => TaskResourceRequest,
    ResourceInformation => ResourceInformation,
    ExecutorSummary => ExecutorSummary,
    MemoryMetrics => MemoryMetrics,
    ExecutorMetrics => ExecutorMetrics,
    ProcessSummary => ProcessSummary,
    JobData => JobData,
    RddStorageInfo => RddStorageInfo,
    RddDataDistribution => RddDataDistribution,
    RddPartitionInfo => RddPartitionInfo,
    StageData => StageData,
    ExecutorStageSummary => ExecutorStageSummary,
    SpeculationStageSummary => SpeculationStageSummary,
    TaskData => TaskData,
    AccumulableInfo => AccumulableInfo,
    TaskMetrics => TaskMetrics,
    InputMetrics => InputMetrics,
    OutputMetrics => OutputMetrics,
    ShuffleReadMetrics => ShuffleReadMetrics,
    ShufflePushReadMetrics => ShufflePushReadMetrics,
    ShuffleWriteMetrics => ShuffleWriteMetrics,
    TaskMetricDistributions => TaskMetricDistributions,
    InputMetricDistributions => InputMetricDistributions,
    OutputMetricDistributions => OutputMetricDistributions,
    ShuffleReadMetricDistributions => ShuffleReadMetricDistributions,
    ShufflePushReadMetricDistributions => ShufflePushReadMetricDistributions,
    ShuffleWriteMetricDistributions => ShuffleWriteMetricDistributions,
    ExecutorMetricsDistributions => ExecutorMetricsDistributions,
    ExecutorPeakMetricsDistributions => ExecutorPeakMetricsDistributions,
    VersionInfo => VersionInfo,
    ApplicationEnvironmentInfo => ApplicationEnvironmentInfo,
    RuntimeInfo => RuntimeInfo,
    StackTrace => StackTrace,
    ThreadStackTrace => ThreadStackTrace,
    Metric => Metric,
    Node => Node,
    SparkPlanGraphEdge => SparkPlanGraphEdge,
    ExecutionData => ExecutionData,
    SparkPlanGraph => SparkPlanGraph,
    SparkPlanGraphNode => SparkPlanGraphNode,
    SparkPlanGraphCluster => SparkPlanGraphCluster,
}

impl EntityKind {
    pub fn name(self) -> &'static str {
        SchemaRegistry::global().get(self).name
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = RegistryError;

    /// Accepts an entity name (`StageData`) or path label (`stage`), any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemaRegistry::global()
            .lookup(s)
            .map(|schema| schema.kind)
            .ok_or_else(|| RegistryError::UnknownEntity(s.to_string()))
    }
}

/// Type-erased view of one entity's schema
#[derive(Clone, Copy)]
pub struct EntitySchema {
    pub kind: EntityKind,
    pub name: &'static str,
    pub label: &'static str,
    pub strict: bool,
    pub fields: &'static [FieldSpec],
    normalize: NormalizeFn,
    normalize_list: NormalizeFn,
}

impl EntitySchema {
    fn of<E: Entity>(kind: EntityKind) -> Self {
        Self {
            kind,
            name: E::NAME,
            label: E::LABEL,
            strict: E::STRICT,
            fields: E::FIELDS,
            normalize: erased::<E>,
            normalize_list: erased_list::<E>,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }
}

impl fmt::Debug for EntitySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySchema")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("strict", &self.strict)
            .field("fields", &self.fields.len())
            .finish()
    }
}

fn erased<E: Entity>(payload: &Value) -> Result<Normalized<Value>, NormalizeError> {
    encode::<E, E>(normalize::<E>(payload)?)
}

fn erased_list<E: Entity>(payload: &Value) -> Result<Normalized<Value>, NormalizeError> {
    encode::<E, Vec<E>>(normalize_list::<E>(payload)?)
}

fn encode<E: Entity, T: Serialize>(
    normalized: Normalized<T>,
) -> Result<Normalized<Value>, NormalizeError> {
    let value = to_wire(&normalized.value).map_err(|source| NormalizeError::Encode {
        entity: E::NAME,
        source,
    })?;
    Ok(Normalized {
        value,
        warnings: normalized.warnings,
    })
}

/// Schema lookup failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown entity {0:?}")]
    UnknownEntity(String),
    #[error("{entity} declares {key:?} more than once")]
    DuplicateField { entity: &'static str, key: &'static str },
    #[error("lookup key {key:?} is shared by {first} and {second}")]
    AmbiguousKey {
        key: String,
        first: &'static str,
        second: &'static str,
    },
}

/// All entity schemas, indexed by name and label
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: Vec<EntitySchema>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        let schemas: Vec<EntitySchema> =
            EntityKind::ALL.iter().map(|kind| kind.schema()).collect();
        let mut index = HashMap::with_capacity(schemas.len() * 2);
        for (i, schema) in schemas.iter().enumerate() {
            index.entry(schema.name.to_lowercase()).or_insert(i);
            index.entry(schema.label.to_lowercase()).or_insert(i);
        }
        debug!("Built schema registry with {} entities", schemas.len());
        Self { schemas, index }
    }

    /// The process-wide registry, built on first use.
    pub fn global() -> &'static SchemaRegistry {
        static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();
        REGISTRY.get_or_init(SchemaRegistry::new)
    }

    pub fn get(&self, kind: EntityKind) -> &EntitySchema {
        // `schemas` is built from `EntityKind::ALL` in declaration order.
        &self.schemas[kind as usize]
    }

    pub fn lookup(&self, name: &str) -> Option<&EntitySchema> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| &self.schemas[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntitySchema> {
        self.schemas.iter()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Normalize a single payload and re-encode it under wire aliases.
    pub fn normalize(
        &self,
        kind: EntityKind,
        payload: &Value,
    ) -> Result<Normalized<Value>, NormalizeError> {
        (self.get(kind).normalize)(payload)
    }

    /// Normalize an array payload, as returned by list endpoints.
    pub fn normalize_list(
        &self,
        kind: EntityKind,
        payload: &Value,
    ) -> Result<Normalized<Value>, NormalizeError> {
        (self.get(kind).normalize_list)(payload)
    }

    /// Check that no schema declares a name or alias twice and that every
    /// lookup key names exactly one entity.
    pub fn verify(&self) -> Result<(), RegistryError> {
        for schema in &self.schemas {
            let mut seen: Vec<&'static str> = Vec::new();
            for field in schema.fields {
                let mut keys = vec![field.name];
                if field.alias != field.name {
                    keys.push(field.alias);
                }
                for key in keys {
                    if seen.contains(&key) {
                        return Err(RegistryError::DuplicateField {
                            entity: schema.name,
                            key,
                        });
                    }
                    seen.push(key);
                }
            }
        }

        let mut owners: HashMap<String, &'static str> = HashMap::new();
        for schema in &self.schemas {
            let mut keys = vec![schema.name.to_lowercase(), schema.label.to_lowercase()];
            keys.dedup();
            for key in keys {
                if let Some(first) = owners.insert(key.clone(), schema.name) {
                    return Err(RegistryError::AmbiguousKey {
                        key,
                        first,
                        second: schema.name,
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
