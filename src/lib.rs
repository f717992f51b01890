//! Normalization of Spark monitoring REST payloads into a typed entity model.
//!
//! ```
//! use spark_history_mcp::models::{JobData, JobExecutionStatus};
//! use spark_history_mcp::normalize;
//!
//! let payload = serde_json::json!({"jobId": 7, "name": "job7", "status": "running"});
//! let job = normalize::<JobData>(&payload).unwrap().value;
//! assert_eq!(job.status, JobExecutionStatus::Running);
//! ```

pub mod coerce;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod schema;
pub mod sql;
pub mod stages;
pub mod threads;

pub use coerce::{coerce_enum, coerce_timestamp, Timestamp, WireEnum};
pub use error::{Anomaly, FieldError, FieldErrorKind, FieldPath, NormalizeError};
pub use registry::{EntityKind, SchemaRegistry};
pub use schema::{normalize, normalize_list, to_wire, Entity, Normalized};
