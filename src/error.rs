use std::fmt;

use crate::coerce::InvalidEnumValue;

/// One step in a path from the root of a payload to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(&'static str),
    Key(String),
    Index(usize),
}

/// Location of a field inside a normalized payload, e.g.
/// `stage.tasks["3"].task_metrics.shuffle_read_metrics`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    root: &'static str,
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn root(label: &'static str) -> Self {
        Self {
            root: label,
            segments: Vec::new(),
        }
    }

    pub fn field(&self, name: &'static str) -> Self {
        self.push(PathSegment::Field(name))
    }

    pub fn key(&self, key: &str) -> Self {
        self.push(PathSegment::Key(key.to_string()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.push(PathSegment::Index(index))
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Canonical name of the last field step, if any.
    pub fn leaf_field(&self) -> Option<&'static str> {
        self.segments.iter().rev().find_map(|segment| match segment {
            PathSegment::Field(name) => Some(*name),
            _ => None,
        })
    }

    fn push(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self {
            root: self.root,
            segments,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root)?;
        for segment in &self.segments {
            match segment {
                PathSegment::Field(name) => write!(f, ".{}", name)?,
                PathSegment::Key(key) => write!(f, "[{:?}]", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Why a single field could not be normalized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldErrorKind {
    #[error("missing required field of {entity}")]
    MissingRequiredField { entity: &'static str },
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },
    #[error(transparent)]
    InvalidEnumValue(#[from] InvalidEnumValue),
}

/// A field-level failure, attributed to its full path from the entity root
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {kind}")]
pub struct FieldError {
    pub path: FieldPath,
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn is_missing(&self) -> bool {
        matches!(self.kind, FieldErrorKind::MissingRequiredField { .. })
    }
}

/// Recovered conditions. The entity is still produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// A `...GMT` timestamp that did not parse; the text is kept verbatim.
    MalformedTimestamp { path: FieldPath, raw: String },
    /// A key a strict entity does not declare.
    UnknownField { path: FieldPath, entity: &'static str },
    /// The payload parsed but contradicts an invariant of the model.
    Inconsistent { path: FieldPath, detail: String },
}

impl Anomaly {
    pub fn path(&self) -> &FieldPath {
        match self {
            Anomaly::MalformedTimestamp { path, .. }
            | Anomaly::UnknownField { path, .. }
            | Anomaly::Inconsistent { path, .. } => path,
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::MalformedTimestamp { path, raw } => {
                write!(f, "{}: malformed timestamp {:?} kept verbatim", path, raw)
            }
            Anomaly::UnknownField { path, entity } => {
                write!(f, "{}: field not declared by {}", path, entity)
            }
            Anomaly::Inconsistent { path, detail } => write!(f, "{}: {}", path, detail),
        }
    }
}

/// Failure to turn a payload into an entity. Construction is all-or-nothing,
/// so this carries every field error found in the payload.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error(
        "{entity} failed to normalize ({} field error(s)), first: {}",
        .errors.len(),
        first_error(.errors)
    )]
    Invalid {
        entity: &'static str,
        errors: Vec<FieldError>,
    },
    #[error("{entity} could not be re-encoded: {source}")]
    Encode {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl NormalizeError {
    pub fn entity(&self) -> &'static str {
        match self {
            NormalizeError::Invalid { entity, .. } | NormalizeError::Encode { entity, .. } => {
                entity
            }
        }
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            NormalizeError::Invalid { errors, .. } => errors,
            NormalizeError::Encode { .. } => &[],
        }
    }

    pub fn first_cause(&self) -> Option<&FieldError> {
        self.field_errors().first()
    }
}

fn first_error(errors: &[FieldError]) -> String {
    errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "none recorded".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        let path = FieldPath::root("stage")
            .field("tasks")
            .key("3")
            .field("task_metrics")
            .field("shuffle_read_metrics");
        assert_eq!(
            path.to_string(),
            r#"stage.tasks["3"].task_metrics.shuffle_read_metrics"#
        );
        assert_eq!(path.leaf_field(), Some("shuffle_read_metrics"));

        let indexed = FieldPath::root("sql").field("nodes").index(2);
        assert_eq!(indexed.to_string(), "sql.nodes[2]");
        assert_eq!(indexed.leaf_field(), Some("nodes"));
    }

    #[test]
    fn test_normalize_error_reports_first_cause() {
        let err = NormalizeError::Invalid {
            entity: "JobData",
            errors: vec![
                FieldError {
                    path: FieldPath::root("job").field("name"),
                    kind: FieldErrorKind::MissingRequiredField { entity: "JobData" },
                },
                FieldError {
                    path: FieldPath::root("job").field("num_tasks"),
                    kind: FieldErrorKind::TypeMismatch {
                        expected: "integer",
                        found: "string".to_string(),
                    },
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("2 field error(s)"));
        assert!(message.contains("job.name: missing required field of JobData"));
        assert!(err.first_cause().unwrap().is_missing());
    }
}
