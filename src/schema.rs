//! Turning loosely-typed JSON into entities.
//!
//! Every entity declares its fields once in [`Entity::FIELDS`] and builds
//! itself from a [`Reader`], which resolves each field under its wire alias or
//! its canonical name, applies the field's coercion and records failures
//! against the field's full path. Construction is all-or-nothing: a payload
//! with any field error yields no entity.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::coerce::{coerce_timestamp, json_type_name, Timestamp, TimestampError, WireEnum};
use crate::error::{Anomaly, FieldError, FieldErrorKind, FieldPath, NormalizeError};

/// Declaration of one entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Canonical snake-case name.
    pub name: &'static str,
    /// Name on the wire, preferred when both are present.
    pub alias: &'static str,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, alias: &'static str) -> Self {
        Self {
            name,
            alias,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, alias: &'static str) -> Self {
        Self {
            name,
            alias,
            required: false,
        }
    }

    fn matches(&self, key: &str) -> bool {
        self.alias == key || self.name == key
    }
}

/// A record type that can be built from a wire payload.
///
/// Implementations bind required fields to locals first and unwrap them last,
/// so that every field is visited and every failure recorded.
pub trait Entity: Sized + Serialize {
    /// Type name used in error messages.
    const NAME: &'static str;
    /// Root label of field paths, e.g. `stage`.
    const LABEL: &'static str;
    /// Strict entities report undeclared keys as warnings.
    const STRICT: bool = false;
    const FIELDS: &'static [FieldSpec];

    fn read(r: &mut Reader<'_>) -> Option<Self>;

    /// Post-construction invariant checks. Violations are warnings only.
    fn check(&self, _path: &FieldPath, _warnings: &mut Vec<Anomaly>) {}
}

/// Errors and warnings collected while normalizing one top-level payload.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub errors: Vec<FieldError>,
    pub warnings: Vec<Anomaly>,
}

impl Diagnostics {
    pub fn error(&mut self, path: FieldPath, kind: FieldErrorKind) {
        self.errors.push(FieldError { path, kind });
    }

    fn mismatch(&mut self, path: &FieldPath, expected: &'static str, value: &Value) {
        self.error(
            path.clone(),
            FieldErrorKind::TypeMismatch {
                expected,
                found: json_type_name(value).to_string(),
            },
        );
    }
}

/// Conversion of a single JSON value into a field type.
///
/// `null` never reaches these conversions at field level: the [`Reader`]
/// treats it as absence.
pub trait FromWire: Sized {
    fn from_wire(value: &Value, path: &FieldPath, diag: &mut Diagnostics) -> Option<Self>;
}

impl FromWire for bool {
    fn from_wire(value: &Value, path: &FieldPath, diag: &mut Diagnostics) -> Option<Self> {
        let parsed = match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        };
        if parsed.is_none() {
            diag.mismatch(path, "boolean", value);
        }
        parsed
    }
}

impl FromWire for i64 {
    fn from_wire(value: &Value, path: &FieldPath, diag: &mut Diagnostics) -> Option<Self> {
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            diag.mismatch(path, "integer", value);
        }
        parsed
    }
}

impl FromWire for f64 {
    fn from_wire(value: &Value, path: &FieldPath, diag: &mut Diagnostics) -> Option<Self> {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            diag.mismatch(path, "number", value);
        }
        parsed
    }
}

impl FromWire for String {
    fn from_wire(value: &Value, path: &FieldPath, diag: &mut Diagnostics) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            other => {
                diag.mismatch(path, "string", other);
                None
            }
        }
    }
}

/// Opaque values, kept as they arrived.
impl FromWire for Value {
    fn from_wire(value: &Value, _path: &FieldPath, _diag: &mut Diagnostics) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromWire for Timestamp {
    fn from_wire(value: &Value, path: &FieldPath, diag: &mut Diagnostics) -> Option<Self> {
        match coerce_timestamp(value) {
            Ok(Some(ts)) => {
                if ts.is_malformed() {
                    diag.warnings.push(Anomaly::MalformedTimestamp {
                        path: path.clone(),
                        raw: ts.to_iso8601(),
                    });
                }
                Some(ts)
            }
            Ok(None) => None,
            Err(TimestampError::Unsupported(_)) => {
                diag.mismatch(path, "timestamp", value);
                None
            }
            Err(TimestampError::OutOfRange(_)) => {
                diag.error(
                    path.clone(),
                    FieldErrorKind::TypeMismatch {
                        expected: "timestamp",
                        found: format!("out-of-range epoch {}", value),
                    },
                );
                None
            }
        }
    }
}

impl<T: FromWire> FromWire for Vec<T> {
    fn from_wire(value: &Value, path: &FieldPath, diag: &mut Diagnostics) -> Option<Self> {
        let Value::Array(items) = value else {
            diag.mismatch(path, "array", value);
            return None;
        };
        let mut out = Vec::with_capacity(items.len());
        let mut ok = true;
        for (index, item) in items.iter().enumerate() {
            match T::from_wire(item, &path.index(index), diag) {
                Some(v) => out.push(v),
                None => ok = false,
            }
        }
        ok.then_some(out)
    }
}

impl<T: FromWire + Ord> FromWire for BTreeSet<T> {
    fn from_wire(value: &Value, path: &FieldPath, diag: &mut Diagnostics) -> Option<Self> {
        Vec::<T>::from_wire(value, path, diag).map(|items| items.into_iter().collect())
    }
}

impl<T: FromWire> FromWire for HashMap<String, T> {
    fn from_wire(value: &Value, path: &FieldPath, diag: &mut Diagnostics) -> Option<Self> {
        let Value::Object(map) = value else {
            diag.mismatch(path, "object", value);
            return None;
        };
        let mut out = HashMap::with_capacity(map.len());
        let mut ok = true;
        for (key, item) in map {
            match T::from_wire(item, &path.key(key), diag) {
                Some(v) => {
                    out.insert(key.clone(), v);
                }
                None => ok = false,
            }
        }
        ok.then_some(out)
    }
}

/// Spark encodes property lists as two-element arrays.
impl FromWire for (String, String) {
    fn from_wire(value: &Value, path: &FieldPath, diag: &mut Diagnostics) -> Option<Self> {
        match value {
            Value::Array(pair) if pair.len() == 2 => {
                let key = String::from_wire(&pair[0], &path.index(0), diag);
                let val = String::from_wire(&pair[1], &path.index(1), diag);
                Some((key?, val?))
            }
            other => {
                diag.mismatch(path, "two-element array", other);
                None
            }
        }
    }
}

impl<E: Entity> FromWire for E {
    fn from_wire(value: &Value, path: &FieldPath, diag: &mut Diagnostics) -> Option<Self> {
        let Value::Object(map) = value else {
            diag.mismatch(path, "object", value);
            return None;
        };
        let mut reader = Reader::new::<E>(map, path.clone(), diag);
        let entity = E::read(&mut reader);
        reader.finish();
        if let Some(entity) = &entity {
            entity.check(path, &mut diag.warnings);
        }
        entity
    }
}

/// Field access for one entity payload.
pub struct Reader<'a> {
    map: &'a Map<String, Value>,
    path: FieldPath,
    entity: &'static str,
    strict: bool,
    fields: &'static [FieldSpec],
    diag: &'a mut Diagnostics,
}

impl<'a> Reader<'a> {
    fn new<E: Entity>(
        map: &'a Map<String, Value>,
        path: FieldPath,
        diag: &'a mut Diagnostics,
    ) -> Self {
        Self {
            map,
            path,
            entity: E::NAME,
            strict: E::STRICT,
            fields: E::FIELDS,
            diag,
        }
    }

    /// The whole payload, for entities with more than one encoding.
    pub fn payload(&self) -> &'a Map<String, Value> {
        self.map
    }

    /// A field that must be present.
    pub fn required<T: FromWire>(&mut self, name: &'static str) -> Option<T> {
        let spec = self.spec(name);
        let path = self.path.field(spec.name);
        match self.lookup(&spec) {
            Some(value) => T::from_wire(value, &path, self.diag),
            None => {
                self.diag.error(
                    path,
                    FieldErrorKind::MissingRequiredField {
                        entity: self.entity,
                    },
                );
                None
            }
        }
    }

    /// A field that may be absent or null.
    pub fn optional<T: FromWire>(&mut self, name: &'static str) -> Option<T> {
        let spec = self.spec(name);
        let value = self.lookup(&spec)?;
        T::from_wire(value, &self.path.field(spec.name), self.diag)
    }

    /// A field that falls back to `T::default()`, typically an empty container.
    pub fn defaulted<T: FromWire + Default>(&mut self, name: &'static str) -> T {
        self.optional(name).unwrap_or_default()
    }

    /// A status field coerced through its enumeration.
    pub fn required_enum<E: WireEnum>(&mut self, name: &'static str) -> Option<E> {
        let text: String = self.required(name)?;
        self.coerce_enum(name, &text)
    }

    pub fn optional_enum<E: WireEnum>(&mut self, name: &'static str) -> Option<E> {
        let text: String = self.optional(name)?;
        self.coerce_enum(name, &text)
    }

    /// Every key of the payload converted as `T`.
    pub fn entries<T: FromWire>(&mut self) -> HashMap<String, T> {
        let mut out = HashMap::with_capacity(self.map.len());
        for (key, value) in self.map {
            if let Some(v) = T::from_wire(value, &self.path.key(key), self.diag) {
                out.insert(key.clone(), v);
            }
        }
        out
    }

    fn coerce_enum<E: WireEnum>(&mut self, name: &'static str, text: &str) -> Option<E> {
        match E::coerce(text) {
            Ok(member) => Some(member),
            Err(err) => {
                let path = self.path.field(self.spec(name).name);
                self.diag.error(path, err.into());
                None
            }
        }
    }

    fn spec(&self, name: &'static str) -> FieldSpec {
        match self.fields.iter().find(|f| f.name == name) {
            Some(spec) => *spec,
            None => {
                debug_assert!(false, "{} does not declare field {}", self.entity, name);
                FieldSpec::optional(name, name)
            }
        }
    }

    fn lookup(&self, spec: &FieldSpec) -> Option<&'a Value> {
        self.map
            .get(spec.alias)
            .filter(|v| !v.is_null())
            .or_else(|| self.map.get(spec.name).filter(|v| !v.is_null()))
    }

    fn finish(self) {
        if !self.strict {
            return;
        }
        for key in self.map.keys() {
            if !self.fields.iter().any(|f| f.matches(key)) {
                self.diag.warnings.push(Anomaly::UnknownField {
                    path: self.path.key(key),
                    entity: self.entity,
                });
            }
        }
    }
}

/// An entity together with the anomalies recovered while building it.
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub value: T,
    pub warnings: Vec<Anomaly>,
}

impl<T> Normalized<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Normalized<U> {
        Normalized {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// Build an entity of type `E` from a payload.
pub fn normalize<E: Entity>(payload: &Value) -> Result<Normalized<E>, NormalizeError> {
    run::<E, E>(payload, FieldPath::root(E::LABEL))
}

/// Build a list of entities from an array payload, as returned by the list
/// endpoints. One bad element fails the whole list.
pub fn normalize_list<E: Entity>(
    payload: &Value,
) -> Result<Normalized<Vec<E>>, NormalizeError> {
    run::<E, Vec<E>>(payload, FieldPath::root(E::LABEL))
}

fn run<E: Entity, T: FromWire>(
    payload: &Value,
    root: FieldPath,
) -> Result<Normalized<T>, NormalizeError> {
    let mut diag = Diagnostics::default();
    let value = T::from_wire(payload, &root, &mut diag);

    match value {
        Some(value) if diag.errors.is_empty() => {
            for warning in &diag.warnings {
                warn!("{}", warning);
            }
            debug!(
                "Normalized {} with {} warning(s)",
                E::NAME,
                diag.warnings.len()
            );
            Ok(Normalized {
                value,
                warnings: diag.warnings,
            })
        }
        _ => {
            debug!("{} rejected with {} error(s)", E::NAME, diag.errors.len());
            Err(NormalizeError::Invalid {
                entity: E::NAME,
                errors: diag.errors,
            })
        }
    }
}

/// Re-encode an entity under its wire aliases.
pub fn to_wire<T: Serialize>(entity: &T) -> serde_json::Result<Value> {
    serde_json::to_value(entity)
}

pub(crate) fn check_non_negative(
    path: &FieldPath,
    warnings: &mut Vec<Anomaly>,
    counters: &[(&'static str, Option<i64>)],
) {
    for &(name, value) in counters {
        if let Some(v) = value.filter(|v| *v < 0) {
            warnings.push(Anomaly::Inconsistent {
                path: path.field(name),
                detail: format!("counter is negative ({})", v),
            });
        }
    }
}

/// Warn when the sub-counts of a counter add up to more than its total.
pub(crate) fn check_sub_counts(
    path: &FieldPath,
    warnings: &mut Vec<Anomaly>,
    total: (&'static str, Option<i64>),
    parts: &[Option<i64>],
) {
    let (name, Some(total)) = total else {
        return;
    };
    let sum: i128 = parts.iter().flatten().map(|&part| i128::from(part)).sum();
    if sum > i128::from(total) {
        warnings.push(Anomaly::Inconsistent {
            path: path.field(name),
            detail: format!("sub-counts sum to {} but total is {}", sum, total),
        });
    }
}

/// Warn when `earlier` is after `later`. Raw text is not compared.
pub(crate) fn check_ordered(
    path: &FieldPath,
    warnings: &mut Vec<Anomaly>,
    earlier: (&'static str, Option<&Timestamp>),
    later: (&'static str, Option<&Timestamp>),
) {
    let (Some(a), Some(b)) = (
        earlier.1.and_then(Timestamp::epoch_millis),
        later.1.and_then(Timestamp::epoch_millis),
    ) else {
        return;
    };
    if a > b {
        warnings.push(Anomaly::Inconsistent {
            path: path.field(later.0),
            detail: format!("{} precedes {}", later.0, earlier.0),
        });
    }
}
