//! Field coercion for the ambiguous encodings Spark's REST API emits.
//!
//! Timestamps arrive either as epoch milliseconds or as ISO-like strings that
//! end in a literal `GMT` marker. Status fields arrive as loosely-cased text.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Timelike};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Format of Spark's string timestamps once `GMT` is rewritten to `+0000`.
const GMT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// A timestamp field after coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    /// An epoch value rendered as host-local wall time with no offset attached.
    Local(NaiveDateTime),
    /// A `GMT`-suffixed string, parsed with a zero offset.
    Zoned(DateTime<FixedOffset>),
    /// Text that is not a recognised timestamp, kept verbatim.
    Raw(String),
}

impl Timestamp {
    /// Coerce an epoch-milliseconds value.
    pub fn from_epoch_millis(millis: f64) -> Option<Self> {
        if !millis.is_finite() {
            return None;
        }
        let micros = (millis * 1000.0).round();
        if micros.abs() > i64::MAX as f64 {
            return None;
        }
        let micros = micros as i64;
        let secs = micros.div_euclid(1_000_000);
        let nanos = (micros.rem_euclid(1_000_000) * 1000) as u32;
        let utc = DateTime::from_timestamp(secs, nanos)?.naive_utc();
        utc.checked_add_offset(Local.offset_from_utc_datetime(&utc))
            .map(Timestamp::Local)
    }

    /// Coerce a string. `GMT`-suffixed text that fails to parse stays `Raw`.
    pub fn from_text(text: &str) -> Self {
        if text.ends_with("GMT") {
            if let Some(parsed) = parse_gmt(text) {
                return Timestamp::Zoned(parsed);
            }
        }
        Timestamp::Raw(text.to_string())
    }

    /// A `GMT`-suffixed string that could not be parsed.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Timestamp::Raw(text) if text.ends_with("GMT"))
    }

    /// UTC offset in seconds, when the value carries one.
    pub fn offset_seconds(&self) -> Option<i32> {
        match self {
            Timestamp::Zoned(dt) => Some(dt.offset().local_minus_utc()),
            _ => None,
        }
    }

    /// Milliseconds since the epoch. Local values are read back through the
    /// host time zone; raw text has no instant.
    pub fn epoch_millis(&self) -> Option<i64> {
        match self {
            Timestamp::Local(naive) => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.timestamp_millis()),
            Timestamp::Zoned(dt) => Some(dt.timestamp_millis()),
            Timestamp::Raw(_) => None,
        }
    }

    /// ISO-8601 rendering. Fractional seconds are printed only when non-zero.
    pub fn to_iso8601(&self) -> String {
        match self {
            Timestamp::Local(naive) => {
                if naive.nanosecond() == 0 {
                    naive.format("%Y-%m-%dT%H:%M:%S").to_string()
                } else {
                    naive.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
                }
            }
            Timestamp::Zoned(dt) => {
                if dt.nanosecond() == 0 {
                    dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
                } else {
                    dt.format("%Y-%m-%dT%H:%M:%S%.6f%:z").to_string()
                }
            }
            Timestamp::Raw(text) => text.clone(),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

/// Spark always writes a fraction of one to six digits before `GMT`.
fn parse_gmt(text: &str) -> Option<DateTime<FixedOffset>> {
    let body = text.strip_suffix("GMT")?;
    let (_, fraction) = body.rsplit_once('.')?;
    let digits = fraction.bytes().all(|b| b.is_ascii_digit());
    if !digits || fraction.is_empty() || fraction.len() > 6 {
        return None;
    }
    let rewritten = text.replace("GMT", "+0000");
    DateTime::parse_from_str(&rewritten, GMT_FORMAT).ok()
}

/// A JSON value of a type no timestamp encoding uses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("timestamp cannot be a {0}")]
    Unsupported(&'static str),
    #[error("epoch value {0} is out of range")]
    OutOfRange(String),
}

/// Coerce a wire timestamp. `null` stays `None`, numbers are epoch
/// milliseconds, strings go through [`Timestamp::from_text`].
pub fn coerce_timestamp(value: &Value) -> Result<Option<Timestamp>, TimestampError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            let millis = match n.as_i64() {
                Some(i) => i as f64,
                None => n.as_f64().unwrap_or(f64::NAN),
            };
            Timestamp::from_epoch_millis(millis)
                .map(Some)
                .ok_or_else(|| TimestampError::OutOfRange(n.to_string()))
        }
        Value::String(text) => Ok(Some(Timestamp::from_text(text))),
        other => Err(TimestampError::Unsupported(json_type_name(other))),
    }
}

/// Input that matches no member of an enumeration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value {value:?} for {enumeration}")]
pub struct InvalidEnumValue {
    pub value: String,
    pub enumeration: &'static str,
}

/// A closed set of status strings.
pub trait WireEnum: Sized + Copy + 'static {
    const ENUM_NAME: &'static str;
    const MEMBERS: &'static [Self];

    /// Value as it appears on the wire.
    fn value(self) -> &'static str;

    /// Canonical member name. Spark uses the value as the name.
    fn name(self) -> &'static str {
        self.value()
    }

    /// Historical spellings, matched lower-cased before anything else.
    fn aliases() -> &'static [(&'static str, Self)] {
        &[]
    }

    fn coerce(input: &str) -> Result<Self, InvalidEnumValue> {
        coerce_enum(input)
    }
}

/// Resolve `input` against the alias table, then member values, then member
/// names, ignoring case.
pub fn coerce_enum<E: WireEnum>(input: &str) -> Result<E, InvalidEnumValue> {
    let lower = input.to_lowercase();
    if let Some((_, member)) = E::aliases().iter().find(|(alias, _)| *alias == lower) {
        return Ok(*member);
    }

    let upper = input.to_uppercase();
    E::MEMBERS
        .iter()
        .find(|member| member.value() == upper)
        .or_else(|| E::MEMBERS.iter().find(|member| member.name() == upper))
        .copied()
        .ok_or_else(|| InvalidEnumValue {
            value: input.to_string(),
            enumeration: E::ENUM_NAME,
        })
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
