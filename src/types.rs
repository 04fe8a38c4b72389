use chrono::{DateTime, NaiveDateTime};
use clap::ValueEnum;
use serde::ser::{Serialize, Serializer};
use serde_json::Value as JsonValue;

/// Values bound as statement arguments and returned in result rows.
///
/// Call sites build arguments from whatever they have in hand; a missing optional value is
/// `None`, which normalizes to [`RowValues::Null`]:
/// ```rust
/// use sql_shim::prelude::*;
///
/// let vendor_gstin: Option<String> = None;
/// let args = args!["c-42", 5, vendor_gstin];
/// assert_eq!(args[2], RowValues::Null);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value (no zone; UTC when read from a zoned column)
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RowValues::Bool(value) => Some(*value),
            RowValues::Int(0) => Some(false),
            RowValues::Int(1) => Some(true),
            _ => None,
        }
    }

    /// Timestamp view of the value; text in the formats SQLite writes is parsed.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            RowValues::Timestamp(value) => Some(*value),
            RowValues::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Convert to a `serde_json::Value` the way rows are rendered in HTTP responses.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            RowValues::Int(i) => JsonValue::from(*i),
            RowValues::Float(f) => serde_json::Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
            RowValues::Text(s) => JsonValue::String(s.clone()),
            RowValues::Bool(b) => JsonValue::Bool(*b),
            RowValues::Timestamp(dt) => JsonValue::String(format_timestamp(dt)),
            RowValues::Null => JsonValue::Null,
            RowValues::JSON(v) => v.clone(),
            RowValues::Blob(bytes) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
        }
    }
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parse the timestamp text shapes produced by `datetime('now')`, ISO-8601 clients, and RFC 3339.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_utc())
}

pub(crate) fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

impl Serialize for RowValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RowValues::Int(i) => serializer.serialize_i64(*i),
            RowValues::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            RowValues::Float(_) | RowValues::Null => serializer.serialize_none(),
            RowValues::Text(s) => serializer.serialize_str(s),
            RowValues::Bool(b) => serializer.serialize_bool(*b),
            RowValues::Timestamp(dt) => serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            RowValues::JSON(v) => v.serialize(serializer),
            RowValues::Blob(bytes) => serializer.serialize_bytes(bytes),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<u32> for RowValues {
    fn from(value: u32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<&String> for RowValues {
    fn from(value: &String) -> Self {
        RowValues::Text(value.clone())
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

/// Missing values bind as NULL.
impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Request-body values: JSON `null` becomes NULL, scalars map to their column-friendly variant,
/// arrays and objects stay JSON.
impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => RowValues::Null,
            JsonValue::Bool(b) => RowValues::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => RowValues::Int(i),
                None => n.as_f64().map_or(RowValues::Null, RowValues::Float),
            },
            JsonValue::String(s) => RowValues::Text(s),
            other @ (JsonValue::Array(_) | JsonValue::Object(_)) => RowValues::JSON(other),
        }
    }
}

impl From<&JsonValue> for RowValues {
    fn from(value: &JsonValue) -> Self {
        RowValues::from(value.clone())
    }
}

/// Build a `Vec<RowValues>` argument list from heterogeneous values.
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::RowValues>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::RowValues::from($value)),+]
    };
}

/// The database backends this shim can run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DatabaseType {
    /// `PostgreSQL` (the translated dialect)
    #[cfg(feature = "postgres")]
    Postgres,
    /// `SQLite` (the dialect call sites are written in)
    #[cfg(feature = "sqlite")]
    Sqlite,
}

impl From<DatabaseType> for crate::translation::Dialect {
    fn from(db_type: DatabaseType) -> Self {
        match db_type {
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => crate::translation::Dialect::Postgres,
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => crate::translation::Dialect::Sqlite,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_values_normalize_to_null() {
        let absent: Option<i64> = None;
        assert_eq!(RowValues::from(absent), RowValues::Null);
        assert_eq!(RowValues::from(Some("x")), RowValues::Text("x".into()));
        assert_eq!(RowValues::from(json!(null)), RowValues::Null);
    }

    #[test]
    fn json_scalars_map_to_variants() {
        assert_eq!(RowValues::from(json!(5)), RowValues::Int(5));
        assert_eq!(RowValues::from(json!(2.5)), RowValues::Float(2.5));
        assert_eq!(RowValues::from(json!(true)), RowValues::Bool(true));
        assert_eq!(
            RowValues::from(json!({"a": 1})),
            RowValues::JSON(json!({"a": 1}))
        );
    }

    #[test]
    fn args_macro_mixes_types() {
        let gst: Option<f64> = None;
        let args = args![5, "x", gst, true];
        assert_eq!(
            args,
            vec![
                RowValues::Int(5),
                RowValues::Text("x".into()),
                RowValues::Null,
                RowValues::Bool(true),
            ]
        );
        assert!(args![].is_empty());
    }

    #[test]
    fn parses_sqlite_and_iso_timestamps() {
        let a = parse_timestamp("2024-03-01 10:15:00").unwrap();
        let b = parse_timestamp("2024-03-01T10:15:00Z").unwrap();
        let c = parse_timestamp("2024-03-01 10:15:00.250").unwrap();
        assert_eq!(a, b);
        assert_eq!(c.and_utc().timestamp_subsec_millis(), 250);
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn serializes_like_json_rows() {
        let ts = parse_timestamp("2024-03-01 10:15:00").unwrap();
        assert_eq!(
            serde_json::to_value(RowValues::Timestamp(ts)).unwrap(),
            json!("2024-03-01T10:15:00")
        );
        assert_eq!(serde_json::to_value(RowValues::Float(f64::NAN)).unwrap(), json!(null));
        assert_eq!(RowValues::Timestamp(ts).to_json(), json!("2024-03-01T10:15:00"));
        assert_eq!(RowValues::Blob(vec![1, 2]).to_json(), json!([1, 2]));
    }
}
