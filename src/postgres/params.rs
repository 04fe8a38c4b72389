use std::error::Error;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tokio_postgres::types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use tokio_util::bytes::BytesMut;
use uuid::Uuid;

use crate::types::{RowValues, format_timestamp, parse_timestamp};

type BoxError = Box<dyn Error + Sync + Send>;

/// Borrowed parameter list in the shape `tokio_postgres` expects.
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    #[must_use]
    pub fn convert(params: &'a [RowValues]) -> Params<'a> {
        let mut references = Vec::with_capacity(params.len());
        for p in params {
            references.push(p as &(dyn ToSql + Sync));
        }
        Params { references }
    }

    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

/// Values are bound against the parameter type the server inferred, so `Text("42")` can
/// fill an `int4` slot and `Int(1)` a `bool` slot the way `SQLite` call sites expect.
impl ToSql for RowValues {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::Int(i) => int_to_sql(*i, ty, out),
            RowValues::Float(f) => float_to_sql(*f, ty, out),
            RowValues::Text(s) => text_to_sql(s, ty, out),
            RowValues::Bool(b) => bool_to_sql(*b, ty, out),
            RowValues::Timestamp(dt) => timestamp_to_sql(dt, ty, out),
            RowValues::JSON(v) => json_to_sql(v, ty, out),
            RowValues::Blob(bytes) => match *ty {
                Type::BYTEA => bytes.as_slice().to_sql(ty, out),
                _ => Err(mismatch("blob", ty)),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn is_text_like(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    ) || matches!(ty.kind(), Kind::Enum(_))
        || ty.name() == "citext"
}

fn mismatch(what: &str, ty: &Type) -> BoxError {
    format!("cannot bind {what} to a `{}` parameter", ty.name()).into()
}

fn int_to_sql(i: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    let out_of_range = || -> BoxError { format!("{i} is out of range for `{}`", ty.name()).into() };
    match *ty {
        Type::INT2 => i16::try_from(i).map_err(|_| out_of_range())?.to_sql(ty, out),
        Type::INT4 => i32::try_from(i).map_err(|_| out_of_range())?.to_sql(ty, out),
        Type::INT8 => i.to_sql(ty, out),
        Type::OID => u32::try_from(i).map_err(|_| out_of_range())?.to_sql(ty, out),
        #[allow(clippy::cast_precision_loss)]
        Type::FLOAT4 => (i as f32).to_sql(ty, out),
        #[allow(clippy::cast_precision_loss)]
        Type::FLOAT8 => (i as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(i).to_sql(ty, out),
        Type::BOOL => match i {
            0 => false.to_sql(ty, out),
            1 => true.to_sql(ty, out),
            _ => Err(out_of_range()),
        },
        _ if is_text_like(ty) => i.to_string().to_sql(ty, out),
        _ => Err(mismatch("integer", ty)),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_sql(f: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT8 => f.to_sql(ty, out),
        Type::FLOAT4 => (f as f32).to_sql(ty, out),
        // through the shortest decimal text, so 0.1 binds as 0.1 and not its binary expansion
        Type::NUMERIC => parse_decimal(&f.to_string())
            .ok_or_else(|| -> BoxError { format!("{f} does not fit `numeric`").into() })?
            .to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 => {
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                int_to_sql(f as i64, ty, out)
            } else {
                Err(format!("{f} is not an integer").into())
            }
        }
        _ if is_text_like(ty) => f.to_string().to_sql(ty, out),
        _ => Err(mismatch("float", ty)),
    }
}

fn bool_to_sql(b: bool, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::BOOL => b.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 => int_to_sql(i64::from(b), ty, out),
        _ if is_text_like(ty) => b.to_string().to_sql(ty, out),
        _ => Err(mismatch("bool", ty)),
    }
}

fn timestamp_to_sql(dt: &NaiveDateTime, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::TIMESTAMP => dt.to_sql(ty, out),
        Type::TIMESTAMPTZ => dt.and_utc().to_sql(ty, out),
        Type::DATE => dt.date().to_sql(ty, out),
        _ if is_text_like(ty) => format_timestamp(dt).to_sql(ty, out),
        _ => Err(mismatch("timestamp", ty)),
    }
}

fn json_to_sql(v: &JsonValue, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::JSON | Type::JSONB => v.to_sql(ty, out),
        _ if is_text_like(ty) => v.to_string().to_sql(ty, out),
        _ => Err(mismatch("json", ty)),
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    s.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Text is what `SQLite` call sites pass for most things; parse it into the slot's type.
fn text_to_sql(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    let unparsable = || -> BoxError { format!("cannot read {s:?} as `{}`", ty.name()).into() };
    match *ty {
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => {
            let i = s.trim().parse::<i64>().map_err(|_| unparsable())?;
            int_to_sql(i, ty, out)
        }
        Type::FLOAT4 | Type::FLOAT8 => {
            let f = s.trim().parse::<f64>().map_err(|_| unparsable())?;
            float_to_sql(f, ty, out)
        }
        Type::NUMERIC => parse_decimal(s).ok_or_else(unparsable)?.to_sql(ty, out),
        Type::BOOL => match s.trim().to_ascii_lowercase().as_str() {
            "t" | "true" | "1" | "yes" | "on" => true.to_sql(ty, out),
            "f" | "false" | "0" | "no" | "off" => false.to_sql(ty, out),
            _ => Err(unparsable()),
        },
        Type::UUID => Uuid::parse_str(s.trim())
            .map_err(|_| unparsable())?
            .to_sql(ty, out),
        Type::TIMESTAMP | Type::TIMESTAMPTZ => {
            let dt = parse_timestamp(s).ok_or_else(unparsable)?;
            timestamp_to_sql(&dt, ty, out)
        }
        Type::DATE => {
            let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .ok()
                .or_else(|| parse_timestamp(s).map(|dt| dt.date()))
                .ok_or_else(unparsable)?;
            date.to_sql(ty, out)
        }
        Type::TIME => {
            let time = NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f").map_err(|_| unparsable())?;
            time.to_sql(ty, out)
        }
        Type::JSON | Type::JSONB => {
            let v: JsonValue = serde_json::from_str(s).map_err(|_| unparsable())?;
            v.to_sql(ty, out)
        }
        Type::BYTEA => s.as_bytes().to_sql(ty, out),
        _ if is_text_like(ty) => s.to_sql(ty, out),
        _ => Err(mismatch("text", ty)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_postgres::types::FromSql;

    fn bind(value: &RowValues, ty: &Type) -> Result<Vec<u8>, BoxError> {
        let mut buf = BytesMut::new();
        value.to_sql(ty, &mut buf)?;
        Ok(buf.to_vec())
    }

    #[test]
    fn null_binds_to_any_type() {
        let mut buf = BytesMut::new();
        for ty in [Type::INT4, Type::UUID, Type::JSONB, Type::POINT] {
            assert!(matches!(RowValues::Null.to_sql(&ty, &mut buf), Ok(IsNull::Yes)));
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn integers_narrow_with_range_checks() {
        assert_eq!(bind(&RowValues::Int(7), &Type::INT2).unwrap(), vec![0, 7]);
        assert_eq!(bind(&RowValues::Int(7), &Type::INT4).unwrap(), vec![0, 0, 0, 7]);
        assert!(bind(&RowValues::Int(70_000), &Type::INT2).is_err());
        assert!(bind(&RowValues::Int(i64::MAX), &Type::INT4).is_err());
    }

    #[test]
    fn sqlite_style_booleans() {
        assert_eq!(bind(&RowValues::Int(1), &Type::BOOL).unwrap(), vec![1]);
        assert_eq!(bind(&RowValues::Int(0), &Type::BOOL).unwrap(), vec![0]);
        assert!(bind(&RowValues::Int(2), &Type::BOOL).is_err());
        assert_eq!(bind(&RowValues::Bool(true), &Type::INT4).unwrap(), vec![0, 0, 0, 1]);
    }

    #[test]
    fn text_parses_into_typed_slots() {
        assert_eq!(
            bind(&RowValues::Text("42".into()), &Type::INT8).unwrap(),
            42i64.to_be_bytes().to_vec()
        );
        let uuid = bind(
            &RowValues::Text("6f1c2a9e-3b4d-4e5f-8a7b-0c1d2e3f4a5b".into()),
            &Type::UUID,
        )
        .unwrap();
        assert_eq!(
            Uuid::from_sql(&Type::UUID, &uuid).unwrap().to_string(),
            "6f1c2a9e-3b4d-4e5f-8a7b-0c1d2e3f4a5b"
        );
        let braced = bind(
            &RowValues::Text("{6F1C2A9E-3B4D-4E5F-8A7B-0C1D2E3F4A5B}".into()),
            &Type::UUID,
        )
        .unwrap();
        assert_eq!(braced, uuid);
        assert!(bind(&RowValues::Text("not-a-uuid".into()), &Type::UUID).is_err());
        assert!(bind(&RowValues::Text("2024-03-01".into()), &Type::DATE).is_ok());
        assert!(bind(&RowValues::Text("2024-03-01 10:00:00".into()), &Type::TIMESTAMPTZ).is_ok());
        assert!(bind(&RowValues::Text("abc".into()), &Type::INT4).is_err());
    }

    #[test]
    fn numbers_fill_numeric_slots_exactly() {
        let decoded = |bytes: Vec<u8>| Decimal::from_sql(&Type::NUMERIC, &bytes).unwrap().to_string();

        assert_eq!(decoded(bind(&RowValues::Float(18000.5), &Type::NUMERIC).unwrap()), "18000.5");
        assert_eq!(decoded(bind(&RowValues::Float(0.1), &Type::NUMERIC).unwrap()), "0.1");
        assert_eq!(decoded(bind(&RowValues::Int(-42), &Type::NUMERIC).unwrap()), "-42");
        assert_eq!(
            decoded(bind(&RowValues::Text("18000.50".into()), &Type::NUMERIC).unwrap()),
            "18000.50"
        );
        assert!(bind(&RowValues::Text("1.5e3".into()), &Type::NUMERIC).is_ok());
        assert!(bind(&RowValues::Text("lots".into()), &Type::NUMERIC).is_err());
    }

    #[test]
    fn blob_only_binds_to_bytea() {
        assert_eq!(bind(&RowValues::Blob(vec![1, 2]), &Type::BYTEA).unwrap(), vec![1, 2]);
        assert!(bind(&RowValues::Blob(vec![1]), &Type::TEXT).is_err());
    }
}
