//! Cell values as delivered by the driver

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::value::RawValue;
use uuid::Uuid;

/// One cell of a fetched row.
///
/// Values pass through untouched; rendering is plain JSON. Date and time
/// variants serialize as ISO 8601 strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl CellValue {
    /// Render `bytes` the way PostgreSQL prints bytea: `\x` followed by hex.
    pub fn bytea(bytes: &[u8]) -> Self {
        Self::Text(format!("\\x{}", hex::encode(bytes)))
    }
}

/// An exact decimal, written to JSON as a number literal without passing
/// through `f64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal(String);

impl Decimal {
    /// Accepts `-?(0|[1-9][0-9]*)(\.[0-9]+)?`, the JSON number grammar
    /// without exponents.
    pub fn parse(text: &str) -> Option<Self> {
        let unsigned = text.strip_prefix('-').unwrap_or(text);
        let (int, frac) = match unsigned.split_once('.') {
            Some((int, frac)) => (int, Some(frac)),
            None => (unsigned, None),
        };
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        let int_ok = digits(int) && (int == "0" || !int.starts_with('0'));
        let frac_ok = frac.map_or(true, digits);
        (int_ok && frac_ok).then(|| Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match RawValue::from_string(self.0.clone()) {
            Ok(raw) => raw.serialize(serializer),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_as_plain_json() -> Result<(), serde_json::Error> {
        let date = NaiveDate::from_ymd_opt(1996, 7, 4).expect("valid date");
        let cells = vec![
            CellValue::Null,
            CellValue::from(true),
            CellValue::from(10248i64),
            CellValue::from(32.38),
            CellValue::from("VINET"),
            CellValue::from(date),
            CellValue::from(None::<i64>),
        ];
        let value = serde_json::to_value(&cells)?;
        assert_eq!(
            value,
            json!([null, true, 10248, 32.38, "VINET", "1996-07-04", null])
        );
        Ok(())
    }

    #[test]
    fn test_decimal_keeps_every_digit() -> Result<(), serde_json::Error> {
        let big = Decimal::parse("12345678901234567890123").expect("integral decimal");
        let cents = Decimal::parse("9007199254740993.01").expect("fractional decimal");
        let row = vec![CellValue::Decimal(big), CellValue::Decimal(cents)];
        assert_eq!(
            serde_json::to_string(&row)?,
            "[12345678901234567890123,9007199254740993.01]"
        );
        Ok(())
    }

    #[test]
    fn test_decimal_grammar() {
        for ok in ["0", "-0.05", "0.00", "32.38", "100000000000000000000"] {
            assert_eq!(Decimal::parse(ok).map(|d| d.as_str().to_string()), Some(ok.to_string()));
        }
        for bad in ["", "-", "01", ".5", "5.", "1e5", "NaN", "1.2.3", "+1"] {
            assert!(Decimal::parse(bad).is_none(), "{}", bad);
        }
    }

    #[test]
    fn test_bytea_rendering() {
        assert_eq!(
            CellValue::bytea(&[0xde, 0xad, 0xbe, 0xef]),
            CellValue::Text("\\xdeadbeef".to_string())
        );
    }
}
