//! PostgreSQL cell decoding
//!
//! Rows come back in binary format, so each cell is decoded by its column
//! type. Types without a dedicated branch fall back to their raw bytes:
//! UTF-8 becomes text, anything else hex.

use std::error::Error;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tablescope_core::{CellValue, Decimal};
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::Row;
use uuid::Uuid;

type DecodeError = Box<dyn Error + Sync + Send>;

/// Decode every cell of `row` in column order.
pub fn decode_row(row: &Row) -> Result<Vec<CellValue>, tokio_postgres::Error> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            decode_cell(row, idx, column.type_()).or_else(|err| {
                tracing::debug!(
                    column = column.name(),
                    pg_type = %column.type_(),
                    error = %err,
                    "Typed decode failed, using raw bytes"
                );
                Ok::<_, tokio_postgres::Error>(row.try_get::<_, RawCell>(idx)?.0)
            })
        })
        .collect()
}

fn decode_cell(row: &Row, idx: usize, ty: &Type) -> Result<CellValue, tokio_postgres::Error> {
    let cell = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(i64::from).into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.into(),
        Type::OID => row.try_get::<_, Option<u32>>(idx)?.map(i64::from).into(),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(f64::from).into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.into(),
        Type::NUMERIC => row
            .try_get::<_, Option<PgNumeric>>(idx)?
            .map(PgNumeric::into_cell)
            .unwrap_or(CellValue::Null),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            row.try_get::<_, Option<String>>(idx)?.into()
        }
        Type::DATE => row.try_get::<_, Option<NaiveDate>>(idx)?.into(),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)?
            .map(CellValue::Time)
            .unwrap_or(CellValue::Null),
        Type::TIMESTAMP => row.try_get::<_, Option<NaiveDateTime>>(idx)?.into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(CellValue::TimestampTz)
            .unwrap_or(CellValue::Null),
        Type::UUID => row
            .try_get::<_, Option<Uuid>>(idx)?
            .map(CellValue::Uuid)
            .unwrap_or(CellValue::Null),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(CellValue::Json)
            .unwrap_or(CellValue::Null),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map(|bytes| CellValue::bytea(&bytes))
            .unwrap_or(CellValue::Null),
        _ => row.try_get::<_, RawCell>(idx)?.0,
    };
    Ok(cell)
}

// ============================================================================
// RAW FALLBACK
// ============================================================================

/// Any type, rendered from its binary representation.
struct RawCell(CellValue);

impl<'a> FromSql<'a> for RawCell {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        Ok(RawCell(match std::str::from_utf8(raw) {
            Ok(text) => CellValue::Text(text.to_string()),
            Err(_) => CellValue::bytea(raw),
        }))
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, DecodeError> {
        Ok(RawCell(CellValue::Null))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

// ============================================================================
// NUMERIC
// ============================================================================

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;
const NBASE: u16 = 10_000;

/// A decoded `numeric` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgNumeric {
    /// Exact decimal rendering, e.g. `-0.05`.
    Finite(String),
    NaN,
    Infinity,
    NegInfinity,
}

impl PgNumeric {
    /// Finite values become exact JSON numbers, the specials become text.
    pub fn into_cell(self) -> CellValue {
        match self {
            PgNumeric::Finite(text) => match Decimal::parse(&text) {
                Some(decimal) => CellValue::Decimal(decimal),
                None => CellValue::Text(text),
            },
            PgNumeric::NaN => CellValue::Text("NaN".to_string()),
            PgNumeric::Infinity => CellValue::Text("Infinity".to_string()),
            PgNumeric::NegInfinity => CellValue::Text("-Infinity".to_string()),
        }
    }
}

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, DecodeError> {
        decode_numeric(raw)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

fn read_u16(raw: &[u8], at: usize) -> Result<u16, DecodeError> {
    raw.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(|| "numeric value truncated".into())
}

/// Decode the binary `numeric` wire format: a header of digit count,
/// weight, sign and display scale, followed by base-10000 digits.
pub fn decode_numeric(raw: &[u8]) -> Result<PgNumeric, DecodeError> {
    let ndigits = usize::from(read_u16(raw, 0)?);
    let weight = i32::from(read_u16(raw, 2)? as i16);
    let sign = read_u16(raw, 4)?;
    let dscale = usize::from(read_u16(raw, 6)?);

    let negative = match sign {
        NUMERIC_POS => false,
        NUMERIC_NEG => true,
        NUMERIC_NAN => return Ok(PgNumeric::NaN),
        NUMERIC_PINF => return Ok(PgNumeric::Infinity),
        NUMERIC_NINF => return Ok(PgNumeric::NegInfinity),
        other => return Err(format!("invalid numeric sign 0x{:04x}", other).into()),
    };

    if raw.len() != 8 + 2 * ndigits {
        return Err(format!(
            "numeric length mismatch: {} digits in {} bytes",
            ndigits,
            raw.len()
        )
        .into());
    }
    let digits = (0..ndigits)
        .map(|i| {
            let digit = read_u16(raw, 8 + 2 * i)?;
            if digit >= NBASE {
                return Err(format!("invalid numeric digit {}", digit).into());
            }
            Ok(digit)
        })
        .collect::<Result<Vec<u16>, DecodeError>>()?;

    // Digit i has weight `weight - i`, in units of NBASE.
    let digit_at = |index: i32| -> u16 {
        usize::try_from(index)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut text = String::new();
    if negative {
        text.push('-');
    }

    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&digit_at(0).to_string());
        for index in 1..=weight {
            text.push_str(&format!("{:04}", digit_at(index)));
        }
    }

    if dscale > 0 {
        let groups = dscale.div_ceil(4);
        let mut fraction = String::with_capacity(groups * 4);
        for group in 0..groups {
            let index = weight + 1 + group as i32;
            fraction.push_str(&format!("{:04}", digit_at(index)));
        }
        fraction.truncate(dscale);
        text.push('.');
        text.push_str(&fraction);
    }

    Ok(PgNumeric::Finite(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&(digits.len() as u16).to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&dscale.to_be_bytes());
        for digit in digits {
            raw.extend_from_slice(&digit.to_be_bytes());
        }
        raw
    }

    fn finite(weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> String {
        match decode_numeric(&encode(weight, sign, dscale, digits)) {
            Ok(PgNumeric::Finite(text)) => text,
            other => panic!("expected finite numeric, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_simple_values() {
        assert_eq!(finite(0, NUMERIC_POS, 1, &[12, 5000]), "12.5");
        assert_eq!(finite(-1, NUMERIC_NEG, 2, &[500]), "-0.05");
        assert_eq!(finite(0, NUMERIC_POS, 0, &[]), "0");
        assert_eq!(finite(0, NUMERIC_POS, 2, &[]), "0.00");
        assert_eq!(finite(0, NUMERIC_POS, 2, &[32, 3800]), "32.38");
    }

    #[test]
    fn test_decode_large_weight() {
        // 1e20 is a single digit 1 at weight 5.
        assert_eq!(finite(5, NUMERIC_POS, 0, &[1]), "100000000000000000000");
        assert_eq!(finite(1, NUMERIC_POS, 0, &[12, 3456]), "123456");
    }

    #[test]
    fn test_decode_small_fraction() {
        // 0.00000001: weight -2, digit 100 (the second fractional group).
        assert_eq!(finite(-2, NUMERIC_POS, 8, &[100]), "0.00000001");
    }

    #[test]
    fn test_decode_specials() -> Result<(), DecodeError> {
        assert_eq!(decode_numeric(&encode(0, NUMERIC_NAN, 0, &[]))?, PgNumeric::NaN);
        assert_eq!(decode_numeric(&encode(0, NUMERIC_PINF, 0, &[]))?, PgNumeric::Infinity);
        assert_eq!(decode_numeric(&encode(0, NUMERIC_NINF, 0, &[]))?, PgNumeric::NegInfinity);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode_numeric(&[0, 1]).is_err());
        assert!(decode_numeric(&encode(0, 0x1234, 0, &[])).is_err());
        assert!(decode_numeric(&encode(0, NUMERIC_POS, 0, &[10_000])).is_err());
        let mut truncated = encode(0, NUMERIC_POS, 0, &[1, 2]);
        truncated.pop();
        assert!(decode_numeric(&truncated).is_err());
    }

    #[test]
    fn test_numeric_into_cell() -> Result<(), serde_json::Error> {
        let cell = PgNumeric::Finite("12.5".to_string()).into_cell();
        assert_eq!(serde_json::to_string(&cell)?, "12.5");

        // 24 significant digits survive; an f64 would round them away.
        let digits = finite(5, NUMERIC_POS, 0, &[1234, 5678, 9012, 3456, 7890, 123]);
        assert_eq!(digits, "123456789012345678900123");
        let cell = PgNumeric::Finite(digits).into_cell();
        assert_eq!(serde_json::to_string(&cell)?, "123456789012345678900123");

        let cell = PgNumeric::Finite("9007199254740993.01".to_string()).into_cell();
        assert_eq!(serde_json::to_string(&cell)?, "9007199254740993.01");

        assert_eq!(
            PgNumeric::NaN.into_cell(),
            CellValue::Text("NaN".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_raw_cell_fallback() -> Result<(), DecodeError> {
        let text = RawCell::from_sql(&Type::INET, b"happy")?;
        assert_eq!(text.0, CellValue::Text("happy".to_string()));
        let bytes = RawCell::from_sql(&Type::INET, &[0xff, 0x00])?;
        assert_eq!(bytes.0, CellValue::Text("\\xff00".to_string()));
        Ok(())
    }
}
