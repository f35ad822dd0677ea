//! Validation Helpers
//!
//! Query-string parsing for handlers and range checks for configuration.

use tablescope_core::{BrowseError, RowLimit};

use crate::error::{ApiError, ApiResult};

/// Parse the raw `limit` query value.
///
/// Absent means "use the default". Non-integers fail with `INVALID_FORMAT`;
/// integers too large for `i64` are reported as out of range, not as a
/// format problem. The range itself is checked by [`RowLimit::new`].
pub fn parse_limit(raw: Option<&str>) -> ApiResult<Option<i64>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();

    match trimmed.parse::<i64>() {
        Ok(value) => Ok(Some(value)),
        Err(_) if is_integer_literal(trimmed) => {
            let value = if trimmed.starts_with('-') { i64::MIN } else { i64::MAX };
            Err(BrowseError::OutOfRangeLimit {
                value,
                min: RowLimit::MIN,
                max: RowLimit::MAX,
            }
            .into())
        }
        Err(_) => Err(ApiError::invalid_format("limit", "an integer")),
    }
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Trait for validating numeric configuration ranges.
pub trait ValidateRange {
    /// Validate that the value is positive (> 0).
    fn validate_positive(&self, field_name: &str) -> ApiResult<()>;

    /// Validate that the value is within an inclusive range.
    fn validate_range(&self, field_name: &str, min: Self, max: Self) -> ApiResult<()>
    where
        Self: Sized;
}

macro_rules! impl_validate_range {
    ($($t:ty),*) => {
        $(
            impl ValidateRange for $t {
                fn validate_positive(&self, field_name: &str) -> ApiResult<()> {
                    if *self == 0 {
                        return Err(ApiError::invalid_config(format!(
                            "{} must be greater than zero",
                            field_name
                        )));
                    }
                    Ok(())
                }

                fn validate_range(&self, field_name: &str, min: Self, max: Self) -> ApiResult<()> {
                    if *self < min || *self > max {
                        return Err(ApiError::invalid_config(format!(
                            "{} must be between {} and {}, got {}",
                            field_name, min, max, self
                        )));
                    }
                    Ok(())
                }
            }
        )*
    };
}

impl_validate_range!(u16, u32, u64, usize);
