//! Fixed-point value codec.
//!
//! Values are multiplied by `10^scale` and truncated toward zero. Truncation
//! is lossy by up to one unit in the last place; decoding divides by the
//! same factor.

use thiserror::Error;

use atlas_common::{EncodedValue, RawCell, RawValue};

/// Conditions the codec reports for a single cell.
///
/// Callers recover from both by treating the cell as null.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("Encountered uncoercible non-numeric value: {value}")]
    NonNumeric { value: String },

    #[error("Value {value} does not fit a 64-bit integer at scale {scale}")]
    OutOfRange { value: f64, scale: u32 },
}

/// Decoded form of an [`EncodedValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Scalar(f64),
    Levels(Vec<Option<f64>>),
}

/// `10^scale` as a float.
pub fn scale_factor(scale: u32) -> f64 {
    10f64.powi(scale as i32)
}

/// Encode one cell.
///
/// Returns `Ok(None)` when every element is masked; the caller omits the
/// variable from the document in that case.
pub fn encode(cell: RawCell<'_>, scale: u32) -> Result<Option<EncodedValue>, CodecError> {
    match cell {
        RawCell::Scalar(value) => Ok(encode_element(value, scale)?.map(EncodedValue::Scalar)),
        RawCell::Levels(values) => {
            let levels = values
                .iter()
                .map(|v| encode_element(v, scale))
                .collect::<Result<Vec<_>, _>>()?;

            if levels.iter().all(Option::is_none) {
                Ok(None)
            } else {
                Ok(Some(EncodedValue::Levels(levels)))
            }
        }
    }
}

/// Encode a plain number, `None` for non-finite input.
pub fn encode_number(value: f64, scale: u32) -> Result<Option<i64>, CodecError> {
    if !value.is_finite() {
        return Ok(None);
    }

    let scaled = (value * scale_factor(scale)).trunc();
    // i64::MAX is not representable; the nearest f64 rounds up to 2^63.
    if scaled < i64::MIN as f64 || scaled >= i64::MAX as f64 {
        return Err(CodecError::OutOfRange { value, scale });
    }
    Ok(Some(scaled as i64))
}

fn encode_element(value: &RawValue, scale: u32) -> Result<Option<i64>, CodecError> {
    match value {
        RawValue::Masked => Ok(None),
        RawValue::Number(x) => encode_number(*x, scale),
        RawValue::Text(text) => {
            let trimmed = text.trim();
            // netCDF renders masked elements as "--"
            if trimmed.is_empty() || trimmed == "--" {
                return Ok(None);
            }
            let parsed: f64 = trimmed.parse().map_err(|_| CodecError::NonNumeric {
                value: text.clone(),
            })?;
            encode_number(parsed, scale)
        }
    }
}

/// Decode a single encoded integer.
pub fn decode_number(encoded: i64, scale: u32) -> f64 {
    encoded as f64 / scale_factor(scale)
}

/// Decode a stored value; `None` stays `None`.
pub fn decode(value: Option<&EncodedValue>, scale: u32) -> Option<DecodedValue> {
    value.map(|v| match v {
        EncodedValue::Scalar(e) => DecodedValue::Scalar(decode_number(*e, scale)),
        EncodedValue::Levels(levels) => DecodedValue::Levels(
            levels
                .iter()
                .map(|e| e.map(|e| decode_number(e, scale)))
                .collect(),
        ),
    })
}
