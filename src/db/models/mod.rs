use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod coach;
pub mod footprint;
pub mod project;
pub mod user;

#[inline]
const fn default_offset() -> i64 {
    0
}

#[inline]
const fn default_limit() -> i64 {
    50
}

/// Query-string paging for the catalog listings. Absent params fall back
/// to the first fifty rows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_offset")]
    pub offset: i64,
}

impl Pagination {
    pub const MAX_LIMIT: i64 = 500;

    /// Negative or oversized paging params are clamped rather than handed
    /// to the store as-is.
    pub fn limit(&self) -> i64 {
        self.limit.clamp(0, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

/// Rejection of a client-supplied request body. Always maps to a 400.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{0}' must be a non-negative number")]
    InvalidNumber(&'static str),

    #[error("Field '{0}' must be a non-empty string")]
    InvalidString(&'static str),

    #[error("Field '{field}' must be one of: {allowed}")]
    InvalidChoice {
        field: &'static str,
        allowed: &'static str,
    },
}

pub(crate) fn require_str(body: &Value, field: &'static str) -> Result<String, InputError> {
    let val = match body.get(field) {
        None | Some(Value::Null) => return Err(InputError::MissingField(field)),
        Some(val) => val,
    };

    match val.as_str() {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_owned()),
        _ => Err(InputError::InvalidString(field)),
    }
}

/// Form clients serialize numbers as strings, so `"12"` and `12` are both
/// accepted. Negative and non-finite values are not.
pub(crate) fn require_number(body: &Value, field: &'static str) -> Result<f64, InputError> {
    let val = match body.get(field) {
        None | Some(Value::Null) => return Err(InputError::MissingField(field)),
        Some(val) => val,
    };

    let parsed = match val {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(InputError::InvalidNumber(field)),
    }
}
