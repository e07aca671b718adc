//! Driver-independent cell values.
//!
//! The Odyssey console answers every `show` command with a loosely typed
//! result set: the same logical number may come back as an `int8`, a
//! `float8`, or plain text depending on the Odyssey version and the column.
//! `CellValue` captures whatever the driver handed us and the `to_*` helpers
//! coerce it to what a step needs, so call sites never switch on types.

use anyhow::{Result, anyhow};
use sqlx::postgres::PgValueRef;
use sqlx::{Decode, Postgres, TypeInfo, ValueRef};
use std::fmt;

/// One cell of an administrative result set.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// Wire types we decode natively; everything else is read as text.
enum PgKind {
    Int2,
    Int4,
    Int8,
    Oid,
    Float4,
    Float8,
    Bool,
    Other,
}

impl PgKind {
    fn of(value: &PgValueRef<'_>) -> Self {
        match value.type_info().name() {
            "INT2" => Self::Int2,
            "INT4" => Self::Int4,
            "INT8" => Self::Int8,
            "OID" => Self::Oid,
            "FLOAT4" => Self::Float4,
            "FLOAT8" => Self::Float8,
            "BOOL" => Self::Bool,
            _ => Self::Other,
        }
    }
}

impl CellValue {
    /// Decode a raw Postgres value as returned by the console.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not match its declared type.
    pub fn from_pg(column: &str, value: PgValueRef<'_>) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::Null);
        }

        let decode_err = |e| anyhow!("can't decode column {column:?}: {e}");

        let cell = match PgKind::of(&value) {
            PgKind::Int2 => Self::Int(i64::from(
                <i16 as Decode<Postgres>>::decode(value).map_err(decode_err)?,
            )),
            PgKind::Int4 => Self::Int(i64::from(
                <i32 as Decode<Postgres>>::decode(value).map_err(decode_err)?,
            )),
            PgKind::Int8 => Self::Int(<i64 as Decode<Postgres>>::decode(value).map_err(decode_err)?),
            PgKind::Oid => Self::Int(i64::from(
                <sqlx::postgres::types::Oid as Decode<Postgres>>::decode(value)
                    .map_err(decode_err)?
                    .0,
            )),
            PgKind::Float4 => Self::Float(f64::from(
                <f32 as Decode<Postgres>>::decode(value).map_err(decode_err)?,
            )),
            PgKind::Float8 => {
                Self::Float(<f64 as Decode<Postgres>>::decode(value).map_err(decode_err)?)
            }
            PgKind::Bool => Self::Int(i64::from(
                <bool as Decode<Postgres>>::decode(value).map_err(decode_err)?,
            )),
            PgKind::Other => {
                let bytes = value.as_bytes().map_err(decode_err)?;
                match std::str::from_utf8(bytes) {
                    Ok(text) => Self::Text(text.to_string()),
                    Err(_) => Self::Bytes(bytes.to_vec()),
                }
            }
        };

        Ok(cell)
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Coerce to a float. `Ok(None)` means the cell is absent, which is not
    /// the same as zero.
    ///
    /// # Errors
    ///
    /// Returns an error naming the column if the cell is text that does not
    /// parse as a number, or bytes that are not UTF-8.
    pub fn to_f64(&self, column: &str) -> Result<Option<f64>> {
        match self {
            Self::Null => Ok(None),
            Self::Int(v) => Ok(Some(i64_to_f64(*v))),
            Self::Float(v) => Ok(Some(*v)),
            Self::Text(text) => parse_number(column, text).map(Some),
            Self::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => parse_number(column, text).map(Some),
                Err(_) => Err(anyhow!("got unexpected column {column:?} type {}", self.kind())),
            },
        }
    }

    /// Same as [`CellValue::to_f64`] with absent cells read as zero.
    ///
    /// # Errors
    ///
    /// See [`CellValue::to_f64`].
    pub fn to_f64_or_zero(&self, column: &str) -> Result<f64> {
        Ok(self.to_f64(column)?.unwrap_or(0.0))
    }

    /// Coerce to a string. Null is an error: callers use this for columns
    /// that identify something and must be present.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell is null or holds non UTF-8 bytes.
    pub fn to_text(&self, column: &str) -> Result<String> {
        match self {
            Self::Null => Err(anyhow!("column {column:?} is NULL, expected string")),
            Self::Text(text) => Ok(text.clone()),
            Self::Bytes(bytes) => String::from_utf8(bytes.clone())
                .map_err(|_| anyhow!("expected column {column:?} to be string, got bytes")),
            Self::Int(_) | Self::Float(_) => Ok(self.to_string()),
        }
    }

    /// Like [`CellValue::to_text`] but null maps to `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell holds non UTF-8 bytes.
    pub fn to_opt_text(&self, column: &str) -> Result<Option<String>> {
        if self.is_null() {
            return Ok(None);
        }
        self.to_text(column).map(Some)
    }

    /// Coerce to a boolean (integers or Postgres textual booleans).
    ///
    /// # Errors
    ///
    /// Returns an error if the cell is null or not a recognizable boolean.
    pub fn to_bool(&self, column: &str) -> Result<bool> {
        match self {
            Self::Null => Err(anyhow!("column {column:?} is NULL, expected boolean")),
            Self::Int(v) => Ok(*v != 0),
            Self::Float(_) => Err(anyhow!("expected column {column:?} to be boolean, got float")),
            Self::Text(_) | Self::Bytes(_) => {
                let text = self.to_text(column)?;
                match text.trim().to_ascii_lowercase().as_str() {
                    "t" | "true" | "on" | "1" | "yes" => Ok(true),
                    "f" | "false" | "off" | "0" | "no" => Ok(false),
                    _ => Err(anyhow!("can't parse column {column:?} value {text:?} as boolean")),
                }
            }
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(text) => f.write_str(text),
            Self::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

#[allow(clippy::cast_precision_loss)]
const fn i64_to_f64(value: i64) -> f64 {
    value as f64
}

fn parse_number(column: &str, text: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|e| anyhow!("can't parse column {column:?} value {text:?}: {e}"))
}
