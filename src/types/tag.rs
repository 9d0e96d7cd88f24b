//! Tag values and their conversions.

use serde::Serialize;

use super::{MAX_TAG_NAME_LEN, MAX_TAG_SET_LEN, MAX_TAG_STRING_LEN};
use crate::types::error::{TraceError, TraceResult};

/// Check a tag name against the format limit.
pub fn validate_tag_name(tag: &str) -> TraceResult<()> {
    if tag.len() > MAX_TAG_NAME_LEN {
        return Err(TraceError::TagNameTooLong {
            len: tag.len(),
            max: MAX_TAG_NAME_LEN,
        });
    }
    Ok(())
}

/// Check a tag description against the string limit.
pub fn validate_description(description: &str) -> TraceResult<()> {
    if description.len() > MAX_TAG_STRING_LEN {
        return Err(TraceError::TagStringTooLong {
            len: description.len(),
            max: MAX_TAG_STRING_LEN,
        });
    }
    Ok(())
}

/// The value half of a (name, value) tag.
///
/// Integers are stored as 64-bit patterns; signed inputs keep their
/// two's-complement representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    /// A single 64-bit integer.
    Int(u64),
    /// A short array of 64-bit integers.
    Set(Vec<u64>),
    /// A string value.
    Str(String),
}

impl TagValue {
    /// Validate the value against the format limits.
    pub fn validate(&self) -> TraceResult<()> {
        match self {
            TagValue::Int(_) => Ok(()),
            TagValue::Set(values) if values.len() > MAX_TAG_SET_LEN => {
                Err(TraceError::TagSetTooLong {
                    len: values.len(),
                    max: MAX_TAG_SET_LEN,
                })
            }
            TagValue::Set(_) => Ok(()),
            TagValue::Str(s) if s.len() > MAX_TAG_STRING_LEN => Err(TraceError::TagStringTooLong {
                len: s.len(),
                max: MAX_TAG_STRING_LEN,
            }),
            TagValue::Str(_) => Ok(()),
        }
    }
}

impl std::fmt::Display for TagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagValue::Int(v) => write!(f, "{:#x}", v),
            TagValue::Set(values) => {
                write!(f, "{{")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{:#x}", v)?;
                }
                write!(f, "}}")
            }
            TagValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

macro_rules! tag_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for TagValue {
            fn from(value: $t) -> Self {
                TagValue::Int(value as u64)
            }
        })*
    };
}

macro_rules! tag_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for TagValue {
            fn from(value: $t) -> Self {
                TagValue::Int(value as i64 as u64)
            }
        })*
    };
}

tag_from_unsigned!(u8, u16, u32, u64, usize);
tag_from_signed!(i8, i16, i32, i64, isize);

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Int(value as u64)
    }
}

impl From<char> for TagValue {
    fn from(value: char) -> Self {
        TagValue::Int(value as u64)
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Str(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Str(value)
    }
}

impl From<&[u64]> for TagValue {
    fn from(values: &[u64]) -> Self {
        TagValue::Set(values.to_vec())
    }
}

impl From<Vec<u64>> for TagValue {
    fn from(values: Vec<u64>) -> Self {
        TagValue::Set(values)
    }
}
