//! Field values stored inside a record category.

use std::fmt;

use chrono::{DateTime, SecondsFormat, TimeZone};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered mapping of field name to value.
///
/// Used both for record categories and for nested field values.
pub type FieldMap = IndexMap<String, FieldValue>;

/// A single diagnostic fact.
///
/// Values are not required to be homogeneous: one category can hold text next
/// to integers, lists and nested maps. Serialized untagged, so the transport
/// form reads like plain JSON.
///
/// Equality is numeric-tolerant: `Int(27)`, `UInt(27)` and `Float(27.0)` all
/// compare equal, which keeps round trips through the transport form stable
/// even when the concrete numeric width changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer too large for `i64`.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// Ordered sequence of values.
    List(Vec<FieldValue>),
    /// Nested field mapping.
    Map(FieldMap),
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl FieldValue {
    /// Check if this is the absent value.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Check if this is an integer of either signedness.
    pub fn is_integer(&self) -> bool {
        matches!(self, FieldValue::Int(_) | FieldValue::UInt(_))
    }

    /// Get the text, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the boolean, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as `i64` when it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Get the value as `f64` when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::UInt(u) => Some(*u as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the nested mapping, if this is a map value.
    pub fn as_map(&self) -> Option<&FieldMap> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get the nested mapping mutably, if this is a map value.
    pub fn as_map_mut(&mut self) -> Option<&mut FieldMap> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get the sequence, if this is a list value.
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(l) => Some(l),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<Number> {
        match self {
            FieldValue::Int(i) => Some(Number::Signed(*i)),
            FieldValue::UInt(u) => Some(Number::Unsigned(*u)),
            FieldValue::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }
}

fn numbers_equal(a: Number, b: Number) -> bool {
    match (a, b) {
        (Number::Signed(x), Number::Signed(y)) => x == y,
        (Number::Unsigned(x), Number::Unsigned(y)) => x == y,
        (Number::Float(x), Number::Float(y)) => x == y,
        (Number::Signed(x), Number::Unsigned(y)) | (Number::Unsigned(y), Number::Signed(x)) => {
            x >= 0 && x as u64 == y
        }
        (Number::Signed(x), Number::Float(y)) | (Number::Float(y), Number::Signed(x)) => {
            x as f64 == y
        }
        (Number::Unsigned(x), Number::Float(y)) | (Number::Float(y), Number::Unsigned(x)) => {
            x as f64 == y
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (FieldValue::List(a), FieldValue::List(b)) => a == b,
            (FieldValue::Map(a), FieldValue::Map(b)) => a == b,
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => numbers_equal(x, y),
                _ => false,
            },
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::UInt(u) => write!(f, "{}", u),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            FieldValue::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                FieldValue::Int(v as i64)
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                match i64::try_from(v) {
                    Ok(i) => FieldValue::Int(i),
                    Err(_) => FieldValue::UInt(v as u64),
                }
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(v as f64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&String> for FieldValue {
    fn from(v: &String) -> Self {
        FieldValue::Text(v.clone())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(v: Vec<T>) -> Self {
        FieldValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl From<FieldMap> for FieldValue {
    fn from(v: FieldMap) -> Self {
        FieldValue::Map(v)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for FieldValue
where
    Tz::Offset: fmt::Display,
{
    fn from(v: DateTime<Tz>) -> Self {
        FieldValue::Text(v.to_rfc3339_opts(SecondsFormat::AutoSi, false))
    }
}

impl FromIterator<(String, FieldValue)> for FieldValue {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        FieldValue::Map(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_tolerant_equality() {
        assert_eq!(FieldValue::Int(27), FieldValue::UInt(27));
        assert_eq!(FieldValue::Int(27), FieldValue::Float(27.0));
        assert_eq!(FieldValue::from(13.1f64), FieldValue::Float(13.1));
        assert_ne!(FieldValue::Int(-1), FieldValue::UInt(u64::MAX));
        assert_ne!(FieldValue::Int(1), FieldValue::Text("1".to_string()));
    }

    #[test]
    fn test_unsigned_conversion_prefers_signed() {
        assert!(matches!(FieldValue::from(5u64), FieldValue::Int(5)));
        assert!(matches!(FieldValue::from(u64::MAX), FieldValue::UInt(u64::MAX)));
    }

    #[test]
    fn test_untagged_json_shapes() {
        let value: FieldValue =
            serde_json::from_str(r#"{"a":null,"b":[1,2.5,"x"],"c":true}"#).unwrap();
        let map = value.as_map().unwrap();
        assert!(map["a"].is_null());
        assert_eq!(map["b"].as_list().unwrap().len(), 3);
        assert_eq!(map["c"].as_bool(), Some(true));
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_display_list_and_map() {
        let list = FieldValue::from(vec!["abc", "def"]);
        assert_eq!(list.to_string(), "[abc, def]");
        assert_eq!(FieldValue::Null.to_string(), "");
    }
}
