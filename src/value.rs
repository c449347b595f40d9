//! Generic result values.
//!
//! Every store operation that cannot name a precise return type hands back
//! a [`Value`]. Replies from a key-value store are loosely typed (a counter
//! comes back as the bulk string `"42"`), so the conversion accessors are
//! lenient between scalar forms and strict everywhere else.

use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{KvError, Result};

/// A dynamically typed store value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value (missing key, timed-out pop, ...).
    #[default]
    Nil,
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 text.
    Str(String),
    /// Raw bytes that are not valid UTF-8.
    Bytes(Vec<u8>),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Mapping from text to values.
    Map(HashMap<String, Value>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Str(a), Value::Bytes(b)) | (Value::Bytes(b), Value::Str(a)) => {
                a.as_bytes() == b.as_slice()
            }
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Short tag naming the variant, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Builds a value from raw reply bytes, preferring text when valid UTF-8.
    pub fn bulk(bytes: Vec<u8>) -> Value {
        match String::from_utf8(bytes) {
            Ok(s) => Value::Str(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        }
    }

    /// Converts any serializable value into an argument value.
    ///
    /// Scalars keep their shape; sequences, mappings and structs become
    /// their JSON text.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
        let json = serde_json::to_value(value)?;
        Ok(match json {
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Value::Str(serde_json::to_string(&json)?)
            }
            scalar => Value::from(scalar),
        })
    }

    /// True for `Nil` only; empty text is not nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Returns true for nil, empty text, empty bytes and empty collections.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Nil => true,
            Value::Str(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::Int(_) | Value::Float(_) => false,
        }
    }

    fn conversion(&self, to: &'static str) -> KvError {
        KvError::Conversion {
            from: self.type_name(),
            to,
        }
    }

    /// Interprets the value as an integer.
    ///
    /// Text and bytes are parsed; floats must carry no fractional part.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
            Value::Str(s) => s.trim().parse().map_err(|_| self.conversion("i64")),
            Value::Bytes(b) => std::str::from_utf8(b)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .ok_or_else(|| self.conversion("i64")),
            _ => Err(self.conversion("i64")),
        }
    }

    /// Interprets the value as a float.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            Value::Str(s) => parse_float(s).ok_or_else(|| self.conversion("f64")),
            Value::Bytes(b) => std::str::from_utf8(b)
                .ok()
                .and_then(parse_float)
                .ok_or_else(|| self.conversion("f64")),
            _ => Err(self.conversion("f64")),
        }
    }

    /// Interprets the value as a boolean.
    ///
    /// Integers are true when non-zero; text accepts `1/0/true/false/OK`.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Int(i) => Ok(*i != 0),
            Value::Str(s) => match s.to_ascii_lowercase().as_str() {
                "1" | "true" | "ok" => Ok(true),
                "0" | "false" | "" => Ok(false),
                _ => Err(self.conversion("bool")),
            },
            _ => Err(self.conversion("bool")),
        }
    }

    /// Renders a scalar value as text.
    pub fn as_string(&self) -> Result<String> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            Value::Bytes(b) => String::from_utf8(b.clone()).map_err(|_| self.conversion("string")),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(format_float(*f)),
            _ => Err(self.conversion("string")),
        }
    }

    /// Returns the raw bytes of a scalar value.
    pub fn as_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Str(s) => Ok(s.as_bytes().to_vec()),
            Value::Int(_) | Value::Float(_) => Ok(self.as_string()?.into_bytes()),
            _ => Err(self.conversion("bytes")),
        }
    }

    /// Unwraps a sequence. Nil converts to an empty sequence.
    pub fn into_array(self) -> Result<Vec<Value>> {
        match self {
            Value::Array(a) => Ok(a),
            Value::Nil => Ok(Vec::new()),
            other => Err(other.conversion("array")),
        }
    }

    /// Unwraps a mapping.
    ///
    /// A flat `[k1, v1, k2, v2, ...]` sequence is accepted as well, which is
    /// how `HGETALL`-style replies arrive over RESP2.
    pub fn into_map(self) -> Result<HashMap<String, Value>> {
        match self {
            Value::Map(m) => Ok(m),
            Value::Nil => Ok(HashMap::new()),
            Value::Array(items) if items.len() % 2 == 0 => {
                let mut map = HashMap::with_capacity(items.len() / 2);
                let mut iter = items.into_iter();
                while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                    map.insert(k.as_string()?, v);
                }
                Ok(map)
            }
            other => Err(other.conversion("map")),
        }
    }

    /// Converts a sequence of scalars into strings.
    pub fn into_strings(self) -> Result<Vec<String>> {
        self.into_array()?.iter().map(Value::as_string).collect()
    }

    /// Decodes the value into a typed structure.
    ///
    /// Text is parsed as JSON, which reverses [`Value::from_serialize`].
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Value::Str(s) => Ok(serde_json::from_str(s)?),
            Value::Bytes(b) => Ok(serde_json::from_slice(b)?),
            other => Ok(serde_json::from_value(serde_json::Value::from(other.clone()))?),
        }
    }

    /// Serializes the value as JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&serde_json::Value::from(self.clone()))?)
    }
}

fn parse_float(s: &str) -> Option<f64> {
    match s.trim().to_ascii_lowercase().as_str() {
        "inf" | "+inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}

/// Formats a float the way stores print them: no trailing `.0`.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{}inf", sign)
    } else if f.fract() == 0.0 && f.abs() < 1e17 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => f.write_str(&format_float(*v)),
            Value::Str(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::Array(_) | Value::Map(_) => {
                let json = serde_json::Value::from(self.clone());
                write!(f, "{}", json)
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Int(b as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(m: HashMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map_or(Value::Nil, Into::into)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Int(b as i64),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Nil => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::Number(i.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s),
            Value::Bytes(b) => serde_json::Value::String(String::from_utf8_lossy(&b).into_owned()),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(obj) => serde_json::Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Builds a `Vec<Value>` argument list from heterogeneous expressions.
///
/// ```
/// use kvclient::{args, Value};
///
/// let args = args!["key", 10, 2.5];
/// assert_eq!(args, vec![Value::from("key"), Value::Int(10), Value::Float(2.5)]);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        vec![$($crate::Value::from($arg)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct User {
        name: String,
        age: u32,
    }

    #[test]
    fn scalar_conversions_are_lenient() {
        assert_eq!(Value::from("42").as_i64().unwrap(), 42);
        assert_eq!(Value::Bytes(b"7".to_vec()).as_i64().unwrap(), 7);
        assert_eq!(Value::Float(3.0).as_i64().unwrap(), 3);
        assert_eq!(Value::from("1.5").as_f64().unwrap(), 1.5);
        assert_eq!(Value::from("-inf").as_f64().unwrap(), f64::NEG_INFINITY);
        assert_eq!(Value::Int(12).as_string().unwrap(), "12");
        assert!(Value::from("OK").as_bool().unwrap());
    }

    #[test]
    fn invalid_conversions_fail_explicitly() {
        let err = Value::from("abc").as_i64().unwrap_err();
        assert!(matches!(err, KvError::Conversion { from: "string", to: "i64" }));
        assert!(Value::Nil.as_i64().is_err());
        assert!(Value::Float(1.5).as_i64().is_err());
        assert!(Value::Array(vec![]).as_string().is_err());
        assert!(Value::Int(1).into_map().is_err());
    }

    #[test]
    fn flat_pairs_convert_to_map() {
        let reply = Value::Array(vec!["a".into(), "1".into(), "b".into(), "2".into()]);
        let map = reply.into_map().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["b"], Value::from("2"));
        assert!(Value::Array(vec!["odd".into()]).into_map().is_err());
    }

    #[test]
    fn structs_serialize_to_json_text() {
        let user = User {
            name: "ann".to_owned(),
            age: 31,
        };
        let value = Value::from_serialize(&user).unwrap();
        assert_eq!(value, Value::from(r#"{"age":31,"name":"ann"}"#));
        assert_eq!(value.decode::<User>().unwrap(), user);
        assert_eq!(Value::from_serialize(&5u8).unwrap(), Value::Int(5));
    }

    #[test]
    fn text_and_bytes_compare_by_content() {
        assert_eq!(Value::bulk(b"hi".to_vec()), Value::from("hi"));
        assert_eq!(Value::bulk(vec![0xff]), Value::Bytes(vec![0xff]));
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn floats_print_without_trailing_zero() {
        assert_eq!(Value::Float(10.0).to_string(), "10");
        assert_eq!(Value::Float(10.5).to_string(), "10.5");
        assert_eq!(args![1, "x"].len(), 2);
    }
}
