//! The canonical rencode value tree.
//!
//! Every wire value decodes into a [`Value`]; every [`Value`] encodes back
//! to the same bytes it came from. `Text` and `Bytes` share one wire shape:
//! the decoder yields `Text` when the payload is valid UTF-8 and `Bytes`
//! otherwise, and the encoder treats them identically.

use std::collections::BTreeMap;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use num_traits::Zero;

use crate::types::Error;
use crate::types::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Float32(f32),
    Float64(f64),
    Bytes(Vec<u8>),
    Text(String),
    List(Vec<Value>),
    /// Keys iterate in byte-lexicographic order, which is exactly the order
    /// the encoder must emit them in.
    Dict(BTreeMap<String, Value>),
}

impl Value {
    /// Wire-kind name used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::BigInt(_) => "big integer",
            Value::Float32(_) | Value::Float64(_) => "float",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch(other, "bool")),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::BigInt(b) => b.to_i64().ok_or(Error::TypeMismatch {
                value: "big integer",
                target: "i64",
            }),
            other => Err(mismatch(other, "i64")),
        }
    }

    pub fn as_u64(&self) -> Result<u64> {
        match self {
            Value::Int(n) => u64::try_from(*n).map_err(|_| Error::TypeMismatch {
                value: "integer",
                target: "u64",
            }),
            Value::BigInt(b) => b.to_u64().ok_or(Error::TypeMismatch {
                value: "big integer",
                target: "u64",
            }),
            other => Err(mismatch(other, "u64")),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Float64(v) => Ok(*v),
            Value::Float32(v) => Ok(f64::from(*v)),
            other => Err(mismatch(other, "f64")),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(mismatch(other, "str")),
        }
    }

    /// Raw payload of either wire string shape.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.as_bytes()),
            other => Err(mismatch(other, "bytes")),
        }
    }

    pub fn as_list(&self) -> Result<&[Value]> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(mismatch(other, "list")),
        }
    }

    pub fn as_dict(&self) -> Result<&BTreeMap<String, Value>> {
        match self {
            Value::Dict(map) => Ok(map),
            other => Err(mismatch(other, "dict")),
        }
    }
}

fn mismatch(value: &Value, target: &'static str) -> Error {
    Error::TypeMismatch {
        value: value.kind(),
        target,
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($ty:ty) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::Int(i64::from(v))
            }
        }
    };
}

impl_from_int!(i8);
impl_from_int!(i16);
impl_from_int!(i32);
impl_from_int!(i64);
impl_from_int!(u8);
impl_from_int!(u16);
impl_from_int!(u32);

impl From<u64> for Value {
    /// Values past the signed 64-bit range promote to a big integer, the
    /// same way the encoder's unsigned ladder does.
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::BigInt(BigInt::from(v)),
        }
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::BigInt(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Dict(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    /// An absent value encodes as Null.
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::None,
        }
    }
}

/// Typed extraction from a decoded [`Value`].
///
/// This is the typed-slot side of the codec: integer targets range-check
/// (an overflow is a type mismatch, not a truncation), `bool` accepts any
/// integer with zero meaning false, either float width fills either float
/// target, and `Option<T>` is how a caller observes Null.
pub trait FromValue: Sized {
    fn from_value(v: Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(v: Value) -> Result<Self> {
        Ok(v)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::None => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for bool {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::Bool(b) => Ok(b),
            Value::Int(n) => Ok(n != 0),
            Value::BigInt(b) => Ok(!b.is_zero()),
            other => Err(mismatch(&other, "bool")),
        }
    }
}

macro_rules! impl_from_value_int {
    ($ty:ty, $to_prim:ident, $target:expr) => {
        impl FromValue for $ty {
            fn from_value(v: Value) -> Result<Self> {
                match v {
                    Value::Int(n) => <$ty>::try_from(n).map_err(|_| Error::TypeMismatch {
                        value: "integer",
                        target: $target,
                    }),
                    Value::BigInt(b) => b.$to_prim().ok_or(Error::TypeMismatch {
                        value: "big integer",
                        target: $target,
                    }),
                    other => Err(mismatch(&other, $target)),
                }
            }
        }
    };
}

impl_from_value_int!(i8, to_i8, "i8");
impl_from_value_int!(i16, to_i16, "i16");
impl_from_value_int!(i32, to_i32, "i32");
impl_from_value_int!(i64, to_i64, "i64");
impl_from_value_int!(u8, to_u8, "u8");
impl_from_value_int!(u16, to_u16, "u16");
impl_from_value_int!(u32, to_u32, "u32");
impl_from_value_int!(u64, to_u64, "u64");

impl FromValue for BigInt {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::BigInt(b) => Ok(b),
            Value::Int(n) => Ok(BigInt::from(n)),
            other => Err(mismatch(&other, "big integer")),
        }
    }
}

impl FromValue for f32 {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::Float32(f) => Ok(f),
            Value::Float64(f) => Ok(f as f32),
            other => Err(mismatch(&other, "f32")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::Float64(f) => Ok(f),
            Value::Float32(f) => Ok(f64::from(f)),
            other => Err(mismatch(&other, "f64")),
        }
    }
}

impl FromValue for String {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::Text(s) => Ok(s),
            // Both wire string shapes are acceptable, but a String target
            // cannot carry invalid UTF-8.
            Value::Bytes(b) => String::from_utf8(b).map_err(|_| Error::TypeMismatch {
                value: "bytes",
                target: "String",
            }),
            other => Err(mismatch(&other, "String")),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch(&other, "list")),
        }
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(v: Value) -> Result<Self> {
        match v {
            Value::Dict(map) => map
                .into_iter()
                .map(|(key, value)| Ok((key, T::from_value(value)?)))
                .collect(),
            other => Err(mismatch(&other, "dict")),
        }
    }
}
