// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Canonicalization and identity keys.
//!
//! Before a value can be stored in (or looked up in) an [`SSet`](crate::SSet), it is reduced to
//! its *canonical form*: a [`serde_json::Value`] made only of `null`, booleans, numbers, strings,
//! sequences and string-keyed mappings. Any `T: Serialize` can be canonicalized, as long as it does
//! not contain something that would have to be silently altered to fit that form:
//!
//! - non-finite floats (`NaN`, `±inf`) are rejected,
//! - map keys must be strings, characters, integers or booleans,
//! - values of arbitrary precision beyond 64-bit integers are rejected.
//!
//! Numbers are normalized so that equal quantities share a representation: a float without a
//! fractional part that fits a 64-bit integer becomes that integer, and `-0.0` becomes `0`. Thus
//! `1`, `1u8` and `1.0` all canonicalize to the same value.
//!
//! The [`HashKey`] of a value is a SHA-256 digest over an unambiguous binary encoding of its
//! canonical form, with mapping entries visited in key order. It depends on nothing but the
//! canonical content, so it is identical in every process.
use serde::ser::{self, Impossible, Serialize};
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};

/// Name of the newtype an [`SSet`](crate::SSet) wraps its serialized document in.
///
/// `serde_json` treats newtype structs transparently, so this is invisible on the wire, but lets
/// the canonicalizer tell a whole set apart from a plain value.
pub(crate) const SET_TOKEN: &str = "$sset::private::SSet";

/// A value could not be reduced to the serialization-safe form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalizationError {
    message: String,
    set_as_value: bool,
}

impl CanonicalizationError {
    fn set_as_value() -> Self {
        Self {
            message: "a set was passed where a plain value is expected".into(),
            set_as_value: true,
        }
    }

    /// Whether the failure was caused by passing a whole set as a plain value.
    pub(crate) fn is_set_as_value(&self) -> bool {
        self.set_as_value
    }
}

impl fmt::Display for CanonicalizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot canonicalize value: {}", self.message)
    }
}

impl std::error::Error for CanonicalizationError {}

impl ser::Error for CanonicalizationError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self {
            message: msg.to_string(),
            set_as_value: false,
        }
    }
}

fn unsupported(what: impl fmt::Display) -> CanonicalizationError {
    ser::Error::custom(what)
}

/// The identity key of a canonical value.
///
/// Keys are totally ordered by their bytes; that order is the iteration order of a set.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashKey([u8; 32]);

impl HashKey {
    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Constructs a key from raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", &hex::encode(self.0)[..12])
    }
}

impl FromStr for HashKey {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for HashKey {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for HashKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reduces `value` to its canonical form.
pub fn canonicalize<T>(value: &T) -> Result<Value, CanonicalizationError>
where
    T: Serialize + ?Sized,
{
    value.serialize(Canonicalizer::top_level(false))
}

/// Reduces a JSON value to its canonical form.
///
/// Unlike [`canonicalize`] this cannot fail, as [`Value`] can only hold finite numbers and
/// string keys to begin with.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64().map(float) {
            Some(Ok(v)) => v,
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect())
        }
        other => other,
    }
}

/// Canonicalizes `value` and derives its identity key.
pub fn hash_of<T>(value: &T) -> Result<HashKey, CanonicalizationError>
where
    T: Serialize + ?Sized,
{
    canonicalize(value).map(|v| digest(&v))
}

/// Canonicalizes `value` and pairs it with its identity key.
///
/// With `reject_set`, a whole [`SSet`](crate::SSet) passed as `value` is refused rather than
/// being canonicalized as its serialized document.
pub(crate) fn keyed<T>(
    value: &T,
    reject_set: bool,
) -> Result<(HashKey, Value), CanonicalizationError>
where
    T: Serialize + ?Sized,
{
    let value = value.serialize(Canonicalizer::top_level(reject_set))?;
    Ok((digest(&value), value))
}

/// Computes the identity key of an already canonical value.
pub(crate) fn digest(value: &Value) -> HashKey {
    let mut hasher = Sha256::new();
    encode(value, &mut hasher);
    HashKey(hasher.finalize().into())
}

fn encode_bytes(tag: u8, bytes: &[u8], hasher: &mut Sha256) {
    hasher.update([tag]);
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn encode(value: &Value, hasher: &mut Sha256) {
    match value {
        Value::Null => hasher.update(b"n"),
        Value::Bool(true) => hasher.update(b"t"),
        Value::Bool(false) => hasher.update(b"f"),
        Value::Number(n) => encode_bytes(b'#', n.to_string().as_bytes(), hasher),
        Value::String(s) => encode_bytes(b's', s.as_bytes(), hasher),
        Value::Array(items) => {
            hasher.update(b"[");
            hasher.update((items.len() as u64).to_le_bytes());
            for item in items {
                encode(item, hasher);
            }
        }
        Value::Object(map) => {
            // NOTE: `Map` may preserve insertion order depending on serde_json features, so
            // entries are sorted here rather than relying on the map's own order.
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
            hasher.update(b"{");
            hasher.update((entries.len() as u64).to_le_bytes());
            for (k, v) in entries {
                encode_bytes(b's', k.as_bytes(), hasher);
                encode(v, hasher);
            }
        }
    }
}

fn float(v: f64) -> Result<Value, CanonicalizationError> {
    if !v.is_finite() {
        return Err(unsupported(format_args!("non-finite number {v}")));
    }
    // 2^63 and 2^64 are exactly representable, so these comparisons are exact.
    if v.fract() == 0.0 {
        if v >= -9_223_372_036_854_775_808.0 && v < 9_223_372_036_854_775_808.0 {
            return Ok(Value::Number(Number::from(v as i64)));
        }
        if v >= 0.0 && v < 18_446_744_073_709_551_616.0 {
            return Ok(Value::Number(Number::from(v as u64)));
        }
    }
    Number::from_f64(v)
        .map(Value::Number)
        .ok_or_else(|| unsupported(format_args!("number {v} has no JSON representation")))
}

/// A [`ser::Serializer`] producing canonical [`Value`]s.
#[derive(Clone, Copy)]
struct Canonicalizer {
    top_level: bool,
    reject_set: bool,
}

impl Canonicalizer {
    fn top_level(reject_set: bool) -> Self {
        Self {
            top_level: true,
            reject_set,
        }
    }

    fn nested() -> Self {
        Self {
            top_level: false,
            reject_set: false,
        }
    }
}

impl ser::Serializer for Canonicalizer {
    type Ok = Value;
    type Error = CanonicalizationError;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Value, Self::Error> {
        Ok(Value::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, Self::Error> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, Self::Error> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, Self::Error> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, Self::Error> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_i128(self, v: i128) -> Result<Value, Self::Error> {
        if let Ok(v) = i64::try_from(v) {
            Ok(Value::Number(v.into()))
        } else if let Ok(v) = u64::try_from(v) {
            Ok(Value::Number(v.into()))
        } else {
            Err(unsupported(format_args!("integer {v} exceeds 64 bits")))
        }
    }

    fn serialize_u8(self, v: u8) -> Result<Value, Self::Error> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, Self::Error> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, Self::Error> {
        self.serialize_u64(u64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, Self::Error> {
        Ok(Value::Number(v.into()))
    }

    fn serialize_u128(self, v: u128) -> Result<Value, Self::Error> {
        u64::try_from(v)
            .map(|v| Value::Number(v.into()))
            .map_err(|_| unsupported(format_args!("integer {v} exceeds 64 bits")))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, Self::Error> {
        float(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, Self::Error> {
        float(v)
    }

    fn serialize_char(self, v: char) -> Result<Value, Self::Error> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, Self::Error> {
        Ok(Value::String(v.to_owned()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Value, Self::Error> {
        Ok(Value::Array(
            v.iter().map(|&b| Value::Number(b.into())).collect(),
        ))
    }

    fn serialize_none(self) -> Result<Value, Self::Error> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Self::Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, Self::Error> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, Self::Error> {
        Ok(Value::String(variant.to_owned()))
    }

    fn serialize_newtype_struct<T>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Value, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        if name == SET_TOKEN && self.top_level && self.reject_set {
            return Err(CanonicalizationError::set_as_value());
        }
        value.serialize(Canonicalizer::nested())
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let mut map = Map::new();
        map.insert(variant.to_owned(), value.serialize(Canonicalizer::nested())?);
        Ok(Value::Object(map))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Ok(SerializeVec {
            vec: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Ok(SerializeTupleVariant {
            variant,
            vec: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(SerializeMap {
            map: Map::new(),
            next_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Ok(SerializeStructVariant {
            variant,
            map: Map::new(),
        })
    }

    fn collect_str<T>(self, value: &T) -> Result<Value, Self::Error>
    where
        T: ?Sized + fmt::Display,
    {
        Ok(Value::String(value.to_string()))
    }
}

struct SerializeVec {
    vec: Vec<Value>,
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = CanonicalizationError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.vec.push(value.serialize(Canonicalizer::nested())?);
        Ok(())
    }

    fn end(self) -> Result<Value, Self::Error> {
        Ok(Value::Array(self.vec))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = CanonicalizationError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = CanonicalizationError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

struct SerializeTupleVariant {
    variant: &'static str,
    vec: Vec<Value>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = CanonicalizationError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.vec.push(value.serialize(Canonicalizer::nested())?);
        Ok(())
    }

    fn end(self) -> Result<Value, Self::Error> {
        let mut map = Map::new();
        map.insert(self.variant.to_owned(), Value::Array(self.vec));
        Ok(Value::Object(map))
    }
}

struct SerializeMap {
    map: Map<String, Value>,
    next_key: Option<String>,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = CanonicalizationError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.next_key = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| unsupported("map value serialized before its key"))?;
        self.map.insert(key, value.serialize(Canonicalizer::nested())?);
        Ok(())
    }

    fn end(self) -> Result<Value, Self::Error> {
        Ok(Value::Object(self.map))
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = Value;
    type Error = CanonicalizationError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.map
            .insert(key.to_owned(), value.serialize(Canonicalizer::nested())?);
        Ok(())
    }

    fn end(self) -> Result<Value, Self::Error> {
        Ok(Value::Object(self.map))
    }
}

struct SerializeStructVariant {
    variant: &'static str,
    map: Map<String, Value>,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = CanonicalizationError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: ?Sized + Serialize,
    {
        self.map
            .insert(key.to_owned(), value.serialize(Canonicalizer::nested())?);
        Ok(())
    }

    fn end(self) -> Result<Value, Self::Error> {
        let mut outer = Map::new();
        outer.insert(self.variant.to_owned(), Value::Object(self.map));
        Ok(Value::Object(outer))
    }
}

/// Serializes map keys, which must end up as strings.
struct MapKeySerializer;

fn key_must_be_a_string(found: &str) -> CanonicalizationError {
    unsupported(format_args!("map key must be a string, found {found}"))
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = CanonicalizationError;

    type SerializeSeq = Impossible<String, CanonicalizationError>;
    type SerializeTuple = Impossible<String, CanonicalizationError>;
    type SerializeTupleStruct = Impossible<String, CanonicalizationError>;
    type SerializeTupleVariant = Impossible<String, CanonicalizationError>;
    type SerializeMap = Impossible<String, CanonicalizationError>;
    type SerializeStruct = Impossible<String, CanonicalizationError>;
    type SerializeStructVariant = Impossible<String, CanonicalizationError>;

    fn serialize_bool(self, v: bool) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_i8(self, v: i8) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_i16(self, v: i16) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_i32(self, v: i32) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_i64(self, v: i64) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_i128(self, v: i128) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_u8(self, v: u8) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_u16(self, v: u16) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_u32(self, v: u32) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_u64(self, v: u64) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_u128(self, v: u128) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_f32(self, _v: f32) -> Result<String, Self::Error> {
        Err(key_must_be_a_string("a float"))
    }

    fn serialize_f64(self, _v: f64) -> Result<String, Self::Error> {
        Err(key_must_be_a_string("a float"))
    }

    fn serialize_char(self, v: char) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<String, Self::Error> {
        Ok(v.to_owned())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<String, Self::Error> {
        Err(key_must_be_a_string("bytes"))
    }

    fn serialize_none(self) -> Result<String, Self::Error> {
        Err(key_must_be_a_string("none"))
    }

    fn serialize_some<T>(self, _value: &T) -> Result<String, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        Err(key_must_be_a_string("an option"))
    }

    fn serialize_unit(self) -> Result<String, Self::Error> {
        Err(key_must_be_a_string("unit"))
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<String, Self::Error> {
        Err(key_must_be_a_string(name))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String, Self::Error> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _value: &T,
    ) -> Result<String, Self::Error>
    where
        T: ?Sized + Serialize,
    {
        Err(key_must_be_a_string(variant))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Err(key_must_be_a_string("a sequence"))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Err(key_must_be_a_string("a tuple"))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Err(key_must_be_a_string(name))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(key_must_be_a_string(variant))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Err(key_must_be_a_string("a map"))
    }

    fn serialize_struct(
        self,
        name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Err(key_must_be_a_string(name))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(key_must_be_a_string(variant))
    }

    fn collect_str<T>(self, value: &T) -> Result<String, Self::Error>
    where
        T: ?Sized + fmt::Display,
    {
        Ok(value.to_string())
    }
}
