//! JSON interoperability.
//!
//! A standard JSON document maps onto the same [`Value`] tree the TML
//! parser produces: strings become quoted texts, numbers split into int and
//! float by their literal form, `null` becomes `Null`, arrays and objects
//! keep their order. Comment and empty records cannot be expressed in JSON
//! and are skipped when writing.
//!
//! ## Usage
//!
//! ```rust
//! use tml_cfg::json;
//!
//! let value = json::from_json_str(r#"{"a": 1, "b": [true, "x"]}"#).unwrap();
//! assert_eq!(value.object_get_int("a"), Some(1));
//!
//! let back = json::to_json_string(&value).unwrap();
//! assert_eq!(back, r#"{"a":1,"b":[true,"x"]}"#);
//! ```

use crate::{writer, Error, Pair, Result, Value, ValueKind};
use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self.kind {
            ValueKind::None | ValueKind::Null => serializer.serialize_unit(),
            ValueKind::Bool(b) => serializer.serialize_bool(*b),
            ValueKind::Float(f) => serializer.serialize_f32(*f),
            ValueKind::Int { value, .. } => serializer.serialize_i32(*value),
            ValueKind::Text { text, .. } => serializer.serialize_str(text),
            ValueKind::Comment(text) => serializer.serialize_str(text),
            ValueKind::Array(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
            ValueKind::Object(pairs) => {
                let mut map = serializer.serialize_map(None)?;
                for pair in pairs {
                    if pair.is_empty_or_comment() {
                        continue;
                    }
                    // text names become keys verbatim, other names via
                    // their token form
                    let key = match pair.name.as_str() {
                        Some(text) => text.to_string(),
                        None => writer::plain_value_to_string(&pair.name)
                            .map_err(serde::ser::Error::custom)?,
                    };
                    map.serialize_entry(&key, &pair.value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any JSON value")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Value, E> {
                Ok(Value::bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Value, E> {
                Ok(Value::int(value as i32))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Value, E> {
                Ok(Value::int(value as i32))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Value, E> {
                Ok(Value::float(value as f32))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Value, E> {
                // JSON strings are always written with quotes
                Ok(Value::quoted_text(value))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Value, E> {
                Ok(Value::quoted_text(value))
            }

            fn visit_unit<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::null())
            }

            fn visit_none<E>(self) -> std::result::Result<Value, E> {
                Ok(Value::null())
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut values = Vec::new();
                while let Some(element) = seq.next_element()? {
                    values.push(element);
                }
                Ok(Value::array(values))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut pairs = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    pairs.push(Pair::new(Value::quoted_text(key), value));
                }
                Ok(Value::object(pairs))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Parses a JSON document into the TML data model.
///
/// # Errors
///
/// Returns an error for invalid JSON.
pub fn from_json_str(source: &str) -> Result<Value> {
    serde_json::from_str(source).map_err(|e| Error::custom(format!("json: {}", e)))
}

/// Writes a value as compact JSON.
///
/// # Errors
///
/// Returns an error for trees whose object names cannot be rendered as keys.
pub fn to_json_string(value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::custom(format!("json: {}", e)))
}

/// Writes a value as pretty-printed JSON.
///
/// # Errors
///
/// Same as [`to_json_string`].
pub fn to_json_string_pretty(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::custom(format!("json: {}", e)))
}
