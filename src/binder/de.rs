//! A lenient `serde` deserializer over configuration values.
//!
//! Settings documents and environment variables disagree about scalar types:
//! `"8080"` from the environment has to fill a `u16`, and `8080` from a file
//! has to fill a `String`. Scalars are converted on demand, struct fields
//! match keys ignoring case and separators, and every error carries the
//! dotted key of the value that failed.

use std::fmt;

use serde::de::{
    self, value::BorrowedStrDeserializer, DeserializeSeed, EnumAccess, MapAccess,
    SeqAccess, Unexpected, VariantAccess, Visitor,
};
use toml::{Table, Value};

/// Failure while binding a value, tagged with the key it happened at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindError {
    key: Option<String>,
    message: String,
}

impl BindError {
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Attaches `key` unless a deeper key is already recorded.
    fn at(mut self, key: &str) -> Self {
        if self.key.is_none() {
            self.key = Some(key.to_owned());
        }
        self
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{key}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for BindError {}

impl de::Error for BindError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BindError {
            key: None,
            message: msg.to_string(),
        }
    }
}

/// Deserializes `value`, reporting errors against `key`.
pub fn from_value<'de, T>(value: &'de Value, key: &str) -> Result<T, BindError>
where
    T: de::Deserialize<'de>,
{
    T::deserialize(ValueDeserializer::new(value, key.to_owned())).map_err(|e| e.at(key))
}

fn child_key(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_owned()
    } else {
        format!("{parent}.{segment}")
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::String(s) => Unexpected::Str(s),
        Value::Integer(i) => Unexpected::Signed(*i),
        Value::Float(f) => Unexpected::Float(*f),
        Value::Boolean(b) => Unexpected::Bool(*b),
        Value::Datetime(_) => Unexpected::Other("datetime"),
        Value::Array(_) => Unexpected::Seq,
        Value::Table(_) => Unexpected::Map,
    }
}

/// Normalizes a key for field matching: `ConnectionString`,
/// `connection_string` and `connection-string` compare equal.
fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Returns the elements of a table whose keys are exactly `0..n`, in order.
fn indexed_elements(table: &Table) -> Option<Vec<&Value>> {
    let mut indexed: Vec<(usize, &Value)> = table
        .iter()
        .map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
        .collect::<Option<_>>()?;
    indexed.sort_by_key(|(i, _)| *i);
    indexed
        .iter()
        .enumerate()
        .all(|(pos, (i, _))| pos == *i)
        .then(|| indexed.into_iter().map(|(_, v)| v).collect())
}

pub(crate) struct ValueDeserializer<'de> {
    value: &'de Value,
    key: String,
}

impl<'de> ValueDeserializer<'de> {
    pub(crate) fn new(value: &'de Value, key: String) -> Self {
        Self { value, key }
    }

    fn invalid_type(&self, exp: &dyn de::Expected) -> BindError {
        de::Error::invalid_type(unexpected(self.value), exp)
    }

    fn parse_str<T: std::str::FromStr>(
        &self,
        s: &str,
        exp: &dyn de::Expected,
    ) -> Result<T, BindError> {
        s.trim()
            .parse()
            .map_err(|_| de::Error::invalid_value(Unexpected::Str(s), exp))
    }
}

macro_rules! deserialize_signed {
    ($($method:ident),*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
            match self.value {
                Value::Integer(i) => visitor.visit_i64(*i),
                Value::String(s) => {
                    let i: i64 = self.parse_str(s, &visitor)?;
                    visitor.visit_i64(i)
                }
                _ => Err(self.invalid_type(&visitor)),
            }
        }
    )*};
}

macro_rules! deserialize_unsigned {
    ($($method:ident),*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
            match self.value {
                Value::Integer(i) => visitor.visit_i64(*i),
                Value::String(s) => {
                    let u: u64 = self.parse_str(s, &visitor)?;
                    visitor.visit_u64(u)
                }
                _ => Err(self.invalid_type(&visitor)),
            }
        }
    )*};
}

macro_rules! deserialize_float {
    ($($method:ident),*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
            match self.value {
                Value::Float(f) => visitor.visit_f64(*f),
                Value::Integer(i) => visitor.visit_f64(*i as f64),
                Value::String(s) => {
                    let f: f64 = self.parse_str(s, &visitor)?;
                    visitor.visit_f64(f)
                }
                _ => Err(self.invalid_type(&visitor)),
            }
        }
    )*};
}

impl<'de> de::Deserializer<'de> for ValueDeserializer<'de> {
    type Error = BindError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Integer(i) => visitor.visit_i64(*i),
            Value::Float(f) => visitor.visit_f64(*f),
            Value::Boolean(b) => visitor.visit_bool(*b),
            Value::Datetime(dt) => visitor.visit_string(dt.to_string()),
            Value::Array(items) => {
                visitor.visit_seq(SeqDeserializer::new(items.iter().collect(), self.key))
            }
            Value::Table(table) => visitor.visit_map(TableAccess::new(table, self.key, None)),
        }
    }

    deserialize_signed!(deserialize_i8, deserialize_i16, deserialize_i32, deserialize_i64);
    deserialize_unsigned!(deserialize_u8, deserialize_u16, deserialize_u32, deserialize_u64);
    deserialize_float!(deserialize_f32, deserialize_f64);

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::Boolean(b) => visitor.visit_bool(*b),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => visitor.visit_bool(true),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => visitor.visit_bool(false),
            Value::String(s) => Err(de::Error::invalid_value(Unexpected::Str(s), &visitor)),
            _ => Err(self.invalid_type(&visitor)),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::String(s) => visitor.visit_borrowed_str(s),
            Value::Integer(i) => visitor.visit_string(i.to_string()),
            Value::Float(f) => visitor.visit_string(f.to_string()),
            Value::Boolean(b) => visitor.visit_string(b.to_string()),
            Value::Datetime(dt) => visitor.visit_string(dt.to_string()),
            Value::Array(_) | Value::Table(_) => Err(self.invalid_type(&visitor)),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_any(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_any(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        let value = self.value;
        match value {
            Value::String(s) if s.is_empty() => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::Array(items) => {
                visitor.visit_seq(SeqDeserializer::new(items.iter().collect(), self.key))
            }
            Value::Table(table) => match indexed_elements(table) {
                Some(items) => visitor.visit_seq(SeqDeserializer::new(items, self.key)),
                None => Err(self.invalid_type(&visitor)),
            },
            _ => Err(self.invalid_type(&visitor)),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        match self.value {
            Value::Table(table) => visitor.visit_map(TableAccess::new(table, self.key, None)),
            _ => Err(self.invalid_type(&visitor)),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        match self.value {
            Value::Table(table) => {
                visitor.visit_map(TableAccess::new(table, self.key, Some(fields)))
            }
            _ => Err(self.invalid_type(&visitor)),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        match self.value {
            Value::String(s) => {
                let name = s.trim();
                let variant = variants
                    .iter()
                    .find(|v| v.eq_ignore_ascii_case(name))
                    .copied()
                    .unwrap_or(name);
                visitor.visit_enum(BorrowedStrDeserializer::<BindError>::new(variant))
            }
            Value::Table(table) if table.len() == 1 => {
                let Some((name, value)) = table.iter().next() else {
                    return Err(self.invalid_type(&visitor));
                };
                let variant = variants
                    .iter()
                    .find(|v| v.eq_ignore_ascii_case(name))
                    .copied()
                    .unwrap_or(name.as_str());
                visitor.visit_enum(EnumDeserializer {
                    variant,
                    value,
                    key: child_key(&self.key, name),
                })
            }
            _ => Err(self.invalid_type(&visitor)),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, BindError> {
        visitor.visit_unit()
    }
}

struct SeqDeserializer<'de> {
    items: std::iter::Enumerate<std::vec::IntoIter<&'de Value>>,
    len: usize,
    key: String,
}

impl<'de> SeqDeserializer<'de> {
    fn new(items: Vec<&'de Value>, key: String) -> Self {
        Self {
            len: items.len(),
            items: items.into_iter().enumerate(),
            key,
        }
    }
}

impl<'de> SeqAccess<'de> for SeqDeserializer<'de> {
    type Error = BindError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, BindError> {
        let Some((index, value)) = self.items.next() else {
            return Ok(None);
        };
        let key = format!("{}[{index}]", self.key);
        seed.deserialize(ValueDeserializer::new(value, key.clone()))
            .map(Some)
            .map_err(|e| e.at(&key))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len)
    }
}

struct TableAccess<'de> {
    entries: toml::map::Iter<'de>,
    len: usize,
    key: String,
    fields: Option<&'static [&'static str]>,
    pending: Option<(&'de str, &'de Value)>,
}

impl<'de> TableAccess<'de> {
    fn new(table: &'de Table, key: String, fields: Option<&'static [&'static str]>) -> Self {
        Self {
            entries: table.iter(),
            len: table.len(),
            key,
            fields,
            pending: None,
        }
    }

    /// Maps a document key onto the struct field it stands for, if any.
    fn field_for(&self, name: &str) -> Option<&'static str> {
        let fields = self.fields?;
        if let Some(exact) = fields.iter().find(|f| **f == name) {
            return Some(*exact);
        }
        let normalized = normalize(name);
        fields.iter().find(|f| normalize(f) == normalized).copied()
    }
}

impl<'de> MapAccess<'de> for TableAccess<'de> {
    type Error = BindError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, BindError> {
        let Some((name, value)) = self.entries.next() else {
            return Ok(None);
        };
        self.pending = Some((name.as_str(), value));

        let key = match self.field_for(name) {
            Some(field) => seed.deserialize(BorrowedStrDeserializer::<BindError>::new(field)),
            None => seed.deserialize(BorrowedStrDeserializer::<BindError>::new(name.as_str())),
        };
        key.map(Some).map_err(|e| e.at(&child_key(&self.key, name)))
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, BindError> {
        let Some((name, value)) = self.pending.take() else {
            return Err(de::Error::custom("value requested before key"));
        };
        let key = child_key(&self.key, name);
        seed.deserialize(ValueDeserializer::new(value, key.clone()))
            .map_err(|e| e.at(&key))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.len)
    }
}

struct EnumDeserializer<'de> {
    variant: &'de str,
    value: &'de Value,
    key: String,
}

impl<'de> EnumAccess<'de> for EnumDeserializer<'de> {
    type Error = BindError;
    type Variant = ValueDeserializer<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), BindError> {
        let variant = seed.deserialize(BorrowedStrDeserializer::<BindError>::new(self.variant))?;
        Ok((variant, ValueDeserializer::new(self.value, self.key)))
    }
}

impl<'de> VariantAccess<'de> for ValueDeserializer<'de> {
    type Error = BindError;

    fn unit_variant(self) -> Result<(), BindError> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, BindError> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, BindError> {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, BindError> {
        de::Deserializer::deserialize_struct(self, "", fields, visitor)
    }
}
