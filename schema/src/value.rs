use std::collections::HashMap;
use std::fmt;

use crate::FieldNumber;

/// This type holds dynamic protobuf data.
///
/// A value does not know which enum, message or map type it belongs to; it
/// is always interpreted together with the [FieldSchema](crate::FieldSchema)
/// that declared it. Enum values are zero-based ordinals into the enum's
/// declared members.
#[derive(Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Enum(i32),
    Message(MessageValue),
    List(Vec<Value>),
    Map(MapValue),
}

impl Value {
    /// Short name of the value kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match *self {
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Uint32(_) => "uint32",
            Value::Uint64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
            Value::Message(_) => "message",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl From<MapKey> for Value {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Bool(value) => Value::Bool(value),
            MapKey::Int32(value) => Value::Int32(value),
            MapKey::Int64(value) => Value::Int64(value),
            MapKey::Uint32(value) => Value::Uint32(value),
            MapKey::Uint64(value) => Value::Uint64(value),
            MapKey::String(value) => Value::String(value),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Bool(value) => value.fmt(f),
            Value::Int32(value) => value.fmt(f),
            Value::Int64(value) => value.fmt(f),
            Value::Uint32(value) => value.fmt(f),
            Value::Uint64(value) => value.fmt(f),
            Value::Float32(value) => value.fmt(f),
            Value::Float64(value) => value.fmt(f),
            Value::String(ref value) => value.fmt(f),
            Value::Bytes(ref value) => write!(f, "bytes{:?}", value),
            Value::Enum(ordinal) => write!(f, "enum#{}", ordinal),
            Value::Message(ref message) => message.fmt(f),
            Value::List(ref values) => values.fmt(f),
            Value::Map(ref map) => map.fmt(f),
        }
    }
}

/// The fields present on a message, in the order they were set.
#[derive(Clone, PartialEq, Default)]
pub struct MessageValue {
    fields: Vec<(FieldNumber, Value)>,
}

impl MessageValue {
    pub fn new() -> Self {
        MessageValue { fields: Vec::new() }
    }

    /// Builder form of [set](#method.set).
    pub fn with(mut self, number: FieldNumber, value: Value) -> Self {
        self.set(number, value);
        self
    }

    /// Sets a field. Replacing a field keeps its original position.
    pub fn set(&mut self, number: FieldNumber, value: Value) {
        match self.fields.iter_mut().find(|(n, _)| *n == number) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((number, value)),
        }
    }

    pub fn get(&self, number: FieldNumber) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, value)| value)
    }

    /// Present fields in the order the value exposes them.
    pub fn iter(&self) -> impl Iterator<Item = (FieldNumber, &Value)> + '_ {
        self.fields.iter().map(|(number, value)| (*number, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Debug for MessageValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{{")?;
        for (i, (number, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", number, value)?;
        }
        write!(f, "}}")
    }
}

/// Keys a protobuf map may use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKey {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    String(String),
}

/// An unordered key → value association.
#[derive(Clone, PartialEq, Default)]
pub struct MapValue {
    entries: HashMap<MapKey, Value>,
}

impl MapValue {
    pub fn new() -> Self {
        MapValue { entries: HashMap::new() }
    }

    /// Builder form of [insert](#method.insert).
    pub fn with(mut self, key: MapKey, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: MapKey, value: Value) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &MapKey) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for MapValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        f.debug_map().entries(entries).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        assert_eq!(Value::Bool(true).kind_name(), "bool");
        assert_eq!(Value::Bytes(b"ab".to_vec()).kind_name(), "bytes");
        assert_eq!(Value::Enum(1).kind_name(), "enum");
        assert_eq!(Value::Message(MessageValue::new()).kind_name(), "message");
        assert_eq!(Value::List(Vec::new()).kind_name(), "list");
        assert_eq!(Value::Map(MapValue::new()).kind_name(), "map");
    }

    #[test]
    fn message_keeps_insertion_order() {
        let message = MessageValue::new()
            .with(3, Value::String("c".to_owned()))
            .with(1, Value::Int64(1))
            .with(2, Value::Bool(true));

        let numbers: Vec<_> = message.iter().map(|(number, _)| number).collect();
        assert_eq!(numbers, vec![3, 1, 2]);
    }

    #[test]
    fn message_set_replaces_in_place() {
        let mut message = MessageValue::new()
            .with(1, Value::Int64(1))
            .with(2, Value::Int64(2));
        message.set(1, Value::Int64(10));

        assert_eq!(message.len(), 2);
        assert_eq!(message.get(1), Some(&Value::Int64(10)));
        assert_eq!(message.iter().next().map(|(number, _)| number), Some(1));
    }

    #[test]
    fn map_insert_and_lookup() {
        let map = MapValue::new()
            .with(MapKey::Int64(42), Value::String("test".to_owned()))
            .with(MapKey::Int64(7), Value::String("seven".to_owned()));

        assert_eq!(map.len(), 2);
        assert_eq!(
            map.get(&MapKey::Int64(42)),
            Some(&Value::String("test".to_owned()))
        );
        assert_eq!(format!("{:?}", map), "{Int64(7): \"seven\", Int64(42): \"test\"}");
    }

    #[test]
    fn map_key_converts_to_value() {
        assert_eq!(Value::from(MapKey::Uint32(5)), Value::Uint32(5));
        assert_eq!(
            Value::from(MapKey::String("k".to_owned())),
            Value::String("k".to_owned())
        );
    }

    #[test]
    fn value_debug() {
        let value = Value::Message(
            MessageValue::new()
                .with(1, Value::Int64(42))
                .with(2, Value::List(vec![Value::Enum(1)])),
        );
        assert_eq!(format!("{:?}", value), "{1: 42, 2: [enum#1]}");
    }
}
