//! Turns contract payloads into runtime values.
//!
//! Payloads follow the protobuf JSON mapping: lowerCamel or original field
//! names, 64-bit integers as numbers or strings, bytes as base64, enums by
//! name or number.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use deal_schema::{FieldKind, FieldSchema, MapKey, MapValue, MessageSchema, MessageValue, Value};
use serde_json::Value as JsonValue;

use crate::error::DealError;

/// Decodes `json` as a message of type `schema`. `path` names the payload in
/// error messages (`request`, `response`, ...).
///
/// `null` decodes to an empty message. Fields are emitted in schema
/// declaration order.
pub fn message_from_json(
    schema: &MessageSchema,
    json: &JsonValue,
    path: &str,
) -> Result<MessageValue, DealError> {
    let object = match json {
        JsonValue::Null => return Ok(MessageValue::new()),
        JsonValue::Object(object) => object,
        other => return Err(invalid(path, format!("expected an object for {}, found {}", schema.full_name, other))),
    };

    if let Some(unknown) = object.keys().find(|key| schema.field_by_name(key).is_none()) {
        return Err(invalid(
            path,
            format!("unknown field \"{}\" for message {}", unknown, schema.full_name),
        ));
    }

    let mut message = MessageValue::new();
    for field in &schema.fields {
        let value = object.get(&field.json_name).or_else(|| object.get(&field.name));
        match value {
            None | Some(JsonValue::Null) => {}
            Some(value) => {
                let field_path = format!("{}.{}", path, field.json_name);
                message.set(field.number, field_from_json(field, value, &field_path)?);
            }
        }
    }
    Ok(message)
}

fn field_from_json(field: &FieldSchema, json: &JsonValue, path: &str) -> Result<Value, DealError> {
    if field.is_map {
        return map_from_json(field, json, path);
    }
    if field.is_list {
        let elements = json
            .as_array()
            .ok_or_else(|| invalid(path, "expected an array"))?;
        return elements
            .iter()
            .enumerate()
            .map(|(i, element)| single_from_json(field, element, &format!("{}[{}]", path, i)))
            .collect::<Result<Vec<_>, DealError>>()
            .map(Value::List);
    }
    single_from_json(field, json, path)
}

fn map_from_json(field: &FieldSchema, json: &JsonValue, path: &str) -> Result<Value, DealError> {
    let (key_field, value_field) = field.map_entry_fields().ok_or_else(|| DealError::MissingSchema {
        field:    field.name.clone(),
        expected: "map entry",
    })?;
    let object = json
        .as_object()
        .ok_or_else(|| invalid(path, "expected an object"))?;

    let mut map = MapValue::new();
    for (key, value) in object {
        let entry_path = format!("{}[{}]", path, key);
        let key = map_key_from_str(key_field.kind, key, &entry_path)?;
        map.insert(key, single_from_json(value_field, value, &entry_path)?);
    }
    Ok(Value::Map(map))
}

fn map_key_from_str(kind: FieldKind, text: &str, path: &str) -> Result<MapKey, DealError> {
    let bad_key = || invalid(path, format!("\"{}\" is not a valid {} map key", text, kind));
    let key = match kind {
        FieldKind::Bool => match text {
            "true" => MapKey::Bool(true),
            "false" => MapKey::Bool(false),
            _ => return Err(bad_key()),
        },
        FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 => {
            MapKey::Int32(text.parse().map_err(|_| bad_key())?)
        }
        FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64 => {
            MapKey::Int64(text.parse().map_err(|_| bad_key())?)
        }
        FieldKind::Uint32 | FieldKind::Fixed32 => MapKey::Uint32(text.parse().map_err(|_| bad_key())?),
        FieldKind::Uint64 | FieldKind::Fixed64 => MapKey::Uint64(text.parse().map_err(|_| bad_key())?),
        FieldKind::String => MapKey::String(text.to_string()),
        _ => return Err(bad_key()),
    };
    Ok(key)
}

/// Decodes one non-repeated value of `field`.
fn single_from_json(field: &FieldSchema, json: &JsonValue, path: &str) -> Result<Value, DealError> {
    match field.kind {
        FieldKind::Bool => json
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| invalid(path, "expected a boolean")),
        FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 => {
            let value = integer_from_json(json, path)?;
            i32::try_from(value)
                .map(Value::Int32)
                .map_err(|_| invalid(path, format!("{} does not fit in 32 bits", value)))
        }
        FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64 => {
            let value = integer_from_json(json, path)?;
            i64::try_from(value)
                .map(Value::Int64)
                .map_err(|_| invalid(path, format!("{} does not fit in 64 bits", value)))
        }
        FieldKind::Uint32 | FieldKind::Fixed32 => {
            let value = integer_from_json(json, path)?;
            u32::try_from(value)
                .map(Value::Uint32)
                .map_err(|_| invalid(path, format!("{} is not a valid uint32", value)))
        }
        FieldKind::Uint64 | FieldKind::Fixed64 => {
            let value = integer_from_json(json, path)?;
            u64::try_from(value)
                .map(Value::Uint64)
                .map_err(|_| invalid(path, format!("{} is not a valid uint64", value)))
        }
        FieldKind::Float => float_from_json(json, path).map(|value| Value::Float32(value as f32)),
        FieldKind::Double => float_from_json(json, path).map(Value::Float64),
        FieldKind::String => json
            .as_str()
            .map(|value| Value::String(value.to_string()))
            .ok_or_else(|| invalid(path, "expected a string")),
        FieldKind::Bytes => {
            let text = json
                .as_str()
                .ok_or_else(|| invalid(path, "expected a base64 string"))?;
            STANDARD
                .decode(text)
                .or_else(|_| URL_SAFE.decode(text))
                .map(Value::Bytes)
                .map_err(|err| invalid(path, format!("invalid base64: {}", err)))
        }
        FieldKind::Enum => enum_from_json(field, json, path),
        FieldKind::Message | FieldKind::Group => {
            let schema = field.message.as_deref().ok_or_else(|| DealError::MissingSchema {
                field:    field.name.clone(),
                expected: "message",
            })?;
            message_from_json(schema, json, path).map(Value::Message)
        }
    }
}

/// Wide enough for every protobuf integer kind.
fn integer_from_json(json: &JsonValue, path: &str) -> Result<i128, DealError> {
    let parsed = match json {
        JsonValue::Number(number) => number
            .as_i64()
            .map(i128::from)
            .or_else(|| number.as_u64().map(i128::from))
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|value| value.fract() == 0.0 && value.abs() < 1e19)
                    .map(|value| value as i128)
            }),
        JsonValue::String(text) => text.trim().parse::<i128>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(path, format!("expected an integer, found {}", json)))
}

fn float_from_json(json: &JsonValue, path: &str) -> Result<f64, DealError> {
    let parsed = match json {
        JsonValue::Number(number) => number.as_f64(),
        JsonValue::String(text) => match text.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            other => other.parse::<f64>().ok(),
        },
        _ => None,
    };
    parsed.ok_or_else(|| invalid(path, format!("expected a number, found {}", json)))
}

fn enum_from_json(field: &FieldSchema, json: &JsonValue, path: &str) -> Result<Value, DealError> {
    let enum_type = field.enum_type.as_deref().ok_or_else(|| DealError::MissingSchema {
        field:    field.name.clone(),
        expected: "enum",
    })?;

    let ordinal = match json {
        JsonValue::String(name) => enum_type.ordinal_of_name(name),
        JsonValue::Number(number) => number
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .and_then(|n| enum_type.ordinal_of_number(n)),
        _ => None,
    };

    ordinal
        .and_then(|ordinal| i32::try_from(ordinal).ok())
        .map(Value::Enum)
        .ok_or_else(|| invalid(path, format!("{} is not a member of enum {}", json, enum_type.full_name)))
}

fn invalid(path: &str, reason: impl Into<String>) -> DealError {
    DealError::InvalidValue {
        path:   path.to_string(),
        reason: reason.into(),
    }
}
