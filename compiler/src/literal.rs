//! Renders runtime values as Go construction expressions.
//!
//! The output is embedded verbatim in generated source, so every literal must
//! be valid Go on its own. Type and enum member spellings are delegated to an
//! [IdentResolver], which knows the import rules of the file being generated.

use deal_schema::{
    FieldKind, FieldSchema, FieldsByNumber, GoIdent, MapKey, MapValue, MessageSchema,
    MessageValue, Value,
};

use crate::error::DealError;
use crate::utils::quote;

pub const GO_MATH_PACKAGE: &str = "math";
pub const GO_PROTO_PACKAGE: &str = "google.golang.org/protobuf/proto";

/// Spells a Go identifier as it must appear in the generated file.
pub trait IdentResolver {
    fn qualified_name(&self, ident: &GoIdent) -> String;
}

impl<F> IdentResolver for F
where
    F: Fn(&GoIdent) -> String,
{
    fn qualified_name(&self, ident: &GoIdent) -> String {
        self(ident)
    }
}

/// Compiles `value` into a Go literal.
///
/// `field` is the schema that declared the value. Scalars render without it;
/// enums, messages, lists and maps need it to know their types.
pub fn compile_literal<R>(
    resolver: &R,
    field: Option<&FieldSchema>,
    value: &Value,
) -> Result<String, DealError>
where
    R: IdentResolver + ?Sized,
{
    match value {
        Value::Bool(v) => Ok(v.to_string()),
        Value::Int32(v) => Ok(v.to_string()),
        Value::Int64(v) => Ok(v.to_string()),
        Value::Uint32(v) => Ok(v.to_string()),
        Value::Uint64(v) => Ok(v.to_string()),
        Value::Float32(v) => Ok(format_float(resolver, f64::from(*v), true)),
        Value::Float64(v) => Ok(format_float(resolver, *v, false)),
        Value::String(v) => Ok(quote(v)),
        Value::Bytes(v) => Ok(format_bytes(v)),
        Value::Enum(ordinal) => compile_enum(resolver, require(field, value.kind_name())?, *ordinal),
        Value::Message(message) => {
            let field = require(field, value.kind_name())?;
            let schema = field.message.as_deref().ok_or_else(|| missing(field, "message"))?;
            compile_message(resolver, schema, message)
        }
        Value::List(values) => compile_list(resolver, require(field, value.kind_name())?, values),
        Value::Map(map) => compile_map(resolver, require(field, value.kind_name())?, map),
    }
}

/// Compiles a message value into `TypeName{Field: literal, ...}`.
///
/// Fields are rendered in the order the value exposes them. A field number
/// the schema does not declare aborts the whole literal.
pub fn compile_message<R>(
    resolver: &R,
    schema: &MessageSchema,
    message: &MessageValue,
) -> Result<String, DealError>
where
    R: IdentResolver + ?Sized,
{
    let fields = FieldsByNumber::new(&schema.fields);

    let arguments = message
        .iter()
        .map(|(number, value)| {
            let field = fields.get(number).ok_or_else(|| DealError::FieldNotFound {
                field:   number,
                message: schema.full_name.clone(),
            })?;
            let literal = compile_element(resolver, field, value)?;
            let literal = if field.has_presence { pointer_to(resolver, value, literal) } else { literal };
            Ok(format!("{}: {}", field.go_name, literal))
        })
        .collect::<Result<Vec<_>, DealError>>()?;

    Ok(format!(
        "{}{{{}}}",
        resolver.qualified_name(&schema.go_ident),
        arguments.join(", ")
    ))
}

/// Message values nested inside another literal are pointers in Go.
fn compile_element<R>(resolver: &R, field: &FieldSchema, value: &Value) -> Result<String, DealError>
where
    R: IdentResolver + ?Sized,
{
    let literal = compile_literal(resolver, Some(field), value)?;
    match value {
        Value::Message(_) => Ok(format!("&{}", literal)),
        _ => Ok(literal),
    }
}

/// Fields with explicit presence are pointers. Scalars go through the
/// `proto` package helpers, enums through their generated `Enum()` method.
/// Bytes stay `[]byte`.
fn pointer_to<R>(resolver: &R, value: &Value, literal: String) -> String
where
    R: IdentResolver + ?Sized,
{
    let helper = match value {
        Value::Bool(_) => "Bool",
        Value::Int32(_) => "Int32",
        Value::Int64(_) => "Int64",
        Value::Uint32(_) => "Uint32",
        Value::Uint64(_) => "Uint64",
        Value::Float32(_) => "Float32",
        Value::Float64(_) => "Float64",
        Value::String(_) => "String",
        Value::Enum(_) => return format!("{}.Enum()", literal),
        _ => return literal,
    };
    format!("{}({})", resolver.qualified_name(&GoIdent::new(helper, GO_PROTO_PACKAGE)), literal)
}

fn compile_enum<R>(resolver: &R, field: &FieldSchema, ordinal: i32) -> Result<String, DealError>
where
    R: IdentResolver + ?Sized,
{
    let enum_type = field.enum_type.as_deref().ok_or_else(|| missing(field, "enum"))?;
    match enum_type.member(ordinal) {
        Some(member) => Ok(resolver.qualified_name(&member.go_ident)),
        None => Err(DealError::EnumOutOfRange {
            enum_name: enum_type.full_name.clone(),
            ordinal,
            count:     enum_type.values.len(),
        }),
    }
}

fn compile_list<R>(resolver: &R, field: &FieldSchema, values: &[Value]) -> Result<String, DealError>
where
    R: IdentResolver + ?Sized,
{
    if field.kind == FieldKind::Group {
        return Err(DealError::UnsupportedGroup(field.name.clone()));
    }

    let element_type = go_type(resolver, field)?;
    let elements = values
        .iter()
        .map(|value| compile_element(resolver, field, value))
        .collect::<Result<Vec<_>, DealError>>()?;

    Ok(format!("[]{}{{{}}}", element_type, elements.join(", ")))
}

/// Entries are rendered sorted by key so the literal is reproducible.
fn compile_map<R>(resolver: &R, field: &FieldSchema, map: &MapValue) -> Result<String, DealError>
where
    R: IdentResolver + ?Sized,
{
    let (key_field, value_field) = field.map_entry_fields().ok_or_else(|| missing(field, "map entry"))?;
    if value_field.kind == FieldKind::Group {
        return Err(DealError::UnsupportedGroup(field.name.clone()));
    }

    let key_type = go_type(resolver, key_field)?;
    let value_type = go_type(resolver, value_field)?;

    let mut entries: Vec<(&MapKey, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    let entries = entries
        .into_iter()
        .map(|(key, value)| {
            let key = compile_literal(resolver, Some(key_field), &Value::from(key.clone()))?;
            let value = compile_element(resolver, value_field, value)?;
            Ok(format!("{}: {}", key, value))
        })
        .collect::<Result<Vec<_>, DealError>>()?;

    Ok(format!("map[{}]{}{{{}}}", key_type, value_type, entries.join(", ")))
}

/// Go type of a single (non-repeated) value of `field`. Messages are pointers.
fn go_type<R>(resolver: &R, field: &FieldSchema) -> Result<String, DealError>
where
    R: IdentResolver + ?Sized,
{
    match field.kind {
        FieldKind::Enum => {
            let enum_type = field.enum_type.as_deref().ok_or_else(|| missing(field, "enum"))?;
            Ok(resolver.qualified_name(&enum_type.go_ident))
        }
        FieldKind::Message | FieldKind::Group => {
            let message = field.message.as_deref().ok_or_else(|| missing(field, "message"))?;
            Ok(format!("*{}", resolver.qualified_name(&message.go_ident)))
        }
        kind => Ok(kind.go_type().unwrap_or_default().to_string()),
    }
}

/// Six fractional digits, like Go's `%f`. Non-finite values have no literal
/// form and go through the `math` package instead.
fn format_float<R>(resolver: &R, value: f64, single: bool) -> String
where
    R: IdentResolver + ?Sized,
{
    let special = if value.is_nan() {
        format!("{}()", resolver.qualified_name(&GoIdent::new("NaN", GO_MATH_PACKAGE)))
    } else if value.is_infinite() {
        let sign = if value > 0.0 { 1 } else { -1 };
        format!("{}({})", resolver.qualified_name(&GoIdent::new("Inf", GO_MATH_PACKAGE)), sign)
    } else {
        return format!("{:.6}", value);
    };

    if single {
        format!("float32({})", special)
    } else {
        special
    }
}

fn format_bytes(bytes: &[u8]) -> String {
    let elements: Vec<String> = bytes.iter().map(|b| format!("0x{:02x}", b)).collect();
    format!("[]byte{{{}}}", elements.join(", "))
}

fn require<'a>(field: Option<&'a FieldSchema>, expected: &'static str) -> Result<&'a FieldSchema, DealError> {
    field.ok_or_else(|| DealError::MissingSchema {
        field: "<none>".to_string(),
        expected,
    })
}

fn missing(field: &FieldSchema, expected: &'static str) -> DealError {
    DealError::MissingSchema {
        field: field.name.clone(),
        expected,
    }
}
