use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::naming::{go_camel_case, json_name};
use crate::FieldNumber;

/// The declared kind of a protobuf field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Bool,
    Int32,
    Sint32,
    Sfixed32,
    Int64,
    Sint64,
    Sfixed64,
    Uint32,
    Fixed32,
    Uint64,
    Fixed64,
    Float,
    Double,
    String,
    Bytes,
    Enum,
    Message,
    /// Legacy proto2 group encoding.
    Group,
}

pub const SCALAR_KINDS: [FieldKind; 15] = [
    FieldKind::Double,
    FieldKind::Float,
    FieldKind::Int32,
    FieldKind::Int64,
    FieldKind::Uint32,
    FieldKind::Uint64,
    FieldKind::Sint32,
    FieldKind::Sint64,
    FieldKind::Fixed32,
    FieldKind::Fixed64,
    FieldKind::Sfixed32,
    FieldKind::Sfixed64,
    FieldKind::Bool,
    FieldKind::String,
    FieldKind::Bytes,
];

impl FieldKind {
    /// Looks up a scalar kind by its `.proto` keyword.
    pub fn from_proto_name(name: &str) -> Option<FieldKind> {
        SCALAR_KINDS.iter().copied().find(|kind| kind.proto_name() == name)
    }

    pub fn proto_name(self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int32 => "int32",
            FieldKind::Sint32 => "sint32",
            FieldKind::Sfixed32 => "sfixed32",
            FieldKind::Int64 => "int64",
            FieldKind::Sint64 => "sint64",
            FieldKind::Sfixed64 => "sfixed64",
            FieldKind::Uint32 => "uint32",
            FieldKind::Fixed32 => "fixed32",
            FieldKind::Uint64 => "uint64",
            FieldKind::Fixed64 => "fixed64",
            FieldKind::Float => "float",
            FieldKind::Double => "double",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
            FieldKind::Enum => "enum",
            FieldKind::Message => "message",
            FieldKind::Group => "group",
        }
    }

    /// The Go type `protoc-gen-go` uses for a scalar kind. `None` for enums,
    /// messages and groups, whose type names depend on the schema.
    pub fn go_type(self) -> Option<&'static str> {
        match self {
            FieldKind::Bool => Some("bool"),
            FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 => Some("int32"),
            FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64 => Some("int64"),
            FieldKind::Uint32 | FieldKind::Fixed32 => Some("uint32"),
            FieldKind::Uint64 | FieldKind::Fixed64 => Some("uint64"),
            FieldKind::Float => Some("float32"),
            FieldKind::Double => Some("float64"),
            FieldKind::String => Some("string"),
            FieldKind::Bytes => Some("[]byte"),
            FieldKind::Enum | FieldKind::Message | FieldKind::Group => None,
        }
    }

    pub fn is_scalar(self) -> bool {
        !matches!(self, FieldKind::Enum | FieldKind::Message | FieldKind::Group)
    }

    /// Integral kinds, `bool` and `string` may key a map.
    pub fn can_be_map_key(self) -> bool {
        self.is_scalar() && !matches!(self, FieldKind::Float | FieldKind::Double | FieldKind::Bytes)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.proto_name())
    }
}

/// A Go identifier together with the package that declares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GoIdent {
    pub go_name:     String,
    pub import_path: String,
}

impl GoIdent {
    pub fn new(go_name: impl Into<String>, import_path: impl Into<String>) -> Self {
        GoIdent {
            go_name:     go_name.into(),
            import_path: import_path.into(),
        }
    }
}

impl fmt::Display for GoIdent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.import_path.is_empty() {
            f.write_str(&self.go_name)
        } else {
            write!(f, "{:?}.{}", self.import_path, self.go_name)
        }
    }
}

/// One field of a message type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name:      String,
    pub json_name: String,
    pub go_name:   String,
    pub number:    FieldNumber,
    pub kind:      FieldKind,
    pub is_list:   bool,
    pub is_map:    bool,
    /// Explicit presence: the Go field is a pointer (proto2 singular scalars
    /// and enums, proto3 `optional`).
    pub has_presence: bool,
    /// Set for message and group fields, and for maps (the entry type).
    pub message:   Option<Arc<MessageSchema>>,
    /// Set for enum fields.
    pub enum_type: Option<Arc<EnumSchema>>,
}

impl FieldSchema {
    fn base(name: &str, number: FieldNumber, kind: FieldKind) -> Self {
        FieldSchema {
            name:      name.to_string(),
            json_name: json_name(name),
            go_name:   go_camel_case(name),
            number,
            kind,
            is_list:   false,
            is_map:    false,
            has_presence: false,
            message:   None,
            enum_type: None,
        }
    }

    pub fn scalar(name: &str, number: FieldNumber, kind: FieldKind) -> Self {
        FieldSchema::base(name, number, kind)
    }

    pub fn message(name: &str, number: FieldNumber, message: Arc<MessageSchema>) -> Self {
        FieldSchema {
            message: Some(message),
            ..FieldSchema::base(name, number, FieldKind::Message)
        }
    }

    pub fn group(name: &str, number: FieldNumber, message: Arc<MessageSchema>) -> Self {
        FieldSchema {
            message: Some(message),
            ..FieldSchema::base(name, number, FieldKind::Group)
        }
    }

    pub fn enumeration(name: &str, number: FieldNumber, enum_type: Arc<EnumSchema>) -> Self {
        FieldSchema {
            enum_type: Some(enum_type),
            ..FieldSchema::base(name, number, FieldKind::Enum)
        }
    }

    /// A `map<K, V>` field whose entry message declares the key as field 1
    /// and the value as field 2.
    pub fn map(name: &str, number: FieldNumber, entry: Arc<MessageSchema>) -> Self {
        FieldSchema {
            is_map: true,
            message: Some(entry),
            ..FieldSchema::base(name, number, FieldKind::Message)
        }
    }

    /// Marks the field `repeated`.
    pub fn repeated(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Marks the field as tracking presence, which makes its Go field a pointer.
    pub fn with_presence(mut self) -> Self {
        self.has_presence = true;
        self
    }

    /// Key and value schemas of a map field: the first two declared fields of
    /// its entry message.
    pub fn map_entry_fields(&self) -> Option<(&FieldSchema, &FieldSchema)> {
        let entry = self.message.as_deref()?;
        match entry.fields.as_slice() {
            [key, value, ..] => Some((key, value)),
            _ => None,
        }
    }
}

/// An ordered set of fields plus the type identifier used to spell literals.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSchema {
    pub full_name:    String,
    pub go_ident:     GoIdent,
    pub fields:       Vec<FieldSchema>,
    pub is_map_entry: bool,
}

impl MessageSchema {
    pub fn new(full_name: &str, go_ident: GoIdent, fields: Vec<FieldSchema>) -> Self {
        MessageSchema {
            full_name: full_name.to_string(),
            go_ident,
            fields,
            is_map_entry: false,
        }
    }

    /// The synthesized entry type behind a `map<K, V>` field.
    pub fn map_entry(full_name: &str, go_ident: GoIdent, key: FieldKind, value: FieldSchema) -> Self {
        let value = FieldSchema {
            number: 2,
            name: "value".to_string(),
            json_name: "value".to_string(),
            go_name: "Value".to_string(),
            has_presence: false,
            ..value
        };
        MessageSchema {
            full_name: full_name.to_string(),
            go_ident,
            fields: vec![FieldSchema::scalar("key", 1, key), value],
            is_map_entry: true,
        }
    }

    /// Finds a field by its proto name or its JSON name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldSchema> {
        self.fields
            .iter()
            .find(|field| field.json_name == name || field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValueSchema {
    pub name:     String,
    pub number:   i32,
    pub go_ident: GoIdent,
}

/// Ordered members of an enum; runtime values are ordinals into `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub full_name: String,
    pub go_ident:  GoIdent,
    pub values:    Vec<EnumValueSchema>,
}

impl EnumSchema {
    pub fn new(full_name: &str, go_ident: GoIdent, values: Vec<EnumValueSchema>) -> Self {
        EnumSchema {
            full_name: full_name.to_string(),
            go_ident,
            values,
        }
    }

    /// Builds a top-level enum whose members are numbered from zero and
    /// spelled `<Enum>_<MEMBER>` in Go.
    pub fn with_members(full_name: &str, go_ident: GoIdent, members: &[&str]) -> Self {
        let values = members
            .iter()
            .enumerate()
            .map(|(number, member)| EnumValueSchema {
                name:     member.to_string(),
                number:   number as i32,
                go_ident: GoIdent::new(
                    format!("{}_{}", go_ident.go_name, member),
                    go_ident.import_path.clone(),
                ),
            })
            .collect();
        EnumSchema::new(full_name, go_ident, values)
    }

    /// The member at `ordinal`, if it lies in `[0, len)`.
    pub fn member(&self, ordinal: i32) -> Option<&EnumValueSchema> {
        usize::try_from(ordinal).ok().and_then(|index| self.values.get(index))
    }

    pub fn ordinal_of_name(&self, name: &str) -> Option<usize> {
        self.values.iter().position(|value| value.name == name)
    }

    pub fn ordinal_of_number(&self, number: i32) -> Option<usize> {
        self.values.iter().position(|value| value.number == number)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodSchema {
    pub name:    String,
    pub go_name: String,
    pub input:   Arc<MessageSchema>,
    pub output:  Arc<MessageSchema>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSchema {
    pub name:      String,
    pub full_name: String,
    pub go_name:   String,
    pub methods:   Vec<MethodSchema>,
}

impl ServiceSchema {
    pub fn method(&self, name: &str) -> Option<&MethodSchema> {
        self.methods.iter().find(|method| method.name == name)
    }
}

/// Go package the generated protobuf types live in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GoPackage {
    pub import_path: String,
    pub name:        String,
}

/// Every message, enum and service declared by one `.proto` file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Package {
    pub name:       Option<String>,
    pub go_package: GoPackage,
    pub messages:   Vec<Arc<MessageSchema>>,
    pub enums:      Vec<Arc<EnumSchema>>,
    pub services:   Vec<ServiceSchema>,
}

impl Package {
    /// Finds a message by its fully qualified name or by its name relative
    /// to the package.
    pub fn message(&self, name: &str) -> Option<&Arc<MessageSchema>> {
        let qualified = self.qualify(name);
        self.messages
            .iter()
            .find(|message| message.full_name == name || message.full_name == qualified)
    }

    pub fn service(&self, name: &str) -> Option<&ServiceSchema> {
        self.services
            .iter()
            .find(|service| service.name == name || service.full_name == name)
    }

    fn qualify(&self, name: &str) -> String {
        match &self.name {
            Some(package) => format!("{}.{}", package, name),
            None => name.to_string(),
        }
    }
}

/// Field number → field schema for one message type.
///
/// Duplicate numbers are not rejected here: the last field with a given
/// number wins.
#[derive(Debug, Clone, Default)]
pub struct FieldsByNumber<'a> {
    fields: HashMap<FieldNumber, &'a FieldSchema>,
}

impl<'a> FieldsByNumber<'a> {
    pub fn new(fields: &'a [FieldSchema]) -> Self {
        FieldsByNumber {
            fields: fields.iter().map(|field| (field.number, field)).collect(),
        }
    }

    pub fn get(&self, number: FieldNumber) -> Option<&'a FieldSchema> {
        self.fields.get(&number).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> GoIdent {
        GoIdent::new(name, "example.com/testpb")
    }

    #[test]
    fn fields_by_number_indexes_every_field() {
        let fields = vec![
            FieldSchema::scalar("name", 2, FieldKind::String),
            FieldSchema::scalar("id", 1, FieldKind::Int64),
        ];
        let index = FieldsByNumber::new(&fields);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get(1).unwrap().name, "id");
        assert_eq!(index.get(2).unwrap().name, "name");
        assert!(index.get(3).is_none());
    }

    #[test]
    fn fields_by_number_last_duplicate_wins() {
        let fields = vec![
            FieldSchema::scalar("first", 1, FieldKind::Int64),
            FieldSchema::scalar("second", 1, FieldKind::String),
        ];
        let index = FieldsByNumber::new(&fields);

        assert_eq!(index.len(), 1);
        assert_eq!(index.get(1).unwrap().name, "second");
    }

    #[test]
    fn map_entry_exposes_key_and_value() {
        let entry = Arc::new(MessageSchema::map_entry(
            "test.Holder.LabelsEntry",
            ident("Holder_LabelsEntry"),
            FieldKind::Int64,
            FieldSchema::scalar("value", 2, FieldKind::String),
        ));
        let field = FieldSchema::map("labels", 3, entry);
        let (key, value) = field.map_entry_fields().unwrap();

        assert!(field.is_map);
        assert_eq!(key.number, 1);
        assert_eq!(key.kind, FieldKind::Int64);
        assert_eq!(value.number, 2);
        assert_eq!(value.kind, FieldKind::String);
    }

    #[test]
    fn map_values_never_track_presence() {
        let entry = MessageSchema::map_entry(
            "test.Holder.LabelsEntry",
            ident("Holder_LabelsEntry"),
            FieldKind::Int64,
            FieldSchema::scalar("value", 2, FieldKind::String).with_presence(),
        );

        assert!(!entry.fields[1].has_presence);
        assert!(FieldSchema::scalar("name", 1, FieldKind::String).with_presence().has_presence);
        assert!(!FieldSchema::scalar("name", 1, FieldKind::String).has_presence);
    }

    #[test]
    fn enum_member_range() {
        let status = EnumSchema::with_members("test.Status", ident("Status"), &["ONE", "TWO"]);

        assert_eq!(status.member(1).unwrap().go_ident.go_name, "Status_TWO");
        assert!(status.member(2).is_none());
        assert!(status.member(-1).is_none());
        assert_eq!(status.ordinal_of_name("ONE"), Some(0));
        assert_eq!(status.ordinal_of_number(1), Some(1));
    }

    #[test]
    fn scalar_kinds_round_trip_through_proto_names() {
        for kind in SCALAR_KINDS {
            assert_eq!(FieldKind::from_proto_name(kind.proto_name()), Some(kind));
        }
        assert_eq!(FieldKind::from_proto_name("message"), None);
        assert!(FieldKind::String.can_be_map_key());
        assert!(!FieldKind::Double.can_be_map_key());
    }

    #[test]
    fn package_finds_messages_by_relative_name() {
        let user = Arc::new(MessageSchema::new("users.User", ident("User"), vec![]));
        let package = Package {
            name: Some("users".to_string()),
            messages: vec![user],
            ..Package::default()
        };

        assert!(package.message("User").is_some());
        assert!(package.message("users.User").is_some());
        assert!(package.message("Missing").is_none());
    }

    #[test]
    fn go_ident_display_quotes_import_path() {
        assert_eq!(ident("User").to_string(), "\"example.com/testpb\".User");
        assert_eq!(GoIdent::new("User", "").to_string(), "User");
    }
}
