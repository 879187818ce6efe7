use serde::Serialize;

#[derive(Debug, PartialEq, Serialize)]
pub struct ProtoFile {
    pub syntax:      String,
    pub package:     Option<String>,
    pub go_package:  Option<String>,
    pub definitions: Vec<Definition>,
    pub services:    Vec<Service>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DefinitionKind {
    Enum,
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum FieldLabel {
    Singular,
    /// Declared `optional` or `required`.
    Optional,
    Repeated,
    Map,
    Group,
    RepeatedGroup,
}

impl FieldLabel {
    pub fn is_repeated(self) -> bool {
        matches!(self, FieldLabel::Repeated | FieldLabel::RepeatedGroup)
    }

    pub fn is_group(self) -> bool {
        matches!(self, FieldLabel::Group | FieldLabel::RepeatedGroup)
    }
}

/// A message field or an enum value. Enum values have no type and use
/// `number` for their declared value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name:   String,
    pub line:   usize,
    pub column: usize,
    pub type_:  Option<String>,
    pub label:  FieldLabel,
    pub number: i32,
}

/// A message or enum. Nested definitions are flattened and carry their
/// dotted path relative to the package (`Outer.Inner`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub name:         String,
    pub line:         usize,
    pub column:       usize,
    pub kind:         DefinitionKind,
    pub fields:       Vec<Field>,
    pub is_map_entry: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rpc {
    pub name:        String,
    pub line:        usize,
    pub column:      usize,
    pub input_type:  String,
    pub output_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub name:    String,
    pub line:    usize,
    pub column:  usize,
    pub methods: Vec<Rpc>,
}
