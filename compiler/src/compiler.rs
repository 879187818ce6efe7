use std::collections::HashMap;
use std::sync::Arc;

use deal_schema::{
    naming::go_camel_case,
    EnumSchema, EnumValueSchema, FieldKind, FieldNumber, FieldSchema, GoIdent, GoPackage, MessageSchema,
    MethodSchema, Package, ServiceSchema,
};
use crate::{
    types::{Definition, DefinitionKind, FieldLabel, ProtoFile},
    verifier::{verify_schema, ResolvedType, TypeResolver},
    tokenizer::tokenize_schema,
    parser::parse_schema,
    utils::quote,
    error::DealError,
};

/// Compile `.proto` text into its AST and the linked schema `Package`.
/// Returns `Err(DealError)` if tokenization/parsing/verification fails.
pub fn compile_schema(text: &str) -> Result<(ProtoFile, Package), DealError> {
    let tokens = tokenize_schema(text)?;
    let file = parse_schema(&tokens)?;
    verify_schema(&file)?;
    let package = link_schema(&file)?;
    Ok((file, package))
}

/// Builds the shared schema graph for a verified file.
pub fn link_schema(file: &ProtoFile) -> Result<Package, DealError> {
    let go_package = go_package_of(file);
    let mut linker = Linker {
        file,
        resolver: TypeResolver::new(file),
        import_path: go_package.import_path.clone(),
        messages: HashMap::new(),
        enums: HashMap::new(),
    };

    let mut messages = Vec::new();
    let mut enums = Vec::new();
    for def in &file.definitions {
        match def.kind {
            DefinitionKind::Message => messages.push(linker.message(def)?),
            DefinitionKind::Enum    => enums.push(linker.enumeration(def)),
        }
    }

    let mut services = Vec::new();
    for service in &file.services {
        let mut methods = Vec::new();
        for rpc in &service.methods {
            methods.push(MethodSchema {
                name:    rpc.name.clone(),
                go_name: go_camel_case(&rpc.name),
                input:   linker.rpc_message(&rpc.input_type)?,
                output:  linker.rpc_message(&rpc.output_type)?,
            });
        }
        services.push(ServiceSchema {
            name:      service.name.clone(),
            full_name: linker.qualified(&service.name),
            go_name:   go_camel_case(&service.name),
            methods,
        });
    }

    Ok(Package {
        name: file.package.clone(),
        go_package,
        messages,
        enums,
        services,
    })
}

/// Reads `option go_package = "path;name"`. Without the option the import
/// path is derived from the proto package and the name from its last
/// component.
pub fn go_package_of(file: &ProtoFile) -> GoPackage {
    match file.go_package.as_deref() {
        Some(option) => match option.split_once(';') {
            Some((path, name)) => GoPackage {
                import_path: path.to_string(),
                name:        clean_package_name(name),
            },
            None => GoPackage {
                import_path: option.to_string(),
                name:        clean_package_name(option.rsplit('/').next().unwrap_or_default()),
            },
        },
        None => {
            let package = file.package.as_deref().unwrap_or_default();
            GoPackage {
                import_path: package.replace('.', "/"),
                name:        clean_package_name(package.rsplit('.').next().unwrap_or_default()),
            }
        }
    }
}

/// Replaces characters Go does not allow in a package name.
pub fn clean_package_name(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        return "main".to_string();
    }
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        cleaned.insert(0, '_');
    }
    cleaned
}

struct Linker<'a> {
    file:        &'a ProtoFile,
    resolver:    TypeResolver<'a>,
    import_path: String,
    messages:    HashMap<String, Arc<MessageSchema>>,
    enums:       HashMap<String, Arc<EnumSchema>>,
}

impl<'a> Linker<'a> {
    fn qualified(&self, name: &str) -> String {
        match &self.file.package {
            Some(package) => format!("{}.{}", package, name),
            None => name.to_string(),
        }
    }

    fn go_ident(&self, name: &str) -> GoIdent {
        GoIdent::new(go_camel_case(name), self.import_path.clone())
    }

    fn enumeration(&mut self, def: &Definition) -> Arc<EnumSchema> {
        if let Some(linked) = self.enums.get(&def.name) {
            return linked.clone();
        }

        // Values of a nested enum are prefixed with the enclosing message,
        // values of a top-level enum with the enum itself.
        let prefix = match def.name.rsplit_once('.') {
            Some((parent, _)) => go_camel_case(parent),
            None => go_camel_case(&def.name),
        };
        let values = def
            .fields
            .iter()
            .map(|value| EnumValueSchema {
                name:     value.name.clone(),
                number:   value.number,
                go_ident: GoIdent::new(format!("{}_{}", prefix, value.name), self.import_path.clone()),
            })
            .collect();

        let linked = Arc::new(EnumSchema::new(&self.qualified(&def.name), self.go_ident(&def.name), values));
        self.enums.insert(def.name.clone(), linked.clone());
        linked
    }

    /// Messages are linked depth first; the verifier guarantees the
    /// recursion terminates.
    fn message(&mut self, def: &Definition) -> Result<Arc<MessageSchema>, DealError> {
        if let Some(linked) = self.messages.get(&def.name) {
            return Ok(linked.clone());
        }

        let mut fields = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            let ty = field.type_.as_deref().unwrap_or_default();
            let number = field.number as FieldNumber;
            let resolved = self.resolver.resolve(&def.name, ty).ok_or_else(|| {
                DealError::VerifierError(format!(
                    "The type {} is not defined for field {}",
                    quote(ty),
                    quote(&field.name)
                ))
            })?;

            let schema = match resolved {
                ResolvedType::Scalar(kind) => FieldSchema::scalar(&field.name, number, kind),
                ResolvedType::Definition(target) => match target.kind {
                    DefinitionKind::Enum => {
                        FieldSchema::enumeration(&field.name, number, self.enumeration(target))
                    }
                    DefinitionKind::Message => {
                        let linked = self.message(target)?;
                        match field.label {
                            FieldLabel::Map => FieldSchema::map(&field.name, number, linked),
                            FieldLabel::Group | FieldLabel::RepeatedGroup => {
                                FieldSchema::group(&field.name, number, linked)
                            }
                            _ => FieldSchema::message(&field.name, number, linked),
                        }
                    }
                },
            };
            let schema = if field.label.is_repeated() {
                schema.repeated()
            } else if !def.is_map_entry && self.has_presence(field.label, schema.kind) {
                schema.with_presence()
            } else {
                schema
            };
            fields.push(schema);
        }

        let mut schema = MessageSchema::new(&self.qualified(&def.name), self.go_ident(&def.name), fields);
        schema.is_map_entry = def.is_map_entry;
        let linked = Arc::new(schema);
        self.messages.insert(def.name.clone(), linked.clone());
        Ok(linked)
    }

    /// Singular non-message fields are pointers in Go when the field tracks
    /// presence: every proto2 one, and proto3 ones declared `optional`.
    fn has_presence(&self, label: FieldLabel, kind: FieldKind) -> bool {
        if matches!(kind, FieldKind::Message | FieldKind::Group) {
            return false;
        }
        match label {
            FieldLabel::Optional => true,
            FieldLabel::Singular => self.file.syntax == "proto2",
            _ => false,
        }
    }

    fn rpc_message(&mut self, ty: &str) -> Result<Arc<MessageSchema>, DealError> {
        match self.resolver.resolve("", ty) {
            Some(ResolvedType::Definition(def)) if def.kind == DefinitionKind::Message => self.message(def),
            _ => Err(DealError::VerifierError(format!(
                "The type {} is not a message",
                quote(ty)
            ))),
        }
    }
}
