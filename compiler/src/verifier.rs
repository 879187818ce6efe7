use std::collections::{HashMap, HashSet};
use crate::{
    types::{ProtoFile, Definition, DefinitionKind, FieldLabel},
    utils::quote,
    error::DealError,
};
use deal_schema::FieldKind;

pub const MAX_FIELD_NUMBER: i32 = 536_870_911;
pub const RESERVED_FIELD_NUMBERS: std::ops::RangeInclusive<i32> = 19_000..=19_999;

/// What a type reference in a field or rpc points at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedType<'a> {
    Scalar(FieldKind),
    Definition(&'a Definition),
}

/// Resolves type references with protobuf scoping: the innermost enclosing
/// scope is searched first, then each outer scope up to the package root.
/// A leading `.` makes the reference fully qualified.
pub struct TypeResolver<'a> {
    package:     Option<&'a str>,
    definitions: HashMap<&'a str, &'a Definition>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(file: &'a ProtoFile) -> Self {
        TypeResolver {
            package:     file.package.as_deref(),
            definitions: file.definitions.iter().map(|def| (def.name.as_str(), def)).collect(),
        }
    }

    pub fn definition(&self, name: &str) -> Option<&'a Definition> {
        self.definitions.get(name).copied()
    }

    /// `scope` is the dotted name of the definition holding the reference,
    /// or `""` at file level.
    pub fn resolve(&self, scope: &str, name: &str) -> Option<ResolvedType<'a>> {
        if let Some(kind) = FieldKind::from_proto_name(name) {
            if kind.is_scalar() {
                return Some(ResolvedType::Scalar(kind));
            }
        }

        if let Some(qualified) = name.strip_prefix('.') {
            return self.lookup(qualified).map(ResolvedType::Definition);
        }

        let mut scopes: Vec<&str> = Vec::new();
        if let Some(package) = self.package {
            scopes.extend(package.split('.'));
        }
        scopes.extend(scope.split('.').filter(|part| !part.is_empty()));

        for depth in (0..=scopes.len()).rev() {
            let mut candidate = scopes[..depth].join(".");
            if !candidate.is_empty() {
                candidate.push('.');
            }
            candidate.push_str(name);
            if let Some(def) = self.lookup(&candidate) {
                return Some(ResolvedType::Definition(def));
            }
        }
        None
    }

    /// Looks up a fully qualified name, dropping the package prefix.
    fn lookup(&self, qualified: &str) -> Option<&'a Definition> {
        let relative = match self.package {
            Some(package) => match qualified.strip_prefix(package) {
                Some(rest) if rest.starts_with('.') => &rest[1..],
                _ => return None,
            },
            None => qualified,
        };
        self.definition(relative)
    }
}

/// Returns `Ok(())` if verification passed, or `Err(DealError::VerifierError(_))` otherwise.
pub fn verify_schema(file: &ProtoFile) -> Result<(), DealError> {
    let resolver = TypeResolver::new(file);

    // 1) Check duplicate type names
    let mut defined: HashSet<&str> = HashSet::new();
    for def in &file.definitions {
        if !defined.insert(def.name.as_str()) {
            return Err(DealError::VerifierError(format!(
                "The type {} is defined twice",
                quote(&def.name)
            )));
        }
    }

    for def in &file.definitions {
        match def.kind {
            DefinitionKind::Enum    => verify_enum(file, def)?,
            DefinitionKind::Message => verify_message(file, &resolver, def)?,
        }
    }

    // 2) Check services
    let mut service_names = Vec::new();
    for service in &file.services {
        if service_names.contains(&service.name) || defined.contains(service.name.as_str()) {
            return Err(DealError::VerifierError(format!(
                "The name {} is defined twice",
                quote(&service.name)
            )));
        }
        service_names.push(service.name.clone());

        let mut rpc_names = Vec::new();
        for rpc in &service.methods {
            if rpc_names.contains(&rpc.name) {
                return Err(DealError::VerifierError(format!(
                    "The method {} is defined twice in service {}",
                    quote(&rpc.name),
                    quote(&service.name)
                )));
            }
            rpc_names.push(rpc.name.clone());

            for ty in [&rpc.input_type, &rpc.output_type] {
                match resolver.resolve("", ty) {
                    Some(ResolvedType::Definition(def)) if def.kind == DefinitionKind::Message => {}
                    _ => {
                        return Err(DealError::VerifierError(format!(
                            "The type {} of method {} is not a message",
                            quote(ty),
                            quote(&rpc.name)
                        )))
                    }
                }
            }
        }
    }

    // 3) Check that messages do not contain themselves through any reference
    let mut state: HashMap<String, u8> = HashMap::new();
    fn check_recursion(
        def: &Definition,
        resolver: &TypeResolver,
        state: &mut HashMap<String, u8>,
    ) -> Result<(), DealError> {
        if def.kind != DefinitionKind::Message {
            return Ok(());
        }
        match state.get(&def.name) {
            Some(1) => {
                return Err(DealError::VerifierError(format!(
                    "Recursive nesting of {} is not allowed",
                    quote(&def.name)
                )))
            }
            Some(_) => return Ok(()),
            None => {}
        }
        state.insert(def.name.clone(), 1);
        for field in &def.fields {
            if let Some(ref ty) = field.type_ {
                if let Some(ResolvedType::Definition(target)) = resolver.resolve(&def.name, ty) {
                    check_recursion(target, resolver, state)?;
                }
            }
        }
        state.insert(def.name.clone(), 2);
        Ok(())
    }

    for def in &file.definitions {
        check_recursion(def, &resolver, &mut state)?;
    }

    Ok(())
}

fn verify_enum(file: &ProtoFile, def: &Definition) -> Result<(), DealError> {
    if def.fields.is_empty() {
        return Err(DealError::VerifierError(format!(
            "The enum {} must have at least one value",
            quote(&def.name)
        )));
    }
    if file.syntax == "proto3" && def.fields[0].number != 0 {
        return Err(DealError::VerifierError(format!(
            "The first value of enum {} must be zero in proto3",
            quote(&def.name)
        )));
    }

    let mut names = Vec::new();
    for value in &def.fields {
        if names.contains(&value.name) {
            return Err(DealError::VerifierError(format!(
                "The enum value {} is defined twice in {}",
                quote(&value.name),
                quote(&def.name)
            )));
        }
        names.push(value.name.clone());
    }
    Ok(())
}

fn verify_message(file: &ProtoFile, resolver: &TypeResolver, def: &Definition) -> Result<(), DealError> {
    let mut names = Vec::new();
    let mut numbers = Vec::new();

    for field in &def.fields {
        if names.contains(&field.name) {
            return Err(DealError::VerifierError(format!(
                "The field {} is defined twice in {}",
                quote(&field.name),
                quote(&def.name)
            )));
        }
        names.push(field.name.clone());

        if numbers.contains(&field.number) {
            return Err(DealError::VerifierError(format!(
                "The id for field {} is used twice",
                quote(&field.name)
            )));
        }
        if field.number <= 0 {
            return Err(DealError::VerifierError(format!(
                "The id for field {} must be positive",
                quote(&field.name)
            )));
        }
        if field.number > MAX_FIELD_NUMBER {
            return Err(DealError::VerifierError(format!(
                "The id for field {} cannot be larger than {}",
                quote(&field.name),
                MAX_FIELD_NUMBER
            )));
        }
        if RESERVED_FIELD_NUMBERS.contains(&field.number) {
            return Err(DealError::VerifierError(format!(
                "The id for field {} lies in the reserved range 19000 to 19999",
                quote(&field.name)
            )));
        }
        numbers.push(field.number);

        if field.label.is_group() && file.syntax == "proto3" {
            return Err(DealError::VerifierError(format!(
                "The group {} is not allowed in proto3",
                quote(&field.name)
            )));
        }

        let ty = match field.type_ {
            Some(ref ty) => ty,
            None => continue,
        };
        let resolved = resolver.resolve(&def.name, ty).ok_or_else(|| {
            DealError::VerifierError(format!(
                "The type {} is not defined for field {}",
                quote(ty),
                quote(&field.name)
            ))
        })?;

        if def.is_map_entry && field.number == 1 {
            let is_key = matches!(resolved, ResolvedType::Scalar(kind) if kind.can_be_map_key());
            if !is_key {
                return Err(DealError::VerifierError(format!(
                    "The type {} cannot be used as a map key",
                    quote(ty)
                )));
            }
        }
        if let ResolvedType::Definition(target) = resolved {
            if target.is_map_entry && field.label != FieldLabel::Map {
                return Err(DealError::VerifierError(format!(
                    "The map entry type {} cannot be referenced by field {}",
                    quote(ty),
                    quote(&field.name)
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse_schema, tokenizer::tokenize_schema};

    fn parse(input: &str) -> ProtoFile {
        parse_schema(&tokenize_schema(input).unwrap()).unwrap()
    }

    fn verify(input: &str) -> Result<(), DealError> {
        verify_schema(&parse(input))
    }

    fn verifier_message(input: &str) -> String {
        match verify(input) {
            Err(DealError::VerifierError(msg)) => msg,
            other => panic!("expected a verifier error, got {:?}", other),
        }
    }

    #[test]
    fn accepts_valid_file() {
        verify(
            r#"
            syntax = "proto3";
            package example.users;
            message User {
              int64 id = 1;
              Role role = 2;
              map<string, Profile> profiles = 3;
              enum Role { ROLE_UNSPECIFIED = 0; ROLE_ADMIN = 1; }
            }
            message Profile { string bio = 1; repeated .example.users.User.Role roles = 2; }
            message GetUserRequest { int64 id = 1; }
            service UserService { rpc GetUser(GetUserRequest) returns (User); }
            "#,
        )
        .unwrap();
    }

    #[test]
    fn resolves_innermost_scope_first() {
        let file = parse(
            r#"
            package p;
            message Item {}
            message Outer {
              message Item {}
              Item item = 1;
            }
            "#,
        );
        let resolver = TypeResolver::new(&file);

        match resolver.resolve("Outer", "Item") {
            Some(ResolvedType::Definition(def)) => assert_eq!(def.name, "Outer.Item"),
            other => panic!("unexpected {:?}", other),
        }
        match resolver.resolve("", "p.Item") {
            Some(ResolvedType::Definition(def)) => assert_eq!(def.name, "Item"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(resolver.resolve("Outer", "sint32"), Some(ResolvedType::Scalar(FieldKind::Sint32)));
        assert!(resolver.resolve("", ".q.Item").is_none());
    }

    #[test]
    fn rejects_duplicates() {
        assert!(verifier_message("message A {} message A {}").contains("defined twice"));
        assert!(verifier_message("message A { int32 x = 1; int64 x = 2; }").contains("defined twice"));
        assert!(verifier_message("message A { int32 x = 1; int64 y = 1; }").contains("used twice"));
        assert!(verifier_message("enum E { A = 0; A = 1; }").contains("defined twice"));
    }

    #[test]
    fn rejects_bad_field_numbers() {
        assert!(verifier_message("message A { int32 x = 0; }").contains("positive"));
        assert!(verifier_message("message A { int32 x = 536870912; }").contains("larger"));
        assert!(verifier_message("message A { int32 x = 19500; }").contains("reserved"));
    }

    #[test]
    fn rejects_unknown_types() {
        assert!(verifier_message("message A { Missing x = 1; }").contains("not defined"));
        assert!(verifier_message("message A {} service S { rpc M(A) returns (B); }").contains("not a message"));
        assert!(verifier_message("enum E { X = 0; } service S { rpc M(E) returns (E); }").contains("not a message"));
    }

    #[test]
    fn rejects_invalid_map_keys() {
        assert!(verifier_message("message A { map<double, string> m = 1; }").contains("map key"));
        assert!(verifier_message("message B {} message A { map<B, string> m = 1; }").contains("map key"));
    }

    #[test]
    fn rejects_enum_rules() {
        assert!(verifier_message("enum E {}").contains("at least one"));
        assert!(verifier_message("syntax = \"proto3\"; enum E { A = 1; }").contains("zero"));
        verify("syntax = \"proto2\"; enum E { A = 1; }").unwrap();
    }

    #[test]
    fn rejects_groups_in_proto3() {
        assert!(verifier_message("syntax = \"proto3\"; message A { group G = 1 { int32 x = 1; } }")
            .contains("proto3"));
    }

    #[test]
    fn rejects_recursion() {
        assert!(verifier_message("message A { A self = 1; }").contains("Recursive"));
        assert!(verifier_message("message A { repeated B b = 1; } message B { A a = 1; }").contains("Recursive"));
        assert!(verifier_message("message A { map<string, A> children = 1; }").contains("Recursive"));
        verify("message A { B b = 1; B c = 2; } message B { int32 x = 1; }").unwrap();
    }
}
