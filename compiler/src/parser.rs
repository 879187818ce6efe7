use crate::{
    tokenizer::Token,
    types::{Definition, DefinitionKind, Field, FieldLabel, ProtoFile, Rpc, Service},
    utils::{error, quote},
    error::DealError,
};
use deal_schema::naming::go_camel_case;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER:       Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref TYPE_NAME:        Regex = Regex::new(r"^\.?[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
    static ref STRING:           Regex = Regex::new(r#"^".*"$"#).unwrap();
    static ref EQUALS:           Regex = Regex::new(r"^=$").unwrap();
    static ref SEMICOLON:        Regex = Regex::new(r"^;$").unwrap();
    static ref COMMA:            Regex = Regex::new(r"^,$").unwrap();
    static ref INTEGER:          Regex = Regex::new(r"^-?\d+$").unwrap();
    static ref LEFT_BRACE:       Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:      Regex = Regex::new(r"^\}$").unwrap();
    static ref LEFT_PAREN:       Regex = Regex::new(r"^\($").unwrap();
    static ref RIGHT_PAREN:      Regex = Regex::new(r"^\)$").unwrap();
    static ref LEFT_ANGLE:       Regex = Regex::new(r"^<$").unwrap();
    static ref RIGHT_ANGLE:      Regex = Regex::new(r"^>$").unwrap();
    static ref LEFT_BRACKET:     Regex = Regex::new(r"^\[$").unwrap();
    static ref RIGHT_BRACKET:    Regex = Regex::new(r"^\]$").unwrap();
    static ref SYNTAX_KEYWORD:   Regex = Regex::new(r"^syntax$").unwrap();
    static ref PACKAGE_KEYWORD:  Regex = Regex::new(r"^package$").unwrap();
    static ref OPTION_KEYWORD:   Regex = Regex::new(r"^option$").unwrap();
    static ref IMPORT_KEYWORD:   Regex = Regex::new(r"^import$").unwrap();
    static ref MESSAGE_KEYWORD:  Regex = Regex::new(r"^message$").unwrap();
    static ref ENUM_KEYWORD:     Regex = Regex::new(r"^enum$").unwrap();
    static ref SERVICE_KEYWORD:  Regex = Regex::new(r"^service$").unwrap();
    static ref RPC_KEYWORD:      Regex = Regex::new(r"^rpc$").unwrap();
    static ref RETURNS_KEYWORD:  Regex = Regex::new(r"^returns$").unwrap();
    static ref STREAM_KEYWORD:   Regex = Regex::new(r"^stream$").unwrap();
    static ref REPEATED_KEYWORD: Regex = Regex::new(r"^repeated$").unwrap();
    static ref OPTIONAL_KEYWORD: Regex = Regex::new(r"^(optional|required)$").unwrap();
    static ref MAP_KEYWORD:      Regex = Regex::new(r"^map$").unwrap();
    static ref GROUP_KEYWORD:    Regex = Regex::new(r"^group$").unwrap();
    static ref SKIPPED_KEYWORD:  Regex = Regex::new(r"^(reserved|extensions)$").unwrap();
    static ref UNSUPPORTED:      Regex = Regex::new(r"^(oneof|extend)$").unwrap();
    static ref EOF:              Regex = Regex::new(r"^$").unwrap();
}

struct Cursor<'a> {
    tokens: &'a [Token],
    index:  usize,
}

impl<'a> Cursor<'a> {
    /// The EOF token is returned for any index past the end.
    fn current(&self) -> &'a Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.index.min(last)]
    }

    fn peek(&self, test: &Regex) -> bool {
        test.is_match(&self.current().text)
    }

    fn eat(&mut self, test: &Regex) -> bool {
        if self.peek(test) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, test: &Regex, expected: &str) -> Result<&'a Token, DealError> {
        let tok = self.current();
        if !self.eat(test) {
            return Err(error(
                &format!("Expected {} but found {}", expected, quote(&tok.text)),
                tok.line,
                tok.column,
            ));
        }
        Ok(tok)
    }

    fn unexpected_token(&self) -> DealError {
        let tok = self.current();
        error(&format!("Unexpected token {}", quote(&tok.text)), tok.line, tok.column)
    }

    fn unsupported(&self, what: &str) -> DealError {
        let tok = self.current();
        error(&format!("{} is not supported", what), tok.line, tok.column)
    }

    fn integer(&mut self) -> Result<i32, DealError> {
        let tok = self.expect(&INTEGER, "integer")?;
        tok.text.parse::<i32>().map_err(|_| {
            error(&format!("Invalid integer {}", quote(&tok.text)), tok.line, tok.column)
        })
    }

    fn string(&mut self) -> Result<String, DealError> {
        let tok = self.expect(&STRING, "string")?;
        serde_json::from_str::<String>(&tok.text).map_err(|_| {
            error(&format!("Invalid string {}", tok.text), tok.line, tok.column)
        })
    }

    /// Skips up to and including the next top-level `;`.
    fn skip_statement(&mut self) -> Result<(), DealError> {
        let mut depth = 0usize;
        loop {
            if self.peek(&EOF) {
                return Err(self.unexpected_token());
            }
            if self.eat(&LEFT_BRACE) {
                depth += 1;
            } else if depth > 0 && self.eat(&RIGHT_BRACE) {
                depth -= 1;
            } else if depth == 0 && self.eat(&SEMICOLON) {
                return Ok(());
            } else {
                self.index += 1;
            }
        }
    }

    /// Skips a `[ ... ]` option list if one follows.
    fn skip_field_options(&mut self) -> Result<(), DealError> {
        if !self.eat(&LEFT_BRACKET) {
            return Ok(());
        }
        let mut depth = 1usize;
        while depth > 0 {
            if self.peek(&EOF) {
                return Err(self.unexpected_token());
            }
            if self.eat(&LEFT_BRACKET) {
                depth += 1;
            } else if self.eat(&RIGHT_BRACKET) {
                depth -= 1;
            } else {
                self.index += 1;
            }
        }
        Ok(())
    }
}

/// Parses the tokens of one `.proto` file.
pub fn parse_schema(tokens: &[Token]) -> Result<ProtoFile, DealError> {
    let mut cursor = Cursor { tokens, index: 0 };
    let mut file = ProtoFile {
        syntax:      "proto2".to_string(),
        package:     None,
        go_package:  None,
        definitions: Vec::new(),
        services:    Vec::new(),
    };

    if cursor.eat(&SYNTAX_KEYWORD) {
        cursor.expect(&EQUALS, "\"=\"")?;
        let tok = cursor.current();
        let syntax = cursor.string()?;
        if syntax != "proto2" && syntax != "proto3" {
            return Err(error(&format!("Unknown syntax {}", quote(&syntax)), tok.line, tok.column));
        }
        file.syntax = syntax;
        cursor.expect(&SEMICOLON, "\";\"")?;
    }

    while !cursor.eat(&EOF) {
        if cursor.eat(&SEMICOLON) {
            continue;
        }
        if cursor.eat(&PACKAGE_KEYWORD) {
            let tok = cursor.expect(&TYPE_NAME, "package name")?;
            if file.package.is_some() {
                return Err(error("Multiple package declarations", tok.line, tok.column));
            }
            file.package = Some(tok.text.clone());
            cursor.expect(&SEMICOLON, "\";\"")?;
        } else if cursor.eat(&OPTION_KEYWORD) {
            if let Some(go_package) = parse_option(&mut cursor, "go_package")? {
                file.go_package = Some(go_package);
            }
        } else if cursor.peek(&IMPORT_KEYWORD) {
            return Err(cursor.unsupported("import"));
        } else if cursor.eat(&MESSAGE_KEYWORD) {
            parse_message(&mut cursor, "", &mut file.definitions)?;
        } else if cursor.eat(&ENUM_KEYWORD) {
            parse_enum(&mut cursor, "", &mut file.definitions)?;
        } else if cursor.eat(&SERVICE_KEYWORD) {
            file.services.push(parse_service(&mut cursor)?);
        } else if cursor.peek(&UNSUPPORTED) {
            let what = cursor.current().text.clone();
            return Err(cursor.unsupported(&what));
        } else {
            return Err(cursor.unexpected_token());
        }
    }

    Ok(file)
}

/// Parses an `option` statement after the keyword. Returns the string value
/// when the option is `wanted`; every other option is skipped.
fn parse_option(cursor: &mut Cursor, wanted: &str) -> Result<Option<String>, DealError> {
    if cursor.peek(&IDENTIFIER) && cursor.current().text == wanted {
        cursor.index += 1;
        cursor.expect(&EQUALS, "\"=\"")?;
        let value = cursor.string()?;
        cursor.expect(&SEMICOLON, "\";\"")?;
        return Ok(Some(value));
    }
    cursor.skip_statement()?;
    Ok(None)
}

fn scoped(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope, name)
    }
}

fn parse_message(cursor: &mut Cursor, scope: &str, definitions: &mut Vec<Definition>) -> Result<(), DealError> {
    let name_tok = cursor.expect(&IDENTIFIER, "identifier")?;
    cursor.expect(&LEFT_BRACE, "\"{\"")?;
    parse_message_body(cursor, &scoped(scope, &name_tok.text), name_tok, definitions)
}

/// Parses fields and nested definitions up to the closing brace, then
/// records the message. The message is inserted before its nested types.
fn parse_message_body(
    cursor: &mut Cursor,
    name: &str,
    name_tok: &Token,
    definitions: &mut Vec<Definition>,
) -> Result<(), DealError> {
    let slot = definitions.len();
    definitions.push(Definition {
        name:         name.to_string(),
        line:         name_tok.line,
        column:       name_tok.column,
        kind:         DefinitionKind::Message,
        fields:       Vec::new(),
        is_map_entry: false,
    });

    let mut fields = Vec::new();
    while !cursor.eat(&RIGHT_BRACE) {
        if cursor.peek(&EOF) {
            return Err(cursor.unexpected_token());
        }
        if cursor.eat(&SEMICOLON) {
            continue;
        }
        if cursor.eat(&MESSAGE_KEYWORD) {
            parse_message(cursor, name, definitions)?;
        } else if cursor.eat(&ENUM_KEYWORD) {
            parse_enum(cursor, name, definitions)?;
        } else if cursor.eat(&OPTION_KEYWORD) || cursor.eat(&SKIPPED_KEYWORD) {
            cursor.skip_statement()?;
        } else if cursor.peek(&UNSUPPORTED) {
            let what = cursor.current().text.clone();
            return Err(cursor.unsupported(&what));
        } else if cursor.eat(&MAP_KEYWORD) {
            fields.push(parse_map_field(cursor, name, definitions)?);
        } else {
            fields.push(parse_field(cursor, name, definitions)?);
        }
    }

    definitions[slot].fields = fields;
    Ok(())
}

fn parse_field(cursor: &mut Cursor, scope: &str, definitions: &mut Vec<Definition>) -> Result<Field, DealError> {
    let repeated = cursor.eat(&REPEATED_KEYWORD);
    let optional = !repeated && cursor.eat(&OPTIONAL_KEYWORD);

    if cursor.eat(&GROUP_KEYWORD) {
        let group_tok = cursor.expect(&IDENTIFIER, "identifier")?;
        cursor.expect(&EQUALS, "\"=\"")?;
        let number = cursor.integer()?;
        cursor.skip_field_options()?;
        cursor.expect(&LEFT_BRACE, "\"{\"")?;
        let group_name = scoped(scope, &group_tok.text);
        parse_message_body(cursor, &group_name, group_tok, definitions)?;

        return Ok(Field {
            name:   group_tok.text.to_lowercase(),
            line:   group_tok.line,
            column: group_tok.column,
            type_:  Some(group_name),
            label:  if repeated { FieldLabel::RepeatedGroup } else { FieldLabel::Group },
            number,
        });
    }

    let type_tok = cursor.expect(&TYPE_NAME, "type")?;
    let name_tok = cursor.expect(&IDENTIFIER, "identifier")?;
    cursor.expect(&EQUALS, "\"=\"")?;
    let number = cursor.integer()?;
    cursor.skip_field_options()?;
    cursor.expect(&SEMICOLON, "\";\"")?;

    Ok(Field {
        name:   name_tok.text.clone(),
        line:   name_tok.line,
        column: name_tok.column,
        type_:  Some(type_tok.text.clone()),
        label:  match (repeated, optional) {
            (true, _) => FieldLabel::Repeated,
            (false, true) => FieldLabel::Optional,
            (false, false) => FieldLabel::Singular,
        },
        number,
    })
}

/// `map<K, V> name = N;` becomes a field typed by a synthesized
/// `<Scope>.<Name>Entry` message holding `key = 1` and `value = 2`.
fn parse_map_field(cursor: &mut Cursor, scope: &str, definitions: &mut Vec<Definition>) -> Result<Field, DealError> {
    cursor.expect(&LEFT_ANGLE, "\"<\"")?;
    let key_tok = cursor.expect(&TYPE_NAME, "map key type")?;
    cursor.expect(&COMMA, "\",\"")?;
    let value_tok = cursor.expect(&TYPE_NAME, "map value type")?;
    cursor.expect(&RIGHT_ANGLE, "\">\"")?;
    let name_tok = cursor.expect(&IDENTIFIER, "identifier")?;
    cursor.expect(&EQUALS, "\"=\"")?;
    let number = cursor.integer()?;
    cursor.skip_field_options()?;
    cursor.expect(&SEMICOLON, "\";\"")?;

    let entry_name = scoped(scope, &format!("{}Entry", go_camel_case(&name_tok.text)));
    let entry_field = |name: &str, tok: &Token, number: i32| Field {
        name:   name.to_string(),
        line:   tok.line,
        column: tok.column,
        type_:  Some(tok.text.clone()),
        label:  FieldLabel::Singular,
        number,
    };
    definitions.push(Definition {
        name:         entry_name.clone(),
        line:         name_tok.line,
        column:       name_tok.column,
        kind:         DefinitionKind::Message,
        fields:       vec![entry_field("key", key_tok, 1), entry_field("value", value_tok, 2)],
        is_map_entry: true,
    });

    Ok(Field {
        name:   name_tok.text.clone(),
        line:   name_tok.line,
        column: name_tok.column,
        type_:  Some(entry_name),
        label:  FieldLabel::Map,
        number,
    })
}

fn parse_enum(cursor: &mut Cursor, scope: &str, definitions: &mut Vec<Definition>) -> Result<(), DealError> {
    let name_tok = cursor.expect(&IDENTIFIER, "identifier")?;
    cursor.expect(&LEFT_BRACE, "\"{\"")?;

    let mut fields = Vec::new();
    while !cursor.eat(&RIGHT_BRACE) {
        if cursor.peek(&EOF) {
            return Err(cursor.unexpected_token());
        }
        if cursor.eat(&SEMICOLON) {
            continue;
        }
        if cursor.eat(&OPTION_KEYWORD) || cursor.eat(&SKIPPED_KEYWORD) {
            cursor.skip_statement()?;
            continue;
        }

        let value_tok = cursor.expect(&IDENTIFIER, "identifier")?;
        cursor.expect(&EQUALS, "\"=\"")?;
        let number = cursor.integer()?;
        cursor.skip_field_options()?;
        cursor.expect(&SEMICOLON, "\";\"")?;

        fields.push(Field {
            name:   value_tok.text.clone(),
            line:   value_tok.line,
            column: value_tok.column,
            type_:  None,
            label:  FieldLabel::Singular,
            number,
        });
    }

    definitions.push(Definition {
        name:         scoped(scope, &name_tok.text),
        line:         name_tok.line,
        column:       name_tok.column,
        kind:         DefinitionKind::Enum,
        fields,
        is_map_entry: false,
    });
    Ok(())
}

fn parse_service(cursor: &mut Cursor) -> Result<Service, DealError> {
    let name_tok = cursor.expect(&IDENTIFIER, "identifier")?;
    cursor.expect(&LEFT_BRACE, "\"{\"")?;

    let mut methods = Vec::new();
    while !cursor.eat(&RIGHT_BRACE) {
        if cursor.eat(&SEMICOLON) {
            continue;
        }
        if cursor.eat(&OPTION_KEYWORD) {
            cursor.skip_statement()?;
            continue;
        }
        cursor.expect(&RPC_KEYWORD, "\"rpc\"")?;
        let rpc_tok = cursor.expect(&IDENTIFIER, "identifier")?;

        cursor.expect(&LEFT_PAREN, "\"(\"")?;
        if cursor.peek(&STREAM_KEYWORD) {
            return Err(cursor.unsupported("Streaming"));
        }
        let input_tok = cursor.expect(&TYPE_NAME, "type")?;
        cursor.expect(&RIGHT_PAREN, "\")\"")?;

        cursor.expect(&RETURNS_KEYWORD, "\"returns\"")?;
        cursor.expect(&LEFT_PAREN, "\"(\"")?;
        if cursor.peek(&STREAM_KEYWORD) {
            return Err(cursor.unsupported("Streaming"));
        }
        let output_tok = cursor.expect(&TYPE_NAME, "type")?;
        cursor.expect(&RIGHT_PAREN, "\")\"")?;

        if cursor.eat(&LEFT_BRACE) {
            while !cursor.eat(&RIGHT_BRACE) {
                if cursor.peek(&EOF) {
                    return Err(cursor.unexpected_token());
                }
                if !cursor.eat(&SEMICOLON) {
                    cursor.expect(&OPTION_KEYWORD, "\"option\"")?;
                    cursor.skip_statement()?;
                }
            }
        } else {
            cursor.expect(&SEMICOLON, "\";\"")?;
        }

        methods.push(Rpc {
            name:        rpc_tok.text.clone(),
            line:        rpc_tok.line,
            column:      rpc_tok.column,
            input_type:  input_tok.text.clone(),
            output_type: output_tok.text.clone(),
        });
    }

    Ok(Service {
        name:    name_tok.text.clone(),
        line:    name_tok.line,
        column:  name_tok.column,
        methods,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_schema;

    fn parse(input: &str) -> Result<ProtoFile, DealError> {
        parse_schema(&tokenize_schema(input)?)
    }

    #[test]
    fn parses_header() {
        let file = parse(
            r#"
            syntax = "proto3";
            package example.users;
            option go_package = "example.com/users;userspb";
            option java_multiple_files = true;
            "#,
        )
        .unwrap();

        assert_eq!(file.syntax, "proto3");
        assert_eq!(file.package.as_deref(), Some("example.users"));
        assert_eq!(file.go_package.as_deref(), Some("example.com/users;userspb"));
        assert!(file.definitions.is_empty());
    }

    #[test]
    fn parses_messages_and_nesting() {
        let file = parse(
            r#"
            syntax = "proto3";
            message User {
              int64 id = 1;
              repeated string tags = 2 [packed = true];
              optional Profile profile = 3;
              message Profile {
                string bio = 1;
              }
              enum Role { ROLE_UNSPECIFIED = 0; ROLE_ADMIN = 1; }
              reserved 4, 5;
            }
            "#,
        )
        .unwrap();

        let names: Vec<_> = file.definitions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["User", "User.Profile", "User.Role"]);

        let user = &file.definitions[0];
        assert_eq!(user.kind, DefinitionKind::Message);
        assert_eq!(user.fields.len(), 3);
        assert_eq!(user.fields[0].type_.as_deref(), Some("int64"));
        assert_eq!(user.fields[0].label, FieldLabel::Singular);
        assert_eq!(user.fields[1].label, FieldLabel::Repeated);
        assert_eq!(user.fields[2].label, FieldLabel::Optional);
        assert_eq!(user.fields[2].number, 3);

        let role = &file.definitions[2];
        assert_eq!(role.kind, DefinitionKind::Enum);
        assert_eq!(role.fields[1].name, "ROLE_ADMIN");
        assert_eq!(role.fields[1].number, 1);
        assert!(role.fields[1].type_.is_none());
    }

    #[test]
    fn parses_map_fields() {
        let file = parse("message Holder { map<string, int64> counts = 1; }").unwrap();

        let holder = &file.definitions[0];
        assert_eq!(holder.fields[0].label, FieldLabel::Map);
        assert_eq!(holder.fields[0].type_.as_deref(), Some("Holder.CountsEntry"));

        let entry = &file.definitions[1];
        assert!(entry.is_map_entry);
        assert_eq!(entry.name, "Holder.CountsEntry");
        assert_eq!(entry.fields[0].name, "key");
        assert_eq!(entry.fields[0].type_.as_deref(), Some("string"));
        assert_eq!(entry.fields[1].number, 2);
        assert_eq!(entry.fields[1].type_.as_deref(), Some("int64"));
    }

    #[test]
    fn parses_groups() {
        let file = parse(
            r#"
            syntax = "proto2";
            message Search {
              repeated group Result = 1 {
                required string url = 2;
              }
            }
            "#,
        )
        .unwrap();

        let search = &file.definitions[0];
        assert_eq!(search.fields[0].name, "result");
        assert_eq!(search.fields[0].label, FieldLabel::RepeatedGroup);
        assert_eq!(search.fields[0].type_.as_deref(), Some("Search.Result"));
        assert_eq!(file.definitions[1].fields[0].name, "url");
    }

    #[test]
    fn parses_services() {
        let file = parse(
            r#"
            service UserService {
              rpc GetUser(GetUserRequest) returns (User);
              rpc ListUsers(.pkg.ListRequest) returns (ListResponse) {
                option deprecated = true;
              }
            }
            "#,
        )
        .unwrap();

        let service = &file.services[0];
        assert_eq!(service.name, "UserService");
        assert_eq!(service.methods.len(), 2);
        assert_eq!(service.methods[0].input_type, "GetUserRequest");
        assert_eq!(service.methods[0].output_type, "User");
        assert_eq!(service.methods[1].input_type, ".pkg.ListRequest");
    }

    #[test]
    fn rejects_unsupported_constructs() {
        assert!(matches!(parse("import \"other.proto\";"), Err(DealError::ParseError { .. })));
        assert!(matches!(
            parse("message M { oneof kind { string a = 1; } }"),
            Err(DealError::ParseError { ref msg, .. }) if msg.contains("oneof")
        ));
        assert!(matches!(
            parse("service S { rpc Watch(stream A) returns (B); }"),
            Err(DealError::ParseError { ref msg, .. }) if msg.contains("Streaming")
        ));
    }

    #[test]
    fn reports_position_of_errors() {
        let err = parse("message M {\n  int64 id = ;\n}").unwrap_err();
        assert!(
            matches!(err, DealError::ParseError { line: 2, column: 14, .. }),
            "unexpected error {:?}",
            err
        );
        assert!(parse("message M { int64 id = 1;").is_err());
        assert!(parse("syntax = \"proto4\";").is_err());
    }
}
