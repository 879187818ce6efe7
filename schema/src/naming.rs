//! Identifier spelling helpers shared by the schema builders and the generator.

/// Makes `name` an exported Go identifier by upper-casing its first letter.
pub fn make_exported_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().to_string() + chars.as_str(),
    }
}

/// Converts a protobuf name to the Go identifier `protoc-gen-go` would emit.
/// - `_x` and `.x` (lowercase `x`) collapse into `X`.
/// - Other dots become underscores, so `Outer.Inner` becomes `Outer_Inner`.
/// - A leading underscore becomes `X`.
/// - Lowercase runs following an upper-cased letter are kept as is.
pub fn go_camel_case(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len() + 1);
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let next_is_lower = bytes.get(i + 1).map_or(false, |n| n.is_ascii_lowercase());

        if c == b'.' && next_is_lower {
            // dropped, the following letter is upper-cased below
        } else if c == b'.' {
            out.push('_');
        } else if c == b'_' && (i == 0 || bytes[i - 1] == b'.') {
            out.push('X');
        } else if c == b'_' && next_is_lower {
            // dropped
        } else if c.is_ascii_digit() {
            out.push(c as char);
        } else {
            out.push(c.to_ascii_uppercase() as char);
            while i + 1 < bytes.len() && bytes[i + 1].is_ascii_lowercase() {
                i += 1;
                out.push(bytes[i] as char);
            }
        }
        i += 1;
    }

    out
}

/// Converts a snake_case field name to the lowerCamel JSON name protoc assigns.
pub fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_name_capitalizes_first_letter() {
        assert_eq!(make_exported_name("someName"), "SomeName");
        assert_eq!(make_exported_name("SomeName"), "SomeName");
        assert_eq!(make_exported_name("s"), "S");
        assert_eq!(make_exported_name(""), "");
    }

    #[test]
    fn go_camel_case_follows_protoc_gen_go() {
        assert_eq!(go_camel_case("user_id"), "UserId");
        assert_eq!(go_camel_case("int_field"), "IntField");
        assert_eq!(go_camel_case("Outer.Inner"), "Outer_Inner");
        assert_eq!(go_camel_case("_hidden"), "XHidden");
        assert_eq!(go_camel_case("field2_name"), "Field2Name");
        assert_eq!(go_camel_case("GetUser"), "GetUser");
        assert_eq!(go_camel_case("HTTPServer"), "HTTPServer");
    }

    #[test]
    fn json_name_is_lower_camel() {
        assert_eq!(json_name("user_id"), "userId");
        assert_eq!(json_name("name"), "name");
        assert_eq!(json_name("a_b_c"), "aBC");
    }
}
