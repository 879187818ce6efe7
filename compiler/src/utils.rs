use crate::error::DealError;

/// Double-quotes `text`, escaping quotes, backslashes and control characters.
/// JSON string syntax is a subset of Go's interpreted string literals, so the
/// result is valid in both.
pub fn quote(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

pub fn error(msg: &str, line: usize, column: usize) -> DealError {
    DealError::ParseError {
        msg: msg.to_string(),
        line,
        column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_escapes() {
        assert_eq!(quote("some-string"), "\"some-string\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote("line\nnext\t"), "\"line\\nnext\\t\"");
        assert_eq!(quote("back\\slash"), "\"back\\\\slash\"");
        assert_eq!(quote("\u{1}"), "\"\\u0001\"");
        assert_eq!(quote("héllo"), "\"héllo\"");
    }
}
