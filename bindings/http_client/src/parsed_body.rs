use serde_json::Value;

/// The result of reading a response body as JSON.
///
/// Parsing never fails. A body that is not JSON is kept as [ParsedBody::Malformed] so that a
/// missing field can still be told apart from a broken response.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    /// Nothing but whitespace.
    Empty,
    /// Not valid JSON, with the parser's reason.
    Malformed(String),
}

impl ParsedBody {
    pub fn parse(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return ParsedBody::Empty;
        }

        match serde_json::from_slice(body) {
            Ok(value) => ParsedBody::Json(value),
            Err(e) => ParsedBody::Malformed(e.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ParsedBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The value of a top level field, if the body is a JSON object and the field is a string.
    pub fn string_field(&self, field: &str) -> Option<&str> {
        self.as_json()?.get(field)?.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn json_object() {
        let parsed = ParsedBody::parse(br#"{"requestId":"abc123"}"#);

        assert_eq!(ParsedBody::Json(json!({"requestId": "abc123"})), parsed);
        assert_eq!(Some("abc123"), parsed.string_field("requestId"));
    }

    #[test]
    fn empty_body() {
        assert_eq!(ParsedBody::Empty, ParsedBody::parse(b""));
        assert_eq!(ParsedBody::Empty, ParsedBody::parse(b"  \n"));
        assert_eq!(None, ParsedBody::parse(b"").string_field("requestId"));
    }

    #[test]
    fn malformed_body() {
        let parsed = ParsedBody::parse(b"<html>Bad Gateway</html>");

        assert!(matches!(parsed, ParsedBody::Malformed(_)));
        assert_eq!(None, parsed.as_json());
        assert_eq!(None, parsed.string_field("requestId"));
    }

    #[test]
    fn non_string_field() {
        let parsed = ParsedBody::parse(br#"{"requestId":42}"#);
        assert_eq!(None, parsed.string_field("requestId"));
    }

    #[test]
    fn non_object_json() {
        let parsed = ParsedBody::parse(br#"["requestId"]"#);
        assert!(parsed.as_json().is_some());
        assert_eq!(None, parsed.string_field("requestId"));
    }
}
