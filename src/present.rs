//! Printing of token responses.

use std::io::{self, Write};

use serde_json::Value;

use crate::token::TokenResponse;

/// Print the full response as indented JSON, followed by the bare access token.
///
/// A missing `access_token` is printed as an empty line; nothing is validated.
pub fn print_token_response<W: Write>(out: &mut W, response: &TokenResponse) -> io::Result<()> {
    writeln!(out, "\n=== Raw JSON Response ===\n")?;
    serde_json::to_writer_pretty(&mut *out, response.as_map())?;
    writeln!(out)?;

    writeln!(out, "\n=== Access Token ===\n")?;
    match response.access_token() {
        Some(Value::String(token)) => writeln!(out, "{}", token),
        Some(Value::Null) | None => writeln!(out),
        Some(other) => writeln!(out, "{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn response(json: &str) -> TokenResponse {
        serde_json::from_str::<Map<String, Value>>(json)
            .unwrap()
            .into()
    }

    fn render(response: &TokenResponse) -> String {
        let mut out = Vec::new();
        print_token_response(&mut out, response).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_prints_json_then_token() {
        let output = render(&response(
            r#"{"access_token":"abc123","token_type":"Bearer"}"#,
        ));
        assert_eq!(
            output,
            "\n=== Raw JSON Response ===\n\n\
             {\n  \"access_token\": \"abc123\",\n  \"token_type\": \"Bearer\"\n}\n\
             \n=== Access Token ===\n\n\
             abc123\n"
        );
    }

    #[test]
    fn test_keeps_member_order() {
        let output = render(&response(r#"{"token_type":"Bearer","access_token":"x"}"#));
        let token_type = output.find("token_type").unwrap();
        let access_token = output.find("access_token").unwrap();
        assert!(token_type < access_token);
    }

    #[test]
    fn test_missing_access_token_prints_empty_line() {
        let output = render(&response(r#"{"token_type":"Bearer"}"#));
        assert!(output.ends_with("=== Access Token ===\n\n\n"));
    }
}
