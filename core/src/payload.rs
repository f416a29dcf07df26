//! JSON request body assembly.
//!
//! # Design
//! The body has a fixed shape, so it is assembled by hand rather than through
//! serde. Only five characters are escaped: `"`, `\`, newline, carriage
//! return and tab. Other control bytes below 0x20 pass through unchanged and
//! can yield invalid JSON; callers that need strict JSON must reject such
//! prompts themselves. Escaping is not idempotent: escaping already-escaped
//! text escapes it again.

use crate::error::PayloadError;

/// Ceiling on an assembled request body, terminator included.
pub const MAX_REQUEST_BYTES: usize = 65536;

/// Escape `text` for use inside a JSON string literal.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2 + 1);
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

/// Assemble `{"message":..,"model":..,"parameters":{}}`.
///
/// `escaped_prompt` must already be escaped; `model` is inserted verbatim.
/// The body must be strictly shorter than `limit` so it fits alongside a
/// terminator in a `limit`-byte buffer.
pub fn build_chat_request(
    model: &str,
    escaped_prompt: &str,
    limit: usize,
) -> Result<String, PayloadError> {
    let body = format!(
        r#"{{"message":"{escaped_prompt}","model":"{model}","parameters":{{}}}}"#
    );
    if body.len() >= limit {
        return Err(PayloadError::TooLarge {
            size: body.len(),
            limit,
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Length of the body with an empty prompt and empty model.
    const SHAPE_OVERHEAD: usize = 41;

    #[test]
    fn escapes_the_five_handled_characters() {
        assert_eq!(escape("a\"b"), "a\\\"b");
        assert_eq!(escape("a\\b"), "a\\\\b");
        assert_eq!(escape("a\nb"), "a\\nb");
        assert_eq!(escape("a\rb"), "a\\rb");
        assert_eq!(escape("a\tb"), "a\\tb");
    }

    #[test]
    fn other_bytes_pass_through() {
        assert_eq!(escape("plain text 123 {}"), "plain text 123 {}");
        assert_eq!(escape("héllo ✓"), "héllo ✓");
        assert_eq!(escape("bell\u{7}"), "bell\u{7}");
    }

    #[test]
    fn empty_prompt_escapes_to_empty() {
        assert_eq!(escape(""), "");
    }

    #[test]
    fn escaping_twice_is_not_idempotent() {
        for input in ["say \"hi\"", "C:\\temp", "mix \\ and \""] {
            let once = escape(input);
            assert_ne!(escape(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn escaping_twice_reescapes_introduced_backslashes() {
        let once = escape("line one\nline two");
        // The backslash introduced by the first pass is escaped again.
        assert_eq!(escape(&once), "line one\\\\nline two");
    }

    #[test]
    fn output_is_bounded_by_twice_the_input() {
        let input = "\"\\\n\r\t".repeat(10);
        assert_eq!(escape(&input).len(), input.len() * 2);
    }

    #[test]
    fn quoted_prompt_produces_expected_body() {
        let escaped = escape(r#"hello "world""#);
        assert_eq!(escaped, r#"hello \"world\""#);
        let body = build_chat_request("llama3.2:3b", &escaped, MAX_REQUEST_BYTES).unwrap();
        assert_eq!(
            body,
            r#"{"message":"hello \"world\"","model":"llama3.2:3b","parameters":{}}"#
        );
    }

    #[test]
    fn body_parses_back_to_inputs() {
        let prompts = [
            "plain",
            "quote \" and backslash \\",
            "multi\nline\r\nwith\ttabs",
            "{\"nested\": [1, 2]}",
        ];
        for prompt in prompts {
            let body = build_chat_request("qwen2.5:3b", &escape(prompt), MAX_REQUEST_BYTES).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(parsed["message"], prompt);
            assert_eq!(parsed["model"], "qwen2.5:3b");
            assert_eq!(parsed["parameters"], serde_json::json!({}));
        }
    }

    #[test]
    fn model_is_inserted_verbatim() {
        let body = build_chat_request("a\"b", "x", MAX_REQUEST_BYTES).unwrap();
        assert!(body.contains(r#""model":"a"b""#));
    }

    #[test]
    fn shape_overhead_matches() {
        let body = build_chat_request("", "", MAX_REQUEST_BYTES).unwrap();
        assert_eq!(body.len(), SHAPE_OVERHEAD);
    }

    #[test]
    fn body_one_below_ceiling_fits() {
        let model = "m";
        let prompt = "p".repeat(MAX_REQUEST_BYTES - 1 - SHAPE_OVERHEAD - model.len());
        let body = build_chat_request(model, &prompt, MAX_REQUEST_BYTES).unwrap();
        assert_eq!(body.len(), MAX_REQUEST_BYTES - 1);
    }

    #[test]
    fn body_at_ceiling_is_too_large() {
        let model = "m";
        let prompt = "p".repeat(MAX_REQUEST_BYTES - SHAPE_OVERHEAD - model.len());
        let err = build_chat_request(model, &prompt, MAX_REQUEST_BYTES).unwrap_err();
        assert_eq!(
            err,
            PayloadError::TooLarge {
                size: MAX_REQUEST_BYTES,
                limit: MAX_REQUEST_BYTES
            }
        );
    }
}
