// JSON object extraction from free-form model output.
//
// Model responses are supposed to be a bare JSON object but regularly arrive
// wrapped in markdown fences, surrounded by prose, or cut off mid-string when
// the output budget runs out. Extraction runs an ordered list of named
// strategies and keeps the first one that yields a JSON object.

use serde_json::Value;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Strategy trait and pipeline
// ---------------------------------------------------------------------------

/// One way of pulling a JSON object out of text.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// The parsed object, or `None` if this strategy does not apply.
    fn attempt(&self, text: &str) -> Option<Value>;
}

/// A successfully extracted object and the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub value: Value,
    pub strategy: &'static str,
}

pub struct JsonExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for JsonExtractor {
    /// Fenced block, brace span, structural repair, whole text.
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(FencedBlock),
                Box::new(BraceSpan),
                Box::new(StructuralRepair),
                Box::new(WholeText),
            ],
        }
    }
}

impl JsonExtractor {
    /// An extractor with no strategies; add them with [`with_strategy`](Self::with_strategy).
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: impl ExtractionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn extract(&self, text: &str) -> Option<Extraction> {
        for strategy in &self.strategies {
            if let Some(value) = strategy.attempt(text) {
                let name = strategy.name();
                if name == StructuralRepair.name() {
                    warn!(chars = text.chars().count(), "model output needed structural repair");
                } else {
                    debug!(strategy = name, "extracted JSON object");
                }
                return Some(Extraction {
                    value,
                    strategy: name,
                });
            }
        }
        warn!(
            chars = text.chars().count(),
            "no extraction strategy produced a JSON object"
        );
        None
    }
}

/// Parse `s` as JSON, accepting only objects.
fn parse_object(s: &str) -> Option<Value> {
    serde_json::from_str::<Value>(s.trim())
        .ok()
        .filter(Value::is_object)
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Content of the first complete ``` fenced block, language tag ignored.
pub struct FencedBlock;

impl ExtractionStrategy for FencedBlock {
    fn name(&self) -> &'static str {
        "fenced_block"
    }

    fn attempt(&self, text: &str) -> Option<Value> {
        let open = text.find("```")?;
        let after_fence = &text[open + 3..];
        // Skip the language tag line (`json`, `JSON`, or nothing).
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        let close = body.find("```")?;
        parse_object(&body[..close])
    }
}

/// Substring from the first `{` to the last `}`.
pub struct BraceSpan;

impl ExtractionStrategy for BraceSpan {
    fn name(&self) -> &'static str {
        "brace_span"
    }

    fn attempt(&self, text: &str) -> Option<Value> {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end <= start {
            return None;
        }
        parse_object(&text[start..=end])
    }
}

/// Complete a truncated object: close an open string, settle a dangling key,
/// value, or comma, then append the missing closers innermost-first. Lossy.
pub struct StructuralRepair;

impl ExtractionStrategy for StructuralRepair {
    fn name(&self) -> &'static str {
        "structural_repair"
    }

    fn attempt(&self, text: &str) -> Option<Value> {
        let start = text.find('{')?;
        let tail = &text[start..];

        // Truncated output keeps everything up to the cut; a stray trailing
        // fence comes from wrappers that closed the block anyway.
        let open_ended = tail.trim_end();
        let open_ended = open_ended.strip_suffix("```").unwrap_or(open_ended);

        let mut candidates = vec![open_ended];
        if let Some(end) = tail.rfind('}') {
            candidates.push(&tail[..=end]);
        }

        candidates
            .into_iter()
            .find_map(|candidate| parse_object(&repair_truncated(candidate)))
    }
}

/// The entire response as-is.
pub struct WholeText;

impl ExtractionStrategy for WholeText {
    fn name(&self) -> &'static str {
        "whole_text"
    }

    fn attempt(&self, text: &str) -> Option<Value> {
        parse_object(text)
    }
}

// ---------------------------------------------------------------------------
// Repair
// ---------------------------------------------------------------------------

/// Rewrite a JSON prefix so that it is structurally complete. Scanning stops
/// once the outermost container closes; anything after it is discarded.
pub fn repair_truncated(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    let mut closers: Vec<char> = Vec::new();

    let mut in_string = false;
    let mut escaped = false;
    // Byte offset in `out` of the backslash that began the latest escape.
    let mut last_escape_at: Option<usize> = None;
    let mut expect_key = false;
    let mut string_is_key = false;
    // A key string has closed but its `:` has not been seen yet.
    let mut pending_key = false;

    for c in input.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
                last_escape_at = Some(out.len());
            } else if c == '"' {
                in_string = false;
                pending_key = string_is_key;
            }
            out.push(c);
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                string_is_key = expect_key;
                expect_key = false;
                last_escape_at = None;
            }
            '{' => {
                closers.push('}');
                expect_key = true;
            }
            '[' => {
                closers.push(']');
                expect_key = false;
            }
            '}' | ']' => {
                if closers.last() == Some(&c) {
                    closers.pop();
                }
                expect_key = false;
            }
            ',' => expect_key = closers.last() == Some(&'}'),
            ':' => pending_key = false,
            _ => {}
        }
        out.push(c);

        if closers.is_empty() && !out.trim().is_empty() && matches!(c, '}' | ']') {
            return out;
        }
    }

    if in_string {
        if escaped {
            out.pop();
        } else if let Some(i) = last_escape_at {
            if is_incomplete_unicode_escape(&out[i..]) {
                out.truncate(i);
            }
        }
        // The cut may have split a surrogate pair, leaving its high half.
        drop_trailing_high_surrogate(&mut out);
        out.push('"');
        if string_is_key {
            out.push_str(":null");
        }
    } else {
        let trimmed_len = out.trim_end().len();
        out.truncate(trimmed_len);
        complete_trailing_literal(&mut out);
        if out.ends_with(',') {
            out.pop();
        }
        if out.ends_with(':') {
            out.push_str("null");
        } else if pending_key {
            out.push_str(":null");
        }
    }

    while let Some(closer) = closers.pop() {
        out.push(closer);
    }
    out
}

/// `\u` followed by fewer than four hex digits, or a lone high surrogate
/// whose pair was cut off.
fn is_incomplete_unicode_escape(tail: &str) -> bool {
    let Some(hex) = tail.strip_prefix("\\u") else {
        return false;
    };
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }
    if hex.len() < 4 {
        return true;
    }
    u16::from_str_radix(hex, 16).is_ok_and(|v| (0xD800..0xDC00).contains(&v))
}

/// Remove a complete `\uD800`-`\uDBFF` escape at the end of `out` unless
/// its backslash is itself escaped.
fn drop_trailing_high_surrogate(out: &mut String) {
    let Some(start) = out.len().checked_sub(6) else {
        return;
    };
    let Some(hex) = out.get(start..).and_then(|tail| tail.strip_prefix("\\u")) else {
        return;
    };
    let is_high = hex.chars().all(|c| c.is_ascii_hexdigit())
        && u16::from_str_radix(hex, 16).is_ok_and(|v| (0xD800..0xDC00).contains(&v));
    if !is_high {
        return;
    }
    let backslashes_before = out[..start].chars().rev().take_while(|&c| c == '\\').count();
    if backslashes_before % 2 == 0 {
        out.truncate(start);
    }
}

/// Finish or drop a bare token (number or literal) cut off at the end.
fn complete_trailing_literal(out: &mut String) {
    let token_start = out
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
        .last()
        .map(|(i, _)| i);
    let Some(start) = token_start else {
        return;
    };
    let token = out[start..].to_string();

    for literal in ["true", "false", "null"] {
        if literal.starts_with(&token) {
            out.truncate(start);
            out.push_str(literal);
            return;
        }
    }

    let mut number = token.as_str();
    while !number.is_empty() && serde_json::from_str::<serde_json::Number>(number).is_err() {
        number = &number[..number.len() - 1];
    }
    let number = number.to_string();
    out.truncate(start);
    if number.is_empty() {
        out.push_str("null");
    } else {
        out.push_str(&number);
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_pipeline_order() {
        assert_eq!(
            JsonExtractor::default().strategy_names(),
            vec!["fenced_block", "brace_span", "structural_repair", "whole_text"]
        );
    }

    #[test]
    fn fenced_block_with_language_tag() {
        let text = "Here you go:\n```json\n{\"recommendation\": \"START\"}\n```\nGood luck!";
        let got = JsonExtractor::default().extract(text).unwrap();
        assert_eq!(got.strategy, "fenced_block");
        assert_eq!(got.value, json!({"recommendation": "START"}));
    }

    #[test]
    fn brace_span_inside_prose() {
        let text = "Sure! {\"winner\": \"A\", \"advantages\": [\"volume\"]} Hope that helps.";
        let got = JsonExtractor::default().extract(text).unwrap();
        assert_eq!(got.strategy, "brace_span");
        assert_eq!(got.value["winner"], "A");
    }

    #[test]
    fn extraction_round_trips_through_prose() {
        let original = json!({
            "recommendation": "SIT",
            "conviction": "MEDIUM-LOW",
            "key_factors": ["tough matchup", "snap share down"],
            "nested": { "a": [1, 2, {"b": null}] },
        });
        let serialized = serde_json::to_string_pretty(&original).unwrap();
        for wrapped in [
            format!("Analysis follows.\n{serialized}\nEnd of analysis."),
            format!("```json\n{serialized}\n```"),
            format!("```\n{serialized}\n```"),
            serialized.clone(),
        ] {
            let got = JsonExtractor::default().extract(&wrapped).unwrap();
            assert_eq!(got.value, original, "failed for: {wrapped}");
        }
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(JsonExtractor::default().extract("[1, 2, 3]").is_none());
        assert!(JsonExtractor::default().extract("\"just a string\"").is_none());
        assert!(JsonExtractor::default().extract("no json here").is_none());
        assert!(JsonExtractor::default().extract("").is_none());
    }

    #[test]
    fn truncated_string_value_is_repaired_at_every_offset() {
        let full = r#"{"recommendation": "START", "reasoning": "Averaging 24.1 \"elite\" points\\week \uD83D\uDE00 over three weeks", "risk_level": "LOW"}"#;
        let value_start = full.find("\"Averaging").unwrap() + 1;
        let value_end = full.find(", \"risk_level\"").unwrap() - 1;

        for cut in value_start..value_end {
            let truncated = &full[..cut];
            let got = JsonExtractor::default()
                .extract(truncated)
                .unwrap_or_else(|| panic!("no object for cut {cut}: {truncated}"));
            assert_eq!(got.strategy, "structural_repair");
            assert_eq!(got.value["recommendation"], "START");
            let reasoning = got.value["reasoning"].as_str().unwrap();
            assert!(reasoning.len() <= cut - value_start);
        }
    }

    #[test]
    fn every_prefix_of_an_object_repairs() {
        let full = r#"{"a": "x", "score": -12.5e1, "ok": true, "none": null, "list": ["p", {"q": false}], "last": "z"}"#;
        let start = 1;
        for cut in start..full.len() {
            let truncated = &full[..cut];
            assert!(
                StructuralRepair.attempt(truncated).is_some(),
                "prefix failed to repair: {truncated}\nrepaired: {}",
                repair_truncated(truncated)
            );
        }
    }

    #[test]
    fn repair_handles_dangling_pieces() {
        assert_eq!(repair_truncated(r#"{"a": 1, "b"#), r#"{"a": 1, "b":null}"#);
        assert_eq!(repair_truncated(r#"{"a": 1, "b""#), r#"{"a": 1, "b":null}"#);
        assert_eq!(repair_truncated(r#"{"a": 1, "b":"#), r#"{"a": 1, "b":null}"#);
        assert_eq!(repair_truncated(r#"{"a": [1, 2,"#), r#"{"a": [1, 2]}"#);
        assert_eq!(repair_truncated(r#"{"a": "x\"#), r#"{"a": "x"}"#);
        assert_eq!(repair_truncated(r#"{"a": "x\u00"#), r#"{"a": "x"}"#);
        assert_eq!(repair_truncated(r#"{"a": "x\uD83D\"#), r#"{"a": "x"}"#);
        assert_eq!(repair_truncated(r#"{"a": "x\uD83D\uDE"#), r#"{"a": "x"}"#);
        // An escaped backslash followed by text that only looks like an escape.
        assert_eq!(repair_truncated(r#"{"a": "x\\uD83D\"#), r#"{"a": "x\\uD83D"}"#);
        assert_eq!(repair_truncated(r#"{"a": tr"#), r#"{"a": true}"#);
        assert_eq!(repair_truncated(r#"{"a": 3."#), r#"{"a": 3}"#);
    }

    #[test]
    fn repair_stops_after_outermost_close() {
        assert_eq!(repair_truncated(r#"{"a": "}"} trailing {"#), r#"{"a": "}"}"#);
    }

    #[test]
    fn truncated_inside_fence_is_repaired() {
        let text = "```json\n{\"recommendation\": \"FLEX\", \"key_factors\": [\"volume\", \"red zo";
        let got = JsonExtractor::default().extract(text).unwrap();
        assert_eq!(got.strategy, "structural_repair");
        assert_eq!(got.value["key_factors"][1], "red zo");
    }

    #[test]
    fn custom_pipeline() {
        struct AlwaysEmpty;
        impl ExtractionStrategy for AlwaysEmpty {
            fn name(&self) -> &'static str {
                "always_empty"
            }
            fn attempt(&self, _text: &str) -> Option<Value> {
                Some(json!({}))
            }
        }

        let extractor = JsonExtractor::empty().with_strategy(WholeText).with_strategy(AlwaysEmpty);
        let got = extractor.extract("not json").unwrap();
        assert_eq!(got.strategy, "always_empty");
    }
}
