//! JSON recovery from free-text model replies

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

use super::parser::{OutputParser, ParseError, ParseResult, ParseStage, ParserConfig};

static CODE_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json|JSON)?[ \t]*\n?([\s\S]*?)\n?[ \t]*```").unwrap());
static TRAILING_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",(\s*[}\]])").unwrap());
static UNQUOTED_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*):").unwrap());
static LINE_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*//[^\n]*$").unwrap());
static BLOCK_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*[\s\S]*?\*/").unwrap());

/// A decoded document plus the strategy that recovered it.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    pub value: T,
    pub stage: ParseStage,
}

/// Return the body of the first ```` ```json ```` fence, else the first plain
/// ```` ``` ```` fence, else the whole input.
///
/// This is the simple positional variant used for planner and worker
/// replies, where models reliably emit at most one fenced block.
pub fn extract_json_block(text: &str) -> &str {
    for opener in ["```json", "```"] {
        if let Some(open) = text.find(opener) {
            let start = open + opener.len();
            if let Some(len) = text[start..].find("```") {
                if len > 0 {
                    return text[start..start + len].trim();
                }
            }
        }
    }
    text
}

/// JSON parser that tries progressively looser recovery strategies.
#[derive(Debug, Clone)]
pub struct JsonParser {
    config: ParserConfig,
}

impl JsonParser {
    /// Lenient parser (all strategies)
    pub fn new() -> Self {
        Self {
            config: ParserConfig::lenient(),
        }
    }

    /// Decode plus fence/bracket extraction, never repair
    pub fn strict() -> Self {
        Self {
            config: ParserConfig::strict(),
        }
    }

    /// Decode `raw` into `T`, trying each enabled strategy in turn.
    ///
    /// # Errors
    ///
    /// `EmptyInput` for blank replies, `Decode` when JSON was found but did
    /// not fit `T`, `InvalidFormat` when no strategy produced JSON at all.
    pub fn decode<T: DeserializeOwned>(&self, raw: &str) -> ParseResult<Decoded<T>> {
        if raw.trim().is_empty() {
            return Err(ParseError::EmptyInput);
        }

        let mut shape_error: Option<String> = None;
        let mut syntax_error: Option<String> = None;

        for (stage, candidate) in self.candidates(raw) {
            match serde_json::from_str::<T>(&candidate) {
                Ok(value) => return Ok(Decoded { value, stage }),
                Err(e) if e.classify() == serde_json::error::Category::Data => {
                    shape_error.get_or_insert_with(|| e.to_string());
                }
                Err(e) => {
                    syntax_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        match (shape_error, syntax_error) {
            (Some(message), _) => Err(ParseError::Decode {
                target: short_type_name::<T>(),
                message,
            }),
            (None, Some(message)) => Err(ParseError::InvalidFormat(message)),
            (None, None) => Err(ParseError::InvalidFormat("no JSON document found".to_string())),
        }
    }

    /// Candidate documents in order of preference, deduplicated.
    fn candidates(&self, raw: &str) -> Vec<(ParseStage, String)> {
        let trimmed = raw.trim();
        let mut out: Vec<(ParseStage, String)> = vec![(ParseStage::Direct, trimmed.to_string())];

        let mut base = trimmed.to_string();
        if self.config.strip_code_fences {
            if let Some(body) = fenced_body(trimmed) {
                base = body.to_string();
                push_unique(&mut out, ParseStage::Fenced, base.clone());
            }
        }

        if self.config.extract_embedded {
            if let Some(span) = embedded_span(&base) {
                base = span.to_string();
                push_unique(&mut out, ParseStage::Extracted, base.clone());
            }
        }

        if self.config.attempt_repair {
            push_unique(&mut out, ParseStage::Repaired, repair(&base));
        }

        out
    }
}

impl Default for JsonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputParser for JsonParser {
    type Output = serde_json::Value;

    fn parse(&self, raw: &str) -> ParseResult<Self::Output> {
        self.decode::<serde_json::Value>(raw).map(|d| d.value)
    }

    fn can_parse(&self, raw: &str) -> bool {
        raw.contains('{') || raw.contains('[')
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

fn push_unique(out: &mut Vec<(ParseStage, String)>, stage: ParseStage, candidate: String) {
    if !out.iter().any(|(_, existing)| *existing == candidate) {
        out.push((stage, candidate));
    }
}

fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}

fn fenced_body(input: &str) -> Option<&str> {
    CODE_FENCE_RE
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|body| !body.is_empty())
}

/// First balanced `{...}` or `[...]` span, ignoring brackets inside strings.
fn embedded_span(input: &str) -> Option<&str> {
    let start = input.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in input[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' | '[' if !in_string => depth += 1,
            '}' | ']' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&input[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    // Unterminated: hand the tail to the repair pass.
    Some(&input[start..])
}

fn repair(input: &str) -> String {
    let mut text = BLOCK_COMMENT_RE.replace_all(input, "").into_owned();
    text = LINE_COMMENT_RE.replace_all(&text, "").into_owned();
    text = single_to_double_quotes(&text);
    text = UNQUOTED_KEY_RE
        .replace_all(&text, r#"$1"$2"$3:"#)
        .into_owned();
    text = TRAILING_COMMA_RE.replace_all(&text, "$1").into_owned();
    close_open_brackets(text)
}

fn single_to_double_quotes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_double = false;
    let mut in_single = false;
    let mut escaped = false;

    for c in input.chars() {
        if escaped {
            out.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                out.push(c);
                escaped = true;
            }
            '"' if !in_single => {
                in_double = !in_double;
                out.push(c);
            }
            '\'' if !in_double => {
                in_single = !in_single;
                out.push('"');
            }
            _ => out.push(c),
        }
    }
    out
}

fn close_open_brackets(mut text: String) -> String {
    let mut open: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => open.push('}'),
            '[' if !in_string => open.push(']'),
            '}' | ']' if !in_string => {
                open.pop();
            }
            _ => {}
        }
    }

    if in_string {
        text.push('"');
    }
    while let Some(closer) = open.pop() {
        text.push(closer);
    }
    text
}
