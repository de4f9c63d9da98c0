//! Core parser trait and error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for parsing operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Nothing to parse
    #[error("Empty input")]
    EmptyInput,

    /// No strategy produced a document
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A document was found but did not match the expected shape
    #[error("Failed to decode {target}: {message}")]
    Decode { target: String, message: String },
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Which recovery strategy produced a parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStage {
    /// The reply parsed as-is
    Direct,
    /// Parsed from inside a markdown code fence
    Fenced,
    /// Parsed from a bracket-delimited span inside prose
    Extracted,
    /// Parsed after syntactic repair
    Repaired,
}

impl ParseStage {
    /// True when the reply needed no recovery at all.
    pub fn is_strict(&self) -> bool {
        matches!(self, ParseStage::Direct)
    }
}

/// Trait for output parsers
pub trait OutputParser: Send + Sync {
    /// The output type produced by this parser
    type Output;

    /// Parse the raw output string
    fn parse(&self, raw: &str) -> ParseResult<Self::Output>;

    /// Cheap check for whether the input looks parseable
    fn can_parse(&self, raw: &str) -> bool;

    /// Get the parser name for debugging
    fn name(&self) -> &'static str;
}

/// Configuration for parser behavior
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Attempt to repair malformed input
    pub attempt_repair: bool,
    /// Look inside markdown code fences
    pub strip_code_fences: bool,
    /// Look for a bracketed span inside surrounding prose
    pub extract_embedded: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParserConfig {
    /// Decode, then fence/bracket extraction. No repair.
    pub fn strict() -> Self {
        Self {
            attempt_repair: false,
            strip_code_fences: true,
            extract_embedded: true,
        }
    }

    /// Every strategy, including repair
    pub fn lenient() -> Self {
        Self {
            attempt_repair: true,
            strip_code_fences: true,
            extract_embedded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_config_default_is_lenient() {
        let config = ParserConfig::default();
        assert!(config.attempt_repair);
        assert!(config.strip_code_fences);
        assert!(config.extract_embedded);
    }

    #[test]
    fn test_parser_config_strict() {
        let config = ParserConfig::strict();
        assert!(!config.attempt_repair);
        assert!(config.extract_embedded);
    }

    #[test]
    fn test_stage_strictness() {
        assert!(ParseStage::Direct.is_strict());
        assert!(!ParseStage::Extracted.is_strict());
    }
}
