//! Structured Output Parsing
//!
//! Model replies are free text. The parsers here recover JSON payloads from
//! them in a fixed order of preference:
//!
//! 1. the trimmed reply as-is,
//! 2. the body of a markdown code fence,
//! 3. the first balanced `{...}` / `[...]` span embedded in prose,
//! 4. (lenient mode only) a light syntactic repair of that span.
//!
//! # Example
//!
//! ```rust
//! use composer_core::parsing::{JsonParser, OutputParser};
//!
//! let parser = JsonParser::new();
//! let value = parser.parse("```json\n{\"status\": \"PASS\",}\n```").unwrap();
//! assert_eq!(value["status"], "PASS");
//! ```

mod json;
mod parser;

pub use json::{extract_json_block, Decoded, JsonParser};
pub use parser::{OutputParser, ParseError, ParseResult, ParseStage, ParserConfig};
