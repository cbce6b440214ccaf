//! Content parsers selected by file extension
//!
//! A [`Parser`] converts between stored bytes and a [`serde_json::Value`].
//! Parsers are stateless; options arrive per call after routing (see
//! [`crate::options`]).

mod binary;
mod csv;
mod json;
mod text;
mod yaml;

pub use binary::BinaryParser;
pub use self::csv::CsvParser;
pub use json::JsonParser;
pub use text::TextParser;
pub use yaml::YamlParser;

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::{CabinetError, ParserError, Result};
use crate::options::Options;
use crate::registry::ParserRegistry;

/// Decode/encode pair for one content format
pub trait Parser: Send + Sync + fmt::Debug {
    /// Implementation name used in registry messages
    fn name(&self) -> &str;

    /// Decode stored bytes into a value
    fn load_content(
        &self,
        content: &[u8],
        options: &Options,
    ) -> std::result::Result<Value, ParserError>;

    /// Encode a value into bytes for storage
    fn dump_content(
        &self,
        value: &Value,
        options: &Options,
    ) -> std::result::Result<Vec<u8>, ParserError>;
}

/// How read/create treat content
#[derive(Debug, Clone, Default)]
pub enum ParserSelector {
    /// Pick the parser registered for the path's extension
    #[default]
    Default,
    /// No parsing: bytes in, bytes out
    Raw,
    /// Use this parser regardless of the extension
    Explicit(Arc<dyn Parser>),
}

impl ParserSelector {
    pub fn explicit(parser: impl Parser + 'static) -> Self {
        ParserSelector::Explicit(Arc::new(parser))
    }

    /// Parse a textual selector.
    ///
    /// `default`/`true` and `raw`/`none`/`false` are reserved; anything else
    /// must be a registered extension and selects that parser explicitly.
    pub fn parse(selector: &str, parsers: &ParserRegistry) -> Result<Self> {
        match selector {
            "default" | "true" => Ok(ParserSelector::Default),
            "raw" | "none" | "false" => Ok(ParserSelector::Raw),
            extension => parsers
                .get(extension)
                .cloned()
                .map(ParserSelector::Explicit)
                .ok_or_else(|| {
                    CabinetError::invalid_argument(format!(
                        "parser selector '{extension}' is not default, raw \
                         or a registered extension"
                    ))
                }),
        }
    }
}

/// Extension of `path`: the text after the final `.` of the final
/// `/`-separated segment, or "" when that segment has no `.`
pub fn extension(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    match file_name.rfind('.') {
        Some(dot) => &file_name[dot + 1..],
        None => "",
    }
}

impl ParserRegistry {
    /// Parser bound to the extension of `path`
    pub fn for_path(&self, path: &str) -> Result<&Arc<dyn Parser>> {
        self.resolve(extension(path))
    }

    /// Decode `content` with the parser matching `path`'s extension
    pub fn load(&self, path: &str, content: &[u8], options: &Options) -> Result<Value> {
        Ok(self.for_path(path)?.load_content(content, options)?)
    }

    /// Encode `value` with the parser matching `path`'s extension
    pub fn dump(&self, path: &str, value: &Value, options: &Options) -> Result<Vec<u8>> {
        Ok(self.for_path(path)?.dump_content(value, options)?)
    }
}
