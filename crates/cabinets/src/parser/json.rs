use serde_json::Value;

use super::Parser;
use crate::error::ParserError;
use crate::options::Options;

/// JSON via serde_json. Option `pretty=true` indents the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl Parser for JsonParser {
    fn name(&self) -> &str {
        "json"
    }

    fn load_content(&self, content: &[u8], _options: &Options) -> Result<Value, ParserError> {
        serde_json::from_slice(content).map_err(|e| ParserError::decode("json", e))
    }

    fn dump_content(&self, value: &Value, options: &Options) -> Result<Vec<u8>, ParserError> {
        let pretty = options
            .flag("pretty")
            .map_err(|e| ParserError::options("json", e))?;

        let encoded = if pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        };
        encoded.map_err(|e| ParserError::encode("json", e))
    }
}
