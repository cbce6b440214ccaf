use serde_json::Value;

use super::Parser;
use crate::error::ParserError;
use crate::options::Options;

/// YAML via serde_yaml, decoded into the same value model as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlParser;

impl Parser for YamlParser {
    fn name(&self) -> &str {
        "yaml"
    }

    fn load_content(&self, content: &[u8], _options: &Options) -> Result<Value, ParserError> {
        serde_yaml::from_slice(content).map_err(|e| ParserError::decode("yaml", e))
    }

    fn dump_content(&self, value: &Value, _options: &Options) -> Result<Vec<u8>, ParserError> {
        serde_yaml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| ParserError::encode("yaml", e))
    }
}
