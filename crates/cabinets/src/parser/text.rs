use serde_json::Value;

use super::Parser;
use crate::error::ParserError;
use crate::options::Options;

const FORMAT: &str = "txt";

/// Supported text encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Utf8,
    Ascii,
    Latin1,
}

impl Encoding {
    fn from_options(options: &Options) -> Result<Self, ParserError> {
        match options.get("encoding").map(str::to_ascii_lowercase).as_deref() {
            None | Some("utf-8") | Some("utf8") => Ok(Encoding::Utf8),
            Some("ascii") | Some("us-ascii") => Ok(Encoding::Ascii),
            Some("latin-1") | Some("latin1") | Some("iso-8859-1") => Ok(Encoding::Latin1),
            Some(other) => Err(ParserError::options(
                FORMAT,
                format!("unsupported encoding '{other}'"),
            )),
        }
    }

    fn decode(self, content: &[u8]) -> Result<String, ParserError> {
        match self {
            Encoding::Utf8 => String::from_utf8(content.to_vec())
                .map_err(|e| ParserError::decode(FORMAT, e)),
            Encoding::Ascii => match content.iter().position(|b| !b.is_ascii()) {
                Some(at) => Err(ParserError::decode(
                    FORMAT,
                    format!("non-ASCII byte at offset {at}"),
                )),
                None => Ok(content.iter().map(|&b| b as char).collect()),
            },
            Encoding::Latin1 => Ok(content.iter().map(|&b| b as char).collect()),
        }
    }

    fn encode(self, text: &str) -> Result<Vec<u8>, ParserError> {
        match self {
            Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
            Encoding::Ascii | Encoding::Latin1 => {
                let limit = if self == Encoding::Ascii { 0x7f } else { 0xff };
                text.chars()
                    .map(|c| {
                        u8::try_from(u32::from(c))
                            .ok()
                            .filter(|b| u32::from(*b) <= limit)
                            .ok_or_else(|| {
                                ParserError::encode(
                                    FORMAT,
                                    format!("character '{c}' is not representable"),
                                )
                            })
                    })
                    .collect()
            }
        }
    }
}

/// Plain text. Loads to a string; dumps strings as-is and any other value
/// as its JSON text. Option `encoding` is `utf-8` (default), `ascii` or
/// `latin-1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextParser;

impl Parser for TextParser {
    fn name(&self) -> &str {
        FORMAT
    }

    fn load_content(&self, content: &[u8], options: &Options) -> Result<Value, ParserError> {
        let encoding = Encoding::from_options(options)?;
        encoding.decode(content).map(Value::String)
    }

    fn dump_content(&self, value: &Value, options: &Options) -> Result<Vec<u8>, ParserError> {
        let encoding = Encoding::from_options(options)?;
        match value {
            Value::String(text) => encoding.encode(text),
            other => encoding.encode(&other.to_string()),
        }
    }
}
