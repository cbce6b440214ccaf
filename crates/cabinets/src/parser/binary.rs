use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::Parser;
use crate::error::ParserError;
use crate::options::Options;

const FORMAT: &str = "bin";

/// Self-describing node tree; bincode cannot encode `Value` directly
/// because it has no `deserialize_any`.
#[derive(Debug, Serialize, Deserialize)]
enum Node {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    List(Vec<Node>),
    Map(Vec<(String, Node)>),
}

impl From<&Value> for Node {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(*b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Node::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Node::Int(i)
                } else {
                    Node::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Node::Text(s.clone()),
            Value::Array(items) => Node::List(items.iter().map(Node::from).collect()),
            Value::Object(fields) => Node::Map(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Node::from(v)))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<Node> for Value {
    type Error = ParserError;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        Ok(match node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(b),
            Node::Int(i) => Value::from(i),
            Node::UInt(u) => Value::from(u),
            Node::Float(f) => Number::from_f64(f).map(Value::Number).ok_or_else(|| {
                ParserError::decode(FORMAT, format!("non-finite number {f}"))
            })?,
            Node::Text(s) => Value::String(s),
            Node::List(items) => Value::Array(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Node::Map(fields) => {
                let mut map = Map::new();
                for (key, node) in fields {
                    map.insert(key, Value::try_from(node)?);
                }
                Value::Object(map)
            }
        })
    }
}

/// Native binary object graph encoded with bincode's standard config
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryParser;

impl Parser for BinaryParser {
    fn name(&self) -> &str {
        FORMAT
    }

    fn load_content(&self, content: &[u8], _options: &Options) -> Result<Value, ParserError> {
        let (node, read): (Node, usize) =
            bincode::serde::decode_from_slice(content, bincode::config::standard())
                .map_err(|e| ParserError::decode(FORMAT, e))?;
        if read != content.len() {
            return Err(ParserError::decode(
                FORMAT,
                format!("{} trailing bytes", content.len() - read),
            ));
        }
        Value::try_from(node)
    }

    fn dump_content(&self, value: &Value, _options: &Options) -> Result<Vec<u8>, ParserError> {
        bincode::serde::encode_to_vec(Node::from(value), bincode::config::standard())
            .map_err(|e| ParserError::encode(FORMAT, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_graph_round_trip() {
        let value = json!({
            "name": "cabinet",
            "drawers": [1, -2, 3.25, null, true],
            "nested": {"empty": {}, "list": [[], ["a"]]},
            "big": u64::MAX,
            "small": i64::MIN
        });
        let bytes = BinaryParser.dump_content(&value, &Options::new()).unwrap();
        let loaded = BinaryParser.load_content(&bytes, &Options::new()).unwrap();
        assert_eq!(loaded, value);
        assert!(loaded["drawers"][0].is_u64());
        assert!(loaded["drawers"][2].is_f64());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = BinaryParser
            .dump_content(&json!("x"), &Options::new())
            .unwrap();
        bytes.push(0);
        assert!(BinaryParser.load_content(&bytes, &Options::new()).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            BinaryParser.load_content(&[0xff, 0xff, 0xff], &Options::new()),
            Err(ParserError::Decode { .. })
        ));
    }
}
