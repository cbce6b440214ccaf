//! Storage backends
//!
//! Every backend implements the raw byte primitives of [`Backend`]. The
//! layered [`Backend::read`], [`Backend::create`] and [`Backend::delete`]
//! are provided once here and put the parser step around those primitives.

mod file;
mod memory;
mod object_path;
#[cfg(feature = "s3")]
mod s3;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use object_path::{ObjectPath, list_children};
#[cfg(feature = "s3")]
pub use s3::{S3Backend, S3Config};

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::content::{Content, type_name};
use crate::error::{BackendError, CabinetError, Result};
use crate::options::Options;
use crate::parser::ParserSelector;
use crate::registry::ParserRegistry;

/// Abstraction for storage backends
#[async_trait]
pub trait Backend: Send + Sync + fmt::Debug {
    /// Implementation name used in registry and error messages
    fn name(&self) -> &str;

    /// Replace backend-specific configuration
    fn configure(&self, options: &Options) -> std::result::Result<(), BackendError>;

    /// Fetch the stored bytes at `path`
    async fn read_content(
        &self,
        path: &str,
        options: &Options,
    ) -> std::result::Result<Vec<u8>, BackendError>;

    /// Store `content` at `path`, replacing what is there
    async fn create_content(
        &self,
        path: &str,
        content: Vec<u8>,
        options: &Options,
    ) -> std::result::Result<(), BackendError>;

    /// Remove whatever is stored at `path`
    async fn delete_content(
        &self,
        path: &str,
        options: &Options,
    ) -> std::result::Result<(), BackendError>;

    /// Names of the entries directly inside `directory`
    async fn list(
        &self,
        directory: &str,
        options: &Options,
    ) -> std::result::Result<Vec<String>, BackendError> {
        let _ = (directory, options);
        Err(BackendError::unsupported(self.name(), "list"))
    }

    /// Read `path` and decode it according to `parser`
    async fn read(
        &self,
        path: &str,
        parser: &ParserSelector,
        parsers: &ParserRegistry,
        options: &Options,
    ) -> Result<Content> {
        let routed = options.route();
        let raw = self.read_content(path, &routed.backend).await?;

        let content = match parser {
            ParserSelector::Raw => Content::Bytes(raw),
            ParserSelector::Default => Content::Value(parsers.load(path, &raw, &routed.parser)?),
            ParserSelector::Explicit(parser) => {
                Content::Value(parser.load_content(&raw, &routed.parser)?)
            }
        };
        Ok(content)
    }

    /// Encode `content` according to `parser` and store it at `path`
    async fn create(
        &self,
        path: &str,
        content: Content,
        parser: &ParserSelector,
        parsers: &ParserRegistry,
        options: &Options,
    ) -> Result<()> {
        let routed = options.route();

        let bytes = match (parser, content) {
            (ParserSelector::Raw, Content::Bytes(bytes)) => bytes,
            (ParserSelector::Raw, Content::Value(Value::String(text))) => text.into_bytes(),
            (ParserSelector::Raw, Content::Value(other)) => {
                return Err(CabinetError::invalid_argument(format!(
                    "raw create of '{path}' needs bytes or text, got {}",
                    type_name(&other)
                )));
            }
            (_, Content::Bytes(_)) => {
                return Err(CabinetError::invalid_argument(format!(
                    "content for '{path}' is already bytes; write it with the raw parser selector"
                )));
            }
            (ParserSelector::Default, Content::Value(value)) => {
                parsers.dump(path, &value, &routed.parser)?
            }
            (ParserSelector::Explicit(parser), Content::Value(value)) => {
                parser.dump_content(&value, &routed.parser)?
            }
        };

        self.create_content(path, bytes, &routed.backend).await?;
        Ok(())
    }

    /// Remove `path`
    async fn delete(&self, path: &str, options: &Options) -> Result<()> {
        self.delete_content(path, &options.route().backend).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParserError;
    use crate::parser::{JsonParser, Parser};
    use crate::registry::Registry;
    use serde_json::json;
    use std::sync::Arc;

    /// Wraps text in an object so tests can tell it apart from the registry's parser
    #[derive(Debug)]
    struct MockTextParser;

    impl Parser for MockTextParser {
        fn name(&self) -> &str {
            "mock-parser"
        }

        fn load_content(
            &self,
            content: &[u8],
            _options: &Options,
        ) -> std::result::Result<Value, ParserError> {
            Ok(json!({"mock-parser": String::from_utf8_lossy(content)}))
        }

        fn dump_content(
            &self,
            value: &Value,
            _options: &Options,
        ) -> std::result::Result<Vec<u8>, ParserError> {
            Ok(value["mock-parser"].as_str().unwrap_or_default().as_bytes().to_vec())
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register_parser(["json"], Arc::new(JsonParser))
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_read_with_each_selector() {
        let registry = registry();
        let backend = MemoryBackend::new();
        backend
            .create_content("b/sample.json", br#"{"hello":"world"}"#.to_vec(), &Options::new())
            .await
            .unwrap();

        let parsed = backend
            .read("b/sample.json", &ParserSelector::Default, registry.parsers(), &Options::new())
            .await
            .unwrap();
        assert_eq!(parsed, Content::Value(json!({"hello": "world"})));

        let raw = backend
            .read("b/sample.json", &ParserSelector::Raw, registry.parsers(), &Options::new())
            .await
            .unwrap();
        assert_eq!(raw, Content::Bytes(br#"{"hello":"world"}"#.to_vec()));

        let custom = backend
            .read(
                "b/sample.json",
                &ParserSelector::explicit(MockTextParser),
                registry.parsers(),
                &Options::new(),
            )
            .await
            .unwrap();
        assert_eq!(
            custom,
            Content::Value(json!({"mock-parser": r#"{"hello":"world"}"#}))
        );
    }

    #[tokio::test]
    async fn test_explicit_parser_bypasses_extension_lookup() {
        let registry = registry();
        let backend = MemoryBackend::new();
        backend
            .create(
                "b/notes.unknown",
                json!({"mock-parser": "plain"}).into(),
                &ParserSelector::explicit(MockTextParser),
                registry.parsers(),
                &Options::new(),
            )
            .await
            .unwrap();

        let raw = backend
            .read_content("b/notes.unknown", &Options::new())
            .await
            .unwrap();
        assert_eq!(raw, b"plain");

        // The default selector has no parser for this extension
        let err = backend
            .read("b/notes.unknown", &ParserSelector::Default, registry.parsers(), &Options::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CabinetError::UnknownKey { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_mismatched_content() {
        let registry = registry();
        let backend = MemoryBackend::new();

        let err = backend
            .create(
                "b/a.json",
                Content::Bytes(b"{}".to_vec()),
                &ParserSelector::Default,
                registry.parsers(),
                &Options::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CabinetError::InvalidArgument(_)));

        let err = backend
            .create(
                "b/a.json",
                json!({"a": 1}).into(),
                &ParserSelector::Raw,
                registry.parsers(),
                &Options::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CabinetError::InvalidArgument(_)));
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_raw_create_accepts_text() {
        let registry = registry();
        let backend = MemoryBackend::new();
        backend
            .create(
                "b/hello.txt",
                "hello".into(),
                &ParserSelector::Raw,
                registry.parsers(),
                &Options::new(),
            )
            .await
            .unwrap();
        assert_eq!(
            backend.read_content("b/hello.txt", &Options::new()).await.unwrap(),
            b"hello"
        );
    }

    #[tokio::test]
    async fn test_parser_options_are_routed() {
        let registry = registry();
        let backend = MemoryBackend::new();
        let options = Options::new().with("parser.pretty", "true");
        backend
            .create(
                "b/pretty.json",
                json!({"a": 1}).into(),
                &ParserSelector::Default,
                registry.parsers(),
                &options,
            )
            .await
            .unwrap();
        assert_eq!(
            backend.read_content("b/pretty.json", &Options::new()).await.unwrap(),
            b"{\n  \"a\": 1\n}"
        );
    }

    #[derive(Debug)]
    struct WriteOnly;

    #[async_trait]
    impl Backend for WriteOnly {
        fn name(&self) -> &str {
            "write-only"
        }

        fn configure(&self, _options: &Options) -> std::result::Result<(), BackendError> {
            Ok(())
        }

        async fn read_content(
            &self,
            path: &str,
            _options: &Options,
        ) -> std::result::Result<Vec<u8>, BackendError> {
            Err(BackendError::NotFound { path: path.into() })
        }

        async fn create_content(
            &self,
            _path: &str,
            _content: Vec<u8>,
            _options: &Options,
        ) -> std::result::Result<(), BackendError> {
            Ok(())
        }

        async fn delete_content(
            &self,
            _path: &str,
            _options: &Options,
        ) -> std::result::Result<(), BackendError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_list_is_optional() {
        let err = WriteOnly.list("anything", &Options::new()).await.unwrap_err();
        match err {
            BackendError::Unsupported { backend, operation } => {
                assert_eq!(backend, "write-only");
                assert_eq!(operation, "list");
            }
            other => panic!("Expected Unsupported, got {other:?}"),
        }
    }
}
