use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::backend::Backend;
use crate::config::CabinetsConfig;
use crate::content::Content;
use crate::discovery::Discovery;
use crate::error::{CabinetError, ParserError, Result};
use crate::options::Options;
use crate::parser::{Parser, ParserSelector, extension};
use crate::registry::Registry;
use crate::uri::{self, DEFAULT_PROTOCOL, Location, ResolvedLocation};

/// Entry point: resolves locations and dispatches to backends and parsers
///
/// ```rust,no_run
/// # async fn demo() -> cabinets::Result<()> {
/// use cabinets::Cabinets;
/// use serde_json::json;
///
/// let cabinets = Cabinets::builtin()?;
/// cabinets.create("/tmp/hello.json", json!({"hello": "world"})).await?;
/// let content = cabinets.read("file:///tmp/hello.json").await?;
/// assert_eq!(content.as_value(), Some(&json!({"hello": "world"})));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Cabinets {
    registry: Registry,
    default_protocol: String,
}

impl Default for Cabinets {
    fn default() -> Self {
        Self::new(Registry::new())
    }
}

impl Cabinets {
    /// Wrap an existing registry
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            default_protocol: DEFAULT_PROTOCOL.to_string(),
        }
    }

    /// Protocol used for URI strings without `://`; filesystem paths stay on `file`
    pub fn with_default_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.default_protocol = protocol.into();
        self
    }

    /// Only the built-in backends and parsers
    pub fn builtin() -> Result<Self> {
        Ok(Self::new(Discovery::new().discover()?))
    }

    /// Built-ins plus whatever the environment configures
    pub fn from_env() -> Result<Self> {
        Self::from_config(CabinetsConfig::from_env()?)
    }

    pub fn from_config(config: CabinetsConfig) -> Result<Self> {
        let mut discovery = Discovery::new();
        if let Some(manifest) = config.plugin_manifest {
            discovery = discovery.with_manifest(manifest);
        }
        Ok(Self::new(discovery.discover()?).with_default_protocol(config.default_protocol))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn default_protocol(&self) -> &str {
        &self.default_protocol
    }

    pub fn register_backend<I, K>(
        &mut self,
        protocols: I,
        backend: Arc<dyn Backend>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Ok(self.registry.register_backend(protocols, backend)?)
    }

    pub fn register_parser<I, K>(
        &mut self,
        extensions: I,
        parser: Arc<dyn Parser>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Ok(self.registry.register_parser(extensions, parser)?)
    }

    /// Find the backend and backend path for `location`
    pub fn resolve<'a>(&self, location: impl Into<Location<'a>>) -> Result<ResolvedLocation> {
        uri::resolve(location, &self.registry, &self.default_protocol)
    }

    /// Parse a textual parser selector against the registered extensions
    pub fn parser_selector(&self, selector: &str) -> Result<ParserSelector> {
        ParserSelector::parse(selector, self.registry.parsers())
    }

    /// Reconfigure the backend bound to `protocol`
    pub fn set_configuration(&self, protocol: &str, options: &Options) -> Result<()> {
        self.registry.backend(protocol)?.configure(options)?;
        tracing::debug!("Reconfigured backend for protocol '{}'", protocol);
        Ok(())
    }

    // ========================================================================
    // Content operations
    // ========================================================================

    /// Read and decode by extension
    pub async fn read<'a>(&self, location: impl Into<Location<'a>>) -> Result<Content> {
        self.read_with(location, &ParserSelector::Default, &Options::new())
            .await
    }

    pub async fn read_with<'a>(
        &self,
        location: impl Into<Location<'a>>,
        parser: &ParserSelector,
        options: &Options,
    ) -> Result<Content> {
        let resolved = self.resolve(location)?;
        tracing::debug!("Reading {}://{}", resolved.protocol, resolved.path);
        resolved
            .backend
            .read(&resolved.path, parser, self.registry.parsers(), options)
            .await
    }

    /// Read, decode by extension, and deserialize into `T`
    pub async fn read_as<'a, T: DeserializeOwned>(
        &self,
        location: impl Into<Location<'a>>,
    ) -> Result<T> {
        let resolved = self.resolve(location)?;
        let content = resolved
            .backend
            .read(
                &resolved.path,
                &ParserSelector::Default,
                self.registry.parsers(),
                &Options::new(),
            )
            .await?;

        let value = content.into_value().ok_or_else(|| {
            CabinetError::invalid_argument(format!("'{}' did not decode to a value", resolved.path))
        })?;
        serde_json::from_value(value)
            .map_err(|e| ParserError::decode(extension(&resolved.path), e).into())
    }

    /// Encode by extension and store
    pub async fn create<'a>(
        &self,
        location: impl Into<Location<'a>>,
        content: impl Into<Content>,
    ) -> Result<()> {
        self.create_with(location, content, &ParserSelector::Default, &Options::new())
            .await
    }

    pub async fn create_with<'a>(
        &self,
        location: impl Into<Location<'a>>,
        content: impl Into<Content>,
        parser: &ParserSelector,
        options: &Options,
    ) -> Result<()> {
        let resolved = self.resolve(location)?;
        tracing::debug!("Creating {}://{}", resolved.protocol, resolved.path);
        resolved
            .backend
            .create(
                &resolved.path,
                content.into(),
                parser,
                self.registry.parsers(),
                options,
            )
            .await
    }

    pub async fn delete<'a>(&self, location: impl Into<Location<'a>>) -> Result<()> {
        self.delete_with(location, &Options::new()).await
    }

    pub async fn delete_with<'a>(
        &self,
        location: impl Into<Location<'a>>,
        options: &Options,
    ) -> Result<()> {
        let resolved = self.resolve(location)?;
        tracing::debug!("Deleting {}://{}", resolved.protocol, resolved.path);
        resolved.backend.delete(&resolved.path, options).await
    }

    /// Names directly inside a directory-like location
    pub async fn list<'a>(&self, location: impl Into<Location<'a>>) -> Result<Vec<String>> {
        self.list_with(location, &Options::new()).await
    }

    pub async fn list_with<'a>(
        &self,
        location: impl Into<Location<'a>>,
        options: &Options,
    ) -> Result<Vec<String>> {
        let resolved = self.resolve(location)?;
        let routed = options.route();
        Ok(resolved.backend.list(&resolved.path, &routed.backend).await?)
    }
}
