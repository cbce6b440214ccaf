//! Plugin discovery
//!
//! Implementations come from a [`PluginCatalog`] of named factories. The
//! built-in catalog is registered first under each plugin's default keys,
//! then plugins supplied by the embedding application, then the entries of
//! an optional JSON manifest:
//!
//! ```json
//! {"plugins": [
//!   {"kind": "backend", "implementation": "s3", "keys": ["minio"],
//!    "options": {"endpoint": "http://localhost:9000"}},
//!   {"kind": "parser", "implementation": "json", "keys": ["geojson"]}
//! ]}
//! ```
//!
//! Every step goes through the registry's duplicate check, so nothing
//! registered later can shadow a built-in key.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{Backend, FileBackend, MemoryBackend};
use crate::error::{BackendError, CabinetError, DiscoveryError, ParserError, Result};
use crate::options::Options;
use crate::parser::{BinaryParser, CsvParser, JsonParser, Parser, TextParser, YamlParser};
use crate::registry::{Implementation, Kind, Registry};

pub type BackendFactory = Arc<dyn Fn(&Options) -> Result<Arc<dyn Backend>> + Send + Sync>;
pub type ParserFactory = Arc<dyn Fn(&Options) -> Result<Arc<dyn Parser>> + Send + Sync>;

/// Constructor for one implementation
#[derive(Clone)]
pub enum Factory {
    Backend(BackendFactory),
    Parser(ParserFactory),
}

impl Factory {
    pub fn kind(&self) -> Kind {
        match self {
            Factory::Backend(_) => Kind::Backend,
            Factory::Parser(_) => Kind::Parser,
        }
    }
}

/// A named implementation with its default keys
#[derive(Clone)]
pub struct Plugin {
    name: String,
    keys: Vec<String>,
    factory: Factory,
}

impl Plugin {
    pub fn backend<I, K, F>(name: impl Into<String>, keys: I, factory: F) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
        F: Fn(&Options) -> Result<Arc<dyn Backend>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            factory: Factory::Backend(Arc::new(factory)),
        }
    }

    pub fn parser<I, K, F>(name: impl Into<String>, keys: I, factory: F) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
        F: Fn(&Options) -> Result<Arc<dyn Parser>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            factory: Factory::Parser(Arc::new(factory)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Keys bound when the plugin is registered without a manifest entry
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn kind(&self) -> Kind {
        self.factory.kind()
    }

    /// Build a fresh instance
    pub fn instantiate(&self, options: &Options) -> Result<Implementation> {
        match &self.factory {
            Factory::Backend(factory) => factory(options).map(Implementation::Backend),
            Factory::Parser(factory) => factory(options).map(Implementation::Parser),
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("keys", &self.keys)
            .finish()
    }
}

/// Named plugins available to discovery, in insertion order
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    plugins: Vec<Plugin>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backends and parsers shipped with this crate
    pub fn builtin() -> Self {
        let mut plugins = vec![
            Plugin::backend("file", ["file"], |options| {
                Ok(Arc::new(file_backend(options)?) as Arc<dyn Backend>)
            }),
            Plugin::backend("memory", ["memory"], |options| {
                let backend = MemoryBackend::new();
                backend.configure(options)?;
                Ok(Arc::new(backend) as Arc<dyn Backend>)
            }),
        ];

        #[cfg(feature = "s3")]
        plugins.push(Plugin::backend("s3", ["s3"], |options| {
            let backend = crate::backend::S3Backend::new();
            if !options.is_empty() {
                backend.configure(options)?;
            }
            Ok(Arc::new(backend) as Arc<dyn Backend>)
        }));

        plugins.extend([
            stateless_parser("json", &["json"], || Arc::new(JsonParser)),
            stateless_parser("yaml", &["yaml", "yml"], || Arc::new(YamlParser)),
            stateless_parser("csv", &["csv"], || Arc::new(CsvParser)),
            stateless_parser("txt", &["txt"], || Arc::new(TextParser)),
            stateless_parser("bin", &["bin"], || Arc::new(BinaryParser)),
        ]);

        Self { plugins }
    }

    /// Add a plugin; names are unique within a catalog
    pub fn add(&mut self, plugin: Plugin) -> std::result::Result<(), DiscoveryError> {
        if self.get(plugin.name()).is_some() {
            return Err(DiscoveryError::DuplicateImplementation {
                name: plugin.name().to_string(),
            });
        }
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// `file` backend; the only construction option is `root`
fn file_backend(options: &Options) -> Result<FileBackend> {
    let mut backend = FileBackend::new();
    for (key, value) in options.iter() {
        match key {
            "root" => backend = FileBackend::with_root(value),
            other => {
                return Err(BackendError::Config(format!("unknown file option '{other}'")).into());
            }
        }
    }
    Ok(backend)
}

fn stateless_parser(
    name: &'static str,
    keys: &[&'static str],
    make: fn() -> Arc<dyn Parser>,
) -> Plugin {
    Plugin::parser(name, keys.iter().copied(), move |options| {
        if let Some((key, _)) = options.iter().next() {
            return Err(ParserError::options(name, format!("unknown option '{key}'")).into());
        }
        Ok(make())
    })
}

/// One manifest line: bind `implementation` to `keys`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    pub kind: Kind,
    pub implementation: String,
    pub keys: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Parsed plugin manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginManifest {
    #[serde(default)]
    pub plugins: Vec<ManifestEntry>,
}

impl PluginManifest {
    /// Read and parse a manifest file
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, DiscoveryError> {
        let path = path.as_ref();
        let manifest_error = |reason: String| DiscoveryError::Manifest {
            path: path.display().to_string(),
            reason,
        };

        let text = std::fs::read_to_string(path).map_err(|e| manifest_error(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| manifest_error(e.to_string()))
    }
}

/// Builds a [`Registry`] from the catalog, external plugins and a manifest
#[derive(Debug)]
pub struct Discovery {
    catalog: PluginCatalog,
    external: Vec<Plugin>,
    manifest: Option<PathBuf>,
}

impl Default for Discovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Discovery {
    /// Discovery over the built-in catalog
    pub fn new() -> Self {
        Self::with_catalog(PluginCatalog::builtin())
    }

    pub fn with_catalog(catalog: PluginCatalog) -> Self {
        Self {
            catalog,
            external: Vec::new(),
            manifest: None,
        }
    }

    /// Add an application plugin. It is registered under its default keys
    /// after the catalog, and manifest entries may refer to it by name.
    /// A plugin without default keys is only available to the manifest.
    pub fn with_plugin(mut self, plugin: Plugin) -> Self {
        self.external.push(plugin);
        self
    }

    /// Read manifest entries from `path` after everything else
    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest = Some(path.into());
        self
    }

    /// Register everything, in order, into a fresh registry
    pub fn discover(self) -> Result<Registry> {
        let mut registry = Registry::new();
        let mut catalog = self.catalog;

        for plugin in catalog.iter() {
            register_plugin(&mut registry, plugin)?;
        }

        for plugin in self.external {
            if !plugin.keys().is_empty() {
                register_plugin(&mut registry, &plugin)?;
            }
            catalog.add(plugin)?;
        }

        if let Some(path) = &self.manifest {
            let manifest = PluginManifest::load(path)?;
            apply_manifest(&mut registry, &catalog, &manifest)?;
            tracing::info!(
                "Loaded {} plugin entries from {}",
                manifest.plugins.len(),
                path.display()
            );
        }

        tracing::debug!(
            "Discovered protocols {:?} and extensions {:?}",
            registry.keys(Kind::Backend),
            registry.keys(Kind::Parser)
        );
        Ok(registry)
    }
}

fn register_plugin(registry: &mut Registry, plugin: &Plugin) -> Result<()> {
    let implementation = plugin.instantiate(&Options::new())?;
    registry.register(plugin.keys().iter().cloned(), implementation, plugin.kind())?;
    tracing::debug!("Loaded plugin '{}'", plugin.name());
    Ok(())
}

/// Bind every manifest entry to the catalog implementation it names
pub fn apply_manifest(
    registry: &mut Registry,
    catalog: &PluginCatalog,
    manifest: &PluginManifest,
) -> Result<()> {
    for entry in &manifest.plugins {
        let plugin = catalog.get(&entry.implementation).ok_or_else(|| {
            CabinetError::from(DiscoveryError::UnknownImplementation {
                name: entry.implementation.clone(),
            })
        })?;

        let options: Options = entry
            .options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let implementation = plugin.instantiate(&options)?;
        registry.register(entry.keys.iter().cloned(), implementation, entry.kind)?;
        tracing::info!(
            "Loaded custom plugin '{}' as {} {:?}",
            plugin.name(),
            entry.kind,
            entry.keys
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;

    #[test]
    fn test_builtin_catalog() {
        let catalog = PluginCatalog::builtin();
        assert_eq!(catalog.get("yaml").unwrap().keys(), ["yaml", "yml"]);
        assert_eq!(catalog.get("file").unwrap().kind(), Kind::Backend);
        assert!(catalog.get("pickle").is_none());
    }

    #[test]
    fn test_catalog_rejects_duplicate_names() {
        let mut catalog = PluginCatalog::new();
        let plugin = Plugin::parser("json", ["json"], |_| {
            Ok(Arc::new(JsonParser) as Arc<dyn Parser>)
        });
        catalog.add(plugin.clone()).unwrap();
        assert_eq!(
            catalog.add(plugin).unwrap_err(),
            DiscoveryError::DuplicateImplementation {
                name: "json".into()
            }
        );
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_builtin_discovery() {
        let registry = Discovery::new().discover().unwrap();
        let protocols = registry.keys(Kind::Backend);
        assert!(protocols.contains(&"file".to_string()));
        assert!(protocols.contains(&"memory".to_string()));
        assert_eq!(
            registry.keys(Kind::Parser),
            vec!["bin", "csv", "json", "txt", "yaml", "yml"]
        );
    }

    #[test]
    fn test_external_plugin_cannot_shadow_builtin() {
        let shadow = Plugin::parser("my-json", ["json"], |_| {
            Ok(Arc::new(JsonParser) as Arc<dyn Parser>)
        });
        let err = Discovery::new().with_plugin(shadow).discover().unwrap_err();
        assert!(matches!(
            err,
            CabinetError::Registry(RegistryError::Duplicate { ref key, ref owner, .. })
                if key == "json" && owner == "json"
        ));
    }

    #[test]
    fn test_manifest_entries() {
        let mut registry = Discovery::new().discover().unwrap();
        let catalog = PluginCatalog::builtin();
        let manifest: PluginManifest = serde_json::from_str(
            r#"{"plugins": [
                {"kind": "parser", "implementation": "json", "keys": ["geojson"]},
                {"kind": "backend", "implementation": "memory", "keys": ["scratch"]}
            ]}"#,
        )
        .unwrap();

        apply_manifest(&mut registry, &catalog, &manifest).unwrap();
        assert_eq!(registry.parser("geojson").unwrap().name(), "json");
        assert_eq!(registry.backend("scratch").unwrap().name(), "memory");
    }

    #[test]
    fn test_manifest_kind_mismatch() {
        let mut registry = Registry::new();
        let manifest = PluginManifest {
            plugins: vec![ManifestEntry {
                kind: Kind::Backend,
                implementation: "json".into(),
                keys: vec!["mock".into()],
                options: BTreeMap::new(),
            }],
        };

        let err =
            apply_manifest(&mut registry, &PluginCatalog::builtin(), &manifest).unwrap_err();
        assert!(matches!(
            err,
            CabinetError::Registry(RegistryError::TypeMismatch {
                expected: Kind::Backend,
                found: Kind::Parser,
                ..
            })
        ));
    }

    #[test]
    fn test_manifest_unknown_implementation() {
        let mut registry = Registry::new();
        let manifest = PluginManifest {
            plugins: vec![ManifestEntry {
                kind: Kind::Parser,
                implementation: "pickle".into(),
                keys: vec!["pkl".into()],
                options: BTreeMap::new(),
            }],
        };

        let err =
            apply_manifest(&mut registry, &PluginCatalog::builtin(), &manifest).unwrap_err();
        match err {
            CabinetError::Discovery(DiscoveryError::UnknownImplementation { name }) => {
                assert_eq!(name, "pickle")
            }
            other => panic!("Expected UnknownImplementation, got {other:?}"),
        }
    }

    #[test]
    fn test_construction_options_are_checked() {
        let catalog = PluginCatalog::builtin();
        let json = catalog.get("json").unwrap();
        assert!(json.instantiate(&Options::new().with("pretty", "true")).is_err());

        let file = catalog.get("file").unwrap();
        assert!(file.instantiate(&Options::new().with("root", "/tmp")).is_ok());
        assert!(file.instantiate(&Options::new().with("mode", "rw")).is_err());
    }

    #[test]
    fn test_missing_manifest_file() {
        let err = Discovery::new()
            .with_manifest("/nonexistent/plugins.json")
            .discover()
            .unwrap_err();
        assert!(matches!(
            err,
            CabinetError::Discovery(DiscoveryError::Manifest { .. })
        ));
    }
}
