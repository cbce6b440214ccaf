//! Key to implementation bindings for backends and parsers
//!
//! A [`Registry`] holds two independent tables: protocol keys bound to
//! [`Backend`]s and extension keys bound to [`Parser`]s. Both are instances of
//! the same [`KeyRegistry`], so duplicate and empty-key validation behaves
//! identically for either kind. Keys are never overwritten or removed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::{CabinetError, RegistryError, Result};
use crate::parser::Parser;

/// The two kinds of implementation the registry knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Backend,
    Parser,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Backend => write!(f, "backend"),
            Kind::Parser => write!(f, "parser"),
        }
    }
}

struct Binding<T: ?Sized> {
    owner: String,
    implementation: Arc<T>,
}

/// One key namespace: string keys bound to shared implementations
pub struct KeyRegistry<T: ?Sized> {
    kind: Kind,
    bindings: BTreeMap<String, Binding<T>>,
}

impl<T: ?Sized> KeyRegistry<T> {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            bindings: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Bind every key to `implementation`, named `owner` in error messages.
    ///
    /// Fails without touching the table if `keys` is empty or if any key is
    /// already bound.
    pub fn register<I, K>(
        &mut self,
        owner: &str,
        keys: I,
        implementation: Arc<T>,
    ) -> std::result::Result<(), RegistryError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            return Err(RegistryError::Empty {
                kind: self.kind,
                name: owner.to_string(),
            });
        }

        if let Some((key, existing)) = keys
            .iter()
            .find_map(|key| self.bindings.get(key).map(|b| (key, b)))
        {
            return Err(RegistryError::Duplicate {
                kind: self.kind,
                key: key.clone(),
                owner: existing.owner.clone(),
            });
        }

        for key in keys {
            tracing::debug!("Registered {} key '{}' -> {}", self.kind, key, owner);
            self.bindings.insert(
                key,
                Binding {
                    owner: owner.to_string(),
                    implementation: implementation.clone(),
                },
            );
        }
        Ok(())
    }

    /// Look up the implementation bound to `key`
    pub fn resolve(&self, key: &str) -> Result<&Arc<T>> {
        self.get(key).ok_or_else(|| CabinetError::UnknownKey {
            kind: self.kind,
            key: key.to_string(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Arc<T>> {
        self.bindings.get(key).map(|b| &b.implementation)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.bindings.contains_key(key)
    }

    /// Name of the implementation bound to `key`
    pub fn owner(&self, key: &str) -> Option<&str> {
        self.bindings.get(key).map(|b| b.owner.as_str())
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<T: ?Sized> fmt::Debug for KeyRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.bindings.iter().map(|(k, b)| (k, &b.owner)))
            .finish()
    }
}

pub type BackendRegistry = KeyRegistry<dyn Backend>;
pub type ParserRegistry = KeyRegistry<dyn Parser>;

/// A backend or parser whose kind is only known at runtime
#[derive(Debug, Clone)]
pub enum Implementation {
    Backend(Arc<dyn Backend>),
    Parser(Arc<dyn Parser>),
}

impl Implementation {
    pub fn kind(&self) -> Kind {
        match self {
            Implementation::Backend(_) => Kind::Backend,
            Implementation::Parser(_) => Kind::Parser,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Implementation::Backend(backend) => backend.name(),
            Implementation::Parser(parser) => parser.name(),
        }
    }
}

/// Protocol and extension tables
#[derive(Debug)]
pub struct Registry {
    backends: BackendRegistry,
    parsers: ParserRegistry,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a registry with both tables empty
    pub fn new() -> Self {
        Self {
            backends: KeyRegistry::new(Kind::Backend),
            parsers: KeyRegistry::new(Kind::Parser),
        }
    }

    /// Register an implementation whose kind is checked at runtime.
    ///
    /// `kind` is the table the caller expects to populate; an implementation
    /// of the other kind fails with [`RegistryError::TypeMismatch`] before
    /// any key is looked at.
    pub fn register<I, K>(
        &mut self,
        keys: I,
        implementation: Implementation,
        kind: Kind,
    ) -> std::result::Result<(), RegistryError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        if implementation.kind() != kind {
            return Err(RegistryError::TypeMismatch {
                name: implementation.name().to_string(),
                expected: kind,
                found: implementation.kind(),
            });
        }

        match implementation {
            Implementation::Backend(backend) => self.register_backend(keys, backend),
            Implementation::Parser(parser) => self.register_parser(keys, parser),
        }
    }

    pub fn register_backend<I, K>(
        &mut self,
        protocols: I,
        backend: Arc<dyn Backend>,
    ) -> std::result::Result<(), RegistryError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let owner = backend.name().to_string();
        self.backends.register(&owner, protocols, backend)
    }

    pub fn register_parser<I, K>(
        &mut self,
        extensions: I,
        parser: Arc<dyn Parser>,
    ) -> std::result::Result<(), RegistryError>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let owner = parser.name().to_string();
        self.parsers.register(&owner, extensions, parser)
    }

    /// Backend bound to `protocol`
    pub fn backend(&self, protocol: &str) -> Result<&Arc<dyn Backend>> {
        self.backends.resolve(protocol)
    }

    /// Parser bound to `extension`
    pub fn parser(&self, extension: &str) -> Result<&Arc<dyn Parser>> {
        self.parsers.resolve(extension)
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    /// Sorted keys of one table
    pub fn keys(&self, kind: Kind) -> Vec<String> {
        match kind {
            Kind::Backend => self.backends.keys().map(str::to_string).collect(),
            Kind::Parser => self.parsers.keys().map(str::to_string).collect(),
        }
    }
}
