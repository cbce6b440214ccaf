//! Splitting resource locations into a protocol and a backend path

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::Backend;
use crate::error::{CabinetError, Result, UriError};
use crate::registry::Registry;

/// Separates the protocol from the path in a URI
pub const SEPARATOR: &str = "://";

/// Protocol used for locations without a separator
pub const DEFAULT_PROTOCOL: &str = "file";

/// A resource location: a URI string or a filesystem path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location<'a> {
    Uri(Cow<'a, str>),
    Path(Cow<'a, Path>),
}

impl Location<'_> {
    /// The location as text; filesystem paths are made absolute first
    pub fn normalize(&self) -> std::result::Result<Cow<'_, str>, UriError> {
        match self {
            Location::Uri(uri) => Ok(Cow::Borrowed(uri.as_ref())),
            Location::Path(path) => {
                let display = path.display().to_string();
                if path.as_os_str().is_empty() {
                    return Err(UriError::EmptyPath { uri: display });
                }

                let absolute = std::path::absolute(path).map_err(|e| UriError::InvalidPath {
                    path: display.clone(),
                    reason: e.to_string(),
                })?;
                absolute
                    .into_os_string()
                    .into_string()
                    .map(Cow::Owned)
                    .map_err(|_| UriError::InvalidPath {
                        path: display,
                        reason: "path is not valid UTF-8".into(),
                    })
            }
        }
    }
}

impl<'a> From<&'a str> for Location<'a> {
    fn from(uri: &'a str) -> Self {
        Location::Uri(Cow::Borrowed(uri))
    }
}

impl<'a> From<&'a String> for Location<'a> {
    fn from(uri: &'a String) -> Self {
        Location::Uri(Cow::Borrowed(uri.as_str()))
    }
}

impl From<String> for Location<'static> {
    fn from(uri: String) -> Self {
        Location::Uri(Cow::Owned(uri))
    }
}

impl<'a> From<&'a Path> for Location<'a> {
    fn from(path: &'a Path) -> Self {
        Location::Path(Cow::Borrowed(path))
    }
}

impl<'a> From<&'a PathBuf> for Location<'a> {
    fn from(path: &'a PathBuf) -> Self {
        Location::Path(Cow::Borrowed(path.as_path()))
    }
}

impl From<PathBuf> for Location<'static> {
    fn from(path: PathBuf) -> Self {
        Location::Path(Cow::Owned(path))
    }
}

/// Split `uri` into `(protocol, path)`
///
/// Without a separator the whole input is a path under `default_protocol`.
/// More than one separator is an error. The path may come back empty.
pub fn split<'u>(
    uri: &'u str,
    default_protocol: &'u str,
) -> std::result::Result<(&'u str, &'u str), UriError> {
    match uri.matches(SEPARATOR).count() {
        0 => {
            tracing::debug!(
                "No protocol in '{}', using default protocol '{}'",
                uri,
                default_protocol
            );
            Ok((default_protocol, uri))
        }
        1 => Ok(uri.split_once(SEPARATOR).unwrap_or((default_protocol, uri))),
        count => Err(UriError::SeparatorCount {
            uri: uri.to_string(),
            count,
        }),
    }
}

/// A location bound to the backend that serves it
#[derive(Debug, Clone)]
pub struct ResolvedLocation {
    pub protocol: String,
    pub backend: Arc<dyn Backend>,
    pub path: String,
}

/// Resolve `location` to a registered backend and the path handed to it
///
/// `default_protocol` applies to URI strings only. A filesystem path without
/// a separator always resolves to [`DEFAULT_PROTOCOL`].
pub fn resolve<'a>(
    location: impl Into<Location<'a>>,
    registry: &Registry,
    default_protocol: &str,
) -> Result<ResolvedLocation> {
    let location = location.into();
    let default_protocol = match location {
        Location::Uri(_) => default_protocol,
        Location::Path(_) => DEFAULT_PROTOCOL,
    };
    let uri = location.normalize()?;
    let (protocol, path) = split(&uri, default_protocol)?;

    let backend = registry.backends().get(protocol).ok_or_else(|| {
        CabinetError::from(UriError::UnknownProtocol {
            protocol: protocol.to_string(),
            uri: uri.to_string(),
        })
    })?;

    if path.is_empty() {
        return Err(UriError::EmptyPath {
            uri: uri.to_string(),
        }
        .into());
    }

    Ok(ResolvedLocation {
        protocol: protocol.to_string(),
        backend: backend.clone(),
        path: path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FileBackend, MemoryBackend};

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register_backend(["file"], Arc::new(FileBackend::new()))
            .unwrap();
        registry
            .register_backend(["s3", "memory"], Arc::new(MemoryBackend::new()))
            .unwrap();
        registry
    }

    #[test]
    fn test_split() {
        assert_eq!(split("s3://bucket/key", "file").unwrap(), ("s3", "bucket/key"));
        assert_eq!(split("/tmp/a.json", "file").unwrap(), ("file", "/tmp/a.json"));
        assert_eq!(split("x://", "file").unwrap(), ("x", ""));
        assert_eq!(
            split("a://b://c", "file").unwrap_err(),
            UriError::SeparatorCount {
                uri: "a://b://c".into(),
                count: 2
            }
        );
    }

    #[test]
    fn test_resolve_protocol_and_path() {
        let registry = registry();
        let resolved = resolve("s3://bucket/sample.yml", &registry, DEFAULT_PROTOCOL).unwrap();
        assert_eq!(resolved.protocol, "s3");
        assert_eq!(resolved.path, "bucket/sample.yml");
        assert_eq!(resolved.backend.name(), "memory");

        let resolved = resolve("data/sample.json", &registry, DEFAULT_PROTOCOL).unwrap();
        assert_eq!(resolved.protocol, "file");
        assert_eq!(resolved.path, "data/sample.json");
        assert_eq!(resolved.backend.name(), "file");
    }

    #[test]
    fn test_resolve_errors() {
        let registry = registry();

        let err = resolve("ftp://host/file", &registry, DEFAULT_PROTOCOL).unwrap_err();
        match err {
            CabinetError::InvalidUri(UriError::UnknownProtocol { protocol, .. }) => {
                assert_eq!(protocol, "ftp")
            }
            other => panic!("Expected UnknownProtocol, got {other:?}"),
        }

        let err = resolve("s3://", &registry, DEFAULT_PROTOCOL).unwrap_err();
        assert!(matches!(err, CabinetError::InvalidUri(UriError::EmptyPath { .. })));

        let err = resolve("s3://a://b", &registry, DEFAULT_PROTOCOL).unwrap_err();
        assert!(matches!(
            err,
            CabinetError::InvalidUri(UriError::SeparatorCount { count: 2, .. })
        ));

        let err = resolve("", &registry, DEFAULT_PROTOCOL).unwrap_err();
        assert!(matches!(err, CabinetError::InvalidUri(UriError::EmptyPath { .. })));
    }

    #[test]
    fn test_paths_are_made_absolute() {
        let registry = registry();
        let resolved =
            resolve(Path::new("relative/data.csv"), &registry, DEFAULT_PROTOCOL).unwrap();
        assert_eq!(resolved.protocol, "file");
        assert!(Path::new(&resolved.path).is_absolute());
        assert!(resolved.path.ends_with("data.csv"));

        let err = resolve(PathBuf::new(), &registry, DEFAULT_PROTOCOL).unwrap_err();
        assert!(matches!(err, CabinetError::InvalidUri(UriError::EmptyPath { .. })));
    }

    #[test]
    fn test_custom_default_protocol() {
        let registry = registry();
        let resolved = resolve("bucket/key.txt", &registry, "memory").unwrap();
        assert_eq!(resolved.protocol, "memory");
        assert_eq!(resolved.path, "bucket/key.txt");
    }

    #[test]
    fn test_paths_ignore_custom_default_protocol() {
        let registry = registry();
        let path = std::env::temp_dir().join("local.json");

        let resolved = resolve(path.as_path(), &registry, "memory").unwrap();
        assert_eq!(resolved.protocol, "file");
        assert_eq!(resolved.backend.name(), "file");
        assert_eq!(Path::new(&resolved.path), path);
    }
}
