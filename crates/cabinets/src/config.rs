//! Process configuration

use std::path::PathBuf;

use crate::error::{CabinetError, Result};
use crate::uri::{DEFAULT_PROTOCOL, SEPARATOR};

/// Environment variable naming the plugin manifest
pub const PLUGIN_MANIFEST_VAR: &str = "CABINETS_PLUGIN_MANIFEST";

/// Environment variable overriding the protocol of bare paths
pub const DEFAULT_PROTOCOL_VAR: &str = "CABINETS_DEFAULT_PROTOCOL";

/// Settings for building a [`crate::Cabinets`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CabinetsConfig {
    /// Protocol used for locations without `://`
    pub default_protocol: String,

    /// Plugin manifest scanned during discovery
    pub plugin_manifest: Option<PathBuf>,
}

impl CabinetsConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable source
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let default_protocol = var(DEFAULT_PROTOCOL_VAR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string());

        if default_protocol.contains(SEPARATOR) {
            return Err(CabinetError::Config(format!(
                "Invalid {DEFAULT_PROTOCOL_VAR} value '{default_protocol}'"
            )));
        }

        Ok(Self {
            default_protocol,
            plugin_manifest: var(PLUGIN_MANIFEST_VAR)
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

impl Default for CabinetsConfig {
    fn default() -> Self {
        Self {
            default_protocol: DEFAULT_PROTOCOL.to_string(),
            plugin_manifest: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> Result<CabinetsConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CabinetsConfig::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(from_map(&[]).unwrap(), CabinetsConfig::default());
    }

    #[test]
    fn test_reads_variables() {
        let config = from_map(&[
            (DEFAULT_PROTOCOL_VAR, "s3"),
            (PLUGIN_MANIFEST_VAR, "/etc/cabinets/plugins.json"),
        ])
        .unwrap();
        assert_eq!(config.default_protocol, "s3");
        assert_eq!(
            config.plugin_manifest,
            Some(PathBuf::from("/etc/cabinets/plugins.json"))
        );
    }

    #[test]
    fn test_blank_values_fall_back() {
        let config = from_map(&[(DEFAULT_PROTOCOL_VAR, "  "), (PLUGIN_MANIFEST_VAR, "")]).unwrap();
        assert_eq!(config, CabinetsConfig::default());
    }

    #[test]
    fn test_rejects_protocol_with_separator() {
        let err = from_map(&[(DEFAULT_PROTOCOL_VAR, "s3://")]).unwrap_err();
        assert!(matches!(err, CabinetError::Config(_)));
    }
}
