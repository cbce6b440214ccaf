//! Cabinets gives one read/create/delete/list interface over several storage
//! backends, choosing the backend from the protocol of a URI and the content
//! parser from the file extension.
//!
//! ```rust,no_run
//! # async fn demo() -> cabinets::Result<()> {
//! let cabinets = cabinets::Cabinets::from_env()?;
//! let config = cabinets.read("s3://my-bucket/config/app.yml").await?;
//! cabinets.create("backup/app.json", config).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod cabinets;
pub mod config;
pub mod content;
pub mod discovery;
pub mod error;
pub mod options;
pub mod parser;
pub mod registry;
pub mod uri;

// Re-export core types
pub use backend::{Backend, FileBackend, MemoryBackend};
#[cfg(feature = "s3")]
pub use backend::{S3Backend, S3Config};
pub use cabinets::Cabinets;
pub use config::CabinetsConfig;
pub use content::Content;
pub use discovery::{Discovery, Plugin, PluginCatalog, PluginManifest};
pub use error::{
    BackendError, CabinetError, DiscoveryError, ParserError, RegistryError, Result, UriError,
};
pub use options::Options;
pub use parser::{Parser, ParserSelector};
pub use registry::{Implementation, Kind, Registry};
pub use uri::{Location, ResolvedLocation};

/// Get the library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
