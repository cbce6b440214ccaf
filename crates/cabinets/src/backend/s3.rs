//! S3-compatible object storage backend using the MinIO client
//!
//! Works with AWS S3, MinIO, and any S3-compatible object storage. Paths are
//! `bucket/key`; the first segment selects the bucket.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use minio::s3::{
    client::Client,
    creds::StaticProvider,
    http::BaseUrl,
    segmented_bytes::SegmentedBytes,
    types::{S3Api, ToStream},
};
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use super::{Backend, ObjectPath, list_children};
use crate::error::BackendError;
use crate::options::Options;

const DEFAULT_ENDPOINT: &str = "https://s3.amazonaws.com";
const MAX_KEY_LEN: usize = 1024;

/// Connection settings for [`S3Backend`]
#[derive(Clone, Default, PartialEq, Eq)]
pub struct S3Config {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub session_token: Option<String>,
    pub endpoint: Option<String>,
}

impl S3Config {
    /// Settings from the process environment
    ///
    /// Reads:
    /// - AWS_REGION
    /// - AWS_ACCESS_KEY_ID
    /// - AWS_SECRET_ACCESS_KEY
    /// - AWS_SESSION_TOKEN
    /// - S3_ENDPOINT_URL (for S3-compatible services like MinIO)
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| var(name).filter(|value| !value.is_empty());
        Self {
            region: var("AWS_REGION"),
            access_key: var("AWS_ACCESS_KEY_ID"),
            secret_key: var("AWS_SECRET_ACCESS_KEY"),
            session_token: var("AWS_SESSION_TOKEN"),
            endpoint: var("S3_ENDPOINT_URL"),
        }
    }

    /// Override settings with configuration options
    ///
    /// Accepts `region`, `access_key`, `secret_key`, `session_token` and
    /// `endpoint`, plus the boto-style aliases `region_name`,
    /// `aws_access_key_id`, `aws_secret_access_key`, `aws_session_token` and
    /// `endpoint_url`.
    pub fn apply(&mut self, options: &Options) -> Result<(), BackendError> {
        for (key, value) in options.iter() {
            let slot = match key {
                "region" | "region_name" => &mut self.region,
                "access_key" | "aws_access_key_id" => &mut self.access_key,
                "secret_key" | "aws_secret_access_key" => &mut self.secret_key,
                "session_token" | "aws_session_token" => &mut self.session_token,
                "endpoint" | "endpoint_url" => &mut self.endpoint,
                other => {
                    return Err(BackendError::Config(format!(
                        "unknown s3 option '{other}'"
                    )));
                }
            };
            *slot = Some(value.to_string());
        }
        Ok(())
    }

    /// Build a MinIO client; anonymous unless both keys are set
    pub fn build_client(&self) -> Result<Client, BackendError> {
        let endpoint = self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        let mut base_url = BaseUrl::from_str(endpoint)
            .map_err(|e| BackendError::Config(format!("Invalid endpoint '{endpoint}': {e}")))?;
        if let Some(region) = &self.region {
            base_url.region = region.clone();
        }

        let client = match (&self.access_key, &self.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let creds_provider = StaticProvider::new(
                    access_key,
                    secret_key,
                    self.session_token.as_deref(),
                );
                Client::new(base_url, Some(Box::new(creds_provider)), None, None)
            }
            (None, None) => Client::new(base_url, None, None, None),
            _ => {
                return Err(BackendError::Config(
                    "access key and secret key must be set together".into(),
                ));
            }
        };

        client.map_err(|e| BackendError::Config(format!("Failed to create S3 client: {e}")))
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("S3Config")
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &redacted(&self.secret_key))
            .field("session_token", &redacted(&self.session_token))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// S3-compatible storage backend
///
/// The client is built on first use and rebuilt by [`Backend::configure`].
pub struct S3Backend {
    config: RwLock<S3Config>,
    client: RwLock<Option<Client>>,
}

impl S3Backend {
    /// Backend configured from the environment; connects lazily
    pub fn new() -> Self {
        Self::with_config(S3Config::from_env())
    }

    pub fn with_config(config: S3Config) -> Self {
        Self {
            config: RwLock::new(config),
            client: RwLock::new(None),
        }
    }

    /// Current settings
    pub fn config(&self) -> Result<S3Config, BackendError> {
        self.config
            .read()
            .map(|config| config.clone())
            .map_err(poisoned)
    }

    fn client(&self) -> Result<Client, BackendError> {
        if let Some(client) = self.client.read().map_err(poisoned)?.as_ref() {
            return Ok(client.clone());
        }

        let client = self.config()?.build_client()?;
        *self.client.write().map_err(poisoned)? = Some(client.clone());
        Ok(client)
    }

    /// Validate S3 key format
    fn validate_key(key: &str) -> Result<(), BackendError> {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(BackendError::InvalidPath {
                path: key.to_string(),
                reason: format!("key must be between 1 and {MAX_KEY_LEN} characters"),
            });
        }

        if key.starts_with('/') || key.ends_with('/') {
            return Err(BackendError::InvalidPath {
                path: key.to_string(),
                reason: "key cannot start or end with '/'".into(),
            });
        }

        Ok(())
    }

    fn object(path: &str) -> Result<ObjectPath<'_>, BackendError> {
        let object = ObjectPath::object(path)?;
        Self::validate_key(object.key)?;
        Ok(object)
    }
}

impl Default for S3Backend {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let connected = self.client.read().map(|c| c.is_some()).unwrap_or(false);
        f.debug_struct("S3Backend")
            .field("config", &self.config.read().ok().map(|c| c.clone()))
            .field("connected", &connected)
            .finish()
    }
}

fn poisoned<T>(_: T) -> BackendError {
    BackendError::Internal("Lock poisoned".into())
}

/// Map a client failure, logging it with its bucket and key
fn remote_error(
    operation: &str,
    object: &ObjectPath<'_>,
    error: impl fmt::Display,
) -> BackendError {
    let message = error.to_string();
    tracing::error!(
        bucket = object.bucket,
        key = object.key,
        "S3 {} failed: {}",
        operation,
        message
    );

    if message.contains("NoSuchKey")
        || message.contains("NoSuchBucket")
        || message.contains("404")
    {
        BackendError::NotFound {
            path: format!("{}/{}", object.bucket, object.key),
        }
    } else {
        BackendError::Remote {
            bucket: object.bucket.to_string(),
            key: object.key.to_string(),
            message,
        }
    }
}

#[async_trait]
impl Backend for S3Backend {
    fn name(&self) -> &str {
        "s3"
    }

    /// Layers `options` over the current settings and rebuilds the client
    fn configure(&self, options: &Options) -> Result<(), BackendError> {
        let mut config = self.config()?;
        config.apply(options)?;
        let client = config.build_client()?;

        *self.config.write().map_err(poisoned)? = config;
        *self.client.write().map_err(poisoned)? = Some(client);

        tracing::debug!("Reconfigured S3 backend");
        Ok(())
    }

    async fn read_content(&self, path: &str, _options: &Options) -> Result<Vec<u8>, BackendError> {
        let object = Self::object(path)?;
        let client = self.client()?;

        let response = client
            .get_object(object.bucket, object.key)
            .send()
            .await
            .map_err(|e| remote_error("get", &object, e))?;

        let content = response
            .content
            .to_segmented_bytes()
            .await
            .map_err(|e| remote_error("read body of", &object, e))?;

        Ok(content.to_bytes().to_vec())
    }

    async fn create_content(
        &self,
        path: &str,
        content: Vec<u8>,
        _options: &Options,
    ) -> Result<(), BackendError> {
        let object = Self::object(path)?;
        let client = self.client()?;
        let bytes = SegmentedBytes::from(Bytes::from(content));

        client
            .put_object(object.bucket, object.key, bytes)
            .send()
            .await
            .map_err(|e| remote_error("put", &object, e))?;

        Ok(())
    }

    async fn delete_content(&self, path: &str, _options: &Options) -> Result<(), BackendError> {
        let object = Self::object(path)?;
        let client = self.client()?;

        client
            .delete_object(object.bucket, object.key)
            .send()
            .await
            .map_err(|e| remote_error("delete", &object, e))?;

        Ok(())
    }

    async fn list(&self, directory: &str, _options: &Options) -> Result<Vec<String>, BackendError> {
        let location = ObjectPath::parse(directory)?;
        let prefix = location.directory_prefix();
        let client = self.client()?;

        let mut keys = Vec::new();
        let mut stream = client
            .list_objects(location.bucket)
            .prefix(Some(prefix.clone()))
            .recursive(true)
            .to_stream()
            .await;

        while let Some(result) = stream.next().await {
            let response = result.map_err(|e| remote_error("list", &location, e))?;
            keys.extend(response.contents.into_iter().map(|entry| entry.name));
        }

        Ok(list_children(&prefix, keys))
    }
}
