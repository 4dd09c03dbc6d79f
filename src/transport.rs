//! Transport capabilities used to fetch package content
//!
//! Each URI family has its own backend trait. A [`Transport`] bundles one backend per
//! family behind shared references so it can be cloned into every package and threaded
//! through recursive installs without any global client.

use crate::config::{Config, IpfsBackendKind};
use crate::github::{validate_blob_uri_contents, GithubBlobBackend};
use crate::ipfs::IpfsHttpBackend;
use crate::registry::FileRegistryBackend;
use crate::uri::{ContentUri, GithubBlobUri, IpfsUri, RegistryUri};
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// Fetches raw bytes from content-addressed storage
pub trait IpfsBackend: Send + Sync {
    fn fetch_uri_contents(&self, uri: &IpfsUri) -> Result<Vec<u8>>;
}

/// Fetches raw bytes of a git blob
pub trait BlobBackend: Send + Sync {
    fn fetch_uri_contents(&self, uri: &GithubBlobUri) -> Result<Vec<u8>>;
}

/// Looks up the manifest URI published for a registry release
pub trait RegistryBackend: Send + Sync {
    fn resolve(&self, uri: &RegistryUri) -> Result<String>;
}

#[derive(Clone)]
pub struct Transport {
    ipfs: Arc<dyn IpfsBackend>,
    blob: Arc<dyn BlobBackend>,
    registry: Arc<dyn RegistryBackend>,
}

impl Transport {
    pub fn new(
        ipfs: Arc<dyn IpfsBackend>,
        blob: Arc<dyn BlobBackend>,
        registry: Arc<dyn RegistryBackend>,
    ) -> Self {
        Self {
            ipfs,
            blob,
            registry,
        }
    }

    /// Build the transport described by the user configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let ipfs = match (&config.ipfs.url, config.ipfs.backend) {
            (Some(url), _) => IpfsHttpBackend::new(url.clone())?,
            (None, IpfsBackendKind::Infura) => IpfsHttpBackend::infura()?,
            (None, IpfsBackendKind::Local) => IpfsHttpBackend::local()?,
        };
        let blob = GithubBlobBackend::new(config.github.api_url.clone(), config.github.token.clone())?;
        let registry = FileRegistryBackend::new(config.registry.resolved_index_path());

        Ok(Self::new(Arc::new(ipfs), Arc::new(blob), Arc::new(registry)))
    }

    /// Fetch the bytes behind a content URI.
    ///
    /// Blob contents are always checked against the blob SHA in the URI. IPFS contents
    /// are returned as served; use [`crate::resolver::verify_content`] to check them.
    pub fn fetch(&self, uri: &ContentUri) -> Result<Vec<u8>> {
        match uri {
            ContentUri::Ipfs(ipfs_uri) => self.ipfs.fetch_uri_contents(ipfs_uri),
            ContentUri::GithubBlob(blob_uri) => {
                let contents = self.blob.fetch_uri_contents(blob_uri)?;
                validate_blob_uri_contents(&contents, blob_uri)?;
                Ok(contents)
            }
        }
    }

    pub fn resolve_registry_uri(&self, uri: &RegistryUri) -> Result<String> {
        self.registry.resolve(uri)
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}
