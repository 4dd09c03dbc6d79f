//! Registry lookups backed by a local release index
//!
//! The index is a JSON document mapping registry address → package name → version →
//! manifest URI:
//!
//! ```json
//! {
//!     "0xd3CdA913deB6f67967B99D67aCDFa1712C293601": {
//!         "owned": {
//!             "1.0.0": "ipfs://QmRhJ4bvbG6Bx8dQvqUccTKBpydvfDNF4NfsdnLbaCPe7t"
//!         }
//!     }
//! }
//! ```
//!
//! Addresses are matched case-insensitively so checksummed and lowercase
//! registry URIs resolve to the same entries.

use crate::transport::RegistryBackend;
use crate::uri::RegistryUri;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// address → package name → version → manifest URI
pub type RegistryIndex = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

pub struct FileRegistryBackend {
    index_path: PathBuf,
}

impl FileRegistryBackend {
    pub fn new<P: AsRef<Path>>(index_path: P) -> Self {
        Self {
            index_path: index_path.as_ref().to_path_buf(),
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    fn load_index(&self) -> Result<RegistryIndex> {
        if !self.index_path.exists() {
            return Err(Error::Registry(format!(
                "Registry index not found at {}",
                self.index_path.display()
            )));
        }

        let content = fs::read_to_string(&self.index_path)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Registry(format!(
                "Failed to parse registry index {}: {}",
                self.index_path.display(),
                e
            ))
        })
    }
}

impl RegistryBackend for FileRegistryBackend {
    fn resolve(&self, uri: &RegistryUri) -> Result<String> {
        let version = uri.version().ok_or_else(|| {
            Error::Registry(format!(
                "{} does not name a release version. Add '?version=<version>' to the uri.",
                uri
            ))
        })?;

        let index = self.load_index()?;
        let packages = index
            .iter()
            .find(|(address, _)| address.eq_ignore_ascii_case(uri.address()))
            .map(|(_, packages)| packages)
            .ok_or_else(|| {
                Error::Registry(format!("No registry found at address {}", uri.address()))
            })?;

        let manifest_uri = packages
            .get(uri.package_name())
            .and_then(|releases| releases.get(version))
            .ok_or_else(|| {
                Error::Registry(format!(
                    "Release {}@{} not found on registry {}",
                    uri.package_name(),
                    version,
                    uri.address()
                ))
            })?;

        debug!("Registry {} resolved {} to {}", uri.address(), uri, manifest_uri);
        Ok(manifest_uri.clone())
    }
}
