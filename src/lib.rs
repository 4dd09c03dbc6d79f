//! ethpm - A resolver and installer for content-addressed EthPM packages
//!
//! Packages are referenced by URI and installed into an `ethpm_packages` directory
//! together with a lockfile recording exactly what was resolved. It provides:
//!
//! - URI dispatch across IPFS, GitHub blob, and registry URIs
//! - Content-hash verification of every fetched manifest
//! - Manifest format, schema, and deployment validation
//! - Recursive, fully staged installation of build dependencies
//! - Read-merge-write lockfile maintenance
//!
//! # Examples
//!
//! ```no_run
//! use ethpm::{Config, Installer, Package, Transport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let transport = Transport::from_config(&config)?;
//!
//! // Resolve and verify the manifest
//! let package = Package::new(
//!     "ipfs://QmRhJ4bvbG6Bx8dQvqUccTKBpydvfDNF4NfsdnLbaCPe7t",
//!     None,
//!     &transport,
//! )?;
//!
//! // Stage and install it
//! let installer = Installer::from_config("ethpm_packages", &config);
//! installer.install(&package)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`uri`] - Parse the supported URI families
//! - [`transport`] - Backend capabilities for fetching content and resolving registries
//! - [`resolver`] - Resolve target URIs into verified manifests
//! - [`manifest`] - Manifest model and validation
//! - [`package`] - A resolved, validated package
//! - [`installer`] - Stage and install packages
//! - [`lockfile`] - Manage ethpm.lock
//! - [`config`] - User configuration management
//! - [`error`] - Error types and result handling

pub mod config;
pub mod error;
pub mod github;
pub mod installer;
pub mod ipfs;
pub mod lockfile;
pub mod manifest;
pub mod package;
pub mod registry;
pub mod resolver;
pub mod transport;
pub mod uri;
pub mod validation;

pub use config::{Config, IpfsBackendKind};
pub use error::{Error, Result};
pub use installer::{
    install_package, uninstall_package, Installer, ProgressCallback, ETHPM_DIR_NAME,
};
pub use lockfile::{update_lockfile, LockEntry, Lockfile, LOCKFILE_NAME};
pub use manifest::Manifest;
pub use package::Package;
pub use transport::{BlobBackend, IpfsBackend, RegistryBackend, Transport};
pub use uri::{ContentUri, TargetUri};
