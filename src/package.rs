//! A resolved, validated package and its provenance

use crate::lockfile::LockEntry;
use crate::manifest::Manifest;
use crate::resolver::{process_and_validate_raw_manifest, resolve_manifest_uri, resolve_target_uri};
use crate::transport::Transport;
use crate::Result;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Package {
    transport: Transport,
    pub target_uri: String,
    pub manifest_uri: String,
    pub registry_address: Option<String>,
    /// Exactly the bytes that were fetched and verified
    pub raw_manifest: Vec<u8>,
    pub resolved_content_hash: String,
    pub manifest: Manifest,
    pub alias: String,
}

impl Package {
    /// Resolve `target_uri`, verify the manifest it points at, and validate it.
    ///
    /// A missing or empty `alias` falls back to the manifest's `package_name`.
    pub fn new(target_uri: &str, alias: Option<&str>, transport: &Transport) -> Result<Self> {
        let resolved_target = resolve_target_uri(target_uri, transport)?;
        let resolved_manifest = resolve_manifest_uri(&resolved_target.manifest_uri, transport)?;
        let manifest = process_and_validate_raw_manifest(
            &resolved_manifest.raw_manifest,
            &resolved_target.manifest_uri,
        )?;

        let alias = match alias {
            Some(alias) if !alias.is_empty() => alias.to_string(),
            _ => manifest.package_name.clone(),
        };

        debug!(
            "Resolved {} to {}@{} as '{}'",
            target_uri, manifest.package_name, manifest.version, alias
        );

        Ok(Self {
            transport: transport.clone(),
            target_uri: target_uri.to_string(),
            manifest_uri: resolved_target.manifest_uri,
            registry_address: resolved_target.registry_address,
            raw_manifest: resolved_manifest.raw_manifest,
            resolved_content_hash: resolved_manifest.resolved_content_hash,
            manifest,
            alias,
        })
    }

    /// The transport this package was resolved with, reused for its sources and dependencies
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn lock_entry(&self) -> LockEntry {
        LockEntry {
            alias: self.alias.clone(),
            registry_address: self.registry_address.clone(),
            resolved_content_hash: self.resolved_content_hash.clone(),
            resolved_package_name: self.manifest.package_name.clone(),
            resolved_uri: self.manifest_uri.clone(),
            resolved_version: self.manifest.version.clone(),
            target_uri: self.target_uri.clone(),
        }
    }
}
