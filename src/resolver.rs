//! Resolution of target URIs into verified manifests
//!
//! A target URI first resolves to a manifest URI (going through the registry if
//! needed). The manifest URI is then fetched and its bytes are checked against the
//! content hash the URI promises before anything is parsed.

use crate::ipfs::generate_file_hash;
use crate::github::git_blob_hash;
use crate::manifest::{self, Manifest};
use crate::transport::Transport;
use crate::uri::{ContentUri, TargetUri};
use crate::{Error, Result};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub manifest_uri: String,
    /// Authority of the registry URI, when the target was one
    pub registry_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedManifest {
    pub raw_manifest: Vec<u8>,
    pub resolved_content_hash: String,
}

pub fn resolve_target_uri(uri: &str, transport: &Transport) -> Result<ResolvedTarget> {
    match TargetUri::parse(uri)? {
        TargetUri::Registry(registry_uri) => {
            let manifest_uri = transport.resolve_registry_uri(&registry_uri)?;
            Ok(ResolvedTarget {
                manifest_uri,
                registry_address: Some(registry_uri.authority().to_string()),
            })
        }
        TargetUri::Content(content_uri) => Ok(ResolvedTarget {
            manifest_uri: content_uri.as_str().to_string(),
            registry_address: None,
        }),
    }
}

pub fn resolve_manifest_uri(uri: &str, transport: &Transport) -> Result<ResolvedManifest> {
    let content_uri = ContentUri::parse(uri)?;
    let raw_manifest = transport.fetch(&content_uri)?;
    let resolved_content_hash = verify_content(&content_uri, &raw_manifest)?;

    debug!("Resolved {} ({} bytes)", uri, raw_manifest.len());
    Ok(ResolvedManifest {
        raw_manifest,
        resolved_content_hash,
    })
}

/// Check fetched bytes against the hash embedded in their URI, returning that hash
pub fn verify_content(uri: &ContentUri, contents: &[u8]) -> Result<String> {
    let actual = match uri {
        ContentUri::Ipfs(_) => generate_file_hash(contents),
        ContentUri::GithubBlob(_) => git_blob_hash(contents),
    };

    if actual != uri.content_hash() {
        return Err(Error::IntegrityMismatch {
            uri: uri.to_string(),
            expected: uri.content_hash().to_string(),
            actual,
        });
    }
    Ok(actual)
}

/// Decode fetched bytes as UTF-8 and drop a single trailing newline
pub fn decode_text(contents: Vec<u8>, uri: &str) -> Result<String> {
    let mut text = String::from_utf8(contents).map_err(|_| Error::InvalidUtf8(uri.to_string()))?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

pub fn process_and_validate_raw_manifest(raw_manifest: &[u8], manifest_uri: &str) -> Result<Manifest> {
    let text = decode_text(raw_manifest.to_vec(), manifest_uri)?;
    manifest::validate(&text)
}
