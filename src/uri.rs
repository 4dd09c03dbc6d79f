//! URI classification for package targets
//!
//! Three URI families are understood:
//!
//! - IPFS storage URIs (`ipfs://Qm...`), content addressed by CIDv0
//! - GitHub blob API URIs (`https://api.github.com/repos/<owner>/<repo>/git/blobs/<sha>`),
//!   content addressed by the git blob SHA-1
//! - Registry URIs (`erc1319://<address>[:<chain id>]/<package>?version=<version>`),
//!   an indirection resolved through a package registry
//!
//! Each family is a closed variant so every resolution point matches exhaustively.

use crate::validation::is_valid_package_name;
use crate::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use url::Url;

pub const IPFS_SCHEME: &str = "ipfs";
pub const GITHUB_API_AUTHORITY: &str = "api.github.com";
pub const REGISTRY_SCHEMES: &[&str] = &["erc1319", "ethpm"];

/// Length of a base58 encoded CIDv0 (`Qm` + 44 characters)
const CID_V0_LEN: usize = 46;

/// A package target as supplied by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetUri {
    Registry(RegistryUri),
    Content(ContentUri),
}

impl TargetUri {
    /// Classify a target URI.
    ///
    /// Anything that isn't a registry URI is treated as a manifest URI directly, so an
    /// unsupported target fails with the same error as an unsupported manifest URI.
    pub fn parse(uri: &str) -> Result<Self> {
        if has_registry_scheme(uri) {
            return RegistryUri::parse(uri).map(TargetUri::Registry);
        }
        ContentUri::parse(uri).map(TargetUri::Content)
    }
}

impl fmt::Display for TargetUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetUri::Registry(uri) => fmt::Display::fmt(uri, f),
            TargetUri::Content(uri) => fmt::Display::fmt(uri, f),
        }
    }
}

/// A URI whose bytes can be verified against a hash embedded in the URI itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentUri {
    Ipfs(IpfsUri),
    GithubBlob(GithubBlobUri),
}

impl ContentUri {
    /// Parse a manifest URI, failing with [`Error::UnsupportedUri`] for unknown kinds
    pub fn parse(uri: &str) -> Result<Self> {
        Self::detect(uri).ok_or_else(|| {
            Error::UnsupportedUri(format!(
                "{} is not supported. Currently EthPM only supports \
                 IPFS & Github blob manifest uris.",
                uri
            ))
        })
    }

    /// Recognize a content-addressed URI, returning `None` for anything else
    /// (e.g. inlined source text)
    pub fn detect(uri: &str) -> Option<Self> {
        if let Some(ipfs) = IpfsUri::parse(uri) {
            return Some(ContentUri::Ipfs(ipfs));
        }
        GithubBlobUri::parse(uri).map(ContentUri::GithubBlob)
    }

    /// The hash segment embedded in the URI
    pub fn content_hash(&self) -> &str {
        match self {
            ContentUri::Ipfs(uri) => uri.cid(),
            ContentUri::GithubBlob(uri) => uri.blob_sha(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContentUri::Ipfs(uri) => uri.as_str(),
            ContentUri::GithubBlob(uri) => uri.as_str(),
        }
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `ipfs://<cid>` or `ipfs://ipfs/<cid>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpfsUri {
    uri: String,
    cid: String,
}

impl IpfsUri {
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix(IPFS_SCHEME)?.strip_prefix("://")?;
        let rest = rest.strip_prefix("ipfs/").unwrap_or(rest);
        let cid = rest.trim_matches('/');

        if !is_cid_v0(cid) {
            return None;
        }

        Some(Self {
            uri: uri.to_string(),
            cid: cid.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    pub fn cid(&self) -> &str {
        &self.cid
    }
}

impl fmt::Display for IpfsUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Check that `cid` decodes to a sha2-256 multihash
fn is_cid_v0(cid: &str) -> bool {
    if cid.len() != CID_V0_LEN || !cid.starts_with("Qm") {
        return false;
    }
    match bs58::decode(cid).into_vec() {
        Ok(bytes) => bytes.len() == 34 && bytes[0] == 0x12 && bytes[1] == 0x20,
        Err(_) => false,
    }
}

/// `https://api.github.com/repos/<owner>/<repo>/git/blobs/<sha>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubBlobUri {
    uri: String,
    owner: String,
    repo: String,
    blob_sha: String,
}

impl GithubBlobUri {
    pub fn parse(uri: &str) -> Option<Self> {
        let parsed = Url::parse(uri).ok()?;
        if parsed.scheme() != "https" || parsed.host_str() != Some(GITHUB_API_AUTHORITY) {
            return None;
        }

        let segments: Vec<&str> = parsed.path_segments()?.collect();
        match segments.as_slice() {
            ["repos", owner, repo, "git", "blobs", sha]
                if !owner.is_empty() && !repo.is_empty() && is_git_sha(sha) =>
            {
                Some(Self {
                    uri: uri.to_string(),
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    blob_sha: sha.to_ascii_lowercase(),
                })
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// The last path segment of the URI (git blob SHA-1, lowercase hex)
    pub fn blob_sha(&self) -> &str {
        &self.blob_sha
    }
}

impl fmt::Display for GithubBlobUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

fn is_git_sha(segment: &str) -> bool {
    segment.len() == 40 && segment.chars().all(|c| c.is_ascii_hexdigit())
}

/// `erc1319://<address>[:<chain id>]/<package>[?version=<version>]`
///
/// `ethpm://` is accepted as an alias scheme, and `<package>@<version>` may be used
/// in place of the `version` query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryUri {
    uri: String,
    authority: String,
    address: String,
    chain_id: Option<u64>,
    package_name: String,
    version: Option<String>,
}

impl RegistryUri {
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            Error::UnsupportedUri(format!("{} is not a valid registry uri: {}", uri, reason))
        };

        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| invalid("missing scheme"))?;
        if !REGISTRY_SCHEMES.contains(&scheme) {
            return Err(invalid("unknown scheme"));
        }

        let (authority, path_and_query) = rest.split_once('/').unwrap_or((rest, ""));
        let (address, chain_id) = match authority.split_once(':') {
            Some((address, chain)) => {
                let chain_id = chain
                    .parse::<u64>()
                    .map_err(|_| invalid("chain id must be an integer"))?;
                (address, Some(chain_id))
            }
            None => (authority, None),
        };
        if !address_regex().is_match(address) {
            return Err(invalid("authority must be a 0x-prefixed 20 byte address"));
        }

        let (path, query) = path_and_query
            .split_once('?')
            .unwrap_or((path_and_query, ""));
        let path = path.trim_matches('/');

        let query_version = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "version")
            .map(|(_, value)| value.trim_matches('/').to_string());

        let (package_name, path_version) = match path.split_once('@') {
            Some((name, version)) => (name, Some(version.to_string())),
            None => (path, None),
        };
        if !is_valid_package_name(package_name) {
            return Err(invalid("missing or invalid package name"));
        }

        let version = query_version
            .or(path_version)
            .filter(|version| !version.is_empty());

        Ok(Self {
            uri: uri.to_string(),
            authority: authority.to_string(),
            address: address.to_string(),
            chain_id,
            package_name: package_name.to_string(),
            version,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Authority component verbatim (address plus optional chain id)
    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl fmt::Display for RegistryUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Whether `uri` is addressed at IPFS or the GitHub blob API, whether or not the rest
/// of it is well formed
pub fn has_content_scheme(uri: &str) -> bool {
    match uri.split_once("://") {
        Some((IPFS_SCHEME, _)) => true,
        Some(("https", rest)) => rest.split('/').next() == Some(GITHUB_API_AUTHORITY),
        _ => false,
    }
}

pub fn has_registry_scheme(uri: &str) -> bool {
    uri.split_once("://")
        .is_some_and(|(scheme, _)| REGISTRY_SCHEMES.contains(&scheme))
}

fn address_regex() -> &'static Regex {
    static ADDRESS: OnceLock<Regex> = OnceLock::new();
    ADDRESS.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("valid address regex"))
}
