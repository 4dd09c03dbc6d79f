//! GitHub blob transport
//!
//! Blob URIs point at the git data API, which returns the blob base64 encoded inside
//! a JSON document. The blob SHA in the URI is the git object id of the contents, so
//! the fetched bytes can be checked without trusting the server.

use crate::transport::BlobBackend;
use crate::uri::{GithubBlobUri, GITHUB_API_AUTHORITY};
use crate::{Error, Result};
use base64::Engine;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::debug;

/// Git object id of a blob: `sha1("blob <len>\0" + contents)`
pub fn git_blob_hash(contents: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", contents.len()).as_bytes());
    hasher.update(contents);
    hex::encode(hasher.finalize())
}

/// Check that `contents` hash to the blob SHA embedded in `uri`
pub fn validate_blob_uri_contents(contents: &[u8], uri: &GithubBlobUri) -> Result<()> {
    let actual = git_blob_hash(contents);
    if actual != uri.blob_sha() {
        return Err(Error::IntegrityMismatch {
            uri: uri.to_string(),
            expected: uri.blob_sha().to_string(),
            actual,
        });
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

pub struct GithubBlobBackend {
    api_url: String,
    client: reqwest::blocking::Client,
    token: Option<String>,
}

impl GithubBlobBackend {
    /// Create a backend; requests for blob URIs are sent to `api_url` instead of
    /// `https://api.github.com` (useful for enterprise mirrors).
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("ethpm/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client,
            token,
        })
    }

    fn request_url(&self, uri: &GithubBlobUri) -> String {
        let path = uri
            .as_str()
            .split_once(GITHUB_API_AUTHORITY)
            .map(|(_, path)| path)
            .unwrap_or_default();
        format!("{}{}", self.api_url, path)
    }
}

impl BlobBackend for GithubBlobBackend {
    fn fetch_uri_contents(&self, uri: &GithubBlobUri) -> Result<Vec<u8>> {
        let url = self.request_url(uri);
        debug!("Fetching blob {} from {}", uri.blob_sha(), url);

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .map_err(|e| Error::Transport(format!("Failed to fetch {}: {}", uri, e)))?;

        let status = response.status();
        if status == 404 {
            return Err(Error::Transport(format!("Blob not found at {}", uri)));
        }
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "GitHub returned HTTP {} for {}",
                status.as_u16(),
                uri
            )));
        }

        let blob: BlobResponse = response
            .json()
            .map_err(|e| Error::Transport(format!("Failed to parse blob response: {}", e)))?;

        if blob.encoding != "base64" {
            return Err(Error::Transport(format!(
                "Unsupported blob encoding '{}' for {}",
                blob.encoding, uri
            )));
        }

        // GitHub wraps base64 content at 60 columns
        let encoded: String = blob
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let contents = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| Error::Transport(format!("Invalid base64 blob content for {}: {}", uri, e)))?;

        validate_blob_uri_contents(&contents, uri)?;
        Ok(contents)
    }
}
