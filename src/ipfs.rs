//! IPFS content hashing and the HTTP API backend
//!
//! Content hashes are CIDv0 strings: the base58btc encoded sha2-256 multihash of the
//! file wrapped in a single dag-pb node carrying a UnixFS `File` payload. Content is
//! never chunked, so the hash matches `ipfs add` for files up to the default
//! 256 KiB chunk size.
//!
//! # Examples
//!
//! ```
//! use ethpm::ipfs::generate_file_hash;
//!
//! assert_eq!(
//!     generate_file_hash(b"hello world\n"),
//!     "QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5o"
//! );
//! ```

use crate::transport::IpfsBackend;
use crate::uri::IpfsUri;
use crate::{Error, Result};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

/// Public Infura IPFS API gateway
pub const INFURA_API_URL: &str = "https://ipfs.infura.io:5001";

/// Default API address of a locally running IPFS daemon
pub const LOCAL_API_URL: &str = "http://127.0.0.1:5001";

/// Multihash code for sha2-256
const SHA2_256_CODE: u8 = 0x12;

/// UnixFS `Data.DataType.File`
const UNIXFS_FILE: u64 = 2;

/// Compute the CIDv0 of `contents`
pub fn generate_file_hash(contents: &[u8]) -> String {
    let node = dag_pb_file_node(contents);
    let digest = Sha256::digest(&node);

    let mut multihash = Vec::with_capacity(2 + digest.len());
    multihash.push(SHA2_256_CODE);
    multihash.push(digest.len() as u8);
    multihash.extend_from_slice(&digest);

    bs58::encode(multihash).into_string()
}

/// Serialize `PBNode { Data: UnixFS { Type: File, Data: contents, filesize } }`
fn dag_pb_file_node(contents: &[u8]) -> Vec<u8> {
    let mut unixfs = Vec::with_capacity(contents.len() + 24);
    // field 1 (Type), varint
    unixfs.push(0x08);
    encode_varint(UNIXFS_FILE, &mut unixfs);
    // field 2 (Data), length delimited
    unixfs.push(0x12);
    encode_varint(contents.len() as u64, &mut unixfs);
    unixfs.extend_from_slice(contents);
    // field 3 (filesize), varint
    unixfs.push(0x18);
    encode_varint(contents.len() as u64, &mut unixfs);

    let mut node = Vec::with_capacity(unixfs.len() + 12);
    // PBNode field 1 (Data), length delimited
    node.push(0x0a);
    encode_varint(unixfs.len() as u64, &mut node);
    node.extend_from_slice(&unixfs);
    node
}

fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// IPFS backend speaking the `/api/v0/cat` HTTP API
pub struct IpfsHttpBackend {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl IpfsHttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("ethpm/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn infura() -> Result<Self> {
        Self::new(INFURA_API_URL)
    }

    pub fn local() -> Result<Self> {
        Self::new(LOCAL_API_URL)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl IpfsBackend for IpfsHttpBackend {
    fn fetch_uri_contents(&self, uri: &IpfsUri) -> Result<Vec<u8>> {
        let endpoint = Url::parse_with_params(
            &format!("{}/api/v0/cat", self.base_url),
            &[("arg", uri.cid())],
        )
        .map_err(|e| Error::Transport(format!("Invalid IPFS API url {}: {}", self.base_url, e)))?;

        debug!("Fetching {} from {}", uri, self.base_url);

        let response = self.client.post(endpoint).send().map_err(|e| {
            if e.is_connect() {
                Error::Transport(format!(
                    "Cannot connect to IPFS API at {}\n\
                     Please check that the IPFS node is running and the URL is correct.",
                    self.base_url
                ))
            } else if e.is_timeout() {
                Error::Transport(format!("IPFS request for {} timed out.", uri))
            } else {
                Error::Transport(format!("Failed to fetch {}: {}", uri, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "IPFS API returned HTTP {} for {}",
                status.as_u16(),
                uri
            )));
        }

        Ok(response.bytes()?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_file_hash_known_values() {
        assert_eq!(
            generate_file_hash(b"hello world\n"),
            "QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5o"
        );
        assert_eq!(
            generate_file_hash(b"hello world"),
            "Qmf412jQZiuVUtdgnB36FXFX7xg5V6KEbSJ4dpQuhkLyfD"
        );
    }

    #[test]
    fn test_generate_file_hash_is_cid_v0() {
        let hash = generate_file_hash(b"");
        assert_eq!(hash.len(), 46);
        assert!(hash.starts_with("Qm"));
        assert!(IpfsUri::parse(&format!("ipfs://{}", hash)).is_some());
    }

    #[test]
    fn test_encode_varint() {
        let mut out = Vec::new();
        encode_varint(1, &mut out);
        assert_eq!(out, vec![0x01]);

        out.clear();
        encode_varint(300, &mut out);
        assert_eq!(out, vec![0xac, 0x02]);
    }

    #[test]
    fn test_fetch_uri_contents() {
        let contents = b"pragma solidity ^0.4.24;\n";
        let cid = generate_file_hash(contents);

        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/api/v0/cat")
            .match_query(mockito::Matcher::UrlEncoded("arg".into(), cid.clone()))
            .with_status(200)
            .with_body(contents)
            .create();

        let backend = IpfsHttpBackend::new(server.url()).unwrap();
        let uri = IpfsUri::parse(&format!("ipfs://{}", cid)).unwrap();
        let fetched = backend.fetch_uri_contents(&uri).unwrap();

        mock.assert();
        assert_eq!(fetched, contents);
    }

    #[test]
    fn test_fetch_uri_contents_http_error() {
        let cid = generate_file_hash(b"missing");

        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/api/v0/cat")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create();

        let backend = IpfsHttpBackend::new(format!("{}/", server.url())).unwrap();
        let uri = IpfsUri::parse(&format!("ipfs://{}", cid)).unwrap();
        let err = backend.fetch_uri_contents(&uri).unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert!(err.to_string().contains("HTTP 500"));
    }
}
