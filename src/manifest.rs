//! EthPM manifest model and validation
//!
//! Validation runs in three stages, each failing with [`Error::InvalidManifest`]:
//!
//! 1. **Format**: the raw document must already be in canonical form (compact JSON
//!    with sorted keys), so the bytes that are hashed are the bytes that are parsed.
//! 2. **Schema**: required fields, field types, and naming rules.
//! 3. **Deployments**: every deployed contract type must be declared in
//!    `contract_types`.
//!
//! # Examples
//!
//! ```
//! use ethpm::manifest::validate;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let raw = r#"{"manifest_version":"2","package_name":"owned","sources":{"./Owned.sol":"contract Owned {}"},"version":"1.0.0"}"#;
//! let manifest = validate(raw)?;
//! assert_eq!(manifest.package_name, "owned");
//! # Ok(())
//! # }
//! ```

use crate::validation::is_valid_package_name;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, Serializer};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::io;

/// The only manifest version this installer understands
pub const MANIFEST_VERSION: &str = "2";

const BLOCKCHAIN_URI_SCHEME: &str = "blockchain://";

/// A validated package manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub manifest_version: String,

    pub package_name: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    /// Relative file path → inline source text or content-addressed URI
    #[serde(default)]
    pub sources: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_types: Option<BTreeMap<String, Value>>,

    /// Blockchain URI → deployment name → deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployments: Option<BTreeMap<String, BTreeMap<String, Deployment>>>,

    /// Dependency name → target URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_dependencies: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub contract_type: String,

    pub address: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Run the full validation pipeline over raw manifest text
pub fn validate(raw_manifest: &str) -> Result<Manifest> {
    let document = validate_raw_manifest_format(raw_manifest)?;
    let manifest = validate_manifest_against_schema(document)?;
    validate_manifest_deployments(&manifest)?;
    Ok(manifest)
}

/// Check that `raw_manifest` is already canonical, returning the parsed document
pub fn validate_raw_manifest_format(raw_manifest: &str) -> Result<Value> {
    let document: Value = serde_json::from_str(raw_manifest).map_err(|e| {
        Error::InvalidManifest(format!(
            "Failed to load package data. File is not a valid JSON document: {}",
            e
        ))
    })?;

    if canonical_json(&document)? != raw_manifest.as_bytes() {
        return Err(Error::InvalidManifest(
            "The manifest appears to be malformed. Manifest documents must be compact \
             JSON with sorted keys."
                .to_string(),
        ));
    }
    Ok(document)
}

/// Compact, key-sorted, ASCII-only JSON
fn canonical_json(document: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, AsciiFormatter);
    document.serialize(&mut serializer)?;
    Ok(out)
}

/// Compact formatter that writes every non-printable-ASCII character as a
/// lowercase `\uXXXX` escape (UTF-16 surrogate pairs above the BMP)
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if ch.is_ascii() && ch != '\x7f' {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..index])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units).iter() {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = index + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

pub fn validate_manifest_against_schema(document: Value) -> Result<Manifest> {
    if !document.is_object() {
        return Err(Error::InvalidManifest(
            "Manifest must be a JSON object".to_string(),
        ));
    }

    let manifest: Manifest = serde_json::from_value(document)
        .map_err(|e| Error::InvalidManifest(format!("Manifest does not match schema: {}", e)))?;

    if manifest.manifest_version != MANIFEST_VERSION {
        return Err(Error::InvalidManifest(format!(
            "Unsupported manifest_version '{}', expected '{}'",
            manifest.manifest_version, MANIFEST_VERSION
        )));
    }

    if !is_valid_package_name(&manifest.package_name) {
        return Err(Error::InvalidManifest(format!(
            "Invalid package_name '{}'",
            manifest.package_name
        )));
    }

    if manifest.version.is_empty() {
        return Err(Error::InvalidManifest("version must not be empty".to_string()));
    }

    if let Some(build_dependencies) = &manifest.build_dependencies {
        for name in build_dependencies.keys() {
            if !is_valid_package_name(name) {
                return Err(Error::InvalidManifest(format!(
                    "Invalid build dependency name '{}'",
                    name
                )));
            }
        }
    }

    if let Some(deployments) = &manifest.deployments {
        for (chain_uri, chain_deployments) in deployments {
            if !chain_uri.starts_with(BLOCKCHAIN_URI_SCHEME) {
                return Err(Error::InvalidManifest(format!(
                    "Deployment key '{}' is not a blockchain uri",
                    chain_uri
                )));
            }
            for (name, deployment) in chain_deployments {
                if !is_hex_address(&deployment.address) {
                    return Err(Error::InvalidManifest(format!(
                        "Deployment '{}' has invalid address '{}'",
                        name, deployment.address
                    )));
                }
            }
        }
    }

    Ok(manifest)
}

/// Every locally defined contract type referenced by a deployment must be declared.
///
/// Contract types of the form `<dependency>:<type>` live in build dependencies and
/// are not checked here.
pub fn validate_manifest_deployments(manifest: &Manifest) -> Result<()> {
    let (Some(contract_types), Some(deployments)) =
        (&manifest.contract_types, &manifest.deployments)
    else {
        return Ok(());
    };

    let missing: BTreeSet<&str> = deployments
        .values()
        .flat_map(|chain| chain.values())
        .map(|deployment| deployment.contract_type.as_str())
        .filter(|contract_type| !contract_type.contains(':'))
        .filter(|contract_type| !contract_types.contains_key(*contract_type))
        .collect();

    if !missing.is_empty() {
        return Err(Error::InvalidManifest(format!(
            "Manifest missing references to contracts: {}.",
            missing.into_iter().collect::<Vec<_>>().join(", ")
        )));
    }
    Ok(())
}

fn is_hex_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}
