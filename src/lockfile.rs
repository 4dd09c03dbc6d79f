//! Lockfile reading and writing
//!
//! `ethpm.lock` records exactly what was resolved for each installed alias. It is a
//! JSON object keyed by alias, written with sorted keys, 4-space indentation and a
//! single trailing newline so that rewrites are byte-stable.
//!
//! Every update is a read-merge-write: entries for other aliases are carried over
//! untouched.
//!
//! # Examples
//!
//! ```no_run
//! use ethpm::{update_lockfile, LockEntry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let entry = LockEntry {
//!     alias: "owned".to_string(),
//!     registry_address: None,
//!     resolved_content_hash: "QmRhJ4bvbG6Bx8dQvqUccTKBpydvfDNF4NfsdnLbaCPe7t".to_string(),
//!     resolved_package_name: "owned".to_string(),
//!     resolved_uri: "ipfs://QmRhJ4bvbG6Bx8dQvqUccTKBpydvfDNF4NfsdnLbaCPe7t".to_string(),
//!     resolved_version: "1.0.0".to_string(),
//!     target_uri: "ipfs://QmRhJ4bvbG6Bx8dQvqUccTKBpydvfDNF4NfsdnLbaCPe7t".to_string(),
//! };
//! update_lockfile("ethpm_packages/ethpm.lock", "owned", &entry)?;
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// The lockfile filename
pub const LOCKFILE_NAME: &str = "ethpm.lock";

#[cfg(unix)]
const LOCKFILE_MODE: u32 = 0o644;

/// What was resolved for one alias.
///
/// Fields are declared in alphabetical order so the serialized entry has sorted keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub alias: String,
    /// Written as `null` when the package wasn't installed through a registry
    pub registry_address: Option<String>,
    pub resolved_content_hash: String,
    pub resolved_package_name: String,
    pub resolved_uri: String,
    pub resolved_version: String,
    pub target_uri: String,
}

/// Alias → lock entry.
///
/// Entries are kept as raw JSON so records written by other tools survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lockfile {
    packages: BTreeMap<String, Value>,
}

impl Lockfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a lockfile, returning `None` if it doesn't exist
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Some(Self::new()));
        }

        let document: Value = serde_json::from_str(&contents).map_err(|e| {
            Error::Other(format!("Failed to parse lockfile {}: {}", path.display(), e))
        })?;

        match document {
            Value::Object(map) => Ok(Some(Self {
                packages: map.into_iter().collect(),
            })),
            _ => Err(Error::Other(format!(
                "Failed to parse lockfile {}: expected a JSON object",
                path.display()
            ))),
        }
    }

    /// Write the lockfile, replacing any existing file in one step
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(self.to_json_string()?.as_bytes())?;

        // Temp files are created 0600; carry over the existing mode or default to 0644
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(path)
                .map(|metadata| metadata.permissions().mode() & 0o7777)
                .unwrap_or(LOCKFILE_MODE);
            file.as_file()
                .set_permissions(fs::Permissions::from_mode(mode))?;
        }

        file.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Sorted keys, 4-space indent, trailing newline
    pub fn to_json_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.packages.serialize(&mut serializer)?;

        let mut json = String::from_utf8(buffer)
            .map_err(|e| Error::Other(format!("Failed to serialize lockfile: {}", e)))?;
        json.push('\n');
        Ok(json)
    }

    /// Add or replace the entry for `alias`
    pub fn update_package(&mut self, alias: &str, entry: &LockEntry) -> Result<()> {
        self.packages
            .insert(alias.to_string(), serde_json::to_value(entry)?);
        Ok(())
    }

    pub fn remove_package(&mut self, alias: &str) -> bool {
        self.packages.remove(alias).is_some()
    }

    /// Get the entry for `alias`, if it has the expected shape
    pub fn get_package(&self, alias: &str) -> Option<LockEntry> {
        self.packages
            .get(alias)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn has_package(&self, alias: &str) -> bool {
        self.packages.contains_key(alias)
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }
}

/// Read-merge-write of a single alias into the lockfile at `path`
pub fn update_lockfile<P: AsRef<Path>>(path: P, alias: &str, entry: &LockEntry) -> Result<()> {
    let path = path.as_ref();
    let mut lockfile = Lockfile::load_from(path)?.unwrap_or_default();
    lockfile.update_package(alias, entry)?;
    lockfile.save_to(path)
}

/// Remove `alias` from the lockfile at `path`, returning whether it was present
pub fn remove_from_lockfile<P: AsRef<Path>>(path: P, alias: &str) -> Result<bool> {
    let path = path.as_ref();
    let Some(mut lockfile) = Lockfile::load_from(path)? else {
        return Ok(false);
    };

    let removed = lockfile.remove_package(alias);
    if removed {
        lockfile.save_to(path)?;
    }
    Ok(removed)
}
