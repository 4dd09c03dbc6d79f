//! Input and filesystem boundary checks

use crate::installer::ETHPM_DIR_NAME;
use crate::uri::TargetUri;
use crate::{Error, Result};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

fn package_name_regex() -> &'static Regex {
    static PACKAGE_NAME: OnceLock<Regex> = OnceLock::new();
    PACKAGE_NAME.get_or_init(|| Regex::new(r"^[a-z][-a-z0-9]{0,255}$").expect("valid package name regex"))
}

/// Package names (and aliases) are lowercase, start with a letter, and contain only
/// letters, digits and dashes.
pub fn is_valid_package_name(name: &str) -> bool {
    package_name_regex().is_match(name)
}

pub fn validate_alias(alias: &str) -> Result<()> {
    if !is_valid_package_name(alias) {
        return Err(Error::InvalidAlias(alias.to_string()));
    }
    Ok(())
}

pub fn validate_target_uri(uri: &str) -> Result<()> {
    TargetUri::parse(uri).map(|_| ()).map_err(|_| {
        Error::UnsupportedUri(format!(
            "Target uri: {} not a currently supported uri. \
             Target uris must be one of: ipfs, github blob, or registry.",
            uri
        ))
    })
}

/// A user supplied install root must be an existing `ethpm_packages` directory
pub fn validate_ethpm_dir(ethpm_dir: &Path) -> Result<()> {
    let named_correctly = ethpm_dir
        .file_name()
        .is_some_and(|name| name == ETHPM_DIR_NAME);

    if !named_correctly || !ethpm_dir.is_dir() {
        return Err(Error::Other(format!(
            "--ethpm-dir must point to an existing '{}' directory.",
            ETHPM_DIR_NAME
        )));
    }
    Ok(())
}

/// Fail unless `child` lies strictly inside `parent` once `.` and `..` are resolved.
///
/// The check is lexical; it runs against staging directories the installer created
/// itself, which contain no symlinks.
pub fn validate_parent_directory(parent: &Path, child: &Path) -> Result<()> {
    let parent_normalized = normalize_path(parent);
    let child_normalized = normalize_path(child);

    if child_normalized == parent_normalized || !child_normalized.starts_with(&parent_normalized) {
        return Err(Error::PathTraversal {
            parent: parent.to_path_buf(),
            child: child.to_path_buf(),
        });
    }
    Ok(())
}

pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal =
                    matches!(normalized.components().next_back(), Some(Component::Normal(_)));
                if last_is_normal {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_package_names() {
        assert!(is_valid_package_name("owned"));
        assert!(is_valid_package_name("safe-math-lib2"));
        assert!(!is_valid_package_name("Owned"));
        assert!(!is_valid_package_name("1owned"));
        assert!(!is_valid_package_name("owned_lib"));
        assert!(!is_valid_package_name("../owned"));
        assert!(!is_valid_package_name(""));
    }

    #[test]
    fn test_validate_alias() {
        assert!(validate_alias("wallet").is_ok());
        let err = validate_alias("My Wallet").unwrap_err();
        assert!(err.to_string().contains("not a valid package name"));
    }

    #[test]
    fn test_validate_target_uri() {
        let cid = crate::ipfs::generate_file_hash(b"{}");
        assert!(validate_target_uri(&format!("ipfs://{}", cid)).is_ok());

        let err = validate_target_uri("https://example.com/owned.json").unwrap_err();
        assert!(err.to_string().contains("not a currently supported uri"));
    }

    #[test]
    fn test_validate_ethpm_dir() {
        let temp_dir = TempDir::new().unwrap();
        let ethpm_dir = temp_dir.path().join(ETHPM_DIR_NAME);
        assert!(validate_ethpm_dir(&ethpm_dir).is_err());

        std::fs::create_dir(&ethpm_dir).unwrap();
        assert!(validate_ethpm_dir(&ethpm_dir).is_ok());

        let other = temp_dir.path().join("packages");
        std::fs::create_dir(&other).unwrap();
        assert!(validate_ethpm_dir(&other).is_err());
    }

    #[test]
    fn test_validate_parent_directory() {
        let parent = Path::new("/tmp/stage/src");

        assert!(validate_parent_directory(parent, &parent.join("contracts/Owned.sol")).is_ok());
        assert!(validate_parent_directory(parent, &parent.join("./Owned.sol")).is_ok());
        assert!(validate_parent_directory(parent, &parent.join("a/../Owned.sol")).is_ok());
    }

    #[test]
    fn test_validate_parent_directory_rejects_escape() {
        let parent = Path::new("/tmp/stage/src");

        let err = validate_parent_directory(parent, &parent.join("../manifest.json")).unwrap_err();
        assert!(matches!(err, Error::PathTraversal { .. }));

        assert!(validate_parent_directory(parent, &parent.join("a/../../x")).is_err());
        assert!(validate_parent_directory(parent, &parent.join("/etc/passwd")).is_err());
        assert!(validate_parent_directory(parent, &parent.join(".")).is_err());
        assert!(validate_parent_directory(parent, Path::new("/tmp/stage/srcx/a")).is_err());
    }

    #[test]
    fn test_normalize_relative_paths() {
        assert_eq!(normalize_path(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize_path(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }
}
