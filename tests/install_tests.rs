//! End-to-end installs against in-memory backends


use ethpm::github::git_blob_hash;
use ethpm::ipfs::generate_file_hash;
use ethpm::resolver::resolve_manifest_uri;
use ethpm::{install_package, Error, Installer, Lockfile, Package};
use serde_json::{json, Value};
use std::fs;
use test_utils::assertions::*;
use test_utils::*;

fn owned() -> ManifestBuilder {
    ManifestBuilder::new("owned", "1.0.0").source("./contracts/Owned.sol", "contract Owned {}")
}

mod integrity {
    use super::*;

    #[test]
    fn test_tampered_manifest_is_rejected() {
        let mut store = MemoryStore::new();
        let uri = store.pin_manifest(&owned());
        let tampered = ManifestBuilder::new("owned", "6.6.6").to_raw();
        store.serve_tampered(&uri, tampered.as_bytes());
        let transport = store.into_transport();

        match Package::new(&uri, None, &transport).unwrap_err() {
            Error::IntegrityMismatch {
                expected, actual, ..
            } => {
                assert_eq!(format!("ipfs://{}", expected), uri);
                assert_eq!(actual, generate_file_hash(tampered.as_bytes()));
            }
            other => panic!("expected integrity mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_tampered_blob_manifest_is_rejected() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let uri = store.push_blob("ethpm", "owned", owned().to_raw().as_bytes());
        let tampered = ManifestBuilder::new("owned", "6.6.6").to_raw();
        store.serve_tampered(&uri, tampered.as_bytes());
        let transport = store.into_transport();

        match Package::new(&uri, None, &transport).unwrap_err() {
            Error::IntegrityMismatch {
                expected, actual, ..
            } => {
                assert!(uri.ends_with(&expected));
                assert_eq!(actual, git_blob_hash(tampered.as_bytes()));
            }
            other => panic!("expected integrity mismatch, got {:?}", other),
        }
        dir_empty(&project.ethpm_dir());
    }

    #[test]
    fn test_tampered_source_is_rejected() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let source_uri = store.pin(b"contract Owned {}\n");
        store.serve_tampered(&source_uri, b"contract Stolen {}\n");
        let uri = store.pin_manifest(&ManifestBuilder::new("owned", "1.0.0").source("./Owned.sol", &source_uri));
        let transport = store.into_transport();

        let package = Package::new(&uri, None, &transport).unwrap();
        let err = install_package(&package, project.ethpm_dir(), None).unwrap_err();

        assert!(matches!(err, Error::IntegrityMismatch { .. }));
        dir_empty(&project.ethpm_dir());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut store = MemoryStore::new();
        let uri = store.pin_manifest(&owned());
        let transport = store.into_transport();

        let first = resolve_manifest_uri(&uri, &transport).unwrap();
        let second = resolve_manifest_uri(&uri, &transport).unwrap();
        assert_eq!(first, second);
    }
}

mod layout {
    use super::*;

    #[test]
    fn test_installed_tree_is_exact() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let safe_math = store.pin(b"library SafeMath {}\n");
        let blob = store.push_blob("ethpm", "owned", b"contract Claimable {}\n");
        let manifest = owned()
            .source("./contracts/lib/SafeMath.sol", &safe_math)
            .source("./contracts/Claimable.sol", &blob)
            .field("meta", json!({"license": "MIT"}));
        let uri = store.pin_manifest(&manifest);
        let transport = store.into_transport();

        let package = Package::new(&uri, None, &transport).unwrap();
        let installed = install_package(&package, project.ethpm_dir(), None).unwrap();

        assert_eq!(
            TestProject::list_files(&installed),
            vec![
                "manifest.json",
                "src/contracts/Claimable.sol",
                "src/contracts/Owned.sol",
                "src/contracts/lib/SafeMath.sol",
            ]
        );
        file_equals(&installed.join("manifest.json"), &manifest.to_raw());
        file_equals(&installed.join("src/contracts/Owned.sol"), "contract Owned {}");
        file_equals(
            &installed.join("src/contracts/lib/SafeMath.sol"),
            "library SafeMath {}",
        );
        file_equals(
            &installed.join("src/contracts/Claimable.sol"),
            "contract Claimable {}",
        );
    }

    #[test]
    fn test_alias_names_install_directory() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let uri = store.pin_manifest(&owned());
        let transport = store.into_transport();

        let package = Package::new(&uri, Some("my-owned"), &transport).unwrap();
        install_package(&package, project.ethpm_dir(), None).unwrap();

        dir_exists(&project.ethpm_dir().join("my-owned"));
        dir_not_exists(&project.ethpm_dir().join("owned"));

        let lockfile = Lockfile::load_from(project.lockfile_path()).unwrap().unwrap();
        let entry = lockfile.get_package("my-owned").unwrap();
        assert_eq!(entry.alias, "my-owned");
        assert_eq!(entry.resolved_package_name, "owned");
    }

    #[test]
    fn test_source_traversal_leaves_root_untouched() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let uri = store.pin_manifest(
            &ManifestBuilder::new("owned", "1.0.0")
                .source("./Owned.sol", "contract Owned {}")
                .source("../../../pwned.sol", "contract Pwned {}"),
        );
        let transport = store.into_transport();

        let package = Package::new(&uri, None, &transport).unwrap();
        let err = install_package(&package, project.ethpm_dir(), None).unwrap_err();

        assert!(matches!(err, Error::PathTraversal { .. }));
        dir_empty(&project.ethpm_dir());
        assert!(!project.path().join("pwned.sol").exists());
    }
}

mod lockfile {
    use super::*;

    #[test]
    fn test_lockfile_records_resolution() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let uri = store.pin_manifest(&owned());
        let transport = store.into_transport();

        let package = Package::new(&uri, None, &transport).unwrap();
        install_package(&package, project.ethpm_dir(), None).unwrap();

        let expected = format!(
            r#"{{
    "owned": {{
        "alias": "owned",
        "registry_address": null,
        "resolved_content_hash": "{hash}",
        "resolved_package_name": "owned",
        "resolved_uri": "{uri}",
        "resolved_version": "1.0.0",
        "target_uri": "{uri}"
    }}
}}
"#,
            hash = package.resolved_content_hash,
            uri = uri
        );
        assert_eq!(project.read_lockfile(), expected);
    }

    #[test]
    fn test_lockfile_records_blob_resolution() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let raw = owned().to_raw();
        let uri = store.push_blob("ethpm", "owned", raw.as_bytes());
        let transport = store.into_transport();

        let package = Package::new(&uri, None, &transport).unwrap();
        let installed = install_package(&package, project.ethpm_dir(), None).unwrap();

        let sha = git_blob_hash(raw.as_bytes());
        assert_eq!(package.resolved_content_hash, sha);
        file_equals(&installed.join("manifest.json"), &raw);

        let lockfile: Value = serde_json::from_str(&project.read_lockfile()).unwrap();
        let entry = &lockfile["owned"];
        assert_eq!(entry["resolved_content_hash"], sha.as_str());
        assert_eq!(entry["resolved_uri"], uri.as_str());
        assert_eq!(entry["target_uri"], uri.as_str());
        assert_eq!(entry["registry_address"], Value::Null);
    }

    #[test]
    fn test_second_install_preserves_first_entry() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let a = store.pin_manifest(&owned());
        let b = store.pin_manifest(&ManifestBuilder::new("wallet", "2.0.0"));
        let transport = store.into_transport();

        install_package(&Package::new(&a, Some("a"), &transport).unwrap(), project.ethpm_dir(), None)
            .unwrap();
        let before: Value = serde_json::from_str(&project.read_lockfile()).unwrap();
        let a_before = serde_json::to_string(&before["a"]).unwrap();

        install_package(&Package::new(&b, Some("b"), &transport).unwrap(), project.ethpm_dir(), None)
            .unwrap();
        let after: Value = serde_json::from_str(&project.read_lockfile()).unwrap();

        assert_eq!(serde_json::to_string(&after["a"]).unwrap(), a_before);
        assert_eq!(after["b"]["resolved_package_name"], "wallet");
        assert_eq!(after.as_object().unwrap().len(), 2);
    }
}

mod conflicts {
    use super::*;

    #[test]
    fn test_existing_alias_is_not_touched() {
        let project = TestProject::new();
        let existing = project.ethpm_dir().join("owned");
        fs::create_dir_all(existing.join("src")).unwrap();
        fs::write(existing.join("src/Owned.sol"), "local edits").unwrap();

        let mut store = MemoryStore::new();
        let uri = store.pin_manifest(&owned());
        let transport = store.into_transport();

        let package = Package::new(&uri, None, &transport).unwrap();
        let err = install_package(&package, project.ethpm_dir(), None).unwrap_err();

        match &err {
            Error::InstallConflict {
                package_name,
                alias,
                path,
            } => {
                assert_eq!(package_name, "owned");
                assert_eq!(alias, "owned");
                assert_eq!(path, &existing);
            }
            other => panic!("expected install conflict, got {:?}", other),
        }
        assert_eq!(TestProject::list_files(&existing), vec!["src/Owned.sol"]);
        file_equals(&existing.join("src/Owned.sol"), "local edits");
        assert!(!project.lockfile_path().exists());
    }

    #[test]
    fn test_reinstall_conflicts() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let uri = store.pin_manifest(&owned());
        let transport = store.into_transport();

        let package = Package::new(&uri, None, &transport).unwrap();
        install_package(&package, project.ethpm_dir(), None).unwrap();
        let lockfile = project.read_lockfile();

        let err = install_package(&package, project.ethpm_dir(), None).unwrap_err();
        assert!(matches!(err, Error::InstallConflict { .. }));
        assert_eq!(project.read_lockfile(), lockfile);
    }
}

mod build_dependencies {
    use super::*;

    #[test]
    fn test_dependency_installed_under_nested_root() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let dep_uri = store.pin_manifest(
            &ManifestBuilder::new("safe-math-lib", "1.0.0")
                .source("./contracts/SafeMathLib.sol", "library SafeMathLib {}"),
        );
        let uri = store.pin_manifest(
            &ManifestBuilder::new("wallet", "1.0.0")
                .source("./contracts/Wallet.sol", "contract Wallet {}")
                .dependency("dep", &dep_uri),
        );
        let transport = store.into_transport();

        let package = Package::new(&uri, None, &transport).unwrap();
        let installed = install_package(&package, project.ethpm_dir(), None).unwrap();

        assert_eq!(
            TestProject::list_files(&installed),
            vec![
                "ethpm_packages/dep/manifest.json",
                "ethpm_packages/dep/src/contracts/SafeMathLib.sol",
                "ethpm_packages/ethpm.lock",
                "manifest.json",
                "src/contracts/Wallet.sol",
            ]
        );

        let nested = Lockfile::load_from(installed.join("ethpm_packages/ethpm.lock"))
            .unwrap()
            .unwrap();
        assert_eq!(nested.package_count(), 1);
        let entry = nested.get_package("dep").unwrap();
        assert_eq!(entry.resolved_package_name, "safe-math-lib");
        assert_eq!(entry.target_uri, dep_uri);

        let top = Lockfile::load_from(project.lockfile_path()).unwrap().unwrap();
        assert!(top.has_package("wallet"));
        assert!(!top.has_package("dep"));
    }

    #[test]
    fn test_transitive_dependencies_recurse() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let leaf = store.pin_manifest(&ManifestBuilder::new("leaf", "1.0.0").source("./Leaf.sol", "leaf"));
        let middle = store.pin_manifest(&ManifestBuilder::new("middle", "1.0.0").dependency("leaf", &leaf));
        let root = store.pin_manifest(&ManifestBuilder::new("root", "1.0.0").dependency("middle", &middle));
        let transport = store.into_transport();

        let package = Package::new(&root, None, &transport).unwrap();
        let installed = install_package(&package, project.ethpm_dir(), None).unwrap();

        let leaf_dir = installed.join("ethpm_packages/middle/ethpm_packages/leaf");
        file_equals(&leaf_dir.join("src/Leaf.sol"), "leaf");
        file_contains(
            &installed.join("ethpm_packages/middle/ethpm_packages/ethpm.lock"),
            "\"leaf\"",
        );
        file_contains(&installed.join("ethpm_packages/ethpm.lock"), "\"middle\"");
    }

    #[test]
    fn test_dependency_alias_is_dependency_name() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let dep_uri = store.pin_manifest(&owned());
        let uri = store.pin_manifest(&ManifestBuilder::new("wallet", "1.0.0").dependency("ownable", &dep_uri));
        let transport = store.into_transport();

        let package = Package::new(&uri, None, &transport).unwrap();
        let installed = install_package(&package, project.ethpm_dir(), None).unwrap();

        dir_exists(&installed.join("ethpm_packages/ownable"));
        dir_not_exists(&installed.join("ethpm_packages/owned"));
    }

    #[test]
    fn test_failing_dependency_aborts_whole_install() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let dep_uri = store.pin_manifest(&owned());
        store.serve_tampered(&dep_uri, ManifestBuilder::new("evil", "1.0.0").to_raw().as_bytes());
        let uri = store.pin_manifest(
            &ManifestBuilder::new("wallet", "1.0.0")
                .source("./Wallet.sol", "contract Wallet {}")
                .dependency("owned", &dep_uri),
        );
        let transport = store.into_transport();

        let package = Package::new(&uri, None, &transport).unwrap();
        let err = install_package(&package, project.ethpm_dir(), None).unwrap_err();

        assert!(matches!(err, Error::IntegrityMismatch { .. }));
        dir_empty(&project.ethpm_dir());
    }
}

mod registry {
    use super::*;

    #[test]
    fn test_registry_uri_indirection() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let manifest_uri = store.pin_manifest(&owned());
        let target_uri = store.publish("owned", "1.0.0", &manifest_uri);
        let transport = store.into_transport();

        let package = Package::new(&target_uri, None, &transport).unwrap();
        assert_eq!(package.target_uri, target_uri);
        assert_eq!(package.manifest_uri, manifest_uri);
        assert_eq!(
            package.registry_address.as_deref(),
            Some(format!("{}:1", REGISTRY_ADDRESS).as_str())
        );

        install_package(&package, project.ethpm_dir(), None).unwrap();
        let entry = Lockfile::load_from(project.lockfile_path())
            .unwrap()
            .unwrap()
            .get_package("owned")
            .unwrap();
        assert_eq!(entry.target_uri, target_uri);
        assert_eq!(entry.resolved_uri, manifest_uri);
        assert_eq!(entry.registry_address, package.registry_address);
    }

    #[test]
    fn test_registry_dependency() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let dep_manifest = store.pin_manifest(&owned());
        let dep_target = store.publish("owned", "1.0.0", &dep_manifest);
        let uri = store.pin_manifest(&ManifestBuilder::new("wallet", "1.0.0").dependency("owned", &dep_target));
        let transport = store.into_transport();

        let package = Package::new(&uri, None, &transport).unwrap();
        let installed = install_package(&package, project.ethpm_dir(), None).unwrap();

        let nested = Lockfile::load_from(installed.join("ethpm_packages/ethpm.lock"))
            .unwrap()
            .unwrap();
        let entry = nested.get_package("owned").unwrap();
        assert_eq!(entry.target_uri, dep_target);
        assert_eq!(entry.resolved_uri, dep_manifest);
        assert!(entry.registry_address.is_some());
    }

    #[test]
    fn test_registry_cycle_hits_depth_guard() {
        let project = TestProject::new();
        let mut store = MemoryStore::new();
        let target = registry_uri("cycle", "1.0.0");
        let manifest_uri = store.pin_manifest(&ManifestBuilder::new("cycle", "1.0.0").dependency("cycle", &target));
        store.publish("cycle", "1.0.0", &manifest_uri);
        let transport = store.into_transport();

        let package = Package::new(&target, None, &transport).unwrap();
        let err = Installer::new(project.ethpm_dir())
            .max_depth(5)
            .install(&package)
            .unwrap_err();

        assert!(err.to_string().contains("nest deeper than 5 levels"));
        dir_empty(&project.ethpm_dir());
    }
}
