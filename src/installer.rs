//! Package installation into an `ethpm_packages` directory
//!
//! Installation is staged: the whole package tree, including every nested build
//! dependency, is written into a private scratch directory outside the install root.
//! Only once staging has succeeded is the tree promoted to `<ethpm_dir>/<alias>` and
//! the top-level lockfile updated. A failure at any point leaves the install root
//! untouched.
//!
//! Installed layout:
//!
//! ```text
//! ethpm_packages/
//! ├── ethpm.lock
//! └── <alias>/
//!     ├── manifest.json
//!     ├── src/<source path>
//!     └── ethpm_packages/
//!         ├── ethpm.lock
//!         └── <dependency name>/...
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use ethpm::{install_package, Config, Package, Transport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Transport::from_config(&Config::load()?)?;
//! let package = Package::new(
//!     "ipfs://QmRhJ4bvbG6Bx8dQvqUccTKBpydvfDNF4NfsdnLbaCPe7t",
//!     None,
//!     &transport,
//! )?;
//!
//! let installed_path = install_package(&package, "ethpm_packages", None)?;
//! println!("Installed to: {:?}", installed_path);
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use crate::lockfile::{remove_from_lockfile, update_lockfile, Lockfile, LOCKFILE_NAME};
use crate::package::Package;
use crate::resolver::{decode_text, verify_content};
use crate::uri::{has_content_scheme, ContentUri};
use crate::validation::{normalize_path, validate_alias, validate_parent_directory};
use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Progress callback for installation operations
///
/// Called with:
/// - `message`: Description of current operation (e.g., "Staging owned@1.0.0")
/// - `current`: Current step
/// - `total`: Total steps
pub type ProgressCallback = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Name of every install root, top-level and nested
pub const ETHPM_DIR_NAME: &str = "ethpm_packages";

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

pub const SOURCES_DIR_NAME: &str = "src";

/// How deep build dependencies may nest before an install is aborted
pub const DEFAULT_MAX_DEPTH: usize = 100;

const PROMOTION_STAGING_PREFIX: &str = ".ethpm-staging-";

const PROMOTED_DIR_NAME: &str = "package";

const INSTALL_STEPS: u64 = 3;

pub struct Installer {
    ethpm_dir: PathBuf,
    verify_sources: bool,
    max_depth: usize,
    progress: Option<ProgressCallback>,
}

impl Installer {
    pub fn new<P: AsRef<Path>>(ethpm_dir: P) -> Self {
        Self {
            ethpm_dir: ethpm_dir.as_ref().to_path_buf(),
            verify_sources: true,
            max_depth: DEFAULT_MAX_DEPTH,
            progress: None,
        }
    }

    pub fn from_config<P: AsRef<Path>>(ethpm_dir: P, config: &Config) -> Self {
        Self::new(ethpm_dir)
            .verify_sources(config.install.verify_sources)
            .max_depth(config.install.max_depth)
    }

    /// Check content-addressed sources against their URI hash before writing them
    pub fn verify_sources(mut self, verify: bool) -> Self {
        self.verify_sources = verify;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn ethpm_dir(&self) -> &Path {
        &self.ethpm_dir
    }

    /// Install `package` at `<ethpm_dir>/<alias>` and record it in the lockfile
    ///
    /// # Returns
    ///
    /// The path where the package was installed
    pub fn install(&self, package: &Package) -> Result<PathBuf> {
        validate_alias(&package.alias)?;

        let install_path = self.ethpm_dir.join(&package.alias);
        check_install_conflict(package, &install_path)?;

        self.report(
            &format!(
                "Staging {}@{}",
                package.manifest.package_name, package.manifest.version
            ),
            0,
        );

        // The staged package sits one level down so its in-progress lockfile lands in
        // the scratch root and is discarded with it
        let scratch = TempDir::new()?;
        let staged_path = scratch.path().join(&package.alias);
        fs::create_dir(&staged_path)?;
        self.write_pkg_installation_files(package, &staged_path, 0)?;

        self.report(&format!("Installing {}", package.alias), 1);
        fs::create_dir_all(&self.ethpm_dir)?;
        check_install_conflict(package, &install_path)?;
        self.promote(package, &staged_path, &install_path)?;

        self.report("Updating lockfile", 2);
        update_lockfile(
            self.ethpm_dir.join(LOCKFILE_NAME),
            &package.alias,
            &package.lock_entry(),
        )?;

        info!(
            "Installed {}@{} as '{}' at {}",
            package.manifest.package_name,
            package.manifest.version,
            package.alias,
            install_path.display()
        );
        self.report(&format!("Installed {}", package.alias), INSTALL_STEPS);
        Ok(install_path)
    }

    /// Remove `<ethpm_dir>/<alias>` and its lockfile entry
    pub fn uninstall(&self, alias: &str) -> Result<()> {
        validate_alias(alias)?;

        let install_path = self.ethpm_dir.join(alias);
        let lockfile_path = self.ethpm_dir.join(LOCKFILE_NAME);
        let locked = Lockfile::load_from(&lockfile_path)?
            .is_some_and(|lockfile| lockfile.has_package(alias));

        match fs::symlink_metadata(&install_path) {
            Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(&install_path)?,
            Ok(_) => fs::remove_file(&install_path)?,
            Err(_) if locked => {
                warn!(
                    "'{}' is in the lockfile but missing from {}",
                    alias,
                    self.ethpm_dir.display()
                );
            }
            Err(_) => {
                return Err(Error::Other(format!(
                    "Package '{}' is not installed in {}",
                    alias,
                    self.ethpm_dir.display()
                )));
            }
        }

        remove_from_lockfile(&lockfile_path, alias)?;
        info!("Uninstalled '{}' from {}", alias, self.ethpm_dir.display());
        Ok(())
    }

    fn write_pkg_installation_files(
        &self,
        package: &Package,
        pkg_dir: &Path,
        depth: usize,
    ) -> Result<()> {
        if depth > self.max_depth {
            return Err(Error::Other(format!(
                "Build dependencies of '{}' nest deeper than {} levels. \
                 The dependency graph may contain a cycle.",
                package.alias, self.max_depth
            )));
        }

        fs::write(pkg_dir.join(MANIFEST_FILE_NAME), &package.raw_manifest)?;
        self.write_sources(package, pkg_dir)?;

        if let Some(build_dependencies) = &package.manifest.build_dependencies {
            let dependencies_dir = pkg_dir.join(ETHPM_DIR_NAME);

            for (name, target_uri) in build_dependencies {
                let dependency_dir = dependencies_dir.join(name);
                validate_parent_directory(pkg_dir, &dependency_dir)?;

                debug!("Resolving build dependency '{}' of '{}'", name, package.alias);
                let dependency = Package::new(target_uri, Some(name), package.transport())?;

                fs::create_dir_all(&dependency_dir)?;
                self.write_pkg_installation_files(&dependency, &dependency_dir, depth + 1)?;
            }
        }

        let lockfile_dir = pkg_dir.parent().ok_or_else(|| {
            Error::Other(format!("{} has no parent directory", pkg_dir.display()))
        })?;
        update_lockfile(
            lockfile_dir.join(LOCKFILE_NAME),
            &package.alias,
            &package.lock_entry(),
        )
    }

    fn write_sources(&self, package: &Package, pkg_dir: &Path) -> Result<()> {
        let sources_dir = pkg_dir.join(SOURCES_DIR_NAME);

        for (relative_path, value) in &package.manifest.sources {
            let source_path = sources_dir.join(relative_path);
            validate_parent_directory(&sources_dir, &source_path)?;
            let source_path = normalize_path(&source_path);

            let contents = self.source_contents(package, value)?;

            if let Some(parent) = source_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&source_path, contents)?;
            debug!("Wrote {}", source_path.display());
        }
        Ok(())
    }

    /// Fetch a content-addressed source, or take the value as inlined text
    fn source_contents(&self, package: &Package, value: &str) -> Result<String> {
        if !has_content_scheme(value) {
            return Ok(value.to_string());
        }
        let uri = ContentUri::parse(value)?;

        let contents = package.transport().fetch(&uri)?;
        if self.verify_sources {
            verify_content(&uri, &contents)?;
        }
        decode_text(contents, value)
    }

    /// Move the staged tree into place.
    ///
    /// The tree is first brought next to the destination (copying when it sits on
    /// another filesystem), then the alias directory is claimed with `create_dir` and
    /// the staged entries are renamed into it. `create_dir` never replaces an existing
    /// entry, so an install racing for the same alias surfaces as a conflict.
    fn promote(&self, package: &Package, staged_path: &Path, install_path: &Path) -> Result<()> {
        let landing = tempfile::Builder::new()
            .prefix(PROMOTION_STAGING_PREFIX)
            .tempdir_in(&self.ethpm_dir)?;
        let landed_path = landing.path().join(PROMOTED_DIR_NAME);

        if let Err(err) = fs::rename(staged_path, &landed_path) {
            warn!(
                "Could not move {} into place ({}), copying instead",
                staged_path.display(),
                err
            );
            copy_dir_recursive(staged_path, &landed_path)?;
        }

        match fs::create_dir(install_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(install_conflict(package, install_path));
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(err) = move_entries(&landed_path, install_path) {
            if let Err(cleanup) = fs::remove_dir_all(install_path) {
                warn!(
                    "Failed to clean up {} after an aborted install: {}",
                    install_path.display(),
                    cleanup
                );
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn report(&self, message: &str, current: u64) {
        if let Some(ref callback) = self.progress {
            callback(message, current, INSTALL_STEPS);
        }
    }
}

fn check_install_conflict(package: &Package, install_path: &Path) -> Result<()> {
    if fs::symlink_metadata(install_path).is_ok() {
        return Err(install_conflict(package, install_path));
    }
    Ok(())
}

fn install_conflict(package: &Package, install_path: &Path) -> Error {
    Error::InstallConflict {
        package_name: package.manifest.package_name.clone(),
        alias: package.alias.clone(),
        path: install_path.to_path_buf(),
    }
}

fn move_entries(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        fs::rename(entry.path(), dst.join(entry.file_name()))?;
    }
    Ok(())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::Other(format!("Failed to copy {}: {}", entry.path().display(), e)))?;
        let destination = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}

/// Install a package into `ethpm_dir` with default settings
///
/// # Arguments
///
/// * `package` - The resolved package to install
/// * `ethpm_dir` - The `ethpm_packages` directory to install into
/// * `progress` - Optional callback for progress updates
pub fn install_package<P: AsRef<Path>>(
    package: &Package,
    ethpm_dir: P,
    progress: Option<ProgressCallback>,
) -> Result<PathBuf> {
    Installer::new(ethpm_dir).progress(progress).install(package)
}

pub fn uninstall_package<P: AsRef<Path>>(alias: &str, ethpm_dir: P) -> Result<()> {
    Installer::new(ethpm_dir).uninstall(alias)
}
