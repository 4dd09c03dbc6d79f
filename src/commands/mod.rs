pub mod install;
pub mod list;
pub mod uninstall;

use anyhow::Result;
use ethpm::validation::validate_ethpm_dir;
use ethpm::ETHPM_DIR_NAME;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Pick the install root for a command.
///
/// A directory passed with `--ethpm-dir` must already exist and be named
/// `ethpm_packages`. Without one, `./ethpm_packages` is used and created when
/// `create` is set.
fn resolve_ethpm_dir(ethpm_dir: Option<PathBuf>, create: bool) -> Result<PathBuf> {
    if let Some(ethpm_dir) = ethpm_dir {
        validate_ethpm_dir(&ethpm_dir)?;
        return Ok(ethpm_dir);
    }

    let ethpm_dir = env::current_dir()?.join(ETHPM_DIR_NAME);
    if create {
        fs::create_dir_all(&ethpm_dir)?;
    }
    Ok(ethpm_dir)
}
