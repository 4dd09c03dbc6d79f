use anyhow::Result;
use ethpm::uninstall_package;
use std::path::PathBuf;

pub fn run(alias: String, ethpm_dir: Option<PathBuf>) -> Result<()> {
    let ethpm_dir = super::resolve_ethpm_dir(ethpm_dir, false)?;

    println!("Uninstalling package: {}", alias);
    println!();

    uninstall_package(&alias, &ethpm_dir)?;

    println!("✓ Successfully uninstalled {}", alias);
    Ok(())
}
