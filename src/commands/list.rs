use anyhow::Result;
use ethpm::{Lockfile, LOCKFILE_NAME};
use std::path::PathBuf;

pub fn run(ethpm_dir: Option<PathBuf>) -> Result<()> {
    let ethpm_dir = super::resolve_ethpm_dir(ethpm_dir, false)?;

    let lockfile = match Lockfile::load_from(ethpm_dir.join(LOCKFILE_NAME))? {
        Some(lockfile) if lockfile.package_count() > 0 => lockfile,
        _ => {
            println!("No packages installed.");
            println!();
            println!("Install packages with: ethpm install <uri>");
            return Ok(());
        }
    };

    println!("Installed packages:");
    for alias in lockfile.aliases() {
        let Some(entry) = lockfile.get_package(alias) else {
            println!("  {} (unrecognized lock entry)", alias);
            continue;
        };

        if entry.alias == entry.resolved_package_name {
            println!("  {} @ {}", alias, entry.resolved_version);
        } else {
            println!(
                "  {} @ {} ({})",
                alias, entry.resolved_version, entry.resolved_package_name
            );
        }
        println!("    resolved: {}", entry.resolved_uri);
        if let Some(registry_address) = &entry.registry_address {
            println!("    registry: {}", registry_address);
        }
    }
    println!();

    let total = lockfile.package_count();
    println!(
        "Total: {} package{}",
        total,
        if total == 1 { "" } else { "s" }
    );

    Ok(())
}
