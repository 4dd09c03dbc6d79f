use anyhow::Result;
use ethpm::validation::{validate_alias, validate_target_uri};
use ethpm::{Config, Installer, IpfsBackendKind, Package, ProgressCallback, Transport};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn spinner_style() -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")?
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
}

/// Create an indicatif-based progress callback for CLI display
fn create_spinner_callback() -> Result<ProgressCallback> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style()?);
    spinner.enable_steady_tick(Duration::from_millis(80));

    Ok(Arc::new(move |msg: &str, current: u64, total: u64| {
        if current >= total && total > 0 {
            spinner.finish_with_message(format!("✓ {}", msg));
        } else {
            spinner.set_message(msg.to_string());
        }
    }))
}

pub fn run(
    uri: String,
    alias: Option<String>,
    ethpm_dir: Option<PathBuf>,
    local_ipfs: bool,
) -> Result<()> {
    validate_target_uri(&uri)?;
    if let Some(alias) = &alias {
        validate_alias(alias)?;
    }
    let ethpm_dir = super::resolve_ethpm_dir(ethpm_dir, true)?;

    let mut config = Config::load()?;
    if local_ipfs {
        config.ipfs.backend = IpfsBackendKind::Local;
        config.ipfs.url = None;
    }
    let transport = Transport::from_config(&config)?;

    println!("Installing {}", uri);
    println!();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style()?);
    spinner.set_message("Resolving manifest...");
    spinner.enable_steady_tick(Duration::from_millis(80));

    let package = Package::new(&uri, alias.as_deref(), &transport);
    spinner.finish_and_clear();
    let package = package?;

    println!(
        "  ✓ Resolved {}@{}",
        package.manifest.package_name, package.manifest.version
    );
    println!("    manifest: {}", package.manifest_uri);
    if let Some(registry_address) = &package.registry_address {
        println!("    registry: {}", registry_address);
    }

    let installer =
        Installer::from_config(&ethpm_dir, &config).progress(Some(create_spinner_callback()?));
    let installed_path = installer.install(&package)?;

    println!();
    println!(
        "✓ Successfully installed {} at {}",
        package.alias,
        installed_path.display()
    );

    Ok(())
}
