use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// ethpm - Install content-addressed EthPM packages
#[derive(Parser)]
#[command(name = "ethpm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Show debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package from an IPFS, GitHub blob, or registry URI
    Install {
        /// Target URI (e.g., ipfs://Qm..., erc1319://0x.../owned?version=1.0.0)
        uri: String,

        /// Install under this name instead of the manifest's package name
        #[arg(short, long)]
        alias: Option<String>,

        /// Existing ethpm_packages directory to install into
        #[arg(long)]
        ethpm_dir: Option<PathBuf>,

        /// Fetch from a local IPFS daemon instead of the configured gateway
        #[arg(long)]
        local_ipfs: bool,
    },

    /// List installed packages
    List {
        /// Existing ethpm_packages directory to list
        #[arg(long)]
        ethpm_dir: Option<PathBuf>,
    },

    /// Uninstall a package
    Uninstall {
        /// Alias of the installed package
        alias: String,

        /// Existing ethpm_packages directory to uninstall from
        #[arg(long)]
        ethpm_dir: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ethpm={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Install {
            uri,
            alias,
            ethpm_dir,
            local_ipfs,
        } => commands::install::run(uri, alias, ethpm_dir, local_ipfs),
        Commands::List { ethpm_dir } => commands::list::run(ethpm_dir),
        Commands::Uninstall { alias, ethpm_dir } => commands::uninstall::run(alias, ethpm_dir),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "ethpm", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
