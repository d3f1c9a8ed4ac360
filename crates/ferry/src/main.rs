//! Ferry
//!
//! Command line front end of the transfer manager.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ferry::config::{default_config_path, Config};
use ferry::{FileEntry, FileTransfer, Parallel, TransferManager};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

/// Thread name of the download pool.
const DOWNLOAD_POOL_NAME: &str = "ferry-download";

/// Ferry - move files between local paths, HTTP, SFTP, SMB and artifact repositories.
#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Download one or more files in parallel
    Download {
        /// URLs to download
        #[arg(required = true)]
        urls: Vec<String>,

        /// Target directory
        #[arg(long, short, default_value = ".")]
        dir: PathBuf,
    },

    /// Upload a local file unless the destination already has it
    Upload {
        /// Local file
        source: PathBuf,

        /// Destination file URL
        url: String,
    },

    /// List files in a directory URL
    List {
        /// Directory URL
        dir_url: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show metadata of a file URL
    Stat {
        /// File URL
        url: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Delete a file URL
    Delete {
        /// File URL
        url: String,
    },

    /// Delete every file in a directory URL
    Truncate {
        /// Directory URL
        dir_url: String,
    },

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing before the config is read, then narrow it to the configured level
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, filter_handle) =
        reload::Layer::new(EnvFilter::new(log_filter(cli.verbose, rust_log.as_deref(), None)));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;

    // Apply environment variable overrides
    config.apply_env_overrides();

    // Validate configuration
    config.validate()?;

    filter_handle
        .reload(EnvFilter::new(log_filter(
            cli.verbose,
            rust_log.as_deref(),
            Some(config.general.log_level.as_str()),
        )))
        .context("Failed to apply log level")?;

    tracing::debug!("Using config file: {:?}", config_path);

    let manager = TransferManager::new(&config);

    match cli.command {
        Commands::Download { urls, dir } => {
            let manager = Arc::new(manager);
            let count = urls.len();
            let targets = Parallel::pool_map(
                config.parallel.threads,
                DOWNLOAD_POOL_NAME,
                urls,
                move |url: String| manager.download_to(&url, &dir),
            )
            .context("Download failed")?;

            for target in &targets {
                println!("{}", target.display());
            }
            tracing::info!("Downloaded {} file(s)", count);
        }
        Commands::Upload { source, url } => {
            if !source.is_file() {
                anyhow::bail!("Source is not a file: {}", source.display());
            }
            manager
                .upload(&url, &source)
                .with_context(|| format!("Failed to upload {} to {}", source.display(), url))?;
        }
        Commands::List { dir_url, json } => {
            let entries = manager
                .list(&dir_url)
                .with_context(|| format!("Failed to list {}", dir_url))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No files.");
            } else {
                for entry in &entries {
                    print_entry(entry);
                }
            }
        }
        Commands::Stat { url, json } => {
            let entry = manager
                .stat_url(&url)
                .with_context(|| format!("Failed to stat {}", url))?;

            match entry {
                Some(entry) if json => println!("{}", serde_json::to_string_pretty(&entry)?),
                Some(entry) => print_entry(&entry),
                None => {
                    eprintln!("Not found: {}", url);
                    std::process::exit(1);
                }
            }
        }
        Commands::Delete { url } => {
            manager
                .delete(&url)
                .with_context(|| format!("Failed to delete {}", url))?;
            tracing::info!("Deleted {}", url);
        }
        Commands::Truncate { dir_url } => {
            manager
                .truncate(&dir_url)
                .with_context(|| format!("Failed to truncate {}", dir_url))?;
            tracing::info!("Truncated {}", dir_url);
        }
        Commands::Config(ConfigCommands::Show) => {
            print!("{}", config.to_toml()?);
        }
        Commands::Config(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::default().save(&config_path)?;
            println!("Wrote {}", config_path.display());
        }
    }

    Ok(())
}

/// Filter directive: `-v` wins, then `RUST_LOG`, then the configured level.
fn log_filter(verbose: bool, rust_log: Option<&str>, config_level: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }
    match rust_log.filter(|directive| !directive.trim().is_empty()) {
        Some(directive) => directive.to_string(),
        None => config_level.unwrap_or("info").to_lowercase(),
    }
}

fn print_entry(entry: &FileEntry) {
    let size = entry
        .size()
        .map(|size| size.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!("{:>12}  {}", size, entry.name());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_download() {
        let cli = Cli::try_parse_from([
            "ferry",
            "download",
            "https://host/a.zip",
            "org.acme:app:1.0",
            "--dir",
            "/tmp/out",
        ])
        .unwrap();

        match cli.command {
            Commands::Download { urls, dir } => {
                assert_eq!(urls, vec!["https://host/a.zip", "org.acme:app:1.0"]);
                assert_eq!(dir, PathBuf::from("/tmp/out"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_download_requires_url() {
        assert!(Cli::try_parse_from(["ferry", "download"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["ferry", "list", "/srv", "--json", "-v", "-c", "/etc/f.toml"])
            .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/f.toml")));
        assert!(matches!(cli.command, Commands::List { json: true, .. }));
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::try_parse_from(["ferry", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands::Init { force: true })
        ));
    }

    #[test]
    fn test_log_filter_precedence() {
        assert_eq!(log_filter(true, Some("warn"), Some("error")), "debug");
        assert_eq!(log_filter(false, Some("ferry=trace"), Some("error")), "ferry=trace");
        assert_eq!(log_filter(false, None, Some("WARN")), "warn");
        assert_eq!(log_filter(false, Some("  "), Some("error")), "error");
        assert_eq!(log_filter(false, None, None), "info");
    }
}
