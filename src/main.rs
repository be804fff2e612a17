// mcmeta-cache CLI.
// Prefetches and prints mcmeta datasets through the persistent cache.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mcmeta_cache::{Config, McmetaClient, Result};

#[derive(Debug, Parser)]
#[command(name = "mcmeta-cache", about = "Fetch and cache mcmeta datasets")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "MCMETA_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Metadata of all game versions
    Versions,
    /// Registry entries of a version
    Registries { version: String },
    /// Block properties and defaults of a version
    BlockStates { version: String },
    /// Default item components of a version
    ItemComponents { version: String },
    /// Summary of every preset in a registry
    Presets { version: String, registry: String },
    /// Raw JSON of a single preset
    Preset {
        version: String,
        registry: String,
        id: String,
    },
    /// Translations of a version
    Language {
        version: String,
        #[arg(long, default_value = "en_us")]
        lang: String,
    },
    /// Model resources of a version (atlas image size only)
    Resources { version: String },
    /// Generated vanilla mcdoc symbols
    Mcdoc,
    /// Fingerprint of the data cached for a version
    Checksum { version: String },
    /// Apply pending cache patches
    Patch,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "mcmeta_cache=warn",
        1 => "mcmeta_cache=info",
        _ => "mcmeta_cache=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_with_env(cli.config.as_deref()).await?;
    debug!(latest = %config.latest_version, "loaded configuration");
    let client = McmetaClient::from_config(config)?;

    match cli.command {
        Command::Versions => print_json(&client.fetch_versions().await?),
        Command::Registries { version } => print_json(&client.fetch_registries(&version).await?),
        Command::BlockStates { version } => {
            print_json(&client.fetch_block_states(&version).await?)
        }
        Command::ItemComponents { version } => {
            print_json(&client.fetch_item_components(&version).await?)
        }
        Command::Presets { version, registry } => {
            print_json(&client.fetch_all_presets(&version, &registry).await?)
        }
        Command::Preset {
            version,
            registry,
            id,
        } => {
            println!("{}", client.fetch_preset(&version, &registry, &id).await?);
            Ok(())
        }
        Command::Language { version, lang } => {
            print_json(&client.fetch_language(&version, &lang).await?)
        }
        Command::Resources { version } => {
            let resources = client.fetch_resources(&version).await?;
            eprintln!("atlas: {} bytes", resources.atlas.len());
            print_json(&resources)
        }
        Command::Mcdoc => print_json(&client.fetch_vanilla_mcdoc().await?),
        Command::Checksum { version } => {
            println!("{}", client.version_checksum(&version).await?);
            Ok(())
        }
        Command::Patch => {
            let report = client.apply_patches().await?;
            for id in &report.applied {
                println!("applied {}", id);
            }
            for (id, reason) in &report.failed {
                println!("failed {}: {}", id, reason);
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
