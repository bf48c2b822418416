use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fbmkit::{init_logging, RecognitionConfig, RecognitionPipeline};
use std::path::{Path, PathBuf};

/// Machining feature recognition for B-rep shape snapshots
#[derive(Parser, Debug)]
#[command(name = "fbmkit", version, about = "Feature-based machining recognition")]
pub struct Cli {
    /// Path to recognition configuration (JSON or TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands for configuration files
#[derive(Subcommand, Debug)]
#[command(about = "Inspect or write recognition configuration")]
pub enum ConfigCommands {
    /// Print the effective configuration as JSON
    Show,
    /// Write the default configuration to a file
    Init { path: Option<PathBuf> },
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recognize features in a JSON shape snapshot and print the report
    Recognize {
        /// Shape snapshot (.json)
        shape: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,

        /// Material used for machinability, e.g. "Tool steel 58 HRC"
        #[arg(long)]
        material: Option<String>,
    },

    /// List the registered feature detectors
    Detectors,

    #[command(subcommand)]
    Config(ConfigCommands),
}

fn load_config(path: Option<&Path>) -> Result<RecognitionConfig> {
    match path {
        Some(path) => RecognitionConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(RecognitionConfig::load_or_default()?),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging()?;

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Recognize {
            shape,
            output,
            compact,
            material,
        } => {
            if let Some(material) = material {
                config.machinability.material_hardness = material;
            }
            let pipeline = RecognitionPipeline::new(config)?;
            let report = pipeline
                .run_snapshot_file(&shape)
                .with_context(|| format!("recognizing {}", shape.display()))?;
            let json = report.to_json(!compact)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("writing report {}", path.display()))?;
                    tracing::info!("Report written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Commands::Detectors => {
            let pipeline = RecognitionPipeline::new(config)?;
            for (name, description, enabled) in pipeline.engine().list_detectors() {
                let state = if enabled { "" } else { " (disabled)" };
                println!("{:<20} {}{}", name, description, state);
            }
        }
        Commands::Config(ConfigCommands::Show) => {
            config.validate()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Config(ConfigCommands::Init { path }) => {
            let path = match path.or_else(RecognitionConfig::default_path) {
                Some(path) => path,
                None => anyhow::bail!("no config directory on this platform; pass a path"),
            };
            RecognitionConfig::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    Ok(())
}
