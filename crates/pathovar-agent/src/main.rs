//! pathovar — rare missense variant prioritisation pipeline.
//! Entry point for the pipeline binary.

mod config;
mod stages;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use stages::{Pipeline, Stage};

#[derive(Debug, Parser)]
#[command(name = "pathovar", version, about = "Rare missense variant prioritisation for a single gene")]
struct Cli {
    /// Path to pathovar.toml
    #[arg(long, global = true, env = "PATHOVAR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch missense variants from Ensembl and keep the rare ones
    Mine,
    /// Re-query gnomAD frequencies for the mined table
    RepairAf,
    /// Coordinate correction, domain assignment and functional scores
    Annotate,
    /// Map variants onto the PDB structure
    Spatial,
    /// Score and rank variants
    Prioritize,
    /// Distance metrics for the top-ranked variants
    Mechanistic,
    /// ClinVar and PubMed review of the top-ranked variants
    Clinical,
    /// Fisher enrichment of structural features among High variants
    Enrichment,
    /// Run every stage in order
    Run,
}

impl Command {
    fn stage(&self) -> Option<Stage> {
        match self {
            Command::Mine => Some(Stage::Mine),
            Command::RepairAf => Some(Stage::RepairAf),
            Command::Annotate => Some(Stage::Annotate),
            Command::Spatial => Some(Stage::Spatial),
            Command::Prioritize => Some(Stage::Prioritize),
            Command::Mechanistic => Some(Stage::Mechanistic),
            Command::Clinical => Some(Stage::Clinical),
            Command::Enrichment => Some(Stage::Enrichment),
            Command::Run => None,
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = config::Config::load(cli.config.as_deref())?;
    info!(
        "Target: {} ({}), structure {} chain {}",
        config.target.gene_symbol, config.target.uniprot_id, config.target.pdb_id, config.target.chain_id
    );

    let pipeline = Pipeline::new(config)?;
    match cli.command.stage() {
        Some(stage) => {
            info!("Running {}", stage.description());
            pipeline.run_stage(stage).await
        }
        None => pipeline.run_all().await,
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pathovar=info,warn")),
        )
        .init();

    info!("pathovar {}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    if let Err(e) = execute(cli).await {
        error!("{:#}", e);
        error!("Pipeline execution aborted. Fix the underlying error and retry.");
        std::process::exit(1);
    }
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
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["pathovar", "repair-af", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.command.stage(), Some(Stage::RepairAf));
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));

        let cli = Cli::try_parse_from(["pathovar", "run"]).unwrap();
        assert_eq!(cli.command.stage(), None);
    }
}
