//! Configuration loading for pathovar.
//! Reads pathovar.toml from `--config`, the PATHOVAR_CONFIG env var, or the
//! current directory. A missing file runs the built-in CHRNA7 defaults.

use pathovar_common::{FilterConfig, IngestionConfig, OutputConfig, StructuralConfig, TargetSpec};
use pathovar_ranker::weights::ScoreMatrix;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "pathovar.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetSpec,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub structural: StructuralConfig,
    #[serde(default)]
    pub scoring: ScoreMatrix,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration. `path` (from `--config` / PATHOVAR_CONFIG) must
    /// exist when given; the default file is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => {
                if !p.exists() {
                    anyhow::bail!(
                        "Config file not found: {}\n\
                         Copy pathovar.example.toml to pathovar.toml and edit it.",
                        p.display()
                    );
                }
                Self::from_file(p)?
            }
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(&default)?
                } else {
                    tracing::info!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };

        if config.ingestion.ncbi_api_key.is_none() {
            config.ingestion.ncbi_api_key = std::env::var("NCBI_API_KEY").ok().filter(|k| !k.is_empty());
        }
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !self.scoring.validate() {
            anyhow::bail!("[scoring] thresholds and category cut-offs must be ordered");
        }
        if !(0.0..=1.0).contains(&self.filters.af_zero_abort_fraction) {
            anyhow::bail!("[filters] af_zero_abort_fraction must be within 0..=1");
        }
        if self.structural.contact_cutoff <= 0.0 {
            anyhow::bail!("[structural] contact_cutoff must be positive");
        }
        Ok(())
    }
}
