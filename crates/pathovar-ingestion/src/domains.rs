//! Topological domain boundaries derived from UniProt features.

use std::path::Path;

use pathovar_common::{PathovarError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::UniProtFeature;

pub const SIGNAL_PEPTIDE: &str = "signal_peptide";
pub const EXTRACELLULAR: &str = "extracellular_domain";
pub const INTRACELLULAR_LOOP: &str = "intracellular_loop";
pub const OTHER: &str = "other";

const TRANSMEMBRANE: [&str; 4] = ["M1", "M2", "M3", "M4"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub start: i64,
    pub end: i64,
}

impl Domain {
    pub fn contains(&self, position: i64) -> bool {
        self.start <= position && position <= self.end
    }
}

/// Named residue ranges in insertion order. Re-inserting a name replaces its
/// range but keeps its original place in the lookup order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainMap {
    domains: Vec<Domain>,
}

impl DomainMap {
    pub fn insert(&mut self, name: &str, start: i64, end: i64) {
        match self.domains.iter_mut().find(|d| d.name == name) {
            Some(existing) => {
                existing.start = start;
                existing.end = end;
            }
            None => self.domains.push(Domain {
                name: name.to_string(),
                start,
                end,
            }),
        }
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.domains.iter().any(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Domain> {
        self.domains.iter()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Build the map from UniProt features. Only signal peptide, topological
    /// domain and transmembrane features are used; located ones only.
    pub fn from_features(features: &[UniProtFeature]) -> Self {
        let mut map = Self::default();
        let mut tm_count = 0;

        for feature in features {
            let Some((start, end)) = feature.span() else {
                continue;
            };
            let description = feature.description.as_deref().unwrap_or("").to_lowercase();

            match feature.feature_type.as_str() {
                "Signal" => map.insert(SIGNAL_PEPTIDE, start, end),
                "Topological domain" => {
                    if description.contains("extracellular") {
                        if !map.contains_name(EXTRACELLULAR) {
                            map.insert(EXTRACELLULAR, start, end);
                        }
                    } else if description.contains("cytoplasmic") {
                        map.insert(INTRACELLULAR_LOOP, start, end);
                    }
                }
                "Transmembrane" => {
                    tm_count += 1;
                    map.insert(&format!("M{}", tm_count), start, end);
                }
                _ => {}
            }
        }
        map
    }

    /// Domain containing `position`, or `other`.
    pub fn assign(&self, position: Option<i64>) -> &str {
        position
            .and_then(|p| self.domains.iter().find(|d| d.contains(p)))
            .map(|d| d.name.as_str())
            .unwrap_or(OTHER)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        info!(path = %path.display(), domains = self.len(), "Domain boundaries saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PathovarError::MissingData(format!("domain file {}: {}", path.display(), e))
        })?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

/// Transmembrane, pore and extracellular flags for an assigned domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainFlags {
    pub is_transmembrane: bool,
    pub is_pore_region: bool,
    pub is_extracellular: bool,
}

impl DomainFlags {
    pub fn for_domain(domain: &str, pore_domain: &str) -> Self {
        Self {
            is_transmembrane: TRANSMEMBRANE.contains(&domain),
            is_pore_region: domain == pore_domain,
            is_extracellular: domain == EXTRACELLULAR,
        }
    }
}
