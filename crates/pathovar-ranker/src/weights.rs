//! Points matrix for variant prioritisation.

use serde::{Deserialize, Serialize};

/// Thresholds and points of the additive priority score.
///
/// Population, structural and functional evidence each contribute points;
/// the structural contribution is capped. Every field can be overridden from
/// the `[scoring]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMatrix {
    // Population rarity
    #[serde(default = "default_af_ultra_rare")]
    pub af_ultra_rare: f64,
    #[serde(default = "default_af_very_rare")]
    pub af_very_rare: f64,
    #[serde(default = "default_two")]
    pub ultra_rare_points: u32,
    #[serde(default = "default_one")]
    pub very_rare_points: u32,

    // Structural context
    #[serde(default = "default_four")]
    pub binding_site_points: u32,
    #[serde(default = "default_four")]
    pub pore_points: u32,
    #[serde(default = "default_two")]
    pub interface_points: u32,
    #[serde(default = "default_one")]
    pub tm_core_points: u32,
    #[serde(default = "default_four")]
    pub structural_cap: u32,

    // Functional predictions
    #[serde(default = "default_cadd_high")]
    pub cadd_high: f64,
    #[serde(default = "default_cadd_mid")]
    pub cadd_mid: f64,
    #[serde(default = "default_cadd_low")]
    pub cadd_low: f64,
    #[serde(default = "default_three")]
    pub cadd_high_points: u32,
    #[serde(default = "default_two")]
    pub cadd_mid_points: u32,
    #[serde(default = "default_one")]
    pub cadd_low_points: u32,
    #[serde(default = "default_two")]
    pub polyphen_probably_points: u32,
    #[serde(default = "default_one")]
    pub polyphen_possibly_points: u32,
    #[serde(default = "default_one")]
    pub sift_deleterious_points: u32,

    // Category cut-offs (inclusive lower bounds)
    #[serde(default = "default_high_cutoff")]
    pub high_cutoff: u32,
    #[serde(default = "default_medium_cutoff")]
    pub medium_cutoff: u32,
    #[serde(default = "default_low_cutoff")]
    pub low_cutoff: u32,
}

fn default_af_ultra_rare() -> f64 { 1e-5 }
fn default_af_very_rare() -> f64 { 1e-4 }
fn default_cadd_high() -> f64 { 30.0 }
fn default_cadd_mid() -> f64 { 25.0 }
fn default_cadd_low() -> f64 { 20.0 }
fn default_high_cutoff() -> u32 { 10 }
fn default_medium_cutoff() -> u32 { 6 }
fn default_low_cutoff() -> u32 { 3 }
fn default_one() -> u32 { 1 }
fn default_two() -> u32 { 2 }
fn default_three() -> u32 { 3 }
fn default_four() -> u32 { 4 }

impl Default for ScoreMatrix {
    fn default() -> Self {
        Self {
            af_ultra_rare: default_af_ultra_rare(),
            af_very_rare: default_af_very_rare(),
            ultra_rare_points: 2,
            very_rare_points: 1,
            binding_site_points: 4,
            pore_points: 4,
            interface_points: 2,
            tm_core_points: 1,
            structural_cap: 4,
            cadd_high: default_cadd_high(),
            cadd_mid: default_cadd_mid(),
            cadd_low: default_cadd_low(),
            cadd_high_points: 3,
            cadd_mid_points: 2,
            cadd_low_points: 1,
            polyphen_probably_points: 2,
            polyphen_possibly_points: 1,
            sift_deleterious_points: 1,
            high_cutoff: default_high_cutoff(),
            medium_cutoff: default_medium_cutoff(),
            low_cutoff: default_low_cutoff(),
        }
    }
}

impl ScoreMatrix {
    /// Thresholds must be ordered for the tiers to be well defined.
    pub fn validate(&self) -> bool {
        self.af_ultra_rare <= self.af_very_rare
            && self.cadd_low <= self.cadd_mid
            && self.cadd_mid <= self.cadd_high
            && self.low_cutoff <= self.medium_cutoff
            && self.medium_cutoff <= self.high_cutoff
    }

    /// Highest score the matrix can award.
    pub fn max_score(&self) -> u32 {
        self.ultra_rare_points.max(self.very_rare_points)
            + self.structural_cap
            + self.cadd_high_points.max(self.cadd_mid_points).max(self.cadd_low_points)
            + self.polyphen_probably_points.max(self.polyphen_possibly_points)
            + self.sift_deleterious_points
    }
}
