//! Additive priority score and tiering of annotated variants.

use std::fmt;

use pathovar_common::summary::Describe;
use pathovar_common::table::PriorityCategory;
use pathovar_common::VariantRecord;
use tracing::info;

use crate::weights::ScoreMatrix;

/// Points contributed by each evidence class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreBreakdown {
    pub population: u32,
    pub structural: u32,
    pub functional: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.population + self.structural + self.functional
    }
}

fn contains_ci(value: Option<&str>, needle: &str) -> bool {
    value.is_some_and(|v| v.to_lowercase().contains(needle))
}

/// Score one variant. Missing values contribute nothing.
pub fn score_variant(rec: &VariantRecord, m: &ScoreMatrix) -> ScoreBreakdown {
    let population = match rec.gnomad_af {
        Some(af) if af < m.af_ultra_rare => m.ultra_rare_points,
        Some(af) if af < m.af_very_rare => m.very_rare_points,
        _ => 0,
    };

    let pore = VariantRecord::flag(rec.is_pore_region);
    let mut structural = 0;
    if VariantRecord::flag(rec.is_binding_site) {
        structural += m.binding_site_points;
    }
    if pore {
        structural += m.pore_points;
    }
    if VariantRecord::flag(rec.is_interface) {
        structural += m.interface_points;
    }
    if VariantRecord::flag(rec.is_tm_core) && !pore {
        structural += m.tm_core_points;
    }
    let structural = structural.min(m.structural_cap);

    let mut functional = match rec.cadd_phred {
        Some(c) if c >= m.cadd_high => m.cadd_high_points,
        Some(c) if c >= m.cadd_mid => m.cadd_mid_points,
        Some(c) if c >= m.cadd_low => m.cadd_low_points,
        _ => 0,
    };
    let polyphen = rec.polyphen_pred.as_deref();
    if contains_ci(polyphen, "probably_damaging") {
        functional += m.polyphen_probably_points;
    } else if contains_ci(polyphen, "possibly_damaging") {
        functional += m.polyphen_possibly_points;
    }
    if contains_ci(rec.sift_pred.as_deref(), "deleterious") {
        functional += m.sift_deleterious_points;
    }

    ScoreBreakdown {
        population,
        structural,
        functional,
    }
}

pub fn categorize(score: u32, m: &ScoreMatrix) -> PriorityCategory {
    if score >= m.high_cutoff {
        PriorityCategory::High
    } else if score >= m.medium_cutoff {
        PriorityCategory::Medium
    } else if score >= m.low_cutoff {
        PriorityCategory::Low
    } else {
        PriorityCategory::VeryLow
    }
}

/// Score and tier every row, then order by score, highest first. Rows with
/// equal scores keep their input order.
pub fn rank_variants(mut records: Vec<VariantRecord>, m: &ScoreMatrix) -> Vec<VariantRecord> {
    for rec in records.iter_mut() {
        let score = score_variant(rec, m).total();
        rec.priority_score = Some(score);
        rec.priority_category = Some(categorize(score, m));
    }
    records.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
    info!(ranked = records.len(), "Variants scored and ranked");
    records
}

/// Score distribution, tier counts and the leading variants.
#[derive(Debug, Clone)]
pub struct PriorityReport {
    pub distribution: Describe,
    pub category_counts: Vec<(PriorityCategory, usize)>,
    pub top: Vec<(String, Option<i64>, Option<String>, u32)>,
}

impl PriorityReport {
    /// Build from rows already ordered by [`rank_variants`].
    pub fn new(ranked: &[VariantRecord], top_n: usize) -> Self {
        let distribution =
            Describe::from_values(ranked.iter().map(|r| r.priority_score.map(f64::from)));

        let mut category_counts: Vec<(PriorityCategory, usize)> = PriorityCategory::ALL
            .iter()
            .map(|c| (*c, ranked.iter().filter(|r| r.priority_category == Some(*c)).count()))
            .filter(|(_, n)| *n > 0)
            .collect();
        category_counts.sort_by(|a, b| b.1.cmp(&a.1));

        let top = ranked
            .iter()
            .take(top_n)
            .map(|r| {
                (
                    r.rsid.clone(),
                    r.protein_position,
                    r.domain_region.clone(),
                    r.priority_score.unwrap_or(0),
                )
            })
            .collect();

        Self {
            distribution,
            category_counts,
            top,
        }
    }
}

impl fmt::Display for PriorityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Score distribution summary:")?;
        writeln!(f, "{}", self.distribution)?;
        writeln!(f, "Count per priority_category:")?;
        for (cat, n) in &self.category_counts {
            writeln!(f, "{:<10} {:>5}", cat.as_str(), n)?;
        }
        writeln!(f)?;
        writeln!(f, "Top {} variants (rsid, position, domain, score):", self.top.len())?;
        writeln!(
            f,
            "{:>14} {:>16} {:>22} {:>14}",
            "rsid", "protein_position", "domain_region", "priority_score"
        )?;
        for (rsid, pos, domain, score) in &self.top {
            let pos = pos.map(|p| p.to_string()).unwrap_or_else(|| "NaN".to_string());
            writeln!(
                f,
                "{:>14} {:>16} {:>22} {:>14}",
                rsid,
                pos,
                domain.as_deref().unwrap_or("NaN"),
                score
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(rsid: &str) -> VariantRecord {
        VariantRecord {
            rsid: rsid.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_population_points() {
        let m = ScoreMatrix::default();
        let mut r = rec("rs1");
        for (af, pts) in [(Some(5e-6), 2), (Some(1e-5), 1), (Some(9.9e-5), 1), (Some(1e-4), 0), (None, 0)] {
            r.gnomad_af = af;
            assert_eq!(score_variant(&r, &m).population, pts, "af={:?}", af);
        }
    }

    #[test]
    fn test_structural_cap() {
        let m = ScoreMatrix::default();
        let mut r = rec("rs1");
        r.is_binding_site = Some(true);
        r.is_pore_region = Some(true);
        r.is_interface = Some(true);
        r.is_tm_core = Some(true);
        assert_eq!(score_variant(&r, &m).structural, 4);

        let mut r = rec("rs2");
        r.is_interface = Some(true);
        r.is_tm_core = Some(true);
        assert_eq!(score_variant(&r, &m).structural, 3);

        // tm core counts only outside the pore
        let mut r = rec("rs3");
        r.is_tm_core = Some(true);
        assert_eq!(score_variant(&r, &m).structural, 1);
    }

    #[test]
    fn test_functional_points() {
        let m = ScoreMatrix::default();
        let mut r = rec("rs1");
        r.cadd_phred = Some(30.0);
        r.polyphen_pred = Some("Probably_Damaging".to_string());
        r.sift_pred = Some("deleterious_low_confidence".to_string());
        assert_eq!(score_variant(&r, &m).functional, 6);

        r.cadd_phred = Some(24.99);
        r.polyphen_pred = Some("possibly_damaging".to_string());
        r.sift_pred = Some("tolerated".to_string());
        assert_eq!(score_variant(&r, &m).functional, 2);

        r.cadd_phred = Some(19.9);
        r.polyphen_pred = None;
        assert_eq!(score_variant(&r, &m).functional, 0);
    }

    #[test]
    fn test_category_boundaries() {
        let m = ScoreMatrix::default();
        let expected = [
            (0, PriorityCategory::VeryLow),
            (2, PriorityCategory::VeryLow),
            (3, PriorityCategory::Low),
            (5, PriorityCategory::Low),
            (6, PriorityCategory::Medium),
            (9, PriorityCategory::Medium),
            (10, PriorityCategory::High),
            (12, PriorityCategory::High),
        ];
        for (score, cat) in expected {
            assert_eq!(categorize(score, &m), cat, "score {}", score);
        }
    }

    #[test]
    fn test_rank_is_stable_descending() {
        let m = ScoreMatrix::default();
        let mut a = rec("rsA");
        a.cadd_phred = Some(21.0);
        let mut b = rec("rsB");
        b.cadd_phred = Some(31.0);
        let mut c = rec("rsC");
        c.cadd_phred = Some(22.0);

        let ranked = rank_variants(vec![a, b, c], &m);
        let ids: Vec<&str> = ranked.iter().map(|r| r.rsid.as_str()).collect();
        assert_eq!(ids, vec!["rsB", "rsA", "rsC"]);
        assert_eq!(ranked[0].priority_score, Some(3));
        assert_eq!(ranked[0].priority_category, Some(PriorityCategory::Low));
        assert_eq!(ranked[2].priority_category, Some(PriorityCategory::VeryLow));
    }

    #[test]
    fn test_report() {
        let m = ScoreMatrix::default();
        let mut rows: Vec<VariantRecord> = (0..20).map(|i| rec(&format!("rs{}", i))).collect();
        rows[3].cadd_phred = Some(35.0);
        let ranked = rank_variants(rows, &m);
        let report = PriorityReport::new(&ranked, 15);

        assert_eq!(report.top.len(), 15);
        assert_eq!(report.top[0].0, "rs3");
        assert_eq!(report.category_counts[0], (PriorityCategory::VeryLow, 19));
        assert_eq!(report.category_counts[1], (PriorityCategory::Low, 1));
        let text = report.to_string();
        assert!(text.contains("Count per priority_category:"));
        assert!(text.contains("Very Low"));
    }
}
