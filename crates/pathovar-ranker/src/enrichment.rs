//! Enrichment of structural features among High-priority variants.
//!
//! Each feature gives a 2×2 table of High / not-High against feature
//! true / false:
//!
//! ```text
//!            feature  no feature
//! High          A         B
//! not High      C         D
//! ```
//!
//! The table is tested with a two-sided Fisher exact test. The odds ratio is
//! reported both as the sample ratio `AD/BC` and as the conditional maximum
//! likelihood estimate, with an exact confidence interval from Fisher's
//! noncentral hypergeometric distribution.

use std::fmt::Write as _;

use pathovar_common::table::PriorityCategory;
use pathovar_common::{PathovarError, Result, VariantRecord};
use statrs::distribution::{Discrete, Hypergeometric};
use statrs::function::factorial::ln_binomial;
use tracing::info;

/// Relative tolerance when comparing table probabilities to the observed one.
const PMF_RELATIVE_TOLERANCE: f64 = 1e-7;

/// Search range for the log noncentrality parameter.
const LOG_NC_BOUND: f64 = 100.0;
const BISECTION_STEPS: usize = 200;

pub const CONFIDENCE_LEVEL: f64 = 0.95;

/// Boolean structural columns tested for enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralFeature {
    BindingSite,
    PoreCore,
    Interface,
}

impl StructuralFeature {
    pub const ALL: [StructuralFeature; 3] = [
        StructuralFeature::BindingSite,
        StructuralFeature::PoreCore,
        StructuralFeature::Interface,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StructuralFeature::BindingSite => "is_binding_site",
            StructuralFeature::PoreCore => "is_pore_core",
            StructuralFeature::Interface => "is_interface",
        }
    }

    /// Pore core is read from the `is_pore_region` column.
    pub fn value(&self, rec: &VariantRecord) -> Option<bool> {
        match self {
            StructuralFeature::BindingSite => rec.is_binding_site,
            StructuralFeature::PoreCore => rec.is_pore_region,
            StructuralFeature::Interface => rec.is_interface,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContingencyTable {
    pub a: u64,
    pub b: u64,
    pub c: u64,
    pub d: u64,
}

impl ContingencyTable {
    pub fn new(a: u64, b: u64, c: u64, d: u64) -> Self {
        Self { a, b, c, d }
    }

    /// Count rows by priority tier and feature. Rows whose feature value is
    /// missing are not counted.
    pub fn from_records(records: &[VariantRecord], feature: StructuralFeature) -> Self {
        let mut t = Self::default();
        for rec in records {
            let high = rec.priority_category == Some(PriorityCategory::High);
            match (high, feature.value(rec)) {
                (true, Some(true)) => t.a += 1,
                (true, Some(false)) => t.b += 1,
                (false, Some(true)) => t.c += 1,
                (false, Some(false)) => t.d += 1,
                (_, None) => {}
            }
        }
        t
    }

    pub fn total(&self) -> u64 {
        self.a + self.b + self.c + self.d
    }

    pub fn has_empty_margin(&self) -> bool {
        self.a + self.b == 0 || self.c + self.d == 0 || self.a + self.c == 0 || self.b + self.d == 0
    }

    /// `AD/BC`, infinite when `B·C = 0`.
    pub fn sample_odds_ratio(&self) -> f64 {
        if self.has_empty_margin() {
            return f64::NAN;
        }
        let bc = (self.b * self.c) as f64;
        if bc == 0.0 {
            f64::INFINITY
        } else {
            (self.a * self.d) as f64 / bc
        }
    }
}

/// Two-sided Fisher exact p-value: the total probability of every table with
/// the observed margins that is no more likely than the observed table.
pub fn fisher_exact(table: &ContingencyTable) -> Result<f64> {
    if table.has_empty_margin() {
        return Ok(1.0);
    }
    let total = table.total();
    let row1 = table.a + table.b;
    let col1 = table.a + table.c;
    let dist = Hypergeometric::new(total, col1, row1)
        .map_err(|e| PathovarError::Parse(format!("invalid contingency table {:?}: {}", table, e)))?;

    let p_observed = dist.pmf(table.a);
    let threshold = p_observed * (1.0 + PMF_RELATIVE_TOLERANCE);
    let lo = (row1 + col1).saturating_sub(total);
    let hi = row1.min(col1);
    let p: f64 = (lo..=hi).map(|k| dist.pmf(k)).filter(|p| *p <= threshold).sum();
    Ok(p.min(1.0))
}

/// Fisher's noncentral hypergeometric distribution of the top-left cell given
/// the table margins.
struct ConditionalDistribution {
    lo: u64,
    hi: u64,
    log_weights: Vec<f64>,
}

impl ConditionalDistribution {
    fn new(table: &ContingencyTable) -> Self {
        let total = table.total();
        let row1 = table.a + table.b;
        let col1 = table.a + table.c;
        let lo = (row1 + col1).saturating_sub(total);
        let hi = row1.min(col1);
        let log_weights = (lo..=hi)
            .map(|k| ln_binomial(row1, k) + ln_binomial(total - row1, col1 - k))
            .collect();
        Self { lo, hi, log_weights }
    }

    fn probabilities(&self, log_nc: f64) -> Vec<f64> {
        let scaled: Vec<f64> = self
            .log_weights
            .iter()
            .zip(self.lo..)
            .map(|(w, k)| w + k as f64 * log_nc)
            .collect();
        let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let unnorm: Vec<f64> = scaled.iter().map(|s| (s - max).exp()).collect();
        let sum: f64 = unnorm.iter().sum();
        unnorm.into_iter().map(|p| p / sum).collect()
    }

    fn mean(&self, log_nc: f64) -> f64 {
        self.probabilities(log_nc)
            .iter()
            .zip(self.lo..)
            .map(|(p, k)| p * k as f64)
            .sum()
    }

    /// P(X >= x)
    fn sf(&self, x: u64, log_nc: f64) -> f64 {
        self.probabilities(log_nc)
            .iter()
            .zip(self.lo..)
            .filter(|(_, k)| *k >= x)
            .map(|(p, _)| p)
            .sum()
    }

    /// P(X <= x)
    fn cdf(&self, x: u64, log_nc: f64) -> f64 {
        self.probabilities(log_nc)
            .iter()
            .zip(self.lo..)
            .filter(|(_, k)| *k <= x)
            .map(|(p, _)| p)
            .sum()
    }
}

/// Root of an increasing function of the log noncentrality.
fn solve_increasing<F: Fn(f64) -> f64>(f: F, target: f64) -> f64 {
    let (mut lo, mut hi) = (-LOG_NC_BOUND, LOG_NC_BOUND);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if f(mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Conditional maximum likelihood odds ratio and its exact confidence
/// interval at `confidence`.
pub fn conditional_odds_ratio(table: &ContingencyTable, confidence: f64) -> (f64, f64, f64) {
    if table.has_empty_margin() {
        return (f64::NAN, 0.0, f64::INFINITY);
    }
    let dist = ConditionalDistribution::new(table);
    let x = table.a;
    let tail = (1.0 - confidence) / 2.0;

    let estimate = if x == dist.lo {
        0.0
    } else if x == dist.hi {
        f64::INFINITY
    } else {
        solve_increasing(|t| dist.mean(t), x as f64).exp()
    };
    let lower = if x == dist.lo {
        0.0
    } else {
        solve_increasing(|t| dist.sf(x, t), tail).exp()
    };
    let upper = if x == dist.hi {
        f64::INFINITY
    } else {
        solve_increasing(|t| -dist.cdf(x, t), -tail).exp()
    };
    (estimate, lower, upper)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentResult {
    pub feature: StructuralFeature,
    pub table: ContingencyTable,
    pub odds_ratio: f64,
    pub conditional_odds_ratio: f64,
    pub lower_ci: f64,
    pub upper_ci: f64,
    pub p_value: f64,
}

pub fn feature_enrichment(records: &[VariantRecord], feature: StructuralFeature) -> Result<EnrichmentResult> {
    let table = ContingencyTable::from_records(records, feature);
    let p_value = fisher_exact(&table)?;
    let (conditional, lower_ci, upper_ci) = conditional_odds_ratio(&table, CONFIDENCE_LEVEL);
    Ok(EnrichmentResult {
        feature,
        table,
        odds_ratio: table.sample_odds_ratio(),
        conditional_odds_ratio: conditional,
        lower_ci,
        upper_ci,
        p_value,
    })
}

/// Test every structural feature against the High tier.
pub fn structural_enrichment(records: &[VariantRecord]) -> Result<Vec<EnrichmentResult>> {
    StructuralFeature::ALL
        .iter()
        .map(|f| {
            let r = feature_enrichment(records, *f)?;
            info!(
                feature = f.name(),
                odds_ratio = r.odds_ratio,
                p_value = r.p_value,
                "Enrichment tested"
            );
            Ok(r)
        })
        .collect()
}

/// Contingency counts, odds ratio and p-value per feature.
pub fn render_report(results: &[EnrichmentResult]) -> String {
    let mut out = String::new();
    for r in results {
        let t = &r.table;
        let _ = writeln!(out, "--- {} ---", r.feature.name());
        let _ = writeln!(out, "A (High, True)      : {}", t.a);
        let _ = writeln!(out, "B (High, False)     : {}", t.b);
        let _ = writeln!(out, "C (Not High, True)  : {}", t.c);
        let _ = writeln!(out, "D (Not High, False) : {}", t.d);
        let _ = writeln!(out, "Odds Ratio          : {}", r.odds_ratio);
        let _ = writeln!(out, "p-value             : {}\n", r.p_value);
    }
    out
}

/// Tab-separated odds ratios with confidence bounds.
pub fn render_tsv(results: &[EnrichmentResult]) -> String {
    let mut lines = vec!["Feature\tOR\tLower_CI\tUpper_CI\tp-value".to_string()];
    for r in results {
        lines.push(format!(
            "{}\t{:.4}\t{:.4}\t{:.4}\t{:.4e}",
            r.feature.name(),
            r.odds_ratio,
            r.lower_ci,
            r.upper_ci,
            r.p_value
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel_close(actual: f64, expected: f64, tol: f64) -> bool {
        ((actual - expected) / expected).abs() < tol
    }

    #[test]
    fn test_tea_tasting() {
        let t = ContingencyTable::new(3, 1, 1, 3);
        let p = fisher_exact(&t).unwrap();
        assert!((p - 0.485714).abs() < 1e-5, "p={}", p);
        assert_eq!(t.sample_odds_ratio(), 9.0);

        let (est, lo, hi) = conditional_odds_ratio(&t, CONFIDENCE_LEVEL);
        assert!(rel_close(est, 6.408309, 1e-4), "est={}", est);
        assert!(rel_close(lo, 0.211733, 1e-3), "lo={}", lo);
        assert!(hi > 500.0 && hi < 700.0, "hi={}", hi);
    }

    #[test]
    fn test_strong_association() {
        let t = ContingencyTable::new(8, 1, 1, 8);
        let p = fisher_exact(&t).unwrap();
        assert!(p < 0.05, "p={}", p);
        assert!((p - 0.003373).abs() < 1e-5, "p={}", p);
        assert_eq!(t.sample_odds_ratio(), 64.0);
        let (est, lo, hi) = conditional_odds_ratio(&t, CONFIDENCE_LEVEL);
        assert!(lo > 1.0);
        assert!(lo <= est && est <= hi);
    }

    #[test]
    fn test_balanced_table() {
        let t = ContingencyTable::new(5, 5, 5, 5);
        let p = fisher_exact(&t).unwrap();
        assert!((p - 1.0).abs() < 1e-9);
        let (est, lo, hi) = conditional_odds_ratio(&t, CONFIDENCE_LEVEL);
        assert!((est - 1.0).abs() < 1e-6);
        // symmetric on the log scale
        assert!((lo * hi - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_support_boundaries() {
        let t = ContingencyTable::new(0, 5, 5, 5);
        assert_eq!(t.sample_odds_ratio(), 0.0);
        let (est, lo, hi) = conditional_odds_ratio(&t, CONFIDENCE_LEVEL);
        assert_eq!((est, lo), (0.0, 0.0));
        assert!(hi.is_finite() && hi > 0.0);

        let t = ContingencyTable::new(5, 0, 3, 4);
        assert_eq!(t.sample_odds_ratio(), f64::INFINITY);
        let (est, lo, hi) = conditional_odds_ratio(&t, CONFIDENCE_LEVEL);
        assert_eq!(est, f64::INFINITY);
        assert_eq!(hi, f64::INFINITY);
        assert!(lo > 0.0 && lo.is_finite());
    }

    #[test]
    fn test_empty_margin() {
        let t = ContingencyTable::new(0, 0, 3, 7);
        assert!(t.sample_odds_ratio().is_nan());
        assert_eq!(fisher_exact(&t).unwrap(), 1.0);
        let (est, lo, hi) = conditional_odds_ratio(&t, CONFIDENCE_LEVEL);
        assert!(est.is_nan());
        assert_eq!((lo, hi), (0.0, f64::INFINITY));
    }

    #[test]
    fn test_p_value_in_unit_interval() {
        for (a, b, c, d) in [(1, 9, 11, 3), (0, 3, 40, 12), (2, 2, 2, 30), (7, 0, 0, 1)] {
            let p = fisher_exact(&ContingencyTable::new(a, b, c, d)).unwrap();
            assert!((0.0..=1.0).contains(&p), "p={} for {:?}", p, (a, b, c, d));
        }
    }

    fn row(cat: PriorityCategory, binding: Option<bool>, pore: Option<bool>) -> VariantRecord {
        VariantRecord {
            priority_category: Some(cat),
            is_binding_site: binding,
            is_pore_region: pore,
            is_interface: Some(false),
            ..Default::default()
        }
    }

    #[test]
    fn test_table_from_records() {
        let rows = vec![
            row(PriorityCategory::High, Some(true), Some(true)),
            row(PriorityCategory::High, Some(false), None),
            row(PriorityCategory::Medium, Some(true), Some(false)),
            row(PriorityCategory::VeryLow, Some(false), Some(false)),
            row(PriorityCategory::Low, None, Some(false)),
        ];
        assert_eq!(
            ContingencyTable::from_records(&rows, StructuralFeature::BindingSite),
            ContingencyTable::new(1, 1, 1, 1)
        );
        assert_eq!(
            ContingencyTable::from_records(&rows, StructuralFeature::PoreCore),
            ContingencyTable::new(1, 0, 0, 3)
        );
    }

    #[test]
    fn test_rendering() {
        let rows = vec![
            row(PriorityCategory::High, Some(true), Some(true)),
            row(PriorityCategory::Low, Some(false), Some(false)),
        ];
        let results = structural_enrichment(&rows).unwrap();
        assert_eq!(results.len(), 3);

        let tsv = render_tsv(&results);
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], "Feature\tOR\tLower_CI\tUpper_CI\tp-value");
        assert!(lines[1].starts_with("is_binding_site\tinf\t"));
        // interface is false everywhere, so a margin is empty
        assert!(lines[3].starts_with("is_interface\tNaN\t0.0000\tinf\t"));

        let report = render_report(&results);
        assert!(report.contains("--- is_pore_core ---"));
        assert!(report.contains("A (High, True)      : 1"));
    }
}
