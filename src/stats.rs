//! Statistics computation for GenBank files

use crate::error::Result;
use crate::genbank::GenBank;
use crate::location::Strand;
use crate::locus::Locus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics about the loci of a GenBank file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenBankStats {
    /// Number of loci
    pub locus_count: usize,
    /// Total sequence length across all loci
    pub total_sequence_length: u64,
    /// Average locus sequence length
    pub average_locus_length: f64,
    /// Minimum locus sequence length
    pub min_locus_length: usize,
    /// Maximum locus sequence length
    pub max_locus_length: usize,
    /// N50 of locus sequence lengths
    pub n50: usize,
    /// GC content percentage
    pub gc_content: f64,
    /// Total number of features
    pub feature_count: usize,
    /// Features per type
    pub feature_counts: BTreeMap<String, usize>,
    /// Features on the forward strand
    pub forward_features: usize,
    /// Features on the reverse strand
    pub reverse_features: usize,
}

impl GenBankStats {
    /// Compute statistics over every locus of an indexed file
    pub fn from_genbank(genbank: &GenBank) -> Result<Self> {
        let mut stats = GenBankStats::default();
        let mut lengths = Vec::with_capacity(genbank.len());
        let mut gc = GcCounter::default();

        for locus in genbank.iter() {
            let locus = locus?;
            stats.add_locus(&locus, &mut gc);
            lengths.push(locus.len());
        }

        stats.finish(&lengths, &gc);
        Ok(stats)
    }

    /// Compute statistics over already materialized loci
    pub fn from_loci(loci: &[Locus]) -> Self {
        let mut stats = GenBankStats::default();
        let mut gc = GcCounter::default();
        for locus in loci {
            stats.add_locus(locus, &mut gc);
        }
        let lengths: Vec<usize> = loci.iter().map(Locus::len).collect();
        stats.finish(&lengths, &gc);
        stats
    }

    fn add_locus(&mut self, locus: &Locus, gc: &mut GcCounter) {
        self.locus_count += 1;
        self.total_sequence_length += locus.len() as u64;
        gc.add(&locus.sequence);

        for (feature_type, features) in &locus.features {
            *self.feature_counts.entry(feature_type.clone()).or_insert(0) += features.len();
            for feature in features {
                match feature.location.strand() {
                    Strand::Forward => self.forward_features += 1,
                    Strand::Reverse => self.reverse_features += 1,
                }
            }
        }
    }

    fn finish(&mut self, lengths: &[usize], gc: &GcCounter) {
        if !lengths.is_empty() {
            self.min_locus_length = lengths.iter().copied().min().unwrap_or(0);
            self.max_locus_length = lengths.iter().copied().max().unwrap_or(0);
            self.average_locus_length =
                lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
        }
        self.n50 = compute_n50(lengths);
        self.gc_content = gc.percent();
        self.feature_count = self.feature_counts.values().sum();
    }

    /// Format statistics as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut output = String::new();
        output.push_str("=== GenBank Statistics ===\n\n");

        output.push_str(&format!(
            "Loci:                    {:>12}\n",
            self.locus_count
        ));
        output.push_str(&format!(
            "Features:                {:>12}\n",
            self.feature_count
        ));
        output.push_str(&format!(
            "  forward strand:        {:>12}\n",
            self.forward_features
        ));
        output.push_str(&format!(
            "  reverse strand:        {:>12}\n",
            self.reverse_features
        ));
        output.push('\n');

        output.push_str("--- Sequence Statistics ---\n");
        output.push_str(&format!(
            "Total sequence length:   {:>12} bp\n",
            self.total_sequence_length
        ));
        output.push_str(&format!(
            "Average locus length:    {:>12.2} bp\n",
            self.average_locus_length
        ));
        output.push_str(&format!(
            "Min locus length:        {:>12} bp\n",
            self.min_locus_length
        ));
        output.push_str(&format!(
            "Max locus length:        {:>12} bp\n",
            self.max_locus_length
        ));
        output.push_str(&format!("N50:                     {:>12} bp\n", self.n50));
        output.push_str(&format!(
            "GC content:              {:>12.2}%\n",
            self.gc_content
        ));

        if !self.feature_counts.is_empty() {
            output.push('\n');
            output.push_str("--- Feature Types ---\n");
            for (feature_type, count) in &self.feature_counts {
                output.push_str(&format!("{:>15}: {:>8}\n", feature_type, count));
            }
        }

        output
    }

    /// Export statistics as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Default)]
struct GcCounter {
    gc: u64,
    total: u64,
}

impl GcCounter {
    fn add(&mut self, sequence: &str) {
        for b in sequence.bytes() {
            match b.to_ascii_uppercase() {
                b'G' | b'C' => {
                    self.gc += 1;
                    self.total += 1;
                }
                b'A' | b'T' => self.total += 1,
                // N and other ambiguity codes
                _ => {}
            }
        }
    }

    fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.gc as f64 / self.total as f64) * 100.0
        }
    }
}

fn compute_n50(lengths: &[usize]) -> usize {
    let mut sorted: Vec<usize> = lengths.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let half = sorted.iter().sum::<usize>() / 2;
    let mut cumsum = 0;
    for len in sorted {
        cumsum += len;
        if cumsum >= half {
            return len;
        }
    }

    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::{temp_file, u49845, TESTLOCUS};

    fn stats_for(text: &str) -> GenBankStats {
        let file = temp_file(text);
        let genbank = GenBank::open(file.path()).unwrap();
        GenBankStats::from_genbank(&genbank).unwrap()
    }

    #[test]
    fn test_basic_stats() {
        let stats = stats_for(&u49845());

        assert_eq!(stats.locus_count, 1);
        assert_eq!(stats.total_sequence_length, 120);
        assert_eq!(stats.feature_count, 9);
        assert_eq!(stats.feature_counts["CDS"], 3);
        assert_eq!(stats.feature_counts["gene"], 2);
        assert_eq!(stats.forward_features, 6);
        assert_eq!(stats.reverse_features, 3);
    }

    #[test]
    fn test_gc_content() {
        let stats = stats_for(&u49845());
        // 55 of 120 bases are G or C
        assert!((stats.gc_content - 45.8333).abs() < 0.01);
    }

    #[test]
    fn test_multiple_loci() {
        let stats = stats_for(&format!("{}\n{}", u49845(), TESTLOCUS));

        assert_eq!(stats.locus_count, 2);
        assert_eq!(stats.feature_counts["CDS"], 7);
        assert_eq!(stats.min_locus_length, 0);
        assert_eq!(stats.max_locus_length, 120);
        assert!((stats.average_locus_length - 60.0).abs() < f64::EPSILON);
        assert_eq!(stats.n50, 120);
    }

    #[test]
    fn test_from_loci_matches_file() {
        let file = temp_file(&u49845());
        let genbank = GenBank::open(file.path()).unwrap();
        let loci: Vec<Locus> = genbank.iter().collect::<Result<_>>().unwrap();

        let from_loci = GenBankStats::from_loci(&loci);
        assert_eq!(from_loci.feature_counts, stats_for(&u49845()).feature_counts);
        assert_eq!(GenBankStats::from_loci(&[]).locus_count, 0);
    }

    #[test]
    fn test_n50() {
        let lengths = vec![10, 20, 30, 40, 50];
        // half of 150 is reached at 50 + 40
        assert_eq!(compute_n50(&lengths), 40);
        assert_eq!(compute_n50(&[]), 0);
    }

    #[test]
    fn test_summary_and_json() {
        let stats = stats_for(&u49845());
        let summary = stats.format_summary();
        assert!(summary.contains("--- Feature Types ---"));
        assert!(summary.contains("mRNA"));

        let json: serde_json::Value = serde_json::from_str(&stats.to_json().unwrap()).unwrap();
        assert_eq!(json["locus_count"], 1);
        assert_eq!(json["feature_counts"]["source"], 1);
    }
}
