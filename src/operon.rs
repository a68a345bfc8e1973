//! Operon extraction around probe matches
//!
//! A probe hit (typically a promoter) is widened by the configured number
//! of bases upstream and downstream, relative to the strand it was found
//! on. The first feature of the configured type on the same strand that
//! overlaps the widened region, in reading direction, starts the operon.
//! Downstream neighbors are then added for as long as the gap to the
//! previous feature stays within `max_distance`.

use crate::error::Result;
use crate::fasta::FastaRecord;
use crate::feature::Feature;
use crate::location::{FeatureLocation, Location, Strand};
use crate::locus::Locus;
use crate::search::Match;
use log::debug;
use serde::{Deserialize, Serialize};

/// Settings for [`find_operon`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperonConfig {
    /// Largest gap in bases allowed between consecutive features
    pub max_distance: u64,
    /// Bases added to the match on its 5' side
    pub upstream: u64,
    /// Bases added to the match on its 3' side
    pub downstream: u64,
    /// Feature type the operon is built from
    pub feature_type: String,
}

impl Default for OperonConfig {
    fn default() -> Self {
        Self {
            max_distance: 500,
            upstream: 0,
            downstream: 0,
            feature_type: "CDS".to_string(),
        }
    }
}

/// Features making up one operon and the bases they span
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operon {
    pub locus: String,
    pub strand: Strand,
    /// From the first feature to the last in reading direction
    pub features: Vec<Feature>,
    /// Span from the lowest start to the highest end of the features
    pub location: FeatureLocation,
    /// Bases of the span, reverse complemented on the reverse strand
    pub sequence: String,
}

impl Operon {
    pub fn to_fasta(&self) -> FastaRecord {
        FastaRecord::new(
            format!("{}:{} {}", self.locus, self.location, self.strand),
            self.sequence.clone(),
        )
    }
}

/// Region covered by `hit` after widening it, clamped to the locus
fn search_region(locus: &Locus, hit: &Match, config: &OperonConfig) -> Result<FeatureLocation> {
    let (left, right) = match hit.strand {
        Strand::Forward => (config.upstream, config.downstream),
        Strand::Reverse => (config.downstream, config.upstream),
    };
    let last = (locus.len() as u64).saturating_sub(1);
    let start = (hit.start as u64).saturating_sub(left);
    let end = (hit.end as u64).saturating_add(right).min(last).max(start);

    Location::from_int(start + 1, Some(end + 1), hit.strand).map(FeatureLocation::from)
}

/// Build the operon that the probe `hit` on `locus` points at, if any.
pub fn find_operon(locus: &Locus, hit: &Match, config: &OperonConfig) -> Result<Option<Operon>> {
    let Some(features) = locus.features.get(&config.feature_type) else {
        return Ok(None);
    };
    let region = search_region(locus, hit, config)?;
    let mut candidates = features
        .iter()
        .filter(|f| f.location.strand() == hit.strand && f.location.overlaps(&region));
    let seed = if hit.strand.is_reverse() {
        candidates.last()
    } else {
        candidates.next()
    };
    let Some(seed) = seed else {
        debug!("no {} overlaps {} on {}", config.feature_type, region, locus.name);
        return Ok(None);
    };

    let mut operon = vec![seed.clone()];
    let mut current = seed;
    while let Some(next) = locus.next_downstream(current) {
        if current.location.min_distance(&next.location) > config.max_distance {
            break;
        }
        operon.push(next.clone());
        current = next;
    }

    let start = operon.iter().map(|f| f.location.start()).min().unwrap_or(0);
    let end = operon.iter().map(|f| f.location.end()).max().unwrap_or(0);
    let location: FeatureLocation = Location::from_int(start + 1, Some(end + 1), hit.strand)?.into();
    let sequence = locus.subsequence(&location)?;

    Ok(Some(Operon {
        locus: locus.name.clone(),
        strand: hit.strand,
        features: operon,
        location,
        sequence,
    }))
}
