//! A materialized GenBank locus and queries over its features

use crate::error::{GbToolsError, Result};
use crate::feature::Feature;
use crate::header::Header;
use crate::location::FeatureLocation;
use crate::sequence::revcomp;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Feature type that spans the whole record and is left out of overlap
/// queries
const SOURCE_FEATURE: &str = "source";

/// One GenBank record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locus {
    pub name: String,
    /// Bases in file case, empty when the record has no ORIGIN block
    pub sequence: String,
    pub header: Header,
    /// Features keyed by type, each list sorted by start position
    pub features: IndexMap<String, Vec<Feature>>,
}

impl Locus {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.features.values().map(Vec::len).sum()
    }

    /// All features of the locus, grouped by type
    pub fn all_features(&self) -> impl Iterator<Item = &Feature> {
        self.features.values().flatten()
    }

    /// Features overlapping `location`, `source` features excluded
    pub fn features_at_location(&self, location: &FeatureLocation) -> Vec<&Feature> {
        self.features
            .iter()
            .filter(|(feature_type, _)| feature_type.as_str() != SOURCE_FEATURE)
            .flat_map(|(_, features)| features)
            .filter(|feature| feature.location.overlaps(location))
            .collect()
    }

    /// Next feature of the same type and strand towards the 5' end of
    /// `feature`'s strand
    pub fn next_upstream(&self, feature: &Feature) -> Option<&Feature> {
        self.neighbor(feature, false)
    }

    /// Next feature of the same type and strand towards the 3' end of
    /// `feature`'s strand
    pub fn next_downstream(&self, feature: &Feature) -> Option<&Feature> {
        self.neighbor(feature, true)
    }

    fn neighbor(&self, feature: &Feature, downstream: bool) -> Option<&Feature> {
        let features = self.features.get(&feature.feature_type)?;
        let mut i = features.iter().position(|f| f == feature)?;
        let complement = feature.location.is_complement();
        // Forward-strand downstream and reverse-strand upstream both walk
        // towards higher coordinates.
        let ascending = complement != downstream;

        loop {
            i = if ascending {
                Some(i + 1).filter(|&next| next < features.len())?
            } else {
                i.checked_sub(1)?
            };
            let candidate = &features[i];
            if candidate.location.is_complement() == complement {
                return Some(candidate);
            }
        }
    }

    /// Bases covered by `location`. Joined segments are concatenated and
    /// the result is reverse complemented for complement locations.
    pub fn subsequence(&self, location: &FeatureLocation) -> Result<String> {
        let mut bases = String::new();
        for segment in location.segments() {
            let (start, end) = (segment.start() as usize, segment.end() as usize);
            let slice = self.sequence.get(start..=end).ok_or_else(|| {
                GbToolsError::InvalidInput(format!(
                    "{} lies outside {} ({} bp)",
                    segment,
                    self.name,
                    self.len()
                ))
            })?;
            bases.push_str(slice);
        }

        if location.is_complement() {
            Ok(revcomp(&bases))
        } else {
            Ok(bases)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genbank::GenBank;
    use crate::location::parse_location;
    use crate::testdata::{temp_file, u49845, TESTLOCUS};

    fn load(text: &str) -> Locus {
        let file = temp_file(text);
        GenBank::open(file.path()).unwrap().locus(0).unwrap()
    }

    fn cds_at<'a>(locus: &'a Locus, location: &str) -> &'a Feature {
        locus.features["CDS"]
            .iter()
            .find(|f| f.location.to_string() == location)
            .unwrap()
    }

    #[test]
    fn test_next_downstream_forward() {
        let locus = load(TESTLOCUS);
        let first = cds_at(&locus, "7..693");
        let next = locus.next_downstream(first).unwrap();
        assert_eq!(next.location.to_string(), "697..3303");
        assert!(locus.next_downstream(next).is_none());
    }

    #[test]
    fn test_next_downstream_complement() {
        let locus = load(TESTLOCUS);
        let last = cds_at(&locus, "complement(4167..5516)");
        let next = locus.next_downstream(last).unwrap();
        assert_eq!(next.location.to_string(), "complement(3381..4166)");
        assert!(locus.next_downstream(next).is_none());
    }

    #[test]
    fn test_next_upstream() {
        let locus = load(TESTLOCUS);
        let second = cds_at(&locus, "697..3303");
        assert_eq!(
            locus.next_upstream(second).unwrap().location.to_string(),
            "7..693"
        );
        assert!(locus.next_upstream(cds_at(&locus, "7..693")).is_none());

        let rev = cds_at(&locus, "complement(3381..4166)");
        assert_eq!(
            locus.next_upstream(rev).unwrap().location.to_string(),
            "complement(4167..5516)"
        );
    }

    #[test]
    fn test_neighbor_of_unknown_feature() {
        let locus = load(TESTLOCUS);
        let stranger = Feature::new(
            "testlocus",
            "CDS",
            parse_location("10..20").unwrap(),
            Default::default(),
        );
        assert!(locus.next_downstream(&stranger).is_none());
    }

    #[test]
    fn test_mrna_neighbors() {
        let locus = load(&u49845());
        let mrna = &locus.features["mRNA"];
        let next = locus.next_downstream(&mrna[0]).unwrap();
        assert_eq!(next.location.to_string(), "<30..>100");
        assert!(locus.next_downstream(next).is_none());
    }

    #[test]
    fn test_neighbors_skip_opposite_strand() {
        let locus = load(
            "LOCUS       mixed 80 bp DNA linear 01-JAN-2000\n\
             FEATURES             Location/Qualifiers\n     \
             CDS             1..10\n     \
             CDS             complement(20..30)\n     \
             CDS             40..50\n     \
             CDS             complement(60..70)\n\
             ORIGIN\n\
             //\n",
        );

        let forward = locus.next_downstream(cds_at(&locus, "1..10")).unwrap();
        assert_eq!(forward.location.to_string(), "40..50");
        let back = locus.next_upstream(forward).unwrap();
        assert_eq!(back.location.to_string(), "1..10");

        let reverse = locus
            .next_downstream(cds_at(&locus, "complement(60..70)"))
            .unwrap();
        assert_eq!(reverse.location.to_string(), "complement(20..30)");
        let back = locus.next_upstream(reverse).unwrap();
        assert_eq!(back.location.to_string(), "complement(60..70)");
    }

    #[test]
    fn test_features_at_location() {
        let locus = load(&u49845());
        let hits = locus.features_at_location(&parse_location("25..35").unwrap());
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|f| f.feature_type != "source"));

        let hits = locus.features_at_location(&parse_location("21..29").unwrap());
        assert!(hits.is_empty());
    }

    #[test]
    fn test_subsequence() {
        let locus = load(&u49845());
        let forward = locus
            .subsequence(&parse_location("1..10").unwrap())
            .unwrap();
        assert_eq!(forward, "gatcctccat");

        let reverse = locus
            .subsequence(&parse_location("complement(1..10)").unwrap())
            .unwrap();
        assert_eq!(reverse, "atggaggatc");

        let joined = locus
            .subsequence(&parse_location("join(1..3,8..10)").unwrap())
            .unwrap();
        assert_eq!(joined, "gatcat");

        assert!(locus
            .subsequence(&parse_location("100..121").unwrap())
            .is_err());
    }
}
