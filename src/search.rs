//! Approximate probe matching

use crate::error::{GbToolsError, Result};
use crate::location::{FeatureLocation, Location, Strand};
use crate::sequence::Alphabet;
use serde::{Deserialize, Serialize};

/// Options for [`search_both_strands`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum number of mismatching bases per match
    pub mismatches: usize,
    /// Also search for the reverse complement of the probe
    pub both_strands: bool,
    /// Alphabet the probe is written in
    pub alphabet: Alphabet,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mismatches: 0,
            both_strands: true,
            alphabet: Alphabet::IupacDna,
        }
    }
}

/// A probe hit. Coordinates are 0-based and inclusive on the forward strand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
}

impl Match {
    /// The hit as a feature location
    pub fn location(&self) -> Result<FeatureLocation> {
        Location::from_int(self.start as u64 + 1, Some(self.end as u64 + 1), self.strand)
            .map(FeatureLocation::from)
    }
}

/// Number of positions at which `a` and `b` differ, ignoring case.
///
/// With `max` set, counting stops as soon as the distance exceeds it, so
/// the returned value is at most `max + 1`.
pub fn hamming_distance(a: &str, b: &str, max: Option<usize>) -> Result<usize> {
    mismatches(a.as_bytes(), b.as_bytes(), max, |x, y| {
        x.eq_ignore_ascii_case(&y)
    })
}

fn mismatches<F>(pattern: &[u8], target: &[u8], max: Option<usize>, same: F) -> Result<usize>
where
    F: Fn(u8, u8) -> bool,
{
    if pattern.len() != target.len() {
        return Err(GbToolsError::InvalidInput(format!(
            "sequences differ in length ({} and {})",
            pattern.len(),
            target.len()
        )));
    }

    let limit = max.unwrap_or(usize::MAX);
    let mut distance = 0;
    for (&x, &y) in pattern.iter().zip(target) {
        if !same(x, y) {
            distance += 1;
            if distance > limit {
                break;
            }
        }
    }
    Ok(distance)
}

fn scan(needle: &[u8], haystack: &[u8], mismatches_allowed: usize, alphabet: Alphabet) -> Vec<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| {
            mismatches(needle, window, Some(mismatches_allowed), |p, t| {
                alphabet.equals(p, t)
            })
            .is_ok_and(|d| d <= mismatches_allowed)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Start positions of every window of `haystack` matching `needle` with at
/// most `mismatches` differences. Ambiguity codes in `needle` match any of
/// the bases they stand for.
pub fn search(needle: &str, haystack: &str, mismatches: usize) -> Result<Vec<usize>> {
    if needle.is_empty() {
        return Err(GbToolsError::InvalidInput("empty search probe".to_string()));
    }
    Ok(scan(
        needle.as_bytes(),
        haystack.as_bytes(),
        mismatches,
        Alphabet::IupacDna,
    ))
}

/// Search `haystack` for `needle` and, if requested, its reverse
/// complement. Forward hits come first, then reverse hits, each in
/// position order.
pub fn search_both_strands(
    needle: &str,
    haystack: &str,
    options: &SearchOptions,
) -> Result<Vec<Match>> {
    if needle.is_empty() {
        return Err(GbToolsError::InvalidInput("empty search probe".to_string()));
    }

    let to_match = |strand: Strand| {
        move |start: usize| Match {
            start,
            end: start + needle.len() - 1,
            strand,
        }
    };

    let mut matches: Vec<Match> = scan(
        needle.as_bytes(),
        haystack.as_bytes(),
        options.mismatches,
        options.alphabet,
    )
    .into_iter()
    .map(to_match(Strand::Forward))
    .collect();

    if options.both_strands {
        let reverse = options.alphabet.revcomp(needle);
        matches.extend(
            scan(
                reverse.as_bytes(),
                haystack.as_bytes(),
                options.mismatches,
                options.alphabet,
            )
            .into_iter()
            .map(to_match(Strand::Reverse)),
        );
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_distance() {
        assert_eq!(hamming_distance("acgt", "acgt", None).unwrap(), 0);
        assert_eq!(hamming_distance("acgt", "ACGA", None).unwrap(), 1);
        assert_eq!(hamming_distance("aaaa", "tttt", None).unwrap(), 4);
    }

    #[test]
    fn test_hamming_distance_early_exit() {
        assert_eq!(hamming_distance("aaaa", "tttt", Some(1)).unwrap(), 2);
        assert_eq!(hamming_distance("aaaa", "attt", Some(5)).unwrap(), 3);
    }

    #[test]
    fn test_hamming_distance_unequal_lengths() {
        assert!(matches!(
            hamming_distance("acg", "acgt", None),
            Err(GbToolsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_search_exact() {
        assert_eq!(search("acg", "acgtacgt", 0).unwrap(), vec![0, 4]);
        assert_eq!(search("ggg", "acgtacgt", 0).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_search_includes_last_window() {
        assert_eq!(search("cgt", "acgtacgt", 0).unwrap(), vec![1, 5]);
        assert_eq!(search("acgt", "acgt", 0).unwrap(), vec![0]);
    }

    #[test]
    fn test_search_mismatches() {
        assert_eq!(search("aag", "aaaaag", 0).unwrap(), vec![3]);
        assert_eq!(search("aag", "aaaaag", 1).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_search_ambiguous_probe() {
        assert_eq!(search("anc", "aacagc", 0).unwrap(), vec![0, 3]);
        assert_eq!(search("RT", "atgtct", 0).unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_search_edge_cases() {
        assert!(search("acgtacgt", "acg", 0).unwrap().is_empty());
        assert!(search("", "acg", 0).is_err());
    }

    #[test]
    fn test_both_strands() {
        let haystack = "ttatgcccccgcatgg";
        let matches = search_both_strands("atgc", haystack, &SearchOptions::default()).unwrap();
        assert_eq!(
            matches,
            vec![
                Match { start: 2, end: 5, strand: Strand::Forward },
                Match { start: 10, end: 13, strand: Strand::Reverse },
            ]
        );

        let forward_only = SearchOptions {
            both_strands: false,
            ..SearchOptions::default()
        };
        assert_eq!(
            search_both_strands("atgc", haystack, &forward_only).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_match_location() {
        let hit = Match { start: 10, end: 13, strand: Strand::Reverse };
        let location = hit.location().unwrap();
        assert_eq!(location.to_string(), "complement(11..14)");
        assert!(location.is_complement());
    }
}
