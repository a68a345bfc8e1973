//! GenBank feature locations
//!
//! Locations in GenBank files are 1-based and inclusive. Everything in this
//! module stores them 0-based (still inclusive), so `42..84` becomes
//! `start = 41`, `end = 83`. The original text can always be recovered
//! through [`std::fmt::Display`].
//!
//! Supported location forms are single bases (`467`), ranges (`340..565`),
//! ranges with an uncertain lower and/or upper bound (`<345..500`,
//! `1..>888`, `<1..>888`), one-of-two-bases (`102.110`), any of those
//! wrapped in `complement(...)`, and `join(...)` of them, optionally
//! wrapped in `complement(...)` as a whole.
//!
//! See <http://www.insdc.org/files/feature_table.html#3.4> for the format.

use crate::error::{GbToolsError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strand of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn is_reverse(self) -> bool {
        self == Strand::Reverse
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// Shape of a simple location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    /// `467`
    Single,
    /// `340..565`
    Range,
    /// `<345..500`
    LowerUnknown,
    /// `1..>888`
    UpperUnknown,
    /// `<1..>888`
    LowerUpperUnknown,
    /// `102.110`, a single base somewhere between the two positions
    OneOf,
}

static COMPLEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^complement\((.+)\)$").expect("complement grammar"));

static COMPLEMENT_JOIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^complement\((join\(.+\))\)$").expect("complement join grammar"));

static JOIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^join\((.+)\)$").expect("join grammar"));

/// Simple location grammars, tried in order. The patterns are anchored and
/// mutually exclusive, so the first match is the only match.
static GRAMMARS: Lazy<Vec<(Regex, LocationKind)>> = Lazy::new(|| {
    [
        (r"^(\d+)$", LocationKind::Single),
        (r"^(\d+)\.\.(\d+)$", LocationKind::Range),
        (r"^<(\d+)\.\.(\d+)$", LocationKind::LowerUnknown),
        (r"^(\d+)\.\.>(\d+)$", LocationKind::UpperUnknown),
        (r"^<(\d+)\.\.>(\d+)$", LocationKind::LowerUpperUnknown),
        (r"^(\d+)\.(\d+)$", LocationKind::OneOf),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).expect("location grammar"), kind))
    .collect()
});

/// A simple (non-join) feature location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    kind: LocationKind,
    start: u64,
    end: u64,
    is_complement: bool,
}

impl Location {
    /// Parse a simple location string such as `340..565` or `complement(467)`.
    pub fn parse(text: &str) -> Result<Self> {
        let (inner, is_complement) = match COMPLEMENT.captures(text) {
            Some(caps) => (caps.get(1).map_or("", |m| m.as_str()), true),
            None => (text, false),
        };

        let (regex, kind) = GRAMMARS
            .iter()
            .find(|(regex, _)| regex.is_match(inner))
            .ok_or_else(|| GbToolsError::location(text, "unknown location string"))?;

        let caps = regex
            .captures(inner)
            .ok_or_else(|| GbToolsError::location(text, "unknown location string"))?;
        let start = parse_position(text, caps.get(1).map_or("", |m| m.as_str()))?;
        let end = match caps.get(2) {
            Some(m) => parse_position(text, m.as_str())?,
            None => start,
        };

        if start > end {
            return Err(GbToolsError::location(
                text,
                "start position is after end position",
            ));
        }

        Ok(Location {
            kind: *kind,
            start,
            end,
            is_complement,
        })
    }

    /// Build a location from 1-based integer positions, the way it would be
    /// written in a GenBank file: `start` alone for a single base, otherwise
    /// `start..end`, wrapped in `complement(...)` on the reverse strand.
    pub fn from_int(start: u64, end: Option<u64>, strand: Strand) -> Result<Self> {
        let text = match end {
            Some(end) => format!("{}..{}", start, end),
            None => start.to_string(),
        };
        match strand {
            Strand::Forward => Location::parse(&text),
            Strand::Reverse => Location::parse(&format!("complement({})", text)),
        }
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    /// 0-based, inclusive start
    pub fn start(&self) -> u64 {
        self.start
    }

    /// 0-based, inclusive end
    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn is_complement(&self) -> bool {
        self.is_complement
    }

    /// True if the two locations share at least one base
    pub fn overlaps(&self, other: &Location) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Gap between the closest ends of the two locations, 0 if they overlap
    pub fn min_distance(&self, other: &Location) -> u64 {
        if self.overlaps(other) {
            0
        } else {
            self.start
                .abs_diff(other.end)
                .min(self.end.abs_diff(other.start))
        }
    }
}

fn parse_position(text: &str, digits: &str) -> Result<u64> {
    let position: u64 = digits
        .parse()
        .map_err(|_| GbToolsError::location(text, format!("invalid position {}", digits)))?;
    // GenBank positions are 1-based
    position
        .checked_sub(1)
        .ok_or_else(|| GbToolsError::location(text, "position 0 is not a valid base"))
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = (self.start + 1, self.end + 1);
        let body = match self.kind {
            LocationKind::Single => format!("{}", start),
            LocationKind::Range => format!("{}..{}", start, end),
            LocationKind::LowerUnknown => format!("<{}..{}", start, end),
            LocationKind::UpperUnknown => format!("{}..>{}", start, end),
            LocationKind::LowerUpperUnknown => format!("<{}..>{}", start, end),
            LocationKind::OneOf => format!("{}.{}", start, end),
        };
        if self.is_complement {
            write!(f, "complement({})", body)
        } else {
            write!(f, "{}", body)
        }
    }
}

impl FromStr for Location {
    type Err = GbToolsError;

    fn from_str(s: &str) -> Result<Self> {
        Location::parse(s)
    }
}

/// A `join(...)` location made of several simple segments on one strand
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinLocation {
    segments: Vec<Location>,
    start: u64,
    end: u64,
    is_complement: bool,
    /// Written as `complement(join(...))`
    wrapped: bool,
}

impl JoinLocation {
    pub fn parse(text: &str) -> Result<Self> {
        let (joined, wrapped) = if text.starts_with("complement") {
            let caps = COMPLEMENT_JOIN
                .captures(text)
                .ok_or_else(|| GbToolsError::location(text, "invalid join location"))?;
            (caps.get(1).map_or("", |m| m.as_str()), true)
        } else {
            (text, false)
        };

        let inner = JOIN
            .captures(joined)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| GbToolsError::location(text, "invalid join location"))?;

        let segments = inner
            .split(',')
            .map(|segment| Location::parse(segment.trim()))
            .collect::<Result<Vec<_>>>()?;

        if segments.len() < 2 {
            return Err(GbToolsError::location(
                text,
                "join location needs at least two segments",
            ));
        }

        let first_strand = segments[0].is_complement;
        if segments.iter().any(|s| s.is_complement != first_strand) {
            return Err(GbToolsError::location(
                text,
                "join location is located on both strands",
            ));
        }

        let start = segments.iter().map(|s| s.start).min().unwrap_or(0);
        let end = segments.iter().map(|s| s.end).max().unwrap_or(0);

        Ok(JoinLocation {
            segments,
            start,
            end,
            is_complement: wrapped || first_strand,
            wrapped,
        })
    }

    pub fn segments(&self) -> &[Location] {
        &self.segments
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn is_complement(&self) -> bool {
        self.is_complement
    }
}

impl fmt::Display for JoinLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segments: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        if self.wrapped {
            write!(f, "complement(join({}))", segments.join(","))
        } else {
            write!(f, "join({})", segments.join(","))
        }
    }
}

impl FromStr for JoinLocation {
    type Err = GbToolsError;

    fn from_str(s: &str) -> Result<Self> {
        JoinLocation::parse(s)
    }
}

/// Location of a feature: either a simple location or a join
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureLocation {
    Simple(Location),
    Join(JoinLocation),
}

/// Parse any supported location string.
pub fn parse_location(text: &str) -> Result<FeatureLocation> {
    if text.starts_with("join") || text.starts_with("complement(join") {
        JoinLocation::parse(text).map(FeatureLocation::Join)
    } else {
        Location::parse(text).map(FeatureLocation::Simple)
    }
}

impl FeatureLocation {
    pub fn start(&self) -> u64 {
        match self {
            FeatureLocation::Simple(loc) => loc.start(),
            FeatureLocation::Join(join) => join.start(),
        }
    }

    pub fn end(&self) -> u64 {
        match self {
            FeatureLocation::Simple(loc) => loc.end(),
            FeatureLocation::Join(join) => join.end(),
        }
    }

    pub fn is_complement(&self) -> bool {
        match self {
            FeatureLocation::Simple(loc) => loc.is_complement(),
            FeatureLocation::Join(join) => join.is_complement(),
        }
    }

    pub fn strand(&self) -> Strand {
        if self.is_complement() {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    /// The simple locations making up this location, in file order.
    pub fn segments(&self) -> &[Location] {
        match self {
            FeatureLocation::Simple(loc) => std::slice::from_ref(loc),
            FeatureLocation::Join(join) => join.segments(),
        }
    }

    /// True if any segment of `self` shares a base with any segment of `other`
    pub fn overlaps(&self, other: &FeatureLocation) -> bool {
        self.segments()
            .iter()
            .any(|a| other.segments().iter().any(|b| a.overlaps(b)))
    }

    /// Smallest segment-to-segment distance, 0 if the locations overlap
    pub fn min_distance(&self, other: &FeatureLocation) -> u64 {
        let mut min = u64::MAX;
        for a in self.segments() {
            for b in other.segments() {
                let d = a.min_distance(b);
                if d == 0 {
                    return 0;
                }
                min = min.min(d);
            }
        }
        min
    }
}

impl From<Location> for FeatureLocation {
    fn from(loc: Location) -> Self {
        FeatureLocation::Simple(loc)
    }
}

impl From<JoinLocation> for FeatureLocation {
    fn from(join: JoinLocation) -> Self {
        FeatureLocation::Join(join)
    }
}

impl fmt::Display for FeatureLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureLocation::Simple(loc) => fmt::Display::fmt(loc, f),
            FeatureLocation::Join(join) => fmt::Display::fmt(join, f),
        }
    }
}

impl FromStr for FeatureLocation {
    type Err = GbToolsError;

    fn from_str(s: &str) -> Result<Self> {
        parse_location(s)
    }
}
