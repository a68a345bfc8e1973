//! Byte-offset index of a GenBank file
//!
//! The index is built with a single forward pass over the file and records,
//! for every locus, where its header starts, where its sequence starts and
//! where each feature declaration starts. It is never written to disk; it is
//! rebuilt whenever a file is opened.

use crate::error::{GbToolsError, Result};
use crate::location::{parse_location, FeatureLocation};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::BufRead;

/// Columns holding the feature key and the start of the location
const FEATURE_KEY_WIDTH: usize = 21;

/// Column that is blank on continuation and qualifier lines
pub(crate) const FEATURE_TYPE_COLUMN: usize = 5;

/// Offset and parsed location of a single feature declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureOffset {
    /// Byte offset of the first line of the feature
    pub offset: u64,
    /// Location as parsed while indexing, used for ordering
    pub location: FeatureLocation,
}

/// Index entry for one locus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusIndexEntry {
    /// Locus name from the LOCUS line
    pub name: String,
    /// Byte offset of the LOCUS line
    pub header_offset: u64,
    /// Byte offset of the first sequence line, if the record has an ORIGIN block
    pub origin_offset: Option<u64>,
    /// Feature offsets per feature type, each list sorted by location start
    pub features: IndexMap<String, Vec<FeatureOffset>>,
}

impl LocusIndexEntry {
    fn new(name: &str, header_offset: u64) -> Self {
        Self {
            name: name.to_string(),
            header_offset,
            origin_offset: None,
            features: IndexMap::new(),
        }
    }

    /// Total number of indexed features
    pub fn feature_count(&self) -> usize {
        self.features.values().map(Vec::len).sum()
    }
}

/// Index of a complete GenBank file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenBankIndex {
    /// One entry per locus, in file order
    pub loci: Vec<LocusIndexEntry>,
    /// Every feature type seen in the file
    pub feature_types: BTreeSet<String>,
}

/// A raw line together with the byte offset it starts at
struct Line {
    offset: u64,
    len: u64,
    text: String,
}

/// Line reader that tracks byte offsets and allows one line of lookahead.
struct OffsetLines<R> {
    reader: R,
    offset: u64,
    peeked: Option<Line>,
    buf: Vec<u8>,
}

impl<R: BufRead> OffsetLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            peeked: None,
            buf: Vec::new(),
        }
    }

    fn read(&mut self) -> Result<Option<Line>> {
        self.buf.clear();
        let len = self.reader.read_until(b'\n', &mut self.buf)? as u64;
        if len == 0 {
            return Ok(None);
        }
        let line = Line {
            offset: self.offset,
            len,
            text: String::from_utf8_lossy(&self.buf).into_owned(),
        };
        self.offset += len;
        Ok(Some(line))
    }

    fn next_line(&mut self) -> Result<Option<Line>> {
        match self.peeked.take() {
            Some(line) => Ok(Some(line)),
            None => self.read(),
        }
    }

    fn peek(&mut self) -> Result<Option<&Line>> {
        if self.peeked.is_none() {
            self.peeked = self.read()?;
        }
        Ok(self.peeked.as_ref())
    }
}

/// A feature declaration line: indented, with the key ending by column 5
fn is_feature_line(line: &str) -> bool {
    line.starts_with(' ')
        && line
            .as_bytes()
            .get(FEATURE_TYPE_COLUMN)
            .is_some_and(|b| !b.is_ascii_whitespace())
}

/// A line that continues a multi-line location: blank key columns and not a qualifier
fn is_location_continuation(line: &str) -> bool {
    let key_columns = line.get(..FEATURE_KEY_WIDTH).unwrap_or(line);
    key_columns.trim().is_empty() && !line.trim().starts_with('/')
}

impl GenBankIndex {
    /// Build the index with one pass over `reader`.
    ///
    /// Fails with a parsing error if the first non-empty line is not a LOCUS
    /// line, and with a location error if any feature location is invalid.
    pub fn build<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = OffsetLines::new(reader);
        let mut index = GenBankIndex::default();
        let mut in_features = false;

        while let Some(line) = lines.next_line()? {
            let trimmed = line.text.trim();
            if trimmed.is_empty() {
                continue;
            }

            // Record markers start in column 0; an indented word is continuation text
            let keyword = if line.text.starts_with(' ') {
                ""
            } else {
                trimmed.split_whitespace().next().unwrap_or("")
            };

            if index.loci.is_empty() && keyword != "LOCUS" {
                return Err(GbToolsError::Parsing(format!(
                    "does not look like a GenBank file, first line is: {}",
                    trimmed
                )));
            }

            if keyword == "LOCUS" {
                let name = trimmed.split_whitespace().nth(1).ok_or_else(|| {
                    GbToolsError::Parsing(format!("LOCUS line without a name: {}", trimmed))
                })?;
                index.loci.push(LocusIndexEntry::new(name, line.offset));
                in_features = false;
                continue;
            }

            // Every other branch needs the current locus; one always exists here
            let Some(locus) = index.loci.last_mut() else {
                continue;
            };

            if in_features && is_feature_line(&line.text) {
                let mut tokens = trimmed.split_whitespace();
                let feature_type = tokens.next().unwrap_or_default().to_string();
                let mut location_text: String = tokens.collect();

                while let Some(next) = lines.peek()? {
                    if !is_location_continuation(&next.text) {
                        break;
                    }
                    location_text.push_str(next.text.trim());
                    lines.next_line()?;
                }

                let location = parse_location(&location_text)?;
                index.feature_types.insert(feature_type.clone());
                locus
                    .features
                    .entry(feature_type)
                    .or_default()
                    .push(FeatureOffset {
                        offset: line.offset,
                        location,
                    });
                continue;
            }

            if keyword == "ORIGIN" {
                locus.origin_offset = Some(line.offset + line.len);
                in_features = false;
            } else if keyword == "FEATURES" {
                in_features = true;
            } else if !keyword.is_empty() {
                // A new top-level keyword (BASE COUNT, CONTIG, ...) ends the table
                in_features = false;
            }
        }

        for locus in &mut index.loci {
            for offsets in locus.features.values_mut() {
                offsets.sort_by_key(|f| f.location.start());
            }
            debug!(
                "indexed locus {} at byte {}: {} features of {} types",
                locus.name,
                locus.header_offset,
                locus.feature_count(),
                locus.features.len()
            );
        }

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.loci.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }

    /// Get index entry by position
    pub fn get(&self, index: usize) -> Option<&LocusIndexEntry> {
        self.loci.get(index)
    }

    /// All entries with the given locus name; names may repeat within a file
    pub fn find_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a LocusIndexEntry> {
        self.loci.iter().filter(move |entry| entry.name == name)
    }

    /// Get index summary
    pub fn summary(&self) -> String {
        let mut output = String::new();
        output.push_str("=== Index Summary ===\n\n");
        output.push_str(&format!("Loci: {}\n", self.loci.len()));
        output.push_str(&format!(
            "Feature types: {}\n\n",
            self.feature_types
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        ));

        for entry in &self.loci {
            output.push_str(&format!(
                "{:<24} header @ {:>12}  origin @ {:>12}  {:>6} features\n",
                entry.name,
                entry.header_offset,
                entry
                    .origin_offset
                    .map_or_else(|| "-".to_string(), |o| o.to_string()),
                entry.feature_count()
            ));
        }

        output
    }
}
