//! Parsing of the header block of a GenBank record (everything from the
//! LOCUS line up to the FEATURES line).

use crate::error::{GbToolsError, Result};
use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};

/// Width of the keyword column in header lines
const KEYWORD_WIDTH: usize = 11;

/// Fields of the LOCUS line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocusLine {
    pub name: String,
    /// Length including its unit, e.g. `5028 bp`
    pub length: String,
    pub molecule: String,
    pub molecule_type: String,
    pub division: String,
    pub modification_date: String,
}

impl LocusLine {
    pub fn parse(line: &str) -> Result<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first() != Some(&"LOCUS") || tokens.len() < 6 {
            return Err(GbToolsError::Parsing(format!(
                "malformed LOCUS line: {}",
                line.trim()
            )));
        }

        let (division, modification_date) = match tokens.len() {
            6 => ("", ""),
            7 => ("", tokens[6]),
            _ => (tokens[6], tokens[7]),
        };

        Ok(LocusLine {
            name: tokens[1].to_string(),
            length: tokens[2..4].join(" "),
            molecule: tokens[4].to_string(),
            molecule_type: tokens[5].to_string(),
            division: division.to_string(),
            modification_date: modification_date.to_string(),
        })
    }
}

/// One occurrence of a structured header field, e.g. a REFERENCE with its
/// AUTHORS, TITLE and JOURNAL sub-fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderSection {
    pub label: String,
    pub subfields: IndexMap<String, String>,
}

impl HeaderSection {
    fn new(label: String) -> Self {
        Self {
            label,
            subfields: IndexMap::new(),
        }
    }
}

/// Value of a top-level header field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Text(String),
    /// Fields that repeat or carry indented sub-fields
    Sections(Vec<HeaderSection>),
}

impl HeaderValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(text) => Some(text),
            HeaderValue::Sections(_) => None,
        }
    }

    pub fn sections(&self) -> &[HeaderSection] {
        match self {
            HeaderValue::Text(_) => &[],
            HeaderValue::Sections(sections) => sections,
        }
    }

    /// Turn a text value into a one-section list so sub-fields can be attached.
    fn make_sections(&mut self) -> &mut Vec<HeaderSection> {
        if let HeaderValue::Text(text) = self {
            *self = HeaderValue::Sections(vec![HeaderSection::new(std::mem::take(text))]);
        }
        match self {
            HeaderValue::Sections(sections) => sections,
            HeaderValue::Text(_) => unreachable!("converted above"),
        }
    }

    fn append_line(&mut self, text: &str) {
        match self {
            HeaderValue::Text(value) => {
                value.push('\n');
                value.push_str(text);
            }
            HeaderValue::Sections(sections) => {
                if let Some(section) = sections.last_mut() {
                    let target = match section.subfields.last_mut() {
                        Some((_, value)) => value,
                        None => &mut section.label,
                    };
                    target.push('\n');
                    target.push_str(text);
                }
            }
        }
    }
}

/// Parsed header of a locus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub locus: LocusLine,
    /// Remaining fields keyed by their keyword, in file order
    pub fields: IndexMap<String, HeaderValue>,
}

impl Header {
    /// Parse the header text of one record. The first line must be the
    /// LOCUS line.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let locus_line = lines
            .next()
            .ok_or_else(|| GbToolsError::Parsing("empty header".to_string()))?;

        let mut header = Header {
            locus: LocusLine::parse(locus_line)?,
            fields: IndexMap::new(),
        };
        let mut last_key: Option<String> = None;

        for line in lines {
            let keyword = line.get(..KEYWORD_WIDTH).unwrap_or(line).trim();
            let value = line.get(KEYWORD_WIDTH..).unwrap_or("").trim();

            if !line.starts_with(' ') {
                match header.fields.get_mut(keyword) {
                    Some(existing) => existing
                        .make_sections()
                        .push(HeaderSection::new(value.to_string())),
                    None => {
                        header
                            .fields
                            .insert(keyword.to_string(), HeaderValue::Text(value.to_string()));
                    }
                }
                last_key = Some(keyword.to_string());
                continue;
            }

            let Some(entry) = last_key.as_ref().and_then(|key| header.fields.get_mut(key)) else {
                warn!("header line outside of any field: {}", line.trim());
                continue;
            };

            if !keyword.is_empty() {
                if let Some(section) = entry.make_sections().last_mut() {
                    section
                        .subfields
                        .insert(keyword.to_string(), value.to_string());
                }
            } else {
                entry.append_line(line.trim());
            }
        }

        Ok(header)
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }
}
