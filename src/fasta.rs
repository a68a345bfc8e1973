//! Indexed FASTA files
//!
//! A [`FastaIndex`] follows the samtools `.fai` layout, one tab-separated
//! line per record:
//!
//! ```text
//! NAME  LENGTH  OFFSET  LINEBASES  LINEWIDTH
//! ```
//!
//! `OFFSET` is the byte offset of the first base, `LINEBASES` the number of
//! bases on every full line and `LINEWIDTH` the same line in bytes including
//! its terminator. [`Fasta`] memory-maps the FASTA file and cuts records out
//! of it with that arithmetic alone.

use crate::error::{GbToolsError, Result};
use indexmap::map::Entry;
use indexmap::IndexMap;
use log::{debug, info, warn};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Bases per line when writing FASTA
pub const FASTA_LINE_WIDTH: usize = 60;

/// One line of a `.fai` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastaIndexEntry {
    pub name: String,
    pub length: u64,
    pub offset: u64,
    pub line_bases: u64,
    pub line_width: u64,
}

impl FastaIndexEntry {
    fn from_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 5 {
            return Err(GbToolsError::Fasta(format!(
                "index line must have 5 fields, got {}: {:?}",
                fields.len(),
                line
            )));
        }

        let number = |i: usize| {
            fields[i].trim().parse::<u64>().map_err(|_| {
                GbToolsError::Fasta(format!("invalid number {:?} in index line", fields[i]))
            })
        };

        let entry = Self {
            name: fields[0].to_string(),
            length: number(1)?,
            offset: number(2)?,
            line_bases: number(3)?,
            line_width: number(4)?,
        };
        if entry.line_width < entry.line_bases {
            return Err(GbToolsError::Fasta(format!(
                "record {}: line width {} is smaller than {} bases per line",
                entry.name, entry.line_width, entry.line_bases
            )));
        }
        if entry.length > 0 && entry.line_bases == 0 {
            return Err(GbToolsError::Fasta(format!(
                "record {}: {} bases but zero bases per line",
                entry.name, entry.length
            )));
        }
        Ok(entry)
    }

    /// Number of bytes the sequence occupies in the FASTA file, line
    /// terminators included except after the last base. `None` when the
    /// entry's numbers do not fit together.
    fn byte_span(&self) -> Option<u64> {
        if self.length == 0 {
            return Some(0);
        }
        if self.line_bases == 0 || self.line_width < self.line_bases {
            return None;
        }
        let full_lines = self.length / self.line_bases;
        let rest = self.length % self.line_bases;
        let full_bytes = full_lines.checked_mul(self.line_width)?;
        if rest == 0 {
            full_bytes.checked_sub(self.line_width - self.line_bases)
        } else {
            full_bytes.checked_add(rest)
        }
    }
}

impl fmt::Display for FastaIndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name, self.length, self.offset, self.line_bases, self.line_width
        )
    }
}

/// Sequence lines of a record being indexed
struct PendingRecord {
    name: String,
    offset: u64,
    /// (bytes, bases) of every sequence line
    lines: Vec<(u64, u64)>,
}

impl PendingRecord {
    fn finish(mut self) -> Result<FastaIndexEntry> {
        while self.lines.last().is_some_and(|&(_, bases)| bases == 0) {
            self.lines.pop();
        }

        let Some((last, full)) = self.lines.split_last() else {
            return Ok(FastaIndexEntry {
                name: self.name,
                length: 0,
                offset: self.offset,
                line_bases: 0,
                line_width: 0,
            });
        };

        let (line_width, line_bases) = full.first().copied().unwrap_or(*last);
        if full.iter().any(|&line| line != (line_width, line_bases)) || last.1 > line_bases {
            return Err(GbToolsError::Fasta(format!(
                "record {} has sequence lines of different lengths",
                self.name
            )));
        }

        Ok(FastaIndexEntry {
            length: self.lines.iter().map(|&(_, bases)| bases).sum(),
            name: self.name,
            offset: self.offset,
            line_bases,
            line_width,
        })
    }
}

/// Index of a FASTA file, records in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FastaIndex {
    entries: IndexMap<String, FastaIndexEntry>,
}

impl FastaIndex {
    /// Index a FASTA file. The record name is the first word of the header.
    pub fn build<P: AsRef<Path>>(fasta: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(fasta.as_ref())?);
        let mut index = FastaIndex::default();
        let mut pending: Option<PendingRecord> = None;
        let mut buf = Vec::new();
        let mut offset = 0u64;

        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf)? as u64;
            if read == 0 {
                break;
            }
            let line_start = offset;
            offset += read;

            if buf.first() == Some(&b'>') {
                if let Some(record) = pending.take() {
                    index.insert(record.finish()?)?;
                }
                let header = String::from_utf8_lossy(&buf[1..]);
                pending = Some(PendingRecord {
                    name: header.split_whitespace().next().unwrap_or_default().to_string(),
                    offset,
                    lines: Vec::new(),
                });
                continue;
            }

            let bases = buf
                .iter()
                .filter(|b| !b.is_ascii_whitespace())
                .count() as u64;
            match pending.as_mut() {
                Some(record) => record.lines.push((read, bases)),
                None if bases == 0 => {}
                None => {
                    return Err(GbToolsError::Fasta(format!(
                        "sequence data before the first header at byte {}",
                        line_start
                    )))
                }
            }
        }

        if let Some(record) = pending.take() {
            index.insert(record.finish()?)?;
        }
        if index.is_empty() {
            return Err(GbToolsError::Fasta(
                "no FASTA records found".to_string(),
            ));
        }

        debug!("indexed {} FASTA records", index.len());
        Ok(index)
    }

    /// Load a `.fai` file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut index = FastaIndex::default();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            index.insert(FastaIndexEntry::from_line(line.trim_end())?)?;
        }
        if index.is_empty() {
            return Err(GbToolsError::Fasta(format!(
                "empty FASTA index {}",
                path.as_ref().display()
            )));
        }
        Ok(index)
    }

    /// Write the index in `.fai` format
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        for entry in self.entries.values() {
            writeln!(writer, "{}", entry)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn insert(&mut self, entry: FastaIndexEntry) -> Result<()> {
        match self.entries.entry(entry.name.clone()) {
            Entry::Occupied(_) => Err(GbToolsError::Fasta(format!(
                "duplicate FASTA header {}",
                entry.name
            ))),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&FastaIndexEntry> {
        self.entries.get_index(i).map(|(_, entry)| entry)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&FastaIndexEntry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &FastaIndexEntry> {
        self.entries.values()
    }
}

/// A named sequence read from a FASTA file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastaRecord {
    pub name: String,
    pub seq: String,
}

impl FastaRecord {
    pub fn new(name: impl Into<String>, seq: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seq: seq.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// FASTA text, sequence wrapped at [`FASTA_LINE_WIDTH`]
impl fmt::Display for FastaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ">{}", self.name)?;
        let bytes = self.seq.as_bytes();
        for chunk in bytes.chunks(FASTA_LINE_WIDTH) {
            writeln!(f, "{}", String::from_utf8_lossy(chunk))?;
        }
        Ok(())
    }
}

/// A memory-mapped FASTA file with its index
pub struct Fasta {
    path: PathBuf,
    index: FastaIndex,
    mmap: Mmap,
}

impl Fasta {
    /// Open a FASTA file, loading `<file>.fai` if it exists and building and
    /// saving it otherwise.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GbToolsError::FileNotFound(path.display().to_string()));
        }

        let fai = fai_path(path);
        let index = if fai.exists() {
            debug!("loading FASTA index {}", fai.display());
            FastaIndex::from_path(&fai)?
        } else {
            let index = FastaIndex::build(path)?;
            index.write(&fai)?;
            info!("wrote FASTA index {}", fai.display());
            index
        };

        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and the file is not expected to
        // change while it is open.
        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Self {
            path: path.to_path_buf(),
            index,
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> &FastaIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Record at position `i`
    pub fn record(&self, i: usize) -> Result<FastaRecord> {
        let entry = self.index.get(i).ok_or_else(|| {
            GbToolsError::Fasta(format!(
                "record {} out of range ({} records)",
                i,
                self.len()
            ))
        })?;
        self.read_entry(entry)
    }

    pub fn record_by_name(&self, name: &str) -> Result<FastaRecord> {
        let entry = self
            .index
            .get_by_name(name)
            .ok_or_else(|| GbToolsError::Fasta(format!("no FASTA record named {}", name)))?;
        self.read_entry(entry)
    }

    pub fn records(&self) -> impl Iterator<Item = Result<FastaRecord>> + '_ {
        self.index.entries().map(move |entry| self.read_entry(entry))
    }

    fn read_entry(&self, entry: &FastaIndexEntry) -> Result<FastaRecord> {
        let bytes = entry
            .byte_span()
            .and_then(|span| entry.offset.checked_add(span))
            .and_then(|end| {
                let start = usize::try_from(entry.offset).ok()?;
                let end = usize::try_from(end).ok()?;
                self.mmap.get(start..end)
            })
            .ok_or_else(|| {
                GbToolsError::Fasta(format!(
                    "record {} does not fit inside {}",
                    entry.name,
                    self.path.display()
                ))
            })?;

        let seq: String = bytes
            .iter()
            .filter(|b| !b.is_ascii_whitespace())
            .map(|&b| b as char)
            .collect();
        if seq.len() as u64 != entry.length {
            warn!(
                "record {}: index says {} bases, read {}",
                entry.name,
                entry.length,
                seq.len()
            );
        }

        Ok(FastaRecord::new(entry.name.clone(), seq))
    }
}

/// Path of the index that belongs to `fasta`
pub fn fai_path(fasta: &Path) -> PathBuf {
    let mut name = fasta.as_os_str().to_os_string();
    name.push(".fai");
    PathBuf::from(name)
}
