//! Random access to the loci of a GenBank file
//!
//! Opening a [`GenBank`] file builds a [`GenBankIndex`]. Loci are then
//! materialized on demand: every call re-opens the file, seeks to the
//! offsets recorded in the index and parses only that locus. Nothing is
//! cached, and the handle holds no open file, so a `GenBank` can be shared
//! between threads that each read their own loci.

use crate::error::{GbToolsError, Result};
use crate::feature::Feature;
use crate::header::Header;
use crate::index::{GenBankIndex, LocusIndexEntry, FEATURE_TYPE_COLUMN};
use crate::locus::Locus;
use indexmap::IndexMap;
use log::info;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Marker line that ends a record
const END_OF_RECORD: &str = "//";

/// An indexed GenBank file
#[derive(Debug, Clone)]
pub struct GenBank {
    path: PathBuf,
    index: GenBankIndex,
}

impl GenBank {
    /// Open and index a GenBank file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GbToolsError::FileNotFound(path.display().to_string()));
        }

        let reader = BufReader::new(File::open(path)?);
        let index = GenBankIndex::build(reader)?;
        info!(
            "indexed {}: {} loci, {} feature types",
            path.display(),
            index.len(),
            index.feature_types.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> &GenBankIndex {
        &self.index
    }

    /// Index entries, one per locus in file order
    pub fn entries(&self) -> &[LocusIndexEntry] {
        &self.index.loci
    }

    pub fn feature_types(&self) -> &BTreeSet<String> {
        &self.index.feature_types
    }

    /// Number of loci in the file
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Materialize the locus at position `i`
    pub fn locus(&self, i: usize) -> Result<Locus> {
        let entry = self.index.get(i).ok_or_else(|| {
            GbToolsError::LocusNotFound(format!("index {} (file has {} loci)", i, self.len()))
        })?;
        self.get_locus(entry)
    }

    /// Materialize every locus with the given name. Names are not unique
    /// within a file, so several loci may be returned.
    pub fn loci_by_name(&self, name: &str) -> Result<Vec<Locus>> {
        self.index
            .find_by_name(name)
            .map(|entry| self.get_locus(entry))
            .collect()
    }

    /// Materialize loci one at a time in file order
    pub fn iter(&self) -> impl Iterator<Item = Result<Locus>> + '_ {
        self.index.loci.iter().map(move |entry| self.get_locus(entry))
    }

    /// Read and parse the locus described by `entry`.
    ///
    /// The file handle opened here is dropped on every return path.
    pub fn get_locus(&self, entry: &LocusIndexEntry) -> Result<Locus> {
        let mut reader = BufReader::new(File::open(&self.path)?);

        reader.seek(SeekFrom::Start(entry.header_offset))?;
        let header = Header::parse(&read_header(&mut reader)?)?;

        let mut features: IndexMap<String, Vec<Feature>> = IndexMap::new();
        for (feature_type, offsets) in &entry.features {
            let mut parsed = Vec::with_capacity(offsets.len());
            for feature in offsets {
                reader.seek(SeekFrom::Start(feature.offset))?;
                let block = read_feature_block(&mut reader)?;
                parsed.push(Feature::from_block(&entry.name, &block)?);
            }
            features.insert(feature_type.clone(), parsed);
        }

        let sequence = match entry.origin_offset {
            Some(offset) => {
                reader.seek(SeekFrom::Start(offset))?;
                read_sequence(&mut reader)?
            }
            None => String::new(),
        };

        Ok(Locus {
            name: entry.name.clone(),
            sequence,
            header,
            features,
        })
    }

    /// Index summary of the file
    pub fn summary(&self) -> String {
        format!("Source file: {}\n{}", self.path.display(), self.index.summary())
    }
}

/// Read one line, failing with `UnexpectedEof` at end of input.
fn read_line_or_eof<R: BufRead>(reader: &mut R, buf: &mut String, context: &str) -> Result<()> {
    buf.clear();
    if reader.read_line(buf)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("end of file while reading {}", context),
        )
        .into());
    }
    Ok(())
}

/// Read from the LOCUS line up to, not including, the FEATURES line. A
/// record without a feature table ends its header at ORIGIN or `//`.
fn read_header<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut header = String::new();
    let mut line = String::new();

    read_line_or_eof(reader, &mut line, "locus header")?;
    header.push_str(&line);
    loop {
        read_line_or_eof(reader, &mut line, "locus header")?;
        if line.starts_with("FEATURES")
            || line.starts_with("ORIGIN")
            || line.trim() == END_OF_RECORD
        {
            return Ok(header);
        }
        header.push_str(&line);
    }
}

fn has_blank_type_column(line: &str) -> bool {
    line.as_bytes()
        .get(FEATURE_TYPE_COLUMN)
        .is_some_and(|b| *b == b' ')
}

/// Read a feature declaration and every indented line that belongs to it.
/// Lines too short to reach the type column are skipped, any other line
/// that is not indented past it ends the block.
fn read_feature_block<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut block = String::new();
    let mut line = String::new();

    read_line_or_eof(reader, &mut line, "feature")?;
    block.push_str(&line);

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(block);
        }
        if line.trim_end_matches(['\r', '\n']).len() <= FEATURE_TYPE_COLUMN {
            continue;
        }
        if !line.starts_with(' ') || !has_blank_type_column(&line) {
            return Ok(block);
        }
        block.push_str(&line);
    }
}

/// Concatenate the bases of an ORIGIN block, stopping at the `//` line.
fn read_sequence<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut sequence = String::new();
    let mut line = String::new();

    loop {
        read_line_or_eof(reader, &mut line, "sequence")?;
        if line.trim() == END_OF_RECORD {
            return Ok(sequence);
        }
        for token in line.split_whitespace() {
            if !token.bytes().all(|b| b.is_ascii_digit()) {
                sequence.push_str(token);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HeaderValue;
    use crate::testdata::{temp_file, u49845, TESTLOCUS, U49845_SEQUENCE};

    fn open(text: &str) -> (tempfile::NamedTempFile, GenBank) {
        let file = temp_file(text);
        let gb = GenBank::open(file.path()).unwrap();
        (file, gb)
    }

    #[test]
    fn test_sequence_length() {
        let (_file, gb) = open(&u49845());
        let locus = gb.locus(0).unwrap();
        assert_eq!(locus.sequence.len(), 120);
        assert_eq!(locus.sequence, U49845_SEQUENCE);
    }

    #[test]
    fn test_features_materialized() {
        let (_file, gb) = open(&u49845());
        let locus = gb.locus(0).unwrap();

        assert_eq!(locus.features["mRNA"].len(), 3);
        assert_eq!(locus.features["CDS"].len(), 3);
        assert_eq!(locus.features["source"].len(), 1);

        let rev7 = locus.features["CDS"].last().unwrap();
        assert_eq!(rev7.locus, "SCU49845");
        assert_eq!(rev7.get_qualifier("gene").unwrap(), "REV7");
        assert_eq!(rev7.location.segments().len(), 2);
        assert!(rev7
            .get_qualifier("translation")
            .unwrap()
            .as_str()
            .unwrap()
            .ends_with("DFSELQHVD"));
    }

    #[test]
    fn test_features_sorted_by_start() {
        let (_file, gb) = open(&format!("{}\n{}", u49845(), TESTLOCUS));
        for locus in gb.iter() {
            let locus = locus.unwrap();
            for features in locus.features.values() {
                assert!(features
                    .windows(2)
                    .all(|w| w[0].location.start() <= w[1].location.start()));
            }
        }
    }

    #[test]
    fn test_header() {
        let (_file, gb) = open(&u49845());
        let header = gb.locus(0).unwrap().header;

        assert_eq!(header.locus.molecule, "DNA");
        assert_eq!(
            header.get("ACCESSION").and_then(HeaderValue::as_text),
            Some("U49845")
        );
        assert_eq!(header.get("REFERENCE").unwrap().sections().len(), 2);
        assert!(!header.contains_key("FEATURES"));
    }

    #[test]
    fn test_empty_sequence() {
        let (_file, gb) = open(TESTLOCUS);
        let locus = gb.locus(0).unwrap();
        assert_eq!(locus.name, "testlocus");
        assert!(locus.sequence.is_empty());
        assert_eq!(locus.features["CDS"].len(), 4);
    }

    #[test]
    fn test_malformed_locus_line() {
        let text = "LOCUS       NODE_18 673 bp   DNA linear\n\
                    03-FEB-2015\n\
                    FEATURES             Location/Qualifiers\n\
                    ORIGIN\n\
                    //\n";
        let (_file, gb) = open(text);
        let header = gb.locus(0).unwrap().header;
        assert_eq!(header.locus.name, "NODE_18");
        assert_eq!(header.locus.length, "673 bp");
    }

    #[test]
    fn test_invalid_locus_line() {
        let text = "LOCUS       NODE_18 673\n\
                    FEATURES             Location/Qualifiers\n\
                    ORIGIN\n\
                    //\n";
        let (_file, gb) = open(text);
        assert!(matches!(gb.locus(0), Err(GbToolsError::Parsing(_))));
    }

    #[test]
    fn test_not_genbank() {
        let file = temp_file(">seq1\nACGTACGT\n");
        assert!(matches!(
            GenBank::open(file.path()),
            Err(GbToolsError::Parsing(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            GenBank::open("/nonexistent/file.gb"),
            Err(GbToolsError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_locus_out_of_range() {
        let (_file, gb) = open(TESTLOCUS);
        assert!(matches!(gb.locus(1), Err(GbToolsError::LocusNotFound(_))));
    }

    #[test]
    fn test_truncated_sequence() {
        let mut text = u49845();
        text.truncate(text.find("//").unwrap());
        let (_file, gb) = open(&text);
        match gb.locus(0) {
            Err(GbToolsError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected end of file error, got {:?}", other.map(|l| l.name)),
        }
    }

    #[test]
    fn test_duplicate_names() {
        let (_file, gb) = open(&format!("{}\n{}\n{}", TESTLOCUS, u49845(), TESTLOCUS));
        assert_eq!(gb.len(), 3);
        let loci = gb.loci_by_name("testlocus").unwrap();
        assert_eq!(loci.len(), 2);
        assert_eq!(loci[0], loci[1]);
        assert!(gb.loci_by_name("nope").unwrap().is_empty());
    }

    #[test]
    fn test_record_without_features() {
        let text = format!("{}ORIGIN\n        1 acgt\n//\n", crate::testdata::U49845_HEADER);
        let (_file, gb) = open(&text);
        let locus = gb.locus(0).unwrap();
        assert!(locus.features.is_empty());
        assert_eq!(locus.sequence, "acgt");
        assert!(!locus.header.contains_key("ORIGIN"));
    }

    #[test]
    fn test_repeated_reads_are_identical() {
        let (_file, gb) = open(&u49845());
        assert_eq!(gb.locus(0).unwrap(), gb.locus(0).unwrap());
    }

    #[test]
    fn test_parallel_retrieval() {
        let (_file, gb) = open(&format!("{}\n{}", u49845(), TESTLOCUS));
        let expected: Vec<Locus> = gb.iter().collect::<Result<_>>().unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let gb = &gb;
                    scope.spawn(move || gb.locus(i % 2).unwrap())
                })
                .collect();
            for (i, handle) in handles.into_iter().enumerate() {
                assert_eq!(handle.join().unwrap(), expected[i % 2]);
            }
        });
    }
}
