//! Nucleotide alphabets and sequences

use crate::error::{GbToolsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base, complement and the bases it stands for. Ambiguity codes also
/// stand for every narrower code they cover.
const DNA_BASES: &[(u8, u8, &[u8])] = &[
    (b'A', b'T', b"A"),
    (b'C', b'G', b"C"),
    (b'G', b'C', b"G"),
    (b'T', b'A', b"T"),
];

const IUPAC_BASES: &[(u8, u8, &[u8])] = &[
    (b'A', b'T', b"A"),
    (b'C', b'G', b"C"),
    (b'G', b'C', b"G"),
    (b'T', b'A', b"T"),
    (b'M', b'K', b"MAC"),
    (b'R', b'Y', b"RAG"),
    (b'W', b'W', b"WAT"),
    (b'S', b'S', b"SCG"),
    (b'Y', b'R', b"YCT"),
    (b'K', b'M', b"KGT"),
    (b'V', b'B', b"VMRSACG"),
    (b'H', b'D', b"HMWYACT"),
    (b'D', b'H', b"DRWKAGT"),
    (b'B', b'V', b"BSYKCGT"),
    (b'N', b'N', b"NMRWSYKVHDBACGT"),
];

/// Set of bases a sequence may be written in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alphabet {
    /// A, C, G and T
    Dna,
    /// DNA with the IUPAC ambiguity codes
    #[default]
    IupacDna,
}

impl Alphabet {
    fn table(self) -> &'static [(u8, u8, &'static [u8])] {
        match self {
            Alphabet::Dna => DNA_BASES,
            Alphabet::IupacDna => IUPAC_BASES,
        }
    }

    fn lookup(self, base: u8) -> Option<&'static (u8, u8, &'static [u8])> {
        let upper = base.to_ascii_uppercase();
        self.table().iter().find(|(b, _, _)| *b == upper)
    }

    pub fn contains(self, base: u8) -> bool {
        self.lookup(base).is_some()
    }

    /// Complement of `base`, keeping its case
    pub fn complement(self, base: u8) -> Option<u8> {
        self.lookup(base).map(|(_, comp, _)| {
            if base.is_ascii_lowercase() {
                comp.to_ascii_lowercase()
            } else {
                *comp
            }
        })
    }

    /// Whether the pattern base `pattern` accepts the base `target`
    pub fn equals(self, pattern: u8, target: u8) -> bool {
        self.lookup(pattern)
            .is_some_and(|(_, _, eq)| eq.contains(&target.to_ascii_uppercase()))
    }

    /// Reverse complement of `seq`. Bases outside the alphabet are kept
    /// as they are.
    pub fn revcomp(self, seq: &str) -> String {
        seq.bytes()
            .rev()
            .map(|b| self.complement(b).unwrap_or(b) as char)
            .collect()
    }
}

/// Reverse complement using the IUPAC alphabet
pub fn revcomp(seq: &str) -> String {
    Alphabet::IupacDna.revcomp(seq)
}

/// A validated nucleotide sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    seq: String,
    alphabet: Alphabet,
}

impl Sequence {
    pub fn new(seq: impl Into<String>, alphabet: Alphabet) -> Result<Self> {
        let seq = seq.into();
        if let Some(bad) = seq.bytes().find(|b| !alphabet.contains(*b)) {
            return Err(GbToolsError::InvalidInput(format!(
                "illegal character {:?} for the {:?} alphabet",
                bad as char, alphabet
            )));
        }
        Ok(Self { seq, alphabet })
    }

    pub fn as_str(&self) -> &str {
        &self.seq
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn revcomp(&self) -> Sequence {
        Sequence {
            seq: self.alphabet.revcomp(&self.seq),
            alphabet: self.alphabet,
        }
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.seq.eq_ignore_ascii_case(&other.seq)
    }
}

impl Eq for Sequence {}

impl PartialEq<str> for Sequence {
    fn eq(&self, other: &str) -> bool {
        self.seq.eq_ignore_ascii_case(other)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.seq)
    }
}
