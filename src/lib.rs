//! gbtools - GenBank tools
//!
//! A library for indexed, random access reading of GenBank flat files.
//!
//! # Features
//!
//! - Index every locus and feature of a GenBank file by byte offset
//! - Materialize single loci on demand, from any number of threads
//! - Parse feature locations, including fuzzy bounds, complements and joins
//! - Find upstream and downstream neighbors of a feature on its strand
//! - Search probes with mismatches and IUPAC codes, and extract operons
//! - Random access to FASTA files through samtools-compatible `.fai` indexes
//!
//! # Example
//!
//! ```no_run
//! use gbtools::genbank::GenBank;
//! use gbtools::stats::GenBankStats;
//!
//! // Index a GenBank file
//! let genbank = GenBank::open("example.gb").unwrap();
//!
//! // Materialize the first locus and walk its CDS features
//! let locus = genbank.locus(0).unwrap();
//! if let Some(first) = locus.features.get("CDS").and_then(|cds| cds.first()) {
//!     println!("{} -> {:?}", first, locus.next_downstream(first).map(|f| &f.location));
//! }
//!
//! // Compute statistics
//! let stats = GenBankStats::from_genbank(&genbank).unwrap();
//! println!("{}", stats.format_summary());
//! ```

pub mod cli;
pub mod error;
pub mod fasta;
pub mod feature;
pub mod genbank;
pub mod header;
pub mod index;
pub mod location;
pub mod locus;
pub mod operon;
pub mod search;
pub mod sequence;
pub mod stats;

#[cfg(test)]
pub(crate) mod testdata;

pub use error::{GbToolsError, Result};
pub use fasta::{Fasta, FastaIndex, FastaRecord};
pub use feature::{parse_feature, Feature, QualifierValue};
pub use genbank::GenBank;
pub use header::Header;
pub use index::{GenBankIndex, LocusIndexEntry};
pub use location::{parse_location, FeatureLocation, JoinLocation, Location, Strand};
pub use locus::Locus;
pub use operon::{find_operon, Operon, OperonConfig};
pub use search::{hamming_distance, search, search_both_strands, Match, SearchOptions};
pub use sequence::{Alphabet, Sequence};
pub use stats::GenBankStats;
