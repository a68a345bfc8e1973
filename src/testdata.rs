//! Sample records shared by the unit tests

use std::io::Write;
use tempfile::NamedTempFile;

pub const U49845_HEADER: &str = r#"LOCUS       SCU49845     120 bp    DNA     linear   PLN 21-JUN-1999
DEFINITION  Saccharomyces cerevisiae TCP1-beta gene, partial cds, and Axl2p
            (AXL2) and Rev7p (REV7) genes, complete cds.
ACCESSION   U49845
VERSION     U49845.1  GI:1293613
KEYWORDS    .
SOURCE      Saccharomyces cerevisiae (baker's yeast)
  ORGANISM  Saccharomyces cerevisiae
            Eukaryota; Fungi; Ascomycota; Saccharomycotina; Saccharomycetes;
            Saccharomycetales; Saccharomycetaceae; Saccharomyces.
REFERENCE   1  (bases 1 to 5028)
  AUTHORS   Torpey,L.E., Gibbs,P.E., Nelson,J. and Lawrence,C.W.
  TITLE     Cloning and sequence analysis of a yeast gene
            encoding a novel protein
  JOURNAL   Yeast 10 (11), 1503-1509 (1994)
  PUBMED    7871890
REFERENCE   2  (bases 1 to 5028)
  AUTHORS   Roemer,T., Madden,K., Chang,J. and Snyder,M.
  TITLE     Selection of axial growth sites in yeast requires Axl2p, a novel
            plasma membrane glycoprotein
  JOURNAL   Genes Dev. 10 (7), 777-793 (1996)
  PUBMED    8846915
"#;

pub const U49845_BODY: &str = r#"FEATURES             Location/Qualifiers
     source          1..120
                     /organism="Saccharomyces cerevisiae"
                     /db_xref="taxon:4932"
     mRNA            <1..>20
                     /product="TCP1-beta"
     CDS             <1..20
                     /codon_start=3
                     /product="TCP1-beta"
     gene            30..100
                     /gene="AXL2"
     mRNA            <30..>100
                     /gene="AXL2"
     CDS             30..90
                     /gene="AXL2"
                     /note="plasma membrane glycoprotein"
     gene            complement(<95..>120)
                     /gene="REV7"
     mRNA            complement(<95..>120)
                     /gene="REV7"
     CDS             complement(join(95..100,
                     105..120))
                     /gene="REV7"
                     /translation="MNRWVEKWLRVYLKCYINLILFYRNVYPPQSFDYTTYQSFNLPQ
                     FVPINRHPALIDYIEELILDVLSKLTHVYRFSICIINKKNDLCIEKYVLDFSELQHVD"
BASE COUNT       30 a     30 c     30 g     30 t
ORIGIN
        1 gatcctccat atacaacggt atctccacct caggtttaga tctcaacaac ggaaccattg
       61 ccgacatgag acagttaggt atcgtcgaga gttacaagct aaaacgagca gtagtcagct
//
"#;

pub const U49845_SEQUENCE: &str = "gatcctccatatacaacggtatctccacctcaggtttagatctcaacaacggaaccattg\
                                   ccgacatgagacagttaggtatcgtcgagagttacaagctaaaacgagcagtagtcagct";

/// The record used to pin down neighbor lookups across strands.
pub const TESTLOCUS: &str = "LOCUS testlocus 5758 bp  DNA linear  12-APR-2015\n\
                             FEATURES            Location/qualifiers\n    \
                             source          1..5758\n    \
                             CDS             7..693\n    \
                             CDS             697..3303\n    \
                             CDS             complement(3381..4166)\n    \
                             CDS             complement(4167..5516)\n\
                             ORIGIN\n\
                             //";

pub fn u49845() -> String {
    format!("{}{}", U49845_HEADER, U49845_BODY)
}

/// Write `contents` to a temporary file that lives as long as the handle.
pub fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
