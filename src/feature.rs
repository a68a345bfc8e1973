//! GenBank features and their qualifiers

use crate::error::{GbToolsError, Result};
use crate::location::{parse_location, FeatureLocation};
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a feature qualifier.
///
/// Serializes to `null`, a string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QualifierValue {
    /// `/pseudo`: a qualifier without a value
    Flag,
    /// `/gene="recF"`
    Scalar(String),
    /// The same key given more than once, in file order
    Repeated(Vec<String>),
}

impl QualifierValue {
    pub fn is_flag(&self) -> bool {
        matches!(self, QualifierValue::Flag)
    }

    /// The value if there is exactly one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QualifierValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// All values; empty for a flag
    pub fn values(&self) -> Vec<&str> {
        match self {
            QualifierValue::Flag => Vec::new(),
            QualifierValue::Scalar(s) => vec![s.as_str()],
            QualifierValue::Repeated(values) => values.iter().map(String::as_str).collect(),
        }
    }

    /// Add another occurrence of the same key. A flag occurrence inside a
    /// repeated qualifier is kept as an empty string.
    fn push(&mut self, value: Option<String>) {
        let value = value.unwrap_or_default();
        match self {
            QualifierValue::Flag => *self = QualifierValue::Repeated(vec![String::new(), value]),
            QualifierValue::Scalar(first) => {
                let first = std::mem::take(first);
                *self = QualifierValue::Repeated(vec![first, value]);
            }
            QualifierValue::Repeated(values) => values.push(value),
        }
    }

    /// Append a continuation line to the most recent value.
    fn continue_with(&mut self, text: &str) {
        match self {
            QualifierValue::Flag => *self = QualifierValue::Scalar(text.to_string()),
            QualifierValue::Scalar(value) => {
                value.push(' ');
                value.push_str(text);
            }
            QualifierValue::Repeated(values) => {
                if let Some(last) = values.last_mut() {
                    last.push(' ');
                    last.push_str(text);
                }
            }
        }
    }
}

impl PartialEq<str> for QualifierValue {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

/// Qualifiers of a feature, in file order
pub type Qualifiers = IndexMap<String, QualifierValue>;

/// A feature from the FEATURES table of a locus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Name of the locus the feature belongs to
    pub locus: String,
    /// Feature key, e.g. `CDS` or `tRNA`
    pub feature_type: String,
    pub location: FeatureLocation,
    pub qualifiers: Qualifiers,
}

impl Feature {
    pub fn new(
        locus: &str,
        feature_type: &str,
        location: FeatureLocation,
        qualifiers: Qualifiers,
    ) -> Self {
        Self {
            locus: locus.to_string(),
            feature_type: feature_type.to_string(),
            location,
            qualifiers,
        }
    }

    /// Parse a feature block as it appears in the FEATURES table:
    ///
    /// ```text
    ///      CDS             complement(52625..53704)
    ///                      /gene="recF"
    ///                      /inference="ab initio prediction:Prodigal:2.60"
    /// ```
    ///
    /// The location may continue over several lines before the first
    /// qualifier. Malformed qualifier lines never fail the parse.
    pub fn from_block(locus: &str, block: &str) -> Result<Self> {
        let lines: Vec<&str> = block.lines().map(str::trim).collect();
        let first = lines
            .first()
            .ok_or_else(|| GbToolsError::Parsing("empty feature block".to_string()))?;

        let mut tokens = first.split_whitespace();
        let feature_type = tokens.next().ok_or_else(|| {
            GbToolsError::Parsing(format!("feature block without a type: {:?}", first))
        })?;
        let mut location_text: String = tokens.collect();

        let mut i = 1;
        while i < lines.len() && !lines[i].starts_with('/') {
            location_text.push_str(lines[i]);
            i += 1;
        }
        let location = parse_location(&location_text)?;

        let mut qualifiers = Qualifiers::new();
        // Index of the qualifier that continuation lines extend
        let mut current: Option<usize> = None;

        for line in &lines[i..] {
            if let Some(rest) = line.strip_prefix('/') {
                let (key, value) = match rest.split_once('=') {
                    Some((key, value)) => (key, Some(value.trim_matches('"').to_string())),
                    None => (rest, None),
                };
                let index = match qualifiers.entry(key.to_string()) {
                    Entry::Occupied(mut entry) => {
                        entry.get_mut().push(value);
                        entry.index()
                    }
                    Entry::Vacant(entry) => {
                        let index = entry.index();
                        entry.insert(value.map_or(QualifierValue::Flag, QualifierValue::Scalar));
                        index
                    }
                };
                current = Some(index);
            } else if let Some((_, value)) = current.and_then(|idx| qualifiers.get_index_mut(idx)) {
                value.continue_with(line.trim_matches('"'));
            }
        }

        Ok(Feature::new(locus, feature_type, location, qualifiers))
    }

    /// Look up a qualifier by name.
    pub fn get_qualifier(&self, name: &str) -> Result<&QualifierValue> {
        self.qualifiers
            .get(name)
            .ok_or_else(|| GbToolsError::MissingQualifier {
                key: name.to_string(),
                feature: self.to_string(),
            })
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} at {}",
            self.feature_type, self.locus, self.location
        )
    }
}

/// Parse a feature block; see [`Feature::from_block`].
pub fn parse_feature(locus: &str, block: &str) -> Result<Feature> {
    Feature::from_block(locus, block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;

    const RECF: &str = r#"     CDS             complement(52625..53704)
                     /gene="recF"
                     /locus_tag="LMG718_02589"
                     /inference="ab initio prediction:Prodigal:2.60"
                     /inference="similar to AA sequence:UniProtKB:Q9RVE0"
                     /codon_start=1
                     /transl_table=11
                     /product="DNA replication and repair protein RecF"
                     /translation="MKLKQIELKNFRNYEDLKLDFHPNLNIFLGQNAQGKTNILEAIH
                     FLALTRSHRTSHDKELICWSGQEMKVSGLVEKAHVNVPLEVQLSSKGRIAKANHLKEN
                     DHLKNLPENLSIFHVTDGTIEKEKE""#;

    #[test]
    fn test_parse_feature() {
        let gbf = parse_feature("testlocus", RECF).unwrap();

        assert_eq!(gbf.locus, "testlocus");
        assert_eq!(gbf.feature_type, "CDS");
        assert_eq!(gbf.location.to_string(), "complement(52625..53704)");
        assert_eq!(gbf.get_qualifier("gene").unwrap(), "recF");
        assert_eq!(gbf.get_qualifier("codon_start").unwrap(), "1");
        assert_eq!(
            gbf.get_qualifier("inference").unwrap().values(),
            vec![
                "ab initio prediction:Prodigal:2.60",
                "similar to AA sequence:UniProtKB:Q9RVE0"
            ]
        );
        assert_eq!(
            gbf.get_qualifier("translation").unwrap(),
            "MKLKQIELKNFRNYEDLKLDFHPNLNIFLGQNAQGKTNILEAIH \
             FLALTRSHRTSHDKELICWSGQEMKVSGLVEKAHVNVPLEVQLSSKGRIAKANHLKEN \
             DHLKNLPENLSIFHVTDGTIEKEKE"
        );
    }

    #[test]
    fn test_qualifier_order() {
        let gbf = parse_feature("testlocus", RECF).unwrap();
        let keys: Vec<&str> = gbf.qualifiers.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "gene",
                "locus_tag",
                "inference",
                "codon_start",
                "transl_table",
                "product",
                "translation"
            ]
        );
    }

    #[test]
    fn test_multiple_qualifiers() {
        let feature = r#"     ncRNA           476448..476561
                     /ncRNA_class="SRP_RNA"
                     /gene="ffs"
                     /gene_synonym="ECK0449"
                     /gene_synonym="JWR0009"
                     /product="4.5S sRNA component of Signal Recognition
                     Particle (SRP)"
                     /function="2.2.6 information transfer; RNA related; rRNA,
                     stable RNA"
                     /function="2.3.2 information transfer; protein related;
                     translation"
                     /function="7.1 location of gene products; cytoplasm"
                     /function="RNA; Ribosomal and stable RNAs"
                     /db_xref="ASAP:ABE-0001579"
                     /db_xref="EcoGene:EG30027""#;
        let gbf = parse_feature("testlocus", feature).unwrap();

        let func = gbf.get_qualifier("function").unwrap().values();
        assert_eq!(func.len(), 4);
        assert_eq!(func[0], "2.2.6 information transfer; RNA related; rRNA, stable RNA");
        assert_eq!(func[3], "RNA; Ribosomal and stable RNAs");
        assert_eq!(
            gbf.get_qualifier("product").unwrap(),
            "4.5S sRNA component of Signal Recognition Particle (SRP)"
        );
        assert_eq!(gbf.get_qualifier("db_xref").unwrap().values().len(), 2);
    }

    #[test]
    fn test_repeated_key_aggregates_out_of_order() {
        let feature = r#"     gene            1..10
                     /inference="A"
                     /gene="x"
                     /inference="B"
                     /inference="C""#;
        let gbf = parse_feature("testlocus", feature).unwrap();
        assert_eq!(
            gbf.get_qualifier("inference").unwrap(),
            &QualifierValue::Repeated(vec!["A".into(), "B".into(), "C".into()])
        );
    }

    #[test]
    fn test_join_location() {
        let feature = r#"     CDS             join(52625..53704,54000..55000)
                     /gene="recF"
                     /inference="ab initio prediction:Prodigal:2.60"
                     /inference="similar to AA sequence:UniProtKB:Q9RVE0""#;
        let gbf = parse_feature("testlocus", feature).unwrap();

        assert_eq!(gbf.feature_type, "CDS");
        assert!(matches!(gbf.location, FeatureLocation::Join(_)));
        assert_eq!(gbf.get_qualifier("gene").unwrap(), "recF");
        assert_eq!(gbf.get_qualifier("inference").unwrap().values().len(), 2);
    }

    #[test]
    fn test_multiline_location() {
        for feature in [
            r#"     CDS             complement(join(1294426..1294992,1294992..1295141,
                     1295140..1295322))
                     /gene="insZ"
                     /locus_tag="b4573""#,
            r#"     CDS             complement(join(1294426..1294992,
                     1294992..1295141,
                     1295140..1295322))
                     /gene="insZ"
                     /locus_tag="b4573""#,
        ] {
            let gbf = parse_feature("testlocus", feature).unwrap();
            assert_eq!(gbf.feature_type, "CDS");
            assert_eq!(gbf.location.segments().len(), 3);
            assert!(gbf.location.is_complement());
            assert_eq!(gbf.get_qualifier("gene").unwrap(), "insZ");
            assert_eq!(gbf.get_qualifier("locus_tag").unwrap(), "b4573");
        }
    }

    #[test]
    fn test_empty_qualifiers() {
        let feature = r#"     CDS             complement(52625..53704)
                     /gene="recF"
                     /locus_tag=
                     /note
                     /random="""#;
        let gbf = parse_feature("testlocus", feature).unwrap();

        assert_eq!(gbf.get_qualifier("locus_tag").unwrap(), "");
        assert!(gbf.get_qualifier("note").unwrap().is_flag());
        assert_eq!(gbf.get_qualifier("random").unwrap(), "");
    }

    #[test]
    fn test_minimal_feature() {
        let gbf = parse_feature("testlocus", "     CDS             complement(52625..53704)")
            .unwrap();
        assert_eq!(gbf.feature_type, "CDS");
        assert_eq!(gbf.location.to_string(), "complement(52625..53704)");
        assert!(gbf.qualifiers.is_empty());
    }

    #[test]
    fn test_missing_qualifier() {
        let feature = "     CDS             complement(52625..53704)\n                     /gene=\"recF\"";
        let gbf = parse_feature("testlocus", feature).unwrap();
        assert!(matches!(
            gbf.get_qualifier("locus_tag"),
            Err(GbToolsError::MissingQualifier { .. })
        ));
    }

    #[test]
    fn test_bad_location_fails() {
        assert!(matches!(
            parse_feature("testlocus", "     CDS             12..nope"),
            Err(GbToolsError::Location { .. })
        ));
    }

    #[test]
    fn test_equality() {
        let location = |text: &str| FeatureLocation::from(Location::parse(text).unwrap());
        let named = |name: &str| {
            let mut q = Qualifiers::new();
            q.insert("name".to_string(), QualifierValue::Scalar(name.to_string()));
            q
        };

        let gbf1 = Feature::new("testlocus", "CDS", location("123..679"), named("randomname"));
        let gbf2 = Feature::new("testlocus", "CDS", location("123..679"), named("randomname"));
        let gbf3 = Feature::new("testlocus", "CDS", location("123..679"), named("other"));
        let gbf4 = Feature::new("testlocus", "CDS", location("120..679"), named("randomname"));

        assert_eq!(gbf1, gbf2);
        assert_ne!(gbf1, gbf3);
        assert_ne!(gbf1, gbf4);
    }

    #[test]
    fn test_qualifier_json_shape() {
        let feature = "     CDS             1..9\n                     /gene=\"a\"\n                     /pseudo\n                     /note=\"x\"\n                     /note=\"y\"";
        let gbf = parse_feature("testlocus", feature).unwrap();
        let json = serde_json::to_string(&gbf.qualifiers).unwrap();
        assert_eq!(json, r#"{"gene":"a","pseudo":null,"note":["x","y"]}"#);
    }
}
