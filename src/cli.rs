//! Command-line interface for gbtools

use crate::fasta::{Fasta, FastaRecord};
use crate::feature::Feature;
use crate::genbank::GenBank;
use crate::location::parse_location;
use crate::locus::Locus;
use crate::operon::{find_operon, OperonConfig};
use crate::search::{search_both_strands, Match, SearchOptions};
use crate::stats::GenBankStats;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// gbtools - indexed random access to GenBank files
#[derive(Parser)]
#[command(name = "gbtools")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log debug messages (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the index of a GenBank file
    Info {
        /// Path to the GenBank file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Display statistics about a GenBank file
    Stats {
        /// Path to the GenBank file
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the header and features of a locus
    Locus {
        /// Path to the GenBank file
        #[arg(short, long)]
        input: PathBuf,

        /// Locus name
        #[arg(short, long, conflicts_with = "position")]
        name: Option<String>,

        /// Position of the locus in the file, starting at 0
        #[arg(short, long)]
        position: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List features, optionally filtered by locus, type and location
    Features {
        /// Path to the GenBank file
        #[arg(short, long)]
        input: PathBuf,

        /// Only features of this locus
        #[arg(short, long)]
        locus: Option<String>,

        /// Only features of this type
        #[arg(short = 't', long)]
        feature_type: Option<String>,

        /// Only features overlapping this GenBank location, e.g. `100..200`
        #[arg(long)]
        location: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the upstream and downstream neighbors of a feature
    Neighbors {
        /// Path to the GenBank file
        #[arg(short, long)]
        input: PathBuf,

        /// Locus the feature belongs to
        #[arg(short, long)]
        locus: String,

        /// Exact location of the feature, e.g. `complement(3381..4166)`
        #[arg(long)]
        location: String,

        /// Feature type
        #[arg(short = 't', long, default_value = "CDS")]
        feature_type: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Find probe matches in a GenBank or FASTA file
    Search {
        /// Path to the GenBank or FASTA file
        #[arg(short, long)]
        input: PathBuf,

        /// Probe sequence, IUPAC codes allowed
        #[arg(short, long)]
        probe: String,

        /// Maximum number of mismatches
        #[arg(short, long, default_value_t = 0)]
        mismatches: usize,

        /// Only search the forward strand
        #[arg(long)]
        forward_only: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Extract the operons downstream of probe matches as FASTA
    Operon {
        /// Path to the GenBank file
        #[arg(short, long)]
        input: PathBuf,

        /// Probe sequence, IUPAC codes allowed
        #[arg(short, long)]
        probe: String,

        /// Maximum number of mismatches
        #[arg(short, long, default_value_t = 0)]
        mismatches: usize,

        /// Largest gap between consecutive features of an operon
        #[arg(long, default_value_t = 500)]
        max_distance: u64,

        /// Bases to extend each match by on its 5' side
        #[arg(long, default_value_t = 0)]
        upstream: u64,

        /// Bases to extend each match by on its 3' side
        #[arg(long, default_value_t = 0)]
        downstream: u64,

        /// Feature type operons are built from
        #[arg(short = 't', long, default_value = "CDS")]
        feature_type: String,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run the CLI application
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => cmd_info(&input),
        Commands::Stats {
            input,
            format,
            output,
        } => cmd_stats(&input, format, output.as_deref()),
        Commands::Locus {
            input,
            name,
            position,
            format,
        } => cmd_locus(&input, name.as_deref(), position, format),
        Commands::Features {
            input,
            locus,
            feature_type,
            location,
            format,
        } => cmd_features(
            &input,
            locus.as_deref(),
            feature_type.as_deref(),
            location.as_deref(),
            format,
        ),
        Commands::Neighbors {
            input,
            locus,
            location,
            feature_type,
            format,
        } => cmd_neighbors(&input, &locus, &location, &feature_type, format),
        Commands::Search {
            input,
            probe,
            mismatches,
            forward_only,
            format,
        } => {
            let options = SearchOptions {
                mismatches,
                both_strands: !forward_only,
                ..SearchOptions::default()
            };
            cmd_search(&input, &probe, &options, format)
        }
        Commands::Operon {
            input,
            probe,
            mismatches,
            max_distance,
            upstream,
            downstream,
            feature_type,
            output,
        } => {
            let options = SearchOptions {
                mismatches,
                ..SearchOptions::default()
            };
            let config = OperonConfig {
                max_distance,
                upstream,
                downstream,
                feature_type,
            };
            cmd_operon(&input, &probe, &options, &config, output.as_deref())
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    // A logger may already be installed when running inside tests
    let _ = builder.try_init();
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn open_genbank(input: &Path) -> Result<GenBank> {
    let spinner = create_spinner("Indexing GenBank file...");
    let start = Instant::now();
    let genbank = GenBank::open(input)
        .with_context(|| format!("Failed to index GenBank file: {}", input.display()))?;
    spinner.finish_with_message(format!(
        "Indexed {} loci in {:.2?}",
        genbank.len(),
        start.elapsed()
    ));
    Ok(genbank)
}

fn load_loci(genbank: &GenBank, name: Option<&str>) -> Result<Vec<Locus>> {
    let loci = match name {
        Some(name) => genbank.loci_by_name(name)?,
        None => genbank.iter().collect::<crate::Result<Vec<_>>>()?,
    };
    if let Some(name) = name.filter(|_| loci.is_empty()) {
        bail!("No locus named '{}' in {}", name, genbank.path().display());
    }
    Ok(loci)
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Output written to: {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_info(input: &Path) -> Result<()> {
    let genbank = open_genbank(input)?;
    println!("{}", genbank.summary());
    Ok(())
}

fn cmd_stats(input: &Path, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let genbank = open_genbank(input)?;
    let spinner = create_spinner("Computing statistics...");
    let start = Instant::now();

    let stats = GenBankStats::from_genbank(&genbank)?;
    spinner.finish_with_message(format!("Done in {:.2?}", start.elapsed()));

    let mut text = match format {
        OutputFormat::Json => stats.to_json()?,
        OutputFormat::Text => stats.format_summary(),
    };
    text.push('\n');
    write_output(output, &text)
}

fn format_feature(feature: &Feature) -> String {
    let mut text = format!(
        "{:<15} {} ({})\n",
        feature.feature_type,
        feature.location,
        feature.location.strand()
    );
    for (key, value) in &feature.qualifiers {
        if value.is_flag() {
            text.push_str(&format!("    /{}\n", key));
        }
        for v in value.values() {
            text.push_str(&format!("    /{}={}\n", key, v));
        }
    }
    text
}

fn cmd_locus(
    input: &Path,
    name: Option<&str>,
    position: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let genbank = open_genbank(input)?;
    let loci = match (name, position) {
        (Some(name), _) => load_loci(&genbank, Some(name))?,
        (None, position) => vec![genbank.locus(position.unwrap_or(0))?],
    };

    if format == OutputFormat::Json {
        return print_json(&loci);
    }

    for locus in &loci {
        let line = &locus.header.locus;
        println!("Locus: {}", locus.name);
        println!("  Length: {}", line.length);
        println!("  Molecule: {} {}", line.molecule, line.molecule_type);
        if !line.division.is_empty() {
            println!("  Division: {}", line.division);
        }
        if !line.modification_date.is_empty() {
            println!("  Modified: {}", line.modification_date);
        }
        for (key, value) in &locus.header.fields {
            match value.as_text() {
                Some(text) => println!("  {}: {}", key, text.replace('\n', " ")),
                None => println!("  {}: {} entries", key, value.sections().len()),
            }
        }
        println!("  Features: {}", locus.feature_count());
        for (feature_type, features) in &locus.features {
            println!("    {:<15} {:>8}", feature_type, features.len());
        }
        println!();
    }
    Ok(())
}

fn cmd_features(
    input: &Path,
    locus_name: Option<&str>,
    feature_type: Option<&str>,
    location: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let location = location
        .map(parse_location)
        .transpose()
        .context("Invalid --location")?;
    let genbank = open_genbank(input)?;
    let loci = load_loci(&genbank, locus_name)?;

    let features: Vec<&Feature> = loci
        .iter()
        .flat_map(|locus| match &location {
            Some(location) => locus.features_at_location(location),
            None => locus.all_features().collect::<Vec<_>>(),
        })
        .filter(|f| feature_type.map_or(true, |t| f.feature_type == t))
        .collect();

    if format == OutputFormat::Json {
        return print_json(&features);
    }

    let mut current_locus = None;
    for feature in &features {
        if current_locus != Some(feature.locus.as_str()) {
            println!("Locus: {}", feature.locus);
            current_locus = Some(feature.locus.as_str());
        }
        print!("{}", format_feature(feature));
    }
    println!("{} features", features.len());
    Ok(())
}

#[derive(Serialize)]
struct Neighbors<'a> {
    feature: &'a Feature,
    upstream: Option<&'a Feature>,
    downstream: Option<&'a Feature>,
}

fn cmd_neighbors(
    input: &Path,
    locus_name: &str,
    location: &str,
    feature_type: &str,
    format: OutputFormat,
) -> Result<()> {
    let location = parse_location(location).context("Invalid --location")?;
    let genbank = open_genbank(input)?;
    let loci = load_loci(&genbank, Some(locus_name))?;

    let mut found = Vec::new();
    for locus in &loci {
        let features = locus.features.get(feature_type).into_iter().flatten();
        for feature in features.filter(|f| f.location == location) {
            found.push(Neighbors {
                feature,
                upstream: locus.next_upstream(feature),
                downstream: locus.next_downstream(feature),
            });
        }
    }
    if found.is_empty() {
        bail!(
            "No {} at {} on locus '{}'",
            feature_type,
            location,
            locus_name
        );
    }

    if format == OutputFormat::Json {
        return print_json(&found);
    }

    let describe = |f: Option<&Feature>| f.map_or("none".to_string(), |f| f.location.to_string());
    for n in &found {
        println!("{}", n.feature);
        println!("  upstream:   {}", describe(n.upstream));
        println!("  downstream: {}", describe(n.downstream));
    }
    Ok(())
}

/// True if the first non-blank byte of the file starts a FASTA header
fn is_fasta(path: &Path) -> Result<bool> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    while reader.read_line(&mut line)? > 0 {
        if let Some(c) = line.trim_start().chars().next() {
            return Ok(c == '>');
        }
        line.clear();
    }
    Ok(false)
}

#[derive(Serialize)]
struct Hit {
    sequence: String,
    #[serde(flatten)]
    hit: Match,
}

fn cmd_search(
    input: &Path,
    probe: &str,
    options: &SearchOptions,
    format: OutputFormat,
) -> Result<()> {
    let mut hits = Vec::new();
    let mut add_hits = |name: &str, seq: &str| -> Result<()> {
        for hit in search_both_strands(probe, seq, options)? {
            hits.push(Hit {
                sequence: name.to_string(),
                hit,
            });
        }
        Ok(())
    };

    if is_fasta(input)? {
        let fasta = Fasta::open(input)
            .with_context(|| format!("Failed to open FASTA file: {}", input.display()))?;
        let spinner = create_spinner("Searching...");
        for record in fasta.records() {
            let record: FastaRecord = record?;
            add_hits(&record.name, &record.seq)?;
        }
        spinner.finish_and_clear();
    } else {
        let genbank = open_genbank(input)?;
        let spinner = create_spinner("Searching...");
        for locus in genbank.iter() {
            let locus = locus?;
            add_hits(&locus.name, &locus.sequence)?;
        }
        spinner.finish_and_clear();
    }

    if format == OutputFormat::Json {
        return print_json(&hits);
    }

    for Hit { sequence, hit } in &hits {
        println!(
            "{}\t{}\t{}\t{}",
            sequence,
            hit.start + 1,
            hit.end + 1,
            hit.strand
        );
    }
    log::info!("{} matches", hits.len());
    Ok(())
}

fn cmd_operon(
    input: &Path,
    probe: &str,
    options: &SearchOptions,
    config: &OperonConfig,
    output: Option<&Path>,
) -> Result<()> {
    let genbank = open_genbank(input)?;
    let spinner = create_spinner("Searching for operons...");

    let mut records = String::new();
    let mut count = 0;
    for locus in genbank.iter() {
        let locus = locus?;
        for hit in search_both_strands(probe, &locus.sequence, options)? {
            if let Some(operon) = find_operon(&locus, &hit, config)? {
                records.push_str(&operon.to_fasta().to_string());
                count += 1;
            }
        }
    }
    spinner.finish_with_message(format!("Found {} operons", count));

    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            file.write_all(records.as_bytes())?;
            println!("Operons written to: {}", path.display());
            Ok(())
        }
        None => write_output(None, &records),
    }
}
