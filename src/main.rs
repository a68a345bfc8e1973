//! gbtools - GenBank tools CLI
//!
//! A command-line tool for indexing and querying GenBank files.

use gbtools::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
