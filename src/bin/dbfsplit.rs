//! dbfsplit CLI - inspect, plan and scan dBase tables
//!
//! # Usage
//!
//! ```bash
//! # Header and field table
//! dbfsplit header parcels.dbf
//!
//! # Record-aligned splits, one per line
//! dbfsplit plan data/ --records-per-split 50000
//!
//! # Records of the third split as tab-separated values
//! dbfsplit scan parcels.dbf --split 2 --records-per-split 50000 --encoding big5
//!
//! # Live records across all splits, scanned in parallel
//! dbfsplit count data/
//! ```
//!
//! Logs go to stderr. `-v` enables debug output, `-vv` trace output;
//! `RUST_LOG` overrides both.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

mod cli;

/// Decode dBase (.dbf) files and plan record-aligned splits.
#[derive(Parser)]
#[command(name = "dbfsplit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the header and field descriptors of a file
    Header {
        /// Path to the .dbf file
        file: PathBuf,
    },

    /// Print the splits planned for a file or directory
    Plan {
        /// A .dbf file, or a directory of them
        path: PathBuf,

        #[command(flatten)]
        split: cli::SplitArgs,
    },

    /// Print records as tab-separated values
    Scan {
        /// Path to the .dbf file
        file: PathBuf,

        /// Scan only the split with this index
        #[arg(long)]
        split: Option<usize>,

        #[command(flatten)]
        split_args: cli::SplitArgs,

        #[command(flatten)]
        decode: cli::DecodeArgs,

        /// Stop after this many records
        #[arg(long)]
        limit: Option<u64>,
    },

    /// Count live records across all splits in parallel
    Count {
        /// A .dbf file, or a directory of them
        path: PathBuf,

        #[command(flatten)]
        split: cli::SplitArgs,

        #[command(flatten)]
        decode: cli::DecodeArgs,
    },
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Header { file } => cli::header::run(&file),
        Commands::Plan { path, split } => cli::plan::run(&path, &split),
        Commands::Scan {
            file,
            split,
            split_args,
            decode,
            limit,
        } => cli::scan::run(&file, split, &split_args, &decode, limit),
        Commands::Count {
            path,
            split,
            decode,
        } => cli::count::run(&path, &split, &decode),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
