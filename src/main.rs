//! crs - Cauchy Reed-Solomon file sharding
//!
//! Splits a file into `k` data shards and `m` coding shards inside a
//! container directory, repairs up to `m` lost shards, and reassembles the
//! original file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                              crs                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │     CLI      │───▶│   Pipeline   │───▶│ FsShardStore │       │
//! │  │    (clap)    │    │ encode/decode│    │ (container)  │       │
//! │  └──────────────┘    └──────┬───────┘    └──────────────┘       │
//! │                             ▼                                   │
//! │                      ┌──────────────┐                           │
//! │                      │ Shard Codec  │                           │
//! │                      └──────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use cauchy_shard::adapters::FsShardStore;
use cauchy_shard::pipeline::{self, ContainerStatus};
use cauchy_shard::{Error, Result};
use clap::{Parser, Subcommand};
use tracing::{error, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// =============================================================================
// CLI Arguments
// =============================================================================

/// crs - split files into k data + m coding shards and survive any m losses
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CRS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true, env = "CRS_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shard SOURCE into a new container DEST
    Encode {
        /// File to shard
        source: PathBuf,

        /// Container directory to create
        dest: String,

        /// Number of data shards
        #[arg(short = 'k', long = "data")]
        k: u32,

        /// Number of coding shards (1..=k)
        #[arg(short = 'm', long = "coding")]
        m: u32,
    },

    /// Rebuild missing or damaged shards in place
    Decode {
        /// Container directory
        container: String,
    },

    /// Reassemble the original file into OUTPUT (must not exist)
    Restore {
        /// Container directory
        container: String,

        /// File to create
        output: PathBuf,
    },

    /// Show container parameters and missing shards
    Status {
        /// Container directory
        container: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

// =============================================================================
// Main
// =============================================================================

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(&args);

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("crs: {}", e);
            if e.is_usage() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(command: Command) -> Result<()> {
    let store = FsShardStore::unrooted();

    match command {
        Command::Encode { source, dest, k, m } => {
            let spec = pipeline::encode_file(&store, &source, &dest, k, m)?;
            println!(
                "encoded {} bytes into {}: k={} m={} w={} width={}",
                spec.file_size(),
                dest,
                spec.k(),
                spec.m(),
                spec.w(),
                spec.width()
            );
        }
        Command::Decode { container } => {
            let repaired = pipeline::decode(&store, &container)?;
            if repaired.is_empty() {
                println!("{}: all shards present", container);
            } else {
                let names: Vec<String> = repaired.iter().map(ToString::to_string).collect();
                println!("{}: repaired {}", container, names.join(" "));
            }
        }
        Command::Restore { container, output } => {
            let written = pipeline::restore(&store, &container, &output)?;
            println!("restored {} bytes to {}", written, output.display());
        }
        Command::Status { container, json } => {
            let status = pipeline::status(&store, &container)?;
            if json {
                let report = serde_json::to_string_pretty(&status)
                    .map_err(|e| Error::io("serializing status", e.into()))?;
                println!("{}", report);
            } else {
                print_status(&status);
            }
        }
    }
    Ok(())
}

fn print_status(status: &ContainerStatus) {
    let p = &status.params;
    println!("container:   {}", status.container);
    println!("format:      v{}", status.format_version);
    println!("file size:   {}", status.file_size);
    println!("k / m / w:   {} / {} / {}", p.k, p.m, p.w);
    println!("width:       {}", p.width);
    println!("end padding: {}", p.end_padding);
    println!("present:     {}/{}", status.present, p.k + p.m);
    if status.is_healthy() {
        println!("state:       healthy");
    } else {
        println!("missing:     {}", status.missing.join(" "));
        println!(
            "state:       {}",
            if status.recoverable {
                "degraded, recoverable"
            } else {
                "unrecoverable"
            }
        );
    }
}

// =============================================================================
// Logging
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
