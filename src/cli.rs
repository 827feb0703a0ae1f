//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::engine::BackendKind;
use clap::Parser;
use std::path::PathBuf;

/// ReaderLens - reading-history analysis sessions from the terminal
///
/// Picks borrow-record workbooks and a reader list, runs them through the
/// analysis engine, and writes per-reader charts and data dumps.
///
/// Examples:
///   readerlens --borrow 2023.xlsx,2024.xlsx --reader-list readers.xlsx
///   readerlens --input-dir ./records --reader-list readers.xlsx --document 2
///   readerlens --engine process --engine-command python3 --engine-arg engine.py ...
///   readerlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Borrow-record workbooks to analyze (comma-separated)
    ///
    /// If omitted, workbooks are discovered in --input-dir.
    #[arg(short, long, value_name = "FILES", value_delimiter = ',')]
    pub borrow: Vec<PathBuf>,

    /// Reader list workbook
    #[arg(short, long, value_name = "FILE")]
    pub reader_list: Option<PathBuf>,

    /// Directory scanned for borrow-record workbooks
    #[arg(long, value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Directory receiving charts, data dumps and reports
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Analysis engine transport
    #[arg(long, value_name = "BACKEND")]
    pub engine: Option<BackendKind>,

    /// Base URL of the HTTP analysis engine
    #[arg(long, value_name = "URL", env = "READERLENS_ENGINE_URL")]
    pub engine_url: Option<String>,

    /// Program started by the process engine backend
    #[arg(long, value_name = "PROGRAM")]
    pub engine_command: Option<String>,

    /// Argument passed to the engine program (repeatable)
    #[arg(long = "engine-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// Per-call engine timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Switch to this document after the initial analysis
    #[arg(short, long, value_name = "INDEX")]
    pub document: Option<usize>,

    /// List the documents found by the engine
    #[arg(long)]
    pub list_documents: bool,

    /// Do not write chart images
    #[arg(long)]
    pub no_charts: bool,

    /// Export the engine report for the active document
    #[arg(long)]
    pub export_report: bool,

    /// Export engine reports for every document
    #[arg(long)]
    pub export_all: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .readerlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .readerlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref url) = self.engine_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Engine URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref dir) = self.input_dir {
            if !dir.is_dir() {
                return Err(format!("Input directory does not exist: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("readerlens").chain(argv.iter().copied()))
    }

    #[test]
    fn test_borrow_files_are_comma_separated() {
        let args = parse(&["--borrow", "a.xlsx,b.xlsx", "--reader-list", "r.xlsx"]);
        assert_eq!(
            args.borrow,
            vec![PathBuf::from("a.xlsx"), PathBuf::from("b.xlsx")]
        );
        assert_eq!(args.reader_list, Some(PathBuf::from("r.xlsx")));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_engine_selection() {
        let args = parse(&[
            "--engine",
            "process",
            "--engine-command",
            "python3",
            "--engine-arg",
            "engine.py",
            "--engine-arg",
            "--quiet",
        ]);
        assert_eq!(args.engine, Some(BackendKind::Process));
        assert_eq!(args.engine_args, vec!["engine.py", "--quiet"]);
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = parse(&[]);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_url_and_timeout() {
        let mut args = parse(&["--timeout", "0"]);
        assert!(args.validate().is_err());

        args.timeout = Some(10);
        args.engine_url = Some("localhost:8765".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&[]);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
