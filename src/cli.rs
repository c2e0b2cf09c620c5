//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

use crate::providers::imap::DEFAULT_CHUNK_SIZE;

#[derive(Parser, Debug)]
#[command(name = "mailsweep")]
#[command(version)]
#[command(about = "Delete or trash IMAP messages matching configured rules", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short = 'C', long, default_value = "config.json")]
    pub config: PathBuf,

    /// Apply every action without asking
    #[arg(long)]
    pub force: bool,

    /// Leave messages received within this many days alone (0 disables)
    #[arg(long, default_value_t = 0)]
    pub skip_days: u32,

    /// UIDs per search request
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, value_parser = parse_chunk_size)]
    pub chunk_size: usize,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_chunk_size(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("chunk size must be at least 1".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(e.to_string()),
    }
}
