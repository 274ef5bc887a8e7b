//! Seed file loading
//!
//! The seed file is plain text with one absolute address per line. Blank
//! lines and lines starting with `#` are ignored.

use crate::crawler::CrawlTask;
use std::path::Path;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed address on line {line}: '{address}'")]
    InvalidAddress { line: usize, address: String },

    #[error("Seed file contains no addresses")]
    Empty,
}

/// Reads the seed file at `path` into depth-0 crawl tasks
pub fn load_seeds(path: &Path) -> Result<Vec<CrawlTask>, SeedError> {
    let content = std::fs::read_to_string(path)?;
    parse_seeds(&content)
}

/// Parses seed file content into depth-0 crawl tasks, preserving file order
pub fn parse_seeds(content: &str) -> Result<Vec<CrawlTask>, SeedError> {
    let mut seeds = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let address = line.trim();
        if address.is_empty() || address.starts_with('#') {
            continue;
        }

        let valid = Url::parse(address)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
            .unwrap_or(false);
        if !valid {
            return Err(SeedError::InvalidAddress {
                line: index + 1,
                address: address.to_string(),
            });
        }

        seeds.push(CrawlTask::seed(address));
    }

    if seeds.is_empty() {
        return Err(SeedError::Empty);
    }

    Ok(seeds)
}
