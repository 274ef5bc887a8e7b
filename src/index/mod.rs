//! Inverted index model and tokenization
//!
//! The index maps each keyword to an ordered list of postings, one per page
//! address, each carrying the number of times the keyword occurred on that
//! page. Persistence lives in [`crate::storage`]; this module only holds the
//! record types and the text-side helpers.

mod tokenizer;

pub use tokenizer::{tokenize, Tokenizer};

use std::collections::HashMap;

/// One page's occurrence count for one keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub address: String,
    pub frequency: u32,
}

/// A keyword and its postings, in the order addresses were first seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRecord {
    pub keyword: String,
    pub postings: Vec<Posting>,
}

impl KeywordRecord {
    /// Returns the posting for `address`, if the keyword occurred there
    pub fn posting(&self, address: &str) -> Option<&Posting> {
        self.postings.iter().find(|p| p.address == address)
    }

    /// Sum of frequencies across all postings
    pub fn total_frequency(&self) -> u64 {
        self.postings.iter().map(|p| u64::from(p.frequency)).sum()
    }
}

/// Collapses a token stream into `(keyword, count)` pairs
///
/// Pairs come out in first-occurrence order.
pub fn count_keywords(tokens: &[String]) -> Vec<(&str, u32)> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, u32)> = Vec::new();

    for token in tokens {
        match positions.get(token.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                positions.insert(token.as_str(), counts.len());
                counts.push((token.as_str(), 1));
            }
        }
    }

    counts
}
