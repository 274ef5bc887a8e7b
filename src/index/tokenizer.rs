//! Keyword tokenizer
//!
//! Every character that is not a letter, digit, hyphen, underscore, or
//! apostrophe is treated as whitespace; the remaining runs are the tokens.

/// Splits page text into keyword tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer {
    fold_case: bool,
}

impl Tokenizer {
    /// Creates a tokenizer; with `fold_case` every token is lowercased
    pub fn new(fold_case: bool) -> Self {
        Self { fold_case }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !is_keyword_char(c))
            .filter(|token| !token.is_empty())
            .map(|token| {
                if self.fold_case {
                    token.to_lowercase()
                } else {
                    token.to_string()
                }
            })
            .collect()
    }
}

/// Tokenizes case-sensitively
pub fn tokenize(text: &str) -> Vec<String> {
    Tokenizer::default().tokenize(text)
}

fn is_keyword_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | '\'')
}
