//! Token estimation

const CHARS_PER_TOKEN: usize = 4;

/// Deterministic token count for a text.
///
/// Not a real tokenizer: a fixed chars-per-token measure. Equal text
/// always yields equal counts, and extending a text never lowers the
/// count, which is all the cost accounting relies on.
pub fn count_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}
