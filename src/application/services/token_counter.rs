use std::sync::LazyLock;
use tiktoken_rs::CoreBPE;

use crate::application::ports::TokenCounter;

// Chunk budgets are measured in cl100k_base tokens.
static TOKENIZER: LazyLock<CoreBPE> = LazyLock::new(|| {
    tiktoken_rs::cl100k_base().expect("Failed to initialize cl100k_base tokenizer")
});

pub fn count_tokens(text: &str) -> usize {
    TOKENIZER.encode_with_special_tokens(text).len()
}

/// Size estimate for callers that do not need to split, e.g. progress reporting.
pub fn estimate_token_count(text: &str) -> usize {
    count_tokens(text)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Cl100kTokenCounter;

impl TokenCounter for Cl100kTokenCounter {
    fn count(&self, text: &str) -> usize {
        count_tokens(text)
    }
}
