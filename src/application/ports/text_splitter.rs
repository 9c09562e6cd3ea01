use crate::domain::{SplitterConfig, SplitterConfigError, TextChunk};

/// Splits text into token-budgeted chunks. Implementations are pure and
/// synchronous; configuration travels with every call.
pub trait TextSplitter: Send + Sync {
    fn split(&self, text: &str, config: &SplitterConfig)
    -> Result<Vec<TextChunk>, TextSplitterError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TextSplitterError {
    #[error("invalid splitter configuration: {0}")]
    InvalidConfig(#[from] SplitterConfigError),
}
