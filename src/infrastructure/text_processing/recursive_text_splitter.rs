use std::sync::Arc;

use crate::application::ports::{TextSplitter, TextSplitterError, TokenCounter};
use crate::application::services::Cl100kTokenCounter;
use crate::domain::{SplitterConfig, TextChunk};

/// Boundary-aware splitter: tries the coarsest separator first and only
/// descends to finer separators for segments that cannot fit on their own.
pub struct RecursiveTextSplitter {
    token_counter: Arc<dyn TokenCounter>,
}

impl Default for RecursiveTextSplitter {
    fn default() -> Self {
        Self::new(Arc::new(Cl100kTokenCounter))
    }
}

impl RecursiveTextSplitter {
    pub fn new(token_counter: Arc<dyn TokenCounter>) -> Self {
        Self { token_counter }
    }

    /// Chunks in left-to-right order. A segment that is still over budget once
    /// the separators run out is emitted whole. Empty chunks are kept.
    pub fn split_text(
        &self,
        text: &str,
        config: &SplitterConfig,
    ) -> Result<Vec<String>, TextSplitterError> {
        config.validate()?;
        Ok(self.split_with(text, &config.separators, config))
    }

    // Each descent consumes one separator, so recursion depth is bounded by
    // the length of the separator list.
    fn split_with(&self, text: &str, separators: &[String], config: &SplitterConfig) -> Vec<String> {
        let Some((separator, finer)) = separators.split_first() else {
            return vec![text.to_string()];
        };

        if separator.is_empty() || !text.contains(separator.as_str()) {
            return self.split_with(text, finer, config);
        }

        let window = overlap_window(config.chunk_overlap, separator);
        let separator_tokens = self.token_counter.count(separator);
        let mut chunks = Vec::new();
        let mut buffer = Buffer::new(separator);

        for segment in text.split(separator.as_str()) {
            let segment_tokens = self.token_counter.count(segment);
            let fitted = self.measure(
                &buffer,
                segment,
                segment_tokens,
                separator_tokens,
                config.chunk_size,
            );
            if let Some(tokens) = fitted {
                buffer.push(segment, segment_tokens, tokens);
                continue;
            }

            if segment_tokens > config.chunk_size {
                if !buffer.is_empty() {
                    chunks.push(std::mem::take(&mut buffer.text));
                }
                tracing::trace!(
                    separator = ?separator,
                    remaining_separators = finer.len(),
                    "Oversized segment, descending to finer separator"
                );
                chunks.extend(self.split_with(segment, finer, config));
                buffer.clear();
                continue;
            }

            chunks.push(buffer.text.clone());
            let keep = buffer.overlap_len(window, separator_tokens, config.chunk_overlap);
            self.retain_tail(&mut buffer, keep);

            // Overlap gives way, oldest segment first, until the new segment fits.
            loop {
                let fitted = self.measure(
                    &buffer,
                    segment,
                    segment_tokens,
                    separator_tokens,
                    config.chunk_size,
                );
                match fitted {
                    Some(tokens) => {
                        buffer.push(segment, segment_tokens, tokens);
                        break;
                    }
                    None => {
                        let keep = buffer.segments.len().saturating_sub(1);
                        self.retain_tail(&mut buffer, keep);
                    }
                }
            }
        }

        if !buffer.is_empty() {
            chunks.push(buffer.text);
        }

        chunks
    }

    /// Token length of the buffer with `segment` appended, or `None` if that
    /// exceeds `chunk_size`. Counts of adjacent pieces are summed while well
    /// under budget; near the edge the rejoined candidate is measured, so
    /// separator tokens are counted as the model will see them.
    fn measure(
        &self,
        buffer: &Buffer<'_>,
        segment: &str,
        segment_tokens: usize,
        separator_tokens: usize,
        chunk_size: usize,
    ) -> Option<usize> {
        if buffer.is_empty() {
            return (segment_tokens <= chunk_size).then_some(segment_tokens);
        }

        let estimate = buffer.tokens + separator_tokens + segment_tokens;
        if estimate + EXACT_MEASURE_MARGIN <= chunk_size {
            return Some(estimate);
        }

        let mut candidate =
            String::with_capacity(buffer.text.len() + buffer.separator.len() + segment.len());
        candidate.push_str(&buffer.text);
        candidate.push_str(buffer.separator);
        candidate.push_str(segment);
        let exact = self.token_counter.count(&candidate);
        (exact <= chunk_size).then_some(exact)
    }

    fn retain_tail(&self, buffer: &mut Buffer<'_>, keep: usize) {
        let drop = buffer.segments.len() - keep.min(buffer.segments.len());
        buffer.segments.drain(..drop);
        buffer.text = buffer
            .segments
            .iter()
            .map(|(segment, _)| *segment)
            .collect::<Vec<_>>()
            .join(buffer.separator);
        buffer.tokens = match buffer.segments.as_slice() {
            [] => 0,
            [(_, tokens)] => *tokens,
            _ => self.token_counter.count(&buffer.text),
        };
    }
}

/// Summed counts stay exact within this many tokens of the budget.
const EXACT_MEASURE_MARGIN: usize = 16;

/// Segments of the chunk being built, their joined text and its token length.
struct Buffer<'a> {
    separator: &'a str,
    segments: Vec<(&'a str, usize)>,
    text: String,
    tokens: usize,
}

impl<'a> Buffer<'a> {
    fn new(separator: &'a str) -> Self {
        Self {
            separator,
            segments: Vec::new(),
            text: String::new(),
            tokens: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn push(&mut self, segment: &'a str, segment_tokens: usize, tokens: usize) {
        if !self.segments.is_empty() {
            self.text.push_str(self.separator);
        }
        self.text.push_str(segment);
        self.segments.push((segment, segment_tokens));
        self.tokens = tokens;
    }

    fn clear(&mut self) {
        self.segments.clear();
        self.text.clear();
        self.tokens = 0;
    }

    /// Number of trailing segments to carry into the next chunk: at most
    /// `window`, trimmed from the front to about `chunk_overlap` tokens, but
    /// never fewer than one while the window is open.
    fn overlap_len(&self, window: usize, separator_tokens: usize, chunk_overlap: usize) -> usize {
        let window = window.min(self.segments.len());
        if window == 0 {
            return 0;
        }

        let mut keep = 1;
        let mut tokens = self.segments[self.segments.len() - 1].1;
        for (_, segment_tokens) in self.segments.iter().rev().take(window).skip(1) {
            tokens += separator_tokens + segment_tokens;
            if tokens > chunk_overlap {
                break;
            }
            keep += 1;
        }
        keep
    }
}

/// Overlap in segments, not tokens: `chunk_overlap / separator length`.
fn overlap_window(chunk_overlap: usize, separator: &str) -> usize {
    chunk_overlap / separator.chars().count()
}

impl TextSplitter for RecursiveTextSplitter {
    fn split(
        &self,
        text: &str,
        config: &SplitterConfig,
    ) -> Result<Vec<TextChunk>, TextSplitterError> {
        let chunks = self
            .split_text(text, config)?
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let token_count = self.token_counter.count(&text);
                TextChunk::new(index, text, token_count)
            })
            .collect();
        Ok(chunks)
    }
}
