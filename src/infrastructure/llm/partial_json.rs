//! Best-effort parsing of truncated JSON, used to surface structured output
//! while a model is still streaming it.

use serde_json::Value;

use crate::application::ports::GeneratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    Idle,
    Backslash(usize),
    Unicode(usize, usize),
}

struct Scan {
    closers: Vec<char>,
    in_string: bool,
    dangling_escape: Option<usize>,
    boundaries: Vec<usize>,
}

/// Largest valid value that `input` is a prefix of, as far as it can be
/// recovered: open strings and containers are closed, and anything that still
/// does not parse is cut back to the previous `,`, `{` or `[`.
///
/// Returns `None` for blank input or when nothing can be recovered, e.g. a
/// truncated top-level literal.
pub fn parse_partial(input: &str) -> Option<Value> {
    if input.trim().is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(input) {
        return Some(value);
    }

    let full = scan(input);
    if let Some(value) = close(input, &full) {
        return Some(value);
    }

    full.boundaries
        .iter()
        .rev()
        .filter(|&&cut| cut < input.len())
        .find_map(|&cut| {
            let prefix = &input[..cut];
            close(prefix, &scan(prefix))
        })
}

fn close(prefix: &str, scan: &Scan) -> Option<Value> {
    let mut candidate = match scan.dangling_escape {
        Some(start) => prefix[..start].to_string(),
        None => prefix.to_string(),
    };
    if scan.in_string {
        candidate.push('"');
    }
    candidate.extend(scan.closers.iter().rev());
    serde_json::from_str(&candidate).ok()
}

fn scan(text: &str) -> Scan {
    let mut closers = Vec::new();
    let mut in_string = false;
    let mut escape = Escape::Idle;
    let mut boundaries = Vec::new();

    for (i, c) in text.char_indices() {
        if in_string {
            escape = match (escape, c) {
                (Escape::Backslash(start), 'u') => Escape::Unicode(start, 4),
                (Escape::Backslash(_), _) => Escape::Idle,
                (Escape::Unicode(start, remaining), _) if remaining > 1 => {
                    Escape::Unicode(start, remaining - 1)
                }
                (Escape::Unicode(..), _) => Escape::Idle,
                (Escape::Idle, '\\') => Escape::Backslash(i),
                (Escape::Idle, '"') => {
                    in_string = false;
                    Escape::Idle
                }
                (Escape::Idle, _) => Escape::Idle,
            };
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => {
                closers.push('}');
                boundaries.push(i + 1);
            }
            '[' => {
                closers.push(']');
                boundaries.push(i + 1);
            }
            '}' | ']' => {
                closers.pop();
            }
            ',' => boundaries.push(i),
            _ => {}
        }
    }

    let dangling_escape = match escape {
        Escape::Backslash(start) | Escape::Unicode(start, _) if in_string => Some(start),
        _ => None,
    };

    Scan {
        closers,
        in_string,
        dangling_escape,
        boundaries,
    }
}

/// Folds streamed text deltas into de-duplicated partial snapshots.
#[derive(Debug, Default)]
pub struct PartialObjectAccumulator {
    text: String,
    last: Option<Value>,
}

impl PartialObjectAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a delta and returns the new snapshot if it differs from the
    /// last one returned.
    pub fn push(&mut self, delta: &str) -> Option<Value> {
        self.text.push_str(delta);
        let snapshot = parse_partial(&self.text)?;
        if self.last.as_ref() == Some(&snapshot) {
            return None;
        }
        self.last = Some(snapshot.clone());
        Some(snapshot)
    }

    /// The complete text must be valid JSON. Returns the final value unless it
    /// was already emitted as the last snapshot.
    pub fn finish(&mut self) -> Result<Option<Value>, GeneratorError> {
        let value: Value = serde_json::from_str(&self.text).map_err(|e| {
            GeneratorError::InvalidResponse(format!("incomplete structured output: {e}"))
        })?;
        if self.last.as_ref() == Some(&value) {
            return Ok(None);
        }
        self.last = Some(value.clone());
        Ok(Some(value))
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
