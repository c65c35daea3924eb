//! Context size accounting and clipboard chunking.
//!
//! Token counts use tiktoken's cl100k_base encoding; if the encoding cannot
//! be loaded a ~4 chars/token heuristic is used instead.

use std::fmt;
use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn tokenizer() -> Option<&'static CoreBPE> {
    CL100K.get_or_init(|| tiktoken_rs::cl100k_base().ok()).as_ref()
}

fn fallback_count(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Count tokens in `text`. Never fails.
///
/// # Examples
///
/// ```
/// use codecat::tokens::count_tokens;
///
/// assert!(count_tokens("def f(): pass") > 0);
/// ```
pub fn count_tokens(text: &str) -> usize {
    match tokenizer() {
        Some(bpe) => bpe.encode_ordinary(text).len(),
        None => fallback_count(text),
    }
}

/// Size of a rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentSize {
    pub chars: usize,
    pub tokens: usize,
}

impl ContentSize {
    pub fn of(text: &str) -> Self {
        Self {
            chars: text.chars().count(),
            tokens: count_tokens(text),
        }
    }

    /// Whether the content needs more than one clipboard part.
    pub fn exceeds(&self, chunk_size: usize) -> bool {
        self.chars > chunk_size
    }
}

impl fmt::Display for ContentSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} characters, ~{} tokens", self.chars, self.tokens)
    }
}

/// Split `content` into parts of at most `chunk_size` characters, breaking
/// after a newline where possible. A single line longer than the limit is
/// split at a character boundary. Concatenating the parts gives back the
/// input.
pub fn chunk_content(content: &str, chunk_size: usize) -> Vec<&str> {
    let chunk_size = chunk_size.max(1);
    let mut parts = Vec::new();
    let mut rest = content;

    while !rest.is_empty() {
        // byte offset just past the `chunk_size`-th character
        let limit = rest
            .char_indices()
            .nth(chunk_size)
            .map_or(rest.len(), |(i, _)| i);
        if limit == rest.len() {
            parts.push(rest);
            break;
        }
        let cut = match rest[..limit].rfind('\n') {
            Some(newline) => newline + 1,
            None => limit,
        };
        let (part, tail) = rest.split_at(cut);
        parts.push(part);
        rest = tail;
    }

    parts
}
