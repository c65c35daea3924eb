//! Shared scanning helpers for the brace-delimited languages.
//!
//! Extractors run their header regexes over a masked copy of the source in
//! which comment text and string-literal interiors are replaced by spaces.
//! Masking preserves byte offsets and newlines, so positions found in the
//! masked text index straight back into the original.

/// Lexical flavor used for masking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Syntax {
    /// `//` and `/* */` comments, `'` and `"` strings, optional backtick templates.
    CLike { backticks: bool },
    /// Rust: nested block comments, raw strings, char literals vs lifetimes.
    Rust,
}

/// Blank out comments and string contents. Delimiting quotes are kept.
pub(crate) fn mask(source: &str, syntax: Syntax) -> Result<String, String> {
    let bytes = source.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        match b {
            b'/' if next == Some(b'/') => {
                let end = find_byte(bytes, i, b'\n').unwrap_or(bytes.len());
                blank(&mut out, &bytes[i..end]);
                i = end;
            }
            b'/' if next == Some(b'*') => {
                let end = block_comment_end(bytes, i, syntax == Syntax::Rust);
                blank(&mut out, &bytes[i..end]);
                i = end;
            }
            b'"' => {
                let end = quoted_end(bytes, i, b'"');
                copy_quoted(&mut out, &bytes[i..end], 1);
                i = end;
            }
            b'\'' if syntax != Syntax::Rust => {
                let end = quoted_end(bytes, i, b'\'');
                copy_quoted(&mut out, &bytes[i..end], 1);
                i = end;
            }
            b'`' if syntax == Syntax::CLike { backticks: true } => {
                let end = quoted_end(bytes, i, b'`');
                copy_quoted(&mut out, &bytes[i..end], 1);
                i = end;
            }
            b'\'' => match rust_char_literal_end(bytes, i) {
                Some(end) => {
                    copy_quoted(&mut out, &bytes[i..end], 1);
                    i = end;
                }
                None => {
                    out.push(b);
                    i += 1;
                }
            },
            b'r' | b'b' if syntax == Syntax::Rust && !is_ident_byte(prev(bytes, i)) => {
                match rust_raw_string(bytes, i) {
                    Some((open_len, end)) => {
                        copy_quoted(&mut out, &bytes[i..end], open_len);
                        i = end;
                    }
                    None => {
                        out.push(b);
                        i += 1;
                    }
                }
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8(out).map_err(|e| format!("masking produced invalid UTF-8: {e}"))
}

fn prev(bytes: &[u8], i: usize) -> u8 {
    if i == 0 {
        b' '
    } else {
        bytes[i - 1]
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes.get(from..)?.iter().position(|&b| b == needle).map(|p| from + p)
}

fn blank(out: &mut Vec<u8>, span: &[u8]) {
    out.extend(span.iter().map(|&b| if b == b'\n' { b'\n' } else { b' ' }));
}

/// Keep `open_len` leading bytes and the final byte, blank the rest.
fn copy_quoted(out: &mut Vec<u8>, span: &[u8], open_len: usize) {
    if span.len() <= open_len {
        blank(out, span);
        return;
    }
    out.extend_from_slice(&span[..open_len]);
    let body = &span[open_len..span.len() - 1];
    blank(out, body);
    let last = span[span.len() - 1];
    out.push(if last.is_ascii() { last } else { b' ' });
}

fn block_comment_end(bytes: &[u8], start: usize, nested: bool) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i + 1 < bytes.len() {
        if bytes[i] == b'/' && bytes[i + 1] == b'*' {
            if depth == 0 || nested {
                depth += 1;
            }
            i += 2;
        } else if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    bytes.len()
}

/// End (exclusive) of a quoted literal starting at `start`. Single and double
/// quoted literals stop at an unescaped newline.
fn quoted_end(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if quote != b'`' && quote != b'"' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// `'x'`, `'\n'`, `'\u{1F600}'`; `None` for lifetimes such as `'a`.
fn rust_char_literal_end(bytes: &[u8], start: usize) -> Option<usize> {
    let first = *bytes.get(start + 1)?;
    if first == b'\\' {
        let close = find_byte(bytes, start + 3, b'\'')?;
        return (close - start <= 12).then_some(close + 1);
    }
    let width = utf8_width(first);
    (bytes.get(start + 1 + width) == Some(&b'\'')).then_some(start + 2 + width)
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

/// `r"…"`, `r#"…"#`, `br"…"`, `b"…"`. Returns (opening length, end).
fn rust_raw_string(bytes: &[u8], start: usize) -> Option<(usize, usize)> {
    let mut i = start;
    if bytes[i] == b'b' {
        i += 1;
        if bytes.get(i) == Some(&b'"') {
            let end = quoted_end(bytes, i, b'"');
            return Some((2, end));
        }
    }
    if bytes.get(i) != Some(&b'r') {
        return None;
    }
    i += 1;
    let hashes = bytes[i..].iter().take_while(|&&b| b == b'#').count();
    i += hashes;
    if bytes.get(i) != Some(&b'"') {
        return None;
    }
    let open_len = i + 1 - start;
    let mut j = i + 1;
    while j < bytes.len() {
        if bytes[j] == b'"' && bytes[j + 1..].iter().take(hashes).filter(|&&b| b == b'#').count() == hashes {
            let end = j + 1 + hashes;
            return Some((open_len, end.min(bytes.len())));
        }
        j += 1;
    }
    Some((open_len, bytes.len()))
}

/// Brace depth before every byte of a masked text.
pub(crate) struct Depths {
    depth: Vec<i32>,
}

impl Depths {
    pub(crate) fn new(masked: &str) -> Self {
        let mut depth = Vec::with_capacity(masked.len() + 1);
        let mut current = 0i32;
        for b in masked.bytes() {
            depth.push(current);
            match b {
                b'{' => current += 1,
                b'}' => current -= 1,
                _ => {}
            }
        }
        depth.push(current);
        Self { depth }
    }

    pub(crate) fn at(&self, pos: usize) -> i32 {
        self.depth.get(pos).copied().unwrap_or(0)
    }

    /// Braces never close below zero and end balanced.
    pub(crate) fn is_balanced(&self) -> bool {
        self.depth.iter().all(|&d| d >= 0) && self.depth.last() == Some(&0)
    }
}

/// Replace braces that never pair up. Unclosed `{` become `;` so a block
/// header reads as bodiless; stray `}` become spaces. Returns the rewritten
/// text and the offsets of the unclosed openers.
pub(crate) fn seal_unclosed(masked: String) -> Result<(String, Vec<usize>), String> {
    let mut bytes = masked.into_bytes();
    let mut open: Vec<usize> = Vec::new();
    for i in 0..bytes.len() {
        match bytes[i] {
            b'{' => open.push(i),
            b'}' => {
                if open.pop().is_none() {
                    bytes[i] = b' ';
                }
            }
            _ => {}
        }
    }
    for &i in &open {
        bytes[i] = b';';
    }
    let sealed = String::from_utf8(bytes).map_err(|e| format!("sealing produced invalid UTF-8: {e}"))?;
    Ok((sealed, open))
}

/// Regions whose block was never closed. Each runs from the unclosed opener
/// to the next top-level block header, or to the end of the text.
pub(crate) struct Abandoned {
    spans: Vec<(usize, usize)>,
}

impl Abandoned {
    /// `headers` must be sorted.
    pub(crate) fn new(unclosed: &[usize], headers: &[usize], len: usize) -> Self {
        let spans = unclosed
            .iter()
            .map(|&start| {
                let end = headers.iter().copied().find(|&h| h > start).unwrap_or(len);
                (start, end)
            })
            .collect();
        Self { spans }
    }

    pub(crate) fn contains(&self, pos: usize) -> bool {
        self.spans.iter().any(|&(start, end)| start <= pos && pos < end)
    }
}

/// Position of the delimiter closing the one at `open_pos`.
pub(crate) fn matching(masked: &str, open_pos: usize, open: u8, close: u8) -> Option<usize> {
    let bytes = masked.as_bytes();
    if bytes.get(open_pos) != Some(&open) {
        return None;
    }
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open_pos) {
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// First of `targets` at or after `from`.
pub(crate) fn find_any(masked: &str, from: usize, targets: &[u8]) -> Option<(usize, u8)> {
    masked.as_bytes()[from.min(masked.len())..]
        .iter()
        .position(|b| targets.contains(b))
        .map(|p| (from + p, masked.as_bytes()[from + p]))
}

/// 1-based line number of byte offset `pos`.
pub(crate) fn line_of(source: &str, pos: usize) -> usize {
    bytecount::count(&source.as_bytes()[..pos.min(source.len())], b'\n') + 1
}

/// Parameter text between `open` and `close`, whitespace collapsed.
pub(crate) fn parameters(source: &str, open: usize, close: usize) -> String {
    source[open + 1..close]
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Doc or plain comment immediately above the declaration starting at `decl_start`.
///
/// Attribute (`#[...]`) and decorator (`@...`) lines between the comment and
/// the declaration are skipped. Multi-line comments are joined by spaces.
pub(crate) fn leading_comment(source: &str, decl_start: usize) -> Option<String> {
    let before = &source[..decl_start.min(source.len())];
    let line_start = before.rfind('\n').map_or(0, |p| p + 1);
    if !before[line_start..].trim().is_empty() {
        return None;
    }

    let mut lines = before[..line_start].lines().rev().map(str::trim).peekable();
    while lines
        .peek()
        .is_some_and(|l| l.starts_with("#[") || l.starts_with('@'))
    {
        lines.next();
    }

    let block = match lines.peek() {
        Some(l) if l.ends_with("*/") => true,
        Some(l) if l.starts_with("//") => false,
        _ => return None,
    };

    let mut collected: Vec<String> = Vec::new();
    if block {
        for line in lines {
            let done = line.starts_with("/*");
            let cleaned = line
                .trim_start_matches("/**")
                .trim_start_matches("/*")
                .trim_end_matches("*/")
                .trim_start_matches('*')
                .trim();
            if !cleaned.is_empty() {
                collected.push(cleaned.to_string());
            }
            if done {
                break;
            }
        }
    } else {
        for line in lines.take_while(|l| l.starts_with("//")) {
            let cleaned = line.trim_start_matches('/').trim_start_matches('!').trim();
            if !cleaned.is_empty() {
                collected.push(cleaned.to_string());
            }
        }
    }

    collected.reverse();
    (!collected.is_empty()).then(|| collected.join(" "))
}
