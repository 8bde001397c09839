//! Mapping between `syn` spans and byte offsets of the parsed text

use proc_macro2::LineColumn;

/// Byte offset of every line start in a text
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    /// Index the line starts of `text`
    #[must_use]
    pub fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(at, _)| at + 1))
            .collect();
        Self { starts }
    }

    /// Byte offset of a span position inside `text`
    ///
    /// Lines are 1-based and columns count characters, as reported by
    /// `proc_macro2` with `span-locations`. Line doc comments end after the
    /// `\r` of a CRLF line; such offsets are moved back in front of it.
    #[must_use]
    pub fn offset(&self, text: &str, at: LineColumn) -> usize {
        let Some(&line_start) = self.starts.get(at.line.saturating_sub(1)) else {
            return text.len();
        };
        let offset = text[line_start..]
            .char_indices()
            .nth(at.column)
            .map_or(text.len(), |(index, _)| line_start + index);
        if text[..offset].ends_with('\r') && text[offset..].starts_with('\n') {
            offset - 1
        } else {
            offset
        }
    }
}

/// Split a leading `#!` interpreter line off a source text
///
/// `#![...]` is an inner attribute, not a shebang.
#[must_use]
pub fn split_shebang(source: &str) -> (&str, &str) {
    if source.starts_with("#!") && !source[2..].trim_start().starts_with('[') {
        let end = source.find('\n').unwrap_or(source.len());
        return source.split_at(end);
    }
    ("", source)
}

/// Line terminator of a text, taken from its first line
#[must_use]
pub fn line_ending(text: &str) -> &'static str {
    match text.find('\n') {
        Some(at) if text[..at].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Extend an item end over the comments sharing its last line
///
/// Doc comments are left alone: they belong to the next item.
#[must_use]
pub fn trailing_comment_end(text: &str, mut end: usize) -> usize {
    loop {
        let rest = &text[end..];
        let after = rest.trim_start_matches([' ', '\t']);
        let pad = rest.len() - after.len();
        if is_plain_line_comment(after) {
            let line = after.find('\n').unwrap_or(after.len());
            let line = after[..line].strip_suffix('\r').map_or(line, str::len);
            return end + pad + line;
        }
        if !is_plain_block_comment(after) {
            return end;
        }
        match block_comment_len(after) {
            Some(len) => end += pad + len,
            None => return end,
        }
    }
}

fn is_plain_line_comment(text: &str) -> bool {
    text.starts_with("//")
        && !text.starts_with("//!")
        && (!text.starts_with("///") || text.starts_with("////"))
}

fn is_plain_block_comment(text: &str) -> bool {
    text.starts_with("/*")
        && !text.starts_with("/*!")
        && (!text.starts_with("/**") || text.starts_with("/**/") || text.starts_with("/***"))
}

/// Length of the (possibly nested) block comment `text` starts with
fn block_comment_len(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut at = 0;
    while at + 1 < bytes.len() {
        match &bytes[at..at + 2] {
            b"/*" => {
                depth += 1;
                at += 2;
            }
            b"*/" => {
                depth = depth.saturating_sub(1);
                at += 2;
                if depth == 0 {
                    return Some(at);
                }
            }
            _ => at += 1,
        }
    }
    None
}
