//! Comment- and literal-aware segmentation of script and style text.
//!
//! This is not a parser. It only knows enough to tell code apart from string
//! literals and comments, which is what scanning, linting and minification
//! need. Regular-expression literals are treated as code.

use std::ops::Range;

use memchr::memmem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Script,
    Style,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    Literal,
    Comment,
}

/// Split `src` into contiguous code, literal and comment segments.
///
/// Segments cover the whole input and every boundary falls on an ASCII
/// delimiter, so ranges are always valid `str` slice bounds.
pub fn segments(src: &str, lang: Lang) -> Vec<(SegmentKind, Range<usize>)> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut code_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let end = match bytes[i] {
            b'\'' | b'"' => Some((SegmentKind::Literal, literal_end(bytes, i))),
            b'`' if lang == Lang::Script => Some((SegmentKind::Literal, literal_end(bytes, i))),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = memmem::find(&bytes[i + 2..], b"*/")
                    .map(|pos| i + 2 + pos + 2)
                    .unwrap_or(bytes.len());
                Some((SegmentKind::Comment, end))
            }
            b'/' if lang == Lang::Script && bytes.get(i + 1) == Some(&b'/') => {
                let end = memchr::memchr(b'\n', &bytes[i..])
                    .map(|pos| i + pos)
                    .unwrap_or(bytes.len());
                Some((SegmentKind::Comment, end))
            }
            _ => None,
        };

        match end {
            Some((kind, end)) => {
                if code_start < i {
                    out.push((SegmentKind::Code, code_start..i));
                }
                out.push((kind, i..end));
                i = end;
                code_start = end;
            }
            None => i += 1,
        }
    }

    if code_start < bytes.len() {
        out.push((SegmentKind::Code, code_start..bytes.len()));
    }
    out
}

fn literal_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b if b == quote => return j + 1,
            // unterminated single-line string ends at the line break
            b'\n' if quote != b'`' => return j,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// Copy of `src` with comments (and optionally literal contents) blanked.
///
/// Byte offsets are preserved: every masked byte becomes a space, newlines
/// are kept so line numbers still line up.
pub fn mask(src: &str, lang: Lang, blank_literals: bool) -> String {
    if memchr::memchr(b'/', src.as_bytes()).is_none() && !blank_literals {
        return src.to_string();
    }

    let mut out = String::with_capacity(src.len());
    for (kind, range) in segments(src, lang) {
        let text = &src[range];
        match kind {
            SegmentKind::Code => out.push_str(text),
            SegmentKind::Comment => blank_into(&mut out, text),
            SegmentKind::Literal if blank_literals && text.len() >= 2 => {
                let (open, rest) = text.split_at(1);
                out.push_str(open);
                let closed = rest.ends_with(&open[..]);
                let inner = if closed { &rest[..rest.len() - 1] } else { rest };
                blank_into(&mut out, inner);
                if closed {
                    out.push_str(open);
                }
            }
            SegmentKind::Literal => out.push_str(text),
        }
    }
    out
}

fn blank_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch == '\n' {
            out.push('\n');
        } else {
            out.extend(std::iter::repeat_n(' ', ch.len_utf8()));
        }
    }
}

/// 1-based line number of a byte offset.
pub fn line_of(src: &str, offset: usize) -> usize {
    memchr::memchr_iter(b'\n', &src.as_bytes()[..offset.min(src.len())]).count() + 1
}
