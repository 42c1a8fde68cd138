//! Text-only steps: replace, minify, lint.

use regex::Regex;

use super::lexer::{Lang, SegmentKind, line_of, mask, segments};
use crate::diagnostics::{Diagnostic, DiagnosticKind};

/// Strip comments and collapse whitespace outside literals.
///
/// A whitespace run containing a line break becomes a single `\n` so
/// automatic semicolon insertion still sees the same statement boundaries.
/// License comments (`/*!`) are kept.
pub fn minify(src: &str, lang: Lang) -> String {
    let mut out = String::with_capacity(src.len());
    // pending separator: None, Some(false) = space, Some(true) = newline
    let mut pending: Option<bool> = None;

    let flush = |out: &mut String, pending: &mut Option<bool>| {
        if let Some(newline) = pending.take() {
            if !out.is_empty() {
                out.push(if newline { '\n' } else { ' ' });
            }
        }
    };

    for (kind, range) in segments(src, lang) {
        let text = &src[range];
        match kind {
            SegmentKind::Comment if text.starts_with("/*!") => {
                flush(&mut out, &mut pending);
                out.push_str(text);
            }
            SegmentKind::Comment => {
                pending = Some(pending.unwrap_or(false) || text.contains('\n'));
            }
            SegmentKind::Literal => {
                flush(&mut out, &mut pending);
                out.push_str(text);
            }
            SegmentKind::Code => {
                for ch in text.chars() {
                    if ch.is_whitespace() {
                        pending = Some(pending.unwrap_or(false) || ch == '\n');
                    } else {
                        flush(&mut out, &mut pending);
                        out.push(ch);
                    }
                }
            }
        }
    }

    out
}

/// Literal find-and-replace over the whole text.
pub fn replace(src: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return src.to_string();
    }
    src.replace(from, to)
}

/// Findings for denied identifiers and over-long lines.
///
/// Identifiers inside comments and string literals are not reported.
pub fn lint(src: &str, lang: Lang, deny: &[String], max_line_length: Option<usize>) -> Vec<Diagnostic> {
    let mut findings = Vec::new();
    let masked = mask(src, lang, true);

    for word in deny {
        let Ok(pattern) = Regex::new(&format!(r"\b{}\b", regex::escape(word))) else {
            continue;
        };
        for found in pattern.find_iter(&masked) {
            findings.push(
                Diagnostic::warning(
                    DiagnosticKind::Lint,
                    format!("`{word}` is not allowed (line {})", line_of(src, found.start())),
                )
                .with_help(format!("remove `{word}` or drop it from the lint deny list")),
            );
        }
    }

    if let Some(max) = max_line_length {
        for (idx, line) in src.lines().enumerate() {
            let len = line.chars().count();
            if len > max {
                findings.push(Diagnostic::warning(
                    DiagnosticKind::Lint,
                    format!("line {} is {len} characters long (max {max})", idx + 1),
                ));
            }
        }
    }

    findings
}
