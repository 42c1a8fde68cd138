//! Dependency discovery over script and style text.
//!
//! Scanners run on comment-masked text, so commented-out imports are never
//! reported, and return byte spans into the original source. The emitter
//! reuses the same spans to rewrite references in the output.

use std::ops::Range;
use std::sync::LazyLock;

use bale_graph::EdgeKind;
use regex::Regex;

use super::lexer::{Lang, mask};

/// Syntactic form a reference was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceForm {
    /// `import x from "s"`, `import "s"`
    Import,
    /// `export { a } from "s"`, `export * from "s"`
    ExportFrom,
    /// `require("s")`
    Require,
    /// `import("s")`
    DynamicImport,
    /// `@import "s";`
    StyleImport,
    /// `url(s)`
    Url,
}

/// One reference found in a source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Specifier as the resolver should see it
    pub specifier: String,
    pub kind: EdgeKind,
    pub form: ReferenceForm,
    /// Whole statement or call expression
    pub statement: Range<usize>,
    /// Just the specifier text, quotes excluded
    pub span: Range<usize>,
    /// Import clause for `Import`/`ExportFrom` (`x`, `{ a as b }`, `* as ns`)
    pub clause: Option<String>,
}

static IMPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s+([\w$*{}\s,]+?)\s*\bfrom\s*["']([^"'\n]+)["']\s*;?"#)
        .expect("valid import regex")
});

static IMPORT_BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*["']([^"'\n]+)["']\s*;?"#).expect("valid import regex")
});

static EXPORT_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bexport\s*(\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s*["']([^"'\n]+)["']\s*;?"#)
        .expect("valid export regex")
});

static REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(\s*["']([^"'\n]+)["']\s*\)"#).expect("valid require regex")
});

static DYNAMIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*\(\s*["']([^"'\n]+)["']\s*\)"#).expect("valid import() regex")
});

static HOT_ACCEPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:module|import\.meta)\.hot\.accept\s*\(\s*(\[[^\]]*\]|["'][^"'\n]+["'])?"#)
        .expect("valid hot accept regex")
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([^"'\n]+)["']"#).expect("valid string regex"));

static STYLE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?:url\(\s*)?["']?([^"')\s;]+)["']?\s*\)?[^;]*;?"#)
        .expect("valid @import regex")
});

static STYLE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\burl\(\s*["']?([^"')]+?)["']?\s*\)"#).expect("valid url() regex")
});

/// References in a script, in source order.
pub fn script_references(src: &str) -> Vec<Reference> {
    let masked = mask(src, Lang::Script, false);
    let mut refs = Vec::new();

    let patterns: [(&Regex, ReferenceForm, bool); 5] = [
        (&IMPORT_FROM, ReferenceForm::Import, true),
        (&IMPORT_BARE, ReferenceForm::Import, false),
        (&EXPORT_FROM, ReferenceForm::ExportFrom, true),
        (&REQUIRE, ReferenceForm::Require, false),
        (&DYNAMIC_IMPORT, ReferenceForm::DynamicImport, false),
    ];

    for (regex, form, has_clause) in patterns {
        for caps in regex.captures_iter(&masked) {
            let (Some(whole), Some(spec)) = (caps.get(0), caps.get(if has_clause { 2 } else { 1 }))
            else {
                continue;
            };
            let clause = has_clause
                .then(|| caps.get(1))
                .flatten()
                .map(|c| c.as_str().trim().to_string());
            refs.push(Reference {
                specifier: spec.as_str().to_string(),
                kind: if form == ReferenceForm::DynamicImport {
                    EdgeKind::Dynamic
                } else {
                    EdgeKind::Static
                },
                form,
                statement: whole.range(),
                span: spec.range(),
                clause,
            });
        }
    }

    refs.sort_by_key(|r| r.statement.start);
    refs
}

/// Hot-replacement acceptance declared by a script.
///
/// Returns the accepted dependency specifiers and whether the module accepts
/// its own replacement (`module.hot.accept()` with no dependency argument).
pub fn hot_accepts(src: &str) -> (Vec<String>, bool) {
    let masked = mask(src, Lang::Script, false);
    let mut accepts = Vec::new();
    let mut self_accepting = false;

    for caps in HOT_ACCEPT.captures_iter(&masked) {
        match caps.get(1) {
            Some(arg) => {
                for quoted in QUOTED.captures_iter(arg.as_str()) {
                    let spec = quoted[1].to_string();
                    if !accepts.contains(&spec) {
                        accepts.push(spec);
                    }
                }
            }
            None => self_accepting = true,
        }
    }

    (accepts, self_accepting)
}

/// References in a stylesheet, in source order.
///
/// Data URLs, absolute URLs, root-relative paths and fragment-only
/// references are left alone. Plain relative paths gain a `./` prefix and a
/// leading `~` marks a package path.
pub fn style_references(src: &str) -> Vec<Reference> {
    let masked = mask(src, Lang::Style, false);
    let mut refs = Vec::new();

    for caps in STYLE_IMPORT.captures_iter(&masked) {
        let (Some(whole), Some(spec)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if let Some(specifier) = normalize_style_specifier(spec.as_str()) {
            refs.push(Reference {
                specifier,
                kind: EdgeKind::Static,
                form: ReferenceForm::StyleImport,
                statement: whole.range(),
                span: spec.range(),
                clause: None,
            });
        }
    }

    let imports: Vec<Range<usize>> = STYLE_IMPORT
        .find_iter(&masked)
        .map(|m| m.range())
        .collect();

    for caps in STYLE_URL.captures_iter(&masked) {
        let (Some(whole), Some(spec)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if imports
            .iter()
            .any(|r| r.start <= whole.start() && whole.end() <= r.end)
        {
            continue;
        }
        if let Some(specifier) = normalize_style_specifier(spec.as_str()) {
            refs.push(Reference {
                specifier,
                kind: EdgeKind::Static,
                form: ReferenceForm::Url,
                statement: whole.range(),
                span: spec.range(),
                clause: None,
            });
        }
    }

    refs.sort_by_key(|r| r.statement.start);
    refs
}

fn normalize_style_specifier(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty()
        || raw.starts_with('#')
        || raw.starts_with('/')
        || raw.starts_with("data:")
        || raw.contains("://")
    {
        return None;
    }
    if let Some(package) = raw.strip_prefix('~') {
        return Some(package.to_string());
    }
    if raw.starts_with("./") || raw.starts_with("../") {
        Some(raw.to_string())
    } else {
        Some(format!("./{raw}"))
    }
}
