//! Module syntax lowering for the chunk registry.
//!
//! Module bodies run as `function (module, exports, require)` factories.
//! Import, export, `require()` and `import()` forms found by the dependency
//! scanner are rewritten into calls on the `__bale__` runtime. Every rewrite
//! keeps the number of lines of the text it replaces, so line-level source
//! maps stay valid.

use std::fmt::Write as _;
use std::ops::Range;
use std::sync::LazyLock;

use bale_analysis::transform::lexer::{Lang, mask};
use bale_analysis::transform::scan::{Reference, ReferenceForm, script_references};
use bale_graph::EdgeKind;
use regex::Regex;

/// Where a reference points after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Registry key of a bundled module
    Module(String),
    /// Registry key of a dynamic chunk root and the files to load first
    Chunk { key: String, files: Vec<String> },
    External(String),
    /// Dropped in tolerant mode, throws when evaluated
    Missing(String),
}

/// A lowered module body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lowered {
    /// Single-line statement placed ahead of the body (export getters)
    pub prelude: String,
    pub body: String,
}

static EXPORT_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bexport\s+default\s+").expect("valid export default regex"));

static EXPORT_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bexport\s+((?:async\s+)?function\s*\*?|class|const|let|var)\s*([\w$]+)")
        .expect("valid export declaration regex")
});

static EXPORT_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bexport\s*\{([^}]*)\}\s*;?").expect("valid export list regex")
});

static FROM_AHEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*from\b").expect("valid from regex"));

static HOT_ACCEPT_ARGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bmodule\.hot\.accept\s*\(\s*(\[[^\]]*\]|["'][^"'\n]+["'])"#)
        .expect("valid hot accept regex")
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([^"'\n]+)["']"#).expect("valid string regex"));

/// Lower `code`, mapping each scanned reference through `resolve`.
pub fn lower(code: &str, mut resolve: impl FnMut(&Reference) -> Target) -> Lowered {
    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    let mut getters: Vec<(String, String)> = Vec::new();
    let mut esm = false;
    let mut temp = 0usize;

    for reference in script_references(code) {
        let target = resolve(&reference);
        let replacement = match reference.form {
            ReferenceForm::Import => {
                esm = true;
                import_statement(reference.clause.as_deref(), &target, &mut temp)
            }
            ReferenceForm::ExportFrom => {
                esm = true;
                export_from(reference.clause.as_deref().unwrap_or("*"), &target, &mut temp)
            }
            ReferenceForm::Require => source_expr(&target),
            ReferenceForm::DynamicImport => dynamic_import(&target),
            ReferenceForm::StyleImport | ReferenceForm::Url => continue,
        };
        edits.push((reference.statement, replacement));
    }

    let masked = mask(code, Lang::Script, true);
    let taken = |edits: &[(Range<usize>, String)], at: usize| {
        edits.iter().any(|(range, _)| range.contains(&at))
    };

    for m in EXPORT_DEFAULT.find_iter(&masked) {
        if !taken(&edits, m.start()) {
            esm = true;
            edits.push((m.range(), "exports.default = ".to_string()));
        }
    }

    for caps in EXPORT_DECL.captures_iter(&masked) {
        let (Some(whole), Some(keyword), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        if taken(&edits, whole.start()) {
            continue;
        }
        esm = true;
        edits.push((whole.start()..keyword.start(), String::new()));
        getters.push((name.as_str().to_string(), name.as_str().to_string()));
    }

    for caps in EXPORT_LIST.captures_iter(&masked) {
        let (Some(whole), Some(list)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if taken(&edits, whole.start()) || FROM_AHEAD.is_match(&masked[whole.end()..]) {
            continue;
        }
        esm = true;
        for (local, exported) in specifier_pairs(list.as_str()) {
            getters.push((exported, local));
        }
        edits.push((whole.range(), String::new()));
    }

    // Accepted dependencies are matched against registry keys at runtime.
    let comments_masked = mask(code, Lang::Script, false);
    for caps in HOT_ACCEPT_ARGS.captures_iter(&comments_masked) {
        let Some(args) = caps.get(1) else { continue };
        for quoted in QUOTED.captures_iter(args.as_str()) {
            let Some(spec) = quoted.get(1) else { continue };
            let span = args.start() + spec.start()..args.start() + spec.end();
            let reference = Reference {
                specifier: spec.as_str().to_string(),
                kind: EdgeKind::Static,
                form: ReferenceForm::Require,
                statement: span.clone(),
                span: span.clone(),
                clause: None,
            };
            if let Target::Module(key) | Target::Chunk { key, .. } = resolve(&reference) {
                edits.push((span, key));
            }
        }
    }

    let prelude = match (esm, getters.is_empty()) {
        (false, _) => String::new(),
        (true, true) => "__bale__.esm(exports, {});".to_string(),
        (true, false) => {
            let fields: Vec<String> = getters
                .iter()
                .map(|(exported, local)| {
                    format!("{}: function () {{ return {local}; }}", quote(exported))
                })
                .collect();
            format!("__bale__.esm(exports, {{ {} }});", fields.join(", "))
        }
    };

    Lowered {
        prelude,
        body: apply(code, edits),
    }
}

/// Splice `edits` into `code`, padding each replacement with the newlines
/// of the text it replaces.
fn apply(code: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);
    let mut out = String::with_capacity(code.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        if range.start < cursor {
            continue;
        }
        out.push_str(&code[cursor..range.start]);
        out.push_str(&replacement);
        let newlines = code[range.clone()].matches('\n').count();
        for _ in 0..newlines.saturating_sub(replacement.matches('\n').count()) {
            out.push('\n');
        }
        cursor = range.end;
    }
    out.push_str(&code[cursor..]);
    out
}

fn import_statement(clause: Option<&str>, target: &Target, temp: &mut usize) -> String {
    let source = source_expr(target);
    let Some(clause) = clause.map(str::trim).filter(|c| !c.is_empty()) else {
        return format!("{source};");
    };

    let binding = next_temp(temp);
    let mut out = format!("const {binding} = __bale__.interop({source});");

    let (default, rest) = if clause.starts_with('{') || clause.starts_with('*') {
        (None, clause)
    } else {
        match clause.split_once(',') {
            Some((default, rest)) => (Some(default.trim()), rest.trim()),
            None => (Some(clause), ""),
        }
    };

    if let Some(default) = default {
        let _ = write!(out, " const {default} = {binding}.default;");
    }
    if let Some(ns) = rest.strip_prefix('*') {
        let ns = ns.trim().trim_start_matches("as").trim();
        let _ = write!(out, " const {ns} = {binding};");
    } else if rest.starts_with('{') {
        let pairs: Vec<String> = specifier_pairs(rest.trim_matches(|c| c == '{' || c == '}'))
            .into_iter()
            .map(|(imported, local)| {
                if imported == local {
                    local
                } else {
                    format!("{imported}: {local}")
                }
            })
            .collect();
        if !pairs.is_empty() {
            let _ = write!(out, " const {{ {} }} = {binding};", pairs.join(", "));
        }
    }
    out
}

fn export_from(clause: &str, target: &Target, temp: &mut usize) -> String {
    let source = source_expr(target);
    let clause = clause.trim();

    if clause == "*" {
        return format!("__bale__.reexport(exports, {source});");
    }

    let binding = next_temp(temp);
    let mut out = format!("const {binding} = __bale__.interop({source});");
    let fields: Vec<String> = match clause.strip_prefix('*') {
        Some(ns) => {
            let ns = ns.trim().trim_start_matches("as").trim();
            vec![format!("{}: function () {{ return {binding}; }}", quote(ns))]
        }
        None => specifier_pairs(clause.trim_matches(|c| c == '{' || c == '}'))
            .into_iter()
            .map(|(imported, exported)| {
                format!(
                    "{}: function () {{ return {binding}[{}]; }}",
                    quote(&exported),
                    quote(&imported)
                )
            })
            .collect(),
    };
    let _ = write!(out, " __bale__.esm(exports, {{ {} }});", fields.join(", "));
    out
}

fn dynamic_import(target: &Target) -> String {
    match target {
        Target::Chunk { key, files } => {
            let files: Vec<String> = files.iter().map(|f| quote(f)).collect();
            format!("__bale__.load([{}], {})", files.join(", "), quote(key))
        }
        Target::Module(key) => {
            format!("Promise.resolve().then(function () {{ return __bale__.interop(require({})); }})", quote(key))
        }
        other => format!(
            "Promise.resolve().then(function () {{ return __bale__.interop({}); }})",
            source_expr(other)
        ),
    }
}

fn source_expr(target: &Target) -> String {
    match target {
        Target::Module(key) | Target::Chunk { key, .. } => format!("require({})", quote(key)),
        Target::External(name) => format!("__bale__.external({})", quote(name)),
        Target::Missing(specifier) => format!("__bale__.missing({})", quote(specifier)),
    }
}

/// `a, b as c` → `[(a, a), (b, c)]`
fn specifier_pairs(list: &str) -> Vec<(String, String)> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| match item.split_once(" as ") {
            Some((left, right)) => (left.trim().to_string(), right.trim().to_string()),
            None => (item.to_string(), item.to_string()),
        })
        .collect()
}

fn next_temp(temp: &mut usize) -> String {
    let name = format!("__bale_m{temp}");
    *temp += 1;
    name
}

pub(crate) fn quote(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}
