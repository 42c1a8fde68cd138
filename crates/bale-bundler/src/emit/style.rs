//! Stylesheet extraction into per-chunk style assets.

use bale_analysis::transform::scan::{Reference, ReferenceForm, style_references};
use bale_graph::{ModuleGraph, ModuleId, OutputKind};
use rustc_hash::FxHashSet;

use crate::chunks::Chunk;

/// Style modules of `chunk`, each placed after the sheets it imports.
///
/// The walk follows static edges inside the chunk in chunk order, so sheets
/// imported by scripts keep their import order too.
pub fn ordered_styles(graph: &ModuleGraph, chunk: &Chunk) -> Vec<ModuleId> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for id in &chunk.modules {
        visit(graph, chunk, id, &mut seen, &mut out);
    }
    out
}

fn visit(
    graph: &ModuleGraph,
    chunk: &Chunk,
    id: &ModuleId,
    seen: &mut FxHashSet<ModuleId>,
    out: &mut Vec<ModuleId>,
) {
    if !seen.insert(id.clone()) {
        return;
    }
    for dep in graph.static_dependencies(id) {
        if chunk.contains(&dep) {
            visit(graph, chunk, &dep, seen, out);
        }
    }
    if graph
        .module(id)
        .is_some_and(|m| m.output_kind == OutputKind::Style)
    {
        out.push(id.clone());
    }
}

/// Drop `@import` rules and point `url()` references at emitted assets.
///
/// References `url_for` cannot place are left as written. Removed rules keep
/// their newlines.
pub fn rewrite(css: &str, mut url_for: impl FnMut(&Reference) -> Option<String>) -> String {
    let mut out = String::with_capacity(css.len());
    let mut cursor = 0;
    for reference in style_references(css) {
        match reference.form {
            ReferenceForm::StyleImport => {
                let range = reference.statement.clone();
                if range.start < cursor {
                    continue;
                }
                out.push_str(&css[cursor..range.start]);
                let newlines = css[range.clone()].matches('\n').count();
                out.extend(std::iter::repeat_n('\n', newlines));
                cursor = range.end;
            }
            ReferenceForm::Url => {
                let Some(url) = url_for(&reference) else {
                    continue;
                };
                if reference.span.start < cursor {
                    continue;
                }
                out.push_str(&css[cursor..reference.span.start]);
                out.push_str(&url);
                cursor = reference.span.end;
            }
            _ => {}
        }
    }
    out.push_str(&css[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::{ChunkKind, split};
    use bale_config::SplitStrategy;
    use bale_graph::{DependencyEdge, EdgeKind, Module};

    #[test]
    fn imports_are_removed_and_urls_replaced() {
        let css = "@import './base.css';\n.icon { background: url(./a.png); }\n";
        let out = rewrite(css, |r| {
            (r.form == ReferenceForm::Url).then(|| "/static/images/abc.png".to_string())
        });
        assert_eq!(out, "\n.icon { background: url(/static/images/abc.png); }\n");
    }

    #[test]
    fn unknown_urls_are_kept() {
        let css = "a { background: url('x.png') }";
        assert_eq!(rewrite(css, |_| None), css);
    }

    #[test]
    fn imported_sheets_come_first() {
        let graph = ModuleGraph::new();
        let main = ModuleId::new("/app/src/main.js");
        let app = ModuleId::new("/app/src/app.css");
        let base = ModuleId::new("/app/src/base.css");
        graph
            .add_module(Module::builder(main.clone(), OutputKind::Script).entry(true).build())
            .unwrap();
        graph
            .add_module(Module::builder(app.clone(), OutputKind::Style).build())
            .unwrap();
        graph
            .add_module(Module::builder(base.clone(), OutputKind::Style).build())
            .unwrap();
        graph
            .add_edge(DependencyEdge::new(main.clone(), "./app.css", app.clone(), EdgeKind::Static))
            .unwrap();
        graph
            .add_edge(DependencyEdge::new(app.clone(), "./base.css", base.clone(), EdgeKind::Static))
            .unwrap();

        let chunks = split(&graph, &[main.clone()], SplitStrategy::Duplicate);
        let chunk = chunks.by_root(&main).unwrap();
        assert_eq!(chunk.kind, ChunkKind::Entry);
        assert_eq!(ordered_styles(&graph, chunk), vec![base, app]);
    }
}
