use bale_graph::{
    DependencyEdge, EdgeKind, Error, Module, ModuleGraph, ModuleId, OutputKind,
};

fn id(name: &str) -> ModuleId {
    ModuleId::new(format!("/app/src/{name}.js"))
}

fn add(graph: &ModuleGraph, name: &str, entry: bool) -> ModuleId {
    let module_id = id(name);
    graph
        .add_module(
            Module::builder(module_id.clone(), OutputKind::Script)
                .source(name.as_bytes())
                .entry(entry)
                .build(),
        )
        .expect("add module");
    module_id
}

fn link(graph: &ModuleGraph, from: &ModuleId, to: &ModuleId, kind: EdgeKind) {
    graph
        .add_edge(DependencyEdge::new(
            from.clone(),
            format!("./{}", to.name()),
            to.clone(),
            kind,
        ))
        .expect("add edge");
}

#[test]
fn preserves_discovery_order() {
    let graph = ModuleGraph::new();
    let main = add(&graph, "main", true);
    let count = add(&graph, "count", false);
    let sum = add(&graph, "sum", false);

    assert_eq!(graph.module_ids(), vec![main.clone(), count, sum]);
    assert_eq!(graph.entry_points(), vec![main]);
}

#[test]
fn duplicate_module_is_rejected() {
    let graph = ModuleGraph::new();
    add(&graph, "main", true);
    let err = graph
        .add_module(Module::builder(id("main"), OutputKind::Script).build())
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateModule(_)));
}

#[test]
fn edge_requires_both_endpoints() {
    let graph = ModuleGraph::new();
    let main = add(&graph, "main", true);
    let err = graph
        .add_edge(DependencyEdge::new(main, "./ghost", id("ghost"), EdgeKind::Static))
        .unwrap_err();
    assert!(matches!(err, Error::MissingModule(_)));
}

#[test]
fn cycles_are_allowed() {
    let graph = ModuleGraph::new();
    let a = add(&graph, "a", true);
    let b = add(&graph, "b", false);
    link(&graph, &a, &b, EdgeKind::Static);
    link(&graph, &b, &a, EdgeKind::Static);

    assert_eq!(graph.static_closure(&a), vec![a.clone(), b.clone()]);
    assert_eq!(graph.transitive_dependents(&[a.clone()]), vec![a, b]);
}

#[test]
fn static_closure_stops_at_dynamic_edges() {
    let graph = ModuleGraph::new();
    let main = add(&graph, "main", true);
    let count = add(&graph, "count", false);
    let math = add(&graph, "math", false);
    let helper = add(&graph, "helper", false);
    link(&graph, &main, &count, EdgeKind::Static);
    link(&graph, &main, &math, EdgeKind::Dynamic);
    link(&graph, &math, &helper, EdgeKind::Static);

    assert_eq!(graph.static_closure(&main), vec![main.clone(), count]);
    assert_eq!(graph.static_closure(&math), vec![math.clone(), helper]);
    assert_eq!(graph.dynamic_roots(&[main]), vec![math]);
}

#[test]
fn dynamic_roots_ignore_unreachable_importers() {
    let graph = ModuleGraph::new();
    let main = add(&graph, "main", true);
    let page = add(&graph, "page", false);
    let stray = add(&graph, "stray", false);
    let lazy = add(&graph, "lazy", false);
    let deeper = add(&graph, "deeper", false);
    link(&graph, &main, &page, EdgeKind::Dynamic);
    link(&graph, &page, &deeper, EdgeKind::Dynamic);
    link(&graph, &stray, &lazy, EdgeKind::Dynamic);

    assert_eq!(graph.dynamic_roots(&[main.clone()]), vec![page, deeper]);
    assert!(graph.dynamic_roots(&[]).is_empty());
    assert!(graph.dynamic_roots(&[main.clone()]).iter().all(|id| *id != main));
}

#[test]
fn transitive_dependents_walks_upward() {
    let graph = ModuleGraph::new();
    let a = add(&graph, "a", true);
    let b = add(&graph, "b", false);
    let c = add(&graph, "c", false);
    link(&graph, &a, &b, EdgeKind::Static);
    link(&graph, &b, &c, EdgeKind::Dynamic);

    assert_eq!(graph.transitive_dependents(&[c.clone()]), vec![a.clone(), b.clone()]);
    assert_eq!(graph.dependents(&c), vec![b]);
    assert!(graph.transitive_dependents(&[a]).is_empty());
}

#[test]
fn identical_edges_are_deduplicated() {
    let graph = ModuleGraph::new();
    let a = add(&graph, "a", true);
    let b = add(&graph, "b", false);
    link(&graph, &a, &b, EdgeKind::Static);
    link(&graph, &a, &b, EdgeKind::Static);
    assert_eq!(graph.edges().len(), 1);
}

#[test]
fn externals_are_recorded_once_per_importer() {
    let graph = ModuleGraph::new();
    let a = add(&graph, "a", true);
    graph.add_external("jquery", a.clone());
    graph.add_external("jquery", a.clone());
    assert_eq!(graph.externals(), vec![("jquery".to_string(), vec![a])]);
}
