//! End-to-end behaviour of the library: packages are built, loaded in dependency order
//! and queried through the registry.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use source_graph::{
    Declaration, DeclarationKind, FlattenedSourceGraph, GeneratedModule, GraphBuilder,
    GraphError, Object, PackageModule, Registry, SerializedGraph, SourceLinks,
};

const MARKER: &str = "core/Loadable";

fn build(package: &str, deps: &[&SerializedGraph], decls: Vec<Declaration>) -> SerializedGraph {
    let mut builder = GraphBuilder::new(package, MARKER);
    for dep in deps {
        builder.dependency(dep);
    }
    for decl in decls {
        builder.declare(decl);
    }
    let out = builder.build();
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    out.graph
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

struct WithA {
    a: i64,
}

#[test]
fn loadable_class_resolves_its_singleton() {
    let graph = build(
        "pkg",
        &[],
        vec![
            Declaration::interface("pkg/I")
                .extends(MARKER)
                .property("a", "number"),
            Declaration::class("pkg/C").implements("pkg/I"),
        ],
    );
    let registry = Registry::new();
    registry.merge(
        &graph,
        SourceLinks::new().factory("pkg/C", || Arc::new(WithA { a: 1 }) as Object),
    );

    let flat = registry.flattened();
    assert!(flat.classes["pkg/C"].direct_parents.contains_key("pkg/I"));
    assert_eq!(registry.object_as::<WithA>("pkg/C").unwrap().a, 1);

    let info = registry.interface("pkg/I").unwrap();
    assert_eq!(info.property("a").map(|p| p.type_name.as_str()), Some("number"));
}

#[test]
fn declarations_without_marker_ancestry_are_never_tracked() {
    let graph = build(
        "pkg",
        &[],
        vec![
            Declaration::interface("pkg/Plain"),
            Declaration::class("pkg/C")
                .implements("pkg/Plain")
                .implements(MARKER),
        ],
    );
    let registry = Registry::new();
    registry.merge(&graph, SourceLinks::new());

    let flat = registry.flattened();
    for kind in DeclarationKind::ALL {
        assert!(!flat.of_kind(kind).contains_key("pkg/Plain"));
    }
    assert!(!flat.classes["pkg/C"].all_parents.contains_key("pkg/Plain"));
    assert!(matches!(
        registry.object("pkg/Plain"),
        Err(GraphError::NotFound(_))
    ));
    assert!(matches!(
        registry.interface("pkg/Plain"),
        Err(GraphError::NotFound(_))
    ));
}

#[derive(Default)]
struct Ac;

#[test]
fn declaration_rejected_by_a_dependency_is_unknown_to_dependents() {
    let mut b = GraphBuilder::new("b", MARKER);
    b.declare(Declaration::interface("b/FI").extends(MARKER))
        .declare(Declaration::interface("b/Plain"));
    let b_graph = b.build().graph;

    let mut a = GraphBuilder::new("a", MARKER);
    a.dependency(&b_graph).declare(
        Declaration::class("a/AC")
            .implements("b/FI")
            .implements("b/Plain"),
    );
    let a_out = a.build();
    assert!(a_out.diagnostics.is_empty());
    assert!(a_out.excluded.is_empty());

    let registry = Registry::new();
    registry.merge(&b_graph, SourceLinks::new());
    registry.merge(&a_out.graph, SourceLinks::new().class::<Ac>("a/AC"));

    let direct: Vec<_> = registry
        .direct_parents("a/AC")
        .unwrap()
        .into_iter()
        .map(|n| n.qualified_name)
        .collect();
    assert_eq!(direct, vec!["b/FI".to_owned()]);
    let roots: Vec<_> = registry
        .root_parents("a/AC")
        .unwrap()
        .into_iter()
        .map(|n| n.qualified_name)
        .collect();
    assert_eq!(roots, vec![MARKER.to_owned()]);

    assert!(registry.flattened().get("b/Plain").is_none());
    assert!(matches!(registry.object("b/Plain"), Err(GraphError::NotFound(_))));
    assert!(matches!(registry.interface("b/Plain"), Err(GraphError::NotFound(_))));
    assert!(matches!(
        registry.base_children("b/Plain"),
        Err(GraphError::NotFound(_))
    ));
}


static B_MODULE: GeneratedModule = GeneratedModule::new(
    "B",
    r#"{
        "options": {"directed": true, "multigraph": false, "compound": false},
        "nodes": [
            {"v": "core/Loadable"},
            {"v": "B/FI", "value": {
                "packageName": "B", "name": "FI", "qualifiedName": "B/FI",
                "sourceType": "interface", "isExported": true,
                "directParentInterfaces": [{"qualifiedName": "core/Loadable"}]}}
        ],
        "edges": [{"v": "B/FI", "w": "core/Loadable", "value": "extends interface"}]
    }"#,
    &[],
    SourceLinks::new,
);

fn a_links() -> SourceLinks {
    SourceLinks::new().class::<Ac>("A/AC")
}

static A_MODULE: GeneratedModule = GeneratedModule::new(
    "A",
    r#"{
        "nodes": [
            {"v": "A/AC", "value": {
                "packageName": "A", "name": "AC", "qualifiedName": "A/AC",
                "sourceType": "class", "isExported": true,
                "directParentInterfaces": [{"qualifiedName": "B/FI"}]}},
            {"v": "B/FI"}
        ],
        "edges": [{"v": "A/AC", "w": "B/FI", "value": "implements interface"}]
    }"#,
    &[&B_MODULE],
    a_links,
);

#[test]
fn cross_package_parents_and_base_children() {
    let registry = Registry::new();
    registry.load(&A_MODULE).unwrap();
    assert!(registry.is_loaded("A"));
    assert!(registry.is_loaded("B"));

    let flat = registry.flattened();
    assert!(flat.classes["A/AC"].direct_parents.contains_key("B/FI"));
    assert!(flat.interfaces["B/FI"].base_children.contains_key("A/AC"));
    assert!(flat.opaque.contains_key(MARKER));

    let found = registry.objects("B/FI").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].qualified_name, "A/AC");
    assert!(found[0].value.downcast_ref::<Ac>().is_some());
}

#[test]
fn dependent_merged_first_is_upgraded_by_its_dependency() {
    let registry = Registry::new();
    registry.merge(&A_MODULE.source_graph().unwrap(), a_links());
    assert!(registry.flattened().opaque.contains_key("B/FI"));
    assert!(matches!(
        registry.interface("B/FI"),
        Err(GraphError::Opaque(_))
    ));

    let before = registry.generation();
    let report = registry.merge(&B_MODULE.source_graph().unwrap(), SourceLinks::new());
    assert_eq!(report.stubs_upgraded, 1);
    assert!(registry.generation() > before);

    let flat = registry.flattened();
    assert!(flat.interfaces.contains_key("B/FI"));
    assert!(flat.interfaces["B/FI"].base_children.contains_key("A/AC"));
    assert!(flat.classes["A/AC"].root_parents.contains_key(MARKER));
}

#[test]
fn generic_binding_is_recorded_per_parent() {
    let graph = build(
        "pkg",
        &[],
        vec![
            Declaration::interface("pkg/I").extends(MARKER),
            Declaration::interface("pkg/IWithArgs")
                .type_parameter("T")
                .extends(MARKER),
            Declaration::class("pkg/C2").implements_with("pkg/IWithArgs", ["pkg/I"]),
        ],
    );
    let registry = Registry::new();
    registry.merge(&graph, SourceLinks::new());

    let flat = registry.flattened();
    let bound = &flat.classes["pkg/C2"].type_parameters["pkg/IWithArgs"];
    assert_eq!(bound[0].qualified_name, "pkg/I");
    assert_eq!(bound[0].kind, Some(DeclarationKind::Interface));
    assert_eq!(
        registry.interface("pkg/IWithArgs").unwrap().type_parameters,
        vec!["T".to_owned()]
    );
}

trait Service: Send + Sync {
    fn id(&self) -> &'static str;
}

#[derive(Default)]
struct Mail;
#[derive(Default)]
struct Sms;
#[derive(Default)]
struct Push;

impl Service for Mail {
    fn id(&self) -> &'static str {
        "mail"
    }
}
impl Service for Sms {
    fn id(&self) -> &'static str {
        "sms"
    }
}
impl Service for Push {
    fn id(&self) -> &'static str {
        "push"
    }
}

fn service(value: impl Service + 'static) -> Object {
    Arc::new(Box::new(value) as Box<dyn Service>)
}

#[test]
fn objects_enumerates_leaf_implementations_across_packages() {
    let base = build(
        "pkg",
        &[],
        vec![Declaration::interface("pkg/Service").extends(MARKER)],
    );
    let p1 = build(
        "p1",
        &[&base],
        vec![Declaration::class("p1/Mail").implements("pkg/Service")],
    );
    let p2 = build(
        "p2",
        &[&base],
        vec![Declaration::class("p2/Sms").implements("pkg/Service")],
    );
    let p3 = build(
        "p3",
        &[&base],
        vec![
            Declaration::class("p3/Base")
                .implements("pkg/Service")
                .abstract_class(),
            Declaration::class("p3/Push").extends("p3/Base"),
        ],
    );

    let registry = Registry::new();
    registry.merge(&base, SourceLinks::new());
    registry.merge(&p1, SourceLinks::new().factory("p1/Mail", || service(Mail)));
    registry.merge(&p2, SourceLinks::new().factory("p2/Sms", || service(Sms)));
    registry.merge(&p3, SourceLinks::new().factory("p3/Push", || service(Push)));

    let found = registry.objects("pkg/Service").unwrap();
    let names: Vec<&str> = found.iter().map(|r| r.qualified_name.as_str()).collect();
    assert_eq!(names, vec!["p1/Mail", "p2/Sms", "p3/Push"]);

    let ids: Vec<&str> = registry
        .objects_of::<Box<dyn Service>>("pkg/Service")
        .unwrap()
        .iter()
        .map(|s| s.id())
        .collect();
    assert_eq!(ids, vec!["mail", "sms", "push"]);

    let again = registry.objects("pkg/Service").unwrap();
    for (first, second) in found.iter().zip(&again) {
        assert!(Arc::ptr_eq(&first.value, &second.value));
    }
}

// ---------------------------------------------------------------------------
// Loading order
// ---------------------------------------------------------------------------

struct CountingModule<'a> {
    name: &'static str,
    graph: SerializedGraph,
    deps: Vec<&'a CountingModule<'a>>,
    loads: AtomicUsize,
    order: &'a Mutex<Vec<&'static str>>,
}

impl<'a> CountingModule<'a> {
    fn new(
        name: &'static str,
        graph: SerializedGraph,
        deps: Vec<&'a CountingModule<'a>>,
        order: &'a Mutex<Vec<&'static str>>,
    ) -> Self {
        Self {
            name,
            graph,
            deps,
            loads: AtomicUsize::new(0),
            order,
        }
    }
}

impl PackageModule for CountingModule<'_> {
    fn package_name(&self) -> &str {
        self.name
    }

    fn dependencies(&self) -> Vec<&dyn PackageModule> {
        self.deps.iter().map(|d| *d as &dyn PackageModule).collect()
    }

    fn source_graph(&self) -> source_graph::Result<SerializedGraph> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.order.lock().unwrap().push(self.name);
        Ok(self.graph.clone())
    }
}

#[test]
fn diamond_dependencies_load_once_in_order() {
    let order = Mutex::new(Vec::new());
    let core_graph = build(
        "core",
        &[],
        vec![Declaration::interface(MARKER)],
    );
    let left_graph = build(
        "left",
        &[&core_graph],
        vec![Declaration::interface("left/L").extends(MARKER)],
    );
    let right_graph = build(
        "right",
        &[&core_graph],
        vec![Declaration::interface("right/R").extends(MARKER)],
    );
    let app_graph = build(
        "app",
        &[&left_graph, &right_graph],
        vec![
            Declaration::class("app/Both")
                .implements("left/L")
                .implements("right/R"),
        ],
    );

    let core = CountingModule::new("core", core_graph, vec![], &order);
    let left = CountingModule::new("left", left_graph, vec![&core], &order);
    let right = CountingModule::new("right", right_graph, vec![&core], &order);
    let app = CountingModule::new("app", app_graph, vec![&left, &right], &order);

    let registry = Registry::new();
    registry.load(&app).unwrap();
    registry.load(&app).unwrap();

    assert_eq!(core.loads.load(Ordering::SeqCst), 1);
    assert_eq!(app.loads.load(Ordering::SeqCst), 1);
    assert_eq!(*order.lock().unwrap(), vec!["core", "left", "right", "app"]);

    let flat = registry.flattened();
    assert!(flat.opaque.is_empty());
    let roots: Vec<&String> = flat.classes["app/Both"].root_parents.keys().collect();
    assert_eq!(roots, vec![MARKER]);
}

// ---------------------------------------------------------------------------
// Closure properties
// ---------------------------------------------------------------------------

fn layered() -> Arc<FlattenedSourceGraph> {
    let graph = build(
        "pkg",
        &[],
        vec![
            Declaration::interface("pkg/Top").extends(MARKER),
            Declaration::interface("pkg/Mid").extends("pkg/Top"),
            Declaration::interface("pkg/Side").extends(MARKER),
            Declaration::class("pkg/Base")
                .implements("pkg/Mid")
                .implements("pkg/Side")
                .abstract_class(),
            Declaration::class("pkg/Leaf").extends("pkg/Base"),
            Declaration::class("pkg/Other").implements("pkg/Top"),
            Declaration::type_alias("pkg/Alias").extends("pkg/Mid"),
            Declaration::variable("pkg/instance").has_type("pkg/Leaf"),
        ],
    );
    let registry = Registry::new();
    registry.merge(&graph, SourceLinks::new());
    registry.flattened()
}

#[test]
fn every_declaration_is_keyed_by_its_qualified_name() {
    let flat = layered();
    assert_eq!(flat.declared().count(), 8);
    assert_eq!(flat.len(), 9, "the marker is an opaque stub");
    for kind in DeclarationKind::ALL {
        for (key, node) in flat.of_kind(kind) {
            assert_eq!(key, &node.qualified_name);
            assert_eq!(node.kind(), Some(kind));
        }
    }
}

#[test]
fn no_node_is_its_own_relative() {
    let flat = layered();
    for node in flat.declared().chain(flat.opaque.values()) {
        assert!(!node.all_parents.contains_key(&node.qualified_name));
        assert!(!node.all_children.contains_key(&node.qualified_name));
    }
}

#[test]
fn all_parents_is_the_union_over_direct_parents() {
    let flat = layered();
    for node in flat.declared() {
        let mut expected: Vec<String> = node.direct_parents.keys().cloned().collect();
        for parent in node.direct_parents.keys() {
            expected.extend(flat.get(parent).unwrap().all_parents.keys().cloned());
        }
        expected.sort();
        expected.dedup();
        let actual: Vec<String> = node.all_parents.keys().cloned().collect();
        assert_eq!(actual, expected, "closure of {}", node.qualified_name);
    }

    let leaf = &flat.classes["pkg/Leaf"];
    let parents: Vec<&str> = leaf.all_parents.keys().map(String::as_str).collect();
    assert_eq!(
        parents,
        vec![MARKER, "pkg/Base", "pkg/Mid", "pkg/Side", "pkg/Top"]
    );
}

#[test]
fn roots_and_bases_are_extremal_subsets() {
    let flat = layered();
    for node in flat.declared().chain(flat.opaque.values()) {
        for root in node.root_parents.keys() {
            assert!(node.all_parents.contains_key(root));
            assert!(flat.get(root).unwrap().direct_parents.is_empty());
        }
        for base in node.base_children.keys() {
            assert!(node.all_children.contains_key(base));
            assert!(flat.get(base).unwrap().direct_children.is_empty());
        }
    }

    let top = &flat.interfaces["pkg/Top"];
    let bases: Vec<&str> = top.base_children.keys().map(String::as_str).collect();
    assert_eq!(bases, vec!["pkg/Alias", "pkg/Other", "pkg/instance"]);
}

#[test]
fn leaf_and_root_queries_return_empty_sets() {
    let graph = build(
        "pkg",
        &[],
        vec![Declaration::class("pkg/Solo").implements(MARKER)],
    );
    let registry = Registry::new();
    registry.merge(&graph, SourceLinks::new());

    assert!(registry.direct_children("pkg/Solo").unwrap().is_empty());
    assert!(registry.base_children("pkg/Solo").unwrap().is_empty());
    assert!(registry.all_parents(MARKER).unwrap().is_empty());
    assert!(registry.root_parents(MARKER).unwrap().is_empty());
    assert_eq!(registry.root_parents("pkg/Solo").unwrap()[0].qualified_name, MARKER);
}
