//! Library-level scenarios for the connection analysis engine.

use module_graph::analysis::{Analysis, AnalysisOptions};
use module_graph::graph::edge::RelationKind;
use module_graph::loader::namespace::{ClassObject, Namespace, ObjectDescriptor};
use module_graph::loader::{LoadedModule, ModuleInfo, ModuleLoader, PathLoader};
use module_graph::query::InheritanceNode;

fn analyse(src: &str) -> Analysis {
    let loaded = LoadedModule::from_source("scenario", src).expect("fixture parses");
    Analysis::build(loaded, &AnalysisOptions::default())
}

fn class(bases: &[&str]) -> ObjectDescriptor {
    ObjectDescriptor::Class(ClassObject {
        bases: bases.iter().map(|b| b.to_string()).collect(),
        ..Default::default()
    })
}

/// A module known only by its namespace, as a manifest without source would give.
fn without_source(namespace: Namespace) -> Analysis {
    let loaded = LoadedModule {
        info: ModuleInfo {
            identity: "ext".into(),
            ..Default::default()
        },
        namespace,
        source: None,
    };
    Analysis::build(loaded, &AnalysisOptions::default())
}

const BASE_CHILD_HELPER: &str = "\
class Base:
    pass

class Child(Base):
    def __init__(self):
        self.h = Helper()

class Helper:
    pass
";

#[test]
fn base_child_helper_scenario() {
    let analysis = analyse(BASE_CHILD_HELPER);

    let child = analysis.connections_of("Child", false).unwrap();
    assert_eq!(child.uses.len(), 2);
    assert_eq!(child.uses_of(RelationKind::InheritsFrom), &["Base"]);
    assert_eq!(child.uses_of(RelationKind::Instantiates), &["Helper"]);
    assert!(child.used_by.is_empty());

    let base = analysis.connections_of("Base", false).unwrap();
    assert!(base.uses.is_empty());
    assert_eq!(base.used_by.len(), 1);
    assert_eq!(base.used_by[0].label, "Inherited By");
    assert_eq!(base.used_by_of(RelationKind::InheritsFrom), &["Child"]);

    let helper = analysis.connections_of("Helper", false).unwrap();
    assert_eq!(helper.used_by.len(), 1);
    assert_eq!(helper.used_by[0].label, "Instantiated By");
    assert_eq!(helper.used_by_of(RelationKind::Instantiates), &["Child"]);

    let edge = analysis
        .full_export()
        .into_iter()
        .find(|e| e.kind == RelationKind::Instantiates)
        .unwrap();
    assert_eq!(edge.via.as_deref(), Some("Child.__init__"));
    assert_eq!(edge.line, 6);
}

#[test]
fn unresolvable_external_call_yields_no_edges() {
    let src = "import requests\n\ndef fetch(url):\n    return requests.get(url)\n";
    let analysis = analyse(src);
    assert!(analysis.graph().is_empty());
    assert!(analysis.connections_of("fetch", true).unwrap().is_empty());
    assert_eq!(analysis.resolve_stats().foreign, 1);
}

#[test]
fn missing_source_degrades_to_empty_connections() {
    let mut namespace = Namespace::new();
    namespace.insert("Base".into(), class(&[]));
    namespace.insert("Child".into(), class(&["Base"]));
    let analysis = without_source(namespace);

    assert!(!analysis.source_available());
    let child = analysis.connections_of("Child", false).unwrap();
    assert!(child.is_empty());
    assert!(!child.source_available);
    assert!(analysis.imports().is_empty());

    // Inheritance comes from descriptor base lists, so the tree still works.
    let forest = analysis.inheritance_tree(None).unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].name(), "Child");
    assert_eq!(forest[0].children()[0].name(), "Base");
}

#[test]
fn full_export_is_deterministic() {
    let src = "\
class Repo:
    def find(self, key: str) -> 'Item':
        return Item(key)

class Item:
    def save(self, repo: Repo):
        audit(self)

def audit(item: Item):
    pass
";
    let first = analyse(src).full_export();
    let second = analyse(src).full_export();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn queries_do_not_mutate_the_graph() {
    let analysis = analyse(BASE_CHILD_HELPER);
    let before = analysis.connections_of("Child", true).unwrap();
    let export = analysis.full_export();
    let again = analysis.full_export();
    let after = analysis.connections_of("Child", true).unwrap();
    assert_eq!(before, after);
    assert_eq!(export, again);
    assert_eq!(analysis.graph().edge_count(), export.len());
}

#[test]
fn cyclic_inheritance_terminates_with_marker() {
    let mut namespace = Namespace::new();
    namespace.insert("A".into(), class(&["B"]));
    namespace.insert("B".into(), class(&["A"]));
    let analysis = without_source(namespace);

    let forest = analysis.inheritance_tree(Some("A")).unwrap();
    assert_eq!(
        forest,
        vec![InheritanceNode::Class {
            name: "A".into(),
            bases: vec![InheritanceNode::Class {
                name: "B".into(),
                bases: vec![InheritanceNode::Cycle { name: "A".into() }],
            }],
        }]
    );
    assert_eq!(analysis.inheritance_tree(None).unwrap().len(), 1);
}

#[test]
fn connections_are_bidirectionally_consistent() {
    let src = "\
class Base:
    pass

class Mixin:
    pass

class Child(Base, Mixin):
    def make(self) -> Base:
        return build()

def build():
    return Child()
";
    let analysis = analyse(src);
    for edge in analysis.full_export() {
        let from = analysis.connections_of(&edge.from, true).unwrap();
        let to = analysis.connections_of(&edge.to, true).unwrap();
        assert!(
            from.uses_of(edge.kind).contains(&edge.to),
            "{} should use {} via {:?}",
            edge.from,
            edge.to,
            edge.kind
        );
        assert!(
            to.used_by_of(edge.kind).contains(&edge.from),
            "{} should be used by {} via {:?}",
            edge.to,
            edge.from,
            edge.kind
        );
    }
}

#[test]
fn path_loader_resolves_packages() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("app/models")).unwrap();
    std::fs::write(dir.path().join("app/__init__.py"), "").unwrap();
    std::fs::write(
        dir.path().join("app/models/__init__.py"),
        "class Model:\n    pass\n\nclass User(Model):\n    pass\n",
    )
    .unwrap();
    let loader = PathLoader::new(vec![dir.path().to_path_buf()]);
    let loaded = loader.load("app.models").unwrap();
    assert_eq!(loaded.info.identity, "app.models");
    let analysis = Analysis::build(loaded, &AnalysisOptions::default());
    let user = analysis.connections_of("app.models.User", false).unwrap();
    assert_eq!(user.uses_of(RelationKind::InheritsFrom), &["Model"]);
}

#[test]
fn method_connections_follow_via() {
    let analysis = analyse(BASE_CHILD_HELPER);
    let init = analysis.connections_of("Child.__init__", false).unwrap();
    assert_eq!(init.uses_of(RelationKind::Instantiates), &["Helper"]);
    assert!(init.uses_of(RelationKind::InheritsFrom).is_empty());
}

#[test]
fn bare_call_resolves_to_unique_method() {
    let src = "\
class C:
    def tick(self):
        pass

class D:
    def tock(self):
        pass

class E:
    def tock(self):
        pass

def f():
    tick()
    tock()
";
    let analysis = analyse(src);
    let f = analysis.connections_of("f", false).unwrap();
    assert_eq!(f.uses_of(RelationKind::CallsFunction), &["C.tick"]);
    assert_eq!(analysis.resolve_stats().ambiguous, 1);
}

#[test]
fn unicode_identifiers_are_analysed() {
    let src = "\
def f(naïve: int):
    return Café()

class Café:
    pass
";
    let analysis = analyse(src);
    let f = analysis.table().get("f").unwrap();
    assert!(f.degraded.is_none(), "unexpected degradation: {:?}", f.degraded);
    let conns = analysis.connections_of("f", false).unwrap();
    assert_eq!(conns.uses_of(RelationKind::Instantiates), &["Café"]);
}
