use gogrep::ast::ExprId;
use gogrep::types::{BasicKind, MapImporter, ScopeEntry, Type};
use gogrep::{walk, Error, Matcher, NodeRef};

/// Identifier occurrences under `root`, by name.
fn ident_ids(m: &Matcher, root: NodeRef) -> Vec<(String, ExprId)> {
    let mut out = Vec::new();
    walk::inspect(&m.arena, root, &mut |n| {
        if let NodeRef::Expr(e) = n {
            if let Some(sym) = m.arena.ident_sym(e) {
                out.push((m.interner.resolve(sym).to_string(), e));
            }
        }
    });
    out
}

fn texts(m: &Matcher, src: &str, ms: &[gogrep::Match]) -> Vec<String> {
    ms.iter()
        .map(|mt| m.span_text(src, mt.node).to_string())
        .collect()
}

#[test]
fn identical_type_constraint() {
    let mut m = Matcher::new();
    let pipe = m.compile(&[("x", "$x(type=int)")]).unwrap();
    let src = "a + b";
    let root = m.parse_pattern(src).unwrap();

    let int = m.store.basic(BasicKind::Int);
    let string = m.store.basic(BasicKind::String);
    for (name, id) in ident_ids(&m, root) {
        match name.as_str() {
            "a" => {
                m.info.types.insert(id, int);
            }
            "b" => {
                m.info.types.insert(id, string);
            }
            _ => {}
        }
    }

    let ms = m.run(&pipe, root).unwrap();
    assert_eq!(texts(&m, src, &ms), vec!["a"]);
}

#[test]
fn assignability_sees_through_named_types() {
    let mut m = Matcher::new();
    let src = "a";
    let root = m.parse_pattern(src).unwrap();

    let int = m.store.basic(BasicKind::Int);
    let name = m.sym("Celsius");
    let celsius = m.store.alloc(Type::Named {
        name,
        underlying: int,
    });
    for (_, id) in ident_ids(&m, root) {
        m.info.types.insert(id, celsius);
    }

    let asgn = m.compile(&[("x", "$x(asgn=int)")]).unwrap();
    assert_eq!(m.run(&asgn, root).unwrap().len(), 1);

    let ident = m.compile(&[("x", "$x(type=int)")]).unwrap();
    assert!(m.run(&ident, root).unwrap().is_empty());

    let conv = m.compile(&[("x", "$x(conv=int)")]).unwrap();
    assert_eq!(m.run(&conv, root).unwrap().len(), 1);
}

#[test]
fn underlying_category_constraint() {
    let mut m = Matcher::new();
    let src = "a";
    let root = m.parse_pattern(src).unwrap();

    let int = m.store.basic(BasicKind::Int);
    let slice = m.store.slice_of(int);
    for (_, id) in ident_ids(&m, root) {
        m.info.types.insert(id, slice);
    }

    let yes = m.compile(&[("x", "$x(slice)")]).unwrap();
    assert_eq!(m.run(&yes, root).unwrap().len(), 1);
    let no = m.compile(&[("x", "$x(map)")]).unwrap();
    assert!(m.run(&no, root).unwrap().is_empty());
}

#[test]
fn comparable_and_addressable() {
    let mut m = Matcher::new();
    let pipe = m.compile(&[("x", "$x(comp, addr)")]).unwrap();
    let src = "a + b";
    let root = m.parse_pattern(src).unwrap();

    let int = m.store.basic(BasicKind::Int);
    for (name, id) in ident_ids(&m, root) {
        m.info.types.insert(id, int);
        if name == "a" {
            m.info.addressable.insert(id);
        }
    }

    let ms = m.run(&pipe, root).unwrap();
    assert_eq!(texts(&m, src, &ms), vec!["a"]);
}

#[test]
fn untyped_nodes_fail_typed_constraints() {
    let mut m = Matcher::new();
    let pipe = m.compile(&[("x", "$x(type=int)")]).unwrap();
    let root = m.parse_pattern("a + b").unwrap();
    // No type facts supplied at all: nothing can satisfy the constraint.
    assert!(m.run(&pipe, root).unwrap().is_empty());
}

#[test]
fn package_types_resolve_via_import_fallback() {
    let mut m = Matcher::new();
    m.importer = Box::new(MapImporter);

    let byte = m.store.basic(BasicKind::Uint8);
    let bytes = m.store.slice_of(byte);
    let raw_name = m.sym("RawMessage");
    let raw = m.store.alloc(Type::Named {
        name: raw_name,
        underlying: bytes,
    });
    let universe = m.scopes.universe();
    let pkg_scope = m.scopes.push(universe);
    m.scopes.insert(pkg_scope, raw_name, ScopeEntry::Ty(raw));
    m.scopes.add_package("encoding/json", pkg_scope);

    let src = "a";
    let root = m.parse_pattern(src).unwrap();
    for (_, id) in ident_ids(&m, root) {
        m.info.types.insert(id, raw);
    }

    // `json` is not in scope; the short-name table supplies encoding/json.
    let pipe = m.compile(&[("x", "$x(type=json.RawMessage)")]).unwrap();
    assert_eq!(m.run(&pipe, root).unwrap().len(), 1);
}

#[test]
fn unknown_package_is_a_pipeline_error() {
    let mut m = Matcher::new();
    let pipe = m.compile(&[("x", "$x(type=nosuchpkg.T)")]).unwrap();
    let src = "a";
    let root = m.parse_pattern(src).unwrap();
    let int = m.store.basic(BasicKind::Int);
    for (_, id) in ident_ids(&m, root) {
        m.info.types.insert(id, int);
    }
    match m.run(&pipe, root) {
        Err(Error::UnknownImport { path }) => assert_eq!(path, "nosuchpkg"),
        other => panic!("expected unknown import, got {other:?}"),
    }
}
