//! Traversal over the arena tree.
//!
//! Three layers:
//!
//! - [`children`]: direct children of a node in syntactic order. Elements of
//!   embedded lists are reported individually; their parent is the node, not
//!   the list.
//! - [`inspect`]: pre-order walk built on `children`.
//! - [`collect_candidates`]: the walk the command interpreter drives. Every
//!   node is a candidate, and so is every embedded list position, so a
//!   variadic wildcard can bind whole sequences. The walker also tracks the
//!   lexical scope entered so far; each candidate carries the scope a
//!   top-level unification should start from.

use smallvec::SmallVec;

use crate::ast::*;
use crate::types::ScopeKey;

pub type ChildVec = SmallVec<[NodeRef; 8]>;

/// Appends the direct children of `n` to `out`, in syntactic order.
pub fn children(a: &AstArena, n: NodeRef, out: &mut ChildVec) {
    let mut expr = |id: ExprId| out.push(NodeRef::Expr(id));
    match n {
        NodeRef::Expr(id) => match a.exprs[id] {
            Expr::Ident(_) | Expr::BasicLit { .. } => {}
            Expr::FuncLit { typ, body } => {
                out.push(NodeRef::Expr(typ));
                out.push(NodeRef::Stmt(body));
            }
            Expr::CompositeLit { typ, elts } => {
                if let Some(t) = typ {
                    expr(t);
                }
                out.extend(a.exprs_list(elts).iter().map(|&e| NodeRef::Expr(e)));
            }
            Expr::Paren { x } => expr(x),
            Expr::Selector { x, sel } => {
                expr(x);
                expr(sel);
            }
            Expr::Index { x, index } => {
                expr(x);
                expr(index);
            }
            Expr::Slice { x, low, high, max } => {
                expr(x);
                for part in [low, high, max].into_iter().flatten() {
                    out.push(NodeRef::Expr(part));
                }
            }
            Expr::TypeAssert { x, typ } => {
                expr(x);
                if let Some(t) = typ {
                    out.push(NodeRef::Expr(t));
                }
            }
            Expr::Call { fun, args, .. } => {
                expr(fun);
                out.extend(a.exprs_list(args).iter().map(|&e| NodeRef::Expr(e)));
            }
            Expr::Star { x } => expr(x),
            Expr::Unary { x, .. } => expr(x),
            Expr::Binary { x, y, .. } => {
                expr(x);
                expr(y);
            }
            Expr::KeyValue { key, value } => {
                expr(key);
                expr(value);
            }
            Expr::Ellipsis { elt } => {
                if let Some(e) = elt {
                    out.push(NodeRef::Expr(e));
                }
            }
            Expr::ArrayType { len, elt } => {
                if let Some(l) = len {
                    expr(l);
                }
                expr(elt);
            }
            Expr::StructType { fields } => {
                out.extend(a.fields_list(fields).iter().map(|&f| NodeRef::Field(f)));
            }
            Expr::FuncType { params, results } => {
                out.extend(a.fields_list(params).iter().map(|&f| NodeRef::Field(f)));
                if let Some(res) = results {
                    out.extend(a.fields_list(res).iter().map(|&f| NodeRef::Field(f)));
                }
            }
            Expr::InterfaceType { methods } => {
                out.extend(a.fields_list(methods).iter().map(|&f| NodeRef::Field(f)));
            }
            Expr::MapType { key, value } => {
                expr(key);
                expr(value);
            }
            Expr::ChanType { value, .. } => expr(value),
        },

        NodeRef::Stmt(id) => match a.stmts[id] {
            Stmt::Empty => {}
            Stmt::Decl(d) => out.push(NodeRef::Decl(d)),
            Stmt::Labeled { label, stmt } => {
                out.push(NodeRef::Expr(label));
                out.push(NodeRef::Stmt(stmt));
            }
            Stmt::Expr(e) => out.push(NodeRef::Expr(e)),
            Stmt::Send { chan, value } => {
                out.push(NodeRef::Expr(chan));
                out.push(NodeRef::Expr(value));
            }
            Stmt::IncDec { x, .. } => out.push(NodeRef::Expr(x)),
            Stmt::Assign { lhs, rhs, .. } => {
                out.extend(a.exprs_list(lhs).iter().map(|&e| NodeRef::Expr(e)));
                out.extend(a.exprs_list(rhs).iter().map(|&e| NodeRef::Expr(e)));
            }
            Stmt::Go { call } | Stmt::Defer { call } => out.push(NodeRef::Expr(call)),
            Stmt::Return { results } => {
                out.extend(a.exprs_list(results).iter().map(|&e| NodeRef::Expr(e)));
            }
            Stmt::Branch { label, .. } => {
                if let Some(l) = label {
                    out.push(NodeRef::Expr(l));
                }
            }
            Stmt::Block { stmts } => {
                out.extend(a.stmts_list(stmts).iter().map(|&s| NodeRef::Stmt(s)));
            }
            Stmt::If {
                init,
                cond,
                body,
                els,
            } => {
                if let Some(i) = init {
                    out.push(NodeRef::Stmt(i));
                }
                out.push(NodeRef::Expr(cond));
                out.push(NodeRef::Stmt(body));
                if let Some(e) = els {
                    out.push(NodeRef::Stmt(e));
                }
            }
            Stmt::Case { list, body } => {
                out.extend(a.exprs_list(list).iter().map(|&e| NodeRef::Expr(e)));
                out.extend(a.stmts_list(body).iter().map(|&s| NodeRef::Stmt(s)));
            }
            Stmt::Switch { init, tag, body } => {
                if let Some(i) = init {
                    out.push(NodeRef::Stmt(i));
                }
                if let Some(t) = tag {
                    out.push(NodeRef::Expr(t));
                }
                out.push(NodeRef::Stmt(body));
            }
            Stmt::TypeSwitch { init, assign, body } => {
                if let Some(i) = init {
                    out.push(NodeRef::Stmt(i));
                }
                out.push(NodeRef::Stmt(assign));
                out.push(NodeRef::Stmt(body));
            }
            Stmt::Comm { comm, body } => {
                if let Some(c) = comm {
                    out.push(NodeRef::Stmt(c));
                }
                out.extend(a.stmts_list(body).iter().map(|&s| NodeRef::Stmt(s)));
            }
            Stmt::Select { body } => out.push(NodeRef::Stmt(body)),
            Stmt::For {
                init,
                cond,
                post,
                body,
            } => {
                if let Some(i) = init {
                    out.push(NodeRef::Stmt(i));
                }
                if let Some(c) = cond {
                    out.push(NodeRef::Expr(c));
                }
                if let Some(p) = post {
                    out.push(NodeRef::Stmt(p));
                }
                out.push(NodeRef::Stmt(body));
            }
            Stmt::Range {
                key,
                value,
                x,
                body,
                ..
            } => {
                if let Some(k) = key {
                    out.push(NodeRef::Expr(k));
                }
                if let Some(v) = value {
                    out.push(NodeRef::Expr(v));
                }
                out.push(NodeRef::Expr(x));
                out.push(NodeRef::Stmt(body));
            }
        },

        NodeRef::Decl(id) => match a.decls[id] {
            Decl::Gen { specs, .. } => {
                out.extend(a.specs_list(specs).iter().map(|&s| NodeRef::Spec(s)));
            }
            Decl::Func {
                recv,
                name,
                typ,
                body,
            } => {
                if let Some(r) = recv {
                    out.extend(a.fields_list(r).iter().map(|&f| NodeRef::Field(f)));
                }
                out.push(NodeRef::Expr(name));
                out.push(NodeRef::Expr(typ));
                if let Some(b) = body {
                    out.push(NodeRef::Stmt(b));
                }
            }
        },

        NodeRef::Spec(id) => match a.specs[id] {
            Spec::Import { name, path } => {
                if let Some(n) = name {
                    out.push(NodeRef::Expr(n));
                }
                out.push(NodeRef::Expr(path));
            }
            Spec::Value { names, typ, values } => {
                out.extend(a.idents_list(names).iter().map(|&i| NodeRef::Expr(i.0)));
                if let Some(t) = typ {
                    out.push(NodeRef::Expr(t));
                }
                out.extend(a.exprs_list(values).iter().map(|&e| NodeRef::Expr(e)));
            }
            Spec::Type { name, typ, .. } => {
                out.push(NodeRef::Expr(name));
                out.push(NodeRef::Expr(typ));
            }
        },

        NodeRef::Field(id) => {
            let f = a.fields[id];
            out.extend(a.idents_list(f.names).iter().map(|&i| NodeRef::Expr(i.0)));
            out.push(NodeRef::Expr(f.typ));
        }

        NodeRef::File(id) => {
            let f = a.files[id];
            out.push(NodeRef::Expr(f.name));
            out.extend(a.decls_list(f.decls).iter().map(|&d| NodeRef::Decl(d)));
        }

        NodeRef::ExprList(r) => {
            out.extend(a.exprs_list(r).iter().map(|&e| NodeRef::Expr(e)));
        }
        NodeRef::IdentList(r) => {
            out.extend(a.idents_list(r).iter().map(|&i| NodeRef::Expr(i.0)));
        }
        NodeRef::StmtList(r) => {
            out.extend(a.stmts_list(r).iter().map(|&s| NodeRef::Stmt(s)));
        }
        NodeRef::SpecList(r) => {
            out.extend(a.specs_list(r).iter().map(|&s| NodeRef::Spec(s)));
        }
    }
}

/// Pre-order walk: `f(n)`, then recurse into children.
pub fn inspect(a: &AstArena, n: NodeRef, f: &mut impl FnMut(NodeRef)) {
    f(n);
    let mut kids = ChildVec::new();
    children(a, n, &mut kids);
    for child in kids {
        inspect(a, child, f);
    }
}

/// Non-empty embedded list positions of `n`, as bindable list handles.
///
/// These are the positions where a variadic wildcard may capture an entire
/// sibling run: composite-literal elements, call arguments, assignment
/// sides, return values, value-spec initializers, block statements, and
/// case/comm clause lists and bodies.
pub fn node_lists(a: &AstArena, n: NodeRef) -> SmallVec<[NodeRef; 2]> {
    let mut out = SmallVec::new();
    let add_exprs = |r: ListRef<ExprId>, out: &mut SmallVec<[NodeRef; 2]>| {
        if !r.is_empty() {
            out.push(NodeRef::ExprList(r));
        }
    };
    let add_stmts = |r: ListRef<StmtId>, out: &mut SmallVec<[NodeRef; 2]>| {
        if !r.is_empty() {
            out.push(NodeRef::StmtList(r));
        }
    };
    match n {
        NodeRef::Expr(id) => match a.exprs[id] {
            Expr::CompositeLit { elts, .. } => add_exprs(elts, &mut out),
            Expr::Call { args, .. } => add_exprs(args, &mut out),
            _ => {}
        },
        NodeRef::Stmt(id) => match a.stmts[id] {
            Stmt::Assign { lhs, rhs, .. } => {
                add_exprs(lhs, &mut out);
                add_exprs(rhs, &mut out);
            }
            Stmt::Return { results } => add_exprs(results, &mut out),
            Stmt::Block { stmts } => add_stmts(stmts, &mut out),
            Stmt::Case { list, body } => {
                add_exprs(list, &mut out);
                add_stmts(body, &mut out);
            }
            Stmt::Comm { body, .. } => add_stmts(body, &mut out),
            _ => {}
        },
        NodeRef::Spec(id) => {
            if let Spec::Value { values, .. } = a.specs[id] {
                add_exprs(values, &mut out);
            }
        }
        _ => {}
    }
    out
}

/// A visit position produced by [`collect_candidates`]: the candidate node
/// and the lexical scope in force there.
pub type Candidate = (NodeRef, ScopeKey);

/// Collects every candidate position under `root` in walk order: each node,
/// followed by its embedded list positions, followed by its children.
///
/// `scope_of` reports the scope attached to a scope-introducing node; the
/// walker switches to it for the node itself and everything below.
pub fn collect_candidates(
    a: &AstArena,
    root: NodeRef,
    base: ScopeKey,
    scope_of: &impl Fn(NodeKey) -> Option<ScopeKey>,
    out: &mut Vec<Candidate>,
) {
    let scope = root
        .key(a)
        .and_then(scope_of)
        .unwrap_or(base);
    out.push((root, scope));
    for list in node_lists(a, root) {
        out.push((list, scope));
    }
    let mut kids = ChildVec::new();
    children(a, root, &mut kids);
    for child in kids {
        collect_candidates(a, child, scope, scope_of, out);
    }
}
