//! Structural matching: the unifier, the variadic list matcher, and the
//! command pipeline that drives them.
//!
//! The unifier ([`Matcher::node`]) answers whether a pattern node matches a
//! target node, recording wildcard bindings as it goes. List-shaped children
//! defer to [`Matcher::nodes`], a non-recursive backtracking matcher over two
//! parallel node sequences that understands variadic wildcards. Both share
//! one binding table; the list matcher snapshots and restores it around each
//! backtrack point.
//!
//! The lexical scope in force at the match site is threaded down as an
//! explicit parameter; the candidate walker computes the enclosing scope for
//! each top-level attempt.

use log::{debug, trace};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

use crate::ast::*;
use crate::error::Error;
use crate::types::{
    Importer, NoImporter, Resolver, ScopeKey, Scopes, TypeInfo, TypeStore,
};
use crate::walk::{collect_candidates, Candidate};
use crate::wild::{TypeCheckOp, WildRegistry, BODY_SENTINEL};

/// Wildcard bindings accumulated during one match attempt, keyed by binding
/// name. Within an attempt, every occurrence of a name must unify with the
/// node recorded here.
pub type Bindings = HashMap<Symbol, NodeRef>;

/// Individual matching relaxations. All off by default; the historical
/// "aggressive" behavior is all of them at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lenience {
    /// An absent optional child on either side matches anything, so partial
    /// patterns like `if $_ { $_ }` ignore missing else branches.
    pub nil_matches_any: bool,
    /// A one-spec declaration may match a bare spec, and a one-name value
    /// spec may match any single name/value pair of a wider spec.
    pub spec_elision: bool,
    /// An assignment pattern may match a value spec, pairing left-hand
    /// names with spec names and right-hand values with spec values.
    pub assign_as_spec: bool,
    /// A block pattern may match a bare statement list.
    pub block_as_list: bool,
}

impl Lenience {
    pub fn aggressive() -> Self {
        Self {
            nil_matches_any: true,
            spec_elision: true,
            assign_as_spec: true,
            block_as_list: true,
        }
    }
}

/// One successful match: the node (or list) that matched, the binding table
/// snapshot, and the lexical scope in force there.
#[derive(Debug, Clone)]
pub struct Match {
    pub node: NodeRef,
    pub values: Bindings,
    pub scope: ScopeKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdName {
    /// `x`: emit every sub-node matching the pattern.
    Range,
    /// `g`: keep inputs containing at least one match.
    FilterAny,
    /// `v`: keep inputs containing no match.
    FilterNone,
    /// `s`: replace each match with the pattern instantiation.
    Subst,
}

impl CmdName {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "x" => Self::Range,
            "g" => Self::FilterAny,
            "v" => Self::FilterNone,
            "s" => Self::Subst,
            _ => return None,
        })
    }
}

/// A compiled pattern plus pre-wrapped forms used when the candidate root is
/// itself a list: a bare expression pattern also tries to match as a
/// one-element expression list and as a one-statement list, so `$*a` can
/// capture mixed sibling runs.
#[derive(Debug, Clone, Copy)]
pub struct Pattern {
    pub node: NodeRef,
    pub(crate) as_expr_list: Option<NodeRef>,
    pub(crate) as_stmt_list: Option<NodeRef>,
}

/// One pipeline command; `src` keeps the replacement source for `s`.
#[derive(Debug, Clone)]
pub struct Cmd {
    pub name: CmdName,
    pub pat: Pattern,
    pub src: Option<String>,
}

/// Left-to-right command pipeline; empty means identity.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub cmds: Vec<Cmd>,
}

/// The engine: owns the arena shared by patterns and targets, the wildcard
/// registry, the type world, and all per-run matching state.
pub struct Matcher {
    pub arena: AstArena,
    pub interner: Interner,
    pub wilds: WildRegistry,
    pub store: TypeStore,
    pub scopes: Scopes,
    pub info: TypeInfo,
    pub importer: Box<dyn Importer>,
    pub lenience: Lenience,

    pub(crate) values: Bindings,
    pub(crate) parents: HashMap<NodeKey, NodeRef>,
    pub(crate) underscore: Symbol,
    pub(crate) body_sym: Symbol,
    pub(crate) resolve_err: Option<Error>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher {
    pub fn new() -> Self {
        let arena = AstArena::new();
        let mut interner = Interner::new();
        let mut store = TypeStore::new();
        let scopes = Scopes::new(&mut store, &mut interner);
        let underscore = interner.intern("_");
        let body_sym = interner.intern(BODY_SENTINEL);
        Self {
            arena,
            interner,
            wilds: WildRegistry::new(),
            store,
            scopes,
            info: TypeInfo::default(),
            importer: Box::new(NoImporter),
            lenience: Lenience::default(),
            values: Bindings::new(),
            parents: HashMap::new(),
            underscore,
            body_sym,
            resolve_err: None,
        }
    }

    /// Interns a name, for looking bindings up in a [`Match`].
    pub fn sym(&mut self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    /// Source text covered by a node, given the text it was parsed from.
    pub fn span_text<'a>(&self, src: &'a str, n: NodeRef) -> &'a str {
        let sp = n.span(&self.arena);
        &src[sp.start as usize..sp.end as usize]
    }

    // =========================================================================
    // Command interpreter
    // =========================================================================

    /// Runs a pipeline over `root`, producing the surviving matches in walk
    /// order. Substitution commands rewrite the tree in place.
    pub fn run(&mut self, pipeline: &Pipeline, root: NodeRef) -> Result<Vec<Match>, Error> {
        debug!("running {} command(s)", pipeline.cmds.len());
        self.fill_parents(root);
        let base = self.scope_at(root);
        let mut subs = vec![Match {
            node: root,
            values: Bindings::new(),
            scope: base,
        }];
        for cmd in &pipeline.cmds {
            subs = match cmd.name {
                CmdName::Range => self.cmd_range(&cmd.pat, subs),
                CmdName::FilterAny => self.cmd_filter(true, &cmd.pat, subs),
                CmdName::FilterNone => self.cmd_filter(false, &cmd.pat, subs),
                CmdName::Subst => self.substitute(cmd, subs)?,
            };
            if let Some(e) = self.resolve_err.take() {
                return Err(e);
            }
        }
        Ok(subs)
    }

    fn scope_at(&self, n: NodeRef) -> ScopeKey {
        n.key(&self.arena)
            .and_then(|k| self.info.scopes.get(&k).copied())
            .unwrap_or_else(|| self.scopes.universe())
    }

    /// (pattern, candidate, scope) attempts for one input node, in walk
    /// order. When the input is itself a list and the pattern is a bare
    /// expression, the wrapped list forms are tried against the whole input
    /// first.
    fn attempts(&self, pat: &Pattern, m: &Match) -> Vec<(NodeRef, NodeRef, ScopeKey)> {
        let mut work = Vec::new();
        if m.node.is_list() {
            if let Some(el) = pat.as_expr_list {
                work.push((el, m.node, m.scope));
            }
            if let Some(sl) = pat.as_stmt_list {
                work.push((sl, m.node, m.scope));
            }
        }
        let mut cands: Vec<Candidate> = Vec::new();
        let scope_map = &self.info.scopes;
        collect_candidates(
            &self.arena,
            m.node,
            m.scope,
            &|k| scope_map.get(&k).copied(),
            &mut cands,
        );
        work.extend(cands.into_iter().map(|(n, sc)| (pat.node, n, sc)));
        work
    }

    fn cmd_range(&mut self, pat: &Pattern, subs: Vec<Match>) -> Vec<Match> {
        let mut out = Vec::new();
        let mut seen: HashSet<(u32, u32)> = HashSet::new();
        for m in subs {
            for (p, cand, scope) in self.attempts(pat, &m) {
                self.values = Bindings::new();
                let Some(found) = self.top_node(p, cand, scope) else {
                    continue;
                };
                let sp = found.span(&self.arena);
                if seen.insert((sp.start, sp.end)) {
                    trace!("match at {}..{}", sp.start, sp.end);
                    out.push(Match {
                        node: found,
                        values: std::mem::take(&mut self.values),
                        scope,
                    });
                }
            }
        }
        out
    }

    fn cmd_filter(&mut self, want_any: bool, pat: &Pattern, subs: Vec<Match>) -> Vec<Match> {
        let mut out = Vec::new();
        for m in subs {
            let mut any = false;
            for (p, cand, scope) in self.attempts(pat, &m) {
                self.values = Bindings::new();
                if self.top_node(p, cand, scope).is_some() {
                    any = true;
                    break;
                }
            }
            if any == want_any {
                out.push(m);
            }
        }
        out
    }

    /// Structural equality of two wildcard-free trees, ignoring positions.
    pub fn struct_eq(&mut self, a: NodeRef, b: NodeRef) -> bool {
        self.values = Bindings::new();
        let scope = self.scopes.universe();
        self.node(Some(a), Some(b), scope)
    }

    /// Top-level unification of a whole pattern against a candidate root.
    /// Two statement lists match partially, so a statement-list pattern can
    /// match a run inside a longer body; the returned node is then the
    /// matched sub-run.
    pub(crate) fn top_node(&mut self, pat: NodeRef, node: NodeRef, scope: ScopeKey) -> Option<NodeRef> {
        if let (NodeRef::StmtList(_), NodeRef::StmtList(_)) = (pat, node) {
            return self.nodes(pat, node, true, scope);
        }
        if self.node(Some(pat), Some(node), scope) {
            Some(node)
        } else {
            None
        }
    }

    // =========================================================================
    // Unifier
    // =========================================================================

    /// Structural match of `pat` against `tgt`, binding wildcards into the
    /// shared table. `None` stands for an absent optional child.
    pub(crate) fn node(&mut self, pat: Option<NodeRef>, tgt: Option<NodeRef>, scope: ScopeKey) -> bool {
        let (pat, tgt) = match (pat, tgt) {
            (None, None) => return true,
            (Some(p), Some(t)) => (p, t),
            _ => return self.lenience.nil_matches_any,
        };

        // Entering a scope-introducing target node narrows the scope for
        // everything below, including side conditions.
        let scope = tgt
            .key(&self.arena)
            .and_then(|k| self.info.scopes.get(&k).copied())
            .unwrap_or(scope);

        match pat {
            NodeRef::Expr(pe) => self.expr_node(pe, tgt, scope),
            NodeRef::Stmt(ps) => self.stmt_node(ps, tgt, scope),
            NodeRef::Decl(pd) => self.decl_node(pd, tgt, scope),
            NodeRef::Spec(psp) => self.spec_node(psp, tgt, scope),

            NodeRef::Field(pf) => {
                let NodeRef::Field(tf) = tgt else { return false };
                let p = self.arena.fields[pf];
                let t = self.arena.fields[tf];
                self.match_idents(p.names, t.names, scope)
                    && self.node(Some(NodeRef::Expr(p.typ)), Some(NodeRef::Expr(t.typ)), scope)
            }

            NodeRef::File(pfl) => {
                let NodeRef::File(tfl) = tgt else { return false };
                let p = self.arena.files[pfl];
                let t = self.arena.files[tfl];
                if !self.node(Some(NodeRef::Expr(p.name)), Some(NodeRef::Expr(t.name)), scope) {
                    return false;
                }
                if p.decls.len() != t.decls.len() {
                    return false;
                }
                for i in 0..p.decls.len() as usize {
                    let pd = self.arena.decls_list(p.decls)[i];
                    let td = self.arena.decls_list(t.decls)[i];
                    if !self.node(Some(NodeRef::Decl(pd)), Some(NodeRef::Decl(td)), scope) {
                        return false;
                    }
                }
                true
            }

            // Lists unify only with lists of the same species; a repeat
            // binding of `$*a` captured from one species never equals a run
            // from another.
            NodeRef::ExprList(_) => {
                matches!(tgt, NodeRef::ExprList(_)) && self.nodes(pat, tgt, false, scope).is_some()
            }
            NodeRef::IdentList(_) => {
                matches!(tgt, NodeRef::IdentList(_)) && self.nodes(pat, tgt, false, scope).is_some()
            }
            NodeRef::StmtList(_) => {
                matches!(tgt, NodeRef::StmtList(_)) && self.nodes(pat, tgt, false, scope).is_some()
            }
            NodeRef::SpecList(_) => {
                matches!(tgt, NodeRef::SpecList(_)) && self.nodes(pat, tgt, false, scope).is_some()
            }
        }
    }

    fn expr_node(&mut self, pe: ExprId, tgt: NodeRef, scope: ScopeKey) -> bool {
        let p = self.arena.exprs[pe];
        match p {
            Expr::Ident(sym) => self.ident_node(sym, tgt, scope),

            Expr::BasicLit { kind, value } => {
                let NodeRef::Expr(te) = tgt else { return false };
                matches!(self.arena.exprs[te], Expr::BasicLit { kind: tk, value: tv }
                    if tk == kind && tv == value)
            }

            Expr::FuncLit { typ, body } => {
                let Some(Expr::FuncLit { typ: tt, body: tb }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(typ)), Some(NodeRef::Expr(tt)), scope)
                    && self.node(Some(NodeRef::Stmt(body)), Some(NodeRef::Stmt(tb)), scope)
            }

            Expr::CompositeLit { typ, elts } => {
                let Some(Expr::CompositeLit { typ: tt, elts: te }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.node(typ.map(NodeRef::Expr), tt.map(NodeRef::Expr), scope)
                    && self.match_exprs(elts, te, scope)
            }

            Expr::Paren { x } => {
                let Some(Expr::Paren { x: tx }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(x)), Some(NodeRef::Expr(tx)), scope)
            }

            Expr::Selector { x, sel } => {
                let Some(Expr::Selector { x: tx, sel: ts }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(x)), Some(NodeRef::Expr(tx)), scope)
                    && self.node(Some(NodeRef::Expr(sel)), Some(NodeRef::Expr(ts)), scope)
            }

            Expr::Index { x, index } => {
                let Some(Expr::Index { x: tx, index: ti }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(x)), Some(NodeRef::Expr(tx)), scope)
                    && self.node(Some(NodeRef::Expr(index)), Some(NodeRef::Expr(ti)), scope)
            }

            Expr::Slice { x, low, high, max } => {
                let Some(Expr::Slice { x: tx, low: tl, high: th, max: tm }) = self.tgt_expr(tgt)
                else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(x)), Some(NodeRef::Expr(tx)), scope)
                    && self.node(low.map(NodeRef::Expr), tl.map(NodeRef::Expr), scope)
                    && self.node(high.map(NodeRef::Expr), th.map(NodeRef::Expr), scope)
                    && self.node(max.map(NodeRef::Expr), tm.map(NodeRef::Expr), scope)
            }

            Expr::TypeAssert { x, typ } => {
                let Some(Expr::TypeAssert { x: tx, typ: tt }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(x)), Some(NodeRef::Expr(tx)), scope)
                    && self.node(typ.map(NodeRef::Expr), tt.map(NodeRef::Expr), scope)
            }

            Expr::Call { fun, args, ellipsis } => {
                let Some(Expr::Call { fun: tf, args: ta, ellipsis: te }) = self.tgt_expr(tgt)
                else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(fun)), Some(NodeRef::Expr(tf)), scope)
                    && self.match_exprs(args, ta, scope)
                    && ellipsis == te
            }

            Expr::Star { x } => {
                let Some(Expr::Star { x: tx }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(x)), Some(NodeRef::Expr(tx)), scope)
            }

            Expr::Unary { op, x } => {
                let Some(Expr::Unary { op: to, x: tx }) = self.tgt_expr(tgt) else {
                    return false;
                };
                op == to && self.node(Some(NodeRef::Expr(x)), Some(NodeRef::Expr(tx)), scope)
            }

            Expr::Binary { x, op, y } => {
                let Some(Expr::Binary { x: tx, op: to, y: ty }) = self.tgt_expr(tgt) else {
                    return false;
                };
                op == to
                    && self.node(Some(NodeRef::Expr(x)), Some(NodeRef::Expr(tx)), scope)
                    && self.node(Some(NodeRef::Expr(y)), Some(NodeRef::Expr(ty)), scope)
            }

            Expr::KeyValue { key, value } => {
                let Some(Expr::KeyValue { key: tk, value: tv }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(key)), Some(NodeRef::Expr(tk)), scope)
                    && self.node(Some(NodeRef::Expr(value)), Some(NodeRef::Expr(tv)), scope)
            }

            Expr::Ellipsis { elt } => {
                let Some(Expr::Ellipsis { elt: te }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.node(elt.map(NodeRef::Expr), te.map(NodeRef::Expr), scope)
            }

            Expr::ArrayType { len, elt } => {
                let Some(Expr::ArrayType { len: tl, elt: te }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.node(len.map(NodeRef::Expr), tl.map(NodeRef::Expr), scope)
                    && self.node(Some(NodeRef::Expr(elt)), Some(NodeRef::Expr(te)), scope)
            }

            Expr::StructType { fields } => {
                let Some(Expr::StructType { fields: tf }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.match_fields(fields, tf, scope)
            }

            Expr::FuncType { params, results } => {
                let Some(Expr::FuncType { params: tp, results: tr }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.match_fields(params, tp, scope) && self.match_fields_opt(results, tr, scope)
            }

            Expr::InterfaceType { methods } => {
                let Some(Expr::InterfaceType { methods: tm }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.match_fields(methods, tm, scope)
            }

            Expr::MapType { key, value } => {
                let Some(Expr::MapType { key: tk, value: tv }) = self.tgt_expr(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(key)), Some(NodeRef::Expr(tk)), scope)
                    && self.node(Some(NodeRef::Expr(value)), Some(NodeRef::Expr(tv)), scope)
            }

            Expr::ChanType { dir, value } => {
                let Some(Expr::ChanType { dir: td, value: tv }) = self.tgt_expr(tgt) else {
                    return false;
                };
                dir == td && self.node(Some(NodeRef::Expr(value)), Some(NodeRef::Expr(tv)), scope)
            }
        }
    }

    /// Identifier matching: plain names by text, wildcards by their info
    /// record with side conditions checked before binding.
    fn ident_node(&mut self, sym: Symbol, tgt: NodeRef, scope: ScopeKey) -> bool {
        let Some(id) = self.wilds.decode(sym) else {
            // Not a wildcard: names must agree textually.
            return match tgt {
                NodeRef::Expr(te) => self.arena.ident_sym(te) == Some(sym),
                _ => false,
            };
        };

        let (name, any, comp, addr, underlying, has_rxs, type_checks) = {
            let info = self.wilds.get(id);
            (
                info.name,
                info.any,
                info.comparable,
                info.addressable,
                info.underlying,
                !info.name_rxs.is_empty(),
                info.types.clone(),
            )
        };

        // Variadic wildcards are consumed by the list matcher; in a plain
        // node position they never match.
        if any {
            return false;
        }

        if has_rxs {
            let tgt_name = match tgt {
                NodeRef::Expr(te) => self.arena.ident_sym(te),
                _ => None,
            };
            let Some(tgt_name) = tgt_name else { return false };
            let text = self.interner.resolve(tgt_name);
            let info = self.wilds.get(id);
            if !info.name_rxs.iter().all(|rx| rx.is_match(text)) {
                return false;
            }
        }

        let needs_expr =
            !type_checks.is_empty() || comp || addr || underlying.is_some();
        if needs_expr {
            // Only expressions have types.
            let NodeRef::Expr(te) = tgt else { return false };
            let Some(&have) = self.info.types.get(&te) else {
                return false;
            };
            for (op, want_expr) in type_checks {
                let mut resolver = Resolver {
                    arena: &self.arena,
                    interner: &self.interner,
                    store: &mut self.store,
                    scopes: &mut self.scopes,
                    importer: self.importer.as_mut(),
                };
                let want = match resolver.resolve(scope, want_expr) {
                    Ok(w) => w,
                    Err(e) => {
                        // Fatal for the pipeline; fail this attempt now and
                        // surface the error once the command finishes.
                        self.resolve_err.get_or_insert(e);
                        return false;
                    }
                };
                let ok = match op {
                    TypeCheckOp::Identical => self.store.identical(have, want),
                    TypeCheckOp::AssignableTo => self.store.assignable_to(have, want),
                    TypeCheckOp::ConvertibleTo => self.store.convertible_to(have, want),
                };
                if !ok {
                    return false;
                }
            }
            if comp && !self.store.comparable(have) {
                return false;
            }
            if addr && !self.info.addressable.contains(&te) {
                return false;
            }
            if let Some(u) = underlying {
                if self.store.underlying_kind(have) != u {
                    return false;
                }
            }
        }

        if name == self.underscore {
            // Discard wildcard: matches anything, binds nothing.
            return true;
        }
        match self.values.get(&name) {
            None => {
                self.values.insert(name, tgt);
                true
            }
            // Repeated use must match the first occurrence structurally.
            Some(&prev) => self.node(Some(prev), Some(tgt), scope),
        }
    }

    fn stmt_node(&mut self, ps: StmtId, tgt: NodeRef, scope: ScopeKey) -> bool {
        let p = self.arena.stmts[ps];
        match p {
            Stmt::Expr(x) => {
                // `$x` in statement position prefers to match the whole
                // statement rather than just its expression.
                if let Some(sym) = self.arena.ident_sym(x) {
                    if self.wilds.decode(sym).is_some() {
                        return self.node(Some(NodeRef::Expr(x)), Some(tgt), scope);
                    }
                }
                let Some(Stmt::Expr(tx)) = self.tgt_stmt(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(x)), Some(NodeRef::Expr(tx)), scope)
            }

            Stmt::Empty => matches!(self.tgt_stmt(tgt), Some(Stmt::Empty)),

            Stmt::Decl(d) => {
                let Some(Stmt::Decl(td)) = self.tgt_stmt(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Decl(d)), Some(NodeRef::Decl(td)), scope)
            }

            Stmt::Labeled { label, stmt } => {
                let Some(Stmt::Labeled { label: tl, stmt: ts }) = self.tgt_stmt(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(label)), Some(NodeRef::Expr(tl)), scope)
                    && self.node(Some(NodeRef::Stmt(stmt)), Some(NodeRef::Stmt(ts)), scope)
            }

            Stmt::Send { chan, value } => {
                let Some(Stmt::Send { chan: tc, value: tv }) = self.tgt_stmt(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(chan)), Some(NodeRef::Expr(tc)), scope)
                    && self.node(Some(NodeRef::Expr(value)), Some(NodeRef::Expr(tv)), scope)
            }

            Stmt::IncDec { x, op } => {
                let Some(Stmt::IncDec { x: tx, op: to }) = self.tgt_stmt(tgt) else {
                    return false;
                };
                op == to && self.node(Some(NodeRef::Expr(x)), Some(NodeRef::Expr(tx)), scope)
            }

            Stmt::Assign { lhs, op, rhs } => {
                if !self.lenience.assign_as_spec {
                    let Some(Stmt::Assign { lhs: tl, op: to, rhs: tr }) = self.tgt_stmt(tgt)
                    else {
                        return false;
                    };
                    return op == to
                        && self.match_exprs(lhs, tl, scope)
                        && self.match_exprs(rhs, tr, scope);
                }
                // Lenient: the assignment token is ignored, and a value spec
                // may stand in for the assignment.
                if let Some(Stmt::Assign { lhs: tl, rhs: tr, .. }) = self.tgt_stmt(tgt) {
                    return self.match_exprs(lhs, tl, scope) && self.match_exprs(rhs, tr, scope);
                }
                let NodeRef::Spec(tsp) = tgt else { return false };
                let Spec::Value { names, values, .. } = self.arena.specs[tsp] else {
                    return false;
                };
                self.nodes(
                    NodeRef::ExprList(lhs),
                    NodeRef::IdentList(names),
                    false,
                    scope,
                )
                .is_some()
                    && self.match_exprs(rhs, values, scope)
            }

            Stmt::Go { call } => {
                let Some(Stmt::Go { call: tc }) = self.tgt_stmt(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(call)), Some(NodeRef::Expr(tc)), scope)
            }

            Stmt::Defer { call } => {
                let Some(Stmt::Defer { call: tc }) = self.tgt_stmt(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Expr(call)), Some(NodeRef::Expr(tc)), scope)
            }

            Stmt::Return { results } => {
                let Some(Stmt::Return { results: tr }) = self.tgt_stmt(tgt) else {
                    return false;
                };
                self.match_exprs(results, tr, scope)
            }

            Stmt::Branch { tok, label } => {
                let Some(Stmt::Branch { tok: tt, label: tl }) = self.tgt_stmt(tgt) else {
                    return false;
                };
                tok == tt && self.node(label.map(NodeRef::Expr), tl.map(NodeRef::Expr), scope)
            }

            Stmt::Block { stmts } => {
                if self.lenience.block_as_list
                    && self.node(Some(NodeRef::StmtList(stmts)), Some(tgt), scope)
                {
                    return true;
                }
                let Some(Stmt::Block { stmts: ts }) = self.tgt_stmt(tgt) else {
                    return false;
                };
                self.match_cases(stmts, ts, scope) || self.match_stmts(stmts, ts, scope)
            }

            Stmt::If { init, cond, body, els } => {
                let Some(Stmt::If { init: ti, cond: tc, body: tb, els: te }) = self.tgt_stmt(tgt)
                else {
                    return false;
                };
                if init.is_none() {
                    if let Some(wild) = self.wild_any_ident(cond) {
                        // `if $*x { ... }` binds the whole header as a
                        // synthetic statement list.
                        let left = self.wild_stmt_list(wild);
                        let header = self.init_expr_list(ti, Some(tc), None);
                        return self.node(Some(left), Some(header), scope)
                            && self.node(Some(NodeRef::Stmt(body)), Some(NodeRef::Stmt(tb)), scope)
                            && self.node(els.map(NodeRef::Stmt), te.map(NodeRef::Stmt), scope);
                    }
                }
                self.node(init.map(NodeRef::Stmt), ti.map(NodeRef::Stmt), scope)
                    && self.node(Some(NodeRef::Expr(cond)), Some(NodeRef::Expr(tc)), scope)
                    && self.node(Some(NodeRef::Stmt(body)), Some(NodeRef::Stmt(tb)), scope)
                    && self.node(els.map(NodeRef::Stmt), te.map(NodeRef::Stmt), scope)
            }

            Stmt::Case { list, body } => {
                let Some(Stmt::Case { list: tl, body: tb }) = self.tgt_stmt(tgt) else {
                    return false;
                };
                self.match_exprs(list, tl, scope) && self.match_stmts(body, tb, scope)
            }

            Stmt::Switch { init, tag, body } => {
                let Some(Stmt::Switch { init: ti, tag: tt, body: tb }) = self.tgt_stmt(tgt) else {
                    return false;
                };
                if init.is_none() {
                    if let Some(wild) = tag.and_then(|t| self.wild_any_ident(t)) {
                        let left = self.wild_stmt_list(wild);
                        let header = self.init_expr_list(ti, tt, None);
                        return self.node(Some(left), Some(header), scope)
                            && self.node(Some(NodeRef::Stmt(body)), Some(NodeRef::Stmt(tb)), scope);
                    }
                }
                self.node(init.map(NodeRef::Stmt), ti.map(NodeRef::Stmt), scope)
                    && self.node(tag.map(NodeRef::Expr), tt.map(NodeRef::Expr), scope)
                    && self.node(Some(NodeRef::Stmt(body)), Some(NodeRef::Stmt(tb)), scope)
            }

            Stmt::TypeSwitch { init, assign, body } => {
                let Some(Stmt::TypeSwitch { init: ti, assign: ta, body: tb }) =
                    self.tgt_stmt(tgt)
                else {
                    return false;
                };
                self.node(init.map(NodeRef::Stmt), ti.map(NodeRef::Stmt), scope)
                    && self.node(Some(NodeRef::Stmt(assign)), Some(NodeRef::Stmt(ta)), scope)
                    && self.node(Some(NodeRef::Stmt(body)), Some(NodeRef::Stmt(tb)), scope)
            }

            Stmt::Comm { comm, body } => {
                let Some(Stmt::Comm { comm: tc, body: tb }) = self.tgt_stmt(tgt) else {
                    return false;
                };
                self.node(comm.map(NodeRef::Stmt), tc.map(NodeRef::Stmt), scope)
                    && self.match_stmts(body, tb, scope)
            }

            Stmt::Select { body } => {
                let Some(Stmt::Select { body: tb }) = self.tgt_stmt(tgt) else {
                    return false;
                };
                self.node(Some(NodeRef::Stmt(body)), Some(NodeRef::Stmt(tb)), scope)
            }

            Stmt::For { init, cond, post, body } => {
                let Some(Stmt::For { init: ti, cond: tc, post: tp, body: tb }) =
                    self.tgt_stmt(tgt)
                else {
                    return false;
                };
                if init.is_none() && post.is_none() {
                    if let Some(wild) = cond.and_then(|c| self.wild_any_ident(c)) {
                        let left = self.wild_stmt_list(wild);
                        let header = self.init_expr_list(ti, tc, tp);
                        return self.node(Some(left), Some(header), scope)
                            && self.node(Some(NodeRef::Stmt(body)), Some(NodeRef::Stmt(tb)), scope);
                    }
                }
                self.node(init.map(NodeRef::Stmt), ti.map(NodeRef::Stmt), scope)
                    && self.node(cond.map(NodeRef::Expr), tc.map(NodeRef::Expr), scope)
                    && self.node(post.map(NodeRef::Stmt), tp.map(NodeRef::Stmt), scope)
                    && self.node(Some(NodeRef::Stmt(body)), Some(NodeRef::Stmt(tb)), scope)
            }

            Stmt::Range { key, value, define, x, body } => {
                let Some(Stmt::Range {
                    key: tk,
                    value: tv,
                    define: td,
                    x: tx,
                    body: tb,
                }) = self.tgt_stmt(tgt)
                else {
                    return false;
                };
                define == td
                    && self.node(key.map(NodeRef::Expr), tk.map(NodeRef::Expr), scope)
                    && self.node(value.map(NodeRef::Expr), tv.map(NodeRef::Expr), scope)
                    && self.node(Some(NodeRef::Expr(x)), Some(NodeRef::Expr(tx)), scope)
                    && self.node(Some(NodeRef::Stmt(body)), Some(NodeRef::Stmt(tb)), scope)
            }
        }
    }

    fn decl_node(&mut self, pd: DeclId, tgt: NodeRef, scope: ScopeKey) -> bool {
        let p = self.arena.decls[pd];
        match p {
            Decl::Gen { tok, specs } => {
                if self.lenience.spec_elision && specs.len() == 1 {
                    let spec = self.arena.specs_list(specs)[0];
                    if self.node(Some(NodeRef::Spec(spec)), Some(tgt), scope) {
                        return true;
                    }
                }
                let NodeRef::Decl(td) = tgt else { return false };
                let Decl::Gen { tok: tt, specs: ts } = self.arena.decls[td] else {
                    return false;
                };
                tok == tt
                    && self
                        .nodes(NodeRef::SpecList(specs), NodeRef::SpecList(ts), false, scope)
                        .is_some()
            }

            Decl::Func { recv, name, typ, body } => {
                let NodeRef::Decl(td) = tgt else { return false };
                let Decl::Func { recv: tr, name: tn, typ: tt, body: tb } = self.arena.decls[td]
                else {
                    return false;
                };
                self.match_fields_opt(recv, tr, scope)
                    && self.node(Some(NodeRef::Expr(name)), Some(NodeRef::Expr(tn)), scope)
                    && self.node(Some(NodeRef::Expr(typ)), Some(NodeRef::Expr(tt)), scope)
                    && self.node(body.map(NodeRef::Stmt), tb.map(NodeRef::Stmt), scope)
            }
        }
    }

    fn spec_node(&mut self, psp: SpecId, tgt: NodeRef, scope: ScopeKey) -> bool {
        let p = self.arena.specs[psp];
        match p {
            Spec::Import { name, path } => {
                let Some(Spec::Import { name: tn, path: tp }) = self.tgt_spec(tgt) else {
                    return false;
                };
                self.node(name.map(NodeRef::Expr), tn.map(NodeRef::Expr), scope)
                    && self.node(Some(NodeRef::Expr(path)), Some(NodeRef::Expr(tp)), scope)
            }

            Spec::Value { names, typ, values } => {
                let Some(Spec::Value { names: tn, typ: tt, values: tv }) = self.tgt_spec(tgt)
                else {
                    return false;
                };
                if !self.node(typ.map(NodeRef::Expr), tt.map(NodeRef::Expr), scope) {
                    return false;
                }
                if self.lenience.spec_elision && names.len() == 1 {
                    // A one-name spec may match any single name/value pair.
                    let pname = self.arena.idents_list(names)[0];
                    let pvalue = self.arena.exprs_list(values).first().copied();
                    for i in 0..tn.len() as usize {
                        let tname = self.arena.idents_list(tn)[i];
                        if !self.node(
                            Some(NodeRef::Expr(pname.0)),
                            Some(NodeRef::Expr(tname.0)),
                            scope,
                        ) {
                            continue;
                        }
                        match pvalue {
                            None => return true,
                            Some(pv) => {
                                let tvs = self.arena.exprs_list(tv);
                                if let Some(&tvalue) = tvs.get(i) {
                                    if self.node(
                                        Some(NodeRef::Expr(pv)),
                                        Some(NodeRef::Expr(tvalue)),
                                        scope,
                                    ) {
                                        return true;
                                    }
                                }
                            }
                        }
                    }
                }
                self.match_idents(names, tn, scope) && self.match_exprs(values, tv, scope)
            }

            Spec::Type { name, alias, typ } => {
                let Some(Spec::Type { name: tn, alias: ta, typ: tt }) = self.tgt_spec(tgt) else {
                    return false;
                };
                alias == ta
                    && self.node(Some(NodeRef::Expr(name)), Some(NodeRef::Expr(tn)), scope)
                    && self.node(Some(NodeRef::Expr(typ)), Some(NodeRef::Expr(tt)), scope)
            }
        }
    }

    // =========================================================================
    // Unifier helpers
    // =========================================================================

    fn tgt_expr(&self, tgt: NodeRef) -> Option<Expr> {
        match tgt {
            NodeRef::Expr(te) => Some(self.arena.exprs[te]),
            _ => None,
        }
    }

    fn tgt_stmt(&self, tgt: NodeRef) -> Option<Stmt> {
        match tgt {
            NodeRef::Stmt(ts) => Some(self.arena.stmts[ts]),
            _ => None,
        }
    }

    fn tgt_spec(&self, tgt: NodeRef) -> Option<Spec> {
        match tgt {
            NodeRef::Spec(ts) => Some(self.arena.specs[ts]),
            _ => None,
        }
    }

    pub(crate) fn match_exprs(&mut self, l1: ListRef<ExprId>, l2: ListRef<ExprId>, scope: ScopeKey) -> bool {
        self.nodes(NodeRef::ExprList(l1), NodeRef::ExprList(l2), false, scope)
            .is_some()
    }

    fn match_idents(&mut self, l1: ListRef<IdentId>, l2: ListRef<IdentId>, scope: ScopeKey) -> bool {
        self.nodes(NodeRef::IdentList(l1), NodeRef::IdentList(l2), false, scope)
            .is_some()
    }

    fn match_stmts(&mut self, l1: ListRef<StmtId>, l2: ListRef<StmtId>, scope: ScopeKey) -> bool {
        self.nodes(NodeRef::StmtList(l1), NodeRef::StmtList(l2), false, scope)
            .is_some()
    }

    /// Field lists match strictly: same presence, same length, fieldwise.
    fn match_fields(&mut self, f1: ListRef<FieldId>, f2: ListRef<FieldId>, scope: ScopeKey) -> bool {
        if f1.len() != f2.len() {
            return false;
        }
        for i in 0..f1.len() as usize {
            let a = self.arena.fields_list(f1)[i];
            let b = self.arena.fields_list(f2)[i];
            if !self.node(Some(NodeRef::Field(a)), Some(NodeRef::Field(b)), scope) {
                return false;
            }
        }
        true
    }

    fn match_fields_opt(
        &mut self,
        f1: Option<ListRef<FieldId>>,
        f2: Option<ListRef<FieldId>>,
        scope: ScopeKey,
    ) -> bool {
        match (f1, f2) {
            (None, None) => true,
            (Some(a), Some(b)) => self.match_fields(a, b, scope),
            _ => false,
        }
    }

    /// The binding name of `e` when it is a variadic wildcard identifier.
    fn wild_any_ident(&self, e: ExprId) -> Option<ExprId> {
        let sym = self.arena.ident_sym(e)?;
        let id = self.wilds.decode(sym)?;
        self.wilds.get(id).any.then_some(e)
    }

    /// `[stmt(ident)]`: a one-statement list wrapping a wildcard identifier,
    /// for matching whole if/for/switch headers.
    fn wild_stmt_list(&mut self, ident: ExprId) -> NodeRef {
        let span = self.arena.exprs.span(ident);
        let s = self.arena.stmts.alloc(Stmt::Expr(ident), span);
        NodeRef::StmtList(self.arena.list_stmts([s]))
    }

    /// Synthetic `[init; cond; post]` statement list over a target header.
    fn init_expr_list(
        &mut self,
        init: Option<StmtId>,
        cond: Option<ExprId>,
        post: Option<StmtId>,
    ) -> NodeRef {
        let mut stmts: SmallVec<[StmtId; 3]> = SmallVec::new();
        if let Some(i) = init {
            stmts.push(i);
        }
        if let Some(c) = cond {
            let span = self.arena.exprs.span(c);
            stmts.push(self.arena.stmts.alloc(Stmt::Expr(c), span));
        }
        if let Some(p) = post {
            stmts.push(p);
        }
        NodeRef::StmtList(self.arena.list_stmts(stmts))
    }

    /// Case-list sugar: a pattern block whose clauses each hold one wildcard
    /// item and the body sentinel is an ordered list of clause wildcards,
    /// matched variadically against the target's clause list.
    fn match_cases(&mut self, pat: ListRef<StmtId>, tgt: ListRef<StmtId>, scope: ScopeKey) -> bool {
        for &s in self.arena.stmts_list(tgt) {
            if !matches!(self.arena.stmts[s], Stmt::Case { .. } | Stmt::Comm { .. }) {
                return false;
            }
        }
        let pat_stmts: SmallVec<[StmtId; 4]> = self.arena.stmts_list(pat).iter().copied().collect();
        let mut left: SmallVec<[IdentId; 4]> = SmallVec::new();
        for s in pat_stmts {
            let (item, body) = match self.arena.stmts[s] {
                Stmt::Case { list, body } => {
                    if list.len() != 1 || body.len() != 1 {
                        return false;
                    }
                    (self.arena.exprs_list(list)[0], self.arena.stmts_list(body)[0])
                }
                Stmt::Comm { comm: Some(c), body } => {
                    if body.len() != 1 {
                        return false;
                    }
                    let Stmt::Expr(e) = self.arena.stmts[c] else {
                        return false;
                    };
                    (e, self.arena.stmts_list(body)[0])
                }
                _ => return false,
            };
            let Stmt::Expr(bx) = self.arena.stmts[body] else {
                return false;
            };
            if self.arena.ident_sym(bx) != Some(self.body_sym) {
                return false;
            }
            let Some(sym) = self.arena.ident_sym(item) else {
                return false;
            };
            if self.wilds.decode(sym).is_none() {
                return false;
            }
            left.push(IdentId(item));
        }
        let left = NodeRef::IdentList(self.arena.list_idents(left));
        self.nodes(left, NodeRef::StmtList(tgt), false, scope).is_some()
    }

    // =========================================================================
    // Variadic list matcher
    // =========================================================================

    /// Decodes a list element into its variadic wildcard binding name, if it
    /// is one. Statement lists see wildcards through their expression
    /// statement wrapper.
    fn elem_wild_any(&self, n: NodeRef) -> Option<Symbol> {
        let e = match n {
            NodeRef::Expr(e) => e,
            NodeRef::Stmt(s) => match self.arena.stmts[s] {
                Stmt::Expr(e) => e,
                _ => return None,
            },
            _ => return None,
        };
        let sym = self.arena.ident_sym(e)?;
        let id = self.wilds.decode(sym)?;
        let info = self.wilds.get(id);
        info.any.then_some(info.name)
    }

    /// Closes the pending variadic wildcard, if any: the captured slice must
    /// agree with any earlier binding of the same name, then (re)binds it.
    fn close_wild(
        &mut self,
        wild: Option<Symbol>,
        l2: NodeRef,
        wild_start: usize,
        i2: usize,
        scope: ScopeKey,
    ) -> bool {
        let Some(name) = wild else { return true };
        if name == self.underscore {
            return true;
        }
        let list = l2.list_slice(wild_start, i2);
        if let Some(&prev) = self.values.get(&name) {
            if !self.node(Some(prev), Some(list), scope) {
                return false;
            }
        }
        self.values.insert(name, list);
        true
    }

    /// Matches two parallel node lists, allowing variadic wildcards in the
    /// pattern to absorb zero or more target elements. Backtracking is
    /// iterative with an explicit restart stack; each frame snapshots the
    /// binding table. With `partial` the target may keep an unmatched prefix
    /// and suffix, and the returned slice is the matched window.
    pub(crate) fn nodes(
        &mut self,
        l1: NodeRef,
        l2: NodeRef,
        partial: bool,
        scope: ScopeKey,
    ) -> Option<NodeRef> {
        struct Restart {
            values: Bindings,
            next1: usize,
            next2: usize,
        }

        let len1 = l1.list_len();
        let len2 = l2.list_len();
        if len1 == 0 {
            return if len2 == 0 { Some(l2) } else { None };
        }

        let (mut partial_start, mut partial_end) = (0usize, len2);
        let (mut i1, mut i2) = (0usize, 0usize);
        let (mut next1, mut next2) = (0usize, 0usize);
        let mut stack: Vec<Restart> = Vec::new();
        let mut wild_name: Option<Symbol> = None;
        let mut wild_start = 0usize;

        macro_rules! push {
            ($n1:expr, $n2:expr) => {{
                let (n1, n2) = ($n1, $n2);
                // A restart beyond the target's end would be discarded anyway.
                if n2 <= len2 {
                    stack.push(Restart {
                        values: self.values.clone(),
                        next1: n1,
                        next2: n2,
                    });
                    next1 = n1;
                    next2 = n2;
                }
            }};
        }

        while i1 < len1 || i2 < len2 {
            if i1 < len1 {
                let n1 = l1.list_at(&self.arena, i1);
                if let Some(name) = self.elem_wild_any(n1) {
                    // A variadic wildcard tries to match as few elements as
                    // needed; on failure the restart grows it by one.
                    if Some(name) != wild_name {
                        wild_start = i2;
                        wild_name = Some(name);
                    }
                    push!(i1, i2 + 1);
                    i1 += 1;
                    continue;
                }
                if partial && i1 == 0 {
                    // Allow an unmatched target prefix, one element per
                    // restart.
                    partial_start = i2;
                    push!(i1, i2 + 1);
                }
                if i2 < len2
                    && self.close_wild(wild_name, l2, wild_start, i2, scope)
                    && {
                        let n2 = l2.list_at(&self.arena, i2);
                        self.node(Some(n1), Some(n2), scope)
                    }
                {
                    wild_name = None;
                    i1 += 1;
                    i2 += 1;
                    continue;
                }
            }
            if partial && i1 == len1 && wild_name.is_none() {
                // The pattern is exhausted; the rest is unmatched suffix.
                partial_end = i2;
                break;
            }
            // Mismatch: restart from the most recent frame, if it moves us.
            if 0 < next2 && next2 <= len2 && (i1 != next1 || i2 != next2) {
                i1 = next1;
                i2 = next2;
                let top = stack.pop().expect("restart stack underflow");
                self.values = top.values;
                (next1, next2) = match stack.last() {
                    Some(r) => (r.next1, r.next2),
                    None => (0, 0),
                };
                continue;
            }
            return None;
        }
        if !self.close_wild(wild_name, l2, wild_start, i2, scope) {
            return None;
        }
        Some(l2.list_slice(partial_start, partial_end))
    }
}
