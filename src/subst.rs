//! Substitution: replace each match with an instantiated replacement
//! pattern, splicing in place.
//!
//! Per match: parse the replacement source fresh, scrub its positions, fill
//! a parent map over it, expand every wildcard hole with its bound node
//! (lists splice into surrounding sequences), then swap the fragment into
//! the matched node's parent slot and repair positions.
//!
//! Parent slots are resolved by a typed match over the parent's node kind —
//! each child field is either a direct slot or a sequence slot, and the
//! first slot holding the old node (by identity) is the splice point. A
//! missing slot is a programmer error: the parent map must be complete.

use log::debug;

use crate::ast::*;
use crate::error::Error;
use crate::matcher::{Bindings, Cmd, Match, Matcher};
use crate::walk::{children, inspect, ChildVec};

impl Matcher {
    /// Records the parent of every node under `root` for later splicing.
    pub fn fill_parents(&mut self, root: NodeRef) {
        let mut pairs = Vec::new();
        collect_parents(&self.arena, root, &mut pairs);
        for (key, parent) in pairs {
            self.parents.insert(key, parent);
        }
    }

    /// Applies a substitute command to each match, rewriting the tree in
    /// place. Returns the matches with their nodes swapped for the fresh
    /// fragments. A match with no parent (the pipeline root itself) is
    /// replaced only in the returned set.
    pub fn substitute(&mut self, cmd: &Cmd, subs: Vec<Match>) -> Result<Vec<Match>, Error> {
        let src = cmd.src.clone().ok_or(Error::NoReplacement)?;
        let mut out = Vec::with_capacity(subs.len());
        for mut sub in subs {
            let frag = self.parse_pattern(&src)?;
            self.scrub_positions(frag);
            self.fill_parents(frag);
            let frag = self.fill_values(frag, &sub.values)?;
            if self.parent_of(sub.node).is_some() {
                self.splice_node(sub.node, frag);
            }
            debug!("substituted {:?} -> {:?}", sub.node, frag);
            sub.node = frag;
            out.push(sub);
        }
        Ok(out)
    }

    /// Resets every position in a fresh fragment to the no-position
    /// sentinel, so spliced output can be re-positioned into its new home.
    fn scrub_positions(&mut self, frag: NodeRef) {
        let mut nodes = Vec::new();
        inspect(&self.arena, frag, &mut |n| nodes.push(n));
        for n in nodes {
            self.set_node_span(n, Span::NONE);
        }
    }

    /// Expands every wildcard hole in the fragment with its bound node.
    /// Returns the fragment root, which may itself be a bound node when the
    /// whole replacement is a single wildcard.
    fn fill_values(&mut self, frag: NodeRef, values: &Bindings) -> Result<NodeRef, Error> {
        // Collect holes up front; splicing rewrites parent slots as we go.
        // A statement-position wildcard is the statement, not its inner
        // identifier, so the bound node can be a statement or a whole run.
        let mut holes: Vec<(NodeRef, Symbol)> = Vec::new();
        {
            let a = &self.arena;
            let wilds = &self.wilds;
            let mut skip_expr: Option<ExprId> = None;
            inspect(a, frag, &mut |n| {
                if let NodeRef::Expr(e) = n {
                    if skip_expr == Some(e) {
                        skip_expr = None;
                        return;
                    }
                }
                let inner = match n {
                    NodeRef::Expr(e) => Some(e),
                    NodeRef::Stmt(s) => match a.stmts[s] {
                        Stmt::Expr(e) => Some(e),
                        _ => None,
                    },
                    _ => None,
                };
                let Some(e) = inner else { return };
                let Some(sym) = a.ident_sym(e) else { return };
                let Some(id) = wilds.decode(sym) else { return };
                holes.push((n, wilds.get(id).name));
                if matches!(n, NodeRef::Stmt(_)) {
                    skip_expr = Some(e);
                }
            });
        }

        let mut root = frag;
        for (hole, name) in holes {
            let Some(&bound) = values.get(&name) else {
                return Err(Error::Unbound {
                    name: self.interner.resolve(name).to_string(),
                });
            };
            if hole == root {
                root = bound;
                continue;
            }
            if self.parent_of(hole).is_none() {
                // The hole is a direct element of a bare-list root; rebuild
                // the root list itself.
                root = match root {
                    NodeRef::StmtList(r) => {
                        let r = self
                            .sub_stmts(r, root, hole, bound)
                            .unwrap_or_else(|| panic!("hole {hole:?} missing from root list"));
                        NodeRef::StmtList(r)
                    }
                    NodeRef::ExprList(r) => {
                        let r = self
                            .sub_exprs(r, hole, bound)
                            .unwrap_or_else(|| panic!("hole {hole:?} missing from root list"));
                        NodeRef::ExprList(r)
                    }
                    _ => panic!("no parent recorded for {hole:?}"),
                };
                continue;
            }
            self.splice_node(hole, bound);
        }
        Ok(root)
    }

    pub(crate) fn parent_of(&self, n: NodeRef) -> Option<NodeRef> {
        let key = n.key(&self.arena)?;
        self.parents.get(&key).copied()
    }

    fn set_parent_of(&mut self, n: NodeRef, parent: NodeRef) {
        if let Some(key) = n.key(&self.arena) {
            self.parents.insert(key, parent);
        }
    }

    /// Replaces `old` with `new` inside `old`'s parent slot.
    ///
    /// # Panics
    /// Panics when `old` has no recorded parent, no slot of the parent
    /// holds it, or `new` has a shape the slot cannot take.
    fn splice_node(&mut self, old: NodeRef, new: NodeRef) {
        let parent = self
            .parent_of(old)
            .unwrap_or_else(|| panic!("no parent recorded for {old:?}"));
        self.replace_in_parent(parent, old, new);
        self.set_parent_of(new, parent);
        self.fix_positions(parent);
    }

    fn replace_in_parent(&mut self, parent: NodeRef, old: NodeRef, new: NodeRef) {
        match parent {
            NodeRef::Expr(pid) => {
                let node = self.arena.exprs[pid];
                let replaced = self.replace_in_expr(node, parent, old, new);
                match replaced {
                    Some(n) => self.arena.exprs[pid] = n,
                    None => panic!("no slot holds {old:?} in {node:?}"),
                }
            }
            NodeRef::Stmt(pid) => {
                let node = self.arena.stmts[pid];
                let replaced = self.replace_in_stmt(node, parent, old, new);
                match replaced {
                    Some(n) => self.arena.stmts[pid] = n,
                    None => panic!("no slot holds {old:?} in {node:?}"),
                }
            }
            NodeRef::Decl(pid) => {
                let node = self.arena.decls[pid];
                let replaced = self.replace_in_decl(node, parent, old, new);
                match replaced {
                    Some(n) => self.arena.decls[pid] = n,
                    None => panic!("no slot holds {old:?} in {node:?}"),
                }
            }
            NodeRef::Spec(pid) => {
                let node = self.arena.specs[pid];
                let replaced = self.replace_in_spec(node, old, new);
                match replaced {
                    Some(n) => self.arena.specs[pid] = n,
                    None => panic!("no slot holds {old:?} in {node:?}"),
                }
            }
            NodeRef::Field(pid) => {
                let node = self.arena.fields[pid];
                let names = self.sub_idents(node.names, old, new);
                let replaced = match names {
                    Some(names) => Some(Field { names, ..node }),
                    None => self.sub_expr(node.typ, old, new).map(|typ| Field { typ, ..node }),
                };
                match replaced {
                    Some(n) => self.arena.fields[pid] = n,
                    None => panic!("no slot holds {old:?} in {node:?}"),
                }
            }
            NodeRef::File(pid) => {
                let node = self.arena.files[pid];
                let replaced = match self.sub_expr(node.name, old, new) {
                    Some(name) => Some(File { name, ..node }),
                    None => self.sub_decls(node.decls, old, new).map(|decls| File {
                        decls,
                        ..node
                    }),
                };
                match replaced {
                    Some(n) => self.arena.files[pid] = n,
                    None => panic!("no slot holds {old:?} in {node:?}"),
                }
            }
            _ => panic!("a list is not a parent"),
        }
    }

    fn replace_in_expr(
        &mut self,
        node: Expr,
        parent: NodeRef,
        old: NodeRef,
        new: NodeRef,
    ) -> Option<Expr> {
        Some(match node {
            Expr::Ident(_) | Expr::BasicLit { .. } => return None,
            Expr::FuncLit { typ, body } => {
                if let Some(typ) = self.sub_expr(typ, old, new) {
                    Expr::FuncLit { typ, body }
                } else {
                    let body = self.sub_stmt(body, parent, old, new)?;
                    Expr::FuncLit { typ, body }
                }
            }
            Expr::CompositeLit { typ, elts } => {
                if let Some(typ) = self.sub_expr_opt(typ, old, new) {
                    Expr::CompositeLit { typ, elts }
                } else {
                    let elts = self.sub_exprs(elts, old, new)?;
                    Expr::CompositeLit { typ, elts }
                }
            }
            Expr::Paren { x } => Expr::Paren {
                x: self.sub_expr(x, old, new)?,
            },
            Expr::Selector { x, sel } => {
                if let Some(x) = self.sub_expr(x, old, new) {
                    Expr::Selector { x, sel }
                } else {
                    let sel = self.sub_expr(sel, old, new)?;
                    Expr::Selector { x, sel }
                }
            }
            Expr::Index { x, index } => {
                if let Some(x) = self.sub_expr(x, old, new) {
                    Expr::Index { x, index }
                } else {
                    let index = self.sub_expr(index, old, new)?;
                    Expr::Index { x, index }
                }
            }
            Expr::Slice { x, low, high, max } => {
                if let Some(x) = self.sub_expr(x, old, new) {
                    Expr::Slice { x, low, high, max }
                } else if let Some(low) = self.sub_expr_opt(low, old, new) {
                    Expr::Slice { x, low, high, max }
                } else if let Some(high) = self.sub_expr_opt(high, old, new) {
                    Expr::Slice { x, low, high, max }
                } else {
                    let max = self.sub_expr_opt(max, old, new)?;
                    Expr::Slice { x, low, high, max }
                }
            }
            Expr::TypeAssert { x, typ } => {
                if let Some(x) = self.sub_expr(x, old, new) {
                    Expr::TypeAssert { x, typ }
                } else {
                    let typ = self.sub_expr_opt(typ, old, new)?;
                    Expr::TypeAssert { x, typ }
                }
            }
            Expr::Call { fun, args, ellipsis } => {
                if let Some(fun) = self.sub_expr(fun, old, new) {
                    Expr::Call { fun, args, ellipsis }
                } else {
                    let args = self.sub_exprs(args, old, new)?;
                    Expr::Call { fun, args, ellipsis }
                }
            }
            Expr::Star { x } => Expr::Star {
                x: self.sub_expr(x, old, new)?,
            },
            Expr::Unary { op, x } => Expr::Unary {
                op,
                x: self.sub_expr(x, old, new)?,
            },
            Expr::Binary { x, op, y } => {
                if let Some(x) = self.sub_expr(x, old, new) {
                    Expr::Binary { x, op, y }
                } else {
                    let y = self.sub_expr(y, old, new)?;
                    Expr::Binary { x, op, y }
                }
            }
            Expr::KeyValue { key, value } => {
                if let Some(key) = self.sub_expr(key, old, new) {
                    Expr::KeyValue { key, value }
                } else {
                    let value = self.sub_expr(value, old, new)?;
                    Expr::KeyValue { key, value }
                }
            }
            Expr::Ellipsis { elt } => Expr::Ellipsis {
                elt: self.sub_expr_opt(elt, old, new)?,
            },
            Expr::ArrayType { len, elt } => {
                if let Some(len) = self.sub_expr_opt(len, old, new) {
                    Expr::ArrayType { len, elt }
                } else {
                    let elt = self.sub_expr(elt, old, new)?;
                    Expr::ArrayType { len, elt }
                }
            }
            Expr::MapType { key, value } => {
                if let Some(key) = self.sub_expr(key, old, new) {
                    Expr::MapType { key, value }
                } else {
                    let value = self.sub_expr(value, old, new)?;
                    Expr::MapType { key, value }
                }
            }
            Expr::ChanType { dir, value } => Expr::ChanType {
                dir,
                value: self.sub_expr(value, old, new)?,
            },
            Expr::StructType { .. } | Expr::FuncType { .. } | Expr::InterfaceType { .. } => {
                return None
            }
        })
    }

    fn replace_in_stmt(
        &mut self,
        node: Stmt,
        parent: NodeRef,
        old: NodeRef,
        new: NodeRef,
    ) -> Option<Stmt> {
        Some(match node {
            Stmt::Empty | Stmt::Branch { label: None, .. } => return None,
            Stmt::Decl(d) => Stmt::Decl(self.sub_decl(d, old, new)?),
            Stmt::Labeled { label, stmt } => {
                if let Some(label) = self.sub_expr(label, old, new) {
                    Stmt::Labeled { label, stmt }
                } else {
                    let stmt = self.sub_stmt(stmt, parent, old, new)?;
                    Stmt::Labeled { label, stmt }
                }
            }
            Stmt::Expr(e) => Stmt::Expr(self.sub_expr(e, old, new)?),
            Stmt::Send { chan, value } => {
                if let Some(chan) = self.sub_expr(chan, old, new) {
                    Stmt::Send { chan, value }
                } else {
                    let value = self.sub_expr(value, old, new)?;
                    Stmt::Send { chan, value }
                }
            }
            Stmt::IncDec { x, op } => Stmt::IncDec {
                x: self.sub_expr(x, old, new)?,
                op,
            },
            Stmt::Assign { lhs, op, rhs } => {
                if let Some(lhs) = self.sub_exprs(lhs, old, new) {
                    Stmt::Assign { lhs, op, rhs }
                } else {
                    let rhs = self.sub_exprs(rhs, old, new)?;
                    Stmt::Assign { lhs, op, rhs }
                }
            }
            Stmt::Go { call } => Stmt::Go {
                call: self.sub_expr(call, old, new)?,
            },
            Stmt::Defer { call } => Stmt::Defer {
                call: self.sub_expr(call, old, new)?,
            },
            Stmt::Return { results } => Stmt::Return {
                results: self.sub_exprs(results, old, new)?,
            },
            Stmt::Branch { tok, label: Some(l) } => Stmt::Branch {
                tok,
                label: Some(self.sub_expr(l, old, new)?),
            },
            Stmt::Block { stmts } => Stmt::Block {
                stmts: self.sub_stmts(stmts, parent, old, new)?,
            },
            Stmt::If { init, cond, body, els } => {
                if let Some(init) = self.sub_stmt_opt(init, parent, old, new) {
                    Stmt::If { init, cond, body, els }
                } else if let Some(cond) = self.sub_expr(cond, old, new) {
                    Stmt::If { init, cond, body, els }
                } else if let Some(body) = self.sub_stmt(body, parent, old, new) {
                    Stmt::If { init, cond, body, els }
                } else {
                    let els = self.sub_stmt_opt(els, parent, old, new)?;
                    Stmt::If { init, cond, body, els }
                }
            }
            Stmt::Case { list, body } => {
                if let Some(list) = self.sub_exprs(list, old, new) {
                    Stmt::Case { list, body }
                } else {
                    let body = self.sub_stmts(body, parent, old, new)?;
                    Stmt::Case { list, body }
                }
            }
            Stmt::Switch { init, tag, body } => {
                if let Some(init) = self.sub_stmt_opt(init, parent, old, new) {
                    Stmt::Switch { init, tag, body }
                } else if let Some(tag) = self.sub_expr_opt(tag, old, new) {
                    Stmt::Switch { init, tag, body }
                } else {
                    let body = self.sub_stmt(body, parent, old, new)?;
                    Stmt::Switch { init, tag, body }
                }
            }
            Stmt::TypeSwitch { init, assign, body } => {
                if let Some(init) = self.sub_stmt_opt(init, parent, old, new) {
                    Stmt::TypeSwitch { init, assign, body }
                } else if let Some(assign) = self.sub_stmt(assign, parent, old, new) {
                    Stmt::TypeSwitch { init, assign, body }
                } else {
                    let body = self.sub_stmt(body, parent, old, new)?;
                    Stmt::TypeSwitch { init, assign, body }
                }
            }
            Stmt::Comm { comm, body } => {
                if let Some(comm) = self.sub_stmt_opt(comm, parent, old, new) {
                    Stmt::Comm { comm, body }
                } else {
                    let body = self.sub_stmts(body, parent, old, new)?;
                    Stmt::Comm { comm, body }
                }
            }
            Stmt::Select { body } => Stmt::Select {
                body: self.sub_stmt(body, parent, old, new)?,
            },
            Stmt::For { init, cond, post, body } => {
                if let Some(init) = self.sub_stmt_opt(init, parent, old, new) {
                    Stmt::For { init, cond, post, body }
                } else if let Some(cond) = self.sub_expr_opt(cond, old, new) {
                    Stmt::For { init, cond, post, body }
                } else if let Some(post) = self.sub_stmt_opt(post, parent, old, new) {
                    Stmt::For { init, cond, post, body }
                } else {
                    let body = self.sub_stmt(body, parent, old, new)?;
                    Stmt::For { init, cond, post, body }
                }
            }
            Stmt::Range { key, value, define, x, body } => {
                if let Some(key) = self.sub_expr_opt(key, old, new) {
                    Stmt::Range { key, value, define, x, body }
                } else if let Some(value) = self.sub_expr_opt(value, old, new) {
                    Stmt::Range { key, value, define, x, body }
                } else if let Some(x) = self.sub_expr(x, old, new) {
                    Stmt::Range { key, value, define, x, body }
                } else {
                    let body = self.sub_stmt(body, parent, old, new)?;
                    Stmt::Range { key, value, define, x, body }
                }
            }
        })
    }

    fn replace_in_decl(
        &mut self,
        node: Decl,
        parent: NodeRef,
        old: NodeRef,
        new: NodeRef,
    ) -> Option<Decl> {
        Some(match node {
            Decl::Gen { tok, specs } => Decl::Gen {
                tok,
                specs: self.sub_specs(specs, old, new)?,
            },
            Decl::Func { recv, name, typ, body } => {
                if let Some(name) = self.sub_expr(name, old, new) {
                    Decl::Func { recv, name, typ, body }
                } else if let Some(typ) = self.sub_expr(typ, old, new) {
                    Decl::Func { recv, name, typ, body }
                } else {
                    let body = self.sub_stmt_opt(body, parent, old, new)?;
                    Decl::Func { recv, name, typ, body }
                }
            }
        })
    }

    fn replace_in_spec(&mut self, node: Spec, old: NodeRef, new: NodeRef) -> Option<Spec> {
        Some(match node {
            Spec::Import { name, path } => {
                if let Some(name) = self.sub_expr_opt(name, old, new) {
                    Spec::Import { name, path }
                } else {
                    let path = self.sub_expr(path, old, new)?;
                    Spec::Import { name, path }
                }
            }
            Spec::Value { names, typ, values } => {
                if let Some(names) = self.sub_idents(names, old, new) {
                    Spec::Value { names, typ, values }
                } else if let Some(typ) = self.sub_expr_opt(typ, old, new) {
                    Spec::Value { names, typ, values }
                } else {
                    let values = self.sub_exprs(values, old, new)?;
                    Spec::Value { names, typ, values }
                }
            }
            Spec::Type { name, alias, typ } => {
                if let Some(name) = self.sub_expr(name, old, new) {
                    Spec::Type { name, alias, typ }
                } else {
                    let typ = self.sub_expr(typ, old, new)?;
                    Spec::Type { name, alias, typ }
                }
            }
        })
    }

    // ------------------------------------------------------------------
    // Slot substitution
    // ------------------------------------------------------------------

    fn coerce_expr(&self, new: NodeRef) -> ExprId {
        match new {
            NodeRef::Expr(e) => e,
            _ => panic!("cannot replace an expression with {new:?}"),
        }
    }

    fn coerce_stmt(&mut self, new: NodeRef, parent: NodeRef) -> StmtId {
        match new {
            NodeRef::Stmt(s) => s,
            NodeRef::Expr(e) => {
                let s = self.arena.stmts.alloc(Stmt::Expr(e), Span::NONE);
                self.set_parent_of(NodeRef::Stmt(s), parent);
                s
            }
            _ => panic!("cannot replace a statement with {new:?}"),
        }
    }

    fn sub_expr(&mut self, slot: ExprId, old: NodeRef, new: NodeRef) -> Option<ExprId> {
        (NodeRef::Expr(slot) == old).then(|| self.coerce_expr(new))
    }

    fn sub_expr_opt(
        &mut self,
        slot: Option<ExprId>,
        old: NodeRef,
        new: NodeRef,
    ) -> Option<Option<ExprId>> {
        let e = slot?;
        self.sub_expr(e, old, new).map(Some)
    }

    fn sub_stmt(
        &mut self,
        slot: StmtId,
        parent: NodeRef,
        old: NodeRef,
        new: NodeRef,
    ) -> Option<StmtId> {
        (NodeRef::Stmt(slot) == old).then(|| self.coerce_stmt(new, parent))
    }

    fn sub_stmt_opt(
        &mut self,
        slot: Option<StmtId>,
        parent: NodeRef,
        old: NodeRef,
        new: NodeRef,
    ) -> Option<Option<StmtId>> {
        let s = slot?;
        self.sub_stmt(s, parent, old, new).map(Some)
    }

    fn sub_decl(&mut self, slot: DeclId, old: NodeRef, new: NodeRef) -> Option<DeclId> {
        (NodeRef::Decl(slot) == old).then(|| match new {
            NodeRef::Decl(d) => d,
            _ => panic!("cannot replace a declaration with {new:?}"),
        })
    }

    /// Replaces a run inside an expression sequence. The old node is either
    /// one element or a sub-list; the new node may be a single expression
    /// or a whole list.
    fn sub_exprs(
        &mut self,
        slot: ListRef<ExprId>,
        old: NodeRef,
        new: NodeRef,
    ) -> Option<ListRef<ExprId>> {
        let (first, run) = match old {
            NodeRef::Expr(e) => (e, 1),
            NodeRef::ExprList(r) if !r.is_empty() => {
                (self.arena.exprs_list(r)[0], r.len() as usize)
            }
            _ => return None,
        };
        let items: Vec<ExprId> = self.arena.exprs_list(slot).to_vec();
        let idx = items.iter().position(|&e| e == first)?;
        let mut out = Vec::with_capacity(items.len());
        out.extend_from_slice(&items[..idx]);
        match new {
            NodeRef::Expr(e) => out.push(e),
            NodeRef::ExprList(r) => out.extend_from_slice(self.arena.exprs_list(r)),
            _ => panic!("cannot splice {new:?} into an expression list"),
        }
        out.extend_from_slice(&items[idx + run..]);
        Some(self.arena.list_exprs(out))
    }

    fn sub_stmts(
        &mut self,
        slot: ListRef<StmtId>,
        parent: NodeRef,
        old: NodeRef,
        new: NodeRef,
    ) -> Option<ListRef<StmtId>> {
        let (first, run) = match old {
            NodeRef::Stmt(s) => (s, 1),
            NodeRef::StmtList(r) if !r.is_empty() => {
                (self.arena.stmts_list(r)[0], r.len() as usize)
            }
            _ => return None,
        };
        let items: Vec<StmtId> = self.arena.stmts_list(slot).to_vec();
        let idx = items.iter().position(|&s| s == first)?;
        let mut out = Vec::with_capacity(items.len());
        out.extend_from_slice(&items[..idx]);
        match new {
            NodeRef::Stmt(s) => out.push(s),
            NodeRef::Expr(_) => out.push(self.coerce_stmt(new, parent)),
            NodeRef::StmtList(r) => out.extend_from_slice(self.arena.stmts_list(r)),
            _ => panic!("cannot splice {new:?} into a statement list"),
        }
        out.extend_from_slice(&items[idx + run..]);
        Some(self.arena.list_stmts(out))
    }

    fn sub_idents(
        &mut self,
        slot: ListRef<IdentId>,
        old: NodeRef,
        new: NodeRef,
    ) -> Option<ListRef<IdentId>> {
        let (first, run) = match old {
            NodeRef::Expr(e) => (IdentId(e), 1),
            NodeRef::IdentList(r) if !r.is_empty() => {
                (self.arena.idents_list(r)[0], r.len() as usize)
            }
            _ => return None,
        };
        let items: Vec<IdentId> = self.arena.idents_list(slot).to_vec();
        let idx = items.iter().position(|&i| i == first)?;
        let mut out = Vec::with_capacity(items.len());
        out.extend_from_slice(&items[..idx]);
        match new {
            NodeRef::Expr(e) if self.arena.ident_sym(e).is_some() => out.push(IdentId(e)),
            NodeRef::IdentList(r) => out.extend_from_slice(self.arena.idents_list(r)),
            _ => panic!("cannot splice {new:?} into an identifier list"),
        }
        out.extend_from_slice(&items[idx + run..]);
        Some(self.arena.list_idents(out))
    }

    fn sub_specs(
        &mut self,
        slot: ListRef<SpecId>,
        old: NodeRef,
        new: NodeRef,
    ) -> Option<ListRef<SpecId>> {
        let (first, run) = match old {
            NodeRef::Spec(s) => (s, 1),
            NodeRef::SpecList(r) if !r.is_empty() => {
                (self.arena.specs_list(r)[0], r.len() as usize)
            }
            _ => return None,
        };
        let items: Vec<SpecId> = self.arena.specs_list(slot).to_vec();
        let idx = items.iter().position(|&s| s == first)?;
        let mut out = Vec::with_capacity(items.len());
        out.extend_from_slice(&items[..idx]);
        match new {
            NodeRef::Spec(s) => out.push(s),
            NodeRef::SpecList(r) => out.extend_from_slice(self.arena.specs_list(r)),
            _ => panic!("cannot splice {new:?} into a spec list"),
        }
        out.extend_from_slice(&items[idx + run..]);
        Some(self.arena.list_specs(out))
    }

    fn sub_decls(
        &mut self,
        slot: ListRef<DeclId>,
        old: NodeRef,
        new: NodeRef,
    ) -> Option<ListRef<DeclId>> {
        let NodeRef::Decl(first) = old else { return None };
        let items: Vec<DeclId> = self.arena.decls_list(slot).to_vec();
        let idx = items.iter().position(|&d| d == first)?;
        let mut out = items.clone();
        match new {
            NodeRef::Decl(d) => out[idx] = d,
            _ => panic!("cannot splice {new:?} into a declaration list"),
        }
        Some(self.arena.list_decls(out))
    }

    // ------------------------------------------------------------------
    // Position repair
    // ------------------------------------------------------------------

    fn set_node_span(&mut self, n: NodeRef, span: Span) {
        match n {
            NodeRef::Expr(id) => self.arena.exprs.set_span(id, span),
            NodeRef::Stmt(id) => self.arena.stmts.set_span(id, span),
            NodeRef::Decl(id) => self.arena.decls.set_span(id, span),
            NodeRef::Spec(id) => self.arena.specs.set_span(id, span),
            NodeRef::Field(id) => self.arena.fields.set_span(id, span),
            NodeRef::File(id) => self.arena.files.set_span(id, span),
            // Lists have no span of their own.
            _ => {}
        }
    }

    /// Walks the repaired region and gives every scrubbed node an empty
    /// span at the nearest preceding valid position, keeping source
    /// coordinates monotone for downstream printing.
    fn fix_positions(&mut self, root: NodeRef) {
        let start = root.span(&self.arena);
        let cursor = if start.is_none() { 0 } else { start.start };
        self.fix_rec(root, cursor);
    }

    fn fix_rec(&mut self, n: NodeRef, cursor: u32) -> u32 {
        let sp = n.span(&self.arena);
        let mut cur = cursor;
        if sp.is_none() {
            self.set_node_span(n, Span::empty_at(cur));
        } else {
            cur = cur.max(sp.start);
        }
        let mut kids = ChildVec::new();
        children(&self.arena, n, &mut kids);
        for c in kids {
            cur = self.fix_rec(c, cur);
        }
        cur
    }
}

fn collect_parents(a: &AstArena, n: NodeRef, out: &mut Vec<(NodeKey, NodeRef)>) {
    let mut kids = ChildVec::new();
    children(a, n, &mut kids);
    for c in kids {
        // A bare list root is no parent: it has no slot to splice into.
        if !n.is_list() {
            if let Some(key) = c.key(a) {
                out.push((key, n));
            }
        }
        collect_parents(a, c, out);
    }
}
