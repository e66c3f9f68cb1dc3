//! Pattern and fragment parsing.
//!
//! Patterns are Go expressions, statements or declarations with wildcards
//! mixed in. A pattern source is tried as, in order: an expression or
//! comma-separated expression list, a statement list, then a declaration.
//! Target fragments for matching go through the same detection, and whole
//! files have their own entry point.
//!
//! `$name` and `$*name` parse into identifiers spelled `gogrep_<id>` and
//! register a wildcard info record; a constraint list after the name
//! (`$x(type=T, rx=/…/, comp, addr, basic)`) fills the record. A
//! parenthesis after a wildcard is treated as a constraint list only when
//! its first tokens look like one, so `$f($x)` stays an ordinary call.

use regex::Regex;

use crate::ast::*;
use crate::error::{Diag, Error};
use crate::lexer::{Lexer, Tok};
use crate::matcher::{Cmd, CmdName, Matcher, Pattern, Pipeline};
use crate::wild::{wild_name, TypeCheckOp, UnderlyingKind, WildInfo, WildRegistry};

type PResult<T> = Result<T, Diag>;

impl Matcher {
    /// Compiles a command list into a pipeline. Substitute commands keep
    /// their replacement source; it is re-parsed per match at substitution
    /// time.
    pub fn compile(&mut self, cmds: &[(&str, &str)]) -> Result<Pipeline, Error> {
        let mut out = Vec::new();
        for &(name, src) in cmds {
            let name =
                CmdName::parse(name).ok_or_else(|| Error::UnknownCommand(name.to_string()))?;
            let node = self.parse_pattern(src)?;
            let pat = self.wrap_pattern(node);
            let src_kept = (name == CmdName::Subst).then(|| src.to_string());
            out.push(Cmd {
                name,
                pat,
                src: src_kept,
            });
        }
        Ok(Pipeline { cmds: out })
    }

    /// Parses a pattern (or target fragment) source, detecting its shape.
    pub fn parse_pattern(&mut self, src: &str) -> Result<NodeRef, Error> {
        let (toks, lex_diags) = lex_all(src);
        let mut diags = Vec::new();

        let mut p = self.parser(src, &toks);
        match p.expr_list_pattern() {
            Ok(n) => return Ok(n),
            Err(d) => diags.push(d),
        }

        let mut p = self.parser(src, &toks);
        match p.stmt_list_pattern() {
            Ok(n) => return Ok(n),
            Err(d) => diags.push(d),
        }

        let mut p = self.parser(src, &toks);
        match p.decl_pattern() {
            Ok(n) => return Ok(n),
            Err(d) => diags.push(d),
        }

        diags.extend(lex_diags);
        Err(Error::Parse(diags))
    }

    /// Parses a whole source file.
    pub fn parse_file(&mut self, src: &str) -> Result<FileId, Error> {
        let (toks, lex_diags) = lex_all(src);
        let mut p = self.parser(src, &toks);
        match p.file() {
            Ok(f) => Ok(f),
            Err(d) => {
                let mut diags = vec![d];
                diags.extend(lex_diags);
                Err(Error::Parse(diags))
            }
        }
    }

    fn parser<'a, 'src>(
        &'a mut self,
        src: &'src str,
        toks: &'a [(usize, Tok<'src>, usize)],
    ) -> Parser<'a, 'src> {
        Parser {
            src,
            toks,
            pos: 0,
            last_end: 0,
            arena: &mut self.arena,
            interner: &mut self.interner,
            wilds: &mut self.wilds,
            allow_composite: true,
        }
    }

    /// Pre-wraps an expression pattern as a one-element expression list and
    /// a one-statement list, for matching against list-shaped roots.
    fn wrap_pattern(&mut self, node: NodeRef) -> Pattern {
        let (as_expr_list, as_stmt_list) = match node {
            NodeRef::Expr(e) => {
                let el = NodeRef::ExprList(self.arena.list_exprs([e]));
                let span = self.arena.exprs.span(e);
                let st = self.arena.stmts.alloc(Stmt::Expr(e), span);
                let sl = NodeRef::StmtList(self.arena.list_stmts([st]));
                (Some(el), Some(sl))
            }
            _ => (None, None),
        };
        Pattern {
            node,
            as_expr_list,
            as_stmt_list,
        }
    }
}

fn lex_all<'src>(src: &'src str) -> (Vec<(usize, Tok<'src>, usize)>, Vec<Diag>) {
    let mut lexer = Lexer::new(src);
    let toks: Vec<_> = lexer.by_ref().collect();
    (toks, lexer.take_diags())
}

enum SimpleOrRange {
    Stmt(StmtId),
    Range {
        key: Option<ExprId>,
        value: Option<ExprId>,
        define: bool,
        x: ExprId,
    },
}

struct Parser<'a, 'src> {
    src: &'src str,
    toks: &'a [(usize, Tok<'src>, usize)],
    pos: usize,
    last_end: usize,
    arena: &'a mut AstArena,
    interner: &'a mut Interner,
    wilds: &'a mut WildRegistry,
    allow_composite: bool,
}

impl<'a, 'src> Parser<'a, 'src> {
    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn tok(&self) -> Option<Tok<'src>> {
        self.toks.get(self.pos).map(|t| t.1)
    }

    fn tok_at(&self, off: usize) -> Option<Tok<'src>> {
        self.toks.get(self.pos + off).map(|t| t.1)
    }

    fn tok_start(&self) -> usize {
        self.toks
            .get(self.pos)
            .map(|t| t.0)
            .unwrap_or(self.src.len())
    }

    fn tok_span(&self) -> Span {
        match self.toks.get(self.pos) {
            Some(&(s, _, e)) => Span::new(s, e),
            None => Span::empty_at(self.src.len() as u32),
        }
    }

    fn bump(&mut self) -> (usize, Tok<'src>, usize) {
        let t = self.toks[self.pos];
        self.pos += 1;
        self.last_end = t.2;
        t
    }

    fn at(&self, t: Tok<'_>) -> bool {
        self.tok() == Some(t)
    }

    fn accept(&mut self, t: Tok<'_>) -> bool {
        if self.at(t) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, t: Tok<'_>, what: &str) -> PResult<Span> {
        if self.at(t) {
            let (s, _, e) = self.bump();
            Ok(Span::new(s, e))
        } else {
            Err(self.err_here(format!("expected {what}")))
        }
    }

    fn err_here(&self, msg: impl Into<String>) -> Diag {
        Diag::parse(self.tok_span(), msg)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.last_end)
    }

    fn skip_semis(&mut self) {
        while self.at(Tok::Semi) {
            self.bump();
        }
    }

    /// Consumes trailing semicolons and requires end of input.
    fn finish(&mut self) -> PResult<()> {
        self.skip_semis();
        if self.tok().is_some() {
            return Err(self.err_here("unexpected trailing tokens"));
        }
        Ok(())
    }

    fn with_composite<T>(
        &mut self,
        allow: bool,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        let saved = std::mem::replace(&mut self.allow_composite, allow);
        let r = f(self);
        self.allow_composite = saved;
        r
    }

    // ------------------------------------------------------------------
    // Pattern entry points
    // ------------------------------------------------------------------

    fn expr_list_pattern(&mut self) -> PResult<NodeRef> {
        let first = self.expr()?;
        if self.at(Tok::Comma) {
            let mut items = vec![first];
            while self.accept(Tok::Comma) {
                items.push(self.expr()?);
            }
            self.finish()?;
            return Ok(NodeRef::ExprList(self.arena.list_exprs(items)));
        }
        self.finish()?;
        Ok(NodeRef::Expr(first))
    }

    fn stmt_list_pattern(&mut self) -> PResult<NodeRef> {
        let stmts = self.stmt_list(false)?;
        self.finish()?;
        match stmts.as_slice() {
            [] => Err(self.err_here("empty pattern")),
            &[single] => match self.arena.stmts[single] {
                Stmt::Expr(e) => Ok(NodeRef::Expr(e)),
                _ => Ok(NodeRef::Stmt(single)),
            },
            _ => Ok(NodeRef::StmtList(self.arena.list_stmts(stmts))),
        }
    }

    fn decl_pattern(&mut self) -> PResult<NodeRef> {
        let d = self.decl()?;
        self.finish()?;
        Ok(NodeRef::Decl(d))
    }

    fn file(&mut self) -> PResult<FileId> {
        let start = self.tok_start();
        self.skip_semis();
        self.expect(Tok::KwPackage, "package clause")?;
        let name = self.ident()?;
        self.skip_semis();
        let mut decls = Vec::new();
        while self.tok().is_some() {
            decls.push(self.decl()?);
            self.skip_semis();
        }
        let decls = self.arena.list_decls(decls);
        Ok(self
            .arena
            .files
            .alloc(File { name, decls }, self.span_from(start)))
    }

    fn decl(&mut self) -> PResult<DeclId> {
        match self.tok() {
            Some(Tok::KwImport) | Some(Tok::KwConst) | Some(Tok::KwType) | Some(Tok::KwVar) => {
                self.gen_decl()
            }
            Some(Tok::KwFunc) => self.func_decl(),
            _ => Err(self.err_here("expected declaration")),
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self) -> PResult<ExprId> {
        self.binary(1)
    }

    fn expr_list(&mut self) -> PResult<Vec<ExprId>> {
        let mut items = vec![self.expr()?];
        while self.accept(Tok::Comma) {
            items.push(self.expr()?);
        }
        Ok(items)
    }

    fn peek_binop(&self) -> Option<BinaryOp> {
        Some(match self.tok()? {
            Tok::LOr => BinaryOp::LOr,
            Tok::LAnd => BinaryOp::LAnd,
            Tok::EqEq => BinaryOp::Eq,
            Tok::NotEq => BinaryOp::Ne,
            Tok::Lt => BinaryOp::Lt,
            Tok::Le => BinaryOp::Le,
            Tok::Gt => BinaryOp::Gt,
            Tok::Ge => BinaryOp::Ge,
            Tok::Plus => BinaryOp::Add,
            Tok::Minus => BinaryOp::Sub,
            Tok::Pipe => BinaryOp::Or,
            Tok::Caret => BinaryOp::Xor,
            Tok::Star => BinaryOp::Mul,
            Tok::Slash => BinaryOp::Div,
            Tok::Percent => BinaryOp::Mod,
            Tok::Shl => BinaryOp::Shl,
            Tok::Shr => BinaryOp::Shr,
            Tok::Amp => BinaryOp::And,
            Tok::AndNot => BinaryOp::AndNot,
            _ => return None,
        })
    }

    fn binary(&mut self, min_prec: u8) -> PResult<ExprId> {
        let start = self.tok_start();
        let mut x = self.unary()?;
        while let Some(op) = self.peek_binop() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let y = self.binary(prec + 1)?;
            x = self
                .arena
                .exprs
                .alloc(Expr::Binary { x, op, y }, self.span_from(start));
        }
        Ok(x)
    }

    fn unary(&mut self) -> PResult<ExprId> {
        let start = self.tok_start();
        let op = match self.tok() {
            Some(Tok::Plus) => Some(UnaryOp::Add),
            Some(Tok::Minus) => Some(UnaryOp::Sub),
            Some(Tok::Bang) => Some(UnaryOp::Not),
            Some(Tok::Caret) => Some(UnaryOp::Xor),
            Some(Tok::Amp) => Some(UnaryOp::Addr),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let x = self.unary()?;
            return Ok(self
                .arena
                .exprs
                .alloc(Expr::Unary { op, x }, self.span_from(start)));
        }
        match self.tok() {
            Some(Tok::Star) => {
                self.bump();
                let x = self.unary()?;
                return Ok(self
                    .arena
                    .exprs
                    .alloc(Expr::Star { x }, self.span_from(start)));
            }
            Some(Tok::Arrow) => {
                self.bump();
                if self.at(Tok::KwChan) {
                    self.bump();
                    let value = self.unary()?;
                    return Ok(self.arena.exprs.alloc(
                        Expr::ChanType {
                            dir: ChanDir::Recv,
                            value,
                        },
                        self.span_from(start),
                    ));
                }
                let x = self.unary()?;
                return Ok(self.arena.exprs.alloc(
                    Expr::Unary {
                        op: UnaryOp::Recv,
                        x,
                    },
                    self.span_from(start),
                ));
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> PResult<ExprId> {
        let start = self.tok_start();
        let mut x = self.operand()?;
        loop {
            match self.tok() {
                Some(Tok::Dot) => {
                    self.bump();
                    if self.accept(Tok::LParen) {
                        let typ = if self.accept(Tok::KwType) {
                            None
                        } else {
                            Some(self.with_composite(true, |p| p.unary())?)
                        };
                        self.expect(Tok::RParen, "`)` after type assertion")?;
                        x = self
                            .arena
                            .exprs
                            .alloc(Expr::TypeAssert { x, typ }, self.span_from(start));
                    } else {
                        let sel = self.ident()?;
                        x = self
                            .arena
                            .exprs
                            .alloc(Expr::Selector { x, sel }, self.span_from(start));
                    }
                }
                Some(Tok::LParen) => {
                    self.bump();
                    let (args, ellipsis) = self.with_composite(true, |p| p.call_args())?;
                    self.expect(Tok::RParen, "`)` after arguments")?;
                    let args = self.arena.list_exprs(args);
                    x = self.arena.exprs.alloc(
                        Expr::Call {
                            fun: x,
                            args,
                            ellipsis,
                        },
                        self.span_from(start),
                    );
                }
                Some(Tok::LBrack) => {
                    self.bump();
                    x = self.with_composite(true, |p| p.index_or_slice(x, start))?;
                }
                Some(Tok::LBrace) if self.allow_composite && self.can_compose(x) => {
                    x = self.composite_body(Some(x), start)?;
                }
                _ => break,
            }
        }
        Ok(x)
    }

    fn call_args(&mut self) -> PResult<(Vec<ExprId>, bool)> {
        let mut args = Vec::new();
        let mut ellipsis = false;
        if self.at(Tok::RParen) {
            return Ok((args, ellipsis));
        }
        loop {
            args.push(self.expr()?);
            if self.accept(Tok::Ellipsis) {
                ellipsis = true;
                self.accept(Tok::Comma);
                break;
            }
            if !self.accept(Tok::Comma) {
                break;
            }
            if self.at(Tok::RParen) {
                break; // trailing comma
            }
        }
        Ok((args, ellipsis))
    }

    fn index_or_slice(&mut self, x: ExprId, start: usize) -> PResult<ExprId> {
        let low = if self.at(Tok::Colon) {
            None
        } else {
            Some(self.expr()?)
        };
        if self.accept(Tok::Colon) {
            let high = if self.at(Tok::Colon) || self.at(Tok::RBrack) {
                None
            } else {
                Some(self.expr()?)
            };
            let max = if self.accept(Tok::Colon) {
                Some(self.expr()?)
            } else {
                None
            };
            self.expect(Tok::RBrack, "`]` after slice")?;
            return Ok(self
                .arena
                .exprs
                .alloc(Expr::Slice { x, low, high, max }, self.span_from(start)));
        }
        let index = low.ok_or_else(|| self.err_here("expected index expression"))?;
        self.expect(Tok::RBrack, "`]` after index")?;
        Ok(self
            .arena
            .exprs
            .alloc(Expr::Index { x, index }, self.span_from(start)))
    }

    /// Operands a composite literal may follow: syntactic type forms.
    fn can_compose(&self, x: ExprId) -> bool {
        matches!(
            self.arena.exprs[x],
            Expr::Ident(_)
                | Expr::Selector { .. }
                | Expr::ArrayType { .. }
                | Expr::MapType { .. }
                | Expr::StructType { .. }
        )
    }

    fn composite_body(&mut self, typ: Option<ExprId>, start: usize) -> PResult<ExprId> {
        self.expect(Tok::LBrace, "`{` of composite literal")?;
        let mut elts = Vec::new();
        self.with_composite(true, |p| {
            while !p.at(Tok::RBrace) {
                elts.push(p.lit_element()?);
                if !p.accept(Tok::Comma) {
                    break;
                }
            }
            Ok(())
        })?;
        self.skip_semis();
        self.expect(Tok::RBrace, "`}` of composite literal")?;
        let elts = self.arena.list_exprs(elts);
        Ok(self
            .arena
            .exprs
            .alloc(Expr::CompositeLit { typ, elts }, self.span_from(start)))
    }

    fn lit_element(&mut self) -> PResult<ExprId> {
        let start = self.tok_start();
        if self.at(Tok::LBrace) {
            return self.composite_body(None, start);
        }
        let e = self.expr()?;
        if self.accept(Tok::Colon) {
            let value = self.lit_element()?;
            return Ok(self
                .arena
                .exprs
                .alloc(Expr::KeyValue { key: e, value }, self.span_from(start)));
        }
        Ok(e)
    }

    fn operand(&mut self) -> PResult<ExprId> {
        let start = self.tok_start();
        match self.tok() {
            Some(Tok::Ident(name)) => {
                self.bump();
                let sym = self.interner.intern(name);
                Ok(self
                    .arena
                    .exprs
                    .alloc(Expr::Ident(sym), self.span_from(start)))
            }
            Some(Tok::IntLit(text)) => self.basic_lit(LitKind::Int, text),
            Some(Tok::FloatLit(text)) => self.basic_lit(LitKind::Float, text),
            Some(Tok::ImagLit(text)) => self.basic_lit(LitKind::Imag, text),
            Some(Tok::RuneLit(text)) => self.basic_lit(LitKind::Rune, text),
            Some(Tok::StringLit(text)) | Some(Tok::RawStringLit(text)) => {
                self.basic_lit(LitKind::String, text)
            }
            Some(Tok::Dollar) => self.wildcard(),
            Some(Tok::LParen) => {
                self.bump();
                let x = self.with_composite(true, |p| p.expr())?;
                self.expect(Tok::RParen, "`)`")?;
                Ok(self
                    .arena
                    .exprs
                    .alloc(Expr::Paren { x }, self.span_from(start)))
            }
            Some(Tok::KwFunc) => self.func_type_or_lit(),
            Some(Tok::LBrack) => self.array_type(),
            Some(Tok::KwMap) => self.map_type(),
            Some(Tok::KwChan) => {
                self.bump();
                let dir = if self.accept(Tok::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                let value = self.unary()?;
                Ok(self
                    .arena
                    .exprs
                    .alloc(Expr::ChanType { dir, value }, self.span_from(start)))
            }
            Some(Tok::KwStruct) => self.struct_type(),
            Some(Tok::KwInterface) => self.interface_type(),
            Some(Tok::Ellipsis) => {
                self.bump();
                let elt = if self.at_type_start() {
                    Some(self.unary()?)
                } else {
                    None
                };
                Ok(self
                    .arena
                    .exprs
                    .alloc(Expr::Ellipsis { elt }, self.span_from(start)))
            }
            _ => Err(self.err_here("expected expression")),
        }
    }

    fn basic_lit(&mut self, kind: LitKind, text: &str) -> PResult<ExprId> {
        let start = self.tok_start();
        self.bump();
        let value = self.interner.intern(text);
        Ok(self
            .arena
            .exprs
            .alloc(Expr::BasicLit { kind, value }, self.span_from(start)))
    }

    fn ident(&mut self) -> PResult<ExprId> {
        let start = self.tok_start();
        match self.tok() {
            Some(Tok::Ident(name)) => {
                self.bump();
                let sym = self.interner.intern(name);
                Ok(self
                    .arena
                    .exprs
                    .alloc(Expr::Ident(sym), self.span_from(start)))
            }
            Some(Tok::Dollar) => self.wildcard(),
            _ => Err(self.err_here("expected identifier")),
        }
    }

    fn at_type_start(&self) -> bool {
        matches!(
            self.tok(),
            Some(Tok::Ident(_))
                | Some(Tok::Dollar)
                | Some(Tok::LBrack)
                | Some(Tok::Star)
                | Some(Tok::Arrow)
                | Some(Tok::KwMap)
                | Some(Tok::KwChan)
                | Some(Tok::KwFunc)
                | Some(Tok::KwStruct)
                | Some(Tok::KwInterface)
                | Some(Tok::LParen)
        )
    }

    // ------------------------------------------------------------------
    // Type syntax
    // ------------------------------------------------------------------

    fn array_type(&mut self) -> PResult<ExprId> {
        let start = self.tok_start();
        self.expect(Tok::LBrack, "`[`")?;
        let len = if self.at(Tok::RBrack) {
            None
        } else if self.at(Tok::Ellipsis) {
            let estart = self.tok_start();
            self.bump();
            Some(
                self.arena
                    .exprs
                    .alloc(Expr::Ellipsis { elt: None }, self.span_from(estart)),
            )
        } else {
            Some(self.with_composite(true, |p| p.expr())?)
        };
        self.expect(Tok::RBrack, "`]` of array type")?;
        let elt = self.unary()?;
        Ok(self
            .arena
            .exprs
            .alloc(Expr::ArrayType { len, elt }, self.span_from(start)))
    }

    fn map_type(&mut self) -> PResult<ExprId> {
        let start = self.tok_start();
        self.expect(Tok::KwMap, "`map`")?;
        self.expect(Tok::LBrack, "`[` of map type")?;
        let key = self.with_composite(true, |p| p.unary())?;
        self.expect(Tok::RBrack, "`]` of map type")?;
        let value = self.unary()?;
        Ok(self
            .arena
            .exprs
            .alloc(Expr::MapType { key, value }, self.span_from(start)))
    }

    fn struct_type(&mut self) -> PResult<ExprId> {
        let start = self.tok_start();
        self.expect(Tok::KwStruct, "`struct`")?;
        self.expect(Tok::LBrace, "`{` of struct type")?;
        let mut fields = Vec::new();
        loop {
            self.skip_semis();
            if self.at(Tok::RBrace) {
                break;
            }
            fields.push(self.struct_field()?);
        }
        self.expect(Tok::RBrace, "`}` of struct type")?;
        let fields = self.arena.list_fields(fields);
        Ok(self
            .arena
            .exprs
            .alloc(Expr::StructType { fields }, self.span_from(start)))
    }

    fn struct_field(&mut self) -> PResult<FieldId> {
        let start = self.tok_start();
        let mut exprs = vec![self.unary()?];
        while self.accept(Tok::Comma) {
            exprs.push(self.unary()?);
        }
        let field = if self.at(Tok::Semi) || self.at(Tok::RBrace) {
            // Embedded field.
            if exprs.len() != 1 {
                return Err(self.err_here("embedded field cannot list names"));
            }
            Field {
                names: ListRef::EMPTY,
                typ: exprs[0],
            }
        } else {
            let typ = self.unary()?;
            // Struct tags carry no matching weight; accept and drop.
            if let Some(Tok::StringLit(_)) | Some(Tok::RawStringLit(_)) = self.tok() {
                self.bump();
            }
            let names = self.idents_from(exprs)?;
            Field { names, typ }
        };
        self.accept(Tok::Semi);
        Ok(self.arena.fields.alloc(field, self.span_from(start)))
    }

    fn interface_type(&mut self) -> PResult<ExprId> {
        let start = self.tok_start();
        self.expect(Tok::KwInterface, "`interface`")?;
        self.expect(Tok::LBrace, "`{` of interface type")?;
        let mut methods = Vec::new();
        loop {
            self.skip_semis();
            if self.at(Tok::RBrace) {
                break;
            }
            let fstart = self.tok_start();
            let method_like = matches!(self.tok(), Some(Tok::Ident(_)))
                && self.tok_at(1) == Some(Tok::LParen);
            let field = if method_like {
                let name = self.ident()?;
                let typ = self.signature(fstart)?;
                let names = self.arena.list_idents([IdentId(name)]);
                Field { names, typ }
            } else {
                Field {
                    names: ListRef::EMPTY,
                    typ: self.unary()?,
                }
            };
            methods.push(self.arena.fields.alloc(field, self.span_from(fstart)));
            self.accept(Tok::Semi);
        }
        self.expect(Tok::RBrace, "`}` of interface type")?;
        let methods = self.arena.list_fields(methods);
        Ok(self
            .arena
            .exprs
            .alloc(Expr::InterfaceType { methods }, self.span_from(start)))
    }

    /// `(params) [results]` starting at the parameter parenthesis.
    fn signature(&mut self, start: usize) -> PResult<ExprId> {
        let params = self.param_list()?;
        let results = self.results()?;
        Ok(self
            .arena
            .exprs
            .alloc(Expr::FuncType { params, results }, self.span_from(start)))
    }

    fn func_type_or_lit(&mut self) -> PResult<ExprId> {
        let start = self.tok_start();
        self.expect(Tok::KwFunc, "`func`")?;
        let typ = self.signature(start)?;
        if self.at(Tok::LBrace) {
            let body = self.block()?;
            return Ok(self
                .arena
                .exprs
                .alloc(Expr::FuncLit { typ, body }, self.span_from(start)));
        }
        Ok(typ)
    }

    fn param_list(&mut self) -> PResult<ListRef<FieldId>> {
        self.expect(Tok::LParen, "`(` of parameter list")?;
        let mut fields = Vec::new();
        let mut pending: Vec<ExprId> = Vec::new();
        loop {
            if self.accept(Tok::RParen) {
                // Everything pending is an unnamed type.
                for e in pending.drain(..) {
                    let span = self.arena.exprs.span(e);
                    fields.push(self.arena.fields.alloc(
                        Field {
                            names: ListRef::EMPTY,
                            typ: e,
                        },
                        span,
                    ));
                }
                break;
            }
            let fstart = self.tok_start();
            let e = self.with_composite(true, |p| p.unary())?;
            match self.tok() {
                Some(Tok::Comma) => {
                    self.bump();
                    pending.push(e);
                }
                Some(Tok::RParen) => {
                    pending.push(e);
                }
                _ => {
                    // A type follows: pending entries plus `e` are its names.
                    let typ = self.with_composite(true, |p| p.unary())?;
                    pending.push(e);
                    let names = self.idents_from(std::mem::take(&mut pending))?;
                    fields.push(
                        self.arena
                            .fields
                            .alloc(Field { names, typ }, self.span_from(fstart)),
                    );
                    if !self.accept(Tok::Comma) {
                        self.expect(Tok::RParen, "`)` of parameter list")?;
                        break;
                    }
                }
            }
        }
        Ok(self.arena.list_fields(fields))
    }

    fn results(&mut self) -> PResult<Option<ListRef<FieldId>>> {
        if self.at(Tok::LParen) {
            return Ok(Some(self.param_list()?));
        }
        if self.at_type_start() {
            let start = self.tok_start();
            let typ = self.unary()?;
            let field = self.arena.fields.alloc(
                Field {
                    names: ListRef::EMPTY,
                    typ,
                },
                self.span_from(start),
            );
            return Ok(Some(self.arena.list_fields([field])));
        }
        Ok(None)
    }

    fn idents_from(&mut self, exprs: Vec<ExprId>) -> PResult<ListRef<IdentId>> {
        let mut ids = Vec::with_capacity(exprs.len());
        for e in exprs {
            if self.arena.ident_sym(e).is_none() {
                return Err(self.err_here("expected identifier"));
            }
            ids.push(IdentId(e));
        }
        Ok(self.arena.list_idents(ids))
    }

    // ------------------------------------------------------------------
    // Wildcards
    // ------------------------------------------------------------------

    fn wildcard(&mut self) -> PResult<ExprId> {
        let (start, _, _) = self.bump(); // `$`
        let any = self.accept(Tok::Star);
        let name = match self.tok() {
            Some(Tok::Ident(name)) => {
                self.bump();
                name
            }
            _ => return Err(self.err_here("expected wildcard name after `$`")),
        };
        let name_sym = self.interner.intern(name);
        let mut info = WildInfo::plain(name_sym, any);
        if self.at(Tok::LParen) && self.constraints_follow() {
            self.wild_constraints(&mut info)?;
        }
        let id = self.wilds.register(info);
        let encoded = self.interner.intern(&wild_name(id));
        self.wilds.index_symbol(encoded, id);
        Ok(self
            .arena
            .exprs
            .alloc(Expr::Ident(encoded), self.span_from(start)))
    }

    /// Distinguishes `$x(type=T, …)` from a call `$x(a, b)` by looking at
    /// the first token inside the parenthesis.
    fn constraints_follow(&self) -> bool {
        match self.tok_at(1) {
            // type=/asgn=/conv=/rx= need an `=` right after.
            Some(Tok::KwType) => self.tok_at(2) == Some(Tok::Assign),
            Some(Tok::Ident("asgn")) | Some(Tok::Ident("conv")) | Some(Tok::Ident("rx")) => {
                self.tok_at(2) == Some(Tok::Assign)
            }
            // Flags stand alone.
            Some(Tok::Ident("comp"))
            | Some(Tok::Ident("addr"))
            | Some(Tok::Ident("basic"))
            | Some(Tok::Ident("array"))
            | Some(Tok::Ident("slice"))
            | Some(Tok::Ident("pointer"))
            | Some(Tok::KwStruct)
            | Some(Tok::KwInterface)
            | Some(Tok::KwFunc)
            | Some(Tok::KwMap)
            | Some(Tok::KwChan) => matches!(
                self.tok_at(2),
                Some(Tok::Comma) | Some(Tok::RParen)
            ),
            _ => false,
        }
    }

    fn wild_constraints(&mut self, info: &mut WildInfo) -> PResult<()> {
        self.expect(Tok::LParen, "`(` of wildcard constraints")?;
        loop {
            match self.tok() {
                Some(Tok::KwType) => {
                    self.bump();
                    self.expect(Tok::Assign, "`=` after type")?;
                    let t = self.with_composite(false, |p| p.unary())?;
                    info.types.push((TypeCheckOp::Identical, t));
                }
                Some(Tok::Ident("asgn")) => {
                    self.bump();
                    self.expect(Tok::Assign, "`=` after asgn")?;
                    let t = self.with_composite(false, |p| p.unary())?;
                    info.types.push((TypeCheckOp::AssignableTo, t));
                }
                Some(Tok::Ident("conv")) => {
                    self.bump();
                    self.expect(Tok::Assign, "`=` after conv")?;
                    let t = self.with_composite(false, |p| p.unary())?;
                    info.types.push((TypeCheckOp::ConvertibleTo, t));
                }
                Some(Tok::Ident("rx")) => {
                    self.bump();
                    self.expect(Tok::Assign, "`=` after rx")?;
                    let rx = self.regex_literal()?;
                    info.name_rxs.push(rx);
                }
                Some(Tok::Ident("comp")) => {
                    self.bump();
                    info.comparable = true;
                }
                Some(Tok::Ident("addr")) => {
                    self.bump();
                    info.addressable = true;
                }
                Some(Tok::Ident(kw)) if UnderlyingKind::from_keyword(kw).is_some() => {
                    self.bump();
                    info.underlying = UnderlyingKind::from_keyword(kw);
                }
                Some(Tok::KwStruct) => {
                    self.bump();
                    info.underlying = Some(UnderlyingKind::Struct);
                }
                Some(Tok::KwInterface) => {
                    self.bump();
                    info.underlying = Some(UnderlyingKind::Interface);
                }
                Some(Tok::KwFunc) => {
                    self.bump();
                    info.underlying = Some(UnderlyingKind::Func);
                }
                Some(Tok::KwMap) => {
                    self.bump();
                    info.underlying = Some(UnderlyingKind::Map);
                }
                Some(Tok::KwChan) => {
                    self.bump();
                    info.underlying = Some(UnderlyingKind::Chan);
                }
                _ => return Err(self.err_here("expected wildcard constraint")),
            }
            if !self.accept(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::RParen, "`)` of wildcard constraints")?;
        Ok(())
    }

    /// `/…/` scanned from the raw source, since a regex body rarely lexes
    /// as Go tokens. `\/` escapes the delimiter.
    fn regex_literal(&mut self) -> PResult<Regex> {
        let open = self.tok_start();
        let bytes = self.src.as_bytes();
        if bytes.get(open) != Some(&b'/') {
            return Err(self.err_here("expected `/` opening a regex"));
        }
        let mut text = String::new();
        let mut i = open + 1;
        let close = loop {
            match bytes.get(i) {
                None => {
                    return Err(Diag::parse(
                        Span::new(open, self.src.len()),
                        "unterminated regex",
                    ))
                }
                Some(&b'/') => break i,
                Some(&b'\\') if bytes.get(i + 1) == Some(&b'/') => {
                    text.push('/');
                    i += 2;
                }
                Some(&b) => {
                    text.push(b as char);
                    i += 1;
                }
            }
        };
        // Re-sync the token cursor past the closing delimiter.
        while self
            .toks
            .get(self.pos)
            .is_some_and(|&(s, _, _)| s <= close)
        {
            self.bump();
        }
        self.last_end = close + 1;
        Regex::new(&text)
            .map_err(|e| Diag::parse(Span::new(open, close + 1), format!("bad regex: {e}")))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block(&mut self) -> PResult<StmtId> {
        let start = self.tok_start();
        self.expect(Tok::LBrace, "`{` of block")?;
        let stmts = self.with_composite(true, |p| p.stmt_list(true))?;
        self.expect(Tok::RBrace, "`}` of block")?;
        let stmts = self.arena.list_stmts(stmts);
        Ok(self
            .arena
            .stmts
            .alloc(Stmt::Block { stmts }, self.span_from(start)))
    }

    /// Statements up to end of input, or to `}`/`case`/`default` when
    /// `closed` (inside a block or clause body).
    fn stmt_list(&mut self, closed: bool) -> PResult<Vec<StmtId>> {
        let mut stmts = Vec::new();
        loop {
            self.skip_semis();
            match self.tok() {
                None => break,
                Some(Tok::RBrace) | Some(Tok::KwCase) | Some(Tok::KwDefault) if closed => break,
                _ => stmts.push(self.stmt()?),
            }
        }
        Ok(stmts)
    }

    fn stmt(&mut self) -> PResult<StmtId> {
        let start = self.tok_start();
        match self.tok() {
            Some(Tok::KwIf) => self.if_stmt(),
            Some(Tok::KwFor) => self.for_stmt(),
            Some(Tok::KwSwitch) => self.switch_stmt(),
            Some(Tok::KwSelect) => self.select_stmt(),
            Some(Tok::LBrace) => self.block(),
            Some(Tok::KwReturn) => {
                self.bump();
                let results = if matches!(self.tok(), None | Some(Tok::Semi) | Some(Tok::RBrace))
                {
                    Vec::new()
                } else {
                    self.expr_list()?
                };
                let results = self.arena.list_exprs(results);
                Ok(self
                    .arena
                    .stmts
                    .alloc(Stmt::Return { results }, self.span_from(start)))
            }
            Some(Tok::KwGo) => {
                self.bump();
                let call = self.expr()?;
                Ok(self
                    .arena
                    .stmts
                    .alloc(Stmt::Go { call }, self.span_from(start)))
            }
            Some(Tok::KwDefer) => {
                self.bump();
                let call = self.expr()?;
                Ok(self
                    .arena
                    .stmts
                    .alloc(Stmt::Defer { call }, self.span_from(start)))
            }
            Some(Tok::KwBreak) | Some(Tok::KwContinue) => {
                let tok = if self.at(Tok::KwBreak) {
                    BranchTok::Break
                } else {
                    BranchTok::Continue
                };
                self.bump();
                let label = if matches!(self.tok(), Some(Tok::Ident(_))) {
                    Some(self.ident()?)
                } else {
                    None
                };
                Ok(self
                    .arena
                    .stmts
                    .alloc(Stmt::Branch { tok, label }, self.span_from(start)))
            }
            Some(Tok::KwGoto) => {
                self.bump();
                let label = Some(self.ident()?);
                Ok(self.arena.stmts.alloc(
                    Stmt::Branch {
                        tok: BranchTok::Goto,
                        label,
                    },
                    self.span_from(start),
                ))
            }
            Some(Tok::KwFallthrough) => {
                self.bump();
                Ok(self.arena.stmts.alloc(
                    Stmt::Branch {
                        tok: BranchTok::Fallthrough,
                        label: None,
                    },
                    self.span_from(start),
                ))
            }
            Some(Tok::KwVar) | Some(Tok::KwConst) | Some(Tok::KwType) => {
                let d = self.gen_decl()?;
                Ok(self
                    .arena
                    .stmts
                    .alloc(Stmt::Decl(d), self.span_from(start)))
            }
            _ => match self.simple_stmt(false, true)? {
                SimpleOrRange::Stmt(s) => Ok(s),
                SimpleOrRange::Range { .. } => Err(self.err_here("range outside for statement")),
            },
        }
    }

    fn simple_stmt(&mut self, allow_range: bool, allow_label: bool) -> PResult<SimpleOrRange> {
        let start = self.tok_start();
        let first = self.expr()?;

        match self.tok() {
            Some(Tok::Colon) if allow_label && self.arena.ident_sym(first).is_some() => {
                self.bump();
                let stmt = self.stmt()?;
                return Ok(SimpleOrRange::Stmt(self.arena.stmts.alloc(
                    Stmt::Labeled { label: first, stmt },
                    self.span_from(start),
                )));
            }
            Some(Tok::Arrow) => {
                self.bump();
                let value = self.expr()?;
                return Ok(SimpleOrRange::Stmt(self.arena.stmts.alloc(
                    Stmt::Send { chan: first, value },
                    self.span_from(start),
                )));
            }
            Some(Tok::Inc) | Some(Tok::Dec) => {
                let op = if self.at(Tok::Inc) {
                    IncDecOp::Inc
                } else {
                    IncDecOp::Dec
                };
                self.bump();
                return Ok(SimpleOrRange::Stmt(self.arena.stmts.alloc(
                    Stmt::IncDec { x: first, op },
                    self.span_from(start),
                )));
            }
            _ => {}
        }

        let mut lhs = vec![first];
        while self.accept(Tok::Comma) {
            lhs.push(self.expr()?);
        }
        let Some(op) = self.peek_assign_op() else {
            if lhs.len() == 1 {
                return Ok(SimpleOrRange::Stmt(
                    self.arena
                        .stmts
                        .alloc(Stmt::Expr(first), self.span_from(start)),
                ));
            }
            return Err(self.err_here("expected assignment after expression list"));
        };
        self.bump();

        if allow_range && self.accept(Tok::KwRange) {
            if !matches!(op, AssignOp::Assign | AssignOp::Define) {
                return Err(self.err_here("range requires `=` or `:=`"));
            }
            if lhs.len() > 2 {
                return Err(self.err_here("too many variables in range clause"));
            }
            let x = self.expr()?;
            return Ok(SimpleOrRange::Range {
                key: lhs.first().copied(),
                value: lhs.get(1).copied(),
                define: op == AssignOp::Define,
                x,
            });
        }

        let rhs = self.expr_list()?;
        let lhs = self.arena.list_exprs(lhs);
        let rhs = self.arena.list_exprs(rhs);
        Ok(SimpleOrRange::Stmt(self.arena.stmts.alloc(
            Stmt::Assign { lhs, op, rhs },
            self.span_from(start),
        )))
    }

    fn peek_assign_op(&self) -> Option<AssignOp> {
        Some(match self.tok()? {
            Tok::Assign => AssignOp::Assign,
            Tok::Define => AssignOp::Define,
            Tok::AddAssign => AssignOp::AddAssign,
            Tok::SubAssign => AssignOp::SubAssign,
            Tok::MulAssign => AssignOp::MulAssign,
            Tok::DivAssign => AssignOp::DivAssign,
            Tok::ModAssign => AssignOp::ModAssign,
            Tok::AndAssign => AssignOp::AndAssign,
            Tok::OrAssign => AssignOp::OrAssign,
            Tok::XorAssign => AssignOp::XorAssign,
            Tok::ShlAssign => AssignOp::ShlAssign,
            Tok::ShrAssign => AssignOp::ShrAssign,
            Tok::AndNotAssign => AssignOp::AndNotAssign,
            _ => return None,
        })
    }

    fn stmt_expr(&mut self, s: StmtId, what: &str) -> PResult<ExprId> {
        match self.arena.stmts[s] {
            Stmt::Expr(e) => Ok(e),
            _ => Err(self.err_here(format!("expected {what}"))),
        }
    }

    fn if_stmt(&mut self) -> PResult<StmtId> {
        let start = self.tok_start();
        self.expect(Tok::KwIf, "`if`")?;
        let (init, cond) = self.with_composite(false, |p| {
            let first = match p.simple_stmt(false, false)? {
                SimpleOrRange::Stmt(s) => s,
                SimpleOrRange::Range { .. } => unreachable!("range disallowed here"),
            };
            if p.accept(Tok::Semi) {
                let cond_stmt = match p.simple_stmt(false, false)? {
                    SimpleOrRange::Stmt(s) => s,
                    SimpleOrRange::Range { .. } => unreachable!("range disallowed here"),
                };
                let cond = p.stmt_expr(cond_stmt, "if condition")?;
                Ok((Some(first), cond))
            } else {
                let cond = p.stmt_expr(first, "if condition")?;
                Ok((None, cond))
            }
        })?;
        let body = self.block()?;
        let els = if self.accept(Tok::KwElse) {
            if self.at(Tok::KwIf) {
                Some(self.if_stmt()?)
            } else {
                Some(self.block()?)
            }
        } else {
            None
        };
        Ok(self.arena.stmts.alloc(
            Stmt::If {
                init,
                cond,
                body,
                els,
            },
            self.span_from(start),
        ))
    }

    fn for_stmt(&mut self) -> PResult<StmtId> {
        let start = self.tok_start();
        self.expect(Tok::KwFor, "`for`")?;

        if self.at(Tok::LBrace) {
            let body = self.block()?;
            return Ok(self.arena.stmts.alloc(
                Stmt::For {
                    init: None,
                    cond: None,
                    post: None,
                    body,
                },
                self.span_from(start),
            ));
        }

        // `for range x { ... }`
        if self.at(Tok::KwRange) {
            let x = self.with_composite(false, |p| {
                p.bump();
                p.expr()
            })?;
            let body = self.block()?;
            return Ok(self.arena.stmts.alloc(
                Stmt::Range {
                    key: None,
                    value: None,
                    define: false,
                    x,
                    body,
                },
                self.span_from(start),
            ));
        }

        let header = self.with_composite(false, |p| {
            let first = p.simple_stmt(true, false)?;
            if let SimpleOrRange::Range { .. } = first {
                return Ok((first, None, None, false));
            }
            if p.at(Tok::Semi) {
                p.bump();
                let cond = if p.at(Tok::Semi) {
                    None
                } else {
                    Some(p.expr()?)
                };
                p.expect(Tok::Semi, "`;` in for header")?;
                let post = if p.at(Tok::LBrace) {
                    None
                } else {
                    match p.simple_stmt(false, false)? {
                        SimpleOrRange::Stmt(s) => Some(s),
                        SimpleOrRange::Range { .. } => unreachable!("range disallowed here"),
                    }
                };
                Ok((first, cond, post, true))
            } else {
                Ok((first, None, None, false))
            }
        })?;

        let body = self.block()?;
        match header {
            (SimpleOrRange::Range { key, value, define, x }, ..) => Ok(self.arena.stmts.alloc(
                Stmt::Range {
                    key,
                    value,
                    define,
                    x,
                    body,
                },
                self.span_from(start),
            )),
            (SimpleOrRange::Stmt(s), cond, post, three_clause) => {
                if three_clause {
                    return Ok(self.arena.stmts.alloc(
                        Stmt::For {
                            init: Some(s),
                            cond,
                            post,
                            body,
                        },
                        self.span_from(start),
                    ));
                }
                // Single-clause form: the statement is the condition.
                let cond = self.stmt_expr(s, "for condition")?;
                Ok(self.arena.stmts.alloc(
                    Stmt::For {
                        init: None,
                        cond: Some(cond),
                        post: None,
                        body,
                    },
                    self.span_from(start),
                ))
            }
        }
    }

    /// Whether a parsed simple statement is a `x.(type)` type-switch guard.
    fn is_guard(&self, s: StmtId) -> bool {
        let is_type_assert = |e: ExprId| {
            matches!(self.arena.exprs[e], Expr::TypeAssert { typ: None, .. })
        };
        match self.arena.stmts[s] {
            Stmt::Expr(e) => is_type_assert(e),
            Stmt::Assign { rhs, .. } => {
                let rhs = self.arena.exprs_list(rhs);
                rhs.len() == 1 && is_type_assert(rhs[0])
            }
            _ => false,
        }
    }

    fn switch_stmt(&mut self) -> PResult<StmtId> {
        let start = self.tok_start();
        self.expect(Tok::KwSwitch, "`switch`")?;

        let mut init = None;
        let mut guard = None;
        let mut tag = None;
        if !self.at(Tok::LBrace) {
            self.with_composite(false, |p| {
                let first = match p.simple_stmt(false, false)? {
                    SimpleOrRange::Stmt(s) => s,
                    SimpleOrRange::Range { .. } => unreachable!("range disallowed here"),
                };
                let subject = if p.accept(Tok::Semi) {
                    init = Some(first);
                    if p.at(Tok::LBrace) {
                        return Ok(());
                    }
                    match p.simple_stmt(false, false)? {
                        SimpleOrRange::Stmt(s) => s,
                        SimpleOrRange::Range { .. } => unreachable!("range disallowed here"),
                    }
                } else {
                    first
                };
                if p.is_guard(subject) {
                    guard = Some(subject);
                } else {
                    tag = Some(p.stmt_expr(subject, "switch condition")?);
                }
                Ok(())
            })?;
        }

        let bstart = self.tok_start();
        self.expect(Tok::LBrace, "`{` of switch body")?;
        let mut clauses = Vec::new();
        loop {
            self.skip_semis();
            if self.at(Tok::RBrace) {
                break;
            }
            clauses.push(self.case_clause()?);
        }
        self.expect(Tok::RBrace, "`}` of switch body")?;
        let stmts = self.arena.list_stmts(clauses);
        let body = self
            .arena
            .stmts
            .alloc(Stmt::Block { stmts }, self.span_from(bstart));

        let node = match guard {
            Some(assign) => Stmt::TypeSwitch { init, assign, body },
            None => Stmt::Switch { init, tag, body },
        };
        Ok(self.arena.stmts.alloc(node, self.span_from(start)))
    }

    fn case_clause(&mut self) -> PResult<StmtId> {
        let start = self.tok_start();
        let list = if self.accept(Tok::KwCase) {
            self.expr_list()?
        } else {
            self.expect(Tok::KwDefault, "`case` or `default`")?;
            Vec::new()
        };
        self.expect(Tok::Colon, "`:` after case")?;
        let mut body = self.stmt_list(true)?;
        self.inject_body_sentinel(&list, &mut body);
        let list = self.arena.list_exprs(list);
        let body = self.arena.list_stmts(body);
        Ok(self
            .arena
            .stmts
            .alloc(Stmt::Case { list, body }, self.span_from(start)))
    }

    fn select_stmt(&mut self) -> PResult<StmtId> {
        let start = self.tok_start();
        self.expect(Tok::KwSelect, "`select`")?;
        let bstart = self.tok_start();
        self.expect(Tok::LBrace, "`{` of select body")?;
        let mut clauses = Vec::new();
        loop {
            self.skip_semis();
            if self.at(Tok::RBrace) {
                break;
            }
            clauses.push(self.comm_clause()?);
        }
        self.expect(Tok::RBrace, "`}` of select body")?;
        let stmts = self.arena.list_stmts(clauses);
        let body = self
            .arena
            .stmts
            .alloc(Stmt::Block { stmts }, self.span_from(bstart));
        Ok(self
            .arena
            .stmts
            .alloc(Stmt::Select { body }, self.span_from(start)))
    }

    fn comm_clause(&mut self) -> PResult<StmtId> {
        let start = self.tok_start();
        let comm = if self.accept(Tok::KwCase) {
            match self.simple_stmt(false, false)? {
                SimpleOrRange::Stmt(s) => Some(s),
                SimpleOrRange::Range { .. } => unreachable!("range disallowed here"),
            }
        } else {
            self.expect(Tok::KwDefault, "`case` or `default`")?;
            None
        };
        self.expect(Tok::Colon, "`:` after case")?;
        let mut body = self.stmt_list(true)?;
        if let Some(c) = comm {
            if let Stmt::Expr(e) = self.arena.stmts[c] {
                let items = [e];
                self.inject_body_sentinel(&items, &mut body);
            }
        }
        let body = self.arena.list_stmts(body);
        Ok(self
            .arena
            .stmts
            .alloc(Stmt::Comm { comm, body }, self.span_from(start)))
    }

    /// A clause like `case $*x:` with an empty body stands for "any body":
    /// inject the body sentinel so the matcher's case-list sugar applies.
    fn inject_body_sentinel(&mut self, items: &[ExprId], body: &mut Vec<StmtId>) {
        if !body.is_empty() || items.len() != 1 {
            return;
        }
        let Some(sym) = self.arena.ident_sym(items[0]) else {
            return;
        };
        let Some(id) = self.wilds.decode(sym) else {
            return;
        };
        if !self.wilds.get(id).any {
            return;
        }
        let span = self.arena.exprs.span(items[0]);
        let sentinel_sym = self.interner.intern(crate::wild::BODY_SENTINEL);
        let sentinel = self.arena.exprs.alloc(Expr::Ident(sentinel_sym), span);
        body.push(self.arena.stmts.alloc(Stmt::Expr(sentinel), span));
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn gen_decl(&mut self) -> PResult<DeclId> {
        let start = self.tok_start();
        let tok = match self.tok() {
            Some(Tok::KwImport) => DeclTok::Import,
            Some(Tok::KwConst) => DeclTok::Const,
            Some(Tok::KwType) => DeclTok::Type,
            Some(Tok::KwVar) => DeclTok::Var,
            _ => return Err(self.err_here("expected declaration keyword")),
        };
        self.bump();

        let mut specs = Vec::new();
        if self.accept(Tok::LParen) {
            loop {
                self.skip_semis();
                if self.at(Tok::RParen) {
                    break;
                }
                specs.push(self.spec(tok)?);
            }
            self.expect(Tok::RParen, "`)` of declaration group")?;
        } else {
            specs.push(self.spec(tok)?);
        }
        let specs = self.arena.list_specs(specs);
        Ok(self
            .arena
            .decls
            .alloc(Decl::Gen { tok, specs }, self.span_from(start)))
    }

    fn spec(&mut self, tok: DeclTok) -> PResult<SpecId> {
        let start = self.tok_start();
        let spec = match tok {
            DeclTok::Import => {
                let name = match self.tok() {
                    Some(Tok::Ident(_)) => Some(self.ident()?),
                    Some(Tok::Dot) => {
                        let (s, _, e) = self.bump();
                        let sym = self.interner.intern(".");
                        Some(self.arena.exprs.alloc(Expr::Ident(sym), Span::new(s, e)))
                    }
                    _ => None,
                };
                let path = match self.tok() {
                    Some(Tok::StringLit(text)) | Some(Tok::RawStringLit(text)) => {
                        self.basic_lit(LitKind::String, text)?
                    }
                    _ => return Err(self.err_here("expected import path string")),
                };
                Spec::Import { name, path }
            }
            DeclTok::Const | DeclTok::Var => {
                let mut names = vec![self.ident()?];
                while self.accept(Tok::Comma) {
                    names.push(self.ident()?);
                }
                let names = self.idents_from(names)?;
                let typ = if self.at_type_start() && !self.at(Tok::LParen) {
                    Some(self.unary()?)
                } else {
                    None
                };
                let values = if self.accept(Tok::Assign) {
                    self.expr_list()?
                } else {
                    Vec::new()
                };
                let values = self.arena.list_exprs(values);
                Spec::Value {
                    names,
                    typ,
                    values,
                }
            }
            DeclTok::Type => {
                let name = self.ident()?;
                let alias = self.accept(Tok::Assign);
                let typ = self.unary()?;
                Spec::Type { name, alias, typ }
            }
        };
        self.accept(Tok::Semi);
        Ok(self.arena.specs.alloc(spec, self.span_from(start)))
    }

    fn func_decl(&mut self) -> PResult<DeclId> {
        let start = self.tok_start();
        self.expect(Tok::KwFunc, "`func`")?;
        let recv = if self.at(Tok::LParen) {
            Some(self.param_list()?)
        } else {
            None
        };
        let name = self.ident()?;
        let tstart = self.tok_start();
        let typ = self.signature(tstart)?;
        let body = if self.at(Tok::LBrace) {
            Some(self.block()?)
        } else {
            None
        };
        Ok(self.arena.decls.alloc(
            Decl::Func {
                recv,
                name,
                typ,
                body,
            },
            self.span_from(start),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::matcher::Matcher;

    fn parse(src: &str) -> (Matcher, NodeRef) {
        let mut m = Matcher::new();
        let n = m
            .parse_pattern(src)
            .unwrap_or_else(|e| panic!("parse {src:?}: {e}"));
        (m, n)
    }

    #[test]
    fn detects_expression() {
        let (m, n) = parse("a + b*c");
        let NodeRef::Expr(e) = n else {
            panic!("expected expression, got {n:?}")
        };
        assert!(matches!(m.arena.exprs[e], Expr::Binary { op: BinaryOp::Add, .. }));
    }

    #[test]
    fn detects_expression_list() {
        let (_, n) = parse("$*_, b, $*_");
        assert!(matches!(n, NodeRef::ExprList(r) if r.len() == 3));
    }

    #[test]
    fn detects_statement_list() {
        let (_, n) = parse("x := 1; y := 2");
        assert!(matches!(n, NodeRef::StmtList(r) if r.len() == 2));
    }

    #[test]
    fn detects_single_statement() {
        let (m, n) = parse("if $x { $*_ }");
        let NodeRef::Stmt(s) = n else {
            panic!("expected statement, got {n:?}")
        };
        assert!(matches!(m.arena.stmts[s], Stmt::If { .. }));
    }

    #[test]
    fn detects_declaration() {
        let (m, n) = parse("func f(x int) int { return x }");
        let NodeRef::Decl(d) = n else {
            panic!("expected declaration, got {n:?}")
        };
        assert!(matches!(m.arena.decls[d], Decl::Func { .. }));
    }

    #[test]
    fn wildcard_constraint_vs_call() {
        // A constraint list fills the info record and leaves a bare ident.
        let (m, n) = parse("$x(comp, addr)");
        let NodeRef::Expr(e) = n else { panic!() };
        let sym = m.arena.ident_sym(e).expect("wildcard collapses to ident");
        let id = m.wilds.decode(sym).expect("registered wildcard");
        assert!(m.wilds.get(id).comparable);
        assert!(m.wilds.get(id).addressable);

        // An ordinary argument list stays a call.
        let (m, n) = parse("$f($x)");
        let NodeRef::Expr(e) = n else { panic!() };
        assert!(matches!(m.arena.exprs[e], Expr::Call { .. }));
    }

    #[test]
    fn wildcard_regex_constraint() {
        let (m, n) = parse("$x(rx=/^New/)");
        let NodeRef::Expr(e) = n else { panic!() };
        let id = m.wilds.decode(m.arena.ident_sym(e).unwrap()).unwrap();
        let info = m.wilds.get(id);
        assert_eq!(info.name_rxs.len(), 1);
        assert!(info.name_rxs[0].is_match("NewReader"));
        assert!(!info.name_rxs[0].is_match("OldReader"));
    }

    #[test]
    fn parses_control_flow() {
        let (m, n) = parse("for i := 0; i < 10; i++ { f(i) }");
        let NodeRef::Stmt(s) = n else { panic!() };
        let Stmt::For { init, cond, post, .. } = m.arena.stmts[s] else {
            panic!("expected for, got {:?}", m.arena.stmts[s]);
        };
        assert!(init.is_some() && cond.is_some() && post.is_some());
    }

    #[test]
    fn parses_type_switch() {
        let (m, n) = parse("switch x := y.(type) { case int: f() }");
        let NodeRef::Stmt(s) = n else { panic!() };
        assert!(matches!(m.arena.stmts[s], Stmt::TypeSwitch { .. }));
    }

    #[test]
    fn parses_select() {
        let (m, n) = parse("select { case ch <- x: f(); default: g() }");
        let NodeRef::Stmt(s) = n else { panic!() };
        assert!(matches!(m.arena.stmts[s], Stmt::Select { .. }));
    }

    #[test]
    fn composite_restriction_in_headers() {
        // `T{}` must not swallow the if body.
        let (m, n) = parse("if x == y { f() }");
        let NodeRef::Stmt(s) = n else { panic!() };
        assert!(matches!(m.arena.stmts[s], Stmt::If { .. }));
    }

    #[test]
    fn parses_file() {
        let mut m = Matcher::new();
        let f = m
            .parse_file(
                r#"
package main

import "fmt"

var debug = false

func main() {
    fmt.Println("hello")
}
"#,
            )
            .expect("file parses");
        let file = m.arena.files[f];
        assert_eq!(file.decls.len(), 3);
    }

    #[test]
    fn case_sentinel_injection() {
        let (m, n) = parse("switch $_ { case $*a: case $*b: }");
        let NodeRef::Stmt(s) = n else { panic!() };
        let Stmt::Switch { body, .. } = m.arena.stmts[s] else {
            panic!()
        };
        let Stmt::Block { stmts } = m.arena.stmts[body] else {
            panic!()
        };
        for &clause in m.arena.stmts_list(stmts) {
            let Stmt::Case { body, .. } = m.arena.stmts[clause] else {
                panic!()
            };
            assert_eq!(body.len(), 1, "sentinel body injected");
        }
    }
}
