//! Go token stream (Logos) with automatic semicolon insertion.
//!
//! The raw Logos enum recognizes individual tokens; the [`Lexer`] wrapper
//! implements Go's semicolon rule (a newline after certain tokens yields a
//! `;`), skips trivia, and yields `(start, token, end)` triples. Pattern
//! sources additionally use `$` to introduce wildcards, which plain Go never
//! lexes.

use logos::{Lexer as LogosLexer, Logos};
use std::ops::Range;

use crate::ast::Span;
use crate::error::{Diag, LexErrorKind};

#[inline]
fn lex_block_comment(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let rem = lex.remainder().as_bytes();
    match rem.windows(2).position(|w| w == b"*/") {
        Some(pos) => {
            lex.bump(pos + 2);
            Ok(())
        }
        None => {
            lex.bump(rem.len());
            Err(LexErrorKind::UnterminatedComment)
        }
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[\t\x0C\v ]+")]
#[rustfmt::skip]
enum RawTok {
    // Trivia
    #[regex(r"\r\n|\n|\r")] Newline,
    #[regex(r"//[^\n\r]*", logos::skip)] _LineComment,
    #[token("/*", lex_block_comment)] BlockComment,

    // Keywords (before Ident)
    #[token("break")] KwBreak,
    #[token("case")] KwCase,
    #[token("chan")] KwChan,
    #[token("const")] KwConst,
    #[token("continue")] KwContinue,
    #[token("default")] KwDefault,
    #[token("defer")] KwDefer,
    #[token("else")] KwElse,
    #[token("fallthrough")] KwFallthrough,
    #[token("for")] KwFor,
    #[token("func")] KwFunc,
    #[token("go")] KwGo,
    #[token("goto")] KwGoto,
    #[token("if")] KwIf,
    #[token("import")] KwImport,
    #[token("interface")] KwInterface,
    #[token("map")] KwMap,
    #[token("package")] KwPackage,
    #[token("range")] KwRange,
    #[token("return")] KwReturn,
    #[token("select")] KwSelect,
    #[token("struct")] KwStruct,
    #[token("switch")] KwSwitch,
    #[token("type")] KwType,
    #[token("var")] KwVar,

    // Identifiers (Go spec: letter = '_' or Unicode letter; digit = Unicode Nd)
    #[regex(r"[_\p{L}][_\p{L}\p{Nd}]*")] Ident,

    // Numeric literals; longest match picks the right class
    #[regex(r"0[xX][0-9a-fA-F_]+|0[oO][0-7_]+|0[bB][01_]+|[0-9][0-9_]*")] Int,
    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?|[0-9][0-9_]*[eE][+-]?[0-9]+|\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")] Float,
    #[regex(r"([0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?|\.[0-9][0-9_]*([eE][+-]?[0-9]+)?)i")] Imag,

    // Strings / runes
    #[regex(r"`[^`]*`")] RawString,
    #[regex(r#""([^"\\\n\r]|\\.)*""#)] String,
    #[regex(r"'([^'\\\n\r]|\\.)+'")] Rune,

    // Wildcard marker (pattern sources only)
    #[token("$")] Dollar,

    // Operators (multi-char first)
    #[token("...")] Ellipsis,
    #[token("<<=")] ShlAssign,
    #[token(">>=")] ShrAssign,
    #[token("&^=")] AndNotAssign,
    #[token("+=")] AddAssign,
    #[token("-=")] SubAssign,
    #[token("*=")] MulAssign,
    #[token("/=")] DivAssign,
    #[token("%=")] ModAssign,
    #[token("&=")] AndAssign,
    #[token("|=")] OrAssign,
    #[token("^=")] XorAssign,
    #[token("<<")] Shl,
    #[token(">>")] Shr,
    #[token("&^")] AndNot,
    #[token("&&")] LAnd,
    #[token("||")] LOr,
    #[token("==")] EqEq,
    #[token("!=")] NotEq,
    #[token("<=")] Le,
    #[token(">=")] Ge,
    #[token("++")] Inc,
    #[token("--")] Dec,
    #[token(":=")] Define,
    #[token("<-")] Arrow,
    #[token("=")] Assign,
    #[token("+")] Plus,
    #[token("-")] Minus,
    #[token("*")] Star,
    #[token("/")] Slash,
    #[token("%")] Percent,
    #[token("&")] Amp,
    #[token("|")] Pipe,
    #[token("^")] Caret,
    #[token("~")] Tilde,
    #[token("!")] Bang,
    #[token("<")] Lt,
    #[token(">")] Gt,

    // Delimiters
    #[token("(")] LParen,
    #[token(")")] RParen,
    #[token("[")] LBrack,
    #[token("]")] RBrack,
    #[token("{")] LBrace,
    #[token("}")] RBrace,
    #[token(",")] Comma,
    #[token(";")] Semi,
    #[token(":")] Colon,
    #[token(".")] Dot,

    // Catch-all (low priority so Logos stays unambiguous)
    #[regex(r".", priority = 0)] Error,
}

impl RawTok {
    /// Tokens after which a newline inserts a semicolon (Go spec rule 1).
    const fn can_insert_semicolon(self) -> bool {
        matches!(
            self,
            RawTok::Ident
                | RawTok::Int
                | RawTok::Float
                | RawTok::Imag
                | RawTok::Rune
                | RawTok::String
                | RawTok::RawString
                | RawTok::KwBreak
                | RawTok::KwContinue
                | RawTok::KwFallthrough
                | RawTok::KwReturn
                | RawTok::Inc
                | RawTok::Dec
                | RawTok::RParen
                | RawTok::RBrack
                | RawTok::RBrace
        )
    }

    fn to_token(self, slice: &str) -> Tok<'_> {
        use RawTok as R;
        use Tok as T;
        match self {
            R::Ident => T::Ident(slice),
            R::Int => T::IntLit(slice),
            R::Float => T::FloatLit(slice),
            R::Imag => T::ImagLit(slice),
            R::Rune => T::RuneLit(slice),
            R::String => T::StringLit(slice),
            R::RawString => T::RawStringLit(slice),
            R::KwBreak => T::KwBreak,
            R::KwCase => T::KwCase,
            R::KwChan => T::KwChan,
            R::KwConst => T::KwConst,
            R::KwContinue => T::KwContinue,
            R::KwDefault => T::KwDefault,
            R::KwDefer => T::KwDefer,
            R::KwElse => T::KwElse,
            R::KwFallthrough => T::KwFallthrough,
            R::KwFor => T::KwFor,
            R::KwFunc => T::KwFunc,
            R::KwGo => T::KwGo,
            R::KwGoto => T::KwGoto,
            R::KwIf => T::KwIf,
            R::KwImport => T::KwImport,
            R::KwInterface => T::KwInterface,
            R::KwMap => T::KwMap,
            R::KwPackage => T::KwPackage,
            R::KwRange => T::KwRange,
            R::KwReturn => T::KwReturn,
            R::KwSelect => T::KwSelect,
            R::KwStruct => T::KwStruct,
            R::KwSwitch => T::KwSwitch,
            R::KwType => T::KwType,
            R::KwVar => T::KwVar,
            R::Dollar => T::Dollar,
            R::Ellipsis => T::Ellipsis,
            R::ShlAssign => T::ShlAssign,
            R::ShrAssign => T::ShrAssign,
            R::AndNotAssign => T::AndNotAssign,
            R::AddAssign => T::AddAssign,
            R::SubAssign => T::SubAssign,
            R::MulAssign => T::MulAssign,
            R::DivAssign => T::DivAssign,
            R::ModAssign => T::ModAssign,
            R::AndAssign => T::AndAssign,
            R::OrAssign => T::OrAssign,
            R::XorAssign => T::XorAssign,
            R::Shl => T::Shl,
            R::Shr => T::Shr,
            R::AndNot => T::AndNot,
            R::LAnd => T::LAnd,
            R::LOr => T::LOr,
            R::EqEq => T::EqEq,
            R::NotEq => T::NotEq,
            R::Le => T::Le,
            R::Ge => T::Ge,
            R::Inc => T::Inc,
            R::Dec => T::Dec,
            R::Define => T::Define,
            R::Arrow => T::Arrow,
            R::Assign => T::Assign,
            R::Plus => T::Plus,
            R::Minus => T::Minus,
            R::Star => T::Star,
            R::Slash => T::Slash,
            R::Percent => T::Percent,
            R::Amp => T::Amp,
            R::Pipe => T::Pipe,
            R::Caret => T::Caret,
            R::Tilde => T::Tilde,
            R::Bang => T::Bang,
            R::Lt => T::Lt,
            R::Gt => T::Gt,
            R::LParen => T::LParen,
            R::RParen => T::RParen,
            R::LBrack => T::LBrack,
            R::RBrack => T::RBrack,
            R::LBrace => T::LBrace,
            R::RBrace => T::RBrace,
            R::Comma => T::Comma,
            R::Semi => T::Semi,
            R::Colon => T::Colon,
            R::Dot => T::Dot,
            R::Newline | R::_LineComment | R::BlockComment | R::Error => T::Error,
        }
    }
}

/// Public token. Payload tokens borrow the source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tok<'input> {
    Ident(&'input str),
    IntLit(&'input str),
    FloatLit(&'input str),
    ImagLit(&'input str),
    RuneLit(&'input str),
    StringLit(&'input str),
    RawStringLit(&'input str),

    KwBreak,
    KwCase,
    KwChan,
    KwConst,
    KwContinue,
    KwDefault,
    KwDefer,
    KwElse,
    KwFallthrough,
    KwFor,
    KwFunc,
    KwGo,
    KwGoto,
    KwIf,
    KwImport,
    KwInterface,
    KwMap,
    KwPackage,
    KwRange,
    KwReturn,
    KwSelect,
    KwStruct,
    KwSwitch,
    KwType,
    KwVar,

    Dollar,

    Ellipsis,
    ShlAssign,
    ShrAssign,
    AndNotAssign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    EqEq,
    NotEq,
    Le,
    Ge,
    Inc,
    Dec,
    Define,
    Arrow,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Lt,
    Gt,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Colon,
    Dot,

    Error,
}

impl std::fmt::Display for Tok<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Token iterator with semicolon insertion. Yields `(start, tok, end)`;
/// inserted semicolons have `start == end`.
pub struct Lexer<'src> {
    logos: LogosLexer<'src, RawTok>,
    pending: Option<(usize, Tok<'src>, usize)>,
    diags: Vec<Diag>,
    last_can_insert_semi: bool,
    src_len: usize,
    eof_done: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(input: &'src str) -> Self {
        Self {
            logos: RawTok::lexer(input),
            pending: None,
            diags: Vec::new(),
            last_can_insert_semi: false,
            src_len: input.len(),
            eof_done: false,
        }
    }

    pub fn take_diags(&mut self) -> Vec<Diag> {
        std::mem::take(&mut self.diags)
    }

    #[inline]
    fn push_lex_diag(&mut self, kind: LexErrorKind, span: Range<usize>) {
        self.diags
            .push(Diag::lex(Span::new(span.start, span.end), kind.to_string()));
    }

    #[inline]
    fn emit_semi_at(&mut self, pos: usize) {
        self.pending = Some((pos, Tok::Semi, pos));
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = (usize, Tok<'src>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tok) = self.pending.take() {
                return Some(tok);
            }
            if self.eof_done {
                return None;
            }
            match self.logos.next() {
                None => {
                    self.eof_done = true;
                    if self.last_can_insert_semi {
                        self.last_can_insert_semi = false;
                        self.emit_semi_at(self.src_len);
                        continue;
                    }
                    return None;
                }

                Some(Err(kind)) => {
                    let span = self.logos.span();
                    self.push_lex_diag(kind, span.clone());
                    self.last_can_insert_semi = false;
                    return Some((span.start, Tok::Error, span.end));
                }

                Some(Ok(raw)) => {
                    let span = self.logos.span();
                    match raw {
                        RawTok::Newline => {
                            if self.last_can_insert_semi {
                                self.last_can_insert_semi = false;
                                self.emit_semi_at(span.start);
                            }
                            continue;
                        }
                        RawTok::BlockComment => {
                            // A block comment spanning lines acts as a newline.
                            if self.last_can_insert_semi
                                && self.logos.slice().contains(['\n', '\r'])
                            {
                                self.last_can_insert_semi = false;
                                self.emit_semi_at(span.start);
                            }
                            continue;
                        }
                        RawTok::Error => {
                            self.push_lex_diag(LexErrorKind::InvalidToken, span.clone());
                            self.last_can_insert_semi = false;
                            return Some((span.start, Tok::Error, span.end));
                        }
                        _ => {}
                    }
                    self.last_can_insert_semi = raw.can_insert_semicolon();
                    let tok = raw.to_token(self.logos.slice());
                    return Some((span.start, tok, span.end));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok<'_>> {
        Lexer::new(src).map(|(_, t, _)| t).collect()
    }

    #[test]
    fn basic_tokens() {
        assert_eq!(
            toks("a + 3"),
            vec![Tok::Ident("a"), Tok::Plus, Tok::IntLit("3"), Tok::Semi]
        );
    }

    #[test]
    fn wildcard_tokens() {
        assert_eq!(
            toks("$*x"),
            vec![Tok::Dollar, Tok::Star, Tok::Ident("x"), Tok::Semi]
        );
    }

    #[test]
    fn semicolon_insertion_after_newline() {
        let got = toks("x := 1\ny++");
        assert_eq!(
            got,
            vec![
                Tok::Ident("x"),
                Tok::Define,
                Tok::IntLit("1"),
                Tok::Semi,
                Tok::Ident("y"),
                Tok::Inc,
                Tok::Semi,
            ]
        );
    }

    #[test]
    fn no_semicolon_after_operators() {
        let got = toks("x +\ny");
        assert_eq!(
            got,
            vec![Tok::Ident("x"), Tok::Plus, Tok::Ident("y"), Tok::Semi]
        );
    }

    #[test]
    fn inserted_semis_are_empty_spans() {
        let got: Vec<_> = Lexer::new("f()\n").collect();
        let (s, t, e) = *got.last().unwrap();
        assert_eq!(t, Tok::Semi);
        assert_eq!(s, e);
    }

    #[test]
    fn number_classes() {
        assert_eq!(
            toks("1 2.5 3i 0x1F"),
            vec![
                Tok::IntLit("1"),
                Tok::FloatLit("2.5"),
                Tok::ImagLit("3i"),
                Tok::IntLit("0x1F"),
                Tok::Semi,
            ]
        );
    }

    #[test]
    fn comments_are_trivia() {
        assert_eq!(
            toks("a // trailing\n/* block */ b"),
            vec![Tok::Ident("a"), Tok::Semi, Tok::Ident("b"), Tok::Semi]
        );
    }
}
