//! Structural search and replace for Go source fragments.
//!
//! Patterns are ordinary Go expressions, statements or declarations with
//! wildcards mixed in: `$x` binds one node, `$*x` binds any run of list
//! elements, `$_`/`$*_` match without binding. Wildcards take side
//! conditions on the matched identifier's name (`rx=/…/`) and on the
//! matched expression's static type (`type=`/`asgn=`/`conv=`, `comp`,
//! `addr`, and underlying-category flags).
//!
//! Commands compose into a pipeline: `x` ranges over every matching
//! sub-node, `g`/`v` keep inputs with/without a match, and `s` rewrites
//! each match in place from a replacement pattern.
//!
//! ```
//! use gogrep::Matcher;
//!
//! let mut m = Matcher::new();
//! let pipeline = m.compile(&[("x", "$x + $x")]).unwrap();
//! let target = m.parse_pattern("a + a").unwrap();
//! let matches = m.run(&pipeline, target).unwrap();
//! assert_eq!(matches.len(), 1);
//! ```
//!
//! Parsing of targets is bundled for convenience, but type-checking is
//! not: hosts supply type facts about the target tree through
//! [`types::TypeInfo`], and everything the matcher asks of them is a pure
//! lookup.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod matcher;
pub mod parse;
pub mod subst;
pub mod types;
pub mod walk;
pub mod wild;

pub use ast::{AstArena, NodeRef, Span};
pub use error::Error;
pub use matcher::{Cmd, CmdName, Lenience, Match, Matcher, Pattern, Pipeline};
pub use types::{Importer, TypeInfo};
