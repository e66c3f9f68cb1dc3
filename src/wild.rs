//! Wildcard lexicon and registry.
//!
//! Inside parsed patterns a wildcard is an ordinary identifier spelled
//! `gogrep_<id>`, where `<id>` indexes the registry populated while the
//! pattern was parsed. The matcher treats the prefix as opaque; everything it
//! needs to know about a wildcard lives in its [`WildInfo`] record.

use regex::Regex;
use std::collections::HashMap;

use crate::ast::{ExprId, Symbol};

/// Prefix of encoded wildcard identifiers.
pub const WILD_PREFIX: &str = "gogrep_";

/// Reserved identifier standing for "whatever this case's body is" in
/// case-list patterns.
pub const BODY_SENTINEL: &str = "gogrep_body";

/// Spells the identifier for wildcard `id`.
pub fn wild_name(id: usize) -> String {
    format!("{WILD_PREFIX}{id}")
}

/// Decodes a wildcard identifier back to its registry id. Any name without
/// the prefix, or whose suffix is not a decimal number (including the body
/// sentinel), is not a wildcard.
pub fn from_wild_name(name: &str) -> Option<usize> {
    name.strip_prefix(WILD_PREFIX)?.parse().ok()
}

pub fn is_wild_name(name: &str) -> bool {
    from_wild_name(name).is_some()
}

/// How a `type=`/`asgn=`/`conv=` constraint compares the matched expression's
/// type against the wanted type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCheckOp {
    /// `type=T`: structurally identical.
    Identical,
    /// `asgn=T`: assignable to.
    AssignableTo,
    /// `conv=T`: convertible to.
    ConvertibleTo,
}

/// Required category of the matched type's underlying type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnderlyingKind {
    Basic,
    Array,
    Slice,
    Struct,
    Interface,
    Pointer,
    Func,
    Map,
    Chan,
}

impl UnderlyingKind {
    pub fn from_keyword(kw: &str) -> Option<Self> {
        Some(match kw {
            "basic" => Self::Basic,
            "array" => Self::Array,
            "slice" => Self::Slice,
            "struct" => Self::Struct,
            "interface" => Self::Interface,
            "pointer" => Self::Pointer,
            "func" => Self::Func,
            "map" => Self::Map,
            "chan" => Self::Chan,
            _ => return None,
        })
    }
}

/// Everything the matcher knows about one wildcard occurrence class.
#[derive(Debug)]
pub struct WildInfo {
    /// Binding name; the interned `_` means "match and discard".
    pub name: Symbol,
    /// Variadic "any of" wildcard (`$*name`), legal only in list positions.
    pub any: bool,
    /// Regexes the matched identifier's name must all satisfy.
    pub name_rxs: Vec<Regex>,
    /// Type side conditions; the expression is a parsed type from the
    /// constraint list, resolved against the scope at match time.
    pub types: Vec<(TypeCheckOp, ExprId)>,
    /// `comp`: the matched expression's type must be comparable.
    pub comparable: bool,
    /// `addr`: the matched expression must be addressable.
    pub addressable: bool,
    /// Required underlying type category, if any.
    pub underlying: Option<UnderlyingKind>,
}

impl WildInfo {
    pub fn plain(name: Symbol, any: bool) -> Self {
        Self {
            name,
            any,
            name_rxs: Vec::new(),
            types: Vec::new(),
            comparable: false,
            addressable: false,
            underlying: None,
        }
    }

    /// Whether any side condition needs the matched node to be a typed
    /// expression.
    pub fn needs_expr(&self) -> bool {
        !self.types.is_empty() || self.comparable || self.addressable || self.underlying.is_some()
    }
}

/// Registry of wildcard info records, indexed by the decimal id embedded in
/// the wildcard identifier. Also keeps a symbol index so the matcher can
/// decode an interned identifier without touching string storage.
#[derive(Debug, Default)]
pub struct WildRegistry {
    infos: Vec<WildInfo>,
    by_symbol: HashMap<Symbol, usize>,
}

impl WildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record and returns its id; the caller interns the spelled
    /// name and reports the resulting symbol via [`WildRegistry::index_symbol`].
    pub fn register(&mut self, info: WildInfo) -> usize {
        self.infos.push(info);
        self.infos.len() - 1
    }

    pub fn index_symbol(&mut self, sym: Symbol, id: usize) {
        self.by_symbol.insert(sym, id);
    }

    pub fn get(&self, id: usize) -> &WildInfo {
        &self.infos[id]
    }

    /// Id of the wildcard an interned identifier encodes, if it is one.
    pub fn decode(&self, sym: Symbol) -> Option<usize> {
        self.by_symbol.get(&sym).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trip() {
        assert_eq!(wild_name(7), "gogrep_7");
        assert_eq!(from_wild_name("gogrep_7"), Some(7));
        assert_eq!(from_wild_name("gogrep_123"), Some(123));
    }

    #[test]
    fn non_wild_names_decode_to_nothing() {
        assert_eq!(from_wild_name("foo"), None);
        assert_eq!(from_wild_name("gogrep_"), None);
        assert_eq!(from_wild_name("gogrep_body"), None);
        assert_eq!(from_wild_name("gogrep_7x"), None);
        assert!(!is_wild_name(BODY_SENTINEL));
    }

    #[test]
    fn registry_decodes_by_symbol() {
        let mut interner = crate::ast::Interner::new();
        let mut reg = WildRegistry::new();
        let name = interner.intern("x");
        let id = reg.register(WildInfo::plain(name, false));
        let sym = interner.intern(&wild_name(id));
        reg.index_symbol(sym, id);
        assert_eq!(reg.decode(sym), Some(id));
        assert_eq!(reg.decode(name), None);
        assert!(!reg.get(id).any);
    }
}
