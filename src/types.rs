//! Miniature model of Go's static type system.
//!
//! Just enough structure to evaluate wildcard side conditions: identity,
//! assignability, convertibility, comparability, and underlying-category
//! queries, plus lexical scopes and package scopes for resolving the type
//! expressions written inside wildcard constraints.
//!
//! The host type-checks target files with whatever it likes and feeds the
//! results in through [`TypeInfo`]; everything here is a pure lookup at
//! match time.

use std::collections::{HashMap, HashSet};

use crate::ast::{AstArena, Expr, ExprId, Interner, NodeKey, Symbol};
use crate::error::Error;

// =============================================================================
// Types
// =============================================================================

/// Handle into a [`TypeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TypeKey(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub fn is_numeric(self) -> bool {
        use BasicKind::*;
        matches!(
            self,
            Int | Int8
                | Int16
                | Int32
                | Int64
                | Uint
                | Uint8
                | Uint16
                | Uint32
                | Uint64
                | Uintptr
                | Float32
                | Float64
                | Complex64
                | Complex128
                | UntypedInt
                | UntypedRune
                | UntypedFloat
                | UntypedComplex
        )
    }

    pub fn is_untyped(self) -> bool {
        use BasicKind::*;
        matches!(
            self,
            UntypedBool | UntypedInt | UntypedRune | UntypedFloat | UntypedComplex
                | UntypedString
                | UntypedNil
        )
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_boolean(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Basic(BasicKind),

    /// Defined type: a name plus its underlying type. Two named types are
    /// identical only when their names agree.
    Named { name: Symbol, underlying: TypeKey },

    Array { len: u64, elem: TypeKey },
    Slice { elem: TypeKey },
    Struct { fields: Vec<(Symbol, TypeKey)> },
    Pointer { elem: TypeKey },
    Func {
        params: Vec<TypeKey>,
        results: Vec<TypeKey>,
    },

    /// Method-name set; the empty set is `interface{}`.
    Interface { methods: Vec<Symbol> },

    Map { key: TypeKey, value: TypeKey },
    Chan { dir: ChanDir, elem: TypeKey },
}

/// Arena of type objects.
#[derive(Debug, Default)]
pub struct TypeStore {
    types: Vec<Type>,
}

impl TypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, t: Type) -> TypeKey {
        self.types.push(t);
        TypeKey(self.types.len() as u32 - 1)
    }

    pub fn get(&self, k: TypeKey) -> &Type {
        &self.types[k.0 as usize]
    }

    /// Chases `Named` links down to a structural type.
    pub fn underlying(&self, k: TypeKey) -> TypeKey {
        let mut k = k;
        while let Type::Named { underlying, .. } = *self.get(k) {
            k = underlying;
        }
        k
    }

    pub fn basic(&mut self, kind: BasicKind) -> TypeKey {
        self.alloc(Type::Basic(kind))
    }

    pub fn slice_of(&mut self, elem: TypeKey) -> TypeKey {
        self.alloc(Type::Slice { elem })
    }

    pub fn array_of(&mut self, len: u64, elem: TypeKey) -> TypeKey {
        self.alloc(Type::Array { len, elem })
    }

    pub fn pointer_to(&mut self, elem: TypeKey) -> TypeKey {
        self.alloc(Type::Pointer { elem })
    }

    /// Structural identity; named types compare by name.
    pub fn identical(&self, a: TypeKey, b: TypeKey) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Type::Basic(x), Type::Basic(y)) => x == y,
            (
                Type::Named { name: n1, underlying: u1 },
                Type::Named { name: n2, underlying: u2 },
            ) => n1 == n2 && self.identical(*u1, *u2),
            (Type::Array { len: l1, elem: e1 }, Type::Array { len: l2, elem: e2 }) => {
                l1 == l2 && self.identical(*e1, *e2)
            }
            (Type::Slice { elem: e1 }, Type::Slice { elem: e2 }) => self.identical(*e1, *e2),
            (Type::Struct { fields: f1 }, Type::Struct { fields: f2 }) => {
                f1.len() == f2.len()
                    && f1
                        .iter()
                        .zip(f2)
                        .all(|((n1, t1), (n2, t2))| n1 == n2 && self.identical(*t1, *t2))
            }
            (Type::Pointer { elem: e1 }, Type::Pointer { elem: e2 }) => self.identical(*e1, *e2),
            (
                Type::Func { params: p1, results: r1 },
                Type::Func { params: p2, results: r2 },
            ) => {
                p1.len() == p2.len()
                    && r1.len() == r2.len()
                    && p1.iter().zip(p2).all(|(a, b)| self.identical(*a, *b))
                    && r1.iter().zip(r2).all(|(a, b)| self.identical(*a, *b))
            }
            (Type::Interface { methods: m1 }, Type::Interface { methods: m2 }) => m1 == m2,
            (Type::Map { key: k1, value: v1 }, Type::Map { key: k2, value: v2 }) => {
                self.identical(*k1, *k2) && self.identical(*v1, *v2)
            }
            (Type::Chan { dir: d1, elem: e1 }, Type::Chan { dir: d2, elem: e2 }) => {
                d1 == d2 && self.identical(*e1, *e2)
            }
            _ => false,
        }
    }

    /// Go assignability, reduced to the cases the side conditions exercise.
    pub fn assignable_to(&self, v: TypeKey, t: TypeKey) -> bool {
        if self.identical(v, t) {
            return true;
        }
        let vu = self.underlying(v);
        let tu = self.underlying(t);
        let v_named = matches!(self.get(v), Type::Named { .. });
        let t_named = matches!(self.get(t), Type::Named { .. });

        // Identical underlying types, at least one side unnamed.
        if self.identical(vu, tu) && (!v_named || !t_named) {
            // Channels additionally require matching directions unless the
            // source is bidirectional.
            if let (Type::Chan { dir: dv, .. }, Type::Chan { dir: dt, .. }) =
                (self.get(vu), self.get(tu))
            {
                return *dv == *dt || *dv == ChanDir::Both;
            }
            return true;
        }

        // Bidirectional channel into a directional channel type.
        if let (Type::Chan { dir: ChanDir::Both, elem: ev }, Type::Chan { elem: et, .. }) =
            (self.get(vu), self.get(tu))
        {
            if self.identical(*ev, *et) && (!v_named || !t_named) {
                return true;
            }
        }

        // Interface satisfaction by method-name set.
        if let Type::Interface { methods } = self.get(tu) {
            if methods.is_empty() {
                return true;
            }
            if let Type::Interface { methods: vm } = self.get(vu) {
                return methods.iter().all(|m| vm.contains(m));
            }
            return false;
        }

        // Untyped constant defaulting.
        if let Type::Basic(bk) = self.get(vu) {
            if bk.is_untyped() {
                return match self.get(tu) {
                    Type::Basic(tb) => match bk {
                        BasicKind::UntypedBool => tb.is_boolean(),
                        BasicKind::UntypedString => tb.is_string(),
                        BasicKind::UntypedInt | BasicKind::UntypedRune => tb.is_numeric(),
                        BasicKind::UntypedFloat | BasicKind::UntypedComplex => matches!(
                            tb,
                            BasicKind::Float32
                                | BasicKind::Float64
                                | BasicKind::Complex64
                                | BasicKind::Complex128
                        ),
                        BasicKind::UntypedNil => false,
                        _ => false,
                    },
                    Type::Pointer { .. }
                    | Type::Slice { .. }
                    | Type::Map { .. }
                    | Type::Chan { .. }
                    | Type::Func { .. }
                    | Type::Interface { .. } => *bk == BasicKind::UntypedNil,
                    _ => false,
                };
            }
        }

        false
    }

    /// Go convertibility, reduced likewise.
    pub fn convertible_to(&self, v: TypeKey, t: TypeKey) -> bool {
        if self.assignable_to(v, t) {
            return true;
        }
        let vu = self.underlying(v);
        let tu = self.underlying(t);
        if self.identical(vu, tu) {
            return true;
        }
        match (self.get(vu), self.get(tu)) {
            (Type::Basic(a), Type::Basic(b)) => {
                (a.is_numeric() && b.is_numeric()) || (a.is_string() && b.is_string())
            }
            // string <-> []byte / []rune
            (Type::Basic(a), Type::Slice { elem }) if a.is_string() => {
                matches!(
                    self.get(self.underlying(*elem)),
                    Type::Basic(BasicKind::Uint8) | Type::Basic(BasicKind::Int32)
                )
            }
            (Type::Slice { elem }, Type::Basic(b)) if b.is_string() => {
                matches!(
                    self.get(self.underlying(*elem)),
                    Type::Basic(BasicKind::Uint8) | Type::Basic(BasicKind::Int32)
                )
            }
            // Pointers whose element types share an underlying type.
            (Type::Pointer { elem: e1 }, Type::Pointer { elem: e2 }) => {
                self.identical(self.underlying(*e1), self.underlying(*e2))
            }
            _ => false,
        }
    }

    pub fn comparable(&self, t: TypeKey) -> bool {
        match self.get(self.underlying(t)) {
            Type::Basic(bk) => *bk != BasicKind::UntypedNil,
            Type::Pointer { .. } | Type::Chan { .. } | Type::Interface { .. } => true,
            Type::Array { elem, .. } => self.comparable(*elem),
            Type::Struct { fields } => fields.iter().all(|(_, ft)| self.comparable(*ft)),
            Type::Slice { .. } | Type::Map { .. } | Type::Func { .. } | Type::Named { .. } => false,
        }
    }

    /// Category of the underlying type, for `basic|array|...` constraints.
    pub fn underlying_kind(&self, t: TypeKey) -> crate::wild::UnderlyingKind {
        use crate::wild::UnderlyingKind as U;
        match self.get(self.underlying(t)) {
            Type::Basic(_) => U::Basic,
            Type::Array { .. } => U::Array,
            Type::Slice { .. } => U::Slice,
            Type::Struct { .. } => U::Struct,
            Type::Interface { .. } => U::Interface,
            Type::Pointer { .. } => U::Pointer,
            Type::Func { .. } => U::Func,
            Type::Map { .. } => U::Map,
            Type::Chan { .. } => U::Chan,
            Type::Named { .. } => unreachable!("underlying chased"),
        }
    }
}

// =============================================================================
// Scopes
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ScopeKey(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PackageKey(u32);

/// What a name resolves to in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeEntry {
    /// A type, or a value whose type this is.
    Ty(TypeKey),
    /// An imported package name.
    Pkg(PackageKey),
}

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeKey>,
    names: HashMap<Symbol, ScopeEntry>,
}

#[derive(Debug)]
pub struct Package {
    pub path: String,
    pub scope: ScopeKey,
}

/// Arena of lexical scopes plus imported package scopes. Scope 0 is the
/// universe scope, pre-populated with the builtin type names.
#[derive(Debug)]
pub struct Scopes {
    scopes: Vec<Scope>,
    packages: Vec<Package>,
    universe: ScopeKey,
}

impl Scopes {
    pub fn new(store: &mut TypeStore, interner: &mut Interner) -> Self {
        let mut s = Self {
            scopes: vec![Scope::default()],
            packages: Vec::new(),
            universe: ScopeKey(0),
        };
        let builtins: &[(&str, BasicKind)] = &[
            ("bool", BasicKind::Bool),
            ("int", BasicKind::Int),
            ("int8", BasicKind::Int8),
            ("int16", BasicKind::Int16),
            ("int32", BasicKind::Int32),
            ("int64", BasicKind::Int64),
            ("uint", BasicKind::Uint),
            ("uint8", BasicKind::Uint8),
            ("uint16", BasicKind::Uint16),
            ("uint32", BasicKind::Uint32),
            ("uint64", BasicKind::Uint64),
            ("uintptr", BasicKind::Uintptr),
            ("byte", BasicKind::Uint8),
            ("rune", BasicKind::Int32),
            ("float32", BasicKind::Float32),
            ("float64", BasicKind::Float64),
            ("complex64", BasicKind::Complex64),
            ("complex128", BasicKind::Complex128),
            ("string", BasicKind::String),
        ];
        for &(name, kind) in builtins {
            let sym = interner.intern(name);
            let key = store.basic(kind);
            s.insert(s.universe, sym, ScopeEntry::Ty(key));
        }
        let any = store.alloc(Type::Interface { methods: Vec::new() });
        let any_sym = interner.intern("any");
        s.insert(s.universe, any_sym, ScopeEntry::Ty(any));
        s
    }

    pub fn universe(&self) -> ScopeKey {
        self.universe
    }

    pub fn push(&mut self, parent: ScopeKey) -> ScopeKey {
        self.scopes.push(Scope {
            parent: Some(parent),
            names: HashMap::new(),
        });
        ScopeKey(self.scopes.len() as u32 - 1)
    }

    pub fn insert(&mut self, scope: ScopeKey, name: Symbol, entry: ScopeEntry) {
        self.scopes[scope.0 as usize].names.insert(name, entry);
    }

    /// Walks the parent chain looking for `name`.
    pub fn lookup_parent(&self, scope: ScopeKey, name: Symbol) -> Option<ScopeEntry> {
        let mut cur = Some(scope);
        while let Some(k) = cur {
            let s = &self.scopes[k.0 as usize];
            if let Some(&entry) = s.names.get(&name) {
                return Some(entry);
            }
            cur = s.parent;
        }
        None
    }

    /// Looks up `name` in this scope only (used for package member access).
    pub fn lookup_local(&self, scope: ScopeKey, name: Symbol) -> Option<ScopeEntry> {
        self.scopes[scope.0 as usize].names.get(&name).copied()
    }

    pub fn add_package(&mut self, path: impl Into<String>, scope: ScopeKey) -> PackageKey {
        self.packages.push(Package {
            path: path.into(),
            scope,
        });
        PackageKey(self.packages.len() as u32 - 1)
    }

    pub fn package(&self, key: PackageKey) -> &Package {
        &self.packages[key.0 as usize]
    }

    pub fn package_by_path(&self, path: &str) -> Option<PackageKey> {
        self.packages
            .iter()
            .position(|p| p.path == path)
            .map(|i| PackageKey(i as u32))
    }
}

// =============================================================================
// Host-supplied per-file lookups
// =============================================================================

/// Type-check results for the target tree, filled by the host. All lookups
/// are pure.
#[derive(Debug, Default)]
pub struct TypeInfo {
    /// Resolved type of each typed expression.
    pub types: HashMap<ExprId, TypeKey>,
    /// Expressions the checker deemed addressable.
    pub addressable: HashSet<ExprId>,
    /// Scope attached to each scope-introducing node.
    pub scopes: HashMap<NodeKey, ScopeKey>,
}

// =============================================================================
// Imports
// =============================================================================

/// Loads a package scope for the resolver's short-name fallback.
pub trait Importer {
    fn import(
        &mut self,
        path: &str,
        store: &mut TypeStore,
        scopes: &mut Scopes,
    ) -> Option<PackageKey>;
}

/// Importer that knows nothing; every fallback import fails.
#[derive(Debug, Default)]
pub struct NoImporter;

impl Importer for NoImporter {
    fn import(&mut self, _: &str, _: &mut TypeStore, _: &mut Scopes) -> Option<PackageKey> {
        None
    }
}

/// Importer over packages registered up front, keyed by import path.
#[derive(Debug, Default)]
pub struct MapImporter;

impl Importer for MapImporter {
    fn import(
        &mut self,
        path: &str,
        _: &mut TypeStore,
        scopes: &mut Scopes,
    ) -> Option<PackageKey> {
        scopes.package_by_path(path)
    }
}

/// Canonical standard-library path for a bare package name, e.g.
/// `json` -> `encoding/json`. Data, not code, so hosts can reuse or replace
/// it wholesale.
pub static STD_IMPORT_FIXES: &[(&str, &str)] = &[
    ("adler32", "hash/adler32"),
    ("aes", "crypto/aes"),
    ("ascii85", "encoding/ascii85"),
    ("asn1", "encoding/asn1"),
    ("ast", "go/ast"),
    ("atomic", "sync/atomic"),
    ("base32", "encoding/base32"),
    ("base64", "encoding/base64"),
    ("big", "math/big"),
    ("binary", "encoding/binary"),
    ("bits", "math/bits"),
    ("build", "go/build"),
    ("bzip2", "compress/bzip2"),
    ("cgi", "net/http/cgi"),
    ("cgo", "runtime/cgo"),
    ("cipher", "crypto/cipher"),
    ("cmplx", "math/cmplx"),
    ("color", "image/color"),
    ("constant", "go/constant"),
    ("cookiejar", "net/http/cookiejar"),
    ("crc32", "hash/crc32"),
    ("crc64", "hash/crc64"),
    ("csv", "encoding/csv"),
    ("debug", "runtime/debug"),
    ("des", "crypto/des"),
    ("doc", "go/doc"),
    ("draw", "image/draw"),
    ("driver", "database/sql/driver"),
    ("dsa", "crypto/dsa"),
    ("dwarf", "debug/dwarf"),
    ("ecdsa", "crypto/ecdsa"),
    ("elf", "debug/elf"),
    ("elliptic", "crypto/elliptic"),
    ("exec", "os/exec"),
    ("fcgi", "net/http/fcgi"),
    ("filepath", "path/filepath"),
    ("flate", "compress/flate"),
    ("fnv", "hash/fnv"),
    ("format", "go/format"),
    ("gif", "image/gif"),
    ("gob", "encoding/gob"),
    ("gosym", "debug/gosym"),
    ("gzip", "compress/gzip"),
    ("heap", "container/heap"),
    ("hex", "encoding/hex"),
    ("hmac", "crypto/hmac"),
    ("http", "net/http"),
    ("httptest", "net/http/httptest"),
    ("httptrace", "net/http/httptrace"),
    ("httputil", "net/http/httputil"),
    ("importer", "go/importer"),
    ("iotest", "testing/iotest"),
    ("ioutil", "io/ioutil"),
    ("jpeg", "image/jpeg"),
    ("json", "encoding/json"),
    ("jsonrpc", "net/rpc/jsonrpc"),
    ("list", "container/list"),
    ("lzw", "compress/lzw"),
    ("macho", "debug/macho"),
    ("mail", "net/mail"),
    ("md5", "crypto/md5"),
    ("multipart", "mime/multipart"),
    ("palette", "image/color/palette"),
    ("parse", "text/template/parse"),
    ("parser", "go/parser"),
    ("pe", "debug/pe"),
    ("pem", "encoding/pem"),
    ("pkix", "crypto/x509/pkix"),
    ("plan9obj", "debug/plan9obj"),
    ("png", "image/png"),
    ("pprof", "runtime/pprof"),
    ("printer", "go/printer"),
    ("quick", "testing/quick"),
    ("quotedprintable", "mime/quotedprintable"),
    ("race", "runtime/race"),
    ("rand", "math/rand"),
    ("rc4", "crypto/rc4"),
    ("ring", "container/ring"),
    ("rpc", "net/rpc"),
    ("rsa", "crypto/rsa"),
    ("scanner", "text/scanner"),
    ("sha1", "crypto/sha1"),
    ("sha256", "crypto/sha256"),
    ("sha512", "crypto/sha512"),
    ("signal", "os/signal"),
    ("smtp", "net/smtp"),
    ("sql", "database/sql"),
    ("subtle", "crypto/subtle"),
    ("suffixarray", "index/suffixarray"),
    ("syntax", "regexp/syntax"),
    ("syslog", "log/syslog"),
    ("tabwriter", "text/tabwriter"),
    ("tar", "archive/tar"),
    ("template", "text/template"),
    ("textproto", "net/textproto"),
    ("tls", "crypto/tls"),
    ("token", "go/token"),
    ("trace", "runtime/trace"),
    ("types", "go/types"),
    ("url", "net/url"),
    ("user", "os/user"),
    ("utf16", "unicode/utf16"),
    ("utf8", "unicode/utf8"),
    ("x509", "crypto/x509"),
    ("xml", "encoding/xml"),
    ("zip", "archive/zip"),
    ("zlib", "compress/zlib"),
];

pub fn std_import_fix(short: &str) -> Option<&'static str> {
    STD_IMPORT_FIXES
        .iter()
        .find(|(s, _)| *s == short)
        .map(|(_, long)| *long)
}

// =============================================================================
// Constraint type resolution
// =============================================================================

/// Resolves the type expressions written in wildcard constraints against the
/// scope in force at the match site.
pub struct Resolver<'a> {
    pub arena: &'a AstArena,
    pub interner: &'a Interner,
    pub store: &'a mut TypeStore,
    pub scopes: &'a mut Scopes,
    pub importer: &'a mut dyn Importer,
}

impl Resolver<'_> {
    /// Resolves a pattern type expression to a type object.
    pub fn resolve(&mut self, scope: ScopeKey, expr: ExprId) -> Result<TypeKey, Error> {
        match self.arena.exprs[expr] {
            Expr::Ident(sym) => match self.scopes.lookup_parent(scope, sym) {
                Some(ScopeEntry::Ty(k)) => Ok(k),
                _ => Err(Error::Resolve {
                    name: self.interner.resolve(sym).to_string(),
                }),
            },
            Expr::ArrayType { len, elt } => {
                let elem = self.resolve(scope, elt)?;
                match len {
                    None => Ok(self.store.slice_of(elem)),
                    Some(len_expr) => {
                        let n = self.array_len(len_expr)?;
                        Ok(self.store.array_of(n, elem))
                    }
                }
            }
            Expr::Star { x } => {
                let elem = self.resolve(scope, x)?;
                Ok(self.store.pointer_to(elem))
            }
            Expr::Selector { x, sel } => {
                let pkg_scope = self.find_scope(scope, x)?;
                let sym = self
                    .arena
                    .ident_sym(sel)
                    .expect("selector member is an identifier");
                match self.scopes.lookup_local(pkg_scope, sym) {
                    Some(ScopeEntry::Ty(k)) => Ok(k),
                    _ => Err(Error::Resolve {
                        name: self.interner.resolve(sym).to_string(),
                    }),
                }
            }
            ref other => panic!("cannot resolve type from {other:?}"),
        }
    }

    /// Resolves the package half of a `pkg.Name` constraint to its scope,
    /// falling back to the standard-library short-name table for packages
    /// the pattern's scope never imported.
    fn find_scope(&mut self, scope: ScopeKey, expr: ExprId) -> Result<ScopeKey, Error> {
        let sym = match self.arena.exprs[expr] {
            Expr::Ident(sym) => sym,
            ref other => panic!("cannot resolve package from {other:?}"),
        };
        if let Some(ScopeEntry::Pkg(pkg)) = self.scopes.lookup_parent(scope, sym) {
            return Ok(self.scopes.package(pkg).scope);
        }
        let short = self.interner.resolve(sym);
        let path = std_import_fix(short).unwrap_or(short);
        match self.importer.import(path, self.store, self.scopes) {
            Some(pkg) => Ok(self.scopes.package(pkg).scope),
            None => Err(Error::UnknownImport {
                path: path.to_string(),
            }),
        }
    }

    fn array_len(&self, expr: ExprId) -> Result<u64, Error> {
        if let Expr::BasicLit {
            kind: crate::ast::LitKind::Int,
            value,
        } = self.arena.exprs[expr]
        {
            let text = self.interner.resolve(value).replace('_', "");
            let parsed = if let Some(hex) = text.strip_prefix("0x").or(text.strip_prefix("0X")) {
                u64::from_str_radix(hex, 16)
            } else if let Some(oct) = text.strip_prefix("0o").or(text.strip_prefix("0O")) {
                u64::from_str_radix(oct, 8)
            } else if let Some(bin) = text.strip_prefix("0b").or(text.strip_prefix("0B")) {
                u64::from_str_radix(bin, 2)
            } else {
                text.parse()
            };
            return parsed.map_err(|_| Error::Resolve { name: text });
        }
        panic!("array length is not an integer literal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> (TypeStore, Scopes, Interner) {
        let mut store = TypeStore::new();
        let mut interner = Interner::new();
        let scopes = Scopes::new(&mut store, &mut interner);
        (store, scopes, interner)
    }

    #[test]
    fn identical_structural() {
        let (mut store, _, _) = world();
        let int = store.basic(BasicKind::Int);
        let int2 = store.basic(BasicKind::Int);
        let s1 = store.slice_of(int);
        let s2 = store.slice_of(int2);
        assert!(store.identical(s1, s2));
        let a1 = store.array_of(3, int);
        let a2 = store.array_of(4, int);
        assert!(!store.identical(a1, a2));
    }

    #[test]
    fn named_types_compare_by_name() {
        let (mut store, _, mut interner) = world();
        let int = store.basic(BasicKind::Int);
        let a = interner.intern("Celsius");
        let b = interner.intern("Fahrenheit");
        let named_a = store.alloc(Type::Named { name: a, underlying: int });
        let named_b = store.alloc(Type::Named { name: b, underlying: int });
        assert!(!store.identical(named_a, named_b));
        assert!(store.assignable_to(named_a, int));
        assert!(store.assignable_to(int, named_a));
        assert!(!store.assignable_to(named_a, named_b));
        assert!(store.convertible_to(named_a, named_b));
    }

    #[test]
    fn untyped_constants_assign_to_numerics() {
        let (mut store, _, _) = world();
        let untyped = store.basic(BasicKind::UntypedInt);
        let f64t = store.basic(BasicKind::Float64);
        let string = store.basic(BasicKind::String);
        assert!(store.assignable_to(untyped, f64t));
        assert!(!store.assignable_to(untyped, string));
        assert!(!store.convertible_to(untyped, string));
    }

    #[test]
    fn empty_interface_accepts_everything() {
        let (mut store, _, _) = world();
        let any = store.alloc(Type::Interface { methods: Vec::new() });
        let int = store.basic(BasicKind::Int);
        let m = store.alloc(Type::Map { key: int, value: int });
        assert!(store.assignable_to(int, any));
        assert!(store.assignable_to(m, any));
    }

    #[test]
    fn comparability() {
        let (mut store, _, mut interner) = world();
        let int = store.basic(BasicKind::Int);
        let sl = store.slice_of(int);
        let arr = store.array_of(2, int);
        let arr_of_slices = store.array_of(2, sl);
        let f = interner.intern("F");
        let st = store.alloc(Type::Struct { fields: vec![(f, int)] });
        assert!(store.comparable(int));
        assert!(!store.comparable(sl));
        assert!(store.comparable(arr));
        assert!(!store.comparable(arr_of_slices));
        assert!(store.comparable(st));
    }

    #[test]
    fn std_fixes_lookup() {
        assert_eq!(std_import_fix("json"), Some("encoding/json"));
        assert_eq!(std_import_fix("rand"), Some("math/rand"));
        assert_eq!(std_import_fix("no_such_pkg"), None);
    }

    #[test]
    fn universe_resolves_builtins() {
        let (store, mut scopes, mut interner) = world();
        let int_sym = interner.intern("int");
        let entry = scopes.lookup_parent(scopes.universe(), int_sym);
        let Some(ScopeEntry::Ty(k)) = entry else {
            panic!("int missing from universe");
        };
        assert!(matches!(store.get(k), Type::Basic(BasicKind::Int)));
        let child = scopes.push(scopes.universe());
        assert!(scopes.lookup_parent(child, int_sym).is_some());
        assert!(scopes.lookup_local(child, int_sym).is_none());
    }
}
