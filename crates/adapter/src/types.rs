//! Declared-type descriptors and the generic-bound helpers built on them.
//!
//! A [`DeclaredType`] describes a type as it was written in a service
//! declaration: a raw class, a parameterized generic, or a wildcard bound used
//! as a type argument. Nothing here inspects live values; every answer is a
//! pure function over the descriptor.
//!
//! Descriptors parse from and display as source-like text:
//!
//! | Text | Descriptor |
//! |------|------------|
//! | `Repo` | `Raw(Repo)` |
//! | `Callback<Repo>` | `Parameterized { Callback, [Raw(Repo)] }` |
//! | `Callback<? extends Repo>` | argument is `UpperBounded(Raw(Repo))` |
//! | `Callback<? super Repo>` | argument is `LowerBounded(Raw(Repo))` |
//! | `Callback<?>` | argument is `UpperBounded(Raw(Any))` |
//! | `()` | `Raw(())`, the "no value" return type |

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::TypeError;

// ---------------------------------------------------------------------------
// Raw classes
// ---------------------------------------------------------------------------

/// Identity of a raw (erased) type.
///
/// Two class ids are equal when their names are equal. Ids for Rust types are
/// taken from [`std::any::type_name`]; ids for declarations that arrive as
/// text use the name as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(Cow<'static, str>);

impl ClassId {
    /// The built-in consumer shape handled by the default strategy.
    pub const CALLBACK: ClassId = ClassId::from_static("Callback");

    /// The "no value" type. Matches `ClassId::of::<()>()`.
    pub const UNIT: ClassId = ClassId::from_static("()");

    /// Implicit upper bound of an unbounded or lower-bounded wildcard.
    pub const ANY: ClassId = ClassId::from_static("Any");

    /// Creates a class id from a static name. Usable in `const` items.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a class id from a runtime name, returning `None` if it is empty.
    pub fn named(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() {
            None
        } else {
            Some(Self(Cow::Owned(name)))
        }
    }

    /// Returns the erased class id of a Rust type.
    ///
    /// Generic arguments are dropped, so `Vec<u8>` and `Vec<String>` share the
    /// id `alloc::vec::Vec`. Names the declaration grammar cannot express, such
    /// as references or tuples, are kept as [`std::any::type_name`] reports them.
    pub fn of<T: ?Sized + 'static>() -> Self {
        let name = std::any::type_name::<T>();
        Self(Cow::Borrowed(name.split_once('<').map_or(name, |(raw, _)| raw)))
    }

    /// Returns the class name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Declared types
// ---------------------------------------------------------------------------

/// A type as written in a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeclaredType {
    /// A class used without type arguments.
    Raw(ClassId),
    /// A generic class with its ordered type arguments.
    Parameterized {
        /// The erased generic class.
        raw: ClassId,
        /// Type arguments, in declaration order. Never empty.
        args: Vec<DeclaredType>,
    },
    /// `? extends X`. An unbounded `?` is `UpperBounded(Raw(Any))`.
    UpperBounded(Box<DeclaredType>),
    /// `? super X`.
    LowerBounded(Box<DeclaredType>),
}

impl DeclaredType {
    /// A raw class.
    pub fn raw(class: ClassId) -> Self {
        Self::Raw(class)
    }

    /// A parameterized class.
    ///
    /// An empty argument list collapses to [`DeclaredType::Raw`], so a
    /// `Parameterized` value always carries at least one argument.
    pub fn parameterized(raw: ClassId, args: Vec<DeclaredType>) -> Self {
        if args.is_empty() {
            Self::Raw(raw)
        } else {
            Self::Parameterized { raw, args }
        }
    }

    /// `Callback<argument>`.
    pub fn callback(argument: DeclaredType) -> Self {
        Self::parameterized(ClassId::CALLBACK, vec![argument])
    }

    /// The "no value" return type, `()`.
    pub fn unit() -> Self {
        Self::Raw(ClassId::UNIT)
    }

    /// The implicit bound of a wildcard.
    pub fn any() -> Self {
        Self::Raw(ClassId::ANY)
    }

    /// An unbounded wildcard, `?`.
    pub fn wildcard() -> Self {
        Self::UpperBounded(Box::new(Self::any()))
    }

    /// `? extends bound`.
    pub fn upper_bounded(bound: DeclaredType) -> Self {
        Self::UpperBounded(Box::new(bound))
    }

    /// `? super bound`.
    pub fn lower_bounded(bound: DeclaredType) -> Self {
        Self::LowerBounded(Box::new(bound))
    }

    /// The descriptor of a Rust type, parsed from its [`std::any::type_name`].
    ///
    /// `Vec<u8>` becomes `Parameterized { alloc::vec::Vec, [u8] }`.
    ///
    /// # Errors
    ///
    /// [`TypeError::Parse`] for types the declaration grammar cannot express,
    /// e.g. `&str`, `[u8]`, or tuples.
    pub fn of<T: ?Sized + 'static>() -> Result<Self, TypeError> {
        std::any::type_name::<T>().parse()
    }

    /// Returns `true` for the "no value" type.
    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Raw(class) if *class == ClassId::UNIT)
    }

    /// Returns `true` if this is a parameterized generic.
    pub fn is_parameterized(&self) -> bool {
        matches!(self, Self::Parameterized { .. })
    }

    /// Returns `true` if this is a wildcard argument.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::UpperBounded(_) | Self::LowerBounded(_))
    }

    /// Type arguments, empty for anything but [`DeclaredType::Parameterized`].
    pub fn type_arguments(&self) -> &[DeclaredType] {
        match self {
            Self::Parameterized { args, .. } => args,
            _ => &[],
        }
    }

    /// Shorthand for [`raw_type`].
    pub fn raw_type(&self) -> ClassId {
        raw_type(self)
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(class) => write!(f, "{class}"),
            Self::Parameterized { raw, args } => {
                write!(f, "{raw}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            Self::UpperBounded(bound) if **bound == Self::any() => f.write_str("?"),
            Self::UpperBounded(bound) => write!(f, "? extends {bound}"),
            Self::LowerBounded(bound) => write!(f, "? super {bound}"),
        }
    }
}

impl FromStr for DeclaredType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser { input: s, pos: 0 };
        let declared = parser.declared(false, 0)?;
        parser.skip_whitespace();
        if parser.pos != s.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(declared)
    }
}

impl TryFrom<String> for DeclaredType {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeclaredType> for String {
    fn from(value: DeclaredType) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// Bound helpers
// ---------------------------------------------------------------------------

/// Upper bound of the type argument at `index` of a parameterized type.
///
/// Index 1 of `Map<String, ? extends Runnable>` is `Runnable`; a concrete
/// argument is its own bound and `?` / `? super X` are bounded by `Any`.
pub fn upper_bound(index: usize, declared: &DeclaredType) -> Result<DeclaredType, TypeError> {
    match type_argument(index, declared)? {
        DeclaredType::UpperBounded(bound) => Ok((**bound).clone()),
        DeclaredType::LowerBounded(_) => Ok(DeclaredType::any()),
        concrete => Ok(concrete.clone()),
    }
}

/// Lower bound of the type argument at `index` of a parameterized type.
///
/// Index 1 of `Map<String, ? super Runnable>` is `Runnable`; a concrete
/// argument is its own bound. `?` and `? extends X` have no lower bound.
pub fn lower_bound(index: usize, declared: &DeclaredType) -> Result<DeclaredType, TypeError> {
    match type_argument(index, declared)? {
        DeclaredType::LowerBounded(bound) => Ok((**bound).clone()),
        DeclaredType::UpperBounded(_) => Err(TypeError::NoLowerBound {
            index,
            declared: declared.clone(),
        }),
        concrete => Ok(concrete.clone()),
    }
}

/// Erases all generic information. `List<? extends Runnable>` yields `List`.
pub fn raw_type(declared: &DeclaredType) -> ClassId {
    match declared {
        DeclaredType::Raw(class) => class.clone(),
        DeclaredType::Parameterized { raw, .. } => raw.clone(),
        DeclaredType::UpperBounded(bound) => raw_type(bound),
        DeclaredType::LowerBounded(_) => ClassId::ANY,
    }
}

fn type_argument(index: usize, declared: &DeclaredType) -> Result<&DeclaredType, TypeError> {
    let DeclaredType::Parameterized { args, .. } = declared else {
        return Err(TypeError::NotParameterized {
            declared: declared.clone(),
        });
    };
    args.get(index).ok_or_else(|| TypeError::IndexOutOfRange {
        index,
        len: args.len(),
        declared: declared.clone(),
    })
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Deepest accepted nesting of type arguments and wildcard bounds.
const MAX_NESTING: usize = 64;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn declared(&mut self, as_argument: bool, depth: usize) -> Result<DeclaredType, TypeError> {
        if depth > MAX_NESTING {
            return Err(self.error("type arguments nested too deeply"));
        }
        self.skip_whitespace();
        let start = self.pos;

        if self.eat(b'?') {
            if !as_argument {
                self.pos = start;
                return Err(self.error("a wildcard is only allowed as a type argument"));
            }
            self.skip_whitespace();
            if self.keyword("extends") {
                return Ok(DeclaredType::upper_bounded(self.declared(false, depth + 1)?));
            }
            if self.keyword("super") {
                return Ok(DeclaredType::lower_bounded(self.declared(false, depth + 1)?));
            }
            return Ok(DeclaredType::wildcard());
        }

        if self.eat(b'(') {
            self.skip_whitespace();
            if !self.eat(b')') {
                return Err(self.error("expected `)`"));
            }
            return Ok(DeclaredType::unit());
        }

        let Some(name) = self.identifier() else {
            return Err(self.error("expected a type name"));
        };
        let raw = ClassId(Cow::Owned(name.to_owned()));

        self.skip_whitespace();
        if !self.eat(b'<') {
            return Ok(DeclaredType::Raw(raw));
        }

        let mut args = Vec::new();
        loop {
            args.push(self.declared(true, depth + 1)?);
            self.skip_whitespace();
            if self.eat(b',') {
                continue;
            }
            if self.eat(b'>') {
                break;
            }
            return Err(self.error("expected `,` or `>`"));
        }
        Ok(DeclaredType::Parameterized { raw, args })
    }

    fn identifier(&mut self) -> Option<&'a str> {
        if !self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return None;
        }
        let start = self.pos;
        while self.peek().is_some_and(is_identifier_byte) {
            self.pos += 1;
        }
        (self.pos > start).then(|| &self.input[start..self.pos])
    }

    fn keyword(&mut self, keyword: &str) -> bool {
        let rest = &self.input[self.pos..];
        let boundary = rest
            .as_bytes()
            .get(keyword.len())
            .map_or(true, |b| !is_identifier_byte(*b));
        if rest.starts_with(keyword) && boundary {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &'static str) -> TypeError {
        TypeError::Parse {
            input: self.input.to_owned(),
            position: self.pos,
            message,
        }
    }
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> DeclaredType {
        text.parse().expect("valid declared type")
    }

    fn class(name: &str) -> DeclaredType {
        DeclaredType::Raw(ClassId::named(name).expect("non-empty"))
    }

    #[test]
    fn upper_bound_of_concrete_argument_is_the_argument() {
        let declared = parse("Callback<Repo>");
        assert_eq!(upper_bound(0, &declared).unwrap(), class("Repo"));
    }

    #[test]
    fn upper_bound_of_extends_wildcard_is_its_bound() {
        let declared = parse("Callback<? extends Repo>");
        assert_eq!(upper_bound(0, &declared).unwrap(), class("Repo"));
    }

    #[test]
    fn upper_bound_of_unbounded_and_super_wildcards_is_any() {
        assert_eq!(
            upper_bound(0, &parse("Callback<?>")).unwrap(),
            DeclaredType::any()
        );
        assert_eq!(
            upper_bound(0, &parse("Callback<? super Repo>")).unwrap(),
            DeclaredType::any()
        );
    }

    #[test]
    fn upper_bound_keeps_nested_generics_intact() {
        let declared = parse("Map<String, ? extends List<? extends Runnable>>");
        assert_eq!(
            upper_bound(1, &declared).unwrap(),
            parse("List<? extends Runnable>")
        );
        assert_eq!(upper_bound(0, &declared).unwrap(), class("String"));
    }

    #[test]
    fn lower_bound_of_super_wildcard_is_its_bound() {
        let declared = parse("Map<String, ? super Runnable>");
        assert_eq!(lower_bound(1, &declared).unwrap(), class("Runnable"));
        assert_eq!(lower_bound(0, &declared).unwrap(), class("String"));
    }

    #[test]
    fn lower_bound_of_extends_wildcard_fails() {
        let declared = parse("Callback<? extends Repo>");
        let err = lower_bound(0, &declared).unwrap_err();
        assert!(matches!(err, TypeError::NoLowerBound { index: 0, .. }));
    }

    #[test]
    fn bounds_require_a_parameterized_type() {
        let err = upper_bound(0, &parse("Callback")).unwrap_err();
        assert!(matches!(err, TypeError::NotParameterized { .. }));
        assert!(err.to_string().contains("`Callback`"));
    }

    #[test]
    fn bounds_reject_out_of_range_index() {
        let err = upper_bound(1, &parse("Callback<Repo>")).unwrap_err();
        assert!(matches!(
            err,
            TypeError::IndexOutOfRange { index: 1, len: 1, .. }
        ));
    }

    #[test]
    fn raw_type_erases_arguments() {
        assert_eq!(raw_type(&parse("Callback<Repo>")), ClassId::CALLBACK);
        assert_eq!(raw_type(&parse("Callback<List<Repo>>")), ClassId::CALLBACK);
        assert_eq!(raw_type(&parse("Callback")), ClassId::CALLBACK);
        assert_eq!(
            raw_type(&DeclaredType::upper_bounded(parse("List<Repo>"))),
            ClassId::named("List").unwrap()
        );
        assert_eq!(
            raw_type(&DeclaredType::lower_bounded(class("Repo"))),
            ClassId::ANY
        );
    }

    #[test]
    fn unit_matches_the_rust_unit_type() {
        assert!(parse("()").is_unit());
        assert!(DeclaredType::of::<()>().unwrap().is_unit());
        assert_eq!(ClassId::of::<()>(), ClassId::UNIT);
        assert!(!class("Unit").is_unit());
    }

    #[test]
    fn display_round_trips_source_text() {
        for text in [
            "Repo",
            "()",
            "Callback<Repo>",
            "Callback<?>",
            "Callback<? extends Repo>",
            "Map<String, ? super Runnable>",
            "Callback<List<? extends my::Repo>>",
        ] {
            assert_eq!(parse(text).to_string(), text);
        }
    }

    #[test]
    fn parser_tolerates_whitespace() {
        assert_eq!(
            parse("  Callback < ? extends  Repo >  "),
            parse("Callback<? extends Repo>")
        );
    }

    #[test]
    fn parser_rejects_malformed_text() {
        for (text, position) in [
            ("", 0),
            ("Callback<>", 9),
            ("Callback<Repo", 13),
            ("Callback<Repo> trailing", 15),
            ("?", 0),
            ("Callback<? extends>", 18),
            ("(", 1),
            ("Callback<:>", 9),
            ("Callback<..>", 9),
            ("Callback<Repo, ::Page>", 15),
        ] {
            match text.parse::<DeclaredType>() {
                Err(TypeError::Parse { position: p, .. }) => {
                    assert_eq!(p, position, "position for {text:?}")
                }
                other => panic!("expected parse error for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn parser_bounds_nesting_depth() {
        let nested = |depth: usize| {
            format!("{}Repo{}", "Callback<".repeat(depth), ">".repeat(depth))
        };

        assert!(nested(32).parse::<DeclaredType>().is_ok());
        for depth in [MAX_NESTING + 1, 20_000] {
            match nested(depth).parse::<DeclaredType>() {
                Err(TypeError::Parse { message, .. }) => {
                    assert_eq!(message, "type arguments nested too deeply")
                }
                other => panic!("expected nesting error at depth {depth}, got {other:?}"),
            }
        }

        let bounds = format!("Callback<{}Repo>", "? extends Callback<".repeat(20_000));
        assert!(bounds.parse::<DeclaredType>().is_err());
    }

    #[test]
    fn rust_types_map_onto_descriptors() {
        let bytes = DeclaredType::of::<Vec<u8>>().unwrap();
        assert_eq!(bytes, parse("alloc::vec::Vec<u8>"));
        assert_eq!(raw_type(&bytes), ClassId::of::<Vec<u8>>());
        assert_eq!(ClassId::of::<Vec<String>>().as_str(), "alloc::vec::Vec");

        let json = serde_json::to_string(&bytes).unwrap();
        assert_eq!(serde_json::from_str::<DeclaredType>(&json).unwrap(), bytes);
        assert_eq!(bytes.to_string().parse::<DeclaredType>().unwrap(), bytes);
    }

    #[test]
    fn rust_types_outside_the_grammar_are_rejected() {
        assert!(matches!(
            DeclaredType::of::<&str>(),
            Err(TypeError::Parse { .. })
        ));
        assert!(DeclaredType::of::<(u8, u16)>().is_err());
    }

    #[test]
    fn extends_requires_a_word_boundary() {
        // `?extendsRepo` is an unbounded wildcard followed by junk.
        assert!("Callback<?extendsRepo>".parse::<DeclaredType>().is_err());
    }

    #[test]
    fn parameterized_constructor_collapses_empty_arguments() {
        assert_eq!(
            DeclaredType::parameterized(ClassId::CALLBACK, Vec::new()),
            DeclaredType::Raw(ClassId::CALLBACK)
        );
    }

    #[test]
    fn serde_uses_the_text_form() {
        let declared = parse("Callback<? extends Repo>");
        let json = serde_json::to_string(&declared).unwrap();
        assert_eq!(json, "\"Callback<? extends Repo>\"");
        let back: DeclaredType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, declared);
        assert!(serde_json::from_str::<DeclaredType>("\"Callback<\"").is_err());
    }
}
