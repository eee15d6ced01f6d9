//! Symbols and static types produced by binding resolution.
//!
//! Missing bindings are never represented by `Option`: lookups return
//! [`Symbol::UNKNOWN`] and [`JavaType::Unknown`] so that callers can
//! treat them as ordinary values.

use std::fmt;

use smol_str::SmolStr;

use crate::tree::NodeId;

/// Identifies a symbol inside a [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SymbolKind {
    /// A package.
    Package,
    /// A class, interface, enum or annotation type.
    Type,
    /// A method or constructor.
    Method,
    /// A field, local variable or parameter.
    Variable,
    /// Resolution failed.
    Unknown,
}

/// The static type of an expression or declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JavaType {
    /// A named type: `int`, `String`, `java.util.List`, `int[]`.
    Known(SmolStr),
    /// The type of the `null` literal.
    Null,
    /// The type could not be determined.
    Unknown,
}

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

impl JavaType {
    /// Creates a named type.
    pub fn known(name: impl Into<SmolStr>) -> Self {
        JavaType::Known(name.into())
    }

    /// Returns true for [`JavaType::Unknown`].
    pub fn is_unknown(&self) -> bool {
        matches!(self, JavaType::Unknown)
    }

    /// Returns true for the eight primitive types.
    pub fn is_primitive(&self) -> bool {
        match self {
            JavaType::Known(name) => PRIMITIVES.contains(&name.as_str()),
            _ => false,
        }
    }

    /// Returns the element type of an array type.
    pub fn element(&self) -> JavaType {
        match self {
            JavaType::Known(name) => match name.strip_suffix("[]") {
                Some(element) => JavaType::known(element),
                None => JavaType::Unknown,
            },
            _ => JavaType::Unknown,
        }
    }

    /// Returns the array type with this element type.
    pub fn array(&self) -> JavaType {
        match self {
            JavaType::Known(name) => JavaType::known(format!("{name}[]")),
            _ => JavaType::Unknown,
        }
    }

    /// Returns true if the type is `name` (simple or fully qualified).
    pub fn is(&self, name: &str) -> bool {
        match self {
            JavaType::Known(own) => {
                own == name || own.rsplit('.').next() == Some(name) || name.rsplit('.').next() == Some(own)
            }
            _ => false,
        }
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaType::Known(name) => f.write_str(name),
            JavaType::Null => f.write_str("null"),
            JavaType::Unknown => f.write_str("!unknown!"),
        }
    }
}

/// A resolved declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// What the symbol names.
    pub kind: SymbolKind,
    /// The simple name.
    pub name: SmolStr,
    /// The enclosing type or method.
    pub owner: Option<SymbolId>,
    /// The declaring tree, when declared in the current file.
    pub declaration: Option<NodeId>,
    /// Variable type, method return type or the type itself.
    pub java_type: JavaType,
    /// Declared parameter types, for methods.
    pub parameter_types: Vec<JavaType>,
}

static UNKNOWN_SYMBOL: Symbol = Symbol::UNKNOWN;

impl Symbol {
    /// The symbol of every unresolved reference.
    pub const UNKNOWN: Symbol = Symbol {
        kind: SymbolKind::Unknown,
        name: SmolStr::new_inline("!unknown!"),
        owner: None,
        declaration: None,
        java_type: JavaType::Unknown,
        parameter_types: Vec::new(),
    };

    /// Returns a shared reference to [`Symbol::UNKNOWN`].
    pub fn unknown() -> &'static Symbol {
        &UNKNOWN_SYMBOL
    }

    /// Returns true if resolution failed.
    pub fn is_unknown(&self) -> bool {
        self.kind == SymbolKind::Unknown
    }

    /// Returns true for fields, locals and parameters.
    pub fn is_variable(&self) -> bool {
        self.kind == SymbolKind::Variable
    }

    /// Returns true for methods and constructors.
    pub fn is_method(&self) -> bool {
        self.kind == SymbolKind::Method
    }

    /// Returns true for types.
    pub fn is_type(&self) -> bool {
        self.kind == SymbolKind::Type
    }
}

/// Owns every symbol of a compilation unit.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a symbol and returns its id.
    pub fn push(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    /// Returns the symbol for `id`, or the unknown symbol for a foreign id.
    pub fn get(&self, id: SymbolId) -> &Symbol {
        self.symbols.get(id.index()).unwrap_or(Symbol::unknown())
    }

    pub(crate) fn get_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.symbols.get_mut(id.index())
    }

    /// Returns the number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates over all symbols with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, symbol)| (SymbolId(i as u32), symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_constant() {
        let unknown = Symbol::unknown();
        assert!(unknown.is_unknown());
        assert_eq!(unknown, &Symbol::UNKNOWN);
        assert!(unknown.java_type.is_unknown());
        assert!(std::ptr::eq(unknown, Symbol::unknown()));
    }

    #[test]
    fn test_foreign_id_is_unknown() {
        let table = SymbolTable::new();
        assert!(table.get(SymbolId(7)).is_unknown());
    }

    #[test]
    fn test_type_names() {
        assert!(JavaType::known("int").is_primitive());
        assert!(!JavaType::known("String").is_primitive());
        assert!(JavaType::known("java.lang.String").is("String"));
        assert!(JavaType::known("String").is("java.lang.String"));
        assert!(!JavaType::Null.is("Object"));
    }
}
