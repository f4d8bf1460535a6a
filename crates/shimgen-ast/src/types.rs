//! The primitive type table.
//!
//! Maps C primitive spellings to host scalar kinds. The table is configuration:
//! it is built once at startup (optionally extended from user settings) and is
//! read-only for the rest of the run. Any name it does not contain is an
//! aggregate reference, to be resolved against the header's own declarations.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

use crate::ast::TypeSpec;

/// Host scalar kinds, one per `bun:ffi` `FFIType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HostType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool,
    Void,
    /// `va_list`: passed as an opaque pointer, never inspected.
    VaList,
}

impl HostType {
    /// Every host type, in declaration order.
    pub const ALL: [HostType; 13] = [
        HostType::I8,
        HostType::U8,
        HostType::I16,
        HostType::U16,
        HostType::I32,
        HostType::U32,
        HostType::I64,
        HostType::U64,
        HostType::F32,
        HostType::F64,
        HostType::Bool,
        HostType::Void,
        HostType::VaList,
    ];

    /// The name used in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            HostType::I8 => "i8",
            HostType::U8 => "u8",
            HostType::I16 => "i16",
            HostType::U16 => "u16",
            HostType::I32 => "i32",
            HostType::U32 => "u32",
            HostType::I64 => "i64",
            HostType::U64 => "u64",
            HostType::F32 => "f32",
            HostType::F64 => "f64",
            HostType::Bool => "bool",
            HostType::Void => "void",
            HostType::VaList => "va_list",
        }
    }

    /// Whether values of this type are 64-bit integers (`bigint` on the host).
    pub fn is_wide_integer(self) -> bool {
        matches!(self, HostType::I64 | HostType::U64)
    }
}

impl core::fmt::Display for HostType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a host type name is not recognized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownHostType(pub String);

impl core::fmt::Display for UnknownHostType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown host type '{}'", self.0)
    }
}

impl core::error::Error for UnknownHostType {}

impl core::str::FromStr for HostType {
    type Err = UnknownHostType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HostType::ALL
            .into_iter()
            .find(|ty| ty.name() == s)
            .ok_or_else(|| UnknownHostType(s.to_string()))
    }
}

/// A type after consulting the table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    /// A registered primitive.
    Primitive(HostType),
    /// Any other identifier; the native name is preserved.
    AggregateRef(String),
}

/// A name built from C type keywords that the table does not register,
/// e.g. `long double`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownTypeError {
    pub name: String,
}

impl core::fmt::Display for UnknownTypeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown primitive type '{}'", self.name)
    }
}

impl core::error::Error for UnknownTypeError {}

/// C keywords that can only spell primitive types.
const TYPE_KEYWORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "_Bool",
    "_Complex",
];

/// Primitive name → host type mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeTable {
    entries: BTreeMap<String, HostType>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TypeTable {
    /// An empty table. Mostly useful for tests.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The fixed standard mapping.
    pub fn standard() -> Self {
        let table = [
            ("char", HostType::I8),
            ("signed char", HostType::I8),
            ("unsigned char", HostType::U8),
            ("short", HostType::I16),
            ("unsigned short", HostType::U16),
            ("int", HostType::I32),
            ("unsigned int", HostType::U32),
            ("long", HostType::I64),
            ("unsigned long", HostType::U64),
            ("long long", HostType::I64),
            ("unsigned long long", HostType::U64),
            ("float", HostType::F32),
            ("double", HostType::F64),
            ("bool", HostType::Bool),
            ("_Bool", HostType::Bool),
            ("void", HostType::Void),
            ("va_list", HostType::VaList),
            ("size_t", HostType::U64),
            ("int8_t", HostType::I8),
            ("uint8_t", HostType::U8),
            ("int16_t", HostType::I16),
            ("uint16_t", HostType::U16),
            ("int32_t", HostType::I32),
            ("uint32_t", HostType::U32),
            ("int64_t", HostType::I64),
            ("uint64_t", HostType::U64),
        ];
        let mut out = Self::empty();
        for (name, ty) in table {
            out.entries.insert(name.to_string(), ty);
        }
        out
    }

    /// Register (or override) a primitive.
    pub fn with_entry(mut self, name: &str, ty: HostType) -> Self {
        self.insert(name, ty);
        self
    }

    /// Register (or override) a primitive in place.
    pub fn insert(&mut self, name: &str, ty: HostType) {
        self.entries.insert(name.to_string(), ty);
    }

    /// Look up a primitive by its full spelling, e.g. `unsigned char`.
    pub fn lookup(&self, name: &str) -> Option<HostType> {
        self.entries.get(name).copied()
    }

    /// Registered entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, HostType)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Resolve a bare name.
    pub fn resolve(&self, name: &str) -> Result<Type, UnknownTypeError> {
        if let Some(ty) = self.lookup(name) {
            return Ok(Type::Primitive(ty));
        }
        if is_keyword_built(name) {
            return Err(UnknownTypeError {
                name: name.to_string(),
            });
        }
        Ok(Type::AggregateRef(name.to_string()))
    }

    /// Resolve a spelled type, folding in `unsigned`.
    ///
    /// Tagged types (`struct X`, `enum Y`) always resolve to aggregate references
    /// named by their tag.
    pub fn resolve_spec(&self, spec: &TypeSpec) -> Result<Type, UnknownTypeError> {
        if spec.tag.is_some() {
            return Ok(Type::AggregateRef(spec.name.clone()));
        }
        if spec.is_unsigned {
            let full = alloc::format!("unsigned {}", spec.name);
            return match self.lookup(&full) {
                Some(ty) => Ok(Type::Primitive(ty)),
                None => Err(UnknownTypeError { name: full }),
            };
        }
        self.resolve(&spec.name)
    }
}

/// Whether every word of `name` is a primitive type keyword.
fn is_keyword_built(name: &str) -> bool {
    let mut words = name.split_whitespace().peekable();
    words.peek().is_some() && words.all(|w| TYPE_KEYWORDS.contains(&w))
}
