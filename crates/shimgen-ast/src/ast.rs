//! Declaration tree for parsed C headers.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

/// A location in the header source.
///
/// `line` and `column` are 1-based; `offset` is a byte offset into the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Compute the position of `rest` inside `source`.
    ///
    /// `rest` must be a suffix of `source`, which is always the case for the
    /// remaining input of a parser run over `source`.
    pub fn locate(source: &str, rest: &str) -> Self {
        let offset = source.len().saturating_sub(rest.len());
        let consumed = &source[..offset];
        let line = consumed.matches('\n').count() + 1;
        let column = match consumed.rfind('\n') {
            Some(nl) => consumed[nl + 1..].chars().count() + 1,
            None => consumed.chars().count() + 1,
        };
        Self { offset, line, column }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A complete parsed header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Header {
    /// Top-level declarations in source order.
    pub declarations: Vec<Declaration>,
}

impl Header {
    /// Create a header from its top-level declarations.
    pub fn new(declarations: Vec<Declaration>) -> Self {
        Self { declarations }
    }

    /// Visit every declaration in source order, descending into macro blocks.
    ///
    /// Conditional blocks are not evaluated: declarations from every branch
    /// are visited.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: alloc::vec![self.declarations.iter()],
        }
    }

    /// All function declarations in source order.
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.walk().filter_map(|decl| match decl {
            Declaration::Function(f) => Some(f),
            _ => None,
        })
    }

    /// All struct definitions in source order.
    pub fn structs(&self) -> impl Iterator<Item = &StructDef> {
        self.walk().filter_map(|decl| match decl {
            Declaration::StructDef(s) => Some(s),
            _ => None,
        })
    }
}

/// Depth-first, in-order iterator over a header's declarations.
pub struct Walk<'a> {
    stack: Vec<core::slice::Iter<'a, Declaration>>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Declaration;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(decl) => {
                    if let Declaration::Macro(Macro::Block(block)) = decl {
                        self.stack.push(block.body.iter());
                    }
                    return Some(decl);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// A top-level or block-level declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Declaration {
    /// Function declaration or inline definition.
    Function(Function),
    /// `typedef` that is not a struct or enum definition.
    Typedef(Typedef),
    /// Struct (or union) definition, with or without `typedef`.
    StructDef(StructDef),
    /// Enum definition, with or without `typedef`.
    EnumDef(EnumDef),
    /// Preprocessor directive or conditional block.
    Macro(Macro),
    /// `#include` directive.
    Include(Include),
    /// Anything recognized only to keep the structure well-formed.
    Statement(Statement),
}

/// Explicit `struct`/`union`/`enum` keyword in front of a type name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Struct,
    Union,
    Enum,
}

impl Tag {
    /// The C keyword for this tag.
    pub fn keyword(self) -> &'static str {
        match self {
            Tag::Struct => "struct",
            Tag::Union => "union",
            Tag::Enum => "enum",
        }
    }
}

/// The spelled base type of a declarator, without pointer markers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeSpec {
    /// Normalized base name, e.g. `int`, `long long`, `Color`.
    pub name: String,
    /// Explicit `struct`/`union`/`enum` keyword, if spelled.
    pub tag: Option<Tag>,
    pub is_const: bool,
    pub is_unsigned: bool,
}

impl TypeSpec {
    /// A plain named type with no qualifiers.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.into(),
            tag: None,
            is_const: false,
            is_unsigned: false,
        }
    }

    /// Mark this type `const`.
    pub fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    /// Mark this type `unsigned`.
    pub fn with_unsigned(mut self) -> Self {
        self.is_unsigned = true;
        self
    }

    /// Add an explicit tag keyword.
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Whether this is `void` with no tag.
    pub fn is_void(&self) -> bool {
        self.tag.is_none() && self.name == "void"
    }
}

/// A function parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    pub ty: TypeSpec,
    pub pointer_depth: usize,
    /// Declared name, or `argN` for unnamed parameters.
    pub name: String,
    /// Array extent for `T name[N]` parameters (empty string for `[]`).
    pub array_len: Option<String>,
    /// Set for inline `ret (*name)(params)` parameters; `ty` is then the return type.
    pub function_pointer: Option<Box<Signature>>,
}

impl Parameter {
    /// A parameter of type `ty` at the given pointer depth.
    pub fn new(ty: TypeSpec, pointer_depth: usize, name: &str) -> Self {
        Self {
            ty,
            pointer_depth,
            name: name.into(),
            array_len: None,
            function_pointer: None,
        }
    }

    /// Pointer depth at the ABI boundary, counting array decay.
    pub fn effective_depth(&self) -> usize {
        self.pointer_depth + usize::from(self.array_len.is_some())
    }
}

/// A function or function-pointer signature.
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub return_type: TypeSpec,
    pub return_pointer_depth: usize,
    /// Parameters in declaration order. `(void)` yields an empty list.
    pub params: Vec<Parameter>,
    /// Whether the list ends in `...`.
    pub is_variadic: bool,
}

impl Signature {
    /// Whether the function returns nothing.
    pub fn returns_void(&self) -> bool {
        self.return_type.is_void() && self.return_pointer_depth == 0
    }
}

/// A function declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    /// Leading export/storage annotations, e.g. `RLAPI` or `static inline`.
    pub annotations: Vec<String>,
    pub signature: Signature,
    /// Whether this was an inline definition with a body.
    pub has_body: bool,
    pub position: Position,
}

impl Function {
    pub fn params(&self) -> &[Parameter] {
        &self.signature.params
    }

    pub fn is_variadic(&self) -> bool {
        self.signature.is_variadic
    }
}

/// A struct or union definition.
#[derive(Clone, Debug, PartialEq)]
pub struct StructDef {
    /// Typedef name if present, otherwise the tag.
    pub name: String,
    /// Tag after the `struct` keyword, if any.
    pub tag: Option<String>,
    /// Fields in declaration (memory layout) order.
    pub fields: Vec<Field>,
    pub is_union: bool,
    /// Whether the definition came with a `typedef` so `name` is usable bare.
    pub is_typedef: bool,
    pub position: Position,
}

impl StructDef {
    /// The C spelling used to refer to this struct.
    pub fn spelled(&self) -> String {
        if self.is_typedef {
            self.name.clone()
        } else {
            let keyword = if self.is_union { "union" } else { "struct" };
            alloc::format!("{} {}", keyword, self.name)
        }
    }
}

/// A struct field.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub ty: TypeSpec,
    pub pointer_depth: usize,
    pub name: String,
    pub array_len: Option<String>,
    /// Bit-field width, e.g. `3` in `unsigned int flag : 3;`.
    pub bit_width: Option<String>,
    pub function_pointer: Option<Box<Signature>>,
}

impl Field {
    /// A plain scalar field.
    pub fn new(ty: TypeSpec, pointer_depth: usize, name: &str) -> Self {
        Self {
            ty,
            pointer_depth,
            name: name.into(),
            array_len: None,
            bit_width: None,
            function_pointer: None,
        }
    }
}

/// An enum definition.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumDef {
    /// Typedef name if present, otherwise the tag.
    pub name: Option<String>,
    pub tag: Option<String>,
    pub variants: Vec<EnumVariant>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumVariant {
    pub name: String,
    /// Raw initializer text, not evaluated.
    pub value: Option<String>,
}

/// A `typedef` that does not define a struct or enum body.
#[derive(Clone, Debug, PartialEq)]
pub struct Typedef {
    pub name: String,
    pub target: TypedefTarget,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypedefTarget {
    /// `typedef unsigned int uint;`, `typedef struct X X;`, `typedef Vector4 Quaternion;`
    Type {
        ty: TypeSpec,
        pointer_depth: usize,
        array_len: Option<String>,
    },
    /// `typedef void (*Callback)(int);`
    FunctionPointer(Signature),
}

/// Preprocessor content. Never expanded or evaluated.
#[derive(Clone, Debug, PartialEq)]
pub enum Macro {
    /// `#define NAME body` or `#define NAME(a, b) body`.
    Define {
        name: String,
        params: Option<Vec<String>>,
        body: String,
    },
    /// `#if`/`#ifdef`/`#ifndef` through the matching `#endif`.
    Block(MacroBlock),
    /// A directive consumed as a bare line (`#else`, `#elif`, `#error`, `#pragma`, ...).
    Directive { keyword: String, text: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct MacroBlock {
    /// `if`, `ifdef` or `ifndef`.
    pub directive: String,
    /// Condition text, verbatim.
    pub condition: String,
    /// Nested content, all branches included.
    pub body: Vec<Declaration>,
    pub position: Position,
}

/// `#include <path>` or `#include "path"`.
#[derive(Clone, Debug, PartialEq)]
pub struct Include {
    pub path: String,
    /// `true` for angle-bracket includes.
    pub system: bool,
}

/// Structurally recognized content that does not feed analysis.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    /// `extern int x;`, `static const char *names[] = { ... };`, `enum Mode mode;`
    Variable {
        ty: TypeSpec,
        pointer_depth: usize,
        name: String,
    },
    /// `struct Node;`
    ForwardDeclaration { ty: TypeSpec },
    /// `extern "C" {`
    LinkageOpen { abi: String },
    /// A lone `}` closing a linkage block.
    ClosingBrace,
}
