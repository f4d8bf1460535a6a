//! Naming of generated symbols.
//!
//! Every generated native symbol is derived from a header name by a fixed
//! affix, so the binding and shim files can be generated independently and
//! still agree:
//!
//! | Header item | Generated symbol (default config) |
//! |-------------|-----------------------------------|
//! | `void ClearBackground(Color color)` | `ClearBackground_pointerized` |
//! | by-value aggregate `Color` | `malloc_Color` / `free_Color` |
//!
//! Host-side identifiers keep the header's names, except parameter names that
//! collide with TypeScript reserved words, which get a trailing underscore.

use alloc::format;
use alloc::string::{String, ToString};

/// Configuration for generated symbol names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamingConfig {
    /// Suffix appended to a function name to form its shim symbol.
    /// Default: `"_pointerized"`
    pub shim_suffix: String,
    /// Prefix of allocator symbols.
    /// Default: `"malloc_"`
    pub alloc_prefix: String,
    /// Prefix of deallocator symbols.
    /// Default: `"free_"`
    pub free_prefix: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            shim_suffix: "_pointerized".to_string(),
            alloc_prefix: "malloc_".to_string(),
            free_prefix: "free_".to_string(),
        }
    }
}

impl NamingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shim suffix.
    pub fn with_shim_suffix(mut self, suffix: &str) -> Self {
        self.shim_suffix = suffix.to_string();
        self
    }

    /// Set the allocator prefix.
    pub fn with_alloc_prefix(mut self, prefix: &str) -> Self {
        self.alloc_prefix = prefix.to_string();
        self
    }

    /// Set the deallocator prefix.
    pub fn with_free_prefix(mut self, prefix: &str) -> Self {
        self.free_prefix = prefix.to_string();
        self
    }

    /// Shim symbol for a function.
    ///
    /// # Example
    /// ```
    /// use shimgen_ast::naming::NamingConfig;
    ///
    /// let config = NamingConfig::default();
    /// assert_eq!(config.shim_name("ClearBackground"), "ClearBackground_pointerized");
    /// ```
    pub fn shim_name(&self, function: &str) -> String {
        format!("{}{}", function, self.shim_suffix)
    }

    /// Allocator symbol for an aggregate.
    ///
    /// # Example
    /// ```
    /// use shimgen_ast::naming::NamingConfig;
    ///
    /// assert_eq!(NamingConfig::default().alloc_name("Color"), "malloc_Color");
    /// ```
    pub fn alloc_name(&self, aggregate: &str) -> String {
        format!("{}{}", self.alloc_prefix, aggregate)
    }

    /// Deallocator symbol for an aggregate.
    pub fn free_name(&self, aggregate: &str) -> String {
        format!("{}{}", self.free_prefix, aggregate)
    }
}

/// TypeScript words that cannot be used as parameter names.
///
/// C keywords are excluded since a valid header cannot use them as names.
const TS_RESERVED: &[&str] = &[
    "arguments", "await", "class", "debugger", "delete", "eval", "export", "false", "finally",
    "function", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "super", "this", "throw", "true", "try",
    "typeof", "var", "with", "yield",
];

/// Names the generated binding module declares at top level or inside function bodies.
/// A parameter spelled like one of them would shadow it.
const TS_MODULE_NAMES: &[&str] = &[
    "dlopen", "FFIType", "suffix", "Pointer", "LIBRARY_PATH", "lib", "PointerLike", "cstr",
    "Release", "registry", "expectPointer", "NativeHandle", "raw_",
];

/// Make a C identifier safe to use as a TypeScript binding name.
///
/// # Example
/// ```
/// use shimgen_ast::naming::ts_identifier;
///
/// assert_eq!(ts_identifier("color"), "color");
/// assert_eq!(ts_identifier("new"), "new_");
/// ```
pub fn ts_identifier(name: &str) -> String {
    if TS_RESERVED.contains(&name) || TS_MODULE_NAMES.contains(&name) {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

/// Derive a shared library base name from a header file name.
///
/// # Example
/// ```
/// use shimgen_ast::naming::library_name_for_header;
///
/// assert_eq!(library_name_for_header("include/raylib.h"), "raylib_pointerized");
/// ```
pub fn library_name_for_header(header: &str) -> String {
    let file = header.rsplit(['/', '\\']).next().unwrap_or(header);
    let stem = file.strip_suffix(".h").unwrap_or(file);
    format!("{}_pointerized", stem)
}
