//! One-call pipeline: parse, analyze, emit.
//!
//! Nothing is emitted until the whole header has parsed and every function
//! has been analyzed, so any error leaves both outputs unproduced.

use alloc::string::{String, ToString};

use shimgen_ast::naming::{library_name_for_header, NamingConfig};
use shimgen_ast::{AnalysisError, Analyzer, TypeTable};
use shimgen_parser::{parse_header, ParseError};

use crate::c::{CodegenError, ShimCodegen, ShimCodegenOptions};
use crate::typescript::{TsBindingCodegen, TsBindingOptions};

/// Everything one run needs besides the header text.
#[derive(Clone, Debug)]
pub struct GenerateOptions {
    /// Header named in the shim's `#include` (default: `"header.h"`).
    pub header_include: String,
    /// Shared library base name the bindings load (default: `"shim"`).
    pub library_name: String,
    pub naming: NamingConfig,
    pub type_table: TypeTable,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            header_include: "header.h".to_string(),
            library_name: "shim".to_string(),
            naming: NamingConfig::default(),
            type_table: TypeTable::standard(),
        }
    }
}

impl GenerateOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a header path: includes its file name and derives the
    /// library name from it.
    pub fn for_header(path: &str) -> Self {
        let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
        Self::default()
            .with_header_include(file)
            .with_library_name(&library_name_for_header(path))
    }

    pub fn with_header_include(mut self, header: &str) -> Self {
        self.header_include = header.to_string();
        self
    }

    pub fn with_library_name(mut self, name: &str) -> Self {
        self.library_name = name.to_string();
        self
    }

    pub fn with_naming(mut self, naming: NamingConfig) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_type_table(mut self, table: TypeTable) -> Self {
        self.type_table = table;
        self
    }
}

/// The two generated sources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedOutput {
    /// TypeScript module for `bun:ffi`.
    pub bindings: String,
    /// C source exporting helpers and pointerized wrappers.
    pub shim: String,
}

/// Any failure of a generation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerateError {
    Parse(ParseError),
    Analysis(AnalysisError),
    Codegen(CodegenError),
}

impl core::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GenerateError::Parse(e) => write!(f, "{}", e),
            GenerateError::Analysis(e) => write!(f, "{}", e),
            GenerateError::Codegen(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl core::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            GenerateError::Parse(e) => Some(e),
            GenerateError::Analysis(e) => Some(e),
            GenerateError::Codegen(e) => Some(e),
        }
    }
}

impl From<ParseError> for GenerateError {
    fn from(e: ParseError) -> Self {
        GenerateError::Parse(e)
    }
}

impl From<AnalysisError> for GenerateError {
    fn from(e: AnalysisError) -> Self {
        GenerateError::Analysis(e)
    }
}

impl From<CodegenError> for GenerateError {
    fn from(e: CodegenError) -> Self {
        GenerateError::Codegen(e)
    }
}

/// Generate bindings and shim for one header.
///
/// # Example
/// ```
/// use shimgen_codegen::{generate, GenerateOptions};
///
/// let src = "typedef struct Color { unsigned char r, g, b, a; } Color;\n\
///            void ClearBackground(Color color);";
/// let out = generate(src, &GenerateOptions::for_header("raylib.h")).unwrap();
/// assert!(out.shim.contains("ClearBackground(*color);"));
/// assert!(out.bindings.contains("libraylib_pointerized"));
/// ```
pub fn generate(source: &str, options: &GenerateOptions) -> Result<GeneratedOutput, GenerateError> {
    let header = parse_header(source)?;
    tracing::debug!(
        declarations = header.declarations.len(),
        functions = header.functions().count(),
        "header parsed"
    );

    let analyzer = Analyzer::new(&options.type_table, &header, options.naming.clone());
    let plan = analyzer.analyze(&header)?;

    let shim_options = ShimCodegenOptions::new().with_header_include(&options.header_include);
    let shim = ShimCodegen::with_options(shim_options).generate(&plan)?;

    let ts_options = TsBindingOptions::new().with_library_name(&options.library_name);
    let bindings = TsBindingCodegen::with_options(ts_options).generate(&plan)?;

    Ok(GeneratedOutput { bindings, shim })
}
