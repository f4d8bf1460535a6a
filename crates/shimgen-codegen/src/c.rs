//! C shim generator.
//!
//! Emits the native half of a binding: one allocator/deallocator pair per
//! aggregate that crosses the boundary by value, then one wrapper per
//! function that needs one. Wrappers take pointers where the original takes
//! aggregates by value and call the original with those pointers
//! dereferenced:
//!
//! ```c
//! void ClearBackground_pointerized(Color* color) { ClearBackground(*color); }
//! ```

use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use shimgen_ast::pointerize::{FieldKind, FunctionPlan, HelperPlan, ShimPlan, Slot};
use shimgen_ast::pretty::{param_list, type_with_depth};
use shimgen_ast::{HeaderPlan, Parameter};

/// Code generation error.
///
/// These are internal assertions: a plan produced by the analyzer never
/// triggers them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodegenError {
    /// A helper pair for the same aggregate was requested twice.
    DuplicateHelper { aggregate: String },
    /// A by-value aggregate has no helper pair, so the host cannot build one.
    MissingHelper { aggregate: String, function: String },
}

impl core::fmt::Display for CodegenError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CodegenError::DuplicateHelper { aggregate } => {
                write!(f, "helper pair for '{}' emitted twice", aggregate)
            }
            CodegenError::MissingHelper { aggregate, function } => write!(
                f,
                "no helper pair for '{}' used by value in '{}'",
                aggregate, function
            ),
        }
    }
}

impl core::error::Error for CodegenError {}

/// Options for shim generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShimCodegenOptions {
    /// Header named in the `#include "..."` line (default: `"header.h"`).
    pub header_include: String,
    /// Whether to emit the generated-file banner (default: true).
    pub banner: bool,
}

impl Default for ShimCodegenOptions {
    fn default() -> Self {
        Self {
            header_include: "header.h".to_string(),
            banner: true,
        }
    }
}

impl ShimCodegenOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header the shim includes.
    pub fn with_header_include(mut self, header: &str) -> Self {
        self.header_include = header.to_string();
        self
    }

    /// Set whether to emit the banner.
    pub fn with_banner(mut self, banner: bool) -> Self {
        self.banner = banner;
        self
    }
}

/// C shim code generator.
pub struct ShimCodegen {
    output: String,
    indent: usize,
    options: ShimCodegenOptions,
    emitted_helpers: BTreeSet<String>,
}

impl ShimCodegen {
    /// Create a new shim generator with default options.
    pub fn new() -> Self {
        Self::with_options(ShimCodegenOptions::default())
    }

    /// Create a new shim generator with the specified options.
    pub fn with_options(options: ShimCodegenOptions) -> Self {
        Self {
            output: String::new(),
            indent: 0,
            options,
            emitted_helpers: BTreeSet::new(),
        }
    }

    /// Generate the shim source for an analyzed header.
    pub fn generate(&mut self, plan: &HeaderPlan<'_>) -> Result<String, CodegenError> {
        self.output.clear();
        self.indent = 0;
        self.emitted_helpers.clear();

        self.emit_header();

        if !plan.helpers.is_empty() {
            self.emit_line("/* Struct helpers */");
            self.emit_line("");
            for helper in &plan.helpers {
                self.emit_helper(helper)?;
                self.emit_line("");
            }
        }

        let shimmed: Vec<(&FunctionPlan<'_>, &ShimPlan)> = plan
            .functions
            .iter()
            .filter_map(|f| f.shim().map(|shim| (f, shim)))
            .collect();
        if !shimmed.is_empty() {
            self.emit_line("/* Pointerized wrappers */");
            self.emit_line("");
            for (function, shim) in shimmed {
                self.check_helpers(function)?;
                self.emit_wrapper(function, shim);
            }
        }

        Ok(self.output.clone())
    }

    fn emit_header(&mut self) {
        if self.options.banner {
            self.emit_line("/* Generated by shimgen. Do not edit. */");
            self.emit_line("/* Aggregates passed by value are taken by pointer here. */");
            self.emit_line("");
        }
        self.emit_line("#include <stdlib.h>");
        self.emit_line("#include <string.h>");
        let include = format!("#include \"{}\"", self.options.header_include);
        self.emit_line(&include);
        self.emit_line("");
    }

    /// Every by-value aggregate of a shimmed function must have helpers.
    fn check_helpers(&self, function: &FunctionPlan<'_>) -> Result<(), CodegenError> {
        let slots = function.params.iter().map(|p| &p.slot).chain([&function.ret]);
        for slot in slots {
            if let Slot::ByValue(agg) = slot {
                if !self.emitted_helpers.contains(&agg.name) {
                    return Err(CodegenError::MissingHelper {
                        aggregate: agg.name.clone(),
                        function: function.function.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Emit the allocator and deallocator for one aggregate.
    fn emit_helper(&mut self, helper: &HelperPlan<'_>) -> Result<(), CodegenError> {
        let name = &helper.aggregate.name;
        if !self.emitted_helpers.insert(name.clone()) {
            return Err(CodegenError::DuplicateHelper {
                aggregate: name.clone(),
            });
        }
        tracing::debug!(aggregate = %name, "emitting helper pair");

        let ty = helper.aggregate.spelled.as_str();
        let params: Vec<Parameter> = helper.fields.iter().map(allocator_param).collect();
        self.emit_line(&format!(
            "{}* {}({}) {{",
            ty,
            helper.alloc_symbol,
            param_list(&params, false)
        ));
        self.indent += 1;
        if helper.fields.is_empty() {
            self.emit_line(&format!("{ty}* out_ = ({ty}*)calloc(1, sizeof({ty}));"));
            self.emit_line("return out_;");
        } else {
            self.emit_line(&format!("{ty}* out_ = ({ty}*)malloc(sizeof({ty}));"));
            self.emit_line("if (out_ == NULL) return NULL;");
            for plan in &helper.fields {
                let field = &plan.field.name;
                let line = match plan.kind {
                    FieldKind::Aggregate(_) => format!("out_->{field} = *{field};"),
                    FieldKind::Array => {
                        format!("memcpy(out_->{field}, {field}, sizeof(out_->{field}));")
                    }
                    FieldKind::Scalar(_) | FieldKind::Pointer => {
                        format!("out_->{field} = {field};")
                    }
                };
                self.emit_line(&line);
            }
            self.emit_line("return out_;");
        }
        self.indent -= 1;
        self.emit_line("}");
        self.emit_line("");
        self.emit_line(&format!(
            "void {}({}* ptr) {{ free(ptr); }}",
            helper.free_symbol, ty
        ));
        Ok(())
    }

    /// Emit one pointerized wrapper on a single line.
    fn emit_wrapper(&mut self, function: &FunctionPlan<'_>, shim: &ShimPlan) {
        let original = function.function;
        let sig = &original.signature;
        let params = param_list(&shim.params, false);
        let call = shim.call_expression(&original.name);

        let line = match &function.ret {
            Slot::ByValue(agg) => {
                let ty = &agg.spelled;
                let local = if shim.params.iter().any(|p| p.name == "result") {
                    "result_"
                } else {
                    "result"
                };
                format!(
                    "{ty}* {sym}({params}) {{ {ty}* {local} = ({ty}*)malloc(sizeof({ty})); \
                     if ({local} == NULL) return NULL; *{local} = {call}; return {local}; }}",
                    sym = shim.symbol,
                )
            }
            _ if sig.returns_void() => {
                format!("void {}({}) {{ {}; }}", shim.symbol, params, call)
            }
            _ => format!(
                "{} {}({}) {{ return {}; }}",
                type_with_depth(&sig.return_type, sig.return_pointer_depth),
                shim.symbol,
                params,
                call
            ),
        };
        self.emit_line(&line);
    }

    fn emit_line(&mut self, s: &str) {
        if !s.is_empty() {
            for _ in 0..self.indent {
                self.output.push_str("    ");
            }
        }
        self.output.push_str(s);
        self.output.push('\n');
    }
}

impl Default for ShimCodegen {
    fn default() -> Self {
        Self::new()
    }
}

/// The allocator parameter standing in for one field.
fn allocator_param(plan: &shimgen_ast::pointerize::FieldPlan<'_>) -> Parameter {
    let field = plan.field;
    let mut param = Parameter::new(field.ty.clone(), field.pointer_depth, &field.name);
    match plan.kind {
        FieldKind::Aggregate(_) => param.pointer_depth += 1,
        FieldKind::Array => {
            param.ty.is_const = true;
            param.pointer_depth += 1;
        }
        FieldKind::Scalar(_) | FieldKind::Pointer => {
            param.function_pointer = field.function_pointer.clone();
        }
    }
    param
}

/// Convenience function to generate the shim source with default options.
pub fn compile_to_shim(plan: &HeaderPlan<'_>) -> Result<String, CodegenError> {
    let mut codegen = ShimCodegen::new();
    codegen.generate(plan)
}

/// Convenience function to generate the shim source with specified options.
pub fn compile_to_shim_with_options(
    plan: &HeaderPlan<'_>,
    options: ShimCodegenOptions,
) -> Result<String, CodegenError> {
    let mut codegen = ShimCodegen::with_options(options);
    codegen.generate(plan)
}
