//! TypeScript binding generator for Bun.
//!
//! Emits the host half of a binding as a single module built on `bun:ffi`:
//!
//! - one `dlopen` symbol table naming every bound symbol, shims included;
//! - a `NativeHandle` base class with deterministic, idempotent disposal, plus
//!   one subclass per aggregate that crosses the boundary by value;
//! - one exported function per bound header function, keeping the header's
//!   name and parameter order.
//!
//! Aggregates passed by value appear on the host as handle objects. Their
//! native memory comes from the generated allocator and goes back through the
//! generated deallocator, either on `dispose()` or when the handle is
//! collected.

use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use shimgen_ast::naming::ts_identifier;
use shimgen_ast::pointerize::{Binding, FieldKind, FunctionPlan, HelperPlan, Slot};
use shimgen_ast::pretty::ToC;
use shimgen_ast::{HeaderPlan, HostType};

use crate::c::CodegenError;

/// Options for binding generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TsBindingOptions {
    /// Base name of the shared library, without `lib` prefix or suffix
    /// (default: `"shim"`).
    pub library_name: String,
    /// Environment variable that overrides the library path
    /// (default: `"SHIMGEN_LIBRARY"`).
    pub library_env: String,
    /// Whether to emit the generated-file banner (default: true).
    pub banner: bool,
}

impl Default for TsBindingOptions {
    fn default() -> Self {
        Self {
            library_name: "shim".to_string(),
            library_env: "SHIMGEN_LIBRARY".to_string(),
            banner: true,
        }
    }
}

impl TsBindingOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shared library base name.
    pub fn with_library_name(mut self, name: &str) -> Self {
        self.library_name = name.to_string();
        self
    }

    /// Set the environment variable overriding the library path.
    pub fn with_library_env(mut self, var: &str) -> Self {
        self.library_env = var.to_string();
        self
    }

    /// Set whether to emit the banner.
    pub fn with_banner(mut self, banner: bool) -> Self {
        self.banner = banner;
        self
    }
}

/// `FFIType` member for a scalar.
fn ffi_scalar(host: HostType) -> &'static str {
    match host {
        HostType::VaList => "ptr",
        other => other.name(),
    }
}

/// TypeScript type of a scalar argument.
fn ts_scalar_arg(host: HostType) -> &'static str {
    match host {
        HostType::Bool => "boolean",
        HostType::Void => "void",
        HostType::VaList => "PointerLike",
        h if h.is_wide_integer() => "number | bigint",
        _ => "number",
    }
}

/// TypeScript type of a scalar return value.
fn ts_scalar_ret(host: HostType) -> &'static str {
    match host {
        HostType::Bool => "boolean",
        HostType::Void => "void",
        HostType::VaList => "Pointer | null",
        h if h.is_wide_integer() => "bigint",
        _ => "number",
    }
}

/// How one value is declared and passed on the host side.
struct HostArg {
    ffi: &'static str,
    ts_type: String,
    /// Expression passed to the native symbol.
    pass: String,
}

/// TypeScript binding code generator.
pub struct TsBindingCodegen {
    output: String,
    indent: usize,
    options: TsBindingOptions,
    handles: BTreeSet<String>,
}

impl TsBindingCodegen {
    /// Create a new binding generator with default options.
    pub fn new() -> Self {
        Self::with_options(TsBindingOptions::default())
    }

    /// Create a new binding generator with the specified options.
    pub fn with_options(options: TsBindingOptions) -> Self {
        Self {
            output: String::new(),
            indent: 0,
            options,
            handles: BTreeSet::new(),
        }
    }

    /// Generate the binding module for an analyzed header.
    pub fn generate(&mut self, plan: &HeaderPlan<'_>) -> Result<String, CodegenError> {
        self.output.clear();
        self.indent = 0;
        self.handles.clear();
        for helper in &plan.helpers {
            if !self.handles.insert(helper.aggregate.name.clone()) {
                return Err(CodegenError::DuplicateHelper {
                    aggregate: helper.aggregate.name.clone(),
                });
            }
        }

        self.emit_header();
        self.emit_symbol_table(plan)?;
        self.emit_prelude(plan);

        for helper in &plan.helpers {
            self.emit_handle_class(helper);
            self.emit_line("");
        }

        for function in &plan.functions {
            self.emit_function(function)?;
            self.emit_line("");
        }

        while self.output.ends_with("\n\n") {
            self.output.pop();
        }
        Ok(self.output.clone())
    }

    fn emit_header(&mut self) {
        if self.options.banner {
            self.emit_line("// Generated by shimgen. Do not edit.");
            self.emit_line("// Aggregates passed by value are exposed as owning handle classes.");
            self.emit_line("");
        }
        self.emit_line("import { dlopen, FFIType, suffix, type Pointer } from \"bun:ffi\";");
        self.emit_line("");
        self.emit_line(&format!(
            "const LIBRARY_PATH = process.env.{} ?? `lib{}.${{suffix}}`;",
            self.options.library_env, self.options.library_name
        ));
        self.emit_line("");
    }

    /// The single `dlopen` table: bound functions in order, then helpers.
    fn emit_symbol_table(&mut self, plan: &HeaderPlan<'_>) -> Result<(), CodegenError> {
        self.emit_line("const lib = dlopen(LIBRARY_PATH, {");
        self.indent += 1;
        for function in &plan.functions {
            let Some(symbol) = function.symbol() else {
                continue;
            };
            let args = self
                .function_args(function)?
                .iter()
                .map(|arg| format!("FFIType.{}", arg.ffi))
                .collect::<Vec<_>>()
                .join(", ");
            let returns = ffi_return(&function.ret);
            self.emit_line(&format!(
                "{}: {{ args: [{}], returns: FFIType.{} }},",
                symbol, args, returns
            ));
        }
        for helper in &plan.helpers {
            let args = self
                .allocator_args(helper)
                .iter()
                .map(|arg| format!("FFIType.{}", arg.ffi))
                .collect::<Vec<_>>()
                .join(", ");
            self.emit_line(&format!(
                "{}: {{ args: [{}], returns: FFIType.ptr }},",
                helper.alloc_symbol, args
            ));
            self.emit_line(&format!(
                "{}: {{ args: [FFIType.ptr], returns: FFIType.void }},",
                helper.free_symbol
            ));
        }
        self.indent -= 1;
        self.emit_line("});");
        self.emit_line("");
        Ok(())
    }

    fn emit_prelude(&mut self, plan: &HeaderPlan<'_>) {
        self.emit_line("export type PointerLike = Pointer | NodeJS.TypedArray | null;");
        self.emit_line("");

        let uses_text = plan.functions.iter().any(|f| {
            f.symbol().is_some() && f.params.iter().any(|p| matches!(p.slot, Slot::Text))
        });
        if uses_text {
            self.emit_line("/** Encode a string as a NUL-terminated UTF-8 buffer. */");
            self.emit_line("function cstr(value: string | null): Uint8Array | null {");
            self.indent += 1;
            self.emit_line("return value === null ? null : new TextEncoder().encode(value + \"\\0\");");
            self.indent -= 1;
            self.emit_line("}");
            self.emit_line("");
        }

        if plan.helpers.is_empty() {
            return;
        }
        for line in NATIVE_HANDLE_PRELUDE.lines() {
            self.emit_line(line);
        }
        self.emit_line("");
    }

    /// `class Name extends NativeHandle` with `create` and `adopt`.
    fn emit_handle_class(&mut self, helper: &HelperPlan<'_>) {
        let class = &helper.aggregate.name;
        tracing::debug!(aggregate = %class, "emitting handle class");
        self.emit_line(&format!(
            "/** Owned native `{}`; freed by `{}`. */",
            helper.aggregate.spelled, helper.free_symbol
        ));
        self.emit_line(&format!("export class {} extends NativeHandle {{", class));
        self.indent += 1;

        self.emit_line("private constructor(ptr: Pointer) {");
        self.indent += 1;
        self.emit_line(&format!(
            "super(ptr, (p) => lib.symbols.{}(p));",
            helper.free_symbol
        ));
        self.indent -= 1;
        self.emit_line("}");
        self.emit_line("");

        let args = self.allocator_args(helper);
        let params = helper
            .fields
            .iter()
            .zip(&args)
            .map(|(plan, arg)| format!("{}: {}", ts_identifier(&plan.field.name), arg.ts_type))
            .collect::<Vec<_>>()
            .join(", ");
        let pass = args
            .iter()
            .map(|arg| arg.pass.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        self.emit_line(&format!("static create({}): {} {{", params, class));
        self.indent += 1;
        self.emit_line(&format!(
            "return new {}(expectPointer(lib.symbols.{}({}), \"{}\"));",
            class, helper.alloc_symbol, pass, helper.alloc_symbol
        ));
        self.indent -= 1;
        self.emit_line("}");
        self.emit_line("");

        self.emit_line("/** Take ownership of a pointer returned by a pointerized function. */");
        self.emit_line(&format!("static adopt(ptr: Pointer): {} {{", class));
        self.indent += 1;
        self.emit_line(&format!("return new {}(ptr);", class));
        self.indent -= 1;
        self.emit_line("}");

        self.indent -= 1;
        self.emit_line("}");
    }

    /// One `export function` per header function; skipped ones leave a comment.
    fn emit_function(&mut self, function: &FunctionPlan<'_>) -> Result<(), CodegenError> {
        let name = &function.function.name;
        let symbol = match &function.binding {
            Binding::Skipped(reason) => {
                self.emit_line(&format!("// {}: skipped, {}.", name, reason.describe()));
                return Ok(());
            }
            Binding::Direct => name.as_str(),
            Binding::Shim(shim) => shim.symbol.as_str(),
        };

        let args = self.function_args(function)?;
        let params = function
            .params
            .iter()
            .zip(&args)
            .map(|(plan, arg)| format!("{}: {}", ts_identifier(&plan.param.name), arg.ts_type))
            .collect::<Vec<_>>()
            .join(", ");
        let call = format!(
            "lib.symbols.{}({})",
            symbol,
            args.iter()
                .map(|arg| arg.pass.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        self.emit_line(&format!("/** `{}` */", function.function.to_c()));
        let (ret_type, body) = match &function.ret {
            Slot::Void => ("void".to_string(), format!("{};", call)),
            Slot::Primitive(host) => (ts_scalar_ret(*host).to_string(), format!("return {};", call)),
            Slot::Text => (
                "string | null".to_string(),
                format!("const raw_ = {};\nreturn raw_ === null ? null : String(raw_);", call),
            ),
            Slot::Pointer { .. } | Slot::Callback => {
                ("Pointer | null".to_string(), format!("return {};", call))
            }
            Slot::ByValue(agg) => {
                self.require_handle(&agg.name, name)?;
                (
                    agg.name.clone(),
                    format!(
                        "return {}.adopt(expectPointer({}, \"{}\"));",
                        agg.name, call, symbol
                    ),
                )
            }
        };

        self.emit_line(&format!(
            "export function {}({}): {} {{",
            name, params, ret_type
        ));
        self.indent += 1;
        for line in body.lines() {
            self.emit_line(line);
        }
        self.indent -= 1;
        self.emit_line("}");
        Ok(())
    }

    fn require_handle(&self, aggregate: &str, function: &str) -> Result<(), CodegenError> {
        if self.handles.contains(aggregate) {
            Ok(())
        } else {
            Err(CodegenError::MissingHelper {
                aggregate: aggregate.to_string(),
                function: function.to_string(),
            })
        }
    }

    /// Host arguments of a bound function, in parameter order.
    fn function_args(&self, function: &FunctionPlan<'_>) -> Result<Vec<HostArg>, CodegenError> {
        let mut args = Vec::with_capacity(function.params.len());
        for plan in &function.params {
            let name = ts_identifier(&plan.param.name);
            let arg = match &plan.slot {
                Slot::Void => HostArg {
                    ffi: "void",
                    ts_type: "void".to_string(),
                    pass: name,
                },
                Slot::Primitive(host) => HostArg {
                    ffi: ffi_scalar(*host),
                    ts_type: ts_scalar_arg(*host).to_string(),
                    pass: name,
                },
                Slot::Text => HostArg {
                    ffi: "ptr",
                    ts_type: "string | null".to_string(),
                    pass: format!("cstr({})", name),
                },
                Slot::Pointer {
                    aggregate: Some(aggregate),
                } if self.handles.contains(aggregate) => HostArg {
                    ffi: "ptr",
                    ts_type: format!("{} | PointerLike", aggregate),
                    pass: format!("({0} instanceof {1} ? {0}.ptr : {0})", name, aggregate),
                },
                Slot::Pointer { .. } => HostArg {
                    ffi: "ptr",
                    ts_type: "PointerLike".to_string(),
                    pass: name,
                },
                Slot::Callback => HostArg {
                    ffi: "function",
                    ts_type: "PointerLike".to_string(),
                    pass: name,
                },
                Slot::ByValue(agg) => {
                    self.require_handle(&agg.name, &function.function.name)?;
                    HostArg {
                        ffi: "ptr",
                        ts_type: agg.name.clone(),
                        pass: format!("{}.ptr", name),
                    }
                }
            };
            args.push(arg);
        }
        Ok(args)
    }

    /// Host arguments of an allocator, in field order.
    fn allocator_args(&self, helper: &HelperPlan<'_>) -> Vec<HostArg> {
        helper
            .fields
            .iter()
            .map(|plan| {
                let name = ts_identifier(&plan.field.name);
                match &plan.kind {
                    FieldKind::Scalar(host) => HostArg {
                        ffi: ffi_scalar(*host),
                        ts_type: ts_scalar_arg(*host).to_string(),
                        pass: name,
                    },
                    FieldKind::Aggregate(inner) => HostArg {
                        ffi: "ptr",
                        ts_type: inner.clone(),
                        pass: format!("{}.ptr", name),
                    },
                    FieldKind::Array | FieldKind::Pointer => HostArg {
                        ffi: "ptr",
                        ts_type: "PointerLike".to_string(),
                        pass: name,
                    },
                }
            })
            .collect()
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

impl Default for TsBindingCodegen {
    fn default() -> Self {
        Self::new()
    }
}

/// `FFIType` member for a return slot.
fn ffi_return(slot: &Slot<'_>) -> &'static str {
    match slot {
        Slot::Void => "void",
        Slot::Primitive(host) => ffi_scalar(*host),
        Slot::Text => "cstring",
        Slot::Pointer { .. } | Slot::Callback | Slot::ByValue(_) => "ptr",
    }
}

/// Shared base class for owned native aggregates.
///
/// `dispose()` unregisters from the finalizer before freeing, so a block is
/// released at most once whichever path runs first.
const NATIVE_HANDLE_PRELUDE: &str = r#"type Release = (ptr: Pointer) => void;

const registry = new FinalizationRegistry<{ ptr: Pointer; release: Release }>((held) => {
    held.release(held.ptr);
});

/** Throw if a native allocation came back NULL. */
function expectPointer(ptr: Pointer | null, symbol: string): Pointer {
    if (ptr === null) {
        throw new Error(`${symbol} returned NULL`);
    }
    return ptr;
}

/** Exclusive owner of one native block. */
export abstract class NativeHandle {
    #ptr: Pointer | null;
    readonly #release: Release;

    protected constructor(ptr: Pointer, release: Release) {
        this.#ptr = ptr;
        this.#release = release;
        registry.register(this, { ptr, release }, this);
    }

    /** The native pointer. Throws after `dispose()`. */
    get ptr(): Pointer {
        if (this.#ptr === null) {
            throw new Error(`${this.constructor.name} used after dispose()`);
        }
        return this.#ptr;
    }

    get disposed(): boolean {
        return this.#ptr === null;
    }

    /** Free the native block now. Calling it again does nothing. */
    dispose(): void {
        const ptr = this.#ptr;
        if (ptr === null) {
            return;
        }
        this.#ptr = null;
        registry.unregister(this);
        this.#release(ptr);
    }

    [Symbol.dispose](): void {
        this.dispose();
    }
}"#;

/// Convenience function to generate the binding module with default options.
pub fn compile_to_ts(plan: &HeaderPlan<'_>) -> Result<String, CodegenError> {
    let mut codegen = TsBindingCodegen::new();
    codegen.generate(plan)
}

/// Convenience function to generate the binding module with specified options.
pub fn compile_to_ts_with_options(
    plan: &HeaderPlan<'_>,
    options: TsBindingOptions,
) -> Result<String, CodegenError> {
    let mut codegen = TsBindingCodegen::with_options(options);
    codegen.generate(plan)
}
