//! Rendering of declaration nodes back to C source.
//!
//! The shim emitter uses these to re-declare parameters and struct fields
//! exactly as the header spells them, so the generated C compiles against the
//! original header without casts.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::ast::*;

/// Conversion of a declaration node to C source text.
pub trait ToC {
    fn to_c(&self) -> String;
}

impl ToC for TypeSpec {
    fn to_c(&self) -> String {
        let mut out = String::new();
        if self.is_const {
            out.push_str("const ");
        }
        if self.is_unsigned {
            out.push_str("unsigned ");
        }
        if let Some(tag) = self.tag {
            out.push_str(tag.keyword());
            out.push(' ');
        }
        out.push_str(&self.name);
        out
    }
}

/// Render a type followed by `depth` pointer markers, e.g. `Color*`.
pub fn type_with_depth(ty: &TypeSpec, depth: usize) -> String {
    let mut out = ty.to_c();
    for _ in 0..depth {
        out.push('*');
    }
    out
}

/// Render `ret (*name)(params)`.
fn function_pointer_declarator(sig: &Signature, name: &str) -> String {
    format!(
        "{} (*{})({})",
        type_with_depth(&sig.return_type, sig.return_pointer_depth),
        name,
        param_list(&sig.params, sig.is_variadic)
    )
}

impl ToC for Parameter {
    fn to_c(&self) -> String {
        if let Some(sig) = &self.function_pointer {
            return function_pointer_declarator(sig, &self.name);
        }
        let mut out = format!("{} {}", type_with_depth(&self.ty, self.pointer_depth), self.name);
        if let Some(len) = &self.array_len {
            out.push_str(&format!("[{}]", len));
        }
        out
    }
}

impl ToC for Field {
    fn to_c(&self) -> String {
        if let Some(sig) = &self.function_pointer {
            return format!("{};", function_pointer_declarator(sig, &self.name));
        }
        let mut out = format!("{} {}", type_with_depth(&self.ty, self.pointer_depth), self.name);
        if let Some(len) = &self.array_len {
            out.push_str(&format!("[{}]", len));
        }
        if let Some(bits) = &self.bit_width {
            out.push_str(&format!(" : {}", bits));
        }
        out.push(';');
        out
    }
}

/// Render a parameter list for a declaration. An empty, non-variadic list is `void`.
pub fn param_list(params: &[Parameter], is_variadic: bool) -> String {
    let mut parts: Vec<String> = params.iter().map(ToC::to_c).collect();
    if is_variadic {
        parts.push("...".to_string());
    }
    if parts.is_empty() {
        "void".to_string()
    } else {
        parts.join(", ")
    }
}

impl ToC for Function {
    /// The prototype without annotations, e.g. `void ClearBackground(Color color);`.
    fn to_c(&self) -> String {
        let sig = &self.signature;
        format!(
            "{} {}({});",
            type_with_depth(&sig.return_type, sig.return_pointer_depth),
            self.name,
            param_list(&sig.params, sig.is_variadic)
        )
    }
}

impl ToC for StructDef {
    fn to_c(&self) -> String {
        let keyword = if self.is_union { "union" } else { "struct" };
        let mut out = String::new();
        if self.is_typedef {
            out.push_str("typedef ");
        }
        out.push_str(keyword);
        if let Some(tag) = &self.tag {
            out.push(' ');
            out.push_str(tag);
        }
        out.push_str(" {\n");
        for field in &self.fields {
            out.push_str("    ");
            out.push_str(&field.to_c());
            out.push('\n');
        }
        out.push('}');
        if self.is_typedef {
            out.push(' ');
            out.push_str(&self.name);
        }
        out.push(';');
        out
    }
}
