//! Code generators for shimgen.
//!
//! This crate turns an analyzed header into its two outputs:
//!
//! - [`c`] - the C shim: struct helpers and pointerized wrappers
//! - [`typescript`] - the `bun:ffi` binding module
//! - [`driver`] - parse, analyze and emit both outputs in one call
//!
//! Both emitters read the same [`shimgen_ast::HeaderPlan`], so the symbols the
//! binding resolves are exactly the symbols the shim exports.

#![no_std]
#![forbid(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
pub mod c;

#[cfg(feature = "alloc")]
pub mod driver;

#[cfg(feature = "alloc")]
pub mod typescript;

#[cfg(feature = "alloc")]
pub use c::{
    compile_to_shim, compile_to_shim_with_options, CodegenError, ShimCodegen, ShimCodegenOptions,
};

#[cfg(feature = "alloc")]
pub use driver::{generate, GenerateError, GenerateOptions, GeneratedOutput};

#[cfg(feature = "alloc")]
pub use typescript::{
    compile_to_ts, compile_to_ts_with_options, TsBindingCodegen, TsBindingOptions,
};
