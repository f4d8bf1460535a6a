//! Parser for C header declarations.
//!
//! This crate turns header text into the [`shimgen_ast::Header`] tree using
//! the `nom` parsing library. Only declarations are recognized; preprocessor
//! content is kept structurally and never expanded.

#![no_std]
#![forbid(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
mod parser;

#[cfg(feature = "alloc")]
pub use parser::*;
