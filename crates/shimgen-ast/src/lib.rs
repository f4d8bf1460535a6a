//! Declaration model and pointerization analysis for shimgen.
//!
//! This crate holds everything between parsing and emission:
//!
//! - [`ast`]: the declaration tree produced by `shimgen-parser`
//! - [`pretty`]: rendering declarations back to C
//! - [`types`]: the primitive type table
//! - [`naming`]: names of generated symbols
//! - [`pointerize`]: the analyzer that decides which aggregates cross the
//!   native boundary by value and plans shims and helpers for them

#![no_std]
#![forbid(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
mod ast;
#[cfg(feature = "alloc")]
pub mod naming;
#[cfg(feature = "alloc")]
pub mod pointerize;
#[cfg(feature = "alloc")]
pub mod pretty;
#[cfg(feature = "alloc")]
pub mod types;

#[cfg(feature = "alloc")]
pub use ast::*;
#[cfg(feature = "alloc")]
pub use pointerize::{analyze, AnalysisError, Analyzer, HeaderPlan};
#[cfg(feature = "alloc")]
pub use types::{HostType, Type, TypeTable};
