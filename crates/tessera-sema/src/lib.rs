#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Semantic analysis for Tessera aggregate types.
//!
//! Three cooperating pieces:
//! - [`compat`]: decides whether two structurally different aggregate types
//!   may be used interchangeably, and whether that requires a runtime
//!   representation change;
//! - [`structure`]: validates that a literal aggregate value or template
//!   (dense or indexed) matches its declared type;
//! - [`convert`]: synthesizes and memoizes the runtime conversion routines
//!   the compatibility verdicts call for.
//!
//! # Example
//!
//! ```
//! use tessera_core::{Dimension, Field, PrimitiveType, TypeKind, TypeTable};
//! use tessera_sema::compat::CompatibilityChecker;
//!
//! let mut table = TypeTable::new();
//! let int = table.primitive(PrimitiveType::Integer);
//! let pair = table.declare(
//!     "Pair",
//!     TypeKind::Record {
//!         fields: vec![Field::required("x", int), Field::required("y", int)],
//!     },
//! );
//! let arr = table.declare(
//!     "IntPair",
//!     TypeKind::Array {
//!         element: int,
//!         dimension: Dimension::new(2, 0),
//!     },
//! );
//!
//! let mut checker = CompatibilityChecker::new(&table);
//! let result = checker.check_compatible(pair, arr);
//! assert!(result.compatible);
//! assert!(result.needs_conversion);
//! ```

pub mod compat;
pub mod convert;
pub mod diagnostics;
pub mod structure;

pub use compat::{CompatibilityChain, CompatibilityChecker, CompatibilityResult, TypeMismatch};
pub use convert::{CodeSink, ConversionKey, ConversionRegistry};
pub use diagnostics::{DiagnosticKind, Diagnostics, DiagnosticsPrinter, Severity};
pub use structure::{ExpectedKind, StructureValidator, ValidationOptions};

/// Internal-consistency failures.
///
/// These indicate the analysis was asked to process a construct it was not
/// built for. They are fatal to the current check and are never reported as
/// user diagnostics; user-facing semantic errors go through
/// [`Diagnostics`] instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A construct reached a position it can never legally occupy.
    #[error("internal error: {construct} cannot appear in {context}")]
    UnsupportedConstruct {
        construct: &'static str,
        context: &'static str,
    },

    /// A type kind reached an operation that has no rule for it.
    #[error("internal error: no {operation} rule for {kind} type `{name}`")]
    UnsupportedType {
        operation: &'static str,
        kind: &'static str,
        name: String,
    },
}

/// Result type for analysis operations with a fatal internal-error channel.
pub type Result<T> = std::result::Result<T, Error>;
