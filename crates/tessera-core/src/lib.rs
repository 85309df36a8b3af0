#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures for Tessera.
//!
//! Two layers:
//! - **Type graph** (`types`): arena-interned declared types. A [`TypeId`] is
//!   the identity of a declaration; two structurally identical declarations
//!   are distinct nodes unless the front end explicitly unifies them.
//! - **Literal values** (`value`): the tree shape of aggregate value and
//!   template literals, populated either positionally (dense) or with
//!   explicit indices (sparse).
//!
//! Both layers are plain data. Analysis lives in `tessera-sema`.

pub mod types;
pub mod value;


pub use types::{Dimension, Field, PrimitiveType, TypeId, TypeKind, TypeNode, TypeTable};
pub use value::{IndexExpr, IndexedValue, Literal, Value, ValueBody};
