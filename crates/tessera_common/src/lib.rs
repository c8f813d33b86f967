//! Shared foundational types used across the Tessera NoC routing toolchain.
//!
//! This crate provides the internal-error result type, interned names for
//! router clusters and flows, content hashing used to fingerprint built
//! topologies, and the floating-point tolerance used when comparing distances.

#![warn(missing_docs)]

pub mod float;
pub mod hash;
pub mod ident;
pub mod result;

pub use float::is_close;
pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use result::{InternalError, TesseraResult};
