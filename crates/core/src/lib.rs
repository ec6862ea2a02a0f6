//! Domain types and validation for the Dalma asset catalog.
//!
//! Pure logic only: field validation, tag normalization, and the derived
//! popularity score. No I/O lives here.

pub mod asset;
pub mod error;
pub mod types;
