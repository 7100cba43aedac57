//! # confd-store
//!
//! Durable, concurrent-safe storage of typed configuration properties over a
//! single SQLite database file. Each property has a dotted key, a type tag,
//! and a value row in the table matching its tag; the tag is locked on first
//! insert and can only change by way of null (or deletion).

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{PropertyStore, PropertyType, SCHEMA_VERSION};
