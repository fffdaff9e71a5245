//! Data models for shopscrape.

pub mod product;

pub use product::{Field, FieldParseError, Product, MAX_RATING};
