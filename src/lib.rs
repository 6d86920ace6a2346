//! Converts `curl` commands into API collections and specifications.

pub mod analysis;
pub mod config;
pub mod convert;
pub mod export;
pub mod naming;
pub mod parser;

pub use convert::{convert, Conversion, ConversionError, ConversionOptions};
