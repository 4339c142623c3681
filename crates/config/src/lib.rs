//! Layered configuration for parley.
//!
//! A [`Config`] is resolved from an ordered list of document paths, most
//! specific first. Reads return the first layer that has the key; writes
//! always land in the first layer. Documents live in a [`ConfigSource`]:
//! in memory for tests and embedders, or as TOML files under a root
//! directory (`<root>/<path>.toml`).

pub mod error;
pub mod layered;
pub mod source;

pub use {
    error::{Error, Result},
    layered::{Config, ConfigGroup, ConfigResolver, LayeredResolver},
    source::{ConfigSource, Document, FileSource, MemorySource, config_dir},
};
