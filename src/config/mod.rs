// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] is the TOML-backed data model with stock defaults.
//! - [`loader`] reads a config file from disk (or falls back to defaults).
//! - [`validate`] turns a `RawConfigFile` into a checked `ConfigFile`.
//! - [`paths`] builds the immutable [`PathTable`] every task receives.

pub mod loader;
pub mod model;
pub mod paths;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_or_default};
pub use model::{
    ConfigFile, ConfigSection, DistSection, HtmlifySection, ImagesSection, MinifySection,
    NotifySection, PathsSection, RawConfigFile, ServeSection, StylesSection, TaskConfig,
    TemplatesSection,
};
pub use paths::{InputCategory, OutputCategory, PathTable};
