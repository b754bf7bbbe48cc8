//! Liftoff Core - option descriptors, configuration and errors
//!
//! This crate provides the declarative option tables that actions expose, the
//! engine that resolves them from explicit values, environment variables,
//! config files and defaults, and the `liftoff.yaml` configuration loader.

pub mod config;
pub mod error;
pub mod options;

pub use config::Config;
pub use error::{ConfigError, Result};
pub use options::{
    EnvSource, OptionDescriptor, OptionSet, OptionSources, ProcessEnv, ResolvedOptions,
    Validator, ValueKind, ValueSource,
};
