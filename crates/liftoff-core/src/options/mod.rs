//! Declarative option tables
//!
//! Every action describes its parameters as a list of [`OptionDescriptor`]s.
//! The table is plain data: key, short flag, environment variable, default,
//! optionality and an optional [`Validator`]. Front ends (the CLI, config
//! files, CI environments) feed raw values into [`OptionSet::resolve`], which
//! applies precedence, type coercion and validation in one place.

mod descriptor;
mod env;
mod resolve;
mod validator;

pub use descriptor::{OptionDescriptor, OptionSet, ValueKind};
pub use env::{EnvSource, ProcessEnv};
pub use resolve::{OptionSources, ResolvedOptions, ValueSource};
pub use validator::Validator;
