pub mod cli;
pub mod composer;
pub mod config;
pub mod error;
pub mod parser;
pub mod runtime;

// Re-export the compile API
pub use composer::{compile, Pipeline, Template};
pub use error::CompileError;
pub use runtime::{Bindings, Injected, Meta, Report, Validate};
