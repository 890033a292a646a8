//! sdlforge: directive-driven schema compiler.
//!
//! Schema text annotated with directives goes in; a rewritten schema, an
//! infrastructure document and per-field resolver pipelines come out.
//! Each directive is owned by one transformer plugin, and plugins run in
//! dependency order.

pub mod cli;
pub mod core;
pub mod plugins;
