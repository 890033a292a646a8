//! Core compiler: schema model, parsing, plugin ordering, composition, synthesis.

pub mod composer;
pub mod context;
pub mod digest;
pub mod error;
pub mod orchestrator;
pub mod parser;
pub mod printer;
pub mod registry;
pub mod resolver;
pub mod synthesizer;
pub mod types;
