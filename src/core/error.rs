//! SF-010: Error taxonomy for every compile stage.
//!
//! Every failure of a compile is a `TransformError`. The orchestrator wraps
//! each one in a `Diagnostic` (stage + originating plugin) and returns the
//! whole batch as a `CompileError`.

use super::types::{CompileStage, DirectiveTarget, FieldRef, Location, PluginId, Slot};
use std::fmt;

/// Malformed schema text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{line}:{column}: {message}")]
pub struct SchemaParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl SchemaParseError {
    pub fn at(location: Location, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: location.line,
            column: location.column,
        }
    }
}

/// A directive-argument or placement problem found by the validate stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("@{directive} on {target}: {message}")]
pub struct ValidationError {
    pub directive: String,
    pub target: DirectiveTarget,
    pub message: String,
}

impl ValidationError {
    pub fn new(directive: &str, target: DirectiveTarget, message: impl Into<String>) -> Self {
        Self {
            directive: directive.to_string(),
            target,
            message: message.into(),
        }
    }
}

fn cycle_path(cycle: &[String]) -> String {
    let mut parts: Vec<&str> = cycle.iter().map(String::as_str).collect();
    if let Some(first) = cycle.first() {
        parts.push(first);
    }
    parts.join(" -> ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("schema parse error at {0}")]
    SchemaParse(#[from] SchemaParseError),

    #[error("directive @{directive} is claimed by both '{existing}' and '{claimant}'")]
    DuplicateDirectiveOwner {
        directive: String,
        existing: PluginId,
        claimant: PluginId,
    },

    #[error("plugin dependency cycle: {}", cycle_path(.cycle))]
    DependencyCycle { cycle: Vec<PluginId> },

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("slot conflict on {field} ({slot}): '{first}' and '{second}' both attach non-commutative stages")]
    SlotConflict {
        field: FieldRef,
        slot: Slot,
        first: PluginId,
        second: PluginId,
    },

    #[error("directive @{directive} on {target} has no registered owner")]
    UnsupportedDirective {
        directive: String,
        target: DirectiveTarget,
    },

    #[error("{message}")]
    Plugin { message: String },

    #[error("{message}")]
    Finalize { message: String },

    #[error("resource '{id}' is already defined by '{existing}' with a different definition")]
    DuplicateResource { id: String, existing: PluginId },

    #[error("resource '{id}' depends on unknown resource '{dependency}'")]
    UnknownResourceDependency { id: String, dependency: String },

    #[error("resource dependency cycle: {}", cycle_path(.cycle))]
    ResourceCycle { cycle: Vec<String> },

    #[error("field {0} does not exist in the schema")]
    UnknownField(FieldRef),

    #[error("context is frozen; no further mutations are accepted")]
    Frozen,

    #[error("compile cancelled before stage {0}")]
    Cancelled(CompileStage),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("render error: {0}")]
    Render(String),
}

impl TransformError {
    /// Shorthand for a plugin-raised error.
    pub fn plugin(message: impl Into<String>) -> Self {
        Self::Plugin {
            message: message.into(),
        }
    }
}

/// A `TransformError` tagged with where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: CompileStage,
    pub plugin: Option<PluginId>,
    pub error: TransformError,
}

impl Diagnostic {
    pub fn new(stage: CompileStage, error: TransformError) -> Self {
        Self {
            stage,
            plugin: None,
            error,
        }
    }

    pub fn from_plugin(stage: CompileStage, plugin: &str, error: TransformError) -> Self {
        Self {
            stage,
            plugin: Some(plugin.to_string()),
            error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.plugin {
            Some(p) => write!(f, "[{}] {}: {}", self.stage, p, self.error),
            None => write!(f, "[{}] {}", self.stage, self.error),
        }
    }
}

/// Aggregate of every diagnostic from the stage(s) that ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    pub fn single(stage: CompileStage, error: TransformError) -> Self {
        Self {
            diagnostics: vec![Diagnostic::new(stage, error)],
        }
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &TransformError> {
        self.diagnostics.iter().map(|d| &d.error)
    }

    /// Stage in which the compile stopped.
    pub fn stage(&self) -> Option<CompileStage> {
        self.diagnostics.first().map(|d| d.stage)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compile failed with {} error(s)", self.diagnostics.len())?;
        for d in &self.diagnostics {
            write!(f, "\n  {}", d)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// Non-fatal findings surfaced alongside a successful compile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("directive @{directive} on {target} has no registered owner; ignored")]
    UnsupportedDirective {
        directive: String,
        target: DirectiveTarget,
    },
}
