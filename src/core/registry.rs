//! SF-004: Directive registry. Directive ownership and plugin dependency edges.
//!
//! Each directive has exactly one owning plugin. A plugin's declared
//! dependencies become edges `(dependency, plugin)`: the dependency's passes
//! complete before the plugin's begin.

use super::error::{TransformError, ValidationError};
use super::types::*;
use indexmap::IndexMap;

/// Registry entry for one directive.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RegistryEntry {
    plugin: PluginId,
    definition: Option<DirectiveDefinition>,
}

#[derive(Debug, Clone, Default)]
pub struct DirectiveRegistry {
    entries: IndexMap<String, RegistryEntry>,
    /// Plugins in registration order, with their declared dependencies
    plugins: IndexMap<PluginId, Vec<PluginId>>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a plugin (with or without directives) and its dependencies.
    pub fn register_plugin(&mut self, plugin: &str, depends_on: &[PluginId]) {
        let deps = self.plugins.entry(plugin.to_string()).or_default();
        for dep in depends_on {
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
    }

    /// Claim a directive for a plugin. A second plugin claiming the same
    /// directive is a `DuplicateDirectiveOwner` error.
    pub fn register(
        &mut self,
        directive: &str,
        plugin: &str,
        depends_on: &[PluginId],
    ) -> Result<(), TransformError> {
        if let Some(existing) = self.entries.get(directive) {
            if existing.plugin != plugin {
                return Err(TransformError::DuplicateDirectiveOwner {
                    directive: directive.to_string(),
                    existing: existing.plugin.clone(),
                    claimant: plugin.to_string(),
                });
            }
        }
        self.register_plugin(plugin, depends_on);
        self.entries
            .entry(directive.to_string())
            .or_insert_with(|| RegistryEntry {
                plugin: plugin.to_string(),
                definition: None,
            });
        Ok(())
    }

    /// Register a directive together with its declared shape.
    pub fn register_definition(
        &mut self,
        definition: DirectiveDefinition,
        plugin: &str,
        depends_on: &[PluginId],
    ) -> Result<(), TransformError> {
        let name = definition.name.clone();
        self.register(&name, plugin, depends_on)?;
        if let Some(entry) = self.entries.get_mut(&name) {
            entry.definition = Some(definition);
        }
        Ok(())
    }

    /// Owning plugin of a directive.
    pub fn plugin_for(&self, directive: &str) -> Option<&str> {
        self.entries.get(directive).map(|e| e.plugin.as_str())
    }

    pub fn definition(&self, directive: &str) -> Option<&DirectiveDefinition> {
        self.entries.get(directive).and_then(|e| e.definition.as_ref())
    }

    /// Every registered directive name.
    pub fn directives(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Directives owned by a plugin, in registration order.
    pub fn directives_of(&self, plugin: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, e)| e.plugin == plugin)
            .map(|(d, _)| d.as_str())
            .collect()
    }

    /// Registered plugins, in registration order.
    pub fn plugins(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    /// All `(before, after)` edges, in registration order.
    pub fn dependency_edges(&self) -> Vec<(PluginId, PluginId)> {
        let mut edges = Vec::new();
        for (plugin, deps) in &self.plugins {
            for dep in deps {
                let edge = (dep.clone(), plugin.clone());
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }
        edges
    }
}

/// Check one directive use against its declared shape.
/// `occurrence` is how many times the same directive already appeared on
/// the same node before this one.
pub fn check_shape(
    definition: &DirectiveDefinition,
    use_: &DirectiveUse<'_>,
    occurrence: usize,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let target = use_.target();
    let err = |message: String| ValidationError::new(&definition.name, target.clone(), message);

    let location = use_.location_kind();
    if !definition.locations.contains(&location) {
        errors.push(err(format!("not allowed on {}", location)));
    }

    if occurrence > 0 && !definition.repeatable {
        errors.push(err("is not repeatable".to_string()));
    }

    for (name, value) in &use_.directive.arguments {
        match definition.argument(name) {
            None => errors.push(err(format!("unknown argument '{}'", name))),
            Some(shape) if !shape.kind.accepts(value) => errors.push(err(format!(
                "argument '{}' expects {}, found {}",
                name,
                shape.kind,
                value.kind_name()
            ))),
            Some(_) => {}
        }
    }

    for shape in definition.arguments.iter().filter(|a| a.required) {
        if use_.directive.argument(&shape.name).is_none() {
            errors.push(err(format!("missing required argument '{}'", shape.name)));
        }
    }

    errors
}
