//! SF-020: Transformer plugins.
//!
//! Every plugin owns one or more directives and takes part in three passes:
//! a read-only `validate`, then `transform_schema` and `transform_resolvers`
//! against the shared compile context. Passes run in the resolved plugin
//! order, so a plugin sees everything its dependencies contributed.

pub mod auth;
pub mod function;
pub mod persist;
pub mod searchable;

use crate::core::context::Context;
use crate::core::error::{TransformError, ValidationError};
use crate::core::types::*;

/// Contract every transformer implements. Passes must not touch anything
/// outside the schema or context they are handed.
pub trait TransformerPlugin: Send + Sync {
    /// Stable identifier (`persist`, `auth`, ...).
    fn id(&self) -> &str;

    /// Directives this plugin owns, with their argument shapes.
    fn directives(&self) -> Vec<DirectiveDefinition>;

    /// Plugins whose passes must complete before this one's begin.
    fn depends_on(&self) -> Vec<PluginId> {
        Vec::new()
    }

    /// Semantic checks beyond the declared argument shapes.
    fn validate(&self, _schema: &SchemaModel) -> Vec<ValidationError> {
        Vec::new()
    }

    fn transform_schema(&self, _ctx: &mut Context) -> Result<(), TransformError> {
        Ok(())
    }

    fn transform_resolvers(&self, _ctx: &mut Context) -> Result<(), TransformError> {
        Ok(())
    }
}

/// The built-in plugin set, in registration order.
pub fn builtin() -> Vec<Box<dyn TransformerPlugin>> {
    vec![
        Box::new(persist::PersistPlugin),
        Box::new(auth::AuthPlugin),
        Box::new(function::FunctionPlugin::default()),
        Box::new(searchable::SearchablePlugin),
    ]
}

/// Names of the object types carrying `directive`, in schema order.
pub fn types_with(schema: &SchemaModel, directive: &str) -> Vec<String> {
    schema
        .types
        .values()
        .filter(|t| t.kind == TypeKind::Object && t.has_directive(directive))
        .map(|t| t.name.clone())
        .collect()
}

/// First instance of `directive` on a type.
pub fn type_directive<'a>(ty: &'a TypeDef, directive: &str) -> Option<&'a DirectiveInstance> {
    ty.directives.iter().find(|d| d.name == directive)
}

/// English plural of a type name: `Todo` → `Todos`, `Category` → `Categories`.
pub fn pluralize(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with('y')
        && !matches!(
            lower.chars().rev().nth(1),
            Some('a' | 'e' | 'i' | 'o' | 'u')
        )
    {
        format!("{}ies", &name[..name.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        format!("{}es", name)
    } else {
        format!("{}s", name)
    }
}

/// Uppercase the first character.
pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether `s` is a valid GraphQL name.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Add a field, mapping a name collision to a plugin error.
pub fn add_field(
    ctx: &mut Context,
    type_name: &str,
    kind: TypeKind,
    field: FieldDef,
) -> Result<(), TransformError> {
    let ty = ctx
        .schema_mut()?
        .ensure_type(type_name, kind)
        .map_err(TransformError::plugin)?;
    ty.add_field(field).map_err(TransformError::plugin)
}
