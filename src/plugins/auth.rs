//! SF-022: `@auth`: rule-based access control.
//!
//! Rules are records: `{allow: owner|groups|private|public, groups: [..],
//! operations: [create|read|update|delete], ownerField: ".."}`. Type-level
//! rules guard every operation some plugin bound to the type; field-level
//! rules guard the field itself.

use super::{add_field, is_identifier, types_with, upper_first, TransformerPlugin};
use crate::core::context::Context;
use crate::core::error::{TransformError, ValidationError};
use crate::core::types::*;

pub const DIRECTIVE: &str = "auth";
const DEFAULT_OWNER_FIELD: &str = "owner";
const ROOT_TYPES: [&str; 3] = ["Query", "Mutation", "Subscription"];

pub struct AuthPlugin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    Owner,
    Groups,
    Private,
    Public,
}

impl AuthStrategy {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Self::Owner),
            "groups" => Some(Self::Groups),
            "private" => Some(Self::Private),
            "public" => Some(Self::Public),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Groups => "groups",
            Self::Private => "private",
            Self::Public => "public",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    Create,
    Read,
    Update,
    Delete,
}

impl AuthOperation {
    const ALL: [AuthOperation; 4] = [Self::Create, Self::Read, Self::Update, Self::Delete];

    fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "read" => Some(Self::Read),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    fn of(op: Operation) -> Self {
        match op {
            Operation::Create => Self::Create,
            Operation::Update => Self::Update,
            Operation::Delete => Self::Delete,
            Operation::Get | Operation::List | Operation::Search => Self::Read,
        }
    }
}

/// One validated rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRule {
    pub allow: AuthStrategy,
    pub groups: Vec<String>,
    pub operations: Vec<AuthOperation>,
    pub owner_field: String,
}

impl AuthRule {
    fn applies_to(&self, op: AuthOperation) -> bool {
        self.operations.contains(&op)
    }

    fn describe(&self) -> String {
        match self.allow {
            AuthStrategy::Owner => format!("owner:{}", self.owner_field),
            AuthStrategy::Groups => format!("groups:{}", self.groups.join("|")),
            other => other.as_str().to_string(),
        }
    }
}

/// Parse one rule record. Returns every problem found, not just the first.
fn parse_rule(value: &Value) -> Result<AuthRule, Vec<String>> {
    let Some(record) = value.as_object() else {
        return Err(vec![format!("rule must be an object, found {}", value.kind_name())]);
    };
    let mut problems = Vec::new();

    for key in record.keys() {
        if !matches!(key.as_str(), "allow" | "groups" | "operations" | "ownerField") {
            problems.push(format!("unknown rule key '{}'", key));
        }
    }

    let allow = match record.get("allow").and_then(Value::as_symbol) {
        Some(s) => AuthStrategy::parse(s).or_else(|| {
            problems.push(format!(
                "allow must be one of owner, groups, private, public; found '{}'",
                s
            ));
            None
        }),
        None => {
            problems.push("rule is missing 'allow'".to_string());
            None
        }
    };

    let mut groups = Vec::new();
    match record.get("groups") {
        None | Some(Value::Null) => {}
        Some(Value::List(items)) => {
            for item in items {
                match item.as_str() {
                    Some(g) if !g.is_empty() => groups.push(g.to_string()),
                    _ => problems.push(format!("group names must be non-empty strings, found {}", item)),
                }
            }
        }
        Some(Value::String(g)) => groups.push(g.clone()),
        Some(other) => problems.push(format!("groups must be a list, found {}", other.kind_name())),
    }
    if allow == Some(AuthStrategy::Groups) && groups.is_empty() {
        problems.push("a groups rule needs at least one group".to_string());
    }

    let operations = match record.get("operations") {
        None | Some(Value::Null) => AuthOperation::ALL.to_vec(),
        Some(value) => {
            let items: Vec<Value> = match value {
                Value::List(items) => items.clone(),
                single => vec![single.clone()],
            };
            let mut ops = Vec::new();
            for item in &items {
                match item.as_symbol().and_then(AuthOperation::parse) {
                    Some(op) if !ops.contains(&op) => ops.push(op),
                    Some(_) => {}
                    None => problems.push(format!(
                        "operations must be create, read, update or delete; found {}",
                        item
                    )),
                }
            }
            ops
        }
    };

    let owner_field = match record.get("ownerField") {
        None | Some(Value::Null) => DEFAULT_OWNER_FIELD.to_string(),
        Some(Value::String(f)) if is_identifier(f) => f.clone(),
        Some(other) => {
            problems.push(format!("ownerField must be a field name, found {}", other));
            DEFAULT_OWNER_FIELD.to_string()
        }
    };

    match allow {
        Some(allow) if problems.is_empty() => Ok(AuthRule {
            allow,
            groups,
            operations,
            owner_field,
        }),
        _ => Err(problems),
    }
}

/// Rules of one `@auth` instance; invalid rules are skipped.
pub fn rules_of(directive: &DirectiveInstance) -> Vec<AuthRule> {
    directive
        .argument("rules")
        .map(|v| match v {
            Value::List(items) => items.iter().filter_map(|r| parse_rule(r).ok()).collect(),
            single => parse_rule(single).into_iter().collect(),
        })
        .unwrap_or_default()
}

fn type_rules(ty: &TypeDef) -> Vec<AuthRule> {
    ty.directives
        .iter()
        .filter(|d| d.name == DIRECTIVE)
        .flat_map(rules_of)
        .collect()
}

fn auth_stage(name: &str, op: AuthOperation, rules: &[AuthRule]) -> Stage {
    let checks: Vec<String> = rules
        .iter()
        .filter(|r| r.applies_to(op))
        .map(|r| format!("\"{}\"", r.describe()))
        .collect();
    Stage::new(name, Slot::Auth)
        .before(format!(
            "$util.authorize($ctx.identity, [{}])",
            checks.join(", ")
        ))
        .after("$util.toJson($ctx.prev.result)")
}

fn owner_filter_stage(name: &str, rules: &[AuthRule]) -> Option<Stage> {
    let fields: Vec<&str> = rules
        .iter()
        .filter(|r| r.allow == AuthStrategy::Owner && r.applies_to(AuthOperation::Read))
        .map(|r| r.owner_field.as_str())
        .collect();
    if fields.is_empty() {
        return None;
    }
    Some(
        Stage::new(name, Slot::PostDataLoad)
            .after(format!(
                "$util.filterByOwner($ctx.prev.result, $ctx.identity.sub, [{}])",
                fields
                    .iter()
                    .map(|f| format!("\"{}\"", f))
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
            .commutative(),
    )
}

impl TransformerPlugin for AuthPlugin {
    fn id(&self) -> &str {
        "auth"
    }

    fn directives(&self) -> Vec<DirectiveDefinition> {
        vec![DirectiveDefinition::new(
            DIRECTIVE,
            &[DirectiveLocation::Object, DirectiveLocation::FieldDefinition],
        )
        .required_arg("rules", ValueKind::List(Box::new(ValueKind::Object)))]
    }

    fn depends_on(&self) -> Vec<PluginId> {
        vec!["persist".to_string(), "searchable".to_string()]
    }

    fn validate(&self, schema: &SchemaModel) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for use_ in schema.uses_of(DIRECTIVE) {
            let Some(rules) = use_.directive.argument("rules") else {
                // missing argument is reported by the shape check
                continue;
            };
            let items: Vec<&Value> = match rules {
                Value::List(items) => items.iter().collect(),
                single => vec![single],
            };
            if items.is_empty() {
                errors.push(ValidationError::new(
                    DIRECTIVE,
                    use_.target(),
                    "rules must not be empty",
                ));
            }
            for (i, rule) in items.into_iter().enumerate() {
                if let Err(problems) = parse_rule(rule) {
                    for problem in problems {
                        errors.push(ValidationError::new(
                            DIRECTIVE,
                            use_.target(),
                            format!("rule {}: {}", i, problem),
                        ));
                    }
                }
            }
        }
        errors
    }

    fn transform_schema(&self, ctx: &mut Context) -> Result<(), TransformError> {
        for type_name in types_with(ctx.schema(), DIRECTIVE) {
            let Some(ty) = ctx.schema().get_type(&type_name) else {
                continue;
            };
            let mut missing: Vec<String> = Vec::new();
            for rule in type_rules(ty) {
                if rule.allow == AuthStrategy::Owner
                    && ty.field(&rule.owner_field).is_none()
                    && !missing.contains(&rule.owner_field)
                {
                    missing.push(rule.owner_field);
                }
            }
            for field in missing {
                tracing::debug!(type_name = %type_name, field = %field, "adding owner field");
                add_field(
                    ctx,
                    &type_name,
                    TypeKind::Object,
                    FieldDef::new(&field, TypeRef::named("String")),
                )?;
            }
        }
        Ok(())
    }

    fn transform_resolvers(&self, ctx: &mut Context) -> Result<(), TransformError> {
        // type-level rules guard every bound operation
        for type_name in types_with(ctx.schema(), DIRECTIVE) {
            let rules = match ctx.schema().get_type(&type_name) {
                Some(ty) => type_rules(ty),
                None => continue,
            };
            let bindings = ctx.bindings_for(&type_name).to_vec();
            for binding in &bindings {
                let op = AuthOperation::of(binding.operation);
                let name = format!("auth{}", upper_first(&binding.field.field_name));
                ctx.attach_stage(&binding.field, auth_stage(&name, op, &rules))?;
                if binding.operation.is_read() {
                    let filter = format!("ownerFilter{}", upper_first(&binding.field.field_name));
                    if let Some(stage) = owner_filter_stage(&filter, &rules) {
                        ctx.attach_stage(&binding.field, stage)?;
                    }
                }
            }
            ctx.defer(Requirement::TypeHasDataSource(type_name))?;
        }

        // field-level rules guard the field itself
        let guarded: Vec<(FieldRef, Vec<AuthRule>)> = ctx
            .schema()
            .uses_of(DIRECTIVE)
            .into_iter()
            .filter_map(|u| {
                let field = u.field.filter(|_| u.on_field())?;
                Some((
                    FieldRef::new(&u.target.name, &field.name),
                    rules_of(u.directive),
                ))
            })
            .collect();
        for (field, rules) in guarded {
            let is_root = ROOT_TYPES.contains(&field.type_name.as_str());
            let op = if field.type_name == "Mutation" {
                AuthOperation::Update
            } else {
                AuthOperation::Read
            };
            let name = format!("auth{}", upper_first(&field.field_name));
            ctx.attach_stage(&field, auth_stage(&name, op, &rules))?;
            let requirement = if is_root {
                Requirement::FieldHasDataSource(field)
            } else {
                Requirement::TypeHasDataSource(field.type_name)
            };
            ctx.defer(requirement)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_schema;
    use crate::plugins::persist::PersistPlugin;

    #[test]
    fn test_sf022_parse_rules() {
        let schema = parse_schema(
            "type Todo @auth(rules: [{allow: owner, ownerField: \"author\", operations: [read, update]}, {allow: groups, groups: [\"Admin\"]}]) { id: ID! }",
        )
        .unwrap();
        let rules = rules_of(schema.get_type("Todo").unwrap().directives.first().unwrap());
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].allow, AuthStrategy::Owner);
        assert_eq!(rules[0].owner_field, "author");
        assert_eq!(rules[0].operations, vec![AuthOperation::Read, AuthOperation::Update]);
        assert_eq!(rules[1].groups, vec!["Admin"]);
        assert_eq!(rules[1].operations.len(), 4);
    }

    #[test]
    fn test_sf022_validate_reports_every_problem() {
        let schema = parse_schema(
            "type Todo @auth(rules: [{allow: everyone}, {allow: groups}, {allow: owner, ownerField: \"bad-name\", operations: [erase]}]) { id: ID! }\n\
             type Note { body: String @auth(rules: []) }",
        )
        .unwrap();
        let messages: Vec<String> = AuthPlugin
            .validate(&schema)
            .iter()
            .map(|e| e.to_string())
            .collect();
        assert_eq!(messages.len(), 5, "{messages:?}");
        assert!(messages[0].contains("rule 0: allow must be one of"));
        assert!(messages[1].contains("rule 1: a groups rule needs at least one group"));
        assert!(messages[2].contains("rule 2: operations must be"));
        assert!(messages[3].contains("rule 2: ownerField must be a field name"));
        assert_eq!(messages[4], "@auth on Note.body: rules must not be empty");
    }

    #[test]
    fn test_sf022_adds_owner_field_and_guards_bindings() {
        let schema = parse_schema(
            "type Todo @persist @auth(rules: [{allow: owner}]) { id: ID! content: String }",
        )
        .unwrap();
        let mut ctx = Context::new(schema, CompileConfig::default());
        ctx.set_plugin_order(vec!["persist".into(), "auth".into()]);
        ctx.enter_plugin("persist");
        PersistPlugin.transform_schema(&mut ctx).unwrap();
        ctx.enter_plugin("auth");
        AuthPlugin.transform_schema(&mut ctx).unwrap();
        ctx.enter_plugin("persist");
        PersistPlugin.transform_resolvers(&mut ctx).unwrap();
        ctx.enter_plugin("auth");
        AuthPlugin.transform_resolvers(&mut ctx).unwrap();

        assert!(ctx.schema().contains_field(&FieldRef::new("Todo", "owner")));

        let create = ctx.contributions_for(&FieldRef::new("Mutation", "createTodo"));
        let slots: Vec<(Slot, &str)> = create
            .iter()
            .map(|c| (c.stage.slot, c.plugin.as_str()))
            .collect();
        assert_eq!(slots, vec![(Slot::DataLoad, "persist"), (Slot::Auth, "auth")]);

        let list = ctx.contributions_for(&FieldRef::new("Query", "listTodos"));
        assert_eq!(list.len(), 3);
        assert_eq!(list[2].stage.slot, Slot::PostDataLoad);
        assert!(list[2].stage.commutative);

        assert_eq!(
            ctx.deferred()[0].requirement,
            Requirement::TypeHasDataSource("Todo".into())
        );
        assert_eq!(ctx.deferred()[0].plugin, "auth");
    }

    #[test]
    fn test_sf022_field_rule_on_root_field_defers_data_source() {
        let schema =
            parse_schema("type Query { secret: String @auth(rules: [{allow: private}]) }").unwrap();
        let mut ctx = Context::new(schema, CompileConfig::default());
        ctx.enter_plugin("auth");
        AuthPlugin.transform_resolvers(&mut ctx).unwrap();
        let field = FieldRef::new("Query", "secret");
        assert_eq!(ctx.contributions_for(&field).len(), 1);
        assert_eq!(
            ctx.deferred()[0].requirement,
            Requirement::FieldHasDataSource(field)
        );
    }
}
