//! SF-021: `@persist`: table-backed object types with generated CRUD fields.
//!
//! For every `@persist` type `T` the plugin generates input types, root
//! query/mutation fields, a table, a data source, and one `dataLoad` stage
//! per generated field.

use super::{add_field, pluralize, type_directive, types_with, TransformerPlugin};
use crate::core::context::Context;
use crate::core::error::{TransformError, ValidationError};
use crate::core::types::*;
use serde_json::json;

pub const DIRECTIVE: &str = "persist";
const DEFAULT_KEY: &str = "id";
const DEFAULT_BILLING_MODE: &str = "PAY_PER_REQUEST";
const TIMESTAMP_FIELDS: [&str; 2] = ["createdAt", "updatedAt"];

pub struct PersistPlugin;

/// Resolved `@persist` arguments for one type.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistSettings {
    pub type_name: String,
    pub table: String,
    pub key: String,
    pub timestamps: bool,
}

impl PersistSettings {
    pub fn from_type(ty: &TypeDef, config: &CompileConfig) -> Self {
        let directive = type_directive(ty, DIRECTIVE);
        let arg = |name: &str| directive.and_then(|d| d.argument(name));
        Self {
            type_name: ty.name.clone(),
            table: arg("table")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| ty.name.clone()),
            key: arg("key")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_KEY)
                .to_string(),
            timestamps: arg("timestamps")
                .and_then(Value::as_bool)
                .unwrap_or_else(|| config.flag_bool("persist.timestamps", true)),
        }
    }

    pub fn table_id(&self) -> String {
        format!("{}Table", self.type_name)
    }

    pub fn data_source_id(&self) -> String {
        format!("{}DataSource", self.type_name)
    }

    /// Generated root fields, one per operation.
    pub fn operation_fields(&self) -> Vec<(Operation, FieldRef)> {
        let t = &self.type_name;
        vec![
            (Operation::Get, FieldRef::new("Query", &format!("get{}", t))),
            (
                Operation::List,
                FieldRef::new("Query", &format!("list{}", pluralize(t))),
            ),
            (
                Operation::Create,
                FieldRef::new("Mutation", &format!("create{}", t)),
            ),
            (
                Operation::Update,
                FieldRef::new("Mutation", &format!("update{}", t)),
            ),
            (
                Operation::Delete,
                FieldRef::new("Mutation", &format!("delete{}", t)),
            ),
        ]
    }
}

fn valid_table_name(name: &str) -> bool {
    (3..=255).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Scalar and enum fields copied into the generated input types.
fn input_fields(ty: &TypeDef, schema: &SchemaModel) -> Vec<FieldDef> {
    ty.fields
        .values()
        .filter(|f| f.arguments.is_empty())
        .filter(|f| !TIMESTAMP_FIELDS.contains(&f.name.as_str()))
        .filter(|f| schema.is_leaf_type(f.type_ref.base_name()))
        .map(|f| FieldDef::new(&f.name, f.type_ref.clone()))
        .collect()
}

fn input_type(name: &str, fields: Vec<FieldDef>) -> TypeDef {
    let mut ty = TypeDef::new(name, TypeKind::Input);
    for field in fields {
        ty.fields.insert(field.name.clone(), field);
    }
    ty
}

fn request_template(op: Operation, settings: &PersistSettings) -> String {
    let key = &settings.key;
    match op {
        Operation::Get => format!(
            "{{\"version\": \"2018-05-29\", \"operation\": \"GetItem\", \
             \"key\": {{\"{key}\": $util.dynamodb.toDynamoDBJson($ctx.args.{key})}}}}"
        ),
        Operation::List => "{\"version\": \"2018-05-29\", \"operation\": \"Scan\", \
             \"limit\": $util.defaultIfNull($ctx.args.limit, 100)}"
            .to_string(),
        Operation::Create => format!(
            "{{\"version\": \"2018-05-29\", \"operation\": \"PutItem\", \
             \"key\": {{\"{key}\": $util.dynamodb.toDynamoDBJson($util.defaultIfNullOrBlank($ctx.args.input.{key}, $util.autoId()))}}, \
             \"attributeValues\": $util.dynamodb.toMapValuesJson($ctx.args.input), \
             \"condition\": {{\"expression\": \"attribute_not_exists(#key)\", \"expressionNames\": {{\"#key\": \"{key}\"}}}}}}"
        ),
        Operation::Update => format!(
            "{{\"version\": \"2018-05-29\", \"operation\": \"UpdateItem\", \
             \"key\": {{\"{key}\": $util.dynamodb.toDynamoDBJson($ctx.args.input.{key})}}, \
             \"update\": $util.dynamodb.toUpdateExpressionJson($ctx.args.input)}}"
        ),
        Operation::Delete => format!(
            "{{\"version\": \"2018-05-29\", \"operation\": \"DeleteItem\", \
             \"key\": {{\"{key}\": $util.dynamodb.toDynamoDBJson($ctx.args.input.{key})}}}}"
        ),
        Operation::Search => String::new(),
    }
}

fn response_template(op: Operation) -> &'static str {
    match op {
        Operation::List => "$util.toJson($ctx.result.items)",
        _ => "$util.toJson($ctx.result)",
    }
}

impl PersistPlugin {
    fn settings(schema: &SchemaModel, config: &CompileConfig) -> Vec<PersistSettings> {
        types_with(schema, DIRECTIVE)
            .iter()
            .filter_map(|name| schema.get_type(name))
            .map(|ty| PersistSettings::from_type(ty, config))
            .collect()
    }

    fn generate_schema(ctx: &mut Context, settings: &PersistSettings) -> Result<(), TransformError> {
        let t = settings.type_name.clone();
        let ty = ctx
            .schema()
            .get_type(&t)
            .cloned()
            .ok_or_else(|| TransformError::plugin(format!("type '{}' vanished", t)))?;
        let key_field = ty.field(&settings.key).cloned().ok_or_else(|| {
            TransformError::plugin(format!("type '{}' has no key field '{}'", t, settings.key))
        })?;
        let key_type = key_field.type_ref.nullable();

        if settings.timestamps {
            ctx.schema_mut()?
                .ensure_type("DateTime", TypeKind::Scalar)
                .map_err(TransformError::plugin)?;
            for name in TIMESTAMP_FIELDS {
                if ty.field(name).is_none() {
                    add_field(
                        ctx,
                        &t,
                        TypeKind::Object,
                        FieldDef::new(name, TypeRef::named("DateTime").non_null()),
                    )?;
                }
            }
        }

        let fields = input_fields(&ty, ctx.schema());
        let create: Vec<FieldDef> = fields
            .iter()
            .cloned()
            .map(|mut f| {
                if f.name == settings.key {
                    f.type_ref = key_type.clone();
                }
                f
            })
            .collect();
        let update: Vec<FieldDef> = fields
            .iter()
            .cloned()
            .map(|mut f| {
                f.type_ref = if f.name == settings.key {
                    key_type.clone().non_null()
                } else {
                    f.type_ref.nullable()
                };
                f
            })
            .collect();
        let delete = vec![FieldDef::new(&settings.key, key_type.clone().non_null())];

        let schema = ctx.schema_mut()?;
        for (prefix, fields) in [("Create", create), ("Update", update), ("Delete", delete)] {
            schema
                .add_type(input_type(&format!("{}{}Input", prefix, t), fields))
                .map_err(TransformError::plugin)?;
        }

        let named = || TypeRef::named(&t);
        for (op, field) in settings.operation_fields() {
            let def = match op {
                Operation::Get => FieldDef::new(&field.field_name, named()).with_argument(
                    InputValueDef::new(&settings.key, key_type.clone().non_null()),
                ),
                Operation::List => FieldDef::new(
                    &field.field_name,
                    named().non_null().list().non_null(),
                )
                .with_argument(InputValueDef::new("limit", TypeRef::named("Int"))),
                Operation::Create | Operation::Update | Operation::Delete => {
                    let input = format!("{}{}Input", input_prefix(op), t);
                    FieldDef::new(&field.field_name, named()).with_argument(InputValueDef::new(
                        "input",
                        TypeRef::named(&input).non_null(),
                    ))
                }
                Operation::Search => continue,
            };
            add_field(ctx, &field.type_name, TypeKind::Object, def)?;
        }
        Ok(())
    }

    fn generate_resolvers(
        ctx: &mut Context,
        settings: &PersistSettings,
    ) -> Result<(), TransformError> {
        let table_id = settings.table_id();
        let data_source_id = settings.data_source_id();
        let billing_mode = ctx
            .config()
            .flag_str("persist.billing_mode")
            .unwrap_or(DEFAULT_BILLING_MODE)
            .to_string();

        ctx.add_resource(
            &table_id,
            InfraResource::new("AWS::DynamoDB::Table")
                .property("TableName", json!(settings.table))
                .property("BillingMode", json!(billing_mode))
                .property(
                    "KeySchema",
                    json!([{"AttributeName": settings.key, "KeyType": "HASH"}]),
                )
                .property(
                    "AttributeDefinitions",
                    json!([{"AttributeName": settings.key, "AttributeType": "S"}]),
                )
                .property(
                    "StreamSpecification",
                    json!({"StreamViewType": "NEW_AND_OLD_IMAGES"}),
                ),
        )?;
        ctx.add_resource(
            &data_source_id,
            InfraResource::new("AWS::AppSync::DataSource")
                .property("Name", json!(data_source_id))
                .property("Type", json!("AMAZON_DYNAMODB"))
                .property(
                    "DynamoDBConfig",
                    json!({"TableName": {"Ref": table_id}}),
                )
                .depends_on(&table_id),
        )?;

        for (op, field) in settings.operation_fields() {
            let stage = Stage::new(&field.field_name, Slot::DataLoad)
                .before(request_template(op, settings))
                .after(response_template(op))
                .data_source(&data_source_id);
            ctx.attach_stage(&field, stage)?;
            ctx.bind_operation(&settings.type_name, op, field, &data_source_id)?;
        }
        Ok(())
    }
}

fn input_prefix(op: Operation) -> &'static str {
    match op {
        Operation::Create => "Create",
        Operation::Update => "Update",
        Operation::Delete => "Delete",
        Operation::Get => "Get",
        Operation::List => "List",
        Operation::Search => "Search",
    }
}

impl TransformerPlugin for PersistPlugin {
    fn id(&self) -> &str {
        "persist"
    }

    fn directives(&self) -> Vec<DirectiveDefinition> {
        vec![DirectiveDefinition::new(DIRECTIVE, &[DirectiveLocation::Object])
            .arg("table", ValueKind::String)
            .arg("key", ValueKind::String)
            .arg("timestamps", ValueKind::Boolean)]
    }

    fn validate(&self, schema: &SchemaModel) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for use_ in schema.uses_of(DIRECTIVE) {
            if use_.field.is_some() || use_.target.kind != TypeKind::Object {
                // placement is reported by the shape check
                continue;
            }
            let settings = PersistSettings::from_type(use_.target, &CompileConfig::default());
            let err = |message: String| ValidationError::new(DIRECTIVE, use_.target(), message);

            if matches!(settings.type_name.as_str(), "Query" | "Mutation" | "Subscription") {
                errors.push(err("cannot persist a root operation type".to_string()));
                continue;
            }
            let explicit_table = use_.directive.argument("table").and_then(Value::as_str);
            if let Some(table) = explicit_table.filter(|t| !valid_table_name(t)) {
                errors.push(err(format!(
                    "table name '{}' must be 3-255 characters of [A-Za-z0-9_.-]",
                    table
                )));
            }
            match use_.target.field(&settings.key) {
                None => errors.push(err(format!("key field '{}' does not exist", settings.key))),
                Some(f) if f.type_ref.is_list() || !schema.is_leaf_type(f.type_ref.base_name()) => {
                    errors.push(err(format!(
                        "key field '{}' must be a scalar or enum, found {}",
                        settings.key, f.type_ref
                    )))
                }
                Some(_) => {}
            }
        }
        errors
    }

    fn transform_schema(&self, ctx: &mut Context) -> Result<(), TransformError> {
        for settings in Self::settings(ctx.schema(), ctx.config()) {
            tracing::debug!(type_name = %settings.type_name, "generating persistence schema");
            Self::generate_schema(ctx, &settings)?;
        }
        Ok(())
    }

    fn transform_resolvers(&self, ctx: &mut Context) -> Result<(), TransformError> {
        for settings in Self::settings(ctx.schema(), ctx.config()) {
            Self::generate_resolvers(ctx, &settings)?;
        }
        Ok(())
    }
}
