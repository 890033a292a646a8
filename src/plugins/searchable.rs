//! SF-024: `@searchable`: full-text search over persisted types.
//!
//! Requires `@persist` on the same type. Adds a search query field, streams
//! the type's table into a shared search domain, and resolves the query
//! through the domain's data source.

use super::persist::{self, PersistSettings};
use super::{add_field, is_identifier, pluralize, type_directive, types_with, TransformerPlugin};
use crate::core::context::Context;
use crate::core::error::{TransformError, ValidationError};
use crate::core::types::*;
use serde_json::json;

pub const DIRECTIVE: &str = "searchable";
pub const DOMAIN_ID: &str = "SearchDomain";
pub const DATA_SOURCE_ID: &str = "SearchDataSource";
const DEFAULT_INSTANCE_TYPE: &str = "t3.small.search";

pub struct SearchablePlugin;

fn query_field(ty: &TypeDef) -> String {
    type_directive(ty, DIRECTIVE)
        .and_then(|d| d.argument("queryField"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("search{}", pluralize(&ty.name)))
}

impl TransformerPlugin for SearchablePlugin {
    fn id(&self) -> &str {
        "searchable"
    }

    fn directives(&self) -> Vec<DirectiveDefinition> {
        vec![DirectiveDefinition::new(DIRECTIVE, &[DirectiveLocation::Object])
            .arg("queryField", ValueKind::String)]
    }

    fn depends_on(&self) -> Vec<PluginId> {
        vec!["persist".to_string()]
    }

    fn validate(&self, schema: &SchemaModel) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        for use_ in schema.uses_of(DIRECTIVE) {
            if use_.field.is_some() {
                continue;
            }
            if !use_.target.has_directive(persist::DIRECTIVE) {
                errors.push(ValidationError::new(
                    DIRECTIVE,
                    use_.target(),
                    "requires @persist on the same type",
                ));
            }
            if let Some(name) = use_.directive.argument("queryField").and_then(Value::as_str) {
                if !is_identifier(name) {
                    errors.push(ValidationError::new(
                        DIRECTIVE,
                        use_.target(),
                        format!("queryField '{}' is not a valid field name", name),
                    ));
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
            let field = FieldDef::new(
                &query_field(ty),
                TypeRef::named(&type_name).non_null().list().non_null(),
            )
            .with_argument(InputValueDef::new("query", TypeRef::named("String")))
            .with_argument(InputValueDef::new("limit", TypeRef::named("Int")));
            add_field(ctx, "Query", TypeKind::Object, field)?;
        }
        Ok(())
    }

    fn transform_resolvers(&self, ctx: &mut Context) -> Result<(), TransformError> {
        let searchable: Vec<(PersistSettings, String)> = types_with(ctx.schema(), DIRECTIVE)
            .iter()
            .filter_map(|name| ctx.schema().get_type(name))
            .map(|ty| (PersistSettings::from_type(ty, ctx.config()), query_field(ty)))
            .collect();
        if searchable.is_empty() {
            return Ok(());
        }

        let instance_type = ctx
            .config()
            .flag_str("searchable.instance_type")
            .unwrap_or(DEFAULT_INSTANCE_TYPE)
            .to_string();
        ctx.add_resource(
            DOMAIN_ID,
            InfraResource::new("AWS::OpenSearchService::Domain")
                .property("EngineVersion", json!("OpenSearch_2.11"))
                .property(
                    "ClusterConfig",
                    json!({"InstanceType": instance_type, "InstanceCount": 1}),
                ),
        )?;
        ctx.add_resource(
            DATA_SOURCE_ID,
            InfraResource::new("AWS::AppSync::DataSource")
                .property("Name", json!(DATA_SOURCE_ID))
                .property("Type", json!("AMAZON_OPENSEARCH_SERVICE"))
                .property(
                    "OpenSearchServiceConfig",
                    json!({"Endpoint": {"Fn::GetAtt": [DOMAIN_ID, "DomainEndpoint"]}}),
                )
                .depends_on(DOMAIN_ID),
        )?;

        for (settings, field_name) in searchable {
            let t = &settings.type_name;
            let index = t.to_ascii_lowercase();
            ctx.add_resource(
                &format!("{}SearchStream", t),
                InfraResource::new("AWS::Lambda::EventSourceMapping")
                    .property(
                        "EventSourceArn",
                        json!({"Fn::GetAtt": [settings.table_id(), "StreamArn"]}),
                    )
                    .property("StartingPosition", json!("LATEST"))
                    .property("Index", json!(index))
                    .depends_on(&settings.table_id())
                    .depends_on(DOMAIN_ID),
            )?;

            let field = FieldRef::new("Query", &field_name);
            ctx.attach_stage(
                &field,
                Stage::new(&field_name, Slot::DataLoad)
                    .before(format!(
                        "{{\"version\": \"2018-05-29\", \"operation\": \"GET\", \
                         \"path\": \"/{}/_search\", \"params\": {{\"body\": {{\
                         \"size\": $util.defaultIfNull($ctx.args.limit, 100), \
                         \"query\": {{\"simple_query_string\": {{\"query\": $util.toJson($ctx.args.query)}}}}}}}}}}",
                        index
                    ))
                    .after("$util.toJson($ctx.result.hits.hits)")
                    .data_source(DATA_SOURCE_ID),
            )?;
            ctx.attach_stage(
                &field,
                Stage::new(&format!("shape{}", t), Slot::PostDataLoad)
                    .after("$util.toJson($ctx.prev.result.map(h -> h._source))")
                    .commutative(),
            )?;
            ctx.bind_operation(t, Operation::Search, field, DATA_SOURCE_ID)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_schema;
    use crate::plugins::persist::PersistPlugin;

    fn compile_pair(sdl: &str) -> Context {
        let mut ctx = Context::new(parse_schema(sdl).unwrap(), CompileConfig::default());
        ctx.enter_plugin("persist");
        PersistPlugin.transform_schema(&mut ctx).unwrap();
        ctx.enter_plugin("searchable");
        SearchablePlugin.transform_schema(&mut ctx).unwrap();
        ctx.enter_plugin("persist");
        PersistPlugin.transform_resolvers(&mut ctx).unwrap();
        ctx.enter_plugin("searchable");
        SearchablePlugin.transform_resolvers(&mut ctx).unwrap();
        ctx
    }

    #[test]
    fn test_sf024_search_field_and_resources() {
        let ctx = compile_pair(
            "type Post @persist @searchable { id: ID! title: String }\n\
             type Story @persist @searchable(queryField: \"findStories\") { id: ID! }",
        );
        assert!(ctx.schema().contains_field(&FieldRef::new("Query", "searchPosts")));
        assert!(ctx.schema().contains_field(&FieldRef::new("Query", "findStories")));

        for id in [DOMAIN_ID, DATA_SOURCE_ID, "PostSearchStream", "StorySearchStream"] {
            assert!(ctx.infra().contains_key(id), "missing {id}");
        }
        let stream = &ctx.infra().get("PostSearchStream").unwrap().resource;
        assert_eq!(stream.depends_on, vec!["PostTable", DOMAIN_ID]);

        let stages = ctx.contributions_for(&FieldRef::new("Query", "searchPosts"));
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].stage.data_source.as_deref(), Some(DATA_SOURCE_ID));
        assert!(stages[1].stage.commutative);

        let ops: Vec<Operation> = ctx.bindings_for("Post").iter().map(|b| b.operation).collect();
        assert_eq!(ops.last(), Some(&Operation::Search));
    }

    #[test]
    fn test_sf024_requires_persist() {
        let schema = parse_schema(
            "type Post @searchable(queryField: \"find-posts\") { id: ID! }",
        )
        .unwrap();
        let messages: Vec<String> = SearchablePlugin
            .validate(&schema)
            .iter()
            .map(|e| e.message.clone())
            .collect();
        assert_eq!(
            messages,
            vec![
                "requires @persist on the same type".to_string(),
                "queryField 'find-posts' is not a valid field name".to_string(),
            ]
        );
    }
}
