//! SF-023: `@function`: resolve a field by invoking an external function.
//!
//! The function's deployed identifier comes from an injected
//! `InvocationCapability`; the plugin never names a concrete service.
//! `${env}` in a function name is replaced with the `env` feature flag.

use super::{upper_first, TransformerPlugin};
use crate::core::context::Context;
use crate::core::error::{TransformError, ValidationError};
use crate::core::types::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub const DIRECTIVE: &str = "function";
const ENV_PLACEHOLDER: &str = "${env}";
const DEFAULT_ENV: &str = "NONE";

/// Resolves a function name to the identifier the runtime invokes.
pub trait InvocationCapability: Send + Sync {
    fn resolve(&self, name: &str, region: Option<&str>) -> Result<String, String>;
}

impl<F> InvocationCapability for F
where
    F: Fn(&str, Option<&str>) -> Result<String, String> + Send + Sync,
{
    fn resolve(&self, name: &str, region: Option<&str>) -> Result<String, String> {
        self(name, region)
    }
}

/// Builds ARNs locally, without calling anything.
#[derive(Debug, Clone)]
pub struct LocalNaming {
    pub account: String,
    pub default_region: String,
}

impl Default for LocalNaming {
    fn default() -> Self {
        Self {
            account: "${AWS::AccountId}".to_string(),
            default_region: "${AWS::Region}".to_string(),
        }
    }
}

impl InvocationCapability for LocalNaming {
    fn resolve(&self, name: &str, region: Option<&str>) -> Result<String, String> {
        let region = region.unwrap_or(&self.default_region);
        Ok(format!(
            "arn:aws:lambda:{}:{}:function:{}",
            region, self.account, name
        ))
    }
}

pub struct FunctionPlugin {
    capability: Arc<dyn InvocationCapability>,
}

impl Default for FunctionPlugin {
    fn default() -> Self {
        Self::new(LocalNaming::default())
    }
}

impl FunctionPlugin {
    pub fn new(capability: impl InvocationCapability + 'static) -> Self {
        Self {
            capability: Arc::new(capability),
        }
    }
}

/// One `@function` instance in document order.
#[derive(Debug, Clone, PartialEq)]
struct Invocation {
    field: FieldRef,
    name: String,
    region: Option<String>,
}

fn invocations(schema: &SchemaModel) -> Vec<Invocation> {
    schema
        .uses_of(DIRECTIVE)
        .into_iter()
        .filter_map(|u| {
            let field = u.field.filter(|_| u.on_field())?;
            let name = u.directive.argument("name")?.as_str()?.to_string();
            Some(Invocation {
                field: FieldRef::new(&u.target.name, &field.name),
                name,
                region: u
                    .directive
                    .argument("region")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect()
}

/// Resource-id prefix for a function name: `process-order-${env}` → `ProcessOrder`.
pub fn resource_prefix(name: &str) -> String {
    name.replace(ENV_PLACEHOLDER, "")
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(upper_first)
        .collect()
}

/// Stem shared by a function's resource ids: the name prefix followed by
/// the region prefix, if any. `build-report` in `eu-west-1` → `BuildReportEuWest1`.
fn resource_stem(name: &str, region: Option<&str>) -> String {
    let mut stem = resource_prefix(name);
    if let Some(region) = region {
        stem.push_str(&resource_prefix(region));
    }
    stem
}

impl TransformerPlugin for FunctionPlugin {
    fn id(&self) -> &str {
        "function"
    }

    fn directives(&self) -> Vec<DirectiveDefinition> {
        vec![
            DirectiveDefinition::new(DIRECTIVE, &[DirectiveLocation::FieldDefinition])
                .required_arg("name", ValueKind::String)
                .arg("region", ValueKind::String)
                .repeatable(),
        ]
    }

    fn validate(&self, schema: &SchemaModel) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        // resource stem → the (name, region) that claimed it first
        let mut stems: HashMap<String, (&str, Option<&str>)> = HashMap::new();
        for use_ in schema.uses_of(DIRECTIVE) {
            let Some(name) = use_.directive.argument("name").and_then(Value::as_str) else {
                continue;
            };
            let region = use_.directive.argument("region").and_then(Value::as_str);
            let claimed = *stems
                .entry(resource_stem(name, region))
                .or_insert((name, region));
            if claimed != (name, region) {
                errors.push(ValidationError::new(
                    DIRECTIVE,
                    use_.target(),
                    format!(
                        "function '{}' shares resource ids with function '{}'",
                        name, claimed.0
                    ),
                ));
            }
            if resource_prefix(name).is_empty() {
                errors.push(ValidationError::new(
                    DIRECTIVE,
                    use_.target(),
                    format!("function name '{}' has no alphanumeric characters", name),
                ));
            }
            if let Some(region) = region {
                if region.is_empty() || region.contains(char::is_whitespace) {
                    errors.push(ValidationError::new(
                        DIRECTIVE,
                        use_.target(),
                        format!("region '{}' is not a region name", region),
                    ));
                }
            }
        }
        errors
    }

    fn transform_resolvers(&self, ctx: &mut Context) -> Result<(), TransformError> {
        let env = ctx
            .config()
            .flag("env")
            .map(|v| v.to_string())
            .unwrap_or_else(|| DEFAULT_ENV.to_string());

        for invocation in invocations(ctx.schema()) {
            let deployed_name = invocation.name.replace(ENV_PLACEHOLDER, &env);
            let arn = self
                .capability
                .resolve(&deployed_name, invocation.region.as_deref())
                .map_err(|e| {
                    TransformError::plugin(format!(
                        "cannot resolve function '{}' for {}: {}",
                        deployed_name, invocation.field, e
                    ))
                })?;
            tracing::debug!(field = %invocation.field, function = %deployed_name, "resolved function");

            let prefix = resource_stem(&invocation.name, invocation.region.as_deref());
            let role_id = format!("{}LambdaRole", prefix);
            let data_source_id = format!("{}LambdaDataSource", prefix);

            ctx.add_resource(
                &role_id,
                InfraResource::new("AWS::IAM::Role")
                    .property(
                        "AssumeRolePolicyDocument",
                        json!({
                            "Version": "2012-10-17",
                            "Statement": [{
                                "Effect": "Allow",
                                "Principal": {"Service": "appsync.amazonaws.com"},
                                "Action": "sts:AssumeRole"
                            }]
                        }),
                    )
                    .property(
                        "Policies",
                        json!([{
                            "PolicyName": "InvokeLambdaFunction",
                            "PolicyDocument": {
                                "Version": "2012-10-17",
                                "Statement": [{
                                    "Effect": "Allow",
                                    "Action": "lambda:InvokeFunction",
                                    "Resource": arn
                                }]
                            }
                        }]),
                    ),
            )?;
            ctx.add_resource(
                &data_source_id,
                InfraResource::new("AWS::AppSync::DataSource")
                    .property("Name", json!(data_source_id))
                    .property("Type", json!("AWS_LAMBDA"))
                    .property("LambdaConfig", json!({"LambdaFunctionArn": arn}))
                    .property("ServiceRoleArn", json!({"Fn::GetAtt": [role_id, "Arn"]}))
                    .depends_on(&role_id),
            )?;

            let stage = Stage::new(&format!("invoke{}", prefix), Slot::DataLoad)
                .before(format!(
                    "{{\"version\": \"2018-05-29\", \"operation\": \"Invoke\", \
                     \"payload\": {{\"typeName\": \"{}\", \"fieldName\": \"{}\", \
                     \"arguments\": $util.toJson($ctx.args), \"identity\": $util.toJson($ctx.identity), \
                     \"prev\": $util.toJson($ctx.prev)}}}}",
                    invocation.field.type_name, invocation.field.field_name
                ))
                .after("$util.toJson($ctx.result)")
                .data_source(&data_source_id);
            ctx.attach_stage(&invocation.field, stage)?;
        }
        Ok(())
    }
}
