//! End-to-end compile properties: determinism, ordering, conflicts,
//! aggregation and the unknown-directive policy.

use sdlforge::core::composer::compose_all;
use sdlforge::core::context::Context;
use sdlforge::core::error::{TransformError, ValidationError};
use sdlforge::core::orchestrator::{CompileOutput, Orchestrator};
use sdlforge::core::parser::parse_schema;
use sdlforge::core::types::*;
use sdlforge::plugins::TransformerPlugin;
use serde_json::json;

/// Test plugin owning one type-level directive. For every type carrying it,
/// adds a marker resource and one stage on the type's `id` field.
struct Marker {
    id: &'static str,
    directive: &'static str,
    depends_on: Vec<&'static str>,
    slot: Slot,
    commutative: bool,
    rejects: bool,
}

impl Marker {
    fn new(id: &'static str, directive: &'static str) -> Self {
        Self {
            id,
            directive,
            depends_on: Vec::new(),
            slot: Slot::DataLoad,
            commutative: false,
            rejects: false,
        }
    }

    fn after(mut self, dependency: &'static str) -> Self {
        self.depends_on.push(dependency);
        self
    }
}

impl TransformerPlugin for Marker {
    fn id(&self) -> &str {
        self.id
    }

    fn directives(&self) -> Vec<DirectiveDefinition> {
        vec![DirectiveDefinition::new(self.directive, &[DirectiveLocation::Object])]
    }

    fn depends_on(&self) -> Vec<PluginId> {
        self.depends_on.iter().map(|d| d.to_string()).collect()
    }

    fn validate(&self, schema: &SchemaModel) -> Vec<ValidationError> {
        if !self.rejects {
            return Vec::new();
        }
        schema
            .uses_of(self.directive)
            .iter()
            .map(|u| ValidationError::new(self.directive, u.target(), "rejected"))
            .collect()
    }

    fn transform_resolvers(&self, ctx: &mut Context) -> Result<(), TransformError> {
        let types: Vec<String> = ctx
            .schema()
            .types
            .values()
            .filter(|t| t.has_directive(self.directive))
            .map(|t| t.name.clone())
            .collect();
        for type_name in types {
            let resource_id = format!("{}{}Marker", type_name, self.directive.to_uppercase());
            ctx.add_resource(
                &resource_id,
                InfraResource::new("Test::Marker").property("Owner", json!(self.id)),
            )?;
            let mut stage = Stage::new(&format!("mark{}", self.id), self.slot)
                .before(format!("{{\"mark\": \"{}\"}}", self.id))
                .data_source(&resource_id);
            if self.commutative {
                stage = stage.commutative();
            }
            ctx.attach_stage(&FieldRef::new(&type_name, "id"), stage)?;
        }
        Ok(())
    }
}

fn orchestrator(plugins: Vec<Marker>) -> Orchestrator {
    plugins
        .into_iter()
        .fold(Orchestrator::new(), |o, p| o.with_plugin(p))
}

fn compile(o: &Orchestrator, sdl: &str, config: &CompileConfig) -> CompileOutput {
    match o.compile(sdl, config) {
        Ok(out) => out,
        Err(e) => panic!("compile failed: {e}"),
    }
}

const RICH: &str = r#"
"A todo"
type Todo @persist @auth(rules: [{allow: owner}, {allow: groups, groups: ["admin"], operations: [delete]}]) {
  id: ID!
  content: String
}

type Post @persist(timestamps: false) @searchable {
  id: ID!
  title: String!
}

type Query {
  report(month: Int): String @function(name: "build-report-${env}")
}
"#;

#[test]
fn test_sf007_same_input_same_bytes() {
    let o = Orchestrator::with_builtin();
    let config = CompileConfig::default().with_flag("env", FlagValue::Text("prod".into()));
    let first = compile(&o, RICH, &config);
    let second = compile(&o, RICH, &config);
    assert_eq!(first.rewritten_schema, second.rewritten_schema);
    assert_eq!(
        first.infrastructure_document.content,
        second.infrastructure_document.content
    );
    assert_eq!(first.resolvers_json().unwrap(), second.resolvers_json().unwrap());

    // parallel validation changes nothing observable
    let mut parallel = config.clone();
    parallel.policy.parallel_validate = true;
    let third = compile(&o, RICH, &parallel);
    assert_eq!(first.fingerprint, third.fingerprint);
    assert_eq!(
        first.infrastructure_document.content,
        third.infrastructure_document.content
    );
}

#[test]
fn test_sf007_registration_order_is_only_a_tie_break() {
    let sdl = "type A @alpha { id: ID }\ntype B @beta { id: ID }\ntype C @gamma { id: ID }";
    let abc = orchestrator(vec![
        Marker::new("a", "alpha"),
        Marker::new("b", "beta"),
        Marker::new("c", "gamma"),
    ]);
    let cab = orchestrator(vec![
        Marker::new("c", "gamma"),
        Marker::new("a", "alpha"),
        Marker::new("b", "beta"),
    ]);
    let config = CompileConfig::default();
    let x = compile(&abc, sdl, &config);
    let y = compile(&cab, sdl, &config);

    assert_eq!(x.plugin_order, vec!["a", "b", "c"]);
    assert_eq!(y.plugin_order, vec!["c", "a", "b"]);
    assert_eq!(x.rewritten_schema, y.rewritten_schema);
    assert_eq!(
        x.infrastructure_document.content,
        y.infrastructure_document.content
    );
    assert_eq!(x.resolvers_json().unwrap(), y.resolvers_json().unwrap());
}

#[test]
fn test_sf007_dependency_edges_respected() {
    let o = orchestrator(vec![
        Marker::new("c", "gamma").after("b"),
        Marker::new("b", "beta").after("a"),
        Marker::new("a", "alpha"),
    ]);
    let plan = o
        .plan(
            "type T @alpha @beta @gamma { id: ID }",
            &CompileConfig::default(),
        )
        .unwrap();
    assert_eq!(plan.order, vec!["a", "b", "c"]);
}

#[test]
fn test_sf007_dependency_cycle() {
    let o = orchestrator(vec![
        Marker::new("a", "alpha").after("c"),
        Marker::new("b", "beta").after("a"),
        Marker::new("c", "gamma").after("b"),
    ]);
    let err = o
        .compile("type T @alpha @beta @gamma { id: ID }", &CompileConfig::default())
        .unwrap_err();
    assert_eq!(err.len(), 1);
    assert_eq!(err.stage(), Some(CompileStage::Setup));
    match &err.diagnostics[0].error {
        TransformError::DependencyCycle { cycle } => {
            let mut members = cycle.clone();
            members.sort();
            assert_eq!(members, vec!["a", "b", "c"]);
        }
        other => panic!("expected a dependency cycle, got {other}"),
    }
}

#[test]
fn test_sf006_one_slot_conflict_per_field() {
    let o = orchestrator(vec![Marker::new("left", "left"), Marker::new("right", "right")]);
    let sdl = "type T @left @right { id: ID }\ntype U @left { id: ID }";
    let err = o.compile(sdl, &CompileConfig::default()).unwrap_err();
    assert_eq!(err.len(), 1);
    assert_eq!(err.stage(), Some(CompileStage::TransformResolvers));
    assert_eq!(
        err.diagnostics[0].error,
        TransformError::SlotConflict {
            field: FieldRef::new("T", "id"),
            slot: Slot::DataLoad,
            first: "left".into(),
            second: "right".into(),
        }
    );

    // the same contributions composed directly: no pipeline for T.id
    let schema = parse_schema(sdl).unwrap();
    let mut ctx = Context::new(schema, CompileConfig::default());
    ctx.set_plugin_order(vec!["left".into(), "right".into()]);
    for plugin in ["left", "right"] {
        ctx.enter_plugin(plugin);
        ctx.attach_stage(&FieldRef::new("T", "id"), Stage::new(plugin, Slot::DataLoad))
            .unwrap();
    }
    ctx.enter_plugin("left");
    ctx.attach_stage(&FieldRef::new("U", "id"), Stage::new("left", Slot::DataLoad))
        .unwrap();
    let (pipelines, errors) = compose_all(ctx.contributions(), ctx.plugin_order());
    assert_eq!(errors.len(), 1);
    assert!(!pipelines.contains_key(&FieldRef::new("T", "id")));
    assert!(pipelines.contains_key(&FieldRef::new("U", "id")));
}

#[test]
fn test_sf006_commutative_stages_share_a_slot() {
    let mut left = Marker::new("left", "left");
    left.slot = Slot::PostDataLoad;
    left.commutative = true;
    let mut right = Marker::new("right", "right");
    right.slot = Slot::PostDataLoad;
    right.commutative = true;
    let o = orchestrator(vec![right, left]);
    let out = compile(&o, "type T @left @right { id: ID }", &CompileConfig::default());
    let plugins: Vec<&str> = out.resolver_pipelines["T.id"]
        .iter()
        .map(|s| s.plugin.as_str())
        .collect();
    // registration order: right before left
    assert_eq!(plugins, vec!["right", "left"]);
}

#[test]
fn test_sf007_validation_errors_aggregate() {
    let mut plugins = vec![
        Marker::new("a", "alpha"),
        Marker::new("b", "beta"),
        Marker::new("c", "gamma"),
    ];
    for p in &mut plugins {
        p.rejects = true;
    }
    let err = orchestrator(plugins)
        .compile("type T @alpha @beta @gamma { id: ID }", &CompileConfig::default())
        .unwrap_err();
    assert_eq!(err.len(), 3);
    assert!(err
        .errors()
        .all(|e| matches!(e, TransformError::Validation(_))));
    let owners: Vec<Option<&str>> = err.diagnostics.iter().map(|d| d.plugin.as_deref()).collect();
    assert_eq!(owners, vec![Some("a"), Some("b"), Some("c")]);
}

#[test]
fn test_sf021_todo_scenario() {
    let out = compile(
        &Orchestrator::with_builtin(),
        "type Todo @persist { id: ID! content: String }",
        &CompileConfig::default(),
    );
    let doc: serde_json::Value =
        serde_json::from_str(&out.infrastructure_document.content).unwrap();
    assert!(doc["resources"]["TodoTable"].is_object());
    assert_eq!(out.resolver_pipelines["Mutation.createTodo"].len(), 1);
}

#[test]
fn test_sf007_unknown_directive_policy() {
    let plain = "type Todo @persist { id: ID! content: String }";
    let marked = "type Todo @persist @unknownThing { id: ID! content: String }";
    let o = Orchestrator::with_builtin();

    let base = compile(&o, plain, &CompileConfig::default());
    let lenient = compile(&o, marked, &CompileConfig::default());
    assert_eq!(lenient.warnings.len(), 1);
    assert!(base.warnings.is_empty());

    let resources = |out: &CompileOutput| {
        let doc: serde_json::Value =
            serde_json::from_str(&out.infrastructure_document.content).unwrap();
        doc["resources"].clone()
    };
    assert_eq!(resources(&base), resources(&lenient));
    assert_eq!(base.resolver_pipelines, lenient.resolver_pipelines);

    let err = o
        .compile(marked, &CompileConfig::default().strict())
        .unwrap_err();
    assert_eq!(err.len(), 1);
    assert!(matches!(
        &err.diagnostics[0].error,
        TransformError::UnsupportedDirective { directive, .. } if directive == "unknownThing"
    ));
}
