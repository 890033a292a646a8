//! SF-007: Transform orchestrator.
//!
//! Drives one compile through its stages: parse, setup (registry and plugin
//! order), validate, transform schema, transform resolvers, finalize and
//! synthesize. Every plugin in a stage runs before the orchestrator decides
//! whether to stop; any diagnostic from a stage ends the compile after that
//! stage. Setup defects short-circuit at the first one.

use super::composer::compose_all;
use super::context::Context;
use super::digest::compile_fingerprint;
use super::error::{CompileError, Diagnostic, TransformError, ValidationError, Warning};
use super::parser::{parse_schema, validate_config};
use super::printer::print_schema;
use super::registry::{check_shape, DirectiveRegistry};
use super::resolver::order_plugins;
use super::synthesizer::{backend_for, synthesize, RenderedDocument};
use super::types::*;
use crate::plugins::{self, TransformerPlugin};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared cancellation switch. Checked before each stage, never mid-stage.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything decided before the first plugin pass.
#[derive(Debug)]
pub struct CompilePlan {
    pub schema: SchemaModel,
    pub registry: DirectiveRegistry,
    /// Participating plugins in resolved order
    pub order: Vec<PluginId>,
    pub warnings: Vec<Warning>,
}

/// Result of a successful compile.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub name: String,
    pub plugin_order: Vec<PluginId>,
    pub rewritten_schema: String,
    pub infrastructure_document: RenderedDocument,
    /// `Type.field` → ordered stages, keys sorted
    pub resolver_pipelines: BTreeMap<String, Vec<StageContribution>>,
    pub warnings: Vec<Warning>,
    pub fingerprint: String,
}

impl CompileOutput {
    /// The resolver pipelines as pretty JSON.
    pub fn resolvers_json(&self) -> Result<String, TransformError> {
        let mut out = serde_json::to_string_pretty(&self.resolver_pipelines)
            .map_err(|e| TransformError::Render(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }
}

/// Registered plugins plus an optional cancellation flag.
pub struct Orchestrator {
    plugins: Vec<Box<dyn TransformerPlugin>>,
    cancel: Option<CancelFlag>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// An orchestrator with no plugins registered.
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            cancel: None,
        }
    }

    /// An orchestrator with the built-in plugin set.
    pub fn with_builtin() -> Self {
        let mut orchestrator = Self::new();
        for plugin in plugins::builtin() {
            orchestrator.register(plugin);
        }
        orchestrator
    }

    /// Register a plugin. Registration order breaks ordering ties.
    pub fn register(&mut self, plugin: Box<dyn TransformerPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn with_plugin(mut self, plugin: impl TransformerPlugin + 'static) -> Self {
        self.register(Box::new(plugin));
        self
    }

    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Registered plugin ids, in registration order.
    pub fn plugin_ids(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.id()).collect()
    }

    fn plugin(&self, id: &str) -> Option<&dyn TransformerPlugin> {
        self.plugins
            .iter()
            .find(|p| p.id() == id)
            .map(|p| p.as_ref())
    }

    fn checkpoint(&self, stage: CompileStage) -> Result<(), CompileError> {
        match &self.cancel {
            Some(flag) if flag.is_cancelled() => {
                info!(stage = %stage, "compile cancelled");
                Err(CompileError::single(stage, TransformError::Cancelled(stage)))
            }
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Parse + setup
    // ========================================================================

    /// Parse the schema, build the registry and resolve the plugin order.
    pub fn plan(&self, text: &str, config: &CompileConfig) -> Result<CompilePlan, CompileError> {
        let stage = CompileStage::Parse;
        self.checkpoint(stage)?;
        let schema = parse_schema(text).map_err(|e| CompileError::single(stage, e.into()))?;
        info!(stage = %stage, types = schema.types.len(), "stage complete");

        let stage = CompileStage::Setup;
        self.checkpoint(stage)?;
        let problems = self.check_config(config);
        if !problems.is_empty() {
            return Err(CompileError::new(
                problems
                    .into_iter()
                    .map(|p| Diagnostic::new(stage, TransformError::Config(p)))
                    .collect(),
            ));
        }

        let registry = self
            .build_registry(config)
            .map_err(|e| CompileError::single(stage, e))?;
        let participating = participating_plugins(&schema, &registry);
        let order = order_plugins(&registry.dependency_edges(), &participating)
            .map_err(|e| CompileError::single(stage, e))?;

        let mut warnings = Vec::new();
        let mut diagnostics = Vec::new();
        for (directive, target) in unsupported_uses(&schema, &registry) {
            if config.strict_mode {
                diagnostics.push(Diagnostic::new(
                    stage,
                    TransformError::UnsupportedDirective { directive, target },
                ));
            } else {
                warn!(directive = %directive, target = %target, "ignoring directive with no registered owner");
                warnings.push(Warning::UnsupportedDirective { directive, target });
            }
        }
        finish_stage(stage, diagnostics)?;
        debug!(order = ?order, "resolved plugin order");

        Ok(CompilePlan {
            schema,
            registry,
            order,
            warnings,
        })
    }

    fn check_config(&self, config: &CompileConfig) -> Vec<String> {
        let ids = self.plugin_ids();
        let mut problems = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                problems.push(format!("plugin '{}' is registered more than once", id));
            }
        }
        problems.extend(validate_config(config, &ids));
        problems
    }

    /// Registry over the plugins the config activates.
    fn build_registry(&self, config: &CompileConfig) -> Result<DirectiveRegistry, TransformError> {
        let mut registry = DirectiveRegistry::new();
        for plugin in self.plugins.iter().filter(|p| config.activates(p.id())) {
            let depends_on = plugin.depends_on();
            registry.register_plugin(plugin.id(), &depends_on);
            for definition in plugin.directives() {
                registry.register_definition(definition, plugin.id(), &depends_on)?;
            }
        }
        Ok(registry)
    }

    // ========================================================================
    // Validate
    // ========================================================================

    /// Run parse, setup and the validate stage.
    pub fn validate(&self, text: &str, config: &CompileConfig) -> Result<CompilePlan, CompileError> {
        let plan = self.plan(text, config)?;
        self.run_validate(&plan, config.policy.parallel_validate)?;
        Ok(plan)
    }

    fn run_validate(&self, plan: &CompilePlan, parallel: bool) -> Result<(), CompileError> {
        let stage = CompileStage::Validate;
        self.checkpoint(stage)?;

        let check = |id: &PluginId| -> Vec<Diagnostic> {
            let Some(plugin) = self.plugin(id) else {
                return Vec::new();
            };
            validate_plugin(plugin, &plan.schema, &plan.registry)
                .into_iter()
                .map(|e| Diagnostic::from_plugin(stage, id, e.into()))
                .collect()
        };
        // collect() on an indexed parallel iterator keeps plan order
        let per_plugin: Vec<Vec<Diagnostic>> = if parallel {
            plan.order.par_iter().map(check).collect()
        } else {
            plan.order.iter().map(check).collect()
        };

        finish_stage(stage, per_plugin.into_iter().flatten().collect())
    }

    // ========================================================================
    // Full compile
    // ========================================================================

    /// Compile schema text into a rewritten schema, an infrastructure
    /// document and resolver pipelines.
    pub fn compile(&self, text: &str, config: &CompileConfig) -> Result<CompileOutput, CompileError> {
        let CompilePlan {
            schema,
            registry,
            order,
            warnings,
        } = self.validate(text, config)?;

        let mut ctx = Context::new(schema, config.clone());
        ctx.set_plugin_order(order.clone());
        for warning in warnings {
            ctx.warn(warning);
        }

        let stage = CompileStage::TransformSchema;
        self.checkpoint(stage)?;
        let diagnostics = self.run_pass(&mut ctx, &order, stage, |p, c| p.transform_schema(c));
        finish_stage(stage, diagnostics)?;

        let stage = CompileStage::TransformResolvers;
        self.checkpoint(stage)?;
        let mut diagnostics =
            self.run_pass(&mut ctx, &order, stage, |p, c| p.transform_resolvers(c));
        let (pipelines, conflicts) = compose_all(ctx.contributions(), ctx.plugin_order());
        diagnostics.extend(conflicts.into_iter().map(|e| Diagnostic::new(stage, e)));
        finish_stage(stage, diagnostics)?;

        let stage = CompileStage::Finalize;
        self.checkpoint(stage)?;
        ctx.freeze();
        finish_stage(stage, finalize_checks(&ctx, &pipelines))?;

        let stage = CompileStage::Synthesize;
        self.checkpoint(stage)?;
        let strip: Vec<&str> = if config.policy.strip_owned_directives {
            registry.directives().collect()
        } else {
            Vec::new()
        };
        let rewritten_schema = print_schema(ctx.schema(), &strip);
        let resolver_pipelines: BTreeMap<String, Vec<StageContribution>> = pipelines
            .into_iter()
            .map(|(field, pipeline)| (field.to_string(), pipeline.stages))
            .collect();
        let fingerprint = compile_fingerprint(&rewritten_schema, ctx.infra(), &resolver_pipelines)
            .map_err(|e| CompileError::single(stage, e))?;
        let backend = backend_for(config.policy.output_format);
        let infrastructure_document =
            synthesize(ctx.infra(), &config.name, &fingerprint, backend.as_ref())
                .map_err(|e| CompileError::single(stage, e))?;
        info!(
            stage = %stage,
            resources = ctx.infra().len(),
            pipelines = resolver_pipelines.len(),
            "stage complete"
        );

        Ok(CompileOutput {
            name: config.name.clone(),
            plugin_order: order,
            rewritten_schema,
            infrastructure_document,
            resolver_pipelines,
            warnings: ctx.warnings().to_vec(),
            fingerprint,
        })
    }

    /// Run one mutating pass over every plugin in order, collecting failures.
    fn run_pass<F>(
        &self,
        ctx: &mut Context,
        order: &[PluginId],
        stage: CompileStage,
        pass: F,
    ) -> Vec<Diagnostic>
    where
        F: Fn(&dyn TransformerPlugin, &mut Context) -> Result<(), TransformError>,
    {
        let mut diagnostics = Vec::new();
        for id in order {
            let Some(plugin) = self.plugin(id) else {
                continue;
            };
            ctx.enter_plugin(id);
            debug!(stage = %stage, plugin = %id, "plugin pass");
            if let Err(e) = pass(plugin, &mut *ctx) {
                debug!(stage = %stage, plugin = %id, error = %e, "plugin pass failed");
                diagnostics.push(Diagnostic::from_plugin(stage, id, e));
            }
            ctx.leave_plugin();
        }
        diagnostics
    }
}

fn finish_stage(stage: CompileStage, diagnostics: Vec<Diagnostic>) -> Result<(), CompileError> {
    if diagnostics.is_empty() {
        info!(stage = %stage, "stage complete");
        Ok(())
    } else {
        info!(stage = %stage, errors = diagnostics.len(), "stage failed");
        Err(CompileError::new(diagnostics))
    }
}

/// Activated plugins that own at least one directive used in the schema,
/// in registration order.
fn participating_plugins(schema: &SchemaModel, registry: &DirectiveRegistry) -> Vec<PluginId> {
    let uses = schema.directive_uses();
    let used: HashSet<&str> = uses.iter().map(|u| u.name()).collect();
    registry
        .plugins()
        .into_iter()
        .filter(|p| registry.directives_of(p).iter().any(|d| used.contains(d)))
        .map(str::to_string)
        .collect()
}

/// Directive uses with no owner: not plugin-owned, not built in, not
/// declared in the schema text.
fn unsupported_uses(
    schema: &SchemaModel,
    registry: &DirectiveRegistry,
) -> Vec<(String, DirectiveTarget)> {
    schema
        .directive_uses()
        .iter()
        .filter(|u| {
            registry.plugin_for(u.name()).is_none()
                && !BUILTIN_DIRECTIVES.contains(&u.name())
                && !schema.directive_defs.contains_key(u.name())
        })
        .map(|u| (u.name().to_string(), u.target()))
        .collect()
}

/// Shape checks for the plugin's own directives, then its semantic checks.
fn validate_plugin(
    plugin: &dyn TransformerPlugin,
    schema: &SchemaModel,
    registry: &DirectiveRegistry,
) -> Vec<ValidationError> {
    let owned = registry.directives_of(plugin.id());
    // decorated node and directive → uses seen so far
    let mut seen: HashMap<(DirectiveTarget, String), usize> = HashMap::new();
    let mut errors = Vec::new();

    for use_ in schema.directive_uses() {
        if !owned.contains(&use_.name()) {
            continue;
        }
        let Some(definition) = registry.definition(use_.name()) else {
            continue;
        };
        let node = (use_.target(), use_.name().to_string());
        let occurrence = seen.entry(node).or_insert(0);
        errors.extend(check_shape(definition, &use_, *occurrence));
        *occurrence += 1;
    }

    errors.extend(plugin.validate(schema));
    errors
}

/// Deferred requirements plus dangling resource dependencies.
fn finalize_checks(
    ctx: &Context,
    pipelines: &BTreeMap<FieldRef, ResolverPipeline>,
) -> Vec<Diagnostic> {
    let stage = CompileStage::Finalize;
    let mut diagnostics = Vec::new();
    let mut checked: Vec<&DeferredCheck> = Vec::new();

    for check in ctx.deferred() {
        if checked.contains(&check) {
            continue;
        }
        checked.push(check);

        let failure = match &check.requirement {
            Requirement::FieldHasDataSource(field) => {
                let resolved = pipelines
                    .get(field)
                    .is_some_and(|p| !p.data_sources().is_empty());
                (!resolved)
                    .then(|| format!("field {} does not resolve through any data source", field))
            }
            Requirement::TypeHasDataSource(type_name) => {
                ctx.bindings_for(type_name).is_empty().then(|| {
                    format!("type {} has no data source bound by any plugin", type_name)
                })
            }
        };
        if let Some(message) = failure {
            diagnostics.push(Diagnostic::from_plugin(
                stage,
                &check.plugin,
                TransformError::Finalize { message },
            ));
        }
    }

    for (id, contributed) in ctx.infra().iter() {
        for dependency in &contributed.resource.depends_on {
            if !ctx.infra().contains_key(dependency) {
                diagnostics.push(Diagnostic::from_plugin(
                    stage,
                    &contributed.plugin,
                    TransformError::UnknownResourceDependency {
                        id: id.clone(),
                        dependency: dependency.clone(),
                    },
                ));
            }
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    const TODO: &str = "type Todo @persist { id: ID! content: String }";

    /// Minimal plugin that owns one directive and reports what it is told to.
    struct Stub {
        id: &'static str,
        directive: &'static str,
        depends_on: Vec<&'static str>,
        rejects: bool,
        fails_schema_pass: bool,
        dangling_dependency: bool,
        cancels: Option<CancelFlag>,
        /// Completed schema and resolver passes
        passes: Arc<AtomicUsize>,
    }

    impl Stub {
        fn new(id: &'static str, directive: &'static str) -> Self {
            Self {
                id,
                directive,
                depends_on: Vec::new(),
                rejects: false,
                fails_schema_pass: false,
                dangling_dependency: false,
                cancels: None,
                passes: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl TransformerPlugin for Stub {
        fn id(&self) -> &str {
            self.id
        }

        fn directives(&self) -> Vec<DirectiveDefinition> {
            vec![DirectiveDefinition::new(self.directive, &[DirectiveLocation::Object])]
        }

        fn depends_on(&self) -> Vec<PluginId> {
            self.depends_on.iter().map(|d| d.to_string()).collect()
        }

        fn validate(&self, _schema: &SchemaModel) -> Vec<ValidationError> {
            if self.rejects {
                vec![ValidationError::new(
                    self.directive,
                    DirectiveTarget::Type("T".into()),
                    format!("{} says no", self.id),
                )]
            } else {
                Vec::new()
            }
        }

        fn transform_schema(&self, _ctx: &mut Context) -> Result<(), TransformError> {
            if let Some(flag) = &self.cancels {
                flag.cancel();
            }
            self.passes.fetch_add(1, Ordering::SeqCst);
            if self.fails_schema_pass {
                Err(TransformError::plugin(format!("{} failed", self.id)))
            } else {
                Ok(())
            }
        }

        fn transform_resolvers(&self, ctx: &mut Context) -> Result<(), TransformError> {
            self.passes.fetch_add(1, Ordering::SeqCst);
            if self.dangling_dependency {
                ctx.add_resource(
                    &format!("{}Queue", self.id),
                    InfraResource::new("Test::Queue").depends_on("MissingTable"),
                )?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_sf007_todo_end_to_end() {
        let out = Orchestrator::with_builtin()
            .compile(TODO, &CompileConfig::default())
            .unwrap();
        assert_eq!(out.plugin_order, vec!["persist"]);
        assert!(out.rewritten_schema.contains("createTodo(input: CreateTodoInput!): Todo"));
        assert!(!out.rewritten_schema.contains("@persist"));
        assert_eq!(out.resolver_pipelines["Mutation.createTodo"].len(), 1);

        let doc: serde_json::Value =
            serde_json::from_str(&out.infrastructure_document.content).unwrap();
        assert_eq!(doc["resources"]["TodoTable"]["Type"], json!("AWS::DynamoDB::Table"));
        assert_eq!(doc["fingerprint"], json!(out.fingerprint));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_sf007_keeps_owned_directives_when_asked() {
        let mut config = CompileConfig::default();
        config.policy.strip_owned_directives = false;
        let out = Orchestrator::with_builtin().compile(TODO, &config).unwrap();
        assert!(out.rewritten_schema.contains("type Todo @persist {"));
    }

    #[test]
    fn test_sf007_non_participating_edges_dropped() {
        // auth depends on searchable, which owns nothing used here
        let sdl = "type Note @persist @auth(rules: [{allow: owner}]) { id: ID! }";
        let plan = Orchestrator::with_builtin()
            .plan(sdl, &CompileConfig::default())
            .unwrap();
        assert_eq!(plan.order, vec!["persist", "auth"]);
    }

    #[test]
    fn test_sf007_unsupported_directive_warns() {
        let sdl = "type Todo @persist @unknownThing { id: ID! content: String }";
        let out = Orchestrator::with_builtin()
            .compile(sdl, &CompileConfig::default())
            .unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(out.rewritten_schema.contains("@unknownThing"));

        let err = Orchestrator::with_builtin()
            .compile(sdl, &CompileConfig::default().strict())
            .unwrap_err();
        assert_eq!(err.stage(), Some(CompileStage::Setup));
        assert!(matches!(
            err.diagnostics[0].error,
            TransformError::UnsupportedDirective { ref directive, .. } if directive == "unknownThing"
        ));
    }

    #[test]
    fn test_sf007_argument_directive_is_checked() {
        let sdl = "type Todo @persist { id: ID! content(x: Int @unknownThing): String }";
        let target = DirectiveTarget::Argument {
            field: FieldRef::new("Todo", "content"),
            argument: "x".into(),
        };

        let err = Orchestrator::with_builtin()
            .compile(sdl, &CompileConfig::default().strict())
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.stage(), Some(CompileStage::Setup));
        assert_eq!(
            err.diagnostics[0].error,
            TransformError::UnsupportedDirective {
                directive: "unknownThing".into(),
                target: target.clone(),
            }
        );

        let out = Orchestrator::with_builtin()
            .compile(sdl, &CompileConfig::default())
            .unwrap();
        assert_eq!(
            out.warnings,
            vec![Warning::UnsupportedDirective {
                directive: "unknownThing".into(),
                target,
            }]
        );
        assert!(out.rewritten_schema.contains("content(x: Int @unknownThing): String"));
    }

    #[test]
    fn test_sf007_owned_directive_on_argument_rejected() {
        let sdl = "type Query { report(month: Int @function(name: \"r\")): String }";
        let err = Orchestrator::with_builtin()
            .compile(sdl, &CompileConfig::default())
            .unwrap_err();
        assert_eq!(err.stage(), Some(CompileStage::Validate));
        assert_eq!(err.len(), 1);
        assert!(err.to_string().contains("not allowed on ARGUMENT_DEFINITION"));
    }

    #[test]
    fn test_sf007_inactive_plugin_directive_is_unsupported() {
        let config = CompileConfig::default().with_plugins(&["auth"]).strict();
        let err = Orchestrator::with_builtin().compile(TODO, &config).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.to_string().contains("@persist"));
    }

    #[test]
    fn test_sf007_config_errors_aggregate() {
        let mut config = CompileConfig::default().with_plugins(&["ghost", "persist", "persist"]);
        config.version = "2.0".into();
        let err = Orchestrator::with_builtin().compile(TODO, &config).unwrap_err();
        assert_eq!(err.len(), 3);
        assert!(err.errors().all(|e| matches!(e, TransformError::Config(_))));
    }

    #[test]
    fn test_sf007_duplicate_owner_short_circuits() {
        let err = Orchestrator::new()
            .with_plugin(Stub::new("a", "shared"))
            .with_plugin(Stub::new("b", "shared"))
            .compile("type T @shared { id: ID }", &CompileConfig::default())
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(matches!(
            err.diagnostics[0].error,
            TransformError::DuplicateDirectiveOwner { .. }
        ));
    }

    #[test]
    fn test_sf007_validate_is_fail_slow() {
        let mut a = Stub::new("a", "alpha");
        a.rejects = true;
        let mut b = Stub::new("b", "beta");
        b.rejects = true;
        b.depends_on = vec!["a"];
        let orchestrator = Orchestrator::new().with_plugin(b).with_plugin(a);
        let sdl = "type T @alpha @beta(extra: 1) { id: ID }";

        for parallel in [false, true] {
            let mut config = CompileConfig::default();
            config.policy.parallel_validate = parallel;
            let err = orchestrator.compile(sdl, &config).unwrap_err();
            let plugins: Vec<Option<&str>> =
                err.diagnostics.iter().map(|d| d.plugin.as_deref()).collect();
            // a runs first; b reports its shape error before its own check
            assert_eq!(plugins, vec![Some("a"), Some("b"), Some("b")]);
            assert!(err.diagnostics[1].error.to_string().contains("unknown argument 'extra'"));
            assert_eq!(err.stage(), Some(CompileStage::Validate));
        }
    }

    #[test]
    fn test_sf007_plugin_errors_attributed_and_stop_compile() {
        let mut a = Stub::new("a", "alpha");
        a.fails_schema_pass = true;
        let mut b = Stub::new("b", "beta");
        b.fails_schema_pass = true;
        let err = Orchestrator::new()
            .with_plugin(a)
            .with_plugin(b)
            .compile("type T @alpha @beta { id: ID }", &CompileConfig::default())
            .unwrap_err();
        assert_eq!(err.len(), 2);
        assert!(err
            .diagnostics
            .iter()
            .all(|d| d.stage == CompileStage::TransformSchema));
        assert_eq!(err.diagnostics[1].to_string(), "[transform_schema] b: b failed");
    }

    #[test]
    fn test_sf007_deferred_check_fails_in_finalize() {
        // @auth on a type no plugin binds a data source to
        let sdl = "type Note @auth(rules: [{allow: public}]) { id: ID! }";
        let err = Orchestrator::with_builtin()
            .compile(sdl, &CompileConfig::default())
            .unwrap_err();
        assert_eq!(err.stage(), Some(CompileStage::Finalize));
        assert_eq!(err.diagnostics[0].plugin.as_deref(), Some("auth"));
        assert!(err.to_string().contains("type Note has no data source"));
    }

    #[test]
    fn test_sf007_root_field_without_data_source_fails_in_finalize() {
        let sdl = "type Query { secret: String @auth(rules: [{allow: private}]) }";
        let err = Orchestrator::with_builtin()
            .compile(sdl, &CompileConfig::default())
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.stage(), Some(CompileStage::Finalize));
        assert_eq!(err.diagnostics[0].plugin.as_deref(), Some("auth"));
        assert_eq!(
            err.diagnostics[0].error,
            TransformError::Finalize {
                message: "field Query.secret does not resolve through any data source".into(),
            }
        );
    }

    #[test]
    fn test_sf007_dangling_resource_dependency() {
        let mut a = Stub::new("a", "alpha");
        a.dangling_dependency = true;
        let err = Orchestrator::new()
            .with_plugin(a)
            .compile("type T @alpha { id: ID }", &CompileConfig::default())
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.stage(), Some(CompileStage::Finalize));
        assert_eq!(err.diagnostics[0].plugin.as_deref(), Some("a"));
        assert_eq!(
            err.diagnostics[0].error,
            TransformError::UnknownResourceDependency {
                id: "aQueue".into(),
                dependency: "MissingTable".into(),
            }
        );
    }

    #[test]
    fn test_sf007_cancel_between_stages() {
        let flag = CancelFlag::new();
        let mut a = Stub::new("a", "alpha");
        a.cancels = Some(flag.clone());
        let a_passes = a.passes.clone();
        let b = Stub::new("b", "beta");
        let b_passes = b.passes.clone();
        let orchestrator = Orchestrator::new()
            .with_plugin(a)
            .with_plugin(b)
            .with_cancel(flag);

        let err = orchestrator
            .compile("type T @alpha @beta { id: ID }", &CompileConfig::default())
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(
            err.diagnostics[0].error,
            TransformError::Cancelled(CompileStage::TransformResolvers)
        );
        // the schema pass ran to the end for both plugins; no resolver pass started
        assert_eq!(a_passes.load(Ordering::SeqCst), 1);
        assert_eq!(b_passes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sf007_cancel_before_stage() {
        let flag = CancelFlag::new();
        let orchestrator = Orchestrator::with_builtin().with_cancel(flag.clone());
        assert!(orchestrator.compile(TODO, &CompileConfig::default()).is_ok());

        flag.cancel();
        let err = orchestrator
            .compile(TODO, &CompileConfig::default())
            .unwrap_err();
        assert_eq!(
            err.diagnostics[0].error,
            TransformError::Cancelled(CompileStage::Parse)
        );
    }

    #[test]
    fn test_sf007_resolvers_json_sorted() {
        let out = Orchestrator::with_builtin()
            .compile(TODO, &CompileConfig::default())
            .unwrap();
        let json = out.resolvers_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&String> = parsed.as_object().unwrap().keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(parsed["Query.getTodo"][0]["plugin"], json!("persist"));
    }
}
