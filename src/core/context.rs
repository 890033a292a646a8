//! SF-005: Compile context threaded through every plugin pass.
//!
//! One `Context` per compile. It owns the schema model, the growing
//! infrastructure graph, the per-field stage contributions, data-source
//! bindings and deferred checks. The orchestrator stamps the plugin that is
//! currently running so every contribution is attributed. After `freeze`
//! every mutating call fails with `TransformError::Frozen`.

use super::error::{TransformError, Warning};
use super::types::*;
use indexmap::IndexMap;

#[derive(Debug)]
pub struct Context {
    config: CompileConfig,
    schema: SchemaModel,
    infra: InfraGraph,
    contributions: IndexMap<FieldRef, Vec<StageContribution>>,
    /// Type name → data-source bindings, in binding order
    bindings: IndexMap<String, Vec<OperationBinding>>,
    deferred: Vec<DeferredCheck>,
    plugin_order: Vec<PluginId>,
    current_plugin: Option<PluginId>,
    frozen: bool,
    warnings: Vec<Warning>,
}

impl Context {
    pub fn new(schema: SchemaModel, config: CompileConfig) -> Self {
        Self {
            config,
            schema,
            infra: InfraGraph::new(),
            contributions: IndexMap::new(),
            bindings: IndexMap::new(),
            deferred: Vec::new(),
            plugin_order: Vec::new(),
            current_plugin: None,
            frozen: false,
            warnings: Vec::new(),
        }
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    pub fn schema(&self) -> &SchemaModel {
        &self.schema
    }

    /// Mutable schema access for the transform-schema pass.
    pub fn schema_mut(&mut self) -> Result<&mut SchemaModel, TransformError> {
        self.ensure_open()?;
        Ok(&mut self.schema)
    }

    pub fn infra(&self) -> &InfraGraph {
        &self.infra
    }

    pub fn plugin_order(&self) -> &[PluginId] {
        &self.plugin_order
    }

    pub fn set_plugin_order(&mut self, order: Vec<PluginId>) {
        self.plugin_order = order;
    }

    /// Attribute subsequent contributions to `plugin`.
    pub fn enter_plugin(&mut self, plugin: &str) {
        self.current_plugin = Some(plugin.to_string());
    }

    pub fn leave_plugin(&mut self) {
        self.current_plugin = None;
    }

    pub fn current_plugin(&self) -> &str {
        self.current_plugin.as_deref().unwrap_or("core")
    }

    fn ensure_open(&self) -> Result<(), TransformError> {
        if self.frozen {
            Err(TransformError::Frozen)
        } else {
            Ok(())
        }
    }

    /// Add an infrastructure resource under a logical id.
    pub fn add_resource(&mut self, id: &str, resource: InfraResource) -> Result<(), TransformError> {
        self.ensure_open()?;
        let plugin = self.current_plugin().to_string();
        self.infra
            .insert(id, resource, &plugin)
            .map_err(|existing| TransformError::DuplicateResource {
                id: id.to_string(),
                existing,
            })
    }

    /// Attach a resolver stage to an existing field.
    pub fn attach_stage(&mut self, field: &FieldRef, stage: Stage) -> Result<(), TransformError> {
        self.ensure_open()?;
        if !self.schema.contains_field(field) {
            return Err(TransformError::UnknownField(field.clone()));
        }
        let plugin = self.current_plugin().to_string();
        self.contributions
            .entry(field.clone())
            .or_default()
            .push(StageContribution { plugin, stage });
        Ok(())
    }

    /// Stage contributions keyed by field, in attachment order.
    pub fn contributions(&self) -> &IndexMap<FieldRef, Vec<StageContribution>> {
        &self.contributions
    }

    pub fn contributions_for(&self, field: &FieldRef) -> &[StageContribution] {
        self.contributions
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Record that `field` serves `operation` for `type_name` via `data_source`.
    pub fn bind_operation(
        &mut self,
        type_name: &str,
        operation: Operation,
        field: FieldRef,
        data_source: &str,
    ) -> Result<(), TransformError> {
        self.ensure_open()?;
        let plugin = self.current_plugin().to_string();
        self.bindings
            .entry(type_name.to_string())
            .or_default()
            .push(OperationBinding {
                operation,
                field,
                data_source: data_source.to_string(),
                plugin,
            });
        Ok(())
    }

    pub fn bindings_for(&self, type_name: &str) -> &[OperationBinding] {
        self.bindings
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Queue a check that runs once every plugin has finished.
    pub fn defer(&mut self, requirement: Requirement) -> Result<(), TransformError> {
        self.ensure_open()?;
        let plugin = self.current_plugin().to_string();
        self.deferred.push(DeferredCheck {
            plugin,
            requirement,
        });
        Ok(())
    }

    pub fn deferred(&self) -> &[DeferredCheck] {
        &self.deferred
    }

    pub fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
        self.current_plugin = None;
    }
}
