//! SF-008: Infrastructure synthesizer.
//!
//! Turns the frozen infrastructure graph into one rendered document.
//! Resources are emitted in topological order of their `DependsOn` edges;
//! resources with no ordering constraint between them are emitted by id,
//! so the bytes never depend on which plugin contributed first.

use super::error::TransformError;
use super::resolver::topo_sort;
use super::types::*;
use indexmap::IndexMap;
use serde::Serialize;

pub const FORMAT_VERSION: &str = "1.0";

/// The deployment-format document before rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfraDocument {
    pub format_version: String,
    pub name: String,
    pub fingerprint: String,
    pub resources: IndexMap<String, InfraResource>,
}

/// A rendered document and the format it was rendered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub format: OutputFormat,
    pub content: String,
}

/// One-way serializer for an `InfraDocument`.
pub trait RenderBackend {
    fn format(&self) -> OutputFormat;
    fn render(&self, document: &InfraDocument) -> Result<String, TransformError>;
}

pub struct JsonBackend;

impl RenderBackend for JsonBackend {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn render(&self, document: &InfraDocument) -> Result<String, TransformError> {
        let mut out = serde_json::to_string_pretty(document)
            .map_err(|e| TransformError::Render(e.to_string()))?;
        out.push('\n');
        Ok(out)
    }
}

pub struct YamlBackend;

impl RenderBackend for YamlBackend {
    fn format(&self) -> OutputFormat {
        OutputFormat::Yaml
    }

    fn render(&self, document: &InfraDocument) -> Result<String, TransformError> {
        serde_yaml_ng::to_string(document).map_err(|e| TransformError::Render(e.to_string()))
    }
}

/// Backend for a configured output format.
pub fn backend_for(format: OutputFormat) -> Box<dyn RenderBackend> {
    match format {
        OutputFormat::Json => Box::new(JsonBackend),
        OutputFormat::Yaml => Box::new(YamlBackend),
    }
}

/// Resource ids in emission order.
pub fn emission_order(graph: &InfraGraph) -> Result<Vec<String>, TransformError> {
    let mut ids: Vec<String> = graph.ids().cloned().collect();
    ids.sort();
    let mut edges = Vec::new();
    for (id, contributed) in graph.iter() {
        for dep in &contributed.resource.depends_on {
            edges.push((dep.clone(), id.clone()));
        }
    }
    topo_sort(&ids, &edges).map_err(|cycle| TransformError::ResourceCycle { cycle })
}

/// Build the unrendered document.
pub fn build_document(
    graph: &InfraGraph,
    name: &str,
    fingerprint: &str,
) -> Result<InfraDocument, TransformError> {
    let mut resources = IndexMap::with_capacity(graph.len());
    for id in emission_order(graph)? {
        if let Some(contributed) = graph.get(&id) {
            resources.insert(id, contributed.resource.clone());
        }
    }
    Ok(InfraDocument {
        format_version: FORMAT_VERSION.to_string(),
        name: name.to_string(),
        fingerprint: fingerprint.to_string(),
        resources,
    })
}

/// Order and render the graph with the given backend.
pub fn synthesize(
    graph: &InfraGraph,
    name: &str,
    fingerprint: &str,
    backend: &dyn RenderBackend,
) -> Result<RenderedDocument, TransformError> {
    let document = build_document(graph, name, fingerprint)?;
    Ok(RenderedDocument {
        format: backend.format(),
        content: backend.render(&document)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph() -> InfraGraph {
        let mut g = InfraGraph::new();
        g.insert(
            "TodoDataSource",
            InfraResource::new("AppSync::DataSource").depends_on("TodoTable"),
            "persist",
        )
        .unwrap();
        g.insert(
            "TodoTable",
            InfraResource::new("DynamoDB::Table").property("TableName", json!("Todo")),
            "persist",
        )
        .unwrap();
        g.insert("ApiRole", InfraResource::new("IAM::Role"), "function")
            .unwrap();
        g
    }

    #[test]
    fn test_sf008_dependencies_first() {
        let order = emission_order(&graph()).unwrap();
        assert_eq!(order, vec!["ApiRole", "TodoTable", "TodoDataSource"]);
    }

    #[test]
    fn test_sf008_insertion_order_irrelevant() {
        let mut reversed = InfraGraph::new();
        let g = graph();
        let mut entries: Vec<_> = g.iter().collect();
        entries.reverse();
        for (id, c) in entries {
            reversed.insert(id, c.resource.clone(), &c.plugin).unwrap();
        }
        let a = synthesize(&g, "todo", "blake3:00", &JsonBackend).unwrap();
        let b = synthesize(&reversed, "todo", "blake3:00", &JsonBackend).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sf008_resource_cycle() {
        let mut g = InfraGraph::new();
        g.insert("A", InfraResource::new("X").depends_on("B"), "p")
            .unwrap();
        g.insert("B", InfraResource::new("X").depends_on("A"), "p")
            .unwrap();
        let err = emission_order(&g).unwrap_err();
        assert_eq!(
            err,
            TransformError::ResourceCycle {
                cycle: vec!["A".into(), "B".into()]
            }
        );
    }

    #[test]
    fn test_sf008_json_shape() {
        let doc = synthesize(&graph(), "todo-api", "blake3:ab", &JsonBackend).unwrap();
        assert_eq!(doc.format, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&doc.content).unwrap();
        assert_eq!(value["formatVersion"], "1.0");
        assert_eq!(value["name"], "todo-api");
        assert_eq!(value["resources"]["TodoTable"]["Type"], "DynamoDB::Table");
        assert_eq!(
            value["resources"]["TodoDataSource"]["DependsOn"],
            json!(["TodoTable"])
        );
        assert!(value["resources"]["TodoTable"].get("DependsOn").is_none());
    }

    #[test]
    fn test_sf008_yaml_backend() {
        let doc = synthesize(&graph(), "todo-api", "blake3:ab", backend_for(OutputFormat::Yaml).as_ref())
            .unwrap();
        assert_eq!(doc.format, OutputFormat::Yaml);
        let parsed: serde_yaml_ng::Value = serde_yaml_ng::from_str(&doc.content).unwrap();
        assert_eq!(parsed["formatVersion"].as_str(), Some("1.0"));
        assert_eq!(parsed["resources"]["ApiRole"]["Type"].as_str(), Some("IAM::Role"));
    }
}
