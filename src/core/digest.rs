//! SF-011: Compile fingerprints.
//!
//! A fingerprint covers the rewritten schema, the resource graph and the
//! resolver pipelines of one compile. Every part enters the hash as a
//! length-prefixed label followed by length-prefixed content, so text
//! cannot migrate from one part to its neighbour without changing the
//! result.

use super::error::TransformError;
use super::types::InfraGraph;
use serde::Serialize;

const PREFIX: &str = "blake3:";

/// Incremental BLAKE3 digest over labelled parts.
#[derive(Debug, Clone, Default)]
pub struct Fingerprint {
    hasher: blake3::Hasher,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part(mut self, label: &str, content: &[u8]) -> Self {
        for bytes in [label.as_bytes(), content] {
            self.hasher.update(&(bytes.len() as u64).to_le_bytes());
            self.hasher.update(bytes);
        }
        self
    }

    /// `"blake3:{hex}"`
    pub fn finish(&self) -> String {
        format!("{}{}", PREFIX, self.hasher.finalize().to_hex())
    }
}

/// Digest of one emitted artifact, keyed by its file name.
pub fn artifact_digest(name: &str, content: &str) -> String {
    Fingerprint::new().part(name, content.as_bytes()).finish()
}

/// Fingerprint of a compile: schema text, resources by sorted id, and the
/// resolver pipelines. Independent of resource insertion order.
pub fn compile_fingerprint(
    schema: &str,
    infra: &InfraGraph,
    pipelines: &impl Serialize,
) -> Result<String, TransformError> {
    let render = |e: serde_json::Error| TransformError::Render(e.to_string());
    let mut fp = Fingerprint::new().part("schema", schema.as_bytes());

    let mut ids: Vec<&String> = infra.ids().collect();
    ids.sort();
    for id in ids {
        if let Some(contributed) = infra.get(id) {
            let body = serde_json::to_vec(&contributed.resource).map_err(render)?;
            fp = fp.part(id, &body);
        }
    }

    let pipelines = serde_json::to_vec(pipelines).map_err(render)?;
    Ok(fp.part("pipelines", &pipelines).finish())
}
