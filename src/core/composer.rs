//! SF-006: Resolver pipeline composer.
//!
//! Merges every stage contributed to one field into a single linear chain:
//! slots run in declaration order; inside a slot, stages are ordered by the
//! resolved plugin order, and one plugin's stages keep insertion order.
//! Two different plugins may share a slot only if both stages are
//! commutative.

use super::error::TransformError;
use super::types::*;
use indexmap::IndexMap;
use std::collections::BTreeMap;

fn rank(plugin_order: &[PluginId], plugin: &str) -> usize {
    plugin_order
        .iter()
        .position(|p| p == plugin)
        .unwrap_or(plugin_order.len())
}

/// Compose one field's contributions.
pub fn compose(
    field: &FieldRef,
    contributions: &[StageContribution],
    plugin_order: &[PluginId],
) -> Result<ResolverPipeline, TransformError> {
    let mut by_slot: BTreeMap<Slot, Vec<&StageContribution>> = BTreeMap::new();
    for c in contributions {
        by_slot.entry(c.stage.slot).or_default().push(c);
    }

    let mut stages = Vec::with_capacity(contributions.len());
    for (slot, mut group) in by_slot {
        // stable: same-plugin stages keep insertion order
        group.sort_by_key(|c| rank(plugin_order, &c.plugin));

        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                if a.plugin != b.plugin && !(a.stage.commutative && b.stage.commutative) {
                    return Err(TransformError::SlotConflict {
                        field: field.clone(),
                        slot,
                        first: a.plugin.clone(),
                        second: b.plugin.clone(),
                    });
                }
            }
        }

        stages.extend(group.into_iter().cloned());
    }

    Ok(ResolverPipeline {
        field: field.clone(),
        stages,
    })
}

/// Compose every field. Fields are visited in sorted order; a field whose
/// contributions conflict yields an error and no pipeline.
pub fn compose_all(
    contributions: &IndexMap<FieldRef, Vec<StageContribution>>,
    plugin_order: &[PluginId],
) -> (BTreeMap<FieldRef, ResolverPipeline>, Vec<TransformError>) {
    let mut fields: Vec<&FieldRef> = contributions.keys().collect();
    fields.sort();

    let mut pipelines = BTreeMap::new();
    let mut errors = Vec::new();
    for field in fields {
        match compose(field, &contributions[field], plugin_order) {
            Ok(pipeline) => {
                pipelines.insert(field.clone(), pipeline);
            }
            Err(e) => errors.push(e),
        }
    }
    (pipelines, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contrib(plugin: &str, name: &str, slot: Slot, commutative: bool) -> StageContribution {
        let stage = Stage::new(name, slot);
        StageContribution {
            plugin: plugin.to_string(),
            stage: if commutative { stage.commutative() } else { stage },
        }
    }

    fn order(names: &[&str]) -> Vec<PluginId> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn names(p: &ResolverPipeline) -> Vec<&str> {
        p.stages.iter().map(|s| s.stage.name.as_str()).collect()
    }

    #[test]
    fn test_sf006_slots_ordered() {
        let field = FieldRef::new("Mutation", "createTodo");
        let pipeline = compose(
            &field,
            &[
                contrib("persist", "load", Slot::DataLoad, false),
                contrib("auth", "check", Slot::Auth, false),
                contrib("audit", "log", Slot::Finish, false),
            ],
            &order(&["persist", "auth", "audit"]),
        )
        .unwrap();
        assert_eq!(names(&pipeline), vec!["check", "load", "log"]);
    }

    #[test]
    fn test_sf006_slot_conflict() {
        let field = FieldRef::new("Query", "getTodo");
        let err = compose(
            &field,
            &[
                contrib("function", "invoke", Slot::DataLoad, false),
                contrib("persist", "load", Slot::DataLoad, false),
            ],
            &order(&["persist", "function"]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransformError::SlotConflict {
                field,
                slot: Slot::DataLoad,
                first: "persist".into(),
                second: "function".into(),
            }
        );
    }

    #[test]
    fn test_sf006_one_commutative_side_still_conflicts() {
        let field = FieldRef::new("Query", "listTodos");
        let result = compose(
            &field,
            &[
                contrib("auth", "filter", Slot::PostDataLoad, true),
                contrib("search", "shape", Slot::PostDataLoad, false),
            ],
            &order(&["auth", "search"]),
        );
        assert!(matches!(result, Err(TransformError::SlotConflict { .. })));
    }

    #[test]
    fn test_sf006_commutative_ordered_by_plugin_rank() {
        let field = FieldRef::new("Query", "searchTodos");
        let contributions = [
            contrib("search", "shape", Slot::PostDataLoad, true),
            contrib("auth", "filter", Slot::PostDataLoad, true),
        ];
        let pipeline = compose(&field, &contributions, &order(&["auth", "search"])).unwrap();
        assert_eq!(names(&pipeline), vec!["filter", "shape"]);
        let pipeline = compose(&field, &contributions, &order(&["search", "auth"])).unwrap();
        assert_eq!(names(&pipeline), vec!["shape", "filter"]);
    }

    #[test]
    fn test_sf006_same_plugin_keeps_insertion_order() {
        let field = FieldRef::new("Query", "report");
        let pipeline = compose(
            &field,
            &[
                contrib("function", "second", Slot::DataLoad, false),
                contrib("function", "first", Slot::DataLoad, false),
            ],
            &order(&["function"]),
        )
        .unwrap();
        assert_eq!(names(&pipeline), vec!["second", "first"]);
    }

    #[test]
    fn test_sf006_empty_is_passthrough() {
        let pipeline = compose(&FieldRef::new("Todo", "id"), &[], &[]).unwrap();
        assert!(pipeline.is_passthrough());
    }

    #[test]
    fn test_sf006_compose_all_skips_conflicting_field() {
        let mut contributions = IndexMap::new();
        contributions.insert(
            FieldRef::new("Query", "b"),
            vec![
                contrib("x", "one", Slot::DataLoad, false),
                contrib("y", "two", Slot::DataLoad, false),
            ],
        );
        contributions.insert(
            FieldRef::new("Query", "a"),
            vec![contrib("x", "only", Slot::DataLoad, false)],
        );
        let (pipelines, errors) = compose_all(&contributions, &order(&["x", "y"]));
        assert_eq!(errors.len(), 1);
        assert_eq!(pipelines.len(), 1);
        assert!(pipelines.contains_key(&FieldRef::new("Query", "a")));
        assert!(!pipelines.contains_key(&FieldRef::new("Query", "b")));
    }
}
