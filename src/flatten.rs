//! Schema flattening.
//!
//! Lifts inline nested schemas out of their parents into top-level map
//! entries keyed by a synthetic id (`parent_iri` + separator + predicate
//! IRI), replacing each inline schema with a reference to that id. The pass
//! is idempotent: running it over an already-flat document changes nothing.

use indexmap::{IndexMap, IndexSet};

use crate::error::{CompileError, Result};
use crate::schema::{CompactShape, EitherOfEntry, NestedSchema};

/// Separator between the parent shape id and the predicate IRI in a
/// synthetic id. Only the compact format flattens; the legacy format echoes
/// the ShExJ source and keeps nested shapes inline.
pub const COMPACT_SEP: &str = "||";

/// Flatten a list of top-level shapes into a map keyed by shape id,
/// declaration order first, lifted shapes after in discovery order.
pub fn flatten_shapes(
    shapes: Vec<CompactShape>,
    separator: &str,
) -> Result<IndexMap<String, CompactShape>> {
    let mut used: IndexSet<String> = shapes.iter().map(|s| s.iri.clone()).collect();
    let mut lifted: Vec<CompactShape> = Vec::new();
    let mut out: IndexMap<String, CompactShape> = IndexMap::new();

    for mut shape in shapes {
        lift_nested(&mut shape, separator, &mut used, &mut lifted)?;
        out.insert(shape.iri.clone(), shape);
    }
    // Lifted shapes may themselves contain inline schemas; lift until the
    // queue drains.
    while !lifted.is_empty() {
        let batch = std::mem::take(&mut lifted);
        for mut shape in batch {
            lift_nested(&mut shape, separator, &mut used, &mut lifted)?;
            out.insert(shape.iri.clone(), shape);
        }
    }
    Ok(out)
}

fn lift_nested(
    shape: &mut CompactShape,
    separator: &str,
    used: &mut IndexSet<String>,
    lifted: &mut Vec<CompactShape>,
) -> Result<()> {
    let parent = shape.iri.clone();
    for predicate in &mut shape.predicates {
        match predicate.nested_schema.take() {
            Some(NestedSchema::Inline(mut inner)) => {
                let id = synthetic_id(&parent, separator, &predicate.predicate_uri, used)?;
                inner.iri = id.clone();
                lifted.push(inner);
                predicate.nested_schema = Some(NestedSchema::Ref(id));
            }
            other => predicate.nested_schema = other,
        }
        if let Some(entries) = &mut predicate.either_of {
            for entry in entries.iter_mut() {
                let EitherOfEntry::Inline(inner) = entry else {
                    continue;
                };
                let id = synthetic_id(&parent, separator, &predicate.predicate_uri, used)?;
                let mut inner = std::mem::replace(
                    inner,
                    CompactShape {
                        iri: String::new(),
                        predicates: Vec::new(),
                    },
                );
                inner.iri = id.clone();
                lifted.push(inner);
                *entry = EitherOfEntry::Ref(id);
            }
        }
    }
    Ok(())
}

fn synthetic_id(
    parent: &str,
    separator: &str,
    predicate: &str,
    used: &mut IndexSet<String>,
) -> Result<String> {
    let id = format!("{parent}{separator}{predicate}");
    if !used.insert(id.clone()) {
        return Err(CompileError::SyntheticIdCollision { id });
    }
    Ok(id)
}

// -------------------------------- Tests ----------------------------------- //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PredicateKind, PredicateSchema};

    fn nested_predicate(predicate: &str, nested: NestedSchema) -> PredicateSchema {
        PredicateSchema {
            kind: PredicateKind::Nested,
            predicate_uri: predicate.to_string(),
            readable_predicate: predicate.rsplit('/').next().unwrap().to_string(),
            literal_value: None,
            nested_schema: Some(nested),
            either_of: None,
            min_cardinality: 1,
            max_cardinality: 1,
            extra: None,
        }
    }

    fn leaf_shape(iri: &str) -> CompactShape {
        CompactShape {
            iri: iri.to_string(),
            predicates: vec![],
        }
    }

    #[test]
    fn inline_schema_is_lifted_under_a_synthetic_id() {
        let inner = CompactShape {
            iri: String::new(),
            predicates: vec![],
        };
        let outer = CompactShape {
            iri: "https://example.com/ConfigHolderShape".into(),
            predicates: vec![nested_predicate(
                "https://example.com/config",
                NestedSchema::Inline(inner),
            )],
        };
        let flat = flatten_shapes(vec![outer], COMPACT_SEP).unwrap();

        let synthetic = "https://example.com/ConfigHolderShape||https://example.com/config";
        assert_eq!(
            flat.keys().collect::<Vec<_>>(),
            ["https://example.com/ConfigHolderShape", synthetic]
        );
        let outer = &flat["https://example.com/ConfigHolderShape"];
        assert_eq!(
            outer.predicates[0].nested_schema,
            Some(NestedSchema::Ref(synthetic.to_string()))
        );
        assert_eq!(flat[synthetic].iri, synthetic);
    }

    #[test]
    fn deeply_nested_schemas_are_lifted_transitively() {
        let innermost = CompactShape {
            iri: String::new(),
            predicates: vec![],
        };
        let middle = CompactShape {
            iri: String::new(),
            predicates: vec![nested_predicate(
                "https://example.com/leaf",
                NestedSchema::Inline(innermost),
            )],
        };
        let outer = CompactShape {
            iri: "https://example.com/RootShape".into(),
            predicates: vec![nested_predicate(
                "https://example.com/mid",
                NestedSchema::Inline(middle),
            )],
        };
        let flat = flatten_shapes(vec![outer], COMPACT_SEP).unwrap();
        assert_eq!(flat.len(), 3);
        let mid_id = "https://example.com/RootShape||https://example.com/mid";
        let leaf_id = format!("{mid_id}||https://example.com/leaf");
        assert!(flat.contains_key(mid_id));
        assert!(flat.contains_key(leaf_id.as_str()));
    }

    #[test]
    fn flattening_is_idempotent() {
        let inner = CompactShape {
            iri: String::new(),
            predicates: vec![],
        };
        let outer = CompactShape {
            iri: "https://example.com/FooShape".into(),
            predicates: vec![nested_predicate(
                "https://example.com/bar",
                NestedSchema::Inline(inner),
            )],
        };
        let once = flatten_shapes(vec![outer], COMPACT_SEP).unwrap();
        let twice =
            flatten_shapes(once.values().cloned().collect(), COMPACT_SEP).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn synthetic_id_clashing_with_declared_id_is_fatal() {
        let inner = CompactShape {
            iri: String::new(),
            predicates: vec![],
        };
        let outer = CompactShape {
            iri: "https://example.com/FooShape".into(),
            predicates: vec![nested_predicate(
                "https://example.com/bar",
                NestedSchema::Inline(inner),
            )],
        };
        let squatter = leaf_shape("https://example.com/FooShape||https://example.com/bar");
        let err = flatten_shapes(vec![outer, squatter], COMPACT_SEP).unwrap_err();
        assert!(matches!(err, CompileError::SyntheticIdCollision { .. }));
    }

    #[test]
    fn references_pass_through_untouched() {
        let outer = CompactShape {
            iri: "https://example.com/FooShape".into(),
            predicates: vec![nested_predicate(
                "https://example.com/bar",
                NestedSchema::Ref("https://example.com/BarShape".into()),
            )],
        };
        let flat =
            flatten_shapes(vec![outer, leaf_shape("https://example.com/BarShape")], COMPACT_SEP)
                .unwrap();
        assert_eq!(flat.len(), 2);
        assert_eq!(
            flat["https://example.com/FooShape"].predicates[0].nested_schema,
            Some(NestedSchema::Ref("https://example.com/BarShape".into()))
        );
    }
}
