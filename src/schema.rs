//! Runtime schema document (compact format).
//!
//! A serializable mirror of the resolved shapes: each shape is a list of
//! predicate descriptors carrying enough structure for a runtime mapper to
//! validate and hydrate data without re-reading the ShExJ source. Nested
//! schemas start inline; the flattener lifts them to top-level entries and
//! replaces them with id references.

use serde::{Deserialize, Serialize};

use crate::normalize::{self, BasicType, FieldValue, LiteralValue, ResolvedShape};

// ------------------------------ Document ---------------------------------- //

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactShape {
    pub iri: String,
    pub predicates: Vec<PredicateSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateSchema {
    #[serde(rename = "type")]
    pub kind: PredicateKind,
    pub predicate_uri: String,
    pub readable_predicate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal_value: Option<Vec<LiteralScalar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_schema: Option<NestedSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub either_of: Option<Vec<EitherOfEntry>>,
    pub min_cardinality: i64,
    pub max_cardinality: i64,
    /// Present (and true) only for EXTRA predicates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PredicateKind {
    Any,
    String,
    Number,
    Boolean,
    Iri,
    Literal,
    Nested,
    EitherOf,
}

impl From<BasicType> for PredicateKind {
    fn from(basic: BasicType) -> Self {
        match basic {
            BasicType::Str => PredicateKind::String,
            BasicType::Num => PredicateKind::Number,
            BasicType::Bool => PredicateKind::Boolean,
            BasicType::Iri => PredicateKind::Iri,
        }
    }
}

/// Literal values keep their JSON scalar type in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralScalar {
    Bool(bool),
    Num(serde_json::Number),
    Str(String),
}

impl LiteralScalar {
    fn from_literal(lit: &LiteralValue) -> LiteralScalar {
        match lit.kind {
            BasicType::Num => lit
                .value
                .parse::<serde_json::Number>()
                .map(LiteralScalar::Num)
                .unwrap_or_else(|_| LiteralScalar::Str(lit.value.clone())),
            BasicType::Bool => lit
                .value
                .parse::<bool>()
                .map(LiteralScalar::Bool)
                .unwrap_or_else(|_| LiteralScalar::Str(lit.value.clone())),
            BasicType::Str | BasicType::Iri => LiteralScalar::Str(lit.value.clone()),
        }
    }
}

/// Inline before flattening, an id reference after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NestedSchema {
    Ref(String),
    Inline(CompactShape),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EitherOfEntry {
    Ref(String),
    Inline(CompactShape),
    Value(DataTypeValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTypeValue {
    #[serde(rename = "type")]
    pub kind: PredicateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literals: Option<Vec<LiteralScalar>>,
}

// ----------------------------- Conversion --------------------------------- //

/// Lower a resolved shape to its schema document form. OR variants collapse
/// into one deduplicated predicate list; the typings keep them apart.
pub fn compact_shape(shape: &ResolvedShape) -> CompactShape {
    let fields = if shape.variants.len() == 1 {
        shape.variants[0].fields.clone()
    } else {
        normalize::merge_fields(
            shape
                .variants
                .iter()
                .flat_map(|v| v.fields.iter().cloned())
                .collect(),
        )
    };
    CompactShape {
        iri: shape.iri.clone(),
        predicates: fields.iter().map(predicate_schema).collect(),
    }
}

fn predicate_schema(field: &normalize::Field) -> PredicateSchema {
    let mut schema = PredicateSchema {
        kind: PredicateKind::Any,
        predicate_uri: field.predicate.clone(),
        readable_predicate: field.readable.clone(),
        literal_value: None,
        nested_schema: None,
        either_of: None,
        min_cardinality: field.min,
        max_cardinality: field.max,
        extra: field.extra.then_some(true),
    };
    apply_value(&mut schema, &field.value);
    schema
}

fn apply_value(schema: &mut PredicateSchema, value: &FieldValue) {
    match value {
        FieldValue::Any => schema.kind = PredicateKind::Any,
        FieldValue::Basic(basic) => schema.kind = (*basic).into(),
        FieldValue::Literal(lit) => {
            schema.kind = PredicateKind::Literal;
            schema.literal_value = Some(vec![LiteralScalar::from_literal(lit)]);
        }
        FieldValue::Ref(iri) => {
            schema.kind = PredicateKind::Nested;
            schema.nested_schema = Some(NestedSchema::Ref(iri.clone()));
        }
        FieldValue::Nested(shape) => {
            schema.kind = PredicateKind::Nested;
            schema.nested_schema = Some(NestedSchema::Inline(compact_shape(shape)));
        }
        FieldValue::Union(alternatives) => {
            // All-literal unions stay a single literal descriptor.
            let literals: Option<Vec<&LiteralValue>> = alternatives
                .iter()
                .map(|v| match v {
                    FieldValue::Literal(lit) => Some(lit),
                    _ => None,
                })
                .collect();
            if let Some(literals) = literals {
                schema.kind = PredicateKind::Literal;
                schema.literal_value =
                    Some(literals.iter().map(|l| LiteralScalar::from_literal(l)).collect());
                return;
            }
            schema.kind = PredicateKind::EitherOf;
            schema.either_of = Some(alternatives.iter().map(either_of_entry).collect());
        }
    }
}

fn either_of_entry(value: &FieldValue) -> EitherOfEntry {
    match value {
        FieldValue::Ref(iri) => EitherOfEntry::Ref(iri.clone()),
        FieldValue::Nested(shape) => EitherOfEntry::Inline(compact_shape(shape)),
        FieldValue::Literal(lit) => EitherOfEntry::Value(DataTypeValue {
            kind: PredicateKind::Literal,
            literals: Some(vec![LiteralScalar::from_literal(lit)]),
        }),
        FieldValue::Basic(basic) => EitherOfEntry::Value(DataTypeValue {
            kind: (*basic).into(),
            literals: None,
        }),
        FieldValue::Any | FieldValue::Union(_) => EitherOfEntry::Value(DataTypeValue {
            kind: PredicateKind::Any,
            literals: None,
        }),
    }
}

// -------------------------------- Tests ----------------------------------- //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Field, FieldSet};
    use crate::shexj::UNBOUNDED;

    fn shape(iri: &str, fields: Vec<Field>) -> ResolvedShape {
        ResolvedShape {
            iri: iri.to_string(),
            variants: vec![FieldSet { fields }],
        }
    }

    fn field(readable: &str, value: FieldValue) -> Field {
        Field {
            predicate: format!("https://example.com/{readable}"),
            readable: readable.to_string(),
            value,
            min: 1,
            max: 1,
            doc: None,
            extra: false,
        }
    }

    #[test]
    fn literal_union_collapses_into_one_descriptor() {
        let s = shape(
            "https://example.com/TagShape",
            vec![field(
                "type",
                FieldValue::Union(vec![
                    FieldValue::Literal(LiteralValue {
                        kind: BasicType::Iri,
                        value: "https://example.com/Entity".into(),
                    }),
                    FieldValue::Literal(LiteralValue {
                        kind: BasicType::Iri,
                        value: "https://example.com/Person".into(),
                    }),
                ]),
            )],
        );
        let compact = compact_shape(&s);
        let pred = &compact.predicates[0];
        assert_eq!(pred.kind, PredicateKind::Literal);
        assert_eq!(
            pred.literal_value,
            Some(vec![
                LiteralScalar::Str("https://example.com/Entity".into()),
                LiteralScalar::Str("https://example.com/Person".into()),
            ])
        );
    }

    #[test]
    fn numeric_and_boolean_literals_keep_their_json_type() {
        let num = LiteralScalar::from_literal(&LiteralValue {
            kind: BasicType::Num,
            value: "42".into(),
        });
        let flag = LiteralScalar::from_literal(&LiteralValue {
            kind: BasicType::Bool,
            value: "true".into(),
        });
        assert_eq!(serde_json::to_value(&num).unwrap(), serde_json::json!(42));
        assert_eq!(serde_json::to_value(&flag).unwrap(), serde_json::json!(true));
    }

    #[test]
    fn mixed_union_becomes_either_of() {
        let s = shape(
            "https://example.com/MixedShape",
            vec![field(
                "p",
                FieldValue::Union(vec![
                    FieldValue::Ref("https://example.com/OtherShape".into()),
                    FieldValue::Basic(BasicType::Str),
                ]),
            )],
        );
        let compact = compact_shape(&s);
        let pred = &compact.predicates[0];
        assert_eq!(pred.kind, PredicateKind::EitherOf);
        let entries = pred.either_of.as_ref().unwrap();
        assert!(matches!(entries[0], EitherOfEntry::Ref(_)));
        assert!(
            matches!(&entries[1], EitherOfEntry::Value(v) if v.kind == PredicateKind::String)
        );
    }

    #[test]
    fn serialized_descriptor_omits_empty_slots() {
        let s = shape(
            "https://example.com/FooShape",
            vec![Field {
                predicate: "https://example.com/bars".into(),
                readable: "bars".into(),
                value: FieldValue::Ref("https://example.com/BarShape".into()),
                min: 0,
                max: UNBOUNDED,
                doc: None,
                extra: false,
            }],
        );
        let json = serde_json::to_value(compact_shape(&s)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "iri": "https://example.com/FooShape",
                "predicates": [{
                    "type": "nested",
                    "predicateUri": "https://example.com/bars",
                    "readablePredicate": "bars",
                    "nestedSchema": "https://example.com/BarShape",
                    "minCardinality": 0,
                    "maxCardinality": -1
                }]
            })
        );
    }
}
