//! ShExJ AST.
//!
//! A closed, serde-tagged model of the ShExJ JSON form (the output of an
//! external ShExC parser). Only the constructs the compiler consumes are
//! modeled: shape declarations, EachOf/OneOf groupings, triple constraints,
//! node constraints, AND/OR combinations and EXTENDS references. Everything
//! is discriminated by the `"type"` field, so malformed nodes fail at parse
//! time instead of deep inside a transform.

use serde::{Deserialize, Serialize};

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_COMMENT: &str = "http://www.w3.org/2000/01/rdf-schema#comment";

/// `max` value meaning "unbounded".
pub const UNBOUNDED: i64 = -1;

// ------------------------------ Schema ----------------------------------- //

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Schema {
    #[serde(default)]
    pub shapes: Vec<ShapeDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub struct ShapeDecl {
    pub id: String,
    pub shape_expr: ShapeExprOrRef,
}

// ---------------------------- Shape exprs -------------------------------- //

/// A shape expression or a reference to a declared shape (a bare IRI string).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShapeExprOrRef {
    Ref(String),
    Expr(Box<ShapeExpr>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShapeExpr {
    Shape(Shape),
    NodeConstraint(NodeConstraint),
    ShapeAnd(ShapeCombination),
    ShapeOr(ShapeCombination),
    ShapeNot(ShapeNegation),
    ShapeExternal(ShapeExternal),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<TripleExprOrRef>,
    /// Parent shapes (EXTENDS), in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<ShapeExprOrRef>,
    /// Predicates allowed to carry values beyond their constraint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeCombination {
    pub shape_exprs: Vec<ShapeExprOrRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeNegation {
    pub shape_expr: Box<ShapeExprOrRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeExternal {}

// ---------------------------- Triple exprs ------------------------------- //

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TripleExprOrRef {
    Ref(String),
    Expr(Box<TripleExpr>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TripleExpr {
    EachOf(EachOf),
    OneOf(OneOf),
    TripleConstraint(TripleConstraint),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EachOf {
    pub expressions: Vec<TripleExprOrRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneOf {
    pub expressions: Vec<TripleExprOrRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripleConstraint {
    pub predicate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_expr: Option<ShapeExprOrRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

impl TripleConstraint {
    /// Omitted cardinality means exactly one.
    pub fn min(&self) -> i64 {
        self.min.unwrap_or(1)
    }

    pub fn max(&self) -> i64 {
        self.max.unwrap_or(1)
    }

    pub fn is_rdf_type(&self) -> bool {
        self.predicate == RDF_TYPE
    }

    /// The `rdfs:comment` annotation text, if any.
    pub fn comment(&self) -> Option<&str> {
        self.annotations
            .iter()
            .find(|a| a.predicate == RDFS_COMMENT)
            .map(|a| a.object.as_str())
    }
}

// --------------------------- Node constraints ---------------------------- //

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_kind: Option<NodeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<ValueSetValue>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Iri,
    Bnode,
    Nonliteral,
    Literal,
}

/// One member of a `[ ... ]` value set. An IRIREF is a bare string; literals
/// and stems are objects. Stems and language tags degrade to their string
/// payload downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSetValue {
    Iri(String),
    Literal(ObjectLiteral),
    Language(Language),
    Stem(Stem),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectLiteral {
    pub value: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub language_tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stem {
    pub stem: String,
}

// ----------------------------- Annotations ------------------------------- //

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub predicate: String,
    pub object: AnnotationObject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationObject {
    Iri(String),
    Literal(ObjectLiteral),
}

impl AnnotationObject {
    pub fn as_str(&self) -> &str {
        match self {
            AnnotationObject::Iri(s) => s,
            AnnotationObject::Literal(lit) => &lit.value,
        }
    }
}

// ------------------------------- Tests ----------------------------------- //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_shape_decl_with_each_of() {
        let schema: Schema = serde_json::from_value(json!({
            "type": "Schema",
            "shapes": [{
                "type": "ShapeDecl",
                "id": "https://example.com/FooShape",
                "shapeExpr": {
                    "type": "Shape",
                    "expression": {
                        "type": "EachOf",
                        "expressions": [{
                            "type": "TripleConstraint",
                            "predicate": "https://example.com/name",
                            "valueExpr": {
                                "type": "NodeConstraint",
                                "datatype": "http://www.w3.org/2001/XMLSchema#string"
                            }
                        }]
                    }
                }
            }]
        }))
        .unwrap();

        assert_eq!(schema.shapes.len(), 1);
        let decl = &schema.shapes[0];
        assert_eq!(decl.id, "https://example.com/FooShape");
        let ShapeExprOrRef::Expr(expr) = &decl.shape_expr else {
            panic!("expected inline shape expr");
        };
        let ShapeExpr::Shape(shape) = expr.as_ref() else {
            panic!("expected Shape");
        };
        let Some(TripleExprOrRef::Expr(te)) = &shape.expression else {
            panic!("expected inline triple expr");
        };
        let TripleExpr::EachOf(each_of) = te.as_ref() else {
            panic!("expected EachOf");
        };
        assert_eq!(each_of.expressions.len(), 1);
    }

    #[test]
    fn shape_expr_ref_is_a_bare_string() {
        let v: ShapeExprOrRef =
            serde_json::from_value(json!("https://example.com/BarShape")).unwrap();
        assert!(matches!(v, ShapeExprOrRef::Ref(ref s) if s == "https://example.com/BarShape"));
    }

    #[test]
    fn cardinality_defaults_to_exactly_one() {
        let tc: TripleConstraint = serde_json::from_value(json!({
            "type": "TripleConstraint",
            "predicate": "https://example.com/p"
        }))
        .unwrap();
        assert_eq!(tc.min(), 1);
        assert_eq!(tc.max(), 1);
    }

    #[test]
    fn value_set_accepts_iris_literals_and_stems() {
        let values: Vec<ValueSetValue> = serde_json::from_value(json!([
            "https://example.com/Entity",
            { "value": "Entity" },
            { "value": "42", "type": "http://www.w3.org/2001/XMLSchema#integer" },
            { "type": "Language", "languageTag": "en" },
            { "type": "IriStem", "stem": "https://example.com/" }
        ]))
        .unwrap();
        assert!(matches!(values[0], ValueSetValue::Iri(_)));
        assert!(matches!(values[1], ValueSetValue::Literal(_)));
        assert!(matches!(values[2], ValueSetValue::Literal(_)));
        assert!(matches!(values[3], ValueSetValue::Language(_)));
        assert!(matches!(values[4], ValueSetValue::Stem(_)));
    }

    #[test]
    fn schema_round_trips_through_serde() {
        let input = json!({
            "type": "Schema",
            "shapes": [{
                "type": "ShapeDecl",
                "id": "https://example.com/FooShape",
                "shapeExpr": {
                    "type": "Shape",
                    "extends": ["https://example.com/BaseShape"],
                    "extra": ["http://www.w3.org/1999/02/22-rdf-syntax-ns#type"],
                    "expression": {
                        "type": "TripleConstraint",
                        "predicate": "https://example.com/p",
                        "min": 0,
                        "max": -1
                    }
                }
            }]
        });
        let schema: Schema = serde_json::from_value(input.clone()).unwrap();
        let back = serde_json::to_value(&schema).unwrap();
        assert_eq!(input, back);
    }
}
