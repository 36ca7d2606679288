//! Normalizer: ShExJ declarations to fully-materialized field lists.
//!
//! Resolves shape references up front, materializes EXTENDS inheritance
//! (ancestor fields first, in declaration order), merges AND-combinations
//! into a single field list and keeps OR branches as distinct variants.
//! `rdf:type` literal tags accumulate monotonically down an EXTENDS chain,
//! so a leaf shape carries the union of every ancestor's class tags.
//!
//! All lookups run over an index built once from the declaration list; a
//! visiting stack turns circular EXTENDS chains into a hard error instead
//! of an infinite loop.

use indexmap::IndexMap;

use crate::annotate::annotate_readable_predicates;
use crate::error::{CompileError, Result};
use crate::shexj;

// ---------------------------- Resolved model ------------------------------ //

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchema {
    /// Declaration order is preserved; it drives every downstream ordering.
    pub shapes: Vec<ResolvedShape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedShape {
    /// Declared id, or empty for an anonymous inline shape (the flattener
    /// assigns its synthetic id later).
    pub iri: String,
    /// OR branches. A plain shape has exactly one.
    pub variants: Vec<FieldSet>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet {
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub predicate: String,
    /// Collision-free property name, assigned by the annotator.
    pub readable: String,
    pub value: FieldValue,
    pub min: i64,
    pub max: i64,
    pub doc: Option<String>,
    pub extra: bool,
}

impl Field {
    pub fn is_plural(&self) -> bool {
        self.max == shexj::UNBOUNDED || self.max > 1
    }

    pub fn is_optional(&self) -> bool {
        self.min == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// No value constraint (`ex:p .`).
    Any,
    Basic(BasicType),
    Literal(LiteralValue),
    /// Reference to a declared shape.
    Ref(String),
    /// Inline anonymous shape.
    Nested(Box<ResolvedShape>),
    /// OR alternatives, flattened and deduplicated.
    Union(Vec<FieldValue>),
}

impl FieldValue {
    /// Shape-valued (an object in the emitted typings), directly or as a
    /// union of shapes.
    pub fn is_object_like(&self) -> bool {
        match self {
            FieldValue::Ref(_) | FieldValue::Nested(_) => true,
            FieldValue::Union(vs) => !vs.is_empty() && vs.iter().all(FieldValue::is_object_like),
            _ => false,
        }
    }

    /// A union mixing shape-valued and primitive alternatives.
    pub fn is_mixed_union(&self) -> bool {
        match self {
            FieldValue::Union(vs) => {
                vs.iter().any(FieldValue::is_object_like)
                    && vs.iter().any(|v| !v.is_object_like())
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicType {
    Str,
    Num,
    Bool,
    Iri,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralValue {
    pub kind: BasicType,
    /// Lexical form; numeric and boolean literals keep their source text.
    pub value: String,
}

// ---------------------------- Datatype table ------------------------------ //

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Map an XSD datatype IRI to the basic output type. Unknown datatypes fall
/// back to string.
pub fn datatype_to_basic(datatype: &str) -> BasicType {
    let Some(local) = datatype.strip_prefix(XSD) else {
        return BasicType::Str;
    };
    match local {
        "byte" | "decimal" | "double" | "float" | "int" | "integer" | "long"
        | "negativeInteger" | "nonNegativeInteger" | "nonPositiveInteger" | "positiveInteger"
        | "short" | "unsignedLong" | "unsignedInt" | "unsignedShort" | "unsignedByte" => {
            BasicType::Num
        }
        "boolean" => BasicType::Bool,
        "anyURI" => BasicType::Iri,
        // string-ish, date/time-ish, hexBinary and everything else
        _ => BasicType::Str,
    }
}

// ------------------------------ Resolution -------------------------------- //

pub fn resolve_schema(schema: &shexj::Schema) -> Result<ResolvedSchema> {
    let decls: IndexMap<&str, &shexj::ShapeDecl> = schema
        .shapes
        .iter()
        .map(|d| (d.id.as_str(), d))
        .collect();
    let resolver = Resolver { decls };

    let mut shapes = Vec::with_capacity(schema.shapes.len());
    for decl in &schema.shapes {
        let mut visiting = Vec::new();
        shapes.push(resolver.resolve_decl(decl, &mut visiting)?);
    }
    Ok(ResolvedSchema { shapes })
}

struct Resolver<'a> {
    decls: IndexMap<&'a str, &'a shexj::ShapeDecl>,
}

impl<'a> Resolver<'a> {
    fn resolve_decl(
        &self,
        decl: &shexj::ShapeDecl,
        visiting: &mut Vec<String>,
    ) -> Result<ResolvedShape> {
        if visiting.iter().any(|id| id == &decl.id) {
            return Err(CompileError::CircularExtends {
                shape: decl.id.clone(),
            });
        }
        visiting.push(decl.id.clone());
        let variants = self.expr_variants(&decl.shape_expr, &decl.id, visiting)?;
        visiting.pop();
        Ok(ResolvedShape {
            iri: decl.id.clone(),
            variants,
        })
    }

    /// Variants of a shape expression in declaration position (a ShapeDecl
    /// body, an EXTENDS target, or an inline value shape).
    fn expr_variants(
        &self,
        expr: &shexj::ShapeExprOrRef,
        owner: &str,
        visiting: &mut Vec<String>,
    ) -> Result<Vec<FieldSet>> {
        match expr {
            shexj::ShapeExprOrRef::Ref(id) => {
                let decl = self.lookup(owner, id)?;
                Ok(self.resolve_decl(decl, visiting)?.variants)
            }
            shexj::ShapeExprOrRef::Expr(e) => match e.as_ref() {
                shexj::ShapeExpr::Shape(shape) => self.shape_variants(shape, owner, visiting),
                shexj::ShapeExpr::ShapeAnd(and) => {
                    // AND merges every conjunct into one field list.
                    let mut fields = Vec::new();
                    for conjunct in &and.shape_exprs {
                        fields.extend(self.single_variant(conjunct, owner, visiting)?.fields);
                    }
                    Ok(vec![FieldSet {
                        fields: merge_fields(fields),
                    }])
                }
                shexj::ShapeExpr::ShapeOr(or) => {
                    // OR keeps each branch as its own variant.
                    let mut variants = Vec::new();
                    for branch in &or.shape_exprs {
                        variants.extend(self.expr_variants(branch, owner, visiting)?);
                    }
                    Ok(variants)
                }
                shexj::ShapeExpr::NodeConstraint(_) => Err(CompileError::Unsupported {
                    shape: owner.to_string(),
                    construct: "node constraint as shape declaration",
                }),
                shexj::ShapeExpr::ShapeNot(_) => Err(CompileError::Unsupported {
                    shape: owner.to_string(),
                    construct: "ShapeNot",
                }),
                shexj::ShapeExpr::ShapeExternal(_) => Err(CompileError::Unsupported {
                    shape: owner.to_string(),
                    construct: "ShapeExternal",
                }),
            },
        }
    }

    fn single_variant(
        &self,
        expr: &shexj::ShapeExprOrRef,
        owner: &str,
        visiting: &mut Vec<String>,
    ) -> Result<FieldSet> {
        let mut variants = self.expr_variants(expr, owner, visiting)?;
        if variants.len() != 1 {
            return Err(CompileError::Unsupported {
                shape: owner.to_string(),
                construct: "union shape where a single field list is required",
            });
        }
        Ok(variants.remove(0))
    }

    fn shape_variants(
        &self,
        shape: &shexj::Shape,
        owner: &str,
        visiting: &mut Vec<String>,
    ) -> Result<Vec<FieldSet>> {
        let mut own_variants = match &shape.expression {
            None => vec![FieldSet { fields: Vec::new() }],
            Some(shexj::TripleExprOrRef::Ref(_)) => {
                return Err(CompileError::Unsupported {
                    shape: owner.to_string(),
                    construct: "triple expression reference",
                });
            }
            Some(shexj::TripleExprOrRef::Expr(te)) => match te.as_ref() {
                shexj::TripleExpr::TripleConstraint(tc) => {
                    vec![FieldSet {
                        fields: vec![self.resolve_constraint(tc, owner, visiting)?],
                    }]
                }
                shexj::TripleExpr::EachOf(each_of) => {
                    vec![self.each_of_fields(each_of, owner, visiting)?]
                }
                shexj::TripleExpr::OneOf(one_of) => {
                    let mut variants = Vec::new();
                    for expr in &one_of.expressions {
                        variants.push(self.group_fields(expr, owner, visiting)?);
                    }
                    variants
                }
            },
        };

        // Assign readable predicates per sibling group before any merging,
        // so inherited duplicates line up by name.
        for variant in &mut own_variants {
            annotate_readable_predicates(&mut variant.fields);
        }

        // EXTENDS: ancestor fields first, then our own.
        if !shape.extends.is_empty() {
            let mut inherited = Vec::new();
            for parent in &shape.extends {
                inherited.extend(self.single_variant(parent, owner, visiting)?.fields);
            }
            for variant in &mut own_variants {
                let own = std::mem::take(&mut variant.fields);
                let mut fields = inherited.clone();
                fields.extend(own);
                variant.fields = fields;
            }
        }

        for variant in &mut own_variants {
            variant.fields = merge_fields(std::mem::take(&mut variant.fields));
            for extra in &shape.extra {
                for field in &mut variant.fields {
                    if &field.predicate == extra {
                        field.extra = true;
                    }
                }
            }
        }
        Ok(own_variants)
    }

    /// Field list of one OneOf branch (a bare constraint or an EachOf group).
    fn group_fields(
        &self,
        expr: &shexj::TripleExprOrRef,
        owner: &str,
        visiting: &mut Vec<String>,
    ) -> Result<FieldSet> {
        match expr {
            shexj::TripleExprOrRef::Ref(_) => Err(CompileError::Unsupported {
                shape: owner.to_string(),
                construct: "triple expression reference",
            }),
            shexj::TripleExprOrRef::Expr(te) => match te.as_ref() {
                shexj::TripleExpr::TripleConstraint(tc) => Ok(FieldSet {
                    fields: vec![self.resolve_constraint(tc, owner, visiting)?],
                }),
                shexj::TripleExpr::EachOf(each_of) => {
                    self.each_of_fields(each_of, owner, visiting)
                }
                shexj::TripleExpr::OneOf(_) => Err(CompileError::Unsupported {
                    shape: owner.to_string(),
                    construct: "nested OneOf group",
                }),
            },
        }
    }

    fn each_of_fields(
        &self,
        each_of: &shexj::EachOf,
        owner: &str,
        visiting: &mut Vec<String>,
    ) -> Result<FieldSet> {
        let mut fields = Vec::with_capacity(each_of.expressions.len());
        for expr in &each_of.expressions {
            match expr {
                shexj::TripleExprOrRef::Ref(_) => {
                    return Err(CompileError::Unsupported {
                        shape: owner.to_string(),
                        construct: "triple expression reference",
                    });
                }
                shexj::TripleExprOrRef::Expr(te) => match te.as_ref() {
                    shexj::TripleExpr::TripleConstraint(tc) => {
                        fields.push(self.resolve_constraint(tc, owner, visiting)?);
                    }
                    shexj::TripleExpr::EachOf(_) | shexj::TripleExpr::OneOf(_) => {
                        return Err(CompileError::Unsupported {
                            shape: owner.to_string(),
                            construct: "nested grouping inside EachOf",
                        });
                    }
                },
            }
        }
        Ok(FieldSet { fields })
    }

    fn resolve_constraint(
        &self,
        tc: &shexj::TripleConstraint,
        owner: &str,
        visiting: &mut Vec<String>,
    ) -> Result<Field> {
        let value = match &tc.value_expr {
            None => FieldValue::Any,
            Some(ve) => self.resolve_value(ve, owner, visiting)?,
        };
        Ok(Field {
            predicate: tc.predicate.clone(),
            readable: String::new(),
            value,
            min: tc.min(),
            max: tc.max(),
            doc: tc.comment().map(str::to_string),
            extra: false,
        })
    }

    fn resolve_value(
        &self,
        ve: &shexj::ShapeExprOrRef,
        owner: &str,
        visiting: &mut Vec<String>,
    ) -> Result<FieldValue> {
        match ve {
            shexj::ShapeExprOrRef::Ref(id) => {
                // Keep references symbolic; existence is all we check here.
                self.lookup(owner, id)?;
                Ok(FieldValue::Ref(id.clone()))
            }
            shexj::ShapeExprOrRef::Expr(e) => match e.as_ref() {
                shexj::ShapeExpr::NodeConstraint(nc) => node_constraint_value(nc, owner),
                shexj::ShapeExpr::Shape(shape) => {
                    let variants = self.shape_variants(shape, owner, visiting)?;
                    Ok(FieldValue::Nested(Box::new(ResolvedShape {
                        iri: String::new(),
                        variants,
                    })))
                }
                shexj::ShapeExpr::ShapeOr(or) => {
                    let mut alternatives = Vec::new();
                    for branch in &or.shape_exprs {
                        match self.resolve_value(branch, owner, visiting)? {
                            FieldValue::Union(vs) => alternatives.extend(vs),
                            v => alternatives.push(v),
                        }
                    }
                    Ok(union_of(alternatives))
                }
                shexj::ShapeExpr::ShapeAnd(and) => {
                    // AND of inline shapes merges into one nested shape.
                    let mut fields = Vec::new();
                    for conjunct in &and.shape_exprs {
                        match self.resolve_value(conjunct, owner, visiting)? {
                            FieldValue::Nested(shape) if shape.variants.len() == 1 => {
                                let mut variants = shape.variants;
                                fields.extend(variants.remove(0).fields);
                            }
                            _ => {
                                return Err(CompileError::Unsupported {
                                    shape: owner.to_string(),
                                    construct: "AND of non-shape value expressions",
                                });
                            }
                        }
                    }
                    Ok(FieldValue::Nested(Box::new(ResolvedShape {
                        iri: String::new(),
                        variants: vec![FieldSet {
                            fields: merge_fields(fields),
                        }],
                    })))
                }
                shexj::ShapeExpr::ShapeNot(_) => Err(CompileError::Unsupported {
                    shape: owner.to_string(),
                    construct: "ShapeNot",
                }),
                shexj::ShapeExpr::ShapeExternal(_) => Err(CompileError::Unsupported {
                    shape: owner.to_string(),
                    construct: "ShapeExternal",
                }),
            },
        }
    }

    fn lookup(&self, owner: &str, id: &str) -> Result<&'a shexj::ShapeDecl> {
        self.decls
            .get(id)
            .copied()
            .ok_or_else(|| CompileError::UnresolvedReference {
                referrer: owner.to_string(),
                reference: id.to_string(),
            })
    }
}

fn node_constraint_value(nc: &shexj::NodeConstraint, owner: &str) -> Result<FieldValue> {
    if let Some(datatype) = &nc.datatype {
        return Ok(FieldValue::Basic(datatype_to_basic(datatype)));
    }
    if let Some(kind) = nc.node_kind {
        return Ok(FieldValue::Basic(match kind {
            shexj::NodeKind::Iri | shexj::NodeKind::Nonliteral => BasicType::Iri,
            shexj::NodeKind::Bnode | shexj::NodeKind::Literal => BasicType::Str,
        }));
    }
    if let Some(values) = &nc.values {
        let literals: Vec<FieldValue> = values
            .iter()
            .map(|v| FieldValue::Literal(value_set_literal(v)))
            .collect();
        return Ok(union_of(literals));
    }
    Err(CompileError::Unsupported {
        shape: owner.to_string(),
        construct: "node constraint without datatype, nodeKind or values",
    })
}

fn value_set_literal(value: &shexj::ValueSetValue) -> LiteralValue {
    match value {
        shexj::ValueSetValue::Iri(iri) => LiteralValue {
            kind: BasicType::Iri,
            value: iri.clone(),
        },
        shexj::ValueSetValue::Literal(lit) => LiteralValue {
            kind: lit
                .datatype
                .as_deref()
                .map(datatype_to_basic)
                .unwrap_or(BasicType::Str),
            value: lit.value.clone(),
        },
        // Language tags and stems degrade to their string payload.
        shexj::ValueSetValue::Language(lang) => LiteralValue {
            kind: BasicType::Str,
            value: lang.language_tag.clone(),
        },
        shexj::ValueSetValue::Stem(stem) => LiteralValue {
            kind: BasicType::Str,
            value: stem.stem.clone(),
        },
    }
}

// ------------------------------- Merging ---------------------------------- //

/// Collapse duplicate field names into single fields: value types union (so
/// inherited `rdf:type` tags accumulate), a field is optional if any
/// occurrence is optional, plural if any occurrence is plural, and doc
/// comments join with `" | "`. First-occurrence order is preserved.
pub fn merge_fields(fields: Vec<Field>) -> Vec<Field> {
    let mut merged: IndexMap<String, Field> = IndexMap::new();
    for field in fields {
        match merged.entry(field.readable.clone()) {
            indexmap::map::Entry::Occupied(mut entry) => merge_into(entry.get_mut(), field),
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(field);
            }
        }
    }
    merged.into_values().collect()
}

fn merge_into(acc: &mut Field, next: Field) {
    let current = std::mem::replace(&mut acc.value, FieldValue::Any);
    acc.value = union_of(flatten_union(current).into_iter().chain(flatten_union(next.value)).collect());
    acc.min = acc.min.min(next.min);
    acc.max = if acc.max == shexj::UNBOUNDED || next.max == shexj::UNBOUNDED {
        shexj::UNBOUNDED
    } else {
        acc.max.max(next.max)
    };
    acc.extra |= next.extra;
    acc.doc = match (acc.doc.take(), next.doc) {
        (Some(a), Some(b)) if a != b => Some(format!("{a} | {b}")),
        (Some(a), _) => Some(a),
        (None, b) => b,
    };
}

fn flatten_union(value: FieldValue) -> Vec<FieldValue> {
    match value {
        FieldValue::Union(vs) => vs.into_iter().flat_map(flatten_union).collect(),
        v => vec![v],
    }
}

/// Build a union, dropping duplicates; a single member collapses to itself.
pub fn union_of(mut values: Vec<FieldValue>) -> FieldValue {
    let mut unique: Vec<FieldValue> = Vec::with_capacity(values.len());
    for v in values.drain(..) {
        if !unique.contains(&v) {
            unique.push(v);
        }
    }
    match unique.len() {
        0 => FieldValue::Any,
        1 => unique.remove(0),
        _ => FieldValue::Union(unique),
    }
}

// -------------------------------- Tests ----------------------------------- //
