//! Type mapping: resolved fields to a TypeScript type model.
//!
//! The model is format-aware only where the two output formats genuinely
//! diverge: identity properties, IRI rendering and the container used for
//! repeatable predicates. Everything else maps identically and the emitter
//! just prints the tree.

use indexmap::IndexMap;

use crate::error::{CompileError, Result};
use crate::normalize::{BasicType, Field, FieldSet, FieldValue, ResolvedShape};

// ------------------------------- Formats ---------------------------------- //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Legacy `@ldo/ldo` output: LdSet containers, `@id`/`@context` identity,
    /// ShExJ echo schema and a JSON-LD context artifact.
    Ldo,
    /// Compact output: native `Set`/`Record` containers, `id: IRI` identity
    /// and a flattened schema document.
    Compact,
}

// ------------------------------ Type model -------------------------------- //

#[derive(Debug, Clone, PartialEq)]
pub enum TsType {
    Any,
    Str,
    Num,
    Bool,
    /// A named interface or alias.
    Named(String),
    StringLiteral(String),
    Object(Vec<TsProperty>),
    Union(Vec<TsType>),
    /// `Set<T>` (compact) or `LdSet<T>` (ldo).
    Set(Box<TsType>),
    /// `Record<IRI, T>`; compact only.
    IriRecord(Box<TsType>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TsProperty {
    pub name: String,
    pub ty: TsType,
    pub optional: bool,
    pub readonly: bool,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TsInterface {
    pub name: String,
    /// Declared shape IRI; empty for variant interfaces of a union shape.
    pub iri: String,
    pub properties: Vec<TsProperty>,
}

/// TS names assigned to declared shape IRIs, in declaration order.
#[derive(Debug, Default)]
pub struct NameTable {
    by_iri: IndexMap<String, String>,
}

impl NameTable {
    pub fn insert(&mut self, iri: String, name: String) {
        self.by_iri.insert(iri, name);
    }

    pub fn get(&self, iri: &str) -> Option<&str> {
        self.by_iri.get(iri).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_iri.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// ------------------------------- Mapping ---------------------------------- //

/// Identity properties opening every object type. Top-level interfaces get
/// the required form, inline nested objects the optional one.
pub fn identity_properties(format: OutputFormat, nested: bool) -> Vec<TsProperty> {
    match format {
        OutputFormat::Compact => vec![TsProperty {
            name: "id".into(),
            ty: TsType::Named("IRI".into()),
            optional: nested,
            readonly: false,
            doc: None,
        }],
        OutputFormat::Ldo => {
            let mut props = vec![TsProperty {
                name: "@id".into(),
                ty: TsType::Str,
                optional: true,
                readonly: false,
                doc: None,
            }];
            if !nested {
                props.push(TsProperty {
                    name: "@context".into(),
                    ty: TsType::Named("LdoJsonldContext".into()),
                    optional: true,
                    readonly: false,
                    doc: None,
                });
            }
            props
        }
    }
}

pub fn properties_for_fields(
    fields: &[Field],
    format: OutputFormat,
    owner: &str,
    names: &NameTable,
) -> Result<Vec<TsProperty>> {
    fields
        .iter()
        .map(|f| property_for_field(f, format, owner, names))
        .collect()
}

fn property_for_field(
    field: &Field,
    format: OutputFormat,
    owner: &str,
    names: &NameTable,
) -> Result<TsProperty> {
    let base = type_for_value(&field.value, format, names)?;

    let ty = if field.is_plural() {
        if field.value.is_mixed_union() {
            return Err(CompileError::MixedPluralUnion {
                shape: owner.to_string(),
                predicate: field.predicate.clone(),
            });
        }
        if format == OutputFormat::Compact && field.value.is_object_like() {
            TsType::IriRecord(Box::new(base))
        } else {
            TsType::Set(Box::new(base))
        }
    } else {
        base
    };

    let doc = match &field.doc {
        Some(comment) => format!("{comment}\n\nOriginal IRI: {}", field.predicate),
        None => format!("Original IRI: {}", field.predicate),
    };

    Ok(TsProperty {
        name: field.readable.clone(),
        ty,
        optional: field.is_optional(),
        readonly: false,
        doc: Some(doc),
    })
}

fn type_for_value(value: &FieldValue, format: OutputFormat, names: &NameTable) -> Result<TsType> {
    Ok(match value {
        FieldValue::Any => TsType::Any,
        FieldValue::Basic(BasicType::Str) => TsType::Str,
        FieldValue::Basic(BasicType::Num) => TsType::Num,
        FieldValue::Basic(BasicType::Bool) => TsType::Bool,
        FieldValue::Basic(BasicType::Iri) => match format {
            OutputFormat::Compact => TsType::Named("IRI".into()),
            OutputFormat::Ldo => TsType::Str,
        },
        FieldValue::Literal(lit) => match lit.kind {
            BasicType::Num => TsType::Num,
            BasicType::Bool => TsType::Bool,
            BasicType::Str | BasicType::Iri => TsType::StringLiteral(lit.value.clone()),
        },
        FieldValue::Ref(iri) => TsType::Named(
            names
                .get(iri)
                .map(str::to_string)
                .unwrap_or_else(|| crate::emit::iri_to_name(iri)),
        ),
        FieldValue::Nested(shape) => object_type(shape, format, names)?,
        FieldValue::Union(alternatives) => {
            let mut members = Vec::with_capacity(alternatives.len());
            for alt in alternatives {
                let ty = type_for_value(alt, format, names)?;
                if !members.contains(&ty) {
                    members.push(ty);
                }
            }
            match members.len() {
                1 => members.remove(0),
                _ => TsType::Union(members),
            }
        }
    })
}

/// Inline object type for an anonymous nested shape; a multi-variant nested
/// shape becomes a union of object types.
fn object_type(shape: &ResolvedShape, format: OutputFormat, names: &NameTable) -> Result<TsType> {
    let mut objects = Vec::with_capacity(shape.variants.len());
    for variant in &shape.variants {
        objects.push(TsType::Object(variant_properties(
            variant, format, &shape.iri, names, true,
        )?));
    }
    Ok(match objects.len() {
        1 => objects.remove(0),
        _ => TsType::Union(objects),
    })
}

pub fn variant_properties(
    variant: &FieldSet,
    format: OutputFormat,
    owner: &str,
    names: &NameTable,
    nested: bool,
) -> Result<Vec<TsProperty>> {
    let mut props = identity_properties(format, nested);
    props.extend(properties_for_fields(&variant.fields, format, owner, names)?);
    Ok(props)
}

// -------------------------------- Tests ----------------------------------- //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::LiteralValue;
    use crate::shexj::UNBOUNDED;

    fn field(readable: &str, value: FieldValue, min: i64, max: i64) -> Field {
        Field {
            predicate: format!("https://example.com/{readable}"),
            readable: readable.to_string(),
            value,
            min,
            max,
            doc: None,
            extra: false,
        }
    }

    fn names() -> NameTable {
        let mut table = NameTable::default();
        table.insert("https://example.com/BarShape".into(), "Bar".into());
        table
    }

    #[test]
    fn plural_object_maps_to_record_in_compact_and_set_in_ldo() {
        let f = field(
            "bars",
            FieldValue::Ref("https://example.com/BarShape".into()),
            0,
            UNBOUNDED,
        );
        let compact =
            property_for_field(&f, OutputFormat::Compact, "https://example.com/FooShape", &names())
                .unwrap();
        assert_eq!(
            compact.ty,
            TsType::IriRecord(Box::new(TsType::Named("Bar".into())))
        );
        assert!(compact.optional);

        let ldo =
            property_for_field(&f, OutputFormat::Ldo, "https://example.com/FooShape", &names())
                .unwrap();
        assert_eq!(ldo.ty, TsType::Set(Box::new(TsType::Named("Bar".into()))));
    }

    #[test]
    fn plural_scalar_maps_to_set_in_both_formats() {
        let f = field("nicknames", FieldValue::Basic(BasicType::Str), 0, UNBOUNDED);
        for format in [OutputFormat::Compact, OutputFormat::Ldo] {
            let prop =
                property_for_field(&f, format, "https://example.com/FooShape", &names()).unwrap();
            assert_eq!(prop.ty, TsType::Set(Box::new(TsType::Str)));
        }
    }

    #[test]
    fn mixed_plural_union_is_rejected() {
        let f = field(
            "p",
            FieldValue::Union(vec![
                FieldValue::Ref("https://example.com/BarShape".into()),
                FieldValue::Basic(BasicType::Str),
            ]),
            1,
            UNBOUNDED,
        );
        let err = property_for_field(&f, OutputFormat::Compact, "https://example.com/FooShape", &names())
            .unwrap_err();
        assert!(matches!(err, CompileError::MixedPluralUnion { .. }));
    }

    #[test]
    fn singular_mixed_union_is_allowed() {
        let f = field(
            "p",
            FieldValue::Union(vec![
                FieldValue::Ref("https://example.com/BarShape".into()),
                FieldValue::Basic(BasicType::Str),
            ]),
            1,
            1,
        );
        let prop =
            property_for_field(&f, OutputFormat::Compact, "https://example.com/FooShape", &names())
                .unwrap();
        assert_eq!(
            prop.ty,
            TsType::Union(vec![TsType::Named("Bar".into()), TsType::Str])
        );
    }

    #[test]
    fn iri_values_stay_typed_in_compact_but_degrade_in_ldo() {
        let value = FieldValue::Basic(BasicType::Iri);
        assert_eq!(
            type_for_value(&value, OutputFormat::Compact, &names()).unwrap(),
            TsType::Named("IRI".into())
        );
        assert_eq!(
            type_for_value(&value, OutputFormat::Ldo, &names()).unwrap(),
            TsType::Str
        );
    }

    #[test]
    fn literal_tags_render_as_string_literal_types() {
        let value = FieldValue::Union(vec![
            FieldValue::Literal(LiteralValue {
                kind: BasicType::Iri,
                value: "https://example.com/Entity".into(),
            }),
            FieldValue::Literal(LiteralValue {
                kind: BasicType::Iri,
                value: "https://example.com/Person".into(),
            }),
        ]);
        assert_eq!(
            type_for_value(&value, OutputFormat::Compact, &names()).unwrap(),
            TsType::Union(vec![
                TsType::StringLiteral("https://example.com/Entity".into()),
                TsType::StringLiteral("https://example.com/Person".into()),
            ])
        );
    }

    #[test]
    fn doc_always_carries_the_original_iri() {
        let mut f = field("name", FieldValue::Basic(BasicType::Str), 1, 1);
        f.doc = Some("The display name.".into());
        let prop =
            property_for_field(&f, OutputFormat::Compact, "https://example.com/FooShape", &names())
                .unwrap();
        assert_eq!(
            prop.doc.as_deref(),
            Some("The display name.\n\nOriginal IRI: https://example.com/name")
        );
    }
}
