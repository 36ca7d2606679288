//! Artifact emission.
//!
//! Drives the whole per-file pipeline (normalize, type-map, flatten) and
//! prints the TypeScript artifacts. All state is scoped to one source file:
//! the IRI alias and the claimed-name set reset between files, so compiling
//! files in any order, or the same file twice, yields byte-identical output.

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::flatten;
use crate::normalize::{self, ResolvedSchema, ResolvedShape};
use crate::schema::{self, CompactShape};
use crate::shexj;
use crate::typing::{self, NameTable, OutputFormat, TsInterface, TsProperty, TsType};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("hard-coded regex"));

const INDENT: &str = "    ";

// ------------------------------- Output ----------------------------------- //

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub contents: String,
}

#[derive(Debug)]
pub struct CompilerOutput {
    pub typings: String,
    pub interfaces: Vec<TsInterface>,
    pub schema: SchemaDocument,
    pub artifacts: Vec<Artifact>,
}

#[derive(Debug)]
pub enum SchemaDocument {
    /// Flattened shape map (compact format).
    Compact(IndexMap<String, CompactShape>),
    /// Echo of the source ShExJ document (legacy format).
    Ldo(shexj::Schema),
}

// ------------------------------ Pipeline ----------------------------------- //

/// Compile one ShExJ document. `name` is the source file stem; it prefixes
/// every artifact file and exported const.
pub fn compile_schema(
    schema: &shexj::Schema,
    name: &str,
    format: OutputFormat,
) -> Result<CompilerOutput> {
    let resolved = normalize::resolve_schema(schema)?;

    let mut ctx = EmitContext::default();
    let mut names = NameTable::default();
    for shape in &resolved.shapes {
        names.insert(shape.iri.clone(), ctx.claim(&iri_to_name(&shape.iri)));
    }

    let mut declarations = Vec::new();
    let mut interfaces = Vec::new();
    let mut handles: Vec<(String, String)> = Vec::new(); // (type name, shape iri)
    for shape in &resolved.shapes {
        let base = names
            .get(&shape.iri)
            .map(str::to_string)
            .unwrap_or_else(|| iri_to_name(&shape.iri));
        if shape.variants.len() == 1 {
            let properties =
                typing::variant_properties(&shape.variants[0], format, &shape.iri, &names, false)?;
            let iface = TsInterface {
                name: base.clone(),
                iri: shape.iri.clone(),
                properties,
            };
            interfaces.push(iface.clone());
            declarations.push(Declaration::Interface(iface));
        } else {
            // OR variants become numbered interfaces plus a union alias.
            let mut members = Vec::with_capacity(shape.variants.len());
            for (i, variant) in shape.variants.iter().enumerate() {
                let variant_name = ctx.claim(&format!("{base}{}", i + 1));
                let properties =
                    typing::variant_properties(variant, format, &shape.iri, &names, false)?;
                let iface = TsInterface {
                    name: variant_name.clone(),
                    iri: String::new(),
                    properties,
                };
                interfaces.push(iface.clone());
                declarations.push(Declaration::Interface(iface));
                members.push(variant_name);
            }
            declarations.push(Declaration::Alias {
                name: base.clone(),
                members,
            });
        }
        handles.push((base, shape.iri.clone()));
    }

    let typings = render_typings(&declarations, name, format);

    let schema_doc = match format {
        OutputFormat::Compact => {
            let shapes: Vec<CompactShape> =
                resolved.shapes.iter().map(schema::compact_shape).collect();
            SchemaDocument::Compact(flatten::flatten_shapes(shapes, flatten::COMPACT_SEP)?)
        }
        OutputFormat::Ldo => SchemaDocument::Ldo(schema.clone()),
    };

    let mut artifacts = vec![Artifact {
        file_name: format!("{name}.typings.ts"),
        contents: typings.clone(),
    }];
    match &schema_doc {
        SchemaDocument::Compact(map) => {
            artifacts.push(Artifact {
                file_name: format!("{name}.schema.compact.ts"),
                contents: render_compact_schema(map, name)?,
            });
        }
        SchemaDocument::Ldo(echo) => {
            artifacts.push(Artifact {
                file_name: format!("{name}.schema.ts"),
                contents: render_ldo_schema(echo, name)?,
            });
            artifacts.push(Artifact {
                file_name: format!("{name}.context.ts"),
                contents: render_context(&resolved, name)?,
            });
        }
    }
    artifacts.push(Artifact {
        file_name: format!("{name}.shapeTypes.ts"),
        contents: render_shape_types(&handles, name, format),
    });

    Ok(CompilerOutput {
        typings,
        interfaces,
        schema: schema_doc,
        artifacts,
    })
}

#[derive(Debug)]
enum Declaration {
    Interface(TsInterface),
    Alias { name: String, members: Vec<String> },
}

/// Per-file accumulator for claimed type names. Resetting it for every file
/// keeps compilation order out of the output.
#[derive(Debug, Default)]
struct EmitContext {
    used: IndexSet<String>,
}

impl EmitContext {
    fn claim(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

// -------------------------------- Naming ----------------------------------- //

/// TS type name for a shape IRI: the final IRI segment, with a trailing
/// `Shape` suffix dropped, upper-camel-cased.
pub fn iri_to_name(iri: &str) -> String {
    let tail = iri
        .rsplit(['#', '/', ':'])
        .find(|s| !s.is_empty())
        .unwrap_or(iri);
    let tail = if tail.len() > "Shape".len() {
        tail.strip_suffix("Shape").unwrap_or(tail)
    } else {
        tail
    };
    let mut out = String::with_capacity(tail.len());
    let mut upper_next = true;
    for ch in tail.chars() {
        if ch.is_ascii_alphanumeric() {
            if upper_next {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn lower_camel(s: &str) -> String {
    let name = iri_to_name(s);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => name,
    }
}

fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn banner(title: &str) -> String {
    let rule = "=".repeat(77);
    format!("/**\n * {rule}\n * {title}\n * {rule}\n */\n")
}

// ------------------------------ Rendering ---------------------------------- //

fn render_typings(declarations: &[Declaration], name: &str, format: OutputFormat) -> String {
    let mut out = String::new();
    match format {
        OutputFormat::Compact => {
            out.push_str("export type IRI = string;\n\n");
        }
        OutputFormat::Ldo => {
            out.push_str("import { LdoJsonldContext, LdSet } from \"@ldo/ldo\";\n\n");
        }
    }
    out.push_str(&banner(&format!("Typescript Typings for {name}")));
    for decl in declarations {
        out.push('\n');
        match decl {
            Declaration::Interface(iface) => {
                out.push_str(&format!("/**\n * {} Type\n */\n", iface.name));
                out.push_str(&format!("export interface {} {{\n", iface.name));
                for prop in &iface.properties {
                    out.push_str(&render_property(prop, format, 1));
                }
                out.push_str("}\n");
            }
            Declaration::Alias { name, members } => {
                out.push_str(&format!("/**\n * {name} Type\n */\n"));
                out.push_str(&format!("export type {name} = {};\n", members.join(" | ")));
            }
        }
    }
    out
}

fn render_property(prop: &TsProperty, format: OutputFormat, indent: usize) -> String {
    let pad = INDENT.repeat(indent);
    let mut out = String::new();
    if let Some(doc) = &prop.doc {
        out.push_str(&format!("{pad}/**\n"));
        for line in doc.lines() {
            if line.is_empty() {
                out.push_str(&format!("{pad} *\n"));
            } else {
                out.push_str(&format!("{pad} * {line}\n"));
            }
        }
        out.push_str(&format!("{pad} */\n"));
    }
    let key = if is_valid_identifier(&prop.name) {
        prop.name.clone()
    } else {
        format!("\"{}\"", escape_string(&prop.name))
    };
    let readonly = if prop.readonly { "readonly " } else { "" };
    let optional = if prop.optional { "?" } else { "" };
    out.push_str(&format!(
        "{pad}{readonly}{key}{optional}: {};\n",
        render_type(&prop.ty, format, indent)
    ));
    out
}

fn render_type(ty: &TsType, format: OutputFormat, indent: usize) -> String {
    match ty {
        TsType::Any => "any".to_string(),
        TsType::Str => "string".to_string(),
        TsType::Num => "number".to_string(),
        TsType::Bool => "boolean".to_string(),
        TsType::Named(name) => name.clone(),
        TsType::StringLiteral(value) => format!("\"{}\"", escape_string(value)),
        TsType::Union(members) => members
            .iter()
            .map(|m| render_type(m, format, indent))
            .collect::<Vec<_>>()
            .join(" | "),
        TsType::Set(inner) => {
            let container = match format {
                OutputFormat::Compact => "Set",
                OutputFormat::Ldo => "LdSet",
            };
            format!("{container}<{}>", render_type(inner, format, indent))
        }
        TsType::IriRecord(inner) => {
            format!("Record<IRI, {}>", render_type(inner, format, indent))
        }
        TsType::Object(properties) => {
            let mut out = String::from("{\n");
            for prop in properties {
                out.push_str(&render_property(prop, format, indent + 1));
            }
            out.push_str(&format!("{}}}", INDENT.repeat(indent)));
            out
        }
    }
}

fn render_compact_schema(map: &IndexMap<String, CompactShape>, name: &str) -> Result<String> {
    let prefix = lower_camel(name);
    let json = serde_json::to_string_pretty(map)?;
    let mut out = String::new();
    out.push_str("import { CompactSchema } from \"@ng-org/shex-orm\";\n\n");
    out.push_str(&banner(&format!("{prefix}Schema: Flattened schema for {name}")));
    out.push_str(&format!(
        "export const {prefix}Schema: CompactSchema = {json};\n"
    ));
    Ok(out)
}

fn render_ldo_schema(schema: &shexj::Schema, name: &str) -> Result<String> {
    let prefix = lower_camel(name);
    let json = serde_json::to_string_pretty(schema)?;
    let mut out = String::new();
    out.push_str("import { Schema } from \"shexj\";\n\n");
    out.push_str(&banner(&format!("{prefix}Schema: ShexJ Schema for {name}")));
    out.push_str(&format!("export const {prefix}Schema: Schema = {json};\n"));
    Ok(out)
}

fn render_shape_types(handles: &[(String, String)], name: &str, format: OutputFormat) -> String {
    let prefix = lower_camel(name);
    let mut out = String::new();
    match format {
        OutputFormat::Compact => {
            out.push_str("import { ShapeType } from \"@ng-org/shex-orm\";\n");
            out.push_str(&format!(
                "import {{ {prefix}Schema }} from \"./{name}.schema.compact\";\n"
            ));
        }
        OutputFormat::Ldo => {
            out.push_str("import { ShapeType } from \"@ldo/ldo\";\n");
            out.push_str(&format!(
                "import {{ {prefix}Schema }} from \"./{name}.schema\";\n"
            ));
            out.push_str(&format!(
                "import {{ {prefix}Context }} from \"./{name}.context\";\n"
            ));
        }
    }
    let type_names: Vec<&str> = handles.iter().map(|(n, _)| n.as_str()).collect();
    out.push_str(&format!(
        "import {{ {} }} from \"./{name}.typings\";\n\n",
        type_names.join(", ")
    ));
    out.push_str(&banner(&format!("ShapeTypes for {name}")));
    for (type_name, iri) in handles {
        out.push('\n');
        out.push_str(&format!("/**\n * {type_name} ShapeType\n */\n"));
        out.push_str(&format!(
            "export const {type_name}ShapeType: ShapeType<{type_name}> = {{\n"
        ));
        out.push_str(&format!("{INDENT}schema: {prefix}Schema,\n"));
        out.push_str(&format!("{INDENT}shape: \"{}\",\n", escape_string(iri)));
        if format == OutputFormat::Ldo {
            out.push_str(&format!("{INDENT}context: {prefix}Context,\n"));
        }
        out.push_str("};\n");
    }
    out
}

// --------------------------- JSON-LD context ------------------------------- //

fn render_context(resolved: &ResolvedSchema, name: &str) -> Result<String> {
    let prefix = lower_camel(name);
    let json = serde_json::to_string_pretty(&jsonld_context(resolved))?;
    let mut out = String::new();
    out.push_str("import { LdoJsonldContext } from \"@ldo/ldo\";\n\n");
    out.push_str(&banner(&format!("{prefix}Context: JSONLD Context for {name}")));
    out.push_str(&format!(
        "export const {prefix}Context: LdoJsonldContext = {json};\n"
    ));
    Ok(out)
}

fn jsonld_context(resolved: &ResolvedSchema) -> serde_json::Value {
    let mut ctx = serde_json::Map::new();
    for shape in &resolved.shapes {
        let fields = merged_fields(shape);
        let mut shape_ctx = serde_json::Map::new();
        for field in &fields {
            shape_ctx.insert(field.readable.clone(), context_entry(field));
        }
        for field in &fields {
            ctx.insert(field.readable.clone(), context_entry(field));
            if field.readable == "type" {
                // Class tags get their own entries carrying the shape's
                // nested context.
                for tag in literal_tags(&field.value) {
                    ctx.insert(
                        local_name(&tag),
                        serde_json::json!({
                            "@id": tag,
                            "@context": serde_json::Value::Object(shape_ctx.clone()),
                        }),
                    );
                }
            }
        }
    }
    serde_json::Value::Object(ctx)
}

fn merged_fields(shape: &ResolvedShape) -> Vec<normalize::Field> {
    if shape.variants.len() == 1 {
        shape.variants[0].fields.clone()
    } else {
        normalize::merge_fields(
            shape
                .variants
                .iter()
                .flat_map(|v| v.fields.iter().cloned())
                .collect(),
        )
    }
}

fn context_entry(field: &normalize::Field) -> serde_json::Value {
    if field.readable == "type" {
        return serde_json::json!({ "@id": "@type", "@isCollection": true });
    }
    if field.is_plural() {
        serde_json::json!({ "@id": field.predicate, "@isCollection": true })
    } else {
        serde_json::json!(field.predicate)
    }
}

fn literal_tags(value: &normalize::FieldValue) -> Vec<String> {
    match value {
        normalize::FieldValue::Literal(lit) => vec![lit.value.clone()],
        normalize::FieldValue::Union(vs) => vs.iter().flat_map(literal_tags).collect(),
        _ => Vec::new(),
    }
}

fn local_name(iri: &str) -> String {
    iri.rsplit(['#', '/', ':'])
        .find(|s| !s.is_empty())
        .unwrap_or(iri)
        .to_string()
}

// -------------------------------- Tests ----------------------------------- //
