//! Batch compilation driver.
//!
//! Globs ShExJ documents out of an input directory, compiles them in
//! parallel and writes each file's artifacts next to each other in the
//! output directory. One bad source file is reported and skipped; the rest
//! of the batch still compiles.

use std::path::{Path, PathBuf};

use colored::Colorize;
use rayon::prelude::*;

use crate::emit;
use crate::error::Result;
use crate::path_de;
use crate::typing::OutputFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub compiled: usize,
    pub skipped: usize,
}

pub fn build(input_dir: &Path, output_dir: &Path, format: OutputFormat) -> anyhow::Result<BuildSummary> {
    let sources = source_files(input_dir)?;
    if sources.is_empty() {
        anyhow::bail!(
            "no .shex.json, .shexj or .json files under {}",
            input_dir.display()
        );
    }
    std::fs::create_dir_all(output_dir)?;

    let results: Vec<bool> = sources
        .par_iter()
        .map(|path| match compile_file(path, output_dir, format) {
            Ok(()) => true,
            Err(err) => {
                eprintln!(
                    "{} {}: {err}",
                    "skipping".yellow().bold(),
                    path.display()
                );
                false
            }
        })
        .collect();

    let compiled = results.iter().filter(|ok| **ok).count();
    Ok(BuildSummary {
        compiled,
        skipped: results.len() - compiled,
    })
}

/// Matching sources, sorted so logs and summaries are stable.
fn source_files(input_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for pattern in ["*.shex.json", "*.shexj", "*.json"] {
        let full = input_dir.join(pattern);
        let Some(full) = full.to_str() else {
            anyhow::bail!("input path is not valid UTF-8: {}", input_dir.display());
        };
        for entry in glob::glob(full)? {
            let path = entry?;
            if !sources.contains(&path) {
                sources.push(path);
            }
        }
    }
    sources.sort();
    Ok(sources)
}

pub fn compile_file(path: &Path, output_dir: &Path, format: OutputFormat) -> Result<()> {
    let name = schema_name(path);
    let src = std::fs::read(path)?;
    let schema = path_de::from_slice_with_path(&src)?;
    let output = emit::compile_schema(&schema, &name, format)?;
    for artifact in &output.artifacts {
        std::fs::write(output_dir.join(&artifact.file_name), &artifact.contents)?;
    }
    Ok(())
}

/// File stem with the compound `.shex.json` extension fully stripped.
pub fn schema_name(path: &Path) -> String {
    let stem = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    for suffix in [".shex.json", ".shexj", ".json"] {
        if let Some(stripped) = stem.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    stem
}

// -------------------------------- Tests ----------------------------------- //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_name_strips_compound_extensions() {
        assert_eq!(schema_name(Path::new("in/contact.shex.json")), "contact");
        assert_eq!(schema_name(Path::new("in/contact.shexj")), "contact");
        assert_eq!(schema_name(Path::new("in/contact.json")), "contact");
    }

    #[test]
    fn empty_input_directory_reports_every_accepted_pattern() {
        let dir = std::env::temp_dir().join(format!("shex-typegen-empty-{}", std::process::id()));
        let input = dir.join("in");
        std::fs::create_dir_all(&input).unwrap();

        let err = build(&input, &dir.join("out"), OutputFormat::Compact).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(".shex.json"), "{message}");
        assert!(message.contains(".shexj"), "{message}");
        assert!(message.contains(".json"), "{message}");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn builds_a_directory_and_skips_bad_files() {
        let dir = std::env::temp_dir().join(format!("shex-typegen-test-{}", std::process::id()));
        let input = dir.join("in");
        let output = dir.join("out");
        std::fs::create_dir_all(&input).unwrap();

        std::fs::write(
            input.join("good.shex.json"),
            serde_json::json!({
                "type": "Schema",
                "shapes": [{
                    "type": "ShapeDecl",
                    "id": "https://example.com/FooShape",
                    "shapeExpr": {
                        "type": "Shape",
                        "expression": {
                            "type": "TripleConstraint",
                            "predicate": "https://example.com/name",
                            "valueExpr": {
                                "type": "NodeConstraint",
                                "datatype": "http://www.w3.org/2001/XMLSchema#string"
                            }
                        }
                    }
                }]
            })
            .to_string(),
        )
        .unwrap();
        std::fs::write(input.join("bad.shex.json"), "{ not json").unwrap();

        let summary = build(&input, &output, OutputFormat::Compact).unwrap();
        assert_eq!(summary.compiled, 1);
        assert_eq!(summary.skipped, 1);

        let typings = std::fs::read_to_string(output.join("good.typings.ts")).unwrap();
        assert!(typings.contains("export interface Foo {"));
        assert!(output.join("good.schema.compact.ts").exists());
        assert!(output.join("good.shapeTypes.ts").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
