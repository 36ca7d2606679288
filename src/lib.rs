//! ShEx-to-TypeScript compiler.
//!
//! Takes ShExJ documents (the JSON form of ShEx schemas) and emits, per
//! source file, TypeScript typings, a runtime schema document and shape-type
//! handles. Two output formats are supported: the legacy `@ldo/ldo` layout
//! and a compact layout with a flattened schema keyed by shape id.
//!
//! The pipeline is strictly per-file and deterministic:
//!
//! 1. [`normalize`] resolves references, materializes EXTENDS inheritance
//!    and collapses AND/OR combinations into field lists.
//! 2. [`annotate`] derives collision-free property names from predicate IRIs.
//! 3. [`typing`] maps fields onto a TypeScript type model; [`schema`] lowers
//!    them to the runtime schema document and [`flatten`] lifts nested
//!    schemas to top-level entries under synthetic ids.
//! 4. [`emit`] renders the artifacts.

pub mod annotate;
pub mod build;
pub mod cli;
pub mod emit;
pub mod error;
pub mod flatten;
pub mod normalize;
pub mod path_de;
pub mod schema;
pub mod shexj;
pub mod typing;

pub use build::{build, BuildSummary};
pub use emit::{compile_schema, Artifact, CompilerOutput, SchemaDocument};
pub use error::{CompileError, Result};
pub use typing::OutputFormat;
