//! Compiler error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors raised while compiling one shape file. Each one is fatal for the
/// file being compiled; sibling files are unaffected.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The upstream ShExJ document did not deserialize.
    #[error("failed to parse ShExJ: {0}")]
    Parse(String),

    /// A shape EXTENDS itself, directly or through a chain.
    #[error("circular EXTENDS chain involving {shape}")]
    CircularExtends { shape: String },

    /// A shape or value expression references an id that is not declared.
    #[error("{referrer} references unknown shape {reference}")]
    UnresolvedReference {
        referrer: String,
        reference: String,
    },

    /// A flattened inline shape would shadow a declared shape.
    #[error("synthetic shape id {id} collides with a declared shape id")]
    SyntheticIdCollision { id: String },

    /// A repeatable OR mixes object-like and primitive alternatives.
    #[error("mixed plural union (shape + primitive) on predicate {predicate} in {shape}")]
    MixedPluralUnion { shape: String, predicate: String },

    /// A construct the compiler does not map (ShapeNot, ShapeExternal, ...).
    #[error("unsupported {construct} in {shape}")]
    Unsupported {
        shape: String,
        construct: &'static str,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
