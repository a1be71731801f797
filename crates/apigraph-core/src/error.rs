//! Error taxonomy shared by every apigraph crate

use thiserror::Error;

/// Errors raised while configuring surfaces, populating a codebase or
/// traversing it.
///
/// Lookup misses are never represented here; `find_*`/`resolve_*` return
/// `Option` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    // ── Configuration ───────────────────────────────────────
    #[error("duplicate API surface '{0}'")]
    DuplicateSurface(String),

    #[error("API surface '{surface}' extends unknown surface '{extends}'")]
    UnknownExtends { surface: String, extends: String },

    #[error("API surface '{surface}' cannot be main, '{existing}' is already the main surface")]
    MultipleMainSurfaces { surface: String, existing: String },

    #[error("no API surface was marked as main")]
    NoMainSurface,

    #[error("API surfaces must form a single chain, found roots: {0}")]
    MultipleRootSurfaces(String),

    #[error("API surface '{surface}' extends the main surface '{main}'")]
    MainSurfaceExtended { surface: String, main: String },

    #[error("too many API surfaces ({count}), at most {max} are supported")]
    TooManySurfaces { count: usize, max: usize },

    #[error("unknown API surface '{0}'")]
    UnknownSurface(String),

    #[error("malformed variant set '{input}': {reason}")]
    MalformedVariantSet { input: String, reason: String },

    #[error("variant '{0}' belongs to a different ApiSurfaces configuration")]
    ForeignVariant(String),

    // ── Resolution ──────────────────────────────────────────
    #[error("qualified name collision: '{0}' is already defined")]
    QualifiedNameCollision(String),

    #[error("type parameter '{name}' referenced from '{context}' is not in scope")]
    UnresolvedTypeParameter { name: String, context: String },

    #[error("unknown package '{0}'")]
    UnknownPackage(String),

    #[error("unknown item {0}")]
    UnknownItem(String),

    #[error("missing classes referenced as supertypes: {0}")]
    MissingClasses(String),

    // ── Documents ───────────────────────────────────────────
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl GraphError {
    /// Whether this error comes from surface configuration rather than
    /// from the graph itself.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GraphError::DuplicateSurface(_)
                | GraphError::UnknownExtends { .. }
                | GraphError::MultipleMainSurfaces { .. }
                | GraphError::NoMainSurface
                | GraphError::MultipleRootSurfaces(_)
                | GraphError::MainSurfaceExtended { .. }
                | GraphError::TooManySurfaces { .. }
                | GraphError::UnknownSurface(_)
                | GraphError::MalformedVariantSet { .. }
                | GraphError::ForeignVariant(_)
        )
    }
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
