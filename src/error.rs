//! Error and diagnostic types.
//!
//! Two tiers:
//! - [`ViewError`] - authoring mistakes (bad markup, bad selector, a view that
//!   refuses to construct). These abort the current render pass.
//! - [`Diagnostic`] - recoverable conditions a render reports but survives,
//!   such as a mount point that matched nothing.

use thiserror::Error;

/// Markup could not be parsed into host nodes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("markup error at byte {offset}: {message}")]
pub struct MarkupError {
    pub offset: usize,
    pub message: String,
}

/// A locator string could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid selector `{selector}`: {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

/// Fatal error raised while constructing or rendering a view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// A view factory rejected its options.
    #[error("cannot construct view: {0}")]
    Construct(String),
}

/// Result alias for view operations.
pub type ViewResult<T> = std::result::Result<T, ViewError>;

/// Non-fatal condition reported by a render pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A manager's mount selector resolved to no node; the manager stays inert
    /// until the parent renders again.
    #[error("couldn't find mount point `{selector}`")]
    MountNotFound { selector: String },
}
