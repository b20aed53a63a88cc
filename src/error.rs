//! Error types for the layout runtime.
//!
//! Configuration errors are fatal: they describe a layout class that was
//! assembled incorrectly and are never retried. Missing-target conditions
//! (unknown slots, detaching a child that is not owned) are not errors at all
//! and never show up here.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = LayoutError> = std::result::Result<T, E>;

/// Errors raised by the lifecycle core and its features.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A feature specification resolved to no name.
    #[error("feature `{type_name}` has no canonical name and no override name was given")]
    MissingFeatureName {
        /// Rust type name of the offending feature.
        type_name: &'static str,
    },

    /// Two features were registered under the same name on one layout.
    #[error("feature `{0}` is already installed on this layout")]
    DuplicateFeature(String),

    /// String render output did not contain exactly one top-level element.
    #[error("render output must have exactly one root element, found {found}")]
    RootCount {
        /// Number of top-level elements found.
        found: usize,
    },

    /// Render output resolved to something other than an element.
    #[error("render output of layout `{layout}` resolved to a {kind} node, expected an element")]
    UnsupportedRenderOutput {
        /// Layout that produced the output.
        layout: &'static str,
        /// Kind of node that was returned.
        kind: &'static str,
    },

    /// Render returned a nested layout but no feature turned it into an element.
    #[error("layout `{layout}` returned a nested layout but does not install the `children` feature")]
    CompositionWithoutChildren {
        /// Layout that attempted composition.
        layout: &'static str,
    },

    /// String render output could not be parsed.
    #[error("invalid markup: {0}")]
    Markup(#[from] MarkupError),

    /// The layout's render method failed.
    #[error("render failed in layout `{layout}`: {message}")]
    Render {
        /// Layout whose render failed.
        layout: &'static str,
        /// Error message.
        message: String,
    },

    /// A mount or destroy was started while another one was still running.
    #[error("cannot {operation} layout `{layout}` while another lifecycle call is in flight")]
    LifecycleInFlight {
        /// The rejected operation.
        operation: &'static str,
        /// Layout the call was made on.
        layout: &'static str,
    },

    /// Catch-all for errors raised by user hooks. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error>),
}

impl LayoutError {
    /// Build a [`LayoutError::Render`] for a layout type.
    pub fn render(layout: &'static str, message: impl Into<String>) -> Self {
        Self::Render {
            layout,
            message: message.into(),
        }
    }
}

/// Markup parse errors, with the byte offset where parsing stopped.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    /// Input ended while an element was still open.
    #[error("unclosed element <{tag}> opened at byte {offset}")]
    Unclosed {
        /// Tag that was never closed.
        tag: String,
        /// Offset of the opening tag.
        offset: usize,
    },

    /// A closing tag did not match the innermost open element.
    #[error("expected </{expected}> but found </{found}> at byte {offset}")]
    Mismatched {
        /// Tag that should have been closed.
        expected: String,
        /// Tag that was closed instead.
        found: String,
        /// Offset of the closing tag.
        offset: usize,
    },

    /// A closing tag appeared with no element open.
    #[error("unexpected closing tag </{tag}> at byte {offset}")]
    UnexpectedClose {
        /// Tag of the stray closing tag.
        tag: String,
        /// Offset of the closing tag.
        offset: usize,
    },

    /// A tag was syntactically broken (unterminated attribute, missing `>`).
    #[error("malformed tag at byte {offset}")]
    Malformed {
        /// Offset where the problem was detected.
        offset: usize,
    },
}
