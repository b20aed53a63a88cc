//! Layout - Component lifecycle core.
//!
//! A [`Layout`] is what users implement: a render method plus optional
//! lifecycle hooks, and the class-level list of features it wants. A
//! [`Component`] is the runtime instance wrapping a layout: it owns the
//! root element, the installed features and the disposable scope, and
//! drives the state machine:
//!
//! ```text
//! new() ──► Ready ──► Rooted ──► Mounted ──► Destroyed
//!              │   element()       ▲  │ mount_to() again
//!              └───── mount_to() ──┘  └─ re-append, on_mounted/after_mounted
//! ```
//!
//! # Example
//!
//! ```ignore
//! use spark_layout::{Component, Layout, RenderOutput, Result};
//!
//! struct Greeting;
//!
//! #[async_trait::async_trait(?Send)]
//! impl Layout for Greeting {
//!     fn render(&self, _host: &Component) -> Result<RenderOutput> {
//!         Ok("<p>Hello</p>".into())
//!     }
//! }
//!
//! let greeting = Component::new(Greeting)?;
//! greeting.mount_to(&container).await?;
//! greeting.destroy().await?;
//! ```

mod component;
mod lifecycle;

pub use component::{Component, PendingComposition, WeakComponent};
pub use lifecycle::{LifecycleFlags, Phase};

use async_trait::async_trait;
use spark_signals::Signal;

use crate::dom::Node;
use crate::engine::FeatureSpec;
use crate::error::Result;
use crate::types::StateMap;

// =============================================================================
// Render Output
// =============================================================================

/// What a render method (or an after-render hook) produces.
#[derive(Debug)]
pub enum RenderOutput {
    /// A ready element. Any other node kind is rejected.
    Element(Node),
    /// Markup with exactly one top-level element.
    Markup(String),
    /// Another layout, to be mounted as a child. Needs the children feature.
    Composed(Component),
}

impl From<Node> for RenderOutput {
    fn from(node: Node) -> Self {
        RenderOutput::Element(node)
    }
}

impl From<String> for RenderOutput {
    fn from(markup: String) -> Self {
        RenderOutput::Markup(markup)
    }
}

impl From<&str> for RenderOutput {
    fn from(markup: &str) -> Self {
        RenderOutput::Markup(markup.to_string())
    }
}

impl From<Component> for RenderOutput {
    fn from(component: Component) -> Self {
        RenderOutput::Composed(component)
    }
}

// =============================================================================
// Layout
// =============================================================================

/// A composable visual unit.
///
/// Only [`render`](Layout::render) is required. Hooks take `&self`; keep
/// mutable state in cells or signals.
#[async_trait(?Send)]
pub trait Layout: 'static {
    /// Features every instance of this layout installs.
    ///
    /// To inherit another layout's features, start from its list:
    ///
    /// ```ignore
    /// fn features() -> Vec<FeatureSpec> {
    ///     let mut specs = BasePage::features();
    ///     specs.push(FeatureSpec::of::<Slots>());
    ///     specs
    /// }
    /// ```
    fn features() -> Vec<FeatureSpec>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Produce the root. Called once, on first element access or mount.
    fn render(&self, host: &Component) -> Result<RenderOutput>;

    /// Called at the end of construction, before `features_ready`.
    fn created(&self, _host: &Component) {}

    /// Called before the first insertion only.
    async fn before_mount(&self, _host: &Component) -> Result<()> {
        Ok(())
    }

    async fn after_mount(&self, _host: &Component) -> Result<()> {
        Ok(())
    }

    async fn before_unmount(&self, _host: &Component) -> Result<()> {
        Ok(())
    }

    async fn unmounted(&self, _host: &Component) -> Result<()> {
        Ok(())
    }

    /// Called after a partial state merge with the merged state.
    fn update(&self, _host: &Component, _state: &StateMap) {}

    /// Reactive page title, for layouts used as routed pages.
    fn title(&self) -> Option<Signal<String>> {
        None
    }
}
