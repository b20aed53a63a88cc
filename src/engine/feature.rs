//! Feature Contract - the interface a plugin implements.
//!
//! A feature has two sides:
//! - [`Feature`] - the instance side: lifecycle hooks, all optional. Hooks
//!   take `&self`; features keep their own state behind `Cell`/`RefCell`.
//! - [`FeatureType`] - the static side: canonical name, declared
//!   dependencies and how to construct an instance.
//!
//! Layouts request features with [`FeatureSpec`]s. A spec can rename a
//! feature or hand in an instance that was built up front.
//!
//! # Hook order
//!
//! ```text
//! construct:  init → (layout created) → features_ready
//! render:     before_render → render → after_render (chained) → root_created
//! mount:      before_mount_root (first mount only) → on_mounted → after_mounted
//! destroy:    before_destroy → on_destroy → after_destroy
//! update:     before_update → on_state_changed → after_update
//! ```
//!
//! Hooks run one feature at a time, in plan order. Async hooks are awaited
//! before the next feature is called.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use async_trait::async_trait;

use crate::dom::Node;
use crate::error::Result;
use crate::layout::{Component, RenderOutput};
use crate::types::StateMap;

use super::disposable::Disposer;

// =============================================================================
// Instance Side
// =============================================================================

/// Lifecycle hooks a feature can implement.
#[async_trait(?Send)]
pub trait Feature: 'static {
    /// Called once, right after the feature is registered on its host.
    fn init(&self, _host: &Component) {}

    /// Called once every feature is installed and the layout's `created`
    /// hook has run.
    fn features_ready(&self, _host: &Component) {}

    fn before_render(&self, _host: &Component) {}

    /// Rewrite the render output. Receives the previous feature's output.
    fn after_render(&self, _host: &Component, output: RenderOutput) -> Result<RenderOutput> {
        Ok(output)
    }

    async fn root_created(&self, _host: &Component, _root: &Node) -> Result<()> {
        Ok(())
    }

    /// Called before the first insertion of the root only.
    async fn before_mount_root(&self, _host: &Component) -> Result<()> {
        Ok(())
    }

    /// Called after every insertion. A returned disposer is released at
    /// destroy time.
    async fn on_mounted(&self, _host: &Component) -> Result<Option<Disposer>> {
        Ok(None)
    }

    async fn after_mounted(&self, _host: &Component) -> Result<Option<Disposer>> {
        Ok(None)
    }

    /// Called on every destroy, mounted or not.
    async fn before_destroy(&self, _host: &Component) -> Result<()> {
        Ok(())
    }

    async fn on_destroy(&self, _host: &Component) -> Result<Option<Disposer>> {
        Ok(None)
    }

    async fn after_destroy(&self, _host: &Component) -> Result<Option<Disposer>> {
        Ok(None)
    }

    fn before_update(&self, _host: &Component, _partial: &StateMap) {}

    fn on_state_changed(&self, _host: &Component, _partial: &StateMap) {}

    /// Receives the merged state.
    fn after_update(&self, _host: &Component, _state: &StateMap) {}
}

// =============================================================================
// Static Side
// =============================================================================

/// Static description of a feature type.
pub trait FeatureType: Feature + Sized {
    /// Name the feature is installed under unless a spec overrides it.
    const NAME: Option<&'static str> = None;

    /// Features that must be installed (and initialized) before this one.
    fn dependencies() -> Vec<FeatureSpec> {
        Vec::new()
    }

    fn create() -> Self;
}

/// A constructed feature, held both as hooks and as `Any` for typed lookup.
#[derive(Clone)]
pub struct FeatureInstance {
    pub(crate) hooks: Rc<dyn Feature>,
    pub(crate) any: Rc<dyn Any>,
}

impl FeatureInstance {
    pub fn new<F: Feature>(feature: F) -> Self {
        let feature = Rc::new(feature);
        Self {
            hooks: feature.clone(),
            any: feature,
        }
    }

    pub fn hooks(&self) -> &Rc<dyn Feature> {
        &self.hooks
    }

    /// Typed handle, if the instance is an `F`.
    pub fn downcast<F: Feature>(&self) -> Option<Rc<F>> {
        self.any.clone().downcast::<F>().ok()
    }
}

impl fmt::Debug for FeatureInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FeatureInstance")
    }
}

/// Type-erased [`FeatureType`]: the "constructor" a spec points at.
#[derive(Clone, Copy)]
pub struct FeatureConstructor {
    name: Option<&'static str>,
    type_id: TypeId,
    type_name: &'static str,
    create: fn() -> FeatureInstance,
    dependencies: fn() -> Vec<FeatureSpec>,
}

impl FeatureConstructor {
    pub fn of<F: FeatureType>() -> Self {
        Self {
            name: F::NAME,
            type_id: TypeId::of::<F>(),
            type_name: std::any::type_name::<F>(),
            create: || FeatureInstance::new(F::create()),
            dependencies: F::dependencies,
        }
    }

    /// Canonical name, if the type declares one.
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn create(&self) -> FeatureInstance {
        (self.create)()
    }

    pub fn dependencies(&self) -> Vec<FeatureSpec> {
        (self.dependencies)()
    }
}

impl fmt::Debug for FeatureConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureConstructor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .finish()
    }
}

// =============================================================================
// Specification
// =============================================================================

/// A request to install a feature on a layout.
#[derive(Debug)]
pub struct FeatureSpec {
    pub(crate) constructor: FeatureConstructor,
    pub(crate) name: Option<Cow<'static, str>>,
    pub(crate) instance: Option<FeatureInstance>,
}

impl FeatureSpec {
    /// Install `F` under its canonical name.
    pub fn of<F: FeatureType>() -> Self {
        Self {
            constructor: FeatureConstructor::of::<F>(),
            name: None,
            instance: None,
        }
    }

    /// Install `F` under `name` instead of its canonical name.
    pub fn named<F: FeatureType>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::of::<F>().with_name(name)
    }

    /// Install an instance built up front.
    pub fn instance<F: FeatureType>(feature: F) -> Self {
        Self {
            constructor: FeatureConstructor::of::<F>(),
            name: None,
            instance: Some(FeatureInstance::new(feature)),
        }
    }

    /// Override the name the feature is installed under.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn constructor(&self) -> &FeatureConstructor {
        &self.constructor
    }

    /// The override name if given, else the canonical name.
    pub fn resolved_name(&self) -> Option<Cow<'static, str>> {
        self.name
            .clone()
            .or_else(|| self.constructor.name.map(Cow::Borrowed))
    }
}
