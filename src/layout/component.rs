//! Component - the runtime instance of a layout.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use spark_signals::Signal;

use crate::dom::{markup, Node};
use crate::engine::{
    build_plan, instances, DisposableScope, Disposer, Feature, FeatureRegistry, FeatureSpec,
    FeatureType, PlanEntry,
};
use crate::error::{LayoutError, Result};
use crate::types::{LayoutId, StateMap};

use super::lifecycle::{LifecycleFlags, Phase};
use super::{Layout, RenderOutput};

// =============================================================================
// Instance State
// =============================================================================

/// A nested layout returned from render, waiting for its host to mount.
pub struct PendingComposition {
    pub child: Component,
    /// Element that stands in for the child in the host's tree.
    pub host: Node,
}

struct ComponentInner {
    id: LayoutId,
    name: &'static str,
    layout: Rc<dyn Layout>,
    layout_any: Rc<dyn Any>,
    features: FeatureRegistry,
    disposables: DisposableScope,
    root: RefCell<Option<Node>>,
    flags: Cell<LifecycleFlags>,
    pending: RefCell<Option<PendingComposition>>,
    state: RefCell<StateMap>,
}

impl Drop for ComponentInner {
    fn drop(&mut self) {
        instances::release_id(self.id);
    }
}

/// Handle to a layout instance. Clones share the instance.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

/// Non-owning handle, for features that need to reach their host later.
#[derive(Clone)]
pub struct WeakComponent(Weak<ComponentInner>);

impl WeakComponent {
    pub fn upgrade(&self) -> Option<Component> {
        self.0.upgrade().map(|inner| Component { inner })
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Component {}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("layout", &self.inner.name)
            .field("id", &self.inner.id)
            .field("phase", &self.phase())
            .finish()
    }
}

/// Clears `BUSY` when a mount or destroy finishes, however it finishes.
struct InFlight<'a> {
    component: &'a Component,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.component.clear_flag(LifecycleFlags::BUSY);
    }
}

fn short_type_name<L>() -> &'static str {
    let full = std::any::type_name::<L>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path)
}

fn record(failure: &mut Option<LayoutError>, result: Result<()>) {
    if let Err(err) = result {
        tracing::warn!(error = %err, "teardown step failed");
        failure.get_or_insert(err);
    }
}

// =============================================================================
// Construction
// =============================================================================

impl Component {
    /// Construct a layout instance with its class-level features.
    pub fn new<L: Layout>(layout: L) -> Result<Self> {
        Self::with_features(layout, Vec::new())
    }

    /// Construct with extra per-instance feature specs appended after the
    /// class-level ones (for example, pre-built feature instances).
    pub fn with_features<L: Layout>(layout: L, extra: Vec<FeatureSpec>) -> Result<Self> {
        let mut specs = L::features();
        specs.extend(extra);
        let plan = build_plan(specs)?;

        let layout = Rc::new(layout);
        let component = Component {
            inner: Rc::new(ComponentInner {
                id: instances::allocate_id(),
                name: short_type_name::<L>(),
                layout: layout.clone(),
                layout_any: layout,
                features: FeatureRegistry::new(),
                disposables: DisposableScope::new(),
                root: RefCell::new(None),
                flags: Cell::new(LifecycleFlags::NONE),
                pending: RefCell::new(None),
                state: RefCell::new(StateMap::new()),
            }),
        };

        component.install(plan)?;
        component.inner.layout.created(&component);
        component.features_ready();

        tracing::debug!(
            layout = component.name(),
            id = component.id(),
            features = ?component.feature_names(),
            "layout constructed"
        );
        Ok(component)
    }

    fn install(&self, plan: Vec<PlanEntry>) -> Result<()> {
        for entry in plan {
            let instance = entry
                .instance
                .unwrap_or_else(|| entry.constructor.create());
            let hooks = instance.hooks().clone();
            self.inner.features.register(
                entry.name,
                entry.exposed,
                entry.constructor.type_id(),
                instance,
            )?;
            hooks.init(self);
        }
        Ok(())
    }

    /// Post-construction phase: every feature is initialized and the
    /// layout's `created` hook has run, so features may now coordinate.
    fn features_ready(&self) {
        if self.is_destroyed() {
            return;
        }
        tracing::trace!(layout = self.name(), count = self.inner.features.len(), "broadcasting features_ready");
        self.inner
            .features
            .broadcast(|feature| feature.features_ready(self));
        self.insert_flag(LifecycleFlags::READY);
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> LayoutId {
        self.inner.id
    }

    /// Short type name of the wrapped layout.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn flags(&self) -> LifecycleFlags {
        self.inner.flags.get()
    }

    pub fn phase(&self) -> Phase {
        Phase::from(self.flags())
    }

    pub fn is_mounted(&self) -> bool {
        self.flags().contains(LifecycleFlags::MOUNTED)
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags().contains(LifecycleFlags::DESTROYED)
    }

    /// Root element, if it has been created.
    pub fn root(&self) -> Option<Node> {
        self.inner.root.borrow().clone()
    }

    /// The wrapped layout, if it is an `L`.
    pub fn layout<L: Layout>(&self) -> Option<Rc<L>> {
        self.inner.layout_any.clone().downcast::<L>().ok()
    }

    /// First installed feature of type `F`, exposed or not.
    pub fn feature<F: FeatureType>(&self) -> Option<Rc<F>> {
        self.inner.features.get::<F>()
    }

    /// Feature installed under `name`, exposed or not.
    pub fn feature_named(&self, name: &str) -> Option<Rc<dyn Feature>> {
        self.inner.features.get_by_name(name)
    }

    /// Feature that was requested directly (not only as a dependency) under
    /// `name`.
    pub fn exposed<F: FeatureType>(&self, name: &str) -> Option<Rc<F>> {
        self.inner.features.get_exposed::<F>(name)
    }

    /// Installed feature names, in install order. Empty after destroy.
    pub fn feature_names(&self) -> Vec<String> {
        self.inner.features.names()
    }

    /// Cleanups released when this layout is destroyed.
    pub fn disposables(&self) -> &DisposableScope {
        &self.inner.disposables
    }

    /// Reactive title, if the layout is a page.
    pub fn title(&self) -> Option<Signal<String>> {
        self.inner.layout.title()
    }

    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent(Rc::downgrade(&self.inner))
    }

    // -------------------------------------------------------------------------
    // Composition
    // -------------------------------------------------------------------------

    /// Record a nested layout to mount into `host` when this layout mounts.
    pub fn set_pending_composition(&self, child: Component, host: Node) {
        *self.inner.pending.borrow_mut() = Some(PendingComposition { child, host });
    }

    pub fn take_pending_composition(&self) -> Option<PendingComposition> {
        self.inner.pending.borrow_mut().take()
    }

    // -------------------------------------------------------------------------
    // Flags
    // -------------------------------------------------------------------------

    fn insert_flag(&self, flag: LifecycleFlags) {
        self.inner.flags.set(self.flags() | flag);
    }

    fn clear_flag(&self, flag: LifecycleFlags) {
        self.inner.flags.set(self.flags() - flag);
    }

    fn begin(&self, operation: &'static str) -> Result<InFlight<'_>> {
        if self.flags().contains(LifecycleFlags::BUSY) {
            return Err(LayoutError::LifecycleInFlight {
                operation,
                layout: self.name(),
            });
        }
        self.insert_flag(LifecycleFlags::BUSY);
        Ok(InFlight { component: self })
    }

    fn keep(&self, result: Result<Option<Disposer>>) -> Result<()> {
        if let Some(disposer) = result? {
            self.inner.disposables.push(disposer);
        }
        Ok(())
    }

    // =========================================================================
    // Root
    // =========================================================================

    /// The root element, rendering it first if needed.
    pub async fn element(&self) -> Result<Node> {
        self.ensure_root().await
    }

    async fn ensure_root(&self) -> Result<Node> {
        if let Some(root) = self.root() {
            return Ok(root);
        }
        if self.flags().contains(LifecycleFlags::RENDERING) {
            return Err(LayoutError::render(
                self.name(),
                "root requested while render is running",
            ));
        }

        let features = self.inner.features.snapshot();
        self.insert_flag(LifecycleFlags::RENDERING);
        let output = self.render_through(&features);
        self.clear_flag(LifecycleFlags::RENDERING);
        let root = self.resolve_root(output?)?;

        *self.inner.root.borrow_mut() = Some(root.clone());
        self.insert_flag(LifecycleFlags::ROOTED);
        tracing::debug!(layout = self.name(), id = self.id(), root = ?root, "root created");

        for feature in &features {
            feature.root_created(self, &root).await?;
        }
        Ok(root)
    }

    /// Render, then pass the output through every after-render hook in
    /// install order.
    fn render_through(&self, features: &[Rc<dyn Feature>]) -> Result<RenderOutput> {
        for feature in features {
            feature.before_render(self);
        }
        let mut output = self.inner.layout.render(self)?;
        for feature in features {
            output = feature.after_render(self, output)?;
        }
        Ok(output)
    }

    fn resolve_root(&self, output: RenderOutput) -> Result<Node> {
        match output {
            RenderOutput::Element(node) if node.is_element() => Ok(node),
            RenderOutput::Element(node) => Err(LayoutError::UnsupportedRenderOutput {
                layout: self.name(),
                kind: node.kind().label(),
            }),
            RenderOutput::Markup(source) => {
                let mut elements = markup::top_level_elements(markup::parse(&source)?);
                if elements.len() != 1 {
                    return Err(LayoutError::RootCount {
                        found: elements.len(),
                    });
                }
                Ok(elements.swap_remove(0))
            }
            RenderOutput::Composed(_) => Err(LayoutError::CompositionWithoutChildren {
                layout: self.name(),
            }),
        }
    }

    // =========================================================================
    // Mount
    // =========================================================================

    /// Insert the root into `container`, rendering it first if needed.
    ///
    /// Mounting an already-mounted layout moves the same root element and
    /// re-runs only the mounted hooks. No-op on a destroyed layout.
    pub async fn mount_to(&self, container: &Node) -> Result<()> {
        if self.is_destroyed() {
            tracing::warn!(layout = self.name(), id = self.id(), "mount_to on destroyed layout ignored");
            return Ok(());
        }
        let _in_flight = self.begin("mount")?;

        let root = self.ensure_root().await?;
        let features = self.inner.features.snapshot();

        if !self.flags().contains(LifecycleFlags::MOUNTED_ONCE) {
            self.insert_flag(LifecycleFlags::MOUNTED_ONCE);
            for feature in &features {
                feature.before_mount_root(self).await?;
            }
            self.inner.layout.before_mount(self).await?;
        }

        container.append_child(&root);
        self.insert_flag(LifecycleFlags::MOUNTED);

        for feature in &features {
            self.keep(feature.on_mounted(self).await)?;
        }
        self.inner.layout.after_mount(self).await?;
        for feature in &features {
            self.keep(feature.after_mounted(self).await)?;
        }

        tracing::debug!(layout = self.name(), id = self.id(), "layout mounted");
        Ok(())
    }

    // =========================================================================
    // Destroy
    // =========================================================================

    /// Tear the layout down. Terminal and idempotent: later calls only flush
    /// the disposable scope again.
    ///
    /// Once started, teardown runs to completion; the first hook error is
    /// returned after every step has run.
    pub async fn destroy(&self) -> Result<()> {
        if self.is_destroyed() {
            self.inner.disposables.flush().await;
            return Ok(());
        }
        let _in_flight = self.begin("destroy")?;

        let features = self.inner.features.snapshot();
        let failure = self.teardown(&features).await;

        self.insert_flag(LifecycleFlags::DESTROYED);
        self.inner.features.clear();
        self.inner.pending.borrow_mut().take();
        instances::release_id(self.id());
        tracing::debug!(layout = self.name(), id = self.id(), "layout destroyed");

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn teardown(&self, features: &[Rc<dyn Feature>]) -> Option<LayoutError> {
        let mut failure = None;

        for feature in features {
            record(&mut failure, feature.before_destroy(self).await);
        }

        if !self.is_mounted() {
            self.inner.disposables.flush().await;
            return failure;
        }

        record(&mut failure, self.inner.layout.before_unmount(self).await);
        for feature in features {
            record(&mut failure, self.keep(feature.on_destroy(self).await));
        }
        self.inner.disposables.flush().await;

        if let Some(root) = self.root() {
            root.remove();
        }
        self.clear_flag(LifecycleFlags::MOUNTED);

        for feature in features {
            record(&mut failure, self.keep(feature.after_destroy(self).await));
        }
        self.inner.disposables.flush().await;

        record(&mut failure, self.inner.layout.unmounted(self).await);
        failure
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Snapshot of the state bag.
    pub fn state(&self) -> StateMap {
        self.inner.state.borrow().clone()
    }

    pub fn state_value(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.state.borrow().get(key).cloned()
    }

    /// Merge `partial` into the state bag, key by key.
    pub fn set_state(&self, partial: StateMap) {
        if self.is_destroyed() {
            tracing::warn!(layout = self.name(), id = self.id(), "set_state on destroyed layout ignored");
            return;
        }

        let features = self.inner.features.snapshot();
        for feature in &features {
            feature.before_update(self, &partial);
        }
        for feature in &features {
            feature.on_state_changed(self, &partial);
        }

        {
            let mut state = self.inner.state.borrow_mut();
            for (key, value) in partial {
                state.insert(key, value);
            }
        }

        let state = self.state();
        self.inner.layout.update(self, &state);
        for feature in &features {
            feature.after_update(self, &state);
        }
    }
}
