//! Children - cascading ownership of sub-layouts.
//!
//! Two ways to hand a child to its host:
//! - [`Children::attach`] - mount now into a container, and own it
//! - [`Children::register`] - own it without mounting, for children whose
//!   DOM insertion happened some other way
//!
//! Every owned child is destroyed exactly once when the host is destroyed,
//! unless it was [`detach`](Children::detach)ed (and destroyed) earlier.
//!
//! The feature also makes composition work: when a host's render returns
//! another layout, the after-render hook swaps it for a host element and the
//! child is attached into that element on mount.
//!
//! # Example
//!
//! ```ignore
//! let children = host.feature::<Children>().expect("children installed");
//!
//! let sidebar = Component::new(Sidebar::default())?;
//! children.attach(&sidebar, &aside).await?;
//!
//! // Later: destroyed with the host, or now
//! children.detach(&sidebar).await?;
//! ```

use std::cell::RefCell;

use async_trait::async_trait;

use crate::config::options;
use crate::dom::Node;
use crate::engine::{Disposer, Feature, FeatureType};
use crate::error::{LayoutError, Result};
use crate::layout::{Component, RenderOutput};

/// Owned sub-layouts of one host, in insertion order.
#[derive(Default)]
pub struct Children {
    owned: RefCell<Vec<Component>>,
}

impl Children {
    /// Mount `child` into `container` and take ownership of it.
    ///
    /// Ownership is taken even if the mount fails, so whatever the child
    /// registered before failing is released with the host.
    pub async fn attach(&self, child: &Component, container: &Node) -> Result<()> {
        let mounted = child.mount_to(container).await;
        self.register(child);
        mounted
    }

    /// Take ownership of `child` without mounting it.
    pub fn register(&self, child: &Component) {
        let mut owned = self.owned.borrow_mut();
        if !owned.contains(child) {
            tracing::trace!(child = child.name(), id = child.id(), "child registered");
            owned.push(child.clone());
        }
    }

    /// Release and destroy `child`. No-op if it is not owned.
    pub async fn detach(&self, child: &Component) -> Result<()> {
        let removed = {
            let mut owned = self.owned.borrow_mut();
            let before = owned.len();
            owned.retain(|existing| existing != child);
            owned.len() != before
        };
        if removed {
            child.destroy().await?;
        }
        Ok(())
    }

    pub fn contains(&self, child: &Component) -> bool {
        self.owned.borrow().contains(child)
    }

    pub fn len(&self) -> usize {
        self.owned.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.owned.borrow().is_empty()
    }

    /// Owned children in insertion order.
    pub fn children(&self) -> Vec<Component> {
        self.owned.borrow().clone()
    }

    /// Destroy every owned child and forget them. All children are
    /// destroyed even if one fails; the first error is returned.
    async fn destroy_all(&self) -> Result<()> {
        let owned = std::mem::take(&mut *self.owned.borrow_mut());
        let mut failure: Option<LayoutError> = None;
        for child in owned {
            if let Err(err) = child.destroy().await {
                tracing::warn!(child = child.name(), error = %err, "child destroy failed");
                failure.get_or_insert(err);
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait(?Send)]
impl Feature for Children {
    fn after_render(&self, host: &Component, output: RenderOutput) -> Result<RenderOutput> {
        let RenderOutput::Composed(child) = output else {
            return Ok(output);
        };

        let options = options();
        let placeholder = Node::element(&options.composition_tag);
        placeholder.set_attribute(&options.composition_attribute, child.name());
        tracing::trace!(host = host.name(), child = child.name(), "composition deferred to mount");

        host.set_pending_composition(child, placeholder.clone());
        Ok(RenderOutput::Element(placeholder))
    }

    async fn on_mounted(&self, host: &Component) -> Result<Option<Disposer>> {
        if let Some(pending) = host.take_pending_composition() {
            self.attach(&pending.child, &pending.host).await?;
        }
        Ok(None)
    }

    async fn before_destroy(&self, host: &Component) -> Result<()> {
        // A host that never mounted skips on_destroy; cascade here instead
        if !host.is_mounted() {
            if let Some(pending) = host.take_pending_composition() {
                self.register(&pending.child);
            }
            self.destroy_all().await?;
        }
        Ok(())
    }

    async fn on_destroy(&self, _host: &Component) -> Result<Option<Disposer>> {
        self.destroy_all().await?;
        Ok(None)
    }
}

impl FeatureType for Children {
    const NAME: Option<&'static str> = Some("children");

    fn create() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FeatureSpec;
    use crate::layout::Layout;
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Leaf layout that counts its own destroys.
    struct Leaf {
        destroyed: Rc<Cell<usize>>,
    }

    #[async_trait(?Send)]
    impl Layout for Leaf {
        fn render(&self, _host: &Component) -> Result<RenderOutput> {
            Ok("<span>leaf</span>".into())
        }
        async fn before_unmount(&self, _host: &Component) -> Result<()> {
            self.destroyed.set(self.destroyed.get() + 1);
            Ok(())
        }
    }

    fn leaf() -> (Component, Rc<Cell<usize>>) {
        let destroyed = Rc::new(Cell::new(0));
        let component = Component::new(Leaf {
            destroyed: destroyed.clone(),
        })
        .unwrap();
        (component, destroyed)
    }

    struct Host;

    #[async_trait(?Send)]
    impl Layout for Host {
        fn features() -> Vec<FeatureSpec> {
            vec![FeatureSpec::of::<Children>()]
        }
        fn render(&self, _host: &Component) -> Result<RenderOutput> {
            Ok("<div><aside></aside></div>".into())
        }
    }

    #[test]
    fn test_attach_then_host_destroy() {
        let host = Component::new(Host).unwrap();
        let container = Node::element("main");
        block_on(host.mount_to(&container)).unwrap();

        let children = host.feature::<Children>().unwrap();
        let aside = host.root().unwrap().first_child().unwrap();
        let (child, destroyed) = leaf();
        block_on(children.attach(&child, &aside)).unwrap();
        assert!(child.is_mounted());
        assert_eq!(aside.to_html(), "<aside><span>leaf</span></aside>");

        block_on(host.destroy()).unwrap();
        assert_eq!(destroyed.get(), 1);
        assert!(child.is_destroyed());
    }

    #[test]
    fn test_detach_destroys_once() {
        let host = Component::new(Host).unwrap();
        block_on(host.mount_to(&Node::element("main"))).unwrap();
        let children = host.feature::<Children>().unwrap();

        let (child, destroyed) = leaf();
        block_on(children.attach(&child, &Node::element("div"))).unwrap();
        block_on(children.detach(&child)).unwrap();
        assert_eq!(destroyed.get(), 1);
        assert!(children.is_empty());

        // Not owned any more: detach is a no-op and host destroy skips it
        block_on(children.detach(&child)).unwrap();
        block_on(host.destroy()).unwrap();
        assert_eq!(destroyed.get(), 1);
    }

    #[test]
    fn test_register_on_unmounted_host() {
        let host = Component::new(Host).unwrap();
        let children = host.feature::<Children>().unwrap();

        let (child, _) = leaf();
        children.register(&child);
        children.register(&child);
        assert_eq!(children.len(), 1);

        block_on(host.destroy()).unwrap();
        assert!(child.is_destroyed());
        assert!(children.is_empty());
    }

    struct Wrapper;

    #[async_trait(?Send)]
    impl Layout for Wrapper {
        fn features() -> Vec<FeatureSpec> {
            vec![FeatureSpec::of::<Children>()]
        }
        fn render(&self, _host: &Component) -> Result<RenderOutput> {
            Ok(Component::new(Leaf {
                destroyed: Rc::new(Cell::new(0)),
            })?
            .into())
        }
    }

    #[test]
    fn test_composition_mounts_child_in_placeholder() {
        let wrapper = Component::new(Wrapper).unwrap();
        let container = Node::element("main");
        block_on(wrapper.mount_to(&container)).unwrap();

        assert_eq!(
            container.to_html(),
            "<main><div data-layout=\"Leaf\"><span>leaf</span></div></main>"
        );
        let children = wrapper.feature::<Children>().unwrap();
        let child = children.children().pop().unwrap();
        assert!(child.is_mounted());

        block_on(wrapper.destroy()).unwrap();
        assert!(child.is_destroyed());
        assert_eq!(container.child_count(), 0);
    }

    #[test]
    fn test_composition_child_destroyed_without_mount() {
        let wrapper = Component::new(Wrapper).unwrap();
        block_on(wrapper.element()).unwrap();
        let before = crate::engine::live_layout_count();

        block_on(wrapper.destroy()).unwrap();
        // Both the wrapper and its pending child are gone
        assert_eq!(crate::engine::live_layout_count(), before - 2);
    }

    /// Registers a window listener, then fails its mount.
    struct Flaky {
        window: Node,
    }

    #[async_trait(?Send)]
    impl Layout for Flaky {
        fn render(&self, _host: &Component) -> Result<RenderOutput> {
            Ok("<p>flaky</p>".into())
        }
        async fn after_mount(&self, host: &Component) -> Result<()> {
            host.disposables().listen(&self.window, "resize", |_| {});
            Err(LayoutError::render(host.name(), "after_mount failed"))
        }
    }

    struct FlakyWrapper {
        window: Node,
    }

    #[async_trait(?Send)]
    impl Layout for FlakyWrapper {
        fn features() -> Vec<FeatureSpec> {
            vec![FeatureSpec::of::<Children>()]
        }
        fn render(&self, _host: &Component) -> Result<RenderOutput> {
            Ok(Component::new(Flaky {
                window: self.window.clone(),
            })?
            .into())
        }
    }

    #[test]
    fn test_failed_child_mount_still_owned() {
        let window = Node::element("body");
        let wrapper = Component::new(FlakyWrapper {
            window: window.clone(),
        })
        .unwrap();

        let err = block_on(wrapper.mount_to(&Node::element("main"))).unwrap_err();
        assert!(matches!(err, LayoutError::Render { layout: "Flaky", .. }));
        let children = wrapper.feature::<Children>().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(window.listener_count("resize"), 1);

        // The host's teardown still reaches the half-mounted child
        block_on(wrapper.destroy()).unwrap();
        assert_eq!(window.listener_count("resize"), 0);
        assert!(children.is_empty());
    }
}
