//! Slots - named, content-replaceable regions of a rendered root.
//!
//! A slot is declared in markup as a placeholder element (by default
//! `<template data-slot="name">`; an empty name means `"default"`). The first
//! time content is written, the placeholder is swapped for a pair of comment
//! markers and everything between them is the slot's content. Later writes
//! replace that content in place, never append.
//!
//! Content written before the slot is known (before render, or for a name the
//! markup never declares) is queued per name and replayed in order once the
//! slot shows up. A name that never shows up keeps its queue forever; that is
//! not an error.
//!
//! Nested layouts are mounted through [`Children`] when the host installs
//! it, so they are destroyed with the host. Without it they are mounted
//! directly and only destroyed when replaced.
//!
//! # Example
//!
//! ```ignore
//! let slots = page.feature::<Slots>().expect("slots installed");
//!
//! slots.queue("header", "Loading…");              // before mount
//! page.mount_to(&body).await?;                     // replayed here
//! slots.set_slot("header", "Inbox (3)").await?;    // replaces in place
//! slots.set_slot("main", Component::new(Inbox)?).await?;
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::options;
use crate::dom::Node;
use crate::engine::{Disposer, Feature, FeatureType};
use crate::error::{LayoutError, Result};
use crate::layout::{Component, WeakComponent};

use super::Children;

// =============================================================================
// Content
// =============================================================================

/// What can be put into a slot.
#[derive(Debug)]
pub enum SlotContent {
    Text(String),
    Node(Node),
    Layout(Component),
}

impl From<&str> for SlotContent {
    fn from(text: &str) -> Self {
        SlotContent::Text(text.to_string())
    }
}

impl From<String> for SlotContent {
    fn from(text: String) -> Self {
        SlotContent::Text(text)
    }
}

impl From<Node> for SlotContent {
    fn from(node: Node) -> Self {
        SlotContent::Node(node)
    }
}

impl From<Component> for SlotContent {
    fn from(component: Component) -> Self {
        SlotContent::Layout(component)
    }
}

// =============================================================================
// Slot State
// =============================================================================

/// Content region between two markers.
struct Region {
    start: Node,
    end: Node,
    /// Layout currently shown in the region, if any.
    mounted: Option<Component>,
}

enum SlotTarget {
    /// Discovered, never written.
    Placeholder(Node),
    /// Written at least once.
    Region(Region),
}

/// Named slot map of one host.
#[derive(Default)]
pub struct Slots {
    host: RefCell<Option<WeakComponent>>,
    slots: RefCell<HashMap<String, SlotTarget>>,
    /// Queued content per name, names in first-queued order.
    pending: RefCell<Vec<(String, Vec<SlotContent>)>>,
    flushing: Cell<bool>,
}

/// Resets the re-entrancy flag when a flush ends.
struct Flushing<'a>(&'a Cell<bool>);

impl Drop for Flushing<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl Slots {
    /// True once the placeholder for `name` has been discovered.
    pub fn has_slot(&self, name: &str) -> bool {
        self.slots.borrow().contains_key(name)
    }

    /// Discovered slot names, sorted.
    pub fn slot_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of queued writes for `name`.
    pub fn pending_count(&self, name: &str) -> usize {
        self.pending
            .borrow()
            .iter()
            .find(|(queued, _)| queued == name)
            .map_or(0, |(_, items)| items.len())
    }

    /// Queue content for `name` without touching the DOM. It is applied at
    /// the next flush (root creation or mount).
    pub fn queue(&self, name: impl Into<String>, content: impl Into<SlotContent>) {
        let name = name.into();
        tracing::trace!(slot = %name, "slot content queued");
        let mut pending = self.pending.borrow_mut();
        match pending.iter_mut().find(|(queued, _)| *queued == name) {
            Some((_, items)) => items.push(content.into()),
            None => pending.push((name, vec![content.into()])),
        }
    }

    /// Replace the content of `name`, or queue it if the slot is not known
    /// yet.
    pub async fn set_slot(
        &self,
        name: impl Into<String>,
        content: impl Into<SlotContent>,
    ) -> Result<()> {
        let name = name.into();
        let content = content.into();

        let Some(host) = self.host() else {
            return Ok(());
        };
        let Some((start, end, previous)) = self.open_region(&name) else {
            self.queue(name, content);
            return Ok(());
        };
        if let Some(previous) = previous {
            match host.feature::<Children>() {
                Some(children) => children.detach(&previous).await?,
                None => previous.destroy().await?,
            }
        }

        // Clear everything between the markers
        while let Some(node) = start.next_sibling() {
            if node == end {
                break;
            }
            node.remove();
        }

        let Some(parent) = end.parent() else {
            return Ok(());
        };
        let (mounted, result) = match content {
            SlotContent::Text(text) => {
                parent.insert_before(&Node::text(text), Some(&end));
                (None, Ok(()))
            }
            SlotContent::Node(node) => {
                parent.insert_before(&node, Some(&end));
                (None, Ok(()))
            }
            SlotContent::Layout(component) => {
                let fragment = Node::fragment();
                let result = match host.feature::<Children>() {
                    Some(children) => children.attach(&component, &fragment).await,
                    None => component.mount_to(&fragment).await,
                };
                parent.insert_before(&fragment, Some(&end));
                (Some(component), result)
            }
        };

        // Recorded even when the mount failed, so the next write destroys it
        if let Some(SlotTarget::Region(region)) = self.slots.borrow_mut().get_mut(&name) {
            region.mounted = mounted;
        }
        result?;
        tracing::trace!(host = host.name(), slot = %name, "slot content replaced");
        Ok(())
    }

    fn host(&self) -> Option<Component> {
        self.host
            .borrow()
            .as_ref()
            .and_then(WeakComponent::upgrade)
            .filter(|host| !host.is_destroyed())
    }

    /// Swap the placeholder for markers on first use. Returns the markers
    /// and takes the layout currently shown in the region.
    fn open_region(&self, name: &str) -> Option<(Node, Node, Option<Component>)> {
        let mut slots = self.slots.borrow_mut();
        let target = slots.get_mut(name)?;

        if let SlotTarget::Placeholder(placeholder) = target {
            let start = Node::comment(format!("slot:{name}"));
            let end = Node::comment(format!("/slot:{name}"));
            if let Some(parent) = placeholder.parent() {
                parent.insert_before(&start, Some(placeholder));
                parent.insert_before(&end, Some(placeholder));
                placeholder.remove();
            }
            *target = SlotTarget::Region(Region {
                start,
                end,
                mounted: None,
            });
        }

        match target {
            SlotTarget::Region(region) => Some((
                region.start.clone(),
                region.end.clone(),
                region.mounted.take(),
            )),
            SlotTarget::Placeholder(_) => None,
        }
    }

    /// Record every slot placeholder under `root`.
    fn discover(&self, root: &Node) {
        let options = options();
        let mut slots = self.slots.borrow_mut();
        for node in root.descendants() {
            if node.tag() != Some(options.slot_tag.as_str()) {
                continue;
            }
            let Some(name) = node.attribute(&options.slot_attribute) else {
                continue;
            };
            let name = if name.is_empty() {
                options.default_slot.clone()
            } else {
                name
            };
            slots.entry(name).or_insert(SlotTarget::Placeholder(node));
        }
    }

    /// Replay queued content. Names still unknown are re-queued ahead of
    /// anything queued during the flush.
    ///
    /// A failed write does not stop the replay; the first error is returned
    /// once every item has been tried and the unknown names are queued again.
    async fn flush(&self) -> Result<()> {
        if self.flushing.replace(true) {
            return Ok(());
        }
        let _flushing = Flushing(&self.flushing);

        let snapshot = std::mem::take(&mut *self.pending.borrow_mut());
        let mut unresolved = Vec::new();
        let mut failure: Option<LayoutError> = None;
        for (name, items) in snapshot {
            if !self.has_slot(&name) {
                unresolved.push((name, items));
                continue;
            }
            for item in items {
                if let Err(err) = self.set_slot(name.clone(), item).await {
                    tracing::warn!(slot = %name, error = %err, "queued slot write failed");
                    failure.get_or_insert(err);
                }
            }
        }

        if !unresolved.is_empty() {
            let mut pending = self.pending.borrow_mut();
            let newer = std::mem::take(&mut *pending);
            *pending = unresolved;
            for (name, items) in newer {
                match pending.iter_mut().find(|(queued, _)| *queued == name) {
                    Some((_, existing)) => existing.extend(items),
                    None => pending.push((name, items)),
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait(?Send)]
impl Feature for Slots {
    fn init(&self, host: &Component) {
        *self.host.borrow_mut() = Some(host.downgrade());
    }

    async fn root_created(&self, _host: &Component, root: &Node) -> Result<()> {
        self.discover(root);
        self.flush().await
    }

    async fn on_mounted(&self, _host: &Component) -> Result<Option<Disposer>> {
        self.flush().await?;
        Ok(None)
    }
}

impl FeatureType for Slots {
    const NAME: Option<&'static str> = Some("slots");

    fn create() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FeatureSpec;
    use crate::layout::{Layout, RenderOutput};
    use futures::executor::block_on;

    struct Page;

    #[async_trait(?Send)]
    impl Layout for Page {
        fn features() -> Vec<FeatureSpec> {
            vec![FeatureSpec::of::<Children>(), FeatureSpec::of::<Slots>()]
        }
        fn render(&self, _host: &Component) -> Result<RenderOutput> {
            Ok(concat!(
                "<section>",
                "<header><template data-slot=\"header\"></template></header>",
                "<template data-slot></template>",
                "</section>"
            )
            .into())
        }
    }

    struct Badge;

    #[async_trait(?Send)]
    impl Layout for Badge {
        fn render(&self, _host: &Component) -> Result<RenderOutput> {
            Ok("<b>new</b>".into())
        }
    }

    fn page() -> (Component, std::rc::Rc<Slots>) {
        let page = Component::new(Page).unwrap();
        let slots = page.feature::<Slots>().unwrap();
        (page, slots)
    }

    fn header_text(page: &Component) -> String {
        page.root().unwrap().first_child().unwrap().text_content()
    }

    #[test]
    fn test_discovers_named_and_default() {
        let (page, slots) = page();
        block_on(page.element()).unwrap();
        assert_eq!(slots.slot_names(), vec!["default", "header"]);
    }

    #[test]
    fn test_queued_before_discovery_shows_last() {
        let (page, slots) = page();
        block_on(slots.set_slot("header", "Hi")).unwrap();
        block_on(slots.set_slot("header", "Bye")).unwrap();
        assert_eq!(slots.pending_count("header"), 2);

        block_on(page.mount_to(&Node::element("body"))).unwrap();
        assert_eq!(header_text(&page), "Bye");
        assert_eq!(slots.pending_count("header"), 0);
        assert_eq!(
            page.root().unwrap().first_child().unwrap().to_html(),
            "<header><!--slot:header-->Bye<!--/slot:header--></header>"
        );
    }

    #[test]
    fn test_set_replaces_not_appends() {
        let (page, slots) = page();
        block_on(page.mount_to(&Node::element("body"))).unwrap();

        block_on(slots.set_slot("header", "one")).unwrap();
        block_on(slots.set_slot("header", Node::element("hr"))).unwrap();
        block_on(slots.set_slot("header", "two")).unwrap();
        assert_eq!(
            page.root().unwrap().first_child().unwrap().to_html(),
            "<header><!--slot:header-->two<!--/slot:header--></header>"
        );
    }

    #[test]
    fn test_unknown_slot_queues_silently() {
        let (page, slots) = page();
        block_on(page.mount_to(&Node::element("body"))).unwrap();

        block_on(slots.set_slot("footer", "never shown")).unwrap();
        assert_eq!(slots.pending_count("footer"), 1);

        // Still queued after another flush
        block_on(page.mount_to(&Node::element("body"))).unwrap();
        assert_eq!(slots.pending_count("footer"), 1);
        assert!(!page.root().unwrap().to_html().contains("never shown"));
    }

    #[test]
    fn test_layout_content_owned_and_replaced() {
        let (page, slots) = page();
        block_on(page.mount_to(&Node::element("body"))).unwrap();
        let children = page.feature::<Children>().unwrap();

        let badge = Component::new(Badge).unwrap();
        block_on(slots.set_slot("default", badge.clone())).unwrap();
        assert!(badge.is_mounted());
        assert!(children.contains(&badge));
        assert!(page.root().unwrap().to_html().contains("<b>new</b>"));

        // Replacing the badge destroys it first
        block_on(slots.set_slot("default", "plain")).unwrap();
        assert!(badge.is_destroyed());
        assert!(!children.contains(&badge));

        let second = Component::new(Badge).unwrap();
        block_on(slots.set_slot("default", second.clone())).unwrap();
        block_on(page.destroy()).unwrap();
        assert!(second.is_destroyed());
    }

    #[test]
    fn test_queue_from_created_hook() {
        struct Greeter;

        #[async_trait(?Send)]
        impl Layout for Greeter {
            fn features() -> Vec<FeatureSpec> {
                vec![FeatureSpec::of::<Slots>()]
            }
            fn render(&self, _host: &Component) -> Result<RenderOutput> {
                Ok("<p><template data-slot=\"name\"></template></p>".into())
            }
            fn created(&self, host: &Component) {
                if let Some(slots) = host.feature::<Slots>() {
                    slots.queue("name", "world");
                }
            }
        }

        let greeter = Component::new(Greeter).unwrap();
        let root = block_on(greeter.element()).unwrap();
        assert_eq!(root.text_content(), "world");
    }

    struct TwoRoots;

    #[async_trait(?Send)]
    impl Layout for TwoRoots {
        fn render(&self, _host: &Component) -> Result<RenderOutput> {
            Ok("<i>a</i><i>b</i>".into())
        }
    }

    #[test]
    fn test_failed_write_keeps_replaying() {
        let (page, slots) = page();
        let broken = Component::new(TwoRoots).unwrap();
        slots.queue("footer", "kept");
        slots.queue("header", broken.clone());
        slots.queue("header", "after");

        let err = block_on(page.element()).unwrap_err();
        assert!(matches!(err, LayoutError::RootCount { found: 2 }));

        // Later writes still landed, and the unknown name is still queued
        assert_eq!(header_text(&page), "after");
        assert_eq!(slots.pending_count("header"), 0);
        assert_eq!(slots.pending_count("footer"), 1);
        assert!(broken.is_destroyed());
    }

    struct Bare;

    #[async_trait(?Send)]
    impl Layout for Bare {
        fn features() -> Vec<FeatureSpec> {
            vec![FeatureSpec::of::<Slots>()]
        }
        fn render(&self, _host: &Component) -> Result<RenderOutput> {
            Ok("<div><template data-slot></template></div>".into())
        }
    }

    #[test]
    fn test_layout_content_without_children() {
        let bare = Component::new(Bare).unwrap();
        let slots = bare.feature::<Slots>().unwrap();
        assert!(bare.feature::<Children>().is_none());
        block_on(bare.mount_to(&Node::element("body"))).unwrap();

        let badge = Component::new(Badge).unwrap();
        block_on(slots.set_slot("default", badge.clone())).unwrap();
        assert!(badge.is_mounted());
        assert_eq!(
            bare.root().unwrap().to_html(),
            "<div><!--slot:default--><b>new</b><!--/slot:default--></div>"
        );

        // Replacing still destroys the shown layout
        block_on(slots.set_slot("default", "plain")).unwrap();
        assert!(badge.is_destroyed());
        assert_eq!(bare.root().unwrap().text_content(), "plain");

        // Not owned: the host's destroy leaves it alone
        let second = Component::new(Badge).unwrap();
        block_on(slots.set_slot("default", second.clone())).unwrap();
        block_on(bare.destroy()).unwrap();
        assert!(!second.is_destroyed());
        block_on(second.destroy()).unwrap();
    }
}
