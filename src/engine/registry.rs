//! Feature Registry - installed features of one layout instance.
//!
//! Arena-style: each layout owns a small vector of entries, allocated at
//! construction and dropped with the layout (or when it is destroyed).
//! Entries are never uninstalled one by one.
//!
//! Broadcasts iterate a snapshot of the entries, so a hook may look up
//! other features (or itself) while it runs.

use std::any::TypeId;
use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{LayoutError, Result};

use super::feature::{Feature, FeatureInstance};

struct Entry {
    name: Cow<'static, str>,
    exposed: bool,
    type_id: TypeId,
    instance: FeatureInstance,
}

/// Name → feature instance map of one layout.
#[derive(Default)]
pub struct FeatureRegistry {
    entries: RefCell<Vec<Entry>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance under `name`.
    ///
    /// Fails if the name is already taken on this registry.
    pub fn register(
        &self,
        name: Cow<'static, str>,
        exposed: bool,
        type_id: TypeId,
        instance: FeatureInstance,
    ) -> Result<()> {
        let mut entries = self.entries.borrow_mut();
        if entries.iter().any(|entry| entry.name == name) {
            return Err(LayoutError::DuplicateFeature(name.into_owned()));
        }
        entries.push(Entry {
            name,
            exposed,
            type_id,
            instance,
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// First installed feature of type `F`, exposed or not.
    pub fn get<F: Feature>(&self) -> Option<Rc<F>> {
        let type_id = TypeId::of::<F>();
        self.entries
            .borrow()
            .iter()
            .find(|entry| entry.type_id == type_id)
            .and_then(|entry| entry.instance.downcast::<F>())
    }

    /// Feature installed under `name`, exposed or not.
    pub fn get_by_name(&self, name: &str) -> Option<Rc<dyn Feature>> {
        self.entries
            .borrow()
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.instance.hooks.clone())
    }

    /// Exposed feature installed under `name`, if it is an `F`.
    pub fn get_exposed<F: Feature>(&self, name: &str) -> Option<Rc<F>> {
        self.entries
            .borrow()
            .iter()
            .find(|entry| entry.exposed && entry.name == name)
            .and_then(|entry| entry.instance.downcast::<F>())
    }

    /// Installed names in install order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| entry.name.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    // -------------------------------------------------------------------------
    // Broadcast
    // -------------------------------------------------------------------------

    /// Hook handles in install order.
    pub fn snapshot(&self) -> Vec<Rc<dyn Feature>> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| entry.instance.hooks.clone())
            .collect()
    }

    /// Call `f` on every installed feature, in install order.
    pub fn broadcast(&self, mut f: impl FnMut(&dyn Feature)) {
        for feature in self.snapshot() {
            f(feature.as_ref());
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        drop(entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        hits: Cell<usize>,
    }
    impl Feature for Counter {}

    struct Other;
    impl Feature for Other {}

    fn counter() -> FeatureInstance {
        FeatureInstance::new(Counter { hits: Cell::new(0) })
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = FeatureRegistry::new();
        registry
            .register("counter".into(), true, TypeId::of::<Counter>(), counter())
            .unwrap();
        registry
            .register("other".into(), false, TypeId::of::<Other>(), FeatureInstance::new(Other))
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["counter", "other"]);
        assert!(registry.get::<Counter>().is_some());
        assert!(registry.get::<Other>().is_some());
        assert!(registry.get_by_name("other").is_some());
        assert!(registry.get_by_name("missing").is_none());

        // Exposure and type both have to match
        assert!(registry.get_exposed::<Counter>("counter").is_some());
        assert!(registry.get_exposed::<Other>("other").is_none());
        assert!(registry.get_exposed::<Other>("counter").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = FeatureRegistry::new();
        registry
            .register("counter".into(), true, TypeId::of::<Counter>(), counter())
            .unwrap();
        let err = registry
            .register("counter".into(), false, TypeId::of::<Counter>(), counter())
            .unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateFeature(name) if name == "counter"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_broadcast_and_clear() {
        let registry = FeatureRegistry::new();
        registry
            .register("a".into(), true, TypeId::of::<Counter>(), counter())
            .unwrap();
        registry
            .register("b".into(), true, TypeId::of::<Other>(), FeatureInstance::new(Other))
            .unwrap();

        let mut seen = 0;
        registry.broadcast(|_| seen += 1);
        assert_eq!(seen, 2);

        let handle = registry.get::<Counter>().unwrap();
        handle.hits.set(3);
        assert_eq!(registry.get::<Counter>().unwrap().hits.get(), 3);

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.get::<Counter>().is_none());
    }
}
