//! Instance tracking - ids and the live-layout set.
//!
//! Every constructed layout gets an id from a per-thread counter and stays in
//! the live set until it is destroyed. The set is a `ReactiveSet`, so effects
//! that read it re-run when layouts come and go.

use std::cell::{Cell, RefCell};

use spark_signals::ReactiveSet;

use crate::types::LayoutId;

thread_local! {
    /// Counter for generating layout ids.
    static NEXT_ID: Cell<LayoutId> = const { Cell::new(0) };

    /// Ids of layouts constructed and not yet destroyed.
    static LIVE: RefCell<ReactiveSet<LayoutId>> = RefCell::new(ReactiveSet::new());
}

/// Allocate an id for a new layout and mark it live.
pub fn allocate_id() -> LayoutId {
    let id = NEXT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });
    LIVE.with(|live| {
        live.borrow_mut().insert(id);
    });
    id
}

/// Mark a layout as no longer live. Safe to call more than once, and from
/// drop glue during thread shutdown.
pub fn release_id(id: LayoutId) {
    let _ = LIVE.try_with(|live| {
        live.borrow_mut().remove(&id);
    });
}

/// Check if a layout is constructed and not destroyed.
pub fn is_live(id: LayoutId) -> bool {
    LIVE.with(|live| live.borrow().contains(&id))
}

/// Ids of all live layouts.
///
/// Note: This creates a reactive dependency when called from a derived/effect.
pub fn live_layouts() -> Vec<LayoutId> {
    LIVE.with(|live| live.borrow().iter().copied().collect())
}

/// Count of live layouts.
pub fn live_layout_count() -> usize {
    LIVE.with(|live| live.borrow().len())
}

/// Reset all tracking state (for testing).
pub fn reset_instances() {
    NEXT_ID.with(|next| next.set(0));
    LIVE.with(|live| live.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_release() {
        reset_instances();

        let a = allocate_id();
        let b = allocate_id();
        assert_eq!((a, b), (0, 1));
        assert!(is_live(a));
        assert_eq!(live_layout_count(), 2);

        release_id(a);
        assert!(!is_live(a));
        assert_eq!(live_layouts(), vec![b]);

        // Ids are never reused
        assert_eq!(allocate_id(), 2);
    }
}
