//! Event listener bookkeeping for DOM nodes.

use std::cell::Cell;
use std::rc::Rc;

use super::Node;

thread_local! {
    /// Counter for generating listener ids.
    static NEXT_LISTENER_ID: Cell<u64> = const { Cell::new(0) };
}

/// Handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        NEXT_LISTENER_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            ListenerId(id)
        })
    }
}

/// An event delivered to listeners.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event name, e.g. `"click"`.
    pub kind: String,
    /// Node the event was dispatched on.
    pub target: Node,
}

/// Listener callback type (Rc so dispatch can snapshot the list).
pub type EventHandler = Rc<dyn Fn(&Event)>;

pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) event: String,
    pub(crate) handler: EventHandler,
}
