//! DOM - In-memory node tree the runtime mounts into.
//!
//! - [`Node`] - reference-counted element/text/comment/fragment handle
//! - [`markup`] - parser for string render output
//! - [`Event`] / [`ListenerId`] - listener registration and dispatch

mod events;
pub mod markup;
mod node;

pub use events::{Event, EventHandler, ListenerId};
pub use node::{Node, NodeKind};
