//! Features - built-in plugins for layouts.
//!
//! - [`Children`] - owns sub-layouts and destroys them with the host
//! - [`Slots`] - named regions whose content can be replaced after render

mod children;
mod slots;

pub use children::Children;
pub use slots::{SlotContent, Slots};
