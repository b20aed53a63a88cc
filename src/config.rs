//! Runtime options.
//!
//! Names the markup conventions the built-in features look for: how a slot
//! placeholder is spelled and how a composed child's host element is built.
//! Options are per-thread, like every other piece of runtime state.

use std::cell::RefCell;
use std::rc::Rc;

// =============================================================================
// Options
// =============================================================================

/// Markup conventions used by the built-in features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeOptions {
    /// Tag of a slot placeholder element.
    pub slot_tag: String,
    /// Attribute that marks a placeholder as a slot and carries its name.
    pub slot_attribute: String,
    /// Slot name used when the attribute is present but empty.
    pub default_slot: String,
    /// Tag of the element that hosts a composed child layout.
    pub composition_tag: String,
    /// Attribute on the host element naming the composed layout.
    pub composition_attribute: String,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            slot_tag: "template".to_string(),
            slot_attribute: "data-slot".to_string(),
            default_slot: "default".to_string(),
            composition_tag: "div".to_string(),
            composition_attribute: "data-layout".to_string(),
        }
    }
}

thread_local! {
    static OPTIONS: RefCell<Rc<RuntimeOptions>> = RefCell::new(Rc::new(RuntimeOptions::default()));
}

/// Get the current options.
pub fn options() -> Rc<RuntimeOptions> {
    OPTIONS.with(|o| o.borrow().clone())
}

/// Replace the current options.
///
/// Layouts that already discovered their slots keep them; new renders use the
/// new conventions.
pub fn set_options(options: RuntimeOptions) {
    OPTIONS.with(|o| *o.borrow_mut() = Rc::new(options));
}

/// Restore the default options (for testing).
pub fn reset_options() {
    set_options(RuntimeOptions::default());
}
