//! Core types shared across the runtime.

// =============================================================================
// Cleanup Function
// =============================================================================

/// Synchronous cleanup callback.
///
/// Call this to release whatever the callback's creator registered.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// State
// =============================================================================

/// A layout's generic state bag, merged key by key on update.
pub type StateMap = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Identity
// =============================================================================

/// Unique id of a constructed layout (per thread, never reused).
pub type LayoutId = usize;
