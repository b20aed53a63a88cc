//! # spark-layout
//!
//! Layout lifecycle runtime with pluggable features.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! reactive state and effects.
//!
//! ## Architecture
//!
//! A layout renders once into a single root element, mounts into a container,
//! and is destroyed exactly once. Behavior is added through features that hook
//! into every phase:
//!
//! ```text
//! Layout::features() → build_plan → FeatureRegistry
//!                                        │
//!   new ─► features_ready ─► render ─► root_created ─► mount ─► destroy
//!                                                         │
//!                                       DisposableScope ◄─┘ flushed on teardown
//! ```
//!
//! ## Modules
//!
//! - [`layout`] - `Layout` trait and the `Component` lifecycle state machine
//! - [`engine`] - Feature contract, install plan, registry, disposables
//! - [`features`] - Built-in `Children` and `Slots` features
//! - [`dom`] - In-memory node tree and markup parser
//! - [`config`] - Thread-local runtime options
//! - [`error`] - Error types

pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod features;
pub mod layout;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::{options, reset_options, set_options, RuntimeOptions};

pub use dom::{Event, EventHandler, ListenerId, Node, NodeKind};

pub use engine::{
    build_plan, is_live, live_layout_count, live_layouts, reset_instances, DisposableScope,
    Disposer, Feature, FeatureConstructor, FeatureInstance, FeatureRegistry, FeatureSpec,
    FeatureType, PlanEntry,
};

pub use error::{LayoutError, MarkupError, Result};

pub use features::{Children, SlotContent, Slots};

pub use layout::{
    Component, Layout, LifecycleFlags, PendingComposition, Phase, RenderOutput, WeakComponent,
};
