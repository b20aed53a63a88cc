//! Engine - Feature machinery and per-layout bookkeeping.
//!
//! The engine manages the pieces every layout instance owns:
//! - Feature: The plugin contract and install specifications
//! - Plan: Dependency-ordered, deduplicated install list
//! - Registry: Installed features of one layout
//! - Disposable: Cleanup callbacks released together at teardown
//! - Instances: Layout ids and the live-layout set
//!
//! # Architecture
//!
//! A layout class names its features once; every instance resolves them:
//!
//! ```text
//! Layout::features() → build_plan() → [store, router, slots] → FeatureRegistry
//!                                        │
//!                                        └─ init(host) in plan order
//! ```

pub mod disposable;
pub mod feature;
pub mod instances;
pub mod plan;
pub mod registry;

pub use disposable::{DisposableScope, Disposer};
pub use feature::{Feature, FeatureConstructor, FeatureInstance, FeatureSpec, FeatureType};
pub use instances::{is_live, live_layout_count, live_layouts, reset_instances};
pub use plan::{build_plan, PlanEntry};
pub use registry::FeatureRegistry;
