//! Feature Plan Builder - dependency-ordered install list.
//!
//! Walks a layout's specs depth-first. Each spec's declared dependencies are
//! visited (not exposed) before the spec itself is placed, so a dependency is
//! always installed, and initialized, before the feature that asked for it.
//!
//! Requests for the same name collapse into one entry whose `exposed` flag
//! is the OR of all requests. A name is claimed in the seen-map *before*
//! its dependencies are visited, so a dependency cycle stops at the first
//! repeat instead of recursing forever: the first writer wins.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::{LayoutError, Result};

use super::feature::{FeatureConstructor, FeatureInstance, FeatureSpec};

/// One feature to install.
#[derive(Debug)]
pub struct PlanEntry {
    pub name: Cow<'static, str>,
    pub constructor: FeatureConstructor,
    /// Reachable through `Component::exposed`. Dependency-only features
    /// still get every hook.
    pub exposed: bool,
    /// Instance supplied by the spec, used instead of constructing one.
    pub instance: Option<FeatureInstance>,
}

enum Seen {
    /// Claimed, dependencies still being visited. Holds the exposed flag.
    Visiting(bool),
    /// Placed at this index of the plan.
    Placed(usize),
}

#[derive(Default)]
struct PlanBuilder {
    seen: HashMap<Cow<'static, str>, Seen>,
    entries: Vec<PlanEntry>,
}

impl PlanBuilder {
    fn visit(&mut self, spec: FeatureSpec, exposed: bool) -> Result<()> {
        let Some(name) = spec.resolved_name() else {
            return Err(LayoutError::MissingFeatureName {
                type_name: spec.constructor.type_name(),
            });
        };

        match self.seen.get_mut(&name) {
            Some(Seen::Visiting(flag)) => {
                *flag |= exposed;
                return Ok(());
            }
            Some(Seen::Placed(index)) => {
                self.entries[*index].exposed |= exposed;
                return Ok(());
            }
            None => {}
        }

        self.seen.insert(name.clone(), Seen::Visiting(exposed));
        for dependency in spec.constructor.dependencies() {
            self.visit(dependency, false)?;
        }

        // Cycles may have OR'd in an exposed flag while we were visiting
        let exposed = match self.seen.get(&name) {
            Some(Seen::Visiting(flag)) => *flag,
            _ => exposed,
        };
        self.seen.insert(name.clone(), Seen::Placed(self.entries.len()));
        self.entries.push(PlanEntry {
            name,
            constructor: spec.constructor,
            exposed,
            instance: spec.instance,
        });
        Ok(())
    }
}

/// Resolve specs into an ordered, deduplicated install plan.
///
/// Top-level specs are exposed; their dependencies are not (unless also
/// requested at the top level).
pub fn build_plan(specs: Vec<FeatureSpec>) -> Result<Vec<PlanEntry>> {
    let mut builder = PlanBuilder::default();
    for spec in specs {
        builder.visit(spec, true)?;
    }
    Ok(builder.entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::feature::{Feature, FeatureType};

    struct Store;
    impl Feature for Store {}
    impl FeatureType for Store {
        const NAME: Option<&'static str> = Some("store");
        fn create() -> Self {
            Store
        }
    }

    struct Router;
    impl Feature for Router {}
    impl FeatureType for Router {
        const NAME: Option<&'static str> = Some("router");
        fn dependencies() -> Vec<FeatureSpec> {
            vec![FeatureSpec::of::<Store>()]
        }
        fn create() -> Self {
            Router
        }
    }

    struct Anonymous;
    impl Feature for Anonymous {}
    impl FeatureType for Anonymous {
        fn create() -> Self {
            Anonymous
        }
    }

    struct Ping;
    impl Feature for Ping {}
    impl FeatureType for Ping {
        const NAME: Option<&'static str> = Some("ping");
        fn dependencies() -> Vec<FeatureSpec> {
            vec![FeatureSpec::of::<Pong>()]
        }
        fn create() -> Self {
            Ping
        }
    }

    struct Pong;
    impl Feature for Pong {}
    impl FeatureType for Pong {
        const NAME: Option<&'static str> = Some("pong");
        fn dependencies() -> Vec<FeatureSpec> {
            vec![FeatureSpec::of::<Ping>()]
        }
        fn create() -> Self {
            Pong
        }
    }

    fn names(plan: &[PlanEntry]) -> Vec<(&str, bool)> {
        plan.iter().map(|e| (e.name.as_ref(), e.exposed)).collect()
    }

    #[test]
    fn test_dependency_before_dependent() {
        let plan = build_plan(vec![FeatureSpec::of::<Router>()]).unwrap();
        assert_eq!(names(&plan), vec![("store", false), ("router", true)]);
    }

    #[test]
    fn test_duplicate_requests_merge_exposed() {
        let plan = build_plan(vec![
            FeatureSpec::of::<Router>(),
            FeatureSpec::of::<Store>(),
            FeatureSpec::of::<Router>(),
        ])
        .unwrap();
        assert_eq!(names(&plan), vec![("store", true), ("router", true)]);
    }

    #[test]
    fn test_override_name() {
        let plan = build_plan(vec![
            FeatureSpec::of::<Store>(),
            FeatureSpec::named::<Store>("cache"),
        ])
        .unwrap();
        assert_eq!(names(&plan), vec![("store", true), ("cache", true)]);
    }

    #[test]
    fn test_missing_name() {
        let err = build_plan(vec![FeatureSpec::of::<Anonymous>()]).unwrap_err();
        assert!(matches!(err, LayoutError::MissingFeatureName { .. }));

        let plan = build_plan(vec![FeatureSpec::named::<Anonymous>("anon")]).unwrap();
        assert_eq!(names(&plan), vec![("anon", true)]);
    }

    #[test]
    fn test_cycle_first_writer_wins() {
        let plan = build_plan(vec![FeatureSpec::of::<Ping>()]).unwrap();
        assert_eq!(names(&plan), vec![("pong", false), ("ping", true)]);
    }

    #[test]
    fn test_supplied_instance_kept() {
        let plan = build_plan(vec![FeatureSpec::instance(Store)]).unwrap();
        assert!(plan[0].instance.is_some());
    }
}
