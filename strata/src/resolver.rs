//! Stack resolution.
//!
//! Orders registered controllers so that every controller comes after the
//! one it is stacked on. Resolution expands a frontier breadth-first from the
//! root: each frontier label claims, in registration order, every unresolved
//! controller stacked on it, and those controllers join the frontier in turn.

use crate::controller::{ControllerSpec, StackedType};
use crate::error::SetupError;
use crate::registry::ControllerRegistry;
use std::collections::VecDeque;

/// Where a resolved controller sits relative to its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Root,
    Embedded { parent: String },
    Nested { parent: String },
}

impl Placement {
    pub fn parent(&self) -> Option<&str> {
        match self {
            Placement::Root => None,
            Placement::Embedded { parent } | Placement::Nested { parent } => Some(parent),
        }
    }

    pub fn stacked_type(&self) -> Option<StackedType> {
        match self {
            Placement::Root => None,
            Placement::Embedded { .. } => Some(StackedType::Embedded),
            Placement::Nested { .. } => Some(StackedType::Nested),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedController {
    pub label: String,
    pub placement: Placement,
}

/// Controllers in processing order. The root is always first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrder {
    entries: Vec<ResolvedController>,
}

impl ResolvedOrder {
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedController> {
        self.entries.iter()
    }

    pub fn root(&self) -> &ResolvedController {
        &self.entries[0]
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.label == label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute the resolved order of every controller in `registry`.
pub fn resolve<R>(
    registry: &ControllerRegistry<R>,
    root_label: &str,
) -> Result<ResolvedOrder, SetupError> {
    let mut unresolved: Vec<(&ControllerSpec, StackedType)> = Vec::new();
    for spec in registry.all() {
        let kind = StackedType::parse(&spec.label, &spec.stacked_type)?;
        if spec.label != root_label {
            unresolved.push((spec, kind));
        }
    }

    let root = registry
        .get(root_label)
        .map_err(|_| SetupError::MissingRoot(root_label.to_string()))?;

    let mut entries = vec![ResolvedController {
        label: root.label.clone(),
        placement: Placement::Root,
    }];
    let mut frontier = VecDeque::from([root.label.as_str()]);

    tracing::debug!(root = %root.label, "resolving controller stacking order");

    while !unresolved.is_empty() {
        let Some(parent) = frontier.pop_front() else {
            let labels: Vec<String> = unresolved.iter().map(|(s, _)| s.label.clone()).collect();
            tracing::debug!(?labels, "controllers unreachable from root");
            return Err(SetupError::UnresolvedController(labels));
        };

        let (children, rest): (Vec<_>, Vec<_>) = unresolved
            .into_iter()
            .partition(|(spec, _)| spec.stacked_on.as_deref() == Some(parent));
        unresolved = rest;

        for (spec, kind) in children {
            tracing::debug!(label = %spec.label, %parent, stacked_type = %kind, "resolved controller");

            let parent = parent.to_string();
            let placement = match kind {
                StackedType::Embedded => Placement::Embedded { parent },
                StackedType::Nested => Placement::Nested { parent },
            };
            entries.push(ResolvedController {
                label: spec.label.clone(),
                placement,
            });
            frontier.push_back(spec.label.as_str());
        }
    }

    Ok(ResolvedOrder { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ControllerSpec, ROOT_LABEL};

    fn registry(specs: Vec<ControllerSpec>) -> ControllerRegistry<()> {
        let mut registry = ControllerRegistry::new();
        for spec in specs {
            registry.register_spec(spec, Vec::new()).unwrap();
        }
        registry
    }

    fn assert_valid(order: &ResolvedOrder, registry: &ControllerRegistry<()>) {
        assert_eq!(order.root().label, ROOT_LABEL);
        assert_eq!(order.len(), registry.len());
        for entry in order.iter() {
            assert_eq!(order.labels().iter().filter(|l| **l == entry.label).count(), 1);
            if let Some(parent) = entry.placement.parent() {
                assert!(order.position(parent).unwrap() < order.position(&entry.label).unwrap());
            }
        }
    }

    #[test]
    fn test_root_only() {
        let reg = registry(vec![ControllerSpec::root()]);
        let order = resolve(&reg, ROOT_LABEL).unwrap();
        assert_eq!(order.labels(), vec!["base"]);
        assert_eq!(order.root().placement, Placement::Root);
    }

    #[test]
    fn test_children_follow_parents_regardless_of_registration() {
        let reg = registry(vec![
            ControllerSpec::new("deep").stacked_on("second").nested(),
            ControllerSpec::new("second").nested(),
            ControllerSpec::new("third").embedded(),
            ControllerSpec::root(),
            ControllerSpec::new("deep_embedded").stacked_on("deep"),
        ]);
        let order = resolve(&reg, ROOT_LABEL).unwrap();

        assert_eq!(
            order.labels(),
            vec!["base", "second", "third", "deep", "deep_embedded"]
        );
        assert_valid(&order, &reg);
        assert_eq!(
            order.iter().nth(3).unwrap().placement,
            Placement::Nested {
                parent: "second".into()
            }
        );
    }

    #[test]
    fn test_dangling_parent_fails() {
        let reg = registry(vec![
            ControllerSpec::root(),
            ControllerSpec::new("orphan").stacked_on("missing"),
            ControllerSpec::new("ok"),
        ]);
        let err = resolve(&reg, ROOT_LABEL).unwrap_err();
        assert!(matches!(err, SetupError::UnresolvedController(labels) if labels == vec!["orphan"]));
    }

    #[test]
    fn test_cycle_fails_with_every_label() {
        let reg = registry(vec![
            ControllerSpec::root(),
            ControllerSpec::new("a").stacked_on("b").nested(),
            ControllerSpec::new("b").stacked_on("a").nested(),
        ]);
        let err = resolve(&reg, ROOT_LABEL).unwrap_err();
        assert!(matches!(err, SetupError::UnresolvedController(labels) if labels == vec!["a", "b"]));
    }

    #[test]
    fn test_unstacked_non_root_fails() {
        let reg = registry(vec![
            ControllerSpec::root(),
            ControllerSpec::new("loose").unstacked(),
        ]);
        assert!(matches!(
            resolve(&reg, ROOT_LABEL),
            Err(SetupError::UnresolvedController(_))
        ));
    }

    #[test]
    fn test_missing_root() {
        let reg = registry(vec![ControllerSpec::new("a")]);
        assert!(matches!(
            resolve(&reg, ROOT_LABEL),
            Err(SetupError::MissingRoot(label)) if label == "base"
        ));
    }

    #[test]
    fn test_invalid_stacked_type_wins_over_unresolved() {
        let reg = registry(vec![
            ControllerSpec::root(),
            ControllerSpec::new("orphan").stacked_on("missing"),
            ControllerSpec::new("weird").stacked_type("bogus"),
        ]);
        let err = resolve(&reg, ROOT_LABEL).unwrap_err();
        assert!(matches!(
            err,
            SetupError::InvalidStackedType { label, stacked_type }
                if label == "weird" && stacked_type == "bogus"
        ));
    }

    #[test]
    fn test_order_is_stable_across_unrelated_registration_orders() {
        let a = registry(vec![
            ControllerSpec::root(),
            ControllerSpec::new("x").nested(),
            ControllerSpec::new("x1").stacked_on("x"),
            ControllerSpec::new("y").nested(),
        ]);
        let b = registry(vec![
            ControllerSpec::new("x1").stacked_on("x"),
            ControllerSpec::new("x").nested(),
            ControllerSpec::root(),
            ControllerSpec::new("y").nested(),
        ]);

        assert_eq!(
            resolve(&a, ROOT_LABEL).unwrap(),
            resolve(&b, ROOT_LABEL).unwrap()
        );
    }

    #[test]
    fn test_custom_root_label() {
        let reg = registry(vec![
            ControllerSpec::new("main").unstacked(),
            ControllerSpec::new("child").stacked_on("main"),
        ]);
        let order = resolve(&reg, "main").unwrap();
        assert_eq!(order.labels(), vec!["main", "child"]);
    }
}
