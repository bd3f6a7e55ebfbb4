//! Execution planner - builds resource execution plans

use crate::resource::{BoxedResource, Resource, ResourceExt};
use std::collections::HashSet;
use thiserror::Error;

/// Errors detected while building a plan
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// Two resources to converge share an id
    #[error("duplicate resource id in plan: {0}")]
    DuplicateId(String),
}

/// An execution plan with resources grouped by the kind of convergence
///
/// Removals run first and sequentially so that a resource being replaced
/// (removed at one location, created at another) never races with itself.
pub struct ExecutionPlan {
    /// Resources whose desired state is absent
    pub removals: Vec<BoxedResource>,
    /// Resources to create or bring back in line
    pub applies: Vec<BoxedResource>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            removals: Vec::new(),
            applies: Vec::new(),
        }
    }

    /// Add a resource to the plan, classifying by its desired state
    pub fn add_resource(&mut self, resource: BoxedResource) {
        if resource.is_removal() {
            self.removals.push(resource);
        } else {
            self.applies.push(resource);
        }
    }

    /// Check that no two resources in the same batch share an id
    pub fn validate(&self) -> Result<(), PlanError> {
        for batch in [&self.removals, &self.applies] {
            let mut seen = HashSet::new();
            for resource in batch {
                let id = resource.id();
                if !seen.insert(id.clone()) {
                    return Err(PlanError::DuplicateId(id));
                }
            }
        }
        Ok(())
    }

    /// Filter plan to only include resources matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        Self {
            removals: self
                .removals
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
            applies: self
                .applies
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect(),
        }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "name" or "type.name". Names may contain dots.
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => self.filter(|r| matches_target(r, t)),
        }
    }

    /// All resources, removals first
    pub fn iter(&self) -> impl Iterator<Item = &BoxedResource> {
        self.removals.iter().chain(self.applies.iter())
    }

    /// Total number of resources in the plan
    pub fn total_resources(&self) -> usize {
        self.removals.len() + self.applies.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.applies.is_empty()
    }
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if a resource matches a "name" or "type.name" target
fn matches_target(resource: &dyn Resource, target: &str) -> bool {
    if resource.id() == target {
        return true;
    }
    match target.split_once('.') {
        Some((ty, name)) => resource.resource_type() == ty && resource.id() == name,
        None => false,
    }
}
