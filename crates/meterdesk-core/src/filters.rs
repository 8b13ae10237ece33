//! Parent/child relationships between filter keys.
//!
//! Selecting a scheme narrows the zones on offer and selecting a zone narrows
//! the routes, so a change to a parent must reset every dependent below it.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Declared dependencies between filter keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDependencies {
    children: BTreeMap<String, Vec<String>>,
}

impl FilterDependencies {
    /// No dependencies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a linear chain where each key depends on the one before it.
    #[must_use]
    pub fn chain<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        keys.windows(2).fold(Self::new(), |deps, pair| {
            deps.depends_on(pair[0].clone(), pair[1].clone())
        })
    }

    /// Declare that `child` must be reset whenever `parent` changes.
    #[must_use]
    pub fn depends_on(mut self, parent: impl Into<String>, child: impl Into<String>) -> Self {
        let child = child.into();
        let entry = self.children.entry(parent.into()).or_default();
        if !entry.contains(&child) {
            entry.push(child);
        }
        self
    }

    /// Every key that transitively depends on `key`, in breadth-first order.
    #[must_use]
    pub fn dependents_of(&self, key: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        seen.insert(key.to_string());
        let mut ordered = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::from([key]);
        while let Some(current) = queue.pop_front() {
            let Some(children) = self.children.get(current) else {
                continue;
            };
            for child in children {
                if seen.insert(child.clone()) {
                    ordered.push(child.clone());
                    queue.push_back(child.as_str());
                }
            }
        }
        ordered
    }

    /// Whether no dependencies are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
