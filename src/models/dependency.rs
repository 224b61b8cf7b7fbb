//! Dependency edges and the confirmed/potential dependency sets.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Confidence class of an edge.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Backed by a structural reference.
    Confirmed,
    /// Inferred from fuzzy text matching.
    Potential,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Confirmed => write!(f, "confirmed"),
            Confidence::Potential => write!(f, "potential"),
        }
    }
}

/// Directed edge `source` depends on `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub confidence: Confidence,
}

type EdgeMap = BTreeMap<String, BTreeSet<String>>;

/// Resource id -> set of target ids, once per confidence class.
///
/// Every catalog id has a key in both maps. Self-loops are never stored.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DependencySet {
    pub confirmed_dependencies: EdgeMap,
    pub potential_dependencies: EdgeMap,
}

impl DependencySet {
    /// Create empty entries for every id.
    pub fn new<'a>(ids: impl IntoIterator<Item = &'a str>) -> DependencySet {
        let mut set = DependencySet::default();
        for id in ids {
            set.confirmed_dependencies
                .insert(id.to_string(), BTreeSet::new());
            set.potential_dependencies
                .insert(id.to_string(), BTreeSet::new());
        }
        set
    }

    fn map_mut(&mut self, confidence: Confidence) -> &mut EdgeMap {
        match confidence {
            Confidence::Confirmed => &mut self.confirmed_dependencies,
            Confidence::Potential => &mut self.potential_dependencies,
        }
    }

    fn map(&self, confidence: Confidence) -> &EdgeMap {
        match confidence {
            Confidence::Confirmed => &self.confirmed_dependencies,
            Confidence::Potential => &self.potential_dependencies,
        }
    }

    /// Add an edge. Returns false for self-loops, empty targets and duplicates.
    pub fn add(&mut self, source: &str, target: &str, confidence: Confidence) -> bool {
        if target.is_empty() || source.eq_ignore_ascii_case(target) {
            return false;
        }
        self.map_mut(confidence)
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string())
    }

    pub fn add_confirmed(&mut self, source: &str, target: &str) -> bool {
        self.add(source, target, Confidence::Confirmed)
    }

    pub fn add_potential(&mut self, source: &str, target: &str) -> bool {
        self.add(source, target, Confidence::Potential)
    }

    pub fn confirmed(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.confirmed_dependencies.get(id)
    }

    pub fn potential(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.potential_dependencies.get(id)
    }

    pub fn is_confirmed(&self, source: &str, target: &str) -> bool {
        self.confirmed(source).is_some_and(|t| t.contains(target))
    }

    /// Number of edges of one class.
    pub fn total(&self, confidence: Confidence) -> usize {
        self.map(confidence).values().map(BTreeSet::len).sum()
    }

    /// All edges in a stable order.
    ///
    /// Confirmed edges come first. Potential edges are included only when
    /// `include_potential` is set, and a potential edge already present as
    /// confirmed is suppressed.
    pub fn edges(&self, include_potential: bool) -> Vec<DependencyEdge> {
        let mut edges: Vec<DependencyEdge> = self
            .confirmed_dependencies
            .iter()
            .flat_map(|(source, targets)| {
                targets.iter().map(move |target| DependencyEdge {
                    source: source.clone(),
                    target: target.clone(),
                    confidence: Confidence::Confirmed,
                })
            })
            .collect();

        if include_potential {
            for (source, targets) in &self.potential_dependencies {
                for target in targets {
                    if !self.is_confirmed(source, target) {
                        edges.push(DependencyEdge {
                            source: source.clone(),
                            target: target.clone(),
                            confidence: Confidence::Potential,
                        });
                    }
                }
            }
        }
        edges
    }
}
