//! Supertype graph of a codebase using petgraph::StableDiGraph

use crate::codebase::Codebase;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// How a class refers to one of its direct supertypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupertypeKind {
    Extends,
    Implements,
}

/// Directed graph of class → direct supertype edges, keyed by qualified
/// name. Supertypes outside the codebase appear as leaf nodes.
pub struct ClassHierarchy {
    inner: StableDiGraph<String, SupertypeKind>,
    index: HashMap<String, NodeIndex>,
}

impl std::fmt::Debug for ClassHierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassHierarchy")
            .field("class_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl ClassHierarchy {
    pub fn new() -> Self {
        ClassHierarchy {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Build the hierarchy of every class in `codebase`.
    pub fn build(codebase: &Codebase) -> Self {
        let mut hierarchy = ClassHierarchy::new();
        for class in codebase.classes() {
            hierarchy.node(class.qualified_name());
            if let Some(super_class) = &class.super_class {
                hierarchy.add_supertype(class.qualified_name(), &super_class.qualified_name, SupertypeKind::Extends);
            }
            for interface in &class.interfaces {
                hierarchy.add_supertype(class.qualified_name(), &interface.qualified_name, SupertypeKind::Implements);
            }
        }
        hierarchy
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.index.get(name) {
            return *idx;
        }
        let idx = self.inner.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Record that `class` has `supertype` as a direct supertype.
    pub fn add_supertype(&mut self, class: &str, supertype: &str, kind: SupertypeKind) {
        let source = self.node(class);
        let target = self.node(supertype);
        self.inner.add_edge(source, target, kind);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn class_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Direct supertypes of `name` of the given kind, in insertion order.
    pub fn direct_supertypes(&self, name: &str, kind: SupertypeKind) -> Vec<&str> {
        let Some(idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut result: Vec<_> = self
            .inner
            .edges_directed(*idx, Direction::Outgoing)
            .filter(|edge| *edge.weight() == kind)
            .map(|edge| (edge.id(), self.inner[edge.target()].as_str()))
            .collect();
        // Adjacency lists iterate newest first.
        result.sort_by_key(|(id, _)| *id);
        result.into_iter().map(|(_, name)| name).collect()
    }

    /// Chain of super classes from the direct super class upwards. Stops at
    /// the first class seen twice.
    pub fn super_classes(&self, name: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(name);
        let mut current = name;
        while let Some(next) = self.direct_supertypes(current, SupertypeKind::Extends).first().copied() {
            if !seen.insert(next) {
                break;
            }
            chain.push(next);
            current = next;
        }
        chain
    }

    /// Every transitive supertype of `name`, breadth first, each once.
    pub fn ancestors(&self, name: &str) -> Vec<&str> {
        let Some(start) = self.index.get(name) else {
            return Vec::new();
        };
        let mut ancestors = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(*start);
        let mut to_visit = VecDeque::from([*start]);

        while let Some(current) = to_visit.pop_front() {
            let mut edges: Vec<_> = self.inner.edges_directed(current, Direction::Outgoing).collect();
            edges.sort_by_key(|edge| edge.id());
            for edge in edges {
                if visited.insert(edge.target()) {
                    ancestors.push(self.inner[edge.target()].as_str());
                    to_visit.push_back(edge.target());
                }
            }
        }

        ancestors
    }

    /// Whether `name` is `other` or has it among its transitive supertypes.
    pub fn is_subclass_of(&self, name: &str, other: &str) -> bool {
        name == other || self.ancestors(name).contains(&other)
    }
}

impl Default for ClassHierarchy {
    fn default() -> Self {
        Self::new()
    }
}
