//! Dependency graph export and validation.
//!
//! The graph is a static view of the registry: one node per provider and one
//! edge per declared dependency. It is derived from descriptors only, so
//! building it never constructs anything.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::provider::Provider;
use crate::scope::Scope;

/// Where a dependency edge comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Positional constructor dependency
    Constructor,
    /// Argument of a module factory closure
    FactoryMethod,
    /// Field injected after construction
    Field,
    /// Provider object a forwarding provider delegates to
    Forwarding,
}

impl EdgeKind {
    fn label(self) -> &'static str {
        match self {
            EdgeKind::Constructor => "constructor",
            EdgeKind::FactoryMethod => "factory method",
            EdgeKind::Field => "field",
            EdgeKind::Forwarding => "forwarding",
        }
    }

    fn style(self) -> &'static str {
        match self {
            EdgeKind::Field => "dashed",
            EdgeKind::Forwarding => "dotted",
            EdgeKind::Constructor | EdgeKind::FactoryMethod => "solid",
        }
    }
}

/// One registered provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    /// Requested type
    pub key: Key,
    /// Implementation type backing the requested type
    pub implementation: Key,
    /// Caching scope
    pub scope: Scope,
    /// Provider strategy label (`transient`, `forwarding`, ...)
    pub strategy: &'static str,
}

/// A requested type depending on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    /// The dependent
    pub from: Key,
    /// The dependency
    pub to: Key,
    pub kind: EdgeKind,
}

/// Static dependency graph of an injector's registry.
///
/// # Examples
///
/// ```rust
/// use graft_di::{Binding, EdgeKind, Injectable, Injector, Key};
/// use std::sync::Arc;
///
/// struct Engine;
/// impl Injectable for Engine {
///     type Deps = ();
///     fn construct(_: ()) -> Self { Engine }
/// }
///
/// struct Car { engine: Arc<Engine> }
/// impl Injectable for Car {
///     type Deps = (Arc<Engine>,);
///     fn construct((engine,): Self::Deps) -> Self { Car { engine } }
/// }
///
/// let injector = Injector::builder()
///     .register_binding(Binding::bind::<Engine>().to_self()).unwrap()
///     .register_binding(Binding::bind::<Car>().to_self()).unwrap()
///     .build()
///     .unwrap();
///
/// let graph = injector.dependency_graph();
/// assert_eq!(graph.nodes.len(), 2);
/// assert_eq!(graph.dependencies_of(&Key::of::<Car>()), vec![Key::of::<Engine>()]);
/// assert!(graph.validate().is_ok());
/// assert!(graph.to_dot().contains("\"Car\" -> \"Engine\""));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Providers in registration order
    pub nodes: Vec<GraphNode>,
    /// Edges in declaration order per provider
    pub edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    pub(crate) fn from_providers<'a>(providers: impl Iterator<Item = &'a Provider>) -> Self {
        let mut graph = Self::default();
        for provider in providers {
            let from = provider.requested();
            graph.nodes.push(GraphNode {
                key: from,
                implementation: provider.implementation(),
                scope: provider.scope(),
                strategy: provider.strategy_name(),
            });

            let kind = provider.dependency_edge_kind();
            graph
                .edges
                .extend(provider.dependency_keys().iter().map(|&to| DependencyEdge { from, to, kind }));
            graph.edges.extend(provider.field_keys().iter().map(|&to| DependencyEdge {
                from,
                to,
                kind: EdgeKind::Field,
            }));
        }
        graph
    }

    /// Direct dependencies of `key`, in declaration order.
    pub fn dependencies_of(&self, key: &Key) -> Vec<Key> {
        self.edges
            .iter()
            .filter(|edge| edge.from == *key)
            .map(|edge| edge.to)
            .collect()
    }

    /// Every problem visible without constructing anything.
    ///
    /// Reports `SelfDependency` for an edge back to the requested or
    /// implementation type of its own node, and `UnknownDependency` for an
    /// edge to a type with no provider.
    pub fn issues(&self) -> Vec<DiError> {
        let registered: HashSet<Key> = self.nodes.iter().map(|node| node.key).collect();
        let mut issues = Vec::new();

        for node in &self.nodes {
            for edge in self.edges.iter().filter(|edge| edge.from == node.key) {
                if edge.to == node.key || edge.to == node.implementation {
                    issues.push(DiError::SelfDependency(node.key.display_name()));
                } else if !registered.contains(&edge.to) {
                    issues.push(DiError::UnknownDependency(edge.to.display_name()));
                }
            }
        }
        issues
    }

    /// Fails with the first of [`issues`](Self::issues), if any.
    pub fn validate(&self) -> DiResult<()> {
        match self.issues().into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }

    /// Renders the graph in Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph dependencies {\n");
        output.push_str("  rankdir=TB;\n");
        output.push_str("  node [shape=box];\n\n");

        for node in &self.nodes {
            let color = match node.scope {
                Scope::Singleton => "lightblue",
                Scope::EagerSingleton => "lightgreen",
                Scope::Transient => "lightyellow",
            };
            let _ = writeln!(
                output,
                "  \"{}\" [label=\"{}\\n({})\", fillcolor={}, style=filled];",
                node.key.short_name(),
                node.key.short_name(),
                node.strategy,
                color
            );
        }

        output.push('\n');
        for edge in &self.edges {
            let _ = writeln!(
                output,
                "  \"{}\" -> \"{}\" [label=\"{}\", style={}];",
                edge.from.short_name(),
                edge.to.short_name(),
                edge.kind.label(),
                edge.kind.style()
            );
        }

        output.push_str("}\n");
        output
    }
}
