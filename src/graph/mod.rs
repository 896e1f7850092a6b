//! Cross-file dependency graph.
//!
//! Nodes are modules, symbols and the targets nothing in the run defines
//! (`ext:` for imports, `unresolved:` for everything else). Every
//! [`Dependency`](crate::analysis::Dependency) of every file becomes exactly
//! one edge, so the edge count always equals the dependency count.
//! Cycles are kept and annotated with their strongly-connected component.

mod builder;

pub use builder::GraphBuilder;

use std::collections::HashMap;
use std::path::PathBuf;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::analysis::{DependencyKind, Location, SymbolKind};
use crate::language::Language;

/// Prefix of nodes for import targets outside the run.
pub const EXTERNAL_PREFIX: &str = "ext:";

/// Prefix of nodes for non-import targets that matched nothing.
pub const UNRESOLVED_PREFIX: &str = "unresolved:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// One per analyzed file.
    Module,
    Symbol,
    /// Import target outside the run.
    External,
    /// Call, inheritance or composition target that matched nothing.
    Unresolved,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_kind: Option<SymbolKind>,
    /// Defining file; `None` for external and unresolved nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Index of the cycle this node belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<usize>,
}

impl GraphNode {
    /// Defined outside the run (external or unresolved).
    pub fn is_external(&self) -> bool {
        matches!(self.kind, NodeKind::External | NodeKind::Unresolved)
    }
}

/// How an edge target was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The target named a node exactly.
    Exact,
    /// The target was a trailing run of a node's segments.
    Suffix,
    /// An import named the directory holding a module.
    Package,
    /// A shorter prefix of an import matched.
    Prefix,
    External,
    Unresolved,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Resolution::External | Resolution::Unresolved)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub kind: DependencyKind,
    pub resolution: Resolution,
    /// Target as written in the source.
    pub target_name: String,
    pub location: Location,
}

/// An edge with its endpoints.
#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'g> {
    pub source: &'g GraphNode,
    pub target: &'g GraphNode,
    pub edge: &'g GraphEdge,
}

/// The dependency graph of one run. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    /// Id lookup only; never iterated.
    index: HashMap<String, NodeIndex>,
    cycles: Vec<Vec<NodeIndex>>,
}

impl DependencyGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.graph[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Edges in insertion order (the order of the input dependencies).
    pub fn edges(&self) -> impl Iterator<Item = EdgeView<'_>> {
        self.graph.edge_references().map(|e| EdgeView {
            source: &self.graph[e.source()],
            target: &self.graph[e.target()],
            edge: e.weight(),
        })
    }

    /// Edges leaving `id`, in insertion order.
    pub fn outgoing(&self, id: &str) -> Vec<EdgeView<'_>> {
        self.adjacent(id, Direction::Outgoing)
    }

    /// Edges entering `id`, in insertion order.
    pub fn incoming(&self, id: &str) -> Vec<EdgeView<'_>> {
        self.adjacent(id, Direction::Incoming)
    }

    fn adjacent(&self, id: &str, direction: Direction) -> Vec<EdgeView<'_>> {
        let Some(&node) = self.index.get(id) else {
            return Vec::new();
        };
        // petgraph yields adjacent edges newest first.
        let mut edges: Vec<_> = self.graph.edges_directed(node, direction).collect();
        edges.sort_by_key(|e| e.id());
        edges
            .into_iter()
            .map(|e| EdgeView {
                source: &self.graph[e.source()],
                target: &self.graph[e.target()],
                edge: e.weight(),
            })
            .collect()
    }

    /// Node ids of every cycle, each sorted by insertion order.
    pub fn cycles(&self) -> Vec<Vec<&str>> {
        self.cycles
            .iter()
            .map(|c| c.iter().map(|&n| self.graph[n].id.as_str()).collect())
            .collect()
    }

    pub fn external_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes().filter(|n| n.is_external())
    }

    /// Import edges only, as `(source module, target)` id pairs. Sources are
    /// always module nodes; targets are modules, symbols or externals.
    pub fn import_edges(&self) -> Vec<(&str, &str)> {
        self.edges()
            .filter(|e| e.edge.kind == DependencyKind::Import)
            .map(|e| (e.source.id.as_str(), e.target.id.as_str()))
            .collect()
    }

    /// Count of edges whose target matched nothing in the run.
    pub fn unresolved_edge_count(&self) -> usize {
        self.graph
            .edge_weights()
            .filter(|e| !e.resolution.is_resolved())
            .count()
    }
}

impl Serialize for DependencyGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Nodes<'a>(&'a DependencyGraph);
        struct Edges<'a>(&'a DependencyGraph);

        impl Serialize for Nodes<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut seq = serializer.serialize_seq(Some(self.0.node_count()))?;
                for node in self.0.nodes() {
                    seq.serialize_element(node)?;
                }
                seq.end()
            }
        }

        impl Serialize for Edges<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                #[derive(Serialize)]
                struct Row<'a> {
                    source: &'a str,
                    target: &'a str,
                    #[serde(flatten)]
                    edge: &'a GraphEdge,
                }

                let mut seq = serializer.serialize_seq(Some(self.0.edge_count()))?;
                for view in self.0.edges() {
                    seq.serialize_element(&Row {
                        source: &view.source.id,
                        target: &view.target.id,
                        edge: view.edge,
                    })?;
                }
                seq.end()
            }
        }

        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("nodes", &Nodes(self))?;
        map.serialize_entry("edges", &Edges(self))?;
        map.serialize_entry("cycles", &self.cycles())?;
        map.end()
    }
}
