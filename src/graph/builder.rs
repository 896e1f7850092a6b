//! Builds a [`DependencyGraph`] from per-file results.

use std::cmp::Reverse;
use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, info};

use super::{
    DependencyGraph, GraphEdge, GraphNode, NodeKind, Resolution, EXTERNAL_PREFIX,
    UNRESOLVED_PREFIX,
};
use crate::analysis::{Dependency, DependencyKind, ParsedFile};

/// Where a dependency was written; drives candidate tie-breaks.
struct Origin<'a> {
    file: &'a ParsedFile,
    source_id: &'a str,
}

/// One-shot graph construction.
///
/// Node and edge order follow the order of `files` and of their symbols and
/// dependencies; no decision depends on hash iteration order.
pub struct GraphBuilder {
    graph: DiGraph<GraphNode, GraphEdge>,
    index: HashMap<String, NodeIndex>,
    /// Undisambiguated id to every node carrying it, in insertion order.
    by_id: HashMap<String, Vec<NodeIndex>>,
    /// Every proper trailing segment run of an id to its nodes.
    by_suffix: HashMap<String, Vec<NodeIndex>>,
    /// Directory ids (proper prefixes of module ids) to the modules below.
    by_package: HashMap<String, Vec<NodeIndex>>,
    /// Per-file: undisambiguated id to the node defined in that file.
    local: Vec<HashMap<String, NodeIndex>>,
    modules: Vec<NodeIndex>,
}

impl GraphBuilder {
    /// Build the graph for `files`.
    pub fn build(files: &[ParsedFile]) -> DependencyGraph {
        let mut builder = GraphBuilder {
            graph: DiGraph::new(),
            index: HashMap::new(),
            by_id: HashMap::new(),
            by_suffix: HashMap::new(),
            by_package: HashMap::new(),
            local: Vec::with_capacity(files.len()),
            modules: Vec::with_capacity(files.len()),
        };

        for file in files {
            builder.add_file_nodes(file);
        }
        let mut dependency_count = 0usize;
        for (position, file) in files.iter().enumerate() {
            for dep in &file.dependencies {
                builder.add_edge(position, file, dep);
                dependency_count += 1;
            }
        }
        debug_assert_eq!(builder.graph.edge_count(), dependency_count);

        let cycles = builder.annotate_cycles();
        info!(
            nodes = builder.graph.node_count(),
            edges = builder.graph.edge_count(),
            cycles = cycles.len(),
            "dependency graph built"
        );
        DependencyGraph {
            graph: builder.graph,
            index: builder.index,
            cycles,
        }
    }

    /// Insert a node, disambiguating a taken id with `@<path>:<line>`.
    fn insert(&mut self, base_id: String, mut node: GraphNode) -> NodeIndex {
        if self.index.contains_key(&base_id) {
            let path = node
                .file
                .as_ref()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            let mut id = format!("{}@{}:{}", base_id, path, node.line.unwrap_or(0));
            let mut n = 1;
            while self.index.contains_key(&id) {
                n += 1;
                id = format!("{}@{}:{}#{}", base_id, path, node.line.unwrap_or(0), n);
            }
            node.id = id;
        } else {
            node.id = base_id.clone();
        }

        let id = node.id.clone();
        let is_module = node.kind == NodeKind::Module;
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);

        let segments: Vec<&str> = base_id.split('.').collect();
        for start in 1..segments.len() {
            self.by_suffix
                .entry(segments[start..].join("."))
                .or_default()
                .push(idx);
        }
        if is_module {
            for end in 1..segments.len() {
                self.by_package
                    .entry(segments[..end].join("."))
                    .or_default()
                    .push(idx);
            }
        }
        self.by_id.entry(base_id).or_default().push(idx);
        idx
    }

    fn add_file_nodes(&mut self, file: &ParsedFile) {
        let mut local = HashMap::new();

        let module = self.insert(
            file.module_id.clone(),
            GraphNode {
                id: String::new(),
                kind: NodeKind::Module,
                symbol_kind: None,
                file: Some(file.path.clone()),
                language: Some(file.language),
                line: Some(1),
                cycle: None,
            },
        );
        local.insert(file.module_id.clone(), module);
        self.modules.push(module);

        for symbol in &file.symbols {
            let base_id = symbol.fully_qualified(&file.module_id);
            let idx = self.insert(
                base_id.clone(),
                GraphNode {
                    id: String::new(),
                    kind: NodeKind::Symbol,
                    symbol_kind: Some(symbol.kind),
                    file: Some(file.path.clone()),
                    language: Some(file.language),
                    line: Some(symbol.line()),
                    cycle: None,
                },
            );
            local.entry(base_id).or_insert(idx);
        }
        self.local.push(local);
    }

    fn add_edge(&mut self, position: usize, file: &ParsedFile, dep: &Dependency) {
        let source = self.resolve_source(position, &dep.source);
        let origin = Origin {
            file,
            source_id: &dep.source,
        };
        let (target, resolution) = match self.resolve_target(&dep.target, dep.kind, &origin) {
            Some(found) => found,
            None => self.placeholder(&dep.target, dep.kind),
        };
        debug!(
            source = %dep.source,
            target = %dep.target,
            kind = %dep.kind,
            ?resolution,
            "edge"
        );
        self.graph.add_edge(
            source,
            target,
            GraphEdge {
                kind: dep.kind,
                resolution,
                target_name: dep.target.clone(),
                location: dep.location.clone(),
            },
        );
    }

    /// The node a dependency starts from: the symbol of that id in the same
    /// file, else the file's module.
    fn resolve_source(&self, position: usize, source: &str) -> NodeIndex {
        self.local[position]
            .get(source)
            .copied()
            .unwrap_or(self.modules[position])
    }

    fn resolve_target(
        &self,
        target: &str,
        kind: DependencyKind,
        origin: &Origin,
    ) -> Option<(NodeIndex, Resolution)> {
        if let Some(found) = self.lookup(target, kind, origin) {
            return Some(found);
        }
        if kind != DependencyKind::Import {
            return None;
        }

        let segments: Vec<&str> = target.split('.').collect();
        // Longest trailing run first, so `github.com.acme.shop.store`
        // prefers a `shop/store` directory over any `store`. A single
        // trailing segment only counts when it is the whole target:
        // `logging.config` must not land in a local `config` package.
        for start in 0..segments.len() {
            if start > 0 && segments.len() - start < 2 {
                break;
            }
            let dir = segments[start..].join(".");
            if let Some(candidates) = self.by_package.get(&dir) {
                let pool = candidates.iter().map(|&idx| (idx, Resolution::Package));
                if let Some(best) = self.pick(pool, kind, origin) {
                    return Some(best);
                }
            }
        }
        for end in (1..segments.len()).rev() {
            let prefix = segments[..end].join(".");
            if let Some((found, _)) = self.lookup(&prefix, kind, origin) {
                return Some((found, Resolution::Prefix));
            }
        }
        None
    }

    /// Exact id and segment-suffix matches, ranked together.
    fn lookup(
        &self,
        target: &str,
        kind: DependencyKind,
        origin: &Origin,
    ) -> Option<(NodeIndex, Resolution)> {
        let exact = self
            .by_id
            .get(target)
            .into_iter()
            .flatten()
            .map(|&idx| (idx, Resolution::Exact));
        let suffix = self
            .by_suffix
            .get(target)
            .into_iter()
            .flatten()
            .map(|&idx| (idx, Resolution::Suffix));
        self.pick(exact.chain(suffix), kind, origin)
    }

    /// Tie-break among same-named candidates.
    ///
    /// Imports prefer an exact id, then the same file, then the same
    /// language. Everything else prefers the innermost scope enclosing the
    /// source, then the same file, then the same language, then an exact
    /// id, and never targets a module. Remaining ties keep input order.
    fn pick(
        &self,
        candidates: impl Iterator<Item = (NodeIndex, Resolution)>,
        kind: DependencyKind,
        origin: &Origin,
    ) -> Option<(NodeIndex, Resolution)> {
        let is_import = kind == DependencyKind::Import;
        candidates
            .filter(|&(idx, _)| is_import || self.graph[idx].kind != NodeKind::Module)
            .min_by_key(|&(idx, resolution)| {
                let node = &self.graph[idx];
                let same_file = node.file.as_deref() == Some(origin.file.path.as_path());
                let same_language = node.language == Some(origin.file.language);
                let exact = resolution == Resolution::Exact;
                if is_import {
                    (Reverse(0), !exact, !same_file, !same_language)
                } else {
                    let scope_depth = parent_id(&node.id)
                        .filter(|parent| encloses(parent, origin.source_id))
                        .map_or(0, |parent| parent.split('.').count());
                    (Reverse(scope_depth), !same_file, !same_language, !exact)
                }
            })
    }

    /// The `ext:`/`unresolved:` node for a target nothing defines.
    fn placeholder(&mut self, target: &str, kind: DependencyKind) -> (NodeIndex, Resolution) {
        let (id, node_kind, resolution) = if kind == DependencyKind::Import {
            (
                format!("{}{}", EXTERNAL_PREFIX, target),
                NodeKind::External,
                Resolution::External,
            )
        } else {
            (
                format!("{}{}", UNRESOLVED_PREFIX, target),
                NodeKind::Unresolved,
                Resolution::Unresolved,
            )
        };
        if let Some(&idx) = self.index.get(&id) {
            return (idx, resolution);
        }
        let idx = self.graph.add_node(GraphNode {
            id: id.clone(),
            kind: node_kind,
            symbol_kind: None,
            file: None,
            language: None,
            line: None,
            cycle: None,
        });
        self.index.insert(id, idx);
        (idx, resolution)
    }

    /// Annotate strongly-connected components of size two or more, or with
    /// a self-loop, and return them in a stable order.
    fn annotate_cycles(&mut self) -> Vec<Vec<NodeIndex>> {
        let mut cycles: Vec<Vec<NodeIndex>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.graph.find_edge(*single, *single).is_some(),
                _ => true,
            })
            .map(|mut component| {
                component.sort();
                component
            })
            .collect();
        cycles.sort_by_key(|component| component[0]);

        for (cycle, component) in cycles.iter().enumerate() {
            for &idx in component {
                self.graph[idx].cycle = Some(cycle);
            }
        }
        cycles
    }
}

/// Id of the enclosing scope: everything before the last segment, ignoring
/// any disambiguation suffix.
fn parent_id(id: &str) -> Option<&str> {
    let base = id.split('@').next().unwrap_or(id);
    base.rsplit_once('.').map(|(parent, _)| parent)
}

/// `scope` is `id` or one of its dotted ancestors.
fn encloses(scope: &str, id: &str) -> bool {
    id.strip_prefix(scope)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}
