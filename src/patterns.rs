//! Architectural pattern detection.
//!
//! Each rule looks at the project structure and the dependency graph and
//! yields at most one [`ArchitecturalPattern`]. Rules are independent:
//! a project can be a layered monorepo at the same time, and matching no
//! rule at all is a valid outcome.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::DependencyKind;
use crate::graph::{DependencyGraph, EdgeView};
use crate::language::Language;
use crate::scan::{
    layer_of_dir, service_dirs, top_level_dir, top_level_manifest_dirs, ProjectStructure,
};

/// Most edges listed as evidence per pattern.
const EDGE_EVIDENCE_LIMIT: usize = 20;

/// Pattern tags, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternTag {
    Layered,
    Monorepo,
    Microservices,
    Mvc,
    Hexagonal,
}

impl PatternTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternTag::Layered => "layered",
            PatternTag::Monorepo => "monorepo",
            PatternTag::Microservices => "microservices",
            PatternTag::Mvc => "mvc",
            PatternTag::Hexagonal => "hexagonal",
        }
    }
}

impl std::fmt::Display for PatternTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected structural motif.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitecturalPattern {
    pub tag: PatternTag,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Directory paths, node ids and `source -> target` edges backing the match.
    pub evidence: Vec<String>,
    pub rationale: String,
}

impl ArchitecturalPattern {
    fn new(tag: PatternTag, confidence: f64, evidence: Vec<String>, rationale: String) -> Self {
        Self {
            tag,
            confidence: confidence.clamp(0.0, 1.0),
            evidence,
            rationale,
        }
    }
}

/// Run every rule. Sorted by descending confidence, ties by tag.
pub fn detect(structure: &ProjectStructure, graph: &DependencyGraph) -> Vec<ArchitecturalPattern> {
    let mut patterns: Vec<ArchitecturalPattern> = [
        detect_layered(structure, graph),
        detect_monorepo(structure),
        detect_microservices(structure, graph),
        detect_mvc(structure),
        detect_hexagonal(structure, graph),
    ]
    .into_iter()
    .flatten()
    .collect();

    patterns.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.tag.cmp(&b.tag))
    });
    for pattern in &patterns {
        debug!(tag = %pattern.tag, confidence = pattern.confidence, "pattern detected");
    }
    patterns
}

/// Edges flow presentation -> application -> data between layer
/// directories.
pub fn detect_layered(
    structure: &ProjectStructure,
    graph: &DependencyGraph,
) -> Option<ArchitecturalPattern> {
    let dirs = group_dirs(structure, layer_of_dir);
    if dirs.len() < 2 {
        return None;
    }

    let mut inter_layer = 0usize;
    let mut reverse = Vec::new();
    for edge in graph.edges() {
        let (Some(from), Some(to)) = (
            edge_group(edge.source.file.as_deref(), layer_of_dir),
            edge_group(edge.target.file.as_deref(), layer_of_dir),
        ) else {
            continue;
        };
        if from == to {
            continue;
        }
        inter_layer += 1;
        if from.rank() > to.rank() {
            reverse.push(edge_evidence(&edge));
        }
    }
    if inter_layer == 0 {
        return None;
    }

    let confidence = 1.0 - reverse.len() as f64 / inter_layer as f64;
    let rationale = format!(
        "{} layer groups; {} of {} inter-layer edges point against presentation -> application -> data",
        dirs.len(),
        reverse.len(),
        inter_layer
    );
    let mut evidence = dir_evidence(&dirs, |layer| Some(layer.as_str()));
    evidence.extend(reverse.into_iter().take(EDGE_EVIDENCE_LIMIT));
    Some(ArchitecturalPattern::new(PatternTag::Layered, confidence, evidence, rationale))
}

/// Several nested packages, each with its own manifest.
pub fn detect_monorepo(structure: &ProjectStructure) -> Option<ArchitecturalPattern> {
    let nested: Vec<_> = structure.manifests.iter().filter(|m| m.depth() >= 1).collect();
    if nested.len() < 2 {
        return None;
    }

    let package_dirs: BTreeSet<&Path> = nested.iter().map(|m| m.dir()).collect();
    let with_sources = package_dirs
        .iter()
        .filter(|dir| {
            structure
                .files
                .iter()
                .any(|f| f.language != Language::Unknown && f.path.starts_with(dir))
        })
        .count();

    let confidence = with_sources as f64 / package_dirs.len() as f64;
    let rationale = format!(
        "{} nested manifests in {} package directories, {} with analyzed sources",
        nested.len(),
        package_dirs.len(),
        with_sources
    );
    let evidence = nested.iter().map(|m| path_string(&m.path)).collect();
    Some(ArchitecturalPattern::new(PatternTag::Monorepo, confidence, evidence, rationale))
}

/// Top-level service directories with a manifest and an entry point,
/// loosely coupled to each other.
pub fn detect_microservices(
    structure: &ProjectStructure,
    graph: &DependencyGraph,
) -> Option<ArchitecturalPattern> {
    let services = service_dirs(&structure.manifests, &structure.entry_points);
    if services.len() < 2 {
        return None;
    }
    let manifest_dirs = top_level_manifest_dirs(&structure.manifests);

    let mut leaving = 0usize;
    let mut cross = Vec::new();
    for edge in graph.edges() {
        if edge.edge.kind != DependencyKind::Import || edge.target.file == edge.source.file {
            continue;
        }
        let Some(from) = service_of(&services, edge.source.file.as_deref()) else {
            continue;
        };
        // Only imports that land on analyzed code say anything about coupling.
        if edge.target.file.is_none() {
            continue;
        }
        leaving += 1;
        if service_of(&services, edge.target.file.as_deref()).is_some_and(|to| to != from) {
            cross.push(edge_evidence(&edge));
        }
    }

    let share = services.len() as f64 / manifest_dirs.len().max(services.len()) as f64;
    let isolation = if leaving == 0 {
        1.0
    } else {
        1.0 - cross.len() as f64 / leaving as f64
    };
    let rationale = format!(
        "{} of {} top-level packages are services; {} of {} internal imports cross a service boundary",
        services.len(),
        manifest_dirs.len(),
        cross.len(),
        leaving
    );
    let mut evidence: Vec<String> = services.iter().cloned().collect();
    evidence.extend(cross.into_iter().take(EDGE_EVIDENCE_LIMIT));
    Some(ArchitecturalPattern::new(
        PatternTag::Microservices,
        share * isolation,
        evidence,
        rationale,
    ))
}

/// Service directory a file belongs to.
fn service_of<'s>(services: &'s BTreeSet<String>, file: Option<&Path>) -> Option<&'s str> {
    let dir = top_level_dir(file?)?;
    services.get(dir).map(String::as_str)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MvcRole {
    Model,
    View,
    Controller,
}

fn mvc_role(name: &str) -> Option<MvcRole> {
    match name.to_ascii_lowercase().as_str() {
        "models" => Some(MvcRole::Model),
        "views" => Some(MvcRole::View),
        "controllers" => Some(MvcRole::Controller),
        _ => None,
    }
}

/// `models`, `views` and `controllers` directories.
pub fn detect_mvc(structure: &ProjectStructure) -> Option<ArchitecturalPattern> {
    let dirs = group_dirs(structure, mvc_role);
    if dirs.len() < 2 {
        return None;
    }
    let names: Vec<&str> = dirs
        .keys()
        .map(|role| match role {
            MvcRole::Model => "models",
            MvcRole::View => "views",
            MvcRole::Controller => "controllers",
        })
        .collect();
    let rationale = format!("{} present out of models, views, controllers", names.join(", "));
    Some(ArchitecturalPattern::new(
        PatternTag::Mvc,
        dirs.len() as f64 / 3.0,
        dir_evidence(&dirs, |_| None),
        rationale,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum HexRole {
    Domain,
    Ports,
    Adapters,
}

fn hex_role(name: &str) -> Option<HexRole> {
    match name.to_ascii_lowercase().as_str() {
        "domain" => Some(HexRole::Domain),
        "ports" => Some(HexRole::Ports),
        "adapters" => Some(HexRole::Adapters),
        _ => None,
    }
}

/// `ports` and `adapters` around an optional `domain`, with adapters
/// depending inward and never the reverse.
pub fn detect_hexagonal(
    structure: &ProjectStructure,
    graph: &DependencyGraph,
) -> Option<ArchitecturalPattern> {
    let dirs = group_dirs(structure, hex_role);
    if !dirs.contains_key(&HexRole::Ports) || !dirs.contains_key(&HexRole::Adapters) {
        return None;
    }

    let mut boundary = 0usize;
    let mut outward = Vec::new();
    for edge in graph.edges() {
        let (Some(from), Some(to)) = (
            edge_group(edge.source.file.as_deref(), hex_role),
            edge_group(edge.target.file.as_deref(), hex_role),
        ) else {
            continue;
        };
        match (from, to) {
            (HexRole::Adapters, HexRole::Domain | HexRole::Ports) => boundary += 1,
            (HexRole::Domain | HexRole::Ports, HexRole::Adapters) => {
                boundary += 1;
                outward.push(edge_evidence(&edge));
            }
            _ => {}
        }
    }

    let compliance = if boundary == 0 {
        1.0
    } else {
        1.0 - outward.len() as f64 / boundary as f64
    };
    let rationale = format!(
        "{} of domain, ports, adapters present; {} of {} adapter boundary edges point outward",
        dirs.len(),
        outward.len(),
        boundary
    );
    let mut evidence = dir_evidence(&dirs, |_| None);
    evidence.extend(outward.into_iter().take(EDGE_EVIDENCE_LIMIT));
    Some(ArchitecturalPattern::new(
        PatternTag::Hexagonal,
        dirs.len() as f64 / 3.0 * compliance,
        evidence,
        rationale,
    ))
}

/// The innermost directory of `path` that `role` recognizes, with its
/// root-relative path.
fn innermost_group<G: Copy>(path: &Path, role: impl Fn(&str) -> Option<G>) -> Option<(G, PathBuf)> {
    let parent = path.parent()?;
    let mut found = None;
    let mut prefix = PathBuf::new();
    for component in parent.components() {
        prefix.push(component);
        if let Some(group) = component.as_os_str().to_str().and_then(&role) {
            found = Some((group, prefix.clone()));
        }
    }
    found
}

fn edge_group<G: Copy>(file: Option<&Path>, role: impl Fn(&str) -> Option<G>) -> Option<G> {
    innermost_group(file?, role).map(|(group, _)| group)
}

/// Group directories present among the analyzed files.
fn group_dirs<G: Copy + Ord>(
    structure: &ProjectStructure,
    role: impl Fn(&str) -> Option<G> + Copy,
) -> BTreeMap<G, BTreeSet<PathBuf>> {
    let mut dirs: BTreeMap<G, BTreeSet<PathBuf>> = BTreeMap::new();
    for file in &structure.files {
        if let Some((group, dir)) = innermost_group(&file.path, role) {
            dirs.entry(group).or_default().insert(dir);
        }
    }
    dirs
}

/// Group directories as evidence, optionally prefixed with a group label.
fn dir_evidence<G>(
    dirs: &BTreeMap<G, BTreeSet<PathBuf>>,
    label: impl Fn(&G) -> Option<&'static str>,
) -> Vec<String> {
    dirs.iter()
        .flat_map(|(group, paths)| {
            let label = label(group);
            paths.iter().map(move |path| match label {
                Some(name) => format!("{}: {}", name, path_string(path)),
                None => path_string(path),
            })
        })
        .collect()
}

fn edge_evidence(edge: &EdgeView<'_>) -> String {
    format!("{} -> {}", edge.source.id, edge.target.id)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Dependency, Location, ParsedFile, Span, SyntaxTree};
    use crate::graph::GraphBuilder;
    use crate::scan::{manifest_ecosystem, Manifest, SourceFile};

    struct Fixture {
        sources: Vec<SourceFile>,
        parsed: Vec<ParsedFile>,
        manifests: Vec<Manifest>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                sources: Vec::new(),
                parsed: Vec::new(),
                manifests: Vec::new(),
            }
        }

        fn file(mut self, path: &str, language: Language, imports: &[&str]) -> Self {
            let source = SourceFile::new(Path::new("/repo"), Path::new(path), language, 10);
            let mut parsed = ParsedFile::new(&source, SyntaxTree::default());
            for target in imports {
                parsed.dependencies.push(Dependency {
                    source: parsed.module_id.clone(),
                    target: target.to_string(),
                    kind: DependencyKind::Import,
                    location: Location {
                        file: parsed.path.clone(),
                        span: Span::lines(1, 1),
                    },
                });
            }
            self.sources.push(source);
            self.parsed.push(parsed);
            self
        }

        fn manifest(mut self, path: &str) -> Self {
            let name = Path::new(path).file_name().unwrap().to_str().unwrap();
            self.manifests.push(Manifest {
                path: PathBuf::from(path),
                ecosystem: manifest_ecosystem(name).unwrap(),
            });
            self
        }

        fn detect(self) -> Vec<ArchitecturalPattern> {
            let structure = ProjectStructure::from_files(Path::new("/repo"), self.sources, self.manifests);
            let graph = GraphBuilder::build(&self.parsed);
            detect(&structure, &graph)
        }
    }

    fn tags(patterns: &[ArchitecturalPattern]) -> Vec<PatternTag> {
        patterns.iter().map(|p| p.tag).collect()
    }

    #[test]
    fn test_layered_confidence_counts_reverse_edges() {
        let patterns = Fixture::new()
            .file("app/api/users.py", Language::Python, &["app.services.accounts"])
            .file("app/services/accounts.py", Language::Python, &["app.repositories.users"])
            .file("app/repositories/users.py", Language::Python, &["app.api.users", "sqlalchemy"])
            .detect();

        assert_eq!(tags(&patterns), vec![PatternTag::Layered]);
        let layered = &patterns[0];
        assert!((layered.confidence - 2.0 / 3.0).abs() < 1e-9);
        assert!(layered.evidence.contains(&"presentation: app/api".to_string()));
        assert!(layered
            .evidence
            .contains(&"app.repositories.users -> app.api.users".to_string()));
    }

    #[test]
    fn test_layer_names_without_edges_are_not_layered() {
        let patterns = Fixture::new()
            .file("api/users.py", Language::Python, &[])
            .file("db/users.py", Language::Python, &[])
            .detect();
        assert!(patterns.is_empty());
    }

    #[test]
    fn test_monorepo_and_microservices() {
        let patterns = Fixture::new()
            .manifest("orders/package.json")
            .manifest("shared/package.json")
            .manifest("users/go.mod")
            .file("orders/client.js", Language::JavaScript, &["users.store"])
            .file("orders/index.js", Language::JavaScript, &["orders.client"])
            .file("users/main.go", Language::Go, &["users.store", "fmt"])
            .file("users/store.go", Language::Go, &[])
            .detect();

        assert_eq!(tags(&patterns), vec![PatternTag::Monorepo, PatternTag::Microservices]);
        let monorepo = &patterns[0];
        assert!((monorepo.confidence - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(monorepo.evidence.len(), 3);

        let services = &patterns[1];
        assert!((services.confidence - 4.0 / 9.0).abs() < 1e-9);
        assert_eq!(
            services.evidence,
            vec!["orders", "users", "orders.client -> users.store"]
        );
    }

    #[test]
    fn test_mvc_and_hexagonal_tie_on_tag_order() {
        let patterns = Fixture::new()
            .file("web/controllers/users.rb", Language::Ruby, &[])
            .file("web/models/user.rb", Language::Ruby, &[])
            .file("web/views/users.rb", Language::Ruby, &[])
            .file("hex/adapters/sql.py", Language::Python, &["hex.ports.repo"])
            .file("hex/ports/repo.py", Language::Python, &[])
            .file("hex/domain/order.py", Language::Python, &["hex.ports.repo"])
            .detect();

        assert_eq!(tags(&patterns), vec![PatternTag::Mvc, PatternTag::Hexagonal]);
        assert_eq!(patterns[0].confidence, 1.0);
        assert_eq!(patterns[1].confidence, 1.0);
    }

    #[test]
    fn test_hexagonal_penalizes_outward_edges() {
        let patterns = Fixture::new()
            .file("adapters/http.py", Language::Python, &["ports.api"])
            .file("ports/api.py", Language::Python, &["adapters.http"])
            .detect();

        assert_eq!(tags(&patterns), vec![PatternTag::Hexagonal]);
        let hex = &patterns[0];
        assert!((hex.confidence - 2.0 / 3.0 * 0.5).abs() < 1e-9);
        assert!(hex.evidence.contains(&"ports.api -> adapters.http".to_string()));
    }
}
