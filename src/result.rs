//! The artifact handed to downstream consumers.

use std::path::PathBuf;

use serde::Serialize;

use crate::analysis::ParsedFile;
use crate::config::AnalysisDepth;
use crate::error::RunLog;
use crate::graph::DependencyGraph;
use crate::patterns::ArchitecturalPattern;
use crate::scan::ProjectStructure;

/// Number of callables listed in [`ComplexitySummary::hotspots`].
pub const HOTSPOT_LIMIT: usize = 10;

/// Everything one run produced. Only exists for a run that did not fail.
#[derive(Debug, Serialize)]
pub struct AnalysisResult {
    pub structure: ProjectStructure,
    /// One slot per analyzed file, in `structure.files` order.
    pub files: Vec<ParsedFile>,
    pub graph: DependencyGraph,
    pub patterns: Vec<ArchitecturalPattern>,
    pub complexity: ComplexitySummary,
    /// Scan issues followed by analysis events.
    pub log: RunLog,
    pub depth: AnalysisDepth,
    /// The run was cancelled before every file was processed.
    pub incomplete: bool,
}

impl AnalysisResult {
    pub fn file(&self, path: &std::path::Path) -> Option<&ParsedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn symbol_count(&self) -> usize {
        self.files.iter().map(|f| f.symbols.len()).sum()
    }

    pub fn dependency_count(&self) -> usize {
        self.files.iter().map(|f| f.dependencies.len()).sum()
    }
}

/// A callable ranked by cyclomatic complexity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hotspot {
    pub id: String,
    pub file: PathBuf,
    pub line: usize,
    pub complexity: u32,
}

/// Aggregate complexity figures over all files.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplexitySummary {
    pub files: usize,
    pub total_lines: usize,
    pub total_cyclomatic: u64,
    pub max_cyclomatic: u32,
    pub mean_cyclomatic: f64,
    pub max_nesting_depth: usize,
    pub hotspots: Vec<Hotspot>,
    pub partial_files: usize,
    pub fallback_files: usize,
    pub errored_files: usize,
}

impl ComplexitySummary {
    pub fn from_files(files: &[ParsedFile]) -> Self {
        let mut summary = ComplexitySummary {
            files: files.len(),
            ..Default::default()
        };

        let mut hotspots = Vec::new();
        for file in files {
            summary.total_lines += file.metrics.lines;
            summary.total_cyclomatic += u64::from(file.metrics.cyclomatic);
            summary.max_cyclomatic = summary.max_cyclomatic.max(file.metrics.cyclomatic);
            summary.max_nesting_depth = summary.max_nesting_depth.max(file.metrics.nesting_depth);
            summary.partial_files += usize::from(file.partial);
            summary.fallback_files += usize::from(file.fallback);
            summary.errored_files += usize::from(file.error.is_some());

            for symbol in &file.symbols {
                if let Some(complexity) = symbol.complexity {
                    hotspots.push(Hotspot {
                        id: symbol.fully_qualified(&file.module_id),
                        file: file.path.clone(),
                        line: symbol.line(),
                        complexity,
                    });
                }
            }
        }

        if !files.is_empty() {
            summary.mean_cyclomatic = summary.total_cyclomatic as f64 / files.len() as f64;
        }
        // Stable sort keeps input order among equals.
        hotspots.sort_by(|a, b| b.complexity.cmp(&a.complexity));
        hotspots.truncate(HOTSPOT_LIMIT);
        summary.hotspots = hotspots;
        summary
    }
}
