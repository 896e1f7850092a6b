//! archlens - static architecture analysis for multi-language source trees.
//!
//! archlens scans a directory, parses every selected file with a
//! tree-sitter grammar (or a generic text extractor when no grammar
//! applies), extracts symbols and syntactic dependencies, joins them into
//! one cross-file dependency graph and tags architectural patterns. The
//! single output is an [`AnalysisResult`].
//!
//! # Architecture
//!
//! - `scan`: file discovery, language classification, project facts
//! - `analysis`: plugin contract, language plugins, registry, analyzer
//! - `graph`: dependency graph construction and queries
//! - `patterns`: architectural pattern rules
//! - `config`: YAML configuration
//! - `report`: output formatting (pretty, JSON)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use archlens::{analyze_path, AnalysisConfig};
//!
//! let result = analyze_path(Path::new("."), &AnalysisConfig::default())?;
//! for pattern in &result.patterns {
//!     println!("{} {:.2}", pattern.tag, pattern.confidence);
//! }
//! # Ok::<(), archlens::AnalysisError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod language;
pub mod patterns;
pub mod report;
pub mod result;
pub mod scan;

pub use analysis::{
    analyze_path, CancellationToken, CodeAnalyzer, Dependency, DependencyKind, LanguagePlugin,
    ParsedFile, ParserRegistry, Symbol, SymbolKind,
};
pub use config::{AnalysisConfig, AnalysisDepth};
pub use error::{AnalysisError, EventKind, FileError, RunEvent, RunLog};
pub use graph::{DependencyGraph, GraphBuilder};
pub use language::Language;
pub use patterns::{ArchitecturalPattern, PatternTag};
pub use result::{AnalysisResult, ComplexitySummary};
pub use scan::{scan, ProjectScanner, ProjectStructure, SourceFile};
