//! Core traits for language plugins.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::{Dependency, FileMetrics, Symbol};
use crate::error::FileError;
use crate::language::Language;
use crate::scan::SourceFile;

/// Holds a parsed tree-sitter tree and the source it was parsed from.
///
/// Owned by exactly one [`ParsedFile`]; never shared across files. The
/// generic plugin produces a handle with source but no tree.
#[derive(Clone, Default)]
pub struct SyntaxTree {
    tree: Option<tree_sitter::Tree>,
    source: Vec<u8>,
}

impl SyntaxTree {
    pub fn new(tree: tree_sitter::Tree, source: Vec<u8>) -> Self {
        Self {
            tree: Some(tree),
            source,
        }
    }

    /// A handle with source text only.
    pub fn text_only(source: Vec<u8>) -> Self {
        Self { tree: None, source }
    }

    pub fn tree(&self) -> Option<&tree_sitter::Tree> {
        self.tree.as_ref()
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Whether nothing is held (dropped after extraction).
    pub fn is_empty(&self) -> bool {
        self.tree.is_none() && self.source.is_empty()
    }
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("has_tree", &self.tree.is_some())
            .field("source_len", &self.source.len())
            .finish()
    }
}

/// Structural model of one processed file.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedFile {
    /// Root-relative path.
    pub path: PathBuf,
    pub language: Language,
    pub module_id: String,
    #[serde(skip)]
    pub syntax: SyntaxTree,
    pub symbols: Vec<Symbol>,
    pub dependencies: Vec<Dependency>,
    pub metrics: FileMetrics,
    /// The tree contains error nodes, or the generic plugin produced it.
    pub partial: bool,
    /// Produced by the generic plugin.
    pub fallback: bool,
    /// Why this slot is degraded, if it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FileError>,
}

impl ParsedFile {
    /// An empty slot for `file`, filled in by a plugin.
    pub fn new(file: &SourceFile, syntax: SyntaxTree) -> Self {
        Self {
            path: file.path.clone(),
            language: file.language,
            module_id: file.module_id.clone(),
            syntax,
            symbols: Vec::new(),
            dependencies: Vec::new(),
            metrics: FileMetrics::default(),
            partial: false,
            fallback: false,
            error: None,
        }
    }

    /// Drop the syntax tree and source buffer.
    pub fn release_syntax(&mut self) {
        self.syntax = SyntaxTree::default();
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Limits applied to one plugin invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseLimits {
    /// Parser timeout; `None` disables it.
    pub timeout: Option<Duration>,
}

/// Language plugin contract.
///
/// Each supported language implements this trait to turn source bytes into
/// the uniform structural model. Implementations are shared across worker
/// threads; `tree_sitter::Parser` is not `Sync`, so parsers are created per
/// call.
pub trait LanguagePlugin: Send + Sync {
    /// The language this plugin serves.
    fn language(&self) -> Language;

    /// Parse a file and compute its complexity metrics.
    ///
    /// A tree containing error nodes is not a failure: it is returned with
    /// `partial` set. Grammar-level failure or a timeout is an error.
    fn parse(
        &self,
        file: &SourceFile,
        source: &[u8],
        limits: ParseLimits,
    ) -> Result<ParsedFile, FileError>;

    /// Extract symbols, in source order. Deterministic for the same tree.
    fn extract_symbols(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<Symbol>>;

    /// Extract syntactic dependencies. Repeated `(source, target, kind)`
    /// triples are reported once, at their first location.
    fn extract_dependencies(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<Dependency>>;
}
