//! Structural facts extracted from a single file: symbols, dependencies and
//! complexity metrics.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Source span with byte offsets and line/column positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }

    /// A span covering whole lines, for text-based extraction.
    pub fn lines(start_line: usize, end_line: usize) -> Self {
        Self {
            start_byte: 0,
            end_byte: 0,
            start_line,
            start_col: 1,
            end_line,
            end_col: 1,
        }
    }

    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// A span in a specific file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub span: Span,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.span)
    }
}

/// Kind of symbol, normalized across languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Function,
    Variable,
    Module,
    Interface,
    Other,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Variable => "variable",
            SymbolKind::Module => "module",
            SymbolKind::Interface => "interface",
            SymbolKind::Other => "other",
        }
    }

    /// Symbols that open a type scope (members are qualified by them).
    pub fn is_type(&self) -> bool {
        matches!(self, SymbolKind::Class | SymbolKind::Interface | SymbolKind::Other)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolKind::Function)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility, mapped from each language's own rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    Package,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Protected => "protected",
            Visibility::Package => "package",
        }
    }
}

/// A named structural unit extracted from source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    /// Name qualified by enclosing symbols in the same file (`Class.method`).
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    pub visibility: Visibility,
    /// Qualified name of the enclosing symbol, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Cyclomatic complexity (functions only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u32>,
}

impl Symbol {
    /// Fully-qualified identifier given the file's module identifier.
    pub fn fully_qualified(&self, module_id: &str) -> String {
        qualify(module_id, &self.qualified_name)
    }

    pub fn line(&self) -> usize {
        self.location.span.start_line
    }
}

/// Join a module identifier and a qualified name.
pub fn qualify(module_id: &str, qualified_name: &str) -> String {
    if module_id.is_empty() {
        qualified_name.to_string()
    } else {
        format!("{}.{}", module_id, qualified_name)
    }
}

/// Kind of relationship between two symbols or modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Import,
    Inheritance,
    Call,
    Composition,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Import => "import",
            DependencyKind::Inheritance => "inheritance",
            DependencyKind::Call => "call",
            DependencyKind::Composition => "composition",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, syntactic relationship.
///
/// `source` is always a fully-qualified identifier of something in the same
/// file (the module or an enclosing symbol). `target` is the name as written,
/// normalized to dotted form; resolving it is the graph builder's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub source: String,
    pub target: String,
    pub kind: DependencyKind,
    pub location: Location,
}

/// Control flow counts for cyclomatic complexity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlFlowInfo {
    /// Number of if statements.
    pub if_count: usize,
    /// Number of for/while/loop statements.
    pub loop_count: usize,
    /// Number of case clauses / match arms.
    pub case_count: usize,
    /// Number of && / and operators.
    pub and_count: usize,
    /// Number of || / or operators.
    pub or_count: usize,
    /// Number of ternary / conditional expressions.
    pub ternary_count: usize,
    /// Number of catch/except clauses.
    pub catch_count: usize,
}

impl ControlFlowInfo {
    /// CC = 1 + decision points.
    pub fn cyclomatic_complexity(&self) -> u32 {
        let decision_points = self.if_count
            + self.loop_count
            + self.case_count
            + self.and_count
            + self.or_count
            + self.ternary_count
            + self.catch_count;

        1 + decision_points as u32
    }

    /// Record one capture from a control-flow query.
    pub fn record(&mut self, capture: &str) {
        match capture {
            "if" => self.if_count += 1,
            "loop" => self.loop_count += 1,
            "case" => self.case_count += 1,
            "and" => self.and_count += 1,
            "or" => self.or_count += 1,
            "ternary" => self.ternary_count += 1,
            "catch" => self.catch_count += 1,
            _ => {}
        }
    }
}

/// Per-file complexity metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetrics {
    /// Cyclomatic complexity of the file as a whole.
    pub cyclomatic: u32,
    pub lines: usize,
    /// Deepest nesting of blocks/scopes.
    pub nesting_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclomatic_complexity() {
        let mut cf = ControlFlowInfo::default();
        assert_eq!(cf.cyclomatic_complexity(), 1);

        cf.record("if");
        cf.record("if");
        cf.record("loop");
        cf.record("and");
        cf.record("try"); // not a decision point
        assert_eq!(cf.cyclomatic_complexity(), 5);
    }

    #[test]
    fn test_fully_qualified() {
        let symbol = Symbol {
            name: "method".to_string(),
            qualified_name: "Config.method".to_string(),
            kind: SymbolKind::Function,
            location: Location {
                file: PathBuf::from("pkg/config.py"),
                span: Span::lines(3, 4),
            },
            signature: None,
            documentation: None,
            visibility: Visibility::Public,
            parent: Some("Config".to_string()),
            complexity: Some(1),
        };
        assert_eq!(symbol.fully_qualified("pkg.config"), "pkg.config.Config.method");
        assert_eq!(qualify("", "main"), "main");
        assert_eq!(symbol.location.span.line_count(), 2);
    }
}
