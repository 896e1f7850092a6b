//! Tree-sitter based plugin implementation.
//!
//! [`TreeSitterPlugin`] implements [`LanguagePlugin`] once for every grammar.
//! Each language supplies a [`Grammar`]: the tree-sitter language, an import
//! query, a control-flow query, and a handful of node-level rules (what is a
//! declaration, what is a call, how visibility is spelled). Queries are
//! compiled once when the plugin is built.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser, Query, QueryCursor};

use super::{
    qualify, ControlFlowInfo, Dependency, DependencyKind, FileMetrics, LanguagePlugin, Location,
    ParseLimits, ParsedFile, Span, Symbol, SymbolKind, SyntaxTree, Visibility,
};
use crate::error::FileError;
use crate::language::Language;
use crate::scan::SourceFile;

/// Signatures longer than this are cut.
const MAX_SIGNATURE_LEN: usize = 240;

/// Nodes that wrap a declaration without being one.
const WRAPPER_KINDS: &[&str] = &[
    "export_statement",
    "decorated_definition",
    "template_declaration",
    "lexical_declaration",
    "variable_declaration",
    "type_declaration",
    "const_declaration",
    "var_declaration",
];

/// Nodes that may sit between a declaration and its doc comment.
const ATTACHED_KINDS: &[&str] = &["attribute_item", "decorator", "marker_annotation", "annotation"];

/// Traversal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Enter,
    Leave,
}

/// Pre-order traversal with enter/leave events, without recursion.
///
/// Returning `false` on `Enter` skips the node's children.
pub fn traverse<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>, Visit) -> bool) {
    let mut cursor = root.walk();
    'outer: loop {
        let node = cursor.node();
        if visit(node, Visit::Enter) && cursor.goto_first_child() {
            continue;
        }
        visit(node, Visit::Leave);
        loop {
            if cursor.goto_next_sibling() {
                continue 'outer;
            }
            if !cursor.goto_parent() {
                break 'outer;
            }
            visit(cursor.node(), Visit::Leave);
        }
    }
}

/// Text of a node, empty if it is not valid UTF-8.
pub fn text<'s>(node: Node, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

/// A declaration recognized by a [`Grammar`].
#[derive(Debug, Clone)]
pub struct Declared<'t> {
    pub name: String,
    pub kind: SymbolKind,
    pub node: Node<'t>,
    /// Body node; the signature is the text before it.
    pub body: Option<Node<'t>>,
    /// Explicit owner written in the declaration (`func (s *Server) Run`,
    /// `void Foo::bar()`), relative to the enclosing scope.
    pub qualifier: Option<String>,
    /// Opens a naming scope without being a symbol (`impl Foo { .. }`).
    pub scope_only: bool,
}

impl<'t> Declared<'t> {
    pub fn new(name: impl Into<String>, kind: SymbolKind, node: Node<'t>) -> Self {
        Self {
            name: name.into(),
            kind,
            node,
            body: None,
            qualifier: None,
            scope_only: false,
        }
    }

    /// A naming scope that emits no symbol.
    pub fn scope(name: impl Into<String>, node: Node<'t>) -> Self {
        Self {
            scope_only: true,
            ..Self::new(name, SymbolKind::Class, node)
        }
    }

    pub fn with_body(mut self, body: Option<Node<'t>>) -> Self {
        self.body = body;
        self
    }

    pub fn qualified_by(mut self, qualifier: Option<String>) -> Self {
        self.qualifier = qualifier.filter(|q| !q.is_empty());
        self
    }
}

/// One open scope during a walk.
#[derive(Debug, Clone)]
pub struct Frame {
    node_id: usize,
    pub qualified: String,
    pub kind: SymbolKind,
    pub scope_only: bool,
}

/// The stack of declarations enclosing the current node.
#[derive(Debug, Default)]
pub struct Scope {
    frames: Vec<Frame>,
}

impl Scope {
    pub fn innermost(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Qualified name of the innermost scope, if any.
    pub fn qualified(&self) -> Option<&str> {
        self.frames.last().map(|f| f.qualified.as_str())
    }

    pub fn in_function(&self) -> bool {
        self.frames.iter().any(|f| f.kind == SymbolKind::Function)
    }

    /// Directly inside a type body (not inside one of its methods).
    pub fn in_type(&self) -> bool {
        self.frames.last().is_some_and(|f| f.kind.is_type())
    }

    /// Outside any function or type.
    pub fn at_module_level(&self) -> bool {
        self.frames.iter().all(|f| f.kind == SymbolKind::Module)
    }

    fn qualify<'t>(&self, decl: Declared<'t>) -> Qualified<'t> {
        let parent = match (&decl.qualifier, self.qualified()) {
            (Some(q), Some(outer)) => Some(format!("{}.{}", outer, q)),
            (Some(q), None) => Some(q.clone()),
            (None, outer) => outer.map(String::from),
        };
        let qualified_name = match &parent {
            Some(p) => format!("{}.{}", p, decl.name),
            None => decl.name.clone(),
        };
        Qualified {
            decl,
            qualified_name,
            parent,
        }
    }

    fn push(&mut self, node_id: usize, declared: &Qualified) {
        self.frames.push(Frame {
            node_id,
            qualified: declared.qualified_name.clone(),
            kind: declared.decl.kind,
            scope_only: declared.decl.scope_only,
        });
    }

    fn leave(&mut self, node_id: usize) {
        if self.frames.last().is_some_and(|f| f.node_id == node_id) {
            self.frames.pop();
        }
    }
}

/// A declaration with its position in the file's naming hierarchy.
#[derive(Debug, Clone)]
pub struct Qualified<'t> {
    pub decl: Declared<'t>,
    pub qualified_name: String,
    pub parent: Option<String>,
}

/// Per-language rules driving [`TreeSitterPlugin`].
pub trait Grammar: Send + Sync + 'static {
    fn language(&self) -> Language;

    /// Tree-sitter languages for this grammar; the first is the default.
    fn dialects(&self) -> Vec<tree_sitter::Language>;

    /// Which dialect parses `path`.
    fn dialect_for(&self, _path: &Path) -> usize {
        0
    }

    /// Query whose `@import` captures are import statements.
    fn import_query(&self) -> &'static str;

    /// Query whose captures (`@if`, `@loop`, `@case`, `@and`, `@or`,
    /// `@ternary`, `@catch`) are decision points.
    fn control_flow_query(&self) -> &'static str;

    /// Node kinds that count as one nesting level.
    fn nesting_kinds(&self) -> &'static [&'static str];

    /// Recognize a declaration node.
    fn classify<'t>(&self, node: Node<'t>, source: &[u8], scope: &Scope) -> Option<Declared<'t>>;

    fn visibility(&self, decl: &Declared, source: &[u8], scope: &Scope) -> Visibility;

    /// Normalized dotted targets of an `@import` capture.
    fn import_targets(&self, node: Node, source: &[u8], parsed: &ParsedFile) -> Vec<String>;

    /// Callee of a call node, normalized to dotted form.
    fn call_target(&self, node: Node, source: &[u8]) -> Option<String>;

    /// Explicit supertypes of a declaration.
    fn supertypes<'t>(&self, _decl: &Declared<'t>, _source: &[u8]) -> Vec<(String, Node<'t>)> {
        Vec::new()
    }

    /// Types referenced by a field declaration directly inside a type body.
    fn field_types<'t>(&self, _node: Node<'t>, _source: &[u8]) -> Vec<(String, Node<'t>)> {
        Vec::new()
    }

    fn documentation(&self, decl: &Declared, source: &[u8]) -> Option<String> {
        leading_comments(decl.node, source)
    }

    fn signature(&self, decl: &Declared, source: &[u8]) -> Option<String> {
        match decl.kind {
            SymbolKind::Variable | SymbolKind::Module => None,
            _ => header_text(decl, source),
        }
    }
}

struct Dialect {
    language: tree_sitter::Language,
    imports: Query,
    control_flow: Query,
}

/// A [`LanguagePlugin`] over any [`Grammar`].
pub struct TreeSitterPlugin<G: Grammar> {
    grammar: G,
    dialects: Vec<Dialect>,
}

impl<G: Grammar> TreeSitterPlugin<G> {
    /// Build the plugin, compiling its queries.
    ///
    /// Fails when the grammar and its queries disagree (e.g. a grammar crate
    /// update renamed a node kind).
    pub fn new(grammar: G) -> anyhow::Result<Self> {
        let name = grammar.language();
        let mut dialects = Vec::new();
        for language in grammar.dialects() {
            let imports = Query::new(&language, grammar.import_query())
                .with_context(|| format!("invalid import query for {}", name))?;
            let control_flow = Query::new(&language, grammar.control_flow_query())
                .with_context(|| format!("invalid control flow query for {}", name))?;
            dialects.push(Dialect {
                language,
                imports,
                control_flow,
            });
        }
        anyhow::ensure!(!dialects.is_empty(), "no tree-sitter language for {}", name);
        Ok(Self { grammar, dialects })
    }

    fn dialect(&self, path: &Path) -> &Dialect {
        let index = self.grammar.dialect_for(path);
        self.dialects.get(index).unwrap_or(&self.dialects[0])
    }

    fn control_flow(&self, dialect: &Dialect, node: Node, source: &[u8]) -> ControlFlowInfo {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&dialect.control_flow, node, source);
        let names = dialect.control_flow.capture_names();

        let mut info = ControlFlowInfo::default();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                info.record(names[capture.index as usize]);
            }
        }
        info
    }

    fn nesting_depth(&self, root: Node) -> usize {
        let kinds = self.grammar.nesting_kinds();
        let mut depth = 0usize;
        let mut max_depth = 0usize;
        traverse(root, |node, visit| {
            if kinds.contains(&node.kind()) {
                match visit {
                    Visit::Enter => {
                        depth += 1;
                        max_depth = max_depth.max(depth);
                    }
                    Visit::Leave => depth = depth.saturating_sub(1),
                }
            }
            true
        });
        max_depth
    }

    /// Walk the tree, reporting each node with its enclosing scope and, for
    /// declarations, its qualified form.
    fn scoped_walk<'t>(
        &self,
        root: Node<'t>,
        source: &[u8],
        visit: &mut dyn FnMut(Node<'t>, &Scope, Option<&Qualified<'t>>),
    ) {
        let mut scope = Scope::default();
        traverse(root, |node, event| {
            match event {
                Visit::Enter => {
                    let declared = self
                        .grammar
                        .classify(node, source, &scope)
                        .map(|decl| scope.qualify(decl));
                    visit(node, &scope, declared.as_ref());
                    if let Some(declared) = declared {
                        scope.push(node.id(), &declared);
                    }
                }
                Visit::Leave => scope.leave(node.id()),
            }
            true
        });
    }
}

impl<G: Grammar> LanguagePlugin for TreeSitterPlugin<G> {
    fn language(&self) -> Language {
        self.grammar.language()
    }

    fn parse(
        &self,
        file: &SourceFile,
        source: &[u8],
        limits: ParseLimits,
    ) -> Result<ParsedFile, FileError> {
        let dialect = self.dialect(&file.path);
        let mut parser = Parser::new();
        parser
            .set_language(&dialect.language)
            .map_err(|e| FileError::Parse {
                file: file.path.clone(),
                reason: e.to_string(),
            })?;
        if let Some(timeout) = limits.timeout {
            parser.set_timeout_micros(timeout.as_micros().min(u64::MAX as u128) as u64);
        }

        let tree = parser.parse(source, None).ok_or_else(|| match limits.timeout {
            Some(timeout) => FileError::Timeout {
                file: file.path.clone(),
                limit_ms: timeout.as_millis() as u64,
            },
            None => FileError::Parse {
                file: file.path.clone(),
                reason: format!("{} parser produced no tree", self.language()),
            },
        })?;

        let root = tree.root_node();
        let partial = root.has_error();
        let metrics = FileMetrics {
            cyclomatic: self.control_flow(dialect, root, source).cyclomatic_complexity(),
            lines: count_lines(source),
            nesting_depth: self.nesting_depth(root),
        };

        let mut parsed = ParsedFile::new(file, SyntaxTree::new(tree, source.to_vec()));
        parsed.metrics = metrics;
        parsed.partial = partial;
        Ok(parsed)
    }

    fn extract_symbols(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<Symbol>> {
        let tree = parsed
            .syntax
            .tree()
            .with_context(|| format!("no syntax tree for {}", parsed.path.display()))?;
        let source = parsed.syntax.source();
        let dialect = self.dialect(&parsed.path);

        let mut symbols = Vec::new();
        self.scoped_walk(tree.root_node(), source, &mut |_, scope, declared| {
            let Some(q) = declared else { return };
            if q.decl.scope_only {
                return;
            }
            let complexity = q.decl.kind.is_callable().then(|| {
                let node = q.decl.body.unwrap_or(q.decl.node);
                self.control_flow(dialect, node, source).cyclomatic_complexity()
            });
            symbols.push(Symbol {
                name: q.decl.name.clone(),
                qualified_name: q.qualified_name.clone(),
                kind: q.decl.kind,
                location: Location {
                    file: parsed.path.clone(),
                    span: Span::from_node(q.decl.node),
                },
                signature: self.grammar.signature(&q.decl, source),
                documentation: self.grammar.documentation(&q.decl, source),
                visibility: self.grammar.visibility(&q.decl, source, scope),
                parent: q.parent.clone(),
                complexity,
            });
        });
        Ok(symbols)
    }

    fn extract_dependencies(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<Dependency>> {
        let tree = parsed
            .syntax
            .tree()
            .with_context(|| format!("no syntax tree for {}", parsed.path.display()))?;
        let source = parsed.syntax.source();
        let dialect = self.dialect(&parsed.path);
        let root = tree.root_node();

        let mut deps = DependencySet::new(parsed);

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&dialect.imports, root, source);
        let names = dialect.imports.capture_names();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                if names[capture.index as usize] != "import" {
                    continue;
                }
                for target in self.grammar.import_targets(capture.node, source, parsed) {
                    deps.add(None, target, DependencyKind::Import, capture.node);
                }
            }
        }

        self.scoped_walk(root, source, &mut |node, scope, declared| {
            if let Some(q) = declared {
                for (target, at) in self.grammar.supertypes(&q.decl, source) {
                    deps.add(Some(&q.qualified_name), target, DependencyKind::Inheritance, at);
                }
            }
            if scope.in_type() {
                for (target, at) in self.grammar.field_types(node, source) {
                    deps.add(scope.qualified(), target, DependencyKind::Composition, at);
                }
            }
            if let Some(target) = self.grammar.call_target(node, source) {
                deps.add(scope.qualified(), target, DependencyKind::Call, node);
            }
        });

        Ok(deps.into_vec())
    }
}

/// Dependencies of one file, deduplicated on `(source, target, kind)`.
pub struct DependencySet<'p> {
    parsed: &'p ParsedFile,
    seen: HashSet<(String, String, DependencyKind)>,
    deps: Vec<Dependency>,
}

impl<'p> DependencySet<'p> {
    pub fn new(parsed: &'p ParsedFile) -> Self {
        Self {
            parsed,
            seen: HashSet::new(),
            deps: Vec::new(),
        }
    }

    /// Record a dependency from `scope` (relative to the module; `None` is
    /// the module itself).
    pub fn add(&mut self, scope: Option<&str>, target: String, kind: DependencyKind, at: Node) {
        self.add_at(scope, target, kind, Span::from_node(at));
    }

    pub fn add_at(&mut self, scope: Option<&str>, target: String, kind: DependencyKind, span: Span) {
        if target.is_empty() {
            return;
        }
        let source = match scope {
            Some(scope) => qualify(&self.parsed.module_id, scope),
            None => self.parsed.module_id.clone(),
        };
        if !self.seen.insert((source.clone(), target.clone(), kind)) {
            return;
        }
        self.deps.push(Dependency {
            source,
            target,
            kind,
            location: Location {
                file: self.parsed.path.clone(),
                span,
            },
        });
    }

    pub fn into_vec(self) -> Vec<Dependency> {
        self.deps
    }
}

/// Number of lines in `source`; a trailing newline does not open a line.
pub fn count_lines(source: &[u8]) -> usize {
    if source.is_empty() {
        return 0;
    }
    let newlines = source.iter().filter(|&&b| b == b'\n').count();
    if source.ends_with(b"\n") {
        newlines
    } else {
        newlines + 1
    }
}

/// Declaration text before its body, whitespace-collapsed.
pub fn header_text(decl: &Declared, source: &[u8]) -> Option<String> {
    let start = decl.node.start_byte();
    let end = decl
        .body
        .map(|b| b.start_byte())
        .unwrap_or_else(|| decl.node.end_byte())
        .max(start);
    let raw = std::str::from_utf8(source.get(start..end)?).ok()?;
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed
        .trim_end_matches(|c: char| c == '{' || c == ':' || c == ';' || c == '=' || c.is_whitespace())
        .to_string();
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate(trimmed, MAX_SIGNATURE_LEN))
}

fn truncate(mut s: String, max: usize) -> String {
    if s.len() > max {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push_str("...");
    }
    s
}

/// Comment block directly above a declaration (or its wrapper).
pub fn leading_comments(node: Node, source: &[u8]) -> Option<String> {
    let mut anchor = node;
    while let Some(parent) = anchor.parent() {
        if WRAPPER_KINDS.contains(&parent.kind()) {
            anchor = parent;
        } else {
            break;
        }
    }

    let mut blocks = Vec::new();
    let mut next_row = anchor.start_position().row;
    let mut current = anchor.prev_named_sibling();
    while let Some(sibling) = current {
        let kind = sibling.kind();
        if ATTACHED_KINDS.contains(&kind) {
            next_row = sibling.start_position().row;
        } else if kind.contains("comment") {
            if sibling.end_position().row + 1 < next_row {
                break;
            }
            blocks.push(clean_comment(text(sibling, source)));
            next_row = sibling.start_position().row;
        } else {
            break;
        }
        current = sibling.prev_named_sibling();
    }

    blocks.reverse();
    let doc = blocks.join("\n").trim().to_string();
    (!doc.is_empty()).then_some(doc)
}

/// Strip comment markers, keeping the text.
pub fn clean_comment(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let mut line = line.trim();
            for prefix in ["///", "//!", "//", "/**", "/*", "#"] {
                if let Some(rest) = line.strip_prefix(prefix) {
                    line = rest;
                    break;
                }
            }
            line = line.strip_suffix("*/").unwrap_or(line);
            line = line.trim_start_matches('*');
            line.trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Normalize a path-like name (`a::b`, `a/b`, `a->b`) to dotted form.
pub fn dotted(path: &str) -> String {
    let replaced = path.replace("::", ".").replace("->", ".").replace('/', ".");
    replaced
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Normalize a callee expression (`self.load`, `pkg.Func`, `Foo::new`).
///
/// Returns `None` for anything that is not a plain dotted path, such as
/// `make()()` or `items[0].run`.
pub fn callee(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let path = dotted(&compact);
    if path.is_empty()
        || !path
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '$')
    {
        return None;
    }
    let stripped = ["self.", "this.", "Self."]
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix))
        .unwrap_or(&path);
    (!stripped.is_empty()).then(|| stripped.to_string())
}

/// Strip surrounding quotes from a string literal.
pub fn unquote(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`' || c == '<' || c == '>')
}

/// Resolve a path-style relative import (`./util`, `../lib/db.js`) against
/// the importing file's directory. Non-relative specifiers are returned in
/// dotted form unchanged.
pub fn resolve_path_import(spec: &str, importer: &Path, extensions: &[&str]) -> String {
    if !(spec.starts_with("./") || spec.starts_with("../")) {
        return dotted(strip_extension(spec, extensions));
    }

    let mut parts: Vec<String> = importer
        .parent()
        .map(|dir| {
            dir.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    for segment in strip_extension(spec, extensions).split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other.to_string()),
        }
    }
    if parts.len() > 1 && parts.last().is_some_and(|last| last == "index") {
        parts.pop();
    }
    parts.join(".")
}

fn strip_extension<'a>(spec: &'a str, extensions: &[&str]) -> &'a str {
    for ext in extensions {
        if let Some(stem) = spec.strip_suffix(ext) {
            if stem.ends_with('.') {
                return &stem[..stem.len() - 1];
            }
        }
    }
    spec
}

/// Resolve a leading-dot relative module (`.models`, `..util`) against the
/// importing module. `is_package` is true when the importer is the package
/// itself (`__init__.py`).
pub fn resolve_dot_import(spec: &str, module_id: &str, is_package: bool) -> String {
    let dots = spec.chars().take_while(|&c| c == '.').count();
    if dots == 0 {
        return dotted(spec);
    }
    let mut base: Vec<&str> = module_id.split('.').filter(|s| !s.is_empty()).collect();
    // One dot is the importer's own package.
    let up = if is_package { dots - 1 } else { dots };
    for _ in 0..up {
        base.pop();
    }
    let rest = &spec[dots..];
    let mut parts: Vec<String> = base.into_iter().map(String::from).collect();
    parts.extend(
        rest.split('.')
            .filter(|s| !s.is_empty())
            .map(String::from),
    );
    parts.join(".")
}

/// First child of `node` with the given kind.
pub fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

/// All descendants of `node` with one of the given kinds, in source order,
/// without descending into matches.
pub fn descendants_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut found = Vec::new();
    traverse(node, |n, visit| {
        if visit == Visit::Enter && kinds.contains(&n.kind()) {
            found.push(n);
            return false;
        }
        true
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(b""), 0);
        assert_eq!(count_lines(b"a"), 1);
        assert_eq!(count_lines(b"a\nb\n"), 2);
        assert_eq!(count_lines(b"a\nb"), 2);
    }

    #[test]
    fn test_clean_comment() {
        assert_eq!(clean_comment("/// Loads the config."), "Loads the config.");
        assert_eq!(
            clean_comment("/**\n * Entry point.\n * Second line.\n */"),
            "Entry point.\nSecond line."
        );
        assert_eq!(clean_comment("# note"), "note");
    }

    #[test]
    fn test_dotted_and_callee() {
        assert_eq!(dotted("std::collections::HashMap"), "std.collections.HashMap");
        assert_eq!(dotted("github.com/acme/x"), "github.com.acme.x");
        assert_eq!(callee("self.load"), Some("load".to_string()));
        assert_eq!(callee("Config::new"), Some("Config.new".to_string()));
        assert_eq!(callee("ptr->run"), Some("ptr.run".to_string()));
        assert_eq!(callee("make()"), None);
        assert_eq!(callee("items[0].run"), None);
    }

    #[test]
    fn test_resolve_path_import() {
        let importer = PathBuf::from("src/app/main.ts");
        let exts = &["ts", "js"];
        assert_eq!(resolve_path_import("./util", &importer, exts), "src.app.util");
        assert_eq!(resolve_path_import("../lib/db.js", &importer, exts), "src.lib.db");
        assert_eq!(resolve_path_import("./models/index", &importer, exts), "src.app.models");
        assert_eq!(resolve_path_import("lodash/fp", &importer, exts), "lodash.fp");
    }

    #[test]
    fn test_resolve_dot_import() {
        assert_eq!(resolve_dot_import(".models", "pkg.views", false), "pkg.models");
        assert_eq!(resolve_dot_import("..util", "pkg.sub.a", false), "pkg.util");
        assert_eq!(resolve_dot_import(".", "pkg.views", false), "pkg");
        assert_eq!(resolve_dot_import(".models", "pkg", true), "pkg.models");
        assert_eq!(resolve_dot_import("os.path", "pkg", false), "os.path");
    }
}
