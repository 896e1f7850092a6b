//! Rust grammar rules.

use tree_sitter::Node;

use crate::analysis::treesitter::{
    callee, descendants_of_kind, dotted, text, Declared, Grammar, Scope, TreeSitterPlugin,
};
use crate::analysis::{ParsedFile, SymbolKind, Visibility};
use crate::language::Language;

const IMPORT_QUERY: &str = r#"
(use_declaration
  argument: (_) @import
)

(extern_crate_declaration
  name: (identifier) @import
)
"#;

/// Tree-sitter query for control flow nodes (complexity calculation).
const CONTROL_FLOW_QUERY: &str = r#"
(if_expression) @if
(for_expression) @loop
(while_expression) @loop
(loop_expression) @loop
(match_arm) @case
(binary_expression operator: "&&") @and
(binary_expression operator: "||") @or
"#;

/// Standard wrappers skipped when reading field types.
const STD_TYPES: &[&str] = &[
    "Vec", "Option", "Box", "Rc", "Arc", "String", "HashMap", "HashSet", "BTreeMap", "BTreeSet",
    "Result", "Cell", "RefCell", "Mutex", "RwLock", "PathBuf", "Self", "VecDeque", "Cow",
];

pub struct RustGrammar;

pub type RustPlugin = TreeSitterPlugin<RustGrammar>;

impl RustPlugin {
    pub fn create() -> anyhow::Result<Self> {
        TreeSitterPlugin::new(RustGrammar)
    }
}

impl RustGrammar {
    /// Base name of a type, without generics or path (`foo::Bar<T>` -> `Bar`).
    fn type_name(node: Node, source: &[u8]) -> String {
        match node.kind() {
            "generic_type" => node
                .child_by_field_name("type")
                .map(|t| Self::type_name(t, source))
                .unwrap_or_default(),
            "scoped_type_identifier" => node
                .child_by_field_name("name")
                .map(|t| text(t, source).to_string())
                .unwrap_or_default(),
            "reference_type" | "pointer_type" => node
                .child_by_field_name("type")
                .map(|t| Self::type_name(t, source))
                .unwrap_or_default(),
            _ => text(node, source).to_string(),
        }
    }

    /// Expand a use tree into dotted paths.
    fn expand_use(node: Node, source: &[u8], prefix: &str, out: &mut Vec<String>) {
        let join = |path: &str| {
            let path = dotted(path);
            match (prefix.is_empty(), path.is_empty()) {
                (true, _) => path,
                (false, true) => prefix.to_string(),
                (false, false) => format!("{}.{}", prefix, path),
            }
        };
        match node.kind() {
            "use_as_clause" => {
                if let Some(path) = node.child_by_field_name("path") {
                    Self::expand_use(path, source, prefix, out);
                }
            }
            "scoped_use_list" => {
                let nested = node
                    .child_by_field_name("path")
                    .map(|p| join(text(p, source)))
                    .unwrap_or_else(|| prefix.to_string());
                if let Some(list) = node.child_by_field_name("list") {
                    Self::expand_use(list, source, &nested, out);
                }
            }
            "use_list" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    Self::expand_use(child, source, prefix, out);
                }
            }
            "use_wildcard" => {
                let path = text(node, source).trim_end_matches('*').trim_end_matches("::");
                out.push(join(path));
            }
            _ => {
                let path = join(text(node, source));
                out.push(path.strip_suffix(".self").unwrap_or(&path).to_string());
            }
        }
    }

    /// Rewrite `crate`/`self`/`super` prefixes against the importing module.
    fn anchor(path: &str, module_id: &str) -> String {
        let mut segments: Vec<&str> = path.split('.').collect();
        match segments.first().copied() {
            Some("crate") => {
                segments.remove(0);
                segments.join(".")
            }
            Some("self") => {
                segments[0] = module_id;
                segments.join(".")
            }
            Some("super") => {
                let mut base: Vec<&str> = module_id.split('.').collect();
                while segments.first() == Some(&"super") {
                    segments.remove(0);
                    base.pop();
                }
                base.extend(segments);
                base.join(".")
            }
            _ => path.to_string(),
        }
    }
}

impl Grammar for RustGrammar {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn dialects(&self) -> Vec<tree_sitter::Language> {
        vec![tree_sitter_rust::LANGUAGE.into()]
    }

    fn import_query(&self) -> &'static str {
        IMPORT_QUERY
    }

    fn control_flow_query(&self) -> &'static str {
        CONTROL_FLOW_QUERY
    }

    fn nesting_kinds(&self) -> &'static [&'static str] {
        &["block", "declaration_list"]
    }

    fn classify<'t>(&self, node: Node<'t>, source: &[u8], scope: &Scope) -> Option<Declared<'t>> {
        let name = || node.child_by_field_name("name").map(|n| text(n, source));
        let body = node.child_by_field_name("body");
        let kind = match node.kind() {
            "function_item" | "function_signature_item" => SymbolKind::Function,
            "struct_item" | "enum_item" | "union_item" => SymbolKind::Class,
            "trait_item" => SymbolKind::Interface,
            "type_item" => SymbolKind::Other,
            "mod_item" => SymbolKind::Module,
            "const_item" | "static_item" if !scope.in_function() => SymbolKind::Variable,
            "impl_item" => {
                let ty = node.child_by_field_name("type")?;
                return Some(Declared::scope(Self::type_name(ty, source), node).with_body(body));
            }
            _ => return None,
        };
        Some(Declared::new(name()?, kind, node).with_body(body))
    }

    fn visibility(&self, decl: &Declared, source: &[u8], scope: &Scope) -> Visibility {
        let mut cursor = decl.node.walk();
        let modifier = decl
            .node
            .children(&mut cursor)
            .find(|c| c.kind() == "visibility_modifier");
        match modifier {
            Some(m) if text(m, source) == "pub" => Visibility::Public,
            Some(_) => Visibility::Package,
            // Trait items share the trait's visibility.
            None if scope.innermost().is_some_and(|f| f.kind == SymbolKind::Interface) => {
                Visibility::Public
            }
            None => Visibility::Private,
        }
    }

    fn import_targets(&self, node: Node, source: &[u8], parsed: &ParsedFile) -> Vec<String> {
        let mut paths = Vec::new();
        Self::expand_use(node, source, "", &mut paths);
        paths
            .iter()
            .map(|p| Self::anchor(p, &parsed.module_id))
            .filter(|p| !p.is_empty())
            .collect()
    }

    fn call_target(&self, node: Node, source: &[u8]) -> Option<String> {
        if node.kind() != "call_expression" {
            return None;
        }
        let mut function = node.child_by_field_name("function")?;
        if function.kind() == "generic_function" {
            function = function.child_by_field_name("function")?;
        }
        callee(text(function, source))
    }

    fn supertypes<'t>(&self, decl: &Declared<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        let node = decl.node;
        match node.kind() {
            "impl_item" => node
                .child_by_field_name("trait")
                .map(|t| vec![(dotted(&Self::type_name(t, source)), t)])
                .unwrap_or_default(),
            "trait_item" => node
                .child_by_field_name("bounds")
                .map(|b| {
                    descendants_of_kind(b, &["type_identifier", "scoped_type_identifier"])
                        .into_iter()
                        .map(|t| (dotted(text(t, source)), t))
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn field_types<'t>(&self, node: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        if node.kind() != "field_declaration" {
            return Vec::new();
        }
        let Some(ty) = node.child_by_field_name("type") else {
            return Vec::new();
        };
        descendants_of_kind(ty, &["type_identifier", "scoped_type_identifier"])
            .into_iter()
            .map(|t| (dotted(text(t, source)), t))
            .filter(|(name, _)| !STD_TYPES.contains(&name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::languages::testing::{run, symbol, targets};
    use crate::analysis::DependencyKind;

    const SOURCE: &str = r#"
use std::collections::HashMap;
use crate::config::{self, Config};
use super::store::Store as Backing;

/// Serves requests.
pub struct Server {
    config: Config,
    store: Option<Backing>,
    routes: HashMap<String, Route>,
}

pub(crate) trait Handler: Send {
    fn handle(&self) -> bool;
}

impl Handler for Server {
    fn handle(&self) -> bool {
        self.ready() && !self.config.closed
    }
}

impl Server {
    pub fn new(config: Config) -> Self {
        let store = Store::open(&config);
        Server { config, store: Some(store), routes: HashMap::new() }
    }

    fn ready(&self) -> bool {
        match self.store {
            Some(_) => true,
            None => false,
        }
    }
}

const LIMIT: usize = 8;
"#;

    #[test]
    fn test_rust_symbols() {
        let plugin = RustPlugin::create().unwrap();
        let parsed = run(&plugin, "src/net/server.rs", SOURCE);

        assert_eq!(parsed.module_id, "src.net.server");
        let server = symbol(&parsed, "Server");
        assert_eq!(server.kind, SymbolKind::Class);
        assert_eq!(server.visibility, Visibility::Public);
        assert_eq!(server.documentation.as_deref(), Some("Serves requests."));

        let handler = symbol(&parsed, "Handler");
        assert_eq!(handler.kind, SymbolKind::Interface);
        assert_eq!(handler.visibility, Visibility::Package);
        assert_eq!(symbol(&parsed, "Handler.handle").visibility, Visibility::Public);

        let new = symbol(&parsed, "Server.new");
        assert_eq!(new.parent.as_deref(), Some("Server"));
        assert_eq!(new.signature.as_deref(), Some("pub fn new(config: Config) -> Self"));

        let ready = symbol(&parsed, "Server.ready");
        assert_eq!(ready.visibility, Visibility::Private);
        // two match arms
        assert_eq!(ready.complexity, Some(3));

        assert_eq!(symbol(&parsed, "LIMIT").kind, SymbolKind::Variable);
        assert!(!parsed.symbols.iter().any(|s| s.name == "store" && s.kind == SymbolKind::Variable));
    }

    #[test]
    fn test_rust_dependencies() {
        let plugin = RustPlugin::create().unwrap();
        let parsed = run(&plugin, "src/net/server.rs", SOURCE);

        assert_eq!(
            targets(&parsed, DependencyKind::Import),
            vec!["std.collections.HashMap", "config", "config.Config", "src.net.store.Store"]
        );
        assert_eq!(targets(&parsed, DependencyKind::Inheritance), vec!["Send", "Handler"]);
        assert_eq!(
            targets(&parsed, DependencyKind::Composition),
            vec!["Config", "Backing", "Route"]
        );

        let calls: Vec<_> = parsed
            .dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::Call)
            .map(|d| (d.source.as_str(), d.target.as_str()))
            .collect();
        assert!(calls.contains(&("src.net.server.Server.handle", "ready")));
        assert!(calls.contains(&("src.net.server.Server.new", "Store.open")));
    }
}
