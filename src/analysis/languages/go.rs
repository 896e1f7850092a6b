//! Go grammar rules.

use tree_sitter::Node;

use crate::analysis::treesitter::{
    callee, child_of_kind, descendants_of_kind, dotted, text, unquote, Declared, Grammar, Scope,
    TreeSitterPlugin,
};
use crate::analysis::{ParsedFile, SymbolKind, Visibility};
use crate::language::Language;

const IMPORT_QUERY: &str = r#"
(import_spec
  path: (_) @import
)
"#;

const CONTROL_FLOW_QUERY: &str = r#"
(if_statement) @if
(for_statement) @loop
(expression_case) @case
(type_case) @case
(communication_case) @case
(binary_expression operator: "&&") @and
(binary_expression operator: "||") @or
"#;

/// Predeclared types; never composition targets.
const PREDECLARED_TYPES: &[&str] = &[
    "bool", "byte", "complex64", "complex128", "error", "float32", "float64", "int", "int8",
    "int16", "int32", "int64", "rune", "string", "uint", "uint8", "uint16", "uint32", "uint64",
    "uintptr", "any",
];

pub struct GoGrammar;

pub type GoPlugin = TreeSitterPlugin<GoGrammar>;

impl GoPlugin {
    pub fn create() -> anyhow::Result<Self> {
        TreeSitterPlugin::new(GoGrammar)
    }
}

impl GoGrammar {
    /// Receiver type name of a method (`(s *Server)` -> `Server`).
    fn receiver_type(node: Node, source: &[u8]) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        descendants_of_kind(receiver, &["type_identifier"])
            .first()
            .map(|t| text(*t, source).to_string())
    }
}

impl Grammar for GoGrammar {
    fn language(&self) -> Language {
        Language::Go
    }

    fn dialects(&self) -> Vec<tree_sitter::Language> {
        vec![tree_sitter_go::LANGUAGE.into()]
    }

    fn import_query(&self) -> &'static str {
        IMPORT_QUERY
    }

    fn control_flow_query(&self) -> &'static str {
        CONTROL_FLOW_QUERY
    }

    fn nesting_kinds(&self) -> &'static [&'static str] {
        &["block"]
    }

    fn classify<'t>(&self, node: Node<'t>, source: &[u8], scope: &Scope) -> Option<Declared<'t>> {
        let name = || node.child_by_field_name("name").map(|n| text(n, source));
        let body = node.child_by_field_name("body");
        match node.kind() {
            "function_declaration" => {
                Some(Declared::new(name()?, SymbolKind::Function, node).with_body(body))
            }
            "method_declaration" => Some(
                Declared::new(name()?, SymbolKind::Function, node)
                    .with_body(body)
                    .qualified_by(Self::receiver_type(node, source)),
            ),
            "type_spec" => {
                let ty = node.child_by_field_name("type")?;
                let kind = match ty.kind() {
                    "struct_type" => SymbolKind::Class,
                    "interface_type" => SymbolKind::Interface,
                    _ => SymbolKind::Other,
                };
                let body = match ty.kind() {
                    "struct_type" => child_of_kind(ty, "field_declaration_list"),
                    "interface_type" => Some(ty),
                    _ => None,
                };
                Some(Declared::new(name()?, kind, node).with_body(body))
            }
            "type_alias" => Some(Declared::new(name()?, SymbolKind::Other, node)),
            "const_spec" | "var_spec" if scope.at_module_level() => {
                Some(Declared::new(name()?, SymbolKind::Variable, node))
            }
            _ => None,
        }
    }

    fn visibility(&self, decl: &Declared, _source: &[u8], _scope: &Scope) -> Visibility {
        if decl.name.chars().next().is_some_and(char::is_uppercase) {
            Visibility::Public
        } else {
            Visibility::Package
        }
    }

    fn import_targets(&self, node: Node, source: &[u8], _parsed: &ParsedFile) -> Vec<String> {
        let path = unquote(text(node, source));
        if path.is_empty() {
            return Vec::new();
        }
        vec![dotted(path)]
    }

    fn call_target(&self, node: Node, source: &[u8]) -> Option<String> {
        if node.kind() != "call_expression" {
            return None;
        }
        callee(text(node.child_by_field_name("function")?, source))
    }

    fn supertypes<'t>(&self, decl: &Declared<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        // Embedded interfaces.
        let Some(ty) = decl.node.child_by_field_name("type") else {
            return Vec::new();
        };
        if decl.node.kind() != "type_spec" || ty.kind() != "interface_type" {
            return Vec::new();
        }
        let mut cursor = ty.walk();
        let embedded = ty
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "type_elem")
            .flat_map(|elem| descendants_of_kind(elem, &["type_identifier", "qualified_type"]))
            .map(|t| (dotted(text(t, source)), t))
            .collect();
        embedded
    }

    fn field_types<'t>(&self, node: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        if node.kind() != "field_declaration" {
            return Vec::new();
        }
        let Some(ty) = node.child_by_field_name("type") else {
            return Vec::new();
        };
        descendants_of_kind(ty, &["type_identifier", "qualified_type"])
            .into_iter()
            .map(|t| (dotted(text(t, source)), t))
            .filter(|(name, _)| !PREDECLARED_TYPES.contains(&name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::languages::testing::{run, symbol, targets};
    use crate::analysis::DependencyKind;

    const SOURCE: &str = r#"
package server

import (
	"fmt"
	"github.com/acme/shop/internal/store"
)

const DefaultPort = 8080

// Server handles requests.
type Server struct {
	store *store.Store
	name  string
	cache Cache
}

type Handler interface {
	Handle() error
}

func (s *Server) Start(port int) error {
	if port == 0 || s.name == "" {
		return fmt.Errorf("bad port")
	}
	for i := 0; i < 3; i++ {
		s.warm()
	}
	return nil
}

func (s *Server) warm() {}

func New() *Server {
	return &Server{}
}
"#;

    #[test]
    fn test_go_symbols() {
        let plugin = GoPlugin::create().unwrap();
        let parsed = run(&plugin, "internal/server/server.go", SOURCE);

        let server = symbol(&parsed, "Server");
        assert_eq!(server.kind, SymbolKind::Class);
        assert_eq!(server.documentation.as_deref(), Some("Server handles requests."));
        assert_eq!(symbol(&parsed, "Handler").kind, SymbolKind::Interface);

        let start = symbol(&parsed, "Server.Start");
        assert_eq!(start.parent.as_deref(), Some("Server"));
        assert_eq!(start.visibility, Visibility::Public);
        assert_eq!(start.complexity, Some(4));

        assert_eq!(symbol(&parsed, "Server.warm").visibility, Visibility::Package);
        assert_eq!(symbol(&parsed, "DefaultPort").kind, SymbolKind::Variable);
        assert_eq!(symbol(&parsed, "New").parent, None);
    }

    #[test]
    fn test_go_dependencies() {
        let plugin = GoPlugin::create().unwrap();
        let parsed = run(&plugin, "internal/server/server.go", SOURCE);

        assert_eq!(
            targets(&parsed, DependencyKind::Import),
            vec!["fmt", "github.com.acme.shop.internal.store"]
        );
        assert_eq!(
            targets(&parsed, DependencyKind::Composition),
            vec!["store.Store", "Cache"]
        );
        let calls = targets(&parsed, DependencyKind::Call);
        assert!(calls.contains(&"s.warm"));
        assert!(calls.contains(&"fmt.Errorf"));
    }
}
