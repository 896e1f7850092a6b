//! C++ grammar rules, layered on the C family helpers.

use tree_sitter::Node;

use super::c::{
    c_call, classify_c_family, declarator_name, declares_function, field_type_names,
    include_targets, is_static,
};
use crate::analysis::treesitter::{
    child_of_kind, descendants_of_kind, dotted, text, Declared, Grammar, Scope, TreeSitterPlugin,
};
use crate::analysis::{ParsedFile, SymbolKind, Visibility};
use crate::language::Language;

const IMPORT_QUERY: &str = r#"
(preproc_include
  path: (_) @import
)
"#;

const CONTROL_FLOW_QUERY: &str = r#"
(if_statement) @if
(for_statement) @loop
(for_range_loop) @loop
(while_statement) @loop
(do_statement) @loop
(case_statement) @case
(conditional_expression) @ternary
(binary_expression operator: "&&") @and
(binary_expression operator: "||") @or
(catch_clause) @catch
"#;

/// Standard library vocabulary types; never composition targets.
const STD_TYPES: &[&str] = &[
    "string", "string_view", "vector", "map", "unordered_map", "set", "unordered_set", "list",
    "deque", "array", "pair", "tuple", "optional", "variant", "function", "shared_ptr",
    "unique_ptr", "weak_ptr", "size_t",
];

pub struct CppGrammar;

pub type CppPlugin = TreeSitterPlugin<CppGrammar>;

impl CppPlugin {
    pub fn create() -> anyhow::Result<Self> {
        TreeSitterPlugin::new(CppGrammar)
    }
}

impl CppGrammar {
    /// Access of a class member, from the nearest `public:`-style label
    /// above it or the class/struct default.
    fn member_access(node: Node, source: &[u8]) -> Option<Visibility> {
        let mut anchor = node;
        if anchor
            .parent()
            .is_some_and(|p| p.kind() == "template_declaration")
        {
            anchor = anchor.parent()?;
        }
        let list = anchor.parent()?;
        if list.kind() != "field_declaration_list" {
            return None;
        }

        let mut sibling = anchor.prev_sibling();
        while let Some(s) = sibling {
            if s.kind() == "access_specifier" {
                return Some(match text(s, source).trim_end_matches(':').trim() {
                    "public" => Visibility::Public,
                    "protected" => Visibility::Protected,
                    _ => Visibility::Private,
                });
            }
            sibling = s.prev_sibling();
        }

        let owner = list.parent()?;
        Some(if owner.kind() == "class_specifier" {
            Visibility::Private
        } else {
            Visibility::Public
        })
    }
}

impl Grammar for CppGrammar {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn dialects(&self) -> Vec<tree_sitter::Language> {
        vec![tree_sitter_cpp::LANGUAGE.into()]
    }

    fn import_query(&self) -> &'static str {
        IMPORT_QUERY
    }

    fn control_flow_query(&self) -> &'static str {
        CONTROL_FLOW_QUERY
    }

    fn nesting_kinds(&self) -> &'static [&'static str] {
        &["compound_statement", "field_declaration_list", "declaration_list"]
    }

    fn classify<'t>(&self, node: Node<'t>, source: &[u8], scope: &Scope) -> Option<Declared<'t>> {
        match node.kind() {
            "class_specifier" | "struct_specifier" | "union_specifier" => {
                let body = node.child_by_field_name("body")?;
                let (name, qualifier) = declarator_name(node.child_by_field_name("name")?, source)?;
                Some(
                    Declared::new(name, SymbolKind::Class, node)
                        .with_body(Some(body))
                        .qualified_by(qualifier),
                )
            }
            "namespace_definition" => {
                // Anonymous namespaces do not add a naming level.
                let name = dotted(text(node.child_by_field_name("name")?, source));
                Some(
                    Declared::new(name, SymbolKind::Module, node)
                        .with_body(node.child_by_field_name("body")),
                )
            }
            "alias_declaration" => {
                let name = text(node.child_by_field_name("name")?, source);
                Some(Declared::new(name, SymbolKind::Other, node))
            }
            // Constructors and destructors declared in a class body.
            "declaration" if scope.in_type() => {
                let declarator = node.child_by_field_name("declarator")?;
                let (name, _) = declarator_name(declarator, source)?;
                let kind = if declares_function(declarator) {
                    SymbolKind::Function
                } else {
                    SymbolKind::Variable
                };
                Some(Declared::new(name, kind, node))
            }
            _ => classify_c_family(node, source, scope),
        }
    }

    fn visibility(&self, decl: &Declared, source: &[u8], scope: &Scope) -> Visibility {
        if let Some(access) = Self::member_access(decl.node, source) {
            return access;
        }
        if scope.at_module_level() && is_static(decl.node, source) {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }

    fn import_targets(&self, node: Node, source: &[u8], parsed: &ParsedFile) -> Vec<String> {
        include_targets(node, source, parsed)
    }

    fn call_target(&self, node: Node, source: &[u8]) -> Option<String> {
        c_call(node, source)
    }

    fn supertypes<'t>(&self, decl: &Declared<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        let Some(clause) = child_of_kind(decl.node, "base_class_clause") else {
            return Vec::new();
        };
        descendants_of_kind(
            clause,
            &["type_identifier", "qualified_identifier", "template_argument_list"],
        )
        .into_iter()
        .filter(|n| n.kind() != "template_argument_list")
        .map(|n| (dotted(text(n, source)), n))
        .collect()
    }

    fn field_types<'t>(&self, node: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        field_type_names(node, source, STD_TYPES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::languages::testing::{run, symbol, targets};
    use crate::analysis::DependencyKind;

    const SOURCE: &str = r#"
#include <vector>
#include "net/socket.hpp"

namespace app {

class Server : public Base, private Logger {
public:
    Server();
    void run(int port);
private:
    std::vector<Handler> handlers;
    Socket* socket;
};

struct Options {
    int port;
};

void Server::run(int port) {
    for (auto& h : handlers) {
        if (h.ready() && port > 0) {
            h.handle();
        }
    }
    socket->listen(port);
}

}  // namespace app
"#;

    #[test]
    fn test_cpp_symbols() {
        let plugin = CppPlugin::create().unwrap();
        let parsed = run(&plugin, "src/server.cpp", SOURCE);

        assert_eq!(symbol(&parsed, "app").kind, SymbolKind::Module);
        assert_eq!(symbol(&parsed, "app.Server").kind, SymbolKind::Class);
        assert_eq!(symbol(&parsed, "app.Server.Server").visibility, Visibility::Public);
        assert_eq!(symbol(&parsed, "app.Server.handlers").visibility, Visibility::Private);
        assert_eq!(symbol(&parsed, "app.Options.port").visibility, Visibility::Public);

        // Declared in the class, defined out of line.
        let runs: Vec<_> = parsed
            .symbols
            .iter()
            .filter(|s| s.qualified_name == "app.Server.run")
            .collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].visibility, Visibility::Public);
        assert_eq!(runs[1].parent.as_deref(), Some("app.Server"));
        assert_eq!(runs[1].complexity, Some(4));
    }

    #[test]
    fn test_cpp_dependencies() {
        let plugin = CppPlugin::create().unwrap();
        let parsed = run(&plugin, "src/server.cpp", SOURCE);

        assert_eq!(
            targets(&parsed, DependencyKind::Import),
            vec!["vector", "net.socket"]
        );
        assert_eq!(
            targets(&parsed, DependencyKind::Inheritance),
            vec!["Base", "Logger"]
        );
        assert_eq!(
            targets(&parsed, DependencyKind::Composition),
            vec!["Handler", "Socket"]
        );
        let calls = targets(&parsed, DependencyKind::Call);
        assert!(calls.contains(&"h.ready"));
        assert!(calls.contains(&"socket.listen"));
    }
}
