//! Python grammar rules.

use std::path::Path;

use tree_sitter::Node;

use crate::analysis::treesitter::{
    callee, descendants_of_kind, dotted, leading_comments, resolve_dot_import, text, Declared,
    Grammar, Scope, TreeSitterPlugin,
};
use crate::analysis::{ParsedFile, SymbolKind, Visibility};
use crate::language::Language;

const IMPORT_QUERY: &str = r#"
(import_statement) @import
(import_from_statement) @import
"#;

const CONTROL_FLOW_QUERY: &str = r#"
(if_statement) @if
(elif_clause) @if
(for_statement) @loop
(while_statement) @loop
(conditional_expression) @ternary
(boolean_operator operator: "and") @and
(boolean_operator operator: "or") @or
(except_clause) @catch
(case_clause) @case
"#;

/// Annotation names that say nothing about composition.
const BUILTIN_TYPES: &[&str] = &[
    "int", "str", "float", "bool", "bytes", "list", "dict", "set", "tuple", "object", "None",
    "Optional", "List", "Dict", "Set", "Tuple", "Any", "Union", "Callable", "ClassVar",
    "Sequence", "Mapping", "Iterable", "Iterator", "Type",
];

pub struct PythonGrammar;

pub type PythonPlugin = TreeSitterPlugin<PythonGrammar>;

impl PythonPlugin {
    pub fn create() -> anyhow::Result<Self> {
        TreeSitterPlugin::new(PythonGrammar)
    }
}

impl PythonGrammar {
    fn docstring(body: Node, source: &[u8]) -> Option<String> {
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string = first.named_child(0).filter(|n| n.kind() == "string")?;
        let raw = text(string, source)
            .trim_start_matches(|c: char| "rRuUbBfF".contains(c))
            .trim_matches(|c| c == '"' || c == '\'');
        let doc = raw
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
        (!doc.is_empty()).then_some(doc)
    }

    fn is_package(path: &Path) -> bool {
        path.file_name().is_some_and(|n| n == "__init__.py")
    }
}

impl Grammar for PythonGrammar {
    fn language(&self) -> Language {
        Language::Python
    }

    fn dialects(&self) -> Vec<tree_sitter::Language> {
        vec![tree_sitter_python::LANGUAGE.into()]
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
        let body = node.child_by_field_name("body");
        match node.kind() {
            "function_definition" => {
                let name = text(node.child_by_field_name("name")?, source);
                Some(Declared::new(name, SymbolKind::Function, node).with_body(body))
            }
            "class_definition" => {
                let name = text(node.child_by_field_name("name")?, source);
                Some(Declared::new(name, SymbolKind::Class, node).with_body(body))
            }
            "assignment" if scope.at_module_level() || scope.in_type() => {
                // Only plain `NAME = ...` / `NAME: T` statements.
                if node.parent()?.kind() != "expression_statement" {
                    return None;
                }
                let left = node.child_by_field_name("left")?;
                if left.kind() != "identifier" {
                    return None;
                }
                Some(Declared::new(text(left, source), SymbolKind::Variable, node))
            }
            _ => None,
        }
    }

    fn visibility(&self, decl: &Declared, _source: &[u8], _scope: &Scope) -> Visibility {
        let name = decl.name.as_str();
        if name.starts_with("__") && name.ends_with("__") {
            Visibility::Public
        } else if name.starts_with("__") {
            Visibility::Private
        } else if name.starts_with('_') {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }

    fn import_targets(&self, node: Node, source: &[u8], parsed: &ParsedFile) -> Vec<String> {
        let mut cursor = node.walk();
        let names: Vec<String> = node
            .children_by_field_name("name", &mut cursor)
            .filter_map(|n| match n.kind() {
                "aliased_import" => n.child_by_field_name("name"),
                _ => Some(n),
            })
            .map(|n| dotted(text(n, source)))
            .collect();

        if node.kind() == "import_statement" {
            return names;
        }

        let Some(module) = node.child_by_field_name("module_name") else {
            return Vec::new();
        };
        let spec = text(module, source);
        let resolved = resolve_dot_import(spec, &parsed.module_id, Self::is_package(&parsed.path));
        if module.kind() == "relative_import" && spec.chars().all(|c| c == '.') {
            // `from . import a, b` imports sibling modules.
            return names
                .into_iter()
                .map(|name| {
                    if resolved.is_empty() {
                        name
                    } else {
                        format!("{}.{}", resolved, name)
                    }
                })
                .collect();
        }
        vec![resolved]
    }

    fn call_target(&self, node: Node, source: &[u8]) -> Option<String> {
        if node.kind() != "call" {
            return None;
        }
        callee(text(node.child_by_field_name("function")?, source))
    }

    fn supertypes<'t>(&self, decl: &Declared<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        let Some(bases) = decl.node.child_by_field_name("superclasses") else {
            return Vec::new();
        };
        let mut cursor = bases.walk();
        let found = bases
            .named_children(&mut cursor)
            .filter(|n| matches!(n.kind(), "identifier" | "attribute"))
            .map(|n| (dotted(text(n, source)), n))
            .filter(|(name, _)| name != "object")
            .collect();
        found
    }

    fn field_types<'t>(&self, node: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        if node.kind() != "assignment" {
            return Vec::new();
        }
        let Some(annotation) = node.child_by_field_name("type") else {
            return Vec::new();
        };
        descendants_of_kind(annotation, &["identifier", "attribute"])
            .into_iter()
            .map(|n| (dotted(text(n, source)), n))
            .filter(|(name, _)| !BUILTIN_TYPES.contains(&name.as_str()))
            .collect()
    }

    fn documentation(&self, decl: &Declared, source: &[u8]) -> Option<String> {
        decl.body
            .and_then(|body| Self::docstring(body, source))
            .or_else(|| leading_comments(decl.node, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::languages::testing::{run, symbol, targets};
    use crate::analysis::DependencyKind;

    const SOURCE: &str = r#"
import os
from .models import User
from . import views

MAX_USERS = 10

class UserService(BaseService):
    """Manages users."""

    repo: UserRepository

    def __init__(self, repo):
        self.repo = repo

    def find(self, name):
        if name and self._valid(name):
            return self.repo.get(name)
        return None

    def _valid(self, name):
        return len(name) > 0

    def __secret(self):
        pass

def main():
    service = UserService(None)
    service.find("x")
"#;

    #[test]
    fn test_python_symbols() {
        let plugin = PythonPlugin::create().unwrap();
        let parsed = run(&plugin, "app/services.py", SOURCE);

        assert!(!parsed.partial);
        let class = symbol(&parsed, "UserService");
        assert_eq!(class.kind, SymbolKind::Class);
        assert_eq!(class.documentation.as_deref(), Some("Manages users."));
        assert_eq!(class.signature.as_deref(), Some("class UserService(BaseService)"));

        let find = symbol(&parsed, "UserService.find");
        assert_eq!(find.kind, SymbolKind::Function);
        assert_eq!(find.parent.as_deref(), Some("UserService"));
        // if + and
        assert_eq!(find.complexity, Some(3));

        assert_eq!(symbol(&parsed, "UserService._valid").visibility, Visibility::Protected);
        assert_eq!(symbol(&parsed, "UserService.__secret").visibility, Visibility::Private);
        assert_eq!(symbol(&parsed, "UserService.__init__").visibility, Visibility::Public);
        assert_eq!(symbol(&parsed, "MAX_USERS").kind, SymbolKind::Variable);
        assert_eq!(symbol(&parsed, "main").parent, None);
    }

    #[test]
    fn test_python_dependencies() {
        let plugin = PythonPlugin::create().unwrap();
        let parsed = run(&plugin, "app/services.py", SOURCE);

        assert_eq!(
            targets(&parsed, DependencyKind::Import),
            vec!["os", "app.models", "app.views"]
        );
        assert_eq!(targets(&parsed, DependencyKind::Inheritance), vec!["BaseService"]);
        assert_eq!(targets(&parsed, DependencyKind::Composition), vec!["UserRepository"]);

        let calls = targets(&parsed, DependencyKind::Call);
        assert!(calls.contains(&"_valid"));
        assert!(calls.contains(&"UserService"));
        assert!(calls.contains(&"service.find"));

        let inherit = parsed
            .dependencies
            .iter()
            .find(|d| d.kind == DependencyKind::Inheritance)
            .unwrap();
        assert_eq!(inherit.source, "app.services.UserService");
    }

    #[test]
    fn test_python_syntax_error_is_partial() {
        let plugin = PythonPlugin::create().unwrap();
        let parsed = run(&plugin, "broken.py", "def ok():\n    pass\n\ndef broken(:\n");
        assert!(parsed.partial);
        assert!(parsed.symbols.iter().any(|s| s.name == "ok"));
    }

    #[test]
    fn test_package_relative_import() {
        let plugin = PythonPlugin::create().unwrap();
        let parsed = run(&plugin, "pkg/__init__.py", "from .core import run\n");
        assert_eq!(parsed.module_id, "pkg");
        assert_eq!(targets(&parsed, DependencyKind::Import), vec!["pkg.core"]);
    }
}
