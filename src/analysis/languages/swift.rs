//! Swift grammar rules.

use tree_sitter::Node;

use crate::analysis::treesitter::{
    callee, child_of_kind, descendants_of_kind, dotted, text, Declared, Grammar, Scope,
    TreeSitterPlugin,
};
use crate::analysis::{ParsedFile, SymbolKind, Visibility};
use crate::language::Language;

const IMPORT_QUERY: &str = r#"
; import Foundation
; @testable import Shop.Orders
(import_declaration) @import
"#;

const CONTROL_FLOW_QUERY: &str = r#"
(if_statement) @if
(guard_statement) @if
(for_statement) @loop
(while_statement) @loop
(repeat_while_statement) @loop
(switch_entry) @case
(ternary_expression) @ternary
(conjunction_expression) @and
(disjunction_expression) @or
(catch_block) @catch
"#;

/// Standard library types; never composition targets.
const STANDARD_TYPES: &[&str] = &[
    "String", "Int", "Int32", "Int64", "UInt", "Double", "Float", "Bool", "Character", "Data",
    "Date", "URL", "Array", "Dictionary", "Set", "Optional", "Any", "AnyObject", "Void",
];

const TYPE_NAME_KINDS: &[&str] = &["type_identifier", "type_arguments"];

pub struct SwiftGrammar;

pub type SwiftPlugin = TreeSitterPlugin<SwiftGrammar>;

impl SwiftPlugin {
    pub fn create() -> anyhow::Result<Self> {
        TreeSitterPlugin::new(SwiftGrammar)
    }
}

impl SwiftGrammar {
    fn type_names<'t>(node: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        descendants_of_kind(node, TYPE_NAME_KINDS)
            .into_iter()
            .filter(|n| n.kind() != "type_arguments")
            .map(|n| (text(n, source).to_string(), n))
            .collect()
    }

    /// `class`, `struct`, `enum`, `extension` or `actor`.
    fn declaration_kind<'t>(node: Node<'t>) -> Option<&'t str> {
        node.child_by_field_name("declaration_kind").map(|k| k.kind())
    }
}

impl Grammar for SwiftGrammar {
    fn language(&self) -> Language {
        Language::Swift
    }

    fn dialects(&self) -> Vec<tree_sitter::Language> {
        vec![tree_sitter_swift::LANGUAGE.into()]
    }

    fn import_query(&self) -> &'static str {
        IMPORT_QUERY
    }

    fn control_flow_query(&self) -> &'static str {
        CONTROL_FLOW_QUERY
    }

    fn nesting_kinds(&self) -> &'static [&'static str] {
        &[
            "class_body",
            "enum_class_body",
            "protocol_body",
            "function_body",
            "lambda_literal",
            "if_statement",
            "guard_statement",
            "for_statement",
            "while_statement",
            "switch_statement",
        ]
    }

    fn classify<'t>(&self, node: Node<'t>, source: &[u8], scope: &Scope) -> Option<Declared<'t>> {
        let name = || node.child_by_field_name("name").map(|n| text(n, source));
        let body = node.child_by_field_name("body");
        match node.kind() {
            "class_declaration" => {
                if Self::declaration_kind(node) == Some("extension") {
                    // Members of an extension belong to the extended type.
                    let extended = node.child_by_field_name("name")?;
                    let target = descendants_of_kind(extended, &["type_identifier"])
                        .first()
                        .map(|t| text(*t, source))?;
                    return Some(Declared::scope(target, node).with_body(body));
                }
                Some(Declared::new(name()?, SymbolKind::Class, node).with_body(body))
            }
            "protocol_declaration" => {
                Some(Declared::new(name()?, SymbolKind::Interface, node).with_body(body))
            }
            "function_declaration" | "protocol_function_declaration" => {
                Some(Declared::new(name()?, SymbolKind::Function, node).with_body(body))
            }
            "init_declaration" => {
                Some(Declared::new("init", SymbolKind::Function, node).with_body(body))
            }
            "property_declaration" if scope.in_type() || scope.at_module_level() => {
                let pattern = node.child_by_field_name("name")?;
                let ident = descendants_of_kind(pattern, &["simple_identifier"]);
                let ident = ident.first().copied().unwrap_or(pattern);
                Some(Declared::new(text(ident, source), SymbolKind::Variable, node))
            }
            _ => None,
        }
    }

    fn visibility(&self, decl: &Declared, source: &[u8], _scope: &Scope) -> Visibility {
        let modifiers = child_of_kind(decl.node, "modifiers").map(|m| text(m, source));
        let has = |word: &str| {
            modifiers.is_some_and(|m| {
                m.split(|c: char| !c.is_alphanumeric())
                    .any(|token| token == word)
            })
        };
        if has("public") || has("open") {
            Visibility::Public
        } else if has("private") || has("fileprivate") {
            Visibility::Private
        } else {
            // `internal` is the default access level.
            Visibility::Package
        }
    }

    fn import_targets(&self, node: Node, source: &[u8], _parsed: &ParsedFile) -> Vec<String> {
        child_of_kind(node, "identifier")
            .map(|ident| dotted(text(ident, source)))
            .filter(|path| !path.is_empty())
            .into_iter()
            .collect()
    }

    fn call_target(&self, node: Node, source: &[u8]) -> Option<String> {
        if node.kind() != "call_expression" {
            return None;
        }
        callee(text(node.named_child(0)?, source))
    }

    fn supertypes<'t>(&self, decl: &Declared<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        if !decl.kind.is_type() {
            return Vec::new();
        }
        let mut cursor = decl.node.walk();
        let specifiers: Vec<Node<'t>> = decl
            .node
            .children(&mut cursor)
            .filter(|c| c.kind() == "inheritance_specifier")
            .collect();
        specifiers
            .into_iter()
            .flat_map(|spec| Self::type_names(spec, source))
            .collect()
    }

    fn field_types<'t>(&self, node: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        if node.kind() != "property_declaration" {
            return Vec::new();
        }
        let annotations = descendants_of_kind(node, &["type_annotation"]);
        let Some(&annotation) = annotations.first() else {
            return Vec::new();
        };
        Self::type_names(annotation, source)
            .into_iter()
            .filter(|(name, _)| !STANDARD_TYPES.contains(&name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::languages::testing::{run, symbol, targets};
    use crate::analysis::DependencyKind;

    const SOURCE: &str = r#"
import Foundation
import Shop

protocol Service {
    func place(order: Order) -> Bool
}

public class OrderService: BaseService, Service {
    private let repository: OrderRepository
    var pending: Int = 0

    init(repository: OrderRepository) {
        self.repository = repository
    }

    public func place(order: Order) -> Bool {
        guard order.isValid && pending < 10 else {
            return false
        }
        repository.save(order)
        return true
    }
}

extension OrderService {
    func reset() {
        pending = 0
    }
}

func makeService() -> OrderService {
    return OrderService(repository: OrderRepository())
}
"#;

    #[test]
    fn test_swift_symbols() {
        let plugin = SwiftPlugin::create().unwrap();
        let parsed = run(&plugin, "Sources/Shop/OrderService.swift", SOURCE);

        assert_eq!(symbol(&parsed, "Service").kind, SymbolKind::Interface);

        let service = symbol(&parsed, "OrderService");
        assert_eq!(service.kind, SymbolKind::Class);
        assert_eq!(service.visibility, Visibility::Public);

        assert_eq!(symbol(&parsed, "OrderService.repository").visibility, Visibility::Private);
        assert_eq!(symbol(&parsed, "OrderService.pending").visibility, Visibility::Package);
        assert_eq!(symbol(&parsed, "OrderService.init").kind, SymbolKind::Function);

        let place = symbol(&parsed, "OrderService.place");
        assert_eq!(place.visibility, Visibility::Public);
        assert_eq!(place.complexity, Some(3));

        let reset = symbol(&parsed, "OrderService.reset");
        assert_eq!(reset.parent.as_deref(), Some("OrderService"));
        assert_eq!(symbol(&parsed, "makeService").parent, None);
    }

    #[test]
    fn test_swift_dependencies() {
        let plugin = SwiftPlugin::create().unwrap();
        let parsed = run(&plugin, "Sources/Shop/OrderService.swift", SOURCE);

        assert_eq!(targets(&parsed, DependencyKind::Import), vec!["Foundation", "Shop"]);
        let supertypes = targets(&parsed, DependencyKind::Inheritance);
        assert!(supertypes.contains(&"BaseService"));
        assert!(supertypes.contains(&"Service"));
        assert!(targets(&parsed, DependencyKind::Composition).contains(&"OrderRepository"));

        let calls = targets(&parsed, DependencyKind::Call);
        assert!(calls.contains(&"repository.save"));
        assert!(calls.contains(&"OrderRepository"));
    }
}
