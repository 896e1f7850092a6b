//! Java grammar rules.

use tree_sitter::Node;

use crate::analysis::treesitter::{
    callee, child_of_kind, descendants_of_kind, dotted, text, Declared, Grammar, Scope,
    TreeSitterPlugin,
};
use crate::analysis::{ParsedFile, SymbolKind, Visibility};
use crate::language::Language;

const IMPORT_QUERY: &str = r#"
; import com.package.Class;
; import static com.package.Class.method;
(import_declaration) @import
"#;

const CONTROL_FLOW_QUERY: &str = r#"
(if_statement) @if
(for_statement) @loop
(enhanced_for_statement) @loop
(while_statement) @loop
(do_statement) @loop
(switch_block_statement_group) @case
(ternary_expression) @ternary
(binary_expression operator: "&&") @and
(binary_expression operator: "||") @or
(catch_clause) @catch
"#;

/// `java.lang` and collection types; never composition targets.
const PLATFORM_TYPES: &[&str] = &[
    "String", "Integer", "Long", "Double", "Float", "Boolean", "Character", "Byte", "Short",
    "Object", "List", "Map", "Set", "Optional", "Collection", "ArrayList", "HashMap", "HashSet",
];

const TYPE_NAME_KINDS: &[&str] = &["type_identifier", "scoped_type_identifier", "type_arguments"];

pub struct JavaGrammar;

pub type JavaPlugin = TreeSitterPlugin<JavaGrammar>;

impl JavaPlugin {
    pub fn create() -> anyhow::Result<Self> {
        TreeSitterPlugin::new(JavaGrammar)
    }
}

impl JavaGrammar {
    fn type_names<'t>(node: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        descendants_of_kind(node, TYPE_NAME_KINDS)
            .into_iter()
            .filter(|n| n.kind() != "type_arguments")
            .map(|n| (dotted(text(n, source)), n))
            .collect()
    }
}

impl Grammar for JavaGrammar {
    fn language(&self) -> Language {
        Language::Java
    }

    fn dialects(&self) -> Vec<tree_sitter::Language> {
        vec![tree_sitter_java::LANGUAGE.into()]
    }

    fn import_query(&self) -> &'static str {
        IMPORT_QUERY
    }

    fn control_flow_query(&self) -> &'static str {
        CONTROL_FLOW_QUERY
    }

    fn nesting_kinds(&self) -> &'static [&'static str] {
        &["block", "class_body", "interface_body"]
    }

    fn classify<'t>(&self, node: Node<'t>, source: &[u8], scope: &Scope) -> Option<Declared<'t>> {
        let name = || node.child_by_field_name("name").map(|n| text(n, source));
        let body = node.child_by_field_name("body");
        let kind = match node.kind() {
            "class_declaration" | "enum_declaration" | "record_declaration" => SymbolKind::Class,
            "interface_declaration" | "annotation_type_declaration" => SymbolKind::Interface,
            "method_declaration" | "constructor_declaration" => SymbolKind::Function,
            "field_declaration" | "constant_declaration" if scope.in_type() => {
                let declarator = node.child_by_field_name("declarator")?;
                let field = declarator.child_by_field_name("name")?;
                return Some(Declared::new(text(field, source), SymbolKind::Variable, node));
            }
            _ => return None,
        };
        Some(Declared::new(name()?, kind, node).with_body(body))
    }

    fn visibility(&self, decl: &Declared, source: &[u8], scope: &Scope) -> Visibility {
        let modifiers = child_of_kind(decl.node, "modifiers").map(|m| text(m, source));
        let has = |word: &str| {
            modifiers.is_some_and(|m| m.split_whitespace().any(|token| token == word))
        };
        if has("public") {
            Visibility::Public
        } else if has("private") {
            Visibility::Private
        } else if has("protected") {
            Visibility::Protected
        } else if scope.innermost().is_some_and(|f| f.kind == SymbolKind::Interface) {
            // Interface members are implicitly public.
            Visibility::Public
        } else {
            Visibility::Package
        }
    }

    fn import_targets(&self, node: Node, source: &[u8], _parsed: &ParsedFile) -> Vec<String> {
        let mut cursor = node.walk();
        let path = node
            .named_children(&mut cursor)
            .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
            .map(|c| dotted(text(c, source)));
        path.into_iter().collect()
    }

    fn call_target(&self, node: Node, source: &[u8]) -> Option<String> {
        match node.kind() {
            "method_invocation" => {
                let name = text(node.child_by_field_name("name")?, source);
                match node.child_by_field_name("object") {
                    Some(object) => callee(&format!("{}.{}", text(object, source), name)),
                    None => callee(name),
                }
            }
            "object_creation_expression" => {
                let ty = node.child_by_field_name("type")?;
                let base = descendants_of_kind(ty, TYPE_NAME_KINDS)
                    .into_iter()
                    .find(|n| n.kind() != "type_arguments")
                    .unwrap_or(ty);
                callee(text(base, source))
            }
            _ => None,
        }
    }

    fn supertypes<'t>(&self, decl: &Declared<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        let node = decl.node;
        let mut names = Vec::new();
        match node.kind() {
            "class_declaration" | "enum_declaration" | "record_declaration" => {
                if let Some(superclass) = node.child_by_field_name("superclass") {
                    names.extend(Self::type_names(superclass, source));
                }
                if let Some(interfaces) = node.child_by_field_name("interfaces") {
                    names.extend(Self::type_names(interfaces, source));
                }
            }
            "interface_declaration" => {
                if let Some(extends) = child_of_kind(node, "extends_interfaces") {
                    names.extend(Self::type_names(extends, source));
                }
            }
            _ => {}
        }
        names
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
            .map(|n| (dotted(text(n, source)), n))
            .filter(|(name, _)| !PLATFORM_TYPES.contains(&name.as_str()))
            .collect()
    }
}
