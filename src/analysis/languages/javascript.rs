//! JavaScript grammar rules, shared in part with TypeScript.

use tree_sitter::Node;

use crate::analysis::treesitter::{
    callee, descendants_of_kind, dotted, resolve_path_import, text, unquote,
    Declared, Grammar, Scope, TreeSitterPlugin,
};
use crate::analysis::{ParsedFile, SymbolKind, Visibility};
use crate::language::Language;

const IMPORT_QUERY: &str = r#"
; import x from 'module'
(import_statement
  source: (string) @import
)

; export * from 'module'
(export_statement
  source: (string) @import
)

; require('module')
(call_expression
  function: (identifier) @_require (#eq? @_require "require")
  arguments: (arguments (string) @import)
)
"#;

const CONTROL_FLOW_QUERY: &str = r#"
(if_statement) @if
(for_statement) @loop
(for_in_statement) @loop
(while_statement) @loop
(do_statement) @loop
(switch_case) @case
(ternary_expression) @ternary
(binary_expression operator: "&&") @and
(binary_expression operator: "||") @or
(binary_expression operator: "??") @or
(catch_clause) @catch
"#;

/// Extensions stripped from relative import specifiers.
pub(super) const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

pub(super) const NESTING_KINDS: &[&str] = &["statement_block", "class_body"];

pub struct JavaScriptGrammar;

pub type JavaScriptPlugin = TreeSitterPlugin<JavaScriptGrammar>;

impl JavaScriptPlugin {
    pub fn create() -> anyhow::Result<Self> {
        TreeSitterPlugin::new(JavaScriptGrammar)
    }
}

/// Declarations common to JavaScript and TypeScript.
pub(super) fn classify_script<'t>(
    node: Node<'t>,
    source: &[u8],
    scope: &Scope,
) -> Option<Declared<'t>> {
    let name = node.child_by_field_name("name").map(|n| text(n, source));
    let body = node.child_by_field_name("body");
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            Some(Declared::new(name?, SymbolKind::Function, node).with_body(body))
        }
        "class_declaration" | "class" => {
            Some(Declared::new(name?, SymbolKind::Class, node).with_body(body))
        }
        "method_definition" => Some(Declared::new(name?, SymbolKind::Function, node).with_body(body)),
        "field_definition" => {
            let property = node.child_by_field_name("property")?;
            Some(Declared::new(text(property, source), SymbolKind::Variable, node))
        }
        "variable_declarator" => {
            let name_node = node.child_by_field_name("name")?;
            if name_node.kind() != "identifier" {
                return None;
            }
            let value = node.child_by_field_name("value");
            let is_function = value.is_some_and(|v| {
                matches!(
                    v.kind(),
                    "arrow_function" | "function_expression" | "function" | "generator_function"
                )
            });
            if is_function {
                let body = value.and_then(|v| v.child_by_field_name("body"));
                Some(
                    Declared::new(text(name_node, source), SymbolKind::Function, node)
                        .with_body(body),
                )
            } else if scope.at_module_level() {
                Some(Declared::new(text(name_node, source), SymbolKind::Variable, node))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Whether a declaration is exported from its module.
fn is_exported(node: Node) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        match parent.kind() {
            "export_statement" => return true,
            "lexical_declaration" | "variable_declaration" => current = parent.parent(),
            _ => return false,
        }
    }
    false
}

/// Visibility common to JavaScript and TypeScript.
pub(super) fn script_visibility(decl: &Declared, source: &[u8], scope: &Scope) -> Visibility {
    if decl.name.starts_with('#') {
        return Visibility::Private;
    }
    let mut cursor = decl.node.walk();
    let modifier = decl
        .node
        .children(&mut cursor)
        .find(|c| c.kind() == "accessibility_modifier")
        .map(|m| text(m, source));
    match modifier {
        Some("private") => return Visibility::Private,
        Some("protected") => return Visibility::Protected,
        Some(_) => return Visibility::Public,
        None => {}
    }
    if scope.in_type() || is_exported(decl.node) {
        Visibility::Public
    } else {
        Visibility::Package
    }
}

pub(super) fn script_imports(node: Node, source: &[u8], parsed: &ParsedFile) -> Vec<String> {
    let spec = unquote(text(node, source));
    if spec.is_empty() {
        return Vec::new();
    }
    vec![resolve_path_import(spec, &parsed.path, SCRIPT_EXTENSIONS)]
}

pub(super) fn script_call(node: Node, source: &[u8]) -> Option<String> {
    let function = match node.kind() {
        "call_expression" => node.child_by_field_name("function")?,
        "new_expression" => node.child_by_field_name("constructor")?,
        _ => return None,
    };
    // `require(..)` and `import(..)` are imports, not calls.
    if function.kind() == "import" || text(function, source) == "require" {
        return None;
    }
    callee(text(function, source))
}

/// Names in an `extends`/`implements` clause, without type arguments.
pub(super) fn heritage_names<'t>(clause: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
    descendants_of_kind(
        clause,
        &[
            "identifier",
            "type_identifier",
            "member_expression",
            "nested_type_identifier",
            "type_arguments",
            "arguments",
        ],
    )
    .into_iter()
    .filter(|n| !matches!(n.kind(), "type_arguments" | "arguments"))
    .map(|n| (dotted(text(n, source)), n))
    .collect()
}

pub(super) fn script_supertypes<'t>(decl: &Declared<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
    let node = decl.node;
    if !matches!(node.kind(), "class_declaration" | "class" | "abstract_class_declaration") {
        return Vec::new();
    }
    let mut cursor = node.walk();
    let heritage = node
        .children(&mut cursor)
        .find(|c| c.kind() == "class_heritage");
    heritage
        .map(|h| heritage_names(h, source))
        .unwrap_or_default()
}

impl Grammar for JavaScriptGrammar {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn dialects(&self) -> Vec<tree_sitter::Language> {
        vec![tree_sitter_javascript::LANGUAGE.into()]
    }

    fn import_query(&self) -> &'static str {
        IMPORT_QUERY
    }

    fn control_flow_query(&self) -> &'static str {
        CONTROL_FLOW_QUERY
    }

    fn nesting_kinds(&self) -> &'static [&'static str] {
        NESTING_KINDS
    }

    fn classify<'t>(&self, node: Node<'t>, source: &[u8], scope: &Scope) -> Option<Declared<'t>> {
        classify_script(node, source, scope)
    }

    fn visibility(&self, decl: &Declared, source: &[u8], scope: &Scope) -> Visibility {
        script_visibility(decl, source, scope)
    }

    fn import_targets(&self, node: Node, source: &[u8], parsed: &ParsedFile) -> Vec<String> {
        script_imports(node, source, parsed)
    }

    fn call_target(&self, node: Node, source: &[u8]) -> Option<String> {
        script_call(node, source)
    }

    fn supertypes<'t>(&self, decl: &Declared<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        script_supertypes(decl, source)
    }
}
