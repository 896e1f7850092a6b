//! C grammar rules, with declarator helpers shared by C++.

use tree_sitter::Node;

use crate::analysis::treesitter::{
    callee, descendants_of_kind, dotted, resolve_path_import, text, unquote, Declared, Grammar,
    Scope, TreeSitterPlugin,
};
use crate::analysis::{ParsedFile, SymbolKind, Visibility};
use crate::language::Language;

const IMPORT_QUERY: &str = r#"
; #include <header.h> / #include "header.h"
(preproc_include
  path: (_) @import
)
"#;

const CONTROL_FLOW_QUERY: &str = r#"
(if_statement) @if
(for_statement) @loop
(while_statement) @loop
(do_statement) @loop
(case_statement) @case
(conditional_expression) @ternary
(binary_expression operator: "&&") @and
(binary_expression operator: "||") @or
"#;

pub(super) const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx"];

pub struct CGrammar;

pub type CPlugin = TreeSitterPlugin<CGrammar>;

impl CPlugin {
    pub fn create() -> anyhow::Result<Self> {
        TreeSitterPlugin::new(CGrammar)
    }
}

/// Name declared by a declarator chain, with any `A::B::` qualifier in
/// dotted form.
pub(super) fn declarator_name(node: Node, source: &[u8]) -> Option<(String, Option<String>)> {
    let mut current = node;
    loop {
        match current.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "destructor_name"
            | "operator_name" | "primitive_type" => {
                return Some((text(current, source).to_string(), None));
            }
            "qualified_identifier" => {
                let scope = current
                    .child_by_field_name("scope")
                    .map(|s| dotted(text(s, source)));
                let (name, inner) = declarator_name(current.child_by_field_name("name")?, source)?;
                let qualifier = match (scope, inner) {
                    (Some(outer), Some(inner)) => Some(format!("{}.{}", outer, inner)),
                    (outer, inner) => outer.or(inner),
                };
                return Some((name, qualifier));
            }
            "template_function" | "template_type" => {
                current = current.child_by_field_name("name")?;
            }
            // `&x` has no field name for its inner declarator.
            "reference_declarator" => current = current.named_child(0)?,
            _ => current = current.child_by_field_name("declarator")?,
        }
    }
}

/// Whether a declarator chain declares a function.
pub(super) fn declares_function(node: Node) -> bool {
    let mut current = Some(node);
    while let Some(n) = current {
        if n.kind() == "function_declarator" {
            return true;
        }
        current = match n.kind() {
            "reference_declarator" => n.named_child(0),
            _ => n.child_by_field_name("declarator"),
        };
    }
    false
}

/// Whether a declaration carries the `static` storage class.
pub(super) fn is_static(node: Node, source: &[u8]) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| c.kind() == "storage_class_specifier" && text(c, source) == "static");
    found
}

pub(super) fn include_targets(node: Node, source: &[u8], parsed: &ParsedFile) -> Vec<String> {
    let spec = unquote(text(node, source));
    if spec.is_empty() {
        return Vec::new();
    }
    vec![resolve_path_import(spec, &parsed.path, HEADER_EXTENSIONS)]
}

/// Declarations common to C and C++: functions, variables, records, typedefs.
pub(super) fn classify_c_family<'t>(
    node: Node<'t>,
    source: &[u8],
    scope: &Scope,
) -> Option<Declared<'t>> {
    match node.kind() {
        "function_definition" => {
            let (name, qualifier) = declarator_name(node.child_by_field_name("declarator")?, source)?;
            Some(
                Declared::new(name, SymbolKind::Function, node)
                    .with_body(node.child_by_field_name("body"))
                    .qualified_by(qualifier),
            )
        }
        "struct_specifier" | "union_specifier" | "enum_specifier" => {
            let body = node.child_by_field_name("body")?;
            let name = text(node.child_by_field_name("name")?, source);
            let kind = if node.kind() == "enum_specifier" {
                SymbolKind::Other
            } else {
                SymbolKind::Class
            };
            Some(Declared::new(name, kind, node).with_body(Some(body)))
        }
        "type_definition" => {
            let (name, _) = declarator_name(node.child_by_field_name("declarator")?, source)?;
            Some(Declared::new(name, SymbolKind::Other, node))
        }
        "declaration" if scope.at_module_level() => {
            let declarator = node.child_by_field_name("declarator")?;
            let (name, qualifier) = declarator_name(declarator, source)?;
            let kind = if declares_function(declarator) {
                SymbolKind::Function
            } else {
                SymbolKind::Variable
            };
            Some(Declared::new(name, kind, node).qualified_by(qualifier))
        }
        "field_declaration" if scope.in_type() => {
            let declarator = node.child_by_field_name("declarator")?;
            let (name, _) = declarator_name(declarator, source)?;
            let kind = if declares_function(declarator) {
                SymbolKind::Function
            } else {
                SymbolKind::Variable
            };
            Some(Declared::new(name, kind, node))
        }
        _ => None,
    }
}

pub(super) fn c_call(node: Node, source: &[u8]) -> Option<String> {
    if node.kind() != "call_expression" {
        return None;
    }
    let mut function = node.child_by_field_name("function")?;
    if function.kind() == "template_function" {
        function = function.child_by_field_name("name")?;
    }
    callee(text(function, source))
}

/// Type names referenced by a field (non-method) declaration.
pub(super) fn field_type_names<'t>(
    node: Node<'t>,
    source: &[u8],
    ignored: &[&str],
) -> Vec<(String, Node<'t>)> {
    if node.kind() != "field_declaration" {
        return Vec::new();
    }
    if node
        .child_by_field_name("declarator")
        .is_some_and(declares_function)
    {
        return Vec::new();
    }
    let Some(ty) = node.child_by_field_name("type") else {
        return Vec::new();
    };
    descendants_of_kind(ty, &["type_identifier"])
        .into_iter()
        .map(|n| (text(n, source).to_string(), n))
        .filter(|(name, _)| !ignored.contains(&name.as_str()))
        .collect()
}

impl Grammar for CGrammar {
    fn language(&self) -> Language {
        Language::C
    }

    fn dialects(&self) -> Vec<tree_sitter::Language> {
        vec![tree_sitter_c::LANGUAGE.into()]
    }

    fn import_query(&self) -> &'static str {
        IMPORT_QUERY
    }

    fn control_flow_query(&self) -> &'static str {
        CONTROL_FLOW_QUERY
    }

    fn nesting_kinds(&self) -> &'static [&'static str] {
        &["compound_statement"]
    }

    fn classify<'t>(&self, node: Node<'t>, source: &[u8], scope: &Scope) -> Option<Declared<'t>> {
        classify_c_family(node, source, scope)
    }

    fn visibility(&self, decl: &Declared, source: &[u8], scope: &Scope) -> Visibility {
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

    fn field_types<'t>(&self, node: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        field_type_names(node, source, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::languages::testing::{run, symbol, targets};
    use crate::analysis::DependencyKind;

    const SOURCE: &str = r#"
#include <stdio.h>
#include "util/buffer.h"

struct conn {
    struct buffer *in;
    int fd;
};

static int counter = 0;

int conn_open(struct conn *c, const char *host);

/* Reads one frame. */
static int read_frame(struct conn *c) {
    for (int i = 0; i < 3 && c->fd > 0; i++) {
        if (buffer_fill(c->in) < 0) {
            return -1;
        }
    }
    return 0;
}
"#;

    #[test]
    fn test_c_symbols() {
        let plugin = CPlugin::create().unwrap();
        let parsed = run(&plugin, "src/conn.c", SOURCE);

        assert_eq!(symbol(&parsed, "conn").kind, SymbolKind::Class);
        assert_eq!(symbol(&parsed, "conn.fd").kind, SymbolKind::Variable);
        assert_eq!(symbol(&parsed, "counter").visibility, Visibility::Private);
        assert_eq!(symbol(&parsed, "conn_open").kind, SymbolKind::Function);
        assert_eq!(symbol(&parsed, "conn_open").visibility, Visibility::Public);

        let read = symbol(&parsed, "read_frame");
        assert_eq!(read.visibility, Visibility::Private);
        assert_eq!(read.documentation.as_deref(), Some("Reads one frame."));
        assert_eq!(read.complexity, Some(4));
    }

    #[test]
    fn test_c_dependencies() {
        let plugin = CPlugin::create().unwrap();
        let parsed = run(&plugin, "src/conn.c", SOURCE);

        assert_eq!(
            targets(&parsed, DependencyKind::Import),
            vec!["stdio", "util.buffer"]
        );
        assert_eq!(targets(&parsed, DependencyKind::Composition), vec!["buffer"]);
        assert_eq!(targets(&parsed, DependencyKind::Call), vec!["buffer_fill"]);
    }
}
