//! Scala grammar rules.

use tree_sitter::Node;

use crate::analysis::treesitter::{
    callee, child_of_kind, descendants_of_kind, dotted, text, Declared, Grammar, Scope,
    TreeSitterPlugin,
};
use crate::analysis::{ParsedFile, SymbolKind, Visibility};
use crate::language::Language;

const IMPORT_QUERY: &str = r#"
; import scala.collection.mutable
; import com.acme.{Order, Customer => Client}
(import_declaration) @import
"#;

// Handlers of a `catch` are counted through their case clauses.
const CONTROL_FLOW_QUERY: &str = r#"
(if_expression) @if
(for_expression) @loop
(while_expression) @loop
(case_clause) @case
"#;

/// Standard library types; never composition targets.
const STANDARD_TYPES: &[&str] = &[
    "String", "Int", "Long", "Double", "Float", "Boolean", "Char", "Byte", "Short", "Unit", "Any",
    "AnyRef", "Option", "List", "Seq", "Vector", "Map", "Set", "Future", "Either", "Array",
];

const TYPE_NAME_KINDS: &[&str] = &["type_identifier", "stable_type_identifier", "type_arguments"];

pub struct ScalaGrammar;

pub type ScalaPlugin = TreeSitterPlugin<ScalaGrammar>;

impl ScalaPlugin {
    pub fn create() -> anyhow::Result<Self> {
        TreeSitterPlugin::new(ScalaGrammar)
    }
}

impl ScalaGrammar {
    fn type_names<'t>(node: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        descendants_of_kind(node, TYPE_NAME_KINDS)
            .into_iter()
            .filter(|n| n.kind() != "type_arguments")
            .map(|n| (dotted(text(n, source)), n))
            .collect()
    }
}

/// Every path named by one `import` clause.
///
/// Wildcards import the enclosing package; selectors expand against their
/// prefix and renames keep the original name.
pub fn import_paths(clause: &str) -> Vec<String> {
    let body = clause.trim().strip_prefix("import").unwrap_or(clause).trim();

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);

    let mut paths = Vec::new();
    for part in parts {
        let part = part.trim();
        match part.split_once('{') {
            Some((prefix, selectors)) => {
                let prefix = dotted(prefix);
                for selector in selectors.trim_end_matches('}').split(',') {
                    let name = selector
                        .split("=>")
                        .next()
                        .unwrap_or("")
                        .split(" as ")
                        .next()
                        .unwrap_or("")
                        .trim();
                    match name {
                        "" => {}
                        "_" | "*" => paths.push(prefix.clone()),
                        name => paths.push(format!("{}.{}", prefix, name)),
                    }
                }
            }
            None => {
                let path = part.split(" as ").next().unwrap_or(part).trim();
                let path = path
                    .strip_suffix("._")
                    .or_else(|| path.strip_suffix(".*"))
                    .unwrap_or(path);
                paths.push(dotted(path));
            }
        }
    }
    paths.retain(|p| !p.is_empty());
    paths
}

impl Grammar for ScalaGrammar {
    fn language(&self) -> Language {
        Language::Scala
    }

    fn dialects(&self) -> Vec<tree_sitter::Language> {
        vec![tree_sitter_scala::LANGUAGE.into()]
    }

    fn import_query(&self) -> &'static str {
        IMPORT_QUERY
    }

    fn control_flow_query(&self) -> &'static str {
        CONTROL_FLOW_QUERY
    }

    fn nesting_kinds(&self) -> &'static [&'static str] {
        &["block", "template_body", "case_block"]
    }

    fn classify<'t>(&self, node: Node<'t>, source: &[u8], scope: &Scope) -> Option<Declared<'t>> {
        let name = || node.child_by_field_name("name").map(|n| text(n, source));
        let body = node.child_by_field_name("body");
        let kind = match node.kind() {
            "class_definition" | "object_definition" => SymbolKind::Class,
            "trait_definition" => SymbolKind::Interface,
            "function_definition" | "function_declaration" => SymbolKind::Function,
            "val_definition" | "var_definition" | "val_declaration" | "var_declaration"
                if scope.in_type() || scope.at_module_level() =>
            {
                let pattern = node
                    .child_by_field_name("pattern")
                    .or_else(|| node.child_by_field_name("name"))?;
                if pattern.kind() != "identifier" {
                    return None;
                }
                return Some(Declared::new(text(pattern, source), SymbolKind::Variable, node));
            }
            _ => return None,
        };
        Some(Declared::new(name()?, kind, node).with_body(body))
    }

    fn visibility(&self, decl: &Declared, source: &[u8], _scope: &Scope) -> Visibility {
        let modifiers = child_of_kind(decl.node, "modifiers").map(|m| text(m, source));
        let has = |word: &str| {
            modifiers.is_some_and(|m| {
                m.split(|c: char| !c.is_alphanumeric())
                    .any(|token| token == word)
            })
        };
        if has("private") {
            Visibility::Private
        } else if has("protected") {
            Visibility::Protected
        } else {
            Visibility::Public
        }
    }

    fn import_targets(&self, node: Node, source: &[u8], _parsed: &ParsedFile) -> Vec<String> {
        import_paths(text(node, source))
    }

    fn call_target(&self, node: Node, source: &[u8]) -> Option<String> {
        match node.kind() {
            "call_expression" => callee(text(node.child_by_field_name("function")?, source)),
            "instance_expression" => {
                let ty = descendants_of_kind(node, TYPE_NAME_KINDS)
                    .into_iter()
                    .find(|n| n.kind() != "type_arguments")?;
                callee(text(ty, source))
            }
            _ => None,
        }
    }

    fn supertypes<'t>(&self, decl: &Declared<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        match child_of_kind(decl.node, "extends_clause") {
            Some(extends) if decl.kind.is_type() => Self::type_names(extends, source),
            _ => Vec::new(),
        }
    }

    fn field_types<'t>(&self, node: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        if !matches!(
            node.kind(),
            "class_parameter" | "val_definition" | "var_definition" | "val_declaration" | "var_declaration"
        ) {
            return Vec::new();
        }
        let Some(ty) = node.child_by_field_name("type") else {
            return Vec::new();
        };
        Self::type_names(ty, source)
            .into_iter()
            .filter(|(name, _)| !STANDARD_TYPES.contains(&name.as_str()))
            .collect()
    }
}
