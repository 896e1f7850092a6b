//! TypeScript grammar rules (`.tsx` uses the TSX dialect).

use std::path::Path;

use tree_sitter::Node;

use super::javascript::{
    classify_script, heritage_names, script_call, script_imports, script_supertypes,
    script_visibility, NESTING_KINDS,
};
use crate::analysis::treesitter::{
    descendants_of_kind, dotted, text, unquote, Declared, Grammar, Scope, TreeSitterPlugin,
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

/// Built-in and utility types that say nothing about composition.
const BUILTIN_TYPES: &[&str] = &[
    "Array", "Map", "Set", "Record", "Promise", "Partial", "Readonly", "ReadonlyArray", "Date",
    "Error", "Omit", "Pick", "Required",
];

pub struct TypeScriptGrammar;

pub type TypeScriptPlugin = TreeSitterPlugin<TypeScriptGrammar>;

impl TypeScriptPlugin {
    pub fn create() -> anyhow::Result<Self> {
        TreeSitterPlugin::new(TypeScriptGrammar)
    }
}

impl Grammar for TypeScriptGrammar {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn dialects(&self) -> Vec<tree_sitter::Language> {
        vec![
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            tree_sitter_typescript::LANGUAGE_TSX.into(),
        ]
    }

    fn dialect_for(&self, path: &Path) -> usize {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsx") => 1,
            _ => 0,
        }
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
        let name = node.child_by_field_name("name").map(|n| text(n, source));
        let body = node.child_by_field_name("body");
        let kind = match node.kind() {
            "interface_declaration" => SymbolKind::Interface,
            "abstract_class_declaration" | "enum_declaration" => SymbolKind::Class,
            "type_alias_declaration" => SymbolKind::Other,
            "internal_module" | "module" => SymbolKind::Module,
            "method_signature" | "abstract_method_signature" | "function_signature" => {
                SymbolKind::Function
            }
            "public_field_definition" | "property_signature" => SymbolKind::Variable,
            _ => return classify_script(node, source, scope),
        };
        let name = dotted(unquote(name?));
        Some(Declared::new(name, kind, node).with_body(body))
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
        if decl.node.kind() == "interface_declaration" {
            let mut cursor = decl.node.walk();
            let extends = decl
                .node
                .children(&mut cursor)
                .find(|c| c.kind() == "extends_type_clause");
            return extends
                .map(|clause| heritage_names(clause, source))
                .unwrap_or_default();
        }
        script_supertypes(decl, source)
    }

    fn field_types<'t>(&self, node: Node<'t>, source: &[u8]) -> Vec<(String, Node<'t>)> {
        if node.kind() != "public_field_definition" {
            return Vec::new();
        }
        let Some(annotation) = node.child_by_field_name("type") else {
            return Vec::new();
        };
        descendants_of_kind(annotation, &["type_identifier", "nested_type_identifier"])
            .into_iter()
            .map(|n| (dotted(text(n, source)), n))
            .filter(|(name, _)| !BUILTIN_TYPES.contains(&name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::languages::testing::{run, symbol, targets};
    use crate::analysis::DependencyKind;

    const SOURCE: &str = r#"
import { Repository } from '../data/repository';
import type { User } from './models';

export interface Service extends Disposable {
  find(id: string): User | undefined;
}

export class UserService extends BaseService implements Service {
  private readonly repo: Repository<User>;
  protected cache: Map<string, User>;

  constructor(repo: Repository<User>) {
    super();
    this.repo = repo;
  }

  find(id: string): User | undefined {
    return this.repo.get(id) ?? this.lookup(id);
  }

  private lookup(id: string): User | undefined {
    return undefined;
  }
}

type UserId = string;
"#;

    #[test]
    fn test_typescript_symbols() {
        let plugin = TypeScriptPlugin::create().unwrap();
        let parsed = run(&plugin, "src/services/user.ts", SOURCE);

        assert!(!parsed.partial);
        assert_eq!(symbol(&parsed, "Service").kind, SymbolKind::Interface);
        assert_eq!(symbol(&parsed, "Service.find").kind, SymbolKind::Function);
        assert_eq!(symbol(&parsed, "UserService").visibility, Visibility::Public);
        assert_eq!(symbol(&parsed, "UserService.repo").visibility, Visibility::Private);
        assert_eq!(symbol(&parsed, "UserService.cache").visibility, Visibility::Protected);
        assert_eq!(symbol(&parsed, "UserService.lookup").visibility, Visibility::Private);
        assert_eq!(symbol(&parsed, "UserService.find").complexity, Some(2));
        assert_eq!(symbol(&parsed, "UserId").kind, SymbolKind::Other);
        assert_eq!(symbol(&parsed, "UserId").visibility, Visibility::Package);
    }

    #[test]
    fn test_typescript_dependencies() {
        let plugin = TypeScriptPlugin::create().unwrap();
        let parsed = run(&plugin, "src/services/user.ts", SOURCE);

        assert_eq!(
            targets(&parsed, DependencyKind::Import),
            vec!["src.data.repository", "src.services.models"]
        );
        assert_eq!(
            targets(&parsed, DependencyKind::Inheritance),
            vec!["Disposable", "BaseService", "Service"]
        );
        assert_eq!(
            targets(&parsed, DependencyKind::Composition),
            vec!["Repository", "User"]
        );
        assert!(targets(&parsed, DependencyKind::Call).contains(&"lookup"));
    }

    #[test]
    fn test_tsx_dialect() {
        let plugin = TypeScriptPlugin::create().unwrap();
        let source = "export function Badge(props: Props) {\n  return <span>{props.label}</span>;\n}\n";
        let parsed = run(&plugin, "web/Badge.tsx", source);
        assert!(!parsed.partial);
        assert_eq!(symbol(&parsed, "Badge").kind, SymbolKind::Function);
    }
}
