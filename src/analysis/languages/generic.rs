//! Text-only plugin for languages without a grammar, and the fallback when
//! a grammar plugin fails.
//!
//! Everything here is a line-oriented estimate: imports and declarations
//! are matched with regular expressions, nesting follows indentation, and
//! complexity counts decision keywords. Results are always `partial`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::treesitter::{
    count_lines, dotted, resolve_dot_import, resolve_path_import, DependencySet,
};
use crate::analysis::{
    ControlFlowInfo, Dependency, DependencyKind, FileMetrics, LanguagePlugin, Location,
    ParseLimits, ParsedFile, Span, Symbol, SymbolKind, SyntaxTree, Visibility,
};
use crate::error::FileError;
use crate::language::Language;
use crate::scan::SourceFile;

/// Content with a NUL byte in this prefix is treated as binary.
const BINARY_SNIFF_LEN: usize = 8 * 1024;

/// Extensions stripped from path-style import specifiers.
const PATH_EXTENSIONS: &[&str] = &[
    "h", "hpp", "js", "ts", "jsx", "tsx", "mjs", "rb", "php", "py",
];

lazy_static! {
    /// Import forms, tried in order; the first capture group is the target.
    static ref IMPORT_PATTERNS: Vec<Regex> = vec![
        // from pkg.mod import x
        Regex::new(r"^\s*from\s+(\.*[\w.]*)\s+import\b").unwrap(),
        // import x from 'mod' / export * from 'mod'
        Regex::new(r#"^\s*(?:import|export)\b.*\bfrom\s+['"]([^'"]+)['"]"#).unwrap(),
        // require('mod'), require_relative 'mod', require_once 'mod.php'
        Regex::new(r#"\brequire(?:_relative|_once)?\s*\(?\s*['"]([^'"]+)['"]"#).unwrap(),
        // #include <mod.h>
        Regex::new(r#"^\s*#\s*include\s*[<"]([^>"]+)[>"]"#).unwrap(),
        // import "fmt" / import alias "fmt"
        Regex::new(r#"^\s*import\s+(?:\w+\s+)?"([^"]+)""#).unwrap(),
        // import java.util.List; / import static a.B.c; / import os
        Regex::new(r"^\s*import\s+(?:static\s+)?([\w.]+)").unwrap(),
        // use std::io; / use App\Models\User;
        Regex::new(r"^\s*(?:pub\s+)?use\s+\\?([\w:\\]+)").unwrap(),
        // using System.Text;
        Regex::new(r"^\s*using\s+(?:static\s+)?([\w.]+)\s*;").unwrap(),
    ];

    /// A quoted path inside a Go `import ( .. )` block.
    static ref GO_BLOCK_IMPORT: Regex = Regex::new(r#"^\s*(?:[\w.]+\s+)?"([^"]+)""#).unwrap();

    static ref TYPE_DECL: Regex = Regex::new(
        r"^\s*(?:(?:public|private|protected|internal|export|default|abstract|final|sealed|open|data|static|partial|pub(?:\([^)]*\))?)\s+)*(class|struct|interface|trait|enum|module|object|record|protocol|namespace)\s+([A-Za-z_]\w*)"
    ).unwrap();

    static ref FUNCTION_DECL: Regex = Regex::new(
        r"^\s*(?:(?:public|private|protected|internal|export|default|async|static|override|open|final|abstract|inline|suspend|unsafe|const|pub(?:\([^)]*\))?)\s+)*(?:def|fn|func|fun|function|sub)\s+(?:\([^)]*\)\s*)?(?:self\.)?([A-Za-z_]\w*[!?]?)"
    ).unwrap();

    /// `name() {` shell functions.
    static ref SHELL_FUNCTION: Regex = Regex::new(r"^\s*([A-Za-z_]\w*)\s*\(\)\s*\{").unwrap();

    static ref DECISION: Regex = Regex::new(
        r"\b(if|elif|elsif|unless|for|foreach|while|until|case|when|catch|except|rescue|and|or)\b|&&|\|\|"
    ).unwrap();
}

/// The generic text plugin.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericPlugin;

impl GenericPlugin {
    pub fn new() -> Self {
        Self
    }
}

fn is_binary(source: &[u8]) -> bool {
    source[..source.len().min(BINARY_SNIFF_LEN)].contains(&0)
}

/// How comments are written in one language.
struct CommentStyle {
    line: &'static [&'static str],
    block: bool,
}

impl CommentStyle {
    fn of(language: Language) -> Self {
        match language {
            Language::Python | Language::Ruby | Language::Shell => Self {
                line: &["#"],
                block: false,
            },
            Language::Php => Self {
                line: &["//", "#"],
                block: true,
            },
            Language::Unknown => Self {
                line: &["//", "#", "--", ";"],
                block: true,
            },
            _ => Self {
                line: &["//"],
                block: true,
            },
        }
    }

    fn is_line_comment(&self, trimmed: &str) -> bool {
        !trimmed.starts_with("#include")
            && self.line.iter().any(|marker| trimmed.starts_with(marker))
    }
}

fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn record_decisions(line: &str, info: &mut ControlFlowInfo) {
    for found in DECISION.find_iter(line) {
        let capture = match found.as_str() {
            "if" | "elif" | "elsif" | "unless" => "if",
            "for" | "foreach" | "while" | "until" => "loop",
            "case" | "when" => "case",
            "catch" | "except" | "rescue" => "catch",
            "and" | "&&" => "and",
            _ => "or",
        };
        info.record(capture);
    }
}

fn keyword_kind(keyword: &str) -> SymbolKind {
    match keyword {
        "interface" | "trait" | "protocol" => SymbolKind::Interface,
        "enum" => SymbolKind::Other,
        "module" | "namespace" => SymbolKind::Module,
        _ => SymbolKind::Class,
    }
}

fn line_visibility(line: &str, name: &str) -> Visibility {
    let has = |word: &str| line.split_whitespace().any(|token| token == word);
    if has("private") || name.starts_with("__") && !name.ends_with("__") {
        Visibility::Private
    } else if has("protected") || name.starts_with('_') {
        Visibility::Protected
    } else {
        Visibility::Public
    }
}

fn is_closer(trimmed: &str) -> bool {
    matches!(trimmed, "end" | "}" | "};" | "})" | "fi" | "done" | "esac")
}

/// Whether braces opened on this line are all closed on it again.
fn closes_on_same_line(line: &str) -> bool {
    let opened = line.matches('{').count();
    opened > 0 && opened == line.matches('}').count()
}

struct OpenScope {
    indent: usize,
    qualified: String,
    symbol: usize,
    decisions: ControlFlowInfo,
}

/// What one pass over the text finds.
#[derive(Default)]
struct Outline {
    symbols: Vec<Symbol>,
    imports: Vec<(String, usize)>,
    decisions: ControlFlowInfo,
    nesting_depth: usize,
}

impl Outline {
    fn build(parsed: &ParsedFile) -> Self {
        let mut outline = Outline::default();
        let source = parsed.syntax.source();
        if source.is_empty() || is_binary(source) {
            return outline;
        }
        let text = String::from_utf8_lossy(source);
        let is_package = parsed
            .path
            .file_stem()
            .is_some_and(|stem| stem == "__init__");

        let comments = CommentStyle::of(parsed.language);
        let mut open: Vec<OpenScope> = Vec::new();
        let mut in_block_comment = false;
        let mut in_go_imports = false;
        let mut brace_depth = 0usize;
        let mut unit_indent = 0usize;
        let mut last_line = 0usize;

        for (index, line) in text.lines().enumerate() {
            let number = index + 1;
            last_line = number;
            let trimmed = line.trim();
            if in_block_comment {
                in_block_comment = !trimmed.contains("*/");
                continue;
            }
            if comments.block && trimmed.starts_with("/*") {
                in_block_comment = !trimmed[2..].contains("*/");
                continue;
            }
            if trimmed.is_empty() || comments.is_line_comment(trimmed) {
                continue;
            }

            let indent = indent_of(line);
            if indent > 0 && (unit_indent == 0 || indent < unit_indent) {
                unit_indent = indent;
            }
            for c in trimmed.chars() {
                match c {
                    '{' => brace_depth += 1,
                    '}' => brace_depth = brace_depth.saturating_sub(1),
                    _ => {}
                }
            }
            let indent_depth = if unit_indent == 0 { 0 } else { indent / unit_indent };
            outline.nesting_depth = outline.nesting_depth.max(brace_depth.max(indent_depth));

            // A closing line (`}`, `end`) still belongs to the scope it ends.
            let end_line = if is_closer(trimmed) { number } else { number - 1 };
            while open.last().is_some_and(|scope| indent <= scope.indent) {
                if let Some(scope) = open.pop() {
                    outline.close(scope, end_line);
                }
            }

            let mut line_decisions = ControlFlowInfo::default();
            record_decisions(trimmed, &mut line_decisions);
            outline.add_decisions(&line_decisions);
            for scope in open.iter_mut() {
                add_info(&mut scope.decisions, &line_decisions);
            }

            if in_go_imports {
                if trimmed.starts_with(')') {
                    in_go_imports = false;
                } else if let Some(caps) = GO_BLOCK_IMPORT.captures(trimmed) {
                    outline.imports.push((dotted(&caps[1]), number));
                }
                continue;
            }
            if trimmed == "import (" {
                in_go_imports = true;
                continue;
            }
            if let Some(target) = match_import(trimmed, parsed, is_package) {
                outline.imports.push((target, number));
                continue;
            }

            if let Some((name, kind)) = match_declaration(line) {
                let parent = open.last().map(|scope| scope.qualified.clone());
                let qualified = match &parent {
                    Some(p) => format!("{}.{}", p, name),
                    None => name.clone(),
                };
                let signature = (kind != SymbolKind::Module).then(|| {
                    trimmed
                        .trim_end_matches(|c: char| c == '{' || c == ':' || c.is_whitespace())
                        .to_string()
                });
                outline.symbols.push(Symbol {
                    name: name.clone(),
                    qualified_name: qualified.clone(),
                    kind,
                    location: Location {
                        file: parsed.path.clone(),
                        span: Span::lines(number, number),
                    },
                    signature,
                    documentation: None,
                    visibility: line_visibility(trimmed, &name),
                    parent,
                    complexity: kind.is_callable().then_some(1),
                });
                if !closes_on_same_line(trimmed) {
                    let mut decisions = ControlFlowInfo::default();
                    add_info(&mut decisions, &line_decisions);
                    open.push(OpenScope {
                        indent,
                        qualified,
                        symbol: outline.symbols.len() - 1,
                        decisions,
                    });
                }
            }
        }

        while let Some(scope) = open.pop() {
            outline.close(scope, last_line);
        }
        outline
    }

    fn close(&mut self, scope: OpenScope, end_line: usize) {
        if let Some(symbol) = self.symbols.get_mut(scope.symbol) {
            symbol.location.span.end_line = end_line.max(symbol.location.span.start_line);
            if symbol.kind.is_callable() {
                symbol.complexity = Some(scope.decisions.cyclomatic_complexity());
            }
        }
    }

    fn add_decisions(&mut self, info: &ControlFlowInfo) {
        add_info(&mut self.decisions, info);
    }
}

fn add_info(total: &mut ControlFlowInfo, add: &ControlFlowInfo) {
    total.if_count += add.if_count;
    total.loop_count += add.loop_count;
    total.case_count += add.case_count;
    total.and_count += add.and_count;
    total.or_count += add.or_count;
    total.ternary_count += add.ternary_count;
    total.catch_count += add.catch_count;
}

fn match_import(line: &str, parsed: &ParsedFile, is_package: bool) -> Option<String> {
    let spec = IMPORT_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())?;
    let spec = spec.trim_end_matches(".*").trim_end_matches("::*");
    let target = if spec.starts_with("./") || spec.starts_with("../") {
        resolve_path_import(spec, &parsed.path, PATH_EXTENSIONS)
    } else if spec.starts_with('.') {
        resolve_dot_import(spec, &parsed.module_id, is_package)
    } else {
        resolve_path_import(&spec.replace('\\', "/"), &parsed.path, PATH_EXTENSIONS)
    };
    (!target.is_empty()).then_some(target)
}

fn match_declaration(line: &str) -> Option<(String, SymbolKind)> {
    if let Some(caps) = TYPE_DECL.captures(line) {
        return Some((caps[2].to_string(), keyword_kind(&caps[1])));
    }
    if let Some(caps) = FUNCTION_DECL.captures(line) {
        return Some((caps[1].to_string(), SymbolKind::Function));
    }
    SHELL_FUNCTION
        .captures(line)
        .map(|caps| (caps[1].to_string(), SymbolKind::Function))
}

impl LanguagePlugin for GenericPlugin {
    fn language(&self) -> Language {
        Language::Unknown
    }

    fn parse(
        &self,
        file: &SourceFile,
        source: &[u8],
        _limits: ParseLimits,
    ) -> Result<ParsedFile, FileError> {
        let mut parsed = ParsedFile::new(file, SyntaxTree::text_only(source.to_vec()));
        parsed.partial = true;
        parsed.fallback = true;
        if is_binary(source) {
            return Ok(parsed);
        }
        let outline = Outline::build(&parsed);
        parsed.metrics = FileMetrics {
            cyclomatic: outline.decisions.cyclomatic_complexity(),
            lines: count_lines(source),
            nesting_depth: outline.nesting_depth,
        };
        Ok(parsed)
    }

    fn extract_symbols(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<Symbol>> {
        Ok(Outline::build(parsed).symbols)
    }

    fn extract_dependencies(&self, parsed: &ParsedFile) -> anyhow::Result<Vec<Dependency>> {
        let mut deps = DependencySet::new(parsed);
        for (target, line) in Outline::build(parsed).imports {
            deps.add_at(None, target, DependencyKind::Import, Span::lines(line, line));
        }
        Ok(deps.into_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::languages::testing::{run, symbol, targets};

    #[test]
    fn test_ruby_outline() {
        let source = "require 'json'\nrequire_relative './models/user'\n\nmodule Billing\n  class Invoice\n    def total(items)\n      if items.empty? || @closed\n        return 0\n      end\n      items.sum\n    end\n\n    def _reset\n    end\n  end\nend\n";
        let parsed = run(&GenericPlugin::new(), "lib/billing.rb", source);

        assert!(parsed.partial);
        assert!(parsed.fallback);
        assert_eq!(symbol(&parsed, "Billing").kind, SymbolKind::Module);
        assert_eq!(symbol(&parsed, "Billing.Invoice").kind, SymbolKind::Class);

        let total = symbol(&parsed, "Billing.Invoice.total");
        assert_eq!(total.parent.as_deref(), Some("Billing.Invoice"));
        assert_eq!(total.complexity, Some(3));
        assert_eq!(total.location.span.start_line, 6);
        assert_eq!(total.location.span.end_line, 11);

        assert_eq!(symbol(&parsed, "Billing.Invoice._reset").visibility, Visibility::Protected);
        assert_eq!(
            targets(&parsed, DependencyKind::Import),
            vec!["json", "lib.models.user"]
        );
    }

    #[test]
    fn test_mixed_import_forms() {
        let source = "#include <stdio.h>\nusing System.Text;\nimport java.util.List;\nuse std::io::Read;\nimport (\n\t\"fmt\"\n\tlog \"github.com/x/log\"\n)\n";
        let parsed = run(&GenericPlugin::new(), "src/misc.txt", source);
        assert_eq!(
            targets(&parsed, DependencyKind::Import),
            vec!["stdio", "System.Text", "java.util.List", "std.io.Read", "fmt", "github.com.x.log"]
        );
    }

    #[test]
    fn test_comment_markers_follow_language() {
        let c = "/* Clamp a counter\n * if it overflows. */\nint clamp(int *p, int n) {\n    *p = n > 0 && n < 10;\n    return *p;\n}\n";
        let parsed = run(&GenericPlugin::new(), "src/clamp.c", c);
        assert_eq!(parsed.metrics.cyclomatic, 2);

        let js = "// run both if set\n;[first, second].forEach((x) => x && run(x))\n";
        let parsed = run(&GenericPlugin::new(), "src/boot.js", js);
        assert_eq!(parsed.metrics.cyclomatic, 2);

        let py = "# and or if\nimport os\n";
        let parsed = run(&GenericPlugin::new(), "tool.py", py);
        assert_eq!(parsed.metrics.cyclomatic, 1);
        assert_eq!(targets(&parsed, DependencyKind::Import), vec!["os"]);
    }

    #[test]
    fn test_binary_content_is_empty() {
        let parsed = run(&GenericPlugin::new(), "data.bin", "class A\0\0\ndef f():\n");
        assert!(parsed.symbols.is_empty());
        assert!(parsed.dependencies.is_empty());
        assert!(parsed.partial);
        assert_eq!(parsed.metrics, FileMetrics::default());
    }

    #[test]
    fn test_shell_functions() {
        let parsed = run(&GenericPlugin::new(), "bin/deploy.sh", "build() {\n  make all\n}\n\ndeploy() { build; }\n");
        assert_eq!(symbol(&parsed, "build").kind, SymbolKind::Function);
        assert_eq!(symbol(&parsed, "deploy").parent, None);
    }
}
