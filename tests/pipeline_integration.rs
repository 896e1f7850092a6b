//! End-to-end tests of scan -> analyze -> graph -> patterns.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use std::sync::Arc;

use archlens::analysis::ParseLimits;
use archlens::graph::Resolution;
use archlens::scan::{self, ProjectType};
use archlens::{
    analyze_path, AnalysisConfig, CancellationToken, CodeAnalyzer, Dependency, DependencyKind,
    EventKind, FileError, Language, LanguagePlugin, ParsedFile, ParserRegistry, PatternTag,
    SourceFile, Symbol,
};
use tempfile::TempDir;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_import_and_fallback_scenario() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.py", "import b\n\n\ndef main():\n    return b.B()\n");
    write(temp.path(), "b.py", "class B:\n    pass\n");
    write(temp.path(), "c.unknownlang", "hello world\n");

    let result = analyze_path(temp.path(), &AnalysisConfig::default()).unwrap();
    assert!(!result.incomplete);
    assert_eq!(result.files.len(), 3);

    assert!(result.graph.contains("b.B"));
    assert!(result.graph.contains("a.main"));
    assert_eq!(result.graph.import_edges(), vec![("a", "b")]);

    let c = result.file(Path::new("c.unknownlang")).unwrap();
    assert_eq!(c.language, Language::Unknown);
    assert!(c.fallback && c.partial);
    assert!(c.error.is_none());

    let fallbacks: Vec<_> = result.log.of_kind(EventKind::PluginFallback).collect();
    assert_eq!(fallbacks.len(), 1);
    assert_eq!(result.log.warning_count(), 0);
}

#[test]
fn test_mutual_imports_form_one_component() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "x.py", "import y\n");
    write(temp.path(), "y.py", "import x\n");

    let result = analyze_path(temp.path(), &AnalysisConfig::default()).unwrap();
    let cycles = result.graph.cycles();
    assert_eq!(cycles, vec![vec!["x", "y"]]);
    assert_eq!(result.graph.node("x").unwrap().cycle, Some(0));
    assert_eq!(result.graph.node("y").unwrap().cycle, Some(0));
}

#[test]
fn test_scan_completeness_with_excludes() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let kept = [
        "Makefile",
        "cmd/main.go",
        "include/buf.h",
        "lib/util.rs",
        "web/app.tsx",
    ];
    for rel in kept {
        write(root, rel, "x\n");
    }
    write(root, "node_modules/pkg/index.js", "x\n");
    write(root, "gen/models.py", "x\n");
    write(root, "lib/gen/schema.rs", "x\n");
    write(root, ".git/HEAD", "ref: refs/heads/main\n");

    let config = AnalysisConfig {
        exclude_patterns: vec!["**/gen/**".to_string()],
        ..Default::default()
    };
    let structure = scan::scan(root, &config).unwrap();
    let found: Vec<PathBuf> = structure.files.iter().map(|f| f.path.clone()).collect();
    let expected: Vec<PathBuf> = kept.iter().map(PathBuf::from).collect();
    assert_eq!(found, expected);

    let unique: BTreeSet<_> = found.iter().collect();
    assert_eq!(unique.len(), found.len());
}

#[test]
fn test_layered_project_end_to_end() {
    let root = testdata_path().join("shop");
    let result = analyze_path(&root, &AnalysisConfig::default()).unwrap();

    assert_eq!(result.structure.files.len(), 8);
    assert_eq!(result.structure.project_type, ProjectType::Layered);
    assert_eq!(result.files.len(), result.structure.files.len());

    let imports = result.graph.import_edges();
    assert!(imports.contains(&("shop.api.orders", "shop.services.checkout")));
    assert!(imports.contains(&("shop.services.checkout", "shop.repositories.orders")));
    assert!(imports.contains(&("shop.repositories.orders", "ext:sqlite3")));
    assert!(imports.contains(&("frontend.app", "frontend.view")));

    assert!(result.graph.contains("shop.api.orders.OrdersHandler.post"));
    assert!(result.graph.contains("frontend.view.render"));
    assert!(result.graph.cycles().is_empty());

    let layered = &result.patterns[0];
    assert_eq!(layered.tag, PatternTag::Layered);
    assert_eq!(layered.confidence, 1.0);

    assert_eq!(
        result.complexity.hotspots[0].id,
        "shop.services.checkout.Checkout.run"
    );

    let deploy = result.file(Path::new("scripts/deploy.unknownlang")).unwrap();
    assert!(deploy.fallback);
    assert_eq!(result.log.of_kind(EventKind::ParseError).count(), 0);
}

#[test]
fn test_edge_count_equals_dependency_count() {
    let root = testdata_path().join("shop");
    let result = analyze_path(&root, &AnalysisConfig::default()).unwrap();

    assert!(result.dependency_count() > 0);
    assert_eq!(result.graph.edge_count(), result.dependency_count());

    let calls = result
        .graph
        .edges()
        .filter(|e| e.edge.kind == DependencyKind::Call)
        .count();
    let declared_calls = result
        .files
        .iter()
        .flat_map(|f| &f.dependencies)
        .filter(|d| d.kind == DependencyKind::Call)
        .count();
    assert_eq!(calls, declared_calls);
}

#[test]
fn test_results_do_not_depend_on_thread_count() {
    let root = testdata_path().join("shop");
    let single = AnalysisConfig {
        threads: Some(1),
        ..Default::default()
    };
    let many = AnalysisConfig {
        threads: Some(4),
        ..Default::default()
    };

    let a = serde_json::to_string(&analyze_path(&root, &single).unwrap()).unwrap();
    let b = serde_json::to_string(&analyze_path(&root, &many).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_syntax_errors_stay_in_their_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "broken.py", "def broken(:\n    pass\n\nclass Fine:\n    pass\n");
    write(temp.path(), "ok.go", "package ok\n\nfunc Run() int {\n\treturn 1\n}\n");

    let result = analyze_path(temp.path(), &AnalysisConfig::default()).unwrap();
    let broken = result.file(Path::new("broken.py")).unwrap();
    assert!(broken.partial);
    assert!(!broken.fallback);

    let ok = result.file(Path::new("ok.go")).unwrap();
    assert!(!ok.partial);
    assert!(ok.symbols.iter().any(|s| s.qualified_name == "Run"));
    assert!(result.graph.contains("ok.Run"));
}

#[test]
fn test_cancelled_run_still_publishes_result() {
    let root = testdata_path().join("shop");
    let config = AnalysisConfig::default();
    let structure = scan::scan(&root, &config).unwrap();
    let registry = ParserRegistry::with_defaults();

    let token = CancellationToken::new();
    token.cancel();
    let result = CodeAnalyzer::new(&config, &registry)
        .with_cancellation(token)
        .analyze(structure)
        .unwrap();

    assert!(result.incomplete);
    assert!(result.files.is_empty());
    assert_eq!(result.structure.files.len(), 8);
    assert_eq!(result.log.of_kind(EventKind::CancellationRequested).count(), 1);
}

#[test]
fn test_invalid_root_is_fatal() {
    let missing = testdata_path().join("does-not-exist");
    let err = analyze_path(&missing, &AnalysisConfig::default()).unwrap_err();
    assert!(err.to_string().contains("does-not-exist"));
}

#[test]
fn test_dotted_external_import_stays_external() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app/main.py", "import logging.config\n");
    write(temp.path(), "config/settings.py", "DEBUG = True\n");

    let result = analyze_path(temp.path(), &AnalysisConfig::default()).unwrap();
    assert_eq!(
        result.graph.import_edges(),
        vec![("app.main", "ext:logging.config")]
    );
    assert!(result.graph.incoming("config.settings").is_empty());
}

#[test]
fn test_call_binds_to_same_file_function_not_module() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "a.py",
        "def helper():\n    return 1\n\n\ndef main():\n    return helper()\n",
    );
    write(temp.path(), "helper.py", "VALUE = 1\n");

    let result = analyze_path(temp.path(), &AnalysisConfig::default()).unwrap();
    let call = result
        .graph
        .edges()
        .find(|e| e.edge.kind == DependencyKind::Call && e.source.id == "a.main")
        .expect("main should call helper");
    assert_eq!(call.target.id, "a.helper");
    assert_eq!(call.edge.resolution, Resolution::Suffix);
}

/// Rejects every file it is given.
struct BrokenGoPlugin;

impl LanguagePlugin for BrokenGoPlugin {
    fn language(&self) -> Language {
        Language::Go
    }

    fn parse(
        &self,
        file: &SourceFile,
        _source: &[u8],
        _limits: ParseLimits,
    ) -> Result<ParsedFile, FileError> {
        Err(FileError::Parse {
            file: file.path.clone(),
            reason: "grammar unavailable".to_string(),
        })
    }

    fn extract_symbols(&self, _parsed: &ParsedFile) -> anyhow::Result<Vec<Symbol>> {
        Ok(Vec::new())
    }

    fn extract_dependencies(&self, _parsed: &ParsedFile) -> anyhow::Result<Vec<Dependency>> {
        Ok(Vec::new())
    }
}

#[test]
fn test_failing_plugin_is_contained_to_its_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "api.py", "import models\n\n\ndef handle():\n    return models.load()\n");
    write(temp.path(), "lib.go", "package lib\n\nfunc Run() int {\n\treturn 1\n}\n");
    write(temp.path(), "models.py", "def load():\n    return []\n");
    write(temp.path(), "util.py", "def clamp(x):\n    return max(0, x)\n");

    let config = AnalysisConfig::default();
    let structure = scan::scan(temp.path(), &config).unwrap();
    let mut registry = ParserRegistry::with_defaults();
    registry.register(Arc::new(BrokenGoPlugin));
    let result = CodeAnalyzer::new(&config, &registry)
        .analyze(structure)
        .unwrap();

    assert!(!result.incomplete);
    assert_eq!(result.files.len(), 4);

    let clean: Vec<_> = result
        .files
        .iter()
        .filter(|f| !f.partial && !f.fallback && f.error.is_none())
        .map(|f| f.path.clone())
        .collect();
    assert_eq!(
        clean,
        vec![
            PathBuf::from("api.py"),
            PathBuf::from("models.py"),
            PathBuf::from("util.py"),
        ]
    );

    let lib = result.file(Path::new("lib.go")).unwrap();
    assert!(lib.fallback && lib.partial);
    assert!(matches!(&lib.error, Some(FileError::Parse { reason, .. }) if reason == "grammar unavailable"));

    let failures: Vec<_> = result.log.of_kind(EventKind::ParseError).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].file.as_deref(), Some(Path::new("lib.go")));
    assert_eq!(result.log.of_kind(EventKind::PluginFallback).count(), 1);

    assert!(result.graph.contains("lib"));
    assert!(result.graph.import_edges().contains(&("api", "models")));
}
