//! Project scanning: file discovery, language classification and
//! project-level facts.

mod classify;
mod project;

pub use classify::{classify, read_head, sniff_header, sniff_shebang};
pub use project::{
    detect_project_type, is_entry_point, layer_groups, layer_of_dir, layer_of_path,
    manifest_ecosystem, service_dirs, top_level_dir, top_level_manifest_dirs, Ecosystem, Layer,
    Manifest, ProjectType,
};

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{AnalysisConfig, FileFilter};
use crate::error::{AnalysisError, EventKind, FileError, RunEvent};
use crate::language::Language;

/// A file selected for analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Root-relative path.
    pub path: PathBuf,
    /// Path used to read the file.
    #[serde(skip)]
    pub abs_path: PathBuf,
    pub language: Language,
    pub size: u64,
    pub module_id: String,
}

impl SourceFile {
    pub fn new(root: &Path, rel_path: &Path, language: Language, size: u64) -> Self {
        Self {
            path: rel_path.to_path_buf(),
            abs_path: root.join(rel_path),
            language,
            size,
            module_id: module_id(rel_path),
        }
    }
}

/// Module identifier of a root-relative path: the path without extension,
/// joined with `.`. Package marker files (`__init__.py`, `mod.rs`,
/// `index.*`) stand for their directory.
pub fn module_id(rel_path: &Path) -> String {
    let mut parts: Vec<String> = rel_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|c| !c.is_empty() && c != ".")
        .collect();

    if let Some(last) = parts.pop() {
        let stem = Path::new(&last)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(last);
        let is_marker = matches!(stem.as_str(), "__init__" | "mod" | "index");
        if !is_marker || parts.is_empty() {
            parts.push(stem);
        }
    }

    let id = parts.join(".");
    if id.is_empty() {
        "_".to_string()
    } else {
        id
    }
}

/// What the scanner found under one root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectStructure {
    pub root: PathBuf,
    /// Selected files, sorted by relative path.
    pub files: Vec<SourceFile>,
    pub language_counts: BTreeMap<Language, usize>,
    pub project_type: ProjectType,
    /// Root-relative, sorted.
    pub entry_points: Vec<PathBuf>,
    pub ecosystems: BTreeSet<Ecosystem>,
    pub manifests: Vec<Manifest>,
    /// Recoverable problems met during the walk.
    pub issues: Vec<RunEvent>,
}

impl ProjectStructure {
    /// Derive the project-level facts for an already selected file set.
    pub fn from_files(root: &Path, mut files: Vec<SourceFile>, mut manifests: Vec<Manifest>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        manifests.sort_by(|a, b| a.path.cmp(&b.path));

        let mut language_counts = BTreeMap::new();
        for file in &files {
            *language_counts.entry(file.language).or_insert(0) += 1;
        }
        let entry_points: Vec<PathBuf> = files
            .iter()
            .filter(|f| is_entry_point(&f.path))
            .map(|f| f.path.clone())
            .collect();
        let ecosystems = manifests.iter().map(|m| m.ecosystem).collect();
        let project_type = detect_project_type(&files, &manifests, &entry_points);

        Self {
            root: root.to_path_buf(),
            files,
            language_counts,
            project_type,
            entry_points,
            ecosystems,
            manifests,
            issues: Vec::new(),
        }
    }

    pub fn file(&self, rel_path: &Path) -> Option<&SourceFile> {
        self.files
            .binary_search_by(|f| f.path.as_path().cmp(rel_path))
            .ok()
            .map(|i| &self.files[i])
    }
}

/// Walks a root and builds its [`ProjectStructure`].
pub struct ProjectScanner {
    filter: FileFilter,
    languages: Vec<Language>,
    max_file_size: u64,
    follow_links: bool,
}

impl ProjectScanner {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            filter: config.file_filter()?,
            languages: config.validate()?,
            max_file_size: config.max_file_size,
            follow_links: config.follow_links,
        })
    }

    /// Scan `root`. Fails only if `root` is not a readable directory;
    /// problems below it are recorded as issues.
    pub fn scan(&self, root: &Path) -> Result<ProjectStructure, AnalysisError> {
        let metadata = fs::metadata(root).map_err(|e| AnalysisError::invalid_path(root, e.to_string()))?;
        if !metadata.is_dir() {
            return Err(AnalysisError::invalid_path(root, "not a directory"));
        }
        fs::read_dir(root)?;
        info!(root = %root.display(), "scanning project");

        let mut files = Vec::new();
        let mut manifests = Vec::new();
        let mut issues = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let rel = e.path().strip_prefix(root).unwrap_or(e.path());
                !self.filter.prunes_dir(rel)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let kind = match err.io_error().map(|e| e.kind()) {
                        Some(ErrorKind::PermissionDenied) => EventKind::PermissionError,
                        _ => EventKind::ScanError,
                    };
                    let path = err.path().map(|p| p.strip_prefix(root).unwrap_or(p));
                    warn!(error = %err, "skipping unreadable path");
                    issues.push(RunEvent::new(kind, path, err.to_string()));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            let name = entry.file_name().to_string_lossy();
            if let Some(ecosystem) = manifest_ecosystem(&name) {
                manifests.push(Manifest {
                    path: rel.clone(),
                    ecosystem,
                });
            }

            if !self.filter.accepts_file(&rel) {
                continue;
            }
            let language = classify(&rel, || read_head(entry.path()));
            if !self.languages.is_empty() && !self.languages.contains(&language) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(err) => {
                    issues.push(RunEvent::new(EventKind::ScanError, Some(&rel), err.to_string()));
                    continue;
                }
            };
            if size > self.max_file_size {
                let skipped = FileError::TooLarge {
                    file: rel,
                    size,
                    limit: self.max_file_size,
                };
                debug!("{}", skipped);
                issues.push(skipped.to_event());
                continue;
            }

            files.push(SourceFile::new(root, &rel, language, size));
        }

        let mut structure = ProjectStructure::from_files(root, files, manifests);
        structure.issues = issues;
        info!(
            files = structure.files.len(),
            project_type = %structure.project_type,
            "scan complete"
        );
        Ok(structure)
    }
}

/// Scan `root` with `config`.
pub fn scan(root: &Path, config: &AnalysisConfig) -> Result<ProjectStructure, AnalysisError> {
    ProjectScanner::new(config)?.scan(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_module_id() {
        assert_eq!(module_id(Path::new("pkg/b.py")), "pkg.b");
        assert_eq!(module_id(Path::new("pkg/__init__.py")), "pkg");
        assert_eq!(module_id(Path::new("src/net/mod.rs")), "src.net");
        assert_eq!(module_id(Path::new("web/index.ts")), "web");
        assert_eq!(module_id(Path::new("index.js")), "index");
        assert_eq!(module_id(Path::new("Makefile")), "Makefile");
    }

    #[test]
    fn test_scan_selects_and_sorts() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "pyproject.toml", "[project]\nname = \"x\"\n");
        write(root, "src/b.py", "class B: pass\n");
        write(root, "src/a.py", "import b\n");
        write(root, "include/buf.h", "namespace io { class Buf {}; }\n");
        write(root, "node_modules/left/index.js", "module.exports = 1;\n");
        write(root, "big.py", &"x = 1\n".repeat(100));

        let config = AnalysisConfig {
            max_file_size: 200,
            ..Default::default()
        };
        let structure = scan(root, &config).unwrap();
        let paths: Vec<_> = structure.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("include/buf.h"),
                PathBuf::from("pyproject.toml"),
                PathBuf::from("src/a.py"),
                PathBuf::from("src/b.py"),
            ]
        );
        assert_eq!(structure.files[0].language, Language::Cpp);
        assert_eq!(structure.language_counts[&Language::Python], 2);
        assert_eq!(structure.project_type, ProjectType::SinglePackage);
        assert!(structure.ecosystems.contains(&Ecosystem::Python));

        assert_eq!(structure.issues.len(), 1);
        assert_eq!(structure.issues[0].kind, EventKind::FileSkipped);
        assert_eq!(structure.issues[0].file.as_deref(), Some(Path::new("big.py")));
    }

    #[test]
    fn test_scan_language_filter() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.py", "x = 1\n");
        write(temp.path(), "b.go", "package b\n");
        let config = AnalysisConfig {
            languages: vec!["go".to_string()],
            ..Default::default()
        };
        let structure = scan(temp.path(), &config).unwrap();
        assert_eq!(structure.files.len(), 1);
        assert_eq!(structure.files[0].language, Language::Go);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_recorded_and_walk_continues() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "a.py", "x = 1\n");
        write(root, "locked/hidden.py", "y = 2\n");
        write(root, "z.py", "z = 3\n");

        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Permissions are not enforced (running as root).
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }
        let structure = scan(root, &AnalysisConfig::default());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        let structure = structure.unwrap();

        let paths: Vec<_> = structure.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("a.py"), PathBuf::from("z.py")]);

        assert_eq!(structure.issues.len(), 1);
        let issue = &structure.issues[0];
        assert_eq!(issue.kind, EventKind::PermissionError);
        assert_eq!(issue.file.as_deref(), Some(Path::new("locked")));
        assert!(!issue.message.is_empty());
    }

    #[test]
    fn test_scan_rejects_missing_root() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let err = scan(&missing, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidPath { .. }));

        write(temp.path(), "file.txt", "x");
        let err = scan(&temp.path().join("file.txt"), &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidPath { .. }));
    }
}
