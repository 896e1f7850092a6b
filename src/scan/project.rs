//! Project-level facts: manifests, entry points, layers and project type.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use phf::phf_map;
use serde::{Deserialize, Serialize};

use super::SourceFile;

/// Package ecosystem a manifest belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Rust,
    Node,
    Python,
    Go,
    Jvm,
    Native,
    Php,
    Ruby,
    Dotnet,
}

static MANIFESTS: phf::Map<&'static str, Ecosystem> = phf_map! {
    "Cargo.toml" => Ecosystem::Rust,
    "package.json" => Ecosystem::Node,
    "pyproject.toml" => Ecosystem::Python,
    "setup.py" => Ecosystem::Python,
    "setup.cfg" => Ecosystem::Python,
    "requirements.txt" => Ecosystem::Python,
    "go.mod" => Ecosystem::Go,
    "pom.xml" => Ecosystem::Jvm,
    "build.gradle" => Ecosystem::Jvm,
    "build.gradle.kts" => Ecosystem::Jvm,
    "CMakeLists.txt" => Ecosystem::Native,
    "Makefile" => Ecosystem::Native,
    "composer.json" => Ecosystem::Php,
    "Gemfile" => Ecosystem::Ruby,
};

/// Ecosystem of a manifest file name, if it is one.
pub fn manifest_ecosystem(file_name: &str) -> Option<Ecosystem> {
    if let Some(ecosystem) = MANIFESTS.get(file_name) {
        return Some(*ecosystem);
    }
    file_name.ends_with(".csproj").then_some(Ecosystem::Dotnet)
}

/// A manifest found during the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Root-relative path.
    pub path: PathBuf,
    pub ecosystem: Ecosystem,
}

impl Manifest {
    /// Root-relative directory holding the manifest (empty for the root).
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    /// Number of directories between the root and the manifest.
    pub fn depth(&self) -> usize {
        self.dir().components().count()
    }
}

/// Whether a root-relative path names a conventional entry point.
pub fn is_entry_point(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let in_bin_dir = path
        .parent()
        .is_some_and(|p| p.ends_with("src/bin") && name.ends_with(".rs"));

    in_bin_dir
        || matches!(
            name,
            "main.rs"
                | "main.py"
                | "__main__.py"
                | "manage.py"
                | "app.py"
                | "wsgi.py"
                | "main.go"
                | "index.js"
                | "index.ts"
                | "server.js"
                | "server.ts"
                | "main.js"
                | "main.ts"
                | "Main.java"
                | "Application.java"
                | "main.c"
                | "main.cpp"
        )
}

/// Conventional architectural layer of a directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Presentation,
    Application,
    Data,
}

impl Layer {
    /// Position in the allowed direction presentation -> application -> data.
    pub fn rank(&self) -> u8 {
        match self {
            Layer::Presentation => 0,
            Layer::Application => 1,
            Layer::Data => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Presentation => "presentation",
            Layer::Application => "application",
            Layer::Data => "data",
        }
    }
}

static LAYERS: phf::Map<&'static str, Layer> = phf_map! {
    "ui" => Layer::Presentation,
    "views" => Layer::Presentation,
    "controllers" => Layer::Presentation,
    "handlers" => Layer::Presentation,
    "api" => Layer::Presentation,
    "routes" => Layer::Presentation,
    "presentation" => Layer::Presentation,
    "web" => Layer::Presentation,
    "cli" => Layer::Presentation,
    "services" => Layer::Application,
    "service" => Layer::Application,
    "application" => Layer::Application,
    "usecases" => Layer::Application,
    "domain" => Layer::Application,
    "core" => Layer::Application,
    "business" => Layer::Application,
    "logic" => Layer::Application,
    "repositories" => Layer::Data,
    "repository" => Layer::Data,
    "persistence" => Layer::Data,
    "data" => Layer::Data,
    "dal" => Layer::Data,
    "db" => Layer::Data,
    "infrastructure" => Layer::Data,
    "storage" => Layer::Data,
    "models" => Layer::Data,
    "entities" => Layer::Data,
};

/// Layer of a single directory name.
pub fn layer_of_dir(name: &str) -> Option<Layer> {
    LAYERS.get(name.to_ascii_lowercase().as_str()).copied()
}

/// Layer of a file: the innermost layer-named directory on its path.
pub fn layer_of_path(path: &Path) -> Option<Layer> {
    let dirs = path.parent()?;
    dirs.components()
        .rev()
        .find_map(|c| c.as_os_str().to_str().and_then(layer_of_dir))
}

/// Shape of the scanned project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Microservices,
    Monorepo,
    Layered,
    SinglePackage,
    Unstructured,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Microservices => "microservices",
            ProjectType::Monorepo => "monorepo",
            ProjectType::Layered => "layered",
            ProjectType::SinglePackage => "single_package",
            ProjectType::Unstructured => "unstructured",
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First path component, for files below the root.
pub fn top_level_dir(path: &Path) -> Option<&str> {
    let mut components = path.components();
    let first = components.next()?;
    // A file directly at the root has no top-level directory.
    components.next()?;
    first.as_os_str().to_str()
}

/// Top-level directories that carry their own manifest and an entry point.
pub fn service_dirs(manifests: &[Manifest], entry_points: &[PathBuf]) -> BTreeSet<String> {
    let manifest_dirs = top_level_manifest_dirs(manifests);
    entry_points
        .iter()
        .filter_map(|p| top_level_dir(p))
        .filter(|dir| manifest_dirs.contains(*dir))
        .map(String::from)
        .collect()
}

/// Top-level directories with a manifest directly inside them.
pub fn top_level_manifest_dirs(manifests: &[Manifest]) -> BTreeSet<String> {
    manifests
        .iter()
        .filter(|m| m.depth() == 1)
        .filter_map(|m| m.dir().to_str().map(String::from))
        .collect()
}

/// Distinct layer groups named by the directories of `files`.
pub fn layer_groups(files: &[SourceFile]) -> BTreeSet<Layer> {
    files.iter().filter_map(|f| layer_of_path(&f.path)).collect()
}

/// Infer the project type. Earlier rules win.
pub fn detect_project_type(
    files: &[SourceFile],
    manifests: &[Manifest],
    entry_points: &[PathBuf],
) -> ProjectType {
    if service_dirs(manifests, entry_points).len() >= 2 {
        return ProjectType::Microservices;
    }
    if manifests.iter().filter(|m| m.depth() >= 1).count() >= 2 {
        return ProjectType::Monorepo;
    }
    if layer_groups(files).len() >= 2 {
        return ProjectType::Layered;
    }
    if manifests.iter().any(|m| m.depth() == 0) {
        return ProjectType::SinglePackage;
    }
    ProjectType::Unstructured
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;

    fn manifest(path: &str) -> Manifest {
        let name = Path::new(path).file_name().unwrap().to_str().unwrap();
        Manifest {
            path: PathBuf::from(path),
            ecosystem: manifest_ecosystem(name).unwrap(),
        }
    }

    fn file(path: &str) -> SourceFile {
        SourceFile::new(Path::new("/repo"), Path::new(path), Language::Python, 10)
    }

    #[test]
    fn test_manifest_ecosystems() {
        assert_eq!(manifest_ecosystem("Cargo.toml"), Some(Ecosystem::Rust));
        assert_eq!(manifest_ecosystem("build.gradle.kts"), Some(Ecosystem::Jvm));
        assert_eq!(manifest_ecosystem("Api.csproj"), Some(Ecosystem::Dotnet));
        assert_eq!(manifest_ecosystem("README.md"), None);
    }

    #[test]
    fn test_entry_points() {
        assert!(is_entry_point(Path::new("src/main.rs")));
        assert!(is_entry_point(Path::new("src/bin/migrate.rs")));
        assert!(is_entry_point(Path::new("svc/server.ts")));
        assert!(!is_entry_point(Path::new("src/lib.rs")));
    }

    #[test]
    fn test_layer_of_path() {
        assert_eq!(layer_of_path(Path::new("app/api/users.py")), Some(Layer::Presentation));
        assert_eq!(layer_of_path(Path::new("app/services/db/conn.py")), Some(Layer::Data));
        assert_eq!(layer_of_path(Path::new("api.py")), None);
    }

    #[test]
    fn test_project_type_precedence() {
        let manifests = vec![manifest("users/go.mod"), manifest("orders/package.json")];
        let entries = vec![PathBuf::from("users/main.go"), PathBuf::from("orders/index.js")];
        assert_eq!(detect_project_type(&[], &manifests, &entries), ProjectType::Microservices);
        assert_eq!(detect_project_type(&[], &manifests, &[]), ProjectType::Monorepo);

        let files = vec![file("app/api/users.py"), file("app/models/user.py")];
        assert_eq!(detect_project_type(&files, &[], &[]), ProjectType::Layered);
        assert_eq!(
            detect_project_type(&[file("tool.py")], &[manifest("pyproject.toml")], &[]),
            ProjectType::SinglePackage
        );
        assert_eq!(detect_project_type(&[file("tool.py")], &[], &[]), ProjectType::Unstructured);
    }
}
