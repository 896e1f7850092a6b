//! Run configuration.
//!
//! A configuration is a YAML document; every key is optional. The front end
//! may also build one in code or override individual keys from flags.
//!
//! ```yaml
//! include_patterns: ["src/**"]
//! exclude_patterns: ["**/generated/**"]
//! max_file_size: 1048576
//! languages: [python, rust]
//! analysis_depth: full
//! file_timeout_ms: 10000
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::language::Language;

/// Default configuration file names, looked up in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["archlens.yaml", ".archlens.yaml", "archlens.yml"];

/// Patterns excluded unless `use_default_excludes` is false.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/.git/**",
    "**/.hg/**",
    "**/.svn/**",
    "**/node_modules/**",
    "**/target/**",
    "**/__pycache__/**",
    "**/.venv/**",
    "**/venv/**",
    "**/vendor/**",
];

const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
const DEFAULT_FILE_TIMEOUT_MS: u64 = 10_000;

/// How much of the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    /// Symbols only: no dependencies, graph edges or patterns.
    Shallow,
    /// Symbols, dependencies, graph and patterns.
    #[default]
    Full,
}

impl AnalysisDepth {
    pub fn includes_dependencies(&self) -> bool {
        matches!(self, AnalysisDepth::Full)
    }
}

impl std::str::FromStr for AnalysisDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shallow" => Ok(AnalysisDepth::Shallow),
            "full" => Ok(AnalysisDepth::Full),
            other => Err(format!("invalid analysis depth {:?}, must be 'shallow' or 'full'", other)),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Glob patterns a file must match (any of) to be analyzed. Empty = all.
    pub include_patterns: Vec<String>,
    /// Glob patterns that exclude a file from analysis.
    pub exclude_patterns: Vec<String>,
    /// Whether [`DEFAULT_EXCLUDES`] apply in addition to `exclude_patterns`.
    pub use_default_excludes: bool,
    /// Files above this size (bytes) are skipped.
    pub max_file_size: u64,
    /// Restrict analysis to these language ids. Empty = all.
    pub languages: Vec<String>,
    pub analysis_depth: AnalysisDepth,
    /// Per-file plugin timeout in milliseconds, 0 disables it.
    pub file_timeout_ms: u64,
    /// Worker threads; defaults to the available hardware concurrency.
    pub threads: Option<usize>,
    pub follow_links: bool,
    /// Keep syntax trees in the result instead of dropping them after extraction.
    pub retain_syntax_trees: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            use_default_excludes: true,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            languages: Vec::new(),
            analysis_depth: AnalysisDepth::Full,
            file_timeout_ms: DEFAULT_FILE_TIMEOUT_MS,
            threads: None,
            follow_links: false,
            retain_syntax_trees: false,
        }
    }
}

impl AnalysisConfig {
    /// Parse a configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
            .map_err(|e| AnalysisError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Locate a configuration file: the working directory first, then the
    /// per-user configuration directory.
    pub fn discover() -> Option<PathBuf> {
        for name in DEFAULT_CONFIG_NAMES {
            let path = PathBuf::from(name);
            if path.is_file() {
                return Some(path);
            }
        }
        let dirs = directories::ProjectDirs::from("", "", "archlens")?;
        let user_config = dirs.config_dir().join("config.yaml");
        user_config.is_file().then_some(user_config)
    }

    /// Load from an explicit path, else from a discovered file, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, AnalysisError> {
        match path {
            Some(p) => Self::from_file(p),
            None => match Self::discover() {
                Some(found) => Self::from_file(found),
                None => Ok(Self::default()),
            },
        }
    }

    /// Check the configuration and return the parsed language filter.
    pub fn validate(&self) -> Result<Vec<Language>, AnalysisError> {
        if self.max_file_size == 0 {
            return Err(AnalysisError::Config("max_file_size must be greater than 0".into()));
        }
        if self.threads == Some(0) {
            return Err(AnalysisError::Config("threads must be at least 1".into()));
        }
        for pattern in self.include_patterns.iter().chain(&self.exclude_patterns) {
            Glob::new(pattern).map_err(|e| {
                AnalysisError::Config(format!("invalid glob pattern {:?}: {}", pattern, e))
            })?;
        }
        self.languages
            .iter()
            .map(|id| id.parse::<Language>().map_err(AnalysisError::Config))
            .collect()
    }

    /// Compile the include/exclude patterns.
    pub fn file_filter(&self) -> Result<FileFilter, AnalysisError> {
        let mut excludes: Vec<&str> = self.exclude_patterns.iter().map(String::as_str).collect();
        if self.use_default_excludes {
            excludes.extend_from_slice(DEFAULT_EXCLUDES);
        }
        let include_patterns: Vec<&str> =
            self.include_patterns.iter().map(String::as_str).collect();

        Ok(FileFilter {
            include: if include_patterns.is_empty() {
                None
            } else {
                Some(build_globset(&include_patterns)?)
            },
            exclude: build_globset(&excludes)?,
        })
    }
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet, AnalysisError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            AnalysisError::Config(format!("invalid glob pattern {:?}: {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| AnalysisError::Config(format!("cannot compile glob patterns: {}", e)))
}

/// Compiled include/exclude matcher over root-relative paths.
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

/// Child name used to ask whether everything beneath a directory is excluded.
const PRUNE_SENTINEL: &str = "__archlens_any_child__";

impl FileFilter {
    /// Whether a file (root-relative) is selected for analysis.
    pub fn accepts_file(&self, rel_path: &Path) -> bool {
        let normalized = normalize(rel_path);
        if self.exclude.is_match(&normalized) {
            return false;
        }
        match &self.include {
            Some(include) => include.is_match(&normalized),
            None => true,
        }
    }

    /// Whether a directory (root-relative) and its whole subtree is excluded.
    pub fn prunes_dir(&self, rel_dir: &Path) -> bool {
        if rel_dir.as_os_str().is_empty() {
            return false;
        }
        let normalized = normalize(rel_dir);
        self.exclude.is_match(&normalized)
            || self.exclude.is_match(format!("{}/{}", normalized, PRUNE_SENTINEL))
    }
}

/// Root-relative path with `/` separators, so patterns behave the same on
/// every platform.
fn normalize(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
include_patterns:
  - "src/**"
exclude_patterns:
  - "**/generated/**"
max_file_size: 2048
languages: [python, rust]
analysis_depth: shallow
"#;
        let config = AnalysisConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.include_patterns, vec!["src/**"]);
        assert_eq!(config.max_file_size, 2048);
        assert_eq!(config.analysis_depth, AnalysisDepth::Shallow);
        assert_eq!(config.file_timeout_ms, DEFAULT_FILE_TIMEOUT_MS);
        assert!(config.use_default_excludes);

        let languages = config.validate().unwrap();
        assert_eq!(languages, vec![Language::Python, Language::Rust]);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = AnalysisConfig::from_yaml("").unwrap();
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.analysis_depth, AnalysisDepth::Full);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AnalysisConfig::default();
        config.exclude_patterns = vec!["[".to_string()];
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

        let mut config = AnalysisConfig::default();
        config.languages = vec!["cobol".to_string()];
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.max_file_size = 0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.threads = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_filter() {
        let config = AnalysisConfig {
            include_patterns: vec!["src/**".to_string()],
            exclude_patterns: vec!["**/*_generated.py".to_string()],
            ..Default::default()
        };
        let filter = config.file_filter().unwrap();

        assert!(filter.accepts_file(Path::new("src/app.py")));
        assert!(!filter.accepts_file(Path::new("docs/conf.py")));
        assert!(!filter.accepts_file(Path::new("src/models_generated.py")));
        assert!(!filter.accepts_file(Path::new("src/node_modules/x/index.js")));
    }

    #[test]
    fn test_prunes_excluded_directories() {
        let filter = AnalysisConfig::default().file_filter().unwrap();
        assert!(filter.prunes_dir(Path::new("node_modules")));
        assert!(filter.prunes_dir(Path::new("web/node_modules")));
        assert!(filter.prunes_dir(Path::new(".git")));
        assert!(!filter.prunes_dir(Path::new("src")));
        assert!(!filter.prunes_dir(Path::new("")));
    }

    #[test]
    fn test_default_excludes_can_be_disabled() {
        let config = AnalysisConfig {
            use_default_excludes: false,
            ..Default::default()
        };
        let filter = config.file_filter().unwrap();
        assert!(filter.accepts_file(Path::new("vendor/lib.go")));
    }
}
