//! Language identifiers shared by the scanner, the registry and the plugins.

use std::fmt;
use std::str::FromStr;

use phf::phf_map;
use serde::{Deserialize, Serialize};

/// A language a file can be classified as.
///
/// Python through Cpp, Swift and Scala have dedicated tree-sitter plugins;
/// the rest are recognized so they can be counted and filtered, but are
/// always served by the generic text plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Php,
    Kotlin,
    Swift,
    Scala,
    Shell,
    Unknown,
}

/// Extension (lowercase, without dot) to language.
///
/// `h` is deliberately absent: header files are sniffed, see `scan::classify`.
static EXTENSIONS: phf::Map<&'static str, Language> = phf_map! {
    "py" => Language::Python,
    "pyi" => Language::Python,
    "rs" => Language::Rust,
    "js" => Language::JavaScript,
    "jsx" => Language::JavaScript,
    "mjs" => Language::JavaScript,
    "cjs" => Language::JavaScript,
    "ts" => Language::TypeScript,
    "tsx" => Language::TypeScript,
    "mts" => Language::TypeScript,
    "cts" => Language::TypeScript,
    "go" => Language::Go,
    "java" => Language::Java,
    "c" => Language::C,
    "cpp" => Language::Cpp,
    "cc" => Language::Cpp,
    "cxx" => Language::Cpp,
    "hpp" => Language::Cpp,
    "hh" => Language::Cpp,
    "hxx" => Language::Cpp,
    "cs" => Language::CSharp,
    "rb" => Language::Ruby,
    "php" => Language::Php,
    "kt" => Language::Kotlin,
    "kts" => Language::Kotlin,
    "swift" => Language::Swift,
    "scala" => Language::Scala,
    "sc" => Language::Scala,
    "sh" => Language::Shell,
    "bash" => Language::Shell,
    "zsh" => Language::Shell,
};

impl Language {
    /// All languages, in declaration order.
    pub const ALL: [Language; 16] = [
        Language::Python,
        Language::Rust,
        Language::JavaScript,
        Language::TypeScript,
        Language::Go,
        Language::Java,
        Language::C,
        Language::Cpp,
        Language::CSharp,
        Language::Ruby,
        Language::Php,
        Language::Kotlin,
        Language::Swift,
        Language::Scala,
        Language::Shell,
        Language::Unknown,
    ];

    /// Stable identifier used in configuration and output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Rust => "rust",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Kotlin => "kotlin",
            Language::Swift => "swift",
            Language::Scala => "scala",
            Language::Shell => "shell",
            Language::Unknown => "unknown",
        }
    }

    /// Look up a language by file extension (case-insensitive, no dot).
    pub fn from_extension(ext: &str) -> Option<Language> {
        EXTENSIONS.get(ext.to_ascii_lowercase().as_str()).copied()
    }

    /// Extensions mapped to this language, sorted.
    pub fn extensions(&self) -> Vec<&'static str> {
        let mut exts: Vec<&'static str> = EXTENSIONS
            .entries()
            .filter(|(_, lang)| **lang == *self)
            .map(|(ext, _)| *ext)
            .collect();
        exts.sort_unstable();
        exts
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let alias = match lowered.as_str() {
            "py" => "python",
            "rs" => "rust",
            "js" => "javascript",
            "ts" => "typescript",
            "golang" => "go",
            "c++" => "cpp",
            "c#" | "cs" => "csharp",
            "sh" | "bash" => "shell",
            other => other,
        };
        Language::ALL
            .iter()
            .find(|l| l.as_str() == alias)
            .copied()
            .ok_or_else(|| format!("unknown language {:?}", s))
    }
}
