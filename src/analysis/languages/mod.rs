//! Language plugin implementations.
//!
//! Grammar-backed languages are a [`TreeSitterPlugin`] over a per-language
//! [`Grammar`](crate::analysis::treesitter::Grammar); everything else goes
//! through [`GenericPlugin`].
//!
//! [`TreeSitterPlugin`]: crate::analysis::treesitter::TreeSitterPlugin

mod c;
mod cpp;
mod generic;
mod go;
mod java;
mod javascript;
mod python;
mod rust_lang;
mod scala;
mod swift;
mod typescript;

pub use c::{CGrammar, CPlugin};
pub use cpp::{CppGrammar, CppPlugin};
pub use generic::GenericPlugin;
pub use go::{GoGrammar, GoPlugin};
pub use java::{JavaGrammar, JavaPlugin};
pub use javascript::{JavaScriptGrammar, JavaScriptPlugin};
pub use python::{PythonGrammar, PythonPlugin};
pub use rust_lang::{RustGrammar, RustPlugin};
pub use scala::{ScalaGrammar, ScalaPlugin};
pub use swift::{SwiftGrammar, SwiftPlugin};
pub use typescript::{TypeScriptGrammar, TypeScriptPlugin};

use std::sync::Arc;

use super::LanguagePlugin;

/// Every grammar-backed plugin, built fresh.
///
/// Construction compiles the plugin's queries; a plugin whose queries do
/// not match its grammar is returned as an error so the caller can fall
/// back for that language.
pub fn builtin_plugins() -> Vec<anyhow::Result<Arc<dyn LanguagePlugin>>> {
    fn boxed<P: LanguagePlugin + 'static>(
        plugin: anyhow::Result<P>,
    ) -> anyhow::Result<Arc<dyn LanguagePlugin>> {
        plugin.map(|p| Arc::new(p) as Arc<dyn LanguagePlugin>)
    }

    vec![
        boxed(PythonPlugin::create()),
        boxed(RustPlugin::create()),
        boxed(JavaScriptPlugin::create()),
        boxed(TypeScriptPlugin::create()),
        boxed(GoPlugin::create()),
        boxed(JavaPlugin::create()),
        boxed(CPlugin::create()),
        boxed(CppPlugin::create()),
        boxed(SwiftPlugin::create()),
        boxed(ScalaPlugin::create()),
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for plugin unit tests.

    use std::path::{Path, PathBuf};

    use crate::analysis::{DependencyKind, LanguagePlugin, ParseLimits, ParsedFile, Symbol};
    use crate::language::Language;
    use crate::scan::SourceFile;

    /// Parse and extract `source` as if it lived at `path`.
    pub fn run(plugin: &dyn LanguagePlugin, path: &str, source: &str) -> ParsedFile {
        let language = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Language::from_extension)
            .unwrap_or(Language::Unknown);
        let file = SourceFile::new(Path::new(""), &PathBuf::from(path), language, source.len() as u64);
        let mut parsed = plugin
            .parse(&file, source.as_bytes(), ParseLimits::default())
            .unwrap();
        parsed.symbols = plugin.extract_symbols(&parsed).unwrap();
        parsed.dependencies = plugin.extract_dependencies(&parsed).unwrap();
        parsed
    }

    /// The first symbol with this qualified name.
    pub fn symbol<'p>(parsed: &'p ParsedFile, qualified: &str) -> &'p Symbol {
        parsed
            .symbols
            .iter()
            .find(|s| s.qualified_name == qualified)
            .unwrap_or_else(|| {
                let known: Vec<_> = parsed.symbols.iter().map(|s| &s.qualified_name).collect();
                panic!("no symbol {qualified}; have {known:?}")
            })
    }

    /// Targets of one dependency kind, in order.
    pub fn targets(parsed: &ParsedFile, kind: DependencyKind) -> Vec<&str> {
        parsed
            .dependencies
            .iter()
            .filter(|d| d.kind == kind)
            .map(|d| d.target.as_str())
            .collect()
    }
}
