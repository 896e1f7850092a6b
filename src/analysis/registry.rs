//! Language id to plugin mapping.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::languages::{builtin_plugins, GenericPlugin};
use super::LanguagePlugin;
use crate::language::Language;

/// Plugins available to one run.
///
/// Built once and passed by reference to the analyzer. Languages without a
/// registered plugin are served by the generic text plugin.
pub struct ParserRegistry {
    plugins: HashMap<Language, Arc<dyn LanguagePlugin>>,
    generic: Arc<dyn LanguagePlugin>,
}

impl ParserRegistry {
    /// A registry with only the generic plugin.
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
            generic: Arc::new(GenericPlugin::new()),
        }
    }

    /// A registry with every built-in grammar plugin.
    ///
    /// A plugin that fails to build is left out with a warning; its
    /// language then falls back to the generic plugin.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for plugin in builtin_plugins() {
            match plugin {
                Ok(plugin) => {
                    registry.register(plugin);
                }
                Err(e) => warn!("language plugin unavailable: {:#}", e),
            }
        }
        debug!(languages = registry.plugins.len(), "parser registry ready");
        registry
    }

    /// Register a plugin under its own language, replacing any previous one.
    pub fn register(&mut self, plugin: Arc<dyn LanguagePlugin>) -> Option<Arc<dyn LanguagePlugin>> {
        let language = plugin.language();
        self.register_for(language, plugin)
    }

    /// Register a plugin under an explicit language.
    pub fn register_for(
        &mut self,
        language: Language,
        plugin: Arc<dyn LanguagePlugin>,
    ) -> Option<Arc<dyn LanguagePlugin>> {
        self.plugins.insert(language, plugin)
    }

    /// The dedicated plugin for `language`, if one is registered.
    pub fn get(&self, language: Language) -> Option<&dyn LanguagePlugin> {
        self.plugins.get(&language).map(|p| p.as_ref())
    }

    /// The plugin serving `language`, falling back to the generic plugin.
    /// The flag is true when the fallback was used.
    pub fn resolve(&self, language: Language) -> (&dyn LanguagePlugin, bool) {
        match self.get(language) {
            Some(plugin) => (plugin, false),
            None => (self.generic(), true),
        }
    }

    pub fn generic(&self) -> &dyn LanguagePlugin {
        self.generic.as_ref()
    }

    pub fn supports(&self, language: Language) -> bool {
        self.plugins.contains_key(&language)
    }

    /// Languages with a dedicated plugin, in declaration order.
    pub fn languages(&self) -> Vec<Language> {
        Language::ALL
            .iter()
            .copied()
            .filter(|l| self.plugins.contains_key(l))
            .collect()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
