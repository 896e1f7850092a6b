//! Per-file structural analysis.
//!
//! Turns scanned source files into [`ParsedFile`]s: symbols, syntactic
//! dependencies and complexity metrics, extracted through one
//! [`LanguagePlugin`] per language.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌────────────────┐     ┌───────────────┐
//! │ ProjectStructure│────▶│ CodeAnalyzer   │────▶│ ParsedFile    │
//! └─────────────────┘     │ (rayon pool)   │     │ (Symbols,     │
//!                         └───────┬────────┘     │  Dependencies,│
//!                                 │              │  Metrics)     │
//!                                 ▼              └───────────────┘
//!                         ┌────────────────┐
//!                         │ ParserRegistry │──▶ TreeSitterPlugin<G>
//!                         └────────────────┘──▶ GenericPlugin
//! ```
//!
//! # Adding a New Language
//!
//! 1. Create a module in `src/analysis/languages/` with a `Grammar` impl
//! 2. Write its import and control-flow queries
//! 3. Add the plugin to `languages::builtin_plugins`
//!
//! Or register any [`LanguagePlugin`] at runtime with
//! [`ParserRegistry::register`].

mod analyzer;
mod facts;
pub mod languages;
mod registry;
mod traits;
pub mod treesitter;

pub use analyzer::{analyze_path, AnalysisRun, CancellationToken, CodeAnalyzer};
pub use facts::{
    qualify, ControlFlowInfo, Dependency, DependencyKind, FileMetrics, Location, Span, Symbol,
    SymbolKind, Visibility,
};
pub use languages::GenericPlugin;
pub use registry::ParserRegistry;
pub use traits::{LanguagePlugin, ParseLimits, ParsedFile, SyntaxTree};
