//! Orchestrates per-file analysis across a worker pool.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::{LanguagePlugin, ParseLimits, ParsedFile, ParserRegistry, SyntaxTree};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, EventKind, FileError, RunEvent, RunLog};
use crate::graph::GraphBuilder;
use crate::patterns;
use crate::result::{AnalysisResult, ComplexitySummary};
use crate::scan::{self, ProjectStructure, SourceFile};

/// Cooperative cancellation flag shared with a running analysis.
///
/// Workers check it before taking a file; files already in flight finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-file results of one run, in input order.
#[derive(Debug)]
pub struct AnalysisRun {
    pub files: Vec<ParsedFile>,
    pub log: RunLog,
    /// Some files were not processed because the run was cancelled.
    pub incomplete: bool,
}

/// What one worker hands back for one file.
struct FileOutcome {
    parsed: ParsedFile,
    events: Vec<RunEvent>,
}

/// Drives every selected file through the registry.
pub struct CodeAnalyzer<'r> {
    config: AnalysisConfig,
    registry: &'r ParserRegistry,
    cancel: CancellationToken,
    progress: Option<ProgressBar>,
}

impl<'r> CodeAnalyzer<'r> {
    pub fn new(config: &AnalysisConfig, registry: &'r ParserRegistry) -> Self {
        Self {
            config: config.clone(),
            registry,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Advance `bar` once per processed file.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Analyze a scanned project into the final result.
    pub fn analyze(&self, structure: ProjectStructure) -> Result<AnalysisResult, AnalysisError> {
        let run = self.analyze_files(&structure.files)?;

        info!(files = run.files.len(), "building dependency graph");
        let graph = GraphBuilder::build(&run.files);

        let patterns = if self.config.analysis_depth.includes_dependencies() {
            patterns::detect(&structure, &graph)
        } else {
            Vec::new()
        };
        let complexity = ComplexitySummary::from_files(&run.files);

        let mut log = RunLog::new();
        log.extend(structure.issues.iter().cloned());
        log.extend(run.log.entries().iter().cloned());

        Ok(AnalysisResult {
            structure,
            files: run.files,
            graph,
            patterns,
            complexity,
            log,
            depth: self.config.analysis_depth,
            incomplete: run.incomplete,
        })
    }

    /// Parse and extract every file. Output order equals input order.
    pub fn analyze_files(&self, files: &[SourceFile]) -> Result<AnalysisRun, AnalysisError> {
        info!(files = files.len(), depth = ?self.config.analysis_depth, "analyzing files");
        if let Some(bar) = &self.progress {
            bar.set_length(files.len() as u64);
        }

        let outcomes = match self.config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| AnalysisError::ThreadPool(e.to_string()))?;
                pool.install(|| self.process_all(files))
            }
            None => self.process_all(files),
        };

        if let Some(bar) = &self.progress {
            bar.finish_and_clear();
        }

        let mut run = AnalysisRun {
            files: Vec::with_capacity(files.len()),
            log: RunLog::new(),
            incomplete: false,
        };
        let mut skipped = 0usize;
        for outcome in outcomes {
            match outcome {
                Some(outcome) => {
                    run.log.extend(outcome.events);
                    run.files.push(outcome.parsed);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "analysis cancelled");
            run.incomplete = true;
            run.log.push(RunEvent::new(
                EventKind::CancellationRequested,
                None,
                format!("cancelled with {} file(s) not analyzed", skipped),
            ));
        }
        Ok(run)
    }

    fn process_all(&self, files: &[SourceFile]) -> Vec<Option<FileOutcome>> {
        files
            .par_iter()
            .map(|file| {
                if self.cancel.is_cancelled() {
                    return None;
                }
                let outcome = self.process(file);
                if let Some(bar) = &self.progress {
                    bar.inc(1);
                }
                Some(outcome)
            })
            .collect()
    }

    fn process(&self, file: &SourceFile) -> FileOutcome {
        let mut events = Vec::new();

        if file.size > self.config.max_file_size {
            let err = FileError::TooLarge {
                file: file.path.clone(),
                size: file.size,
                limit: self.config.max_file_size,
            };
            debug!("{}", err);
            events.push(err.to_event());
            return FileOutcome {
                parsed: degraded(file, err),
                events,
            };
        }

        let source = match fs::read(&file.abs_path) {
            Ok(source) => source,
            Err(e) => {
                let err = FileError::Unreadable {
                    file: file.path.clone(),
                    reason: e.to_string(),
                };
                warn!("{}", err);
                events.push(err.to_event());
                return FileOutcome {
                    parsed: degraded(file, err),
                    events,
                };
            }
        };

        let (plugin, missing) = self.registry.resolve(file.language);
        if missing {
            events.push(RunEvent::new(
                EventKind::PluginFallback,
                Some(&file.path),
                format!("no plugin for {}, using generic extraction", file.language),
            ));
        }

        // The generic plugin never fails on its own, so it runs unbounded.
        let timeout = if missing { None } else { self.file_timeout() };
        let parsed = match self.run_plugin(plugin, file, &source, timeout) {
            Ok(parsed) => parsed,
            Err(err) if !missing => {
                warn!("{}", err);
                events.push(err.to_event());
                events.push(RunEvent::new(
                    EventKind::PluginFallback,
                    Some(&file.path),
                    format!("{} plugin failed, using generic extraction", file.language),
                ));
                match self.run_plugin(self.registry.generic(), file, &source, None) {
                    Ok(mut parsed) => {
                        parsed.fallback = true;
                        parsed.partial = true;
                        parsed.error = Some(err);
                        parsed
                    }
                    Err(second) => {
                        warn!("{}", second);
                        events.push(second.to_event());
                        degraded(file, err)
                    }
                }
            }
            Err(err) => {
                warn!("{}", err);
                events.push(err.to_event());
                degraded(file, err)
            }
        };

        debug!(
            file = %file.path.display(),
            symbols = parsed.symbols.len(),
            dependencies = parsed.dependencies.len(),
            fallback = parsed.fallback,
            "file analyzed"
        );
        FileOutcome { parsed, events }
    }

    fn file_timeout(&self) -> Option<Duration> {
        (self.config.file_timeout_ms > 0).then(|| Duration::from_millis(self.config.file_timeout_ms))
    }

    /// One full plugin invocation, contained: panics become parse errors and
    /// the whole invocation counts against `timeout`.
    fn run_plugin(
        &self,
        plugin: &dyn LanguagePlugin,
        file: &SourceFile,
        source: &[u8],
        timeout: Option<Duration>,
    ) -> Result<ParsedFile, FileError> {
        let limits = ParseLimits { timeout };
        let with_dependencies = self.config.analysis_depth.includes_dependencies();
        let started = Instant::now();

        let result = panic::catch_unwind(AssertUnwindSafe(|| -> Result<ParsedFile, FileError> {
            let mut parsed = plugin.parse(file, source, limits)?;
            parsed.symbols = plugin
                .extract_symbols(&parsed)
                .map_err(|e| parse_error(file, format!("symbol extraction: {:#}", e)))?;
            if with_dependencies {
                parsed.dependencies = plugin
                    .extract_dependencies(&parsed)
                    .map_err(|e| parse_error(file, format!("dependency extraction: {:#}", e)))?;
            }
            Ok(parsed)
        }));

        let mut parsed = match result {
            Ok(result) => result?,
            Err(payload) => {
                return Err(parse_error(
                    file,
                    format!("plugin panicked: {}", panic_message(payload.as_ref())),
                ))
            }
        };

        if let Some(limit) = timeout {
            if started.elapsed() > limit {
                return Err(FileError::Timeout {
                    file: file.path.clone(),
                    limit_ms: limit.as_millis() as u64,
                });
            }
        }
        if !self.config.retain_syntax_trees {
            parsed.release_syntax();
        }
        Ok(parsed)
    }
}

/// Validate `config`, scan `root` and analyze it with the built-in plugins.
pub fn analyze_path(root: &Path, config: &AnalysisConfig) -> Result<AnalysisResult, AnalysisError> {
    config.validate()?;
    let structure = scan::scan(root, config)?;
    let registry = ParserRegistry::with_defaults();
    CodeAnalyzer::new(config, &registry).analyze(structure)
}

/// An empty slot carrying the reason it is empty.
fn degraded(file: &SourceFile, err: FileError) -> ParsedFile {
    let mut parsed = ParsedFile::new(file, SyntaxTree::default());
    parsed.partial = true;
    parsed.error = Some(err);
    parsed
}

fn parse_error(file: &SourceFile, reason: String) -> FileError {
    FileError::Parse {
        file: file.path.clone(),
        reason,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
