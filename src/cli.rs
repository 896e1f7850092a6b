//! Command-line interface for archlens.

use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::analysis::{CodeAnalyzer, ParserRegistry};
use crate::config::{AnalysisConfig, AnalysisDepth, DEFAULT_CONFIG_NAMES};
use crate::language::Language;
use crate::report::{self, Format};
use crate::result::AnalysisResult;
use crate::scan;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default configuration written by `init`.
const CONFIG_TEMPLATE: &str = include_str!("templates/archlens.yaml");

/// Static architecture analysis for multi-language source trees.
///
/// Scans a directory, extracts symbols and dependencies with tree-sitter,
/// builds a cross-file dependency graph and detects architectural patterns.
#[derive(Parser)]
#[command(name = "archlens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a source tree
    Analyze(AnalyzeArgs),
    /// List supported languages and their file extensions
    Languages,
    /// Write a default archlens.yaml to the current directory
    Init(InitArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Root directory to analyze
    pub path: PathBuf,

    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Only analyze files matching this glob (repeatable)
    #[arg(long = "include", value_name = "GLOB")]
    pub include: Vec<String>,

    /// Skip files matching this glob (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Restrict analysis to a language id (repeatable)
    #[arg(short, long = "language", value_name = "ID")]
    pub languages: Vec<String>,

    /// Analysis depth: shallow or full
    #[arg(short, long)]
    pub depth: Option<AnalysisDepth>,

    /// Worker threads (default: all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Per-file timeout in milliseconds, 0 disables it
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Skip files larger than this many bytes
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Do not apply the built-in exclude list
    #[arg(long)]
    pub no_default_excludes: bool,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl AnalyzeArgs {
    /// Apply command-line overrides on top of file configuration.
    pub fn apply(&self, config: &mut AnalysisConfig) {
        config.include_patterns.extend(self.include.iter().cloned());
        config.exclude_patterns.extend(self.exclude.iter().cloned());
        if !self.languages.is_empty() {
            config.languages = self.languages.clone();
        }
        if let Some(depth) = self.depth {
            config.analysis_depth = depth;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
        if let Some(timeout) = self.timeout_ms {
            config.file_timeout_ms = timeout;
        }
        if let Some(size) = self.max_file_size {
            config.max_file_size = size;
        }
        if self.no_default_excludes {
            config.use_default_excludes = false;
        }
    }
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_NAMES[0])]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    let format: Format = match args.format.parse() {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let mut config = match AnalysisConfig::load_or_default(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };
    args.apply(&mut config);

    let structure = match config.validate().and_then(|_| scan::scan(&args.path, &config)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if structure.files.is_empty() {
        eprintln!("Warning: no files to analyze");
    }

    let registry = ParserRegistry::with_defaults();
    let mut analyzer = CodeAnalyzer::new(&config, &registry);
    if !args.no_progress && format == Format::Pretty && args.output.is_none() {
        analyzer = analyzer.with_progress(progress_bar());
    }

    let result = match analyzer.analyze(structure) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    match &args.output {
        Some(path) => {
            colored::control::set_override(false);
            let mut out = BufWriter::new(File::create(path)?);
            write_report(&mut out, format, &result)?;
            out.flush()?;
            eprintln!("Wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_report(&mut out, format, &result)?;
        }
    }

    if result.incomplete {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

fn write_report<W: Write>(
    out: &mut W,
    format: Format,
    result: &AnalysisResult,
) -> anyhow::Result<()> {
    match format {
        Format::Json => report::write_json(out, result),
        Format::Pretty => Ok(report::write_pretty(out, result)?),
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// Run the languages command.
pub fn run_languages() -> anyhow::Result<i32> {
    let registry = ParserRegistry::with_defaults();

    println!("{}", "Grammar plugins:".bold());
    for language in registry.languages() {
        println!("  {:<12} {}", language.as_str(), language.extensions().join(", "));
    }

    println!();
    println!("{}", "Generic extraction only:".bold());
    for language in Language::ALL {
        if registry.supports(language) || language == Language::Unknown {
            continue;
        }
        println!("  {:<12} {}", language.as_str(), language.extensions().join(", "));
    }
    println!("  {:<12} {}", "unknown", "anything else".dimmed());

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Use --force to overwrite it or --output to pick another path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, CONFIG_TEMPLATE) {
        eprintln!("Error: failed to write configuration: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize for your project", args.output.display());
    println!("  2. Run: archlens analyze . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_is_default_config() {
        let parsed = AnalysisConfig::from_yaml(CONFIG_TEMPLATE).unwrap();
        let defaults = AnalysisConfig::default();
        assert_eq!(parsed.max_file_size, defaults.max_file_size);
        assert_eq!(parsed.file_timeout_ms, defaults.file_timeout_ms);
        assert_eq!(parsed.analysis_depth, defaults.analysis_depth);
        assert!(parsed.use_default_excludes);
        assert!(parsed.threads.is_none());
    }

    #[test]
    fn test_flags_override_file_values() {
        let cli = Cli::try_parse_from([
            "archlens",
            "analyze",
            "src",
            "--exclude",
            "**/gen/**",
            "-l",
            "go",
            "--depth",
            "shallow",
            "-j",
            "2",
            "--no-default-excludes",
        ])
        .unwrap();
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };

        let mut config = AnalysisConfig {
            exclude_patterns: vec!["**/*.min.js".to_string()],
            ..Default::default()
        };
        args.apply(&mut config);
        assert_eq!(config.exclude_patterns, vec!["**/*.min.js", "**/gen/**"]);
        assert_eq!(config.languages, vec!["go"]);
        assert_eq!(config.analysis_depth, AnalysisDepth::Shallow);
        assert_eq!(config.threads, Some(2));
        assert!(!config.use_default_excludes);
    }
}
