//! Output formatting for analysis results.
//!
//! Two formats:
//! - Pretty: colored terminal summary for humans
//! - JSON: the full [`AnalysisResult`] for downstream tools

use std::io::{self, Write};

use colored::*;
use serde::Serialize;

use crate::error::{EventKind, RunEvent};
use crate::patterns::ArchitecturalPattern;
use crate::result::AnalysisResult;

/// Most cycles and log entries printed in the pretty summary.
const PRETTY_LIST_LIMIT: usize = 10;

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Json,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "json" => Ok(Format::Json),
            _ => Err(format!("invalid format {:?}, must be 'pretty' or 'json'", s)),
        }
    }
}

// =============================================================================
// JSON Format
// =============================================================================

/// Top-level JSON document.
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub version: &'static str,
    #[serde(flatten)]
    pub result: &'a AnalysisResult,
}

/// Write the result as pretty-printed JSON.
pub fn write_json<W: Write>(out: &mut W, result: &AnalysisResult) -> anyhow::Result<()> {
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        result,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write a colored summary of the result.
pub fn write_pretty<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    let structure = &result.structure;

    // Header
    writeln!(out)?;
    writeln!(
        out,
        "  {} v{}",
        "archlens".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out)?;

    writeln!(out, "  {}{}", "Root:     ".dimmed(), structure.root.display())?;
    writeln!(out, "  {}{}", "Project:  ".dimmed(), structure.project_type)?;
    writeln!(
        out,
        "  {}{}",
        "Depth:    ".dimmed(),
        format!("{:?}", result.depth).to_lowercase()
    )?;
    writeln!(out)?;

    write_status(out, result)?;
    writeln!(out)?;

    write_languages(out, result)?;
    writeln!(out)?;

    write_graph(out, result)?;
    writeln!(out)?;

    if !result.patterns.is_empty() {
        write_patterns(out, &result.patterns)?;
        writeln!(out)?;
    }

    if !result.complexity.hotspots.is_empty() {
        write_hotspots(out, result)?;
        writeln!(out)?;
    }

    let warnings: Vec<&RunEvent> = result
        .log
        .entries()
        .iter()
        .filter(|e| !e.kind.is_informational())
        .collect();
    if !warnings.is_empty() {
        write_events(out, &warnings)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_status<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    if result.incomplete {
        write!(out, "  {}", "✗ INCOMPLETE".red())?;
    } else {
        write!(out, "  {}", "✓ COMPLETE".green())?;
    }
    write!(
        out,
        "  {} files, {} symbols, {} dependencies",
        result.files.len(),
        result.symbol_count(),
        result.dependency_count()
    )?;

    let fallback = result.files.iter().filter(|f| f.fallback).count();
    let degraded = result.files.iter().filter(|f| f.is_degraded()).count();
    if fallback > 0 || degraded > 0 {
        write!(
            out,
            "  {}",
            format!("({} generic, {} degraded)", fallback, degraded).dimmed()
        )?;
    }
    writeln!(out)
}

fn write_languages<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    writeln!(out, "  {}", "Languages:".bold())?;
    let mut counts: Vec<_> = result.structure.language_counts.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (language, count) in counts {
        let plural = if *count != 1 { "s" } else { "" };
        writeln!(out, "    {:<12} {:>5} file{}", language.as_str(), count, plural)?;
    }
    Ok(())
}

fn write_graph<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    let graph = &result.graph;
    writeln!(out, "  {}", "Dependency graph:".bold())?;
    writeln!(
        out,
        "    {} nodes, {} edges, {} external, {} unresolved edges",
        graph.node_count(),
        graph.edge_count(),
        graph.external_nodes().count(),
        graph.unresolved_edge_count()
    )?;

    let cycles = graph.cycles();
    if cycles.is_empty() {
        writeln!(out, "    {}", "no cycles".green())?;
        return Ok(());
    }
    writeln!(out, "    {} ({}):", "Cycles".yellow(), cycles.len())?;
    for cycle in cycles.iter().take(PRETTY_LIST_LIMIT) {
        writeln!(out, "      {}", cycle.join(" ⇄ ").dimmed())?;
    }
    if cycles.len() > PRETTY_LIST_LIMIT {
        writeln!(out, "      … {} more", cycles.len() - PRETTY_LIST_LIMIT)?;
    }
    Ok(())
}

fn write_patterns<W: Write>(out: &mut W, patterns: &[ArchitecturalPattern]) -> io::Result<()> {
    writeln!(out, "  {}", "Patterns:".bold())?;
    for pattern in patterns {
        write!(out, "    {:<14}", pattern.tag.as_str())?;
        write_colored_confidence(out, pattern.confidence)?;
        writeln!(out)?;
        writeln!(out, "      {}", pattern.rationale.dimmed())?;
    }
    Ok(())
}

fn write_colored_confidence<W: Write>(out: &mut W, confidence: f64) -> io::Result<()> {
    let text = format!("{:>3.0}%", confidence * 100.0);
    match confidence {
        c if c >= 0.75 => write!(out, "{}", text.green().bold()),
        c if c >= 0.5 => write!(out, "{}", text.green()),
        c if c >= 0.25 => write!(out, "{}", text.yellow()),
        _ => write!(out, "{}", text.red()),
    }
}

fn write_hotspots<W: Write>(out: &mut W, result: &AnalysisResult) -> io::Result<()> {
    let complexity = &result.complexity;
    writeln!(
        out,
        "  {} (mean {:.1}, max {} per file):",
        "Complexity".bold(),
        complexity.mean_cyclomatic,
        complexity.max_cyclomatic
    )?;
    for hotspot in &complexity.hotspots {
        writeln!(
            out,
            "    {:>4}  {}{}",
            hotspot.complexity,
            hotspot.id,
            format!("  {}:{}", hotspot.file.display(), hotspot.line).dimmed()
        )?;
    }
    Ok(())
}

fn write_events<W: Write>(out: &mut W, events: &[&RunEvent]) -> io::Result<()> {
    writeln!(out, "  {} ({}):", "Warnings".bold(), events.len())?;
    for event in events.iter().take(PRETTY_LIST_LIMIT) {
        write_event_tag(out, event.kind)?;
        if let Some(file) = &event.file {
            write!(out, "{} ", file.display().to_string().blue())?;
        }
        writeln!(out, "{}", event.message)?;
    }
    if events.len() > PRETTY_LIST_LIMIT {
        writeln!(out, "    … {} more", events.len() - PRETTY_LIST_LIMIT)?;
    }
    Ok(())
}

fn write_event_tag<W: Write>(out: &mut W, kind: EventKind) -> io::Result<()> {
    match kind {
        EventKind::PermissionError | EventKind::ScanError => {
            write!(out, "    {} ", "SCAN ".red())
        }
        EventKind::ParseError | EventKind::TimeoutError => {
            write!(out, "    {} ", "PARSE".yellow())
        }
        _ => write!(out, "    {} ", "SKIP ".blue()),
    }
}
