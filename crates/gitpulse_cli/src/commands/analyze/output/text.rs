//! Text output formatting for analysis results.

use std::io::Write;

use console::style;
use gitpulse_core::SurvivalCurve;
use gitpulse_core::prelude::*;

use super::OutputContext;
use crate::ui::{colors, format_duration, indicators, pluralise_word, truncate_start};

const SHORT_HASH_LEN: usize = 7;
const PATH_WIDTH: usize = 56;
const TREE_ENTRIES: usize = 8;

/// Renders the analysis result as styled, human-readable text.
pub fn write(ctx: &OutputContext, writer: &mut dyn Write) -> anyhow::Result<()> {
    let result = ctx.result;

    writeln!(writer)?;
    write_heading(result, writer)?;

    if result.commit_count == 0 && !result.is_partial() {
        writeln!(writer)?;
        write_summary(ctx, writer)?;
        writeln!(writer)?;
        return Ok(());
    }

    if result.section_status(Section::Hotspots).is_complete() {
        write_hotspots(result, ctx.top, writer)?;
    }
    if result.section_status(Section::Churn).is_complete() {
        write_churn(result, ctx.top, writer)?;
    }
    if result.section_status(Section::FileTree).is_complete() {
        write_tree(&result.file_tree, writer)?;
    }
    if result.section_status(Section::SurvivalCurves).is_complete() {
        write_survival(&result.survival_curves, writer)?;
    }

    writeln!(writer)?;
    write_skipped(result, writer)?;
    write_summary(ctx, writer)?;
    writeln!(writer)?;

    Ok(())
}

fn write_heading(result: &AnalysisResult, writer: &mut dyn Write) -> anyhow::Result<()> {
    let head = result.head_commit.as_deref().map_or_else(
        || "no commits".to_string(),
        |h| h.get(..SHORT_HASH_LEN).unwrap_or(h).to_string(),
    );

    writeln!(
        writer,
        "{} {} {}",
        style(result.repository.slug()).bold(),
        colors::muted().apply_to("·"),
        colors::emphasis().apply_to(head),
    )?;
    writeln!(writer, "  {}", colors::muted().apply_to(&result.repository.url))?;
    Ok(())
}

fn write_section_title(title: &str, writer: &mut dyn Write) -> anyhow::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", colors::primary().apply_to(title))?;
    Ok(())
}

fn write_hotspots(result: &AnalysisResult, top: usize, writer: &mut dyn Write) -> anyhow::Result<()> {
    write_section_title("Hotspots", writer)?;

    if result.hotspots.is_empty() {
        writeln!(writer, "  {}", colors::muted().apply_to("no changed files"))?;
        return Ok(());
    }

    for hotspot in result.hotspots.iter().take(top) {
        writeln!(
            writer,
            "  {:>6}  {}",
            colors::emphasis().apply_to(hotspot.change_count),
            colors::accent().apply_to(truncate_start(&hotspot.path, PATH_WIDTH)),
        )?;
    }

    write_more(result.hotspots.len(), top, writer)
}

fn write_churn(result: &AnalysisResult, top: usize, writer: &mut dyn Write) -> anyhow::Result<()> {
    write_section_title("Churn", writer)?;

    if result.churn.is_empty() {
        writeln!(writer, "  {}", colors::muted().apply_to("no line changes"))?;
        return Ok(());
    }

    for churn in result.churn.iter().take(top) {
        writeln!(
            writer,
            "  {:>8} {:>8}  {}",
            colors::success().apply_to(format!("+{}", churn.additions)),
            colors::error().apply_to(format!("-{}", churn.deletions)),
            colors::accent().apply_to(truncate_start(&churn.path, PATH_WIDTH)),
        )?;
    }

    write_more(result.churn.len(), top, writer)
}

fn write_more(total: usize, shown: usize, writer: &mut dyn Write) -> anyhow::Result<()> {
    if total > shown {
        let rest = total - shown;
        writeln!(
            writer,
            "  {}",
            colors::muted().apply_to(format!("… {rest} more {}", pluralise_word(rest, "file", "files")))
        )?;
    }
    Ok(())
}

fn write_tree(root: &FileNode, writer: &mut dyn Write) -> anyhow::Result<()> {
    write_section_title("Files", writer)?;

    let files = root.leaves().len();
    writeln!(
        writer,
        "  {} {} {} {} {}",
        colors::emphasis().apply_to(root.loc),
        colors::muted().apply_to("lines in"),
        colors::emphasis().apply_to(files),
        colors::muted().apply_to(pluralise_word(files, "file", "files")),
        colors::muted().apply_to(format!("· churn {}", root.churn)),
    )?;

    let count = root.children.len().min(TREE_ENTRIES);
    for (i, child) in root.children.iter().take(TREE_ENTRIES).enumerate() {
        let prefix = if i + 1 == count { "└─" } else { "├─" };
        let name = if child.is_leaf() {
            child.name.clone()
        } else {
            format!("{}/", child.name)
        };

        writeln!(
            writer,
            "  {} {:<32} {:>9} {}",
            colors::muted().apply_to(prefix),
            colors::accent().apply_to(name),
            colors::secondary().apply_to(child.loc),
            colors::muted().apply_to(format!("churn {}", child.churn)),
        )?;
    }

    if root.children.len() > TREE_ENTRIES {
        let rest = root.children.len() - TREE_ENTRIES;
        writeln!(writer, "     {}", colors::muted().apply_to(format!("… {rest} more")))?;
    }

    Ok(())
}

fn write_survival(curves: &[SurvivalCurve], writer: &mut dyn Write) -> anyhow::Result<()> {
    write_section_title("Code survival", writer)?;

    if curves.is_empty() {
        writeln!(writer, "  {}", colors::muted().apply_to("no cohorts"))?;
        return Ok(());
    }

    for curve in curves {
        let samples = curve
            .samples
            .iter()
            .map(|s| format_fraction(s.surviving_fraction))
            .collect::<Vec<_>>()
            .join(" ");

        writeln!(
            writer,
            "  {} {:>8} {}  {}",
            colors::emphasis().apply_to(&curve.cohort_label),
            colors::secondary().apply_to(curve.introduced_lines),
            colors::muted().apply_to("lines"),
            samples,
        )?;
    }

    writeln!(
        writer,
        "  {}",
        colors::muted().apply_to("samples every few weeks from each quarter's end")
    )?;
    Ok(())
}

fn format_fraction(fraction: Option<f64>) -> String {
    match fraction {
        None => colors::muted().apply_to("  -").to_string(),
        Some(f) => {
            let text = format!("{:>3.0}%", f * 100.0);
            if f >= 0.75 {
                colors::success().apply_to(text).to_string()
            } else if f >= 0.4 {
                colors::warning().apply_to(text).to_string()
            } else {
                colors::error().apply_to(text).to_string()
            }
        }
    }
}

fn write_skipped(result: &AnalysisResult, writer: &mut dyn Write) -> anyhow::Result<()> {
    for (section, reason) in result.skipped() {
        writeln!(
            writer,
            "{} {} {}",
            colors::warning().apply_to(indicators::WARNING),
            colors::secondary().apply_to(format!("{section} skipped:")),
            colors::muted().apply_to(reason),
        )?;
    }
    Ok(())
}

fn write_summary(ctx: &OutputContext, writer: &mut dyn Write) -> anyhow::Result<()> {
    let result = ctx.result;
    let commits = format!(
        "{} {}",
        result.commit_count,
        pluralise_word(result.commit_count, "commit", "commits")
    );
    let timing = format!("({})", format_duration(ctx.stats.elapsed));

    let (indicator, headline) = if result.is_partial() {
        (
            colors::warning().apply_to(indicators::SKIPPED),
            colors::primary().apply_to("Partial analysis"),
        )
    } else {
        (
            colors::success().apply_to(indicators::SUCCESS),
            colors::primary().apply_to("Analysis complete"),
        )
    };

    let dropped = if result.diagnostics.dropped_lines > 0 {
        format!(
            " {} {}",
            colors::muted().apply_to("·"),
            colors::muted().apply_to(format!("{} malformed lines skipped", result.diagnostics.dropped_lines)),
        )
    } else {
        String::new()
    };

    writeln!(
        writer,
        "{} {} {} {}{} {}",
        indicator,
        headline,
        colors::muted().apply_to("·"),
        colors::muted().apply_to(&commits),
        dropped,
        colors::muted().apply_to(&timing),
    )?;

    Ok(())
}
