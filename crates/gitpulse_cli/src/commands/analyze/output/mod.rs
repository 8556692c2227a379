//! Output formatting for analysis results.

mod json;
mod text;

use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;

use anyhow::Context as _;
use gitpulse_core::prelude::*;

use crate::{AnalyzeArgs, OutputFormat};

/// Timing for a completed analysis as seen by the CLI.
#[derive(Debug)]
pub struct AnalyzeStats {
    /// Wall-clock time for the whole command, configuration included.
    pub elapsed: Duration,
}

/// Everything needed to render analysis output in any format.
#[derive(Debug)]
pub struct OutputContext<'a> {
    /// The analysis result.
    pub result: &'a AnalysisResult,
    /// Command statistics for the summary.
    pub stats: AnalyzeStats,
    /// Number of hotspots and churn rows shown in text output.
    pub top: usize,
}

/// Writes analysis output to a file or stdout in the requested format.
pub fn write_output(args: &AnalyzeArgs, ctx: &OutputContext) -> anyhow::Result<()> {
    if let Some(path) = &args.output {
        let file = File::create(path).with_context(|| format!("failed to create output file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_format(args.format, ctx, &mut writer)
    } else {
        let stdout = std::io::stdout();
        let mut writer = stdout.lock();
        write_format(args.format, ctx, &mut writer)
    }
}

fn write_format(format: OutputFormat, ctx: &OutputContext, writer: &mut dyn std::io::Write) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => text::write(ctx, writer),
        OutputFormat::Json => json::write(ctx, writer),
    }
}
