//! JSON output formatting for analysis results.

use std::io::Write;

use gitpulse_core::prelude::*;
use serde::Serialize;

use super::OutputContext;

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    partial: bool,
    #[serde(flatten)]
    result: &'a AnalysisResult,
}

const VERSION: &str = "1.0";

/// Serialises the analysis result as a pretty-printed JSON report.
pub fn write(ctx: &OutputContext, writer: &mut dyn Write) -> anyhow::Result<()> {
    let report = JsonReport {
        version: VERSION,
        partial: ctx.result.is_partial(),
        result: ctx.result,
    };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)?;
    Ok(())
}
