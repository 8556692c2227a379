//! Analyze command - clones a repository and reports its history analytics.

mod context;
mod output;

use std::time::Instant;

use gitpulse_core::prelude::*;
#[cfg(feature = "tracing")]
use tracing::debug;

use self::context::AnalyzeContext;
use self::output::{AnalyzeStats, OutputContext};
use crate::ui::{self, exit, print_command_header};
use crate::{AnalyzeArgs, OutputFormat};

/// Executes the `gitpulse analyze` command.
pub fn run(args: &AnalyzeArgs) -> super::Result {
    let show_progress = should_show_progress(args);
    let start = Instant::now();

    if show_progress {
        print_command_header("analyze");
    }

    let context = AnalyzeContext::load(args)?;

    #[cfg(feature = "tracing")]
    debug!(
        url = %context.request.repository.url,
        workers = context.analyzer.pool().size(),
        timeout_secs = context.timeout.as_secs(),
        "starting analysis"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow::anyhow!("failed to create async runtime: {e}"))?;

    let spinner = show_progress.then(|| ui::create_spinner(format!("Analysing {}", context.request.repository.slug())));

    let outcome = runtime.block_on(async {
        let deadline = tokio::time::Instant::now() + context.timeout;
        context.analyzer.analyze(&context.request, deadline).await
    });

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            ui::print_error(&e.to_string());
            std::process::exit(exit_code(&e));
        }
    };

    let ctx = OutputContext {
        result: &result,
        stats: AnalyzeStats {
            elapsed: start.elapsed(),
        },
        top: args.top,
    };

    output::write_output(args, &ctx)
}

fn exit_code(error: &AnalysisError) -> i32 {
    if error.is_not_found() {
        exit::NOT_FOUND
    } else if error.is_timeout() {
        exit::TIMEOUT
    } else {
        exit::ERROR
    }
}

fn should_show_progress(args: &AnalyzeArgs) -> bool {
    args.output.is_none() && matches!(args.format, OutputFormat::Text)
}
