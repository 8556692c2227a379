//! Analyze context - configuration loading and request construction.

use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use gitpulse_core::prelude::*;

use crate::{AnalyzeArgs, CONFIG_FILENAME};

/// Everything needed to run one analysis from CLI arguments.
#[derive(Debug)]
pub struct AnalyzeContext {
    /// Analyzer built from the effective configuration.
    pub analyzer: Analyzer,
    /// The repository to analyse.
    pub request: AnalysisRequest,
    /// Overall budget, clone included.
    pub timeout: Duration,
}

impl AnalyzeContext {
    /// Loads `.gitpulse.toml`, applies CLI overrides and builds the request.
    pub fn load(args: &AnalyzeArgs) -> anyhow::Result<Self> {
        let config_path = args.config.as_deref().unwrap_or(Path::new(CONFIG_FILENAME));
        let config = AnalysisConfig::load(config_path).context("loading config")?;
        let config = apply_overrides(config, args);

        let analyzer = Analyzer::new(config).context("building analyzer")?;

        Ok(Self {
            analyzer,
            request: build_request(args),
            timeout: Duration::from_secs(args.timeout),
        })
    }
}

fn apply_overrides(mut config: AnalysisConfig, args: &AnalyzeArgs) -> AnalysisConfig {
    if let Some(concurrency) = args.concurrency {
        config.max_concurrency = Some(concurrency);
    }
    config.exclude_paths.extend(args.exclude.iter().cloned());
    config
}

fn build_request(args: &AnalyzeArgs) -> AnalysisRequest {
    let repository = match (&args.owner, &args.name) {
        (Some(owner), Some(name)) => RepositoryIdentity::new(owner, name, &args.url),
        _ => RepositoryIdentity::from_url(&args.url),
    };

    let mut request = AnalysisRequest::new(repository);
    if let Some(head) = &args.head {
        request = request.with_head_commit(head);
    }
    if let Some(as_of) = args.as_of {
        request = request.with_as_of(as_of);
    }
    request
}
