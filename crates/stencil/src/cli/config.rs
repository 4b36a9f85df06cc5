//! Config command - show the resolved scan policy
//!
//! The policy comes from, in order: `--config FILE`, `./stencil.toml`,
//! `<STENCIL_HOME>/stencil.toml`, or the built-in defaults.

use crate::cli::error::HelpfulError;
use crate::cli::output::print_table;
use serde::Serialize;
use std::path::{Path, PathBuf};
use stencil_scout::config::DEFAULT_CONFIG_FILE;
use stencil_scout::{ScanPolicy, ScoutError};
use tracing::debug;

#[derive(Debug)]
pub struct ConfigArgs {
    pub config: Option<PathBuf>,
    pub json: bool,
}

/// A scan policy and the file it came from, if any.
#[derive(Debug, Serialize)]
pub struct ResolvedPolicy {
    pub source: Option<PathBuf>,
    pub policy: ScanPolicy,
}

#[derive(Debug, Serialize)]
struct ConfigOutput<'a> {
    config_file: Option<&'a Path>,
    home: PathBuf,
    logs_dir: PathBuf,
    policy: &'a ScanPolicy,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let resolved = resolve_policy(args.config.as_deref())?;
    let output = ConfigOutput {
        config_file: resolved.source.as_deref(),
        home: stencil_logging::stencil_home(),
        logs_dir: stencil_logging::logs_dir(),
        policy: &resolved.policy,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let policy = output.policy;
    let source = output
        .config_file
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_string());

    print_table(
        &["Setting", "Value"],
        vec![
            vec!["config file".into(), source],
            vec!["stencil_filter".into(), policy.stencil_filter.to_string()],
            vec!["search_text".into(), policy.search_text.as_str().to_string()],
            vec!["and_delimiter".into(), policy.and_delimiter.to_string()],
            vec!["descriptive_templates".into(), policy.descriptive_templates.join(", ")],
            vec!["candidate_tag".into(), policy.candidate_tag.clone()],
            vec!["stencil_marker".into(), policy.stencil_marker.clone()],
            vec!["logs".into(), output.logs_dir.display().to_string()],
        ],
    );

    Ok(())
}

/// Find and load the scan policy.
pub fn resolve_policy(explicit: Option<&Path>) -> anyhow::Result<ResolvedPolicy> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(HelpfulError::config_file_not_found(path).into());
        }
        return load_from(path);
    }

    let candidates = [
        PathBuf::from(DEFAULT_CONFIG_FILE),
        stencil_logging::stencil_home().join(DEFAULT_CONFIG_FILE),
    ];
    for path in candidates {
        if path.is_file() {
            return load_from(&path);
        }
    }

    debug!("No config file found, using default scan policy");
    Ok(ResolvedPolicy {
        source: None,
        policy: ScanPolicy::default(),
    })
}

fn load_from(path: &Path) -> anyhow::Result<ResolvedPolicy> {
    let policy = ScanPolicy::load(path).map_err(|err| match err {
        ScoutError::Config(details) => HelpfulError::invalid_config(path, &details),
        other => HelpfulError::invalid_config(path, &other.to_string()),
    })?;
    debug!(path = %path.display(), "Loaded scan policy");
    Ok(ResolvedPolicy {
        source: Some(path.to_path_buf()),
        policy,
    })
}
