//! Auto mode: scan the local package tree and stub everything it uses

use super::output::{Emitter, OutputArgs};
use crate::golang::LoaderFactory;
use crate::models::StubConfig;
use crate::scanner::{ScanOptions, ScanResult, UsageScanner};
use crate::stubgen::Orchestrator;
use crate::Result;
use anyhow::Context;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Scan `work_dir` with the configured options, reporting skipped references
pub fn scan(config: &StubConfig, work_dir: &Path) -> Result<ScanResult> {
    let mut scanner = UsageScanner::new(ScanOptions {
        include_tests: config.include_tests,
        exclude_dirs: config.exclude_dirs.clone(),
    })?;
    let result = scanner
        .scan(work_dir)
        .with_context(|| format!("Error while auto-detecting imported objects in {}", work_dir.display()))?;

    for ambiguous in &result.ambiguous {
        eprintln!("{}", format!("⚠ {}", ambiguous).yellow());
    }
    Ok(result)
}

/// Run `depstub auto`
pub fn run(output: &OutputArgs, config: &StubConfig, work_dir: &Path) -> Result<()> {
    if output.src.is_some() {
        anyhow::bail!("--src can only be used with gen");
    }

    eprintln!("{}", format!("Scanning {}", work_dir.display()).cyan());
    let result = scan(config, work_dir)?;
    if result.index.is_empty() {
        eprintln!(
            "{}",
            format!("No external packages referenced ({} files scanned)", result.files).bright_black()
        );
        return Ok(());
    }

    let requests = result.index.requests();
    let loader = LoaderFactory::create(config, work_dir, None);

    let progress = ProgressBar::new(requests.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let stubs = Orchestrator::new(loader.as_ref()).generate_all(&requests, |generated| {
        progress.set_message(generated.stub.package.clone());
        progress.inc(1);
    });
    progress.finish_and_clear();
    let stubs = stubs.context("Failed generating stubs")?;

    Emitter::new(output, config, work_dir)?.emit(&stubs)?;

    eprintln!(
        "{}",
        format!("Stubbed {} package(s)", stubs.len()).green().bold()
    );
    Ok(())
}
