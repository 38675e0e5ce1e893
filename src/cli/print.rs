//! Print what the usage scan found
//!
//! Either one `go:generate` directive per external package, or the whole
//! usage index (with the directories referencing each package) as JSON for
//! other tools.

use super::auto;
use crate::models::{StubConfig, UsageIndex};
use crate::Result;
use anyhow::Context;
use std::path::Path;

/// Run `depstub print`
pub fn run(config: &StubConfig, work_dir: &Path, json: bool) -> Result<()> {
    let result = auto::scan(config, work_dir)?;
    if json {
        println!("{}", usage_json(&result.index)?);
        return Ok(());
    }
    for line in go_generate_lines(&result.index) {
        println!("{}", line);
    }
    Ok(())
}

/// Pretty-printed JSON of the usage index
pub fn usage_json(index: &UsageIndex) -> Result<String> {
    serde_json::to_string_pretty(index).context("Failed to serialize usage index")
}

/// One directive per package, sorted by package path
pub fn go_generate_lines(index: &UsageIndex) -> Vec<String> {
    index
        .requests()
        .iter()
        .map(|request| {
            format!(
                "//go:generate depstub --vendor gen {} \"{}\" \"{}\"",
                request.package,
                request.type_list(),
                request.value_list()
            )
        })
        .collect()
}
