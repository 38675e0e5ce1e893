//! Write a stub `vendor/modules.txt` for the stubs already vendored

use super::output::{vendor_root, write_modules_txt};
use crate::models::StubConfig;
use crate::Result;
use colored::Colorize;
use std::path::Path;

/// Run `depstub module-txt`
pub fn run(config: &StubConfig, work_dir: &Path) -> Result<()> {
    let root = vendor_root(config, work_dir);
    let count = write_modules_txt(&root)?;
    eprintln!(
        "{}",
        format!(
            "Wrote {} ({} package(s))",
            root.join("modules.txt").display(),
            count
        )
        .green()
    );
    Ok(())
}
