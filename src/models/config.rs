use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "depstub.toml";

/// depstub configuration
///
/// Only the command-line layer reads this; the extractor, synthesizer and
/// scanner receive plain values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubConfig {
    /// Go toolchain binary used to locate packages
    pub go_command: String,

    /// Scan `_test.go` files in auto-detection
    pub include_tests: bool,

    /// Extra directory names skipped by the usage scanner
    pub exclude_dirs: Vec<String>,

    /// Vendor directory, relative to the module root
    pub vendor_dir: PathBuf,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            go_command: "go".to_string(),
            include_tests: false,
            exclude_dirs: Vec::new(),
            vendor_dir: PathBuf::from("vendor"),
        }
    }
}

impl StubConfig {
    /// Load config from `path`, or from `depstub.toml` in `project_root`
    ///
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>, project_root: &Path) -> anyhow::Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = project_root.join(CONFIG_FILE);
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = std::fs::read_to_string(&config_path)?;
        let config: StubConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
