//! Output boundary
//!
//! Everything that happens to a stub after it is rendered: provenance
//! header, formatting, destination resolution, vendor layout, license
//! copying and `vendor/modules.txt`.

use crate::golang::loader::find_module_dir;
use crate::models::{StubConfig, SymbolRequest};
use crate::stubgen::GeneratedStub;
use crate::Result;
use anyhow::Context;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::io::{ErrorKind, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use walkdir::WalkDir;

/// File name of every stub written to the vendor tree
pub const STUB_FILE: &str = "stub.go";

/// Pseudo-version recorded for stubbed packages in `modules.txt`
pub const STUB_VERSION: &str = "v0.0.0-00010101000000-000000000000";

/// License file prefixes copied next to vendored stubs
const LICENSE_PREFIXES: &[&str] = &["LICENSE", "LICENCE", "COPYING", "NOTICE"];

/// Output options shared by every generating command
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output file; defaults to stdout
    #[arg(long, global = true)]
    pub destination: Option<PathBuf>,

    /// Write to <module root>/vendor/<package>/stub.go (overrides --destination)
    #[arg(long, global = true)]
    pub vendor: bool,

    /// Embed this file as the copyright header instead of pointing to LICENSE
    #[arg(long = "copyright-file", global = true)]
    pub copyright_file: Option<PathBuf>,

    /// With --vendor, delete the vendor directory first; never ask before overwriting
    #[arg(long, global = true)]
    pub force: bool,

    /// Load the stubbed package from this directory instead of `go list` (gen only)
    #[arg(long, global = true)]
    pub src: Option<PathBuf>,
}

/// Where rendered stubs go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
    /// `<root>/<package>/stub.go` for each package
    Vendor { root: PathBuf },
}

impl Destination {
    pub fn resolve(args: &OutputArgs, config: &StubConfig, work_dir: &Path) -> Self {
        if args.vendor {
            Destination::Vendor {
                root: vendor_root(config, work_dir),
            }
        } else if let Some(path) = &args.destination {
            Destination::File(work_dir.join(path))
        } else {
            Destination::Stdout
        }
    }
}

/// Vendor directory of the module containing `work_dir`
pub fn vendor_root(config: &StubConfig, work_dir: &Path) -> PathBuf {
    let module_root = find_module_dir(work_dir).unwrap_or_else(|| work_dir.to_path_buf());
    module_root.join(&config.vendor_dir)
}

/// Leading comment block of every generated file
pub fn provenance_header(package: &str, request: &SymbolRequest, copyright: Option<&str>) -> String {
    let mut header = String::new();
    header.push_str("// Code generated by depstub. DO NOT EDIT.\n");
    header.push_str(&format!(
        "// This is a simple stub for {}, strictly for use in testing.\n\n",
        package
    ));

    match copyright {
        Some(text) => {
            header.push_str(
                "// See the license below for information about the licensing of the original library.\n\n",
            );
            for line in text.trim_end().lines() {
                if line.is_empty() {
                    header.push_str("//\n");
                } else {
                    header.push_str(&format!("// {}\n", line));
                }
            }
            header.push('\n');
        }
        None => header.push_str(
            "// See the LICENSE file for information about the licensing of the original library.\n",
        ),
    }

    header.push_str(&format!(
        "// Source: {} (exports: {}; functions: {})\n\n",
        package,
        request.type_list(),
        request.value_list()
    ));
    header
}

/// Format Go source with `gofmt`
///
/// The text is kept as is only when gofmt is not installed; a stub gofmt
/// rejects is an error.
pub fn format_source(text: &str) -> Result<String> {
    run_formatter("gofmt", text)
}

fn run_formatter(program: &str, text: &str) -> Result<String> {
    let spawned = Command::new(program)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(program, "formatter not installed, keeping unformatted output");
            return Ok(text.to_string());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to run {}", program)),
    };

    child
        .stdin
        .take()
        .with_context(|| format!("Failed to open {} stdin", program))?
        .write_all(text.as_bytes())
        .with_context(|| format!("Failed to write to {}", program))?;

    let output = child
        .wait_with_output()
        .with_context(|| format!("Failed to wait for {}", program))?;
    if !output.status.success() {
        anyhow::bail!(
            "{} rejected the stub: {}",
            program,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    String::from_utf8(output.stdout).with_context(|| format!("{} produced invalid UTF-8", program))
}

/// Complete file contents for a generated stub
pub fn stub_file(generated: &GeneratedStub, copyright: Option<&str>, format: bool) -> Result<String> {
    let body = if format {
        format_source(&generated.stub.text)
            .with_context(|| format!("Failed to format the stub of {}", generated.stub.package))?
    } else {
        generated.stub.text.clone()
    };
    let mut contents = provenance_header(&generated.stub.package, &generated.request, copyright);
    contents.push_str(&body);
    Ok(contents)
}

/// `vendor/modules.txt` listing the given packages
pub fn modules_txt(packages: &[String]) -> String {
    let mut output = String::new();
    for package in packages {
        output.push_str(&format!("# {} {}\n", package, STUB_VERSION));
        output.push_str("## explicit\n");
        output.push_str(&format!("{}\n", package));
    }
    output
}

/// Packages that have a stub under `vendor_root`, sorted
pub fn vendored_packages(vendor_root: &Path) -> Result<Vec<String>> {
    let mut packages = Vec::new();
    if !vendor_root.is_dir() {
        return Ok(packages);
    }
    for entry in WalkDir::new(vendor_root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == STUB_FILE {
            let Some(dir) = entry.path().parent() else {
                continue;
            };
            let relative = dir.strip_prefix(vendor_root).unwrap_or(dir);
            let package = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !package.is_empty() {
                packages.push(package);
            }
        }
    }
    packages.sort();
    Ok(packages)
}

/// Rewrite `modules.txt` from the stubs present in the vendor tree
pub fn write_modules_txt(vendor_root: &Path) -> Result<usize> {
    let packages = vendored_packages(vendor_root)?;
    fs::create_dir_all(vendor_root)
        .with_context(|| format!("Failed to create {}", vendor_root.display()))?;
    let path = vendor_root.join("modules.txt");
    fs::write(&path, modules_txt(&packages))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(packages.len())
}

/// License files of a package, looked up in its directory, then its module root
pub fn find_licenses(package_dir: &Path, module_dir: Option<&Path>) -> Vec<PathBuf> {
    for dir in std::iter::once(package_dir).chain(module_dir) {
        let mut licenses: Vec<PathBuf> = WalkDir::new(dir)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                let name = e.file_name().to_string_lossy().to_uppercase();
                LICENSE_PREFIXES.iter().any(|p| name.starts_with(p))
            })
            .map(|e| e.into_path())
            .collect();
        if !licenses.is_empty() {
            licenses.sort();
            return licenses;
        }
    }
    Vec::new()
}

/// Writes generated stubs to their destination
pub struct Emitter {
    destination: Destination,
    copyright: Option<String>,
    force: bool,
    interactive: bool,
    format: bool,
}

impl Emitter {
    pub fn new(args: &OutputArgs, config: &StubConfig, work_dir: &Path) -> Result<Self> {
        let copyright = match &args.copyright_file {
            Some(path) => {
                let path = work_dir.join(path);
                Some(
                    fs::read_to_string(&path)
                        .with_context(|| format!("Failed reading copyright file {}", path.display()))?,
                )
            }
            None => None,
        };

        Ok(Self {
            destination: Destination::resolve(args, config, work_dir),
            copyright,
            force: args.force,
            interactive: std::io::stdin().is_terminal(),
            format: true,
        })
    }

    /// Skip the gofmt pass
    pub fn without_formatting(mut self) -> Self {
        self.format = false;
        self
    }

    /// Never prompt before overwriting
    pub fn non_interactive(mut self) -> Self {
        self.interactive = false;
        self
    }

    /// Write every stub; nothing is written unless all of them were generated
    pub fn emit(&self, stubs: &[GeneratedStub]) -> Result<()> {
        let files = stubs
            .iter()
            .map(|s| Ok((s, stub_file(s, self.copyright.as_deref(), self.format)?)))
            .collect::<Result<Vec<(&GeneratedStub, String)>>>()?;

        match &self.destination {
            Destination::Stdout => {
                let mut stdout = std::io::stdout().lock();
                for (_, contents) in &files {
                    stdout.write_all(contents.as_bytes())?;
                }
            }
            Destination::File(path) => {
                if files.len() > 1 {
                    anyhow::bail!(
                        "--destination holds a single package but {} were generated; use --vendor",
                        files.len()
                    );
                }
                for (_, contents) in &files {
                    self.write_stub(path, contents)?;
                }
            }
            Destination::Vendor { root } => {
                if self.force && root.exists() {
                    eprintln!(
                        "{}",
                        format!("Removing {}", root.display()).yellow()
                    );
                    fs::remove_dir_all(root)
                        .with_context(|| format!("Failed to remove {}", root.display()))?;
                }

                for (generated, contents) in &files {
                    let dir = root.join(&generated.stub.package);
                    if !self.write_stub(&dir.join(STUB_FILE), contents)? {
                        continue;
                    }
                    let licenses = find_licenses(&generated.package_dir, generated.module_dir.as_deref());
                    if licenses.is_empty() && self.copyright.is_none() {
                        eprintln!(
                            "{}",
                            format!("No license file found for {}", generated.stub.package).yellow()
                        );
                    }
                    for license in licenses {
                        if let Some(name) = license.file_name() {
                            fs::copy(&license, dir.join(name)).with_context(|| {
                                format!("Failed to copy {}", license.display())
                            })?;
                        }
                    }
                }

                let count = write_modules_txt(root)?;
                tracing::info!(packages = count, "wrote modules.txt");
            }
        }
        Ok(())
    }

    /// Write one stub file, asking first when it would overwrite interactively
    fn write_stub(&self, path: &Path, contents: &str) -> Result<bool> {
        if path.exists() && !self.force && self.interactive {
            use dialoguer::Confirm;
            let overwrite = Confirm::new()
                .with_prompt(format!("Overwrite {}?", path.display()))
                .default(false)
                .interact()?;
            if !overwrite {
                eprintln!("{}", format!("Skipping {}", path.display()).bright_black());
                return Ok(false);
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create directory {}", parent.display()))?;
        }
        fs::write(path, contents)
            .with_context(|| format!("Failed writing to destination {}", path.display()))?;
        eprintln!("{} {}", "✓".green(), path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stubgen::RenderedStub;
    use tempfile::TempDir;

    fn generated(package: &str, dir: &Path) -> GeneratedStub {
        GeneratedStub {
            request: SymbolRequest::from_lists(package, "Conn,Driver", ""),
            stub: RenderedStub {
                package: package.to_string(),
                package_name: "driver".to_string(),
                text: "package driver\n".to_string(),
                imports: Vec::new(),
            },
            package_dir: dir.to_path_buf(),
            module_dir: None,
        }
    }

    #[test]
    fn test_header_without_copyright() {
        let request = SymbolRequest::from_lists("database/sql/driver", "Conn,Driver", "");
        let header = provenance_header("database/sql/driver", &request, None);
        assert!(header.starts_with("// Code generated by depstub. DO NOT EDIT.\n"));
        assert!(header.contains("// See the LICENSE file"));
        assert!(header.ends_with(
            "// Source: database/sql/driver (exports: Conn,Driver; functions: )\n\n"
        ));
    }

    #[test]
    fn test_header_with_copyright() {
        let request = SymbolRequest::from_lists("github.com/Masterminds/squirrel", "", "Expr");
        let header = provenance_header(
            "github.com/Masterminds/squirrel",
            &request,
            Some("Copyright (c) 2014\n\nMIT License\n"),
        );
        assert!(header.contains("// Copyright (c) 2014\n//\n// MIT License\n"));
        assert!(!header.contains("LICENSE file"));
        assert!(header.contains("(exports: ; functions: Expr)"));
    }

    #[test]
    fn test_missing_formatter_keeps_text() {
        let text = "package driver\n\ntype   Conn interface{}\n";
        let out = run_formatter("depstub-formatter-that-does-not-exist", text).unwrap();
        assert_eq!(out, text);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_formatter_is_an_error() {
        let err = run_formatter("false", "package driver\n").unwrap_err();
        assert!(format!("{:#}", err).contains("false"));
    }

    #[test]
    fn test_destination_resolution() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("go.mod"), "module example.com/app\n").unwrap();
        let nested = temp.path().join("cmd/app");
        fs::create_dir_all(&nested).unwrap();
        let config = StubConfig::default();

        let args = OutputArgs::default();
        assert_eq!(Destination::resolve(&args, &config, &nested), Destination::Stdout);

        let args = OutputArgs {
            destination: Some(PathBuf::from("stub.go")),
            vendor: true,
            ..Default::default()
        };
        assert_eq!(
            Destination::resolve(&args, &config, &nested),
            Destination::Vendor {
                root: temp.path().join("vendor")
            }
        );
    }

    #[test]
    fn test_modules_txt() {
        let text = modules_txt(&["github.com/lib/pq".to_string()]);
        assert_eq!(
            text,
            "# github.com/lib/pq v0.0.0-00010101000000-000000000000\n## explicit\ngithub.com/lib/pq\n"
        );
    }

    #[test]
    fn test_vendor_emit_copies_licenses_and_lists_modules() {
        let temp = TempDir::new().unwrap();
        let work = temp.path().join("app");
        let source = temp.path().join("src");
        fs::create_dir_all(&work).unwrap();
        fs::create_dir_all(&source).unwrap();
        fs::write(work.join("go.mod"), "module example.com/app\n").unwrap();
        fs::write(source.join("LICENSE"), "MIT\n").unwrap();
        fs::write(source.join("driver.go"), "package driver\n").unwrap();

        let args = OutputArgs {
            vendor: true,
            ..Default::default()
        };
        let emitter = Emitter::new(&args, &StubConfig::default(), &work)
            .unwrap()
            .without_formatting()
            .non_interactive();
        emitter
            .emit(&[generated("example.com/sql/driver", &source)])
            .unwrap();

        let stub_dir = work.join("vendor/example.com/sql/driver");
        let stub = fs::read_to_string(stub_dir.join(STUB_FILE)).unwrap();
        assert!(stub.starts_with("// Code generated by depstub. DO NOT EDIT.\n"));
        assert!(stub.ends_with("package driver\n"));
        assert!(stub_dir.join("LICENSE").is_file());
        assert!(!stub_dir.join("driver.go").exists());

        let modules = fs::read_to_string(work.join("vendor/modules.txt")).unwrap();
        assert!(modules.contains("## explicit\nexample.com/sql/driver\n"));
    }

    #[test]
    fn test_single_destination_rejects_many_packages() {
        let temp = TempDir::new().unwrap();
        let args = OutputArgs {
            destination: Some(PathBuf::from("out.go")),
            ..Default::default()
        };
        let emitter = Emitter::new(&args, &StubConfig::default(), temp.path())
            .unwrap()
            .without_formatting()
            .non_interactive();
        let stubs = vec![
            generated("example.com/a", temp.path()),
            generated("example.com/b", temp.path()),
        ];
        assert!(emitter.emit(&stubs).is_err());
        assert!(!temp.path().join("out.go").exists());
    }

    #[test]
    fn test_find_licenses_falls_back_to_module_root() {
        let temp = TempDir::new().unwrap();
        let package = temp.path().join("sub");
        fs::create_dir_all(&package).unwrap();
        fs::write(temp.path().join("COPYING"), "GPL\n").unwrap();
        fs::write(temp.path().join("NOTICE.txt"), "notice\n").unwrap();

        let licenses = find_licenses(&package, Some(temp.path()));
        assert_eq!(
            licenses,
            vec![temp.path().join("COPYING"), temp.path().join("NOTICE.txt")]
        );
    }
}
