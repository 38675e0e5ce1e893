//! Integration tests for usage scanning
//!
//! Scans small Go module trees written to temporary directories and checks
//! the resulting usage index and the generation passes it drives.

use depstub::golang::DirectoryLoader;
use depstub::scanner::{ScanOptions, UsageScanner};
use depstub::stubgen::Orchestrator;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn scanner() -> UsageScanner {
    UsageScanner::new(ScanOptions::default()).unwrap()
}

#[test]
fn test_type_and_value_usage() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "go.mod", "module example.com/app\n\ngo 1.21\n");
    write(
        temp.path(),
        "main.go",
        r#"package main

import (
	"fmt"

	"github.com/acme/widgets"
)

type holder struct {
	w widgets.Foo
}

func main() {
	v := widgets.Bar()
	fmt.Println(v, holder{})
}
"#,
    );

    let result = scanner().scan(temp.path()).unwrap();
    assert_eq!(result.module.as_deref(), Some("example.com/app"));
    assert_eq!(result.files, 1);

    let packages: Vec<&str> = result.index.packages().collect();
    assert_eq!(packages, vec!["github.com/acme/widgets"]);

    let usage = result.index.get("github.com/acme/widgets").unwrap();
    assert_eq!(usage.types, BTreeSet::from(["Foo".to_string()]));
    assert_eq!(usage.values, BTreeSet::from(["Bar".to_string()]));
}

#[test]
fn test_no_external_imports_means_no_passes() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "go.mod", "module example.com/app\n");
    write(
        temp.path(),
        "main.go",
        r#"package main

import (
	"fmt"
	"strings"

	"example.com/app/internal/util"
)

func main() {
	fmt.Println(strings.ToUpper(util.Name))
}
"#,
    );
    write(
        temp.path(),
        "internal/util/util.go",
        "package util\n\nconst Name = \"app\"\n",
    );

    let result = scanner().scan(temp.path()).unwrap();
    assert!(result.index.is_empty());
    assert_eq!(result.files, 2);

    let loader = DirectoryLoader::new();
    let mut passes = 0;
    let stubs = Orchestrator::new(&loader)
        .generate_all(&result.index.requests(), |_| passes += 1)
        .unwrap();
    assert!(stubs.is_empty());
    assert_eq!(passes, 0);
}

#[test]
fn test_shadowed_qualifier_is_reported() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "go.mod", "module example.com/app\n");
    write(
        temp.path(),
        "main.go",
        r#"package main

import "github.com/acme/widgets"

type local struct{ Name string }

func use() string {
	widgets := local{}
	return widgets.Name
}

func main() {
	_ = widgets.New()
	_ = use()
}
"#,
    );

    let result = scanner().scan(temp.path()).unwrap();
    let usage = result.index.get("github.com/acme/widgets").unwrap();
    assert!(usage.values.contains("New"));
    assert!(!usage.values.contains("Name"));

    assert_eq!(result.ambiguous.len(), 1);
    assert_eq!(result.ambiguous[0].qualifier, "widgets");
    assert_eq!(result.ambiguous[0].name, "Name");
}

#[test]
fn test_scan_feeds_generation() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "app/go.mod", "module example.com/app\n");
    write(
        temp.path(),
        "app/main.go",
        r#"package main

import "github.com/acme/widgets"

func main() {
	var f widgets.Foo
	_ = widgets.Bar(f)
}
"#,
    );
    write(
        temp.path(),
        "widgets/widgets.go",
        r#"package widgets

type Foo struct {
	Size int
}

func Bar(f Foo) int { return f.Size }

func Baz() {}
"#,
    );

    let result = scanner().scan(&temp.path().join("app")).unwrap();
    let loader =
        DirectoryLoader::new().with_package("github.com/acme/widgets", temp.path().join("widgets"));
    let stubs = Orchestrator::new(&loader)
        .generate_all(&result.index.requests(), |_| {})
        .unwrap();

    assert_eq!(stubs.len(), 1);
    let text = &stubs[0].stub.text;
    assert!(text.contains("type Foo struct {\n\tSize int\n}\n"));
    assert!(text.contains("func Bar(_ Foo) int {"));
    assert!(!text.contains("Baz"));
}

#[test]
fn test_package_name_differs_from_import_path() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "go.mod", "module example.com/app\n");
    write(
        temp.path(),
        "ids.go",
        r#"package main

import (
	"github.com/hashicorp/golang-lru"
	"github.com/satori/go.uuid"
)

var seen *lru.Cache

func next() string {
	return uuid.NewV4().String()
}
"#,
    );

    let result = scanner().scan(temp.path()).unwrap();
    let packages: Vec<&str> = result.index.packages().collect();
    assert_eq!(
        packages,
        vec!["github.com/hashicorp/golang-lru", "github.com/satori/go.uuid"]
    );

    let lru = result.index.get("github.com/hashicorp/golang-lru").unwrap();
    assert_eq!(lru.types, BTreeSet::from(["Cache".to_string()]));
    let uuid = result.index.get("github.com/satori/go.uuid").unwrap();
    assert_eq!(uuid.values, BTreeSet::from(["NewV4".to_string()]));
    assert!(result.ambiguous.is_empty());
}
