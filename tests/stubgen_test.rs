//! Integration tests for stub generation
//!
//! Tests the complete extract-then-render flow against Go packages written
//! to temporary directories, including:
//! - Requested declarations and nothing else
//! - Failure on unknown symbols without touching the destination
//! - Byte-identical output across runs

use depstub::cli::{generate, OutputArgs};
use depstub::golang::DirectoryLoader;
use depstub::models::{StubConfig, StubError, SymbolRequest};
use depstub::stubgen::Orchestrator;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const DRIVER: &str = "example.com/sql/driver";
const SQUIRREL: &str = "example.com/squirrel";

/// Create a package exposing exactly two interfaces
fn create_driver_package(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("driver.go"),
        r#"// Package driver defines the interfaces a database driver implements.
package driver

// Driver opens connections.
type Driver interface {
	Open(name string) (Conn, error)
}

// Conn is a connection to a database.
type Conn interface {
	Ping(timeout int64) error
	Close() error
}

func register(name string) {}
"#,
    )
    .unwrap();
}

/// Create a package with many exported names besides `Expr`
fn create_squirrel_package(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("expr.go"),
        r#"package squirrel

type Sqlizer interface {
	ToSql() (string, []any, error)
}

type expr struct {
	sql  string
	args []any
}

func (e expr) ToSql() (string, []any, error) { return e.sql, e.args, nil }

// Expr builds an expression from a SQL fragment and arguments.
func Expr(sql string, args ...any) Sqlizer {
	return expr{sql: sql, args: args}
}
"#,
    )
    .unwrap();
    fs::write(
        dir.join("select.go"),
        r#"package squirrel

type SelectBuilder struct {
	columns []string
}

func Select(columns ...string) SelectBuilder { return SelectBuilder{columns: columns} }

func (b SelectBuilder) From(table string) SelectBuilder { return b }

var StatementBuilder = SelectBuilder{}

const Question = "?"
"#,
    )
    .unwrap();
}

fn loader(temp: &TempDir) -> DirectoryLoader {
    create_driver_package(&temp.path().join("driver"));
    create_squirrel_package(&temp.path().join("squirrel"));
    DirectoryLoader::new()
        .with_package(DRIVER, temp.path().join("driver"))
        .with_package(SQUIRREL, temp.path().join("squirrel"))
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn test_two_interfaces_no_functions() {
    let temp = TempDir::new().unwrap();
    let loader = loader(&temp);

    let request = SymbolRequest::from_lists(DRIVER, "Conn,Driver", "");
    let generated = Orchestrator::new(&loader).generate(&request).unwrap();
    let text = &generated.stub.text;

    assert!(text.starts_with("package driver\n"));
    assert_eq!(count(text, " interface {\n"), 2);
    assert!(text.contains("type Conn interface {\n\tClose() error\n\tPing(int64) error\n}\n"));
    assert!(text.contains("type Driver interface {\n\tOpen(string) (Conn, error)\n}\n"));
    assert_eq!(count(text, "\nfunc "), 0);
    assert!(!text.contains("register"));
    assert!(generated.stub.imports.is_empty());
}

#[test]
fn test_single_function_among_many_exports() {
    let temp = TempDir::new().unwrap();
    let loader = loader(&temp);

    let request = SymbolRequest::from_lists(SQUIRREL, "", "Expr");
    let generated = Orchestrator::new(&loader).generate(&request).unwrap();
    let text = &generated.stub.text;

    assert_eq!(count(text, "\nfunc "), 1);
    assert!(text.contains(
        "func Expr(_ string, _ ...any) Sqlizer {\n\tpanic(\"not implemented\")\n}\n"
    ));
    // The result type travels with the function so the stub compiles
    assert!(text.contains("type Sqlizer interface {"));
    assert!(!text.contains("Select"));
    assert!(!text.contains("StatementBuilder"));
    assert!(!text.contains("Question"));
}

#[test]
fn test_every_function_body_panics() {
    let temp = TempDir::new().unwrap();
    let loader = loader(&temp);

    let request = SymbolRequest::from_lists(SQUIRREL, "SelectBuilder", "Select,Expr");
    let generated = Orchestrator::new(&loader).generate(&request).unwrap();
    let text = &generated.stub.text;

    let bodies = count(text, "{\n\tpanic(\"not implemented\")\n}\n");
    assert_eq!(bodies, count(text, "\nfunc "));
    assert_eq!(bodies, 3); // From, Select, Expr
    assert!(text.contains("func (SelectBuilder) From(_ string) SelectBuilder {"));
}

#[test]
fn test_output_is_deterministic() {
    let temp = TempDir::new().unwrap();
    let loader = loader(&temp);
    let request = SymbolRequest::from_lists(SQUIRREL, "SelectBuilder", "Expr,Question,StatementBuilder");

    let first = Orchestrator::new(&loader).generate(&request).unwrap();
    let second = Orchestrator::new(&loader).generate(&request).unwrap();
    assert_eq!(first.stub.text, second.stub.text);

    // Declarations follow the request, not the file layout
    let text = &first.stub.text;
    let builder = text.find("type SelectBuilder struct").unwrap();
    let expr = text.find("func Expr(").unwrap();
    let question = text.find("const Question").unwrap();
    assert!(builder < expr);
    assert!(expr < question);
}

#[test]
fn test_unknown_symbol_fails() {
    let temp = TempDir::new().unwrap();
    let loader = loader(&temp);

    let request = SymbolRequest::from_lists(DRIVER, "Conn,Connector", "");
    let err = Orchestrator::new(&loader).generate(&request).unwrap_err();
    assert_eq!(err, StubError::not_found(DRIVER, "Connector"));
}

#[test]
fn test_unknown_symbol_writes_nothing() {
    let temp = TempDir::new().unwrap();
    create_driver_package(&temp.path().join("driver"));

    let output = OutputArgs {
        destination: Some("out/stub.go".into()),
        src: Some("driver".into()),
        ..Default::default()
    };
    let result = generate::run(
        DRIVER,
        Some("Conn,Connector"),
        None,
        &output,
        &StubConfig::default(),
        temp.path(),
    );

    let err = result.unwrap_err();
    assert!(format!("{:#}", err).contains("Connector"));
    assert!(!temp.path().join("out").exists());
}

#[test]
fn test_generate_writes_destination() {
    let temp = TempDir::new().unwrap();
    create_driver_package(&temp.path().join("driver"));

    let output = OutputArgs {
        destination: Some("out/stub.go".into()),
        src: Some("driver".into()),
        ..Default::default()
    };
    generate::run(
        DRIVER,
        Some("Conn,Driver"),
        None,
        &output,
        &StubConfig::default(),
        temp.path(),
    )
    .unwrap();

    let content = fs::read_to_string(temp.path().join("out/stub.go")).unwrap();
    assert!(content.starts_with("// Code generated by depstub. DO NOT EDIT.\n"));
    assert!(content.contains("package driver\n"));
    assert!(content.contains("Driver interface {"));
}

#[test]
fn test_embedded_struct_keeps_promoted_methods() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("conf");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("conf.go"),
        r#"package conf

type Meta struct {
	Tags []string
}

func (m Meta) Describe() string { return "" }

type Options struct {
	Name string
	Meta
}
"#,
    )
    .unwrap();
    let loader = DirectoryLoader::new().with_package("example.com/conf", &dir);

    let request = SymbolRequest::from_lists("example.com/conf", "Options", "");
    let generated = Orchestrator::new(&loader).generate(&request).unwrap();
    let text = &generated.stub.text;

    assert!(text.contains("type Options struct {\n\tName string\n\tMeta\n}\n"));
    assert!(text.contains("type Meta struct {\n\tTags []string\n}\n"));
    assert!(text.contains(
        "func (Meta) Describe() string {\n\tpanic(\"not implemented\")\n}\n"
    ));
}
