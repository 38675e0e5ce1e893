//! tree-sitter front end for Go sources
//!
//! Parses a file and exposes its package clause and import table. Both the
//! package indexer and the usage scanner start from a [`GoFile`].

use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

/// Parse error information
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {reason}", path.display())]
pub struct ParseError {
    pub path: PathBuf,
    pub reason: String,
}

/// How an import binds its package into the file scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportName {
    /// No explicit name; the package's own name is used
    Default,
    /// `alias "path"`
    Alias(String),
    /// `. "path"`
    Dot,
    /// `_ "path"`
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub path: String,
    pub name: ImportName,
    pub line: usize,
}

impl ImportSpec {
    /// Identifier the import is referenced by, if any
    pub fn local_name(&self) -> Option<String> {
        match &self.name {
            ImportName::Default => Some(super::names::default_package_name(&self.path)),
            ImportName::Alias(alias) => Some(alias.clone()),
            ImportName::Dot | ImportName::Blank => None,
        }
    }
}

/// A parsed Go source file
pub struct GoFile {
    pub path: PathBuf,
    pub source: String,
    pub tree: Tree,
}

impl GoFile {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Name from the `package` clause
    pub fn package_name(&self) -> Option<String> {
        let root = self.root();
        let mut cursor = root.walk();
        let clause = root
            .named_children(&mut cursor)
            .find(|n| n.kind() == "package_clause")?;
        let mut inner = clause.walk();
        let ident = clause
            .named_children(&mut inner)
            .find(|n| n.kind() == "package_identifier")?;
        Some(node_text(&ident, &self.source))
    }

    /// All import specs, in source order
    pub fn imports(&self) -> Vec<ImportSpec> {
        let mut imports = Vec::new();
        let root = self.root();
        let mut cursor = root.walk();

        for node in root.named_children(&mut cursor) {
            if node.kind() != "import_declaration" {
                continue;
            }
            let mut decl_cursor = node.walk();
            for child in node.named_children(&mut decl_cursor) {
                match child.kind() {
                    "import_spec" => imports.extend(self.import_spec(&child)),
                    "import_spec_list" => {
                        let mut inner_cursor = child.walk();
                        for spec in child.named_children(&mut inner_cursor) {
                            if spec.kind() == "import_spec" {
                                imports.extend(self.import_spec(&spec));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        imports
    }

    fn import_spec(&self, node: &Node) -> Option<ImportSpec> {
        let path_node = node.child_by_field_name("path")?;
        let path = unquote(&node_text(&path_node, &self.source));
        let name = match node.child_by_field_name("name") {
            None => ImportName::Default,
            Some(n) => match n.kind() {
                "dot" => ImportName::Dot,
                "blank_identifier" => ImportName::Blank,
                _ => ImportName::Alias(node_text(&n, &self.source)),
            },
        };

        Some(ImportSpec {
            path,
            name,
            line: node.start_position().row + 1,
        })
    }

    /// Text of a node in this file
    pub fn text(&self, node: &Node) -> String {
        node_text(node, &self.source)
    }
}

/// Go parser using tree-sitter
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> crate::Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into())?;
        Ok(Self { parser })
    }

    /// Parse a single file
    pub fn parse_file(&mut self, path: &Path, content: String) -> Result<GoFile, ParseError> {
        let tree = self.parser.parse(&content, None).ok_or_else(|| ParseError {
            path: path.to_path_buf(),
            reason: "Failed to parse file".to_string(),
        })?;

        Ok(GoFile {
            path: path.to_path_buf(),
            source: content,
            tree,
        })
    }

    /// Read and parse a file from disk
    pub fn read_file(&mut self, path: &Path) -> Result<GoFile, ParseError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        self.parse_file(path, content)
    }
}

/// Get text content of a node
pub fn node_text(node: &Node, source: &str) -> String {
    source[node.start_byte()..node.end_byte()].to_string()
}

/// Strip the quotes of an interpreted or raw string literal
pub fn unquote(literal: &str) -> String {
    let trimmed = literal.trim();
    for quote in ['"', '`'] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

/// Named children of a node, skipping comments
pub fn named_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect();
    children
}

/// All children bound to a field name
pub fn field_children<'t>(node: &Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children = node.children_by_field_name(field, &mut cursor).collect();
    children
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> GoFile {
        let mut parser = GoParser::new().unwrap();
        parser
            .parse_file(Path::new("test.go"), content.to_string())
            .unwrap()
    }

    #[test]
    fn test_parse_go_imports() {
        let file = parse(
            r#"
package main

import "fmt"

import (
    sq "github.com/Masterminds/squirrel"
    _ "github.com/lib/pq"
    . "github.com/onsi/gomega"
    "gopkg.in/yaml.v3"
)
"#,
        );

        assert_eq!(file.package_name().as_deref(), Some("main"));

        let imports = file.imports();
        assert_eq!(imports.len(), 5);
        assert_eq!(imports[0].path, "fmt");
        assert_eq!(imports[0].name, ImportName::Default);
        assert_eq!(imports[1].name, ImportName::Alias("sq".to_string()));
        assert_eq!(imports[1].local_name().as_deref(), Some("sq"));
        assert_eq!(imports[2].name, ImportName::Blank);
        assert_eq!(imports[2].local_name(), None);
        assert_eq!(imports[3].name, ImportName::Dot);
        assert_eq!(imports[3].line, 9);
        assert_eq!(imports[0].line, 4);
        assert_eq!(imports[4].local_name().as_deref(), Some("yaml"));
    }

    #[test]
    fn test_package_name_missing() {
        let file = parse("func main() {}\n");
        assert_eq!(file.package_name(), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"io\""), "io");
        assert_eq!(unquote("`json:\"a\"`"), "json:\"a\"");
    }
}
