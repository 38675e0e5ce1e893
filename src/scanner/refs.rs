//! Qualified reference collection for a single file
//!
//! Walks the syntax tree looking for `pkg.Name` in type position
//! (`qualified_type`) and value position (`selector_expression`). Inside a
//! function, a qualifier that is also bound locally makes the reference
//! ambiguous: it is reported and left out.
//!
//! A package may declare a name its import path does not spell
//! (`github.com/satori/go.uuid` is package `uuid`). Qualifiers that match no
//! import and no file-level name are matched against the imports never used
//! under their default name; anything left unmatched is reported.

use crate::golang::names;
use crate::golang::parser::{field_children, named_children, ImportName};
use crate::golang::GoFile;
use crate::models::AmbiguousReference;
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

/// One attributed `pkg.Name` occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub package: String,
    pub name: String,
    /// Used in type position rather than as a value
    pub as_type: bool,
}

/// References found in one file
#[derive(Debug, Default)]
pub struct FileReferences {
    pub references: Vec<Reference>,
    pub ambiguous: Vec<AmbiguousReference>,
}

/// Collect references to the given imports (local name → import path)
pub fn collect(file: &GoFile, imports: &HashMap<String, String>) -> FileReferences {
    let specs = file.imports();
    let defaults = specs
        .iter()
        .filter(|spec| spec.name == ImportName::Default)
        .filter_map(|spec| {
            let local = spec.local_name()?;
            (imports.get(&local) == Some(&spec.path)).then(|| (local, spec.path.clone()))
        })
        .collect();
    let mut known: HashSet<String> = specs.iter().filter_map(|spec| spec.local_name()).collect();
    known.extend(package_bindings(file));

    let mut collector = Collector {
        file,
        imports,
        defaults,
        known,
        used: HashSet::new(),
        unresolved: Vec::new(),
        scopes: Vec::new(),
        found: FileReferences::default(),
    };
    collector.walk(file.root());
    collector.resolve_unmatched();
    collector.found
}

/// A selector whose qualifier matched nothing in the file
struct Unmatched {
    line: usize,
    qualifier: String,
    name: String,
    as_type: bool,
}

struct Collector<'a> {
    file: &'a GoFile,
    imports: &'a HashMap<String, String>,
    /// Unaliased external imports (default name, path)
    defaults: Vec<(String, String)>,
    /// Import names and file-level declarations
    known: HashSet<String>,
    /// Import names that attributed at least one reference
    used: HashSet<String>,
    unresolved: Vec<Unmatched>,
    /// Names bound by each enclosing function, innermost last
    scopes: Vec<HashSet<String>>,
    found: FileReferences,
}

impl Collector<'_> {
    fn walk(&mut self, node: Node) {
        match node.kind() {
            "function_declaration" | "method_declaration" | "func_literal" => {
                self.scopes.push(function_bindings(self.file, node));
                for child in named_children(&node) {
                    self.walk(child);
                }
                self.scopes.pop();
                return;
            }
            "qualified_type" => {
                let package = node.child_by_field_name("package");
                let name = node.child_by_field_name("name");
                if let (Some(package), Some(name)) = (package, name) {
                    self.reference(&node, &self.file.text(&package), &self.file.text(&name), true);
                }
                return;
            }
            "selector_expression" => {
                let operand = node.child_by_field_name("operand");
                let field = node.child_by_field_name("field");
                if let (Some(operand), Some(field)) = (operand, field) {
                    if operand.kind() == "identifier" {
                        self.reference(&node, &self.file.text(&operand), &self.file.text(&field), false);
                        return;
                    }
                }
            }
            _ => {}
        }

        for child in named_children(&node) {
            self.walk(child);
        }
    }

    fn reference(&mut self, node: &Node, qualifier: &str, name: &str, as_type: bool) {
        if !names::is_exported(name) {
            return;
        }
        let line = node.start_position().row + 1;
        let shadowed = self.scopes.iter().any(|scope| scope.contains(qualifier));

        let Some(package) = self.imports.get(qualifier) else {
            if !shadowed && !self.known.contains(qualifier) {
                self.unresolved.push(Unmatched {
                    line,
                    qualifier: qualifier.to_string(),
                    name: name.to_string(),
                    as_type,
                });
            }
            return;
        };
        self.used.insert(qualifier.to_string());

        if shadowed {
            tracing::debug!(
                file = %self.file.path.display(),
                line,
                qualifier,
                name,
                "skipping shadowed qualifier"
            );
            self.found.ambiguous.push(AmbiguousReference {
                file: self.file.path.clone(),
                line,
                qualifier: qualifier.to_string(),
                name: name.to_string(),
                reason: format!("{} is also bound locally", qualifier),
            });
            return;
        }

        self.found.references.push(Reference {
            package: package.clone(),
            name: name.to_string(),
            as_type,
        });
    }

    /// Attribute unmatched qualifiers to imports never used by their default name
    fn resolve_unmatched(&mut self) {
        let unused: Vec<&str> = self
            .defaults
            .iter()
            .filter(|(local, _)| !self.used.contains(local))
            .map(|(_, path)| path.as_str())
            .collect();
        if unused.is_empty() {
            return;
        }

        for unmatched in self.unresolved.drain(..) {
            match names::guess_import(&unmatched.qualifier, unused.iter().copied()) {
                Some(path) => {
                    tracing::debug!(
                        file = %self.file.path.display(),
                        qualifier = %unmatched.qualifier,
                        package = path,
                        "qualifier matched by package name"
                    );
                    self.found.references.push(Reference {
                        package: path.to_string(),
                        name: unmatched.name,
                        as_type: unmatched.as_type,
                    });
                }
                None => {
                    self.found.ambiguous.push(AmbiguousReference {
                        file: self.file.path.clone(),
                        line: unmatched.line,
                        reason: format!("no import matches qualifier {}", unmatched.qualifier),
                        qualifier: unmatched.qualifier,
                        name: unmatched.name,
                    });
                }
            }
        }
    }
}

/// Names declared at file level: functions, types, variables and constants
fn package_bindings(file: &GoFile) -> HashSet<String> {
    let mut names = HashSet::new();
    for decl in named_children(&file.root()) {
        match decl.kind() {
            "function_declaration" => {
                if let Some(name) = decl.child_by_field_name("name") {
                    names.insert(file.text(&name));
                }
            }
            "var_declaration" | "const_declaration" | "type_declaration" => {
                body_bindings(file, decl, &mut names);
            }
            _ => {}
        }
    }
    names
}

/// Every name a function binds: parameters, receiver, named results, type
/// parameters and declarations in its body. Nested function literals are
/// separate scopes and are not descended into.
fn function_bindings(file: &GoFile, node: Node) -> HashSet<String> {
    let mut names = HashSet::new();

    for field in ["receiver", "type_parameters", "parameters", "result"] {
        let Some(list) = node.child_by_field_name(field) else {
            continue;
        };
        for param in named_children(&list) {
            if matches!(
                param.kind(),
                "parameter_declaration" | "variadic_parameter_declaration" | "type_parameter_declaration"
            ) {
                for name in field_children(&param, "name") {
                    names.insert(file.text(&name));
                }
            }
        }
    }

    if let Some(body) = node.child_by_field_name("body") {
        body_bindings(file, body, &mut names);
    }
    names
}

fn body_bindings(file: &GoFile, node: Node, names: &mut HashSet<String>) {
    match node.kind() {
        "func_literal" => return,
        "short_var_declaration" | "range_clause" | "receive_statement" => {
            if let Some(left) = node.child_by_field_name("left") {
                identifiers(file, left, names);
            }
        }
        "type_switch_statement" => {
            if let Some(alias) = node.child_by_field_name("alias") {
                identifiers(file, alias, names);
            }
        }
        "var_spec" | "const_spec" | "type_spec" | "type_alias" => {
            for name in field_children(&node, "name") {
                names.insert(file.text(&name));
            }
        }
        _ => {}
    }

    for child in named_children(&node) {
        body_bindings(file, child, names);
    }
}

/// Identifiers of an expression list (or a single identifier)
fn identifiers(file: &GoFile, node: Node, names: &mut HashSet<String>) {
    if node.kind() == "identifier" {
        names.insert(file.text(&node));
        return;
    }
    for child in named_children(&node) {
        if child.kind() == "identifier" {
            names.insert(file.text(&child));
        }
    }
}
