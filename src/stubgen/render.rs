//! Stub Synthesizer
//!
//! Renders an [`Extraction`] as Go source. Every callable body panics, every
//! declaration carries a provenance comment and only imports that are
//! actually referenced are emitted.

use crate::golang::names;
use crate::models::{
    ArrayLen, BasicKind, ChanDir, Extraction, FieldShape, FuncShape, InterfaceShape, MethodRecord,
    ShapeKind, ShapeRecord, StubError, StubResult, TypeExpr, TypeParam,
};
use std::collections::BTreeSet;

/// Body of every stubbed function and method
pub const NOT_IMPLEMENTED: &str = "panic(\"not implemented\")";

/// Rendered stub source for one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStub {
    /// Import path of the stubbed package
    pub package: String,
    pub package_name: String,
    /// Package clause, imports and declarations (no file header)
    pub text: String,
    /// Import paths the text refers to, sorted
    pub imports: Vec<String>,
}

/// Render an extraction as Go source text
///
/// # Errors
/// Returns `StubError::Render` when a shape refers to a type the stub does not
/// make resolvable, or uses syntax that cannot be reproduced.
pub fn render(extraction: &Extraction) -> StubResult<RenderedStub> {
    let mut renderer = Renderer {
        extraction,
        declared: extraction
            .records
            .iter()
            .filter(|r| r.is_type())
            .map(|r| r.name.as_str())
            .collect(),
        used: BTreeSet::new(),
        current: String::new(),
    };

    let mut body = String::new();
    for record in &extraction.records {
        renderer.current = record.name.clone();
        body.push('\n');
        body.push_str(&renderer.record(record)?);
    }

    let mut text = format!("package {}\n", extraction.package_name);
    text.push_str(&renderer.import_block());
    text.push_str(&body);

    Ok(RenderedStub {
        package: extraction.package.clone(),
        package_name: extraction.package_name.clone(),
        text,
        imports: renderer.used.into_iter().collect(),
    })
}

struct Renderer<'a> {
    extraction: &'a Extraction,
    /// Type names declared by the stub itself
    declared: BTreeSet<&'a str>,
    /// Import paths referenced so far
    used: BTreeSet<String>,
    current: String,
}

impl Renderer<'_> {
    fn error(&self, reason: impl Into<String>) -> StubError {
        StubError::render(&self.extraction.package, &self.current, reason)
    }

    /// `qualified` is the name within the package (`Recv.Method` for methods)
    fn provenance(&self, name: &str, qualified: &str) -> String {
        format!(
            "// {} is a stub of {}.{}. Generated code, do not edit.\n",
            name, self.extraction.package, qualified
        )
    }

    fn import_block(&self) -> String {
        let lines: Vec<(bool, String)> = self
            .extraction
            .imports
            .iter()
            .filter(|(path, _)| self.used.contains(*path))
            .map(|(path, local)| {
                let line = if local == names::default_package_name(path) {
                    format!("\"{}\"", path)
                } else {
                    format!("{} \"{}\"", local, path)
                };
                (names::is_standard_library(path), line)
            })
            .collect();

        match lines.as_slice() {
            [] => String::new(),
            [(_, line)] => format!("\nimport {}\n", line),
            _ => {
                let mut block = String::from("\nimport (\n");
                let std: Vec<&String> = lines.iter().filter(|(s, _)| *s).map(|(_, l)| l).collect();
                let other: Vec<&String> = lines.iter().filter(|(s, _)| !*s).map(|(_, l)| l).collect();
                for line in &std {
                    block.push_str(&format!("\t{}\n", line));
                }
                if !std.is_empty() && !other.is_empty() {
                    block.push('\n');
                }
                for line in &other {
                    block.push_str(&format!("\t{}\n", line));
                }
                block.push_str(")\n");
                block
            }
        }
    }

    fn record(&mut self, record: &ShapeRecord) -> StubResult<String> {
        let name = &record.name;
        let mut output = self.provenance(name, name);

        match &record.kind {
            ShapeKind::Function {
                type_params,
                signature,
            } => {
                output.push_str(&format!(
                    "func {}{}{} {{\n\t{}\n}}\n",
                    name,
                    self.type_params(type_params)?,
                    self.decl_signature(signature)?,
                    NOT_IMPLEMENTED
                ));
            }
            ShapeKind::Interface { type_params, shape } => {
                output.push_str(&format!(
                    "type {}{} {}\n",
                    name,
                    self.type_params(type_params)?,
                    self.interface_block(shape)?
                ));
            }
            ShapeKind::Struct {
                type_params,
                fields,
                methods,
            } => {
                output.push_str(&format!(
                    "type {}{} {}\n",
                    name,
                    self.type_params(type_params)?,
                    self.struct_block(fields)?
                ));
                output.push_str(&self.methods(name, methods)?);
            }
            ShapeKind::Named {
                type_params,
                underlying,
                alias,
                methods,
            } => {
                output.push_str(&format!(
                    "type {}{} {}{}\n",
                    name,
                    self.type_params(type_params)?,
                    if *alias { "= " } else { "" },
                    self.type_expr(underlying)?
                ));
                output.push_str(&self.methods(name, methods)?);
            }
            ShapeKind::Value {
                ty,
                constant: true,
                basic,
            } => {
                let basic = basic.ok_or_else(|| self.error("constant without a basic kind"))?;
                let zero = zero_literal(basic);
                match ty {
                    Some(ty) => {
                        output.push_str(&format!("const {} {} = {}\n", name, self.type_expr(ty)?, zero))
                    }
                    None => output.push_str(&format!("const {} = {}\n", name, zero)),
                }
            }
            ShapeKind::Value {
                ty, constant: false, ..
            } => {
                let ty = ty
                    .as_ref()
                    .ok_or_else(|| self.error("variable without a type"))?;
                output.push_str(&format!("var {} {}\n", name, self.type_expr(ty)?));
            }
        }

        Ok(output)
    }

    fn methods(&mut self, receiver: &str, methods: &[MethodRecord]) -> StubResult<String> {
        let mut output = String::new();
        for method in methods {
            let params = if method.receiver_params.is_empty() {
                String::new()
            } else {
                format!("[{}]", method.receiver_params.join(", "))
            };
            output.push('\n');
            output.push_str(&self.provenance(
                &method.name,
                &format!("{}.{}", receiver, method.name),
            ));
            output.push_str(&format!(
                "func ({}{}{}) {}{} {{\n\t{}\n}}\n",
                if method.pointer_receiver { "*" } else { "" },
                receiver,
                params,
                method.name,
                self.decl_signature(&method.signature)?,
                NOT_IMPLEMENTED
            ));
        }
        Ok(output)
    }

    fn type_params(&mut self, params: &[TypeParam]) -> StubResult<String> {
        if params.is_empty() {
            return Ok(String::new());
        }
        let mut rendered = Vec::with_capacity(params.len());
        for param in params {
            rendered.push(format!("{} {}", param.name, self.type_expr(&param.constraint)?));
        }
        Ok(format!("[{}]", rendered.join(", ")))
    }

    /// Signature of a declared function: blank-named parameters
    fn decl_signature(&mut self, signature: &FuncShape) -> StubResult<String> {
        let params = self.params(signature)?;
        let params: Vec<String> = params.iter().map(|p| format!("_ {}", p)).collect();
        Ok(format!("({}){}", params.join(", "), self.results(signature)?))
    }

    /// Signature inside a function type or interface: unnamed parameters
    fn type_signature(&mut self, signature: &FuncShape) -> StubResult<String> {
        let params = self.params(signature)?;
        Ok(format!("({}){}", params.join(", "), self.results(signature)?))
    }

    fn params(&mut self, signature: &FuncShape) -> StubResult<Vec<String>> {
        let mut params = Vec::with_capacity(signature.params.len());
        let last = signature.params.len().saturating_sub(1);
        for (i, param) in signature.params.iter().enumerate() {
            let ty = self.type_expr(param)?;
            if signature.variadic && i == last {
                params.push(format!("...{}", ty));
            } else {
                params.push(ty);
            }
        }
        Ok(params)
    }

    fn results(&mut self, signature: &FuncShape) -> StubResult<String> {
        let mut results = Vec::with_capacity(signature.results.len());
        for result in &signature.results {
            results.push(self.type_expr(result)?);
        }
        Ok(match results.len() {
            0 => String::new(),
            1 => format!(" {}", results[0]),
            _ => format!(" ({})", results.join(", ")),
        })
    }

    fn interface_block(&mut self, shape: &InterfaceShape) -> StubResult<String> {
        let lines = self.interface_lines(shape)?;
        if lines.is_empty() {
            return Ok("interface{}".to_string());
        }
        let mut block = String::from("interface {\n");
        for line in lines {
            block.push_str(&format!("\t{}\n", line));
        }
        block.push('}');
        Ok(block)
    }

    fn interface_lines(&mut self, shape: &InterfaceShape) -> StubResult<Vec<String>> {
        let mut lines = Vec::new();
        for embedded in &shape.embedded {
            lines.push(self.type_expr(embedded)?);
        }
        for method in &shape.methods {
            lines.push(format!(
                "{}{}",
                method.name,
                self.type_signature(&method.signature)?
            ));
        }
        for set in &shape.type_sets {
            lines.push(self.type_expr(set)?);
        }
        Ok(lines)
    }

    fn struct_block(&mut self, fields: &[FieldShape]) -> StubResult<String> {
        let lines = self.field_lines(fields)?;
        if lines.is_empty() {
            return Ok("struct{}".to_string());
        }
        let mut block = String::from("struct {\n");
        for line in lines {
            block.push_str(&format!("\t{}\n", line));
        }
        block.push('}');
        Ok(block)
    }

    fn field_lines(&mut self, fields: &[FieldShape]) -> StubResult<Vec<String>> {
        let mut lines = Vec::with_capacity(fields.len());
        for field in fields {
            let ty = self.type_expr(&field.ty)?;
            let mut line = if field.embedded {
                ty
            } else {
                format!("{} {}", field.name, ty)
            };
            if let Some(tag) = &field.tag {
                line.push(' ');
                line.push_str(tag);
            }
            lines.push(line);
        }
        Ok(lines)
    }

    fn qualify(&mut self, package: &str, name: &str) -> StubResult<String> {
        if package == self.extraction.package {
            return Ok(name.to_string());
        }
        let local = self
            .extraction
            .imports
            .local_name(package)
            .ok_or_else(|| self.error(format!("no import for {}", package)))?
            .to_string();
        self.used.insert(package.to_string());
        Ok(format!("{}.{}", local, name))
    }

    fn type_expr(&mut self, ty: &TypeExpr) -> StubResult<String> {
        Ok(match ty {
            TypeExpr::Builtin { name } | TypeExpr::Param { name } => name.clone(),
            TypeExpr::Named {
                package,
                name,
                args,
            } => {
                if *package == self.extraction.package && !self.declared.contains(name.as_str()) {
                    return Err(self.error(format!(
                        "refers to {} which the stub does not declare",
                        name
                    )));
                }
                let mut rendered = self.qualify(package, name)?;
                if !args.is_empty() {
                    let mut list = Vec::with_capacity(args.len());
                    for arg in args {
                        list.push(self.type_expr(arg)?);
                    }
                    rendered.push_str(&format!("[{}]", list.join(", ")));
                }
                rendered
            }
            TypeExpr::Pointer { elem } => format!("*{}", self.type_expr(elem)?),
            TypeExpr::Slice { elem } => format!("[]{}", self.type_expr(elem)?),
            TypeExpr::Array { len, elem } => {
                let len = match len {
                    ArrayLen::Literal { value } => value.clone(),
                    ArrayLen::Const { package, name } if *package != self.extraction.package => {
                        self.qualify(package, name)?
                    }
                    ArrayLen::Const { name, .. } => {
                        return Err(self.error(format!("array length {} was not resolved", name)))
                    }
                    ArrayLen::Expr { text } => {
                        return Err(self.error(format!("unsupported array length `{}`", text)))
                    }
                };
                format!("[{}]{}", len, self.type_expr(elem)?)
            }
            TypeExpr::Map { key, value } => {
                format!("map[{}]{}", self.type_expr(key)?, self.type_expr(value)?)
            }
            TypeExpr::Chan { dir, elem } => {
                let inner = self.type_expr(elem)?;
                match dir {
                    ChanDir::Send => format!("chan<- {}", inner),
                    ChanDir::Recv => format!("<-chan {}", inner),
                    ChanDir::Both => match elem.as_ref() {
                        TypeExpr::Chan {
                            dir: ChanDir::Recv, ..
                        } => format!("chan ({})", inner),
                        _ => format!("chan {}", inner),
                    },
                }
            }
            TypeExpr::Func { signature } => format!("func{}", self.type_signature(signature)?),
            TypeExpr::Struct { fields } => {
                let lines = self.field_lines(fields)?;
                if lines.is_empty() {
                    "struct{}".to_string()
                } else {
                    format!("struct{{ {} }}", lines.join("; "))
                }
            }
            TypeExpr::Interface { shape } => {
                let lines = self.interface_lines(shape)?;
                if lines.is_empty() {
                    "interface{}".to_string()
                } else {
                    format!("interface{{ {} }}", lines.join("; "))
                }
            }
            TypeExpr::Tilde { elem } => format!("~{}", self.type_expr(elem)?),
            TypeExpr::Union { terms } => {
                let mut rendered = Vec::with_capacity(terms.len());
                for term in terms {
                    rendered.push(self.type_expr(term)?);
                }
                rendered.join(" | ")
            }
            TypeExpr::Unsupported { reason } => return Err(self.error(reason.clone())),
        })
    }
}

/// Zero literal that keeps the constant's kind when it is untyped
pub fn zero_literal(kind: BasicKind) -> &'static str {
    match kind {
        BasicKind::Bool => "false",
        BasicKind::Int => "0",
        BasicKind::Rune => "'\\x00'",
        BasicKind::Float => "0.0",
        BasicKind::Complex => "0i",
        BasicKind::String => "\"\"",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImportSet, MethodShape};

    const PKG: &str = "example.com/store";

    fn extraction(records: Vec<ShapeRecord>, imports: ImportSet) -> Extraction {
        Extraction {
            package: PKG.to_string(),
            package_name: "store".to_string(),
            records,
            imports,
        }
    }

    fn record(name: &str, kind: ShapeKind) -> ShapeRecord {
        ShapeRecord {
            name: name.to_string(),
            package: PKG.to_string(),
            requested: true,
            kind,
        }
    }

    #[test]
    fn test_render_function() {
        let mut imports = ImportSet::new();
        imports.insert("context", None);
        imports.insert("github.com/Masterminds/squirrel", Some("sq"));

        let open = record(
            "Open",
            ShapeKind::Function {
                type_params: Vec::new(),
                signature: FuncShape {
                    params: vec![
                        TypeExpr::named("context", "Context"),
                        TypeExpr::named("github.com/Masterminds/squirrel", "Sqlizer"),
                        TypeExpr::builtin("any"),
                    ],
                    variadic: true,
                    results: vec![TypeExpr::builtin("string"), TypeExpr::builtin("error")],
                },
            },
        );

        let stub = render(&extraction(vec![open], imports)).unwrap();
        let expected = r#"package store

import (
	"context"

	sq "github.com/Masterminds/squirrel"
)

// Open is a stub of example.com/store.Open. Generated code, do not edit.
func Open(_ context.Context, _ sq.Sqlizer, _ ...any) (string, error) {
	panic("not implemented")
}
"#;
        assert_eq!(stub.text, expected);
        assert_eq!(
            stub.imports,
            vec!["context".to_string(), "github.com/Masterminds/squirrel".to_string()]
        );
    }

    #[test]
    fn test_render_interface_and_struct() {
        let conn = record(
            "Conn",
            ShapeKind::Interface {
                type_params: Vec::new(),
                shape: InterfaceShape {
                    methods: vec![MethodShape {
                        name: "Close".to_string(),
                        signature: FuncShape {
                            results: vec![TypeExpr::builtin("error")],
                            ..Default::default()
                        },
                    }],
                    ..Default::default()
                },
            },
        );
        let options = record(
            "Options",
            ShapeKind::Struct {
                type_params: Vec::new(),
                fields: vec![
                    FieldShape {
                        name: "Name".to_string(),
                        ty: TypeExpr::builtin("string"),
                        embedded: false,
                        tag: Some("`json:\"name\"`".to_string()),
                    },
                    FieldShape {
                        name: "Conn".to_string(),
                        ty: TypeExpr::named(PKG, "Conn"),
                        embedded: true,
                        tag: None,
                    },
                ],
                methods: vec![MethodRecord {
                    name: "Validate".to_string(),
                    pointer_receiver: true,
                    receiver_params: Vec::new(),
                    signature: FuncShape {
                        results: vec![TypeExpr::builtin("error")],
                        ..Default::default()
                    },
                }],
            },
        );

        let stub = render(&extraction(vec![conn, options], ImportSet::new())).unwrap();
        let expected = r#"package store

// Conn is a stub of example.com/store.Conn. Generated code, do not edit.
type Conn interface {
	Close() error
}

// Options is a stub of example.com/store.Options. Generated code, do not edit.
type Options struct {
	Name string `json:"name"`
	Conn
}

// Validate is a stub of example.com/store.Options.Validate. Generated code, do not edit.
func (*Options) Validate() error {
	panic("not implemented")
}
"#;
        assert_eq!(stub.text, expected);
        assert!(stub.imports.is_empty());
    }

    #[test]
    fn test_render_values() {
        let records = vec![
            record(
                "Info",
                ShapeKind::Value {
                    ty: Some(TypeExpr::named(PKG, "Level")),
                    constant: true,
                    basic: Some(BasicKind::Int),
                },
            ),
            record(
                "Prefix",
                ShapeKind::Value {
                    ty: None,
                    constant: true,
                    basic: Some(BasicKind::String),
                },
            ),
            record(
                "Default",
                ShapeKind::Value {
                    ty: Some(TypeExpr::pointer(TypeExpr::named(PKG, "Level"))),
                    constant: false,
                    basic: None,
                },
            ),
            record(
                "Level",
                ShapeKind::Named {
                    type_params: Vec::new(),
                    underlying: TypeExpr::builtin("int"),
                    alias: false,
                    methods: Vec::new(),
                },
            ),
        ];

        let stub = render(&extraction(records, ImportSet::new())).unwrap();
        assert!(stub.text.contains("const Info Level = 0\n"));
        assert!(stub.text.contains("const Prefix = \"\"\n"));
        assert!(stub.text.contains("var Default *Level\n"));
        assert!(stub.text.contains("type Level int\n"));
    }

    #[test]
    fn test_render_generics() {
        let list = record(
            "List",
            ShapeKind::Struct {
                type_params: vec![TypeParam {
                    name: "T".to_string(),
                    constraint: TypeExpr::builtin("any"),
                }],
                fields: vec![FieldShape {
                    name: "Items".to_string(),
                    ty: TypeExpr::Slice {
                        elem: Box::new(TypeExpr::Param {
                            name: "T".to_string(),
                        }),
                    },
                    embedded: false,
                    tag: None,
                }],
                methods: vec![MethodRecord {
                    name: "Len".to_string(),
                    pointer_receiver: false,
                    receiver_params: vec!["T".to_string()],
                    signature: FuncShape {
                        results: vec![TypeExpr::builtin("int")],
                        ..Default::default()
                    },
                }],
            },
        );

        let stub = render(&extraction(vec![list], ImportSet::new())).unwrap();
        assert!(stub.text.contains("type List[T any] struct {\n\tItems []T\n}\n"));
        assert!(stub.text.contains("func (List[T]) Len() int {\n"));
    }

    #[test]
    fn test_render_channels() {
        let chans = record(
            "Pipe",
            ShapeKind::Named {
                type_params: Vec::new(),
                underlying: TypeExpr::Chan {
                    dir: ChanDir::Both,
                    elem: Box::new(TypeExpr::Chan {
                        dir: ChanDir::Recv,
                        elem: Box::new(TypeExpr::builtin("int")),
                    }),
                },
                alias: false,
                methods: Vec::new(),
            },
        );
        let stub = render(&extraction(vec![chans], ImportSet::new())).unwrap();
        assert!(stub.text.contains("type Pipe chan (<-chan int)\n"));
    }

    #[test]
    fn test_undeclared_local_type_is_an_error() {
        let var = record(
            "Current",
            ShapeKind::Value {
                ty: Some(TypeExpr::named(PKG, "State")),
                constant: false,
                basic: None,
            },
        );
        let err = render(&extraction(vec![var], ImportSet::new())).unwrap_err();
        assert_eq!(err.symbol(), Some("Current"));
        assert!(matches!(err, StubError::Render { .. }));
    }

    #[test]
    fn test_missing_import_is_an_error() {
        let var = record(
            "Timeout",
            ShapeKind::Value {
                ty: Some(TypeExpr::named("time", "Duration")),
                constant: false,
                basic: None,
            },
        );
        assert!(render(&extraction(vec![var], ImportSet::new())).is_err());
    }

    #[test]
    fn test_unused_imports_are_dropped() {
        let mut imports = ImportSet::new();
        imports.insert("io", None);
        imports.insert("time", None);
        let var = record(
            "Timeout",
            ShapeKind::Value {
                ty: Some(TypeExpr::named("time", "Duration")),
                constant: false,
                basic: None,
            },
        );

        let stub = render(&extraction(vec![var], imports)).unwrap();
        assert!(stub.text.contains("\nimport \"time\"\n"));
        assert!(!stub.text.contains("\"io\""));
        assert_eq!(stub.imports, vec!["time".to_string()]);
    }

    #[test]
    fn test_zero_literals() {
        assert_eq!(zero_literal(BasicKind::Bool), "false");
        assert_eq!(zero_literal(BasicKind::Float), "0.0");
        assert_eq!(zero_literal(BasicKind::Rune), "'\\x00'");
    }
}
