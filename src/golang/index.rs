//! Package Index
//!
//! Converts the tree-sitter syntax of every file in a package into an owned
//! declaration model. Type expressions are resolved against each file's
//! import table as they are converted, so the index never needs the syntax
//! trees again.

use super::loader::LoadedPackage;
use super::names;
use super::parser::{field_children, named_children, node_text, GoFile, GoParser, ImportName};
use crate::models::{
    ArrayLen, BasicKind, ChanDir, FieldShape, FuncShape, InterfaceShape, MethodShape, StubError,
    StubResult, TypeExpr, TypeParam,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tree_sitter::Node;

/// A package-level `type` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub alias: bool,
    pub ty: TypeExpr,
}

/// A package-level function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub signature: FuncShape,
}

/// A method declaration, keyed in the index by its receiver base type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub receiver: String,
    pub pointer: bool,
    pub receiver_params: Vec<String>,
    pub name: String,
    pub signature: FuncShape,
}

/// Callee of an initializer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callee {
    /// Unqualified name in the same package (function or type conversion)
    Local(String),
    /// `pkg.Name(...)`
    Qualified { package: String, name: String },
    /// Conversion to a type written as a type literal or predeclared name
    Conversion(TypeExpr),
}

/// Syntactic summary of a value initializer, enough to infer its type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueInit {
    /// Untyped constant expression of this kind
    Basic(BasicKind),
    /// `T{...}`, `make(T, ...)` or a function literal
    Composite(TypeExpr),
    /// `&T{...}` or `new(T)`
    AddressOf(TypeExpr),
    /// Result `index` of a call
    Call { callee: Callee, index: usize },
    /// Another package-level value
    Ident(String),
    /// `pkg.Value`
    Foreign { package: String, name: String },
    Unknown(String),
}

/// A package-level `var` or `const`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueDecl {
    pub name: String,
    pub constant: bool,
    pub ty: Option<TypeExpr>,
    pub init: Option<ValueInit>,
    /// Initializer text when it is a plain integer literal
    pub int_literal: Option<String>,
}

/// Declarations of one loaded package
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    pub import_path: String,
    pub name: String,
    pub dir: PathBuf,
    pub module_dir: Option<PathBuf>,
    pub types: BTreeMap<String, TypeDecl>,
    pub funcs: BTreeMap<String, FuncDecl>,
    pub values: BTreeMap<String, ValueDecl>,
    pub methods: BTreeMap<String, Vec<MethodDecl>>,
    /// Import path → name the package's own sources use for it
    pub import_names: BTreeMap<String, String>,
}

impl PackageIndex {
    /// Parse every file of a loaded package and index its declarations
    pub fn build(package: &LoadedPackage, parser: &mut GoParser) -> StubResult<Self> {
        let mut index = PackageIndex {
            import_path: package.import_path.clone(),
            name: package.name.clone().unwrap_or_default(),
            dir: package.dir.clone(),
            module_dir: package.module_dir.clone(),
            ..Default::default()
        };

        for path in &package.files {
            let file = parser
                .read_file(path)
                .map_err(|e| StubError::resolution(&package.import_path, e.to_string()))?;
            let Some(file_package) = file.package_name() else {
                return Err(StubError::resolution(
                    &package.import_path,
                    format!("{} has no package clause", path.display()),
                ));
            };

            if index.name.is_empty() {
                index.name = file_package.clone();
            }
            if file_package != index.name {
                tracing::debug!(
                    file = %path.display(),
                    package = %file_package,
                    "skipping file from a different package"
                );
                continue;
            }

            index.add_file(&file);
        }

        if index.name.is_empty() {
            return Err(StubError::resolution(
                &package.import_path,
                "no Go source files",
            ));
        }

        tracing::debug!(
            package = %index.import_path,
            types = index.types.len(),
            funcs = index.funcs.len(),
            values = index.values.len(),
            "indexed package"
        );

        Ok(index)
    }

    /// Index the declarations of one parsed file
    pub fn add_file(&mut self, file: &GoFile) {
        let package = self.import_path.clone();
        let indexer = FileIndexer::new(file, &package);
        let root = file.root();

        for node in named_children(&root) {
            match node.kind() {
                "type_declaration" => {
                    for spec in named_children(&node) {
                        if matches!(spec.kind(), "type_spec" | "type_alias") {
                            if let Some(decl) = indexer.type_decl(&spec) {
                                self.types.insert(decl.name.clone(), decl);
                            }
                        }
                    }
                }
                "function_declaration" => {
                    if let Some(decl) = indexer.func_decl(&node) {
                        self.funcs.insert(decl.name.clone(), decl);
                    }
                }
                "method_declaration" => {
                    if let Some(decl) = indexer.method_decl(&node) {
                        self.methods
                            .entry(decl.receiver.clone())
                            .or_default()
                            .push(decl);
                    }
                }
                "const_declaration" => {
                    for decl in indexer.const_decls(&node) {
                        self.values.insert(decl.name.clone(), decl);
                    }
                }
                "var_declaration" => {
                    for decl in indexer.var_decls(&node) {
                        self.values.insert(decl.name.clone(), decl);
                    }
                }
                _ => {}
            }
        }

        for (path, name) in indexer.hints.into_inner() {
            self.import_names.entry(path).or_insert(name);
        }
    }

    /// Whether any package-level declaration has this name
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name) || self.funcs.contains_key(name) || self.values.contains_key(name)
    }

    /// Exported methods declared on a type, sorted by name
    pub fn exported_methods(&self, type_name: &str) -> Vec<&MethodDecl> {
        let mut methods: Vec<&MethodDecl> = self
            .methods
            .get(type_name)
            .map(|m| m.iter().filter(|d| names::is_exported(&d.name)).collect())
            .unwrap_or_default();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods
    }
}

/// Converts the syntax of a single file
struct FileIndexer<'a> {
    file: &'a GoFile,
    package: &'a str,
    /// Local import name → import path
    imports: HashMap<String, String>,
    /// Import path → local name, for imports actually referenced
    hints: RefCell<BTreeMap<String, String>>,
    /// Type parameters of the declaration being converted
    scope: RefCell<Vec<String>>,
}

impl<'a> FileIndexer<'a> {
    fn new(file: &'a GoFile, package: &'a str) -> Self {
        let imports = file
            .imports()
            .into_iter()
            .filter_map(|spec| spec.local_name().map(|name| (name, spec.path)))
            .collect();

        Self {
            file,
            package,
            imports,
            hints: RefCell::new(BTreeMap::new()),
            scope: RefCell::new(Vec::new()),
        }
    }

    fn text(&self, node: &Node) -> String {
        node_text(node, &self.file.source)
    }

    /// Resolve a package qualifier to its import path
    fn resolve_qualifier(&self, qualifier: &str) -> Option<String> {
        let path = match self.imports.get(qualifier) {
            Some(path) => path.clone(),
            None => self.guess_qualifier(qualifier)?,
        };
        self.hints
            .borrow_mut()
            .entry(path.clone())
            .or_insert_with(|| qualifier.to_string());
        Some(path)
    }

    /// Fallback for packages whose name differs from their default name
    fn guess_qualifier(&self, qualifier: &str) -> Option<String> {
        let imports = self.file.imports();
        let defaults = imports
            .iter()
            .filter(|spec| spec.name == ImportName::Default)
            .map(|spec| spec.path.as_str());
        names::guess_import(qualifier, defaults).map(String::from)
    }

    fn with_scope<T>(&self, params: &[String], f: impl FnOnce() -> T) -> T {
        let saved = self.scope.replace(params.to_vec());
        let out = f();
        self.scope.replace(saved);
        out
    }

    // ---------------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------------

    fn type_decl(&self, spec: &Node) -> Option<TypeDecl> {
        let name = self.text(&spec.child_by_field_name("name")?);
        let (param_names, param_list) = self.param_names(spec.child_by_field_name("type_parameters"));

        self.with_scope(&param_names, || {
            let type_params = param_list
                .map(|list| self.type_params(&list))
                .unwrap_or_default();
            let ty = spec
                .child_by_field_name("type")
                .map(|t| self.type_expr(&t))
                .unwrap_or_else(|| TypeExpr::unsupported("type declaration without a type"));

            Some(TypeDecl {
                name,
                type_params,
                alias: spec.kind() == "type_alias",
                ty,
            })
        })
    }

    fn func_decl(&self, node: &Node) -> Option<FuncDecl> {
        let name = self.text(&node.child_by_field_name("name")?);
        let (param_names, param_list) = self.param_names(node.child_by_field_name("type_parameters"));

        self.with_scope(&param_names, || {
            Some(FuncDecl {
                name,
                type_params: param_list
                    .map(|list| self.type_params(&list))
                    .unwrap_or_default(),
                signature: self.signature(node),
            })
        })
    }

    fn method_decl(&self, node: &Node) -> Option<MethodDecl> {
        let name = self.text(&node.child_by_field_name("name")?);
        let receiver_list = node.child_by_field_name("receiver")?;
        let receiver_param = named_children(&receiver_list).into_iter().next()?;
        let mut receiver_type = receiver_param.child_by_field_name("type")?;

        let mut pointer = false;
        while matches!(receiver_type.kind(), "pointer_type" | "parenthesized_type") {
            pointer |= receiver_type.kind() == "pointer_type";
            receiver_type = named_children(&receiver_type).into_iter().next()?;
        }

        let (receiver, receiver_params) = match receiver_type.kind() {
            "generic_type" => {
                let base = self.text(&receiver_type.child_by_field_name("type")?);
                let params = receiver_type
                    .child_by_field_name("type_arguments")
                    .map(|args| {
                        named_children(&args)
                            .iter()
                            .map(|a| self.text(a).trim().to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                (base, params)
            }
            _ => (self.text(&receiver_type), Vec::new()),
        };

        let signature = self.with_scope(&receiver_params, || self.signature(node));

        Some(MethodDecl {
            receiver,
            pointer,
            receiver_params,
            name,
            signature,
        })
    }

    fn const_decls(&self, node: &Node) -> Vec<ValueDecl> {
        let mut decls = Vec::new();
        let mut prev_ty: Option<TypeExpr> = None;
        let mut prev_inits: Vec<ValueInit> = Vec::new();

        for spec in self.specs(node, "const_spec") {
            let names = field_children(&spec, "name");
            let ty = spec.child_by_field_name("type").map(|t| self.type_expr(&t));
            let values = spec
                .child_by_field_name("value")
                .map(|v| named_children(&v))
                .unwrap_or_default();

            // A bare name repeats the previous type and expression (iota)
            let (ty, inits, literals) = if ty.is_none() && values.is_empty() {
                (prev_ty.clone(), prev_inits.clone(), Vec::new())
            } else {
                let inits: Vec<ValueInit> = values.iter().map(|v| self.const_init(v)).collect();
                let literals = values
                    .iter()
                    .map(|v| (v.kind() == "int_literal").then(|| self.text(v)))
                    .collect();
                prev_ty = ty.clone();
                prev_inits = inits.clone();
                (ty, inits, literals)
            };

            for (i, name) in names.iter().enumerate() {
                decls.push(ValueDecl {
                    name: self.text(name),
                    constant: true,
                    ty: ty.clone(),
                    init: inits.get(i).cloned(),
                    int_literal: literals.get(i).cloned().flatten(),
                });
            }
        }

        decls
    }

    fn var_decls(&self, node: &Node) -> Vec<ValueDecl> {
        let mut decls = Vec::new();

        for spec in self.specs(node, "var_spec") {
            let names = field_children(&spec, "name");
            let ty = spec.child_by_field_name("type").map(|t| self.type_expr(&t));
            let values = spec
                .child_by_field_name("value")
                .map(|v| named_children(&v))
                .unwrap_or_default();

            for (i, name) in names.iter().enumerate() {
                let init = if values.len() == names.len() {
                    Some(self.var_init(&values[i]))
                } else if values.len() == 1 {
                    match self.var_init(&values[0]) {
                        ValueInit::Call { callee, .. } => Some(ValueInit::Call { callee, index: i }),
                        other => Some(other),
                    }
                } else {
                    None
                };

                decls.push(ValueDecl {
                    name: self.text(name),
                    constant: false,
                    ty: ty.clone(),
                    init,
                    int_literal: None,
                });
            }
        }

        decls
    }

    /// Specs of a declaration, whether written alone or in a parenthesized list
    fn specs<'t>(&self, node: &Node<'t>, kind: &str) -> Vec<Node<'t>> {
        let mut specs = Vec::new();
        for child in named_children(node) {
            if child.kind() == kind {
                specs.push(child);
            } else if child.kind().ends_with("_spec_list") {
                specs.extend(named_children(&child).into_iter().filter(|c| c.kind() == kind));
            }
        }
        specs
    }

    // ---------------------------------------------------------------------
    // Type parameters and signatures
    // ---------------------------------------------------------------------

    fn param_names<'t>(&self, list: Option<Node<'t>>) -> (Vec<String>, Option<Node<'t>>) {
        let Some(list) = list else {
            return (Vec::new(), None);
        };
        let names = named_children(&list)
            .iter()
            .flat_map(|decl| field_children(decl, "name"))
            .map(|n| self.text(&n))
            .collect();
        (names, Some(list))
    }

    fn type_params(&self, list: &Node) -> Vec<TypeParam> {
        let mut params = Vec::new();
        for decl in named_children(list) {
            let constraint = decl
                .child_by_field_name("type")
                .map(|t| self.type_expr(&t))
                .unwrap_or_else(|| TypeExpr::builtin("any"));
            for name in field_children(&decl, "name") {
                params.push(TypeParam {
                    name: self.text(&name),
                    constraint: constraint.clone(),
                });
            }
        }
        params
    }

    /// Parameters and results of a function declaration, method or function type
    fn signature(&self, node: &Node) -> FuncShape {
        let (params, variadic) = node
            .child_by_field_name("parameters")
            .map(|p| self.parameter_list(&p))
            .unwrap_or_default();

        let results = match node.child_by_field_name("result") {
            None => Vec::new(),
            Some(r) if r.kind() == "parameter_list" => self.parameter_list(&r).0,
            Some(r) => vec![self.type_expr(&r)],
        };

        FuncShape {
            params,
            variadic,
            results,
        }
    }

    fn parameter_list(&self, list: &Node) -> (Vec<TypeExpr>, bool) {
        let mut types = Vec::new();
        let mut variadic = false;

        for param in named_children(list) {
            let ty = param
                .child_by_field_name("type")
                .map(|t| self.type_expr(&t))
                .unwrap_or_else(|| TypeExpr::unsupported("parameter without a type"));
            match param.kind() {
                "variadic_parameter_declaration" => {
                    variadic = true;
                    types.push(ty);
                }
                _ => {
                    let count = field_children(&param, "name").len().max(1);
                    types.extend(std::iter::repeat(ty).take(count));
                }
            }
        }

        (types, variadic)
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    fn type_expr(&self, node: &Node) -> TypeExpr {
        match node.kind() {
            "type_identifier" | "identifier" => self.ident_type(&self.text(node)),
            "qualified_type" => self.qualified_type(node),
            "generic_type" => self.generic_type(node),
            "pointer_type" => TypeExpr::pointer(self.first_type(node)),
            "slice_type" => TypeExpr::Slice {
                elem: Box::new(self.field_type(node, "element")),
            },
            "array_type" => TypeExpr::Array {
                len: node
                    .child_by_field_name("length")
                    .map(|l| self.array_len(&l))
                    .unwrap_or(ArrayLen::Expr {
                        text: String::new(),
                    }),
                elem: Box::new(self.field_type(node, "element")),
            },
            "map_type" => TypeExpr::Map {
                key: Box::new(self.field_type(node, "key")),
                value: Box::new(self.field_type(node, "value")),
            },
            "channel_type" => TypeExpr::Chan {
                dir: self.chan_dir(node),
                elem: Box::new(self.field_type(node, "value")),
            },
            "function_type" => TypeExpr::Func {
                signature: self.signature(node),
            },
            "struct_type" => TypeExpr::Struct {
                fields: self.struct_fields(node),
            },
            "interface_type" => TypeExpr::Interface {
                shape: self.interface(node),
            },
            "parenthesized_type" => self.first_type(node),
            "negated_type" => TypeExpr::Tilde {
                elem: Box::new(self.first_type(node)),
            },
            "type_elem" | "type_constraint" | "constraint_elem" | "interface_type_name" => {
                let mut terms: Vec<TypeExpr> = named_children(node)
                    .iter()
                    .map(|t| self.type_expr(t))
                    .collect();
                if terms.len() == 1 {
                    terms.remove(0)
                } else {
                    TypeExpr::Union { terms }
                }
            }
            other => TypeExpr::unsupported(format!(
                "unsupported type syntax `{}` ({})",
                self.text(node),
                other
            )),
        }
    }

    fn ident_type(&self, name: &str) -> TypeExpr {
        if self.scope.borrow().iter().any(|p| p == name) {
            TypeExpr::Param {
                name: name.to_string(),
            }
        } else if names::is_predeclared_type(name) {
            TypeExpr::builtin(name)
        } else {
            TypeExpr::named(self.package, name)
        }
    }

    fn qualified_type(&self, node: &Node) -> TypeExpr {
        let (Some(pkg), Some(name)) = (
            node.child_by_field_name("package"),
            node.child_by_field_name("name"),
        ) else {
            return TypeExpr::unsupported(format!("malformed qualified type `{}`", self.text(node)));
        };
        let qualifier = self.text(&pkg);
        match self.resolve_qualifier(&qualifier) {
            Some(path) => TypeExpr::named(&path, &self.text(&name)),
            None => TypeExpr::unsupported(format!("unknown package qualifier `{}`", qualifier)),
        }
    }

    fn generic_type(&self, node: &Node) -> TypeExpr {
        let base = node
            .child_by_field_name("type")
            .map(|t| self.type_expr(&t))
            .unwrap_or_else(|| TypeExpr::unsupported("generic type without a base"));
        let type_args: Vec<TypeExpr> = node
            .child_by_field_name("type_arguments")
            .map(|args| named_children(&args).iter().map(|a| self.type_expr(a)).collect())
            .unwrap_or_default();

        match base {
            TypeExpr::Named { package, name, .. } => TypeExpr::Named {
                package,
                name,
                args: type_args,
            },
            TypeExpr::Unsupported { .. } => base,
            _ => TypeExpr::unsupported(format!("cannot instantiate `{}`", self.text(node))),
        }
    }

    fn field_type(&self, node: &Node, field: &str) -> TypeExpr {
        node.child_by_field_name(field)
            .map(|t| self.type_expr(&t))
            .unwrap_or_else(|| TypeExpr::unsupported(format!("missing {} in `{}`", field, self.text(node))))
    }

    fn first_type(&self, node: &Node) -> TypeExpr {
        named_children(node)
            .first()
            .map(|t| self.type_expr(t))
            .unwrap_or_else(|| TypeExpr::unsupported(format!("empty type `{}`", self.text(node))))
    }

    fn chan_dir(&self, node: &Node) -> ChanDir {
        let mut cursor = node.walk();
        let tokens: Vec<&str> = node.children(&mut cursor).map(|c| c.kind()).collect();
        match tokens.iter().position(|k| *k == "<-") {
            Some(0) => ChanDir::Recv,
            Some(_) => ChanDir::Send,
            None => ChanDir::Both,
        }
    }

    fn array_len(&self, node: &Node) -> ArrayLen {
        match node.kind() {
            "int_literal" => ArrayLen::Literal {
                value: self.text(node),
            },
            "identifier" => ArrayLen::Const {
                package: self.package.to_string(),
                name: self.text(node),
            },
            "selector_expression" => {
                let operand = node.child_by_field_name("operand");
                let field = node.child_by_field_name("field");
                if let (Some(op), Some(field)) = (operand, field) {
                    if op.kind() == "identifier" {
                        if let Some(path) = self.resolve_qualifier(&self.text(&op)) {
                            return ArrayLen::Const {
                                package: path,
                                name: self.text(&field),
                            };
                        }
                    }
                }
                ArrayLen::Expr {
                    text: self.text(node),
                }
            }
            "parenthesized_expression" => named_children(node)
                .first()
                .map(|inner| self.array_len(inner))
                .unwrap_or(ArrayLen::Expr {
                    text: self.text(node),
                }),
            _ => ArrayLen::Expr {
                text: self.text(node),
            },
        }
    }

    fn struct_fields(&self, node: &Node) -> Vec<FieldShape> {
        let mut fields = Vec::new();
        let Some(list) = named_children(node)
            .into_iter()
            .find(|c| c.kind() == "field_declaration_list")
        else {
            return fields;
        };

        for decl in named_children(&list) {
            if decl.kind() != "field_declaration" {
                continue;
            }
            let names = field_children(&decl, "name");
            let tag = decl.child_by_field_name("tag").map(|t| self.text(&t));
            let mut ty = decl
                .child_by_field_name("type")
                .map(|t| self.type_expr(&t))
                .unwrap_or_else(|| TypeExpr::unsupported(format!("field without a type `{}`", self.text(&decl))));

            if names.is_empty() {
                let mut cursor = decl.walk();
                let starred = decl.children(&mut cursor).any(|c| c.kind() == "*");
                if starred {
                    ty = TypeExpr::pointer(ty);
                }
                let name = ty
                    .embedded_name()
                    .map(String::from)
                    .unwrap_or_else(|| self.text(&decl));
                fields.push(FieldShape {
                    name,
                    ty,
                    embedded: true,
                    tag,
                });
            } else {
                for name in names {
                    fields.push(FieldShape {
                        name: self.text(&name),
                        ty: ty.clone(),
                        embedded: false,
                        tag: tag.clone(),
                    });
                }
            }
        }

        fields
    }

    fn interface(&self, node: &Node) -> InterfaceShape {
        let mut shape = InterfaceShape::default();

        for elem in named_children(node) {
            match elem.kind() {
                "method_elem" | "method_spec" => {
                    if let Some(name) = elem.child_by_field_name("name") {
                        shape.methods.push(MethodShape {
                            name: self.text(&name),
                            signature: self.signature(&elem),
                        });
                    }
                }
                "type_elem" | "constraint_elem" | "interface_type_name" | "struct_elem"
                | "type_identifier" | "qualified_type" | "generic_type" => {
                    let ty = self.type_expr(&elem);
                    let embeds = match &ty {
                        TypeExpr::Named { .. } => true,
                        TypeExpr::Builtin { name } => name == "error" || name == "any",
                        _ => false,
                    };
                    if embeds {
                        shape.embedded.push(ty);
                    } else {
                        shape.type_sets.push(ty);
                    }
                }
                _ => {}
            }
        }

        shape
    }

    // ---------------------------------------------------------------------
    // Initializers
    // ---------------------------------------------------------------------

    fn const_init(&self, expr: &Node) -> ValueInit {
        match expr.kind() {
            "int_literal" => ValueInit::Basic(BasicKind::Int),
            "float_literal" => ValueInit::Basic(BasicKind::Float),
            "imaginary_literal" => ValueInit::Basic(BasicKind::Complex),
            "rune_literal" => ValueInit::Basic(BasicKind::Rune),
            "interpreted_string_literal" | "raw_string_literal" => ValueInit::Basic(BasicKind::String),
            "true" | "false" => ValueInit::Basic(BasicKind::Bool),
            "iota" => ValueInit::Basic(BasicKind::Int),
            "identifier" => {
                let name = self.text(expr);
                match name.as_str() {
                    "iota" => ValueInit::Basic(BasicKind::Int),
                    "true" | "false" => ValueInit::Basic(BasicKind::Bool),
                    _ => ValueInit::Ident(name),
                }
            }
            "parenthesized_expression" => named_children(expr)
                .first()
                .map(|inner| self.const_init(inner))
                .unwrap_or_else(|| ValueInit::Unknown(self.text(expr))),
            "unary_expression" => {
                let operator = expr.child_by_field_name("operator").map(|o| self.text(&o));
                if operator.as_deref() == Some("!") {
                    return ValueInit::Basic(BasicKind::Bool);
                }
                expr.child_by_field_name("operand")
                    .map(|o| self.const_init(&o))
                    .unwrap_or_else(|| ValueInit::Unknown(self.text(expr)))
            }
            "binary_expression" => {
                let operator = expr
                    .child_by_field_name("operator")
                    .map(|o| self.text(&o))
                    .unwrap_or_default();
                if is_boolean_operator(&operator) {
                    return ValueInit::Basic(BasicKind::Bool);
                }
                let left = expr.child_by_field_name("left").map(|l| self.const_init(&l));
                if operator == "<<" || operator == ">>" {
                    return left.unwrap_or_else(|| ValueInit::Unknown(self.text(expr)));
                }
                let right = expr.child_by_field_name("right").map(|r| self.const_init(&r));
                combine_const(left, right).unwrap_or_else(|| ValueInit::Unknown(self.text(expr)))
            }
            "selector_expression" => self.foreign_value(expr),
            "call_expression" => match self.call_init(expr) {
                ValueInit::Call {
                    callee: Callee::Local(name),
                    ..
                } if matches!(name.as_str(), "len" | "cap") => ValueInit::Basic(BasicKind::Int),
                other => other,
            },
            _ => ValueInit::Unknown(self.text(expr)),
        }
    }

    fn var_init(&self, expr: &Node) -> ValueInit {
        match expr.kind() {
            "composite_literal" => expr
                .child_by_field_name("type")
                .map(|t| ValueInit::Composite(self.type_expr(&t)))
                .unwrap_or_else(|| ValueInit::Unknown(self.text(expr))),
            "func_literal" => ValueInit::Composite(TypeExpr::Func {
                signature: self.signature(expr),
            }),
            "unary_expression" => {
                let operator = expr.child_by_field_name("operator").map(|o| self.text(&o));
                let operand = expr.child_by_field_name("operand");
                match (operator.as_deref(), operand) {
                    (Some("&"), Some(op)) => match self.var_init(&op) {
                        ValueInit::Composite(ty) => ValueInit::AddressOf(ty),
                        _ => ValueInit::Unknown(self.text(expr)),
                    },
                    (Some("<-"), _) => ValueInit::Unknown(self.text(expr)),
                    (_, Some(op)) => self.var_init(&op),
                    _ => ValueInit::Unknown(self.text(expr)),
                }
            }
            "call_expression" => self.call_init(expr),
            "parenthesized_expression" => named_children(expr)
                .first()
                .map(|inner| self.var_init(inner))
                .unwrap_or_else(|| ValueInit::Unknown(self.text(expr))),
            "binary_expression" => {
                let operator = expr
                    .child_by_field_name("operator")
                    .map(|o| self.text(&o))
                    .unwrap_or_default();
                if is_boolean_operator(&operator) {
                    return ValueInit::Basic(BasicKind::Bool);
                }
                expr.child_by_field_name("left")
                    .map(|l| self.var_init(&l))
                    .unwrap_or_else(|| ValueInit::Unknown(self.text(expr)))
            }
            "selector_expression" => self.foreign_value(expr),
            "nil" => ValueInit::Unknown(self.text(expr)),
            _ => self.const_init(expr),
        }
    }

    fn foreign_value(&self, expr: &Node) -> ValueInit {
        let operand = expr.child_by_field_name("operand");
        let field = expr.child_by_field_name("field");
        if let (Some(op), Some(field)) = (operand, field) {
            if op.kind() == "identifier" {
                if let Some(package) = self.resolve_qualifier(&self.text(&op)) {
                    return ValueInit::Foreign {
                        package,
                        name: self.text(&field),
                    };
                }
            }
        }
        ValueInit::Unknown(self.text(expr))
    }

    fn call_init(&self, expr: &Node) -> ValueInit {
        let Some(function) = expr.child_by_field_name("function") else {
            return ValueInit::Unknown(self.text(expr));
        };
        let first_arg = expr
            .child_by_field_name("arguments")
            .and_then(|args| named_children(&args).into_iter().next());

        let callee = match function.kind() {
            "identifier" => {
                let name = self.text(&function);
                match (name.as_str(), first_arg) {
                    ("new", Some(arg)) => return ValueInit::AddressOf(self.type_expr(&arg)),
                    ("make", Some(arg)) => return ValueInit::Composite(self.type_expr(&arg)),
                    _ if names::is_predeclared_type(&name) => {
                        Callee::Conversion(TypeExpr::builtin(&name))
                    }
                    _ => Callee::Local(name),
                }
            }
            "selector_expression" => match self.foreign_value(&function) {
                ValueInit::Foreign { package, name } => Callee::Qualified { package, name },
                other => return other,
            },
            "parenthesized_type" | "pointer_type" | "slice_type" | "array_type" | "map_type"
            | "channel_type" | "function_type" | "qualified_type" | "generic_type"
            | "interface_type" => Callee::Conversion(self.type_expr(&function)),
            _ => return ValueInit::Unknown(self.text(expr)),
        };

        ValueInit::Call { callee, index: 0 }
    }
}

fn is_boolean_operator(op: &str) -> bool {
    matches!(op, "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||")
}

fn basic_rank(kind: BasicKind) -> u8 {
    match kind {
        BasicKind::Bool => 0,
        BasicKind::Int => 1,
        BasicKind::Rune => 2,
        BasicKind::Float => 3,
        BasicKind::Complex => 4,
        BasicKind::String => 5,
    }
}

/// Kind of `left op right` for constant expressions
///
/// A typed operand decides the type (`KB * 1024` has the type of `KB`),
/// otherwise the higher-ranked untyped kind wins.
fn combine_const(left: Option<ValueInit>, right: Option<ValueInit>) -> Option<ValueInit> {
    match (left, right) {
        (Some(ValueInit::Basic(a)), Some(ValueInit::Basic(b))) => {
            Some(ValueInit::Basic(if basic_rank(a) >= basic_rank(b) { a } else { b }))
        }
        (Some(ValueInit::Basic(_)), Some(other)) => Some(other),
        (Some(left), _) => Some(left),
        (None, right) => right,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const PKG: &str = "example.com/shapes";

    fn index(source: &str) -> PackageIndex {
        let mut parser = GoParser::new().unwrap();
        let file = parser
            .parse_file(Path::new("shapes.go"), source.to_string())
            .unwrap();
        let mut index = PackageIndex {
            import_path: PKG.to_string(),
            name: "shapes".to_string(),
            ..Default::default()
        };
        index.add_file(&file);
        index
    }

    #[test]
    fn test_function_signature() {
        let idx = index(
            r#"
package shapes

import sq "github.com/Masterminds/squirrel"

func Expr(sql string, args ...interface{}) sq.Sqlizer { return nil }

func Pair(a, b int) (x int, err error) { return }
"#,
        );

        let expr = &idx.funcs["Expr"];
        assert!(expr.signature.variadic);
        assert_eq!(expr.signature.params.len(), 2);
        assert_eq!(expr.signature.params[0], TypeExpr::builtin("string"));
        assert_eq!(
            expr.signature.results,
            vec![TypeExpr::named("github.com/Masterminds/squirrel", "Sqlizer")]
        );
        assert_eq!(
            idx.import_names.get("github.com/Masterminds/squirrel").map(String::as_str),
            Some("sq")
        );

        let pair = &idx.funcs["Pair"];
        assert_eq!(pair.signature.params.len(), 2);
        assert_eq!(
            pair.signature.results,
            vec![TypeExpr::builtin("int"), TypeExpr::builtin("error")]
        );
    }

    #[test]
    fn test_struct_fields_and_embedding() {
        let idx = index(
            r#"
package shapes

import "sync"

type Point struct {
    X, Y int `json:"coord"`
    label string
    *sync.Mutex
    Base
}
"#,
        );

        let TypeExpr::Struct { fields } = &idx.types["Point"].ty else {
            panic!("expected struct");
        };
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["X", "Y", "label", "Mutex", "Base"]);
        assert_eq!(fields[0].tag.as_deref(), Some("`json:\"coord\"`"));
        assert!(fields[3].embedded);
        assert_eq!(fields[3].ty, TypeExpr::pointer(TypeExpr::named("sync", "Mutex")));
        assert_eq!(fields[4].ty, TypeExpr::named(PKG, "Base"));
    }

    #[test]
    fn test_interface_elements() {
        let idx = index(
            r#"
package shapes

import "io"

type Shape interface {
    io.Closer
    Area() float64
    scale(f float64)
}

type Number interface {
    ~int | ~float64
}
"#,
        );

        let TypeExpr::Interface { shape } = &idx.types["Shape"].ty else {
            panic!("expected interface");
        };
        assert_eq!(shape.embedded, vec![TypeExpr::named("io", "Closer")]);
        assert_eq!(shape.methods.len(), 2);
        assert_eq!(shape.methods[0].name, "Area");

        let TypeExpr::Interface { shape } = &idx.types["Number"].ty else {
            panic!("expected interface");
        };
        assert!(shape.embedded.is_empty());
        assert_eq!(shape.type_sets.len(), 1);
        assert!(matches!(shape.type_sets[0], TypeExpr::Union { .. }));
    }

    #[test]
    fn test_generics_and_methods() {
        let idx = index(
            r#"
package shapes

type Stack[T any] struct {
    items []T
}

func (s *Stack[E]) Push(v E) {}

func (s Stack[E]) Len() int { return 0 }

func Map[K comparable, V any](m map[K]V) []V { return nil }
"#,
        );

        let stack = &idx.types["Stack"];
        assert_eq!(stack.type_params.len(), 1);
        assert_eq!(stack.type_params[0].constraint, TypeExpr::builtin("any"));

        let methods = idx.exported_methods("Stack");
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name, "Len");
        assert!(!methods[0].pointer);
        assert_eq!(methods[1].name, "Push");
        assert!(methods[1].pointer);
        assert_eq!(methods[1].receiver_params, vec!["E"]);
        assert_eq!(
            methods[1].signature.params,
            vec![TypeExpr::Param { name: "E".into() }]
        );

        let map = &idx.funcs["Map"];
        assert_eq!(map.type_params.len(), 2);
        assert_eq!(
            map.signature.results,
            vec![TypeExpr::Slice {
                elem: Box::new(TypeExpr::Param { name: "V".into() })
            }]
        );
    }

    #[test]
    fn test_const_iota_repetition() {
        let idx = index(
            r#"
package shapes

type Kind int

const (
    KindA Kind = iota
    KindB
    Untyped = "x"
    Big = 1 << 10
)
"#,
        );

        assert_eq!(idx.values["KindB"].ty, Some(TypeExpr::named(PKG, "Kind")));
        assert!(idx.values["KindB"].constant);
        assert_eq!(idx.values["Untyped"].ty, None);
        assert_eq!(idx.values["Untyped"].init, Some(ValueInit::Basic(BasicKind::String)));
        assert_eq!(idx.values["Big"].init, Some(ValueInit::Basic(BasicKind::Int)));
    }

    #[test]
    fn test_var_initializers() {
        let idx = index(
            r#"
package shapes

import "errors"

var (
    ErrClosed = errors.New("closed")
    Default = &Config{}
    Names = []string{"a"}
    Count int
    a, b = split()
)
"#,
        );

        assert_eq!(
            idx.values["ErrClosed"].init,
            Some(ValueInit::Call {
                callee: Callee::Qualified {
                    package: "errors".into(),
                    name: "New".into()
                },
                index: 0
            })
        );
        assert_eq!(
            idx.values["Default"].init,
            Some(ValueInit::AddressOf(TypeExpr::named(PKG, "Config")))
        );
        assert!(matches!(idx.values["Names"].init, Some(ValueInit::Composite(TypeExpr::Slice { .. }))));
        assert_eq!(idx.values["Count"].ty, Some(TypeExpr::builtin("int")));
        assert_eq!(
            idx.values["b"].init,
            Some(ValueInit::Call {
                callee: Callee::Local("split".into()),
                index: 1
            })
        );
    }

    #[test]
    fn test_array_lengths() {
        let idx = index(
            r#"
package shapes

import "crypto/sha256"

const Size = 16

type Digest [sha256.Size]byte
type Block [Size]byte
type Raw [4]byte
"#,
        );

        assert!(matches!(
            &idx.types["Digest"].ty,
            TypeExpr::Array { len: ArrayLen::Const { package, .. }, .. } if package == "crypto/sha256"
        ));
        assert!(matches!(
            &idx.types["Block"].ty,
            TypeExpr::Array { len: ArrayLen::Const { package, .. }, .. } if package == PKG
        ));
        assert!(matches!(
            &idx.types["Raw"].ty,
            TypeExpr::Array { len: ArrayLen::Literal { value }, .. } if value == "4"
        ));
        assert_eq!(idx.values["Size"].int_literal.as_deref(), Some("16"));
    }

    #[test]
    fn test_channel_directions() {
        let idx = index(
            r#"
package shapes

type In <-chan int
type Out chan<- int
type Both chan int
"#,
        );

        assert!(matches!(idx.types["In"].ty, TypeExpr::Chan { dir: ChanDir::Recv, .. }));
        assert!(matches!(idx.types["Out"].ty, TypeExpr::Chan { dir: ChanDir::Send, .. }));
        assert!(matches!(idx.types["Both"].ty, TypeExpr::Chan { dir: ChanDir::Both, .. }));
    }
}
