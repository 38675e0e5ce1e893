//! Normalized shape records produced by the extractor
//!
//! Type expressions are stored fully resolved: every named type carries the
//! import path of the package that declares it, so a shape can be moved
//! between packages (interface flattening, function results) without
//! re-qualifying names.

use crate::golang::names;
use std::collections::BTreeMap;

/// A resolved Go type expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// Predeclared type (`int`, `error`, `any`, ...)
    Builtin { name: String },
    /// Named type declared in a package
    Named {
        package: String,
        name: String,
        args: Vec<TypeExpr>,
    },
    /// Type parameter in scope
    Param { name: String },
    Pointer { elem: Box<TypeExpr> },
    Slice { elem: Box<TypeExpr> },
    Array { len: ArrayLen, elem: Box<TypeExpr> },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    Chan { dir: ChanDir, elem: Box<TypeExpr> },
    Func { signature: FuncShape },
    Struct { fields: Vec<FieldShape> },
    Interface { shape: InterfaceShape },
    /// `~T` in a constraint
    Tilde { elem: Box<TypeExpr> },
    /// `A | B` in a constraint
    Union { terms: Vec<TypeExpr> },
    /// Syntax the indexer could not model; rendering it is an error
    Unsupported { reason: String },
}

impl TypeExpr {
    pub fn builtin(name: &str) -> Self {
        Self::Builtin {
            name: name.to_string(),
        }
    }

    pub fn named(package: &str, name: &str) -> Self {
        Self::Named {
            package: package.to_string(),
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    pub fn pointer(elem: TypeExpr) -> Self {
        Self::Pointer {
            elem: Box::new(elem),
        }
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }

    /// Name used for an embedded field of this type (`*pkg.T[X]` embeds as `T`)
    pub fn embedded_name(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } | Self::Builtin { name } => Some(name),
            Self::Pointer { elem } => elem.embedded_name(),
            _ => None,
        }
    }

    /// Replace type parameters according to `subst`
    pub fn substitute(&self, subst: &BTreeMap<String, TypeExpr>) -> TypeExpr {
        if subst.is_empty() {
            return self.clone();
        }
        let boxed = |t: &TypeExpr| Box::new(t.substitute(subst));
        match self {
            Self::Param { name } => subst.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Named {
                package,
                name,
                args,
            } => Self::Named {
                package: package.clone(),
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(subst)).collect(),
            },
            Self::Pointer { elem } => Self::Pointer { elem: boxed(elem) },
            Self::Slice { elem } => Self::Slice { elem: boxed(elem) },
            Self::Array { len, elem } => Self::Array {
                len: len.clone(),
                elem: boxed(elem),
            },
            Self::Map { key, value } => Self::Map {
                key: boxed(key),
                value: boxed(value),
            },
            Self::Chan { dir, elem } => Self::Chan {
                dir: *dir,
                elem: boxed(elem),
            },
            Self::Func { signature } => Self::Func {
                signature: signature.substitute(subst),
            },
            Self::Struct { fields } => Self::Struct {
                fields: fields
                    .iter()
                    .map(|f| FieldShape {
                        ty: f.ty.substitute(subst),
                        ..f.clone()
                    })
                    .collect(),
            },
            Self::Interface { shape } => Self::Interface {
                shape: InterfaceShape {
                    methods: shape
                        .methods
                        .iter()
                        .map(|m| MethodShape {
                            name: m.name.clone(),
                            signature: m.signature.substitute(subst),
                        })
                        .collect(),
                    embedded: shape.embedded.iter().map(|e| e.substitute(subst)).collect(),
                    type_sets: shape.type_sets.iter().map(|e| e.substitute(subst)).collect(),
                },
            },
            Self::Tilde { elem } => Self::Tilde { elem: boxed(elem) },
            Self::Union { terms } => Self::Union {
                terms: terms.iter().map(|t| t.substitute(subst)).collect(),
            },
            Self::Builtin { .. } | Self::Unsupported { .. } => self.clone(),
        }
    }
}

/// Length of an array type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayLen {
    /// Integer literal, kept as written
    Literal { value: String },
    /// Reference to a package-level constant
    Const { package: String, name: String },
    /// Any other constant expression
    Expr { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// Parameter and result types of a function, method or function type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuncShape {
    pub params: Vec<TypeExpr>,
    /// When set, the last parameter is `...T` and `params` holds `T`
    pub variadic: bool,
    pub results: Vec<TypeExpr>,
}

impl FuncShape {
    pub fn substitute(&self, subst: &BTreeMap<String, TypeExpr>) -> FuncShape {
        FuncShape {
            params: self.params.iter().map(|p| p.substitute(subst)).collect(),
            variadic: self.variadic,
            results: self.results.iter().map(|r| r.substitute(subst)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldShape {
    pub name: String,
    pub ty: TypeExpr,
    pub embedded: bool,
    /// Raw tag literal including its quotes
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodShape {
    pub name: String,
    pub signature: FuncShape,
}

/// Interface body. After extraction `embedded` is empty for top-level
/// interface records: embedded interfaces are flattened into `methods`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceShape {
    pub methods: Vec<MethodShape>,
    pub embedded: Vec<TypeExpr>,
    pub type_sets: Vec<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub constraint: TypeExpr,
}

/// Basic kind of a constant, used to pick its zero value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicKind {
    Bool,
    Int,
    Rune,
    Float,
    Complex,
    String,
}

impl BasicKind {
    /// Kind of a predeclared type name, if it is a basic type
    pub fn of_builtin(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16"
            | "uint32" | "uint64" | "uintptr" | "byte" => Some(Self::Int),
            "rune" => Some(Self::Rune),
            "float32" | "float64" => Some(Self::Float),
            "complex64" | "complex128" => Some(Self::Complex),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    /// Default type an untyped constant of this kind takes in a variable
    pub fn default_type(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Rune => "rune",
            Self::Float => "float64",
            Self::Complex => "complex128",
            Self::String => "string",
        }
    }
}

/// A method declared on a concrete named type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRecord {
    pub name: String,
    pub pointer_receiver: bool,
    /// Receiver type parameter names as spelled in the method declaration
    pub receiver_params: Vec<String>,
    pub signature: FuncShape,
}

/// Shape of one stubbed symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    Function {
        type_params: Vec<TypeParam>,
        signature: FuncShape,
    },
    Interface {
        type_params: Vec<TypeParam>,
        shape: InterfaceShape,
    },
    Struct {
        type_params: Vec<TypeParam>,
        fields: Vec<FieldShape>,
        methods: Vec<MethodRecord>,
    },
    Named {
        type_params: Vec<TypeParam>,
        underlying: TypeExpr,
        alias: bool,
        methods: Vec<MethodRecord>,
    },
    Value {
        /// Declared or inferred type; `None` only for untyped constants
        ty: Option<TypeExpr>,
        constant: bool,
        /// Basic kind for constants
        basic: Option<BasicKind>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeRecord {
    pub name: String,
    /// Import path of the declaring package
    pub package: String,
    /// False for types pulled in only because a requested symbol refers to them
    pub requested: bool,
    pub kind: ShapeKind,
}

impl ShapeRecord {
    pub fn is_type(&self) -> bool {
        !matches!(
            self.kind,
            ShapeKind::Function { .. } | ShapeKind::Value { .. }
        )
    }
}

/// Foreign packages a stub refers to, keyed by import path
///
/// Each path maps to a unique local name. Names collide when two paths share
/// a default name; later paths get a numeric suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSet {
    names: BTreeMap<String, String>,
}

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path`, preferring `hint` as its local name
    pub fn insert(&mut self, path: &str, hint: Option<&str>) -> &str {
        if !self.names.contains_key(path) {
            let base = hint
                .map(String::from)
                .unwrap_or_else(|| names::default_package_name(path));
            let local = self.unique_name(&base, &[]);
            self.names.insert(path.to_string(), local);
        }
        &self.names[path]
    }

    /// Rename any local name that clashes with a package-level declaration
    pub fn avoid(&mut self, declared: &[&str]) {
        let paths: Vec<String> = self.names.keys().cloned().collect();
        for path in paths {
            let current = self.names[&path].clone();
            if declared.contains(&current.as_str()) {
                self.names.remove(&path);
                let local = self.unique_name(&current, declared);
                self.names.insert(path, local);
            }
        }
    }

    fn unique_name(&self, base: &str, reserved: &[&str]) -> String {
        let taken = |n: &str| self.names.values().any(|v| v == n) || reserved.contains(&n);
        if !taken(base) {
            return base.to_string();
        }
        (2..)
            .map(|i| format!("{}{}", base, i))
            .find(|n| !taken(n))
            .unwrap_or_else(|| base.to_string())
    }

    pub fn local_name(&self, path: &str) -> Option<&str> {
        self.names.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.names.contains_key(path)
    }

    /// Import paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// (path, local name) pairs in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Everything extracted for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Import path of the stubbed package
    pub package: String,
    /// Package clause name
    pub package_name: String,
    /// Requested records in request order, then auxiliary types by name
    pub records: Vec<ShapeRecord>,
    pub imports: ImportSet,
}
