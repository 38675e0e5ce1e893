//! Symbol Shape Extractor
//!
//! Resolves each requested name against a loaded package and produces one
//! [`ShapeRecord`] per symbol, plus the auxiliary types and foreign imports
//! needed to express those shapes.

use crate::golang::index::{Callee, PackageIndex, ValueDecl, ValueInit};
use crate::golang::names;
use crate::golang::{GoParser, PackageLoader};
use crate::models::{
    ArrayLen, BasicKind, Extraction, FieldShape, FuncShape, ImportSet, InterfaceShape,
    MethodRecord, MethodShape, ShapeKind, ShapeRecord, StubError, StubResult, SymbolRequest,
    TypeExpr, TypeParam,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

/// Depth limit for alias chains, constant chains and interface embedding
const MAX_DEPTH: usize = 32;

/// Extracts shapes for one generation run
///
/// Packages loaded while extracting (the target and any package whose
/// interfaces or constants are needed) are cached for the lifetime of the
/// extractor only.
pub struct Extractor<'l> {
    loader: &'l dyn PackageLoader,
    parser: RefCell<Option<GoParser>>,
    packages: RefCell<HashMap<String, Rc<PackageIndex>>>,
}

impl<'l> Extractor<'l> {
    pub fn new(loader: &'l dyn PackageLoader) -> Self {
        Self {
            loader,
            parser: RefCell::new(None),
            packages: RefCell::new(HashMap::new()),
        }
    }

    /// Load and index a package
    pub fn load(&self, import_path: &str) -> StubResult<Rc<PackageIndex>> {
        if let Some(index) = self.packages.borrow().get(import_path) {
            return Ok(Rc::clone(index));
        }

        let loaded = self.loader.load(import_path)?;

        let mut slot = self.parser.borrow_mut();
        if slot.is_none() {
            let parser = GoParser::new()
                .map_err(|e| StubError::resolution(import_path, e.to_string()))?;
            *slot = Some(parser);
        }
        let Some(parser) = slot.as_mut() else {
            return Err(StubError::resolution(import_path, "parser unavailable"));
        };

        let index = Rc::new(PackageIndex::build(&loaded, parser)?);
        let mut packages = self.packages.borrow_mut();
        packages.insert(import_path.to_string(), Rc::clone(&index));
        packages.insert(index.import_path.clone(), Rc::clone(&index));
        Ok(index)
    }

    /// Load the requested package and extract every requested symbol
    pub fn extract(&self, request: &SymbolRequest) -> StubResult<Extraction> {
        let target = self.load(&request.package)?;
        self.extract_from(request, target)
    }

    /// Extract the requested symbols from an already indexed package
    ///
    /// # Errors
    /// * `SymbolNotFound` for the first requested name the package does not declare
    /// * `Render` when a shape uses syntax that cannot be reproduced
    /// * `Resolution` when a package needed to flatten a shape cannot be loaded
    pub fn extract_from(
        &self,
        request: &SymbolRequest,
        target: Rc<PackageIndex>,
    ) -> StubResult<Extraction> {
        if let Some(missing) = request.names().find(|n| !target.contains(n)) {
            return Err(StubError::not_found(&target.import_path, missing));
        }

        let requested: BTreeSet<String> = request
            .names()
            .filter(|n| target.types.contains_key(*n))
            .map(String::from)
            .collect();
        let mut walk = Walk {
            extractor: self,
            target: Rc::clone(&target),
            records: requested.clone(),
            requested,
            pending: BTreeSet::new(),
            embedded: BTreeSet::new(),
            imports: ImportSet::new(),
            current: String::new(),
        };

        let mut records = Vec::new();
        for name in request.names() {
            records.push(walk.record(name, true)?);
        }

        let mut auxiliary: BTreeMap<String, ShapeRecord> = BTreeMap::new();
        while let Some(name) = walk.pending.pop_first() {
            walk.records.insert(name.clone());
            let record = walk.record(&name, false)?;
            auxiliary.insert(name, record);
        }
        records.extend(auxiliary.into_values());

        let declared: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        let mut imports = walk.imports;
        imports.avoid(&declared);

        tracing::debug!(
            package = %target.import_path,
            records = records.len(),
            imports = imports.len(),
            "extracted shapes"
        );

        Ok(Extraction {
            package: target.import_path.clone(),
            package_name: target.name.clone(),
            records,
            imports,
        })
    }
}

/// State of one extraction pass
struct Walk<'e, 'l> {
    extractor: &'e Extractor<'l>,
    target: Rc<PackageIndex>,
    /// Type names that are (or will be) emitted as records
    records: BTreeSet<String>,
    /// Type names the caller asked for
    requested: BTreeSet<String>,
    /// Same-package types referenced but not yet emitted
    pending: BTreeSet<String>,
    /// Same-package types embedded in an emitted struct; their methods are
    /// promoted, so they are emitted with methods
    embedded: BTreeSet<String>,
    imports: ImportSet,
    /// Symbol being extracted, for error context
    current: String,
}

impl Walk<'_, '_> {
    fn render_error(&self, reason: impl Into<String>) -> StubError {
        StubError::render(&self.target.import_path, &self.current, reason)
    }

    /// Package index for a path, reusing the target when it matches
    fn package(&self, path: &str) -> StubResult<Rc<PackageIndex>> {
        if path == self.target.import_path {
            Ok(Rc::clone(&self.target))
        } else {
            self.extractor.load(path)
        }
    }

    fn record(&mut self, name: &str, requested: bool) -> StubResult<ShapeRecord> {
        self.current = name.to_string();
        let target = Rc::clone(&self.target);

        let kind = if let Some(decl) = target.types.get(name) {
            let with_methods = requested || self.embedded.contains(name);
            self.type_shape(name, decl.alias, &decl.type_params, &decl.ty, with_methods)?
        } else if let Some(decl) = target.funcs.get(name) {
            let type_params = self.visit_type_params(&decl.type_params)?;
            let mut signature = decl.signature.clone();
            self.visit_signature(&mut signature)?;
            ShapeKind::Function {
                type_params,
                signature,
            }
        } else if let Some(decl) = target.values.get(name) {
            self.value_shape(decl)?
        } else {
            return Err(StubError::not_found(&target.import_path, name));
        };

        Ok(ShapeRecord {
            name: name.to_string(),
            package: target.import_path.clone(),
            requested,
            kind,
        })
    }

    fn type_shape(
        &mut self,
        name: &str,
        alias: bool,
        type_params: &[TypeParam],
        ty: &TypeExpr,
        with_methods: bool,
    ) -> StubResult<ShapeKind> {
        let type_params = self.visit_type_params(type_params)?;

        if alias {
            let mut underlying = ty.clone();
            self.visit(&mut underlying)?;
            return Ok(ShapeKind::Named {
                type_params,
                underlying,
                alias: true,
                methods: Vec::new(),
            });
        }

        let methods = if with_methods {
            self.methods(name)?
        } else {
            Vec::new()
        };

        match ty {
            TypeExpr::Interface { shape } => {
                let target = Rc::clone(&self.target);
                let mut shape = self.flatten(&target, shape, 0)?;
                self.visit_interface(&mut shape)?;
                Ok(ShapeKind::Interface { type_params, shape })
            }
            TypeExpr::Struct { fields } => {
                let mut exported: Vec<FieldShape> = fields
                    .iter()
                    .filter(|f| names::is_exported(&f.name))
                    .cloned()
                    .collect();
                for field in &mut exported {
                    self.visit(&mut field.ty)?;
                    if field.embedded {
                        self.promote(&field.ty);
                    }
                }
                Ok(ShapeKind::Struct {
                    type_params,
                    fields: exported,
                    methods,
                })
            }
            other => {
                let mut underlying = other.clone();
                self.visit(&mut underlying)?;
                Ok(ShapeKind::Named {
                    type_params,
                    underlying,
                    alias: false,
                    methods,
                })
            }
        }
    }

    fn methods(&mut self, type_name: &str) -> StubResult<Vec<MethodRecord>> {
        let target = Rc::clone(&self.target);
        let mut records = Vec::new();
        for decl in target.exported_methods(type_name) {
            let mut signature = decl.signature.clone();
            self.visit_signature(&mut signature)?;
            records.push(MethodRecord {
                name: decl.name.clone(),
                pointer_receiver: decl.pointer,
                receiver_params: decl.receiver_params.clone(),
                signature,
            });
        }
        Ok(records)
    }

    fn visit_type_params(&mut self, params: &[TypeParam]) -> StubResult<Vec<TypeParam>> {
        let mut out = params.to_vec();
        for param in &mut out {
            self.visit(&mut param.constraint)?;
        }
        Ok(out)
    }

    // ---------------------------------------------------------------------
    // Interface flattening
    // ---------------------------------------------------------------------

    /// Full method set of an interface, with embedded interfaces expanded
    fn flatten(
        &mut self,
        owner: &PackageIndex,
        shape: &InterfaceShape,
        depth: usize,
    ) -> StubResult<InterfaceShape> {
        if depth > MAX_DEPTH {
            return Err(self.render_error("interface embedding is too deep or cyclic"));
        }

        let mut methods: BTreeMap<String, FuncShape> = shape
            .methods
            .iter()
            .filter(|m| names::is_exported(&m.name))
            .map(|m| (m.name.clone(), m.signature.clone()))
            .collect();
        let mut type_sets = shape.type_sets.clone();

        for embedded in &shape.embedded {
            match embedded {
                TypeExpr::Builtin { name } if name == "error" => {
                    methods.insert(
                        "Error".to_string(),
                        FuncShape {
                            params: Vec::new(),
                            variadic: false,
                            results: vec![TypeExpr::builtin("string")],
                        },
                    );
                }
                TypeExpr::Builtin { name } if name == "any" => {}
                TypeExpr::Named {
                    package,
                    name,
                    args,
                } => {
                    let pkg = if *package == owner.import_path {
                        None
                    } else {
                        Some(self.package(package)?)
                    };
                    let source: &PackageIndex = pkg.as_deref().unwrap_or(owner);

                    match self.resolve_interface(source, name, args, 0)? {
                        Some((iface_owner, inner)) => {
                            let iface_pkg = self.package(&iface_owner)?;
                            let nested = self.flatten(&iface_pkg, &inner, depth + 1)?;
                            for method in nested.methods {
                                methods.entry(method.name).or_insert(method.signature);
                            }
                            type_sets.extend(nested.type_sets);
                        }
                        None => type_sets.push(embedded.clone()),
                    }
                }
                other => type_sets.push(other.clone()),
            }
        }

        Ok(InterfaceShape {
            methods: methods
                .into_iter()
                .map(|(name, signature)| MethodShape { name, signature })
                .collect(),
            embedded: Vec::new(),
            type_sets,
        })
    }

    /// Interface body behind a named type, following aliases and
    /// instantiating type parameters. `None` if the type is not an interface.
    fn resolve_interface(
        &mut self,
        pkg: &PackageIndex,
        name: &str,
        args: &[TypeExpr],
        depth: usize,
    ) -> StubResult<Option<(String, InterfaceShape)>> {
        if depth > MAX_DEPTH {
            return Err(self.render_error(format!("alias chain through {} is too deep", name)));
        }
        let decl = pkg
            .types
            .get(name)
            .ok_or_else(|| StubError::not_found(&pkg.import_path, name))?;

        let subst: BTreeMap<String, TypeExpr> = decl
            .type_params
            .iter()
            .map(|p| p.name.clone())
            .zip(args.iter().cloned())
            .collect();

        match decl.ty.substitute(&subst) {
            TypeExpr::Interface { shape } => Ok(Some((pkg.import_path.clone(), shape))),
            TypeExpr::Named {
                package,
                name: next,
                args: next_args,
            } if decl.alias => {
                let next_pkg = self.package(&package)?;
                self.resolve_interface(&next_pkg, &next, &next_args, depth + 1)
            }
            _ => Ok(None),
        }
    }

    // ---------------------------------------------------------------------
    // Values
    // ---------------------------------------------------------------------

    fn value_shape(&mut self, decl: &ValueDecl) -> StubResult<ShapeKind> {
        let target = Rc::clone(&self.target);
        if decl.constant {
            let (ty, basic) = self.const_type(&target, decl, 0)?;
            let mut ty = ty;
            if let Some(t) = ty.as_mut() {
                self.visit(t)?;
            }
            Ok(ShapeKind::Value {
                ty,
                constant: true,
                basic: Some(basic),
            })
        } else {
            let mut ty = self.var_type(&target, decl, 0)?;
            self.visit(&mut ty)?;
            Ok(ShapeKind::Value {
                ty: Some(ty),
                constant: false,
                basic: None,
            })
        }
    }

    /// Declared type (if any) and basic kind of a constant
    fn const_type(
        &mut self,
        pkg: &PackageIndex,
        decl: &ValueDecl,
        depth: usize,
    ) -> StubResult<(Option<TypeExpr>, BasicKind)> {
        if depth > MAX_DEPTH {
            return Err(self.render_error("constant definition chain is too deep"));
        }
        if let Some(ty) = &decl.ty {
            return Ok((Some(ty.clone()), self.basic_kind(ty, 0)?));
        }

        match &decl.init {
            Some(ValueInit::Basic(kind)) => Ok((None, *kind)),
            Some(ValueInit::Ident(other)) => {
                let next = pkg
                    .values
                    .get(other)
                    .filter(|v| v.constant)
                    .ok_or_else(|| self.render_error(format!("cannot resolve constant {}", other)))?;
                self.const_type(pkg, next, depth + 1)
            }
            Some(ValueInit::Foreign { package, name }) => {
                let foreign = self.package(package)?;
                let next = foreign
                    .values
                    .get(name)
                    .filter(|v| v.constant)
                    .ok_or_else(|| StubError::not_found(package, name))?;
                self.const_type(&foreign, next, depth + 1)
            }
            Some(ValueInit::Call { callee, .. }) => {
                let ty = self.conversion_type(pkg, callee)?.ok_or_else(|| {
                    self.render_error(format!("constant {} is not a conversion", decl.name))
                })?;
                let kind = self.basic_kind(&ty, 0)?;
                Ok((Some(ty), kind))
            }
            _ => Err(self.render_error(format!(
                "cannot determine the type of constant {}",
                decl.name
            ))),
        }
    }

    /// Type produced by a conversion call, or `None` if the callee is a function
    fn conversion_type(&mut self, pkg: &PackageIndex, callee: &Callee) -> StubResult<Option<TypeExpr>> {
        Ok(match callee {
            Callee::Conversion(ty) => Some(ty.clone()),
            Callee::Local(name) if pkg.types.contains_key(name) => {
                Some(TypeExpr::named(&pkg.import_path, name))
            }
            Callee::Qualified { package, name } => {
                let foreign = self.package(package)?;
                foreign
                    .types
                    .contains_key(name)
                    .then(|| TypeExpr::named(package, name))
            }
            Callee::Local(_) => None,
        })
    }

    /// Basic kind of a constant's type, following named types to their underlying type
    fn basic_kind(&mut self, ty: &TypeExpr, depth: usize) -> StubResult<BasicKind> {
        if depth > MAX_DEPTH {
            return Err(self.render_error("named type chain is too deep"));
        }
        match ty {
            TypeExpr::Builtin { name } => BasicKind::of_builtin(name)
                .ok_or_else(|| self.render_error(format!("{} is not a constant type", name))),
            TypeExpr::Named { package, name, .. } => {
                let owner = self.package(package)?;
                let decl = owner
                    .types
                    .get(name)
                    .ok_or_else(|| StubError::not_found(package, name))?;
                let underlying = decl.ty.clone();
                self.basic_kind(&underlying, depth + 1)
            }
            _ => Err(self.render_error("constant has a non-basic type")),
        }
    }

    /// Declared or inferred type of a package-level variable
    fn var_type(&mut self, pkg: &PackageIndex, decl: &ValueDecl, depth: usize) -> StubResult<TypeExpr> {
        if depth > MAX_DEPTH {
            return Err(self.render_error("variable definition chain is too deep"));
        }
        if let Some(ty) = &decl.ty {
            return Ok(ty.clone());
        }

        let cannot_infer = |walk: &Self, what: &str| {
            walk.render_error(format!("cannot infer the type of {} from `{}`", decl.name, what))
        };

        match &decl.init {
            Some(ValueInit::Basic(kind)) => Ok(TypeExpr::builtin(kind.default_type())),
            Some(ValueInit::Composite(ty)) => Ok(ty.clone()),
            Some(ValueInit::AddressOf(ty)) => Ok(TypeExpr::pointer(ty.clone())),
            Some(ValueInit::Ident(other)) => {
                let next = pkg
                    .values
                    .get(other)
                    .ok_or_else(|| cannot_infer(self, other))?;
                if next.constant {
                    let (ty, kind) = self.const_type(pkg, next, depth + 1)?;
                    Ok(ty.unwrap_or_else(|| TypeExpr::builtin(kind.default_type())))
                } else {
                    self.var_type(pkg, next, depth + 1)
                }
            }
            Some(ValueInit::Foreign { package, name }) => {
                let foreign = self.package(package)?;
                let next = foreign
                    .values
                    .get(name)
                    .ok_or_else(|| StubError::not_found(package, name))?;
                if next.constant {
                    let (ty, kind) = self.const_type(&foreign, next, depth + 1)?;
                    Ok(ty.unwrap_or_else(|| TypeExpr::builtin(kind.default_type())))
                } else {
                    self.var_type(&foreign, next, depth + 1)
                }
            }
            Some(ValueInit::Call { callee, index }) => self.call_result(pkg, decl, callee, *index),
            Some(ValueInit::Unknown(text)) => Err(cannot_infer(self, text)),
            None => Err(cannot_infer(self, "no initializer")),
        }
    }

    fn call_result(
        &mut self,
        pkg: &PackageIndex,
        decl: &ValueDecl,
        callee: &Callee,
        index: usize,
    ) -> StubResult<TypeExpr> {
        if let Callee::Qualified { package, name } = callee {
            if (package == "errors" && name == "New") || (package == "fmt" && name == "Errorf") {
                return Ok(TypeExpr::builtin("error"));
            }
        }
        if let Some(ty) = self.conversion_type(pkg, callee)? {
            return Ok(ty);
        }

        let func = match callee {
            Callee::Local(name) => pkg.funcs.get(name).cloned(),
            Callee::Qualified { package, name } => {
                let foreign = self.package(package)?;
                foreign.funcs.get(name).cloned()
            }
            Callee::Conversion(_) => None,
        };
        let func = func.ok_or_else(|| {
            self.render_error(format!("cannot resolve the initializer of {}", decl.name))
        })?;

        if !func.type_params.is_empty() {
            return Err(self.render_error(format!(
                "cannot infer the type of {} from generic function {}",
                decl.name, func.name
            )));
        }
        func.signature.results.get(index).cloned().ok_or_else(|| {
            self.render_error(format!(
                "{} does not return a value for {}",
                func.name, decl.name
            ))
        })
    }

    // ---------------------------------------------------------------------
    // Reference collection
    // ---------------------------------------------------------------------

    fn visit_signature(&mut self, signature: &mut FuncShape) -> StubResult<()> {
        for ty in signature.params.iter_mut().chain(signature.results.iter_mut()) {
            self.visit(ty)?;
        }
        Ok(())
    }

    fn visit_interface(&mut self, shape: &mut InterfaceShape) -> StubResult<()> {
        for method in &mut shape.methods {
            self.visit_signature(&mut method.signature)?;
        }
        for ty in shape.embedded.iter_mut().chain(shape.type_sets.iter_mut()) {
            self.visit(ty)?;
        }
        Ok(())
    }

    /// Make every type referenced by `ty` resolvable in the stub
    ///
    /// Same-package named types become auxiliary records, foreign ones become
    /// imports, same-package array length constants are inlined.
    fn visit(&mut self, ty: &mut TypeExpr) -> StubResult<()> {
        match ty {
            TypeExpr::Unsupported { reason } => Err(self.render_error(reason.clone())),
            TypeExpr::Builtin { .. } | TypeExpr::Param { .. } => Ok(()),
            TypeExpr::Named {
                package,
                name,
                args,
            } => {
                for arg in args.iter_mut() {
                    self.visit(arg)?;
                }
                let (package, name) = (package.clone(), name.clone());
                self.reference(&package, &name)
            }
            TypeExpr::Pointer { elem } | TypeExpr::Slice { elem } | TypeExpr::Tilde { elem } => {
                self.visit(elem)
            }
            TypeExpr::Chan { elem, .. } => self.visit(elem),
            TypeExpr::Array { len, elem } => {
                self.resolve_len(len)?;
                self.visit(elem)
            }
            TypeExpr::Map { key, value } => {
                self.visit(key)?;
                self.visit(value)
            }
            TypeExpr::Func { signature } => self.visit_signature(signature),
            TypeExpr::Struct { fields } => {
                for field in fields.iter_mut() {
                    self.visit(&mut field.ty)?;
                    if field.embedded {
                        self.promote(&field.ty);
                    }
                }
                Ok(())
            }
            TypeExpr::Interface { shape } => self.visit_interface(shape),
            TypeExpr::Union { terms } => {
                for term in terms.iter_mut() {
                    self.visit(term)?;
                }
                Ok(())
            }
        }
    }

    fn reference(&mut self, package: &str, name: &str) -> StubResult<()> {
        if package == self.target.import_path {
            if !self.target.types.contains_key(name) {
                return Err(StubError::not_found(package, name));
            }
            if !self.records.contains(name) {
                self.pending.insert(name.to_string());
            }
            return Ok(());
        }

        if !names::is_exported(name) {
            return Err(self.render_error(format!(
                "refers to unexported type {}.{}",
                package, name
            )));
        }
        let hint = self.target.import_names.get(package).map(String::as_str);
        self.imports.insert(package, hint);
        Ok(())
    }

    /// Mark a same-package embedded type so its methods are emitted
    ///
    /// A type already emitted as a plain auxiliary record is queued again.
    fn promote(&mut self, ty: &TypeExpr) {
        let named = match ty {
            TypeExpr::Pointer { elem } => elem.as_ref(),
            other => other,
        };
        let TypeExpr::Named { package, name, .. } = named else {
            return;
        };
        if *package != self.target.import_path || !self.embedded.insert(name.clone()) {
            return;
        }
        if !self.requested.contains(name) {
            self.pending.insert(name.clone());
        }
    }

    fn resolve_len(&mut self, len: &mut ArrayLen) -> StubResult<()> {
        match len {
            ArrayLen::Literal { .. } => Ok(()),
            ArrayLen::Expr { text } => Err(self.render_error(format!(
                "unsupported array length `{}`",
                text
            ))),
            ArrayLen::Const { package, name } if *package == self.target.import_path => {
                let value = self.const_literal(name, 0)?;
                *len = ArrayLen::Literal { value };
                Ok(())
            }
            ArrayLen::Const { package, name } => {
                if !names::is_exported(name) {
                    return Err(self.render_error(format!(
                        "array length refers to unexported constant {}.{}",
                        package, name
                    )));
                }
                let hint = self.target.import_names.get(package.as_str()).map(String::as_str);
                self.imports.insert(package, hint);
                Ok(())
            }
        }
    }

    /// Integer literal behind a same-package constant
    fn const_literal(&self, name: &str, depth: usize) -> StubResult<String> {
        let decl = self
            .target
            .values
            .get(name)
            .filter(|v| v.constant)
            .ok_or_else(|| self.render_error(format!("array length {} is not a constant", name)))?;

        if let Some(literal) = &decl.int_literal {
            return Ok(literal.clone());
        }
        match &decl.init {
            Some(ValueInit::Ident(next)) if depth < MAX_DEPTH => self.const_literal(next, depth + 1),
            _ => Err(self.render_error(format!(
                "array length {} is not an integer literal",
                name
            ))),
        }
    }
}
