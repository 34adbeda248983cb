//! Semantic analyzer: two-pass name resolution, nominal-type
//! registration, and strict type checking over a parsed [`Program`].
//!
//! Pass 1 ([`Analyzer::register_declarations`]) walks every top-level
//! `func`/`struct`/`class` and records its signature in a [`GlobalRegistry`],
//! duplicate names failing outright. Pass 2 ([`Analyzer::analyze`]) walks
//! every statement in source order, threading a [`bread_core::ScopeStack`]
//! for variable types and a [`FnContext`] for the enclosing function's
//! return type / `self` / `super` — and writes the inferred
//! [`TypeDescriptor`] onto every `Expr` node's `tag`.
//!
//! Laid out like `seqc::typechecker` (single-pass-per-word, "first error in
//! this word short-circuits just that word" error recovery, a stack-effect
//! `Env` threaded through statement checking) but the actual judgement
//! rules are BreadLang's own nominal/structural algebra - a concatenative
//! word-based language has no classes, structs, or optionals to check
//! against.

use crate::ast::{
    AssignTarget, ClassDecl, Expr, FunctionDecl, Literal, Param, Program, SourceLocation, Stmt,
    StructDecl, VarKind,
};
use bread_core::error::{BreadError, ErrorCategory};
use bread_core::scope::ScopeStack;
use bread_core::types::{self, ClassDescriptor, StructDescriptor, TypeDescriptor, TypeRegistry};
use bread_core::value::Value;
use std::collections::HashMap;

/// A registered function or method signature (spec Pass 1: "record its
/// name, parameter names/types, default expressions, return type").
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub params: Vec<Param>,
    pub return_type: Option<TypeDescriptor>,
}

impl FunctionSignature {
    fn from_decl(decl: &FunctionDecl) -> Self {
        FunctionSignature { params: decl.params.clone(), return_type: decl.return_type.clone() }
    }

    fn required_param_count(&self) -> usize {
        self.params.iter().take_while(|p| p.default.is_none()).count()
    }
}

/// A registered class: its descriptor plus its `init` and method
/// signatures, keyed by name so method resolution can walk the parent
/// chain the same way `bread_runtime::ops::resolve_method_owner` does at
/// runtime.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub descriptor: ClassDescriptor,
    pub init: FunctionSignature,
    pub methods: HashMap<String, FunctionSignature>,
}

/// Global declaration table built by Pass 1 and consulted throughout Pass 2.
#[derive(Debug, Default)]
pub struct GlobalRegistry {
    pub functions: HashMap<String, FunctionSignature>,
    pub structs: HashMap<String, StructDescriptor>,
    pub classes: HashMap<String, ClassInfo>,
}

impl TypeRegistry for GlobalRegistry {
    fn lookup_class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name).map(|c| &c.descriptor)
    }
}

impl GlobalRegistry {
    /// `parse()`-produced bare identifiers are optimistically tagged
    /// `Struct(name, [])`; rewrite to the registered `Class`/`Struct`
    /// descriptor once Pass 1 has resolved what `name` actually is (spec
    /// `parse`, "rewrite the descriptor from `Struct(name)` to
    /// `Class(name, …)`"). Recurses through `Array`/`Dict`/`Optional`
    /// wrappers so e.g. `[Animal]?` resolves too.
    pub fn resolve_nominal(&self, desc: &TypeDescriptor) -> TypeDescriptor {
        match desc {
            TypeDescriptor::Struct(s) if s.fields.is_empty() => {
                if let Some(class) = self.classes.get(&s.name) {
                    TypeDescriptor::Class(class.descriptor.clone())
                } else if let Some(st) = self.structs.get(&s.name) {
                    TypeDescriptor::Struct(st.clone())
                } else {
                    desc.clone()
                }
            }
            TypeDescriptor::Array(el) => TypeDescriptor::create_array(self.resolve_nominal(el)),
            TypeDescriptor::Dict(k, v) => TypeDescriptor::create_dict(self.resolve_nominal(k), self.resolve_nominal(v)),
            TypeDescriptor::Optional(inner) => TypeDescriptor::create_optional(self.resolve_nominal(inner)),
            other => other.clone(),
        }
    }

    /// Resolves which ancestor of `class_name` declares `method_name`,
    /// `init` included (so `super.init(...)` resolves through the same
    /// path as an ordinary method call).
    fn resolve_method(&self, class_name: &str, method_name: &str) -> Option<(&str, &FunctionSignature)> {
        let mut current = Some(class_name);
        let mut visited = std::collections::HashSet::new();
        while let Some(name) = current {
            if !visited.insert(name) {
                return None;
            }
            let class = self.classes.get(name)?;
            if method_name == "init" {
                return Some((name, &class.init));
            }
            if let Some(sig) = class.methods.get(method_name) {
                return Some((name, sig));
            }
            current = class.descriptor.parent_name.as_deref();
        }
        None
    }
}

/// Per-function analysis state: the declared return type (for return-path
/// checking), and — inside a class method — the `self`/`super` types (spec
/// grammar: `self`, `super`).
#[derive(Debug, Clone, Default)]
struct FnContext {
    return_type: Option<TypeDescriptor>,
    self_type: Option<TypeDescriptor>,
    super_parent: Option<String>,
}

/// Two-pass semantic analyzer.
pub struct Analyzer {
    pub registry: GlobalRegistry,
}

impl Analyzer {
    pub fn new() -> Self {
        Analyzer { registry: GlobalRegistry::default() }
    }

    /// Runs both passes over `program`, annotating every expression's
    /// `tag` in place. Returns every diagnostic encountered; a single error
    /// fails the whole pass (any non-empty return is a failure) even though
    /// analysis continues past the offending *statement* to the next one,
    /// so callers get more than one diagnostic per run where possible.
    pub fn analyze(&mut self, program: &mut Program) -> Result<(), Vec<BreadError>> {
        let mut errors = Vec::new();
        if let Err(e) = self.register_declarations(program) {
            errors.push(e);
            return Err(errors);
        }

        let mut scopes = ScopeStack::new();
        let ctx = FnContext::default();
        for stmt in &mut program.statements {
            if let Err(e) = self.analyze_stmt(stmt, &mut scopes, &ctx) {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    // ---- Pass 1: declaration registration -------------------------------

    fn register_declarations(&mut self, program: &Program) -> Result<(), BreadError> {
        for stmt in &program.statements {
            match stmt {
                Stmt::FuncDecl(f) => self.register_function(f)?,
                Stmt::StructDecl(s) => self.register_struct(s)?,
                Stmt::ClassDecl(c) => self.register_class(c)?,
                _ => {}
            }
        }
        // Second sweep: rewrite struct/class field types now that every
        // nominal name in the program is known (spec `parse` defers
        // Struct-vs-Class disambiguation to the analyzer).
        let resolved_structs: HashMap<String, StructDescriptor> = self
            .registry
            .structs
            .iter()
            .map(|(name, s)| {
                let fields = s.fields.iter().map(|(n, t)| (n.clone(), self.registry.resolve_nominal(t))).collect();
                (name.clone(), StructDescriptor { name: s.name.clone(), fields })
            })
            .collect();
        self.registry.structs = resolved_structs;

        let resolved_classes: HashMap<String, ClassInfo> = self
            .registry
            .classes
            .iter()
            .map(|(name, c)| {
                let fields =
                    c.descriptor.fields.iter().map(|(n, t)| (n.clone(), self.registry.resolve_nominal(t))).collect();
                let descriptor = ClassDescriptor { name: c.descriptor.name.clone(), parent_name: c.descriptor.parent_name.clone(), fields };
                (name.clone(), ClassInfo { descriptor, init: c.init.clone(), methods: c.methods.clone() })
            })
            .collect();
        self.registry.classes = resolved_classes;
        Ok(())
    }

    fn register_function(&mut self, f: &FunctionDecl) -> Result<(), BreadError> {
        if self.registry.functions.contains_key(&f.name) {
            return Err(duplicate_name_error(&f.loc, "function", &f.name));
        }
        self.registry.functions.insert(f.name.clone(), FunctionSignature::from_decl(f));
        Ok(())
    }

    fn register_struct(&mut self, s: &StructDecl) -> Result<(), BreadError> {
        if self.registry.structs.contains_key(&s.name) || self.registry.classes.contains_key(&s.name) {
            return Err(duplicate_name_error(&s.loc, "type", &s.name));
        }
        self.registry
            .structs
            .insert(s.name.clone(), StructDescriptor { name: s.name.clone(), fields: s.fields.clone() });
        Ok(())
    }

    fn register_class(&mut self, c: &ClassDecl) -> Result<(), BreadError> {
        if self.registry.classes.contains_key(&c.name) || self.registry.structs.contains_key(&c.name) {
            return Err(duplicate_name_error(&c.loc, "type", &c.name));
        }
        // Spec invariant 5: "A class may not have two methods with the
        // same name" — the parser already rejects duplicate `def`s within
        // one class body, so this is a second, registry-wide guard for
        // clarity at the analyzer boundary.
        let mut methods = HashMap::new();
        for m in &c.methods {
            if methods.contains_key(&m.name) {
                return Err(duplicate_name_error(&m.loc, "method", &m.name));
            }
            methods.insert(m.name.clone(), FunctionSignature::from_decl(m));
        }
        let descriptor = ClassDescriptor {
            name: c.name.clone(),
            parent_name: c.parent_name.clone(),
            fields: c.fields.clone(),
        };
        self.registry.classes.insert(
            c.name.clone(),
            ClassInfo { descriptor, init: FunctionSignature::from_decl(&c.init), methods },
        );
        Ok(())
    }

    // ---- Pass 2: statement analysis -------------------------------------

    fn analyze_stmt(&self, stmt: &mut Stmt, scopes: &mut ScopeStack, ctx: &FnContext) -> Result<(), BreadError> {
        match stmt {
            Stmt::Import { .. } | Stmt::Export { .. } => Ok(()),
            Stmt::VarDecl { kind, name, declared_type, init, loc } => {
                self.analyze_var_decl(*kind, name, declared_type, init, loc, scopes, ctx)
            }
            Stmt::Assign { target, compound_op, value, loc } => {
                self.analyze_assign(target, *compound_op, value, loc, scopes, ctx)
            }
            Stmt::Print { expr, .. } | Stmt::ExprStmt { expr, .. } => {
                self.infer_expr(expr, scopes, ctx).map(|_| ())
            }
            Stmt::If { cond, then_branch, else_branch, loc } => {
                let cond_ty = self.infer_expr(cond, scopes, ctx)?;
                if !TypeDescriptor::equals(&cond_ty, &TypeDescriptor::Bool) {
                    return Err(type_error(loc, format!("if condition must be Bool, found {cond_ty}")));
                }
                self.analyze_block(then_branch, scopes, ctx)?;
                if let Some(else_branch) = else_branch {
                    self.analyze_block(else_branch, scopes, ctx)?;
                }
                Ok(())
            }
            Stmt::While { cond, body, loc } => {
                let cond_ty = self.infer_expr(cond, scopes, ctx)?;
                if !TypeDescriptor::equals(&cond_ty, &TypeDescriptor::Bool) {
                    return Err(type_error(loc, format!("while condition must be Bool, found {cond_ty}")));
                }
                self.analyze_block(body, scopes, ctx)
            }
            Stmt::For { var_name, iter, body, loc } => {
                let iter_ty = self.infer_expr(iter, scopes, ctx)?;
                let element_ty = match &iter_ty {
                    TypeDescriptor::Array(el) => (**el).clone(),
                    TypeDescriptor::Dict(k, _) => (**k).clone(),
                    other => return Err(type_error(loc, format!("for-in requires an Array or Dict, found {other}"))),
                };
                scopes.push_scope();
                let result = (|| {
                    scopes.declare(var_name.clone(), element_ty, Value::Nil, false)?;
                    self.analyze_block(body, scopes, ctx)
                })();
                scopes.pop_scope().expect("for-loop scope was just pushed");
                result
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => Ok(()),
            Stmt::Return { value, loc } => {
                let actual = match value {
                    Some(e) => Some(self.infer_expr(e, scopes, ctx)?),
                    None => None,
                };
                self.check_return_compatible(actual.as_ref(), ctx, loc)
            }
            Stmt::FuncDecl(f) => self.analyze_function_body(f, None, None),
            Stmt::StructDecl(_) => Ok(()),
            Stmt::ClassDecl(c) => self.analyze_class_body(c),
        }
    }

    fn analyze_block(&self, stmts: &mut [Stmt], scopes: &mut ScopeStack, ctx: &FnContext) -> Result<(), BreadError> {
        scopes.push_scope();
        let result = (|| {
            for stmt in stmts {
                self.analyze_stmt(stmt, scopes, ctx)?;
            }
            Ok(())
        })();
        scopes.pop_scope().expect("block scope was just pushed");
        result
    }

    fn check_return_compatible(
        &self,
        actual: Option<&TypeDescriptor>,
        ctx: &FnContext,
        loc: &SourceLocation,
    ) -> Result<(), BreadError> {
        let declared = ctx.return_type.clone().unwrap_or(TypeDescriptor::Nil);
        match actual {
            Some(ty) if types::compatible(ty, &declared, &self.registry) => Ok(()),
            Some(ty) => Err(type_error(loc, format!("return type {ty} is not compatible with declared return type {declared}"))),
            None if matches!(declared, TypeDescriptor::Nil) || matches!(declared, TypeDescriptor::Optional(_)) => Ok(()),
            None => Err(type_error(loc, format!("function must return a value of type {declared}"))),
        }
    }

    fn analyze_var_decl(
        &self,
        kind: VarKind,
        name: &str,
        declared_type: &mut Option<TypeDescriptor>,
        init: &mut Expr,
        loc: &SourceLocation,
        scopes: &mut ScopeStack,
        ctx: &FnContext,
    ) -> Result<(), BreadError> {
        let declared = declared_type
            .as_ref()
            .ok_or_else(|| type_error(loc, format!("variable '{name}' requires an explicit type annotation")))?;
        let resolved = self.registry.resolve_nominal(declared);
        let init_ty = self.infer_expr(init, scopes, ctx)?;
        if !types::compatible(&init_ty, &resolved, &self.registry) {
            return Err(type_error(
                loc,
                format!("cannot initialize '{name}: {resolved}' with a value of type {init_ty}"),
            ));
        }
        *declared_type = Some(resolved.clone());
        scopes.declare(name, resolved, Value::Nil, kind == VarKind::Const)
    }

    fn analyze_assign(
        &self,
        target: &mut AssignTarget,
        compound_op: Option<char>,
        value: &mut Expr,
        loc: &SourceLocation,
        scopes: &mut ScopeStack,
        ctx: &FnContext,
    ) -> Result<(), BreadError> {
        let target_ty = match target {
            AssignTarget::Var(name) => {
                let var = scopes
                    .get_variable(name)
                    .ok_or_else(|| BreadError::new(ErrorCategory::UndefinedVariable, format!("undefined variable '{name}'")).at(loc.file.as_ref().clone(), loc.line, loc.column))?;
                if var.is_const {
                    return Err(type_error(loc, format!("cannot assign to const variable '{name}'")));
                }
                var.type_descriptor.clone()
            }
            AssignTarget::Index { target, index } => {
                let target_ty = self.infer_expr(target, scopes, ctx)?;
                let index_ty = self.infer_expr(index, scopes, ctx)?;
                self.index_result_type(&target_ty, &index_ty, loc)?
            }
            AssignTarget::Member { target, name } => {
                let target_ty = self.infer_expr(target, scopes, ctx)?;
                self.member_result_type(&target_ty, name, false, loc)?
            }
        };
        let value_ty = self.infer_expr(value, scopes, ctx)?;
        let required = match compound_op {
            None => value_ty.clone(),
            Some(tag) => self.binary_arith_result(tag, &target_ty, &value_ty, loc)?,
        };
        if !types::compatible(&required, &target_ty, &self.registry) {
            return Err(type_error(loc, format!("cannot assign {required} to target of type {target_ty}")));
        }
        Ok(())
    }

    fn analyze_function_body(
        &self,
        f: &mut FunctionDecl,
        self_type: Option<TypeDescriptor>,
        super_parent: Option<String>,
    ) -> Result<(), BreadError> {
        let mut scopes = ScopeStack::new();
        for param in &f.params {
            let resolved = self.registry.resolve_nominal(&param.type_annotation);
            scopes
                .declare(param.name.clone(), resolved, Value::Nil, false)
                .map_err(|_| duplicate_name_error(&f.loc, "parameter", &param.name))?;
        }
        let ctx = FnContext { return_type: f.return_type.clone().map(|t| self.registry.resolve_nominal(&t)), self_type, super_parent };

        for stmt in &mut f.body {
            self.analyze_stmt(stmt, &mut scopes, &ctx)?;
        }

        if let Some(return_type) = &ctx.return_type {
            let admits_implicit_nil = matches!(return_type, TypeDescriptor::Nil | TypeDescriptor::Optional(_));
            if !admits_implicit_nil && !block_covers(&f.body) {
                return Err(BreadError::new(
                    ErrorCategory::CompileError,
                    format!("Function must return a value '{}'", f.name),
                )
                .at((*f.loc.file).clone(), f.loc.line, f.loc.column));
            }
        }
        Ok(())
    }

    fn analyze_class_body(&self, c: &mut ClassDecl) -> Result<(), BreadError> {
        let self_type = TypeDescriptor::Class(
            self.registry.classes.get(&c.name).map(|info| info.descriptor.clone()).unwrap_or_else(|| ClassDescriptor {
                name: c.name.clone(),
                parent_name: c.parent_name.clone(),
                fields: c.fields.clone(),
            }),
        );
        self.analyze_function_body(&mut c.init, Some(self_type.clone()), c.parent_name.clone())?;
        for method in &mut c.methods {
            self.analyze_function_body(method, Some(self_type.clone()), c.parent_name.clone())?;
        }
        Ok(())
    }

    // ---- Expression inference --------

    fn infer_expr(&self, expr: &mut Expr, scopes: &ScopeStack, ctx: &FnContext) -> Result<TypeDescriptor, BreadError> {
        let desc = self.infer_expr_inner(expr, scopes, ctx)?;
        expr.set_tag(desc.clone());
        Ok(desc)
    }

    fn infer_expr_inner(&self, expr: &mut Expr, scopes: &ScopeStack, ctx: &FnContext) -> Result<TypeDescriptor, BreadError> {
        match expr {
            Expr::Literal { value, .. } => Ok(literal_type(value)),
            Expr::Var { name, loc, .. } => scopes
                .get_variable(name)
                .map(|v| v.type_descriptor.clone())
                .ok_or_else(|| undefined_variable_error(loc, name)),
            Expr::SelfExpr { loc, .. } => ctx
                .self_type
                .clone()
                .ok_or_else(|| type_error(loc, "'self' used outside of a method".to_string())),
            Expr::SuperExpr { loc, .. } => {
                let parent = ctx
                    .super_parent
                    .as_ref()
                    .ok_or_else(|| type_error(loc, "'super' used outside of a subclass method".to_string()))?;
                let descriptor = self
                    .registry
                    .classes
                    .get(parent)
                    .map(|c| c.descriptor.clone())
                    .ok_or_else(|| type_error(loc, format!("unknown parent class '{parent}'")))?;
                Ok(TypeDescriptor::Class(descriptor))
            }
            Expr::Unary { op, operand, loc, .. } => {
                let operand_ty = self.infer_expr(operand, scopes, ctx)?;
                match op {
                    '!' if TypeDescriptor::equals(&operand_ty, &TypeDescriptor::Bool) => Ok(TypeDescriptor::Bool),
                    '!' => Err(type_error(loc, format!("'!' requires a Bool operand, found {operand_ty}"))),
                    '-' if operand_ty.is_numeric() => Ok(operand_ty),
                    '-' => Err(type_error(loc, format!("unary '-' requires an Int or Double operand, found {operand_ty}"))),
                    other => unreachable!("parser only produces unary ops '!' and '-', got '{other}'"),
                }
            }
            Expr::Binary { op, left, right, loc, .. } => {
                let left_ty = self.infer_expr(left, scopes, ctx)?;
                let right_ty = self.infer_expr(right, scopes, ctx)?;
                match op {
                    '+' | '-' | '*' | '/' | '%' => self.binary_arith_result(*op, &left_ty, &right_ty, loc),
                    '<' | '>' | 'l' | 'g' | '=' | '!' => Ok(TypeDescriptor::Bool),
                    other => unreachable!("parser only produces these binary op tags, got '{other}'"),
                }
            }
            Expr::Logical { op, left, right, loc, .. } => {
                let left_ty = self.infer_expr(left, scopes, ctx)?;
                let right_ty = self.infer_expr(right, scopes, ctx)?;
                if TypeDescriptor::equals(&left_ty, &TypeDescriptor::Bool) && TypeDescriptor::equals(&right_ty, &TypeDescriptor::Bool) {
                    Ok(TypeDescriptor::Bool)
                } else {
                    let symbol = if *op == '&' { "&&" } else { "||" };
                    Err(type_error(loc, format!("'{symbol}' requires Bool operands, found {left_ty} and {right_ty}")))
                }
            }
            Expr::Index { target, index, loc, .. } => {
                let target_ty = self.infer_expr(target, scopes, ctx)?;
                let index_ty = self.infer_expr(index, scopes, ctx)?;
                self.index_result_type(&target_ty, &index_ty, loc)
            }
            Expr::Member { target, name, is_optional_chain, loc, .. } => {
                let target_ty = self.infer_expr(target, scopes, ctx)?;
                self.member_result_type(&target_ty, name, *is_optional_chain, loc)
            }
            Expr::Call { callee, args, loc, .. } => self.infer_call(callee, args, loc, scopes, ctx),
            Expr::MethodCall { target, name, args, is_optional_chain, loc, .. } => {
                self.infer_method_call(target, name, args, *is_optional_chain, loc, scopes, ctx)
            }
            Expr::ArrayLiteral { elements, loc, .. } => self.infer_array_literal(elements, loc, scopes, ctx),
            Expr::DictLiteral { entries, loc, .. } => self.infer_dict_literal(entries, loc, scopes, ctx),
            Expr::StructLiteral { type_name, fields, loc, .. } => self.infer_struct_literal(type_name, fields, loc, scopes, ctx),
        }
    }

    fn binary_arith_result(
        &self,
        op: char,
        left: &TypeDescriptor,
        right: &TypeDescriptor,
        loc: &SourceLocation,
    ) -> Result<TypeDescriptor, BreadError> {
        if op == '+' && TypeDescriptor::equals(left, &TypeDescriptor::String) && TypeDescriptor::equals(right, &TypeDescriptor::String) {
            return Ok(TypeDescriptor::String);
        }
        if !TypeDescriptor::equals(left, right) {
            return Err(type_error(loc, format!("operands of '{op}' must have the same type, found {left} and {right}")));
        }
        if !left.is_numeric() {
            return Err(type_error(loc, format!("'{op}' requires Int or Double operands, found {left}")));
        }
        Ok(left.clone())
    }

    fn index_result_type(&self, target: &TypeDescriptor, index: &TypeDescriptor, loc: &SourceLocation) -> Result<TypeDescriptor, BreadError> {
        match target {
            TypeDescriptor::Array(el) => {
                if !TypeDescriptor::equals(index, &TypeDescriptor::Int) {
                    return Err(type_error(loc, format!("array index must be Int, found {index}")));
                }
                Ok((**el).clone())
            }
            TypeDescriptor::Dict(key, value) => {
                if !TypeDescriptor::equals(index, key) {
                    return Err(type_error(loc, format!("dict index must be {key}, found {index}")));
                }
                Ok((**value).clone())
            }
            TypeDescriptor::String => {
                if !TypeDescriptor::equals(index, &TypeDescriptor::Int) {
                    return Err(type_error(loc, format!("string index must be Int, found {index}")));
                }
                Ok(TypeDescriptor::String)
            }
            other => Err(type_error(loc, format!("cannot index into {other}"))),
        }
    }

    fn member_result_type(
        &self,
        target: &TypeDescriptor,
        name: &str,
        is_optional_chain: bool,
        loc: &SourceLocation,
    ) -> Result<TypeDescriptor, BreadError> {
        if name == "length" && matches!(target, TypeDescriptor::Array(_) | TypeDescriptor::String | TypeDescriptor::Dict(_, _)) {
            return Ok(TypeDescriptor::Int);
        }
        match target {
            TypeDescriptor::Dict(_, value) => Ok((**value).clone()),
            TypeDescriptor::Struct(s) => s
                .fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, t)| t.clone())
                .ok_or_else(|| unknown_field_error(loc, &s.name, name)),
            TypeDescriptor::Class(c) => self
                .lookup_field(c, name)
                .ok_or_else(|| unknown_field_error(loc, &c.name, name)),
            TypeDescriptor::Optional(inner) if is_optional_chain => {
                self.member_result_type(inner, name, is_optional_chain, loc)
            }
            other => Err(type_error(loc, format!("{other} has no members"))),
        }
    }

    /// Looks up `name` up the class's ancestor chain (spec: field/
    /// method resolution "descending parent chain for class").
    fn lookup_field(&self, class: &ClassDescriptor, name: &str) -> Option<TypeDescriptor> {
        if let Some((_, t)) = class.fields.iter().find(|(n, _)| n == name) {
            return Some(t.clone());
        }
        let parent_name = class.parent_name.as_ref()?;
        let parent = self.registry.classes.get(parent_name)?;
        self.lookup_field(&parent.descriptor, name)
    }

    fn infer_call(
        &self,
        callee: &str,
        args: &mut [Expr],
        loc: &SourceLocation,
        scopes: &ScopeStack,
        ctx: &FnContext,
    ) -> Result<TypeDescriptor, BreadError> {
        if callee == "range" {
            if args.len() != 1 {
                return Err(type_error(loc, "range() takes exactly one argument".to_string()));
            }
            let arg_ty = self.infer_expr(&mut args[0], scopes, ctx)?;
            if !TypeDescriptor::equals(&arg_ty, &TypeDescriptor::Int) {
                return Err(type_error(loc, format!("range() requires an Int argument, found {arg_ty}")));
            }
            return Ok(TypeDescriptor::create_array(TypeDescriptor::Int));
        }
        if let Some(sig) = self.registry.functions.get(callee).cloned() {
            self.check_call_args(&sig, args, loc, scopes, ctx)?;
            return Ok(self.registry.resolve_nominal(&sig.return_type.clone().unwrap_or(TypeDescriptor::Nil)));
        }
        if let Some(class) = self.registry.classes.get(callee).cloned() {
            self.check_call_args(&class.init, args, loc, scopes, ctx)?;
            return Ok(TypeDescriptor::Class(class.descriptor));
        }
        Err(BreadError::new(ErrorCategory::CompileError, format!("undefined function '{callee}'"))
            .at((*loc.file).clone(), loc.line, loc.column))
    }

    fn check_call_args(
        &self,
        sig: &FunctionSignature,
        args: &mut [Expr],
        loc: &SourceLocation,
        scopes: &ScopeStack,
        ctx: &FnContext,
    ) -> Result<(), BreadError> {
        let required = sig.required_param_count();
        let max = sig.params.len();
        if args.len() < required || args.len() > max {
            return Err(type_error(
                loc,
                format!("expected between {required} and {max} arguments, found {}", args.len()),
            ));
        }
        for (arg, param) in args.iter_mut().zip(sig.params.iter()) {
            let arg_ty = self.infer_expr(arg, scopes, ctx)?;
            let expected = self.registry.resolve_nominal(&param.type_annotation);
            if !types::compatible(&arg_ty, &expected, &self.registry) {
                return Err(type_error(
                    loc,
                    format!("argument '{}' expects {expected}, found {arg_ty}", param.name),
                ));
            }
        }
        Ok(())
    }

    fn infer_method_call(
        &self,
        target: &mut Expr,
        name: &str,
        args: &mut [Expr],
        is_optional_chain: bool,
        loc: &SourceLocation,
        scopes: &ScopeStack,
        ctx: &FnContext,
    ) -> Result<TypeDescriptor, BreadError> {
        let target_ty = self.infer_expr(target, scopes, ctx)?;
        // Optional-chained calls resolve against the wrapped type, the same
        // way `member_result_type` unwraps `Optional` before looking up a
        // field — method existence and arity still get validated against
        // whatever the receiver is `Optional` of.
        let effective_ty = match &target_ty {
            TypeDescriptor::Optional(inner) if is_optional_chain => (**inner).clone(),
            other => other.clone(),
        };
        match &effective_ty {
            TypeDescriptor::Array(el) if name == "append" => {
                if args.len() != 1 {
                    return Err(type_error(loc, "append() requires exactly one argument".to_string()));
                }
                let arg_ty = self.infer_expr(&mut args[0], scopes, ctx)?;
                if !matches!(**el, TypeDescriptor::Nil) && !types::compatible(&arg_ty, el, &self.registry) {
                    return Err(type_error(loc, format!("cannot append {arg_ty} to an array of {el}")));
                }
                Ok(TypeDescriptor::Nil)
            }
            TypeDescriptor::Dict(key, value) if name == "set" => {
                if args.len() != 2 {
                    return Err(type_error(loc, "set() requires exactly two arguments".to_string()));
                }
                let key_ty = self.infer_expr(&mut args[0], scopes, ctx)?;
                let value_ty = self.infer_expr(&mut args[1], scopes, ctx)?;
                if !matches!(**key, TypeDescriptor::Nil) && !types::compatible(&key_ty, key, &self.registry) {
                    return Err(type_error(loc, format!("dict key type mismatch: expected {key}, found {key_ty}")));
                }
                if !matches!(**value, TypeDescriptor::Nil) && !types::compatible(&value_ty, value, &self.registry) {
                    return Err(type_error(loc, format!("dict value type mismatch: expected {value}, found {value_ty}")));
                }
                Ok(TypeDescriptor::Nil)
            }
            TypeDescriptor::Class(class) => match self.registry.resolve_method(&class.name, name) {
                Some((_, sig)) => {
                    let sig = sig.clone();
                    self.check_call_args(&sig, args, loc, scopes, ctx)?;
                    Ok(self.registry.resolve_nominal(&sig.return_type.clone().unwrap_or(TypeDescriptor::Nil)))
                }
                None if is_optional_chain => Ok(TypeDescriptor::Nil),
                None => Err(type_error(loc, format!("unknown method '{name}' on class '{}'", class.name))),
            },
            // Built-in container method outside the known set (`append`/
            // `set`) is deferred to runtime dispatch (spec "Unknown
            // method names on container targets may be deferred to runtime
            // dispatch").
            TypeDescriptor::Array(_) | TypeDescriptor::Dict(_, _) | TypeDescriptor::String => {
                for arg in args.iter_mut() {
                    self.infer_expr(arg, scopes, ctx)?;
                }
                Ok(TypeDescriptor::Nil)
            }
            TypeDescriptor::Nil if is_optional_chain => {
                // Still type-check the arguments for their own sake even
                // though the call is short-circuited at runtime on a Nil
                // receiver.
                for arg in args.iter_mut() {
                    self.infer_expr(arg, scopes, ctx)?;
                }
                Ok(TypeDescriptor::Nil)
            }
            other => Err(type_error(loc, format!("cannot call method '{name}' on {other}"))),
        }
    }

    fn infer_array_literal(
        &self,
        elements: &mut [Expr],
        loc: &SourceLocation,
        scopes: &ScopeStack,
        ctx: &FnContext,
    ) -> Result<TypeDescriptor, BreadError> {
        if elements.is_empty() {
            return Ok(TypeDescriptor::create_array(TypeDescriptor::Nil));
        }
        let mut element_types = Vec::with_capacity(elements.len());
        for e in elements.iter_mut() {
            element_types.push(self.infer_expr(e, scopes, ctx)?);
        }
        let unified = self.unify_all(&element_types, loc, "array elements")?;
        Ok(TypeDescriptor::create_array(unified))
    }

    fn infer_dict_literal(
        &self,
        entries: &mut [(Expr, Expr)],
        loc: &SourceLocation,
        scopes: &ScopeStack,
        ctx: &FnContext,
    ) -> Result<TypeDescriptor, BreadError> {
        if entries.is_empty() {
            return Ok(TypeDescriptor::create_dict(TypeDescriptor::Nil, TypeDescriptor::Nil));
        }
        let mut key_types = Vec::with_capacity(entries.len());
        let mut value_types = Vec::with_capacity(entries.len());
        for (k, v) in entries.iter_mut() {
            key_types.push(self.infer_expr(k, scopes, ctx)?);
            value_types.push(self.infer_expr(v, scopes, ctx)?);
        }
        let key_unified = self.unify_all(&key_types, loc, "dict keys")?;
        let value_unified = self.unify_all(&value_types, loc, "dict values")?;
        Ok(TypeDescriptor::create_dict(key_unified, value_unified))
    }

    /// Unifies a non-empty list of descriptors to one common type: either
    /// they are all structurally equal, or they are all `Class` and share a
    /// nearest common ancestor (spec "Array literal": "class elements
    /// unify to their nearest common ancestor if one exists").
    fn unify_all(&self, types: &[TypeDescriptor], loc: &SourceLocation, what: &str) -> Result<TypeDescriptor, BreadError> {
        let mut iter = types.iter();
        let mut acc = iter.next().expect("caller guarantees non-empty").clone();
        for next in iter {
            acc = self.unify_pair(&acc, next, loc, what)?;
        }
        Ok(acc)
    }

    fn unify_pair(&self, a: &TypeDescriptor, b: &TypeDescriptor, loc: &SourceLocation, what: &str) -> Result<TypeDescriptor, BreadError> {
        if TypeDescriptor::equals(a, b) {
            return Ok(a.clone());
        }
        if let (TypeDescriptor::Class(ca), TypeDescriptor::Class(cb)) = (a, b) {
            if let Some(ancestor_name) = types::nearest_common_ancestor(ca, cb, &self.registry) {
                if let Some(ancestor) = self.registry.classes.get(&ancestor_name) {
                    return Ok(TypeDescriptor::Class(ancestor.descriptor.clone()));
                }
            }
        }
        Err(type_error(loc, format!("{what} must share a common type, found {a} and {b}")))
    }

    fn infer_struct_literal(
        &self,
        type_name: &str,
        fields: &mut [crate::ast::FieldInit],
        loc: &SourceLocation,
        scopes: &ScopeStack,
        ctx: &FnContext,
    ) -> Result<TypeDescriptor, BreadError> {
        if let Some(class) = self.registry.classes.get(type_name).cloned() {
            self.check_field_init_args(&class.init, fields, loc, scopes, ctx)?;
            return Ok(TypeDescriptor::Class(class.descriptor));
        }
        if let Some(st) = self.registry.structs.get(type_name).cloned() {
            for field_init in fields.iter_mut() {
                let value_ty = self.infer_expr(&mut field_init.value, scopes, ctx)?;
                let expected = st
                    .fields
                    .iter()
                    .find(|(n, _)| *n == field_init.name)
                    .map(|(_, t)| t.clone())
                    .ok_or_else(|| unknown_field_error(loc, &st.name, &field_init.name))?;
                if !types::compatible(&value_ty, &expected, &self.registry) {
                    return Err(type_error(loc, format!("field '{}' expects {expected}, found {value_ty}", field_init.name)));
                }
            }
            return Ok(TypeDescriptor::Struct(st));
        }
        Err(BreadError::new(ErrorCategory::CompileError, format!("undefined type '{type_name}'"))
            .at((*loc.file).clone(), loc.line, loc.column))
    }

    fn check_field_init_args(
        &self,
        init: &FunctionSignature,
        fields: &mut [crate::ast::FieldInit],
        loc: &SourceLocation,
        scopes: &ScopeStack,
        ctx: &FnContext,
    ) -> Result<(), BreadError> {
        for field_init in fields.iter_mut() {
            let value_ty = self.infer_expr(&mut field_init.value, scopes, ctx)?;
            let expected = init
                .params
                .iter()
                .find(|p| p.name == field_init.name)
                .map(|p| self.registry.resolve_nominal(&p.type_annotation))
                .ok_or_else(|| type_error(loc, format!("'{}' is not a constructor parameter", field_init.name)))?;
            if !types::compatible(&value_ty, &expected, &self.registry) {
                return Err(type_error(loc, format!("field '{}' expects {expected}, found {value_ty}", field_init.name)));
            }
        }
        Ok(())
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Return-path coverage: `return`
/// covers; `if` covers iff both branches cover; everything else does not.
fn block_covers(stmts: &[Stmt]) -> bool {
    stmts.iter().any(stmt_covers)
}

fn stmt_covers(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return { .. } => true,
        Stmt::If { then_branch, else_branch, .. } => {
            let then_covers = block_covers(then_branch);
            let else_covers = else_branch.as_ref().is_some_and(|b| block_covers(b));
            then_covers && else_covers
        }
        _ => false,
    }
}

fn literal_type(lit: &Literal) -> TypeDescriptor {
    match lit {
        Literal::Nil => TypeDescriptor::Nil,
        Literal::Bool(_) => TypeDescriptor::Bool,
        Literal::Int(_) => TypeDescriptor::Int,
        Literal::Float(_) => TypeDescriptor::Float,
        Literal::Double(_) => TypeDescriptor::Double,
        Literal::String(_) => TypeDescriptor::String,
    }
}

fn type_error(loc: &SourceLocation, message: String) -> BreadError {
    BreadError::new(ErrorCategory::TypeMismatch, message).at((*loc.file).clone(), loc.line, loc.column)
}

fn undefined_variable_error(loc: &SourceLocation, name: &str) -> BreadError {
    BreadError::new(ErrorCategory::UndefinedVariable, format!("undefined variable '{name}'"))
        .at((*loc.file).clone(), loc.line, loc.column)
}

fn unknown_field_error(loc: &SourceLocation, type_name: &str, field: &str) -> BreadError {
    BreadError::new(ErrorCategory::CompileError, format!("'{type_name}' has no field named '{field}'"))
        .at((*loc.file).clone(), loc.line, loc.column)
}

fn duplicate_name_error(loc: &SourceLocation, kind: &str, name: &str) -> BreadError {
    BreadError::new(ErrorCategory::CompileError, format!("duplicate {kind} name '{name}'"))
        .at((*loc.file).clone(), loc.line, loc.column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn analyze(src: &str) -> Result<Program, Vec<BreadError>> {
        let mut program = Parser::new(src, "<test>").parse_program().expect("parse failed");
        let mut analyzer = Analyzer::new();
        analyzer.analyze(&mut program)?;
        Ok(program)
    }

    #[test]
    fn array_index_arithmetic_end_to_end() {
        let program = analyze("let xs: [Int] = [1, 2, 3]\nprint(xs[1] + xs[2])\n").expect("should type-check");
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn function_call_type_checks() {
        analyze("def add(a: Int, b: Int) -> Int { return a + b }\nprint(add(2, 3))\n").expect("should type-check");
    }

    #[test]
    fn class_inheritance_and_method_override() {
        let src = r#"
            class Animal {
                name: String
                init(n: String) { self.name = n }
                def speak() -> String { return "..." }
            }
            class Dog extends Animal {
                init(n: String) { super.init(n) }
                def speak() -> String { return "woof" }
            }
            let d: Animal = Dog("Rex")
            print(d.speak())
        "#;
        analyze(src).expect("should type-check");
    }

    #[test]
    fn optional_chained_method_call_resolves_against_the_wrapped_class() {
        let src = r#"
            class Animal {
                name: String
                init(n: String) { self.name = n }
                def speak() -> String { return "..." }
            }
            let a: Animal? = Animal("Rex")
            print(a?.speak())
        "#;
        analyze(src).expect("a known method on the wrapped class should still type-check");
    }

    #[test]
    fn optional_chained_call_with_wrong_arity_is_a_compile_error() {
        let src = r#"
            class Animal {
                name: String
                init(n: String) { self.name = n }
                def speak(loudly: Bool) -> String { return "..." }
            }
            let a: Animal? = Animal("Rex")
            print(a?.speak(1, 2, 3))
        "#;
        let err = analyze(src).unwrap_err();
        assert!(
            err.iter().any(|e| e.message.contains("expected between 1 and 1 arguments")),
            "a known optional-chained method should still validate its own arity, got: {err:?}"
        );
    }

    #[test]
    fn dict_literal_and_index_addition() {
        analyze(r#"let m: [String: Int] = ["a": 1, "b": 2]
print(m["a"] + m["b"])
"#)
        .expect("should type-check");
    }

    #[test]
    fn missing_return_path_is_rejected() {
        let err = analyze("def f(x: Int) -> Int { if x > 0 { return 1 } }\n").unwrap_err();
        assert_eq!(err[0].category, ErrorCategory::CompileError);
        assert!(err[0].message.contains("must return a value"));
    }

    #[test]
    fn if_else_return_path_is_accepted() {
        analyze("def f(x: Int) -> Int { if x > 0 { return 1 } else { return 0 } }\n").expect("should type-check");
    }

    #[test]
    fn no_implicit_numeric_widening_in_arithmetic() {
        let err = analyze("let x: Double = 1 + 2.0\n").unwrap_err();
        assert_eq!(err[0].category, ErrorCategory::TypeMismatch);
    }

    #[test]
    fn undeclared_variable_is_an_error() {
        let err = analyze("print(nope)\n").unwrap_err();
        assert_eq!(err[0].category, ErrorCategory::UndefinedVariable);
    }

    #[test]
    fn const_reassignment_is_rejected() {
        let err = analyze("const x: Int = 1\nx = 2\n").unwrap_err();
        assert_eq!(err[0].category, ErrorCategory::TypeMismatch);
    }

    #[test]
    fn shadow_across_nested_scope_is_allowed() {
        analyze("let x: Int = 1\nif true { let x: String = \"y\"\nprint(x) }\nprint(x)\n").expect("should type-check");
    }

    #[test]
    fn array_literal_unifies_to_nearest_common_ancestor() {
        let src = r#"
            class Animal { name: String init(n: String) { self.name = n } }
            class Dog extends Animal { init(n: String) { super.init(n) } }
            class Cat extends Animal { init(n: String) { super.init(n) } }
            let zoo: [Animal] = [Dog("Rex"), Cat("Tom")]
        "#;
        analyze(src).expect("should type-check");
    }

    #[test]
    fn unknown_field_is_a_compile_error() {
        let src = r#"
            struct Point { x: Int, y: Int }
            let p: Point = Point{x: 1, y: 2}
            print(p.z)
        "#;
        let err = analyze(src).unwrap_err();
        assert_eq!(err[0].category, ErrorCategory::CompileError);
    }

    #[test]
    fn optional_accepts_nil_and_inner_type() {
        analyze("let a: Int? = nil\nlet b: Int? = 1\n").expect("should type-check");
    }

    #[test]
    fn division_by_zero_constant_still_type_checks_as_int() {
        // Division-by-zero is a runtime fault, not a static
        // type error; the analyzer must accept this program.
        analyze("let a: Int = 10\nlet b: Int = 0\nprint(a / b)\n").expect("should type-check");
    }

    #[test]
    fn analysis_continues_past_a_failed_statement() {
        let err = analyze("print(nope)\nprint(also_nope)\n").unwrap_err();
        assert_eq!(err.len(), 2, "both bad statements should be reported, not just the first");
    }
}
