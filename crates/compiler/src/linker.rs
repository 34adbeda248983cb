//! Module linker: resolves `import "path" [as alias]` statements.
//!
//! Parses the target file and splices its top-level declarations in place
//! of the `import` statement — there is no separate linking stage at the
//! value/runtime level, only at the AST level, before semantic analysis
//! ever runs.
//!
//! A canonicalized `included_files` set stops re-processing (an
//! already-included path splices as empty), search paths are tried in
//! order until one candidate exists, and an `is_loading` flag catches
//! circular imports. `export NAME` marks the module's single importable
//! binding, bound under the importer's alias. Declarations other than the
//! default export are spliced under a *qualified* name
//! (`"<qualifier>.<name>"`) that only this linker ever produces or
//! consults — it exists so two modules that both declare `helper` don't
//! collide when merged into one flat `Program`, not as user-facing syntax
//! (the call grammar has no dotted-call syntax to reach it).

use crate::ast::{AssignTarget, ClassDecl, Expr, FieldInit, FunctionDecl, Param, Program, SourceLocation, Stmt, StructDecl};
use crate::config::CompilerConfig;
use bread_core::error::{BreadError, ErrorCategory};
use bread_core::types::TypeDescriptor;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// One fully-resolved module: its (already-qualified-for-nested-imports)
/// statement list, plus the set of names it declared directly so an
/// importer of *this* module knows what to re-qualify under its own alias.
#[derive(Debug, Clone)]
struct ModuleContents {
    statements: Vec<Stmt>,
    /// Names this module itself declared at top level (not names pulled in
    /// transitively from its own imports, which are already qualified).
    local_names: Vec<String>,
    /// The name `export NAME` designated, if any (spec "default
    /// export"). An importer binds this name bare, under its chosen alias.
    default_export: Option<String>,
}

/// Links `entry_path` and everything it imports (transitively) into a
/// single flat [`Program`].
pub fn link(entry_path: &Path, config: &CompilerConfig) -> Result<Program, BreadError> {
    let mut loading = HashSet::new();
    let mut cache: HashMap<PathBuf, ModuleContents> = HashMap::new();
    let contents = load_module(entry_path, config, &mut loading, &mut cache)?;
    Ok(Program { statements: contents.statements })
}

fn load_module(
    path: &Path,
    config: &CompilerConfig,
    loading: &mut HashSet<PathBuf>,
    cache: &mut HashMap<PathBuf, ModuleContents>,
) -> Result<ModuleContents, BreadError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| BreadError::new(ErrorCategory::CompileError, format!("cannot read module '{}': {e}", path.display())))?;

    if let Some(cached) = cache.get(&canonical) {
        tracing::debug!(module = %canonical.display(), "module cache hit");
        return Ok(cached.clone());
    }
    if loading.contains(&canonical) {
        tracing::error!(module = %canonical.display(), "circular dependency detected");
        return Err(BreadError::new(
            ErrorCategory::CompileError,
            format!("Circular dependency detected for module '{}'", canonical.display()),
        ));
    }
    loading.insert(canonical.clone());
    tracing::debug!(module = %canonical.display(), "loading module");

    let source = std::fs::read_to_string(&canonical)
        .map_err(|e| BreadError::new(ErrorCategory::CompileError, format!("cannot read module '{}': {e}", canonical.display())))?;
    let program = crate::parser::Parser::new(&source, canonical.clone())
        .parse_program()
        .map_err(|e| e.with_context(format!("while linking module '{}'", canonical.display())))?;

    let dir = canonical.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    let mut flat = Vec::new();
    let mut local_names = Vec::new();
    let mut default_export = None;

    for stmt in program.statements {
        match stmt {
            Stmt::Import { path: raw, alias, loc } => {
                let resolved_path = resolve_import_path(&raw, &dir, config, &loc)?;
                let nested = load_module(&resolved_path, config, loading, cache)?;
                let qualifier = alias.unwrap_or_else(|| module_stem(&resolved_path));
                flat.extend(requalify(nested, &qualifier));
            }
            Stmt::Export { name, loc } => {
                default_export = Some(name);
                let _ = loc;
            }
            Stmt::FuncDecl(f) => {
                local_names.push(f.name.clone());
                flat.push(Stmt::FuncDecl(f));
            }
            Stmt::StructDecl(s) => {
                local_names.push(s.name.clone());
                flat.push(Stmt::StructDecl(s));
            }
            Stmt::ClassDecl(c) => {
                local_names.push(c.name.clone());
                flat.push(Stmt::ClassDecl(c));
            }
            other => flat.push(other),
        }
    }

    if let Some(name) = &default_export {
        if !local_names.contains(name) {
            loading.remove(&canonical);
            return Err(BreadError::new(
                ErrorCategory::CompileError,
                format!("module '{}' exports undefined name '{name}'", canonical.display()),
            ));
        }
    }

    loading.remove(&canonical);
    let contents = ModuleContents { statements: flat, local_names, default_export };
    cache.insert(canonical, contents.clone());
    Ok(contents)
}

/// spec "module path resolution": absolute path used directly; otherwise
/// tried relative to the importing file's directory, then each configured
/// search path in declaration order. A bare module name gets a `.bread`
/// extension appended if it doesn't already have one.
fn resolve_import_path(raw: &str, importing_dir: &Path, config: &CompilerConfig, loc: &SourceLocation) -> Result<PathBuf, BreadError> {
    let with_ext = |base: &Path| -> PathBuf {
        if base.extension().is_some() {
            base.to_path_buf()
        } else {
            base.with_extension("bread")
        }
    };

    let raw_path = Path::new(raw);
    if raw_path.is_absolute() {
        let candidate = with_ext(raw_path);
        return if candidate.is_file() {
            Ok(candidate)
        } else {
            Err(module_not_found_error(raw, &[candidate], loc))
        };
    }

    let mut tried = Vec::new();
    let relative = with_ext(&importing_dir.join(raw_path));
    if relative.is_file() {
        return Ok(relative);
    }
    tried.push(relative);

    for search_dir in config.search_paths() {
        let candidate = with_ext(&search_dir.join(raw_path));
        if candidate.is_file() {
            tracing::debug!(module = raw, search_dir = %search_dir.display(), "resolved import via search path fallthrough");
            return Ok(candidate);
        }
        tried.push(candidate);
    }

    Err(module_not_found_error(raw, &tried, loc))
}

fn module_not_found_error(raw: &str, tried: &[PathBuf], loc: &SourceLocation) -> BreadError {
    let searched = tried.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ");
    BreadError::new(ErrorCategory::CompileError, format!("module '{raw}' not found (searched: {searched})"))
        .at((*loc.file).clone(), loc.line, loc.column)
}

fn module_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Renames `contents`'s own top-level declarations for splicing under the
/// importer's chosen `qualifier`: the designated default export becomes
/// simply `qualifier`; everything else becomes `"qualifier.name"` (spec
/// "qualified symbol table"). Rewrites every reference to a renamed
/// name throughout `contents.statements`, including inside declarations
/// this module itself spliced in from its own (already-qualified) imports,
/// which is safe since those never collide with a bare local name.
fn requalify(contents: ModuleContents, qualifier: &str) -> Vec<Stmt> {
    let mut renames = HashMap::new();
    for name in &contents.local_names {
        let new_name = if contents.default_export.as_deref() == Some(name.as_str()) {
            qualifier.to_string()
        } else {
            format!("{qualifier}.{name}")
        };
        renames.insert(name.clone(), new_name);
    }

    let mut statements = contents.statements;
    for stmt in &mut statements {
        rename_stmt(stmt, &renames);
    }
    statements
}

fn rename_stmt(stmt: &mut Stmt, renames: &HashMap<String, String>) {
    match stmt {
        Stmt::FuncDecl(f) => rename_function(f, renames),
        Stmt::StructDecl(s) => rename_struct(s, renames),
        Stmt::ClassDecl(c) => rename_class(c, renames),
        Stmt::VarDecl { declared_type, init, .. } => {
            if let Some(t) = declared_type {
                rename_type(t, renames);
            }
            rename_expr(init, renames);
        }
        Stmt::Assign { target, value, .. } => {
            rename_assign_target(target, renames);
            rename_expr(value, renames);
        }
        Stmt::Print { expr, .. } | Stmt::ExprStmt { expr, .. } => rename_expr(expr, renames),
        Stmt::If { cond, then_branch, else_branch, .. } => {
            rename_expr(cond, renames);
            for s in then_branch {
                rename_stmt(s, renames);
            }
            if let Some(else_branch) = else_branch {
                for s in else_branch {
                    rename_stmt(s, renames);
                }
            }
        }
        Stmt::While { cond, body, .. } => {
            rename_expr(cond, renames);
            for s in body {
                rename_stmt(s, renames);
            }
        }
        Stmt::For { iter, body, .. } => {
            rename_expr(iter, renames);
            for s in body {
                rename_stmt(s, renames);
            }
        }
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                rename_expr(v, renames);
            }
        }
        Stmt::Import { .. } | Stmt::Export { .. } | Stmt::Break { .. } | Stmt::Continue { .. } => {}
    }
}

fn rename_assign_target(target: &mut AssignTarget, renames: &HashMap<String, String>) {
    match target {
        AssignTarget::Var(_) => {}
        AssignTarget::Index { target, index } => {
            rename_expr(target, renames);
            rename_expr(index, renames);
        }
        AssignTarget::Member { target, .. } => rename_expr(target, renames),
    }
}

fn rename_function(f: &mut FunctionDecl, renames: &HashMap<String, String>) {
    if let Some(new_name) = renames.get(&f.name) {
        f.name = new_name.clone();
    }
    for param in &mut f.params {
        rename_param(param, renames);
    }
    if let Some(rt) = &mut f.return_type {
        rename_type(rt, renames);
    }
    for stmt in &mut f.body {
        rename_stmt(stmt, renames);
    }
}

fn rename_param(param: &mut Param, renames: &HashMap<String, String>) {
    rename_type(&mut param.type_annotation, renames);
    if let Some(default) = &mut param.default {
        rename_expr(default, renames);
    }
}

fn rename_struct(s: &mut StructDecl, renames: &HashMap<String, String>) {
    if let Some(new_name) = renames.get(&s.name) {
        s.name = new_name.clone();
    }
    for (_, ty) in &mut s.fields {
        rename_type(ty, renames);
    }
}

fn rename_class(c: &mut ClassDecl, renames: &HashMap<String, String>) {
    if let Some(new_name) = renames.get(&c.name) {
        c.name = new_name.clone();
    }
    if let Some(parent) = &c.parent_name {
        if let Some(new_parent) = renames.get(parent) {
            c.parent_name = Some(new_parent.clone());
        }
    }
    for (_, ty) in &mut c.fields {
        rename_type(ty, renames);
    }
    rename_function(&mut c.init, renames);
    for method in &mut c.methods {
        rename_function(method, renames);
    }
}

fn rename_field_inits(fields: &mut [FieldInit], renames: &HashMap<String, String>) {
    for field in fields {
        rename_expr(&mut field.value, renames);
    }
}

fn rename_expr(expr: &mut Expr, renames: &HashMap<String, String>) {
    match expr {
        Expr::Literal { .. } | Expr::Var { .. } | Expr::SelfExpr { .. } | Expr::SuperExpr { .. } => {}
        Expr::Unary { operand, .. } => rename_expr(operand, renames),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            rename_expr(left, renames);
            rename_expr(right, renames);
        }
        Expr::Index { target, index, .. } => {
            rename_expr(target, renames);
            rename_expr(index, renames);
        }
        Expr::Member { target, .. } => rename_expr(target, renames),
        Expr::Call { callee, args, .. } => {
            if let Some(new_name) = renames.get(callee) {
                *callee = new_name.clone();
            }
            for arg in args {
                rename_expr(arg, renames);
            }
        }
        Expr::MethodCall { target, args, .. } => {
            rename_expr(target, renames);
            for arg in args {
                rename_expr(arg, renames);
            }
        }
        Expr::ArrayLiteral { elements, .. } => {
            for e in elements {
                rename_expr(e, renames);
            }
        }
        Expr::DictLiteral { entries, .. } => {
            for (k, v) in entries {
                rename_expr(k, renames);
                rename_expr(v, renames);
            }
        }
        Expr::StructLiteral { type_name, fields, .. } => {
            if let Some(new_name) = renames.get(type_name) {
                *type_name = new_name.clone();
            }
            rename_field_inits(fields, renames);
        }
    }
}

fn rename_type(desc: &mut TypeDescriptor, renames: &HashMap<String, String>) {
    match desc {
        TypeDescriptor::Struct(s) if s.fields.is_empty() => {
            if let Some(new_name) = renames.get(&s.name) {
                s.name = new_name.clone();
            }
        }
        TypeDescriptor::Array(el) => rename_type(el, renames),
        TypeDescriptor::Dict(k, v) => {
            rename_type(k, renames);
            rename_type(v, renames);
        }
        TypeDescriptor::Optional(inner) => rename_type(inner, renames),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn splices_unaliased_module_under_qualified_names() {
        // `mathutil.square(4)` in main.bread is never actually reachable
        // (no dotted-call grammar); it's here only so the importing file
        // parses, not as an example of working BreadLang. This test checks
        // the splice itself, not that the import site would later analyze.
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "mathutil.bread",
            "def square(x: Int) -> Int { return x * x }\n",
        );
        let entry = write(
            dir.path(),
            "main.bread",
            "import \"mathutil\"\nprint(mathutil.square(4))\n",
        );
        let program = link(&entry, &CompilerConfig::new()).expect("link should succeed");
        let names: Vec<String> = program
            .statements
            .iter()
            .filter_map(|s| match s {
                Stmt::FuncDecl(f) => Some(f.name.clone()),
                _ => None,
            })
            .collect();
        assert!(names.contains(&"mathutil.square".to_string()));
    }

    #[test]
    fn default_export_binds_under_bare_alias() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "greeter.bread",
            "def hello(name: String) -> String { return name }\nexport hello\n",
        );
        let entry = write(dir.path(), "main.bread", "import \"greeter\" as greet\nprint(greet(\"hi\"))\n");
        let program = link(&entry, &CompilerConfig::new()).expect("link should succeed");
        let names: Vec<String> = program
            .statements
            .iter()
            .filter_map(|s| match s {
                Stmt::FuncDecl(f) => Some(f.name.clone()),
                _ => None,
            })
            .collect();
        assert!(names.contains(&"greet".to_string()));
    }

    #[test]
    fn circular_imports_are_rejected() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.bread", "import \"b\"\n");
        let b = write(dir.path(), "b.bread", "import \"a\"\n");
        let _ = b;
        let entry = dir.path().join("a.bread");
        let err = link(&entry, &CompilerConfig::new()).unwrap_err();
        assert_eq!(err.category, ErrorCategory::CompileError);
        assert!(err.message.contains("Circular dependency"));
    }

    #[test]
    fn missing_module_reports_search_locations() {
        let dir = tempdir().unwrap();
        let entry = write(dir.path(), "main.bread", "import \"nope\"\n");
        let err = link(&entry, &CompilerConfig::new()).unwrap_err();
        assert_eq!(err.category, ErrorCategory::CompileError);
        assert!(err.message.contains("not found"));
    }

    #[test]
    fn search_path_is_tried_after_importing_directory() {
        let dir = tempdir().unwrap();
        let lib_dir = dir.path().join("lib");
        fs::create_dir_all(&lib_dir).unwrap();
        write(&lib_dir, "shared.bread", "def one() -> Int { return 1 }\n");
        let entry = write(dir.path(), "main.bread", "import \"shared\"\nprint(shared.one())\n");
        let config = CompilerConfig::new().with_search_path(lib_dir);
        link(&entry, &config).expect("link should find module via search path");
    }
}
