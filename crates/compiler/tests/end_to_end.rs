//! Whole-program parse→link→analyze coverage.
//!
//! These drive [`bread_compiler::compile_file`] against real files on disk
//! (via `tempfile`) rather than calling the parser/analyzer directly, so a
//! regression in how the pieces are wired together - not just in one of
//! them - would show up here.

use bread_compiler::CompilerConfig;
use std::fs;

fn compile_source(source: &str) -> Result<bread_compiler::Program, Vec<bread_core::error::BreadError>> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.bread");
    fs::write(&path, source).unwrap();
    bread_compiler::compile_file(&path, &CompilerConfig::default())
}

#[test]
fn array_index_and_arithmetic_type_checks() {
    let source = "let xs: [Int] = [1, 2, 3]\nprint(xs[1] + xs[2])\n";
    compile_source(source).expect("array indexing and arithmetic should type-check");
}

#[test]
fn function_call_type_checks() {
    let source = "def add(a: Int, b: Int) -> Int { return a + b }\nprint(add(2, 3))\n";
    compile_source(source).expect("a well-typed function call should type-check");
}

#[test]
fn class_inheritance_with_polymorphic_dispatch_type_checks() {
    let source = r#"
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
    compile_source(source).expect("a Dog assigned to an Animal-typed variable should type-check");
}

#[test]
fn dict_literal_and_lookup_type_checks() {
    let source = r#"let m: [String: Int] = ["a": 1, "b": 2]
print(m["a"] + m["b"])
"#;
    compile_source(source).expect("dict literal and lookup should type-check");
}

/// Division by zero is only detectable at runtime;
/// at the parse/link/analyze granularity this program is well-typed.
#[test]
fn division_by_zero_type_checks_fine_at_compile_time() {
    let source = "let a: Int = 10\nlet b: Int = 0\nprint(a / b)\n";
    compile_source(source).expect("division is well-typed regardless of the runtime divisor");
}

#[test]
fn missing_return_path_is_a_compile_error() {
    let source = "def f(x: Int) -> Int { if x > 0 { return 1 } }\n";
    let errors = compile_source(source).expect_err("a function with a non-covering return path should be rejected");
    assert!(
        errors.iter().any(|e| e.message.contains("Function must return a value 'f'")),
        "expected a 'Function must return a value' diagnostic, got: {errors:?}"
    );
}

/// The call grammar has no dotted syntax, so only a module's default
/// export is reachable from an importer; it's bound under the bare alias,
/// usable exactly like a locally declared struct type.
#[test]
fn importing_module_binds_default_export_under_its_alias() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("shapes.bread"),
        "struct Point { x: Int, y: Int }\nexport Point\n",
    )
    .unwrap();
    let main_path = dir.path().join("main.bread");
    fs::write(
        &main_path,
        "import \"shapes\" as Pt\nlet p: Pt = Pt{x: 1, y: 2}\nprint(p.x + p.y)\n",
    )
    .unwrap();

    let config = CompilerConfig::default();
    bread_compiler::compile_file(&main_path, &config).expect("imported struct's default export should resolve under its alias");
}
