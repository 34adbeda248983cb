//! LLVM codegen ABI surface.
//!
//! This crate exposes a *documented, stable interface* - not a full codegen
//! backend, which stays out of scope. Every externally-callable operation
//! has a function here with a matching name and a uniform opaque-pointer-
//! to-`Value` calling convention, built on [`crate::ops`] and
//! `bread_core::scope`.
//!
//! Each wrapper is a `#[unsafe(no_mangle)] pub unsafe extern "C" fn` around
//! a safe internal helper, the way `seq-runtime::arithmetic`/`list_ops`
//! export theirs around a raw `Stack` pointer. BreadLang's ABI instead
//! passes opaque `*mut Value` handles directly (all functions here take or
//! return pointers to opaque `Value`s unless noted) since there is no
//! shared stack discipline to thread through - each `Value` is heap-boxed
//! individually.
//!
//! The scope stack is process-wide state, same as the global error slot: a
//! single thread-local [`bread_core::ScopeStack`] instance backs
//! `push_scope`/`pop_scope`/`var_*`.

use crate::ops::{self, BinOp, ClassMethodRegistry};
use bread_core::error::{self, BreadError, ErrorCategory};
use bread_core::scope::ScopeStack;
use bread_core::types::TypeDescriptor;
use bread_core::value::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::ffi::{c_char, c_int, CStr, CString};

thread_local! {
    static SCOPES: RefCell<ScopeStack> = RefCell::new(ScopeStack::new());
    static CLASS_HIERARCHY: RefCell<HashMap<String, ClassMeta>> = RefCell::new(HashMap::new());
    static METHOD_INVOKER: Cell<Option<MethodInvoker>> = const { Cell::new(None) };
}

struct ClassMeta {
    parent: Option<String>,
    methods: HashSet<String>,
}

/// Reads the class hierarchy registered via [`register_class`]. Kept
/// separate from the compiler's own `GlobalRegistry` since this crate
/// doesn't depend on `bread-compiler` — codegen re-declares each class's
/// shape here once at module-init time, mirroring the vtable it already
/// emits.
struct AbiClassRegistry;

impl ClassMethodRegistry for AbiClassRegistry {
    fn declares_method(&self, class_name: &str, method_name: &str) -> bool {
        CLASS_HIERARCHY.with(|h| h.borrow().get(class_name).is_some_and(|m| m.methods.contains(method_name)))
    }

    fn parent_of(&self, class_name: &str) -> Option<String> {
        CLASS_HIERARCHY.with(|h| h.borrow().get(class_name).and_then(|m| m.parent.clone()))
    }
}

/// Codegen-supplied method body invoker: given the resolved owning class,
/// the method name, the receiver, and positional args, writes the method's
/// return value to `out`.
pub type MethodInvoker = unsafe extern "C" fn(
    owner: *const c_char,
    method: *const c_char,
    target: *const Value,
    argc: c_int,
    args: *const *const Value,
    out: *mut Value,
);

/// Registers the single process-wide callback `method_call_op` hands
/// resolved class-method dispatch to.
#[unsafe(no_mangle)]
pub extern "C" fn register_method_invoker(invoker: MethodInvoker) {
    METHOD_INVOKER.with(|m| m.set(Some(invoker)));
}

/// Registers a class's parent name and own (non-inherited) method names, so
/// `method_call_op` can walk the parent chain without linking the
/// compiler's analyzer. Call once per class at module-init time.
///
/// # Safety
/// `name` must be a valid C string; `parent_name` must be a valid C string
/// or null; `methods` must point to `method_count` valid C string pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn register_class(name: *const c_char, parent_name: *const c_char, methods: *const *const c_char, method_count: c_int) {
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    let parent = if parent_name.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(parent_name) }.to_string_lossy().into_owned())
    };
    let mut set = HashSet::new();
    for i in 0..method_count as isize {
        let ptr = unsafe { *methods.offset(i) };
        set.insert(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned());
    }
    CLASS_HIERARCHY.with(|h| {
        h.borrow_mut().insert(name, ClassMeta { parent, methods: set });
    });
}

fn report_fatal(err: BreadError) -> ! {
    eprintln!("{}", err.to_banner());
    std::process::abort();
}

fn fail_or_abort(result: Result<Value, BreadError>) -> Value {
    match result {
        Ok(v) => v,
        Err(err) if err.category.is_fatal() => report_fatal(err),
        Err(err) => {
            error::set_error(err);
            Value::Nil
        }
    }
}

unsafe fn read(ptr: *const Value) -> Value {
    assert!(!ptr.is_null(), "bread_runtime ABI: received a null Value pointer");
    unsafe { (*ptr).clone() }
}

unsafe fn write(out: *mut Value, value: Value) {
    assert!(!out.is_null(), "bread_runtime ABI: received a null out-pointer");
    unsafe {
        *out = value;
    }
}

/// `value_size`: size in bytes of the boxed opaque handle, i.e. a
/// pointer width, since every `Value` the ABI exchanges is heap-boxed.
#[unsafe(no_mangle)]
pub extern "C" fn value_size() -> usize {
    std::mem::size_of::<*mut Value>()
}

macro_rules! value_setter {
    ($name:ident, $arg:ty, $ctor:expr) => {
        /// # Safety
        /// `out` must be a valid, writable `*mut Value`.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(out: *mut Value, v: $arg) {
            let ctor: fn($arg) -> Value = $ctor;
            unsafe { write(out, ctor(v)) }
        }
    };
}

/// # Safety
/// `out` must be a valid, writable `*mut Value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn value_set_nil(out: *mut Value) {
    unsafe { write(out, Value::Nil) }
}

value_setter!(value_set_bool, c_int, |b| Value::Bool(b != 0));
value_setter!(value_set_int, i64, Value::Int);
value_setter!(value_set_double, f64, Value::Double);

/// # Safety
/// `out` must be valid and `s` must be a valid NUL-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn value_set_string(out: *mut Value, s: *const c_char) {
    assert!(!s.is_null(), "value_set_string: received a null C string");
    let s = unsafe { CStr::from_ptr(s) }.to_string_lossy().into_owned();
    unsafe { write(out, Value::new_string(s)) }
}

/// # Safety
/// `out` must be a valid, writable `*mut Value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn value_set_array(out: *mut Value) {
    unsafe { write(out, Value::set_array(Vec::new(), None)) }
}

/// # Safety
/// `out` must be a valid, writable `*mut Value`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn value_set_dict(out: *mut Value) {
    unsafe { write(out, Value::set_dict(None, None)) }
}

/// `value_copy(src, dst)`: retain semantics (`Value::clone`/`retain`).
///
/// # Safety
/// Both pointers must be valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn value_copy(src: *const Value, dst: *mut Value) {
    let v = unsafe { read(src) };
    unsafe { write(dst, v) }
}

/// `value_release(v)`: a documented no-op — release happens when
/// the owning `Rc`/`Value` is dropped.
///
/// # Safety
/// `v` must be a valid pointer (it is not read or freed).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn value_release(_v: *mut Value) {}

/// `print(v)`.
///
/// # Safety
/// `v` must be a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn print(v: *const Value) {
    let v = unsafe { read(v) };
    println!("{}", display_value(&v));
}

fn display_value(v: &Value) -> String {
    match v {
        Value::Nil => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Double(d) => d.to_string(),
        Value::String(s) => s.as_str().to_string(),
        Value::Array(a) => {
            let items: Vec<String> = a.borrow().items.iter().map(display_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Dict(d) => {
            let entries: Vec<String> = d.borrow().table.iter().map(|(k, v)| format!("{}: {}", display_value(&k.to_value()), display_value(v))).collect();
            format!("[{}]", entries.join(", "))
        }
        Value::Optional(Some(inner)) => display_value(inner),
        Value::Optional(None) => "nil".to_string(),
        Value::Struct(obj) => {
            let obj = obj.borrow();
            format!("{}{{...}}", obj.type_name)
        }
        Value::Class(obj) => {
            let obj = obj.borrow();
            format!("{}{{...}}", obj.type_name)
        }
    }
}

/// `is_truthy(v) -> i32`.
///
/// # Safety
/// `v` must be a valid pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn is_truthy(v: *const Value) -> c_int {
    let v = unsafe { read(v) };
    v.is_truthy() as c_int
}

/// # Safety
/// `in_` and `out` must be valid pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn unary_not(in_: *const Value, out: *mut Value) {
    let v = unsafe { read(in_) };
    let result = fail_or_abort(ops::unary_not(&v));
    unsafe { write(out, result) }
}

/// `binary_op(op: i8, l, r, out)`. `op` is the parser's
/// single-character comparison/logical tag.
///
/// # Safety
/// `l`, `r`, and `out` must be valid pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn binary_op(op: c_char, l: *const Value, r: *const Value, out: *mut Value) {
    let Some(op) = BinOp::from_tag(op as u8 as char) else {
        report_fatal(BreadError::new(ErrorCategory::RuntimeError, format!("unknown binary op tag '{}'", op as u8 as char)));
    };
    let a = unsafe { read(l) };
    let b = unsafe { read(r) };
    let result = fail_or_abort(ops::binary_op(op, &a, &b));
    unsafe { write(out, result) }
}

/// # Safety
/// `t`, `i`, and `out` must be valid pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn index_op(t: *const Value, i: *const Value, out: *mut Value) {
    let target = unsafe { read(t) };
    let idx = unsafe { read(i) };
    let result = fail_or_abort(ops::index_op(&target, &idx));
    unsafe { write(out, result) }
}

/// # Safety
/// `t`, `i`, and `v` must be valid pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn index_set_op(t: *const Value, i: *const Value, v: *const Value) {
    let target = unsafe { read(t) };
    let idx = unsafe { read(i) };
    let value = unsafe { read(v) };
    if let Err(err) = ops::index_set_op(&target, &idx, value) {
        if err.category.is_fatal() {
            report_fatal(err);
        }
        error::set_error(err);
    }
}

/// # Safety
/// `t`, `name`, and `out` must be valid pointers/C strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn member_op(t: *const Value, name: *const c_char, is_opt: c_int, out: *mut Value) {
    let target = unsafe { read(t) };
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy();
    let result = fail_or_abort(ops::member_op(&target, &name, is_opt != 0));
    unsafe { write(out, result) }
}

/// `dict_set_value(d, k, v)`.
///
/// # Safety
/// `d`, `k`, and `v` must be valid pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dict_set_value(d: *const Value, k: *const Value, v: *const Value) {
    let Value::Dict(dict) = (unsafe { read(d) }) else {
        report_fatal(BreadError::new(ErrorCategory::TypeMismatch, "dict_set_value: target is not a Dict"));
    };
    let key = unsafe { read(k) };
    let value = unsafe { read(v) };
    if let Err(err) = ops::dict_set(&dict, &key, value) {
        if err.category.is_fatal() {
            report_fatal(err);
        }
        error::set_error(err);
    }
}

/// `array_append_value(a, v)`.
///
/// # Safety
/// `a` and `v` must be valid pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn array_append_value(a: *const Value, v: *const Value) {
    let Value::Array(arr) = (unsafe { read(a) }) else {
        report_fatal(BreadError::new(ErrorCategory::TypeMismatch, "array_append_value: target is not an Array"));
    };
    let value = unsafe { read(v) };
    if let Err(err) = ops::array_append(&arr, value) {
        if err.category.is_fatal() {
            report_fatal(err);
        }
        error::set_error(err);
    }
}

/// `method_call_op(t, name, argc, args, is_opt, out)`. `append`/`set` on
/// arrays/dicts are handled directly; class method calls resolve an owner
/// via the [`register_class`] hierarchy and dispatch to the callback
/// installed with [`register_method_invoker`].
///
/// # Safety
/// `t`, `name`, `out` must be valid; `args` must point to `argc` valid
/// `*const Value` pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn method_call_op(t: *const Value, name: *const c_char, argc: c_int, args: *const *const Value, is_opt: c_int, out: *mut Value) {
    let target = unsafe { read(t) };
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    let call_args: Vec<Value> = (0..argc as isize).map(|i| unsafe { read(*args.offset(i)) }).collect();
    let registry = AbiClassRegistry;
    let result = ops::method_call_op(&target, &name, &call_args, is_opt != 0, &registry, &mut |owner, method, receiver, invoke_args| {
        let Some(invoker) = METHOD_INVOKER.with(|m| m.get()) else {
            return Err(BreadError::new(ErrorCategory::RuntimeError, format!("no method invoker registered for {owner}.{method}")));
        };
        let owner_c = CString::new(owner).expect("class name has no interior NUL");
        let method_c = CString::new(method).expect("method name has no interior NUL");
        let arg_ptrs: Vec<*const Value> = invoke_args.iter().map(|v| v as *const Value).collect();
        let mut result = Value::Nil;
        unsafe {
            invoker(owner_c.as_ptr(), method_c.as_ptr(), receiver as *const Value, arg_ptrs.len() as c_int, arg_ptrs.as_ptr(), &mut result as *mut Value);
        }
        Ok(result)
    });
    let value = fail_or_abort(result);
    unsafe { write(out, value) }
}

fn parse_type_tag(type_name: &str) -> TypeDescriptor {
    TypeDescriptor::parse(type_name).unwrap_or(TypeDescriptor::Nil)
}

/// `var_decl(name, type, is_const, init)`.
///
/// # Safety
/// `name`, `type_name`, and `init` must be valid pointers/C strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn var_decl(name: *const c_char, type_name: *const c_char, is_const: c_int, init: *const Value) {
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    let type_name = unsafe { CStr::from_ptr(type_name) }.to_string_lossy();
    let desc = parse_type_tag(&type_name);
    let value = unsafe { read(init) };
    SCOPES.with(|s| {
        if let Err(err) = s.borrow_mut().declare(name, desc, value, is_const != 0) {
            error::set_error(err);
        }
    });
}

/// `var_decl_if_missing(...)`: declares only if `name` is not
/// already bound in the current scope — used by the module linker when
/// splicing a re-imported default export binding.
///
/// # Safety
/// `name`, `type_name`, and `init` must be valid pointers/C strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn var_decl_if_missing(name: *const c_char, type_name: *const c_char, is_const: c_int, init: *const Value) {
    let name_str = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
    let already_present = SCOPES.with(|s| s.borrow().get_variable(&name_str).is_some());
    if !already_present {
        unsafe { var_decl(name, type_name, is_const, init) }
    }
}

/// `var_assign(name, v)`.
///
/// # Safety
/// `name` and `v` must be valid pointers/C strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn var_assign(name: *const c_char, v: *const Value) {
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy();
    let value = unsafe { read(v) };
    SCOPES.with(|s| {
        if let Err(err) = s.borrow_mut().assign(&name, value) {
            if err.category.is_fatal() {
                report_fatal(err);
            }
            error::set_error(err);
        }
    });
}

/// `var_load(name, out)`.
///
/// # Safety
/// `name` and `out` must be valid pointers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn var_load(name: *const c_char, out: *mut Value) {
    let name = unsafe { CStr::from_ptr(name) }.to_string_lossy();
    let value = SCOPES.with(|s| s.borrow().get_variable(&name).map(|v| v.value.clone()));
    match value {
        Some(v) => unsafe { write(out, v) },
        None => {
            let err = BreadError::new(ErrorCategory::UndefinedVariable, format!("undefined variable '{name}'"));
            report_fatal(err);
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn push_scope() {
    SCOPES.with(|s| s.borrow_mut().push_scope());
}

#[unsafe(no_mangle)]
pub extern "C" fn pop_scope() {
    SCOPES.with(|s| {
        if let Err(err) = s.borrow_mut().pop_scope() {
            report_fatal(err);
        }
    });
}

#[unsafe(no_mangle)]
pub extern "C" fn can_pop_scope() -> c_int {
    SCOPES.with(|s| (s.borrow().depth() > 1) as c_int)
}

#[unsafe(no_mangle)]
pub extern "C" fn scope_depth() -> c_int {
    SCOPES.with(|s| s.borrow().depth() as c_int)
}

#[unsafe(no_mangle)]
pub extern "C" fn pop_to_scope_depth(depth: c_int) {
    SCOPES.with(|s| {
        if let Err(err) = s.borrow_mut().pop_to_depth(depth.max(1) as usize) {
            report_fatal(err);
        }
    });
}

/// Resets the process-wide scope stack to a single global frame. Not part of
/// the symbol list; exposed for test isolation and for embedders running
/// multiple independent sessions in one process.
pub fn reset_scopes_for_new_session() {
    SCOPES.with(|s| *s.borrow_mut() = ScopeStack::new());
}

#[unsafe(no_mangle)]
pub extern "C" fn box_int(n: i64) -> *mut Value {
    Box::into_raw(Box::new(Value::Int(n)))
}

#[unsafe(no_mangle)]
pub extern "C" fn box_double(d: f64) -> *mut Value {
    Box::into_raw(Box::new(Value::Double(d)))
}

#[unsafe(no_mangle)]
pub extern "C" fn box_bool(b: c_int) -> *mut Value {
    Box::into_raw(Box::new(Value::Bool(b != 0)))
}

/// # Safety
/// `v` must point to a live `Value::Int`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn unbox_int(v: *const Value) -> i64 {
    match unsafe { read(v) } {
        Value::Int(n) => n,
        other => report_fatal(BreadError::new(ErrorCategory::TypeMismatch, format!("unbox_int: not an Int ({other:?})"))),
    }
}

/// # Safety
/// `v` must point to a live `Value::Double`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn unbox_double(v: *const Value) -> f64 {
    match unsafe { read(v) } {
        Value::Double(d) => d,
        other => report_fatal(BreadError::new(ErrorCategory::TypeMismatch, format!("unbox_double: not a Double ({other:?})"))),
    }
}

/// # Safety
/// `v` must point to a live `Value::Bool`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn unbox_bool(v: *const Value) -> c_int {
    match unsafe { read(v) } {
        Value::Bool(b) => b as c_int,
        other => report_fatal(BreadError::new(ErrorCategory::TypeMismatch, format!("unbox_bool: not a Bool ({other:?})"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_decl_load_assign_roundtrip() {
        reset_scopes_for_new_session();
        let name = CString::new("x").unwrap();
        let ty = CString::new("Int").unwrap();
        let init = Box::into_raw(Box::new(Value::Int(1)));
        unsafe {
            var_decl(name.as_ptr(), ty.as_ptr(), 0, init);
            let mut out = Value::Nil;
            var_load(name.as_ptr(), &mut out as *mut Value);
            assert_eq!(out, Value::Int(1));

            let new_val = Box::into_raw(Box::new(Value::Int(2)));
            var_assign(name.as_ptr(), new_val);
            var_load(name.as_ptr(), &mut out as *mut Value);
            assert_eq!(out, Value::Int(2));

            drop(Box::from_raw(init));
            drop(Box::from_raw(new_val));
        }
    }

    #[test]
    fn scope_push_pop_depth_tracks_correctly() {
        reset_scopes_for_new_session();
        assert_eq!(scope_depth(), 1);
        push_scope();
        push_scope();
        assert_eq!(scope_depth(), 3);
        assert_eq!(can_pop_scope(), 1);
        pop_to_scope_depth(1);
        assert_eq!(scope_depth(), 1);
        assert_eq!(can_pop_scope(), 0);
    }

    #[test]
    fn is_truthy_matches_value_semantics() {
        let v = Value::Bool(true);
        assert_eq!(unsafe { is_truthy(&v as *const Value) }, 1);
        let v = Value::Nil;
        assert_eq!(unsafe { is_truthy(&v as *const Value) }, 0);
    }

    #[test]
    fn binary_op_tag_dispatches_correctly() {
        let a = Value::Int(2);
        let b = Value::Int(3);
        let mut out = Value::Nil;
        unsafe { binary_op(b'+' as c_char, &a, &b, &mut out as *mut Value) };
        assert_eq!(out, Value::Int(5));
    }

    #[test]
    fn box_unbox_roundtrip() {
        let p = box_int(42);
        assert_eq!(unsafe { unbox_int(p) }, 42);
        unsafe {
            drop(Box::from_raw(p));
        }
    }

    unsafe extern "C" fn echoing_invoker(owner: *const c_char, method: *const c_char, _target: *const Value, _argc: c_int, _args: *const *const Value, out: *mut Value) {
        let owner = unsafe { CStr::from_ptr(owner) }.to_string_lossy();
        let method = unsafe { CStr::from_ptr(method) }.to_string_lossy();
        unsafe { write(out, Value::new_string(format!("{owner}.{method}"))) }
    }

    /// Mirrors spec scenario 3 (Dog/Animal): a class hierarchy registered
    /// through `register_class` resolves `speak` to the instance's own
    /// class, falling back to the parent when not overridden there.
    #[test]
    fn method_call_op_resolves_through_registered_hierarchy() {
        CLASS_HIERARCHY.with(|h| h.borrow_mut().clear());
        register_method_invoker(echoing_invoker);

        let animal = CString::new("Animal").unwrap();
        let dog = CString::new("Dog").unwrap();
        let speak = CString::new("speak").unwrap();
        let speak_ptrs = [speak.as_ptr()];
        unsafe {
            register_class(animal.as_ptr(), std::ptr::null(), speak_ptrs.as_ptr(), 1);
            register_class(dog.as_ptr(), animal.as_ptr(), std::ptr::null(), 0);
        }

        let name = CString::new("speak").unwrap();
        let instance = Value::set_class("Dog", Some("Animal".to_string()), vec![], vec![]);
        let mut out = Value::Nil;
        unsafe {
            method_call_op(&instance as *const Value, name.as_ptr(), 0, std::ptr::null(), 0, &mut out as *mut Value);
        }
        assert_eq!(out, Value::new_string("Animal.speak"), "Dog has no own speak, so dispatch falls back to Animal");
    }

    #[test]
    fn method_call_op_appends_to_array_without_an_invoker() {
        let arr = Value::set_array(vec![], None);
        let name = CString::new("append").unwrap();
        let one = Value::Int(1);
        let arg_ptrs = [&one as *const Value];
        let mut out = Value::Nil;
        unsafe {
            method_call_op(&arr as *const Value, name.as_ptr(), 1, arg_ptrs.as_ptr(), 0, &mut out as *mut Value);
        }
        match &arr {
            Value::Array(a) => assert_eq!(a.borrow().items, vec![Value::Int(1)]),
            _ => panic!("expected array"),
        }
    }
}
