//! Operations over tagged `Value`s.
//!
//! Binary/unary arithmetic, comparison, logical, indexing, member access, and
//! method dispatch, all written as ordinary (safe) Rust functions operating
//! on `bread_core::Value`. The extern "C" ABI surface in [`crate::abi`] is a
//! thin opaque-pointer wrapper over these.
//!
//! Laid out the way `seq-runtime::arithmetic`/`list_ops`/`variant_ops` split
//! apart (dedicated module per operation family, a failure sentinel plus an
//! error-slot write rather than an exception) but adapted from stack-pop
//! semantics to direct value arguments, since BreadLang is a tree-walking/
//! ABI-call model rather than a concatenative stack machine.

use bread_core::dict::DictKey;
use bread_core::error::{BreadError, ErrorCategory};
use bread_core::types::TypeDescriptor;
use bread_core::value::Value;

/// The parser's single-character comparison/logical encoding: `<=`→`l`,
/// `>=`→`g`, `==`→`=`, `!=`→`!`. Kept as an enum at this boundary rather than
/// the raw `char` the AST nodes carry, with the char mapping preserved only
/// where ABI compatibility with codegen is required (the `from_tag`/
/// `to_tag` pair below is exactly that seam).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    /// Decodes the parser's AST tag char.
    pub fn from_tag(tag: char) -> Option<BinOp> {
        Some(match tag {
            '+' => BinOp::Add,
            '-' => BinOp::Sub,
            '*' => BinOp::Mul,
            '/' => BinOp::Div,
            '%' => BinOp::Mod,
            '<' => BinOp::Lt,
            '>' => BinOp::Gt,
            'l' => BinOp::Le,
            'g' => BinOp::Ge,
            '=' => BinOp::Eq,
            '!' => BinOp::Ne,
            '&' => BinOp::And,
            '|' => BinOp::Or,
            _ => return None,
        })
    }

    pub fn to_tag(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
            BinOp::Mod => '%',
            BinOp::Lt => '<',
            BinOp::Gt => '>',
            BinOp::Le => 'l',
            BinOp::Ge => 'g',
            BinOp::Eq => '=',
            BinOp::Ne => '!',
            BinOp::And => '&',
            BinOp::Or => '|',
        }
    }
}

fn numeric_value(v: &Value) -> Option<f64> {
    match v {
        Value::Int(n) => Some(*n as f64),
        Value::Float(f) => Some(*f as f64),
        Value::Double(d) => Some(*d),
        _ => None,
    }
}

/// `binary_op(op, a, b, out)`. Arithmetic promotion: equal
/// numeric types stay that type; mismatched-but-numeric pairs promote to
/// `Double`; `String + String` concatenates; anything else is a
/// `TypeMismatch`.
pub fn binary_op(op: BinOp, a: &Value, b: &Value) -> Result<Value, BreadError> {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => arithmetic(op, a, b),
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => Ok(Value::Bool(order_compare(op, a, b))),
        BinOp::Eq => Ok(Value::Bool(values_equal(a, b))),
        BinOp::Ne => Ok(Value::Bool(!values_equal(a, b))),
        BinOp::And | BinOp::Or => logical(op, a, b),
    }
}

fn arithmetic(op: BinOp, a: &Value, b: &Value) -> Result<Value, BreadError> {
    if op == BinOp::Add {
        if let (Value::String(sa), Value::String(sb)) = (a, b) {
            return Ok(Value::new_string(format!("{}{}", sa.as_str(), sb.as_str())));
        }
    }

    match (a, b) {
        (Value::Int(x), Value::Int(y)) => int_arithmetic(op, *x, *y),
        (Value::Double(x), Value::Double(y)) => double_arithmetic(op, *x, *y),
        (Value::Float(x), Value::Float(y)) => {
            double_arithmetic(op, *x as f64, *y as f64).map(|v| match v {
                Value::Double(d) => Value::Float(d as f32),
                other => other,
            })
        }
        _ => match (numeric_value(a), numeric_value(b)) {
            (Some(_), Some(_)) if op == BinOp::Mod => Err(BreadError::new(
                ErrorCategory::TypeMismatch,
                "'%' requires two Int operands",
            )),
            (Some(x), Some(y)) => double_arithmetic(op, x, y),
            _ => Err(BreadError::new(
                ErrorCategory::TypeMismatch,
                format!("cannot apply '{}' to operands of different types", op.to_tag()),
            )),
        },
    }
}

fn int_arithmetic(op: BinOp, x: i64, y: i64) -> Result<Value, BreadError> {
    Ok(match op {
        BinOp::Add => Value::Int(x + y),
        BinOp::Sub => Value::Int(x - y),
        BinOp::Mul => Value::Int(x * y),
        BinOp::Div => {
            if y == 0 {
                return Err(BreadError::new(ErrorCategory::DivisionByZero, "division by zero"));
            }
            Value::Int(x / y)
        }
        BinOp::Mod => {
            if y == 0 {
                return Err(BreadError::new(ErrorCategory::DivisionByZero, "division by zero"));
            }
            Value::Int(x % y)
        }
        _ => unreachable!("arithmetic() only dispatches +,-,*,/,%"),
    })
}

fn double_arithmetic(op: BinOp, x: f64, y: f64) -> Result<Value, BreadError> {
    Ok(match op {
        BinOp::Add => Value::Double(x + y),
        BinOp::Sub => Value::Double(x - y),
        BinOp::Mul => Value::Double(x * y),
        BinOp::Div => {
            if y == 0.0 {
                return Err(BreadError::new(ErrorCategory::DivisionByZero, "division by zero"));
            }
            Value::Double(x / y)
        }
        BinOp::Mod => {
            return Err(BreadError::new(ErrorCategory::TypeMismatch, "'%' is integer-only"));
        }
        _ => unreachable!("arithmetic() only dispatches +,-,*,/,%"),
    })
}

/// Ordering comparisons are only meaningful for numeric and string pairs of
/// the *same* type; everything else is "never ordered" and
/// compares `false` rather than erroring.
fn order_compare(op: BinOp, a: &Value, b: &Value) -> bool {
    use std::cmp::Ordering;
    let ordering = match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.partial_cmp(y),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => x.as_str().partial_cmp(y.as_str()),
        _ => None,
    };
    match (op, ordering) {
        (_, None) => false,
        (BinOp::Lt, Some(o)) => o == Ordering::Less,
        (BinOp::Gt, Some(o)) => o == Ordering::Greater,
        (BinOp::Le, Some(o)) => o != Ordering::Greater,
        (BinOp::Ge, Some(o)) => o != Ordering::Less,
        _ => unreachable!("order_compare only dispatches <,>,l,g"),
    }
}

/// Equality is defined for all types; heterogeneous comparisons
/// are simply unequal rather than an error.
fn values_equal(a: &Value, b: &Value) -> bool {
    a == b
}

fn logical(op: BinOp, a: &Value, b: &Value) -> Result<Value, BreadError> {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(match op {
            BinOp::And => *x && *y,
            BinOp::Or => *x || *y,
            _ => unreachable!("logical() only dispatches &,|"),
        })),
        _ => Err(BreadError::new(ErrorCategory::TypeMismatch, "logical operators require Bool operands")),
    }
}

/// `unary_not(v, out)`: requires `Bool`.
pub fn unary_not(v: &Value) -> Result<Value, BreadError> {
    match v {
        Value::Bool(b) => Ok(Value::Bool(!b)),
        _ => Err(BreadError::new(ErrorCategory::TypeMismatch, "'!' requires a Bool operand")),
    }
}

/// Unary `-`.
pub fn unary_neg(v: &Value) -> Result<Value, BreadError> {
    match v {
        Value::Int(n) => Ok(Value::Int(-n)),
        Value::Double(d) => Ok(Value::Double(-d)),
        Value::Float(f) => Ok(Value::Float(-f)),
        _ => Err(BreadError::new(ErrorCategory::TypeMismatch, "unary '-' requires an Int or Double operand")),
    }
}

fn normalize_index(len: i64, idx: i64) -> Option<i64> {
    let normalized = if idx < 0 { len + idx } else { idx };
    if normalized < 0 || normalized >= len {
        None
    } else {
        Some(normalized)
    }
}

/// `index_op(target, idx, out)`. Negative array/string indices
/// are offsets from the end; out-of-range is a fatal `IndexOutOfBounds`.
/// Dict misses yield `Nil`, not an error.
pub fn index_op(target: &Value, idx: &Value) -> Result<Value, BreadError> {
    match target {
        Value::Array(arr) => {
            let i = expect_int(idx)?;
            let arr = arr.borrow();
            let len = arr.items.len() as i64;
            match normalize_index(len, i) {
                Some(n) => Ok(arr.items[n as usize].clone()),
                None => Err(BreadError::new(ErrorCategory::IndexOutOfBounds, format!("array index {i} out of bounds (length {len})"))),
            }
        }
        Value::String(s) => {
            let i = expect_int(idx)?;
            let chars: Vec<char> = s.as_str().chars().collect();
            let len = chars.len() as i64;
            match normalize_index(len, i) {
                Some(n) => Ok(Value::new_string(chars[n as usize].to_string())),
                None => Err(BreadError::new(ErrorCategory::IndexOutOfBounds, format!("string index {i} out of bounds (length {len})"))),
            }
        }
        Value::Dict(dict) => {
            let key = idx
                .dict_key()
                .ok_or_else(|| BreadError::new(ErrorCategory::TypeMismatch, "dict key must be a hashable primitive or String"))?;
            Ok(dict.borrow().table.get(&key).cloned().unwrap_or(Value::Nil))
        }
        _ => Err(BreadError::new(ErrorCategory::TypeMismatch, "indexing requires an Array, Dict, or String target")),
    }
}

fn expect_int(v: &Value) -> Result<i64, BreadError> {
    match v {
        Value::Int(n) => Ok(*n),
        _ => Err(BreadError::new(ErrorCategory::TypeMismatch, "index must be an Int")),
    }
}

/// `index_set_op(target, idx, v)`: indexed assignment `a[i] = v`.
pub fn index_set_op(target: &Value, idx: &Value, value: Value) -> Result<(), BreadError> {
    match target {
        Value::Array(arr) => {
            let i = expect_int(idx)?;
            let mut arr = arr.borrow_mut();
            let len = arr.items.len() as i64;
            match normalize_index(len, i) {
                Some(n) => {
                    arr.items[n as usize] = value;
                    Ok(())
                }
                None => Err(BreadError::new(ErrorCategory::IndexOutOfBounds, format!("array index {i} out of bounds (length {len})"))),
            }
        }
        Value::Dict(dict) => {
            let key = idx
                .dict_key()
                .ok_or_else(|| BreadError::new(ErrorCategory::TypeMismatch, "dict key must be a hashable primitive or String"))?;
            dict.borrow_mut().table.set(key, value);
            Ok(())
        }
        Value::String(_) => Err(BreadError::new(ErrorCategory::RuntimeError, "strings are immutable")),
        _ => Err(BreadError::new(ErrorCategory::TypeMismatch, "indexed assignment requires an Array or Dict target")),
    }
}

/// `member_op(target, name, is_optional_chain, out)`.
pub fn member_op(target: &Value, name: &str, is_optional_chain: bool) -> Result<Value, BreadError> {
    if is_optional_chain && is_nil_like(target) {
        return Ok(Value::Nil);
    }
    if name == "length" {
        if let Some(n) = target.length() {
            return Ok(Value::Int(n));
        }
    }
    match target {
        Value::Dict(dict) => {
            let key = DictKey::String(name.to_string());
            Ok(dict.borrow().table.get(&key).cloned().unwrap_or(Value::Nil))
        }
        Value::Struct(obj) => match obj.borrow().fields.get(name).cloned() {
            Some(v) => Ok(v),
            None if is_optional_chain => Ok(Value::Nil),
            None => Err(undefined_field_error(name)),
        },
        Value::Class(obj) => match obj.borrow().fields.get(name).cloned() {
            Some(v) => Ok(v),
            None if is_optional_chain => Ok(Value::Nil),
            None => Err(undefined_field_error(name)),
        },
        Value::Optional(Some(inner)) => member_op(inner, name, is_optional_chain),
        _ if is_optional_chain => Ok(Value::Nil),
        _ => Err(BreadError::new(ErrorCategory::RuntimeError, format!("'{name}' is not a member of this value"))),
    }
}

fn undefined_field_error(name: &str) -> BreadError {
    BreadError::new(ErrorCategory::RuntimeError, format!("no field named '{name}'"))
}

fn is_nil_like(v: &Value) -> bool {
    matches!(v, Value::Nil) || matches!(v, Value::Optional(None))
}

/// Resolves which class in `class_name`'s ancestor chain actually declares
/// `method_name` (spec "Class methods dispatch via the class registry
/// by name, walking the parent chain"). The registry only needs to answer
/// "does this class declare the method" and "what is this class's parent" —
/// the actual method body lives with whichever lowering target (LLVM
/// codegen or the bytecode compiler, both out of scope here) owns the
/// callable.
pub trait ClassMethodRegistry {
    fn declares_method(&self, class_name: &str, method_name: &str) -> bool;
    fn parent_of(&self, class_name: &str) -> Option<String>;
}

pub fn resolve_method_owner(
    registry: &dyn ClassMethodRegistry,
    class_name: &str,
    method_name: &str,
) -> Option<String> {
    let mut current = Some(class_name.to_string());
    let mut visited = std::collections::HashSet::new();
    while let Some(name) = current {
        if !visited.insert(name.clone()) {
            return None; // cyclic parent chain; registration should prevent this
        }
        if registry.declares_method(&name, method_name) {
            return Some(name);
        }
        current = registry.parent_of(&name);
    }
    None
}

/// `method_call_op(target, name, args, is_optional_chain, out)`.
/// Built-in container methods (`append`, `set`) are handled directly; class
/// method calls resolve an owner via [`ClassMethodRegistry`] and are handed
/// to `invoke`, which actually runs the method body (a lowering-target
/// responsibility,).
pub fn method_call_op(
    target: &Value,
    name: &str,
    args: &[Value],
    is_optional_chain: bool,
    registry: &dyn ClassMethodRegistry,
    invoke: &mut dyn FnMut(&str, &str, &Value, &[Value]) -> Result<Value, BreadError>,
) -> Result<Value, BreadError> {
    if is_optional_chain && is_nil_like(target) {
        return Ok(Value::Nil);
    }
    match (target, name) {
        (Value::Array(arr), "append") => {
            let value = args.first().cloned().ok_or_else(|| {
                BreadError::new(ErrorCategory::RuntimeError, "append() requires one argument")
            })?;
            array_append(arr, value)?;
            Ok(Value::Nil)
        }
        (Value::Dict(dict), "set") => {
            let key_value = args.first().ok_or_else(|| {
                BreadError::new(ErrorCategory::RuntimeError, "set() requires a key and a value")
            })?;
            let value = args.get(1).cloned().ok_or_else(|| {
                BreadError::new(ErrorCategory::RuntimeError, "set() requires a key and a value")
            })?;
            dict_set(dict, key_value, value)?;
            Ok(Value::Nil)
        }
        (Value::Class(obj), _) => {
            let class_name = obj.borrow().type_name.clone();
            match resolve_method_owner(registry, &class_name, name) {
                Some(owner) => invoke(&owner, name, target, args),
                None => Err(BreadError::new(ErrorCategory::RuntimeError, format!("no method '{name}' on class '{class_name}'"))),
            }
        }
        _ if is_optional_chain => Ok(Value::Nil),
        _ => Err(BreadError::new(ErrorCategory::RuntimeError, format!("unknown method '{name}'"))),
    }
}

/// `array_append_value` (spec ABI / "Array `append(v)` mutates the
/// array, type-checks against element tag"). The first append on an
/// untyped (`Nil`-tagged) array fixes its element type.
pub fn array_append(arr: &std::cell::RefCell<bread_core::value::ArrayObj>, value: Value) -> Result<(), BreadError> {
    let mut arr = arr.borrow_mut();
    let value_type = value_type_tag(&value);
    match &arr.element_type {
        None => arr.element_type = Some(value_type),
        Some(existing) if TypeDescriptor::equals(existing, &value_type) => {}
        Some(existing) => {
            return Err(BreadError::new(
                ErrorCategory::TypeMismatch,
                format!("cannot append a {value_type} to an array of {existing}"),
            ))
        }
    }
    arr.items.push(value);
    Ok(())
}

/// `array_remove_at` (spec testable property: append then remove at
/// `length-1` restores `length` and yields the removed value).
pub fn array_remove_at(arr: &std::cell::RefCell<bread_core::value::ArrayObj>, index: i64) -> Result<Value, BreadError> {
    let mut arr = arr.borrow_mut();
    let len = arr.items.len() as i64;
    match normalize_index(len, index) {
        Some(n) => Ok(arr.items.remove(n as usize)),
        None => Err(BreadError::new(ErrorCategory::IndexOutOfBounds, format!("array index {index} out of bounds (length {len})"))),
    }
}

/// `dict_set_value`.
pub fn dict_set(dict: &std::cell::RefCell<bread_core::value::DictObj>, key_value: &Value, value: Value) -> Result<(), BreadError> {
    let key = key_value
        .dict_key()
        .ok_or_else(|| BreadError::new(ErrorCategory::TypeMismatch, "dict key must be a hashable primitive or String"))?;
    let mut dict = dict.borrow_mut();
    let key_type = value_type_tag(key_value);
    match &dict.key_type {
        None => dict.key_type = Some(key_type),
        Some(existing) if TypeDescriptor::equals(existing, &key_type) => {}
        Some(existing) => return Err(BreadError::new(ErrorCategory::TypeMismatch, format!("dict key type mismatch: expected {existing}, got {key_type}"))),
    }
    let value_type = value_type_tag(&value);
    match &dict.value_type {
        None => dict.value_type = Some(value_type),
        Some(existing) if TypeDescriptor::equals(existing, &value_type) => {}
        Some(existing) => return Err(BreadError::new(ErrorCategory::TypeMismatch, format!("dict value type mismatch: expected {existing}, got {value_type}"))),
    }
    dict.table.set(key, value);
    Ok(())
}

fn value_type_tag(v: &Value) -> TypeDescriptor {
    match v {
        Value::Nil => TypeDescriptor::Nil,
        Value::Bool(_) => TypeDescriptor::Bool,
        Value::Int(_) => TypeDescriptor::Int,
        Value::Float(_) => TypeDescriptor::Float,
        Value::Double(_) => TypeDescriptor::Double,
        Value::String(_) => TypeDescriptor::String,
        Value::Array(a) => TypeDescriptor::create_array(a.borrow().element_type.clone().unwrap_or(TypeDescriptor::Nil)),
        Value::Dict(d) => {
            let d = d.borrow();
            TypeDescriptor::create_dict(d.key_type.clone().unwrap_or(TypeDescriptor::Nil), d.value_type.clone().unwrap_or(TypeDescriptor::Nil))
        }
        Value::Optional(inner) => TypeDescriptor::create_optional(inner.as_ref().map(|v| value_type_tag(v)).unwrap_or(TypeDescriptor::Nil)),
        Value::Struct(obj) => TypeDescriptor::create_struct(obj.borrow().type_name.clone(), Vec::new()),
        Value::Class(obj) => TypeDescriptor::create_class(obj.borrow().type_name.clone(), obj.borrow().parent_name.clone(), Vec::new()),
    }
}

/// `range(n)` builtin.
pub fn range_builtin(n: i64) -> Value {
    let items: Vec<Value> = (0..n).map(Value::Int).collect();
    Value::set_array(items, Some(TypeDescriptor::Int))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_division_by_zero_is_fatal() {
        let err = binary_op(BinOp::Div, &Value::Int(10), &Value::Int(0)).unwrap_err();
        assert_eq!(err.category, ErrorCategory::DivisionByZero);
        assert!(err.category.is_fatal());
    }

    #[test]
    fn double_division_by_exact_zero_is_fatal() {
        let err = binary_op(BinOp::Div, &Value::Double(1.0), &Value::Double(0.0)).unwrap_err();
        assert_eq!(err.category, ErrorCategory::DivisionByZero);
    }

    #[test]
    fn modulo_on_doubles_is_type_mismatch() {
        let err = binary_op(BinOp::Mod, &Value::Double(1.0), &Value::Double(2.0)).unwrap_err();
        assert_eq!(err.category, ErrorCategory::TypeMismatch);
    }

    #[test]
    fn string_concat_via_plus() {
        let result = binary_op(BinOp::Add, &Value::new_string("foo"), &Value::new_string("bar")).unwrap();
        assert_eq!(result, Value::new_string("foobar"));
    }

    #[test]
    fn mismatched_numeric_pairs_promote_to_double() {
        let result = binary_op(BinOp::Add, &Value::Int(1), &Value::Double(2.5)).unwrap();
        assert_eq!(result, Value::Double(3.5));
    }

    #[test]
    fn heterogeneous_types_never_ordered() {
        assert_eq!(binary_op(BinOp::Lt, &Value::Int(1), &Value::new_string("a")).unwrap(), Value::Bool(false));
    }

    #[test]
    fn equality_defined_across_all_types() {
        assert_eq!(binary_op(BinOp::Eq, &Value::Int(1), &Value::new_string("a")).unwrap(), Value::Bool(false));
        assert_eq!(binary_op(BinOp::Eq, &Value::Int(1), &Value::Int(1)).unwrap(), Value::Bool(true));
    }

    #[test]
    fn negative_array_index_is_python_style() {
        let arr = Value::set_array(vec![Value::Int(1), Value::Int(2), Value::Int(3)], Some(TypeDescriptor::Int));
        assert_eq!(index_op(&arr, &Value::Int(-1)).unwrap(), Value::Int(3));
    }

    #[test]
    fn array_index_out_of_bounds_is_fatal() {
        let arr = Value::set_array(vec![Value::Int(1)], Some(TypeDescriptor::Int));
        let err = index_op(&arr, &Value::Int(1)).unwrap_err();
        assert_eq!(err.category, ErrorCategory::IndexOutOfBounds);
    }

    #[test]
    fn dict_miss_yields_nil_not_error() {
        let dict = Value::set_dict(Some(TypeDescriptor::String), Some(TypeDescriptor::Int));
        let result = index_op(&dict, &Value::new_string("nope")).unwrap();
        assert_eq!(result, Value::Nil);
    }

    #[test]
    fn optional_chain_short_circuits_on_none() {
        let opt = Value::set_optional(None);
        assert_eq!(member_op(&opt, "field", true).unwrap(), Value::Nil);
    }

    #[test]
    fn unknown_field_on_non_nil_struct_errors_without_optional_chain_but_yields_nil_with_it() {
        let point = Value::set_struct("Point", vec!["x".to_string()], vec![Value::Int(1)]);
        let err = member_op(&point, "y", false).unwrap_err();
        assert_eq!(err.category, ErrorCategory::RuntimeError);
        assert_eq!(member_op(&point, "y", true).unwrap(), Value::Nil);
    }

    #[test]
    fn array_append_fixes_element_type_then_rejects_mismatch() {
        let arr = Value::set_array(vec![], None);
        if let Value::Array(a) = &arr {
            array_append(a, Value::Int(1)).unwrap();
            let err = array_append(a, Value::new_string("x")).unwrap_err();
            assert_eq!(err.category, ErrorCategory::TypeMismatch);
        } else {
            panic!("expected array");
        }
    }

    #[test]
    fn append_then_remove_last_restores_length_and_returns_value() {
        let arr = Value::set_array(vec![], None);
        if let Value::Array(a) = &arr {
            array_append(a, Value::Int(42)).unwrap();
            let len_before = a.borrow().items.len();
            let removed = array_remove_at(a, (len_before - 1) as i64).unwrap();
            assert_eq!(removed, Value::Int(42));
            assert_eq!(a.borrow().items.len(), len_before - 1);
        } else {
            panic!("expected array");
        }
    }

    struct StubRegistry;
    impl ClassMethodRegistry for StubRegistry {
        fn declares_method(&self, class_name: &str, method_name: &str) -> bool {
            matches!((class_name, method_name), ("Animal", "speak"))
        }
        fn parent_of(&self, class_name: &str) -> Option<String> {
            match class_name {
                "Dog" => Some("Animal".to_string()),
                _ => None,
            }
        }
    }

    #[test]
    fn method_resolution_walks_parent_chain() {
        let owner = resolve_method_owner(&StubRegistry, "Dog", "speak");
        assert_eq!(owner, Some("Animal".to_string()));
    }

    #[test]
    fn method_call_dispatches_to_resolved_owner() {
        let dog = Value::set_class("Dog", Some("Animal".to_string()), vec!["name".into()], vec![Value::new_string("Rex")]);
        let mut invoked = None;
        let result = method_call_op(&dog, "speak", &[], false, &StubRegistry, &mut |owner, method, _recv, _args| {
            invoked = Some((owner.to_string(), method.to_string()));
            Ok(Value::new_string("woof"))
        })
        .unwrap();
        assert_eq!(result, Value::new_string("woof"));
        assert_eq!(invoked, Some(("Animal".to_string(), "speak".to_string())));
    }
}
