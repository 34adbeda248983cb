//! Value & heap
//!
//! A `Value` is a tagged union: primitives stored inline, everything else
//! an owning handle into a refcounted heap object. An implementation in an
//! ownership language can lean on its destructor story and treat `release`
//! as a no-op that occurs at scope exit - `Rc` *is* that destructor story:
//! `Rc::clone` is retain, dropping the last handle is release reaching a
//! zero refcount, and `Rc::strong_count` stands in for an explicit refcount
//! field (as `usize` rather than a fixed-width integer, since Rust's own
//! allocator already guards overflow). Heap payloads (`Array`, `Dict`,
//! `Struct`, `Class`) are `Rc<RefCell<_>>` since arrays/dicts grow in place
//! and struct/class fields are assigned after construction via `init`/
//! member assignment.
//!
//! Shaped like `seq-runtime::value::Value` (a single `#[derive(Clone)]`
//! tagged enum with `Arc`-backed composite variants for O(1) cloning) but
//! swaps `Arc`/thread-safety for `Rc` because BreadLang's execution model
//! is single-threaded and synchronous.

use crate::dict::{Dict, DictKey};
use crate::intern::BreadString;
use crate::memory_stats::{self, HeapKind};
use crate::types::TypeDescriptor;
use std::cell::RefCell;
use std::rc::Rc;

/// Growable, element-type-tagged array heap object.
#[derive(Debug)]
pub struct ArrayObj {
    pub element_type: Option<TypeDescriptor>,
    pub items: Vec<Value>,
    tracking_id: u64,
}

impl ArrayObj {
    fn new() -> Self {
        ArrayObj { element_type: None, items: Vec::new(), tracking_id: memory_stats::register(HeapKind::Array, 24) }
    }
}

impl Drop for ArrayObj {
    fn drop(&mut self) {
        memory_stats::unregister(self.tracking_id);
    }
}

impl PartialEq for ArrayObj {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

/// Dict heap object wrapper, tracked for debug leak reporting.
#[derive(Debug)]
pub struct DictObj {
    pub table: Dict,
    pub key_type: Option<TypeDescriptor>,
    pub value_type: Option<TypeDescriptor>,
    tracking_id: u64,
}

impl DictObj {
    fn new() -> Self {
        DictObj {
            table: Dict::new(),
            key_type: None,
            value_type: None,
            tracking_id: memory_stats::register(HeapKind::Dict, 32),
        }
    }
}

impl Drop for DictObj {
    fn drop(&mut self) {
        memory_stats::unregister(self.tracking_id);
    }
}

impl PartialEq for DictObj {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

/// Named field list shared by struct and class instances (spec
/// "positional and by-name access via `find_field_index`").
#[derive(Debug, PartialEq)]
pub struct FieldList {
    pub names: Vec<String>,
    pub values: Vec<Value>,
}

impl FieldList {
    pub fn new(names: Vec<String>, values: Vec<Value>) -> Self {
        FieldList { names, values }
    }

    pub fn find_field_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.find_field_index(name).map(|i| &self.values[i])
    }

    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.find_field_index(name) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug)]
pub struct StructObj {
    pub type_name: String,
    pub fields: FieldList,
    tracking_id: u64,
}

impl StructObj {
    fn new(type_name: String, fields: FieldList) -> Self {
        StructObj { type_name, fields, tracking_id: memory_stats::register(HeapKind::Struct, 48) }
    }
}

impl Drop for StructObj {
    fn drop(&mut self) {
        memory_stats::unregister(self.tracking_id);
    }
}

impl PartialEq for StructObj {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.fields == other.fields
    }
}

/// Class instance. `parent_name` is a non-owning name lookup, never a
/// strong pointer,
/// so two class instances referencing each other through fields cannot
/// form a retain cycle through the class *hierarchy* itself — only through
/// instance fields holding other `Class` values, which is the cycle case
/// spec explicitly allows and defers to an optional tracing collector.
#[derive(Debug)]
pub struct ClassObj {
    pub type_name: String,
    pub parent_name: Option<String>,
    pub fields: FieldList,
    tracking_id: u64,
}

impl ClassObj {
    fn new(type_name: String, parent_name: Option<String>, fields: FieldList) -> Self {
        ClassObj {
            type_name,
            parent_name,
            fields,
            tracking_id: memory_stats::register(HeapKind::Class, 56),
        }
    }
}

impl Drop for ClassObj {
    fn drop(&mut self) {
        memory_stats::unregister(self.tracking_id);
    }
}

impl PartialEq for ClassObj {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.parent_name == other.parent_name && self.fields == other.fields
    }
}

/// The tagged union of every runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f32),
    Double(f64),
    String(BreadString),
    Array(Rc<RefCell<ArrayObj>>),
    Dict(Rc<RefCell<DictObj>>),
    /// `{is_some, value}`; `None` carries no inner value.
    Optional(Option<Rc<Value>>),
    Struct(Rc<RefCell<StructObj>>),
    Class(Rc<RefCell<ClassObj>>),
}

impl Value {
    pub fn set_nil() -> Value {
        Value::Nil
    }

    pub fn set_bool(b: bool) -> Value {
        Value::Bool(b)
    }

    pub fn set_int(n: i64) -> Value {
        Value::Int(n)
    }

    pub fn set_float(f: f32) -> Value {
        Value::Float(f)
    }

    pub fn set_double(d: f64) -> Value {
        Value::Double(d)
    }

    pub fn set_string(s: impl Into<BreadString>) -> Value {
        Value::String(s.into())
    }

    /// Convenience constructor used throughout the crate and tests; routes
    /// through `set_string` to avoid duplicating the `Into<BreadString>` bound.
    pub fn new_string(s: impl Into<String>) -> Value {
        Value::set_string(BreadString::new(s.into()))
    }

    pub fn new_string_literal(s: &str) -> Value {
        Value::String(BreadString::new_literal(s))
    }

    pub fn set_array(items: Vec<Value>, element_type: Option<TypeDescriptor>) -> Value {
        let mut obj = ArrayObj::new();
        obj.items = items;
        obj.element_type = element_type;
        Value::Array(Rc::new(RefCell::new(obj)))
    }

    pub fn set_dict(key_type: Option<TypeDescriptor>, value_type: Option<TypeDescriptor>) -> Value {
        let mut obj = DictObj::new();
        obj.key_type = key_type;
        obj.value_type = value_type;
        Value::Dict(Rc::new(RefCell::new(obj)))
    }

    pub fn set_optional(inner: Option<Value>) -> Value {
        Value::Optional(inner.map(Rc::new))
    }

    pub fn set_struct(type_name: impl Into<String>, names: Vec<String>, values: Vec<Value>) -> Value {
        Value::Struct(Rc::new(RefCell::new(StructObj::new(type_name.into(), FieldList::new(names, values)))))
    }

    pub fn set_class(
        type_name: impl Into<String>,
        parent_name: Option<String>,
        names: Vec<String>,
        values: Vec<Value>,
    ) -> Value {
        Value::Class(Rc::new(RefCell::new(ClassObj::new(
            type_name.into(),
            parent_name,
            FieldList::new(names, values),
        ))))
    }

    /// `clone(v)`: retain semantics. For heap variants this is an `Rc`
    /// refcount bump (O(1)); for inline primitives it's a bitwise copy.
    /// Named to read as a retain at call sites.
    pub fn retain(&self) -> Value {
        self.clone()
    }

    /// `release(v)`: explicit no-op hook named to read as a release at call
    /// sites - actual release happens when the last owner drops `v`.
    pub fn release(self) {
        drop(self)
    }

    /// `is_truthy(v)`. Only `Bool` participates in truthiness directly; the
    /// analyzer enforces a `Bool` condition ahead of time, so this is
    /// primarily used by `if`/`while` guards after type-checking has
    /// already guaranteed one.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Nil => false,
            Value::Optional(inner) => inner.is_some(),
            _ => true,
        }
    }

    /// `assign(target, src)`: release + clone, i.e. just drop the old
    /// value in place and store the new one.
    pub fn assign(target: &mut Value, src: &Value) {
        *target = src.retain();
    }

    pub fn dict_key(&self) -> Option<DictKey> {
        DictKey::from_value(self)
    }

    /// Length for `.length` member access (Array, String, Dict).
    pub fn length(&self) -> Option<i64> {
        match self {
            Value::Array(a) => Some(a.borrow().items.len() as i64),
            Value::Dict(d) => Some(d.borrow().table.len() as i64),
            Value::String(s) => Some(s.len() as i64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retain_then_release_does_not_change_original() {
        let arr = Value::set_array(vec![Value::Int(1)], Some(TypeDescriptor::Int));
        let cloned = arr.retain();
        cloned.release();
        match &arr {
            Value::Array(a) => assert_eq!(a.borrow().items.len(), 1),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn retain_bumps_rc_strong_count_and_release_restores_it() {
        let arr = Value::set_array(vec![], None);
        let rc = match &arr {
            Value::Array(a) => a.clone(),
            _ => unreachable!(),
        };
        let initial = Rc::strong_count(&rc);
        let cloned = arr.retain();
        assert_eq!(Rc::strong_count(&rc), initial + 1);
        cloned.release();
        assert_eq!(Rc::strong_count(&rc), initial);
    }

    #[test]
    fn truthiness_rules() {
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Nil.is_truthy());
        assert!(Value::set_optional(Some(Value::Int(1))).is_truthy());
        assert!(!Value::set_optional(None).is_truthy());
        assert!(Value::Int(0).is_truthy(), "non-bool values do not participate in falsiness");
    }

    #[test]
    fn struct_field_access_by_name() {
        let s = Value::set_struct("Point", vec!["x".into(), "y".into()], vec![Value::Int(1), Value::Int(2)]);
        match s {
            Value::Struct(obj) => {
                assert_eq!(obj.borrow().fields.get("y"), Some(&Value::Int(2)));
                assert_eq!(obj.borrow().fields.find_field_index("x"), Some(0));
            }
            _ => panic!("expected struct"),
        }
    }
}
