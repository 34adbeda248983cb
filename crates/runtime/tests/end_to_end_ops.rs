//! Direct [`bread_runtime::ops`] coverage for scenarios that only manifest
//! at runtime (polymorphic dispatch, division-by-zero abort) - this crate
//! has no VM to drive a whole `.bread` program, so these are exercised at
//! the operation level directly, placed in `tests/` the way a standalone
//! integration test for a single feature is.

use bread_core::error::ErrorCategory;
use bread_core::value::Value;
use bread_runtime::{method_call_op, ClassMethodRegistry};
use std::collections::HashMap;

/// A minimal class hierarchy registry, just enough to resolve `speak` to
/// whichever of `Animal`/`Dog` actually declares it.
struct FixedRegistry {
    parents: HashMap<&'static str, &'static str>,
    methods: HashMap<(&'static str, &'static str), ()>,
}

impl ClassMethodRegistry for FixedRegistry {
    fn declares_method(&self, class_name: &str, method_name: &str) -> bool {
        self.methods.keys().any(|(c, m)| *c == class_name && *m == method_name)
    }

    fn parent_of(&self, class_name: &str) -> Option<String> {
        self.parents.get(class_name).map(|s| s.to_string())
    }
}

/// Scenario 3: a `Dog` stored through an `Animal`-typed reference dispatches
/// to `Dog::speak`, not `Animal::speak` — dispatch is by the instance's own
/// runtime class, never by the static type of the variable holding it.
#[test]
fn polymorphic_dispatch_resolves_to_the_instance_class_not_the_static_type() {
    let registry = FixedRegistry {
        parents: HashMap::from([("Dog", "Animal")]),
        methods: HashMap::from([(("Animal", "speak"), ()), (("Dog", "speak"), ())]),
    };

    let dog = Value::set_class("Dog", Some("Animal".to_string()), vec!["name".to_string()], vec![Value::new_string("Rex")]);

    let result = method_call_op(&dog, "speak", &[], false, &registry, &mut |owner, method, _target, _args| {
        assert_eq!(owner, "Dog", "speak should resolve on the instance's own class, not its ancestor");
        assert_eq!(method, "speak");
        Ok(Value::new_string("woof"))
    });

    assert_eq!(result.unwrap(), Value::new_string("woof"));
}

/// A subclass that doesn't override a method falls back to the parent's
/// implementation via the same resolution path.
#[test]
fn method_resolution_falls_back_to_the_parent_when_not_overridden() {
    let registry = FixedRegistry {
        parents: HashMap::from([("Dog", "Animal")]),
        methods: HashMap::from([(("Animal", "speak"), ())]),
    };
    let dog = Value::set_class("Dog", Some("Animal".to_string()), vec![], vec![]);

    let result = method_call_op(&dog, "speak", &[], false, &registry, &mut |owner, _method, _target, _args| {
        assert_eq!(owner, "Animal");
        Ok(Value::new_string("..."))
    });

    assert_eq!(result.unwrap(), Value::new_string("..."));
}

/// Scenario 5: integer division by zero is a fatal `DivisionByZero` error —
/// the caller is expected to abort the process on it (spec "Runtime
/// categories abort"), which `ops::binary_op` signals by returning `Err`
/// rather than aborting itself.
#[test]
fn integer_division_by_zero_is_a_fatal_error() {
    let err = bread_runtime::binary_op(bread_runtime::BinOp::Div, &Value::Int(10), &Value::Int(0)).unwrap_err();
    assert_eq!(err.category, ErrorCategory::DivisionByZero);
    assert!(err.category.is_fatal());
}
