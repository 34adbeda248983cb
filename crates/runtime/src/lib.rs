//! BreadLang Runtime: operations over tagged values and the
//! extern "C" ABI surface a lowering target (LLVM codegen or a bytecode
//! interpreter — both out of scope, spec) would link against.
//!
//! # Modules
//!
//! - `ops`: safe Rust implementations of `binary_op`/`unary_not`/`index_op`/
//!   `member_op`/`method_call_op` and the container mutators (`array_append`,
//!   `dict_set`, `array_remove_at`)
//! - `abi`: `extern "C"` opaque-pointer wrappers around `ops`, plus the
//!   process-wide scope stack (`push_scope`/`pop_scope`/`var_*`) and the
//!   `box_*`/`unbox_*` primitive-boxing helpers

pub mod abi;
pub mod ops;

pub use ops::{
    array_append, array_remove_at, binary_op, dict_set, index_op, index_set_op, member_op,
    method_call_op, range_builtin, resolve_method_owner, unary_neg, unary_not, BinOp,
    ClassMethodRegistry,
};
