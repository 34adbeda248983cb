//! BreadLang Core: value/heap model, type descriptors, scopes, and the
//! error taxonomy shared by everything that lowers a typed BreadLang AST.
//!
//! This crate is the foundation both lowering targets (an LLVM codegen and a
//! bytecode interpreter — both out of scope here, spec) would link
//! against, and the layer `bread-runtime`'s operations and `bread-compiler`'s
//! semantic analyzer are built on.
//!
//! # Modules
//!
//! - `value`: the tagged `Value` union and its refcounted heap objects
//!   (Array, Dict, Struct, Class)
//! - `dict`: the open-addressed, tombstoned dictionary heap object
//! - `intern`: string interning (`BreadString`)
//! - `types`: the `TypeDescriptor` algebra (`equals`/`compatible`/`to_string`)
//! - `scope`: lexically nested name→`Variable` scope stack
//! - `error`: the global error slot, category taxonomy, and diagnostic banner
//! - `memory_stats`: opt-in debug heap-object tracking

pub mod dict;
pub mod error;
pub mod intern;
pub mod memory_stats;
pub mod scope;
pub mod types;
pub mod value;

pub use dict::{Dict, DictKey};
pub use error::{BreadError, ErrorCategory, ErrorContextGuard};
pub use intern::BreadString;
pub use scope::{Scope, ScopeStack, Variable};
pub use types::{compatible, nearest_common_ancestor, ClassDescriptor, StructDescriptor, TypeDescriptor, TypeRegistry};
pub use value::{ArrayObj, ClassObj, DictObj, FieldList, StructObj, Value};
