//! Type descriptor algebra
//!
//! `TypeDescriptor` is the structural/nominal type representation shared by
//! the semantic analyzer and the runtime's array/dict element tags. A
//! concatenative, stack-based language has no nominal types and would
//! represent this as a row-polymorphic stack effect instead; BreadLang's
//! type algebra is a plain tagged tree written fresh for nominal classes
//! and structs, but keeps the convention seen elsewhere in this crate of
//! `Debug`-derived internal structure plus a hand-written
//! `Display`/`to_string` for user-facing canonical form.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Int,
    Double,
    Float,
    Bool,
    String,
    Nil,
    Array(Box<TypeDescriptor>),
    Dict(Box<TypeDescriptor>, Box<TypeDescriptor>),
    Optional(Box<TypeDescriptor>),
    Struct(StructDescriptor),
    Class(ClassDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructDescriptor {
    pub name: String,
    pub fields: Vec<(String, TypeDescriptor)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassDescriptor {
    pub name: String,
    pub parent_name: Option<String>,
    pub fields: Vec<(String, TypeDescriptor)>,
}

impl TypeDescriptor {
    pub fn create_primitive(kind: &str) -> Option<TypeDescriptor> {
        Some(match kind {
            "Int" => TypeDescriptor::Int,
            "Double" => TypeDescriptor::Double,
            "Float" => TypeDescriptor::Float,
            "Bool" => TypeDescriptor::Bool,
            "String" => TypeDescriptor::String,
            "Nil" => TypeDescriptor::Nil,
            _ => return None,
        })
    }

    pub fn create_array(element: TypeDescriptor) -> TypeDescriptor {
        TypeDescriptor::Array(Box::new(element))
    }

    pub fn create_dict(key: TypeDescriptor, value: TypeDescriptor) -> TypeDescriptor {
        TypeDescriptor::Dict(Box::new(key), Box::new(value))
    }

    pub fn create_optional(inner: TypeDescriptor) -> TypeDescriptor {
        // Optional<Optional<T>> collapses: spec treats Nil/Optional coercion
        // uniformly and double-wrapping has no observable meaning.
        match inner {
            TypeDescriptor::Optional(_) => inner,
            other => TypeDescriptor::Optional(Box::new(other)),
        }
    }

    pub fn create_struct(name: impl Into<String>, fields: Vec<(String, TypeDescriptor)>) -> TypeDescriptor {
        TypeDescriptor::Struct(StructDescriptor { name: name.into(), fields })
    }

    pub fn create_class(
        name: impl Into<String>,
        parent_name: Option<String>,
        fields: Vec<(String, TypeDescriptor)>,
    ) -> TypeDescriptor {
        TypeDescriptor::Class(ClassDescriptor { name: name.into(), parent_name, fields })
    }

    /// Structural identity.
    pub fn equals(a: &TypeDescriptor, b: &TypeDescriptor) -> bool {
        a == b
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeDescriptor::Int | TypeDescriptor::Double)
    }

    pub fn name_if_nominal(&self) -> Option<&str> {
        match self {
            TypeDescriptor::Struct(s) => Some(&s.name),
            TypeDescriptor::Class(c) => Some(&c.name),
            _ => None,
        }
    }

    /// `clone(d)`: descriptors are plain values in Rust so this is a literal
    /// deep copy via `Clone`; kept as a named function so ownership-tracking
    /// call sites (`Var`/`Function.return_type`/AST tag storage) read the
    /// same as everywhere else a descriptor is duplicated.
    pub fn clone_desc(&self) -> TypeDescriptor {
        self.clone()
    }

    /// Deterministic canonical form for error messages.
    pub fn to_canonical_string(&self) -> String {
        let mut out = String::new();
        self.write_canonical(&mut out);
        out
    }

    fn write_canonical(&self, out: &mut String) {
        match self {
            TypeDescriptor::Int => out.push_str("Int"),
            TypeDescriptor::Double => out.push_str("Double"),
            TypeDescriptor::Float => out.push_str("Float"),
            TypeDescriptor::Bool => out.push_str("Bool"),
            TypeDescriptor::String => out.push_str("String"),
            TypeDescriptor::Nil => out.push_str("Nil"),
            TypeDescriptor::Array(el) => {
                out.push('[');
                el.write_canonical(out);
                out.push(']');
            }
            TypeDescriptor::Dict(k, v) => {
                out.push('[');
                k.write_canonical(out);
                out.push_str(": ");
                v.write_canonical(out);
                out.push(']');
            }
            TypeDescriptor::Optional(inner) => {
                inner.write_canonical(out);
                out.push('?');
            }
            TypeDescriptor::Struct(s) => out.push_str(&s.name),
            TypeDescriptor::Class(c) => out.push_str(&c.name),
        }
    }

    /// `parse(text)`: parser entry point for type annotations.
    /// Bare identifiers are optimistically tagged `Struct` with no fields;
    /// the semantic analyzer rewrites them to `Class` on discovery.
    pub fn parse(text: &str) -> Result<TypeDescriptor, String> {
        let (desc, rest) = Self::parse_prefix(text.trim())?;
        if !rest.trim().is_empty() {
            return Err(format!("trailing characters in type annotation: '{rest}'"));
        }
        Ok(desc)
    }

    fn parse_prefix(text: &str) -> Result<(TypeDescriptor, &str), String> {
        let text = text.trim_start();
        let (mut desc, mut rest) = if let Some(inner) = text.strip_prefix('[') {
            Self::parse_bracketed(inner)?
        } else {
            Self::parse_atom(text)?
        };
        loop {
            let trimmed = rest.trim_start();
            if let Some(after) = trimmed.strip_prefix('?') {
                desc = TypeDescriptor::create_optional(desc);
                rest = after;
            } else {
                rest = trimmed;
                break;
            }
        }
        Ok((desc, rest))
    }

    fn parse_bracketed(after_open: &str) -> Result<(TypeDescriptor, &str), String> {
        // Empty dict marker `[:]` — spec postfix grammar.
        if let Some(after) = after_open.trim_start().strip_prefix(':') {
            let after = after.trim_start();
            let after = after
                .strip_prefix(']')
                .ok_or_else(|| "expected ']' to close empty dict type".to_string())?;
            return Ok((TypeDescriptor::create_dict(TypeDescriptor::Nil, TypeDescriptor::Nil), after));
        }
        let (first, rest) = Self::parse_prefix(after_open)?;
        let rest_trimmed = rest.trim_start();
        if let Some(after_colon) = rest_trimmed.strip_prefix(':') {
            let (value, rest2) = Self::parse_prefix(after_colon)?;
            let rest2 = rest2.trim_start();
            let rest2 = rest2
                .strip_prefix(']')
                .ok_or_else(|| "expected ']' to close dict type".to_string())?;
            Ok((TypeDescriptor::create_dict(first, value), rest2))
        } else {
            let rest_trimmed = rest_trimmed
                .strip_prefix(']')
                .ok_or_else(|| "expected ']' to close array type".to_string())?;
            Ok((TypeDescriptor::create_array(first), rest_trimmed))
        }
    }

    fn parse_atom(text: &str) -> Result<(TypeDescriptor, &str), String> {
        let end = text
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(text.len());
        if end == 0 {
            return Err(format!("expected a type name, found '{text}'"));
        }
        let (name, rest) = text.split_at(end);
        let desc = TypeDescriptor::create_primitive(name)
            .unwrap_or_else(|| TypeDescriptor::create_struct(name, Vec::new()));
        Ok((desc, rest))
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

/// Type registry: maps nominal names to their full descriptor, used by
/// `compatible` to resolve ancestor chains.
pub trait TypeRegistry {
    fn lookup_class(&self, name: &str) -> Option<&ClassDescriptor>;
}

/// `compatible(from, to)`: `from` is assignable to `to`.
///
/// Needs a registry to walk class ancestor chains; primitives/containers/
/// optional relaxations need no registry lookups.
pub fn compatible(from: &TypeDescriptor, to: &TypeDescriptor, registry: &dyn TypeRegistry) -> bool {
    if TypeDescriptor::equals(from, to) {
        return true;
    }
    match to {
        // (i) any T compatible with Optional<T>; Nil compatible with Optional<T>.
        TypeDescriptor::Optional(inner) => {
            matches!(from, TypeDescriptor::Nil) || compatible(from, inner, registry)
        }
        TypeDescriptor::Class(to_class) => match from {
            // (ii) C compatible with D iff C equals D or an ancestor of C equals D.
            TypeDescriptor::Class(from_class) => is_ancestor_or_self(from_class, &to_class.name, registry),
            _ => false,
        },
        TypeDescriptor::Array(to_el) => match from {
            TypeDescriptor::Array(from_el) => compatible(from_el, to_el, registry),
            _ => false,
        },
        TypeDescriptor::Dict(to_k, to_v) => match from {
            TypeDescriptor::Dict(from_k, from_v) => {
                compatible(from_k, to_k, registry) && compatible(from_v, to_v, registry)
            }
            _ => false,
        },
        _ => false,
    }
}

fn is_ancestor_or_self(class: &ClassDescriptor, target_name: &str, registry: &dyn TypeRegistry) -> bool {
    if class.name == target_name {
        return true;
    }
    let mut current = class.parent_name.clone();
    // Defend against malformed/cyclic parent chains (should be caught at
    // registration time, but compatible() must still terminate).
    let mut visited = std::collections::HashSet::new();
    visited.insert(class.name.clone());
    while let Some(parent_name) = current {
        if !visited.insert(parent_name.clone()) {
            return false;
        }
        if parent_name == target_name {
            return true;
        }
        current = registry
            .lookup_class(&parent_name)
            .and_then(|p| p.parent_name.clone());
    }
    false
}

/// Least-upper-bound on the inheritance chain for array/literal unification
///. Returns `None` if no common ancestor.
pub fn nearest_common_ancestor(
    a: &ClassDescriptor,
    b: &ClassDescriptor,
    registry: &dyn TypeRegistry,
) -> Option<String> {
    let mut a_chain = vec![a.name.clone()];
    let mut current = a.parent_name.clone();
    while let Some(name) = current {
        a_chain.push(name.clone());
        current = registry.lookup_class(&name).and_then(|c| c.parent_name.clone());
    }

    let mut b_name = Some(b.name.clone());
    while let Some(name) = b_name {
        if a_chain.contains(&name) {
            return Some(name);
        }
        b_name = registry.lookup_class(&name).and_then(|c| c.parent_name.clone());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct TestRegistry(HashMap<String, ClassDescriptor>);

    impl TypeRegistry for TestRegistry {
        fn lookup_class(&self, name: &str) -> Option<&ClassDescriptor> {
            self.0.get(name)
        }
    }

    fn animal_dog_registry() -> TestRegistry {
        let mut m = HashMap::new();
        m.insert(
            "Animal".to_string(),
            ClassDescriptor { name: "Animal".into(), parent_name: None, fields: vec![] },
        );
        m.insert(
            "Dog".to_string(),
            ClassDescriptor { name: "Dog".into(), parent_name: Some("Animal".into()), fields: vec![] },
        );
        TestRegistry(m)
    }

    #[test]
    fn optional_relaxations() {
        let reg = animal_dog_registry();
        let opt_int = TypeDescriptor::create_optional(TypeDescriptor::Int);
        assert!(compatible(&TypeDescriptor::Int, &opt_int, &reg));
        assert!(compatible(&TypeDescriptor::Nil, &opt_int, &reg));
        assert!(!compatible(&TypeDescriptor::String, &opt_int, &reg));
    }

    #[test]
    fn class_subtype_compatibility() {
        let reg = animal_dog_registry();
        let dog = TypeDescriptor::create_class("Dog", Some("Animal".into()), vec![]);
        let animal = TypeDescriptor::create_class("Animal", None, vec![]);
        assert!(compatible(&dog, &animal, &reg));
        assert!(!compatible(&animal, &dog, &reg));
    }

    #[test]
    fn no_implicit_numeric_widening_in_equals() {
        assert!(!TypeDescriptor::equals(&TypeDescriptor::Int, &TypeDescriptor::Double));
    }

    #[test]
    fn parse_roundtrip_idempotence() {
        for src in ["Int", "[Int]", "[String: Int]", "Int?", "[Int]?", "[:]", "Animal"] {
            let parsed = TypeDescriptor::parse(src).expect("parses");
            let printed = parsed.to_canonical_string();
            let reparsed = TypeDescriptor::parse(&printed).expect("reparses");
            assert_eq!(parsed, reparsed, "round-trip mismatch for {src}");
        }
    }

    #[test]
    fn nearest_common_ancestor_found() {
        let reg = animal_dog_registry();
        let dog = ClassDescriptor { name: "Dog".into(), parent_name: Some("Animal".into()), fields: vec![] };
        let animal = ClassDescriptor { name: "Animal".into(), parent_name: None, fields: vec![] };
        assert_eq!(nearest_common_ancestor(&dog, &animal, &reg), Some("Animal".to_string()));
    }
}
