//! String interning
//!
//! Laid out like `seq-core::seqstring` (arena-or-global string with an
//! `interned`/`small` discriminating flag) but simplified: BreadLang is
//! single-threaded, so there is no arena/global split to manage - `Rc<str>`
//! already gives O(1) clone-as-retain, and content-addressed interning
//! gives O(1) equality for shared literals.
//!
//! `new_literal` hashes with djb2 to bucket into the intern table;
//! identical bytes return the *same* `Rc<str>` handle, so two lexical
//! occurrences of the same literal compare equal by pointer, not just by
//! content. `new` (dynamic, e.g. string concatenation results) never
//! interns.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

fn djb2_hash(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 5381;
    for b in bytes {
        hash = hash.wrapping_mul(33).wrapping_add(*b as u64);
    }
    hash
}

thread_local! {
    static INTERN_TABLE: RefCell<HashMap<u64, Vec<Rc<str>>>> = RefCell::new(HashMap::new());
}

/// A BreadLang string heap object: immutable bytes plus an interned/small
/// flag. Cloning is O(1) (an `Rc` bump) - the refcounted-retain heap-object
/// semantics every BreadLang value follows.
#[derive(Debug, Clone)]
pub struct BreadString {
    data: Rc<str>,
    interned: bool,
}

impl BreadString {
    /// Dynamic allocation: never shared via the intern table, even if the
    /// content happens to match an existing literal.
    pub fn new(s: impl Into<String>) -> Self {
        BreadString { data: Rc::from(s.into().into_boxed_str()), interned: false }
    }

    /// Intern pool lookup/insert. Two calls with equal bytes return handles
    /// sharing the same underlying `Rc` allocation.
    pub fn new_literal(s: &str) -> Self {
        let hash = djb2_hash(s.as_bytes());
        INTERN_TABLE.with(|table| {
            let mut table = table.borrow_mut();
            let bucket = table.entry(hash).or_default();
            if let Some(existing) = bucket.iter().find(|r| r.as_ref() == s) {
                return BreadString { data: existing.clone(), interned: true };
            }
            let rc: Rc<str> = Rc::from(s);
            bucket.push(rc.clone());
            BreadString { data: rc, interned: true }
        })
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_interned(&self) -> bool {
        self.interned
    }

    /// Pointer identity of the backing allocation — interned strings with
    /// equal bytes share a pointer, enabling O(1) equality shortcuts.
    pub fn ptr_eq(&self, other: &BreadString) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for BreadString {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.data.as_ref() == other.data.as_ref()
    }
}

impl Eq for BreadString {}

impl fmt::Display for BreadString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data)
    }
}

impl From<&str> for BreadString {
    fn from(s: &str) -> Self {
        BreadString::new(s)
    }
}

impl From<String> for BreadString {
    fn from(s: String) -> Self {
        BreadString::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_interning_shares_handle() {
        let a = BreadString::new_literal("hello");
        let b = BreadString::new_literal("hello");
        assert!(a.ptr_eq(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn dynamic_strings_never_intern() {
        let a = BreadString::new("hello");
        let b = BreadString::new_literal("hello");
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b, "content equality still holds");
    }

    #[test]
    fn distinct_content_is_distinct() {
        let a = BreadString::new_literal("foo");
        let b = BreadString::new_literal("bar");
        assert_ne!(a, b);
    }
}
