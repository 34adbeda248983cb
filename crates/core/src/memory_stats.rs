//! Debug memory tracking
//!
//! A single global registry, narrowed to BreadLang's single-threaded
//! execution model (`seq-core::memory_stats` keeps one per thread), gated
//! behind a runtime toggle so it is a no-op unless a caller (typically the
//! CLI's `--debug-memory` flag) turns it on. Every live heap object
//! registers itself on construction and unregisters on drop; at shutdown,
//! anything still registered is a leak - in an `Rc`-based runtime this can
//! only happen via reference cycles among `Class` instances.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapKind {
    Array,
    Dict,
    Struct,
    Class,
}

#[derive(Debug, Clone)]
pub struct MemoryRecord {
    pub kind: HeapKind,
    pub size: usize,
    pub marked: bool,
}

thread_local! {
    static TRACKING_ENABLED: Cell<bool> = const { Cell::new(false) };
    static LIVE_OBJECTS: RefCell<HashMap<u64, MemoryRecord>> = RefCell::new(HashMap::new());
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
}

pub fn enable_tracking() {
    TRACKING_ENABLED.with(|e| e.set(true));
}

pub fn disable_tracking() {
    TRACKING_ENABLED.with(|e| e.set(false));
    LIVE_OBJECTS.with(|objs| objs.borrow_mut().clear());
}

pub fn is_tracking_enabled() -> bool {
    TRACKING_ENABLED.with(|e| e.get())
}

/// Register a newly constructed heap object. Returns an id to pass to
/// [`unregister`] on drop. No-op (returns 0) when tracking is disabled.
pub fn register(kind: HeapKind, size: usize) -> u64 {
    if !is_tracking_enabled() {
        return 0;
    }
    let id = NEXT_ID.with(|n| {
        let id = n.get();
        n.set(id + 1);
        id
    });
    LIVE_OBJECTS.with(|objs| {
        objs.borrow_mut().insert(id, MemoryRecord { kind, size, marked: false });
    });
    id
}

pub fn unregister(id: u64) {
    if id == 0 {
        return;
    }
    LIVE_OBJECTS.with(|objs| {
        objs.borrow_mut().remove(&id);
    });
}

pub fn live_count() -> usize {
    LIVE_OBJECTS.with(|objs| objs.borrow().len())
}

/// Objects still registered at shutdown: leak report.
pub fn report_leaks() -> Vec<(u64, MemoryRecord)> {
    LIVE_OBJECTS.with(|objs| objs.borrow().iter().map(|(id, r)| (*id, r.clone())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_tracking_is_a_no_op() {
        disable_tracking();
        let id = register(HeapKind::Array, 24);
        assert_eq!(id, 0);
        assert_eq!(live_count(), 0);
    }

    #[test]
    fn enabled_tracking_registers_and_unregisters() {
        enable_tracking();
        let id = register(HeapKind::Struct, 16);
        assert!(id != 0);
        assert_eq!(live_count(), 1);
        unregister(id);
        assert_eq!(live_count(), 0);
        disable_tracking();
    }

    #[test]
    fn unreleased_object_shows_up_as_leak() {
        enable_tracking();
        let id = register(HeapKind::Class, 40);
        let leaks = report_leaks();
        assert_eq!(leaks.len(), 1);
        assert_eq!(leaks[0].0, id);
        disable_tracking();
    }
}
