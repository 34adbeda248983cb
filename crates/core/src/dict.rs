//! Open-addressed dictionary heap object
//!
//! Grounded in `original_source/breadlang/src/core/value_dict.c`
//! (`bread_dict_hash_key` uses FNV-1a over the key's bytes and linear
//! probing from `hash % capacity`). Implemented as a standalone hash table
//! rather than wrapping `std::collections::HashMap` because spec treats
//! `is_occupied`/`is_deleted` tombstone slots as part of the testable
//! contract, not an implementation detail.

use crate::value::Value;

const DEFAULT_CAPACITY: usize = 8;
const LOAD_FACTOR: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    Int(i64),
    Bool(bool),
    String(String),
}

impl DictKey {
    pub fn from_value(value: &Value) -> Option<DictKey> {
        match value {
            Value::Int(n) => Some(DictKey::Int(*n)),
            Value::Bool(b) => Some(DictKey::Bool(*b)),
            Value::String(s) => Some(DictKey::String(s.as_str().to_string())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DictKey::Int(n) => Value::Int(*n),
            DictKey::Bool(b) => Value::Bool(*b),
            DictKey::String(s) => Value::new_string(s.clone()),
        }
    }

    /// FNV-1a over the key's canonical byte representation.
    fn fnv1a_hash(&self) -> u32 {
        let mut hash: u32 = 2_166_136_261;
        let mut feed = |bytes: &[u8]| {
            for b in bytes {
                hash ^= *b as u32;
                hash = hash.wrapping_mul(16_777_619);
            }
        };
        match self {
            DictKey::Int(n) => feed(&n.to_le_bytes()),
            DictKey::Bool(b) => feed(&[*b as u8]),
            DictKey::String(s) => feed(s.as_bytes()),
        }
        hash
    }
}

#[derive(Debug, Clone)]
struct Slot {
    is_occupied: bool,
    is_deleted: bool,
    key: Option<DictKey>,
    value: Option<Value>,
}

impl Slot {
    fn empty() -> Self {
        Slot { is_occupied: false, is_deleted: false, key: None, value: None }
    }
}

/// Open-addressed hash table with tombstone deletion (spec Dict invariant:
/// "Every dict entry satisfies `is_occupied == 1` for live or tombstoned
/// slots; live iff also `!is_deleted`").
#[derive(Debug, Clone)]
pub struct Dict {
    slots: Vec<Slot>,
    len: usize,
    tombstones: usize,
    pub key_type_set: bool,
    pub value_type_set: bool,
}

impl Dict {
    pub fn new() -> Self {
        Dict {
            slots: (0..DEFAULT_CAPACITY).map(|_| Slot::empty()).collect(),
            len: 0,
            tombstones: 0,
            key_type_set: false,
            value_type_set: false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn probe_index(&self, key: &DictKey) -> usize {
        key.fnv1a_hash() as usize % self.slots.len()
    }

    /// Finds either the slot holding `key` (live), or the first vacant slot
    /// on the probe path (including reusable tombstones) if absent.
    fn find_slot(&self, key: &DictKey) -> Result<usize, usize> {
        let start = self.probe_index(key);
        let cap = self.slots.len();
        let mut first_tombstone: Option<usize> = None;
        for offset in 0..cap {
            let idx = (start + offset) % cap;
            let slot = &self.slots[idx];
            if !slot.is_occupied {
                return Err(first_tombstone.unwrap_or(idx));
            }
            if slot.is_deleted {
                if first_tombstone.is_none() {
                    first_tombstone = Some(idx);
                }
                continue;
            }
            if slot.key.as_ref() == Some(key) {
                return Ok(idx);
            }
        }
        Err(first_tombstone.unwrap_or(start))
    }

    pub fn get(&self, key: &DictKey) -> Option<&Value> {
        match self.find_slot(key) {
            Ok(idx) => self.slots[idx].value.as_ref(),
            Err(_) => None,
        }
    }

    pub fn contains_key(&self, key: &DictKey) -> bool {
        matches!(self.find_slot(key), Ok(_))
    }

    pub fn set(&mut self, key: DictKey, value: Value) {
        if (self.len + 1) as f64 / self.slots.len() as f64 > LOAD_FACTOR {
            self.resize(self.slots.len() * 2);
        }
        match self.find_slot(&key) {
            Ok(idx) => {
                self.slots[idx].value = Some(value);
            }
            Err(idx) => {
                let was_tombstone = self.slots[idx].is_deleted;
                self.slots[idx] = Slot { is_occupied: true, is_deleted: false, key: Some(key), value: Some(value) };
                self.len += 1;
                if was_tombstone {
                    self.tombstones -= 1;
                }
            }
        }
    }

    /// Tombstone a live slot; returns the removed value if present.
    pub fn remove(&mut self, key: &DictKey) -> Option<Value> {
        match self.find_slot(key) {
            Ok(idx) => {
                let slot = &mut self.slots[idx];
                slot.is_deleted = true;
                let removed = slot.value.take();
                slot.key = None;
                self.len -= 1;
                self.tombstones += 1;
                removed
            }
            Err(_) => None,
        }
    }

    fn resize(&mut self, new_capacity: usize) {
        let old_slots = std::mem::replace(&mut self.slots, (0..new_capacity).map(|_| Slot::empty()).collect());
        self.len = 0;
        self.tombstones = 0;
        for slot in old_slots {
            if slot.is_occupied && !slot.is_deleted {
                self.set(slot.key.unwrap(), slot.value.unwrap());
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DictKey, &Value)> {
        self.slots
            .iter()
            .filter(|s| s.is_occupied && !s.is_deleted)
            .map(|s| (s.key.as_ref().unwrap(), s.value.as_ref().unwrap()))
    }

    pub fn keys(&self) -> Vec<DictKey> {
        self.iter().map(|(k, _)| k.clone()).collect()
    }
}

impl Default for Dict {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let mut d = Dict::new();
        d.set(DictKey::String("a".into()), Value::Int(1));
        assert_eq!(d.get(&DictKey::String("a".into())), Some(&Value::Int(1)));
    }

    #[test]
    fn missing_key_yields_none_not_panic() {
        let d = Dict::new();
        assert_eq!(d.get(&DictKey::String("nope".into())), None);
        assert!(!d.contains_key(&DictKey::String("nope".into())));
    }

    #[test]
    fn tombstone_then_reinsert_reuses_slot_and_keeps_other_entries() {
        let mut d = Dict::new();
        d.set(DictKey::Int(1), Value::Int(10));
        d.set(DictKey::Int(2), Value::Int(20));
        d.remove(&DictKey::Int(1));
        assert_eq!(d.get(&DictKey::Int(1)), None);
        assert_eq!(d.get(&DictKey::Int(2)), Some(&Value::Int(20)));
        d.set(DictKey::Int(1), Value::Int(99));
        assert_eq!(d.get(&DictKey::Int(1)), Some(&Value::Int(99)));
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn resizes_past_load_factor() {
        let mut d = Dict::new();
        for i in 0..20 {
            d.set(DictKey::Int(i), Value::Int(i * 2));
        }
        assert_eq!(d.len(), 20);
        for i in 0..20 {
            assert_eq!(d.get(&DictKey::Int(i)), Some(&Value::Int(i * 2)));
        }
    }
}
