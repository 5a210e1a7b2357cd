//! Triple store: two predicate/object-keyed `BitSet` indexes plus the
//! exact-count adjacency needed by SHACL cardinality checks (§3, §4.4).
//!
//! The indexes alone answer every `ask_pattern` shape in §4.4 without ever
//! iterating the triple list — this mirrors the ASK_SP / ASK_SPO / COUNT_SP_GE
//! kernel split used by the hot-path dispatch tables this store feeds.

use crate::bitset::BitSet;
use crate::error::{EngineError, Result};
use crate::interner::Id;
use rustc_hash::FxHashMap;

/// A single `(subject, predicate, object)` fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triple {
    pub s: Id,
    pub p: Id,
    pub o: Id,
}

#[derive(Default)]
pub struct TripleStore {
    by_predicate: FxHashMap<Id, BitSet>,
    by_object: FxHashMap<Id, BitSet>,
    /// (subject, predicate) -> ordered list of distinct objects, for the
    /// exact-count SHACL path beyond the `k == 1` bit-test fast path.
    objects_of: FxHashMap<(Id, Id), Vec<Id>>,
    max_id_seen: Id,
    triple_count: u64,
}

impl TripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_id_seen(&self) -> Id {
        self.max_id_seen
    }

    /// Cardinality of the *indexed* set of triples (duplicates collapse).
    pub fn triple_count(&self) -> u64 {
        self.triple_count
    }

    /// Add a fact. `s`, `p`, `o` must all be non-zero minted ids.
    /// Idempotent at the index level: re-adding an existing triple does not
    /// change any index or bump the counter.
    pub fn add_triple(&mut self, s: Id, p: Id, o: Id) -> Result<()> {
        if s == 0 {
            return Err(EngineError::InvalidId(s));
        }
        if p == 0 {
            return Err(EngineError::InvalidId(p));
        }
        if o == 0 {
            return Err(EngineError::InvalidId(o));
        }

        self.max_id_seen = self.max_id_seen.max(s).max(p).max(o);

        let objects = self.objects_of.entry((s, p)).or_default();
        let is_new = !objects.contains(&o);
        if is_new {
            objects.push(o);
        }

        let predicate_bits = self.by_predicate.entry(p).or_default();
        let predicate_was_set = predicate_bits.test(s);
        predicate_bits.set(s);

        let object_bits = self.by_object.entry(o).or_default();
        object_bits.set(s);

        if is_new || !predicate_was_set {
            self.triple_count += 1;
        }

        Ok(())
    }

    /// Ask whether a (possibly wildcarded, `0` = wildcard) pattern holds,
    /// answered entirely from the two indexes (§4.4).
    pub fn ask_pattern(&self, s: Id, p: Id, o: Id) -> bool {
        match (s, p, o) {
            (0, 0, 0) => self.triple_count > 0,
            (s, p, o) if s != 0 && p != 0 && o != 0 => {
                self.by_predicate.get(&p).is_some_and(|bs| bs.test(s))
                    && self.by_object.get(&o).is_some_and(|bs| bs.test(s))
            }
            (0, p, 0) if p != 0 => self.by_predicate.get(&p).is_some_and(|bs| bs.popcount() > 0),
            (s, p, 0) if s != 0 && p != 0 => self.by_predicate.get(&p).is_some_and(|bs| bs.test(s)),
            (0, p, o) if p != 0 && o != 0 => match (self.by_predicate.get(&p), self.by_object.get(&o)) {
                (Some(pred_bits), Some(obj_bits)) => pred_bits.and(obj_bits).popcount() > 0,
                _ => false,
            },
            (s, 0, o) if s != 0 && o != 0 => {
                let Some(obj_bits) = self.by_object.get(&o) else {
                    return false;
                };
                if !obj_bits.test(s) {
                    return false;
                }
                self.by_predicate
                    .values()
                    .any(|pred_bits| pred_bits.test(s) && obj_bits.test(s))
            }
            (0, 0, o) if o != 0 => self.by_object.get(&o).is_some_and(|bs| bs.popcount() > 0),
            _ => false,
        }
    }

    /// Subjects with predicate `p` (§4.7 enumeration).
    pub fn subjects_with_predicate(&self, p: Id) -> BitSet {
        self.by_predicate.get(&p).cloned().unwrap_or_default()
    }

    /// Subjects with object `o` under any predicate (§4.7 enumeration).
    pub fn subjects_with_object(&self, o: Id) -> BitSet {
        self.by_object.get(&o).cloned().unwrap_or_default()
    }

    /// Exact objects of `(s, p)`, for SHACL cardinality counts beyond the
    /// `k == 1` fast path.
    pub fn objects_of(&self, s: Id, p: Id) -> &[Id] {
        self.objects_of.get(&(s, p)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every distinct `(s, p, o)` fact, for `persist`. Order is unspecified.
    pub fn iter_triples(&self) -> impl Iterator<Item = Triple> + '_ {
        self.objects_of
            .iter()
            .flat_map(|(&(s, p), objects)| objects.iter().map(move |&o| Triple { s, p, o }))
    }
}
