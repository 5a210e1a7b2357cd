//! SHACL-like shape evaluation against the triple store (§4.6).
//!
//! Violations are *reported*, not raised: evaluation is side-effect-free and
//! never short-circuits in `validate_node`'s default mode. A separate
//! `conforms` entry point answers the exists-a-violation question for
//! callers that want ask-style semantics without building the full report.

use crate::error::{EngineError, Result};
use crate::interner::Id;
use crate::owl::OwlClosure;
use crate::store::TripleStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One declared constraint on a shape's target property.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PropertyConstraint {
    pub predicate: Id,
    pub min_count: Option<u32>,
    pub max_count: Option<u32>,
    pub class: Option<Id>,
    pub datatype: Option<Id>,
}

impl PropertyConstraint {
    pub fn new(predicate: Id) -> Self {
        Self { predicate, ..Default::default() }
    }

    pub fn with_min_count(mut self, k: u32) -> Self {
        self.min_count = Some(k);
        self
    }

    pub fn with_max_count(mut self, k: u32) -> Self {
        self.max_count = Some(k);
        self
    }

    pub fn with_class(mut self, class: Id) -> Self {
        self.class = Some(class);
        self
    }

    pub fn with_datatype(mut self, datatype: Id) -> Self {
        self.datatype = Some(datatype);
        self
    }
}

/// A SHACL node shape: a target class plus ordered property constraints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Shape {
    pub target_class: Id,
    pub constraints: Vec<PropertyConstraint>,
}

impl Shape {
    pub fn new(target_class: Id) -> Self {
        Self { target_class, constraints: Vec::new() }
    }

    pub fn with_constraint(mut self, constraint: PropertyConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// One constraint kind that was found violated, with its count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    MinCount { predicate: Id, required: u32, actual: u32 },
    MaxCount { predicate: Id, allowed: u32, actual: u32 },
    Class { predicate: Id, expected_class: Id, object: Id },
    Datatype { predicate: Id, expected_datatype: Id, object: Id },
}

/// Aggregated evaluation result for one node against one shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShaclReport {
    pub applicable: bool,
    pub violations: Vec<ViolationKind>,
}

impl ShaclReport {
    pub fn not_applicable() -> Self {
        Self { applicable: false, violations: Vec::new() }
    }

    pub fn conforms(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Per-object datatype tags, populated only by an explicit `intern_typed`
/// call (open question #2 in SPEC_FULL.md §9) — nothing in the core tags an
/// object's datatype on its own.
#[derive(Default)]
pub struct DatatypeTags {
    tags: HashMap<Id, Id>,
}

impl DatatypeTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, object: Id, datatype: Id) {
        self.tags.insert(object, datatype);
    }

    pub fn get(&self, object: Id) -> Option<Id> {
        self.tags.get(&object).copied()
    }
}

pub struct ShaclEvaluator<'a> {
    store: &'a TripleStore,
    owl: &'a OwlClosure,
    datatypes: &'a DatatypeTags,
    rdf_type: Id,
    shapes: &'a HashMap<Id, Shape>,
}

impl<'a> ShaclEvaluator<'a> {
    pub fn new(
        store: &'a TripleStore,
        owl: &'a OwlClosure,
        datatypes: &'a DatatypeTags,
        rdf_type: Id,
        shapes: &'a HashMap<Id, Shape>,
    ) -> Self {
        Self { store, owl, datatypes, rdf_type, shapes }
    }

    /// `type_of(n)`: the first class `n` is asserted to have via `rdf:type`.
    /// A node may have several asserted types; applicability only needs one
    /// that is (transitively) the shape's target class, so every asserted
    /// type is checked.
    fn asserted_types(&self, node: Id) -> &[Id] {
        self.store.objects_of(node, self.rdf_type)
    }

    fn has_applicable_type(&self, node: Id, target_class: Id) -> bool {
        self.asserted_types(node)
            .iter()
            .any(|&t| self.owl.is_subclass(t, target_class))
    }

    /// Validate `node` against `shape_id`. Never short-circuits: every
    /// declared constraint is checked and all violations are collected.
    pub fn validate_node(&self, shape_id: Id, node: Id) -> Result<ShaclReport> {
        let shape = self.shapes.get(&shape_id).ok_or(EngineError::UnknownShape(shape_id))?;

        if !self.has_applicable_type(node, shape.target_class) {
            return Ok(ShaclReport::not_applicable());
        }

        let mut violations = Vec::new();
        for constraint in &shape.constraints {
            self.check_constraint(node, constraint, &mut violations);
        }

        Ok(ShaclReport { applicable: true, violations })
    }

    /// Ask-style mode (§4.6): stop at the first violation instead of
    /// collecting the full report.
    pub fn conforms(&self, shape_id: Id, node: Id) -> Result<bool> {
        let shape = self.shapes.get(&shape_id).ok_or(EngineError::UnknownShape(shape_id))?;
        if !self.has_applicable_type(node, shape.target_class) {
            return Ok(true);
        }
        let mut scratch = Vec::new();
        for constraint in &shape.constraints {
            self.check_constraint(node, constraint, &mut scratch);
            if !scratch.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn check_constraint(&self, node: Id, constraint: &PropertyConstraint, out: &mut Vec<ViolationKind>) {
        let p = constraint.predicate;

        if let Some(min) = constraint.min_count {
            // min_count == 0 is trivially satisfied (a count is never
            // negative); min_count == 1 is answered by a single bit test.
            let satisfied = if min == 0 {
                true
            } else if min == 1 {
                self.store.ask_pattern(node, p, 0)
            } else {
                self.store.objects_of(node, p).len() as u32 >= min
            };
            if !satisfied {
                let actual = self.store.objects_of(node, p).len() as u32;
                out.push(ViolationKind::MinCount { predicate: p, required: min, actual });
            }
        }

        if let Some(max) = constraint.max_count {
            let actual = self.store.objects_of(node, p).len() as u32;
            let satisfied = if max == 1 {
                actual <= 1
            } else {
                actual <= max
            };
            if !satisfied {
                out.push(ViolationKind::MaxCount { predicate: p, allowed: max, actual });
            }
        }

        if let Some(expected_class) = constraint.class {
            for &object in self.store.objects_of(node, p) {
                if !self.owl.is_subclass_via(object, expected_class, self.rdf_type, self.store) {
                    out.push(ViolationKind::Class { predicate: p, expected_class, object });
                }
            }
        }

        if let Some(expected_datatype) = constraint.datatype {
            for &object in self.store.objects_of(node, p) {
                if self.datatypes.get(object) != Some(expected_datatype) {
                    out.push(ViolationKind::Datatype { predicate: p, expected_datatype, object });
                }
            }
        }
    }
}

impl OwlClosure {
    /// Convenience used by `class` constraint checks: is `object`'s
    /// asserted type a subclass of `expected_class`?
    fn is_subclass_via(&self, object: Id, expected_class: Id, rdf_type: Id, store: &TripleStore) -> bool {
        store
            .objects_of(object, rdf_type)
            .iter()
            .any(|&t| self.is_subclass(t, expected_class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSON: Id = 1;
    const ALICE: Id = 2;
    const CAROL: Id = 3;
    const RDF_TYPE: Id = 4;
    const NAME: Id = 5;
    const NAME_LIT: Id = 6;

    fn setup() -> (TripleStore, OwlClosure, DatatypeTags, HashMap<Id, Shape>) {
        let mut store = TripleStore::new();
        store.add_triple(ALICE, RDF_TYPE, PERSON).unwrap();
        store.add_triple(ALICE, NAME, NAME_LIT).unwrap();
        store.add_triple(CAROL, RDF_TYPE, PERSON).unwrap();

        let mut owl = OwlClosure::new();
        owl.declare_subclass(PERSON, PERSON);
        owl.materialize();

        let datatypes = DatatypeTags::new();

        let mut shapes = HashMap::new();
        let shape_id: Id = 100;
        shapes.insert(
            shape_id,
            Shape::new(PERSON).with_constraint(PropertyConstraint::new(NAME).with_min_count(1)),
        );

        (store, owl, datatypes, shapes)
    }

    #[test]
    fn s4_min_count_one_conforms_when_property_present() {
        let (store, owl, datatypes, shapes) = setup();
        let evaluator = ShaclEvaluator::new(&store, &owl, &datatypes, RDF_TYPE, &shapes);
        let report = evaluator.validate_node(100, ALICE).unwrap();
        assert!(report.applicable);
        assert!(report.conforms());
    }

    #[test]
    fn s4_min_count_one_violation_when_property_absent() {
        let (store, owl, datatypes, shapes) = setup();
        let evaluator = ShaclEvaluator::new(&store, &owl, &datatypes, RDF_TYPE, &shapes);
        let report = evaluator.validate_node(100, CAROL).unwrap();
        assert!(report.applicable);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(
            report.violations[0],
            ViolationKind::MinCount { predicate: NAME, required: 1, actual: 0 }
        );
    }

    #[test]
    fn min_count_zero_is_always_satisfied_even_when_the_property_is_absent() {
        let (store, owl, datatypes, mut shapes) = setup();
        shapes.insert(
            300,
            Shape::new(PERSON).with_constraint(PropertyConstraint::new(NAME).with_min_count(0)),
        );
        let evaluator = ShaclEvaluator::new(&store, &owl, &datatypes, RDF_TYPE, &shapes);
        // CAROL has no ex:name triple, so min_count 1 would violate; min_count 0 must not.
        let report = evaluator.validate_node(300, CAROL).unwrap();
        assert!(report.conforms());
    }

    #[test]
    fn node_without_applicable_type_is_not_applicable() {
        let (store, owl, datatypes, shapes) = setup();
        let evaluator = ShaclEvaluator::new(&store, &owl, &datatypes, RDF_TYPE, &shapes);
        let untyped_node: Id = 999;
        let report = evaluator.validate_node(100, untyped_node).unwrap();
        assert!(!report.applicable);
        assert!(report.conforms());
    }

    #[test]
    fn unknown_shape_surfaces_as_error() {
        let (store, owl, datatypes, shapes) = setup();
        let evaluator = ShaclEvaluator::new(&store, &owl, &datatypes, RDF_TYPE, &shapes);
        assert_eq!(evaluator.validate_node(404, ALICE), Err(EngineError::UnknownShape(404)));
    }

    #[test]
    fn max_count_one_is_violated_by_a_second_value() {
        let (mut store, owl, datatypes, mut shapes) = setup();
        store.add_triple(ALICE, NAME, 77).unwrap();
        shapes.insert(
            200,
            Shape::new(PERSON).with_constraint(PropertyConstraint::new(NAME).with_max_count(1)),
        );
        let evaluator = ShaclEvaluator::new(&store, &owl, &datatypes, RDF_TYPE, &shapes);
        let report = evaluator.validate_node(200, ALICE).unwrap();
        assert_eq!(report.violations.len(), 1);
        assert!(matches!(report.violations[0], ViolationKind::MaxCount { actual: 2, allowed: 1, .. }));
    }

    #[test]
    fn conforms_mode_short_circuits_on_first_violation() {
        let (store, owl, datatypes, shapes) = setup();
        let evaluator = ShaclEvaluator::new(&store, &owl, &datatypes, RDF_TYPE, &shapes);
        assert!(!evaluator.conforms(100, CAROL).unwrap());
        assert!(evaluator.conforms(100, ALICE).unwrap());
    }
}
