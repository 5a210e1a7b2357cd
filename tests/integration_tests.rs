// knhk-substrate: end-to-end coverage of the Engine facade and the
// documented scenarios (S1-S6), exercised through the public API only.

use knhk_substrate::engine::{Engine, EngineConfig};
use knhk_substrate::error::EngineError;
use knhk_substrate::gatekeeper::Gatekeeper;
use knhk_substrate::owl::PropertyFlags;
use knhk_substrate::persist;
use knhk_substrate::shacl::{PropertyConstraint, Shape};
use knhk_substrate::template::{compile, VarContext};
use proptest::prelude::*;
use std::time::Duration;

#[test]
fn s1_intern_resolve_round_trip() {
    let mut engine = Engine::create(EngineConfig { interner_buckets: 1024, ..Default::default() }).unwrap();
    let alice = engine.intern("ex:Alice").unwrap();
    let bob = engine.intern("ex:Bob").unwrap();
    let alice_again = engine.intern("ex:Alice").unwrap();

    assert_eq!(bob, alice + 1);
    assert_eq!(alice_again, alice);
    assert_eq!(engine.resolve(alice).unwrap(), "ex:Alice");
    assert_eq!(engine.resolve(0), Err(EngineError::UnknownId(0)));
}

#[test]
fn s2_ask_pattern_coverage() {
    let mut engine = Engine::create(EngineConfig::default()).unwrap();
    let alice = engine.intern("ex:Alice").unwrap();
    let knows = engine.intern("ex:knows").unwrap();
    let bob = engine.intern("ex:Bob").unwrap();
    engine.add_triple(alice, knows, bob).unwrap();

    assert!(engine.ask_pattern(alice, knows, bob));
    assert!(engine.ask_pattern(alice, knows, 0));
    assert!(engine.ask_pattern(0, knows, bob));
    assert!(!engine.ask_pattern(bob, knows, bob));
    let likes = engine.intern("ex:likes").unwrap();
    assert!(!engine.ask_pattern(alice, likes, bob));
}

#[test]
fn s3_transitive_closure() {
    let mut engine = Engine::create(EngineConfig::default()).unwrap();
    let person = engine.intern("ex:Person").unwrap();
    let employee = engine.intern("ex:Employee").unwrap();
    let manager = engine.intern("ex:Manager").unwrap();

    engine.declare_subclass(employee, person).unwrap();
    engine.declare_subclass(manager, employee).unwrap();
    assert!(!engine.is_subclass(manager, person));

    engine.materialize_closure().unwrap();
    assert!(engine.is_subclass(manager, person));
    assert!(engine.is_subclass(manager, manager));
}

#[test]
fn s4_shacl_min_count_one() {
    let mut engine = Engine::create(EngineConfig::default()).unwrap();
    let person = engine.intern("ex:Person").unwrap();
    let name = engine.intern("ex:name").unwrap();
    let alice = engine.intern("ex:Alice").unwrap();
    let carol = engine.intern("ex:Carol").unwrap();
    let alice_name = engine.intern("\"Alice Smith\"").unwrap();
    let rdf_type = engine.rdf_type();

    engine.add_triple(alice, rdf_type, person).unwrap();
    engine.add_triple(alice, name, alice_name).unwrap();
    engine.add_triple(carol, rdf_type, person).unwrap();

    engine.declare_shape(1, Shape::new(person).with_constraint(PropertyConstraint::new(name).with_min_count(1)));

    let alice_report = engine.shacl_validate_node(1, alice).unwrap();
    assert_eq!(alice_report.violations.len(), 0);

    let carol_report = engine.shacl_validate_node(1, carol).unwrap();
    assert_eq!(carol_report.violations.len(), 1);
}

#[test]
fn s5_template_compile_and_render() {
    let compiled = compile("Hello {{name}} from {{org}}!").unwrap();
    let mut ctx = VarContext::new();
    ctx.set_var("name", b"BitActor").unwrap();
    ctx.set_var("org", b"Fifth Epoch").unwrap();

    let mut out = [0u8; 64];
    let len = compiled.render(&ctx, &mut out).unwrap();
    assert_eq!(&out[..len], b"Hello BitActor from Fifth Epoch!");
    assert_eq!(len, 32);

    let mut unset_ctx = VarContext::new();
    unset_ctx.set_var("name", b"BitActor").unwrap();
    let len = compiled.render(&unset_ctx, &mut out).unwrap();
    assert_eq!(&out[..len], b"Hello BitActor from !");
}

#[test]
fn s6_gatekeeper_ctq_pass() {
    let samples: Vec<f64> =
        (0..1_000_000).map(|i| 3.0 + 0.4 * (if i % 2 == 0 { 1.0 } else { -1.0 })).collect();
    let report = Gatekeeper::run_over_samples(&samples, Duration::from_millis(50)).unwrap();

    assert!(report.capability.p95 <= 7.0);
    assert!(report.capability.sigma_level >= 4.0);
    assert!(report.capability.throughput_mops >= 10.0);
    assert!(report.verdict.passed);
}

#[test]
fn dump_and_restore_preserve_every_query_surface() {
    let mut engine = Engine::create(EngineConfig::default()).unwrap();
    let person = engine.intern("ex:Person").unwrap();
    let employee = engine.intern("ex:Employee").unwrap();
    let knows = engine.intern("ex:knows").unwrap();
    let alice = engine.intern("ex:Alice").unwrap();
    let bob = engine.intern("ex:Bob").unwrap();
    let rdf_type = engine.rdf_type();

    engine.add_triple(alice, knows, bob).unwrap();
    engine.add_triple(alice, rdf_type, employee).unwrap();
    engine.declare_subclass(employee, person).unwrap();
    engine.declare_property_flags(knows, PropertyFlags::SYMMETRIC);
    engine.materialize_closure().unwrap();

    let bytes = persist::dump(&engine).unwrap();
    let restored = persist::restore(&bytes).unwrap();

    assert!(restored.ask_pattern(alice, knows, bob));
    assert!(restored.is_subclass(employee, person));
    assert_eq!(restored.resolve(alice).unwrap(), "ex:Alice");
}

#[test]
fn unknown_shape_and_unknown_id_surface_as_errors_through_the_facade() {
    let mut engine = Engine::create(EngineConfig::default()).unwrap();
    let alice = engine.intern("ex:Alice").unwrap();
    assert_eq!(engine.shacl_validate_node(404, alice), Err(EngineError::UnknownShape(404)));
    assert_eq!(engine.resolve(999_999), Err(EngineError::UnknownId(999_999)));
}

proptest! {
    #[test]
    fn invariant_added_triples_are_always_askable(
        pairs in prop::collection::vec((1u32..50, 1u32..5, 1u32..50), 1..30)
    ) {
        let mut engine = Engine::create(EngineConfig::default()).unwrap();
        for &(s, p, o) in &pairs {
            engine.add_triple(s, p, o).unwrap();
        }
        for &(s, p, o) in &pairs {
            prop_assert!(engine.ask_pattern(s, p, o));
            prop_assert!(engine.ask_pattern(s, p, 0));
            prop_assert!(engine.ask_pattern(0, p, o));
        }
    }

    #[test]
    fn invariant_subclass_is_reflexive_after_closure(
        edges in prop::collection::vec((1u32..30, 1u32..30), 1..20)
    ) {
        let mut engine = Engine::create(EngineConfig::default()).unwrap();
        for &(child, parent) in &edges {
            if child != parent {
                engine.declare_subclass(child, parent).unwrap();
            }
        }
        engine.materialize_closure().unwrap();
        for &(child, parent) in &edges {
            prop_assert!(engine.is_subclass(child, child));
            prop_assert!(engine.is_subclass(parent, parent));
        }
    }
}
