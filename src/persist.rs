//! Dump/restore an [`Engine`] to a `serde` + `bincode` snapshot (§4.11).
//!
//! The format carries the interner table, the triple list, the declared OWL
//! edges and property flags, and the shape registry. It is not guaranteed
//! bit-stable across versions: `restore` replays the same invariants as a
//! fresh load followed by `materialize_closure`, it does not memcpy a frozen
//! bit matrix.

use crate::engine::{Engine, EngineConfig};
use crate::error::{EngineError, Result};
use crate::interner::Id;
use crate::owl::PropertyFlags;
use crate::shacl::Shape;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TripleRecord {
    s: Id,
    p: Id,
    o: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SubclassEdge {
    child: Id,
    parent: Id,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PropertyFlagRecord {
    property: Id,
    bits: u8,
}

/// The serializable payload (§4.11): interner table, triple list, class
/// closure edges, property flags, and shape registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    config: EngineConfigRecord,
    interner_entries: Vec<(Id, String)>,
    triples: Vec<TripleRecord>,
    subclass_edges: Vec<SubclassEdge>,
    property_flags: Vec<PropertyFlagRecord>,
    shapes: Vec<(Id, Shape)>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct EngineConfigRecord {
    max_entities: u32,
    interner_buckets: u32,
    chatman_constant: u32,
    gatekeeper_sample_size: u32,
    telemetry_enabled: bool,
}

impl From<&EngineConfig> for EngineConfigRecord {
    fn from(c: &EngineConfig) -> Self {
        Self {
            max_entities: c.max_entities,
            interner_buckets: c.interner_buckets,
            chatman_constant: c.chatman_constant,
            gatekeeper_sample_size: c.gatekeeper_sample_size,
            telemetry_enabled: c.telemetry_enabled,
        }
    }
}

impl From<EngineConfigRecord> for EngineConfig {
    fn from(r: EngineConfigRecord) -> Self {
        Self {
            max_entities: r.max_entities,
            interner_buckets: r.interner_buckets,
            chatman_constant: r.chatman_constant,
            gatekeeper_sample_size: r.gatekeeper_sample_size,
            telemetry_enabled: r.telemetry_enabled,
        }
    }
}

/// Build a `Snapshot` for `engine` and encode it with `bincode`.
pub fn dump(engine: &Engine) -> Result<Vec<u8>> {
    let interner_entries =
        engine.interner().entries().map(|(id, s)| (id, s.to_string())).collect();
    let triples = engine
        .store()
        .iter_triples()
        .map(|t| TripleRecord { s: t.s, p: t.p, o: t.o })
        .collect();
    let subclass_edges = engine
        .owl()
        .edges()
        .iter()
        .map(|&(child, parent)| SubclassEdge { child, parent })
        .collect();
    let property_flags = engine
        .owl()
        .property_flags()
        .iter()
        .map(|(&property, &flags)| PropertyFlagRecord { property, bits: flags.bits() })
        .collect();
    let shapes = engine.shapes().iter().map(|(&id, shape)| (id, shape.clone())).collect();

    let snapshot = Snapshot {
        config: EngineConfigRecord::from(engine.config()),
        interner_entries,
        triples,
        subclass_edges,
        property_flags,
        shapes,
    };

    bincode::serialize(&snapshot).map_err(|e| EngineError::InvalidArgument(e.to_string()))
}

/// Decode a `bincode`-encoded `Snapshot` and rebuild an `Engine` from it,
/// replaying triples, subclass edges, and closure materialization.
pub fn restore(bytes: &[u8]) -> Result<Engine> {
    let snapshot: Snapshot =
        bincode::deserialize(bytes).map_err(|e| EngineError::InvalidArgument(e.to_string()))?;

    let config = EngineConfig::from(snapshot.config);
    let mut engine = Engine::create(config)?;

    // Reinterning in minting order reproduces the original id assignment;
    // the rdf:type id the fresh Engine minted at `create` is entry 1 in most
    // snapshots too, since it was also the first thing the original interned.
    for (expected_id, text) in &snapshot.interner_entries {
        let id = engine.intern(text)?;
        if id != *expected_id {
            return Err(EngineError::InvalidArgument(format!(
                "interner replay produced id {id} for '{text}', expected {expected_id}"
            )));
        }
    }

    for t in &snapshot.triples {
        engine.add_triple(t.s, t.p, t.o)?;
    }

    for edge in &snapshot.subclass_edges {
        engine.declare_subclass(edge.child, edge.parent)?;
    }
    for record in &snapshot.property_flags {
        if let Some(flags) = PropertyFlags::from_bits(record.bits) {
            engine.declare_property_flags(record.property, flags);
        }
    }
    engine.materialize_closure()?;

    for (id, shape) in snapshot.shapes {
        engine.declare_shape(id, shape);
    }

    Ok(engine)
}
