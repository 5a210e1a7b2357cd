//! The Engine facade (§6): one lifecycle composing the interner, triple
//! store, OWL closure, SHACL evaluator, template engine, and Gatekeeper
//! behind the operations table in the external-interfaces section.

use crate::error::{EngineError, Result};
use crate::gatekeeper::{Gatekeeper, GatekeeperReport};
use crate::interner::{Id, Interner};
use crate::owl::{OwlClosure, PropertyFlags};
use crate::shacl::{DatatypeTags, Shape, ShaclEvaluator, ShaclReport};
use crate::store::TripleStore;
use crate::telemetry::set_telemetry_enabled;
use crate::template::{self, CompiledTemplate, VarContext};
use rustc_hash::FxHashMap;
use std::time::Duration;
use tracing::info;

/// Ambient configuration (§4.10): constructed directly or from `clap`-derived
/// CLI flags. The library itself never reads environment variables or
/// process-wide state beyond the telemetry enable flag it installs here.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub max_entities: u32,
    pub interner_buckets: u32,
    pub chatman_constant: u32,
    pub gatekeeper_sample_size: u32,
    pub telemetry_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_entities: 1024,
            interner_buckets: 1024,
            chatman_constant: 7,
            gatekeeper_sample_size: 1_000_000,
            telemetry_enabled: true,
        }
    }
}

/// The well-known `rdf:type` predicate id this Engine uses for SHACL target
/// applicability (§4.6). Callers intern their own IRI text for it; the
/// Engine just needs a stable id to check `asserted_types` against.
const RDF_TYPE_NAME: &str = "rdf:type";

/// One RDF graph plus its derived OWL closure, SHACL shapes, and compiled
/// templates, all reachable from a single handle.
pub struct Engine {
    config: EngineConfig,
    interner: Interner,
    store: TripleStore,
    owl: OwlClosure,
    shapes: FxHashMap<Id, Shape>,
    datatypes: DatatypeTags,
    rdf_type: Id,
    gatekeeper: Gatekeeper,
}

impl Engine {
    /// `engine_create(max_entities)` (§6). The only failure mode is a
    /// pathological configuration; in practice this never returns `Err`
    /// today, but keeps the `Result` surface so future allocation-backed
    /// construction can fail without an API break.
    pub fn create(config: EngineConfig) -> Result<Self> {
        set_telemetry_enabled(config.telemetry_enabled);
        let mut interner = Interner::with_capacity(config.interner_buckets);
        let rdf_type = interner.intern(RDF_TYPE_NAME)?;
        info!(max_entities = config.max_entities, "engine created");
        Ok(Self {
            config,
            interner,
            store: TripleStore::new(),
            owl: OwlClosure::new(),
            shapes: FxHashMap::default(),
            datatypes: DatatypeTags::new(),
            rdf_type,
            gatekeeper: Gatekeeper::new(config.gatekeeper_sample_size as usize, Duration::from_secs(30)),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// `intern(handle, bytes)` (§6).
    pub fn intern(&mut self, text: &str) -> Result<Id> {
        self.interner.intern(text)
    }

    /// Intern `text` and tag it with `datatype` (resolves open question #2:
    /// nothing tags a datatype implicitly, only this explicit entry point).
    pub fn intern_typed(&mut self, text: &str, datatype: Id) -> Result<Id> {
        let id = self.interner.intern(text)?;
        self.datatypes.set(id, datatype);
        Ok(id)
    }

    /// `resolve(handle, Id)` (§6).
    pub fn resolve(&self, id: Id) -> Result<&str> {
        self.interner.resolve(id)
    }

    /// Look up a term's id by its text without interning it, for callers
    /// (such as the CLI) that only want to query a known vocabulary.
    pub fn resolve_by_text(&self, text: &str) -> Result<Id> {
        self.interner
            .lookup(text)
            .ok_or_else(|| EngineError::InvalidArgument(format!("'{text}' is not interned")))
    }

    /// `add_triple(handle, s, p, o)` (§6).
    pub fn add_triple(&mut self, s: Id, p: Id, o: Id) -> Result<()> {
        self.store.add_triple(s, p, o)
    }

    /// `ask_pattern(handle, s, p, o)` (§6).
    pub fn ask_pattern(&self, s: Id, p: Id, o: Id) -> bool {
        self.store.ask_pattern(s, p, o)
    }

    /// `declare_subclass(handle, child, parent)` (§6). Invalidates any
    /// previously materialized closure — callers must call
    /// `materialize_closure` again before `is_subclass` reflects the edge.
    pub fn declare_subclass(&mut self, child: Id, parent: Id) -> Result<()> {
        if child == 0 {
            return Err(EngineError::InvalidId(child));
        }
        if parent == 0 {
            return Err(EngineError::InvalidId(parent));
        }
        self.owl.declare_subclass(child, parent);
        Ok(())
    }

    pub fn declare_property_flags(&mut self, property: Id, flags: PropertyFlags) {
        self.owl.declare_property_flags(property, flags);
    }

    /// `materialize_closure(handle)` (§6).
    pub fn materialize_closure(&mut self) -> Result<()> {
        self.owl.materialize();
        Ok(())
    }

    /// `is_subclass(handle, a, c)` (§6).
    pub fn is_subclass(&self, a: Id, c: Id) -> bool {
        self.owl.is_subclass(a, c)
    }

    pub fn declare_shape(&mut self, shape_id: Id, shape: Shape) {
        self.shapes.insert(shape_id, shape);
    }

    /// `shacl_validate_node(handle, shape_id, node_id)` (§6).
    pub fn shacl_validate_node(&self, shape_id: Id, node: Id) -> Result<ShaclReport> {
        let evaluator =
            ShaclEvaluator::new(&self.store, &self.owl, &self.datatypes, self.rdf_type, &self.shapes);
        evaluator.validate_node(shape_id, node)
    }

    pub fn shacl_conforms(&self, shape_id: Id, node: Id) -> Result<bool> {
        let evaluator =
            ShaclEvaluator::new(&self.store, &self.owl, &self.datatypes, self.rdf_type, &self.shapes);
        evaluator.conforms(shape_id, node)
    }

    /// `template_compile(bytes)` (§6). Stateless over the Engine; kept here
    /// only so callers have one import to reach for.
    pub fn template_compile(&self, source: &str) -> Result<CompiledTemplate> {
        template::compile(source)
    }

    /// `gatekeeper_run()` (§6), sampling `operation` the configured number
    /// of times.
    pub fn gatekeeper_run(&self, operation: impl FnMut()) -> Result<GatekeeperReport> {
        self.gatekeeper
            .run(operation)
            .map_err(|e| EngineError::InvalidArgument(e.to_string()))
    }

    pub(crate) fn interner(&self) -> &Interner {
        &self.interner
    }

    pub(crate) fn store(&self) -> &TripleStore {
        &self.store
    }

    pub(crate) fn owl(&self) -> &OwlClosure {
        &self.owl
    }

    pub(crate) fn shapes(&self) -> &FxHashMap<Id, Shape> {
        &self.shapes
    }

    pub fn rdf_type(&self) -> Id {
        self.rdf_type
    }
}

/// A standalone variable context for template rendering. The Engine does
/// not own these — each render site creates its own, per §5's thread-safety
/// rule that rendering needs a private buffer and context per thread.
pub fn new_var_context() -> VarContext {
    VarContext::new()
}
