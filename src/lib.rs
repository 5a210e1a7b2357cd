// knhk-substrate: deterministic, cycle-budgeted semantic substrate
// Triple store, OWL-style closure, SHACL-like validation, and a precompiled
// template renderer, all accountable to the Chatman constant via Gatekeeper.

#![warn(clippy::all)]
#![warn(rust_2018_idioms)]
// Unsafe code is isolated to arena.rs (raw bump-pointer allocation) and
// telemetry.rs (platform cycle counters), each documented with a safety note.

//! # knhk-substrate
//!
//! The core semantic engine: intern terms into dense ids, assert triples,
//! answer ask-pattern queries and OWL subclass closure, validate SHACL-like
//! shapes, and render precompiled templates — all measured against a 7-cycle
//! hot-path budget via the Gatekeeper.
//!
//! ## Key components
//!
//! - **Interner**: dense 32-bit `Id`s for UTF-8 text.
//! - **TripleStore**: predicate/object bitset indexes over `(s, p, o)` facts.
//! - **OwlClosure**: transitive subclass closure and property characteristics.
//! - **ShaclEvaluator**: target-class applicability and constraint checking.
//! - **PatternQuery**: ask-pattern plus bitset enumerations and a SIMD-style
//!   column filter.
//! - **CompiledTemplate**: compile-once/render-many text templates.
//! - **Gatekeeper**: statistical p95/sigma-level/Cpk/DPM measurement against
//!   the Chatman constant.
//!
//! ## Example
//!
//! ```rust
//! use knhk_substrate::engine::{Engine, EngineConfig};
//!
//! let mut engine = Engine::create(EngineConfig::default()).unwrap();
//! let alice = engine.intern("ex:Alice").unwrap();
//! let knows = engine.intern("ex:knows").unwrap();
//! let bob = engine.intern("ex:Bob").unwrap();
//! engine.add_triple(alice, knows, bob).unwrap();
//! assert!(engine.ask_pattern(alice, knows, bob));
//! ```

pub mod arena;
pub mod bitset;
pub mod engine;
pub mod error;
pub mod gatekeeper;
pub mod interner;
pub mod owl;
pub mod persist;
pub mod query;
pub mod shacl;
pub mod store;
pub mod telemetry;
pub mod template;

pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, Result};
pub use interner::Id;

/// Common imports for consumers that just want to stand up an `Engine`.
pub mod prelude {
    pub use crate::engine::{Engine, EngineConfig};
    pub use crate::error::{EngineError, Result};
    pub use crate::interner::Id;
    pub use crate::owl::PropertyFlags;
    pub use crate::query::{Comparison, PatternQuery};
    pub use crate::shacl::{PropertyConstraint, Shape};
    pub use crate::template::{compile as compile_template, CompiledTemplate, VarContext};
}
