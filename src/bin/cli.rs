//! substrate-cli: a thin demonstration harness over the Engine (§4.12).
//!
//! Not a parser — each subcommand either loads a `--dump` snapshot written by
//! the library's `persist::dump`, or builds a small inline fixture graph when
//! no dump is given, so the binary is exercisable with zero setup.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use knhk_substrate::engine::{Engine, EngineConfig};
use knhk_substrate::persist;
use knhk_substrate::shacl::{PropertyConstraint, Shape};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "substrate-cli")]
#[command(about = "Ask, validate, render, and gatekeep against a substrate Engine dump")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Snapshot file produced by `persist::dump`. Omit to use a small inline
    /// fixture graph (Alice knows Bob, Person/Employee/Manager hierarchy).
    #[arg(long, global = true)]
    dump: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an ask-pattern query over interned term text.
    Ask {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        predicate: Option<String>,
        #[arg(long)]
        object: Option<String>,
    },

    /// Validate a node against the built-in fixture's Person shape.
    Validate {
        /// Term text of the node to validate.
        node: String,
    },

    /// Compile and render a template against `--set name=value` pairs.
    Render {
        /// Template source, e.g. "Hello {{name}}!".
        template: String,
        #[arg(long = "set", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// Run the Gatekeeper over a trivial in-process ask-pattern loop.
    Gatekeeper {
        #[arg(long, default_value = "100000")]
        samples: u32,
    },
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{s}'"))
}

/// Build the inline fixture: Alice/Bob/knows plus a Person/Employee/Manager
/// hierarchy, mirroring S2/S3/S4 from the documented scenarios.
fn build_fixture() -> Result<Engine> {
    let mut engine = Engine::create(EngineConfig::default())?;
    let alice = engine.intern("ex:Alice")?;
    let bob = engine.intern("ex:Bob")?;
    let carol = engine.intern("ex:Carol")?;
    let knows = engine.intern("ex:knows")?;
    let name = engine.intern("ex:name")?;
    let person = engine.intern("ex:Person")?;
    let employee = engine.intern("ex:Employee")?;
    let manager = engine.intern("ex:Manager")?;
    let rdf_type = engine.rdf_type();

    engine.add_triple(alice, knows, bob)?;
    engine.add_triple(alice, rdf_type, person)?;
    engine.add_triple(carol, rdf_type, person)?;
    let alice_name = engine.intern("\"Alice Smith\"")?;
    engine.add_triple(alice, name, alice_name)?;

    engine.declare_subclass(employee, person)?;
    engine.declare_subclass(manager, employee)?;
    engine.materialize_closure()?;

    engine.declare_shape(
        1,
        Shape::new(person).with_constraint(PropertyConstraint::new(name).with_min_count(1)),
    );

    Ok(engine)
}

fn load_engine(dump: &Option<PathBuf>) -> Result<Engine> {
    match dump {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading dump file {}", path.display()))?;
            persist::restore(&bytes).context("restoring engine from dump")
        }
        None => build_fixture(),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ask { subject, predicate, object } => {
            let engine = load_engine(&cli.dump)?;
            let resolve_or_wildcard = |engine: &Engine, text: &Option<String>| -> Result<u32> {
                match text {
                    Some(t) => engine
                        .resolve_by_text(t)
                        .with_context(|| format!("'{t}' is not interned in this engine")),
                    None => Ok(0),
                }
            };
            let s = resolve_or_wildcard(&engine, &subject)?;
            let p = resolve_or_wildcard(&engine, &predicate)?;
            let o = resolve_or_wildcard(&engine, &object)?;
            println!("{}", engine.ask_pattern(s, p, o));
        }

        Commands::Validate { node } => {
            let engine = load_engine(&cli.dump)?;
            let node_id = engine
                .resolve_by_text(&node)
                .with_context(|| format!("'{node}' is not interned in this engine"))?;
            let report = engine.shacl_validate_node(1, node_id)?;
            println!("applicable: {}", report.applicable);
            println!("conforms: {}", report.conforms());
            for violation in &report.violations {
                println!("  violation: {violation:?}");
            }
        }

        Commands::Render { template, vars } => {
            let compiled = knhk_substrate::template::compile(&template)?;
            let mut ctx = knhk_substrate::template::VarContext::new();
            for (name, value) in &vars {
                ctx.set_var(name, value.as_bytes())?;
            }
            let mut out = vec![0u8; compiled.max_output_length()];
            let len = compiled.render(&ctx, &mut out)?;
            println!("{}", String::from_utf8_lossy(&out[..len]));
        }

        Commands::Gatekeeper { samples } => {
            let engine = Engine::create(EngineConfig {
                gatekeeper_sample_size: samples,
                ..Default::default()
            })?;
            let report = engine.gatekeeper_run(|| {
                std::hint::black_box(engine.ask_pattern(1, 2, 3));
            })?;
            println!("p95 = {:.3} cycles", report.capability.p95);
            println!("sigma_level = {:.3}", report.capability.sigma_level);
            println!("cpk = {:.3}", report.capability.cpk);
            println!("dpm = {:.3}", report.capability.dpm);
            println!("throughput = {:.3} MOPS", report.capability.throughput_mops);
            println!("verdict = {}", if report.verdict.passed { "PASS" } else { "FAIL" });
        }
    }

    Ok(())
}
