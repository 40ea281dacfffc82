//! Compound target matching for remote administration.
//!
//! A controller addresses agents with target expressions such as
//! `G@os:Debian and ( web* or N@db ) and not S@10.9.0.0/16`. Each agent evaluates the expression
//! against its own identity, grains, and pillar data to decide whether it is being addressed.
//!
//! # Program flow
//!
//! 1. The agent loads its [config::Config], which supplies its identity, grains, pillar, and
//!    nodegroup definitions, and builds a [context::MatchContext] from it.
//!
//! 2. An [engine::EngineRegistry] maps each clause type (`G@`, `E@`, `S@`, ...) to a matcher.
//!    [engine::EngineRegistry::standard] provides the built-in engines.
//!
//! 3. [target::evaluate_target] tokenizes the expression, expands nodegroups, asks the registry
//!    for a verdict on every clause, and reduces the results to a single boolean.
//!    [target::compound_match] does the same but treats every failure as "no match".
//!
//! [target::match_fleet] evaluates one expression for many agents at once, which is mostly
//! useful on a controller that caches its agents' grains.

pub mod config;
pub mod context;
pub mod engine;
pub mod logger;
pub mod target;

#[doc(inline)]
pub use target::{compound_match, evaluate_target};
