//! # disjunct
//!
//! `disjunct` is a branch-and-bound engine for mixed-integer nonlinear
//! programs (MINLPs). It does not contain an LP or NLP solver of its own;
//! instead it defines an [`Engine`](engine::Engine) trait that any such
//! solver plugs into, and drives the search around it: node selection,
//! presolve, bound tightening, separation, and branching are all handled
//! here, independently of which relaxation solver is in use.
//!
//! A small [`ReferenceEngine`](engine::reference::ReferenceEngine) is
//! included so the crate is usable end to end without an external solver,
//! but production deployments are expected to supply their own `Engine`
//! backed by a real LP/NLP package.
//!
//! ## Shape of a solve
//!
//! Four pieces come together to run a search:
//!
//! - a [`Problem`](model::Problem): variables, constraints, objective;
//! - one or more [`Handler`](handler::Handler)s: pluggable constraint
//!   families (linear rows, quadratic terms, ...) each responsible for
//!   feasibility checks, cutting planes, and branching candidates over its
//!   own slice of the constraint set;
//! - a [`Brancher`](brancher::Brancher): turns a fractional candidate into
//!   child relaxations;
//! - an [`Engine`](engine::Engine): solves the relaxation at each node.
//!
//! These are assembled into a [`Processor`](processor::Processor), which in
//! turn is driven by a [`Driver`](driver::Driver) that owns the search tree
//! and the incumbent pool.
//!
//! ## Quick example
//!
//! A single integer variable constrained to be at least `2.3`, minimized.
//! The optimal integer solution is `3`.
//!
//! ```ignore
//! use disjunct::brancher::lexicographic::LexicoBrancher;
//! use disjunct::common::{ConId, VarId};
//! use disjunct::engine::reference::ReferenceEngine;
//! use disjunct::engine::Engine;
//! use disjunct::handler::linear::{LinearHandler, LinearHandlerConfig};
//! use disjunct::handler::Handler;
//! use disjunct::model::{CGraph, Constraint, LinTerm, Problem, Relaxation, Sense, VarType, Variable};
//! use disjunct::driver::Driver;
//! use disjunct::options::SolverOptions;
//! use disjunct::processor::Processor;
//!
//! let vars = vec![Variable::new(VarId(0), VarType::Integer, 0.0, 10.0)];
//! let cons = vec![Constraint::new(
//!     ConId(0),
//!     CGraph::linear(vec![LinTerm { var: VarId(0), coef: 1.0 }], 0.0),
//!     2.3,
//!     f64::INFINITY,
//! )];
//! let obj = Constraint::new(
//!     ConId(1),
//!     CGraph::linear(vec![LinTerm { var: VarId(0), coef: 1.0 }], 0.0),
//!     f64::NEG_INFINITY,
//!     f64::INFINITY,
//! );
//! let problem = Problem::new(vars, cons, obj, Sense::Minimize);
//! let rel = Relaxation::relax_init_full(&problem);
//!
//! let opts = SolverOptions::default();
//! let handlers: Vec<Box<dyn Handler>> = vec![Box::new(LinearHandler::new(LinearHandlerConfig::from_options(&opts)))];
//! let brancher = Box::new(LexicoBrancher::new());
//! let engine: Box<dyn Engine> = Box::new(ReferenceEngine::new());
//! let processor = Processor::new(handlers, brancher, engine, &opts);
//! let mut driver = Driver::new(processor, opts);
//!
//! let (report, pool) = driver.solve(rel);
//! assert!(pool.best().is_some());
//! ```
//!
//! ## Non-goals
//!
//! This crate does not parse `.nl`/`.mps` files, does not implement an
//! LP/NLP solver, and does not parallelize the search tree across threads
//! or processes. See the design notes in the repository root for the
//! rationale behind these boundaries.

pub mod brancher;
pub mod common;
pub mod cutman;
pub mod driver;
pub mod engine;
pub mod error;
pub mod handler;
pub mod model;
pub mod modification;
pub mod node;
pub mod options;
pub mod processor;
pub mod stats;
pub mod tree;
