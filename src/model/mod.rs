//! The entity store (§3): variables, constraints, function graphs, the
//! original problem, its relaxation, and solutions.

pub mod cgraph;
pub mod constraint;
pub mod problem;
pub mod relaxation;
pub mod solution;
pub mod variable;

pub use cgraph::{CGraph, LinTerm, QuadTerm};
pub use constraint::Constraint;
pub use problem::{Problem, ProblemSize, Sense};
pub use relaxation::Relaxation;
pub use solution::{FeasibilityTag, Solution, SolutionPool};
pub use variable::{VarType, Variable};
