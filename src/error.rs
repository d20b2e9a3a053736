//! Structured error types (§7).
//!
//! `InfeasibilityProven` and `LimitReached` are deliberately absent here:
//! the spec treats both as normal terminal statuses, never as errors, so
//! they live in [`crate::driver::SolveStatus`] instead.

use thiserror::Error;

use crate::common::{ConId, VarId};

/// Failure modes the core itself can produce.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The input problem is malformed or uses an unsupported construct.
    #[error("malformed problem: {0}")]
    Problem(String),

    /// The engine adapter crashed, returned an unrecognized status, or
    /// otherwise violated the `Engine` contract.
    #[error("engine failure on {context}: {message}")]
    Engine { context: String, message: String },

    /// An internal invariant that is expected to never fail did fail
    /// (unbounded relaxation, `ub < lb` after tightening, a child's bound
    /// regressing below its parent's by more than tolerance).
    #[error("numeric contract violated: {0}")]
    Numeric(String),

    /// A modification referenced a variable that does not exist in the
    /// target relaxation.
    #[error("unknown variable {0}")]
    UnknownVariable(VarId),

    /// A modification referenced a constraint that does not exist in the
    /// target relaxation.
    #[error("unknown constraint {0}")]
    UnknownConstraint(ConId),
}

pub type CoreResult<T> = Result<T, CoreError>;
