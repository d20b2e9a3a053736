//! Shared identifiers and tolerance defaults used across the crate.

use std::fmt;

/// Index of a [`crate::model::Variable`] within a [`crate::model::Problem`] or
/// [`crate::model::Relaxation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Index of a [`crate::model::Constraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConId(pub usize);

impl fmt::Display for ConId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Index of a [`crate::node::Node`] in the driver's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Default tolerance for deciding an integer variable's relaxed value is
/// fractional (§4.2.1).
pub const DEFAULT_INT_TOL: f64 = 1e-5;
/// Default absolute feasibility tolerance (§4.2.2 `aTol`).
pub const DEFAULT_ABS_TOL: f64 = 1e-6;
/// Default relative feasibility tolerance (§4.2.2 `rTol`).
pub const DEFAULT_REL_TOL: f64 = 1e-6;
/// Default bound-change significance threshold (§4.2.2 `bTol`).
pub const DEFAULT_BOUND_TOL: f64 = 1e-7;
/// Default "bounds are equal" tolerance (§4.2.2 `vTol`).
pub const DEFAULT_VTOL: f64 = 1e-9;
/// Default constraint-violation tolerance (§4.2.2 `eTol`).
pub const DEFAULT_ETOL: f64 = 1e-6;

/// Returns `true` when `a` and `b` agree within the larger of an absolute and
/// a relative tolerance, the pattern used throughout the bound/gap checks in
/// §4.4/§4.5/§8.
pub fn within_tol(a: f64, b: f64, abs_tol: f64, rel_tol: f64) -> bool {
    (a - b).abs() <= abs_tol.max(rel_tol * a.abs().max(b.abs()))
}
