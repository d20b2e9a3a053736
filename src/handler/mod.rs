//! Constraint handlers (§4.2): pluggable feasibility, separation, presolve,
//! and branching-candidate logic, one implementation per constraint class.

pub mod linear;
pub mod quadratic;

use crate::common::VarId;
use crate::cutman::CutManager;
use crate::model::{Relaxation, Solution, SolutionPool};
use crate::modification::ModLog;
use crate::node::Node;

/// Outcome of [`Handler::separate`] (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparationStatus {
    /// Nothing material changed; the relaxation solution stands.
    Continue,
    /// The handler materially altered the relaxation; it must be re-solved.
    Resolve,
    /// No child of this node can improve on the incumbent; prune.
    Prune,
}

/// A branching candidate proposed by a handler (§4.2).
#[derive(Debug, Clone, Copy)]
pub struct BranchingCandidate {
    pub var: VarId,
    pub score: f64,
}

/// Result of [`Handler::is_feasible`].
#[derive(Debug, Clone, Copy)]
pub struct FeasibilityResult {
    pub feasible: bool,
    pub should_prune: bool,
    pub infeasibility_measure: f64,
}

/// The capability set every constraint handler implements (§4.2). Handlers
/// own the modifications they push into a node's mod log: the node, not
/// the handler, is responsible for eventually undoing them.
pub trait Handler {
    fn name(&self) -> &str;

    /// Checks `sol` against the constraints this handler owns.
    fn is_feasible(&self, sol: &Solution, rel: &Relaxation) -> FeasibilityResult;

    /// Generates cuts/modifications against the current relaxation
    /// solution at `node`, appending to `mods`. Cuts worth remembering
    /// past this node are also registered with `cut_man`.
    fn separate(
        &mut self,
        sol: &Solution,
        node: &Node,
        rel: &Relaxation,
        mods: &mut ModLog,
        cut_man: &mut dyn CutManager,
    ) -> SeparationStatus;

    /// Global, pre-tree tightening. Appends modifications to `mods`;
    /// returns `true` if anything changed.
    fn presolve(&mut self, rel: &Relaxation, mods: &mut ModLog) -> bool;

    /// Node-local tightening (bound propagation etc). Returns `true` if
    /// the node is proven infeasible.
    fn presolve_node(&mut self, rel: &Relaxation, node: &Node, mods: &mut ModLog) -> bool;

    /// Branching candidates scored by this handler's local violation
    /// measure, appended to `cands`.
    fn branching_candidates(&self, rel: &Relaxation, sol: &Solution, cands: &mut Vec<BranchingCandidate>);

    fn write_stats(&self) -> String;
}
