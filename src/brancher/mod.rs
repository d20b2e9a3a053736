//! Branchers (§4.3): candidate selection and branch construction.

pub mod lexicographic;
pub mod maxviolation;
pub mod reliability;

use crate::common::VarId;
use crate::engine::Engine;
use crate::handler::BranchingCandidate;
use crate::model::{Relaxation, Solution, SolutionPool};
use crate::modification::ModLog;
use crate::node::Node;

/// Outcome of [`Brancher::find_branches`] (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrancherStatus {
    NotModifiedByBrancher,
    ModifiedByBrancher,
    PrunedByBrancher,
}

/// One child's share of a branch: the modifications that, applied to the
/// parent's relaxation, produce this child (§3 Branch), plus the
/// candidate/direction that produced it so the driver can feed
/// [`Brancher::update_after_solve`] once the child is resolved.
#[derive(Debug, Clone, Default)]
pub struct BranchArm {
    pub mods: ModLog,
    pub var: Option<VarId>,
    pub went_up: bool,
}

/// A branch: the ordered set of child arms produced for one candidate.
#[derive(Debug, Clone, Default)]
pub struct Branches {
    pub arms: Vec<BranchArm>,
}

impl Branches {
    pub fn two_way(var: VarId, down: ModLog, up: ModLog) -> Self {
        Branches {
            arms: vec![
                BranchArm { mods: down, var: Some(var), went_up: false },
                BranchArm { mods: up, var: Some(var), went_up: true },
            ],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }
}

/// Builds the canonical floor/ceiling two-way branch for an integer
/// candidate variable at its current relaxed value (shared by all three
/// stock branchers).
pub fn floor_ceil_branch(rel: &Relaxation, var: VarId, value: f64) -> Branches {
    let (lb, ub) = rel.var(var).bounds();
    let floor = value.floor();
    let ceil = value.ceil();
    let mut down = ModLog::new();
    down.push(crate::modification::Modification::BoundChg {
        var,
        old_lb: lb,
        old_ub: ub,
        new_lb: lb,
        new_ub: floor,
    });
    let mut up = ModLog::new();
    up.push(crate::modification::Modification::BoundChg {
        var,
        old_lb: lb,
        old_ub: ub,
        new_lb: ceil,
        new_ub: ub,
    });
    Branches::two_way(var, down, up)
}

/// Builds a two-way bisection split (`[lb,value]` / `[value,ub]`) for a
/// continuous candidate. Unlike [`floor_ceil_branch`], this keeps the
/// partition complete: a continuous variable at a fractional value has no
/// integrality gap to exploit, so the children must share the single point
/// `value` as their common boundary rather than dropping the open interval
/// between floor and ceil.
pub fn bisect_branch(rel: &Relaxation, var: VarId, value: f64) -> Branches {
    let (lb, ub) = rel.var(var).bounds();
    let mut down = ModLog::new();
    down.push(crate::modification::Modification::BoundChg {
        var,
        old_lb: lb,
        old_ub: ub,
        new_lb: lb,
        new_ub: value,
    });
    let mut up = ModLog::new();
    up.push(crate::modification::Modification::BoundChg {
        var,
        old_lb: lb,
        old_ub: ub,
        new_lb: value,
        new_ub: ub,
    });
    Branches::two_way(var, down, up)
}

/// Dispatches to [`floor_ceil_branch`] for discrete candidates and
/// [`bisect_branch`] for continuous ones (§4.3). Every stock brancher
/// selects its candidate first and must go through this rather than
/// assuming floor/ceil applies, since spatial-branching candidates from
/// `handler::quadratic` are continuous.
pub fn branch_on(rel: &Relaxation, var: VarId, value: f64) -> Branches {
    if rel.var(var).vtype().is_discrete() {
        floor_ceil_branch(rel, var, value)
    } else {
        bisect_branch(rel, var, value)
    }
}

/// The capability set every brancher implements (§4.3).
pub trait Brancher {
    #[allow(clippy::too_many_arguments)]
    fn find_branches(
        &mut self,
        rel: &Relaxation,
        node: &Node,
        sol: &Solution,
        pool: &SolutionPool,
        candidates: &[BranchingCandidate],
        mods: &mut ModLog,
        engine: &mut dyn Engine,
    ) -> (BrancherStatus, Branches);

    /// Consumes the `(parent lb, child lb, var, direction)` tuple produced
    /// by one node's resolve, used by pseudo-cost based branchers.
    fn update_after_solve(&mut self, parent_lb: f64, child_lb: f64, var: VarId, went_up: bool);

    fn set_engine(&mut self, engine: &mut dyn Engine);
    fn set_thresh(&mut self, thresh: u32);
    fn set_max_depth(&mut self, depth: u32);
    fn get_iter_lim(&self) -> u32;
    fn write_stats(&self) -> String;
}
