//! Maximum-violation brancher (§4.3): picks the candidate with the largest
//! local violation, ties broken by lowest variable id.

use crate::common::VarId;
use crate::engine::Engine;
use crate::handler::BranchingCandidate;
use crate::model::{Relaxation, Solution, SolutionPool};
use crate::modification::ModLog;
use crate::node::Node;

use super::{branch_on, BrancherStatus, Branches};

#[derive(Debug, Default)]
pub struct MaxViolationBrancher {
    iter_lim: u32,
}

impl MaxViolationBrancher {
    pub fn new() -> Self {
        MaxViolationBrancher { iter_lim: 0 }
    }
}

impl super::Brancher for MaxViolationBrancher {
    fn find_branches(
        &mut self,
        rel: &Relaxation,
        _node: &Node,
        sol: &Solution,
        _pool: &SolutionPool,
        candidates: &[BranchingCandidate],
        _mods: &mut ModLog,
        _engine: &mut dyn Engine,
    ) -> (BrancherStatus, Branches) {
        let Some(best) = candidates
            .iter()
            .max_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap()
                    .then(b.var.0.cmp(&a.var.0))
            })
        else {
            return (BrancherStatus::PrunedByBrancher, Branches::default());
        };
        let value = sol.value(best.var);
        (BrancherStatus::NotModifiedByBrancher, branch_on(rel, best.var, value))
    }

    fn update_after_solve(&mut self, _parent_lb: f64, _child_lb: f64, _var: VarId, _went_up: bool) {}

    fn set_engine(&mut self, _engine: &mut dyn Engine) {}

    fn set_thresh(&mut self, _thresh: u32) {}

    fn set_max_depth(&mut self, _depth: u32) {}

    fn get_iter_lim(&self) -> u32 {
        self.iter_lim
    }

    fn write_stats(&self) -> String {
        "MaxViolationBrancher".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brancher::Brancher;
    use crate::common::{ConId, NodeId};
    use crate::model::{CGraph, Constraint, Problem, Sense, VarType, Variable};

    #[test]
    fn ties_broken_by_lowest_var_id() {
        let vars = vec![
            Variable::new(VarId(0), VarType::Integer, 0.0, 5.0),
            Variable::new(VarId(1), VarType::Integer, 0.0, 5.0),
        ];
        let obj = Constraint::new(ConId(0), CGraph::linear(vec![], 0.0), f64::NEG_INFINITY, f64::INFINITY);
        let p = Problem::new(vars, vec![], obj, Sense::Minimize);
        let rel = Relaxation::relax_init_full(&p);
        let node = Node::root(NodeId(0));
        let sol = Solution::new(vec![2.5, 2.5], 0.0, crate::model::FeasibilityTag::Candidate);
        let pool = SolutionPool::new();
        let cands = vec![
            BranchingCandidate { var: VarId(1), score: 0.5 },
            BranchingCandidate { var: VarId(0), score: 0.5 },
        ];
        let mut mods = ModLog::new();
        let mut brancher = MaxViolationBrancher::new();
        let mut engine = crate::engine::reference::ReferenceEngine::new();
        let (status, branches) = brancher.find_branches(&rel, &node, &sol, &pool, &cands, &mut mods, &mut engine);
        assert_eq!(status, BrancherStatus::NotModifiedByBrancher);
        assert_eq!(branches.arms.len(), 2);
    }
}
