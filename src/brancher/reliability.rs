//! Reliability brancher (§4.3): pseudo-cost scoring, falling back to
//! strong branching for variables that have not yet been branched
//! `thresh` times in both directions.

use fxhash::FxHashMap;

use crate::common::VarId;
use crate::engine::{Engine, EngineStatus};
use crate::handler::BranchingCandidate;
use crate::model::{Relaxation, Solution, SolutionPool};
use crate::modification::ModLog;
use crate::node::Node;

use super::{branch_on, BrancherStatus, Branches};

#[derive(Debug, Clone, Copy, Default)]
struct PseudoCost {
    down_sum: f64,
    down_count: u32,
    up_sum: f64,
    up_count: u32,
}

impl PseudoCost {
    fn down_avg(&self) -> f64 {
        if self.down_count == 0 { 1.0 } else { self.down_sum / self.down_count as f64 }
    }

    fn up_avg(&self) -> f64 {
        if self.up_count == 0 { 1.0 } else { self.up_sum / self.up_count as f64 }
    }

    fn reliable(&self, thresh: u32) -> bool {
        self.down_count >= thresh && self.up_count >= thresh
    }
}

#[derive(Debug, Default)]
pub struct ReliabilityStats {
    pub strong_branch_probes: u64,
    pub pseudo_cost_updates: u64,
}

pub struct ReliabilityBrancher {
    costs: FxHashMap<usize, PseudoCost>,
    thresh: u32,
    max_depth: u32,
    iter_lim: u32,
    stats: ReliabilityStats,
}

impl ReliabilityBrancher {
    /// `tau = clamp((|I|+|B|)/10, 2, 4)`, `max_depth =
    /// clamp(|I| + |B|/20 + 2, 0, 10)` per §4.3.
    pub fn new(num_integer_and_binary: usize) -> Self {
        let tau = ((num_integer_and_binary as f64) / 10.0).clamp(2.0, 4.0) as u32;
        let max_depth = ((num_integer_and_binary as f64) + (num_integer_and_binary as f64) / 20.0 + 2.0)
            .clamp(0.0, 10.0) as u32;
        ReliabilityBrancher {
            costs: FxHashMap::default(),
            thresh: tau,
            max_depth,
            iter_lim: 50,
            stats: ReliabilityStats::default(),
        }
    }

    fn score(&self, var: VarId) -> f64 {
        let c = self.costs.get(&var.0).copied().unwrap_or_default();
        let down = c.down_avg();
        let up = c.up_avg();
        // Product of estimated left/right gains; tie-break by sum is left
        // to the caller via stable sort order.
        down.max(1e-9) * up.max(1e-9)
    }

    /// Trial-solves both directions of `var` for up to `iter_lim`
    /// iterations each, returning the observed dual gains.
    fn strong_branch(&mut self, rel: &Relaxation, engine: &mut dyn Engine, var: VarId, value: f64) -> (f64, f64) {
        self.stats.strong_branch_probes += 1;
        engine.set_iteration_limit(self.iter_lim);

        let mut down_rel = rel.clone();
        let (lb, ub) = down_rel.var(var).bounds();
        down_rel.var_mut(var).set_bounds(lb, value.floor());
        let down_gain = probe_gain(engine, &down_rel);

        let mut up_rel = rel.clone();
        up_rel.var_mut(var).set_bounds(value.ceil(), ub);
        let up_gain = probe_gain(engine, &up_rel);

        engine.reset_iteration_limit();
        (down_gain, up_gain)
    }
}

fn probe_gain(engine: &mut dyn Engine, rel: &Relaxation) -> f64 {
    if engine.load(rel).is_err() {
        return 0.0;
    }
    match engine.solve() {
        Ok(status) if status.is_optimal() => engine.get_solution_value().unwrap_or(0.0),
        Ok(EngineStatus::ProvenInfeasible) | Ok(EngineStatus::ProvenLocalInfeasible) => f64::INFINITY,
        _ => 0.0,
    }
}

impl super::Brancher for ReliabilityBrancher {
    fn find_branches(
        &mut self,
        rel: &Relaxation,
        node: &Node,
        sol: &Solution,
        _pool: &SolutionPool,
        candidates: &[BranchingCandidate],
        _mods: &mut ModLog,
        engine: &mut dyn Engine,
    ) -> (BrancherStatus, Branches) {
        if candidates.is_empty() {
            return (BrancherStatus::PrunedByBrancher, Branches::default());
        }

        let unreliable_budget = if node.depth() < self.max_depth { usize::MAX } else { 0 };
        let mut best_var = candidates[0].var;
        let mut best_score = f64::NEG_INFINITY;
        let mut probes_used = 0usize;

        for cand in candidates {
            let reliable = self.costs.get(&cand.var.0).map(|c| c.reliable(self.thresh)).unwrap_or(false);
            let score = if !reliable && probes_used < unreliable_budget {
                probes_used += 1;
                let value = sol.value(cand.var);
                let (down_gain, up_gain) = self.strong_branch(rel, engine, cand.var, value);
                down_gain.max(1e-9) * up_gain.max(1e-9)
            } else {
                self.score(cand.var)
            };
            if score > best_score {
                best_score = score;
                best_var = cand.var;
            }
        }

        let value = sol.value(best_var);
        (BrancherStatus::NotModifiedByBrancher, branch_on(rel, best_var, value))
    }

    fn update_after_solve(&mut self, parent_lb: f64, child_lb: f64, var: VarId, went_up: bool) {
        let gain = (child_lb - parent_lb).max(0.0);
        let entry = self.costs.entry(var.0).or_default();
        if went_up {
            entry.up_sum += gain;
            entry.up_count += 1;
        } else {
            entry.down_sum += gain;
            entry.down_count += 1;
        }
        self.stats.pseudo_cost_updates += 1;
    }

    fn set_engine(&mut self, _engine: &mut dyn Engine) {}

    fn set_thresh(&mut self, thresh: u32) {
        self.thresh = thresh;
    }

    fn set_max_depth(&mut self, depth: u32) {
        self.max_depth = depth;
    }

    fn get_iter_lim(&self) -> u32 {
        self.iter_lim
    }

    fn write_stats(&self) -> String {
        format!(
            "ReliabilityBrancher: strong_branch_probes={} pseudo_cost_updates={}",
            self.stats.strong_branch_probes, self.stats.pseudo_cost_updates
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brancher::Brancher;
    use crate::common::{ConId, NodeId};
    use crate::model::{CGraph, Constraint, Problem, Sense, VarType, Variable};

    #[test]
    fn tau_and_max_depth_clamp_per_formula() {
        let b = ReliabilityBrancher::new(5);
        assert_eq!(b.thresh, 2);
        let b = ReliabilityBrancher::new(100);
        assert_eq!(b.thresh, 4);
    }

    #[test]
    fn unreliable_variable_becomes_reliable_after_thresh_updates() {
        let mut b = ReliabilityBrancher::new(20);
        assert!(!b.costs.get(&0).map(|c| c.reliable(b.thresh)).unwrap_or(false));
        for _ in 0..b.thresh {
            b.update_after_solve(0.0, 1.0, VarId(0), true);
            b.update_after_solve(0.0, 1.0, VarId(0), false);
        }
        assert!(b.costs[&0].reliable(b.thresh));
    }

    #[test]
    fn find_branches_picks_a_candidate() {
        let vars = vec![Variable::new(VarId(0), VarType::Integer, 0.0, 5.0)];
        let obj = Constraint::new(ConId(0), CGraph::linear(vec![], 0.0), f64::NEG_INFINITY, f64::INFINITY);
        let p = Problem::new(vars, vec![], obj, Sense::Minimize);
        let rel = Relaxation::relax_init_full(&p);
        let node = Node::root(NodeId(0));
        let sol = Solution::new(vec![2.5], 0.0, crate::model::FeasibilityTag::Candidate);
        let pool = SolutionPool::new();
        let cands = vec![BranchingCandidate { var: VarId(0), score: 0.5 }];
        let mut mods = ModLog::new();
        let mut brancher = ReliabilityBrancher::new(1);
        let mut engine = crate::engine::reference::ReferenceEngine::new();
        let (status, branches) =
            brancher.find_branches(&rel, &node, &sol, &pool, &cands, &mut mods, &mut engine);
        assert_eq!(status, BrancherStatus::NotModifiedByBrancher);
        assert_eq!(branches.arms.len(), 2);
    }
}
