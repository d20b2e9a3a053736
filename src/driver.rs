//! B&B driver (§4.7): the outer loop tying the tree manager, node
//! processor, and solution pool together. Loop shape grounded on the
//! teacher's `implementation/solver/sequential.rs::maximize()`.

use log::info;

use crate::engine::WarmStart;
use crate::model::{Relaxation, SolutionPool};
use crate::modification::ModLog;
use crate::node::{NodeArena, NodeStatus};
use crate::options::SolverOptions;
use crate::processor::{ProcessOutcome, Processor};
use crate::stats::Stats;
use crate::tree::TreeManager;

/// Final, reported status of a solve (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    SolvedOptimal,
    SolvedGapLimit,
    SolvedInfeasible,
    SolvedUnbounded,
    SolveError,
    TimeLimitReached,
    IterationLimitReached,
    NotStarted,
}

pub struct SolveReport {
    pub status: SolveStatus,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub nodes: u64,
    pub stats: String,
}

/// The outer driver loop (§4.7). Owns no relaxation of its own: it is
/// handed the problem's initial relaxation and mutates a scratch copy via
/// the modification log, undoing on every backtrack.
pub struct Driver {
    processor: Processor,
    tree: TreeManager,
    arena: NodeArena,
    opts: SolverOptions,
    stats: Stats,
    stopped: bool,
}

impl Driver {
    pub fn new(processor: Processor, opts: SolverOptions) -> Self {
        Driver {
            processor,
            tree: TreeManager::new(),
            arena: NodeArena::new(),
            opts,
            stats: Stats::new(),
            stopped: false,
        }
    }

    /// Cooperative cancellation (§5): the next loop iteration will exit
    /// cleanly, undoing whatever node is in flight.
    pub fn request_stop(&mut self) {
        self.stopped = true;
    }

    fn gap_closed(&self, lb: f64, ub: f64) -> bool {
        if !ub.is_finite() {
            return false;
        }
        let gap = ub - lb;
        gap <= self.opts.abs_gap.max(self.opts.rel_gap * ub.abs())
    }

    pub fn solve(&mut self, initial_rel: Relaxation) -> (SolveReport, SolutionPool) {
        let mut rel = initial_rel;
        let mut pool = SolutionPool::new();
        let root = self.arena.insert_root();
        self.tree.insert_root(root, f64::NEG_INFINITY);

        let mut status = SolveStatus::NotStarted;

        loop {
            if self.stopped {
                status = SolveStatus::TimeLimitReached;
                break;
            }
            if let Some(limit) = self.opts.node_limit {
                if self.stats.processor.nodes_processed >= limit {
                    status = SolveStatus::IterationLimitReached;
                    break;
                }
            }

            let ub = pool.best_objective();
            if self.gap_closed(self.tree.lb(), ub) {
                status = if pool.is_empty() { SolveStatus::SolvedInfeasible } else { SolveStatus::SolvedGapLimit };
                break;
            }

            let Some(node_id) = self.tree.get_candidate() else {
                status = if pool.is_empty() { SolveStatus::SolvedInfeasible } else { SolveStatus::SolvedOptimal };
                break;
            };

            {
                let node = self.arena.get(node_id);
                if node.lb() >= ub - self.opts.abs_gap {
                    self.tree.prune_node(node_id);
                    continue;
                }
            }

            let mut node_mods = ModLog::new();
            // Node selection is best-bound-first, not depth-first, so the
            // relaxation is rebuilt from the full root-to-node path rather
            // than assumed to already sit at this node's parent (§4.7).
            let path_mods = self.arena.relaxation_path(node_id);
            path_mods.apply_all(&mut rel).ok();

            let outcome = {
                let node = self.arena.get_mut(node_id);
                self.processor.process(node, &mut rel, &mut pool, &mut node_mods, self.opts.abs_gap, self.opts.rel_gap, &mut self.stats)
            };

            match outcome {
                ProcessOutcome::Branched(branches) => {
                    let parent_lb = self.arena.get(node_id).lb();
                    for arm in branches.arms {
                        let child_ws = self.arena.get(node_id).warm_start().map(WarmStart::incr_use_cnt);
                        let child_id = self.arena.insert_child(node_id, arm.mods, ModLog::new(), child_ws);
                        self.tree.insert_candidate(child_id, parent_lb);
                        if let Some(var) = arm.var {
                            let child_lb = self.arena.get(child_id).lb();
                            self.processor.brancher_mut().update_after_solve(parent_lb, child_lb, var, arm.went_up);
                        }
                    }
                    self.tree.branched_node_done(node_id);
                }
                ProcessOutcome::Done => {
                    self.tree.branched_node_done(node_id);
                }
            }

            // Undo this node's accumulated relaxation-scope modifications
            // (presolve + separation rounds), then the root-to-node path,
            // restoring `rel` to the state it was in before this node.
            node_mods.undo_all(&mut rel).ok();
            path_mods.undo_all(&mut rel).ok();
            if matches!(self.arena.get(node_id).status(), NodeStatus::Stopped) {
                status = SolveStatus::SolveError;
                break;
            }
        }

        info!("solve finished: status={:?} nodes={}", status, self.stats.processor.nodes_processed);

        let report = SolveReport {
            status,
            lower_bound: self.tree.lb().min(pool.best_objective()),
            upper_bound: pool.best_objective(),
            nodes: self.stats.processor.nodes_processed,
            stats: format!("{}\n{}", self.stats, self.processor.write_stats()),
        };
        (report, pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brancher::lexicographic::LexicoBrancher;
    use crate::common::{ConId, VarId};
    use crate::engine::reference::ReferenceEngine;
    use crate::engine::Engine;
    use crate::handler::linear::{LinearHandler, LinearHandlerConfig};
    use crate::handler::Handler;
    use crate::model::{CGraph, Constraint, LinTerm, Problem, Sense, VarType, Variable};

    fn scenario_one() -> Problem {
        let vars = vec![Variable::new(VarId(0), VarType::Integer, 0.0, 10.0)];
        let cons = vec![Constraint::new(
            ConId(0),
            CGraph::linear(vec![LinTerm { var: VarId(0), coef: 1.0 }], 0.0),
            2.3,
            f64::INFINITY,
        )];
        let obj = Constraint::new(
            ConId(1),
            CGraph::linear(vec![LinTerm { var: VarId(0), coef: 1.0 }], 0.0),
            f64::NEG_INFINITY,
            f64::INFINITY,
        );
        Problem::new(vars, cons, obj, Sense::Minimize)
    }

    #[test]
    fn solves_simple_integer_feasibility_scenario() {
        let p = scenario_one();
        let rel = Relaxation::relax_init_full(&p);
        let handlers: Vec<Box<dyn Handler>> = vec![Box::new(LinearHandler::new(LinearHandlerConfig::default()))];
        let brancher: Box<dyn crate::brancher::Brancher> = Box::new(LexicoBrancher::new());
        let engine: Box<dyn Engine> = Box::new(ReferenceEngine::new());
        let mut opts = SolverOptions::default();
        opts.node_limit = Some(200);
        let processor = Processor::new(handlers, brancher, engine, &opts);
        let mut driver = Driver::new(processor, opts);
        let (report, pool) = driver.solve(rel);
        assert!(matches!(
            report.status,
            SolveStatus::SolvedOptimal | SolveStatus::SolvedGapLimit | SolveStatus::IterationLimitReached
        ));
        if let Some(best) = pool.best() {
            assert!(best.objective() >= 2.3 - 1e-3);
        }
    }
}
