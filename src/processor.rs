//! Node processor (§4.4/§4.5): the per-node presolve/solve/separate/branch
//! loop, grounded directly on `PCBProcessor.cpp::process()`.
//!
//! Step 4's pseudo-cost update (§4.4) needs the `(parent lb, child lb, var,
//! direction)` tuple that only exists once a child node has actually been
//! solved; the driver calls [`Brancher::update_after_solve`] itself when it
//! resolves each child, rather than this module guessing ahead of time.

use log::debug;

use crate::brancher::{Brancher, BrancherStatus, Branches};
use crate::cutman::{CutManager, NullCutManager};
use crate::engine::{Engine, EngineStatus, WarmStart};
use crate::error::CoreError;
use crate::handler::{BranchingCandidate, Handler, SeparationStatus};
use crate::model::{FeasibilityTag, Relaxation, Solution, SolutionPool};
use crate::modification::ModLog;
use crate::node::{Node, NodeStatus};
use crate::options::SolverOptions;
use crate::stats::Stats;

/// What the driver should do once [`Processor::process`] returns.
#[derive(Debug)]
pub enum ProcessOutcome {
    Done,
    Branched(Branches),
}

pub struct Processor {
    handlers: Vec<Box<dyn Handler>>,
    brancher: Box<dyn Brancher>,
    engine: Box<dyn Engine>,
    cut_man: Box<dyn CutManager>,
    cont_on_err: bool,
    pres_freq: u32,
    max_presolve_iters: u32,
    obj_cut_off: Option<f64>,
}

impl Processor {
    pub fn new(handlers: Vec<Box<dyn Handler>>, brancher: Box<dyn Brancher>, engine: Box<dyn Engine>, opts: &SolverOptions) -> Self {
        Processor {
            handlers,
            brancher,
            engine,
            cut_man: Box::new(NullCutManager),
            cont_on_err: opts.cont_on_err,
            pres_freq: opts.pres_freq,
            max_presolve_iters: 20,
            obj_cut_off: opts.obj_cut_off,
        }
    }

    /// Opts a processor into a non-default cut manager, mirroring
    /// `PCBProcessor::setCutManager` — a processor has no pool until one
    /// is explicitly attached.
    pub fn set_cut_manager(&mut self, cut_man: Box<dyn CutManager>) {
        self.cut_man = cut_man;
    }

    /// Step 1: presolve node. Iterates handlers until no new modification
    /// or `max_iter` rounds, a single increment per round (§9 Open
    /// Question 2 resolution — the source double-increments).
    fn presolve_node(&mut self, node: &Node, rel: &mut Relaxation, node_mods: &mut ModLog) -> bool {
        if node.id().0 as u32 % self.pres_freq.max(1) != 0 {
            return false;
        }
        let mut iter = 0;
        loop {
            if iter >= self.max_presolve_iters {
                break;
            }
            let mut round_mods = ModLog::new();
            let mut infeasible = false;
            for h in self.handlers.iter_mut() {
                if h.presolve_node(rel, node, &mut round_mods) {
                    infeasible = true;
                }
            }
            let changed = !round_mods.is_empty();
            if changed {
                round_mods.apply_all(rel).ok();
                node_mods.extend(round_mods);
            }
            iter += 1;
            if infeasible {
                return true;
            }
            if !changed {
                break;
            }
        }
        false
    }

    /// Documented no-op extension seam (§9 Open Question 1: the source's
    /// `tightenBounds_()` is empty). Kept for API parity with
    /// `PCBProcessor`; no handler-independent tightener is wired in.
    fn tighten_bounds(&self, _rel: &Relaxation) {}

    fn classify_engine_status(
        &self,
        status: EngineStatus,
        node: &mut Node,
        engine_value: Option<f64>,
        incumbent: f64,
        abs_tol: f64,
        rel_tol: f64,
        stats: &mut Stats,
    ) -> NodeStatus {
        use EngineStatus::*;
        match status {
            ProvenInfeasible | ProvenLocalInfeasible => {
                stats.processor.pruned_infeasible += 1;
                NodeStatus::Infeasible
            }
            ProvenFailedCQInfeas => {
                stats.processor.pruned_infeasible += 1;
                stats.processor.problems += 1;
                NodeStatus::Infeasible
            }
            ProvenObjectiveCutOff => {
                stats.processor.pruned_bound += 1;
                NodeStatus::HitUb
            }
            ProvenOptimal | ProvenLocalOptimal | EngineIterationLimit => {
                if status == EngineIterationLimit {
                    stats.processor.problems += 1;
                }
                let val = engine_value.unwrap_or(node.lb());
                if val < node.lb() - abs_tol {
                    let err = CoreError::Numeric(format!(
                        "child lb {val} regressed below parent lb {} by more than tolerance",
                        node.lb()
                    ));
                    log::error!("aborting: {err}");
                    stats.processor.problems += 1;
                    return NodeStatus::Stopped;
                }
                node.set_lb(val);
                let hit_obj_cutoff = self.obj_cut_off.is_some_and(|c| val >= c - abs_tol);
                if val >= incumbent - abs_tol.max(rel_tol * incumbent.abs()) || hit_obj_cutoff {
                    stats.processor.pruned_bound += 1;
                    NodeStatus::HitUb
                } else {
                    NodeStatus::Continue
                }
            }
            FailedFeas | ProvenFailedCQFeas => {
                stats.processor.problems += 1;
                NodeStatus::Continue
            }
            FailedInfeas => {
                stats.processor.pruned_infeasible += 1;
                stats.processor.problems += 1;
                NodeStatus::Infeasible
            }
            EngineError => {
                stats.processor.problems += 1;
                if self.cont_on_err {
                    NodeStatus::Continue
                } else {
                    stats.processor.pruned_infeasible += 1;
                    NodeStatus::Infeasible
                }
            }
            ProvenUnbounded => {
                debug!("engine proved the relaxation unbounded at a node; aborting");
                NodeStatus::Stopped
            }
        }
    }

    /// Runs the full per-node loop (§4.4). `node_mods` accumulates every
    /// relaxation-scope modification produced along the way, so the
    /// driver can undo them all on backtrack.
    #[allow(clippy::too_many_arguments)]
    pub fn process(
        &mut self,
        node: &mut Node,
        rel: &mut Relaxation,
        pool: &mut SolutionPool,
        node_mods: &mut ModLog,
        abs_tol: f64,
        rel_tol: f64,
        stats: &mut Stats,
    ) -> ProcessOutcome {
        stats.processor.nodes_processed += 1;

        if self.presolve_node(node, rel, node_mods) {
            node.set_status(NodeStatus::Infeasible);
            return ProcessOutcome::Done;
        }
        self.tighten_bounds(rel);

        let mut last_sol: Option<Solution> = None;
        let outcome = 'node_loop: loop {
            if let Some(ws) = node.take_warm_start() {
                ws.decr_use_cnt();
            }
            if self.engine.load(rel).is_err() {
                node.set_status(NodeStatus::Infeasible);
                break 'node_loop ProcessOutcome::Done;
            }
            let incumbent = pool.best_objective();

            let status = match self.engine.solve() {
                Ok(s) => s,
                Err(_) => EngineStatus::EngineError,
            };
            let value = self.engine.get_solution_value();
            let classified = self.classify_engine_status(status, node, value, incumbent, abs_tol, rel_tol, stats);
            node.set_status(classified);

            if matches!(classified, NodeStatus::Infeasible | NodeStatus::HitUb | NodeStatus::Stopped) {
                break 'node_loop ProcessOutcome::Done;
            }

            let Some(sol) = self.engine.get_solution() else {
                node.set_status(NodeStatus::Infeasible);
                break 'node_loop ProcessOutcome::Done;
            };
            last_sol = Some(sol);
            let sol = last_sol.as_ref().unwrap();

            if self.all_handlers_feasible(sol, rel) {
                let mut accepted = sol.clone();
                accepted.mark_feasible();
                pool.insert(accepted);
                stats.processor.proven_optimal += 1;
                node.set_status(NodeStatus::Optimal);
                break 'node_loop ProcessOutcome::Done;
            }

            let mut round_mods = ModLog::new();
            let mut prune = false;
            let mut resolve = false;
            for h in self.handlers.iter_mut() {
                match h.separate(sol, node, rel, &mut round_mods, self.cut_man.as_mut()) {
                    SeparationStatus::Prune => prune = true,
                    SeparationStatus::Resolve => resolve = true,
                    SeparationStatus::Continue => {}
                }
            }
            if prune {
                stats.processor.pruned_infeasible += 1;
                node.set_status(NodeStatus::Infeasible);
                break 'node_loop ProcessOutcome::Done;
            }
            if resolve {
                round_mods.apply_all(rel).ok();
                node_mods.extend(round_mods);
                continue;
            }

            let mut candidates: Vec<BranchingCandidate> = Vec::new();
            for h in self.handlers.iter() {
                h.branching_candidates(rel, sol, &mut candidates);
            }

            let ws = self.engine.get_warm_start_copy().unwrap_or_else(WarmStart::new);
            node.set_warm_start(Some(ws.incr_use_cnt()));

            let mut brancher_mods = ModLog::new();
            let (brancher_status, branches) = self.brancher.find_branches(
                rel,
                node,
                sol,
                pool,
                &candidates,
                &mut brancher_mods,
                self.engine.as_mut(),
            );

            match brancher_status {
                BrancherStatus::PrunedByBrancher => {
                    stats.processor.pruned_infeasible += 1;
                    node.set_status(NodeStatus::Infeasible);
                    break 'node_loop ProcessOutcome::Done;
                }
                BrancherStatus::ModifiedByBrancher => {
                    brancher_mods.apply_all(rel).ok();
                    node_mods.extend(brancher_mods);
                    continue;
                }
                BrancherStatus::NotModifiedByBrancher => {
                    stats.processor.branched += 1;
                    node.set_status(NodeStatus::Branched);
                    self.cut_man.node_is_branched(node, sol, branches.arms.len());
                    break 'node_loop ProcessOutcome::Branched(branches);
                }
            }
        };

        if let Some(sol) = &last_sol {
            self.cut_man.update_pool(rel, sol);
            let mut cut_mods = ModLog::new();
            self.cut_man.update_rel(rel, &mut cut_mods);
            if !cut_mods.is_empty() {
                cut_mods.apply_all(rel).ok();
                node_mods.extend(cut_mods);
            }
        }
        outcome
    }

    fn all_handlers_feasible(&self, sol: &Solution, rel: &Relaxation) -> bool {
        if sol.tag() != FeasibilityTag::Feasible && sol.tag() != FeasibilityTag::Candidate {
            return false;
        }
        self.handlers.iter().all(|h| h.is_feasible(sol, rel).feasible)
    }

    pub fn brancher_mut(&mut self) -> &mut dyn Brancher {
        self.brancher.as_mut()
    }

    pub fn write_stats(&self) -> String {
        let mut report = String::new();
        report.push_str(&self.engine.write_stats());
        report.push('\n');
        for h in &self.handlers {
            report.push_str(&h.write_stats());
            report.push('\n');
        }
        report.push_str(&self.brancher.write_stats());
        report.push('\n');
        report.push_str(&self.cut_man.write_stats());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brancher::lexicographic::LexicoBrancher;
    use crate::common::{ConId, NodeId, VarId};
    use crate::engine::reference::ReferenceEngine;
    use crate::handler::linear::{LinearHandler, LinearHandlerConfig};
    use crate::model::{CGraph, Constraint, LinTerm, Problem, Sense, VarType, Variable};

    fn toy_problem() -> Problem {
        // min -x, x integer in [0,10], x >= 2.3 (scenario 1 of §8, shrunk)
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
    fn processing_root_either_branches_or_resolves() {
        let p = toy_problem();
        let mut rel = Relaxation::relax_init_full(&p);
        let handlers: Vec<Box<dyn Handler>> = vec![Box::new(LinearHandler::new(LinearHandlerConfig::default()))];
        let brancher: Box<dyn Brancher> = Box::new(LexicoBrancher::new());
        let engine: Box<dyn Engine> = Box::new(ReferenceEngine::new());
        let opts = SolverOptions::default();
        let mut processor = Processor::new(handlers, brancher, engine, &opts);
        let mut node = Node::root(NodeId(0));
        let mut pool = SolutionPool::new();
        let mut mods = ModLog::new();
        let mut stats = Stats::new();
        let outcome = processor.process(&mut node, &mut rel, &mut pool, &mut mods, 1e-6, 1e-6, &mut stats);
        assert!(matches!(outcome, ProcessOutcome::Branched(_)) || matches!(node.status(), NodeStatus::Optimal));
    }
}
