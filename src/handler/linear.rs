//! Linear handler (§4.2.1): owns linear constraints and variable bounds.
//! Presolve duties, bound propagation, and fractional branching candidates,
//! grounded on `PCBProcessor.cpp`'s `presolveNode_` loop shape (with the
//! source's double-increment bug resolved, see `DESIGN.md`).

use bit_set::BitSet;

use crate::common::{ConId, VarId, DEFAULT_BOUND_TOL, DEFAULT_INT_TOL};
use crate::cutman::CutManager;
use crate::model::{CGraph, Relaxation, Sense, Solution};
use crate::modification::{ModLog, Modification};
use crate::node::Node;
use crate::options::SolverOptions;

use super::{BranchingCandidate, FeasibilityResult, Handler, SeparationStatus};

#[derive(Debug, Default)]
pub struct LinearHandlerStats {
    pub bound_tightenings: u64,
    pub presolve_rounds: u64,
    pub vars_purged: u64,
    pub vars_dual_fixed: u64,
    pub constraints_purged: u64,
    pub coefficients_improved: u64,
}

/// Presolve toggles, mirroring §6's `presolve`/`lin_presolve` CLI options.
#[derive(Debug, Clone, Copy)]
pub struct LinearHandlerConfig {
    pub int_tol: f64,
    pub bound_tol: f64,
    pub max_presolve_rounds: u32,
    /// `presolve && lin_presolve` (§4.2.1): gates all five duties below,
    /// not just bound propagation.
    pub enabled: bool,
}

impl Default for LinearHandlerConfig {
    fn default() -> Self {
        LinearHandlerConfig {
            int_tol: DEFAULT_INT_TOL,
            bound_tol: DEFAULT_BOUND_TOL,
            max_presolve_rounds: 20,
            enabled: true,
        }
    }
}

impl LinearHandlerConfig {
    pub fn from_options(opts: &SolverOptions) -> Self {
        LinearHandlerConfig {
            int_tol: opts.int_tol,
            bound_tol: DEFAULT_BOUND_TOL,
            max_presolve_rounds: 20,
            enabled: opts.presolve && opts.lin_presolve,
        }
    }
}

pub struct LinearHandler {
    config: LinearHandlerConfig,
    stats: LinearHandlerStats,
    /// Variables already fixed by a prior presolve round, so later rounds
    /// don't re-derive the same fix (§4.2.1 "purge empty/fixed variables").
    fixed_vars: BitSet,
}

impl LinearHandler {
    pub fn new(config: LinearHandlerConfig) -> Self {
        LinearHandler { config, stats: LinearHandlerStats::default(), fixed_vars: BitSet::new() }
    }

    /// Fixes variables that appear in neither the objective nor any
    /// constraint to an arbitrary finite bound — they cannot affect
    /// feasibility or the objective, so any finite point in their box works.
    fn purge_empty_vars(&mut self, rel: &Relaxation, mods: &mut ModLog) {
        let mut referenced = vec![false; rel.vars().len()];
        for v in rel.objective().function().vars() {
            referenced[v.0] = true;
        }
        for c in rel.cons() {
            for v in c.function().vars() {
                referenced[v.0] = true;
            }
        }
        for v in rel.vars() {
            if referenced[v.id().0] || self.fixed_vars.contains(v.id().0) {
                continue;
            }
            let (lb, ub) = v.bounds();
            if lb == ub {
                continue;
            }
            let value = if lb.is_finite() {
                lb
            } else if ub.is_finite() {
                ub
            } else {
                0.0
            };
            mods.push(Modification::FixVar { var: v.id(), old_lb: lb, old_ub: ub, value });
            self.fixed_vars.insert(v.id().0);
            self.stats.vars_purged += 1;
        }
    }

    /// Fixes a variable with a nonzero objective coefficient that appears in
    /// no constraint to whichever finite bound improves the objective (the
    /// "singleton column" special case of dual fixing, §4.2.1).
    fn dual_fix(&mut self, rel: &Relaxation, mods: &mut ModLog) {
        // Only a linear objective has a coefficient that is truly constant
        // regardless of the other variables' values; a quadratic term's
        // per-variable partial depends on the current point, so it is not a
        // safe basis for a one-shot fix.
        if !matches!(rel.objective().function(), CGraph::Linear { .. }) {
            return;
        }
        let mut in_constraint = vec![false; rel.vars().len()];
        for c in rel.cons() {
            for v in c.function().vars() {
                in_constraint[v.0] = true;
            }
        }
        let obj_grad = rel.objective().function().gradient(&|v| rel.var(v).value());
        for (var, coef) in obj_grad {
            if coef == 0.0 || in_constraint[var.0] || self.fixed_vars.contains(var.0) {
                continue;
            }
            let (lb, ub) = rel.var(var).bounds();
            if lb == ub {
                continue;
            }
            // Minimizing: a positive coefficient wants the variable as low
            // as possible, a negative one as high as possible (flipped when
            // maximizing).
            let wants_lb = match rel.sense() {
                Sense::Minimize => coef > 0.0,
                Sense::Maximize => coef < 0.0,
            };
            let value = if wants_lb && lb.is_finite() {
                lb
            } else if !wants_lb && ub.is_finite() {
                ub
            } else {
                continue;
            };
            mods.push(Modification::FixVar { var, old_lb: lb, old_ub: ub, value });
            self.fixed_vars.insert(var.0);
            self.stats.vars_dual_fixed += 1;
        }
    }

    /// Deletes constraints whose achievable value interval already sits
    /// inside `[lb, ub]` for every point in the current box — they can
    /// never be violated, so carrying them forward only wastes LP rows.
    ///
    /// `Relaxation::remove_constraint` shifts every later index down by one,
    /// which would desync any other handler's cached `ConId`s (e.g. the
    /// quadratic handler's tracked constraint list) if a removal happened
    /// in the middle of the vector. Only a contiguous redundant suffix is
    /// purged — scanning from the tail inward and stopping at the first
    /// non-redundant row — so every surviving constraint keeps its index.
    fn purge_redundant_constraints(&mut self, rel: &Relaxation, mods: &mut ModLog) {
        let mut redundant: Vec<ConId> = Vec::new();
        for c in rel.cons().iter().rev() {
            let (lb, ub) = c.bounds();
            let (lo, hi) = c.function().eval_interval(&|v| rel.var(v).bounds());
            if lo >= lb - self.config.bound_tol && hi <= ub + self.config.bound_tol {
                redundant.push(c.id());
            } else {
                break;
            }
        }
        for id in redundant {
            let c = rel.con(id);
            mods.push(Modification::DelCon {
                con: id,
                originator: rel.originator_con(id),
                function: c.function().clone(),
                lb: c.bounds().0,
                ub: c.bounds().1,
            });
            self.stats.constraints_purged += 1;
        }
    }

    /// Zeroes out coefficients too small to affect any achievable row value
    /// (§4.2.1 "coefficient improvement", narrowed to the numerically-sound
    /// cleanup case rather than full knapsack-style tightening).
    fn improve_coefficients(&mut self, rel: &Relaxation, mods: &mut ModLog) {
        for c in rel.cons() {
            let CGraph::Linear { terms, .. } = c.function() else { continue };
            for t in terms {
                if t.coef != 0.0 && t.coef.abs() < self.config.bound_tol {
                    mods.push(Modification::CoefChg { con: c.id(), var: t.var, old_coef: t.coef, new_coef: 0.0 });
                    self.stats.coefficients_improved += 1;
                }
            }
        }
    }

    /// One round of bound propagation over every linear constraint;
    /// returns `true` if any bound tightened by more than `bound_tol`.
    fn propagate_once(&mut self, rel: &Relaxation, mods: &mut ModLog) -> bool {
        let mut changed = false;
        for c in rel.cons() {
            if !c.function().is_linear() {
                continue;
            }
            let CGraph::Linear { terms, constant } = c.function().clone() else {
                unreachable!("filtered to linear above")
            };
            let (lb, ub) = c.bounds();
            for pivot in &terms {
                if pivot.coef == 0.0 {
                    continue;
                }
                // Isolate pivot.var: coef*x = [lb,ub] - constant - sum(other terms)
                let mut rest_lo = -constant;
                let mut rest_hi = -constant;
                for t in &terms {
                    if t.var == pivot.var {
                        continue;
                    }
                    let v = rel.var(t.var);
                    let (vlo, vhi) = v.bounds();
                    let (tlo, thi) = if t.coef >= 0.0 {
                        (t.coef * vlo, t.coef * vhi)
                    } else {
                        (t.coef * vhi, t.coef * vlo)
                    };
                    rest_lo -= thi;
                    rest_hi -= tlo;
                }
                let (num_lo, num_hi) = if lb.is_finite() || ub.is_finite() {
                    (
                        if lb.is_finite() { lb + rest_lo } else { f64::NEG_INFINITY },
                        if ub.is_finite() { ub + rest_hi } else { f64::INFINITY },
                    )
                } else {
                    continue;
                };
                let (new_lo, new_hi) = if pivot.coef > 0.0 {
                    (num_lo / pivot.coef, num_hi / pivot.coef)
                } else {
                    (num_hi / pivot.coef, num_lo / pivot.coef)
                };
                let v = rel.var(pivot.var);
                let (old_lb, old_ub) = v.bounds();
                let tightened_lb = new_lo.max(old_lb);
                let tightened_ub = new_hi.min(old_ub);
                if tightened_lb > old_lb + self.config.bound_tol || tightened_ub < old_ub - self.config.bound_tol {
                    if tightened_lb > tightened_ub + self.config.bound_tol {
                        // Would create an empty interval; let is_feasible catch it.
                        continue;
                    }
                    mods.push(Modification::BoundChg {
                        var: pivot.var,
                        old_lb,
                        old_ub,
                        new_lb: tightened_lb,
                        new_ub: tightened_ub.max(tightened_lb),
                    });
                    self.stats.bound_tightenings += 1;
                    changed = true;
                }
            }
        }
        changed
    }
}

impl Handler for LinearHandler {
    fn name(&self) -> &str {
        "linear"
    }

    fn is_feasible(&self, sol: &Solution, rel: &Relaxation) -> FeasibilityResult {
        let lookup = |v: VarId| sol.value(v);
        let mut worst = 0.0_f64;
        for c in rel.cons() {
            if !c.function().is_linear() {
                continue;
            }
            let violation = c.violation(c.function().eval(&lookup)).abs();
            worst = worst.max(violation);
        }
        for v in rel.vars() {
            if v.vtype().is_discrete() {
                let frac = v.fractional_violation(self.config.int_tol);
                worst = worst.max(frac);
            }
        }
        FeasibilityResult {
            feasible: worst <= self.config.int_tol.max(1e-6),
            should_prune: false,
            infeasibility_measure: worst,
        }
    }

    fn separate(
        &mut self,
        _sol: &Solution,
        _node: &Node,
        _rel: &Relaxation,
        _mods: &mut ModLog,
        _cut_man: &mut dyn CutManager,
    ) -> SeparationStatus {
        // Linear constraints need no cutting-plane separation beyond the
        // bound propagation already performed in presolve_node.
        SeparationStatus::Continue
    }

    fn presolve(&mut self, rel: &Relaxation, mods: &mut ModLog) -> bool {
        if !self.config.enabled {
            return false;
        }
        self.purge_empty_vars(rel, mods);
        self.dual_fix(rel, mods);
        self.purge_redundant_constraints(rel, mods);
        self.improve_coefficients(rel, mods);
        self.propagate_once(rel, mods)
    }

    fn presolve_node(&mut self, rel: &Relaxation, _node: &Node, mods: &mut ModLog) -> bool {
        if !self.config.enabled {
            return false;
        }
        let mut rounds = 0;
        loop {
            if rounds >= self.config.max_presolve_rounds {
                break;
            }
            let changed = self.propagate_once(rel, mods);
            self.stats.presolve_rounds += 1;
            rounds += 1;
            if !changed {
                break;
            }
        }
        self.purge_empty_vars(rel, mods);
        self.dual_fix(rel, mods);
        self.purge_redundant_constraints(rel, mods);
        self.improve_coefficients(rel, mods);
        rel.vars().iter().any(|v| v.lb() > v.ub() + self.config.bound_tol)
    }

    fn branching_candidates(&self, rel: &Relaxation, sol: &Solution, cands: &mut Vec<BranchingCandidate>) {
        for v in rel.vars() {
            if !v.vtype().is_discrete() {
                continue;
            }
            let value = sol.value(v.id());
            let frac = value - value.floor();
            let score = frac.min(1.0 - frac);
            if score > self.config.int_tol {
                cands.push(BranchingCandidate { var: v.id(), score });
            }
        }
    }

    fn write_stats(&self) -> String {
        format!(
            "LinearHandler: bound_tightenings={} presolve_rounds={} vars_purged={} vars_dual_fixed={} constraints_purged={} coefficients_improved={}",
            self.stats.bound_tightenings,
            self.stats.presolve_rounds,
            self.stats.vars_purged,
            self.stats.vars_dual_fixed,
            self.stats.constraints_purged,
            self.stats.coefficients_improved,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ConId;
    use crate::model::{Constraint, LinTerm, Problem, Sense, VarType, Variable};

    fn two_var_problem() -> Problem {
        // x + y <= 4.5, x,y in [0,5], integer
        let vars = vec![
            Variable::new(VarId(0), VarType::Integer, 0.0, 5.0),
            Variable::new(VarId(1), VarType::Integer, 0.0, 5.0),
        ];
        let cons = vec![Constraint::new(
            ConId(0),
            CGraph::linear(
                vec![LinTerm { var: VarId(0), coef: 1.0 }, LinTerm { var: VarId(1), coef: 1.0 }],
                0.0,
            ),
            f64::NEG_INFINITY,
            4.5,
        )];
        let obj = Constraint::new(ConId(1), CGraph::linear(vec![], 0.0), f64::NEG_INFINITY, f64::INFINITY);
        Problem::new(vars, cons, obj, Sense::Minimize)
    }

    #[test]
    fn presolve_node_tightens_bound_from_row() {
        let p = two_var_problem();
        let mut rel = Relaxation::relax_init_full(&p);
        rel.var_mut(VarId(1)).set_bounds(4.0, 5.0);
        let mut handler = LinearHandler::new(LinearHandlerConfig::default());
        let mut mods = ModLog::new();
        let node = Node::root(crate::common::NodeId(0));
        let infeasible = handler.presolve_node(&rel, &node, &mut mods);
        assert!(!infeasible);
        mods.apply_all(&mut rel).unwrap();
        assert!(rel.var(VarId(0)).ub() <= 0.5 + 1e-9);
    }

    #[test]
    fn branching_candidates_only_fractional_integers() {
        let p = two_var_problem();
        let rel = Relaxation::relax_init_full(&p);
        let handler = LinearHandler::new(LinearHandlerConfig::default());
        let sol = Solution::new(vec![2.3, 2.2], 0.0, crate::model::FeasibilityTag::Candidate);
        let mut cands = Vec::new();
        handler.branching_candidates(&rel, &sol, &mut cands);
        assert_eq!(cands.len(), 2);
    }
}
