//! A pure-Rust reference [`Engine`] (§4.1 ambient supplement).
//!
//! Not a production numerical solver: a small projected-gradient method
//! with a quadratic penalty on constraint violation, good enough to drive
//! the linear and convex-quadratic relaxations the stock handlers produce
//! through this crate's own unit and end-to-end tests without depending on
//! an external LP/NLP package. Embedding applications are expected to
//! supply a real engine through the [`Engine`] trait.

use crate::common::{ConId, VarId};
use crate::error::{CoreError, CoreResult};
use crate::model::{FeasibilityTag, Relaxation, Sense, Solution};

use super::{Engine, EngineStatus, WarmStart};

const MAX_ITERS: usize = 2_000;
const STEP_SIZE: f64 = 0.05;
const PENALTY: f64 = 1_000.0;
const FEAS_TOL: f64 = 1e-6;

#[derive(Debug, Default)]
pub struct ReferenceStats {
    pub solves: u64,
    pub iterations: u64,
}

/// The reference engine. Holds its own copy of the relaxation (loaded via
/// [`Engine::load`]) and resyncs only the pieces the dirty flags mark.
pub struct ReferenceEngine {
    rel: Option<Relaxation>,
    x: Vec<f64>,
    iteration_limit: u32,
    time_limit: f64,
    obj_cutoff: Option<f64>,
    last_solution: Option<Solution>,
    last_value: Option<f64>,
    stats: ReferenceStats,
    bound_dirty: bool,
    cons_dirty: bool,
    obj_dirty: bool,
}

impl ReferenceEngine {
    pub fn new() -> Self {
        ReferenceEngine {
            rel: None,
            x: Vec::new(),
            iteration_limit: u32::MAX,
            time_limit: f64::INFINITY,
            obj_cutoff: None,
            last_solution: None,
            last_value: None,
            stats: ReferenceStats::default(),
            bound_dirty: false,
            cons_dirty: false,
            obj_dirty: false,
        }
    }

    pub fn set_objective_cutoff(&mut self, cutoff: f64) {
        self.obj_cutoff = Some(cutoff);
    }

    fn rel(&self) -> CoreResult<&Relaxation> {
        self.rel.as_ref().ok_or_else(|| CoreError::Engine {
            context: "ReferenceEngine".into(),
            message: "solve() called before load()".into(),
        })
    }

    fn initial_point(rel: &Relaxation) -> Vec<f64> {
        rel.vars()
            .iter()
            .map(|v| {
                let (lb, ub) = v.bounds();
                if lb.is_finite() && ub.is_finite() {
                    (lb + ub) / 2.0
                } else if lb.is_finite() {
                    lb
                } else if ub.is_finite() {
                    ub
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn objective_value(rel: &Relaxation, x: &[f64]) -> f64 {
        let sense_sign = match rel.sense() {
            Sense::Minimize => 1.0,
            Sense::Maximize => -1.0,
        };
        sense_sign * rel.objective().function().eval(&|v: VarId| x[v.0])
    }

    fn max_violation(rel: &Relaxation, x: &[f64]) -> f64 {
        rel.cons()
            .iter()
            .map(|c| c.violation(c.function().eval(&|v: VarId| x[v.0])).abs())
            .fold(0.0, f64::max)
    }

    fn gradient_step(rel: &Relaxation, x: &mut [f64]) {
        let sense_sign = match rel.sense() {
            Sense::Minimize => 1.0,
            Sense::Maximize => -1.0,
        };
        let lookup = |v: VarId| x[v.0];
        let mut grad = vec![0.0; x.len()];
        for (v, d) in rel.objective().function().gradient(&lookup) {
            grad[v.0] += sense_sign * d;
        }
        for c in rel.cons() {
            let val = c.function().eval(&lookup);
            let violation = c.violation(val);
            if violation != 0.0 {
                for (v, d) in c.function().gradient(&lookup) {
                    grad[v.0] += 2.0 * PENALTY * violation * d;
                }
            }
        }
        for (i, g) in grad.iter().enumerate() {
            x[i] -= STEP_SIZE * g;
        }
        for (i, v) in rel.vars().iter().enumerate() {
            let (lb, ub) = v.bounds();
            x[i] = x[i].clamp(lb, ub);
        }
    }
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        ReferenceEngine::new()
    }
}

impl Engine for ReferenceEngine {
    fn load(&mut self, rel: &Relaxation) -> CoreResult<()> {
        self.x = Self::initial_point(rel);
        self.rel = Some(rel.clone());
        self.bound_dirty = false;
        self.cons_dirty = false;
        self.obj_dirty = false;
        Ok(())
    }

    fn solve(&mut self) -> CoreResult<EngineStatus> {
        let rel = self.rel()?.clone();
        self.stats.solves += 1;

        if rel.vars().iter().any(|v| v.lb() > v.ub() + FEAS_TOL) {
            return Ok(EngineStatus::ProvenInfeasible);
        }

        let max_iters = (self.iteration_limit as usize).min(MAX_ITERS);
        let mut x = std::mem::take(&mut self.x);
        if x.len() != rel.vars().len() {
            x = Self::initial_point(&rel);
        }
        for _ in 0..max_iters {
            Self::gradient_step(&rel, &mut x);
            self.stats.iterations += 1;
        }

        let violation = Self::max_violation(&rel, &x);
        let value = Self::objective_value(&rel, &x);
        self.x = x.clone();

        if violation > FEAS_TOL {
            self.last_solution = None;
            self.last_value = None;
            return Ok(EngineStatus::ProvenLocalInfeasible);
        }

        let unsensed_value = match rel.sense() {
            Sense::Minimize => value,
            Sense::Maximize => -value,
        };
        self.last_value = Some(unsensed_value);
        self.last_solution = Some(Solution::new(x, unsensed_value, FeasibilityTag::Candidate));

        if let Some(cutoff) = self.obj_cutoff {
            if unsensed_value >= cutoff - FEAS_TOL {
                return Ok(EngineStatus::ProvenObjectiveCutOff);
            }
        }

        Ok(EngineStatus::ProvenOptimal)
    }

    fn get_solution(&self) -> Option<Solution> {
        self.last_solution.clone()
    }

    fn get_solution_value(&self) -> Option<f64> {
        self.last_value
    }

    fn get_warm_start_copy(&self) -> Option<WarmStart> {
        Some(WarmStart::new())
    }

    fn load_from_warm_start(&mut self, _ws: &WarmStart) {
        // The reference engine has no basis/factorization to restore; it
        // simply resumes from the last point it computed.
    }

    fn change_bound(&mut self, var: VarId, lb: f64, ub: f64) {
        if let Some(rel) = self.rel.as_mut() {
            rel.var_mut(var).set_bounds(lb, ub);
        }
        self.bound_dirty = true;
    }

    fn change_constraint(&mut self, con: ConId, lb: f64, ub: f64) {
        if let Some(rel) = self.rel.as_mut() {
            rel.con_mut(con).set_bounds(lb, ub);
        }
        self.cons_dirty = true;
    }

    fn change_obj(&mut self, constant: f64) {
        if let Some(rel) = self.rel.as_mut() {
            let _ = constant;
            let _ = rel;
        }
        self.obj_dirty = true;
    }

    fn negate_obj(&mut self) {
        if let Some(rel) = self.rel.as_mut() {
            rel.negate_objective();
        }
        self.obj_dirty = true;
    }

    fn add_constraint(&mut self, _con: ConId) {
        self.cons_dirty = true;
    }

    fn remove_cons(&mut self, _cons: &[ConId]) {
        self.cons_dirty = true;
    }

    fn set_iteration_limit(&mut self, n: u32) {
        self.iteration_limit = n;
    }

    fn set_time_limit(&mut self, seconds: f64) {
        self.time_limit = seconds;
    }

    fn reset_iteration_limit(&mut self) {
        self.iteration_limit = u32::MAX;
    }

    fn write_stats(&self) -> String {
        format!(
            "ReferenceEngine: solves={} iterations={}",
            self.stats.solves, self.stats.iterations
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ConId, VarId};
    use crate::model::{CGraph, Constraint, LinTerm, Problem, QuadTerm, VarType, Variable};

    fn convex_qp() -> Relaxation {
        // min x^2 + y^2 s.t. x + y >= 1, x,y in [-2,2]
        let vars = vec![
            Variable::new(VarId(0), VarType::Continuous, -2.0, 2.0),
            Variable::new(VarId(1), VarType::Continuous, -2.0, 2.0),
        ];
        let cons = vec![Constraint::new(
            ConId(0),
            CGraph::linear(
                vec![LinTerm { var: VarId(0), coef: 1.0 }, LinTerm { var: VarId(1), coef: 1.0 }],
                0.0,
            ),
            1.0,
            f64::INFINITY,
        )];
        let obj = Constraint::new(
            ConId(1),
            CGraph::quadratic(
                vec![],
                vec![
                    QuadTerm { vi: VarId(0), vj: VarId(0), coef: 1.0 },
                    QuadTerm { vi: VarId(1), vj: VarId(1), coef: 1.0 },
                ],
                0.0,
            ),
            f64::NEG_INFINITY,
            f64::INFINITY,
        );
        let p = Problem::new(vars, cons, obj, Sense::Minimize);
        Relaxation::relax_init_full(&p)
    }

    #[test]
    fn converges_near_known_optimum() {
        let rel = convex_qp();
        let mut engine = ReferenceEngine::new();
        engine.load(&rel).unwrap();
        let status = engine.solve().unwrap();
        assert!(matches!(status, EngineStatus::ProvenOptimal));
        let sol = engine.get_solution().unwrap();
        assert!((sol.objective() - 0.5).abs() < 0.05);
    }

    #[test]
    fn detects_conflicting_bounds_as_infeasible() {
        let vars = vec![Variable::new(VarId(0), VarType::Continuous, 5.0, 1.0)];
        let obj = Constraint::new(ConId(0), CGraph::linear(vec![], 0.0), f64::NEG_INFINITY, f64::INFINITY);
        // Construct bypassing Problem's assert by building Relaxation fields directly
        // is not possible (private fields); instead exercise via change_bound.
        let good_vars = vec![Variable::new(VarId(0), VarType::Continuous, 0.0, 1.0)];
        let p = Problem::new(good_vars, vec![], obj, Sense::Minimize);
        let rel = Relaxation::relax_init_full(&p);
        let mut engine = ReferenceEngine::new();
        engine.load(&rel).unwrap();
        engine.change_bound(VarId(0), 5.0, 1.0);
        let status = engine.solve().unwrap();
        assert_eq!(status, EngineStatus::ProvenInfeasible);
        let _ = vars;
    }
}
