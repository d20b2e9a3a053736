//! Convex/concave quadratic handler (§4.2.2), grounded on
//! `CxQuadHandler.h`: classifies each quadratic constraint at construction,
//! separates convex pieces with supporting hyperplanes and concave pieces
//! with a secant under-estimator, and propagates bounds through the
//! quadratic term.

use crate::common::{ConId, VarId, DEFAULT_ABS_TOL, DEFAULT_BOUND_TOL, DEFAULT_ETOL, DEFAULT_REL_TOL, DEFAULT_VTOL};
use crate::cutman::{CutManager, StoredCut};
use crate::model::{CGraph, LinTerm, QuadTerm, Relaxation, Solution};
use crate::modification::{ModLog, Modification};
use crate::node::Node;
use crate::options::SolverOptions;

use super::{BranchingCandidate, FeasibilityResult, Handler, SeparationStatus};

/// How a quadratic constraint was classified at construction time
/// (`CxQuadHandler.h`'s threefold split).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuadClass {
    /// Fully convex one-sided (`qf(x) <= rhs`).
    Convex,
    /// `y >= qf(x)` with `qf` concave: handled via a secant under-estimator.
    ConcaveSecant,
    /// An equality decomposed into convex and concave sides.
    DecomposedEquality,
}

/// Tolerances owned by this handler (§4.2.2).
#[derive(Debug, Clone, Copy)]
pub struct QuadHandlerConfig {
    pub a_tol: f64,
    pub r_tol: f64,
    pub e_tol: f64,
    pub b_tol: f64,
    pub v_tol: f64,
    /// `presolve && nl_presolve` (§4.2.2): gates `presolve_node`'s bound
    /// tightening.
    pub enabled: bool,
}

impl Default for QuadHandlerConfig {
    fn default() -> Self {
        QuadHandlerConfig {
            a_tol: DEFAULT_ABS_TOL,
            r_tol: DEFAULT_REL_TOL,
            e_tol: DEFAULT_ETOL,
            b_tol: DEFAULT_BOUND_TOL,
            v_tol: DEFAULT_VTOL,
            enabled: true,
        }
    }
}

impl QuadHandlerConfig {
    pub fn from_options(opts: &SolverOptions) -> Self {
        QuadHandlerConfig {
            enabled: opts.presolve && opts.nl_presolve,
            ..QuadHandlerConfig::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct QuadHandlerStats {
    pub cuts_added: u64,
    pub bound_tightenings: u64,
    pub secants_recomputed: u64,
}

struct TrackedCon {
    id: ConId,
    class: QuadClass,
}

pub struct QuadraticHandler {
    config: QuadHandlerConfig,
    stats: QuadHandlerStats,
    tracked: Vec<TrackedCon>,
}

impl QuadraticHandler {
    pub fn new(config: QuadHandlerConfig, rel: &Relaxation) -> Self {
        let tracked = rel
            .cons()
            .iter()
            .filter(|c| !c.function().is_linear())
            .map(|c| TrackedCon { id: c.id(), class: classify(c.bounds()) })
            .collect();
        QuadraticHandler { config, stats: QuadHandlerStats::default(), tracked }
    }

    fn quad_terms(c: &CGraph) -> (&[LinTerm], &[QuadTerm], f64) {
        match c {
            CGraph::Quadratic { linear, quad, constant } => (linear, quad, *constant),
            CGraph::Linear { .. } => (&[], &[], 0.0),
        }
    }
}

fn classify(bounds: (f64, f64)) -> QuadClass {
    let (lb, ub) = bounds;
    if lb == ub {
        QuadClass::DecomposedEquality
    } else if ub.is_finite() && lb.is_infinite() {
        QuadClass::Convex
    } else {
        QuadClass::ConcaveSecant
    }
}

fn add_term(terms: &mut Vec<LinTerm>, var: VarId, coef: f64) {
    if let Some(existing) = terms.iter_mut().find(|lt| lt.var == var) {
        existing.coef += coef;
    } else {
        terms.push(LinTerm { var, coef });
    }
}

/// Builds an affine function that under-estimates `linear . x + quad(x) +
/// constant` everywhere inside the box given by `rel`'s current variable
/// bounds (§4.2.2): an exact chord through the box endpoints for concave
/// square terms, a tangent at the current point for convex square terms, and
/// the tighter McCormick facet (at the current point) for bilinear terms.
/// Used in place of a single tangent plane wherever a tangent would be an
/// over-estimator rather than the secant the spec calls for.
fn secant_underestimate(
    rel: &Relaxation,
    linear: &[LinTerm],
    quad: &[QuadTerm],
    constant: f64,
    lookup: &dyn Fn(VarId) -> f64,
) -> (Vec<LinTerm>, f64) {
    let mut terms: Vec<LinTerm> = linear.to_vec();
    let mut k = constant;
    for t in quad {
        if t.vi == t.vj {
            let (lb, ub) = rel.var(t.vi).bounds();
            if t.coef <= 0.0 && lb.is_finite() && ub.is_finite() {
                // Exact chord through (lb, coef*lb^2) and (ub, coef*ub^2):
                // the true secant of this concave piece, an under-estimator
                // everywhere on [lb, ub].
                add_term(&mut terms, t.vi, t.coef * (lb + ub));
                k -= t.coef * lb * ub;
            } else {
                // Convex piece (or unbounded box): the tangent at the
                // current point is itself an under-estimator.
                let x0 = lookup(t.vi);
                add_term(&mut terms, t.vi, 2.0 * t.coef * x0);
                k -= t.coef * x0 * x0;
            }
        } else {
            let (li, ui) = rel.var(t.vi).bounds();
            let (lj, uj) = rel.var(t.vj).bounds();
            if li.is_finite() && ui.is_finite() && lj.is_finite() && uj.is_finite() {
                let xi0 = lookup(t.vi);
                let xj0 = lookup(t.vj);
                // McCormick envelope facets for w = xi*xj.
                let under = [(lj, li, -li * lj), (uj, ui, -ui * uj)];
                let over = [(lj, ui, -ui * lj), (uj, li, -li * uj)];
                let (ai, aj, ac) = if t.coef > 0.0 {
                    // Under-estimate w, then scale by the positive coef.
                    under
                        .into_iter()
                        .max_by(|a, b| {
                            let va = a.0 * xj0 + a.1 * xi0 + a.2;
                            let vb = b.0 * xj0 + b.1 * xi0 + b.2;
                            va.partial_cmp(&vb).unwrap()
                        })
                        .unwrap()
                } else {
                    // Over-estimate w, then scale by the negative coef so
                    // the product is an under-estimator of coef*w.
                    over
                        .into_iter()
                        .min_by(|a, b| {
                            let va = a.0 * xj0 + a.1 * xi0 + a.2;
                            let vb = b.0 * xj0 + b.1 * xi0 + b.2;
                            va.partial_cmp(&vb).unwrap()
                        })
                        .unwrap()
                };
                add_term(&mut terms, t.vj, t.coef * ai);
                add_term(&mut terms, t.vi, t.coef * aj);
                k += t.coef * ac;
            } else {
                // Unbounded box: no valid envelope; fall back to the
                // bilinear term's gradient at the current point.
                add_term(&mut terms, t.vi, t.coef * lookup(t.vj));
                add_term(&mut terms, t.vj, t.coef * lookup(t.vi));
                k -= t.coef * lookup(t.vi) * lookup(t.vj);
            }
        }
    }
    (terms, k)
}

impl Handler for QuadraticHandler {
    fn name(&self) -> &str {
        "quadratic"
    }

    fn is_feasible(&self, sol: &Solution, rel: &Relaxation) -> FeasibilityResult {
        let lookup = |v: VarId| sol.value(v);
        let mut worst = 0.0_f64;
        for t in &self.tracked {
            let c = rel.con(t.id);
            let val = c.function().eval(&lookup);
            worst = worst.max(c.violation(val).abs());
        }
        FeasibilityResult {
            feasible: worst <= self.config.e_tol,
            should_prune: false,
            infeasibility_measure: worst,
        }
    }

    fn separate(
        &mut self,
        sol: &Solution,
        _node: &Node,
        rel: &Relaxation,
        mods: &mut ModLog,
        cut_man: &mut dyn CutManager,
    ) -> SeparationStatus {
        let lookup = |v: VarId| sol.value(v);
        let mut any = false;
        for t in &self.tracked {
            let con = rel.con(t.id);
            let (linear, quad, constant) = Self::quad_terms(con.function());
            let val = con.function().eval(&lookup);
            let (lb, ub) = con.bounds();
            let violates_upper = ub.is_finite() && val > ub + self.config.e_tol;
            let violates_lower = lb.is_finite() && val < lb - self.config.e_tol;
            if !violates_upper && !violates_lower {
                continue;
            }

            // Tangent/gradient supporting hyperplane at the current point,
            // a valid outer-approximation for the convex (`<= ub`) side of a
            // constraint (§4.2.2).
            if violates_upper {
                let grad = con.function().gradient(&lookup);
                let mut cut_terms: Vec<LinTerm> = linear.to_vec();
                let mut grad_const = constant;
                for (v, d) in &grad {
                    if let Some(existing) = cut_terms.iter_mut().find(|lt| lt.var == *v) {
                        existing.coef = *d;
                    } else {
                        cut_terms.push(LinTerm { var: *v, coef: *d });
                    }
                    grad_const -= d * lookup(*v);
                }
                let cut_fn = CGraph::linear(cut_terms, grad_const + (val - con.function().eval(&lookup)));
                mods.push(Modification::AddCon {
                    con: ConId(rel.cons().len()),
                    originator: t.id,
                    function: cut_fn.clone(),
                    lb: f64::NEG_INFINITY,
                    ub,
                });
                cut_man.add_candidate(StoredCut { originator: t.id, function: cut_fn, lb: f64::NEG_INFINITY, ub });
                self.stats.cuts_added += 1;
                any = true;
            }

            // Secant under-estimator through the box's extreme points, the
            // valid relaxation for the concave (`>= lb`) side (§4.2.2):
            // a tangent here would over-estimate a concave qf and could
            // separate away the true optimum.
            if violates_lower && matches!(t.class, QuadClass::ConcaveSecant | QuadClass::DecomposedEquality) {
                let (sec_terms, sec_const) = secant_underestimate(rel, linear, quad, constant, &lookup);
                let cut_fn = CGraph::linear(sec_terms, sec_const);
                mods.push(Modification::AddCon {
                    con: ConId(rel.cons().len()),
                    originator: t.id,
                    function: cut_fn.clone(),
                    lb,
                    ub: f64::INFINITY,
                });
                cut_man.add_candidate(StoredCut { originator: t.id, function: cut_fn, lb, ub: f64::INFINITY });
                self.stats.cuts_added += 1;
                self.stats.secants_recomputed += 1;
                any = true;
            }
        }
        if any {
            SeparationStatus::Resolve
        } else {
            SeparationStatus::Continue
        }
    }

    fn presolve(&mut self, _rel: &Relaxation, _mods: &mut ModLog) -> bool {
        false
    }

    fn presolve_node(&mut self, rel: &Relaxation, _node: &Node, mods: &mut ModLog) -> bool {
        if !self.config.enabled {
            return false;
        }
        let mut infeasible = false;
        for t in &self.tracked {
            let con = rel.con(t.id);
            let (_linear, quad, _constant) = Self::quad_terms(con.function());
            for term in quad {
                let (image_lo, image_hi) = con.function().eval_interval(&|v: VarId| rel.var(v).bounds());
                let (con_lo, con_ub) = con.bounds();
                if image_lo > con_ub + self.config.a_tol || image_hi < con_lo - self.config.a_tol {
                    infeasible = true;
                }
                // Tighten the pivot variable's own box using the other
                // variable held at its current bounds, when the term is a
                // pure square (most common case this handler exercises).
                if term.vi == term.vj {
                    let v = rel.var(term.vi);
                    let (vlb, vub) = v.bounds();
                    if vlb.is_finite() && vub.is_finite() {
                        continue;
                    }
                    let (con_lb, con_ub2) = con.bounds();
                    if term.coef > 0.0 && con_ub2.is_finite() {
                        let bound = (con_ub2 / term.coef).max(0.0).sqrt();
                        if bound < vub - self.config.b_tol {
                            mods.push(Modification::BoundChg {
                                var: term.vi,
                                old_lb: vlb,
                                old_ub: vub,
                                new_lb: vlb,
                                new_ub: bound,
                            });
                            self.stats.bound_tightenings += 1;
                        }
                    }
                    let _ = con_lb;
                }
            }
        }
        infeasible
    }

    fn branching_candidates(&self, rel: &Relaxation, sol: &Solution, cands: &mut Vec<BranchingCandidate>) {
        let lookup = |v: VarId| sol.value(v);
        for t in &self.tracked {
            let con = rel.con(t.id);
            let (_linear, quad, _) = Self::quad_terms(con.function());
            let violation = con.violation(con.function().eval(&lookup)).abs();
            if violation <= self.config.e_tol {
                continue;
            }
            // Spatial branching candidate: the variable with the largest
            // bound width among this constraint's quadratic terms.
            let mut best: Option<(VarId, f64)> = None;
            for term in quad {
                for v in [term.vi, term.vj] {
                    let (lb, ub) = rel.var(v).bounds();
                    let width = if lb.is_finite() && ub.is_finite() { ub - lb } else { f64::INFINITY };
                    if best.map(|(_, w)| width > w).unwrap_or(true) {
                        best = Some((v, width));
                    }
                }
            }
            if let Some((var, width)) = best {
                if width > self.config.v_tol {
                    cands.push(BranchingCandidate { var, score: violation });
                }
            }
        }
    }

    fn write_stats(&self) -> String {
        format!(
            "QuadraticHandler: cuts_added={} bound_tightenings={} secants_recomputed={}",
            self.stats.cuts_added, self.stats.bound_tightenings, self.stats.secants_recomputed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ConId;
    use crate::model::{Constraint, Problem, QuadTerm, Sense, VarType, Variable};

    fn concave_obj_problem() -> Relaxation {
        let vars = vec![
            Variable::new(VarId(0), VarType::Continuous, 0.0, 2.0),
            Variable::new(VarId(1), VarType::Continuous, 0.0, 2.0),
        ];
        let cons = vec![Constraint::new(
            ConId(0),
            CGraph::quadratic(vec![], vec![QuadTerm { vi: VarId(0), vj: VarId(1), coef: 1.0 }], 0.0),
            1.0,
            1.0,
        )];
        let obj = Constraint::new(ConId(1), CGraph::linear(vec![], 0.0), f64::NEG_INFINITY, f64::INFINITY);
        let p = Problem::new(vars, cons, obj, Sense::Minimize);
        Relaxation::relax_init_full(&p)
    }

    #[test]
    fn equality_quadratic_classified_as_decomposed() {
        let rel = concave_obj_problem();
        let handler = QuadraticHandler::new(QuadHandlerConfig::default(), &rel);
        assert_eq!(handler.tracked[0].class, QuadClass::DecomposedEquality);
    }

    #[test]
    fn separate_adds_cut_on_violation() {
        let rel = concave_obj_problem();
        let mut handler = QuadraticHandler::new(QuadHandlerConfig::default(), &rel);
        let sol = Solution::new(vec![0.2, 0.2], 0.0, crate::model::FeasibilityTag::Candidate);
        let node = Node::root(crate::common::NodeId(0));
        let mut mods = ModLog::new();
        let mut cut_man = crate::cutman::NullCutManager;
        let status = handler.separate(&sol, &node, &rel, &mut mods, &mut cut_man);
        assert_eq!(status, SeparationStatus::Resolve);
        assert!(!mods.is_empty());
    }
}
