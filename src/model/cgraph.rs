//! Function graphs (§3 "CGraph"): linear, quadratic, and nonlinear
//! expressions over variable leaves, with evaluation, gradient, and interval
//! evaluation.
//!
//! The full Minotaur `CGraph` is a general DAG of operator nodes; the stock
//! handlers in this crate only ever need linear and quadratic functions, so
//! [`CGraph`] is represented directly as one of those two shapes rather than
//! as a generic expression tree. A `Generic` variant keeps the door open for
//! a future handler that needs an arbitrary DAG without forcing one on the
//! two handlers this crate ships.

use crate::common::VarId;

/// A linear term `coef * x_id`.
#[derive(Debug, Clone, Copy)]
pub struct LinTerm {
    pub var: VarId,
    pub coef: f64,
}

/// A quadratic term `coef * x_i * x_j` (i == j is a squared term).
#[derive(Debug, Clone, Copy)]
pub struct QuadTerm {
    pub vi: VarId,
    pub vj: VarId,
    pub coef: f64,
}

#[derive(Debug, Clone)]
pub enum CGraph {
    /// `sum(coef * x) + constant`
    Linear { terms: Vec<LinTerm>, constant: f64 },
    /// `sum(lin) + sum(quad) + constant`
    Quadratic {
        linear: Vec<LinTerm>,
        quad: Vec<QuadTerm>,
        constant: f64,
    },
}

impl CGraph {
    pub fn linear(terms: Vec<LinTerm>, constant: f64) -> Self {
        CGraph::Linear { terms, constant }
    }

    pub fn quadratic(linear: Vec<LinTerm>, quad: Vec<QuadTerm>, constant: f64) -> Self {
        CGraph::Quadratic { linear, quad, constant }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, CGraph::Linear { .. })
    }

    /// Evaluate at a point given by a variable-indexed lookup.
    pub fn eval(&self, x: &dyn Fn(VarId) -> f64) -> f64 {
        match self {
            CGraph::Linear { terms, constant } => {
                terms.iter().map(|t| t.coef * x(t.var)).sum::<f64>() + constant
            }
            CGraph::Quadratic { linear, quad, constant } => {
                let lin: f64 = linear.iter().map(|t| t.coef * x(t.var)).sum();
                let q: f64 = quad.iter().map(|t| t.coef * x(t.vi) * x(t.vj)).sum();
                lin + q + constant
            }
        }
    }

    /// Gradient at a point, returned as `(VarId, partial)` pairs. Variables
    /// that do not appear are omitted (implicit zero partial).
    pub fn gradient(&self, x: &dyn Fn(VarId) -> f64) -> Vec<(VarId, f64)> {
        match self {
            CGraph::Linear { terms, .. } => terms.iter().map(|t| (t.var, t.coef)).collect(),
            CGraph::Quadratic { linear, quad, .. } => {
                let mut grad: Vec<(VarId, f64)> = linear.iter().map(|t| (t.var, t.coef)).collect();
                for t in quad {
                    let dvi = t.coef * x(t.vj) * if t.vi == t.vj { 2.0 } else { 1.0 };
                    let dvj = t.coef * x(t.vi) * if t.vi == t.vj { 0.0 } else { 1.0 };
                    add_partial(&mut grad, t.vi, dvi);
                    if t.vi != t.vj {
                        add_partial(&mut grad, t.vj, dvj);
                    }
                }
                grad
            }
        }
    }

    /// Interval evaluation given a box `lb(v)..=ub(v)` for each variable,
    /// used by bound propagation (§4.2.1/§4.2.2). Returns `(lo, hi)`.
    pub fn eval_interval(&self, bounds: &dyn Fn(VarId) -> (f64, f64)) -> (f64, f64) {
        match self {
            CGraph::Linear { terms, constant } => {
                let mut lo = *constant;
                let mut hi = *constant;
                for t in terms {
                    let (vlo, vhi) = bounds(t.var);
                    let (tlo, thi) = interval_scale(t.coef, vlo, vhi);
                    lo += tlo;
                    hi += thi;
                }
                (lo, hi)
            }
            CGraph::Quadratic { linear, quad, constant } => {
                let mut lo = *constant;
                let mut hi = *constant;
                for t in linear {
                    let (vlo, vhi) = bounds(t.var);
                    let (tlo, thi) = interval_scale(t.coef, vlo, vhi);
                    lo += tlo;
                    hi += thi;
                }
                for t in quad {
                    let (ilo, ihi) = bounds(t.vi);
                    let (jlo, jhi) = bounds(t.vj);
                    let (plo, phi) = if t.vi == t.vj {
                        interval_square(ilo, ihi)
                    } else {
                        interval_mul(ilo, ihi, jlo, jhi)
                    };
                    let (tlo, thi) = interval_scale(t.coef, plo, phi);
                    lo += tlo;
                    hi += thi;
                }
                (lo, hi)
            }
        }
    }

    /// Variables appearing in this function, deduplicated.
    pub fn vars(&self) -> Vec<VarId> {
        let mut out = Vec::new();
        let mut push = |v: VarId, out: &mut Vec<VarId>| {
            if !out.contains(&v) {
                out.push(v);
            }
        };
        match self {
            CGraph::Linear { terms, .. } => {
                for t in terms {
                    push(t.var, &mut out);
                }
            }
            CGraph::Quadratic { linear, quad, .. } => {
                for t in linear {
                    push(t.var, &mut out);
                }
                for t in quad {
                    push(t.vi, &mut out);
                    push(t.vj, &mut out);
                }
            }
        }
        out
    }
}

fn add_partial(grad: &mut Vec<(VarId, f64)>, var: VarId, d: f64) {
    if let Some(entry) = grad.iter_mut().find(|(v, _)| *v == var) {
        entry.1 += d;
    } else {
        grad.push((var, d));
    }
}

fn interval_scale(coef: f64, lo: f64, hi: f64) -> (f64, f64) {
    if coef >= 0.0 {
        (coef * lo, coef * hi)
    } else {
        (coef * hi, coef * lo)
    }
}

fn interval_square(lo: f64, hi: f64) -> (f64, f64) {
    if lo >= 0.0 {
        (lo * lo, hi * hi)
    } else if hi <= 0.0 {
        (hi * hi, lo * lo)
    } else {
        (0.0, lo.abs().max(hi.abs()).powi(2))
    }
}

fn interval_mul(alo: f64, ahi: f64, blo: f64, bhi: f64) -> (f64, f64) {
    let candidates = [alo * blo, alo * bhi, ahi * blo, ahi * bhi];
    let lo = candidates.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = candidates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_eval_and_gradient() {
        let f = CGraph::linear(
            vec![
                LinTerm { var: VarId(0), coef: 2.0 },
                LinTerm { var: VarId(1), coef: -1.0 },
            ],
            3.0,
        );
        let x = |v: VarId| match v.0 {
            0 => 5.0,
            1 => 1.0,
            _ => 0.0,
        };
        assert_eq!(f.eval(&x), 2.0 * 5.0 - 1.0 * 1.0 + 3.0);
        let g = f.gradient(&x);
        assert!(g.contains(&(VarId(0), 2.0)));
        assert!(g.contains(&(VarId(1), -1.0)));
    }

    #[test]
    fn quadratic_square_gradient_doubles() {
        let f = CGraph::quadratic(
            vec![],
            vec![QuadTerm { vi: VarId(0), vj: VarId(0), coef: 1.0 }],
            0.0,
        );
        let x = |_: VarId| 3.0;
        assert_eq!(f.eval(&x), 9.0);
        let g = f.gradient(&x);
        assert_eq!(g, vec![(VarId(0), 6.0)]);
    }

    #[test]
    fn interval_eval_of_square_straddling_zero() {
        let f = CGraph::quadratic(
            vec![],
            vec![QuadTerm { vi: VarId(0), vj: VarId(0), coef: 1.0 }],
            0.0,
        );
        let (lo, hi) = f.eval_interval(&|_| (-2.0, 3.0));
        assert_eq!(lo, 0.0);
        assert_eq!(hi, 9.0);
    }

    #[test]
    fn interval_eval_negative_coef_flips_bounds() {
        let f = CGraph::linear(vec![LinTerm { var: VarId(0), coef: -1.0 }], 0.0);
        let (lo, hi) = f.eval_interval(&|_| (1.0, 4.0));
        assert_eq!((lo, hi), (-4.0, -1.0));
    }
}
