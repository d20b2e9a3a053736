use crate::common::ConId;
use crate::model::cgraph::CGraph;

/// A two-sided constraint `l <= f(x) <= u` (§3). Equality constraints have
/// `l == u`; single-sided ones carry `±f64::INFINITY` on the unused side.
#[derive(Debug, Clone)]
pub struct Constraint {
    id: ConId,
    function: CGraph,
    lb: f64,
    ub: f64,
}

impl Constraint {
    pub fn new(id: ConId, function: CGraph, lb: f64, ub: f64) -> Self {
        assert!(lb <= ub, "constraint {id} created with lb > ub");
        Constraint { id, function, lb, ub }
    }

    pub fn id(&self) -> ConId {
        self.id
    }

    pub fn function(&self) -> &CGraph {
        &self.function
    }

    pub fn function_mut(&mut self) -> &mut CGraph {
        &mut self.function
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.lb, self.ub)
    }

    pub fn set_bounds(&mut self, lb: f64, ub: f64) {
        self.lb = lb;
        self.ub = ub;
    }

    pub fn set_rhs(&mut self, rhs: f64) {
        assert!(self.is_equality(), "set_rhs only valid on equality constraints");
        self.lb = rhs;
        self.ub = rhs;
    }

    pub fn is_equality(&self) -> bool {
        self.lb == self.ub
    }

    /// Signed violation of `value` against this constraint's bounds: positive
    /// when above `ub`, negative when below `lb`, zero if within bounds.
    pub fn violation(&self, value: f64) -> f64 {
        if value > self.ub {
            value - self.ub
        } else if value < self.lb {
            value - self.lb
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cgraph::CGraph;

    #[test]
    fn violation_is_zero_within_bounds() {
        let c = Constraint::new(ConId(0), CGraph::linear(vec![], 0.0), -1.0, 1.0);
        assert_eq!(c.violation(0.0), 0.0);
        assert_eq!(c.violation(2.0), 1.0);
        assert_eq!(c.violation(-2.0), -1.0);
    }

    #[test]
    fn equality_rhs_change_sets_both_bounds() {
        let mut c = Constraint::new(ConId(0), CGraph::linear(vec![], 0.0), 2.0, 2.0);
        c.set_rhs(5.0);
        assert_eq!(c.bounds(), (5.0, 5.0));
    }
}
