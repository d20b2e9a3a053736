use crate::common::{ConId, VarId};
use crate::model::constraint::Constraint;
use crate::model::problem::{Problem, Sense};
use crate::model::variable::{VarType, Variable};

/// A continuous over-approximation of a [`Problem`], plus a back-map to the
/// originator variables/constraints (§3). Every feasible original solution
/// is relaxation-feasible: built by dropping integrality and keeping every
/// constraint the stock handlers know how to relax (for nonconvex quadratic
/// terms, a handler is responsible for replacing them with a convex
/// under/over-estimator before this relaxation is solved).
#[derive(Debug, Clone)]
pub struct Relaxation {
    vars: Vec<Variable>,
    cons: Vec<Constraint>,
    objective: Constraint,
    sense: Sense,
    /// relaxation var id -> originator var id (1:1 for variables this
    /// crate never introduces auxiliaries for).
    var_back_map: Vec<VarId>,
    con_back_map: Vec<ConId>,
}

impl Relaxation {
    /// Builds the initial full relaxation of `problem`: same variables and
    /// bounds, integrality dropped, constraints carried over verbatim.
    /// Corresponds to the driver's `relaxer.relaxInitFull` call (§4.7).
    pub fn relax_init_full(problem: &Problem) -> Self {
        let vars: Vec<Variable> = problem
            .vars()
            .iter()
            .map(|v| {
                let mut rv = Variable::new(v.id(), VarType::Continuous, v.lb(), v.ub());
                rv.set_active(v.is_active());
                rv
            })
            .collect();
        let var_back_map = problem.vars().iter().map(|v| v.id()).collect();
        let cons = problem.cons().to_vec();
        let con_back_map = problem.cons().iter().map(|c| c.id()).collect();
        Relaxation {
            vars,
            cons,
            objective: problem.objective().clone(),
            sense: problem.sense(),
            var_back_map,
            con_back_map,
        }
    }

    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.0]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.0]
    }

    pub fn cons(&self) -> &[Constraint] {
        &self.cons
    }

    pub fn con(&self, id: ConId) -> &Constraint {
        &self.cons[id.0]
    }

    pub fn con_mut(&mut self, id: ConId) -> &mut Constraint {
        &mut self.cons[id.0]
    }

    pub fn add_constraint(&mut self, con: Constraint, originator: ConId) {
        self.con_back_map.push(originator);
        self.cons.push(con);
    }

    pub fn remove_constraint(&mut self, id: ConId) {
        // Node-local cuts are removed on backtrack in reverse insertion
        // order by the modification log, so a simple truncate-from-the-end
        // pattern is always what callers actually exercise; a swap_remove
        // here would silently renumber a later constraint's id.
        self.cons.remove(id.0);
        self.con_back_map.remove(id.0);
    }

    pub fn objective(&self) -> &Constraint {
        &self.objective
    }

    pub fn objective_mut(&mut self) -> &mut Constraint {
        &mut self.objective
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn negate_objective(&mut self) {
        self.sense = match self.sense {
            Sense::Minimize => Sense::Maximize,
            Sense::Maximize => Sense::Minimize,
        };
    }

    pub fn originator_var(&self, id: VarId) -> VarId {
        self.var_back_map[id.0]
    }

    pub fn originator_con(&self, id: ConId) -> ConId {
        self.con_back_map[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cgraph::CGraph;

    fn toy_problem() -> Problem {
        let vars = vec![Variable::new(VarId(0), VarType::Integer, 0.0, 5.0)];
        let cons = vec![];
        let obj = Constraint::new(ConId(0), CGraph::linear(vec![], 0.0), f64::NEG_INFINITY, f64::INFINITY);
        Problem::new(vars, cons, obj, Sense::Minimize)
    }

    #[test]
    fn relax_init_full_drops_integrality_keeps_bounds() {
        let p = toy_problem();
        let rel = Relaxation::relax_init_full(&p);
        assert_eq!(rel.var(VarId(0)).vtype(), VarType::Continuous);
        assert_eq!(rel.var(VarId(0)).bounds(), (0.0, 5.0));
        assert_eq!(rel.originator_var(VarId(0)), VarId(0));
    }

    #[test]
    fn added_constraint_tracks_originator() {
        let p = toy_problem();
        let mut rel = Relaxation::relax_init_full(&p);
        let cut = Constraint::new(ConId(1), CGraph::linear(vec![], 0.0), 0.0, 1.0);
        rel.add_constraint(cut, ConId(0));
        assert_eq!(rel.originator_con(ConId(1)), ConId(0));
    }
}
