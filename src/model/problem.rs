use crate::common::{ConId, VarId};
use crate::model::constraint::Constraint;
use crate::model::variable::{VarType, Variable};

/// Objective sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

/// Summary counts produced by [`Problem::calculate_size`] (§3 invariant:
/// counts consistent with contents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProblemSize {
    pub num_vars: usize,
    pub num_integers: usize,
    pub num_binaries: usize,
    pub num_cons: usize,
    pub num_linear_cons: usize,
    pub num_quadratic_cons: usize,
}

/// The full original model: variables, constraints, and one objective
/// (§3). Constructed by an external reader/transformer; this crate only
/// consumes it.
#[derive(Debug, Clone)]
pub struct Problem {
    vars: Vec<Variable>,
    cons: Vec<Constraint>,
    objective: Constraint,
    sense: Sense,
    size: ProblemSize,
}

impl Problem {
    pub fn new(vars: Vec<Variable>, cons: Vec<Constraint>, objective: Constraint, sense: Sense) -> Self {
        let mut p = Problem {
            vars,
            cons,
            objective,
            sense,
            size: ProblemSize::default(),
        };
        p.calculate_size();
        p
    }

    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut [Variable] {
        &mut self.vars
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

    pub fn objective(&self) -> &Constraint {
        &self.objective
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Recomputes and stores the summary counts; returns them.
    pub fn calculate_size(&mut self) -> ProblemSize {
        let num_vars = self.vars.len();
        let num_integers = self.vars.iter().filter(|v| v.vtype() == VarType::Integer).count();
        let num_binaries = self.vars.iter().filter(|v| v.vtype() == VarType::Binary).count();
        let num_cons = self.cons.len();
        let num_linear_cons = self.cons.iter().filter(|c| c.function().is_linear()).count();
        let num_quadratic_cons = num_cons - num_linear_cons;
        self.size = ProblemSize {
            num_vars,
            num_integers,
            num_binaries,
            num_cons,
            num_linear_cons,
            num_quadratic_cons,
        };
        self.size
    }

    pub fn size(&self) -> ProblemSize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cgraph::CGraph;

    fn toy() -> Problem {
        let vars = vec![
            Variable::new(VarId(0), VarType::Integer, 0.0, 10.0),
            Variable::new(VarId(1), VarType::Continuous, 0.0, 10.0),
        ];
        let cons = vec![Constraint::new(ConId(0), CGraph::linear(vec![], 0.0), 0.0, 1.0)];
        let obj = Constraint::new(ConId(usize::MAX), CGraph::linear(vec![], 0.0), f64::NEG_INFINITY, f64::INFINITY);
        Problem::new(vars, cons, obj, Sense::Minimize)
    }

    #[test]
    fn calculate_size_counts_match_contents() {
        let p = toy();
        let size = p.size();
        assert_eq!(size.num_vars, 2);
        assert_eq!(size.num_integers, 1);
        assert_eq!(size.num_cons, 1);
        assert_eq!(size.num_linear_cons, 1);
        assert_eq!(size.num_quadratic_cons, 0);
    }
}
