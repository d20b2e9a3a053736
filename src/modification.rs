//! Reversible deltas over a [`Relaxation`] (§3/§9). Every modification
//! stores enough of the prior state to undo itself exactly; `undo(apply(x))
//! = x` bit-identically is invariant 2 of `SPEC_FULL.md` §8.

use crate::common::{ConId, VarId};
use crate::error::CoreResult;
use crate::model::{CGraph, Constraint, Relaxation};

/// Where a modification is recorded: whether it must survive a backtrack
/// past this node (global) or only applies within this node's subtree
/// (node-local).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    NodeLocal,
}

/// A single reversible delta, tagged by kind (§9 Design Notes).
#[derive(Debug, Clone)]
pub enum Modification {
    /// Change a variable's bounds; stores the prior bounds for undo.
    BoundChg {
        var: VarId,
        old_lb: f64,
        old_ub: f64,
        new_lb: f64,
        new_ub: f64,
    },
    /// Change an equality constraint's right-hand side; stores the prior
    /// bounds (both sides, since undo must restore exactly).
    RhsChg {
        con: ConId,
        old_lb: f64,
        old_ub: f64,
        new_rhs: f64,
    },
    /// Change one linear coefficient of a constraint's function; stores
    /// the prior coefficient (0.0 if the term did not previously exist).
    CoefChg { con: ConId, var: VarId, old_coef: f64, new_coef: f64 },
    /// Append a constraint to the relaxation; undo removes it. `con`
    /// carries the id it was given at apply time so undo can find it
    /// even if later constraints were appended and then removed in between.
    AddCon { con: ConId, originator: ConId, function: CGraph, lb: f64, ub: f64 },
    /// Remove a constraint; stores enough to restore it verbatim.
    DelCon { con: ConId, originator: ConId, function: CGraph, lb: f64, ub: f64 },
    /// Fix a variable to a point value; stores the prior bounds.
    FixVar { var: VarId, old_lb: f64, old_ub: f64, value: f64 },
}

impl Modification {
    pub fn scope(&self) -> Scope {
        match self {
            Modification::AddCon { .. } | Modification::DelCon { .. } => Scope::Global,
            _ => Scope::NodeLocal,
        }
    }

    /// Applies this modification to `rel`.
    pub fn apply(&self, rel: &mut Relaxation) -> CoreResult<()> {
        match self {
            Modification::BoundChg { var, new_lb, new_ub, .. } => {
                rel.var_mut(*var).set_bounds(*new_lb, *new_ub);
            }
            Modification::RhsChg { con, new_rhs, .. } => {
                rel.con_mut(*con).set_rhs(*new_rhs);
            }
            Modification::CoefChg { con, var, new_coef, .. } => {
                set_linear_coef(rel.con_mut(*con).function_mut(), *var, *new_coef);
            }
            Modification::AddCon { originator, function, lb, ub, .. } => {
                rel.add_constraint(Constraint::new(next_con_id(rel), function.clone(), *lb, *ub), *originator);
            }
            Modification::DelCon { con, .. } => {
                rel.remove_constraint(*con);
            }
            Modification::FixVar { var, value, .. } => {
                rel.var_mut(*var).set_bounds(*value, *value);
            }
        }
        Ok(())
    }

    /// Reverts this modification, restoring `rel` to its pre-`apply` state.
    pub fn undo(&self, rel: &mut Relaxation) -> CoreResult<()> {
        match self {
            Modification::BoundChg { var, old_lb, old_ub, .. } => {
                rel.var_mut(*var).set_bounds(*old_lb, *old_ub);
            }
            Modification::RhsChg { con, old_lb, old_ub, .. } => {
                rel.con_mut(*con).set_bounds(*old_lb, *old_ub);
            }
            Modification::CoefChg { con, var, old_coef, .. } => {
                set_linear_coef(rel.con_mut(*con).function_mut(), *var, *old_coef);
            }
            Modification::AddCon { con, .. } => {
                rel.remove_constraint(*con);
            }
            Modification::DelCon { originator, function, lb, ub, .. } => {
                rel.add_constraint(Constraint::new(next_con_id(rel), function.clone(), *lb, *ub), *originator);
            }
            Modification::FixVar { var, old_lb, old_ub, .. } => {
                rel.var_mut(*var).set_bounds(*old_lb, *old_ub);
            }
        }
        Ok(())
    }
}

fn next_con_id(rel: &Relaxation) -> ConId {
    ConId(rel.cons().len())
}

fn set_linear_coef(f: &mut CGraph, var: VarId, coef: f64) {
    match f {
        CGraph::Linear { terms, .. } | CGraph::Quadratic { linear: terms, .. } => {
            if let Some(t) = terms.iter_mut().find(|t| t.var == var) {
                t.coef = coef;
            } else {
                terms.push(crate::model::LinTerm { var, coef });
            }
        }
    }
}

/// An ordered log of modifications applied to reach one node's relaxation
/// from its parent's (§3 Node). Undoing replays the log in reverse.
#[derive(Debug, Clone, Default)]
pub struct ModLog {
    mods: Vec<Modification>,
}

impl ModLog {
    pub fn new() -> Self {
        ModLog::default()
    }

    pub fn push(&mut self, m: Modification) {
        self.mods.push(m);
    }

    pub fn extend(&mut self, other: ModLog) {
        self.mods.extend(other.mods);
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Modification> {
        self.mods.iter()
    }

    pub fn apply_all(&self, rel: &mut Relaxation) -> CoreResult<()> {
        for m in &self.mods {
            m.apply(rel)?;
        }
        Ok(())
    }

    pub fn undo_all(&self, rel: &mut Relaxation) -> CoreResult<()> {
        for m in self.mods.iter().rev() {
            m.undo(rel)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::VarId;
    use crate::model::{Problem, Sense, Variable, VarType};

    fn rel_with_one_var() -> Relaxation {
        let vars = vec![Variable::new(VarId(0), VarType::Integer, 0.0, 10.0)];
        let obj = Constraint::new(ConId(0), CGraph::linear(vec![], 0.0), f64::NEG_INFINITY, f64::INFINITY);
        let p = Problem::new(vars, vec![], obj, Sense::Minimize);
        Relaxation::relax_init_full(&p)
    }

    #[test]
    fn bound_change_round_trips() {
        let mut rel = rel_with_one_var();
        let before = rel.var(VarId(0)).bounds();
        let m = Modification::BoundChg {
            var: VarId(0),
            old_lb: before.0,
            old_ub: before.1,
            new_lb: 3.0,
            new_ub: 10.0,
        };
        m.apply(&mut rel).unwrap();
        assert_eq!(rel.var(VarId(0)).bounds(), (3.0, 10.0));
        m.undo(&mut rel).unwrap();
        assert_eq!(rel.var(VarId(0)).bounds(), before);
    }

    #[test]
    fn mod_log_undo_all_restores_original_state() {
        let mut rel = rel_with_one_var();
        let mut log = ModLog::new();
        log.push(Modification::BoundChg { var: VarId(0), old_lb: 0.0, old_ub: 10.0, new_lb: 3.0, new_ub: 10.0 });
        log.push(Modification::BoundChg { var: VarId(0), old_lb: 3.0, old_ub: 10.0, new_lb: 3.0, new_ub: 7.0 });
        log.apply_all(&mut rel).unwrap();
        assert_eq!(rel.var(VarId(0)).bounds(), (3.0, 7.0));
        log.undo_all(&mut rel).unwrap();
        assert_eq!(rel.var(VarId(0)).bounds(), (0.0, 10.0));
    }

    #[test]
    fn add_then_undo_constraint_restores_count() {
        let mut rel = rel_with_one_var();
        let before = rel.cons().len();
        let m = Modification::AddCon {
            con: ConId(before),
            originator: ConId(0),
            function: CGraph::linear(vec![], 0.0),
            lb: 0.0,
            ub: 1.0,
        };
        m.apply(&mut rel).unwrap();
        assert_eq!(rel.cons().len(), before + 1);
        m.undo(&mut rel).unwrap();
        assert_eq!(rel.cons().len(), before);
    }
}
