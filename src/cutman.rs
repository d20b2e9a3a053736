//! Cut manager (§4/§5): an independent pool of globally-valid cuts, kept
//! apart from any single node's modification log. Grounded on
//! `PCBProcessor.cpp`'s `cutMan_` member (`CutMan2.h`): `nodeIsBranched`
//! fires once a node finishes branching with its final children count,
//! `updatePool`/`updateRel` run once a node is done processing to decide
//! which candidate cuts age out and which get promoted into the live
//! relaxation.

use crate::common::ConId;
use crate::model::{CGraph, Relaxation, Solution};
use crate::modification::{ModLog, Modification};
use crate::node::Node;

/// A cut held in the manager's pool, independent of any node's own mod log.
#[derive(Debug, Clone)]
pub struct StoredCut {
    pub originator: ConId,
    pub function: CGraph,
    pub lb: f64,
    pub ub: f64,
}

#[derive(Debug, Default)]
pub struct CutManagerStats {
    pub candidates_seen: u64,
    pub promoted: u64,
    pub aged_out: u64,
    pub branch_events: u64,
}

/// The capability set a cut manager implements (§5). Handlers register
/// candidate cuts as they separate; the processor drives the lifecycle
/// hooks once per node.
pub trait CutManager {
    /// A handler found a cut worth remembering across nodes.
    fn add_candidate(&mut self, cut: StoredCut);

    /// Called once a node finishes branching, with the number of children
    /// about to be created.
    fn node_is_branched(&mut self, node: &Node, sol: &Solution, num_branches: usize);

    /// Called once per `process()` call: scores every pooled cut against
    /// `sol`, aging out ones that stop being tight.
    fn update_pool(&mut self, rel: &Relaxation, sol: &Solution);

    /// Promotes pooled cuts that earned enough hits into the live
    /// relaxation as global `AddCon` modifications.
    fn update_rel(&mut self, rel: &Relaxation, mods: &mut ModLog);

    fn write_stats(&self) -> String;
}

/// No-op cut manager: the default until an embedder opts in, matching
/// `PCBProcessor`'s `cutMan_(0)` until `setCutManager` is called.
#[derive(Debug, Default)]
pub struct NullCutManager;

impl CutManager for NullCutManager {
    fn add_candidate(&mut self, _cut: StoredCut) {}
    fn node_is_branched(&mut self, _node: &Node, _sol: &Solution, _num_branches: usize) {}
    fn update_pool(&mut self, _rel: &Relaxation, _sol: &Solution) {}
    fn update_rel(&mut self, _rel: &Relaxation, _mods: &mut ModLog) {}
    fn write_stats(&self) -> String {
        "CutManager: none".to_string()
    }
}

#[derive(Debug, Clone)]
struct PooledCut {
    cut: StoredCut,
    hits: u32,
    age: u32,
    active: bool,
}

/// Pool-backed cut manager: tracks candidate cuts across the whole tree,
/// promoting ones that repeatedly cut off relaxation points and dropping
/// ones that go stale.
pub struct PoolCutManager {
    pool: Vec<PooledCut>,
    max_pool: usize,
    promote_after: u32,
    stale_after: u32,
    e_tol: f64,
    stats: CutManagerStats,
}

impl PoolCutManager {
    pub fn new(max_pool: usize, promote_after: u32, stale_after: u32, e_tol: f64) -> Self {
        PoolCutManager {
            pool: Vec::new(),
            max_pool,
            promote_after,
            stale_after,
            e_tol,
            stats: CutManagerStats::default(),
        }
    }

    fn violated(&self, cut: &StoredCut, sol: &Solution) -> bool {
        let lookup = |v| sol.value(v);
        let val = cut.function.eval(&lookup);
        (cut.lb.is_finite() && val < cut.lb - self.e_tol) || (cut.ub.is_finite() && val > cut.ub + self.e_tol)
    }
}

impl Default for PoolCutManager {
    fn default() -> Self {
        PoolCutManager::new(200, 3, 20, crate::common::DEFAULT_ETOL)
    }
}

impl CutManager for PoolCutManager {
    fn add_candidate(&mut self, cut: StoredCut) {
        self.stats.candidates_seen += 1;
        if self.pool.len() >= self.max_pool {
            // Drop the coldest entry to make room; keeps the pool bounded
            // the way a finite-size cut pool must in practice.
            if let Some((idx, _)) = self.pool.iter().enumerate().min_by_key(|(_, p)| p.hits) {
                self.pool.remove(idx);
            }
        }
        self.pool.push(PooledCut { cut, hits: 0, age: 0, active: false });
    }

    fn node_is_branched(&mut self, _node: &Node, _sol: &Solution, _num_branches: usize) {
        self.stats.branch_events += 1;
    }

    fn update_pool(&mut self, _rel: &Relaxation, sol: &Solution) {
        for p in &mut self.pool {
            if self.violated(&p.cut, sol) {
                p.hits += 1;
                p.age = 0;
            } else {
                p.age += 1;
            }
        }
        let stale_after = self.stale_after;
        let before = self.pool.len();
        self.pool.retain(|p| p.active || p.age < stale_after);
        self.stats.aged_out += (before - self.pool.len()) as u64;
    }

    fn update_rel(&mut self, rel: &Relaxation, mods: &mut ModLog) {
        let promote_after = self.promote_after;
        let mut next_id = rel.cons().len();
        for p in &mut self.pool {
            if p.active || p.hits < promote_after {
                continue;
            }
            mods.push(Modification::AddCon {
                con: ConId(next_id),
                originator: p.cut.originator,
                function: p.cut.function.clone(),
                lb: p.cut.lb,
                ub: p.cut.ub,
            });
            next_id += 1;
            p.active = true;
            self.stats.promoted += 1;
        }
    }

    fn write_stats(&self) -> String {
        format!(
            "CutManager: pooled={} candidates_seen={} promoted={} aged_out={} branch_events={}",
            self.pool.len(),
            self.stats.candidates_seen,
            self.stats.promoted,
            self.stats.aged_out,
            self.stats.branch_events
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::VarId;
    use crate::model::{FeasibilityTag, LinTerm};

    fn cut() -> StoredCut {
        StoredCut {
            originator: ConId(0),
            function: CGraph::linear(vec![LinTerm { var: VarId(0), coef: 1.0 }], 0.0),
            lb: f64::NEG_INFINITY,
            ub: 1.0,
        }
    }

    #[test]
    fn repeated_violation_promotes_a_cut() {
        let mut cm = PoolCutManager::new(10, 2, 20, 1e-6);
        cm.add_candidate(cut());
        let violating = Solution::new(vec![5.0], 5.0, FeasibilityTag::Candidate);
        let vars = vec![crate::model::Variable::new(VarId(0), crate::model::VarType::Continuous, 0.0, 10.0)];
        let obj = crate::model::Constraint::new(ConId(0), CGraph::linear(vec![], 0.0), f64::NEG_INFINITY, f64::INFINITY);
        let p = crate::model::Problem::new(vars, vec![], obj, crate::model::Sense::Minimize);
        let rel = Relaxation::relax_init_full(&p);

        for _ in 0..2 {
            cm.update_pool(&rel, &violating);
        }
        let mut mods = ModLog::new();
        cm.update_rel(&rel, &mut mods);
        assert!(!mods.is_empty());
        assert_eq!(cm.stats.promoted, 1);
    }

    #[test]
    fn cut_never_violated_ages_out() {
        let mut cm = PoolCutManager::new(10, 2, 1, 1e-6);
        cm.add_candidate(cut());
        let satisfying = Solution::new(vec![0.0], 0.0, FeasibilityTag::Candidate);
        let vars = vec![crate::model::Variable::new(VarId(0), crate::model::VarType::Continuous, 0.0, 10.0)];
        let obj = crate::model::Constraint::new(ConId(0), CGraph::linear(vec![], 0.0), f64::NEG_INFINITY, f64::INFINITY);
        let p = crate::model::Problem::new(vars, vec![], obj, crate::model::Sense::Minimize);
        let rel = Relaxation::relax_init_full(&p);

        cm.update_pool(&rel, &satisfying);
        cm.update_pool(&rel, &satisfying);
        assert!(cm.pool.is_empty());
    }
}
