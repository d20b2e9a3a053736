//! Tree manager (§4.6): the open-node multiset, keyed by `(lb, tiebreak)`,
//! and the global dual bound. Grounded on the teacher's
//! `implementation/fringe/simple.rs`, which wraps a `BinaryHeap` behind a
//! comparator struct the same way this module does.

use binary_heap_plus::BinaryHeap;
use ordered_float::OrderedFloat;

use crate::common::NodeId;

/// A candidate queued for exploration: its id, dual bound, and a
/// depth-first tiebreak (insertion order, larger = more recent = explored
/// first, matching best-bound-first-with-DFS-tiebreak, §4.6).
#[derive(Debug, Clone, Copy)]
struct QueuedNode {
    id: NodeId,
    lb: f64,
    insertion_order: u64,
}

fn better(a: &QueuedNode, b: &QueuedNode) -> std::cmp::Ordering {
    // BinaryHeap is a max-heap; the "best" candidate is the one with the
    // smallest lb (best-bound-first), so invert the lb comparison, and
    // break ties in favor of the most recently inserted node (DFS).
    OrderedFloat(b.lb)
        .cmp(&OrderedFloat(a.lb))
        .then(a.insertion_order.cmp(&b.insertion_order))
}

/// Open-node set plus dual-bound bookkeeping (§4.6). Node selection policy
/// is best-bound-first with a depth-first tiebreak; pluggable policies
/// would swap the comparator passed to the underlying heap.
type Comparator = fn(&QueuedNode, &QueuedNode) -> std::cmp::Ordering;

pub struct TreeManager {
    open: BinaryHeap<QueuedNode, Comparator>,
    next_order: u64,
    root: Option<NodeId>,
}

impl TreeManager {
    pub fn new() -> Self {
        TreeManager {
            open: BinaryHeap::from_vec_cmp(Vec::new(), better as Comparator),
            next_order: 0,
            root: None,
        }
    }

    pub fn insert_root(&mut self, id: NodeId, lb: f64) {
        self.root = Some(id);
        self.insert_candidate(id, lb);
    }

    pub fn insert_candidate(&mut self, id: NodeId, lb: f64) {
        let order = self.next_order;
        self.next_order += 1;
        self.open.push(QueuedNode { id, lb, insertion_order: order });
    }

    pub fn get_candidate(&mut self) -> Option<NodeId> {
        self.open.pop().map(|n| n.id)
    }

    /// Marks a node as finished being branched: a no-op bookkeeping hook
    /// on this heap-backed implementation (nothing further is tracked per
    /// node once it leaves the open set), kept to match §4.6's operation
    /// table for implementations that need it (e.g. cut-pool notification).
    pub fn branched_node_done(&mut self, _id: NodeId) {}

    /// Equivalent to `branched_node_done`: the node is already gone from
    /// the open set once popped by `get_candidate`.
    pub fn prune_node(&mut self, _id: NodeId) {}

    pub fn size(&self) -> usize {
        self.open.len()
    }

    /// The global dual bound: the minimum `lb` over open nodes, or `+inf`
    /// when the tree is empty (§3 Tree invariant).
    pub fn lb(&self) -> f64 {
        self.open.peek().map(|n| n.lb).unwrap_or(f64::INFINITY)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }
}

impl Default for TreeManager {
    fn default() -> Self {
        TreeManager::new()
    }
}
