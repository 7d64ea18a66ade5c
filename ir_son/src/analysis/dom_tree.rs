//! Dominator tree by the Lengauer–Tarjan algorithm.

use data_structure::graph::traversal::{DepthFirstSearch, DfsTree};

use crate::{AnalysisError, Function, NodeId};

const NONE: usize = usize::MAX;

/// Dominance over the regions reachable from `Start`.
///
/// All per-node tables are indexed by DFS preorder number.
#[derive(Debug, Clone)]
pub struct DomTree {
    dfs: DfsTree<NodeId>,
    idom: Vec<usize>,
}

impl DomTree {
    pub fn new(function: &Function) -> Self {
        let dfs = DepthFirstSearch::new(function).run();
        let idom = immediate_dominators(function, &dfs);
        log::debug!(
            "dominator tree of `{}`: {} reachable regions",
            function.name(),
            dfs.len()
        );
        Self { dfs, idom }
    }

    /// The depth-first search the tree was built from.
    pub fn dfs(&self) -> &DfsTree<NodeId> {
        &self.dfs
    }

    pub fn contains(&self, region: NodeId) -> bool {
        self.dfs.contains(region)
    }

    pub fn reverse_postorder(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.dfs.reverse_postorder()
    }

    fn index(&self, region: NodeId) -> Result<usize, AnalysisError> {
        self.dfs
            .index_of(region)
            .ok_or(AnalysisError::RegionNotFound(region))
    }

    /// `true` iff every path from `Start` to `b` passes through `a`.
    pub fn dominates(&self, a: NodeId, b: NodeId) -> Result<bool, AnalysisError> {
        let a = self.index(a)?;
        let mut b = self.index(b)?;
        loop {
            if a == b {
                return Ok(true);
            }
            if b == DfsTree::<NodeId>::ROOT {
                return Ok(false);
            }
            b = self.idom[b];
        }
    }

    /// The immediate dominator of `region`, `None` for `Start`.
    pub fn idom(&self, region: NodeId) -> Result<Option<NodeId>, AnalysisError> {
        let index = self.index(region)?;
        if index == DfsTree::<NodeId>::ROOT {
            return Ok(None);
        }
        Ok(Some(self.dfs.node(self.idom[index])))
    }

    /// The closest region dominating every region of `regions`.
    pub fn common_dominator(
        &self,
        regions: impl IntoIterator<Item = NodeId>,
    ) -> Result<Option<NodeId>, AnalysisError> {
        let mut regions = regions.into_iter();
        let Some(first) = regions.next() else {
            return Ok(None);
        };
        let mut lca = self.index(first)?;
        for region in regions {
            let mut other = self.index(region)?;
            // walk the deeper side up; an ancestor always has a smaller preorder number
            while lca != other {
                if lca > other {
                    lca = self.idom[lca];
                } else {
                    other = self.idom[other];
                }
            }
        }
        Ok(Some(self.dfs.node(lca)))
    }
}

fn immediate_dominators(function: &Function, dfs: &DfsTree<NodeId>) -> Vec<usize> {
    let n = dfs.len();
    let mut forest = Forest {
        semi: (0..n).collect(),
        ancestor: vec![NONE; n],
        label: (0..n).collect(),
    };
    let mut idom = vec![0; n];
    let mut bucket: Vec<Vec<usize>> = vec![Vec::new(); n];

    for w in (1..n).rev() {
        let node = dfs.node(w);
        for pred in function.predecessors(node) {
            // unreachable predecessors take no part in dominance
            let Some(v) = dfs.index_of(pred) else {
                continue;
            };
            let u = forest.eval(v);
            if forest.semi[u] < forest.semi[w] {
                forest.semi[w] = forest.semi[u];
            }
        }
        bucket[forest.semi[w]].push(w);

        let parent = dfs.parent(w);
        forest.ancestor[w] = parent;

        for v in std::mem::take(&mut bucket[parent]) {
            let u = forest.eval(v);
            idom[v] = if forest.semi[u] < forest.semi[v] {
                u
            } else {
                parent
            };
        }
    }

    for w in 1..n {
        if idom[w] != forest.semi[w] {
            idom[w] = idom[idom[w]];
        }
    }

    idom
}

/// The ancestor/label forest emulating union-find with path compression.
struct Forest {
    semi: Vec<usize>,
    ancestor: Vec<usize>,
    label: Vec<usize>,
}

impl Forest {
    fn eval(&mut self, v: usize) -> usize {
        if self.ancestor[v] == NONE {
            return v;
        }
        self.compress(v);
        self.label[v]
    }

    fn compress(&mut self, v: usize) {
        let mut path = Vec::new();
        let mut x = v;
        while self.ancestor[self.ancestor[x]] != NONE {
            path.push(x);
            x = self.ancestor[x];
        }
        // nodes closer to the root are finished first
        while let Some(y) = path.pop() {
            let a = self.ancestor[y];
            if self.semi[self.label[a]] < self.semi[self.label[y]] {
                self.label[y] = self.label[a];
            }
            self.ancestor[y] = self.ancestor[a];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DomTree;
    use crate::{AnalysisError, Function, NodeId, Signature, ValueType};

    struct Builder {
        f: Function,
    }

    impl Builder {
        fn new() -> Self {
            Self {
                f: Function::new("cfg", Signature::new(ValueType::Void, [])),
            }
        }

        fn region(&mut self) -> NodeId {
            self.f.create_region()
        }

        fn jmp(&mut self, from: NodeId, to: NodeId) {
            let jmp = self.f.create_jmp(from);
            self.f.add_control_input(to, jmp);
        }

        fn branch(&mut self, from: NodeId, on_true: NodeId, on_false: NodeId) {
            let cond = self.f.create_constant(ValueType::Bool, 1);
            let if_node = self.f.create_if(from, cond);
            let t = self.f.create_if_true(if_node);
            let e = self.f.create_if_false(if_node);
            self.f.add_control_input(on_true, t);
            self.f.add_control_input(on_false, e);
        }
    }

    // A -> B, B -> C | F, F -> E | G, C -> D, E -> D, G -> D
    #[test]
    fn branching_graph() {
        let mut b = Builder::new();
        let a = b.f.start();
        let d = b.f.end();
        let [bb, c, e, f, g] = [(); 5].map(|_| b.region());
        b.jmp(a, bb);
        b.branch(bb, c, f);
        b.branch(f, e, g);
        b.jmp(c, d);
        b.jmp(e, d);
        b.jmp(g, d);

        let dt = DomTree::new(&b.f);
        assert_eq!(dt.idom(a), Ok(None));
        assert_eq!(dt.idom(bb), Ok(Some(a)));
        assert_eq!(dt.idom(c), Ok(Some(bb)));
        assert_eq!(dt.idom(f), Ok(Some(bb)));
        assert_eq!(dt.idom(e), Ok(Some(f)));
        assert_eq!(dt.idom(g), Ok(Some(f)));
        assert_eq!(dt.idom(d), Ok(Some(bb)));
        assert_eq!(dt.dominates(f, g), Ok(true));
        assert_eq!(dt.dominates(c, d), Ok(false));
        assert_eq!(dt.common_dominator([e, c]), Ok(Some(bb)));
        assert_eq!(dt.common_dominator([e, g]), Ok(Some(f)));
    }

    // A -> B, B -> C | J, J -> C, C -> D, D -> C | E, E -> F | B, F -> end
    #[test]
    fn graph_with_loops() {
        let mut b = Builder::new();
        let a = b.f.start();
        let end = b.f.end();
        let [bb, c, d, e, f, j] = [(); 6].map(|_| b.region());
        b.jmp(a, bb);
        b.branch(bb, c, j);
        b.jmp(j, c);
        b.jmp(c, d);
        b.branch(d, c, e);
        b.branch(e, f, bb);
        b.jmp(f, end);

        let dt = DomTree::new(&b.f);
        assert_eq!(dt.idom(bb), Ok(Some(a)));
        assert_eq!(dt.idom(c), Ok(Some(bb)));
        assert_eq!(dt.idom(j), Ok(Some(bb)));
        assert_eq!(dt.idom(d), Ok(Some(c)));
        assert_eq!(dt.idom(e), Ok(Some(d)));
        assert_eq!(dt.idom(f), Ok(Some(e)));
        assert_eq!(dt.idom(end), Ok(Some(f)));
        assert_eq!(dt.dominates(bb, bb), Ok(true));
        assert_eq!(dt.dominates(e, bb), Ok(false));
    }

    #[test]
    fn unreachable_region_is_not_found() {
        let mut b = Builder::new();
        let start = b.f.start();
        let end = b.f.end();
        let lost = b.region();
        b.jmp(start, end);
        b.jmp(lost, end);

        let dt = DomTree::new(&b.f);
        assert_eq!(dt.idom(end), Ok(Some(start)));
        assert_eq!(dt.dominates(lost, end), Err(AnalysisError::RegionNotFound(lost)));
        assert_eq!(dt.idom(lost), Err(AnalysisError::RegionNotFound(lost)));
    }
}
