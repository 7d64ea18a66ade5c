use crate::{index::vec::Idx, BitVec, FxHashMap};

use super::{DirectedGraph, StartNode, Successors};

/// Iterative depth-first search.
///
/// Nodes are numbered in the order they are first reached, and a node
/// completes once all of its successors have been explored. An explicit
/// stack of frames keeps the traversal independent of the call stack
/// depth, so deep graphs cannot overflow.
pub struct DepthFirstSearch<'graph, G>
where
    G: DirectedGraph + Successors,
{
    graph: &'graph G,
    visited: BitVec<usize>,
}

struct Frame<N> {
    node: N,
    successors: Vec<N>,
    next: usize,
}

impl<'graph, G> DepthFirstSearch<'graph, G>
where
    G: DirectedGraph + Successors,
{
    pub fn new(graph: &'graph G) -> Self {
        Self {
            graph,
            visited: BitVec::repeat(false, graph.num_nodes()),
        }
    }

    pub fn run_from(mut self, start: G::Node) -> DfsTree<G::Node> {
        let mut tree = DfsTree::default();
        let mut stack = Vec::new();

        self.visit(&mut tree, &mut stack, start, DfsTree::<G::Node>::ROOT);

        while let Some(frame) = stack.last_mut() {
            if let Some(&succ) = frame.successors.get(frame.next) {
                frame.next += 1;
                if !self.is_visited(succ) {
                    let parent = tree.numbers[&frame.node];
                    self.visit(&mut tree, &mut stack, succ, parent);
                }
            } else {
                tree.postorder.push(frame.node);
                stack.pop();
            }
        }

        tree
    }

    fn is_visited(&self, node: G::Node) -> bool {
        self.visited
            .get(node.index())
            .map(|bit| *bit)
            .unwrap_or_default()
    }

    fn visit(
        &mut self,
        tree: &mut DfsTree<G::Node>,
        stack: &mut Vec<Frame<G::Node>>,
        node: G::Node,
        parent: usize,
    ) {
        if node.index() >= self.visited.len() {
            self.visited.resize(node.index() + 1, false);
        }
        self.visited.set(node.index(), true);
        tree.numbers.insert(node, tree.preorder.len());
        tree.preorder.push(node);
        tree.parents.push(parent);
        stack.push(Frame {
            node,
            successors: self.graph.successors(node).collect(),
            next: 0,
        });
    }
}

impl<G> DepthFirstSearch<'_, G>
where
    G: DirectedGraph + Successors + StartNode,
{
    pub fn run(self) -> DfsTree<G::Node> {
        let start = self.graph.start_node();
        self.run_from(start)
    }
}

/// The result of a depth-first search.
///
/// Only nodes reachable from the start node are recorded.
#[derive(Debug, Clone)]
pub struct DfsTree<N: Idx> {
    preorder: Vec<N>,
    /// Parent of each node by preorder index. The root is its own parent.
    parents: Vec<usize>,
    numbers: FxHashMap<N, usize>,
    postorder: Vec<N>,
}

impl<N: Idx> Default for DfsTree<N> {
    fn default() -> Self {
        Self {
            preorder: Vec::new(),
            parents: Vec::new(),
            numbers: FxHashMap::default(),
            postorder: Vec::new(),
        }
    }
}

impl<N: Idx> DfsTree<N> {
    pub const ROOT: usize = 0;

    pub fn len(&self) -> usize {
        self.preorder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preorder.is_empty()
    }

    pub fn preorder(&self) -> &[N] {
        &self.preorder
    }

    pub fn postorder(&self) -> &[N] {
        &self.postorder
    }

    pub fn reverse_postorder(&self) -> impl DoubleEndedIterator<Item = N> + '_ {
        self.postorder.iter().rev().copied()
    }

    /// The node with the given preorder index.
    pub fn node(&self, index: usize) -> N {
        self.preorder[index]
    }

    /// Preorder index of the DFS parent of the node at `index`.
    pub fn parent(&self, index: usize) -> usize {
        self.parents[index]
    }

    pub fn index_of(&self, node: N) -> Option<usize> {
        self.numbers.get(&node).copied()
    }

    pub fn contains(&self, node: N) -> bool {
        self.numbers.contains_key(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DirectedGraph, StartNode, Successors};

    struct AdjacencyList(Vec<Vec<usize>>);

    impl DirectedGraph for AdjacencyList {
        type Node = usize;

        fn num_nodes(&self) -> usize {
            self.0.len()
        }
    }

    impl StartNode for AdjacencyList {
        fn start_node(&self) -> usize {
            0
        }
    }

    impl Successors for AdjacencyList {
        fn successors(&self, node: usize) -> impl Iterator<Item = usize> {
            self.0[node].iter().copied()
        }
    }

    #[test]
    fn numbers_diamond_in_preorder() {
        // 0 -> 1 -> 3, 0 -> 2 -> 3
        let graph = AdjacencyList(vec![vec![1, 2], vec![3], vec![3], vec![]]);
        let tree = DepthFirstSearch::new(&graph).run();

        assert_eq!(tree.preorder(), &[0, 1, 3, 2]);
        assert_eq!(tree.parent(0), 0);
        assert_eq!(tree.parent(tree.index_of(3).unwrap()), 1);
        assert_eq!(tree.parent(tree.index_of(2).unwrap()), 0);
        assert_eq!(tree.reverse_postorder().collect::<Vec<_>>(), vec![0, 2, 1, 3]);
    }

    #[test]
    fn skips_unreachable_and_survives_cycles() {
        // 0 -> 1 -> 2 -> 1, 3 is unreachable
        let graph = AdjacencyList(vec![vec![1], vec![2], vec![1], vec![0]]);
        let tree = DepthFirstSearch::new(&graph).run();

        assert_eq!(tree.len(), 3);
        assert!(!tree.contains(3));
        assert_eq!(tree.index_of(3), None);
        assert_eq!(tree.postorder(), &[2, 1, 0]);
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let n = 100_000;
        let graph = AdjacencyList((0..n).map(|i| if i + 1 < n { vec![i + 1] } else { vec![] }).collect());
        let tree = DepthFirstSearch::new(&graph).run();
        assert_eq!(tree.len(), n);
        assert_eq!(tree.reverse_postorder().next(), Some(0));
    }
}
