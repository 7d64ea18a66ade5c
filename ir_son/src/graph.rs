//! Graph implementation for the IR.
//!
//! The control-flow graph is the subgraph of regions: a region's
//! successors and predecessors are derived through its terminator and its
//! incoming control edges.

use data_structure::graph;

use crate::{Function, NodeId};

impl graph::DirectedGraph for Function {
    type Node = NodeId;

    fn num_nodes(&self) -> usize {
        Function::num_nodes(self)
    }
}

impl graph::StartNode for Function {
    fn start_node(&self) -> Self::Node {
        self.start()
    }
}

impl graph::Successors for Function {
    fn successors(&self, node: Self::Node) -> impl Iterator<Item = Self::Node> {
        Function::successors(self, node).into_iter()
    }
}

impl graph::Predecessors for Function {
    fn predecessors(&self, node: Self::Node) -> impl Iterator<Item = Self::Node> {
        Function::predecessors(self, node).into_iter()
    }
}
