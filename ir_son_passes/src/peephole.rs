use ir_son::{BinaryOp, Function, NodeId, NodeKind, Program};

use crate::SonPass;

/// Local algebraic rewrites of `add`, `shl` and `xor`.
///
/// Constants are first moved to the right of commutative operators, so
/// every rule only has to look at the right-hand side.
pub struct Peephole;

fn constant(function: &Function, node: Option<NodeId>) -> Option<u64> {
    node.and_then(|node| function.kind(node).as_constant())
}

fn is_constant(function: &Function, node: Option<NodeId>) -> bool {
    constant(function, node).is_some()
}

/// `node` is replaced by `other` and detached.
fn replace(function: &mut Function, node: NodeId, other: NodeId) -> bool {
    log::trace!("rewrote {node} into {other}");
    function.replace_with(node, other);
    function.detach(node);
    true
}

impl Peephole {
    pub fn run(&mut self, function: &mut Function) {
        self.canonicalize(function);

        let mut work: Vec<NodeId> = function
            .nodes()
            .filter(|(_, node)| {
                matches!(
                    node.kind(),
                    NodeKind::Binary(BinaryOp::Add | BinaryOp::Shl | BinaryOp::Xor)
                )
            })
            .map(|(id, _)| id)
            .collect();

        let mut count = 0;
        while let Some(node) = work.pop() {
            if function.node(node).is_dead() || function.users_count(node) == 0 {
                continue;
            }
            let rewritten = match function.kind(node) {
                NodeKind::Binary(BinaryOp::Add) => self.try_add(function, node),
                NodeKind::Binary(BinaryOp::Shl) => self.try_shl(function, node),
                NodeKind::Binary(BinaryOp::Xor) => self.try_xor(function, node),
                _ => false,
            };
            if rewritten {
                count += 1;
            }
        }
        log::debug!("`{}`: {count} peephole rewrites", function.name());
    }

    fn canonicalize(&mut self, function: &mut Function) {
        let swaps: Vec<NodeId> = function
            .nodes()
            .filter(|(_, node)| {
                matches!(node.kind(), NodeKind::Binary(op) if op.is_commutative())
                    && !node.users().is_empty()
                    && is_constant(function, node.operand(0))
                    && !is_constant(function, node.operand(1))
            })
            .map(|(id, _)| id)
            .collect();
        for node in swaps {
            function.swap_operands(node, 0, 1);
        }
    }

    fn try_add(&mut self, function: &mut Function, node: NodeId) -> bool {
        let (lhs, rhs) = (function.operand(node, 0), function.operand(node, 1));
        let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
            return false;
        };

        // x + 0
        if constant(function, Some(rhs)) == Some(0) {
            return replace(function, node, lhs);
        }

        // (x + c1) + c2 -> (c2 + c1) + x, the inner add is left for folding
        if function.kind(lhs) == NodeKind::Binary(BinaryOp::Add)
            && is_constant(function, Some(rhs))
            && function.users_count(lhs) == 1
        {
            let (inner_lhs, inner_rhs) = (function.operand(lhs, 0), function.operand(lhs, 1));
            if let Some(x) = inner_lhs {
                if !is_constant(function, inner_lhs) && is_constant(function, inner_rhs) {
                    log::trace!("reassociated {node} with {lhs}");
                    function.set_operand(lhs, 0, Some(rhs));
                    function.set_operand(node, 1, Some(x));
                    return true;
                }
            }
        }

        // x + x -> x << 1
        if lhs == rhs {
            let one = function.create_constant(function.ty(node), 1);
            let shl = function.create_binary(BinaryOp::Shl, lhs, one);
            return replace(function, node, shl);
        }

        false
    }

    fn try_shl(&mut self, function: &mut Function, node: NodeId) -> bool {
        // x << 0
        match function.operand(node, 0) {
            Some(lhs) if constant(function, function.operand(node, 1)) == Some(0) => {
                replace(function, node, lhs)
            }
            _ => false,
        }
    }

    fn try_xor(&mut self, function: &mut Function, node: NodeId) -> bool {
        let (Some(lhs), Some(rhs)) = (function.operand(node, 0), function.operand(node, 1)) else {
            return false;
        };

        // x ^ x -> 0
        if lhs == rhs {
            let zero = function.create_constant(function.ty(node), 0);
            return replace(function, node, zero);
        }

        // x ^ 0
        if constant(function, Some(rhs)) == Some(0) {
            return replace(function, node, lhs);
        }

        false
    }
}

impl SonPass for Peephole {
    fn run_pass(&mut self, program: &mut Program) {
        for function in &mut program.functions {
            self.run(function);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir_son::{Signature, ValueType};

    struct Harness {
        f: Function,
        x: NodeId,
    }

    impl Harness {
        fn new() -> Self {
            let f = Function::new("peephole", Signature::new(ValueType::Int32, [ValueType::Int32]));
            let x = f.args()[0];
            Self { f, x }
        }

        fn constant(&mut self, value: u64) -> NodeId {
            self.f.create_constant(ValueType::Int32, value)
        }

        /// Return `value` and run the pass; yields what is returned afterwards.
        fn run(mut self, value: NodeId) -> (Function, NodeId) {
            let ret = self.f.create_ret(self.f.start(), Some(value));
            let end = self.f.end();
            self.f.add_control_input(end, ret);
            Peephole.run(&mut self.f);
            assert!(self.f.is_valid());
            let result = self.f.operand(ret, 1).unwrap();
            (self.f, result)
        }
    }

    #[test]
    fn add_zero_on_either_side() {
        let mut h = Harness::new();
        let zero = h.constant(0);
        let x = h.x;
        let add = h.f.create_binary(BinaryOp::Add, zero, x);
        let (f, result) = h.run(add);
        assert_eq!(result, x);
        assert!(f.node(add).is_dead());
    }

    #[test]
    fn add_self_becomes_shift() {
        let mut h = Harness::new();
        let x = h.x;
        let add = h.f.create_binary(BinaryOp::Add, x, x);
        let (f, result) = h.run(add);
        assert_eq!(f.kind(result), NodeKind::Binary(BinaryOp::Shl));
        assert_eq!(f.operand(result, 0), Some(x));
        assert_eq!(f.kind(f.operand(result, 1).unwrap()), NodeKind::Constant(1));
    }

    #[test]
    fn add_chain_groups_constants() {
        let mut h = Harness::new();
        let x = h.x;
        let (c1, c2) = (h.constant(3), h.constant(4));
        let inner = h.f.create_binary(BinaryOp::Add, x, c1);
        let outer = h.f.create_binary(BinaryOp::Add, inner, c2);
        let (f, result) = h.run(outer);
        assert_eq!(result, outer);
        assert_eq!(f.operands(outer), &[Some(inner), Some(x)]);
        assert_eq!(f.operands(inner), &[Some(c2), Some(c1)]);
    }

    #[test]
    fn shared_add_is_not_reassociated() {
        let mut h = Harness::new();
        let x = h.x;
        let (c1, c2) = (h.constant(3), h.constant(4));
        let inner = h.f.create_binary(BinaryOp::Add, x, c1);
        let outer = h.f.create_binary(BinaryOp::Add, inner, c2);
        let both = h.f.create_binary(BinaryOp::Mul, outer, inner);
        let (f, _) = h.run(both);
        assert_eq!(f.operands(outer), &[Some(inner), Some(c2)]);
    }

    #[test]
    fn shift_by_zero() {
        let mut h = Harness::new();
        let x = h.x;
        let zero = h.constant(0);
        let shl = h.f.create_binary(BinaryOp::Shl, x, zero);
        let (_, result) = h.run(shl);
        assert_eq!(result, x);
    }

    #[test]
    fn xor_with_zero() {
        let mut h = Harness::new();
        let x = h.x;
        let zero = h.constant(0);
        let xor = h.f.create_binary(BinaryOp::Xor, zero, x);
        let (f, result) = h.run(xor);
        assert_eq!(result, x);
        assert!(f.node(xor).is_dead());
    }

    #[test]
    fn xor_with_self() {
        let mut h = Harness::new();
        let x = h.x;
        let one = h.constant(1);
        let sum = h.f.create_binary(BinaryOp::Mul, x, one);
        let xor = h.f.create_binary(BinaryOp::Xor, sum, sum);
        let (f, result) = h.run(xor);
        assert_eq!(f.kind(result), NodeKind::Constant(0));
        assert!(f.node(xor).is_dead());
        assert_eq!(f.users_count(sum), 0);
    }
}
