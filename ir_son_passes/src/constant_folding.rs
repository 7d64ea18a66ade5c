use data_structure::FxHashSet;
use ir_son::{BinaryOp, Function, NodeId, NodeKind, Program, ValueType};

use crate::SonPass;

/// Evaluate binary nodes whose operands are both constants.
///
/// Folded nodes are detached; their constant operands are left in place
/// and dropped by the scheduler once nothing uses them.
pub struct ConstantFolding;

fn evaluate(op: BinaryOp, ty: ValueType, x: u64, y: u64) -> Option<u64> {
    let value = match op {
        BinaryOp::Add => x.wrapping_add(y),
        BinaryOp::Sub => x.wrapping_sub(y),
        BinaryOp::Mul => x.wrapping_mul(y),
        BinaryOp::And => x & y,
        BinaryOp::Or => x | y,
        BinaryOp::Xor => x ^ y,
        // over-wide shifts have no defined result to fold to
        BinaryOp::Shl if y < u64::from(ty.bit_width()) => x << y,
        BinaryOp::Shr if y < u64::from(ty.bit_width()) => x >> y,
        _ => return None,
    };
    Some(ty.wrap(value))
}

fn constant_operands(function: &Function, node: NodeId) -> Option<(BinaryOp, u64, u64)> {
    let NodeKind::Binary(op) = function.kind(node) else {
        return None;
    };
    let constant = |index| {
        function
            .operand(node, index)
            .and_then(|operand| function.kind(operand).as_constant())
    };
    Some((op, constant(0)?, constant(1)?))
}

fn can_fold(function: &Function, node: NodeId) -> bool {
    constant_operands(function, node)
        .is_some_and(|(op, x, y)| evaluate(op, function.ty(node), x, y).is_some())
}

fn fold(function: &mut Function, node: NodeId) -> Option<NodeId> {
    let (op, x, y) = constant_operands(function, node)?;
    let ty = function.ty(node);
    let value = evaluate(op, ty, x, y)?;
    let folded = function.create_constant(ty, value);
    function.replace_with(node, folded);
    function.detach(node);
    log::trace!("folded {node} into {folded} = {value}");
    Some(folded)
}

impl ConstantFolding {
    pub fn run(&mut self, function: &mut Function) {
        let mut work: Vec<NodeId> = function
            .nodes()
            .filter(|(id, node)| !node.users().is_empty() && can_fold(function, *id))
            .map(|(id, _)| id)
            .collect();
        let mut visited = FxHashSet::default();
        let mut count = 0;

        while let Some(node) = work.pop() {
            if function.node(node).is_dead() || !visited.insert(node) {
                continue;
            }
            let Some(folded) = fold(function, node) else {
                continue;
            };
            count += 1;
            work.extend(
                function
                    .users(folded)
                    .iter()
                    .copied()
                    .filter(|&user| can_fold(function, user)),
            );
        }

        log::debug!("`{}`: folded {count} nodes", function.name());
    }
}

impl SonPass for ConstantFolding {
    fn run_pass(&mut self, program: &mut Program) {
        for function in &mut program.functions {
            self.run(function);
        }
    }
}
