use ir_son::{FnIndex, Function, NodeId, NodeKind, Program, ValueType};

use crate::SonPass;

/// Inline direct calls to functions whose every exit is a `Ret`.
///
/// The callee body is copied into the caller between the call's region and
/// its successor. Returned values merge through a `Phi` that takes the
/// place of the call. Recursive calls are left alone.
pub struct Inlining;

fn can_inline(function: &Function, call: NodeId, callee: &Function) -> bool {
    let exits = callee.operands(callee.end());
    !exits.is_empty()
        && exits
            .iter()
            .all(|exit| exit.is_some_and(|exit| callee.kind(exit) == NodeKind::Ret))
        && function.operands(call).len() == callee.args().len() + 1
}

impl Inlining {
    /// Replace `call` in `function` by a copy of `callee`.
    pub fn inline_call(function: &mut Function, call: NodeId, callee: &Function) {
        let map = function.import(callee);

        for (i, arg) in callee.args().iter().enumerate() {
            let Some(&copy) = map.get(arg) else {
                continue;
            };
            if let Some(value) = function.operand(call, i + 1) {
                function.replace_with(copy, value);
            }
            function.detach(copy);
        }

        let returns: Vec<(NodeId, NodeId, Option<NodeId>)> = callee
            .operands(callee.end())
            .iter()
            .flatten()
            .filter_map(|ret| map.get(ret).copied())
            .filter_map(|ret| Some((ret, function.operand(ret, 0)?, function.operand(ret, 1))))
            .collect();

        let merge = function.create_region();
        let ty = function.ty(call);
        let phi = (ty != ValueType::Void).then(|| function.create_phi(merge, ty, returns.len()));
        for (i, &(ret, region, value)) in returns.iter().enumerate() {
            if let (Some(phi), Some(value)) = (phi, value) {
                function.set_phi_value(phi, i, value);
            }
            let jmp = function.create_jmp(region);
            function.add_control_input(merge, jmp);
            function.detach(ret);
        }

        // the call's successor is now entered from the merge region
        let exit = function.create_jmp(merge);
        let targets: Vec<NodeId> = function.control_targets(call).collect();
        for target in targets {
            for slot in 0..function.operands(target).len() {
                if function.operand(target, slot) == Some(call) {
                    function.set_operand(target, slot, Some(exit));
                }
            }
        }
        if let Some(phi) = phi {
            function.replace_with(call, phi);
        }

        let region = function.operand(call, 0);
        function.detach(call);
        if let Some(&start) = map.get(&callee.start()) {
            if let Some(region) = region {
                function.replace_with(start, region);
            }
            function.detach(start);
        }
        if let Some(&end) = map.get(&callee.end()) {
            function.detach(end);
        }
        log::trace!(
            "inlined `{}` at {call} of `{}`, returning through {merge}",
            callee.name(),
            function.name()
        );
    }
}

impl SonPass for Inlining {
    fn run_pass(&mut self, program: &mut Program) {
        for caller in program.functions.indices() {
            let calls: Vec<(NodeId, FnIndex)> = program.functions[caller]
                .nodes()
                .filter_map(|(id, node)| match node.kind() {
                    NodeKind::Call(callee) if callee != caller => Some((id, callee)),
                    _ => None,
                })
                .collect();

            let mut inlined = 0;
            for (call, callee) in calls {
                let Some(callee) = program.functions.get(callee) else {
                    continue;
                };
                if !can_inline(&program.functions[caller], call, callee) {
                    continue;
                }
                let callee = callee.clone();
                Self::inline_call(&mut program.functions[caller], call, &callee);
                inlined += 1;
            }
            log::debug!(
                "`{}`: inlined {inlined} calls",
                program.functions[caller].name()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use data_structure::index::vec::Idx;
    use ir_son::{analysis::DomTree, BinaryOp, CmpOp, Signature};

    use super::*;

    fn callee() -> Function {
        let mut f = Function::new(
            "callee",
            Signature::new(ValueType::Int32, [ValueType::Int32, ValueType::Int32]),
        );
        let (a, b) = (f.args()[0], f.args()[1]);
        let c0 = f.create_constant(ValueType::Int32, 1);
        let c1 = f.create_constant(ValueType::Int32, 10);
        let use2 = f.create_binary(BinaryOp::Mul, a, c0);
        let use3 = f.create_binary(BinaryOp::Add, b, c1);
        let limit = f.create_constant(ValueType::Int32, 100);
        let cond = f.create_compare(CmpOp::Lt, use2, limit);
        let if_node = f.create_if(f.start(), cond);
        let if_true = f.create_if_true(if_node);
        let if_false = f.create_if_false(if_node);

        let b5 = f.create_region();
        f.add_control_input(b5, if_false);
        let ret = f.create_ret(b5, Some(use2));
        f.add_control_input(f.end(), ret);

        let b4 = f.create_region();
        f.add_control_input(b4, if_true);
        let ret = f.create_ret(b4, Some(use3));
        f.add_control_input(f.end(), ret);
        f
    }

    struct Caller {
        program: Program,
        caller: FnIndex,
        call: NodeId,
        after: NodeId,
        ret: NodeId,
    }

    fn caller(callee_fn: Function) -> Caller {
        let mut program = Program::new();
        let callee = program.add_function(callee_fn);

        let mut f = Function::new("caller", Signature::new(ValueType::Int32, []));
        let c0 = f.create_constant(ValueType::Int32, 1);
        let c1 = f.create_constant(ValueType::Int32, 5);
        let call = f.create_call(f.start(), callee, ValueType::Int32, &[c0, c1]);
        let after = f.create_region();
        f.add_control_input(after, call);
        let ret = f.create_ret(after, Some(call));
        f.add_control_input(f.end(), ret);
        assert!(f.is_valid());

        let caller = program.add_function(f);
        Caller {
            program,
            caller,
            call,
            after,
            ret,
        }
    }

    #[test]
    fn returns_merge_through_phi() {
        let Caller {
            mut program,
            caller,
            call,
            after,
            ret,
        } = caller(callee());
        Inlining.run_pass(&mut program);

        let f = &program.functions[caller];
        assert_eq!(f.verify(), Ok(()));
        assert!(f.node(call).is_dead());

        let phi = f.operand(ret, 1).unwrap();
        assert_eq!(f.kind(phi), NodeKind::Phi);
        assert_eq!(f.operands(phi).len(), 3);
        let merge = f.operand(phi, 0).unwrap();
        assert_eq!(f.predecessors(merge).len(), 2);

        let exit = f.operand(after, 0).unwrap();
        assert_eq!(f.kind(exit), NodeKind::Jmp);
        assert_eq!(f.operand(exit, 0), Some(merge));

        let count = |kind: NodeKind| f.nodes().filter(|(_, node)| node.kind() == kind).count();
        assert_eq!(count(NodeKind::Start), 1);
        assert_eq!(count(NodeKind::End), 1);
        assert_eq!(count(NodeKind::Call(FnIndex::new(0))), 0);
        assert!(f
            .nodes()
            .all(|(_, node)| !matches!(node.kind(), NodeKind::FunctionArgument(_))));

        let dom = DomTree::new(f);
        assert_eq!(dom.dominates(f.start(), merge), Ok(true));
        assert_eq!(dom.idom(after), Ok(Some(merge)));
    }

    #[test]
    fn callee_without_ret_exits_is_kept() {
        let mut lecture = Function::new(
            "lecture",
            Signature::new(ValueType::Int32, [ValueType::Int32, ValueType::Int32]),
        );
        let jmp = lecture.create_jmp(lecture.start());
        let end = lecture.end();
        lecture.add_control_input(end, jmp);
        let zero = lecture.create_constant(ValueType::Int32, 0);
        lecture.create_ret(end, Some(zero));

        let Caller {
            mut program,
            caller,
            call,
            ..
        } = caller(lecture);
        Inlining.run_pass(&mut program);
        assert!(!program.functions[caller].node(call).is_dead());
    }
}
