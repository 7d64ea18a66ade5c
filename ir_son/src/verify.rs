//! Structural verification of a function graph.

use crate::{Function, Node, NodeId, NodeKind, ValueType, VerifyError};

impl Function {
    /// Check every graph-shape rule and collect all violations.
    pub fn verify(&self) -> Result<(), Vec<VerifyError>> {
        let mut checker = GraphChecker {
            function: self,
            errors: Vec::new(),
        };
        for (id, node) in self.nodes() {
            checker.check_node(id, node);
        }

        if checker.errors.is_empty() {
            Ok(())
        } else {
            for error in &checker.errors {
                log::warn!("`{}`: {error}", self.name());
            }
            Err(checker.errors)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.verify().is_ok()
    }
}

struct GraphChecker<'a> {
    function: &'a Function,
    errors: Vec<VerifyError>,
}

impl GraphChecker<'_> {
    fn check_node(&mut self, id: NodeId, node: &Node) {
        match node.kind() {
            NodeKind::Start | NodeKind::Region | NodeKind::End => self.check_region(id, node),
            NodeKind::If => self.check_if(id, node),
            NodeKind::Phi => self.check_phi(id, node),
            NodeKind::Jmp | NodeKind::IfTrue | NodeKind::IfFalse | NodeKind::Ret => {
                self.check_operands_present(id, node);
                self.check_control_targets(id, node);
            }
            NodeKind::Call(_) | NodeKind::CallBuiltin(_) => self.check_operands_present(id, node),
            NodeKind::Binary(_) => {
                self.check_operands_present(id, node);
                self.check_operand_types(id, node, Some(node.ty()));
            }
            NodeKind::Compare(_) => {
                self.check_operands_present(id, node);
                self.check_operand_types(id, node, None);
            }
            NodeKind::Cast(_) | NodeKind::Unary(_) => self.check_operands_present(id, node),
            NodeKind::Constant(_) | NodeKind::FunctionArgument(_) => {}
        }
    }

    fn check_region(&mut self, id: NodeId, node: &Node) {
        let f = self.function;
        if node.kind() == NodeKind::Start && !node.operands().is_empty() {
            self.errors.push(VerifyError::StartHasPredecessors(id));
        }

        for (slot, input) in node.operands().iter().enumerate() {
            let Some(input) = *input else {
                self.errors
                    .push(VerifyError::MissingControlInput { region: id, slot });
                continue;
            };
            if !f.kind(input).is_control_input() {
                self.errors
                    .push(VerifyError::InvalidControlInput { region: id, input });
                continue;
            }
            if let Some(pred) = f.control_source(input) {
                if !matches!(f.kind(pred), NodeKind::Start | NodeKind::Region) {
                    self.errors
                        .push(VerifyError::InvalidPredecessor { region: id, pred });
                }
            }
        }

        let mut terminators = 0;
        for &user in node.users() {
            let kind = f.kind(user);
            if !(kind.is_phi() || kind.is_terminator()) {
                self.errors
                    .push(VerifyError::InvalidRegionUser { region: id, user });
            } else if kind.is_terminator() && f.operand(user, 0) == Some(id) {
                terminators += 1;
            }
        }
        if terminators > 1 {
            self.errors.push(VerifyError::MultipleTerminators(id));
        }

        if node.kind() == NodeKind::End && !f.successors(id).is_empty() {
            self.errors.push(VerifyError::EndHasSuccessors(id));
        }
    }

    fn check_if(&mut self, id: NodeId, node: &Node) {
        let f = self.function;
        if node.operands().len() != 2 {
            self.errors.push(VerifyError::IfOperandCount(id));
        }
        if node.operand(1).map(|cond| f.ty(cond)) != Some(ValueType::Bool) {
            self.errors.push(VerifyError::IfConditionType(id));
        }
        if !node.operand(0).is_some_and(|region| f.is_region(region)) {
            self.errors.push(VerifyError::IfInput(id));
        }

        let count = |kind| node.users().iter().filter(|&&u| f.kind(u) == kind).count();
        if node.users().len() != 2 || count(NodeKind::IfTrue) != 1 || count(NodeKind::IfFalse) != 1
        {
            self.errors.push(VerifyError::IfExits(id));
        }
    }

    fn check_phi(&mut self, id: NodeId, node: &Node) {
        let f = self.function;
        let Some(region) = node.operand(0).filter(|&region| f.is_region(region)) else {
            self.errors.push(VerifyError::PhiInput(id));
            return;
        };

        let values = node.operands().len() - 1;
        let preds = f.operands(region).len();
        if values != preds {
            self.errors.push(VerifyError::PhiArity {
                phi: id,
                values,
                preds,
            });
        }

        for (slot, value) in node.operands().iter().enumerate().skip(1) {
            match *value {
                None => self.errors.push(VerifyError::PhiMissingValue { phi: id, slot }),
                Some(value) if f.ty(value) != node.ty() => {
                    self.errors.push(VerifyError::PhiValueType {
                        phi: id,
                        value,
                        expected: node.ty(),
                        found: f.ty(value),
                    })
                }
                Some(_) => {}
            }
        }
    }

    fn check_operands_present(&mut self, id: NodeId, node: &Node) {
        for (slot, operand) in node.operands().iter().enumerate() {
            if operand.is_none() {
                self.errors
                    .push(VerifyError::MissingOperand { node: id, slot });
            }
        }
    }

    /// Both operands share a type, and it equals `result` when given.
    fn check_operand_types(&mut self, id: NodeId, node: &Node, result: Option<ValueType>) {
        let f = self.function;
        if let (Some(lhs), Some(rhs)) = (node.operand(0), node.operand(1)) {
            let (lhs, rhs) = (f.ty(lhs), f.ty(rhs));
            if lhs != rhs || result.is_some_and(|ty| ty != lhs) {
                self.errors.push(VerifyError::OperandTypes(id));
            }
        }
    }

    fn check_control_targets(&mut self, id: NodeId, node: &Node) {
        for &target in node.users() {
            if !self.function.is_region(target) {
                self.errors.push(VerifyError::InvalidSuccessor {
                    control: id,
                    target,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{BinaryOp, Function, Signature, ValueType, VerifyError};

    fn straight_line() -> (Function, crate::NodeId) {
        let mut f = Function::new("line", Signature::new(ValueType::Int32, []));
        let r1 = f.create_region();
        let jmp = f.create_jmp(f.start());
        f.add_control_input(r1, jmp);
        let one = f.create_constant(ValueType::Int32, 1);
        let five = f.create_constant(ValueType::Int32, 5);
        let add = f.create_binary(BinaryOp::Add, one, five);
        let ret = f.create_ret(r1, Some(add));
        f.add_control_input(f.end(), ret);
        (f, add)
    }

    #[test]
    fn accepts_straight_line() {
        let (f, _) = straight_line();
        assert_eq!(f.verify(), Ok(()));
    }

    #[test]
    fn reports_every_violation() {
        let (mut f, add) = straight_line();
        let region = f.create_region();
        // a phi with a value but no predecessors, plus a dangling add operand
        let phi = f.create_phi(region, ValueType::Int32, 1);
        let c = f.create_constant(ValueType::Int8, 1);
        f.set_phi_value(phi, 0, c);
        let one = f.operand(add, 0).unwrap();
        f.detach(one);

        let errors = f.verify().unwrap_err();
        assert!(errors.contains(&VerifyError::PhiArity {
            phi,
            values: 1,
            preds: 0
        }));
        assert!(errors.contains(&VerifyError::PhiValueType {
            phi,
            value: c,
            expected: ValueType::Int32,
            found: ValueType::Int8
        }));
        assert!(errors.contains(&VerifyError::MissingOperand { node: add, slot: 0 }));
        assert!(!f.is_valid());
    }

    #[test]
    fn if_needs_both_exits() {
        let mut f = Function::new("branch", Signature::new(ValueType::Void, []));
        let cond = f.create_constant(ValueType::Int32, 1);
        let if_node = f.create_if(f.start(), cond);
        let if_true = f.create_if_true(if_node);
        let target = f.create_region();
        f.add_control_input(target, if_true);

        let errors = f.verify().unwrap_err();
        assert!(errors.contains(&VerifyError::IfConditionType(if_node)));
        assert!(errors.contains(&VerifyError::IfExits(if_node)));
    }
}
