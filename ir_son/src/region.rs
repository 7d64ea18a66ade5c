//! Queries over regions.
//!
//! Nothing here is stored: predecessors, successors, terminators and phis
//! are all derived from operand and user edges on demand.

use crate::{Function, NodeId, NodeKind};

impl Function {
    pub fn is_region(&self, id: NodeId) -> bool {
        self.kind(id).is_region()
    }

    /// The region a control node leaves from.
    ///
    /// For `IfTrue`/`IfFalse` this is the region of their `If`.
    pub fn control_source(&self, control: NodeId) -> Option<NodeId> {
        match self.kind(control) {
            NodeKind::Jmp | NodeKind::Ret | NodeKind::Call(_) | NodeKind::CallBuiltin(_) => {
                self.operand(control, 0)
            }
            NodeKind::IfTrue | NodeKind::IfFalse => self
                .operand(control, 0)
                .and_then(|if_node| self.operand(if_node, 0)),
            _ => None,
        }
    }

    /// Predecessor regions, aligned with the region's incoming control edges.
    ///
    /// An empty or unresolvable slot yields `None` to keep the alignment.
    pub fn predecessor_slots(&self, region: NodeId) -> impl Iterator<Item = Option<NodeId>> + '_ {
        self.operands(region)
            .iter()
            .map(move |control| control.and_then(|control| self.control_source(control)))
    }

    pub fn predecessors(&self, region: NodeId) -> Vec<NodeId> {
        self.predecessor_slots(region).flatten().collect()
    }

    /// The unique control node that ends `region`, if any.
    pub fn terminator(&self, region: NodeId) -> Option<NodeId> {
        self.users(region).iter().copied().find(|&user| {
            self.kind(user).is_terminator() && self.operand(user, 0) == Some(region)
        })
    }

    pub fn phis(&self, region: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.users(region)
            .iter()
            .copied()
            .filter(move |&user| self.kind(user).is_phi() && self.operand(user, 0) == Some(region))
    }

    /// The `IfTrue` and `IfFalse` projections of an `If`.
    pub fn if_exits(&self, if_node: NodeId) -> (Option<NodeId>, Option<NodeId>) {
        let find = |kind: NodeKind| {
            self.users(if_node)
                .iter()
                .copied()
                .find(|&user| self.kind(user) == kind)
        };
        (find(NodeKind::IfTrue), find(NodeKind::IfFalse))
    }

    /// Regions entered through the control node `control`.
    pub fn control_targets(&self, control: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.users(control)
            .iter()
            .copied()
            .filter(move |&user| self.is_region(user))
    }

    /// Successor regions. For an `If` the true side comes first.
    pub fn successors(&self, region: NodeId) -> Vec<NodeId> {
        let Some(terminator) = self.terminator(region) else {
            return Vec::new();
        };
        match self.kind(terminator) {
            NodeKind::If => {
                let (if_true, if_false) = self.if_exits(terminator);
                [if_true, if_false]
                    .into_iter()
                    .flatten()
                    .flat_map(|exit| self.control_targets(exit))
                    .collect()
            }
            _ => self.control_targets(terminator).collect(),
        }
    }

    /// The predecessor region a phi value flows in from.
    pub fn phi_source_region(&self, phi: NodeId, value_index: usize) -> Option<NodeId> {
        let region = self.operand(phi, 0)?;
        self.predecessor_slots(region).nth(value_index).flatten()
    }

    /// Values of `phi` that flow in along edges leaving `pred`.
    pub fn phi_values_from(&self, phi: NodeId, pred: NodeId) -> Vec<NodeId> {
        let Some(region) = self.operand(phi, 0) else {
            return Vec::new();
        };
        self.predecessor_slots(region)
            .enumerate()
            .filter(|(_, source)| *source == Some(pred))
            .filter_map(|(i, _)| self.operand(phi, i + 1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Function, Signature, ValueType};

    #[test]
    fn diamond_queries() {
        let mut f = Function::new("diamond", Signature::new(ValueType::Void, []));
        let start = f.start();
        let cond = f.create_constant(ValueType::Bool, 1);
        let if_node = f.create_if(start, cond);
        let if_true = f.create_if_true(if_node);
        let if_false = f.create_if_false(if_node);
        let then_region = f.create_region();
        f.add_control_input(then_region, if_true);
        let else_region = f.create_region();
        f.add_control_input(else_region, if_false);
        let then_jmp = f.create_jmp(then_region);
        let else_jmp = f.create_jmp(else_region);
        let merge = f.create_region();
        f.add_control_input(merge, then_jmp);
        f.add_control_input(merge, else_jmp);
        let phi = f.create_phi(merge, ValueType::Bool, 2);
        let zero = f.create_constant(ValueType::Bool, 0);
        f.set_phi_value(phi, 0, cond);
        f.set_phi_value(phi, 1, zero);

        assert_eq!(f.terminator(start), Some(if_node));
        assert_eq!(f.successors(start), vec![then_region, else_region]);
        assert_eq!(f.predecessors(merge), vec![then_region, else_region]);
        assert_eq!(f.phis(merge).collect::<Vec<_>>(), vec![phi]);
        assert_eq!(f.phi_source_region(phi, 1), Some(else_region));
        assert_eq!(f.phi_values_from(phi, then_region), vec![cond]);
        assert_eq!(f.terminator(merge), None);
        assert!(f.successors(merge).is_empty());
    }
}
