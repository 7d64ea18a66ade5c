//! The graph store: a function owns every node it creates.

use data_structure::{index::vec::IndexVec, FxHashMap};

use crate::{
    Builtin, BinaryOp, CastOp, CmpOp, FnIndex, Node, NodeId, NodeKind, Signature, UnaryOp,
    ValueType,
};

/// A function in Sea-of-Nodes form.
///
/// All nodes are allocated in `nodes` and never freed individually.
/// Detached nodes stay in the arena, flagged dead, until the function
/// itself is dropped.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    signature: Signature,
    nodes: IndexVec<NodeId, Node>,
    start: NodeId,
    end: NodeId,
    args: Vec<NodeId>,
}

impl Function {
    pub fn new(name: impl Into<String>, signature: Signature) -> Self {
        let mut nodes = IndexVec::new();
        let start = nodes.push(Node::new(NodeKind::Start, ValueType::Void));
        let end = nodes.push(Node::new(NodeKind::End, ValueType::Void));
        let args = signature
            .params
            .iter()
            .enumerate()
            .map(|(i, ty)| nodes.push(Node::new(NodeKind::FunctionArgument(i), *ty)))
            .collect();
        Self {
            name: name.into(),
            signature,
            nodes,
            start,
            end,
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn end(&self) -> NodeId {
        self.end
    }

    pub fn args(&self) -> &[NodeId] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<NodeId> {
        self.args.get(index).copied()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id].kind
    }

    pub fn ty(&self, id: NodeId) -> ValueType {
        self.nodes[id].ty
    }

    pub fn operands(&self, id: NodeId) -> &[Option<NodeId>] {
        &self.nodes[id].operands
    }

    pub fn operand(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id].operand(index)
    }

    pub fn users(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].users
    }

    pub fn users_count(&self, id: NodeId) -> usize {
        self.nodes[id].users.len()
    }

    /// Size of the arena, including detached nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over every node that has not been detached, in creation order.
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter_enumerated().filter(|(_, node)| !node.dead)
    }

    pub fn node_ids(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.nodes().map(|(id, _)| id)
    }

    fn alloc(&mut self, kind: NodeKind, ty: ValueType, operands: &[NodeId]) -> NodeId {
        let id = self.nodes.push(Node::new(kind, ty));
        for &operand in operands {
            self.add_operand(id, Some(operand));
        }
        log::trace!("created {id} as {kind:?}");
        id
    }
}

// factory
impl Function {
    pub fn create_constant(&mut self, ty: ValueType, value: u64) -> NodeId {
        self.alloc(NodeKind::Constant(ty.wrap(value)), ty, &[])
    }

    pub fn create_cast(&mut self, op: CastOp, value: NodeId, ty: ValueType) -> NodeId {
        self.alloc(NodeKind::Cast(op), ty, &[value])
    }

    pub fn create_unary(&mut self, op: UnaryOp, value: NodeId) -> NodeId {
        let ty = self.ty(value);
        self.alloc(NodeKind::Unary(op), ty, &[value])
    }

    /// The result has the type of `lhs`.
    pub fn create_binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        let ty = self.ty(lhs);
        self.alloc(NodeKind::Binary(op), ty, &[lhs, rhs])
    }

    pub fn create_compare(&mut self, op: CmpOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.alloc(NodeKind::Compare(op), ValueType::Bool, &[lhs, rhs])
    }

    /// A merge point with no incoming edges yet; see [`Function::add_control_input`].
    pub fn create_region(&mut self) -> NodeId {
        self.alloc(NodeKind::Region, ValueType::Void, &[])
    }

    pub fn create_if(&mut self, region: NodeId, condition: NodeId) -> NodeId {
        self.alloc(NodeKind::If, ValueType::Void, &[region, condition])
    }

    pub fn create_if_true(&mut self, if_node: NodeId) -> NodeId {
        self.alloc(NodeKind::IfTrue, ValueType::Void, &[if_node])
    }

    pub fn create_if_false(&mut self, if_node: NodeId) -> NodeId {
        self.alloc(NodeKind::IfFalse, ValueType::Void, &[if_node])
    }

    pub fn create_jmp(&mut self, region: NodeId) -> NodeId {
        self.alloc(NodeKind::Jmp, ValueType::Void, &[region])
    }

    pub fn create_ret(&mut self, region: NodeId, value: Option<NodeId>) -> NodeId {
        let operands: Vec<_> = std::iter::once(region).chain(value).collect();
        self.alloc(NodeKind::Ret, ValueType::Void, &operands)
    }

    pub fn create_call(
        &mut self,
        region: NodeId,
        callee: FnIndex,
        ret: ValueType,
        args: &[NodeId],
    ) -> NodeId {
        let operands: Vec<_> = std::iter::once(region).chain(args.iter().copied()).collect();
        self.alloc(NodeKind::Call(callee), ret, &operands)
    }

    pub fn create_call_builtin(
        &mut self,
        region: NodeId,
        builtin: Builtin,
        args: &[NodeId],
    ) -> NodeId {
        let operands: Vec<_> = std::iter::once(region).chain(args.iter().copied()).collect();
        self.alloc(NodeKind::CallBuiltin(builtin), ValueType::Void, &operands)
    }

    /// A phi with `arity` empty value slots, filled with [`Function::set_phi_value`].
    pub fn create_phi(&mut self, region: NodeId, ty: ValueType, arity: usize) -> NodeId {
        let phi = self.alloc(NodeKind::Phi, ty, &[region]);
        self.nodes[phi].operands.resize(arity + 1, None);
        phi
    }

    pub fn set_phi_value(&mut self, phi: NodeId, index: usize, value: NodeId) {
        self.set_operand(phi, index + 1, Some(value));
    }

    /// Append an incoming control edge to a region.
    pub fn add_control_input(&mut self, region: NodeId, control: NodeId) -> usize {
        self.add_operand(region, Some(control))
    }
}

// edge primitives
//
// Every change of an operand slot goes through `set_operand` or
// `add_operand`, which keep the user multiset of the old and new operand
// in sync with the slot.
impl Function {
    pub fn set_operand(&mut self, node: NodeId, index: usize, value: Option<NodeId>) {
        let old = self.nodes[node].operands[index];
        if old == value {
            return;
        }
        if let Some(old) = old {
            self.remove_user(old, node);
        }
        self.nodes[node].operands[index] = value;
        if let Some(value) = value {
            self.nodes[value].users.push(node);
        }
    }

    /// Returns the index of the new slot.
    pub fn add_operand(&mut self, node: NodeId, value: Option<NodeId>) -> usize {
        let index = self.nodes[node].operands.len();
        self.nodes[node].operands.push(None);
        self.set_operand(node, index, value);
        index
    }

    /// Remove the slot at `index`, shifting the following operands down.
    pub fn remove_operand(&mut self, node: NodeId, index: usize) {
        self.set_operand(node, index, None);
        self.nodes[node].operands.remove(index);
    }

    pub fn swap_operands(&mut self, node: NodeId, a: usize, b: usize) {
        self.nodes[node].operands.swap(a, b);
    }

    /// Redirect every user of `node` to `other`.
    pub fn replace_with(&mut self, node: NodeId, other: NodeId) {
        if node == other {
            return;
        }
        let users = self.nodes[node].users.clone();
        for user in users {
            // a user appears once per slot; the first pass clears all of them
            for index in 0..self.nodes[user].operands.len() {
                if self.nodes[user].operands[index] == Some(node) {
                    self.set_operand(user, index, Some(other));
                }
            }
        }
    }

    /// Cut every edge of `node` and mark it dead.
    ///
    /// Operand slots of former users that referred to `node` become empty
    /// and stay in place, so positional alignment (phi values, region
    /// inputs) is kept until the caller fills or removes them.
    pub fn detach(&mut self, node: NodeId) {
        for index in 0..self.nodes[node].operands.len() {
            self.set_operand(node, index, None);
        }
        self.nodes[node].operands.clear();

        let users = std::mem::take(&mut self.nodes[node].users);
        for user in users {
            for slot in self.nodes[user].operands.iter_mut() {
                if *slot == Some(node) {
                    *slot = None;
                }
            }
        }
        self.nodes[node].dead = true;
        log::trace!("detached {node}");
    }

    fn remove_user(&mut self, node: NodeId, user: NodeId) {
        let users = &mut self.nodes[node].users;
        if let Some(pos) = users.iter().position(|&u| u == user) {
            users.remove(pos);
        }
    }
}

impl Function {
    /// Clone every live node of `other` into this function.
    ///
    /// Returns the mapping from nodes of `other` to their copies. The copied
    /// `Start`, `End` and arguments are plain nodes of this function; the
    /// caller is expected to rewire and detach them.
    pub fn import(&mut self, other: &Function) -> FxHashMap<NodeId, NodeId> {
        let mut map = FxHashMap::default();
        for (id, node) in other.nodes() {
            let copy = self.nodes.push(Node::new(node.kind, node.ty));
            map.insert(id, copy);
        }
        for (id, node) in other.nodes() {
            let copy = map[&id];
            for operand in &node.operands {
                let operand = operand.and_then(|operand| map.get(&operand).copied());
                self.add_operand(copy, operand);
            }
        }
        log::debug!(
            "imported {} nodes of `{}` into `{}`",
            map.len(),
            other.name,
            self.name
        );
        map
    }
}
