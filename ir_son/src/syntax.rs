//! Syntax of this IR.
//!
//! Control flow and data flow share a single graph. Every node lives in the
//! arena of its [`Function`](crate::Function) and refers to other nodes
//! through [`NodeId`] handles.

use data_structure::index::{
    vec::{Idx, IndexVec},
    Indexable,
};

use crate::Function;

/// The type of the value a node produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Void,
    Bool,
    Int8,
    Int32,
    Int64,
    Pointer,
}

impl ValueType {
    /// Number of meaningful bits, used by constant folding to wrap results.
    pub fn bit_width(self) -> u32 {
        match self {
            ValueType::Void => 0,
            ValueType::Bool => 1,
            ValueType::Int8 => 8,
            ValueType::Int32 => 32,
            ValueType::Int64 | ValueType::Pointer => 64,
        }
    }

    /// Truncate `value` to the width of this type.
    pub fn wrap(self, value: u64) -> u64 {
        match self.bit_width() {
            0 => 0,
            64 => value,
            bits => value & ((1u64 << bits) - 1),
        }
    }
}

/// Handle of a node in the arena of its function.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct NodeId(usize);

impl Idx for NodeId {
    fn new(idx: usize) -> Self {
        Self(idx)
    }

    fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct FnIndex(usize);

impl Idx for FnIndex {
    fn new(idx: usize) -> Self {
        Self(idx)
    }

    fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    BitCast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AShr,
}

impl BinaryOp {
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Mul | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Runtime checks emitted as calls into the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    NullCheck,
    BoundsCheck,
}

/// Every kind of node.
///
/// Operand layout per kind:
/// - `If`, `Jmp`: `[region]` (`If` additionally takes the condition at 1).
/// - `Ret`: `[region]` or `[region, value]`.
/// - `Call`, `CallBuiltin`: `[region, args...]`.
/// - `IfTrue`, `IfFalse`: `[if]`.
/// - `Region`, `End`: incoming control nodes. `Start` has none.
/// - `Phi`: `[region, values...]`, values aligned with the region's predecessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Constant(u64),
    FunctionArgument(usize),
    Cast(CastOp),
    Unary(UnaryOp),
    Binary(BinaryOp),
    Compare(CmpOp),

    Start,
    Region,
    End,
    If,
    IfTrue,
    IfFalse,
    Jmp,
    Ret,
    Call(FnIndex),
    CallBuiltin(Builtin),
    Phi,
}

impl NodeKind {
    pub fn is_region(self) -> bool {
        matches!(self, NodeKind::Start | NodeKind::Region | NodeKind::End)
    }

    /// Kinds that end a region.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            NodeKind::If
                | NodeKind::Jmp
                | NodeKind::Ret
                | NodeKind::Call(_)
                | NodeKind::CallBuiltin(_)
        )
    }

    /// Kinds that may appear as an incoming edge of a region.
    pub fn is_control_input(self) -> bool {
        matches!(
            self,
            NodeKind::Jmp
                | NodeKind::IfTrue
                | NodeKind::IfFalse
                | NodeKind::Ret
                | NodeKind::Call(_)
                | NodeKind::CallBuiltin(_)
        )
    }

    /// Data nodes with no region of their own until scheduled.
    pub fn is_floating(self) -> bool {
        matches!(
            self,
            NodeKind::Constant(_)
                | NodeKind::Cast(_)
                | NodeKind::Unary(_)
                | NodeKind::Binary(_)
                | NodeKind::Compare(_)
        )
    }

    pub fn is_phi(self) -> bool {
        matches!(self, NodeKind::Phi)
    }

    pub fn as_constant(self) -> Option<u64> {
        match self {
            NodeKind::Constant(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) ty: ValueType,
    pub(crate) operands: Vec<Option<NodeId>>,
    /// Multiset of nodes that have this node as an operand,
    /// one entry per referencing operand slot.
    pub(crate) users: Vec<NodeId>,
    pub(crate) dead: bool,
}
// `NodeId` is just an index to `Node`.
impl Indexable<NodeId> for Node {}

impl Node {
    pub(crate) fn new(kind: NodeKind, ty: ValueType) -> Self {
        Self {
            kind,
            ty,
            operands: Vec::new(),
            users: Vec::new(),
            dead: false,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn ty(&self) -> ValueType {
        self.ty
    }

    pub fn operands(&self) -> &[Option<NodeId>] {
        &self.operands
    }

    pub fn operand(&self, index: usize) -> Option<NodeId> {
        self.operands.get(index).copied().flatten()
    }

    pub fn users(&self) -> &[NodeId] {
        &self.users
    }

    /// `true` once the node has been detached from the graph.
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Whether the node defines a value that needs storage.
    pub fn is_value(&self) -> bool {
        match self.kind {
            NodeKind::Constant(_)
            | NodeKind::FunctionArgument(_)
            | NodeKind::Cast(_)
            | NodeKind::Unary(_)
            | NodeKind::Binary(_)
            | NodeKind::Compare(_)
            | NodeKind::Phi => true,
            NodeKind::Call(_) | NodeKind::CallBuiltin(_) => self.ty != ValueType::Void,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub ret: ValueType,
    pub params: Vec<ValueType>,
}

impl Signature {
    pub fn new(ret: ValueType, params: impl IntoIterator<Item = ValueType>) -> Self {
        Self {
            ret,
            params: params.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub functions: IndexVec<FnIndex, Function>,
}

impl Indexable<FnIndex> for Function {}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, function: Function) -> FnIndex {
        self.functions.push(function)
    }

    pub fn find(&self, name: &str) -> Option<FnIndex> {
        self.functions
            .iter_enumerated()
            .find(|(_, function)| function.name() == name)
            .map(|(idx, _)| idx)
    }
}
