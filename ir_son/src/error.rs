use crate::{NodeId, ValueType};

/// A query against an analysis about a node it has no record of.
///
/// Analyses are snapshots: asking about a region that is unreachable from
/// `Start`, or about a node created after the analysis ran, is a contract
/// violation on the caller's side.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("region {0} is not reachable from start")]
    RegionNotFound(NodeId),
    #[error("value {0} has no live range")]
    ValueNotFound(NodeId),
    #[error("node {0} is not a region")]
    NotARegion(NodeId),
}

/// A violated graph-shape rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("start {0} has incoming control edges")]
    StartHasPredecessors(NodeId),
    #[error("region {region} has an empty control input at slot {slot}")]
    MissingControlInput { region: NodeId, slot: usize },
    #[error("region {region} has {input} as control input, which is not a control node")]
    InvalidControlInput { region: NodeId, input: NodeId },
    #[error("region {region} has predecessor {pred}, which is not a region")]
    InvalidPredecessor { region: NodeId, pred: NodeId },
    #[error("region {region} is used by {user}, which is not a phi or terminator")]
    InvalidRegionUser { region: NodeId, user: NodeId },
    #[error("region {0} has more than one terminator")]
    MultipleTerminators(NodeId),
    #[error("end {0} has successors")]
    EndHasSuccessors(NodeId),
    #[error("control node {control} flows into {target}, which is not a region")]
    InvalidSuccessor { control: NodeId, target: NodeId },
    #[error("if {0} must have exactly 2 operands")]
    IfOperandCount(NodeId),
    #[error("if {0} must have a boolean condition")]
    IfConditionType(NodeId),
    #[error("if {0} must take a region as control input")]
    IfInput(NodeId),
    #[error("if {0} must have exactly one IfTrue and one IfFalse user")]
    IfExits(NodeId),
    #[error("phi {0} must take a region as control input")]
    PhiInput(NodeId),
    #[error("phi {phi} has {values} values but its region has {preds} predecessors")]
    PhiArity {
        phi: NodeId,
        values: usize,
        preds: usize,
    },
    #[error("phi {phi} has no value at slot {slot}")]
    PhiMissingValue { phi: NodeId, slot: usize },
    #[error("phi {phi} of type {expected:?} has value {value} of type {found:?}")]
    PhiValueType {
        phi: NodeId,
        value: NodeId,
        expected: ValueType,
        found: ValueType,
    },
    #[error("{node} has an empty operand at slot {slot}")]
    MissingOperand { node: NodeId, slot: usize },
    #[error("operands of {0} have mismatched types")]
    OperandTypes(NodeId),
}
