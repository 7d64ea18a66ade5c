use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};

use data_structure::{index::vec::Idx, FxHashMap};

use crate::{
    analysis::{DomTree, LoopInfo, Schedule},
    BinaryOp, Builtin, CastOp, CmpOp, Function, NodeId, NodeKind, UnaryOp, ValueType,
};

impl Display for ValueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Void => write!(f, "void"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int8 => write!(f, "i8"),
            ValueType::Int32 => write!(f, "i32"),
            ValueType::Int64 => write!(f, "i64"),
            ValueType::Pointer => write!(f, "ptr"),
        }
    }
}

impl Display for CastOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CastOp::Trunc => write!(f, "trunc"),
            CastOp::ZExt => write!(f, "zext"),
            CastOp::SExt => write!(f, "sext"),
            CastOp::BitCast => write!(f, "bitcast"),
        }
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Not => write!(f, "not"),
            UnaryOp::Neg => write!(f, "neg"),
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "add"),
            BinaryOp::Sub => write!(f, "sub"),
            BinaryOp::Mul => write!(f, "mul"),
            BinaryOp::Div => write!(f, "div"),
            BinaryOp::Rem => write!(f, "rem"),
            BinaryOp::And => write!(f, "and"),
            BinaryOp::Or => write!(f, "or"),
            BinaryOp::Xor => write!(f, "xor"),
            BinaryOp::Shl => write!(f, "shl"),
            BinaryOp::Shr => write!(f, "shr"),
            BinaryOp::AShr => write!(f, "ashr"),
        }
    }
}

impl Display for CmpOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CmpOp::Eq => write!(f, "eq"),
            CmpOp::Ne => write!(f, "ne"),
            CmpOp::Lt => write!(f, "lt"),
            CmpOp::Le => write!(f, "le"),
            CmpOp::Gt => write!(f, "gt"),
            CmpOp::Ge => write!(f, "ge"),
        }
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Builtin::NullCheck => write!(f, "null_check"),
            Builtin::BoundsCheck => write!(f, "bounds_check"),
        }
    }
}

/// Names used when printing nodes.
///
/// Nodes without an explicit name print as their creation index.
#[derive(Debug, Clone, Default)]
pub struct NodeNames {
    names: FxHashMap<NodeId, String>,
}

impl NodeNames {
    /// `%N` for every node, except `entry` and `exit` for `Start` and `End`.
    pub fn new(function: &Function) -> Self {
        let mut names = Self::default();
        names.set(function.start(), "entry");
        names.set(function.end(), "exit");
        names
    }

    /// `n0, n1, ...` for regions in emission order and `v0, v1, ...` for
    /// values in the order they are defined.
    pub fn sequential(function: &Function, schedule: &Schedule) -> Self {
        let mut names = Self::default();
        let mut values = 0;
        for (i, &region) in schedule.linear_order().iter().enumerate() {
            names.set(region, format!("n{i}"));
            let terminator = function
                .terminator(region)
                .filter(|&terminator| function.node(terminator).is_value());
            let defined = function
                .phis(region)
                .chain(schedule.nodes_in(region).iter().copied())
                .chain(terminator)
                .chain(schedule.nodes_after_call(region).iter().copied());
            for value in defined {
                names.set(value, format!("v{values}"));
                values += 1;
            }
        }
        names
    }

    pub fn set(&mut self, node: NodeId, name: impl Into<String>) {
        self.names.insert(node, name.into());
    }

    pub fn get(&self, node: NodeId) -> Cow<'_, str> {
        match self.names.get(&node) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(node.to_string()),
        }
    }
}

/// Prints a scheduled function region by region.
pub struct FunctionPrinter<'a> {
    function: &'a Function,
    schedule: &'a Schedule,
    names: &'a NodeNames,
}

impl<'a> FunctionPrinter<'a> {
    pub fn new(function: &'a Function, schedule: &'a Schedule, names: &'a NodeNames) -> Self {
        Self {
            function,
            schedule,
            names,
        }
    }

    fn format_operand(&self, f: &mut Formatter<'_>, operand: Option<NodeId>) -> fmt::Result {
        match operand {
            Some(operand) => write!(f, "{}", self.names.get(operand)),
            None => write!(f, "_"),
        }
    }

    fn format_operands(&self, f: &mut Formatter<'_>, operands: &[Option<NodeId>]) -> fmt::Result {
        operands.iter().enumerate().try_for_each(|(i, operand)| {
            if i > 0 {
                write!(f, ", ")?;
            }
            self.format_operand(f, *operand)
        })
    }

    fn format_targets(&self, f: &mut Formatter<'_>, control: NodeId) -> fmt::Result {
        self.function
            .control_targets(control)
            .enumerate()
            .try_for_each(|(i, target)| {
                write!(f, "{}{}", if i == 0 { "" } else { ", " }, self.names.get(target))
            })
    }

    fn format_node(&self, f: &mut Formatter<'_>, node: NodeId) -> fmt::Result {
        let function = self.function;
        let operands = function.operands(node);
        let ty = function.ty(node);
        write!(f, "    ")?;
        if function.node(node).is_value() {
            write!(f, "{} = ", self.names.get(node))?;
        }
        match function.kind(node) {
            NodeKind::Constant(value) => write!(f, "const {ty} {value}")?,
            NodeKind::FunctionArgument(index) => write!(f, "arg {ty} {index}")?,
            NodeKind::Cast(op) => {
                write!(f, "{op} ")?;
                self.format_operands(f, operands)?;
                write!(f, " to {ty}")?;
            }
            NodeKind::Unary(op) => {
                write!(f, "{op} {ty} ")?;
                self.format_operands(f, operands)?;
            }
            NodeKind::Binary(op) => {
                write!(f, "{op} {ty} ")?;
                self.format_operands(f, operands)?;
            }
            NodeKind::Compare(op) => {
                write!(f, "cmp {op} ")?;
                self.format_operands(f, operands)?;
            }
            NodeKind::Phi => {
                write!(f, "phi {ty} ")?;
                operands
                    .iter()
                    .enumerate()
                    .skip(1)
                    .try_for_each(|(slot, value)| {
                        if slot > 1 {
                            write!(f, ", ")?;
                        }
                        write!(f, "[")?;
                        self.format_operand(f, *value)?;
                        write!(f, ", ")?;
                        self.format_operand(f, function.phi_source_region(node, slot - 1))?;
                        write!(f, "]")
                    })?;
            }
            NodeKind::If => {
                write!(f, "if ")?;
                self.format_operand(f, function.operand(node, 1))?;
                let (if_true, if_false) = function.if_exits(node);
                write!(f, " then ")?;
                if let Some(if_true) = if_true {
                    self.format_targets(f, if_true)?;
                }
                write!(f, " else ")?;
                if let Some(if_false) = if_false {
                    self.format_targets(f, if_false)?;
                }
            }
            NodeKind::Jmp => {
                write!(f, "jmp ")?;
                self.format_targets(f, node)?;
            }
            NodeKind::Ret => {
                write!(f, "ret")?;
                if let Some(value) = function.operand(node, 1) {
                    write!(f, " {}", self.names.get(value))?;
                }
            }
            NodeKind::Call(callee) => {
                write!(f, "call {ty} @{}(", callee.index())?;
                self.format_operands(f, operands.get(1..).unwrap_or_default())?;
                write!(f, ") then ")?;
                self.format_targets(f, node)?;
            }
            NodeKind::CallBuiltin(builtin) => {
                write!(f, "call {builtin}(")?;
                self.format_operands(f, operands.get(1..).unwrap_or_default())?;
                write!(f, ") then ")?;
                self.format_targets(f, node)?;
            }
            kind @ (NodeKind::Start
            | NodeKind::Region
            | NodeKind::End
            | NodeKind::IfTrue
            | NodeKind::IfFalse) => write!(f, "{kind:?}")?,
        }
        writeln!(f)
    }

    fn format_region(&self, f: &mut Formatter<'_>, region: NodeId) -> fmt::Result {
        write!(f, "{}: /* Pred:", self.names.get(region))?;
        self.function
            .predecessors(region)
            .into_iter()
            .enumerate()
            .try_for_each(|(i, pred)| {
                write!(f, "{}{}", if i == 0 { " " } else { ", " }, self.names.get(pred))
            })?;
        writeln!(f, " */")?;
        self.function
            .phis(region)
            .try_for_each(|phi| self.format_node(f, phi))?;
        self.schedule
            .nodes_in(region)
            .iter()
            .try_for_each(|&node| self.format_node(f, node))?;
        if let Some(terminator) = self.function.terminator(region) {
            self.format_node(f, terminator)?;
        }
        self.schedule
            .nodes_after_call(region)
            .iter()
            .try_for_each(|&node| self.format_node(f, node))
    }
}

impl Display for FunctionPrinter<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let function = self.function;
        write!(f, "func {} {}(", function.signature().ret, function.name())?;
        function.args().iter().enumerate().try_for_each(|(i, &arg)| {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", function.ty(arg), self.names.get(arg))
        })?;
        writeln!(f, ") {{")?;
        self.schedule
            .linear_order()
            .iter()
            .try_for_each(|&region| self.format_region(f, region))?;
        write!(f, "}}")
    }
}

impl Function {
    /// Schedule the function and render it.
    pub fn dump(&self, names: &NodeNames) -> String {
        let dom = DomTree::new(self);
        let loops = LoopInfo::new(self, &dom);
        let schedule = Schedule::new(self, &dom, &loops);
        FunctionPrinter::new(self, &schedule, names).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analysis::fixtures::counting_loop, FnIndex, Signature};

    #[test]
    fn straight_line() {
        let mut f = Function::new("inc", Signature::new(ValueType::Int32, [ValueType::Int32]));
        let x = f.arg(0).unwrap();
        let one = f.create_constant(ValueType::Int32, 1);
        let sum = f.create_binary(BinaryOp::Add, x, one);
        let ret = f.create_ret(f.start(), Some(sum));
        f.add_control_input(f.end(), ret);

        let expected = "\
func i32 inc(i32 %2) {
entry: /* Pred: */
    %2 = arg i32 0
    %3 = const i32 1
    %4 = add i32 %2, %3
    ret %4
exit: /* Pred: entry */
}";
        assert_eq!(f.dump(&NodeNames::new(&f)), expected);
    }

    #[test]
    fn call_result_is_printed_after_the_call() {
        let mut f = Function::new("edge", Signature::new(ValueType::Int32, [ValueType::Int32]));
        let (start, x) = (f.start(), f.arg(0).unwrap());
        let call = f.create_call(start, FnIndex::new(0), ValueType::Int32, &[x]);
        let after = f.create_region();
        f.add_control_input(after, call);
        let one = f.create_constant(ValueType::Int32, 1);
        let sum = f.create_binary(BinaryOp::Add, call, one);
        let phi = f.create_phi(after, ValueType::Int32, 1);
        f.set_phi_value(phi, 0, sum);
        let ret = f.create_ret(after, Some(phi));
        f.add_control_input(f.end(), ret);

        let dump = f.dump(&NodeNames::new(&f));
        let line = |text: &str| dump.lines().position(|l| l.contains(text)).unwrap();
        assert!(line("= call i32 @0(") < line("= add i32"), "{dump}");
        assert!(line("= add i32") < line("/* Pred: entry */"), "{dump}");
    }

    #[test]
    fn custom_names() {
        let mut f = Function::new("id", Signature::new(ValueType::Int32, [ValueType::Int32]));
        let x = f.arg(0).unwrap();
        let ret = f.create_ret(f.start(), Some(x));
        f.add_control_input(f.end(), ret);

        let mut names = NodeNames::new(&f);
        names.set(x, "x");
        let dump = f.dump(&names);
        assert!(dump.starts_with("func i32 id(i32 x) {"));
        assert!(dump.contains("    ret x\n"));
        assert_eq!(names.get(ret), "%3");
    }

    #[test]
    fn loop_regions_and_phis() {
        let counting = counting_loop();
        let f = &counting.f;
        let dom = DomTree::new(f);
        let loops = LoopInfo::new(f, &dom);
        let schedule = Schedule::new(f, &dom, &loops);
        let names = NodeNames::sequential(f, &schedule);
        let dump = FunctionPrinter::new(f, &schedule, &names).to_string();

        let headers: Vec<_> = dump.lines().filter(|line| line.contains("/* Pred:")).collect();
        assert_eq!(
            headers,
            vec![
                "n0: /* Pred: */",
                "n1: /* Pred: n0, n2 */",
                "n2: /* Pred: n1 */",
                "n3: /* Pred: n1 */",
                "n4: /* Pred: n3 */",
            ]
        );
        assert_eq!(dump.lines().filter(|line| line.contains("= phi")).count(), 2);
        assert!(dump.contains("then n2 else n3"));
    }
}
