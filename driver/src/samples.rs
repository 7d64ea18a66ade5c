//! Built-in graphs the command line can run the pipeline on.

use ir_son::{BinaryOp, Builtin, CmpOp, FnIndex, Function, NodeId, Program, Signature, ValueType};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sample {
    StraightLine,
    Diamond,
    Loop,
    Counting,
    Nested,
    Calls,
    Checks,
    Arith,
}

impl Sample {
    pub const ALL: &'static [Sample] = &[
        Sample::StraightLine,
        Sample::Diamond,
        Sample::Loop,
        Sample::Counting,
        Sample::Nested,
        Sample::Calls,
        Sample::Checks,
        Sample::Arith,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Sample::StraightLine => "straight-line",
            Sample::Diamond => "diamond",
            Sample::Loop => "loop",
            Sample::Counting => "counting",
            Sample::Nested => "nested",
            Sample::Calls => "calls",
            Sample::Checks => "checks",
            Sample::Arith => "arith",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Sample::StraightLine => "one region adding two constants",
            Sample::Diamond => "if/else merging two constants through a phi",
            Sample::Loop => "a loop whose bound is used after it",
            Sample::Counting => "the counting loop from the liveness lecture",
            Sample::Nested => "two nested loops",
            Sample::Calls => "a caller and a two-exit callee, for inlining",
            Sample::Checks => "a null check repeated under a branch",
            Sample::Arith => "arithmetic left for folding and peephole rules",
        }
    }

    pub fn build(self) -> Program {
        let mut program = Program::new();
        match self {
            Sample::StraightLine => {
                program.add_function(straight_line().function);
            }
            Sample::Diamond => {
                program.add_function(diamond().function);
            }
            Sample::Loop => {
                program.add_function(bounded_loop().function);
            }
            Sample::Counting => {
                program.add_function(counting().function);
            }
            Sample::Nested => {
                program.add_function(nested().function);
            }
            Sample::Calls => {
                let callee = program.add_function(two_exits());
                program.add_function(caller(callee).function);
            }
            Sample::Checks => {
                program.add_function(checks().function);
            }
            Sample::Arith => {
                program.add_function(arith().function);
            }
        }
        program
    }
}

fn jmp(f: &mut Function, from: NodeId, to: NodeId) -> NodeId {
    let jmp = f.create_jmp(from);
    f.add_control_input(to, jmp);
    jmp
}

fn branch(f: &mut Function, from: NodeId, cond: NodeId, on_true: NodeId, on_false: NodeId) {
    let if_node = f.create_if(from, cond);
    let if_true = f.create_if_true(if_node);
    let if_false = f.create_if_false(if_node);
    f.add_control_input(on_true, if_true);
    f.add_control_input(on_false, if_false);
}

fn ret(f: &mut Function, region: NodeId, value: Option<NodeId>) -> NodeId {
    let ret = f.create_ret(region, value);
    let end = f.end();
    f.add_control_input(end, ret);
    ret
}

pub struct StraightLine {
    pub function: Function,
    pub region: NodeId,
    pub add: NodeId,
}

/// `entry -> r1 -> exit` where `r1` returns `1 + 5`.
pub fn straight_line() -> StraightLine {
    let mut f = Function::new("straight_line", Signature::new(ValueType::Int32, []));
    let (start, region) = (f.start(), f.create_region());
    jmp(&mut f, start, region);
    let one = f.create_constant(ValueType::Int32, 1);
    let five = f.create_constant(ValueType::Int32, 5);
    let add = f.create_binary(BinaryOp::Add, one, five);
    ret(&mut f, region, Some(add));
    StraightLine {
        function: f,
        region,
        add,
    }
}

pub struct Diamond {
    pub function: Function,
    pub then_region: NodeId,
    pub else_region: NodeId,
    pub merge: NodeId,
    pub phi: NodeId,
}

/// Branch on the argument and merge `1` or `2` through a phi.
pub fn diamond() -> Diamond {
    let mut f = Function::new("diamond", Signature::new(ValueType::Int32, [ValueType::Bool]));
    let (start, cond) = (f.start(), f.args()[0]);
    let [then_region, else_region, merge] = [(); 3].map(|_| f.create_region());
    branch(&mut f, start, cond, then_region, else_region);
    jmp(&mut f, then_region, merge);
    jmp(&mut f, else_region, merge);

    let one = f.create_constant(ValueType::Int32, 1);
    let two = f.create_constant(ValueType::Int32, 2);
    let phi = f.create_phi(merge, ValueType::Int32, 2);
    f.set_phi_value(phi, 0, one);
    f.set_phi_value(phi, 1, two);
    ret(&mut f, merge, Some(phi));
    Diamond {
        function: f,
        then_region,
        else_region,
        merge,
        phi,
    }
}

pub struct BoundedLoop {
    pub function: Function,
    pub header: NodeId,
    pub latch: NodeId,
    pub exit: NodeId,
    pub bound: NodeId,
    pub counter: NodeId,
}

/// `for i in 0..n {}; return n + i`
pub fn bounded_loop() -> BoundedLoop {
    let mut f = Function::new("bounded_loop", Signature::new(ValueType::Int32, [ValueType::Int32]));
    let (start, bound) = (f.start(), f.args()[0]);
    let [header, latch, exit] = [(); 3].map(|_| f.create_region());
    jmp(&mut f, start, header);

    let zero = f.create_constant(ValueType::Int32, 0);
    let counter = f.create_phi(header, ValueType::Int32, 2);
    let cond = f.create_compare(CmpOp::Lt, counter, bound);
    branch(&mut f, header, cond, latch, exit);

    let one = f.create_constant(ValueType::Int32, 1);
    let next = f.create_binary(BinaryOp::Add, counter, one);
    jmp(&mut f, latch, header);
    f.set_phi_value(counter, 0, zero);
    f.set_phi_value(counter, 1, next);

    let sum = f.create_binary(BinaryOp::Add, bound, counter);
    ret(&mut f, exit, Some(sum));
    BoundedLoop {
        function: f,
        header,
        latch,
        exit,
        bound,
        counter,
    }
}

pub struct Counting {
    pub function: Function,
    pub regions: [NodeId; 5],
}

/// The lecture's counting loop.
///
/// ```text
/// n0: v0 = 1, v1 = 10; jmp n1
/// n1: v3 = phi(v0, v7), v4 = phi(v1, v8); v5 = v4 == v0; if v5 n2 n3
/// n2: v8 = v4 - v0, v7 = v3 * v4; jmp n1
/// n3: jmp n4
/// n4: v2 = 20, v9 = v2 + v3; ret v9
/// ```
pub fn counting() -> Counting {
    let mut f = Function::new("counting", Signature::new(ValueType::Int32, []));
    let (n0, n4) = (f.start(), f.end());
    let [n1, n2, n3] = [(); 3].map(|_| f.create_region());

    let v0 = f.create_constant(ValueType::Int32, 1);
    let v1 = f.create_constant(ValueType::Int32, 10);
    let v2 = f.create_constant(ValueType::Int32, 20);
    jmp(&mut f, n0, n1);
    jmp(&mut f, n2, n1);
    jmp(&mut f, n3, n4);

    let v3 = f.create_phi(n1, ValueType::Int32, 2);
    let v4 = f.create_phi(n1, ValueType::Int32, 2);
    let v5 = f.create_compare(CmpOp::Eq, v4, v0);
    branch(&mut f, n1, v5, n2, n3);

    let v7 = f.create_binary(BinaryOp::Mul, v3, v4);
    let v8 = f.create_binary(BinaryOp::Sub, v4, v0);
    f.set_phi_value(v3, 0, v0);
    f.set_phi_value(v3, 1, v7);
    f.set_phi_value(v4, 0, v1);
    f.set_phi_value(v4, 1, v8);

    let v9 = f.create_binary(BinaryOp::Add, v2, v3);
    f.create_ret(n4, Some(v9));
    Counting {
        function: f,
        regions: [n0, n1, n2, n3, n4],
    }
}

pub struct Nested {
    pub function: Function,
    pub outer: NodeId,
    pub inner: NodeId,
    pub inner_latch: NodeId,
    pub outer_latch: NodeId,
}

/// `entry -> a -> b -> c`, `c -> b | d`, `d -> a | exit`.
pub fn nested() -> Nested {
    let mut f = Function::new("nested", Signature::new(ValueType::Void, [ValueType::Int32]));
    let (start, x) = (f.start(), f.args()[0]);
    let [a, b, c, d] = [(); 4].map(|_| f.create_region());
    jmp(&mut f, start, a);
    jmp(&mut f, a, b);
    jmp(&mut f, b, c);

    let ten = f.create_constant(ValueType::Int32, 10);
    let zero = f.create_constant(ValueType::Int32, 0);
    let again = f.create_compare(CmpOp::Lt, x, ten);
    let repeat = f.create_compare(CmpOp::Gt, x, zero);
    branch(&mut f, c, again, b, d);
    let end = f.end();
    branch(&mut f, d, repeat, a, end);
    Nested {
        function: f,
        outer: a,
        inner: b,
        inner_latch: c,
        outer_latch: d,
    }
}

/// Returns `a * 1` or `b + 10` depending on `a * 1 < 100`.
pub fn two_exits() -> Function {
    let mut f = Function::new(
        "two_exits",
        Signature::new(ValueType::Int32, [ValueType::Int32, ValueType::Int32]),
    );
    let (a, b) = (f.args()[0], f.args()[1]);
    let one = f.create_constant(ValueType::Int32, 1);
    let ten = f.create_constant(ValueType::Int32, 10);
    let product = f.create_binary(BinaryOp::Mul, a, one);
    let sum = f.create_binary(BinaryOp::Add, b, ten);
    let limit = f.create_constant(ValueType::Int32, 100);
    let cond = f.create_compare(CmpOp::Lt, product, limit);

    let [small, large] = [(); 2].map(|_| f.create_region());
    let start = f.start();
    branch(&mut f, start, cond, small, large);
    ret(&mut f, large, Some(product));
    ret(&mut f, small, Some(sum));
    f
}

pub struct Caller {
    pub function: Function,
    pub call: NodeId,
    pub after: NodeId,
    pub ret: NodeId,
}

/// Calls `callee` with `1` and `5` and returns the result.
pub fn caller(callee: FnIndex) -> Caller {
    let mut f = Function::new("caller", Signature::new(ValueType::Int32, []));
    let one = f.create_constant(ValueType::Int32, 1);
    let five = f.create_constant(ValueType::Int32, 5);
    let call = f.create_call(f.start(), callee, ValueType::Int32, &[one, five]);
    let after = f.create_region();
    f.add_control_input(after, call);
    let ret = ret(&mut f, after, Some(call));
    Caller {
        function: f,
        call,
        after,
        ret,
    }
}

pub struct Checks {
    pub function: Function,
    pub first: NodeId,
    pub second: NodeId,
    pub second_region: NodeId,
}

/// A pointer checked at entry and again before one of the returns.
pub fn checks() -> Checks {
    let mut f = Function::new(
        "checks",
        Signature::new(ValueType::Int32, [ValueType::Pointer, ValueType::Int32]),
    );
    let (object, x) = (f.args()[0], f.args()[1]);
    let first = f.create_call_builtin(f.start(), Builtin::NullCheck, &[object]);
    let checked = f.create_region();
    f.add_control_input(checked, first);

    let limit = f.create_constant(ValueType::Int32, 100);
    let cond = f.create_compare(CmpOp::Lt, x, limit);
    let [second_region, other] = [(); 2].map(|_| f.create_region());
    branch(&mut f, checked, cond, other, second_region);

    let second = f.create_call_builtin(second_region, Builtin::NullCheck, &[object]);
    let after_second = f.create_region();
    f.add_control_input(after_second, second);
    ret(&mut f, after_second, Some(x));
    ret(&mut f, other, Some(limit));
    Checks {
        function: f,
        first,
        second,
        second_region,
    }
}

pub struct Arith {
    pub function: Function,
    pub ret: NodeId,
}

/// `((x + 0) + 1 + 2 + (3 << 2)) * 2`, with the doubling written as a self-add.
pub fn arith() -> Arith {
    let mut f = Function::new("arith", Signature::new(ValueType::Int32, [ValueType::Int32]));
    let (start, x) = (f.start(), f.args()[0]);
    let [zero, one, two, three] = [0, 1, 2, 3].map(|value| f.create_constant(ValueType::Int32, value));
    let plus_zero = f.create_binary(BinaryOp::Add, zero, x);
    let plus_one = f.create_binary(BinaryOp::Add, plus_zero, one);
    let plus_two = f.create_binary(BinaryOp::Add, plus_one, two);
    let twelve = f.create_binary(BinaryOp::Shl, three, two);
    let sum = f.create_binary(BinaryOp::Add, plus_two, twelve);
    let doubled = f.create_binary(BinaryOp::Add, sum, sum);
    let ret = ret(&mut f, start, Some(doubled));
    Arith { function: f, ret }
}
