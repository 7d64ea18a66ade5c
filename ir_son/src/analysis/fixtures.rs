//! Graphs shared by the analysis tests.

use data_structure::FxHashMap;

use crate::{BinaryOp, CmpOp, Function, NodeId, Signature, ValueType};

/// A counting loop:
///
/// ```text
/// entry: v0 = 1, v1 = 10; jmp r1
/// r1: v3 = phi(v0, v7), v4 = phi(v1, v8); v5 = v4 == v0; if v5 r2 r3
/// r2: v8 = v4 - v0, v7 = v3 * v4; jmp r1
/// r3: jmp exit
/// exit: v2 = 20, v9 = v2 + v3; ret v9
/// ```
pub struct Counting {
    pub f: Function,
    pub regions: [NodeId; 5],
    pub values: FxHashMap<&'static str, NodeId>,
}

pub fn counting_loop() -> Counting {
    let mut f = Function::new("counting", Signature::new(ValueType::Int32, []));
    let (n0, n4) = (f.start(), f.end());
    let [n1, n2, n3] = [(); 3].map(|_| f.create_region());

    let v0 = f.create_constant(ValueType::Int32, 1);
    let v1 = f.create_constant(ValueType::Int32, 10);
    let v2 = f.create_constant(ValueType::Int32, 20);

    let j01 = f.create_jmp(n0);
    let j21 = f.create_jmp(n2);
    let j34 = f.create_jmp(n3);
    f.add_control_input(n1, j01);
    f.add_control_input(n1, j21);
    f.add_control_input(n4, j34);

    let v3 = f.create_phi(n1, ValueType::Int32, 2);
    let v4 = f.create_phi(n1, ValueType::Int32, 2);
    let v5 = f.create_compare(CmpOp::Eq, v4, v0);
    let if_node = f.create_if(n1, v5);
    let t = f.create_if_true(if_node);
    let e = f.create_if_false(if_node);
    f.add_control_input(n2, t);
    f.add_control_input(n3, e);

    let v7 = f.create_binary(BinaryOp::Mul, v3, v4);
    let v8 = f.create_binary(BinaryOp::Sub, v4, v0);
    f.set_phi_value(v3, 0, v0);
    f.set_phi_value(v3, 1, v7);
    f.set_phi_value(v4, 0, v1);
    f.set_phi_value(v4, 1, v8);

    let v9 = f.create_binary(BinaryOp::Add, v2, v3);
    f.create_ret(n4, Some(v9));

    let values = [
        ("v0", v0),
        ("v1", v1),
        ("v2", v2),
        ("v3", v3),
        ("v4", v4),
        ("v5", v5),
        ("v7", v7),
        ("v8", v8),
        ("v9", v9),
    ]
    .into_iter()
    .collect();
    Counting {
        f,
        regions: [n0, n1, n2, n3, n4],
        values,
    }
}
