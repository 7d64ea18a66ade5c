use ir_son::{analysis::DomTree, Builtin, Function, NodeId, NodeKind, Program};

use crate::SonPass;

/// Remove null checks already performed on every path to them.
///
/// A region ending in a dominated `NullCheck` falls through to the
/// check's successor with a plain `Jmp` instead.
pub struct ChecksElimination;

fn null_checked(function: &Function, node: NodeId) -> Option<NodeId> {
    match function.kind(node) {
        NodeKind::CallBuiltin(Builtin::NullCheck) if !function.node(node).is_dead() => {
            function.operand(node, 1)
        }
        _ => None,
    }
}

/// Replace the check ending `region` with a jump to the same successors.
fn remove_check(function: &mut Function, check: NodeId, region: NodeId) {
    let jmp = function.create_jmp(region);
    let targets: Vec<NodeId> = function.control_targets(check).collect();
    for target in targets {
        for slot in 0..function.operands(target).len() {
            if function.operand(target, slot) == Some(check) {
                function.set_operand(target, slot, Some(jmp));
            }
        }
    }
    function.detach(check);
    log::trace!("removed {check}, {region} now ends in {jmp}");
}

impl ChecksElimination {
    pub fn run(&mut self, function: &mut Function) {
        let dom = DomTree::new(function);
        let mut removed = 0;

        for region in dom.reverse_postorder() {
            let Some(check) = function.terminator(region) else {
                continue;
            };
            let Some(object) = null_checked(function, check) else {
                continue;
            };

            let mut users = function.users(object).to_vec();
            users.dedup();
            for other in users {
                if other == check || null_checked(function, other) != Some(object) {
                    continue;
                }
                let Some(before) = function.operand(other, 0) else {
                    continue;
                };
                if matches!(dom.dominates(region, before), Ok(true)) {
                    remove_check(function, other, before);
                    removed += 1;
                }
            }
        }

        log::debug!("`{}`: removed {removed} null checks", function.name());
    }
}

impl SonPass for ChecksElimination {
    fn run_pass(&mut self, program: &mut Program) {
        for function in &mut program.functions {
            self.run(function);
        }
    }
}
