//! Placement of floating nodes and linearization of regions.

use data_structure::{FxHashMap, FxHashSet};

use crate::{
    analysis::{DomTree, LoopInfo},
    Function, NodeId, NodeKind,
};

/// Where every data node lives and the order regions are emitted in.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    placement: FxHashMap<NodeId, NodeId>,
    /// Data nodes of each region, definitions before their uses.
    region_nodes: FxHashMap<NodeId, Vec<NodeId>>,
    /// Data nodes reading the result of the call that ends their region.
    after_call: FxHashMap<NodeId, Vec<NodeId>>,
    order: Vec<NodeId>,
}

impl Schedule {
    pub fn new(function: &Function, dom: &DomTree, loops: &LoopInfo) -> Self {
        let mut schedule = data_schedule(function, dom);
        schedule.order = linearize(function, dom, loops);
        schedule
    }

    /// The region `node` is placed in; phis report their own region.
    pub fn region_of(&self, node: NodeId) -> Option<NodeId> {
        self.placement.get(&node).copied()
    }

    /// Placed data nodes of `region` (phis and the terminator excluded).
    pub fn nodes_in(&self, region: NodeId) -> &[NodeId] {
        self.region_nodes
            .get(&region)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Placed data nodes of `region` that read, directly or through each
    /// other, the value of the `Call` ending it.
    ///
    /// They run once the call has returned and before control reaches the
    /// successor, so a phi there can take them on the call's edge.
    pub fn nodes_after_call(&self, region: NodeId) -> &[NodeId] {
        self.after_call
            .get(&region)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Regions in emission order.
    pub fn linear_order(&self) -> &[NodeId] {
        &self.order
    }
}

/// Where a single use of a value needs it to be available.
enum UseRegion {
    Known(Vec<NodeId>),
    /// The user is itself floating and not placed yet.
    Pending,
}

/// Place every floating data node in the lowest region dominating all of
/// its uses.
///
/// Arguments are pinned to `Start` and phis to their region. A node whose
/// uses are all unreachable stays unplaced.
pub fn data_schedule(function: &Function, dom: &DomTree) -> Schedule {
    let mut schedule = Schedule::default();
    let start = function.start();

    for &arg in function.args() {
        if !function.node(arg).is_dead() {
            schedule.placement.insert(arg, start);
        }
    }
    for (id, node) in function.nodes() {
        if let (NodeKind::Phi, Some(region)) = (node.kind(), node.operand(0)) {
            schedule.placement.insert(id, region);
        }
    }

    let mut unplaced: Vec<NodeId> = function
        .nodes()
        .filter(|(_, node)| node.kind().is_floating())
        .map(|(id, _)| id)
        .collect();
    // use-before-def, reversed per region once everything is placed
    let mut placed_order: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
    let mut dropped = FxHashSet::default();

    loop {
        let mut progress = false;
        unplaced.retain(|&node| {
            let Some(use_regions) = use_regions(function, dom, &schedule.placement, &dropped, node)
            else {
                return true;
            };
            progress = true;
            match dom.common_dominator(use_regions) {
                Ok(Some(region)) => {
                    log::trace!("placed {node} in {region}");
                    schedule.placement.insert(node, region);
                    placed_order.entry(region).or_default().push(node);
                }
                _ => {
                    dropped.insert(node);
                }
            }
            false
        });
        if !progress || unplaced.is_empty() {
            break;
        }
    }

    if !unplaced.is_empty() || !dropped.is_empty() {
        log::debug!(
            "`{}`: {} nodes left unscheduled",
            function.name(),
            unplaced.len() + dropped.len()
        );
    }

    schedule.region_nodes = placed_order
        .into_iter()
        .map(|(region, mut nodes)| {
            nodes.reverse();
            (region, nodes)
        })
        .collect();
    if !function.args().is_empty() {
        let entry = schedule.region_nodes.entry(start).or_default();
        let mut nodes: Vec<_> = function
            .args()
            .iter()
            .copied()
            .filter(|arg| !function.node(*arg).is_dead())
            .collect();
        nodes.append(entry);
        *entry = nodes;
    }
    schedule.after_call = split_after_call(function, &mut schedule.region_nodes);
    schedule
}

/// Move the nodes that depend on a region's value-returning `Call` out of
/// the region's list and behind the call.
fn split_after_call(
    function: &Function,
    region_nodes: &mut FxHashMap<NodeId, Vec<NodeId>>,
) -> FxHashMap<NodeId, Vec<NodeId>> {
    let mut after_call = FxHashMap::default();
    for (&region, nodes) in region_nodes.iter_mut() {
        let Some(call) = function.terminator(region).filter(|&terminator| {
            matches!(function.kind(terminator), NodeKind::Call(_))
                && function.node(terminator).is_value()
        }) else {
            continue;
        };

        let mut dependent = FxHashSet::default();
        dependent.insert(call);
        let (after, before): (Vec<NodeId>, Vec<NodeId>) =
            nodes.iter().copied().partition(|&node| {
                let reads_call = function
                    .operands(node)
                    .iter()
                    .flatten()
                    .any(|operand| dependent.contains(operand));
                if reads_call {
                    dependent.insert(node);
                }
                reads_call
            });
        if !after.is_empty() {
            log::trace!("{after:?} follow {call} in {region}");
            *nodes = before;
            after_call.insert(region, after);
        }
    }
    after_call
}

/// Regions where `node` is used, or `None` while a user is still unplaced.
/// Unreachable use regions are dropped.
fn use_regions(
    function: &Function,
    dom: &DomTree,
    placement: &FxHashMap<NodeId, NodeId>,
    dropped: &FxHashSet<NodeId>,
    node: NodeId,
) -> Option<Vec<NodeId>> {
    let mut regions = Vec::new();
    let mut users = function.users(node).to_vec();
    users.dedup();
    for user in users {
        if dropped.contains(&user) {
            continue;
        }
        match use_region(function, placement, node, user) {
            UseRegion::Known(found) => regions.extend(found),
            UseRegion::Pending => return None,
        }
    }
    regions.retain(|&region| dom.contains(region));
    regions.sort();
    regions.dedup();
    Some(regions)
}

fn use_region(
    function: &Function,
    placement: &FxHashMap<NodeId, NodeId>,
    node: NodeId,
    user: NodeId,
) -> UseRegion {
    match function.kind(user) {
        NodeKind::Phi => {
            let found = function
                .operands(user)
                .iter()
                .enumerate()
                .skip(1)
                .filter(|(_, value)| **value == Some(node))
                .filter_map(|(slot, _)| function.phi_source_region(user, slot - 1))
                .collect();
            UseRegion::Known(found)
        }
        kind if kind.is_terminator() => {
            UseRegion::Known(function.operand(user, 0).into_iter().collect())
        }
        _ => match placement.get(&user) {
            Some(&region) => UseRegion::Known(vec![region]),
            None if function.kind(user).is_floating() => UseRegion::Pending,
            None => UseRegion::Known(Vec::new()),
        },
    }
}

/// Order regions for emission.
///
/// Regions are visited in reverse postorder; the first time a region of a
/// loop is reached, the whole outermost loop is emitted in one piece.
pub fn linearize(function: &Function, dom: &DomTree, loops: &LoopInfo) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(dom.dfs().len());
    let mut emitted = FxHashSet::default();

    for region in dom.reverse_postorder() {
        if emitted.contains(&region) {
            continue;
        }
        match loops.outermost_loop_for(region) {
            Some(id) => {
                for &block in loops.get(id).blocks() {
                    if emitted.insert(block) {
                        order.push(block);
                    }
                }
            }
            None => {
                emitted.insert(region);
                order.push(region);
            }
        }
    }

    log::trace!("`{}` linearized as {order:?}", function.name());
    order
}
