//! Natural loops and their nesting forest.

use data_structure::{
    index::{
        vec::{Idx, IndexVec},
        Indexable,
    },
    FxHashMap, SetLikeVec,
};

use crate::{analysis::DomTree, Function, NodeId};

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct LoopId(usize);

impl Idx for LoopId {
    fn new(idx: usize) -> Self {
        Self(idx)
    }

    fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Loop {
    header: NodeId,
    latches: Vec<NodeId>,
    /// Every region of the loop including nested loops, header first,
    /// the rest in reverse postorder.
    blocks: SetLikeVec<NodeId>,
    parent: Option<LoopId>,
    sub_loops: Vec<LoopId>,
}
impl Indexable<LoopId> for Loop {}

impl Loop {
    pub fn header(&self) -> NodeId {
        self.header
    }

    /// Sources of the back edges into the header.
    pub fn latches(&self) -> &[NodeId] {
        &self.latches
    }

    pub fn blocks(&self) -> &[NodeId] {
        self.blocks.as_slice()
    }

    pub fn contains(&self, region: NodeId) -> bool {
        self.blocks.contains(&region)
    }

    pub fn parent(&self) -> Option<LoopId> {
        self.parent
    }

    pub fn sub_loops(&self) -> &[LoopId] {
        &self.sub_loops
    }
}

/// The loop forest of a function.
///
/// Irreducible cycles have no dominating header and get no loop.
#[derive(Debug, Clone, Default)]
pub struct LoopInfo {
    loops: IndexVec<LoopId, Loop>,
    /// Innermost loop of each region in a loop.
    innermost: FxHashMap<NodeId, LoopId>,
}

impl LoopInfo {
    pub fn new(function: &Function, dom: &DomTree) -> Self {
        let mut info = Self::default();

        for region in dom.reverse_postorder() {
            let latches: Vec<_> = function
                .predecessors(region)
                .into_iter()
                .filter(|&pred| matches!(dom.dominates(region, pred), Ok(true)))
                .collect();
            if !latches.is_empty() {
                info.loops.push(Loop {
                    header: region,
                    latches,
                    blocks: SetLikeVec::new(),
                    parent: None,
                    sub_loops: Vec::new(),
                });
            }
        }

        // an inner header comes later in reverse postorder than its outer one
        let ids: Vec<_> = info.loops.indices().rev().collect();
        for id in ids {
            info.discover_body(function, dom, id);
        }

        let rpo: FxHashMap<NodeId, usize> = dom
            .reverse_postorder()
            .enumerate()
            .map(|(i, region)| (region, i))
            .collect();
        for lp in &mut info.loops {
            let mut blocks: Vec<_> = lp.blocks.iter().copied().collect();
            blocks.sort_by_key(|region| rpo[region]);
            lp.blocks = blocks.into_iter().collect();
        }

        log::debug!("`{}` has {} loops", function.name(), info.len());
        info
    }

    /// Flood backward from the latches without crossing the header.
    fn discover_body(&mut self, function: &Function, dom: &DomTree, id: LoopId) {
        let header = self.loops[id].header;
        self.loops[id].blocks.insert(header);
        self.innermost.entry(header).or_insert(id);

        let mut worklist = self.loops[id].latches.clone();
        let mut seen = SetLikeVec::new();
        seen.insert(header);

        while let Some(region) = worklist.pop() {
            if !seen.insert(region) {
                continue;
            }
            let preds = match self.innermost.get(&region) {
                Some(&owner) => {
                    let sub = self.outermost(owner);
                    if sub == id {
                        continue;
                    }
                    self.adopt(id, sub);
                    // continue from outside the sub-loop
                    let sub_loop = &self.loops[sub];
                    function
                        .predecessors(sub_loop.header)
                        .into_iter()
                        .filter(|pred| !sub_loop.contains(*pred))
                        .collect::<Vec<_>>()
                }
                None => {
                    self.innermost.insert(region, id);
                    self.loops[id].blocks.insert(region);
                    function.predecessors(region)
                }
            };
            worklist.extend(preds.into_iter().filter(|&pred| dom.contains(pred)));
        }
    }

    fn outermost(&self, mut id: LoopId) -> LoopId {
        while let Some(parent) = self.loops[id].parent {
            id = parent;
        }
        id
    }

    fn adopt(&mut self, parent: LoopId, child: LoopId) {
        log::trace!("loop {child:?} nested in {parent:?}");
        self.loops[child].parent = Some(parent);
        self.loops[parent].sub_loops.push(child);
        let (parent, child) = self.loops.pick2_mut(parent, child);
        parent.blocks.extend(child.blocks.iter().copied());
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    pub fn get(&self, id: LoopId) -> &Loop {
        &self.loops[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = (LoopId, &Loop)> + '_ {
        self.loops.iter_enumerated()
    }

    /// The innermost loop containing `region`.
    pub fn loop_for(&self, region: NodeId) -> Option<LoopId> {
        self.innermost.get(&region).copied()
    }

    pub fn is_header(&self, region: NodeId) -> bool {
        self.loop_for(region)
            .is_some_and(|id| self.loops[id].header == region)
    }

    pub fn top_level(&self) -> impl Iterator<Item = LoopId> + '_ {
        self.iter()
            .filter(|(_, lp)| lp.parent.is_none())
            .map(|(id, _)| id)
    }

    /// The outermost loop containing `region`.
    pub fn outermost_loop_for(&self, region: NodeId) -> Option<LoopId> {
        self.loop_for(region).map(|id| self.outermost(id))
    }

    /// Nesting depth of `region`, 0 outside of any loop.
    pub fn depth(&self, region: NodeId) -> usize {
        std::iter::successors(self.loop_for(region), |&id| self.loops[id].parent).count()
    }
}
