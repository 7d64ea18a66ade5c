//! Live numbers and live intervals over the linearized schedule.

use data_structure::{FxHashMap, FxIndexMap, FxIndexSet};

use crate::{
    analysis::{DomTree, LoopInfo, Schedule},
    AnalysisError, Function, NodeId,
};

/// Distance between two consecutive instructions.
const STEP: usize = 2;

/// An inclusive range of live numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LiveInterval {
    pub start: usize,
    pub end: usize,
}

impl LiveInterval {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Grow to cover `[start, end]`.
    pub fn widen(&mut self, start: usize, end: usize) {
        self.start = self.start.min(start);
        self.end = self.end.max(end);
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether the two intervals need storage at the same time.
    pub fn overlaps(&self, other: &LiveInterval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for LiveInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[derive(Debug, Clone)]
pub struct Liveness {
    order: Vec<NodeId>,
    numbers: FxHashMap<NodeId, usize>,
    /// Kept in numbering order so that consumers iterate deterministically.
    intervals: FxIndexMap<NodeId, LiveInterval>,
    ranges: FxHashMap<NodeId, LiveInterval>,
    live_in: FxHashMap<NodeId, FxIndexSet<NodeId>>,
}

impl Liveness {
    pub fn new(function: &Function) -> Self {
        let dom = DomTree::new(function);
        let loops = LoopInfo::new(function, &dom);
        let schedule = Schedule::new(function, &dom, &loops);
        Self::with_analyses(function, &loops, &schedule)
    }

    pub fn with_analyses(function: &Function, loops: &LoopInfo, schedule: &Schedule) -> Self {
        let mut liveness = Self {
            order: schedule.linear_order().to_vec(),
            numbers: FxHashMap::default(),
            intervals: FxIndexMap::default(),
            ranges: FxHashMap::default(),
            live_in: FxHashMap::default(),
        };
        liveness.number(function, schedule);
        liveness.build_intervals(function, loops, schedule);
        log::debug!(
            "`{}`: {} live intervals over {} regions",
            function.name(),
            liveness.intervals.len(),
            liveness.order.len()
        );
        liveness
    }

    fn assign(&mut self, value: NodeId, number: usize) {
        self.numbers.insert(value, number);
        self.intervals
            .insert(value, LiveInterval::new(number, number));
    }

    fn number(&mut self, function: &Function, schedule: &Schedule) {
        let mut current = 0;
        let order = std::mem::take(&mut self.order);
        for &region in &order {
            let entry = current;
            for phi in function.phis(region) {
                self.assign(phi, entry);
            }
            for &node in schedule.nodes_in(region) {
                current += STEP;
                self.assign(node, current);
            }
            // the terminator reads its operands at the region end
            current += STEP;
            if let Some(terminator) = function.terminator(region) {
                if function.node(terminator).is_value() {
                    self.assign(terminator, current);
                }
            }
            for &node in schedule.nodes_after_call(region) {
                current += STEP;
                self.assign(node, current);
            }
            self.ranges
                .insert(region, LiveInterval::new(entry, current));
        }
        self.order = order;
    }

    fn build_intervals(&mut self, function: &Function, loops: &LoopInfo, schedule: &Schedule) {
        for index in (0..self.order.len()).rev() {
            let region = self.order[index];
            let range = self.ranges[&region];

            let mut live = FxIndexSet::default();
            for succ in function.successors(region) {
                if let Some(succ_live) = self.live_in.get(&succ) {
                    live.extend(succ_live.iter().copied());
                }
                for phi in function.phis(succ) {
                    live.extend(
                        function
                            .phi_values_from(phi, region)
                            .into_iter()
                            .filter(|value| self.numbers.contains_key(value)),
                    );
                }
            }

            for value in &live {
                self.widen(*value, range.start, range.end);
            }

            for &node in schedule.nodes_after_call(region).iter().rev() {
                self.define_and_read(function, node, range.start, &mut live);
            }

            if let Some(terminator) = function.terminator(region) {
                let mut point = range.end;
                if let Some(&number) = self.numbers.get(&terminator) {
                    self.define(terminator, number);
                    live.shift_remove(&terminator);
                    point = number;
                }
                for operand in function.operands(terminator).iter().skip(1).flatten() {
                    if self.numbers.contains_key(operand) {
                        self.widen(*operand, range.start, point);
                        live.insert(*operand);
                    }
                }
            }

            for &node in schedule.nodes_in(region).iter().rev() {
                self.define_and_read(function, node, range.start, &mut live);
            }

            for phi in function.phis(region) {
                live.shift_remove(&phi);
                let number = self.numbers[&phi];
                if let Some(interval) = self.intervals.get_mut(&phi) {
                    interval.start = number;
                }
            }

            if let Some(id) = loops.loop_for(region).filter(|_| loops.is_header(region)) {
                let loop_end = loops
                    .get(id)
                    .blocks()
                    .iter()
                    .filter_map(|block| self.ranges.get(block))
                    .map(|range| range.end)
                    .max()
                    .unwrap_or(range.end);
                for value in &live {
                    self.widen(*value, range.start, loop_end);
                }
            }

            log::trace!("live in {region}: {live:?}");
            self.live_in.insert(region, live);
        }
    }

    /// Step back over `node`: it is not live above its definition, and its
    /// operands are live up to it.
    fn define_and_read(
        &mut self,
        function: &Function,
        node: NodeId,
        region_start: usize,
        live: &mut FxIndexSet<NodeId>,
    ) {
        let number = self.numbers[&node];
        self.define(node, number);
        live.shift_remove(&node);
        for operand in function.operands(node).iter().flatten() {
            if self.numbers.contains_key(operand) {
                self.widen(*operand, region_start, number);
                live.insert(*operand);
            }
        }
    }

    fn widen(&mut self, value: NodeId, start: usize, end: usize) {
        if let Some(interval) = self.intervals.get_mut(&value) {
            interval.widen(start, end);
        }
    }

    /// A value is never live before its definition and occupies at least
    /// one step.
    fn define(&mut self, value: NodeId, number: usize) {
        if let Some(interval) = self.intervals.get_mut(&value) {
            interval.start = number;
            interval.end = interval.end.max(number + STEP);
        }
    }

    pub fn live_number(&self, value: NodeId) -> Result<usize, AnalysisError> {
        self.numbers
            .get(&value)
            .copied()
            .ok_or(AnalysisError::ValueNotFound(value))
    }

    pub fn live_interval(&self, value: NodeId) -> Result<LiveInterval, AnalysisError> {
        self.intervals
            .get(&value)
            .copied()
            .ok_or(AnalysisError::ValueNotFound(value))
    }

    /// Values live on entry to `region`, excluding its own phis.
    pub fn live_in(&self, region: NodeId) -> Result<&FxIndexSet<NodeId>, AnalysisError> {
        self.live_in
            .get(&region)
            .ok_or(AnalysisError::RegionNotFound(region))
    }

    /// Numbers spanned by `region`, from its entry to its terminator.
    pub fn region_range(&self, region: NodeId) -> Result<LiveInterval, AnalysisError> {
        self.ranges
            .get(&region)
            .copied()
            .ok_or(AnalysisError::RegionNotFound(region))
    }

    /// Every value with its interval, in numbering order.
    pub fn intervals(&self) -> impl Iterator<Item = (NodeId, LiveInterval)> + '_ {
        self.intervals.iter().map(|(value, interval)| (*value, *interval))
    }

    pub fn linear_order(&self) -> &[NodeId] {
        &self.order
    }
}
