//! Linear-scan register allocation.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use data_structure::FxIndexMap;

use crate::{
    analysis::{LiveInterval, Liveness},
    pretty::NodeNames,
    AnalysisError, NodeId,
};

/// Where a value is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Register(usize),
    StackSlot(usize),
}

impl Location {
    pub fn is_spill(self) -> bool {
        matches!(self, Location::StackSlot(_))
    }

    /// Register number or stack slot number.
    pub fn index(self) -> usize {
        match self {
            Location::Register(index) | Location::StackSlot(index) => index,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Location::Register(index) => write!(f, "r{index}"),
            Location::StackSlot(index) => write!(f, "s{index}"),
        }
    }
}

/// Poletto–Sarkar linear scan over live intervals.
///
/// When registers run out, the interval ending furthest away is spilled to
/// a fresh stack slot; slots are never reused.
#[derive(Debug, Clone)]
pub struct RegAlloc {
    num_registers: usize,
    /// Values in allocation order.
    locations: FxIndexMap<NodeId, Location>,
    intervals: FxIndexMap<NodeId, LiveInterval>,
    stack_slots: usize,
}

impl RegAlloc {
    pub fn new(num_registers: usize, liveness: &Liveness) -> Self {
        let mut intervals: Vec<(NodeId, LiveInterval)> = liveness.intervals().collect();
        intervals.sort_by_key(|(value, interval)| (interval.start, interval.end, *value));

        let mut alloc = Self {
            num_registers,
            locations: FxIndexMap::default(),
            intervals: FxIndexMap::default(),
            stack_slots: 0,
        };
        // lowest free register first
        let mut free: BTreeSet<usize> = (0..num_registers).collect();
        // (end, position, value, register), so the furthest end is last
        let mut active: BTreeSet<(usize, usize, NodeId, usize)> = BTreeSet::new();

        for (seq, &(value, interval)) in intervals.iter().enumerate() {
            alloc.intervals.insert(value, interval);

            while let Some(&(end, _, _, register)) = active.first() {
                if end > interval.start {
                    break;
                }
                active.pop_first();
                free.insert(register);
            }

            if let Some(register) = free.pop_first() {
                alloc.locations.insert(value, Location::Register(register));
                active.insert((interval.end, seq, value, register));
                continue;
            }

            match active.last().copied() {
                Some((end, _, victim, register)) if end > interval.end => {
                    active.pop_last();
                    let slot = alloc.next_stack_slot();
                    log::trace!("spill {victim} to s{slot}, its r{register} goes to {value}");
                    alloc.locations.insert(victim, Location::StackSlot(slot));
                    alloc.locations.insert(value, Location::Register(register));
                    active.insert((interval.end, seq, value, register));
                }
                _ => {
                    let slot = alloc.next_stack_slot();
                    log::trace!("spill {value} to s{slot}");
                    alloc.locations.insert(value, Location::StackSlot(slot));
                }
            }
        }

        log::debug!(
            "allocated {} values to {} registers, {} spilled",
            alloc.locations.len(),
            num_registers,
            alloc.stack_slots
        );
        alloc
    }

    fn next_stack_slot(&mut self) -> usize {
        let slot = self.stack_slots;
        self.stack_slots += 1;
        slot
    }

    pub fn info(&self, value: NodeId) -> Result<Location, AnalysisError> {
        self.locations
            .get(&value)
            .copied()
            .ok_or(AnalysisError::ValueNotFound(value))
    }

    pub fn num_registers(&self) -> usize {
        self.num_registers
    }

    /// Number of stack slots handed out.
    pub fn stack_slots(&self) -> usize {
        self.stack_slots
    }

    /// Every value with its interval and location, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, LiveInterval, Location)> + '_ {
        self.intervals.iter().filter_map(|(value, interval)| {
            self.locations
                .get(value)
                .map(|location| (*value, *interval, *location))
        })
    }

    /// A table with one row per value and one column per live number.
    pub fn dump<'a>(&'a self, names: &'a NodeNames) -> impl Display + 'a {
        AllocationTable { alloc: self, names }
    }
}

struct AllocationTable<'a> {
    alloc: &'a RegAlloc,
    names: &'a NodeNames,
}

impl Display for AllocationTable<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let width = self
            .alloc
            .intervals
            .values()
            .map(|interval| interval.end)
            .max()
            .unwrap_or_default();
        write!(f, "  |")?;
        (0..=width).try_for_each(|n| write!(f, "{n:>3}|"))?;
        writeln!(f)?;
        for (row, (value, interval, location)) in self.alloc.iter().enumerate() {
            write!(f, "{row:>2}|")?;
            (0..=width).try_for_each(|n| {
                if interval.start <= n && n <= interval.end {
                    write!(f, "{:>3}|", location.to_string())
                } else {
                    write!(f, "   |")
                }
            })?;
            writeln!(f, "{}", self.names.get(value))?;
        }
        Ok(())
    }
}
