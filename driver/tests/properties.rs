use driver::Sample;
use ir_son::{
    analysis::{DomTree, Liveness, LoopInfo, RegAlloc, Schedule},
    Function, NodeId, NodeKind,
};

fn all_functions() -> Vec<Function> {
    Sample::ALL
        .iter()
        .flat_map(|sample| sample.build().functions)
        .collect()
}

#[test]
fn dominance_is_a_tree_rooted_at_start() {
    for f in all_functions() {
        let dom = DomTree::new(&f);
        let regions: Vec<NodeId> = dom.reverse_postorder().collect();
        for &a in &regions {
            assert_eq!(dom.dominates(a, a), Ok(true));
            assert_eq!(dom.dominates(f.start(), a), Ok(true));
            for &b in &regions {
                if a != b {
                    let both = dom.dominates(a, b) == Ok(true) && dom.dominates(b, a) == Ok(true);
                    assert!(!both, "{a} and {b} dominate each other in `{}`", f.name());
                }
            }
            match dom.idom(a).unwrap() {
                None => assert_eq!(a, f.start()),
                Some(parent) => {
                    let index = |region| dom.dfs().index_of(region).unwrap();
                    assert!(index(parent) < index(a));
                    assert_eq!(dom.dominates(parent, a), Ok(true));
                }
            }
        }
    }
}

#[test]
fn loops_contain_their_headers_and_sub_loops() {
    let mut total = 0;
    for f in all_functions() {
        let dom = DomTree::new(&f);
        let loops = LoopInfo::new(&f, &dom);
        total += loops.len();
        for (_, l) in loops.iter() {
            assert!(l.contains(l.header()));
            assert_eq!(l.blocks()[0], l.header());
            for &latch in l.latches() {
                assert!(l.contains(latch));
                assert!(f.successors(latch).contains(&l.header()));
            }
            for &sub in l.sub_loops() {
                let sub = loops.get(sub);
                assert!(sub.blocks().iter().all(|&block| l.contains(block)));
            }
        }
    }
    // bounded loop, counting, and the two nested loops
    assert_eq!(total, 4);
}

#[test]
fn nested_loops_form_a_forest() {
    let nested = driver::samples::nested();
    let f = &nested.function;
    let dom = DomTree::new(f);
    let loops = LoopInfo::new(f, &dom);
    assert_eq!(loops.len(), 2);

    let outer = loops.loop_for(nested.outer).unwrap();
    let inner = loops.loop_for(nested.inner).unwrap();
    assert_ne!(outer, inner);
    assert_eq!(loops.loop_for(nested.inner_latch), Some(inner));
    assert_eq!(loops.loop_for(nested.outer_latch), Some(outer));
    assert_eq!(loops.get(inner).parent(), Some(outer));
    assert_eq!(loops.get(outer).sub_loops(), &[inner]);
    assert_eq!(loops.top_level().collect::<Vec<_>>(), vec![outer]);
    assert_eq!(loops.depth(nested.inner_latch), 2);
    assert_eq!(loops.outermost_loop_for(nested.inner), Some(outer));
}

#[test]
fn linear_order_keeps_loops_contiguous() {
    for f in all_functions() {
        let dom = DomTree::new(&f);
        let loops = LoopInfo::new(&f, &dom);
        let schedule = Schedule::new(&f, &dom, &loops);
        let order = schedule.linear_order();
        assert_eq!(order.first(), Some(&f.start()));
        assert_eq!(order.len(), dom.reverse_postorder().count());
        for (_, l) in loops.iter() {
            let positions: Vec<usize> = l
                .blocks()
                .iter()
                .map(|block| order.iter().position(|r| r == block).unwrap())
                .collect();
            let first = positions.iter().min().unwrap();
            let last = positions.iter().max().unwrap();
            assert_eq!(last - first + 1, positions.len(), "`{}`", f.name());
        }
    }
}

#[test]
fn intervals_contain_their_live_numbers() {
    for f in all_functions() {
        let liveness = Liveness::new(&f);
        for (value, interval) in liveness.intervals() {
            let number = liveness.live_number(value).unwrap();
            assert!(
                interval.start <= number && number <= interval.end,
                "{value} numbered {number} lives in {interval} in `{}`",
                f.name()
            );
        }
        for &region in liveness.linear_order() {
            let entry = liveness.region_range(region).unwrap().start;
            for phi in f.phis(region) {
                assert_eq!(liveness.live_number(phi), Ok(entry));
            }
        }
    }
}

#[test]
fn overlapping_values_never_share_a_register() {
    for f in all_functions() {
        let liveness = Liveness::new(&f);
        for registers in 0..4 {
            let alloc = RegAlloc::new(registers, &liveness);
            let assigned: Vec<_> = alloc
                .iter()
                .filter(|(_, _, location)| !location.is_spill())
                .collect();
            for (i, (a, ia, la)) in assigned.iter().enumerate() {
                assert!(la.index() < registers);
                for (b, ib, lb) in &assigned[i + 1..] {
                    if ia.overlaps(ib) {
                        assert_ne!(la, lb, "{a} and {b} in `{}`", f.name());
                    }
                }
            }

            let last = liveness.intervals().map(|(_, i)| i.end).max().unwrap_or(0);
            for n in 0..=last {
                let live = assigned
                    .iter()
                    .filter(|(_, interval, _)| interval.start <= n && n < interval.end)
                    .count();
                assert!(live <= registers);
            }
        }
    }
}

#[test]
fn detached_nodes_are_unreachable() {
    for mut f in all_functions() {
        let victims: Vec<NodeId> = f
            .nodes()
            .filter(|(_, node)| matches!(node.kind(), NodeKind::Constant(_) | NodeKind::Binary(_)))
            .map(|(id, _)| id)
            .collect();
        for victim in victims {
            f.detach(victim);
            assert!(f.node(victim).is_dead());
            assert!(f.operands(victim).is_empty());
            assert!(f.users(victim).is_empty());
            for (id, node) in f.nodes() {
                assert!(!node.operands().contains(&Some(victim)), "{id} reads {victim}");
                assert!(!node.users().contains(&victim), "{id} is read by {victim}");
            }
        }
    }
}
