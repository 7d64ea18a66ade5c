use driver::samples::{bounded_loop, diamond, straight_line, BoundedLoop, Diamond, StraightLine};
use ir_son::analysis::{DomTree, Liveness, LoopInfo};

#[test]
fn straight_line_region() {
    let StraightLine {
        function: f,
        region,
        add,
    } = straight_line();
    assert_eq!(f.verify(), Ok(()));

    let dom = DomTree::new(&f);
    assert_eq!(dom.dominates(f.start(), region), Ok(true));
    assert_eq!(dom.idom(region), Ok(Some(f.start())));

    let liveness = Liveness::new(&f);
    let interval = liveness.live_interval(add).unwrap();
    assert!(interval.len() >= 2, "{interval}");
}

#[test]
fn single_loop_widens_values_live_across_it() {
    let BoundedLoop {
        function: f,
        header,
        latch,
        exit,
        bound,
        counter,
    } = bounded_loop();
    assert_eq!(f.verify(), Ok(()));

    let dom = DomTree::new(&f);
    let loops = LoopInfo::new(&f, &dom);
    assert_eq!(loops.len(), 1);
    let id = loops.loop_for(header).unwrap();
    assert_eq!(loops.loop_for(latch), Some(id));
    assert_eq!(loops.loop_for(exit), None);
    assert_eq!(loops.get(id).header(), header);
    assert_eq!(loops.get(id).latches(), &[latch]);

    let liveness = Liveness::new(&f);
    let loop_start = liveness.region_range(header).unwrap().start;
    let loop_end = loops
        .get(id)
        .blocks()
        .iter()
        .map(|&block| liveness.region_range(block).unwrap().end)
        .max()
        .unwrap();

    let interval = liveness.live_interval(bound).unwrap();
    assert!(interval.start <= loop_start, "{interval}");
    assert!(interval.end >= loop_end, "{interval}");
    let interval = liveness.live_interval(counter).unwrap();
    assert!(interval.end >= loop_end, "{interval}");
}

#[test]
fn diamond_merges_through_phi() {
    let Diamond {
        function: f,
        then_region,
        else_region,
        merge,
        phi,
    } = diamond();
    assert!(f.is_valid());

    let liveness = Liveness::new(&f);
    assert_eq!(
        liveness.live_number(phi),
        Ok(liveness.region_range(merge).unwrap().start)
    );

    let dom = DomTree::new(&f);
    assert_eq!(dom.dominates(f.start(), then_region), Ok(true));
    assert_eq!(dom.dominates(f.start(), else_region), Ok(true));
    assert_eq!(dom.dominates(then_region, else_region), Ok(false));
    assert_eq!(dom.idom(merge), Ok(Some(f.start())));
}
