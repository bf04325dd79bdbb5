mod common;

use common::{Rig, SPIN, config, filled};
use kernel::FrameOwner;
use types::{EvictionKind, Pid, syscall};

#[test]
fn full_memory_evicts_the_oldest_frame() {
    // A: page 0 of ones, page 1 of twos. B: one page of sevens.
    let mut a = filled(1, 10, 1);
    a.extend(filled(1, 10, 2));
    let b = filled(1, 10, 7);
    let mut rig = Rig::boot(config(2, 10), vec![a, b]);

    rig.touch(0);
    rig.touch(12);
    assert_eq!(rig.kernel.frames().occupied_count(), 2);
    // A stores 555 into its page 0, which lives in frame 0.
    rig.machine.memory.write(3, 555).unwrap();

    assert_eq!(rig.create(1), 2);
    rig.timer();
    rig.timer();
    assert_eq!(rig.current(), Some(Pid(2)));

    rig.touch(0);

    let a = rig.kernel.process(Pid(1)).unwrap();
    assert!(!a.page_table().entry(0).unwrap().valid);
    assert_eq!(a.frame_of(1), Some(1));
    assert_eq!(a.backing().read(3), Ok(555));
    assert_eq!(a.backing().read(0), Ok(1));

    let frame0 = *rig.kernel.frames().get(0).unwrap();
    let frame1 = *rig.kernel.frames().get(1).unwrap();
    assert_eq!(
        frame0.owner,
        Some(FrameOwner {
            pid: Pid(2),
            page: 0
        })
    );
    assert_eq!(frame0.order, 2);
    assert!(frame0.order > frame1.order);
    assert_eq!(rig.machine.memory.read(0), Ok(7));
    assert_eq!(rig.kernel.process(Pid(2)).unwrap().frame_of(0), Some(0));

    assert_eq!(rig.kernel.process(Pid(1)).unwrap().metrics().page_faults, 2);
    assert_eq!(rig.kernel.process(Pid(2)).unwrap().metrics().page_faults, 1);
    assert_eq!(rig.kernel.metrics().page_faults, 3);
    assert_eq!(rig.kernel.metrics().evictions, 1);
}

#[test]
fn evicted_page_comes_back_with_its_contents() {
    let mut a = filled(1, 10, 1);
    a.extend(filled(1, 10, 2));
    let mut rig = Rig::boot(config(2, 10), vec![a, filled(1, 10, 7)]);
    rig.touch(0);
    rig.touch(12);
    rig.machine.memory.write(3, 555).unwrap();
    rig.create(1);
    rig.timer();
    rig.timer();
    rig.touch(0);

    // Back to A: its page 0 is gone, the oldest frame now holds its page 1.
    rig.timer();
    rig.timer();
    assert_eq!(rig.current(), Some(Pid(1)));
    rig.touch(3);

    let a = rig.kernel.process(Pid(1)).unwrap();
    assert_eq!(a.frame_of(0), Some(1));
    assert_eq!(a.frame_of(1), None);
    assert_eq!(a.backing().read(12), Ok(2));
    assert_eq!(rig.machine.memory.read(13), Ok(555));
}

#[test]
fn fifo_order_survives_reuse() {
    let image: Vec<i32> = (0..5).flat_map(|page| filled(1, 10, page)).collect();
    let mut rig = Rig::boot(config(3, 10), vec![image]);

    for addr in [0, 10, 20, 30, 0] {
        rig.touch(addr);
    }

    let frames = rig.kernel.frames();
    let owner = |n: usize| frames.get(n).unwrap().owner.map(|o| o.page);
    assert_eq!(owner(0), Some(3));
    assert_eq!(owner(1), Some(0));
    assert_eq!(owner(2), Some(2));
    assert_eq!(rig.machine.memory.read(0), Ok(3));
    assert_eq!(rig.machine.memory.read(10), Ok(0));
    assert_eq!(frames.oldest(), Some(2));
    assert_eq!(rig.kernel.metrics().evictions, 2);
}

#[test]
fn random_eviction_keeps_tables_consistent() {
    let mut cfg = config(2, 10);
    cfg.eviction = EvictionKind::Random;
    cfg.rng_seed = 7;
    let image: Vec<i32> = (0..4).flat_map(|page| filled(1, 10, page)).collect();
    let mut rig = Rig::boot(cfg, vec![image]);

    for addr in [0, 10, 20, 30, 0, 15, 25, 5, 35, 12] {
        rig.touch(addr);
        let page = addr as usize / 10;
        let frame = rig.kernel.process(Pid(1)).unwrap().frame_of(page).unwrap();
        assert_eq!(rig.machine.memory.read(frame * 10), Ok(page as i32));
    }

    let metrics = rig.kernel.metrics();
    assert_eq!(rig.kernel.frames().occupied_count(), 2);
    assert_eq!(
        metrics.page_faults,
        rig.kernel.process(Pid(1)).unwrap().metrics().page_faults
    );
    assert_eq!(metrics.evictions, metrics.page_faults - 2);
}

#[test]
fn access_outside_address_space_terminates_the_process() {
    let mut rig = Rig::boot(config(4, 10), vec![SPIN.clone(), SPIN.clone()]);
    rig.create(1);

    rig.touch(100);

    assert!(rig.kernel.process(Pid(1)).is_none());
    assert_eq!(rig.current(), Some(Pid(2)));
    assert!(rig.kernel.is_running());

    rig.touch(-3);
    assert!(!rig.kernel.is_running());
    assert_eq!(rig.kernel.process_reports().len(), 2);
}

#[test]
fn exit_returns_frames_to_the_pool() {
    let mut rig = Rig::boot(config(4, 10), vec![filled(3, 10, 1), SPIN.clone()]);
    rig.create(1);
    for addr in [0, 10, 20] {
        rig.touch(addr);
    }
    assert_eq!(rig.kernel.frames().occupied_count(), 3);

    rig.syscall(syscall::EXIT, 0, 0);

    assert_eq!(rig.kernel.frames().occupied_count(), 0);
    assert_eq!(rig.kernel.frames().find_free(), Some(0));
    assert_eq!(rig.kernel.process_reports()[0].page_faults, 3);
}
