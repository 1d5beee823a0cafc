use crate::config::DEFAULT_PM_BASE;
use crate::engine::ShadowEngine;
use crate::report::BugKind;
use crate::tests::pm;
use crate::trace::{PmOp, TraceRecord};

#[test]
fn test_unset_commit_is_always_stale() {
    let mut engine = ShadowEngine::default();
    let data = pm(0x1000, 0x10);
    engine.allocate(data).unwrap();
    engine.write(0, 0x400100, data).unwrap();

    // No durability asserted yet.
    assert!(engine.is_stale_commit(data));
}

#[test]
fn test_commit_update_after_data_write_is_stale() {
    let mut engine = ShadowEngine::default();
    let data = pm(0x1000, 0x10);
    engine.allocate(data).unwrap();

    engine.write(0, 0x400100, data).unwrap(); // time 0
    engine.advance_time();
    engine.note_commit_update(); // time 1

    // The flag advanced strictly past the newest confirmation of the data.
    assert!(engine.is_stale_commit(data));
}

#[test]
fn test_data_write_after_commit_update_is_not_stale() {
    let mut engine = ShadowEngine::default();
    let data = pm(0x1000, 0x10);
    engine.allocate(data).unwrap();

    engine.note_commit_update(); // time 0
    engine.advance_time();
    engine.write(0, 0x400100, data).unwrap(); // time 1

    assert!(!engine.is_stale_commit(data));
}

#[test]
fn test_unwritten_data_is_stale() {
    let mut engine = ShadowEngine::default();
    let data = pm(0x1000, 0x10);
    engine.allocate(data).unwrap();
    engine.note_commit_update();

    // No recorded modification to compare against.
    assert!(engine.is_stale_commit(data));
}

#[test]
fn test_max_timestamp_over_range() {
    let mut engine = ShadowEngine::default();
    let data = pm(0x1000, 0x20);
    engine.allocate(data).unwrap();

    engine.write(0, 0x400100, pm(0x1000, 0x10)).unwrap(); // time 0
    engine.advance_time();
    engine.note_commit_update(); // time 1
    engine.advance_time();
    engine.write(0, 0x400104, pm(0x1010, 0x10)).unwrap(); // time 2

    // Newest modification over the whole range is time 2 > commit time 1.
    assert!(!engine.is_stale_commit(data));
    // The older half alone is still stale.
    assert!(engine.is_stale_commit(pm(0x1000, 0x10)));
}

#[test]
fn test_commit_write_registers_and_updates() {
    let mut engine = ShadowEngine::default();
    let flag = pm(0x8000, 0x8);
    engine.allocate(flag).unwrap();

    let rec = TraceRecord {
        op: PmOp::CommitWrite,
        tid: 0,
        ip: 0x400100,
        src_addr: 0,
        dst_addr: DEFAULT_PM_BASE + 0x8000,
        size: 0x8,
        ret: true,
    };
    engine.apply(&rec).unwrap();
    assert!(engine.is_commit_var(flag));

    // A later plain write overlapping the commit variable refreshes the
    // commit timestamp.
    let data = pm(0x1000, 0x10);
    engine.allocate(data).unwrap();
    engine.advance_time();
    engine.write(0, 0x400104, data).unwrap(); // time 1
    assert!(!engine.is_stale_commit(data)); // commit time 0 < 1

    engine.advance_time();
    engine.write(0, 0x400108, flag).unwrap(); // commit refreshed to time 2
    assert!(engine.is_stale_commit(data));
}

#[test]
fn test_check_stale_commit_emits_report() {
    let mut engine = ShadowEngine::default();
    let data = pm(0x1000, 0x10);
    engine.allocate(data).unwrap();

    assert!(engine.check_stale_commit(0, 0x400100, data));
    assert_eq!(engine.reporter().count(BugKind::StaleCommit), 1);

    engine.note_commit_update();
    engine.advance_time();
    engine.write(0, 0x400104, data).unwrap();
    assert!(!engine.check_stale_commit(0, 0x400108, data));
    assert_eq!(engine.reporter().count(BugKind::StaleCommit), 1);
}
