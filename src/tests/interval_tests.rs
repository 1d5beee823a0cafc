use crate::interval::{IntervalMap, IntervalSet};
use crate::state::AddressRange;

fn r(start: u64, size: u64) -> AddressRange {
    AddressRange::new(start, size).unwrap()
}

#[test]
fn test_insert_and_lookup() {
    let mut map: IntervalMap<u8> = IntervalMap::new();
    map.insert(r(0x100, 0x100), 1);

    assert!(map.overlaps(r(0x100, 1)));
    assert!(map.overlaps(r(0x1ff, 1)));
    assert!(!map.overlaps(r(0x200, 1)));
    assert!(map.covers(r(0x100, 0x100)));
    assert_eq!(map.get(0x150), Some(1));
    assert_eq!(map.get(0x200), None);
    assert_eq!(map.len_bytes(), 0x100);
}

#[test]
fn test_overwrite_splits_spans() {
    let mut map: IntervalMap<u8> = IntervalMap::new();
    map.insert(r(0x100, 0x100), 1);
    map.insert(r(0x140, 0x40), 2);

    let spans = map.lookup(r(0x100, 0x100));
    assert_eq!(
        spans,
        vec![(r(0x100, 0x40), 1), (r(0x140, 0x40), 2), (r(0x180, 0x80), 1)]
    );
    assert_eq!(map.len_bytes(), 0x100);
}

#[test]
fn test_lookup_clips_to_query() {
    let mut map: IntervalMap<u8> = IntervalMap::new();
    map.insert(r(0x100, 0x100), 1);

    let spans = map.lookup(r(0x180, 0x100));
    assert_eq!(spans, vec![(r(0x180, 0x80), 1)]);
}

#[test]
fn test_adjacent_equal_spans_coalesce() {
    let mut map: IntervalMap<u8> = IntervalMap::new();
    map.insert(r(0x100, 0x40), 7);
    map.insert(r(0x140, 0x40), 7);
    map.insert(r(0x0c0, 0x40), 7);

    assert_eq!(map.iter().collect::<Vec<_>>(), vec![(r(0x0c0, 0xc0), 7)]);
}

#[test]
fn test_remove_splits_at_edges() {
    let mut map: IntervalMap<u8> = IntervalMap::new();
    map.insert(r(0x100, 0x100), 1);
    map.remove(r(0x140, 0x40));

    assert!(!map.overlaps(r(0x140, 0x40)));
    assert!(map.covers(r(0x100, 0x40)));
    assert!(map.covers(r(0x180, 0x80)));
    assert!(!map.covers(r(0x100, 0x100)));
    assert_eq!(map.len_bytes(), 0xc0);
}

#[test]
fn test_covers_rejects_gaps() {
    let mut map: IntervalMap<u8> = IntervalMap::new();
    map.insert(r(0x100, 0x10), 1);
    map.insert(r(0x120, 0x10), 1);

    assert!(!map.covers(r(0x100, 0x30)));
    assert!(map.covers(r(0x100, 0x10)));
}

#[test]
fn test_replace_all_counts_bytes() {
    let mut map: IntervalMap<u8> = IntervalMap::new();
    map.insert(r(0x100, 0x10), 1);
    map.insert(r(0x200, 0x20), 1);
    map.insert(r(0x300, 0x10), 2);

    assert_eq!(map.replace_all(1, 3), 0x30);
    assert_eq!(map.replace_all(1, 3), 0);
    assert_eq!(map.get(0x100), Some(3));
    assert_eq!(map.get(0x300), Some(2));
}

#[test]
fn test_replace_all_recoalesces() {
    let mut map: IntervalMap<u8> = IntervalMap::new();
    map.insert(r(0x100, 0x10), 1);
    map.insert(r(0x110, 0x10), 2);

    map.replace_all(2, 1);
    assert_eq!(map.iter().collect::<Vec<_>>(), vec![(r(0x100, 0x20), 1)]);
}

#[test]
fn test_set_overlap_and_covers() {
    let mut set = IntervalSet::new();
    assert!(set.is_empty());

    set.insert(r(0x1000, 0x10));
    assert!(set.contains_overlap(r(0x1008, 0x100)));
    assert!(!set.contains_overlap(r(0x1010, 0x10)));
    assert!(set.covers(r(0x1000, 0x10)));
    assert!(!set.covers(r(0x1000, 0x11)));

    set.clear();
    assert!(!set.contains_overlap(r(0x1000, 0x10)));
}
