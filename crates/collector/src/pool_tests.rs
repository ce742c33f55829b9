// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn grab(pool: &mut EntryPool) -> Option<SlotIndex> {
    pool.acquire("prog", "message", "3", "6", 100)
}

#[test]
fn exhaustion_increments_dropped_by_exactly_one() {
    let mut pool = EntryPool::new(2);
    assert!(grab(&mut pool).is_some());
    assert!(grab(&mut pool).is_some());
    assert_eq!(pool.dropped(), 0);

    assert!(grab(&mut pool).is_none());
    assert_eq!(pool.dropped(), 1);
    assert!(grab(&mut pool).is_none());
    assert_eq!(pool.dropped(), 2);
}

#[test]
fn release_zeroes_fields_and_frees_the_slot() {
    let mut pool = EntryPool::new(1);
    let slot = grab(&mut pool).unwrap();
    assert_eq!(pool.get(slot).unwrap().message, "message");

    pool.release(slot);
    assert!(pool.get(slot).is_none());
    assert_eq!(pool.in_use_count(), 0);

    // The slot is reusable and starts clean
    let slot = pool.acquire("p2", "m2", "1", "2", 7).unwrap();
    let entry = pool.get(slot).unwrap();
    assert_eq!(entry.program, "p2");
    assert_eq!(entry.timestamp, 7);
}

#[test]
fn fields_are_bounded() {
    let mut pool = EntryPool::new(1);
    let long_message = "x".repeat(2000);
    let slot = pool.acquire(&"p".repeat(100), &long_message, "facility", "priority", 1).unwrap();
    let entry = pool.get(slot).unwrap();
    assert_eq!(entry.program.len(), MAX_PROGRAM_BYTES);
    assert_eq!(entry.message.len(), MAX_MESSAGE_BYTES);
    assert_eq!(entry.priority.len(), MAX_PRIORITY_BYTES);
}

#[test]
fn truncation_respects_char_boundaries() {
    let mut pool = EntryPool::new(1);
    // Multibyte characters around the boundary must not split
    let message = "é".repeat(MAX_MESSAGE_BYTES);
    let slot = pool.acquire("p", &message, "f", "p", 1).unwrap();
    assert!(pool.get(slot).unwrap().message.len() <= MAX_MESSAGE_BYTES);
}

#[test]
fn out_of_range_release_is_ignored() {
    let mut pool = EntryPool::new(1);
    pool.release(42);
    assert_eq!(pool.dropped(), 0);
}
