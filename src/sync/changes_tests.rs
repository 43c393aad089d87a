// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `changes.rs`

use super::*;

#[test]
fn test_tracker_starts_empty() {
    let tracker = ChangeTracker::default();
    assert!(tracker.is_empty());
    assert_eq!(tracker.counts("ns1", "example.com"), None);
}

#[test]
fn test_track_accumulates_per_server_and_zone() {
    let mut tracker = ChangeTracker::default();
    tracker.track("ns1", "example.com", ChangeKind::Add);
    tracker.track("ns1", "example.com", ChangeKind::Add);
    tracker.track("ns1", "example.com", ChangeKind::Update);
    tracker.track("ns2", "example.com", ChangeKind::Delete);
    tracker.track("ns1", "other.com", ChangeKind::Delete);

    assert_eq!(
        tracker.counts("ns1", "example.com"),
        Some(ChangeCounts {
            added: 2,
            updated: 1,
            deleted: 0
        })
    );
    assert_eq!(
        tracker.counts("ns2", "example.com"),
        Some(ChangeCounts {
            added: 0,
            updated: 0,
            deleted: 1
        })
    );
    assert_eq!(
        tracker.counts("ns1", "other.com"),
        Some(ChangeCounts {
            added: 0,
            updated: 0,
            deleted: 1
        })
    );
    assert_eq!(tracker.counts("ns2", "other.com"), None);
}

#[test]
fn test_clear_resets_for_next_tick() {
    let mut tracker = ChangeTracker::default();
    tracker.track("ns1", "example.com", ChangeKind::Add);
    assert!(!tracker.is_empty());

    tracker.clear();
    assert!(tracker.is_empty());
    assert_eq!(tracker.counts("ns1", "example.com"), None);
}
