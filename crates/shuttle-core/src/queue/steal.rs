//! Steal: hand pending items back to the controller.

use std::collections::HashSet;

use super::{QueueEntry, WorkQueue};
use crate::domain::ItemIndex;

/// Reclaim every requested index that is still pending.
///
/// The queue instance is swapped for an empty one first, then the old
/// instance is drained without blocking: requested indices are reclaimed,
/// everything else (the sentinel included) moves to the new instance in its
/// original relative order.
///
/// An item the main loop already dequeued is not pending and is never
/// reclaimed. The returned list can therefore be a strict subset of
/// `requested`, or empty.
pub fn steal(queue: &WorkQueue, requested: &HashSet<ItemIndex>) -> Vec<ItemIndex> {
    let old = queue.replace();

    let mut reclaimed = Vec::new();
    for entry in old {
        match entry {
            QueueEntry::Item(index) if requested.contains(&index) => reclaimed.push(index),
            kept => queue.push_entry(kept),
        }
    }
    reclaimed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn queue_with(indices: &[usize]) -> WorkQueue {
        let queue = WorkQueue::new();
        for &i in indices {
            queue.enqueue(ItemIndex::new(i));
        }
        queue
    }

    fn set(indices: &[usize]) -> HashSet<ItemIndex> {
        indices.iter().copied().map(ItemIndex::new).collect()
    }

    fn remaining(queue: &WorkQueue) -> Vec<usize> {
        queue
            .pending()
            .into_iter()
            .filter_map(QueueEntry::item)
            .map(ItemIndex::get)
            .collect()
    }

    #[rstest]
    #[case(&[5, 9], &[5, 9], &[2, 7])]
    #[case(&[5, 9, 11], &[5, 9], &[2, 7])]
    #[case(&[1, 3], &[], &[2, 5, 7, 9])]
    #[case(&[9, 7, 5, 2], &[2, 5, 7, 9], &[])]
    #[case(&[], &[], &[2, 5, 7, 9])]
    fn reclaims_only_pending_requested_items(
        #[case] requested: &[usize],
        #[case] expected_reclaimed: &[usize],
        #[case] expected_remaining: &[usize],
    ) {
        let queue = queue_with(&[2, 5, 7, 9]);

        let reclaimed = steal(&queue, &set(requested));

        let reclaimed: Vec<usize> = reclaimed.into_iter().map(ItemIndex::get).collect();
        assert_eq!(reclaimed, expected_reclaimed);
        assert_eq!(remaining(&queue), expected_remaining);
    }

    #[test]
    fn dequeued_items_cannot_be_stolen() {
        let queue = queue_with(&[2, 5, 7]);
        assert_eq!(queue.try_dequeue(), Some(QueueEntry::Item(ItemIndex::new(2))));

        let reclaimed = steal(&queue, &set(&[2, 5]));
        assert_eq!(reclaimed, vec![ItemIndex::new(5)]);
        assert_eq!(remaining(&queue), vec![7]);
    }

    #[test]
    fn sentinel_survives_a_steal_in_place() {
        let queue = queue_with(&[1, 2]);
        queue.enqueue_sentinel();

        steal(&queue, &set(&[1]));

        assert_eq!(
            queue.pending(),
            vec![QueueEntry::Item(ItemIndex::new(2)), QueueEntry::Shutdown]
        );
        // still the one and only sentinel
        assert!(!queue.enqueue_sentinel());
    }
}
