//! Edge case and error condition tests for the queue engine
//!
//! Not-found and duplicate conditions must be reported without changing
//! any counter or creating state.

#[cfg(test)]
mod tests {
    use crate::queue::api::{QueueError, QueueOptionsPatch};
    use crate::queue::tests::{ids, manager_with_clock, msg};

    #[test]
    fn test_remove_on_unknown_queue_does_not_create_it() {
        let (mut manager, _clock) = manager_with_clock();

        let err = manager.remove("q", &msg("m1", "g1")).unwrap_err();

        assert_eq!(
            err,
            QueueError::QueueNotFound {
                queue_id: "q".to_string()
            }
        );
        assert!(err.is_not_found());
        assert_eq!(manager.queue_count(), 0);
        assert_eq!(manager.stats().held(), 0);
    }

    #[test]
    fn test_remove_from_unknown_group() {
        let (mut manager, _clock) = manager_with_clock();
        manager.send("q", msg("m1", "g1")).unwrap();

        let err = manager.remove("q", &msg("m1", "g2")).unwrap_err();

        assert!(matches!(err, QueueError::GroupNotFound { .. }));
        assert_eq!(manager.queue_snapshot("q").unwrap().held, 1);
    }

    #[test]
    fn test_remove_unknown_message_leaves_held_unchanged() {
        let (mut manager, _clock) = manager_with_clock();
        manager.send("q", msg("m1", "g1")).unwrap();

        let err = manager.remove("q", &msg("m9", "g1")).unwrap_err();

        assert!(matches!(err, QueueError::MessageNotFound { .. }));
        assert!(err.is_not_found());
        assert_eq!(manager.queue_snapshot("q").unwrap().held, 1);
    }

    #[test]
    fn test_duplicate_send_consumes_no_sequence_number() {
        let (mut manager, _clock) = manager_with_clock();
        manager.send("q", msg("m1", "g1")).unwrap();

        let err = manager.send("q", msg("m1", "g1")).unwrap_err();
        assert!(matches!(err, QueueError::DuplicateMessage { .. }));
        assert!(!err.is_not_found());

        let snapshot = manager.queue_snapshot("q").unwrap();
        assert_eq!(snapshot.held, 1);
        assert_eq!(snapshot.next_sequence, 2);
        assert_eq!(manager.stats().sent, 1);

        // Same id in another group is a different message
        manager.send("q", msg("m1", "g2")).unwrap();
        assert_eq!(manager.queue_snapshot("q").unwrap().held, 2);
    }

    #[test]
    fn test_zero_receive_limit_delivers_one() {
        let (mut manager, _clock) = manager_with_clock();
        manager
            .set_options("q", &QueueOptionsPatch::default().with_receive_limit(0))
            .unwrap();
        manager.send("q", msg("m1", "g1")).unwrap();
        manager.send("q", msg("m2", "g1")).unwrap();

        assert_eq!(ids(&manager.receive("q", "A")), vec!["m1"]);
        assert_eq!(ids(&manager.receive("q", "A")), vec!["m2"]);
    }

    #[test]
    fn test_receive_on_unknown_queue_is_empty() {
        let (mut manager, _clock) = manager_with_clock();

        assert!(manager.receive("nowhere", "A").is_empty());
        assert_eq!(manager.queue_count(), 1);
        assert_eq!(manager.stats().received, 0);
    }

    #[test]
    fn test_queues_are_independent() {
        let (mut manager, _clock) = manager_with_clock();
        manager.send("q1", msg("m1", "g1")).unwrap();
        manager.send("q2", msg("m1", "g1")).unwrap();

        assert_eq!(ids(&manager.receive("q1", "A")), vec!["m1"]);
        assert_eq!(ids(&manager.receive("q2", "B")), vec!["m1"]);

        let stats = manager.stats();
        assert_eq!(stats.queues.len(), 2);
        assert_eq!(stats.queue("q2").unwrap().next_sequence, 2);
    }
}
