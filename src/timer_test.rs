use super::*;

#[test]
fn test_fires_only_once_due() {
    let t0 = Instant::now();
    let mut action = DelayedAction::new();
    action.arm(7usize, t0, Duration::from_secs(5));

    assert_eq!(action.take_due(t0 + Duration::from_millis(4999)), None);
    assert!(action.is_armed());

    assert_eq!(action.take_due(t0 + Duration::from_secs(5)), Some(7));
    assert!(!action.is_armed());

    // Already fired
    assert_eq!(action.take_due(t0 + Duration::from_secs(10)), None);
}

#[test]
fn test_rearm_replaces_pending_action() {
    let t0 = Instant::now();
    let mut action = DelayedAction::new();
    action.arm(0usize, t0, Duration::from_secs(5));
    action.arm(1usize, t0 + Duration::from_secs(3), Duration::from_secs(5));

    // The first arming's deadline passes without firing
    assert_eq!(action.take_due(t0 + Duration::from_secs(5)), None);
    assert_eq!(action.armed_key(), Some(1));
    assert_eq!(action.take_due(t0 + Duration::from_secs(8)), Some(1));
}

#[test]
fn test_cancel_prevents_fire() {
    let t0 = Instant::now();
    let mut action = DelayedAction::new();
    action.arm((), t0, Duration::from_millis(500));

    assert_eq!(action.cancel(), Some(()));
    assert_eq!(action.cancel(), None);
    assert_eq!(action.due_at(), None);
    assert_eq!(action.take_due(t0 + Duration::from_secs(1)), None);
}

#[test]
fn test_earliest_deadline() {
    let t0 = Instant::now();
    let t1 = t0 + Duration::from_secs(1);
    assert_eq!(earliest(Some(t1), Some(t0)), Some(t0));
    assert_eq!(earliest(None, Some(t1)), Some(t1));
    assert_eq!(earliest(Some(t0), None), Some(t0));
    assert_eq!(earliest(None, None), None);
}
