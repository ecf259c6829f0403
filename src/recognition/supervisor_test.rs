// Tests for the recognition session supervisor

use super::*;
use crate::clock::{Clock, ManualClock};
use crate::recognition::mock::MockRecognizer;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn started() -> (RecognitionSupervisor<MockRecognizer>, MockRecognizer, ManualClock) {
    let mock = MockRecognizer::new();
    let clock = ManualClock::new();
    let mut supervisor = RecognitionSupervisor::new(mock.clone());
    supervisor.start(clock.now()).unwrap();
    (supervisor, mock, clock)
}

#[test]
fn test_start_sets_listening_and_guard() {
    let (supervisor, mock, clock) = started();
    assert!(supervisor.is_listening());
    assert_eq!(mock.starts(), 1);
    assert_eq!(supervisor.accept_after(), Some(clock.now() + ms(200)));

    let config = mock.calls.lock().last_config.clone().unwrap();
    assert!(config.continuous);
    assert!(config.interim_results);
    assert_eq!(config.language_tag, "te-IN");
}

#[test]
fn test_start_stops_running_turn_first() {
    let (mut supervisor, mock, clock) = started();
    supervisor.start(clock.now()).unwrap();
    assert_eq!(mock.stops(), 1);
    assert_eq!(mock.starts(), 2);
}

#[test]
fn test_result_inside_guard_window_is_dropped() {
    let (mut supervisor, _mock, clock) = started();
    clock.advance(ms(150));
    let results = [ResultFragment::final_("నేను")];
    assert_eq!(supervisor.on_result(0, &results, clock.now()), None);

    clock.advance(ms(50));
    let transcript = supervisor.on_result(0, &results, clock.now()).unwrap();
    assert_eq!(transcript.text, "నేను");
    assert!(transcript.is_final);
}

#[test]
fn test_final_fragments_preferred_over_interim() {
    let (mut supervisor, _mock, clock) = started();
    clock.advance(ms(300));
    let results = [
        ResultFragment::final_("నేను"),
        ResultFragment::interim("బడి"),
        ResultFragment::final_(" బడికి "),
    ];
    let transcript = supervisor.on_result(0, &results, clock.now()).unwrap();
    assert_eq!(transcript.text, "నేను బడికి");
    assert!(transcript.is_final);
}

#[test]
fn test_interim_used_when_no_final() {
    let (mut supervisor, _mock, clock) = started();
    clock.advance(ms(300));
    let results = [ResultFragment::interim("నే"), ResultFragment::interim("ను")];
    let transcript = supervisor.on_result(0, &results, clock.now()).unwrap();
    assert_eq!(transcript.text, "నే ను");
    assert!(!transcript.is_final);
}

#[test]
fn test_only_fragments_from_result_index_are_read() {
    let (mut supervisor, _mock, clock) = started();
    clock.advance(ms(300));
    let results = [ResultFragment::final_("నేను"), ResultFragment::interim("బడికి")];
    let transcript = supervisor.on_result(1, &results, clock.now()).unwrap();
    assert_eq!(transcript.text, "బడికి");

    // Index past the end yields nothing
    assert_eq!(supervisor.on_result(5, &results, clock.now()), None);
}

#[test]
fn test_empty_result_is_dropped() {
    let (mut supervisor, _mock, clock) = started();
    clock.advance(ms(300));
    let results = [ResultFragment::interim("   ")];
    assert_eq!(supervisor.on_result(0, &results, clock.now()), None);
}

#[test]
fn test_results_after_stop_are_dropped() {
    let (mut supervisor, mock, clock) = started();
    supervisor.stop();
    assert!(!supervisor.is_listening());
    assert_eq!(mock.stops(), 1);

    clock.advance(ms(300));
    let results = [ResultFragment::final_("నేను")];
    assert_eq!(supervisor.on_result(0, &results, clock.now()), None);
}

#[test]
fn test_rearm_guard_moves_cutoff() {
    let (mut supervisor, _mock, clock) = started();
    clock.advance(ms(1000));
    supervisor.rearm_guard(clock.now());
    clock.advance(ms(100));
    let results = [ResultFragment::final_("బడికి")];
    assert_eq!(supervisor.on_result(0, &results, clock.now()), None);
}

#[test]
fn test_unexpected_end_schedules_restart() {
    let (mut supervisor, mock, clock) = started();
    clock.advance(ms(3000));
    assert_eq!(supervisor.on_session_ended(clock.now()), None);
    assert_eq!(supervisor.next_deadline(), Some(clock.now() + ms(500)));
    assert!(supervisor.is_listening());

    clock.advance(ms(499));
    assert_eq!(supervisor.poll(clock.now()), None);
    assert_eq!(mock.starts(), 1);

    clock.advance(ms(1));
    assert_eq!(supervisor.poll(clock.now()), None);
    assert_eq!(mock.starts(), 2);
    assert_eq!(supervisor.next_deadline(), None);
}

#[test]
fn test_end_after_stop_does_not_restart() {
    let (mut supervisor, mock, clock) = started();
    supervisor.stop();
    assert_eq!(supervisor.on_session_ended(clock.now()), None);
    assert_eq!(supervisor.next_deadline(), None);

    clock.advance(ms(1000));
    supervisor.poll(clock.now());
    assert_eq!(mock.starts(), 1);
}

#[test]
fn test_stop_cancels_pending_restart() {
    let (mut supervisor, mock, clock) = started();
    supervisor.on_session_ended(clock.now());
    assert!(supervisor.next_deadline().is_some());

    supervisor.stop();
    assert_eq!(supervisor.next_deadline(), None);
    clock.advance(ms(1000));
    supervisor.poll(clock.now());
    assert_eq!(mock.starts(), 1);
}

#[test]
fn test_restart_storm_gives_up() {
    let (mut supervisor, mock, clock) = started();

    // Three immediate failures are retried
    for attempt in 1..=3 {
        assert_eq!(supervisor.on_session_ended(clock.now()), None);
        assert_eq!(supervisor.consecutive_failures(), attempt);
        clock.advance(ms(500));
        supervisor.poll(clock.now());
    }
    assert_eq!(mock.starts(), 4);

    // The fourth gives up and stops listening
    let err = supervisor.on_session_ended(clock.now()).unwrap();
    assert_eq!(err, SupervisorError::RestartExhausted { attempts: 4 });
    assert!(!supervisor.is_listening());
    assert_eq!(supervisor.next_deadline(), None);
}

#[test]
fn test_healthy_turn_resets_failure_count() {
    let (mut supervisor, _mock, clock) = started();
    supervisor.on_session_ended(clock.now());
    clock.advance(ms(500));
    supervisor.poll(clock.now());
    assert_eq!(supervisor.consecutive_failures(), 1);

    // A turn that produced a result is not an immediate failure
    clock.advance(ms(300));
    supervisor.on_result(0, &[ResultFragment::interim("నే")], clock.now());
    assert_eq!(supervisor.consecutive_failures(), 0);
    supervisor.on_session_ended(clock.now());
    assert_eq!(supervisor.consecutive_failures(), 0);
}

#[test]
fn test_long_silent_turn_is_not_immediate_failure() {
    let (mut supervisor, _mock, clock) = started();
    clock.advance(ms(1500));
    supervisor.on_session_ended(clock.now());
    assert_eq!(supervisor.consecutive_failures(), 0);
}

#[test]
fn test_aborted_error_is_benign() {
    let (mut supervisor, mock, _clock) = started();
    assert_eq!(supervisor.on_error("aborted"), None);
    assert!(supervisor.is_listening());
    assert_eq!(mock.stops(), 0);
}

#[test]
fn test_other_errors_stop_listening_and_report() {
    let (mut supervisor, mock, clock) = started();
    let err = supervisor.on_error("not-allowed").unwrap();
    assert_eq!(
        err,
        SupervisorError::Recognizer {
            code: RecognizerErrorCode::NotAllowed
        }
    );
    assert_eq!(err.to_string(), "Microphone permission was denied");
    assert!(!supervisor.is_listening());
    assert_eq!(mock.stops(), 1);

    // The trailing end event must not restart
    assert_eq!(supervisor.on_session_ended(clock.now()), None);
    assert_eq!(supervisor.next_deadline(), None);
}

#[test]
fn test_unknown_error_code_is_reported() {
    let (mut supervisor, _mock, _clock) = started();
    let err = supervisor.on_error("bad-grammar").unwrap();
    assert_eq!(err.to_string(), "Recognizer error: bad-grammar");
}

#[test]
fn test_start_failure_leaves_listening_off() {
    let mock = MockRecognizer::new();
    mock.fail_next_starts(1);
    let clock = ManualClock::new();
    let mut supervisor = RecognitionSupervisor::new(mock.clone());

    let err = supervisor.start(clock.now()).unwrap_err();
    assert!(matches!(err, SupervisorError::StartFailed { .. }));
    assert!(!supervisor.is_listening());

    // Retry succeeds
    supervisor.start(clock.now()).unwrap();
    assert!(supervisor.is_listening());
}

#[test]
fn test_failed_restart_is_reported() {
    let (mut supervisor, mock, clock) = started();
    supervisor.on_session_ended(clock.now());
    mock.fail_next_starts(1);
    clock.advance(ms(500));

    let err = supervisor.poll(clock.now()).unwrap();
    assert!(matches!(err, SupervisorError::StartFailed { .. }));
    assert!(!supervisor.is_listening());
}

#[test]
fn test_trailing_end_of_replaced_turn_is_swallowed() {
    let (mut supervisor, mock, clock) = started();
    // Second start stops the first turn; its end arrives afterwards
    supervisor.start(clock.now()).unwrap();
    assert_eq!(mock.stops(), 1);

    assert_eq!(supervisor.on_session_ended(clock.now()), None);
    assert_eq!(supervisor.next_deadline(), None);
    assert_eq!(supervisor.consecutive_failures(), 0);

    // The live turn is still stopped for real
    supervisor.stop();
    assert_eq!(mock.stops(), 2);
}

#[test]
fn test_trailing_end_after_stop_and_restart_does_not_restart() {
    let (mut supervisor, mock, clock) = started();
    supervisor.stop();
    supervisor.start(clock.now()).unwrap();

    assert_eq!(supervisor.on_session_ended(clock.now()), None);
    clock.advance(ms(1000));
    supervisor.poll(clock.now());
    assert_eq!(mock.starts(), 2);

    // A genuine end of the live turn still restarts
    assert_eq!(supervisor.on_session_ended(clock.now()), None);
    assert!(supervisor.next_deadline().is_some());
}

#[test]
fn test_error_after_stop_is_not_reported() {
    let (mut supervisor, _mock, _clock) = started();
    supervisor.stop();
    assert_eq!(supervisor.on_error("network"), None);
    assert!(!supervisor.is_listening());
}
