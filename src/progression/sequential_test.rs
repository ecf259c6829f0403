// Tests for sequential progression

use super::*;
use crate::matching::MatchTier;

const SENTENCE: [&str; 3] = ["నేను", "బడికి", "వెళ్తున్నాను"];

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn started(tokens: &[&str]) -> (SequentialMachine, Instant) {
    let t0 = Instant::now();
    let mut machine = SequentialMachine::new(Scorer::default(), SequentialConfig::default());
    machine.start(TargetSequence::new(tokens.iter().copied()), t0);
    (machine, t0)
}

#[test]
fn test_start_arms_timeout_for_first_token() {
    let (machine, t0) = started(&SENTENCE);
    assert_eq!(machine.phase(), RunPhase::Listening);
    assert_eq!(machine.current_index(), 0);
    assert_eq!(machine.timeout_index(), Some(0));
    assert_eq!(machine.next_deadline(), Some(t0 + secs(5)));
    assert!(machine.results().is_empty());
}

#[test]
fn test_match_advances_one_token() {
    let (mut machine, t0) = started(&SENTENCE);
    let outcome = machine.on_transcript("నేను", t0 + secs(1));
    match outcome {
        SequentialOutcome::Advanced {
            index,
            result,
            completed,
            ..
        } => {
            assert_eq!(index, 0);
            assert_eq!(result, TokenResult::Correct);
            assert!(!completed);
        }
        other => panic!("Expected Advanced, got {:?}", other),
    }
    assert_eq!(machine.current_index(), 1);
    assert_eq!(machine.current_target(), Some("బడికి"));
    assert_eq!(machine.tally(), ScoreTally::new(1, 1));
    assert_eq!(machine.timeout_index(), Some(1));
}

#[test]
fn test_later_word_does_not_skip_ahead() {
    let (mut machine, t0) = started(&["a", "b", "c"]);
    let outcome = machine.on_transcript("c", t0);
    assert!(matches!(outcome, SequentialOutcome::NoMatch { .. }));
    assert_eq!(machine.current_index(), 0);
    assert!(machine.results().is_empty());
}

#[test]
fn test_multi_word_transcript_advances_only_current() {
    let (mut machine, t0) = started(&["a", "b", "c"]);
    let outcome = machine.on_transcript("a b c", t0);
    assert!(matches!(outcome, SequentialOutcome::Advanced { index: 0, .. }));
    assert_eq!(machine.current_index(), 1);
}

#[test]
fn test_candidate_order_is_respected() {
    let (mut machine, t0) = started(&["బడికి", "నేను"]);
    // Leading word does not match, the second one does
    machine.on_transcript("నేను బడికి", t0);
    assert_eq!(machine.current_index(), 1);
    assert_eq!(machine.results().get(&0), Some(&TokenResult::Correct));
}

#[test]
fn test_duplicate_transcripts_advance_once() {
    let (mut machine, t0) = started(&["a", "a", "a"]);
    let first = machine.on_transcript("a", t0);
    let second = machine.on_transcript("a", t0);
    assert!(matches!(first, SequentialOutcome::Advanced { .. }));
    assert_eq!(second, SequentialOutcome::Ignored);
    assert_eq!(machine.current_index(), 1);
    assert_eq!(machine.tally(), ScoreTally::new(1, 1));
    assert!(machine.is_processing());
}

#[test]
fn test_settle_delay_reopens_input() {
    let (mut machine, t0) = started(&["a", "b"]);
    machine.on_transcript("a", t0);

    machine.poll(t0 + ms(299));
    assert!(machine.is_processing());
    assert_eq!(machine.on_transcript("b", t0 + ms(299)), SequentialOutcome::Ignored);

    machine.poll(t0 + ms(300));
    assert!(!machine.is_processing());
    assert!(matches!(
        machine.on_transcript("b", t0 + ms(300)),
        SequentialOutcome::Advanced { completed: true, .. }
    ));
}

#[test]
fn test_near_miss_reports_best_candidate() {
    let (mut machine, t0) = started(&["abcde"]);
    // 0.5 from near-length overlap, below the 0.7 threshold
    match machine.on_transcript("zz abxyz", t0) {
        SequentialOutcome::NoMatch { best: Some(best) } => {
            assert_eq!(best.tier, MatchTier::NearLengthOverlap);
        }
        other => panic!("Expected NoMatch with best, got {:?}", other),
    }
    assert_eq!(machine.current_index(), 0);
}

#[test]
fn test_score_at_threshold_does_not_advance() {
    // Large-gap containment with ratio >= 0.6 scores exactly 0.7
    let (mut machine, t0) = started(&["abcdefghijklmno"]);
    let outcome = machine.on_transcript("abcdefghij", t0);
    assert!(matches!(outcome, SequentialOutcome::NoMatch { .. }));
    assert_eq!(machine.current_index(), 0);
}

#[test]
fn test_live_mismatch_never_marks_incorrect() {
    let (mut machine, t0) = started(&SENTENCE);
    machine.on_transcript("బడికి", t0);
    machine.on_transcript("xyz", t0);
    assert!(machine.results().is_empty());
    assert_eq!(machine.tally(), ScoreTally::default());
}

#[test]
fn test_timeout_forces_progress_to_completion() {
    let (mut machine, t0) = started(&SENTENCE);

    for step in 1..=3u64 {
        let now = t0 + secs(5 * step);
        let outcome = machine.poll(now);
        assert!(
            matches!(
                outcome,
                SequentialOutcome::Advanced {
                    result: TokenResult::Incorrect,
                    resolution: Resolution::TimedOut,
                    ..
                }
            ),
            "step {} got {:?}",
            step,
            outcome
        );
    }

    assert_eq!(machine.phase(), RunPhase::Completed);
    assert_eq!(machine.current_index(), 3);
    assert_eq!(machine.tally(), ScoreTally::new(0, 3));
    assert!(machine
        .results()
        .values()
        .all(|r| *r == TokenResult::Incorrect));
    assert_eq!(machine.next_deadline(), None);
}

#[test]
fn test_timeout_rearmed_by_match() {
    let (mut machine, t0) = started(&SENTENCE);
    machine.on_transcript("నేను", t0 + secs(4));

    // The original deadline for index 0 passes without effect
    machine.poll(t0 + secs(5));
    assert_eq!(machine.current_index(), 1);
    assert!(machine.results().get(&1).is_none());

    // Index 1 times out 5s after the advance
    machine.poll(t0 + secs(9));
    assert_eq!(machine.current_index(), 2);
    assert_eq!(machine.results().get(&1), Some(&TokenResult::Incorrect));
}

#[test]
fn test_end_to_end_sentence() {
    let (mut machine, t0) = started(&SENTENCE);

    machine.on_transcript("నేను", t0 + ms(500));
    assert_eq!(machine.current_index(), 1);
    assert_eq!(machine.tally(), ScoreTally::new(1, 1));

    machine.poll(t0 + ms(1000));
    machine.on_transcript("బడికి", t0 + ms(1500));
    assert_eq!(machine.current_index(), 2);
    assert_eq!(machine.tally(), ScoreTally::new(2, 2));

    machine.poll(t0 + ms(1800));
    assert_eq!(machine.current_index(), 2);
    machine.poll(t0 + ms(6500));
    assert_eq!(machine.current_index(), 3);
    assert_eq!(machine.phase(), RunPhase::Completed);
    assert_eq!(machine.tally(), ScoreTally::new(2, 3));
    assert_eq!(machine.results().get(&2), Some(&TokenResult::Incorrect));
}

#[test]
fn test_completed_run_ignores_input() {
    let (mut machine, t0) = started(&["a"]);
    machine.on_transcript("a", t0);
    assert_eq!(machine.phase(), RunPhase::Completed);
    assert!(!machine.is_processing());
    assert_eq!(machine.on_transcript("a", t0), SequentialOutcome::Ignored);
    assert_eq!(machine.tally(), ScoreTally::new(1, 1));
}

#[test]
fn test_empty_sequence_completes_immediately() {
    let (machine, _t0) = started(&[]);
    assert_eq!(machine.phase(), RunPhase::Completed);
    assert_eq!(machine.next_deadline(), None);
}

#[test]
fn test_pause_and_resume_keep_progress() {
    let (mut machine, t0) = started(&SENTENCE);
    machine.on_transcript("నేను", t0);
    machine.pause();
    assert_eq!(machine.next_deadline(), None);

    // Nothing times out while paused
    assert_eq!(machine.poll(t0 + secs(60)), SequentialOutcome::Ignored);
    assert_eq!(machine.current_index(), 1);

    machine.resume(t0 + secs(60));
    assert_eq!(machine.timeout_index(), Some(1));
    assert_eq!(machine.next_deadline(), Some(t0 + secs(65)));
}

#[test]
fn test_reset_returns_to_idle() {
    let (mut machine, t0) = started(&SENTENCE);
    machine.on_transcript("నేను", t0);
    machine.reset();

    assert_eq!(machine.phase(), RunPhase::Idle);
    assert_eq!(machine.current_index(), 0);
    assert!(machine.sequence().is_empty());
    assert_eq!(machine.tally(), ScoreTally::default());
    assert_eq!(machine.next_deadline(), None);
    assert_eq!(machine.poll(t0 + secs(10)), SequentialOutcome::Ignored);
}
