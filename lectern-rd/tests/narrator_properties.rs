//! Narrator property tests
//!
//! Exercises the orchestrator end-to-end through the actor with a scripted
//! engine: natural progression, pause/resume restart semantics, stop reset,
//! jump-always-plays, rate clamping, skip policy, and the guard against the
//! cancel/end callback race.


use fake_engine::{FakeEngine, FakeEngineHandle};
use lectern_common::events::ReaderEvent;
use lectern_rd::config::NarrationConfig;
use lectern_rd::narrator::{Narrator, NarratorHandle};
use lectern_rd::state::{NarrationSnapshot, SharedState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

fn fast_tuning() -> NarrationConfig {
    NarrationConfig {
        cancel_settle_ms: 10,
        advance_delay_ms: 10,
        stop_settle_ms: 20,
        min_segment_chars: 10,
        max_utterance_chars: 400,
        preferred_language: "en".to_string(),
    }
}

struct Harness {
    narrator: NarratorHandle,
    engine: FakeEngineHandle,
    state: Arc<SharedState>,
}

fn start() -> Harness {
    let state = Arc::new(SharedState::new());
    let (engine, engine_rx, handle) = FakeEngine::new();
    let narrator = Narrator::spawn(
        Box::new(engine),
        engine_rx,
        fast_tuning(),
        Arc::clone(&state),
    );
    Harness {
        narrator,
        engine: handle,
        state,
    }
}

fn segments() -> Vec<String> {
    vec![
        "The quick brown fox jumps over the lazy dog.".to_string(),
        "Pack my box with five dozen liquor jugs.".to_string(),
        "How vexingly quick daft zebras jump.".to_string(),
    ]
}

async fn wait_until<F: Fn() -> bool>(cond: F, what: &str) {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        sleep(POLL_INTERVAL).await;
    }
}

async fn wait_snapshot<F: Fn(&NarrationSnapshot) -> bool>(
    harness: &Harness,
    cond: F,
    what: &str,
) -> NarrationSnapshot {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    loop {
        let snapshot = harness.state.snapshot().await;
        if cond(&snapshot) {
            return snapshot;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}; last snapshot: {:?}", what, snapshot);
        }
        sleep(POLL_INTERVAL).await;
    }
}

async fn wait_for_segment_event(rx: &mut broadcast::Receiver<ReaderEvent>, index: usize) {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    loop {
        match rx.try_recv() {
            Ok(ReaderEvent::SegmentChanged { index: i, .. }) if i == index => return,
            Ok(_) => continue,
            Err(broadcast::error::TryRecvError::Empty) => {
                if tokio::time::Instant::now() > deadline {
                    panic!("timed out waiting for SegmentChanged({})", index);
                }
                sleep(POLL_INTERVAL).await;
            }
            Err(e) => panic!("event stream error: {:?}", e),
        }
    }
}

fn drain_segment_indices(rx: &mut broadcast::Receiver<ReaderEvent>) -> (Vec<usize>, bool) {
    let mut indices = Vec::new();
    let mut completed = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            ReaderEvent::SegmentChanged { index, .. } => indices.push(index),
            ReaderEvent::NarrationCompleted { .. } => completed = true,
            _ => {}
        }
    }
    (indices, completed)
}

#[tokio::test]
async fn test_monotonic_natural_progression() {
    let h = start();
    let mut events = h.state.subscribe_events();

    h.narrator.speak(segments(), 0).unwrap();

    for expected in 1..=3 {
        wait_until(
            || h.engine.speak_count() == expected,
            "next utterance submission",
        )
        .await;
        assert!(h.engine.complete_current());
    }

    wait_snapshot(&h, |s| !s.is_playing && s.has_ever_started, "return to idle").await;

    // Every segment narrated exactly once, in order
    assert_eq!(h.engine.spoken_texts(), segments());
    assert_eq!(h.engine.overlap_count(), 0);

    let (indices, completed) = drain_segment_indices(&mut events);
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(completed);

    let snapshot = h.state.snapshot().await;
    assert_eq!(snapshot.current_segment, 0);
    assert!(!snapshot.is_paused);
}

#[tokio::test]
async fn test_speak_honors_start_index() {
    let h = start();
    let mut events = h.state.subscribe_events();

    h.narrator.speak(segments(), 1).unwrap();

    wait_until(|| h.engine.speak_count() == 1, "first utterance").await;
    assert_eq!(h.engine.spoken_texts(), vec![segments()[1].clone()]);

    h.engine.complete_current();
    wait_until(|| h.engine.speak_count() == 2, "second utterance").await;
    h.engine.complete_current();

    wait_snapshot(&h, |s| !s.is_playing, "completion").await;
    let (indices, _) = drain_segment_indices(&mut events);
    assert_eq!(indices, vec![1, 2]);
}

#[tokio::test]
async fn test_pause_resume_restarts_segment_from_beginning() {
    let h = start();

    h.narrator.speak(segments(), 0).unwrap();
    wait_until(|| h.engine.speak_count() == 1, "segment 0 utterance").await;
    h.engine.complete_current();
    wait_until(|| h.engine.speak_count() == 2, "segment 1 utterance").await;

    // Pause mid-utterance: the engine's cancel fires an end event that looks
    // exactly like natural completion (emit_end_on_cancel is on)
    h.narrator.pause().unwrap();
    let snapshot = wait_snapshot(&h, |s| s.is_paused, "paused state").await;
    assert!(snapshot.is_playing, "paused is a sub-state of playing");
    assert_eq!(snapshot.current_segment, 1);

    // No auto-advance past the paused segment, even after the advance delay
    sleep(Duration::from_millis(60)).await;
    assert_eq!(h.engine.speak_count(), 2);
    assert!(h.state.snapshot().await.is_paused);

    // Resume narrates segment 1 again from its beginning
    h.narrator.resume().unwrap();
    wait_until(|| h.engine.speak_count() == 3, "restarted utterance").await;
    assert_eq!(h.engine.spoken_texts()[2], segments()[1]);

    // ...and continues naturally from segment 2 afterward
    h.engine.complete_current();
    wait_until(|| h.engine.speak_count() == 4, "segment 2 utterance").await;
    assert_eq!(h.engine.spoken_texts()[3], segments()[2]);

    assert_eq!(h.engine.overlap_count(), 0);
}

#[tokio::test]
async fn test_no_auto_advance_on_stray_end_after_pause() {
    let h = start();
    // Disable the automatic cancel-end so the test injects the race by hand
    h.engine.set_emit_end_on_cancel(false);

    h.narrator.speak(segments(), 0).unwrap();
    wait_until(|| h.engine.speak_count() == 1, "segment 0 utterance").await;

    h.narrator.pause().unwrap();
    wait_snapshot(&h, |s| s.is_paused, "paused state").await;

    // The onend racing the cancellation arrives late; twice, even
    h.engine.emit_stray_end();
    h.engine.emit_stray_end();
    sleep(Duration::from_millis(60)).await;

    let snapshot = h.state.snapshot().await;
    assert!(snapshot.is_paused, "stray end must not unpause");
    assert_eq!(snapshot.current_segment, 0, "stray end must not advance");
    assert_eq!(h.engine.speak_count(), 1);
}

#[tokio::test]
async fn test_stop_is_idempotent_and_resets_cursor() {
    let h = start();
    let mut events = h.state.subscribe_events();

    // Stop with nothing playing still reports the cursor reset
    h.narrator.stop().unwrap();
    wait_for_segment_event(&mut events, 0).await;
    let snapshot = h.state.snapshot().await;
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.current_segment, 0);

    // Stop during playback resets to idle at segment 0
    h.narrator.speak(segments(), 2).unwrap();
    wait_until(|| h.engine.speak_count() == 1, "utterance").await;
    h.narrator.stop().unwrap();
    wait_for_segment_event(&mut events, 0).await;

    let snapshot = wait_snapshot(&h, |s| !s.is_playing, "idle after stop").await;
    assert_eq!(snapshot.current_segment, 0);
    assert!(!snapshot.is_paused);
    assert!(h.engine.cancel_count() >= 1);
}

#[tokio::test]
async fn test_jump_from_paused_always_plays() {
    let h = start();

    h.narrator.speak(segments(), 0).unwrap();
    wait_until(|| h.engine.speak_count() == 1, "segment 0 utterance").await;
    h.narrator.pause().unwrap();
    wait_snapshot(&h, |s| s.is_paused, "paused state").await;

    h.narrator.jump_to(2).unwrap();
    wait_until(|| h.engine.speak_count() == 2, "jump utterance").await;

    let snapshot = wait_snapshot(
        &h,
        |s| s.is_playing && !s.is_paused && s.current_segment == 2,
        "playing at jump target",
    )
    .await;
    assert!(!snapshot.is_paused);
    assert_eq!(h.engine.spoken_texts()[1], segments()[2]);
    assert_eq!(h.engine.overlap_count(), 0);
}

#[tokio::test]
async fn test_rate_is_clamped() {
    let h = start();

    assert_eq!(h.narrator.set_rate(3.0).unwrap(), 2.0);
    wait_snapshot(&h, |s| s.rate == 2.0, "clamped high rate").await;

    assert_eq!(h.narrator.set_rate(0.1).unwrap(), 0.5);
    wait_snapshot(&h, |s| s.rate == 0.5, "clamped low rate").await;
}

#[tokio::test]
async fn test_live_rate_change_restarts_current_segment() {
    let h = start();

    h.narrator.speak(segments(), 0).unwrap();
    wait_until(|| h.engine.speak_count() == 1, "segment 0 utterance").await;
    assert_eq!(h.engine.spoken_rates()[0], 1.0);

    h.narrator.set_rate(1.5).unwrap();
    wait_until(|| h.engine.speak_count() == 2, "restarted utterance").await;

    // Same segment, new rate
    assert_eq!(h.engine.spoken_texts()[1], segments()[0]);
    assert_eq!(h.engine.spoken_rates()[1], 1.5);

    let snapshot = h.state.snapshot().await;
    assert!(snapshot.is_playing && !snapshot.is_paused);
    assert_eq!(h.engine.overlap_count(), 0);
}

#[tokio::test]
async fn test_rate_change_while_paused_applies_on_resume() {
    let h = start();

    h.narrator.speak(segments(), 0).unwrap();
    wait_until(|| h.engine.speak_count() == 1, "segment 0 utterance").await;
    h.narrator.pause().unwrap();
    wait_snapshot(&h, |s| s.is_paused, "paused state").await;

    h.narrator.set_rate(1.75).unwrap();
    sleep(Duration::from_millis(40)).await;
    // No restart while paused
    assert_eq!(h.engine.speak_count(), 1);

    h.narrator.resume().unwrap();
    wait_until(|| h.engine.speak_count() == 2, "resumed utterance").await;
    assert_eq!(h.engine.spoken_rates()[1], 1.75);
}

#[tokio::test]
async fn test_empty_and_short_segments_are_skipped() {
    let h = start();
    let mut events = h.state.subscribe_events();

    h.narrator
        .speak(
            vec![
                String::new(),
                "  ".to_string(),
                "Hello there, this is long enough.".to_string(),
            ],
            0,
        )
        .unwrap();

    wait_until(|| h.engine.speak_count() == 1, "skip to narratable segment").await;
    assert_eq!(
        h.engine.spoken_texts(),
        vec!["Hello there, this is long enough.".to_string()]
    );

    h.engine.complete_current();
    wait_snapshot(&h, |s| !s.is_playing, "completion").await;

    // Indices 0 and 1 never produce a start notification
    let (indices, completed) = drain_segment_indices(&mut events);
    assert_eq!(indices, vec![2]);
    assert!(completed);
}

#[tokio::test]
async fn test_failed_segment_is_skipped_without_retry() {
    let h = start();

    h.narrator.speak(segments(), 0).unwrap();
    wait_until(|| h.engine.speak_count() == 1, "segment 0 utterance").await;

    assert!(h.engine.fail_current("synthesis blew up"));
    wait_until(|| h.engine.speak_count() == 2, "skip past failed segment").await;
    assert_eq!(h.engine.spoken_texts()[1], segments()[1]);
}

#[tokio::test]
async fn test_replacing_source_mid_narration() {
    let h = start();

    h.narrator.speak(segments(), 0).unwrap();
    wait_until(|| h.engine.speak_count() == 1, "first source utterance").await;

    let replacement = vec!["A replacement chapter, freshly navigated to.".to_string()];
    h.narrator.speak(replacement.clone(), 0).unwrap();

    wait_until(|| h.engine.speak_count() == 2, "replacement utterance").await;
    assert_eq!(h.engine.spoken_texts()[1], replacement[0]);

    let snapshot = wait_snapshot(&h, |s| s.segment_count == 1, "replaced source").await;
    assert_eq!(snapshot.current_segment, 0);
    assert_eq!(h.engine.overlap_count(), 0);
}

#[tokio::test]
async fn test_control_storm_never_overlaps_utterances() {
    let h = start();

    h.narrator.speak(segments(), 0).unwrap();
    for round in 0..5u32 {
        sleep(Duration::from_millis(15)).await;
        h.narrator.pause().unwrap();
        sleep(Duration::from_millis(5)).await;
        h.narrator.resume().unwrap();
        h.narrator.jump_to((round as usize) % 3).unwrap();
        h.narrator.set_rate(0.5 + round as f32 * 0.4).unwrap();
        sleep(Duration::from_millis(15)).await;
        h.engine.complete_current();
        if round % 2 == 0 {
            h.narrator.stop().unwrap();
            sleep(Duration::from_millis(5)).await;
            h.narrator.speak(segments(), 0).unwrap();
        }
    }

    // Let everything settle, then drain any in-flight utterance chain
    sleep(Duration::from_millis(100)).await;
    for _ in 0..5 {
        h.engine.complete_current();
        sleep(Duration::from_millis(30)).await;
    }

    // For all interleavings: never two utterances in flight at once
    assert_eq!(h.engine.overlap_count(), 0);

    // The machine is still coherent: a fresh speak narrates normally
    let count = h.engine.speak_count();
    h.narrator.speak(segments(), 0).unwrap();
    wait_until(|| h.engine.speak_count() > count, "post-storm utterance").await;
    assert_eq!(h.engine.overlap_count(), 0);
}
