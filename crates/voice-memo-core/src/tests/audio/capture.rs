use crate::{
    CaptureState, MemoError,
    tests::fakes::{CaptureRig, capture_rig},
};

use std::{
    fs,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread::sleep,
    time::Duration,
};

use uuid::Uuid;

fn no_ticks(_: Duration) {}

fn files_in(rig: &CaptureRig) -> usize {
    fs::read_dir(rig.dir.path()).unwrap().count()
}

/// WHAT: Start without permission fails before touching the device
/// WHY: No file or stream may be acquired when capture is not allowed
#[test]
fn given_no_permission_when_starting_then_permission_denied_and_idle() {
    // Given: A fresh capture session
    let mut rig = capture_rig();

    // When: Starting with permission not granted
    let result = rig.session.start(Uuid::new_v4(), false, no_ticks);

    // Then: PermissionDenied, nothing opened, nothing on disk
    assert!(matches!(result, Err(MemoError::PermissionDenied { .. })));
    assert_eq!(rig.session.state(), CaptureState::Idle);
    assert_eq!(rig.input.streams_opened.load(Ordering::SeqCst), 0);
    assert_eq!(files_in(&rig), 0);
}

/// WHAT: Start acquires a file and a running stream
/// WHY: Active state must mean frames are flowing into a sink
#[test]
fn given_permission_when_starting_then_active_with_file_and_stream() {
    // Given: A fresh capture session
    let mut rig = capture_rig();
    let id = Uuid::new_v4();

    // When: Starting with permission
    rig.session.start(id, true, no_ticks).unwrap();

    // Then: Active, stream running, one file created under the storage dir
    assert!(rig.session.is_active());
    assert_eq!(rig.session.session_id(), Some(id));
    assert!(rig.input.is_running());
    let path = rig.encoder.last_path().unwrap();
    assert!(path.starts_with(rig.dir.path()));
    assert!(path.is_file());
}

/// WHAT: A second start while active changes nothing
/// WHY: At most one capture may run at a time
#[test]
fn given_active_session_when_starting_again_then_no_op() {
    // Given: An active session
    let mut rig = capture_rig();
    let id = Uuid::new_v4();
    rig.session.start(id, true, no_ticks).unwrap();

    // When: Starting again with a different id
    let result = rig.session.start(Uuid::new_v4(), true, no_ticks);

    // Then: Ok, same session, no second stream or file
    assert!(result.is_ok());
    assert_eq!(rig.session.session_id(), Some(id));
    assert_eq!(rig.input.streams_opened.load(Ordering::SeqCst), 1);
    assert_eq!(rig.encoder.opened.lock().unwrap().len(), 1);
}

/// WHAT: Stop yields a record naming the finalized file
/// WHY: The record id is the session id and its file must exist on return
#[test]
fn given_active_session_when_stopping_then_record_returned_and_file_exists() {
    // Given: An active session that received some frames
    let mut rig = capture_rig();
    let id = Uuid::new_v4();
    rig.session.start(id, true, no_ticks).unwrap();
    assert!(rig.input.push(&[0.1; 512]));
    sleep(Duration::from_millis(20));

    // When: Stopping
    let record = rig.session.stop().unwrap().unwrap();

    // Then: Record matches the session, file finalized and non-empty
    assert_eq!(record.id(), id);
    assert!(record.duration_seconds() > 0.0);
    let path = record.path_in(rig.dir.path());
    assert!(path.is_file());
    assert!(fs::metadata(&path).unwrap().len() > 0);
    assert_eq!(rig.encoder.closed.load(Ordering::SeqCst), 1);
    assert_eq!(rig.session.state(), CaptureState::Idle);
    assert_eq!(rig.session.session_id(), None);
}

/// WHAT: Frames delivered after stop are never written
/// WHY: The sink must be quiescent once stop returns
#[test]
fn given_stopped_session_when_device_delivers_frames_then_nothing_written() {
    // Given: A session that recorded and stopped
    let mut rig = capture_rig();
    rig.session.start(Uuid::new_v4(), true, no_ticks).unwrap();
    rig.input.push(&[0.1; 100]);
    rig.session.stop().unwrap();
    let written = rig.encoder.frames_written.load(Ordering::SeqCst);

    // When: The device tries to deliver more frames
    let delivered = rig.input.push(&[0.1; 100]);

    // Then: Nothing reaches the sink
    assert!(!delivered);
    assert_eq!(rig.encoder.frames_written.load(Ordering::SeqCst), written);
}

/// WHAT: Stop when idle is a no-op
/// WHY: Callers may stop defensively without checking state
#[test]
fn given_idle_session_when_stopping_then_none() {
    // Given: A fresh session
    let mut rig = capture_rig();

    // When: Stopping
    let result = rig.session.stop().unwrap();

    // Then: No record, still idle
    assert!(result.is_none());
    assert_eq!(rig.session.state(), CaptureState::Idle);
}

/// WHAT: Encoder failure releases everything and returns to idle
/// WHY: A failed start must not leave a stream or file behind
#[test]
fn given_encoder_failure_when_starting_then_idle_without_stream() {
    // Given: An encoder that cannot open files
    let mut rig = capture_rig();
    rig.encoder.fail_open.store(true, Ordering::SeqCst);

    // When: Starting
    let result = rig.session.start(Uuid::new_v4(), true, no_ticks);

    // Then: Error, idle, no stream ever opened
    assert!(matches!(result, Err(MemoError::DeviceError { .. })));
    assert_eq!(rig.session.state(), CaptureState::Idle);
    assert_eq!(rig.input.streams_opened.load(Ordering::SeqCst), 0);
    assert_eq!(files_in(&rig), 0);
}

/// WHAT: Stream start failure closes the sink and removes the partial file
/// WHY: Setup failures must not leak files into the storage directory
#[test]
fn given_stream_start_failure_when_starting_then_partial_file_removed() {
    // Given: An input stream that refuses to start
    let mut rig = capture_rig();
    rig.input.fail_start.store(true, Ordering::SeqCst);

    // When: Starting
    let result = rig.session.start(Uuid::new_v4(), true, no_ticks);

    // Then: Error, idle, sink closed, file gone
    assert!(matches!(result, Err(MemoError::DeviceError { .. })));
    assert_eq!(rig.session.state(), CaptureState::Idle);
    assert_eq!(rig.encoder.closed.load(Ordering::SeqCst), 1);
    assert_eq!(files_in(&rig), 0);
    assert!(!rig.input.is_running());
}

/// WHAT: Session can start again after a failed start
/// WHY: Failure must always return to a usable idle state
#[test]
fn given_failed_start_when_retrying_then_active() {
    // Given: A session whose first start failed
    let mut rig = capture_rig();
    rig.encoder.fail_open.store(true, Ordering::SeqCst);
    assert!(rig.session.start(Uuid::new_v4(), true, no_ticks).is_err());

    // When: The fault clears and start is retried
    rig.encoder.fail_open.store(false, Ordering::SeqCst);
    let result = rig.session.start(Uuid::new_v4(), true, no_ticks);

    // Then: Active
    assert!(result.is_ok());
    assert!(rig.session.is_active());
}

/// WHAT: Finalize failure discards the recording
/// WHY: A file that did not close cleanly must not be cataloged
#[test]
fn given_close_failure_when_stopping_then_finalize_error_and_file_discarded() {
    // Given: An active session whose sink fails to close
    let mut rig = capture_rig();
    rig.session.start(Uuid::new_v4(), true, no_ticks).unwrap();
    rig.input.push(&[0.1; 64]);
    let path = rig.encoder.last_path().unwrap();
    rig.encoder.fail_close.store(true, Ordering::SeqCst);

    // When: Stopping
    let result = rig.session.stop();

    // Then: FinalizeError, idle, file removed
    assert!(matches!(result, Err(MemoError::FinalizeError { .. })));
    assert_eq!(rig.session.state(), CaptureState::Idle);
    assert!(!path.exists());
}

/// WHAT: Write failures are skipped and recording continues
/// WHY: One bad buffer must not end the session
#[test]
fn given_failing_writes_when_frames_arrive_then_session_stays_active() {
    // Given: An active session whose sink rejects writes
    let mut rig = capture_rig();
    rig.session.start(Uuid::new_v4(), true, no_ticks).unwrap();
    rig.encoder.fail_write.store(true, Ordering::SeqCst);

    // When: Several buffers arrive, then writes recover
    for _ in 0..5 {
        assert!(rig.input.push(&[0.2; 128]));
    }
    rig.encoder.fail_write.store(false, Ordering::SeqCst);
    rig.input.push(&[0.2; 128]);

    // Then: Still active, the good buffer landed, stop succeeds
    assert!(rig.session.is_active());
    assert_eq!(rig.encoder.frames_written.load(Ordering::SeqCst), 128);
    assert!(rig.session.stop().unwrap().is_some());
}

/// WHAT: Duration ticks flow while active and end with stop
/// WHY: No tick may be delivered after stop returns
#[test]
fn given_active_session_when_stopped_then_ticks_cease() {
    // Given: A session counting ticks
    let mut rig = capture_rig();
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    rig.session
        .start(Uuid::new_v4(), true, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    // When: Running for a few periods, then stopping
    sleep(Duration::from_millis(350));
    rig.session.stop().unwrap();
    let at_stop = ticks.load(Ordering::SeqCst);
    sleep(Duration::from_millis(250));

    // Then: Some ticks arrived, none after stop
    assert!(at_stop >= 1, "expected ticks while active, got {}", at_stop);
    assert_eq!(ticks.load(Ordering::SeqCst), at_stop);
}

/// WHAT: Amplitude observers see levels and then end
/// WHY: The level sequence must terminate when capture stops
#[test]
fn given_amplitude_observer_when_capture_stops_then_sequence_ends() {
    // Given: An active session with an observer attached
    let mut rig = capture_rig();
    assert!(rig.session.subscribe_amplitude().is_none());
    rig.session.start(Uuid::new_v4(), true, no_ticks).unwrap();
    let mut levels = rig.session.subscribe_amplitude().unwrap();

    // When: A loud and a silent buffer arrive, then capture stops
    rig.input.push(&[0.5; 256]);
    rig.input.push(&[0.0; 256]);
    rig.session.stop().unwrap();

    // Then: Both levels are observed in order, then the sequence ends
    let loud = levels.try_next().unwrap();
    let silent = levels.try_next().unwrap();
    assert!((loud - 0.5).abs() < 1e-4);
    assert_eq!(silent, 0.0);
    assert!(levels.try_next().is_none());
    assert!(rig.session.subscribe_amplitude().is_none());
}

/// WHAT: Back-to-back sessions write distinct files
/// WHY: Each recording must own exactly one file
#[test]
fn given_two_sessions_when_recorded_back_to_back_then_distinct_files() {
    // Given: A session
    let mut rig = capture_rig();

    // When: Recording twice
    rig.session.start(Uuid::new_v4(), true, no_ticks).unwrap();
    let first = rig.session.stop().unwrap().unwrap();
    rig.session.start(Uuid::new_v4(), true, no_ticks).unwrap();
    let second = rig.session.stop().unwrap().unwrap();

    // Then: Different ids and file names, both on disk
    assert_ne!(first.id(), second.id());
    assert_ne!(first.file_name(), second.file_name());
    assert!(first.path_in(rig.dir.path()).is_file());
    assert!(second.path_in(rig.dir.path()).is_file());
}

/// WHAT: Frames the stream hands over while stopping reach the file
/// WHY: A converting device holds the end of the recording until it stops
#[test]
fn given_stream_with_buffered_tail_when_stopping_then_tail_written() {
    // Given: A stream that still holds 300 frames when told to stop
    let mut rig = capture_rig();
    *rig.input.stop_tail.lock().unwrap() = vec![0.3; 300];
    rig.session.start(Uuid::new_v4(), true, no_ticks).unwrap();
    rig.input.push(&[0.1; 100]);

    // When
    let record = rig.session.stop().unwrap();

    // Then: Both the live frames and the tail were encoded
    assert!(record.is_some());
    assert_eq!(rig.encoder.frames_written.load(Ordering::SeqCst), 400);
}

/// WHAT: Dropping a live session still finalizes its sink, even when that fails
/// WHY: Teardown on drop must release the device and never panic
#[test]
fn given_active_session_with_failing_close_when_dropped_then_sink_closed_once() {
    // Given: A recording session whose sink will fail to finalize
    let rig = capture_rig();
    let CaptureRig {
        mut session,
        input,
        encoder,
        dir: _dir,
    } = rig;
    session.start(Uuid::new_v4(), true, no_ticks).unwrap();
    encoder.fail_close.store(true, Ordering::SeqCst);

    // When
    drop(session);

    // Then: The stream stopped and the sink was closed exactly once
    assert!(!input.is_running());
    assert_eq!(encoder.closed.load(Ordering::SeqCst), 1);
}
