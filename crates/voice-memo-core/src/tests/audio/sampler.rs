use crate::{AmplitudeSampler, LEVEL_BUFFER_CAPACITY, level};

/// WHAT: Level of a constant buffer is its magnitude
/// WHY: The meter must track loudness linearly
#[test]
fn given_constant_buffer_when_measuring_then_level_is_magnitude() {
    // Given: A buffer of constant amplitude
    let frames = vec![-0.3f32; 128];

    // When: Measuring
    let value = level(&frames);

    // Then: RMS equals the magnitude
    assert!((value - 0.3).abs() < 1e-5);
}

/// WHAT: Levels are bounded to 0..=1
/// WHY: Out-of-range or broken input must not break the meter
#[test]
fn given_degenerate_buffers_when_measuring_then_level_bounded() {
    // Given: Empty, clipped and non-finite buffers
    let empty: [f32; 0] = [];
    let clipped = [4.0f32; 16];
    let broken = [f32::NAN, 0.5];

    // When / Then: Every level stays in range
    assert_eq!(level(&empty), 0.0);
    assert_eq!(level(&clipped), 1.0);
    assert_eq!(level(&broken), 0.0);
}

/// WHAT: Observing with no observers publishes nothing
/// WHY: The capture path must not pay for an absent meter
#[test]
fn given_no_observers_when_observing_then_late_observer_sees_nothing_old() {
    // Given: A sampler with nobody listening
    let sampler = AmplitudeSampler::new();
    assert_eq!(sampler.observer_count(), 0);

    // When: Levels are observed, then an observer attaches
    sampler.observe(&[0.5; 32]);
    let mut stream = sampler.subscribe();

    // Then: The observer sees only what comes after
    assert!(stream.try_next().is_none());
    sampler.observe(&[0.25; 32]);
    assert!((stream.try_next().unwrap() - 0.25).abs() < 1e-5);
}

/// WHAT: A slow observer keeps only the newest levels
/// WHY: The buffer is bounded and drops the oldest values
#[test]
fn given_slow_observer_when_buffer_overflows_then_oldest_dropped() {
    // Given: An attached observer that does not read
    let sampler = AmplitudeSampler::new();
    let mut stream = sampler.subscribe();

    // When: Far more levels than the buffer holds are published
    for i in 0..(LEVEL_BUFFER_CAPACITY * 3) {
        let amplitude = i as f32 / (LEVEL_BUFFER_CAPACITY * 3) as f32;
        sampler.observe(&[amplitude; 8]);
    }

    // Then: At most the buffer capacity is delivered, ending at the newest
    let mut received = Vec::new();
    while let Some(value) = stream.try_next() {
        received.push(value);
    }
    assert!(received.len() <= LEVEL_BUFFER_CAPACITY);
    let newest = (LEVEL_BUFFER_CAPACITY * 3 - 1) as f32 / (LEVEL_BUFFER_CAPACITY * 3) as f32;
    assert!((received.last().unwrap() - newest).abs() < 1e-5);
}

/// WHAT: Dropping the sampler ends every observer's sequence
/// WHY: Observers must learn that capture is over
#[tokio::test]
async fn given_observer_waiting_when_sampler_dropped_then_sequence_ends() {
    // Given: An observer with one buffered level
    let sampler = AmplitudeSampler::new();
    let mut stream = sampler.subscribe();
    sampler.observe(&[0.5; 8]);

    // When: The sampler goes away
    drop(sampler);

    // Then: The buffered level arrives, then the end
    assert!(stream.next().await.is_some());
    assert!(stream.next().await.is_none());
}
