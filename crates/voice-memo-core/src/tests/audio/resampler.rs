use crate::{RECORDING_SAMPLE_RATE, audio::Resampler};

// Test constants
const INPUT_SAMPLE_RATE: u32 = 48000;
const OUTPUT_SAMPLE_RATE: u32 = RECORDING_SAMPLE_RATE;
const ONE_SECOND_INPUT_SAMPLES: usize = INPUT_SAMPLE_RATE as usize;
const ONE_SECOND_OUTPUT_SAMPLES: usize = OUTPUT_SAMPLE_RATE as usize;
const LENGTH_TOLERANCE: u64 = 100;
const STREAM_LENGTH_TOLERANCE: u64 = 2048;
const DEVICE_BUFFER_SAMPLES: usize = 480;
const TEST_SIGNAL_AMPLITUDE: f32 = 0.5;
const TONE_INPUT_SAMPLES: usize = 4800;
const TONE_FREQUENCY_FACTOR: f32 = 0.1;
const TONE_OUTPUT_SAMPLES: usize = 4410;
const TONE_LENGTH_TOLERANCE: u64 = 100;
const MAX_AMPLITUDE: f32 = 1.5;
const EDGE_MARGIN: usize = 200;
const EDGE_WINDOW: usize = 1000;
const LEVEL_TOLERANCE: f32 = 0.05;

/// WHAT: Resampler converts 48kHz to 44.1kHz correctly
/// WHY: Device audio must match the fixed recording rate
#[test]
fn given_48khz_audio_when_resampling_to_44khz_then_output_length_approximately_correct() {
    // Given: Resampler configured for 48kHz -> 44.1kHz
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE).unwrap();
    let input = vec![TEST_SIGNAL_AMPLITUDE; ONE_SECOND_INPUT_SAMPLES];

    // When: Resampling audio data
    let output = resampler.resample(&input).unwrap();

    // Then: Output is approximately 1 second at 44.1kHz
    assert!(
        (output.len() as i64 - ONE_SECOND_OUTPUT_SAMPLES as i64).unsigned_abs() < LENGTH_TOLERANCE,
        "Expected ~{} samples, got {}",
        ONE_SECOND_OUTPUT_SAMPLES,
        output.len()
    );
    assert!(output.iter().all(|&s| s.is_finite())); // No NaN/Inf
}

/// WHAT: Empty samples return empty output
/// WHY: Edge case handling for zero-length input
#[test]
fn given_empty_samples_when_resampling_then_empty_output() {
    // Given: Resampler and empty input
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE).unwrap();
    let empty: Vec<f32> = vec![];

    // When: Resampling empty data
    let output = resampler.resample(&empty).unwrap();

    // Then: Output is also empty
    assert!(output.is_empty());
}

/// WHAT: Resampling preserves signal characteristics
/// WHY: Validates that audio quality is maintained through resampling
#[test]
fn given_tone_signal_when_resampling_then_output_preserves_characteristics() {
    // Given: Resampler and a simple tone signal
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE).unwrap();
    let input: Vec<f32> = (0..TONE_INPUT_SAMPLES)
        .map(|i| (i as f32 * TONE_FREQUENCY_FACTOR).sin())
        .collect();

    // When: Resampling the signal
    let output = resampler.resample(&input).unwrap();

    // Then: Output has expected length and all samples are finite
    assert!(
        (output.len() as i64 - TONE_OUTPUT_SAMPLES as i64).unsigned_abs() < TONE_LENGTH_TOLERANCE,
        "Expected ~{} samples, got {}",
        TONE_OUTPUT_SAMPLES,
        output.len()
    );
    assert!(
        output
            .iter()
            .all(|&s| s.is_finite() && s.abs() <= MAX_AMPLITUDE)
    );
}

/// WHAT: Buffers shorter than a chunk are held until a chunk fills
/// WHY: Device callbacks deliver small buffers that must not be dropped
#[test]
fn given_small_buffer_when_processing_then_held_until_chunk_fills() {
    // Given: A streaming resampler
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE).unwrap();

    // When: Feeding one device-sized buffer
    let output = resampler
        .process(&[TEST_SIGNAL_AMPLITUDE; DEVICE_BUFFER_SAMPLES])
        .unwrap();

    // Then: Nothing ready yet, but flush releases it
    assert!(output.is_empty());
    assert!(!resampler.flush().unwrap().is_empty());
}

/// WHAT: Streaming many small buffers matches the batch length
/// WHY: Live capture converts buffer by buffer without gaps
#[test]
fn given_stream_of_buffers_when_processing_then_total_length_matches_rate() {
    // Given: A streaming resampler
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE).unwrap();
    let buffer = vec![TEST_SIGNAL_AMPLITUDE; DEVICE_BUFFER_SAMPLES];

    // When: Feeding one second in device-sized buffers, then flushing
    let mut total = 0usize;
    for _ in 0..ONE_SECOND_INPUT_SAMPLES / DEVICE_BUFFER_SAMPLES {
        total += resampler.process(&buffer).unwrap().len();
    }
    total += resampler.flush().unwrap().len();

    // Then: About one second at the output rate
    assert!(
        (total as i64 - ONE_SECOND_OUTPUT_SAMPLES as i64).unsigned_abs() < STREAM_LENGTH_TOLERANCE,
        "Expected ~{} samples, got {}",
        ONE_SECOND_OUTPUT_SAMPLES,
        total
    );
}

/// WHAT: Converter latency is trimmed from the front and drained from the back
/// WHY: Played and recorded clips must keep their first and last moments
#[test]
fn given_constant_signal_when_resampling_then_head_and_tail_keep_level() {
    // Given: One second of a constant level
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE).unwrap();
    let input = vec![TEST_SIGNAL_AMPLITUDE; ONE_SECOND_INPUT_SAMPLES];

    // When
    let output = resampler.resample(&input).unwrap();

    // Then: Exact length, and neither edge is silence
    assert_eq!(output.len(), ONE_SECOND_OUTPUT_SAMPLES);
    let mean = |s: &[f32]| s.iter().sum::<f32>() / s.len() as f32;
    let head = mean(&output[EDGE_MARGIN..EDGE_WINDOW]);
    let tail = mean(&output[output.len() - EDGE_WINDOW..output.len() - EDGE_MARGIN]);
    assert!(
        (head - TEST_SIGNAL_AMPLITUDE).abs() < LEVEL_TOLERANCE,
        "head level {}",
        head
    );
    assert!(
        (tail - TEST_SIGNAL_AMPLITUDE).abs() < LEVEL_TOLERANCE,
        "tail level {}",
        tail
    );
}

/// WHAT: A flushed stream is exactly as long as the input at the new rate
/// WHY: Recordings made at 48kHz must not lose their last buffer
#[test]
fn given_stream_with_partial_last_buffer_when_flushing_then_no_samples_lost() {
    // Given: A streaming resampler and an input that ends mid-chunk
    let mut resampler = Resampler::new(INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE).unwrap();
    let buffer = vec![TEST_SIGNAL_AMPLITUDE; DEVICE_BUFFER_SAMPLES];

    // When: Streaming one second, flushing, then reusing for a second stream
    let mut first = 0usize;
    for _ in 0..ONE_SECOND_INPUT_SAMPLES / DEVICE_BUFFER_SAMPLES {
        first += resampler.process(&buffer).unwrap().len();
    }
    first += resampler.flush().unwrap().len();
    let second = resampler.resample(&buffer).unwrap().len();

    // Then
    assert_eq!(first, ONE_SECOND_OUTPUT_SAMPLES);
    assert_eq!(second, DEVICE_BUFFER_SAMPLES * ONE_SECOND_OUTPUT_SAMPLES / ONE_SECOND_INPUT_SAMPLES);
}
