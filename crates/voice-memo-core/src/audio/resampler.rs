use crate::{CoreResult, MemoError};

use std::panic::Location;

use audioadapter_buffers::direct::InterleavedSlice;
use error_location::ErrorLocation;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument};

const CHUNK_SIZE: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Mono sample-rate converter that can be fed buffers of any length.
///
/// Input is consumed in fixed chunks; whatever does not fill a chunk waits in
/// `pending` for the next call, so a stream of device buffers converts without
/// gaps. The converter's own latency is trimmed from the front of the output,
/// and [`Resampler::flush`] drains it from the back, so a flushed stream is
/// exactly as long as the input at the new rate.
pub struct Resampler {
    resampler: Fft<f32>,
    input_rate: u32,
    output_rate: u32,
    pending: Vec<f32>,
    scratch: Vec<f32>,
    /// Leading output frames still to discard.
    delay_remaining: usize,
    /// Input frames accepted since the last flush.
    consumed: usize,
    /// Output frames handed out since the last flush.
    produced: usize,
}

impl Resampler {
    /// Create a converter from `input_rate` to `output_rate`.
    #[track_caller]
    #[instrument]
    pub fn new(input_rate: u32, output_rate: u32) -> CoreResult<Self> {
        let resampler = Fft::<f32>::new(
            input_rate as usize,  // sample_rate_input
            output_rate as usize, // sample_rate_output
            CHUNK_SIZE,           // chunk_size
            SUB_CHUNKS,           // sub_chunks
            1,                    // nbr_channels (mono)
            FixedSync::Input,     // fixed
        )
        .map_err(|e| MemoError::ResamplingError {
            reason: format!("Failed to create resampler: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let scratch = vec![0.0f32; resampler.output_frames_max()];
        let delay = resampler.output_delay();

        debug!(
            input_rate = input_rate,
            output_rate = output_rate,
            chunk_size = CHUNK_SIZE,
            output_delay = delay,
            "Resampler initialized"
        );

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            pending: Vec::with_capacity(CHUNK_SIZE * 2),
            scratch,
            delay_remaining: delay,
            consumed: 0,
            produced: 0,
        })
    }

    /// Feed samples and return every output frame that is ready.
    #[track_caller]
    pub fn process(&mut self, samples: &[f32]) -> CoreResult<Vec<f32>> {
        self.pending.extend_from_slice(samples);
        self.consumed += samples.len();

        let ready = self.pending.len() / CHUNK_SIZE * CHUNK_SIZE;
        if ready == 0 {
            return Ok(Vec::new());
        }

        let mut output = Vec::with_capacity(self.estimate(ready) + CHUNK_SIZE);
        let chunks: Vec<f32> = self.pending.drain(..ready).collect();
        for chunk in chunks.chunks(CHUNK_SIZE) {
            self.process_chunk(chunk, &mut output)?;
        }
        self.produced += output.len();

        Ok(output)
    }

    /// Convert whatever is still pending and drain the converter's latency.
    ///
    /// Afterwards the converter is reset and ready for a new stream.
    #[track_caller]
    pub fn flush(&mut self) -> CoreResult<Vec<f32>> {
        let target = self.estimate(self.consumed);
        let mut output = Vec::with_capacity(target.saturating_sub(self.produced));

        // Enough padded chunks to cover the delay and the missing tail.
        let needed = target.saturating_sub(self.produced) + self.delay_remaining;
        let max_chunks = self.input_len_for(needed) / CHUNK_SIZE + 2;

        let mut chunk = std::mem::take(&mut self.pending);
        let mut chunks = 0;
        while self.produced + output.len() < target && chunks < max_chunks {
            chunk.resize(CHUNK_SIZE, 0.0);
            self.process_chunk(&chunk, &mut output)?;
            chunk.clear();
            chunks += 1;
        }
        output.truncate(target.saturating_sub(self.produced));

        self.resampler.reset();
        self.delay_remaining = self.resampler.output_delay();
        self.consumed = 0;
        self.produced = 0;

        Ok(output)
    }

    /// Convert a whole clip in one call.
    #[track_caller]
    #[instrument(skip(self, samples))]
    pub fn resample(&mut self, samples: &[f32]) -> CoreResult<Vec<f32>> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let mut output = self.process(samples)?;
        output.extend(self.flush()?);

        debug!(
            input_len = samples.len(),
            output_len = output.len(),
            input_rate = self.input_rate,
            output_rate = self.output_rate,
            "Resampled audio"
        );

        Ok(output)
    }

    fn estimate(&self, input_len: usize) -> usize {
        (input_len as f64 * self.output_rate as f64 / self.input_rate as f64) as usize
    }

    fn input_len_for(&self, output_len: usize) -> usize {
        (output_len as f64 * self.input_rate as f64 / self.output_rate as f64).ceil() as usize
    }

    #[track_caller]
    fn process_chunk(&mut self, chunk: &[f32], output: &mut Vec<f32>) -> CoreResult<()> {
        // Create adapter for input (frames, channels)
        let input_adapter = InterleavedSlice::new(chunk, 1, CHUNK_SIZE).map_err(|e| {
            MemoError::ResamplingError {
                reason: format!("Failed to create input adapter: {}", e),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let output_frames = self.scratch.len();
        let mut output_adapter = InterleavedSlice::new_mut(&mut self.scratch, 1, output_frames)
            .map_err(|e| MemoError::ResamplingError {
                reason: format!("Failed to create output adapter: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let (_input_frames, output_frames_written) = self
            .resampler
            .process_into_buffer(&input_adapter, &mut output_adapter, None)
            .map_err(|e| MemoError::ResamplingError {
                reason: format!("Resampling failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let skip = self.delay_remaining.min(output_frames_written);
        self.delay_remaining -= skip;
        output.extend_from_slice(&self.scratch[skip..output_frames_written]);
        Ok(())
    }
}
