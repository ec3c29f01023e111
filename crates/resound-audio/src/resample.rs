//! Sample-rate conversion of decoded clips using rubato.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use resound_core::{Error, Result};
use rubato::{FftFixedIn, Resampler as RubatoResampler};
use tracing::debug;

const CHUNK_SIZE: usize = 1024;

/// Converts interleaved audio from one sample rate to another.
pub struct Resampler {
    #[allow(clippy::struct_field_names)]
    resampler: FftFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
    channels: usize,
    /// Deinterleaved input waiting for a full chunk.
    pending: Vec<Vec<f32>>,
}

impl Resampler {
    pub fn new(input_rate: u32, output_rate: u32, channels: usize) -> Result<Self> {
        let resampler = FftFixedIn::new(
            input_rate as usize,
            output_rate as usize,
            CHUNK_SIZE,
            2,
            channels,
        )
        .map_err(|e| Error::AudioDecode(format!("Failed to create resampler: {e}")))?;

        debug!(
            "Resampler created: {}Hz -> {}Hz, {} channels",
            input_rate, output_rate, channels
        );

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            channels,
            pending: vec![Vec::new(); channels],
        })
    }

    pub const fn needs_resampling(&self) -> bool {
        self.input_rate != self.output_rate
    }

    pub const fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub const fn output_rate(&self) -> u32 {
        self.output_rate
    }

    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Feed interleaved samples; returns whatever full chunks produced.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if !self.needs_resampling() {
            return Ok(input.to_vec());
        }

        for frame in input.chunks_exact(self.channels) {
            for (channel, sample) in self.pending.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }

        let mut output = Vec::new();
        while self.pending[0].len() >= CHUNK_SIZE {
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|channel| channel.drain(..CHUNK_SIZE).collect())
                .collect();
            let resampled = self.run(&chunk)?;
            interleave_into(&mut output, &resampled, usize::MAX);
        }
        Ok(output)
    }

    /// Pad and convert the final partial chunk.
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        let remaining = self.pending[0].len();
        if !self.needs_resampling() || remaining == 0 {
            let mut output = Vec::new();
            interleave_into(&mut output, &self.pending, usize::MAX);
            self.pending.iter_mut().for_each(Vec::clear);
            return Ok(output);
        }

        let chunk: Vec<Vec<f32>> = self
            .pending
            .iter_mut()
            .map(|channel| {
                let mut data = std::mem::take(channel);
                data.resize(CHUNK_SIZE, 0.0);
                data
            })
            .collect();
        let resampled = self.run(&chunk)?;

        // Only keep the portion that corresponds to real input.
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let frames = (remaining as f64 * f64::from(self.output_rate) / f64::from(self.input_rate))
            as usize;
        let mut output = Vec::new();
        interleave_into(&mut output, &resampled, frames);
        Ok(output)
    }

    /// Convert a whole interleaved clip in one go.
    pub fn convert(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let mut output = self.process(input)?;
        output.extend(self.flush()?);
        Ok(output)
    }

    fn run(&mut self, chunk: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        self.resampler
            .process(chunk, None)
            .map_err(|e| Error::AudioDecode(format!("Resample failed: {e}")))
    }
}

/// Append up to `max_frames` interleaved frames from per-channel buffers.
fn interleave_into(output: &mut Vec<f32>, channels: &[Vec<f32>], max_frames: usize) {
    let Some(first) = channels.first() else {
        return;
    };
    let frames = first.len().min(max_frames);
    output.reserve(frames * channels.len());
    for frame in 0..frames {
        for channel in channels {
            output.push(channel[frame]);
        }
    }
}
