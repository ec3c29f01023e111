//! Audio decoding using symphonia.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::io::Cursor;

use resound_core::{Error, Result};
use symphonia::core::{
    audio::{AudioBufferRef, AudioPlanes, Signal},
    codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL},
    formats::{FormatOptions, FormatReader},
    io::{MediaSourceStream, MediaSourceStreamOptions},
    meta::MetadataOptions,
    probe::Hint,
    sample::Sample,
};
use tracing::{debug, warn};

/// Audio decoder wrapping symphonia.
pub struct AudioDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
}

impl AudioDecoder {
    /// Create a decoder over an in-memory file. `extension` (e.g. `"ogg"`)
    /// helps the prober pick a format.
    pub fn from_bytes(data: Vec<u8>, extension: Option<&str>) -> Result<Self> {
        let mss = MediaSourceStream::new(
            Box::new(Cursor::new(data)),
            MediaSourceStreamOptions::default(),
        );

        let mut hint = Hint::new();
        if let Some(extension) = extension {
            hint.with_extension(extension);
        }

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &MetadataOptions::default())
            .map_err(|e| Error::UnsupportedFormat(format!("Failed to probe format: {e}")))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::AudioDecode("No audio tracks found".to_string()))?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(48000);
        let channels = track.codec_params.channels.map_or(2, |c| c.count());

        debug!(
            "Audio track: id={}, sample_rate={}, channels={}",
            track_id, sample_rate, channels
        );

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::UnsupportedFormat(format!("Failed to create decoder: {e}")))?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
        })
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Decode the next packet into interleaved f32 samples. `None` at end of
    /// stream.
    pub fn decode_next(&mut self) -> Result<Option<Vec<f32>>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(e) => {
                    return Err(Error::AudioDecode(format!("Failed to read packet: {e}")));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => return Ok(Some(audio_buffer_to_f32(&decoded))),
                Err(symphonia::core::errors::Error::DecodeError(e)) => {
                    // Corrupt frames are skipped.
                    warn!("Decode error (skipping): {e}");
                }
                Err(e) => {
                    return Err(Error::AudioDecode(format!("Decode failed: {e}")));
                }
            }
        }
    }

    /// Decode the remainder of the stream.
    pub fn decode_all(&mut self) -> Result<Vec<f32>> {
        let mut samples = Vec::new();
        while let Some(chunk) = self.decode_next()? {
            samples.extend(chunk);
        }
        Ok(samples)
    }
}

/// Convert a decoded buffer to interleaved f32 samples.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn audio_buffer_to_f32(buffer: &AudioBufferRef<'_>) -> Vec<f32> {
    match buffer {
        AudioBufferRef::F32(buf) => interleave(buf.planes(), |s| s),
        AudioBufferRef::F64(buf) => interleave(buf.planes(), |s| s as f32),
        AudioBufferRef::S32(buf) => interleave(buf.planes(), |s| s as f32 / i32::MAX as f32),
        AudioBufferRef::S16(buf) => {
            interleave(buf.planes(), |s| f32::from(s) / f32::from(i16::MAX))
        }
        AudioBufferRef::U8(buf) => interleave(buf.planes(), |s| (f32::from(s) - 128.0) / 128.0),
        _ => Vec::new(),
    }
}

fn interleave<S: Sample>(planes: AudioPlanes<'_, S>, convert: impl Fn(S) -> f32) -> Vec<f32> {
    let channel_planes = planes.planes();
    let Some(first) = channel_planes.first() else {
        return Vec::new();
    };

    let frames = first.len();
    let mut output = Vec::with_capacity(frames * channel_planes.len());
    for frame in 0..frames {
        for plane in channel_planes {
            output.push(convert(plane[frame]));
        }
    }
    output
}
