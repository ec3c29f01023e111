//! Audio output using cpal, or a headless sink for machines without a device.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, SampleFormat, Stream, StreamConfig,
};
use resound_core::{Error, Result};
use tracing::{debug, error, info};

use crate::mixer::Mixer;

/// Sample rate used when no device dictates one.
pub const HEADLESS_SAMPLE_RATE: u32 = 48000;
/// Channel count used when no device dictates one.
pub const HEADLESS_CHANNELS: usize = 2;

/// An output device together with its default stream format.
pub struct OutputDevice {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    name: String,
}

impl OutputDevice {
    /// The host's default output device.
    pub fn default_device() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No output device found".to_string()))?;
        Self::from_device(device)
    }

    /// Open an output device by name.
    pub fn by_name(name: &str) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to list devices: {e}")))?
            .find(|d| d.name().is_ok_and(|n| n == name))
            .ok_or_else(|| Error::AudioOutput(format!("No output device named {name}")))?;
        Self::from_device(device)
    }

    fn from_device(device: Device) -> Result<Self> {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let supported = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get output config: {e}")))?;
        debug!("Supported output config: {:?}", supported);

        let sample_format = supported.sample_format();
        Ok(Self {
            device,
            config: supported.into(),
            sample_format,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> usize {
        usize::from(self.config.channels)
    }
}

/// A running cpal stream pulling from a mixer.
pub struct AudioOutput {
    _stream: Stream,
    device_name: String,
    sample_rate: u32,
    channels: usize,
}

impl AudioOutput {
    /// Start streaming `mixer` to `device`. The mixer must have been built
    /// for the device's sample rate and channel count.
    pub fn start(device: OutputDevice, mixer: Mixer) -> Result<Self> {
        let OutputDevice {
            device,
            config,
            sample_format,
            name,
        } = device;

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, mixer)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, mixer)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, mixer)?,
            _ => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {sample_format:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {e}")))?;

        info!(
            "Audio output on {name}: {}Hz, {} channels",
            config.sample_rate.0, config.channels
        );

        Ok(Self {
            _stream: stream,
            device_name: name,
            sample_rate: config.sample_rate.0,
            channels: usize::from(config.channels),
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &Device,
        config: &StreamConfig,
        mixer: Mixer,
    ) -> Result<Stream> {
        let err_fn = |err| {
            error!("Audio stream error: {err}");
        };

        let mut scratch: Vec<f32> = Vec::new();
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    mixer.render(&mut scratch);
                    for (sample, mixed) in data.iter_mut().zip(&scratch) {
                        *sample = T::from_sample(*mixed);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {e}")))
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub const fn channels(&self) -> usize {
        self.channels
    }
}

/// Renders the mixer into a scratch buffer as the host's clock advances,
/// so voices progress and finish without an audio device.
pub struct HeadlessOutput {
    mixer: Mixer,
    scratch: Vec<f32>,
    /// Fractional frames carried over between ticks.
    owed: f64,
    peak: f32,
}

impl HeadlessOutput {
    pub const fn new(mixer: Mixer) -> Self {
        Self {
            mixer,
            scratch: Vec::new(),
            owed: 0.0,
            peak: 0.0,
        }
    }

    /// Render `delta` seconds of audio. Returns the frames rendered.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn advance(&mut self, delta: f32) -> usize {
        self.owed += f64::from(delta.max(0.0)) * f64::from(self.mixer.sample_rate());
        let frames = self.owed.floor() as usize;
        #[allow(clippy::cast_precision_loss)]
        {
            self.owed -= frames as f64;
        }

        self.scratch.resize(frames * self.mixer.channels(), 0.0);
        self.mixer.render(&mut self.scratch);
        self.peak = self.scratch.iter().fold(0.0, |peak, s| peak.max(s.abs()));
        frames
    }

    /// Loudest sample of the last rendered block.
    pub const fn peak(&self) -> f32 {
        self.peak
    }
}

/// Wherever the mixer's output goes.
pub enum Output {
    Device(AudioOutput),
    Headless(HeadlessOutput),
}

impl Output {
    /// Stream to `device`, or render headless when there is none.
    pub fn open(mixer: Mixer, device: Option<OutputDevice>) -> Result<Self> {
        match device {
            Some(device) => Ok(Self::Device(AudioOutput::start(device, mixer)?)),
            None => {
                info!("Rendering headless at {}Hz", mixer.sample_rate());
                Ok(Self::Headless(HeadlessOutput::new(mixer)))
            }
        }
    }

    /// Advance the output clock. Device output runs on its own thread, so
    /// only headless output does work here.
    pub fn tick(&mut self, delta: f32) {
        if let Self::Headless(headless) = self {
            headless.advance(delta);
        }
    }

    pub const fn is_headless(&self) -> bool {
        matches!(self, Self::Headless(_))
    }
}

/// List available output devices.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| Error::AudioOutput(format!("Failed to list devices: {e}")))?
        .filter_map(|d| d.name().ok())
        .collect();
    Ok(devices)
}
