//! Decoded clips and the cache that owns them.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use resound_core::{ClipRef, Error, Result};
use tracing::{debug, info};

use crate::decode::AudioDecoder;
use crate::resample::Resampler;

/// A fully decoded clip: interleaved f32 at the mixer's sample rate, one or
/// two channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl Clip {
    /// Wrap interleaved samples. Channels beyond the first two are dropped.
    pub fn from_interleaved(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Result<Self> {
        match channels {
            0 => Err(Error::UnsupportedFormat("clip has no channels".to_string())),
            1 | 2 => Ok(Self {
                samples,
                channels,
                sample_rate,
            }),
            n => Ok(Self {
                samples: samples
                    .chunks_exact(n)
                    .flat_map(|frame| [frame[0], frame[1]])
                    .collect(),
                channels: 2,
                sample_rate,
            }),
        }
    }

    pub const fn channels(&self) -> usize {
        self.channels
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Left and right sample of one frame. Mono is duplicated.
    pub fn frame(&self, index: usize) -> (f32, f32) {
        let base = index * self.channels;
        match self.samples.get(base..base + self.channels) {
            Some([mono]) => (*mono, *mono),
            Some([left, right]) => (*left, *right),
            _ => (0.0, 0.0),
        }
    }
}

/// Decodes clips from a root directory on first use and keeps them.
#[derive(Debug)]
pub struct ClipLibrary {
    root: PathBuf,
    sample_rate: u32,
    clips: HashMap<ClipRef, Arc<Clip>>,
}

impl ClipLibrary {
    /// Clip paths are resolved relative to `root`; every clip is converted
    /// to `sample_rate`.
    pub fn new(root: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self {
            root: root.into(),
            sample_rate,
            clips: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Cached clip, if already loaded.
    pub fn get(&self, clip: &ClipRef) -> Option<Arc<Clip>> {
        self.clips.get(clip).cloned()
    }

    /// Register an already decoded clip. It is resampled if needed.
    pub fn insert(&mut self, clip: ClipRef, decoded: Clip) -> Result<Arc<Clip>> {
        let decoded = Arc::new(self.conform(decoded)?);
        self.clips.insert(clip, decoded.clone());
        Ok(decoded)
    }

    /// Cached clip, decoding it from disk on first use.
    pub fn load(&mut self, clip: &ClipRef) -> Result<Arc<Clip>> {
        if let Some(cached) = self.clips.get(clip) {
            return Ok(cached.clone());
        }

        let path = self.root.join(clip.as_str());
        if !path.is_file() {
            return Err(Error::ClipNotFound(path.display().to_string()));
        }

        let data = std::fs::read(&path)?;
        let extension = path.extension().and_then(|e| e.to_str());
        let mut decoder = AudioDecoder::from_bytes(data, extension)?;
        let samples = decoder.decode_all()?;
        let decoded = Clip::from_interleaved(samples, decoder.channels(), decoder.sample_rate())?;

        debug!(
            "Decoded {} ({:.2}s, {} channels, {}Hz)",
            clip,
            decoded.duration_secs(),
            decoded.channels(),
            decoded.sample_rate()
        );
        self.insert(clip.clone(), decoded)
    }

    /// Load several clips up front. Stops at the first failure.
    pub fn preload<'a>(&mut self, clips: impl IntoIterator<Item = &'a ClipRef>) -> Result<usize> {
        let mut loaded = 0;
        for clip in clips {
            self.load(clip)?;
            loaded += 1;
        }
        info!("Preloaded {loaded} clips");
        Ok(loaded)
    }

    fn conform(&self, clip: Clip) -> Result<Clip> {
        if clip.sample_rate == self.sample_rate {
            return Ok(clip);
        }
        let mut resampler = Resampler::new(clip.sample_rate, self.sample_rate, clip.channels)?;
        let samples = resampler.convert(&clip.samples)?;
        Clip::from_interleaved(samples, clip.channels, self.sample_rate)
    }
}
