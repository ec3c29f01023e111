//! Scripted rendering primitives for tests.
//!
//! A [`ScriptedFactory`] records every primitive it creates. Tests keep a
//! clone of the factory and drive each voice through its [`VoiceControl`]:
//! end playback naturally, tear the resource down, or inspect what the core
//! asked the primitive to do.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{HandleFactory, RenderPrimitive, VoiceParams};

/// Observable state of one scripted voice.
#[derive(Debug, Clone)]
pub struct VoiceProbe {
    pub alive: bool,
    pub playing: bool,
    pub volume: f32,
    pub params: Option<VoiceParams>,
    pub plays: usize,
    pub stops: usize,
}

impl Default for VoiceProbe {
    fn default() -> Self {
        Self {
            alive: true,
            playing: false,
            volume: 0.0,
            params: None,
            plays: 0,
            stops: 0,
        }
    }
}

/// Test-side handle onto a scripted voice.
#[derive(Debug, Clone, Default)]
pub struct VoiceControl(Arc<Mutex<VoiceProbe>>);

impl VoiceControl {
    /// End playback as if the clip reached its end.
    pub fn finish(&self) {
        self.0.lock().playing = false;
    }

    /// Tear down the backing resource.
    pub fn destroy(&self) {
        let mut probe = self.0.lock();
        probe.alive = false;
        probe.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        let probe = self.0.lock();
        probe.alive && probe.playing
    }

    pub fn volume(&self) -> f32 {
        self.0.lock().volume
    }

    pub fn params(&self) -> Option<VoiceParams> {
        self.0.lock().params.clone()
    }

    pub fn clip(&self) -> Option<String> {
        self.0.lock().params.as_ref().map(|p| p.clip.to_string())
    }

    pub fn plays(&self) -> usize {
        self.0.lock().plays
    }

    pub fn stops(&self) -> usize {
        self.0.lock().stops
    }

    pub fn snapshot(&self) -> VoiceProbe {
        self.0.lock().clone()
    }
}

/// A rendering primitive fully controlled by the test.
#[derive(Debug)]
pub struct ScriptedVoice {
    control: VoiceControl,
}

impl ScriptedVoice {
    pub fn control(&self) -> VoiceControl {
        self.control.clone()
    }
}

impl RenderPrimitive for ScriptedVoice {
    fn is_alive(&self) -> bool {
        self.control.0.lock().alive
    }

    fn apply(&mut self, params: &VoiceParams) {
        let mut probe = self.control.0.lock();
        if probe.alive {
            probe.volume = params.volume;
            probe.params = Some(params.clone());
        }
    }

    fn play(&mut self) {
        let mut probe = self.control.0.lock();
        if probe.alive {
            probe.playing = true;
            probe.plays += 1;
        }
    }

    fn stop(&mut self) {
        let mut probe = self.control.0.lock();
        if probe.alive {
            probe.playing = false;
            probe.stops += 1;
        }
    }

    fn is_playing(&self) -> bool {
        let probe = self.control.0.lock();
        probe.alive && probe.playing
    }

    fn set_volume(&mut self, volume: f32) {
        let mut probe = self.control.0.lock();
        if probe.alive {
            probe.volume = volume;
        }
    }
}

/// Factory that remembers every voice it hands out, in creation order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    voices: Arc<Mutex<Vec<VoiceControl>>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of primitives created so far.
    pub fn created(&self) -> usize {
        self.voices.lock().len()
    }

    pub fn voice(&self, index: usize) -> Option<VoiceControl> {
        self.voices.lock().get(index).cloned()
    }

    pub fn voices(&self) -> Vec<VoiceControl> {
        self.voices.lock().clone()
    }

    /// Voices currently playing the given clip.
    pub fn playing(&self, clip: &str) -> Vec<VoiceControl> {
        self.voices()
            .into_iter()
            .filter(|v| v.is_playing() && v.clip().as_deref() == Some(clip))
            .collect()
    }

    /// Number of voices currently playing anything.
    pub fn playing_count(&self) -> usize {
        self.voices().iter().filter(|v| v.is_playing()).count()
    }
}

impl HandleFactory for ScriptedFactory {
    type Primitive = ScriptedVoice;

    fn create(&mut self) -> ScriptedVoice {
        let control = VoiceControl::default();
        self.voices.lock().push(control.clone());
        ScriptedVoice { control }
    }
}
