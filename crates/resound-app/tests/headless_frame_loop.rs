//! The audio system driven by a headless mixer, frame by frame.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use resound_app::services::AudioSystem;
use resound_audio::{Clip, ClipLibrary, HeadlessOutput, Mixer, MixerFactory};
use resound_core::{
    ClipRef, EngineConfig, OutputConfig, PlaybackProfile, ProfileBank, Track, Vec3,
};

const RATE: u32 = 8000;
const FRAME: f32 = 1.0 / 60.0;

fn mixer() -> Mixer {
    let mut library = ClipLibrary::new(".", RATE);
    // 0.1s blip and a 2s song
    for (name, frames) in [("blip", 800), ("song-a", 16000), ("song-b", 16000)] {
        let clip = Clip::from_interleaved(vec![0.2; frames], 1, RATE).unwrap();
        library.insert(ClipRef::from(name), clip).unwrap();
    }
    Mixer::new(library, &OutputConfig::default(), 2)
}

fn system(mixer: &Mixer) -> AudioSystem<MixerFactory> {
    let mut profiles = ProfileBank::new();
    profiles.insert(PlaybackProfile::new("blip", "blip").with_route("sfx"));
    AudioSystem::new(&EngineConfig::default(), mixer.factory())
        .unwrap()
        .with_profiles(profiles)
}

fn run_frames(audio: &mut AudioSystem<MixerFactory>, output: &mut HeadlessOutput, frames: usize) {
    for _ in 0..frames {
        output.advance(FRAME);
        audio.tick(FRAME);
    }
}

#[test]
fn test_sound_effect_returns_to_pool_when_clip_ends() {
    let mixer = mixer();
    let mut output = HeadlessOutput::new(mixer.clone());
    let mut audio = system(&mixer);

    let id = audio.play("blip", Vec3::new(2.0, 0.0, 0.0)).unwrap();
    assert_eq!(audio.stats().active, 1);
    assert_eq!(mixer.playing_count(), 1);

    run_frames(&mut audio, &mut output, 3);
    assert!(audio.pool().is_active(id));
    assert!(output.peak() > 0.0);

    run_frames(&mut audio, &mut output, 10);
    assert!(!audio.pool().is_active(id));
    assert_eq!(audio.stats().active, 0);
    assert!(audio.stats().live.is_empty());
}

#[test]
fn test_playlist_crossfades_on_real_voices() {
    let mixer = mixer();
    let mut output = HeadlessOutput::new(mixer.clone());
    let mut audio = system(&mixer);

    audio.enqueue(Track::from_clip("song-a"));
    audio.enqueue(Track::from_clip("song-b"));
    assert_eq!(audio.music().now_playing().unwrap().id, "song-a");

    // Song A lasts two seconds; song B takes over once it ends.
    run_frames(&mut audio, &mut output, 130);
    assert_eq!(audio.music().now_playing().unwrap().id, "song-b");
    assert!(audio.music().is_fading());

    run_frames(&mut audio, &mut output, 70);
    assert!(!audio.music().is_fading());
    assert!(audio.music().outgoing().is_none());
    assert!((audio.music().incoming_volume().unwrap() - 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_dropping_mixer_makes_sounds_finish() {
    let mixer = mixer();
    let mut audio = system(&mixer);
    let id = audio.play("blip", Vec3::ZERO).unwrap();

    drop(mixer);
    audio.tick(FRAME);
    assert!(!audio.pool().is_active(id));
    assert!(audio.play("blip", Vec3::ZERO).is_some());
    audio.tick(FRAME);
    assert_eq!(audio.stats().active, 0);
}
