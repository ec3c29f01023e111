//! # Resound
//!
//! Plays pooled sound effects and crossfaded music on a fixed-rate frame
//! loop, the way a game host would drive the engine.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use resound_app::services::AudioSystem;
use resound_audio::output::{HEADLESS_CHANNELS, HEADLESS_SAMPLE_RATE};
use resound_audio::output::list_output_devices;
use resound_audio::{ClipLibrary, Mixer, MixerFactory, Output, OutputDevice};
use resound_core::{EngineConfig, PlaybackProfile, ProfileBank, SpatialParams, Track, Vec3};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Frames per second of the host loop.
const FRAME_RATE: f64 = 60.0;

/// Command-line arguments for resound
#[derive(Parser, Debug)]
#[command(name = "resound")]
#[command(about = "Pooled sound effects and crossfaded music")]
#[command(version)]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, env = "RESOUND_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file of playback profiles
    #[arg(short, long, env = "RESOUND_PROFILES")]
    profiles: Option<PathBuf>,

    /// Directory clip paths are resolved against
    #[arg(long, default_value = ".", env = "RESOUND_CLIPS")]
    clips: PathBuf,

    /// Music files to queue, in order
    #[arg(short, long, num_args = 1..)]
    music: Vec<String>,

    /// Sound-effect clips or profile ids to trigger repeatedly
    #[arg(short, long, num_args = 1..)]
    sfx: Vec<String>,

    /// Seconds between sound-effect triggers
    #[arg(long, default_value = "0.25")]
    sfx_every: f32,

    /// How long to run, in seconds
    #[arg(long, default_value = "10")]
    seconds: f32,

    /// Output device name (defaults to the system default)
    #[arg(long)]
    device: Option<String>,

    /// Render without an audio device
    #[arg(long)]
    headless: bool,

    /// Print the available output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resound=debug,resound_pool=info,resound_music=debug".into()),
        )
        .init();

    let args = Args::parse();

    if args.list_devices {
        let devices = list_output_devices().context("Failed to list output devices")?;
        info!("Found {} output devices", devices.len());
        for name in devices {
            println!("{name}");
        }
        return Ok(());
    }

    info!("Starting Resound v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::load_default(),
    }
    .context("Failed to load config")?;
    config.output.headless |= args.headless;

    let device = open_device(&config, args.device.as_deref());
    let (sample_rate, channels) = device.as_ref().map_or(
        (HEADLESS_SAMPLE_RATE, HEADLESS_CHANNELS),
        |d| (d.sample_rate(), d.channels()),
    );

    let mixer = Mixer::new(
        ClipLibrary::new(&args.clips, sample_rate),
        &config.output,
        channels,
    );

    let profiles = load_profiles(&args)?;
    let preloaded = mixer.with_library(|library| library.preload(profiles.iter().map(|p| &p.clip)));
    if let Err(e) = preloaded {
        warn!("Clip preload incomplete: {e}");
    }

    let mut output = Output::open(mixer.clone(), device).context("Failed to open audio output")?;
    let mut audio = AudioSystem::new(&config, mixer.factory())
        .context("Failed to initialize audio system")?
        .with_profiles(profiles);

    for file in &args.music {
        audio.enqueue(Track::from_clip(file.clone()));
    }

    run(&args, &mut audio, &mut output).await;

    audio.dispose();
    drop(output);
    info!("Shutdown complete");
    Ok(())
}

/// Open the configured output device, or `None` for headless rendering.
fn open_device(config: &EngineConfig, name: Option<&str>) -> Option<OutputDevice> {
    if config.output.headless {
        return None;
    }
    let opened = match name {
        Some(name) => OutputDevice::by_name(name),
        None => OutputDevice::default_device(),
    };
    match opened {
        Ok(device) => {
            info!("Using audio output device: {}", device.name());
            Some(device)
        }
        Err(e) => {
            warn!("{e}; falling back to headless rendering");
            None
        }
    }
}

/// Profiles from the profile file plus one ad-hoc profile per sound-effect
/// clip not already named there.
fn load_profiles(args: &Args) -> Result<ProfileBank> {
    let mut profiles = match &args.profiles {
        Some(path) => ProfileBank::load(path)
            .with_context(|| format!("Failed to load profiles from {}", path.display()))?,
        None => ProfileBank::new(),
    };
    for clip in &args.sfx {
        if profiles.get(clip).is_none() {
            profiles.insert(
                PlaybackProfile::new(clip.as_str(), clip.as_str())
                    .with_spatial(SpatialParams::positional(1.0, 50.0))
                    .with_route("sfx"),
            );
        }
    }
    info!("{} sound profiles available", profiles.len());
    Ok(profiles)
}

/// The host frame loop: tick at a fixed rate until time runs out or Ctrl+C.
async fn run(
    args: &Args,
    audio: &mut AudioSystem<MixerFactory>,
    output: &mut Output,
) {
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / FRAME_RATE));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut rng = rand::rng();
    let started = Instant::now();
    let mut last_frame = started;
    let mut until_sfx = 0.0f32;
    let mut next_sfx = 0usize;
    let mut until_report = 1.0f32;
    let sfx = &args.sfx;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
            _ = interval.tick() => {
                let now = Instant::now();
                let delta = now.duration_since(last_frame).as_secs_f32();
                last_frame = now;

                if !sfx.is_empty() {
                    until_sfx -= delta;
                    if until_sfx <= 0.0 {
                        until_sfx += args.sfx_every.max(0.01);
                        let position = Vec3::new(
                            rng.random_range(-20.0..20.0),
                            0.0,
                            rng.random_range(-20.0..20.0),
                        );
                        let name = &sfx[next_sfx % sfx.len()];
                        next_sfx += 1;
                        if audio.play(name, position).is_none() {
                            debug!("{name} declined");
                        }
                    }
                }

                output.tick(delta);
                audio.tick(delta);

                until_report -= delta;
                if until_report <= 0.0 {
                    until_report += 1.0;
                    let stats = audio.stats();
                    debug!(
                        "{} active, {} idle, music: {}",
                        stats.active,
                        stats.idle,
                        audio
                            .music()
                            .now_playing()
                            .map_or("none", |t| t.id.as_str())
                    );
                }

                if started.elapsed().as_secs_f32() >= args.seconds {
                    info!("Ran for {:.1}s", args.seconds);
                    break;
                }
            }
        }
    }
}
