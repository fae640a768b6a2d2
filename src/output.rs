//! The output device: a [`Mixer`] plus the stream that drains it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::mixer::Mixer;
use crate::{
    AudioDevice, BufferFormat, BufferId, Device, Result, SoundCardError, SourceId, SourceState,
};

pub type SharedMixer = Arc<Mutex<Mixer>>;

pub const DEFAULT_RATE: u32 = 44100;
pub const DEFAULT_CHANNELS: u16 = 2;

/// Frames rendered per pull from the mixer.
pub const BLOCK_FRAMES: usize = 441;

/// Upper bound on live sources (and on live buffers) per device.
pub const MAX_SOURCES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Default output device of the platform audio API.
    Native,
    /// Discards audio, paced by the wall clock.
    Null,
}

/// A running stream pulling frames from the mixer.
pub trait OutputStream {
    fn name(&self) -> &str;

    fn close(&mut self) -> Result<()>;
}

pub struct SoundCard {
    mixer: SharedMixer,
    stream: Option<Box<dyn OutputStream>>,
}

impl SoundCard {
    /// Opens the default output device of `backend`.
    pub fn open(backend: Backend) -> Result<Self> {
        let mixer: SharedMixer = Arc::new(Mutex::new(Mixer::new()));
        let stream: Box<dyn OutputStream> = match backend {
            Backend::Native => native_output(mixer.clone())?,
            Backend::Null => Box::new(NullOutput::start(
                mixer.clone(),
                DEFAULT_RATE,
                DEFAULT_CHANNELS,
            )?),
        };
        info!("Opened output device: {}", stream.name());
        Ok(Self {
            mixer,
            stream: Some(stream),
        })
    }

    /// Output devices the native backend can see. `Device::id` is the
    /// position in this list, not a persistent identifier.
    pub fn all_speakers() -> Result<Vec<Device>> {
        native_speakers()
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn buffer_count(&self) -> usize {
        self.mixer.lock().buffer_count()
    }

    pub fn source_count(&self) -> usize {
        self.mixer.lock().source_count()
    }

    fn mixer(&self) -> Result<MutexGuard<'_, Mixer>> {
        if self.stream.is_none() {
            return Err(SoundCardError::DeviceClosed);
        }
        Ok(self.mixer.lock())
    }
}

impl AudioDevice for SoundCard {
    fn gen_buffers(&mut self, n: usize) -> Result<Vec<BufferId>> {
        let mut mixer = self.mixer()?;
        if mixer.buffer_count() + n > MAX_SOURCES {
            return Err(SoundCardError::Allocation(format!(
                "{} buffers requested, {} of {} in use",
                n,
                mixer.buffer_count(),
                MAX_SOURCES
            )));
        }
        Ok(mixer.gen_buffers(n))
    }

    fn gen_sources(&mut self, n: usize) -> Result<Vec<SourceId>> {
        let mut mixer = self.mixer()?;
        if mixer.source_count() + n > MAX_SOURCES {
            return Err(SoundCardError::Allocation(format!(
                "{} sources requested, {} of {} in use",
                n,
                mixer.source_count(),
                MAX_SOURCES
            )));
        }
        Ok(mixer.gen_sources(n))
    }

    fn buffer_data(
        &mut self,
        buffer: BufferId,
        format: BufferFormat,
        data: &[i16],
        sample_rate: u32,
    ) -> Result<()> {
        self.mixer()?.buffer_data(buffer, format, data, sample_rate)
    }

    fn source_buffer(&mut self, source: SourceId, buffer: BufferId) -> Result<()> {
        self.mixer()?.source_buffer(source, buffer)
    }

    fn play_sources(&mut self, sources: &[SourceId]) -> Result<()> {
        self.mixer()?.play(sources)
    }

    fn pause_sources(&mut self, sources: &[SourceId]) -> Result<()> {
        self.mixer()?.pause(sources)
    }

    fn source_state(&self, source: SourceId) -> Result<SourceState> {
        self.mixer()?.state(source)
    }

    fn delete_sources(&mut self, sources: &[SourceId]) -> Result<()> {
        self.mixer()?.delete_sources(sources)
    }

    fn delete_buffers(&mut self, buffers: &[BufferId]) -> Result<()> {
        self.mixer()?.delete_buffers(buffers)
    }

    fn close(&mut self) -> Result<()> {
        match self.stream.take() {
            Some(mut stream) => {
                debug!("Closing output device: {}", stream.name());
                stream.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for SoundCard {
    fn drop(&mut self) {
        let _ = AudioDevice::close(self);
    }
}

#[cfg(all(target_os = "linux", feature = "native"))]
fn native_output(mixer: SharedMixer) -> Result<Box<dyn OutputStream>> {
    Ok(Box::new(crate::linux::AlsaOutput::start(mixer)?))
}

#[cfg(all(target_os = "macos", feature = "native"))]
fn native_output(mixer: SharedMixer) -> Result<Box<dyn OutputStream>> {
    Ok(Box::new(crate::macos::CoreAudioOutput::start(mixer)?))
}

#[cfg(not(any(
    all(target_os = "linux", feature = "native"),
    all(target_os = "macos", feature = "native")
)))]
fn native_output(_mixer: SharedMixer) -> Result<Box<dyn OutputStream>> {
    Err(SoundCardError::DeviceOpen(
        "native output is not available in this build".to_string(),
    ))
}

#[cfg(all(target_os = "linux", feature = "native"))]
fn native_speakers() -> Result<Vec<Device>> {
    crate::linux::all_speakers()
}

#[cfg(all(target_os = "macos", feature = "native"))]
fn native_speakers() -> Result<Vec<Device>> {
    crate::macos::all_speakers()
}

#[cfg(not(any(
    all(target_os = "linux", feature = "native"),
    all(target_os = "macos", feature = "native")
)))]
fn native_speakers() -> Result<Vec<Device>> {
    Ok(Vec::new())
}

/// Render thread that throws the mixed audio away at real-time pace.
pub struct NullOutput {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl NullOutput {
    pub fn start(mixer: SharedMixer, rate: u32, channels: u16) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let thread = thread::Builder::new()
            .name("pcmplay-null".to_string())
            .spawn(move || {
                let mut block = vec![0i16; BLOCK_FRAMES * channels as usize];
                let period = Duration::from_secs_f64(BLOCK_FRAMES as f64 / rate as f64);
                let mut next = Instant::now();
                while flag.load(Ordering::Acquire) {
                    mixer.lock().render(&mut block, channels, rate);
                    next += period;
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    } else {
                        // Fell behind; never render faster than real time.
                        next = now;
                    }
                }
            })
            .map_err(|e| SoundCardError::DeviceOpen(e.to_string()))?;
        Ok(Self {
            running,
            thread: Some(thread),
        })
    }
}

impl OutputStream for NullOutput {
    fn name(&self) -> &str {
        "null"
    }

    fn close(&mut self) -> Result<()> {
        self.running.store(false, Ordering::Release);
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| SoundCardError::Stream("render thread panicked".to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for NullOutput {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
