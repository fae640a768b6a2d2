use std::path::PathBuf;

use thiserror::Error;

pub mod decoder;
pub mod device;
pub mod format;
pub mod loader;
pub mod mixer;
pub mod monitor;
pub mod noise;
pub mod output;
pub mod player;
pub mod session;

#[cfg(all(target_os = "linux", feature = "native"))]
pub mod linux;
#[cfg(all(target_os = "macos", feature = "native"))]
pub mod macos;

pub use device::{AudioDevice, BufferId, SourceId};
pub use format::{BufferFormat, SourceState};
pub use loader::{load_file, Clip};
pub use monitor::WaitPolicy;
pub use output::{Backend, SoundCard};
pub use player::{Input, PlayerConfig};
pub use session::{PlaybackHandle, Session};

/// An output device as reported by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Position in the enumeration; may differ between runs.
    pub id: u32,
    pub name: String,
}

/// Sample rate and channel layout of a decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub sample_rate: u32,
    pub num_channels: u16,
}

#[derive(Debug, Error, PartialEq)]
pub enum SoundCardError {
    #[error("Failed to open `{path}`: {reason}")]
    FileOpen { path: PathBuf, reason: String },
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(u16),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Invalid duration: {0} seconds")]
    InvalidDuration(String),
    #[error("Failed to open output device: {0}")]
    DeviceOpen(String),
    #[error("Output device is closed")]
    DeviceClosed,
    #[error("Output stream error: {0}")]
    Stream(String),
    #[error("Failed to allocate device resources: {0}")]
    Allocation(String),
    #[error("Invalid buffer or source id {0}")]
    InvalidHandle(u32),
    #[error("Buffer {0} is still bound to a source")]
    BufferInUse(u32),
    #[error("ALSA error: `{0}`")]
    AlsaError(String),
    #[error("CoreAudio error: `{0}`")]
    CoreAudioError(String),
}

pub type Result<T> = std::result::Result<T, SoundCardError>;
