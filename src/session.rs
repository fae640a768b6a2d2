//! One playback run: a device plus the buffer/source pair of every clip.
//!
//! The session is the only owner of the ids it allocates. Release happens in
//! [`Session::close`] or, failing that, on drop, always sources first, then
//! buffers, then the device itself.

use tracing::{debug, warn};

use crate::monitor::{self, WaitPolicy};
use crate::{AudioDevice, BufferFormat, BufferId, Clip, Result, SourceId};

/// Device-side ids backing one clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackHandle {
    pub buffer: BufferId,
    pub source: SourceId,
}

pub struct Session<D: AudioDevice> {
    device: D,
    buffers: Vec<BufferId>,
    sources: Vec<SourceId>,
    longest: f64,
    closed: bool,
}

impl<D: AudioDevice> Session<D> {
    /// Allocates one buffer and one source per clip, uploads every clip and
    /// binds each buffer to its source.
    pub fn new(device: D, clips: &[Clip]) -> Result<Self> {
        let mut session = Self {
            device,
            buffers: Vec::new(),
            sources: Vec::new(),
            longest: clips.iter().map(|c| c.duration).fold(0.0, f64::max),
            closed: false,
        };

        session.buffers = session.device.gen_buffers(clips.len())?;
        session.sources = session.device.gen_sources(clips.len())?;

        for (i, clip) in clips.iter().enumerate() {
            let (buffer, source) = (session.buffers[i], session.sources[i]);
            let format = BufferFormat::from_config(&clip.config)?;
            session
                .device
                .buffer_data(buffer, format, &clip.samples, clip.config.sample_rate)?;
            session.device.source_buffer(source, buffer)?;
            debug!(
                "{}: {:?} uploaded to buffer {}, source {}",
                clip.path.display(),
                format,
                buffer.0,
                source.0
            );
        }

        Ok(session)
    }

    pub fn handles(&self) -> Vec<PlaybackHandle> {
        self.buffers
            .iter()
            .zip(self.sources.iter())
            .map(|(&buffer, &source)| PlaybackHandle { buffer, source })
            .collect()
    }

    pub fn sources(&self) -> &[SourceId] {
        &self.sources
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Longest clip duration in seconds.
    pub fn longest_duration(&self) -> f64 {
        self.longest
    }

    /// Starts every source with a single play command.
    pub fn play(&mut self) -> Result<()> {
        self.device.play_sources(&self.sources)
    }

    /// Pauses every source; a later `play` resumes from the same position.
    pub fn pause(&mut self) -> Result<()> {
        self.device.pause_sources(&self.sources)
    }

    /// Blocks until playback is over according to `policy`.
    pub fn wait(&self, policy: WaitPolicy) -> Result<()> {
        monitor::wait_for_completion(&self.device, &self.sources, policy, self.longest)
    }

    /// Releases every source, then every buffer, then closes the device.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let sources = std::mem::take(&mut self.sources);
        let buffers = std::mem::take(&mut self.buffers);
        let mut first_err = None;

        if !sources.is_empty() {
            if let Err(e) = self.device.delete_sources(&sources) {
                first_err.get_or_insert(e);
            }
        }
        if !buffers.is_empty() {
            if let Err(e) = self.device.delete_buffers(&buffers) {
                first_err.get_or_insert(e);
            }
        }
        if let Err(e) = self.device.close() {
            first_err.get_or_insert(e);
        }
        debug!(
            "Released {} sources and {} buffers",
            sources.len(),
            buffers.len()
        );

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<D: AudioDevice> Drop for Session<D> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release device resources: {}", e);
        }
    }
}
