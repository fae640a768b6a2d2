//! Software buffer/source tables shared with the output stream.
//!
//! The device front end mutates the tables; the render side calls
//! [`Mixer::render`] to pull interleaved frames at the hardware rate.

use std::collections::HashMap;

use crate::{BufferFormat, BufferId, Result, SoundCardError, SourceId, SourceState};

struct BufferSlot {
    format: BufferFormat,
    sample_rate: u32,
    data: Vec<i16>,
}

impl BufferSlot {
    fn frames(&self) -> usize {
        self.data.len() / self.format.channels() as usize
    }
}

struct Voice {
    buffer: Option<BufferId>,
    state: SourceState,
    /// Read position in source frames.
    position: f64,
}

#[derive(Default)]
pub struct Mixer {
    buffers: HashMap<u32, BufferSlot>,
    sources: HashMap<u32, Voice>,
    next_id: u32,
    scratch: Vec<i32>,
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id.max(1);
        self.next_id = id.wrapping_add(1);
        id
    }

    pub fn gen_buffers(&mut self, n: usize) -> Vec<BufferId> {
        (0..n)
            .map(|_| {
                let id = self.alloc_id();
                self.buffers.insert(
                    id,
                    BufferSlot {
                        format: BufferFormat::Mono16,
                        sample_rate: 0,
                        data: Vec::new(),
                    },
                );
                BufferId(id)
            })
            .collect()
    }

    pub fn gen_sources(&mut self, n: usize) -> Vec<SourceId> {
        (0..n)
            .map(|_| {
                let id = self.alloc_id();
                self.sources.insert(
                    id,
                    Voice {
                        buffer: None,
                        state: SourceState::Stopped,
                        position: 0.0,
                    },
                );
                SourceId(id)
            })
            .collect()
    }

    fn is_bound(&self, buffer: BufferId) -> bool {
        self.sources.values().any(|v| v.buffer == Some(buffer))
    }

    pub fn buffer_data(
        &mut self,
        buffer: BufferId,
        format: BufferFormat,
        data: &[i16],
        sample_rate: u32,
    ) -> Result<()> {
        if sample_rate == 0 {
            return Err(SoundCardError::UnsupportedFormat(
                "sample rate must be non-zero".to_string(),
            ));
        }
        if !self.buffers.contains_key(&buffer.0) {
            return Err(SoundCardError::InvalidHandle(buffer.0));
        }
        if self.is_bound(buffer) {
            return Err(SoundCardError::BufferInUse(buffer.0));
        }
        let slot = self
            .buffers
            .get_mut(&buffer.0)
            .ok_or(SoundCardError::InvalidHandle(buffer.0))?;
        slot.format = format;
        slot.sample_rate = sample_rate;
        slot.data.clear();
        slot.data.extend_from_slice(data);
        Ok(())
    }

    pub fn source_buffer(&mut self, source: SourceId, buffer: BufferId) -> Result<()> {
        if !self.buffers.contains_key(&buffer.0) {
            return Err(SoundCardError::InvalidHandle(buffer.0));
        }
        let voice = self
            .sources
            .get_mut(&source.0)
            .ok_or(SoundCardError::InvalidHandle(source.0))?;
        voice.buffer = Some(buffer);
        voice.state = SourceState::Stopped;
        voice.position = 0.0;
        Ok(())
    }

    fn check_sources(&self, sources: &[SourceId]) -> Result<()> {
        match sources.iter().find(|s| !self.sources.contains_key(&s.0)) {
            Some(missing) => Err(SoundCardError::InvalidHandle(missing.0)),
            None => Ok(()),
        }
    }

    pub fn play(&mut self, sources: &[SourceId]) -> Result<()> {
        self.check_sources(sources)?;
        for source in sources {
            let Some(voice) = self.sources.get_mut(&source.0) else {
                continue;
            };
            let playable = voice
                .buffer
                .and_then(|b| self.buffers.get(&b.0))
                .map(|slot| slot.frames() > 0)
                .unwrap_or(false);
            if voice.state != SourceState::Paused {
                voice.position = 0.0;
            }
            voice.state = if playable {
                SourceState::Playing
            } else {
                SourceState::Stopped
            };
        }
        Ok(())
    }

    pub fn pause(&mut self, sources: &[SourceId]) -> Result<()> {
        self.check_sources(sources)?;
        for source in sources {
            if let Some(voice) = self.sources.get_mut(&source.0) {
                if voice.state == SourceState::Playing {
                    voice.state = SourceState::Paused;
                }
            }
        }
        Ok(())
    }

    pub fn state(&self, source: SourceId) -> Result<SourceState> {
        self.sources
            .get(&source.0)
            .map(|v| v.state)
            .ok_or(SoundCardError::InvalidHandle(source.0))
    }

    pub fn delete_sources(&mut self, sources: &[SourceId]) -> Result<()> {
        self.check_sources(sources)?;
        for source in sources {
            self.sources.remove(&source.0);
        }
        Ok(())
    }

    pub fn delete_buffers(&mut self, buffers: &[BufferId]) -> Result<()> {
        for buffer in buffers {
            if !self.buffers.contains_key(&buffer.0) {
                return Err(SoundCardError::InvalidHandle(buffer.0));
            }
            if self.is_bound(*buffer) {
                return Err(SoundCardError::BufferInUse(buffer.0));
            }
        }
        for buffer in buffers {
            self.buffers.remove(&buffer.0);
        }
        Ok(())
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Mixes every playing source into `out`, interleaved with `channels`
    /// channels at `rate` Hz. Sources are stepped nearest-frame to the
    /// output rate and stop when their buffer runs out.
    pub fn render(&mut self, out: &mut [i16], channels: u16, rate: u32) {
        let channels = channels.max(1) as usize;
        let frames = out.len() / channels;
        self.scratch.clear();
        self.scratch.resize(frames * channels, 0);
        let mix = &mut self.scratch;

        for voice in self.sources.values_mut() {
            if voice.state != SourceState::Playing {
                continue;
            }
            let Some(slot) = voice.buffer.and_then(|b| self.buffers.get(&b.0)) else {
                voice.state = SourceState::Stopped;
                continue;
            };
            let step = slot.sample_rate as f64 / rate.max(1) as f64;
            let src_channels = slot.format.channels() as usize;
            let src_frames = slot.frames();

            for frame in 0..frames {
                let idx = voice.position as usize;
                if idx >= src_frames {
                    break;
                }
                let base = idx * src_channels;
                let out_base = frame * channels;
                if src_channels == 1 {
                    let s = slot.data[base] as i32;
                    for c in 0..channels {
                        mix[out_base + c] += s;
                    }
                } else if channels == 1 {
                    let l = slot.data[base] as i32;
                    let r = slot.data[base + 1] as i32;
                    mix[out_base] += (l + r) / 2;
                } else {
                    mix[out_base] += slot.data[base] as i32;
                    mix[out_base + 1] += slot.data[base + 1] as i32;
                }
                voice.position += step;
            }

            if voice.position as usize >= src_frames {
                voice.state = SourceState::Stopped;
            }
        }

        for (dst, src) in out.iter_mut().zip(mix.iter()) {
            *dst = (*src).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }
        for dst in out.iter_mut().skip(mix.len()) {
            *dst = 0;
        }
    }
}
