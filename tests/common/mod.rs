#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use pcmplay::{
    AudioDevice, BufferFormat, BufferId, Result, SoundCardError, SourceId, SourceState,
};
use wav::bit_depth::BitDepth;
use wav::header::Header;

/// Writes a 16-bit PCM WAV file.
pub fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) -> PathBuf {
    let header = Header::new(wav::WAV_FORMAT_PCM, channels, sample_rate, 16);
    let mut file = File::create(path).unwrap();
    wav::write(header, &BitDepth::Sixteen(samples.to_vec()), &mut file).unwrap();
    path.to_path_buf()
}

fn crc8(bytes: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &b in bytes {
        crc ^= b;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x07 } else { crc << 1 };
        }
    }
    crc
}

fn crc16(bytes: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &b in bytes {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ 0x8005 } else { crc << 1 };
        }
    }
    crc
}

/// Samples per FLAC frame written by `write_flac`.
pub const FLAC_BLOCK: usize = 1000;

/// Writes a mono 16-bit 8 kHz FLAC file using uncompressed (verbatim)
/// subframes. `samples.len()` must be a multiple of `FLAC_BLOCK` and
/// leave fewer than 128 frames.
pub fn write_flac(path: &Path, samples: &[i16]) -> PathBuf {
    assert_eq!(samples.len() % FLAC_BLOCK, 0);
    let frames = samples.len() / FLAC_BLOCK;
    assert!(frames < 128);

    let mut out = b"fLaC".to_vec();
    // Last metadata block, STREAMINFO, 34 bytes.
    out.extend_from_slice(&[0x80, 0x00, 0x00, 34]);
    out.extend_from_slice(&(FLAC_BLOCK as u16).to_be_bytes());
    out.extend_from_slice(&(FLAC_BLOCK as u16).to_be_bytes());
    out.extend_from_slice(&[0; 6]);
    // 8000 Hz, one channel (stored as 0), 16 bits (stored as 15), total samples.
    let packed: u64 = (8000u64 << 44) | (15u64 << 36) | samples.len() as u64;
    out.extend_from_slice(&packed.to_be_bytes());
    out.extend_from_slice(&[0; 16]);

    for (number, block) in samples.chunks(FLAC_BLOCK).enumerate() {
        // Fixed blocking, 16-bit block size at end of header, 8 kHz, mono, 16 bps.
        let mut frame = vec![0xFF, 0xF8, 0x74, 0x08, number as u8];
        frame.extend_from_slice(&((FLAC_BLOCK - 1) as u16).to_be_bytes());
        frame.push(crc8(&frame));
        // Verbatim subframe, no wasted bits.
        frame.push(0x02);
        for s in block {
            frame.extend_from_slice(&s.to_be_bytes());
        }
        let crc = crc16(&frame);
        frame.extend_from_slice(&crc.to_be_bytes());
        out.extend_from_slice(&frame);
    }

    std::fs::write(path, out).unwrap();
    path.to_path_buf()
}

/// A ramp that is easy to recognise after decoding.
pub fn ramp(len: usize) -> Vec<i16> {
    (0..len).map(|i| ((i % 2000) as i16) - 1000).collect()
}

#[derive(Debug, Default)]
pub struct DeviceLog {
    pub calls: Vec<String>,
    pub live_buffers: Vec<u32>,
    pub live_sources: Vec<u32>,
    pub allocated_buffers: Vec<u32>,
    pub allocated_sources: Vec<u32>,
    pub deleted_buffers: Vec<u32>,
    pub deleted_sources: Vec<u32>,
    pub uploads: Vec<(u32, BufferFormat, usize, u32)>,
    pub closed: bool,
}

/// Fake device that records every call. Sources report `Playing` for a
/// configurable number of state queries after play.
pub struct RecordingDevice {
    pub log: Rc<RefCell<DeviceLog>>,
    next_id: u32,
    /// Upload number (0-based) that fails, if any.
    pub fail_upload: Option<usize>,
    pub fail_gen_sources: bool,
    /// State queries per source before it reports `Stopped`.
    pub plays_for: HashMap<u32, usize>,
    polls: RefCell<HashMap<u32, usize>>,
    playing: Vec<u32>,
}

impl RecordingDevice {
    pub fn new() -> (Self, Rc<RefCell<DeviceLog>>) {
        let log = Rc::new(RefCell::new(DeviceLog::default()));
        let device = Self {
            log: log.clone(),
            next_id: 100,
            fail_upload: None,
            fail_gen_sources: false,
            plays_for: HashMap::new(),
            polls: RefCell::new(HashMap::new()),
            playing: Vec::new(),
        };
        (device, log)
    }

    fn id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl AudioDevice for RecordingDevice {
    fn gen_buffers(&mut self, n: usize) -> Result<Vec<BufferId>> {
        let ids: Vec<u32> = (0..n).map(|_| self.id()).collect();
        let mut log = self.log.borrow_mut();
        log.calls.push(format!("gen_buffers {}", n));
        log.live_buffers.extend(&ids);
        log.allocated_buffers.extend(&ids);
        Ok(ids.into_iter().map(BufferId).collect())
    }

    fn gen_sources(&mut self, n: usize) -> Result<Vec<SourceId>> {
        if self.fail_gen_sources {
            self.log.borrow_mut().calls.push("gen_sources failed".to_string());
            return Err(SoundCardError::Allocation("out of sources".to_string()));
        }
        let ids: Vec<u32> = (0..n).map(|_| self.id()).collect();
        let mut log = self.log.borrow_mut();
        log.calls.push(format!("gen_sources {}", n));
        log.live_sources.extend(&ids);
        log.allocated_sources.extend(&ids);
        Ok(ids.into_iter().map(SourceId).collect())
    }

    fn buffer_data(
        &mut self,
        buffer: BufferId,
        format: BufferFormat,
        data: &[i16],
        sample_rate: u32,
    ) -> Result<()> {
        let mut log = self.log.borrow_mut();
        if self.fail_upload == Some(log.uploads.len()) {
            log.calls.push("buffer_data failed".to_string());
            return Err(SoundCardError::Allocation("device out of memory".to_string()));
        }
        log.calls.push(format!("buffer_data {}", buffer.0));
        log.uploads.push((buffer.0, format, data.len(), sample_rate));
        Ok(())
    }

    fn source_buffer(&mut self, source: SourceId, buffer: BufferId) -> Result<()> {
        self.log
            .borrow_mut()
            .calls
            .push(format!("source_buffer {} {}", source.0, buffer.0));
        Ok(())
    }

    fn play_sources(&mut self, sources: &[SourceId]) -> Result<()> {
        self.log
            .borrow_mut()
            .calls
            .push(format!("play_sources {}", sources.len()));
        self.playing = sources.iter().map(|s| s.0).collect();
        Ok(())
    }

    fn pause_sources(&mut self, sources: &[SourceId]) -> Result<()> {
        self.log
            .borrow_mut()
            .calls
            .push(format!("pause_sources {}", sources.len()));
        Ok(())
    }

    fn source_state(&self, source: SourceId) -> Result<SourceState> {
        if !self.log.borrow().live_sources.contains(&source.0) {
            return Err(SoundCardError::InvalidHandle(source.0));
        }
        if !self.playing.contains(&source.0) {
            return Ok(SourceState::Stopped);
        }
        let mut polls = self.polls.borrow_mut();
        let seen = polls.entry(source.0).or_insert(0);
        *seen += 1;
        let limit = self.plays_for.get(&source.0).copied().unwrap_or(0);
        if *seen <= limit {
            Ok(SourceState::Playing)
        } else {
            Ok(SourceState::Stopped)
        }
    }

    fn delete_sources(&mut self, sources: &[SourceId]) -> Result<()> {
        let mut log = self.log.borrow_mut();
        log.calls.push(format!("delete_sources {}", sources.len()));
        for source in sources {
            log.live_sources.retain(|&id| id != source.0);
            log.deleted_sources.push(source.0);
        }
        Ok(())
    }

    fn delete_buffers(&mut self, buffers: &[BufferId]) -> Result<()> {
        let mut log = self.log.borrow_mut();
        log.calls.push(format!("delete_buffers {}", buffers.len()));
        for buffer in buffers {
            log.live_buffers.retain(|&id| id != buffer.0);
            log.deleted_buffers.push(buffer.0);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut log = self.log.borrow_mut();
        log.calls.push("close".to_string());
        log.closed = true;
        Ok(())
    }
}
