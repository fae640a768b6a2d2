//! Buffer/source model of a native audio device.
//!
//! A buffer holds one clip's samples on the device side; a source plays a
//! bound buffer. Ids are handed out by the device and must be deleted through
//! it.

use crate::{BufferFormat, Result, SourceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u32);

pub trait AudioDevice {
    fn gen_buffers(&mut self, n: usize) -> Result<Vec<BufferId>>;

    fn gen_sources(&mut self, n: usize) -> Result<Vec<SourceId>>;

    /// Uploads `data` into `buffer`, replacing whatever it held.
    fn buffer_data(
        &mut self,
        buffer: BufferId,
        format: BufferFormat,
        data: &[i16],
        sample_rate: u32,
    ) -> Result<()>;

    /// Binds `buffer` to `source`.
    fn source_buffer(&mut self, source: SourceId, buffer: BufferId) -> Result<()>;

    /// Starts every source in `sources` together. Paused sources resume,
    /// all others restart from the beginning of their buffer.
    fn play_sources(&mut self, sources: &[SourceId]) -> Result<()>;

    fn pause_sources(&mut self, sources: &[SourceId]) -> Result<()>;

    fn source_state(&self, source: SourceId) -> Result<SourceState>;

    fn delete_sources(&mut self, sources: &[SourceId]) -> Result<()>;

    fn delete_buffers(&mut self, buffers: &[BufferId]) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}
