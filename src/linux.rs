extern crate alsa;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use alsa::device_name::HintIter;
use alsa::pcm::{Access, Format, HwParams, IO, PCM};
use alsa::{Direction, ValueOr};
use tracing::{debug, error};

use crate::output::{OutputStream, SharedMixer, BLOCK_FRAMES, DEFAULT_CHANNELS, DEFAULT_RATE};
use crate::{Device, Result, SoundCardError};

const PCM_NAME: &str = "default";

impl std::convert::From<alsa::Error> for SoundCardError {
    fn from(err: alsa::Error) -> SoundCardError {
        SoundCardError::AlsaError(err.to_string())
    }
}

/// Playback-capable PCM hints. `Device::id` is only the position in this
/// listing and changes as devices come and go; the name is the stable handle.
pub fn all_speakers() -> Result<Vec<Device>> {
    let hints = HintIter::new_str(None, "pcm")?;
    let devices = hints
        .filter(|hint| !matches!(hint.direction, Some(Direction::Capture)))
        .filter_map(|hint| hint.name)
        .enumerate()
        .map(|(id, name)| Device {
            id: id as u32,
            name,
        })
        .collect();
    Ok(devices)
}

fn open_pcm() -> Result<(PCM, u32, u16)> {
    let pcm = PCM::new(PCM_NAME, Direction::Playback, false)
        .map_err(|e| SoundCardError::DeviceOpen(e.to_string()))?;
    {
        let hwp = HwParams::any(&pcm)?;
        hwp.set_channels(DEFAULT_CHANNELS as u32)?;
        hwp.set_rate(DEFAULT_RATE, ValueOr::Nearest)?;
        hwp.set_format(Format::s16())?;
        hwp.set_access(Access::RWInterleaved)?;
        pcm.hw_params(&hwp)?;
    }
    let (rate, channels) = {
        let hwp = pcm.hw_params_current()?;
        (hwp.get_rate()?, hwp.get_channels()? as u16)
    };
    Ok((pcm, rate, channels))
}

/// Where the render loop sends mixed blocks.
trait FrameSink {
    fn write(&mut self, block: &[i16]) -> Result<()>;

    /// Blocks until everything written so far has been played.
    fn drain(&mut self) -> Result<()>;
}

struct PcmSink<'a> {
    pcm: &'a PCM,
    io: IO<'a, i16>,
}

impl FrameSink for PcmSink<'_> {
    fn write(&mut self, block: &[i16]) -> Result<()> {
        if let Err(err) = self.io.writei(block) {
            // Underruns land here; anything unrecoverable ends the stream.
            self.pcm.try_recover(err, true)?;
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        self.pcm.drain()?;
        Ok(())
    }
}

fn render_loop<S: FrameSink>(
    sink: &mut S,
    mixer: &SharedMixer,
    running: &AtomicBool,
    rate: u32,
    channels: u16,
) -> Result<()> {
    let mut block = vec![0i16; BLOCK_FRAMES * channels as usize];
    while running.load(Ordering::Acquire) {
        mixer.lock().render(&mut block, channels, rate);
        sink.write(&block)?;
    }
    // Sources report stopped once their last frames are queued, not heard.
    if let Err(err) = sink.drain() {
        debug!("ALSA drain failed: {}", err);
    }
    Ok(())
}

/// Blocking-write render thread on the default ALSA PCM.
pub struct AlsaOutput {
    name: String,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AlsaOutput {
    pub fn start(mixer: SharedMixer) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(u32, u16)>>();

        let thread = thread::Builder::new()
            .name("pcmplay-alsa".to_string())
            .spawn(move || {
                let (pcm, rate, channels) = match open_pcm() {
                    Ok(opened) => opened,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok((rate, channels)));
                let result = pcm.io_i16().map_err(SoundCardError::from).and_then(|io| {
                    let mut sink = PcmSink { pcm: &pcm, io };
                    render_loop(&mut sink, &mixer, &flag, rate, channels)
                });
                if let Err(err) = result {
                    error!("ALSA playback stopped: {}", err);
                }
            })
            .map_err(|e| SoundCardError::DeviceOpen(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok((rate, channels))) => {
                debug!("ALSA PCM `{}`: {} Hz, {} channels", PCM_NAME, rate, channels);
                Ok(Self {
                    name: format!("alsa:{}", PCM_NAME),
                    running,
                    thread: Some(thread),
                })
            }
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            Err(_) => {
                let _ = thread.join();
                Err(SoundCardError::DeviceOpen(
                    "render thread exited during setup".to_string(),
                ))
            }
        }
    }
}

impl OutputStream for AlsaOutput {
    fn name(&self) -> &str {
        &self.name
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

impl Drop for AlsaOutput {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
