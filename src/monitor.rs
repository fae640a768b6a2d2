use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::{AudioDevice, Result, SourceId, SourceState};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How to decide that playback is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Query every source each interval until none is playing.
    Poll(Duration),
    /// Sleep for the longest clip duration without asking the device.
    Sleep,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        WaitPolicy::Poll(DEFAULT_POLL_INTERVAL)
    }
}

/// Number of `sources` no longer in the playing state.
pub fn stopped_count<D: AudioDevice + ?Sized>(device: &D, sources: &[SourceId]) -> Result<usize> {
    let mut stopped = 0;
    for &source in sources {
        if device.source_state(source)? != SourceState::Playing {
            stopped += 1;
        }
    }
    Ok(stopped)
}

pub fn wait_for_completion<D: AudioDevice + ?Sized>(
    device: &D,
    sources: &[SourceId],
    policy: WaitPolicy,
    longest: f64,
) -> Result<()> {
    match policy {
        WaitPolicy::Poll(interval) => loop {
            let stopped = stopped_count(device, sources)?;
            if stopped == sources.len() {
                debug!("All {} sources stopped", stopped);
                return Ok(());
            }
            thread::sleep(interval);
        },
        WaitPolicy::Sleep => {
            let secs = if longest.is_finite() { longest.max(0.0) } else { 0.0 };
            debug!("Sleeping {:.3}s for playback", secs);
            thread::sleep(Duration::from_secs_f64(secs));
            Ok(())
        }
    }
}
