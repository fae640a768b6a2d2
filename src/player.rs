//! The load → upload → play → wait → release pipeline.

use std::path::PathBuf;

use tracing::info;

use crate::{load_file, AudioDevice, Backend, Clip, Result, Session, SoundCard, WaitPolicy};

/// What to play.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Files(Vec<PathBuf>),
    /// White noise of the given length in seconds at the given rate.
    Noise { seconds: f64, sample_rate: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub input: Input,
    pub backend: Backend,
    pub wait: WaitPolicy,
}

/// Decodes every input up front. The first failure aborts the whole run.
pub fn load_clips(input: &Input) -> Result<Vec<Clip>> {
    match input {
        Input::Files(paths) => paths.iter().map(load_file).collect(),
        Input::Noise {
            seconds,
            sample_rate,
        } => Ok(vec![Clip::white_noise(*sample_rate, *seconds)?]),
    }
}

/// Plays `clips` on `device` and releases everything afterwards.
///
/// Returns the longest clip duration in seconds.
pub fn play_clips<D: AudioDevice>(device: D, clips: &[Clip], wait: WaitPolicy) -> Result<f64> {
    let mut session = Session::new(device, clips)?;
    let duration = session.longest_duration();
    info!("Duration: {:.3} seconds", duration);

    session.play()?;
    session.wait(wait)?;
    session.close()?;
    Ok(duration)
}

pub fn run(config: &PlayerConfig) -> Result<f64> {
    let clips = load_clips(&config.input)?;
    let device = SoundCard::open(config.backend)?;
    let duration = play_clips(device, &clips, config.wait)?;
    info!("Done.");
    Ok(duration)
}
