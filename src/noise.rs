use rand::Rng;

use crate::{Result, SoundCardError};

/// Largest magnitude produced; keeps the range symmetric.
pub const NOISE_PEAK: i16 = 32767;

/// Longest noise clip accepted, in seconds.
pub const MAX_NOISE_SECONDS: f64 = 3600.0;

/// Accepts finite durations in `0.0..=MAX_NOISE_SECONDS`.
pub fn check_duration(seconds: f64) -> Result<f64> {
    if seconds.is_finite() && (0.0..=MAX_NOISE_SECONDS).contains(&seconds) {
        Ok(seconds)
    } else {
        Err(SoundCardError::InvalidDuration(seconds.to_string()))
    }
}

/// Mono white noise, `round(sample_rate * seconds)` samples long.
pub fn white_noise(sample_rate: u32, seconds: f64) -> Result<Vec<i16>> {
    white_noise_with(&mut rand::thread_rng(), sample_rate, seconds)
}

pub fn white_noise_with<R: Rng + ?Sized>(
    rng: &mut R,
    sample_rate: u32,
    seconds: f64,
) -> Result<Vec<i16>> {
    let seconds = check_duration(seconds)?;
    let len = (sample_rate as f64 * seconds).round() as usize;
    Ok((0..len)
        .map(|_| rng.gen_range(-NOISE_PEAK..=NOISE_PEAK))
        .collect())
}
