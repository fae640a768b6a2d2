use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::probe::Hint;
use tracing::{debug, info};

use crate::decoder::{Decoder, SymphoniaDecoder};
use crate::{noise, Config, Result, SoundCardError};

/// Samples requested from the decoder per read.
pub const READ_CHUNK: usize = 1024 * 64;

/// A fully decoded sound, ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub path: PathBuf,
    pub samples: Vec<i16>,
    /// Seconds, derived from the samples actually decoded.
    pub duration: f64,
    pub config: Config,
}

impl Clip {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.config.num_channels.max(1) as usize
    }

    /// A mono clip of uniform white noise.
    pub fn white_noise(sample_rate: u32, seconds: f64) -> Result<Self> {
        let samples = noise::white_noise(sample_rate, seconds)?;
        let config = Config {
            sample_rate,
            num_channels: 1,
        };
        let duration = refined_duration(samples.len(), config);
        Ok(Self {
            path: PathBuf::from("<white noise>"),
            samples,
            duration,
            config,
        })
    }
}

/// Size-based duration guess, assuming uncompressed PCM16.
///
/// Over- or under-counts for anything with a header or compression.
pub fn estimate_duration(file_bytes: u64, config: Config) -> f64 {
    let byte_rate = config.sample_rate as u64 * config.num_channels as u64 * 2;
    if byte_rate == 0 {
        return 0.0;
    }
    file_bytes as f64 / byte_rate as f64
}

/// Duration of `samples` interleaved samples at `config`.
pub fn refined_duration(samples: usize, config: Config) -> f64 {
    if config.sample_rate == 0 || config.num_channels == 0 {
        return 0.0;
    }
    let frames = samples / config.num_channels as usize;
    frames as f64 / config.sample_rate as f64
}

/// Drains `decoder` until end-of-stream.
pub fn read_all<D: Decoder + ?Sized>(decoder: &mut D, capacity: usize) -> Result<Vec<i16>> {
    let mut samples = Vec::with_capacity(capacity);
    let mut chunk = vec![0i16; READ_CHUNK];
    loop {
        let n = decoder.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        samples.extend_from_slice(&chunk[..n]);
    }
    Ok(samples)
}

pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Clip> {
    let path = path.as_ref();
    let file_open = |e: std::io::Error| SoundCardError::FileOpen {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let file = File::open(path).map_err(file_open)?;
    let file_bytes = file.metadata().map_err(file_open)?.len();

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let (mut decoder, format) = SymphoniaDecoder::new(Box::new(file), &hint)?;
    let config = decoder.config();
    info!("Decoding a {} file: {}", format, path.display());

    let estimate = estimate_duration(file_bytes, config);
    debug!(
        "{}: {:?}, size-based estimate {:.3}s",
        path.display(),
        config,
        estimate
    );

    // Only a sizing hint; undersized for compressed input.
    let capacity = (estimate * (config.sample_rate as f64) * (config.num_channels as f64)) as usize;
    let samples = read_all(&mut decoder, capacity)?;
    let duration = refined_duration(samples.len(), config);
    debug!(
        "{}: {} samples, {:.3}s",
        path.display(),
        samples.len(),
        duration
    );

    Ok(Clip {
        path: path.to_path_buf(),
        samples,
        duration,
        config,
    })
}
