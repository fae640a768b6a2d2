//! PCM16 decoding on top of symphonia.
//!
//! The loader only needs a pull interface: ask for the stream config once,
//! then read interleaved `i16` samples until `read` returns 0.

use std::io;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder as CodecDecoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::{Config, Result, SoundCardError};

/// A source of interleaved PCM16 samples.
pub trait Decoder {
    fn config(&self) -> Config;

    /// Fills `buf` with up to `buf.len()` samples. Returns 0 at end-of-stream.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize>;
}

pub struct SymphoniaDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn CodecDecoder>,
    track_id: u32,
    config: Config,
    pending: Vec<i16>,
    offset: usize,
    finished: bool,
}

impl SymphoniaDecoder {
    /// Probes `source` and binds a decoder to its first audio track.
    ///
    /// Returns the decoder together with the short name of the detected codec.
    pub fn new(source: Box<dyn MediaSource>, hint: &Hint) -> Result<(Self, String)> {
        let mss = MediaSourceStream::new(source, Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| SoundCardError::UnsupportedFormat(e.to_string()))?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| SoundCardError::UnsupportedFormat("no audio track".to_string()))?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| SoundCardError::UnsupportedFormat("missing sample rate".to_string()))?;
        let num_channels = params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| SoundCardError::UnsupportedFormat("missing channel layout".to_string()))?;

        let codecs = symphonia::default::get_codecs();
        let format = codecs
            .get_codec(params.codec)
            .map(|d| d.short_name.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let decoder = codecs
            .make(&params, &DecoderOptions::default())
            .map_err(|e| SoundCardError::UnsupportedFormat(e.to_string()))?;

        let config = Config {
            sample_rate,
            num_channels,
        };
        debug!("Decoder ready: codec={}, {:?}", format, config);

        Ok((
            Self {
                reader,
                decoder,
                track_id,
                config,
                pending: Vec::new(),
                offset: 0,
                finished: false,
            },
            format,
        ))
    }

    /// Decodes the next packet of our track into `pending`. Returns false at
    /// end-of-stream.
    fn next_block(&mut self) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    self.finished = true;
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.finished = true;
                    return Ok(false);
                }
                Err(e) => return Err(SoundCardError::Decode(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let mut samples =
                        SampleBuffer::<i16>::new(decoded.capacity() as u64, *decoded.spec());
                    samples.copy_interleaved_ref(decoded);
                    self.pending.clear();
                    self.pending.extend_from_slice(samples.samples());
                    self.offset = 0;
                    if !self.pending.is_empty() {
                        return Ok(true);
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping malformed packet: {}", e);
                }
                Err(e) => return Err(SoundCardError::Decode(e.to_string())),
            }
        }
    }
}

impl Decoder for SymphoniaDecoder {
    fn config(&self) -> Config {
        self.config
    }

    fn read(&mut self, buf: &mut [i16]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.offset < self.pending.len() {
                let n = (self.pending.len() - self.offset).min(buf.len());
                buf[..n].copy_from_slice(&self.pending[self.offset..self.offset + n]);
                self.offset += n;
                return Ok(n);
            }
            if !self.next_block()? {
                return Ok(0);
            }
        }
    }
}
