use crate::{Config, Result, SoundCardError};

/// Layout of the samples uploaded into a device buffer. Always 16-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferFormat {
    Mono16,
    Stereo16,
}

impl BufferFormat {
    pub fn from_channels(num_channels: u16) -> Result<Self> {
        match num_channels {
            1 => Ok(BufferFormat::Mono16),
            2 => Ok(BufferFormat::Stereo16),
            n => Err(SoundCardError::UnsupportedChannels(n)),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::from_channels(config.num_channels)
    }

    pub fn channels(self) -> u16 {
        match self {
            BufferFormat::Mono16 => 1,
            BufferFormat::Stereo16 => 2,
        }
    }
}

/// Playback state of a device source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Playing,
    Stopped,
    Paused,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_channels() {
        assert_eq!(BufferFormat::from_channels(1), Ok(BufferFormat::Mono16));
        assert_eq!(BufferFormat::from_channels(2), Ok(BufferFormat::Stereo16));
        assert_eq!(
            BufferFormat::from_channels(6),
            Err(SoundCardError::UnsupportedChannels(6))
        );
        assert_eq!(
            BufferFormat::from_channels(0),
            Err(SoundCardError::UnsupportedChannels(0))
        );
    }

    #[test]
    fn test_format_channels_round_trip() {
        for format in [BufferFormat::Mono16, BufferFormat::Stereo16] {
            assert_eq!(BufferFormat::from_channels(format.channels()), Ok(format));
        }
    }
}
