extern crate coreaudio;

use coreaudio::audio_unit::audio_format::LinearPcmFlags;
use coreaudio::audio_unit::macos_helpers;
use coreaudio::audio_unit::render_callback::{self, data};
use coreaudio::audio_unit::{AudioUnit, Element, SampleFormat, Scope, StreamFormat};
use coreaudio::sys::{kAudioUnitProperty_StreamFormat, AudioStreamBasicDescription};
use tracing::debug;

use crate::output::{OutputStream, SharedMixer, DEFAULT_CHANNELS, DEFAULT_RATE};
use crate::{Device, Result, SoundCardError};

impl std::convert::From<coreaudio::Error> for SoundCardError {
    fn from(err: coreaudio::Error) -> SoundCardError {
        SoundCardError::CoreAudioError(err.to_string())
    }
}

pub fn all_speakers() -> Result<Vec<Device>> {
    let ids = macos_helpers::get_audio_device_ids()?;
    let mut devices = Vec::new();
    for id in ids {
        let audio_unit = match macos_helpers::audio_unit_from_device_id(id, false) {
            Ok(audio_unit) => audio_unit,
            Err(_) => continue,
        };
        if let Ok(desc) = audio_unit.get_property::<AudioStreamBasicDescription>(
            kAudioUnitProperty_StreamFormat,
            Scope::Output,
            Element::Output,
        ) {
            if desc.mChannelsPerFrame > 0 {
                let name =
                    macos_helpers::get_device_name(id).unwrap_or_else(|_| "Unknown".to_string());
                devices.push(Device { id, name });
            }
        }
    }
    Ok(devices)
}

/// Render callback on the default output audio unit.
pub struct CoreAudioOutput {
    name: String,
    audio_unit: AudioUnit,
}

impl CoreAudioOutput {
    pub fn start(mixer: SharedMixer) -> Result<Self> {
        let id = macos_helpers::get_default_device_id(false).ok_or_else(|| {
            SoundCardError::DeviceOpen("no default output device".to_string())
        })?;
        let mut audio_unit = macos_helpers::audio_unit_from_device_id(id, false)
            .map_err(|e| SoundCardError::DeviceOpen(e.to_string()))?;
        let name = macos_helpers::get_device_name(id).unwrap_or_else(|_| "Unknown".to_string());

        let format = StreamFormat {
            sample_rate: DEFAULT_RATE as f64,
            sample_format: SampleFormat::I16,
            flags: LinearPcmFlags::IS_SIGNED_INTEGER | LinearPcmFlags::IS_PACKED,
            channels: DEFAULT_CHANNELS as u32,
        };
        let desc = format.to_asbd();
        audio_unit.set_property(
            kAudioUnitProperty_StreamFormat,
            Scope::Input,
            Element::Output,
            Some(&desc),
        )?;

        let channels = DEFAULT_CHANNELS;
        type Args = render_callback::Args<data::Interleaved<i16>>;
        audio_unit.set_render_callback(move |args: Args| {
            let Args { data, .. } = args;
            mixer.lock().render(data.buffer, channels, DEFAULT_RATE);
            Ok(())
        })?;
        audio_unit.start()?;
        debug!("CoreAudio device {} ({}) started", id, name);

        Ok(Self {
            name: format!("coreaudio:{}", name),
            audio_unit,
        })
    }
}

impl OutputStream for CoreAudioOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn close(&mut self) -> Result<()> {
        self.audio_unit.stop()?;
        Ok(())
    }
}
