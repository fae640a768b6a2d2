//! pcmplay - decode sound files and play them on the default output device.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pcmplay::player::{self, Input, PlayerConfig};
use pcmplay::{noise, Backend, Device, SoundCard, WaitPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Wait {
    /// Poll source state until every source has stopped
    Poll,
    /// Sleep for the longest estimated duration
    Sleep,
}

#[derive(Parser, Debug)]
#[command(name = "pcmplay")]
#[command(about = "Play WAV and FLAC files through the default output device")]
#[command(version)]
struct Args {
    /// Sound files to play together
    #[arg(required_unless_present_any = ["noise", "list_devices"])]
    files: Vec<PathBuf>,

    /// How to wait for playback to finish
    #[arg(long, value_enum, default_value = "poll", env = "PCMPLAY_WAIT")]
    wait: Wait,

    /// Poll interval in milliseconds
    #[arg(
        long,
        default_value = "500",
        env = "PCMPLAY_POLL_MS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval: u64,

    /// Output backend
    #[arg(long, value_enum, default_value = "native", env = "PCMPLAY_OUTPUT")]
    output: Backend,

    /// Play this many seconds of white noise instead of files
    #[arg(long, conflicts_with = "files", value_parser = parse_seconds)]
    noise: Option<f64>,

    /// Sample rate used for --noise
    #[arg(long, default_value = "44100")]
    noise_rate: u32,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn parse_seconds(value: &str) -> std::result::Result<f64, String> {
    let seconds: f64 = value.parse().map_err(|e| format!("{}", e))?;
    noise::check_duration(seconds).map_err(|e| e.to_string())
}

/// Hint names are the only stable handle; list positions shift as devices come and go.
fn device_line(device: &Device) -> String {
    device.name.clone()
}

impl Args {
    fn into_config(self) -> PlayerConfig {
        let input = match self.noise {
            Some(seconds) => Input::Noise {
                seconds,
                sample_rate: self.noise_rate,
            },
            None => Input::Files(self.files),
        };
        let wait = match self.wait {
            Wait::Poll => WaitPolicy::Poll(Duration::from_millis(self.poll_interval)),
            Wait::Sleep => WaitPolicy::Sleep,
        };
        PlayerConfig {
            input,
            backend: self.output,
            wait,
        }
    }
}

fn list_devices() -> Result<()> {
    let speakers = SoundCard::all_speakers().context("Failed to enumerate output devices")?;
    if speakers.is_empty() {
        info!("No output devices found");
    }
    for speaker in &speakers {
        println!("{}", device_line(speaker));
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    if args.list_devices {
        return list_devices();
    }
    let config = args.into_config();
    player::run(&config).context("Playback failed")?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pcmplay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_is_usage_error() {
        let err = Args::try_parse_from(["pcmplay"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_files_and_defaults() {
        let args = Args::try_parse_from(["pcmplay", "a.wav", "b.flac"]).unwrap();
        let config = args.into_config();
        assert_eq!(
            config.input,
            Input::Files(vec![PathBuf::from("a.wav"), PathBuf::from("b.flac")])
        );
        assert_eq!(config.wait, WaitPolicy::Poll(Duration::from_millis(500)));
        assert_eq!(config.backend, Backend::Native);
    }

    #[test]
    fn test_noise_without_files() {
        let args =
            Args::try_parse_from(["pcmplay", "--noise", "1.5", "--wait", "sleep", "--output", "null"])
                .unwrap();
        let config = args.into_config();
        assert_eq!(
            config.input,
            Input::Noise {
                seconds: 1.5,
                sample_rate: 44100
            }
        );
        assert_eq!(config.wait, WaitPolicy::Sleep);
        assert_eq!(config.backend, Backend::Null);
    }

    #[test]
    fn test_noise_rejects_infinite_duration() {
        for value in ["inf", "NaN", "-2", "1e9"] {
            let arg = format!("--noise={}", value);
            let err = Args::try_parse_from(["pcmplay", arg.as_str()]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation, "{}", value);
        }
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let err = Args::try_parse_from(["pcmplay", "--poll-interval", "0", "a.wav"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        let args = Args::try_parse_from(["pcmplay", "--poll-interval", "1", "a.wav"]).unwrap();
        assert_eq!(args.poll_interval, 1);
    }

    #[test]
    fn test_device_line_prints_name_only() {
        let device = Device {
            id: 3,
            name: "hw:CARD=PCH,DEV=0".to_string(),
        };
        assert_eq!(device_line(&device), "hw:CARD=PCH,DEV=0");
    }

    #[test]
    fn test_noise_conflicts_with_files() {
        let err = Args::try_parse_from(["pcmplay", "--noise", "1", "a.wav"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
