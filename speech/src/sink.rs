//! Audio playback sinks.
//!
//! The default [`PlayerSink`] pipes synthesized audio into an external player
//! process found on PATH. Env override: `TTS_PLAYER` (path to a player binary).
//! Without a player the audio is dropped and a line is logged.

use om1_core::{Om1Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Encoding named by an ElevenLabs `output_format` such as `mp3_44100_128`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioEncoding {
    Mp3 { sample_rate: u32 },
    /// Signed 16-bit little-endian mono
    Pcm { sample_rate: u32 },
    Ulaw { sample_rate: u32 },
    Opus { sample_rate: u32 },
    Unknown,
}

impl AudioEncoding {
    pub fn parse(output_format: &str) -> Self {
        let mut parts = output_format.split('_');
        let codec = parts.next().unwrap_or("");
        let sample_rate = parts.next().and_then(|s| s.parse::<u32>().ok());
        match (codec, sample_rate) {
            ("mp3", Some(sample_rate)) => AudioEncoding::Mp3 { sample_rate },
            ("pcm", Some(sample_rate)) => AudioEncoding::Pcm { sample_rate },
            ("ulaw", Some(sample_rate)) => AudioEncoding::Ulaw { sample_rate },
            ("opus", Some(sample_rate)) => AudioEncoding::Opus { sample_rate },
            _ => AudioEncoding::Unknown,
        }
    }
}

/// Destination for synthesized audio bytes.
#[cfg_attr(test, mockall::automock)]
pub trait AudioSink: Send + Sync {
    /// Play `audio` to completion.
    fn play(&self, audio: &[u8], output_format: &str) -> Result<()>;
}

pub struct PlayerSink {
    player: Option<PathBuf>,
}

impl Default for PlayerSink {
    fn default() -> Self {
        Self::detect()
    }
}

impl PlayerSink {
    /// Find a player: `TTS_PLAYER`, then `ffplay`, then `mpv`.
    pub fn detect() -> Self {
        let player = get_from_env_or_path("TTS_PLAYER", "ffplay").or_else(|| get_from_path("mpv"));
        if let Some(ref p) = player {
            info!(target = "tts", bin = ?p, "Detected audio player");
        }
        Self { player }
    }

    pub fn with_player(player: Option<PathBuf>) -> Self {
        Self { player }
    }

    pub fn player(&self) -> Option<&Path> {
        self.player.as_deref()
    }
}

impl AudioSink for PlayerSink {
    fn play(&self, audio: &[u8], output_format: &str) -> Result<()> {
        let Some(bin) = self.player.as_ref() else {
            info!(target = "tts", bytes = audio.len(), "No audio player found; dropping audio");
            return Ok(());
        };
        if audio.is_empty() {
            return Ok(());
        }

        let mut cmd = Command::new(bin);
        cmd.args(player_args(bin, AudioEncoding::parse(output_format)));
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        debug!(target = "tts", command = ?cmd, "Running player");
        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(audio)?;
            // stdin dropped here so the player sees EOF
        }
        let status = child.wait()?;
        if !status.success() {
            return Err(Om1Error::StreamError(format!(
                "Audio player exited with {}",
                status
            )));
        }
        Ok(())
    }
}

/// Command-line arguments for reading `encoding` audio from stdin.
pub(crate) fn player_args(player_bin: &Path, encoding: AudioEncoding) -> Vec<String> {
    let name = player_bin
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let mut args: Vec<String> = Vec::new();
    if name.starts_with("mpv") {
        args.extend(["--no-video", "--really-quiet"].map(String::from));
        match encoding {
            AudioEncoding::Pcm { sample_rate } => {
                args.push("--demuxer=rawaudio".into());
                args.push("--demuxer-rawaudio-format=s16le".into());
                args.push("--demuxer-rawaudio-channels=1".into());
                args.push(format!("--demuxer-rawaudio-rate={}", sample_rate));
            }
            AudioEncoding::Ulaw { sample_rate } => {
                args.push("--demuxer=rawaudio".into());
                args.push("--demuxer-rawaudio-format=mulaw".into());
                args.push("--demuxer-rawaudio-channels=1".into());
                args.push(format!("--demuxer-rawaudio-rate={}", sample_rate));
            }
            _ => {}
        }
        args.push("-".into());
    } else {
        // ffplay and anything ffplay-compatible
        args.extend(["-nodisp", "-autoexit", "-loglevel", "quiet"].map(String::from));
        match encoding {
            AudioEncoding::Pcm { sample_rate } => {
                args.extend(["-f".to_string(), "s16le".to_string()]);
                args.extend(["-ar".to_string(), sample_rate.to_string()]);
            }
            AudioEncoding::Ulaw { sample_rate } => {
                args.extend(["-f".to_string(), "mulaw".to_string()]);
                args.extend(["-ar".to_string(), sample_rate.to_string()]);
            }
            _ => {}
        }
        args.extend(["-i".to_string(), "-".to_string()]);
    }
    args
}

fn get_from_env_or_path(env_key: &str, default_bin: &str) -> Option<PathBuf> {
    if let Ok(p) = std::env::var(env_key) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Some(pb);
        }
    }
    get_from_path(default_bin)
}

fn get_from_path(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return if p.exists() { Some(p) } else { None };
    }

    if let Some(paths_os) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths_os) {
            let candidate = dir.join(bin);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}
