use super::{AudioBackend, SoundHandle};
use crate::error::PlaybackError;
use std::io::Write;
use std::process::{Command, Stdio};

/// Plays WAV data through ALSA's `aplay`, fed on stdin
pub struct AplayBackend {
    program: String,
}

impl AplayBackend {
    pub fn new() -> Self {
        Self::with_program("aplay")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Check that the player can be started at all
    pub fn probe(&self) -> Result<(), PlaybackError> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(PlaybackError::Spawn)?;
        if status.success() {
            Ok(())
        } else {
            Err(PlaybackError::Player(status))
        }
    }
}

impl Default for AplayBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for AplayBackend {
    fn play(&self, sound: &SoundHandle) -> Result<(), PlaybackError> {
        let mut child = Command::new(&self.program)
            .args(["-q", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(PlaybackError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            // A player that exits early closes the pipe; its status says why
            let _ = stdin.write_all(sound.bytes());
        }

        let status = child.wait().map_err(PlaybackError::Spawn)?;
        if status.success() {
            Ok(())
        } else {
            Err(PlaybackError::Player(status))
        }
    }
}
