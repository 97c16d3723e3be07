mod aplay;

pub use aplay::AplayBackend;

use crate::error::PlaybackError;
use std::path::Path;
use std::sync::Arc;

/// Preloaded alert sound, shared read-only with playback threads
#[derive(Debug, Clone)]
pub struct SoundHandle {
    bytes: Arc<[u8]>,
}

impl SoundHandle {
    /// Read the whole asset into memory once at startup
    pub fn preload<P: AsRef<Path>>(path: P) -> Result<Self, PlaybackError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| PlaybackError::Load {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Trait for audio playback backends
pub trait AudioBackend: Send + Sync {
    /// Play a sound to completion
    ///
    /// Runs on a detached worker thread, so blocking here is fine.
    fn play(&self, sound: &SoundHandle) -> Result<(), PlaybackError>;
}

enum Mode {
    Audible {
        backend: Arc<dyn AudioBackend>,
        sound: SoundHandle,
    },
    VisualOnly,
}

/// Fire-and-forget alert notification
///
/// Each alert is played on its own detached thread; the caller never waits
/// and never sees a playback error.
pub struct AlertDispatcher {
    mode: Mode,
}

impl AlertDispatcher {
    pub fn new(backend: Arc<dyn AudioBackend>, sound: SoundHandle) -> Self {
        Self {
            mode: Mode::Audible { backend, sound },
        }
    }

    /// Dispatcher that only logs alerts, for sessions without audio
    pub fn visual_only() -> Self {
        Self {
            mode: Mode::VisualOnly,
        }
    }

    pub fn is_audible(&self) -> bool {
        matches!(self.mode, Mode::Audible { .. })
    }

    /// Schedule one alert and return immediately
    pub fn fire_alert(&self) {
        let (backend, sound) = match &self.mode {
            Mode::Audible { backend, sound } => (Arc::clone(backend), sound.clone()),
            Mode::VisualOnly => {
                tracing::debug!("Alert raised (visual only)");
                return;
            }
        };

        let spawned = std::thread::Builder::new()
            .name("alert-playback".into())
            .spawn(move || {
                if let Err(e) = backend.play(&sound) {
                    tracing::warn!("Alert playback failed: {}", e);
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Failed to start alert playback thread: {}", e);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::sync::Mutex;

    /// Backend that reports each playback on a channel instead of making noise
    pub struct RecordingBackend {
        played: Mutex<Sender<usize>>,
        fail: bool,
    }

    impl RecordingBackend {
        pub fn new(fail: bool) -> (Arc<Self>, Receiver<usize>) {
            let (tx, rx) = channel();
            let backend = Arc::new(Self {
                played: Mutex::new(tx),
                fail,
            });
            (backend, rx)
        }
    }

    impl AudioBackend for RecordingBackend {
        fn play(&self, sound: &SoundHandle) -> Result<(), PlaybackError> {
            if let Ok(tx) = self.played.lock() {
                let _ = tx.send(sound.bytes().len());
            }
            if self.fail {
                Err(PlaybackError::Spawn(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no audio device",
                )))
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingBackend;
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn plays_preloaded_sound_off_thread() {
        let (backend, played) = RecordingBackend::new(false);
        let dispatcher = AlertDispatcher::new(backend, SoundHandle::from_bytes(vec![0u8; 16]));

        dispatcher.fire_alert();

        assert_eq!(played.recv_timeout(Duration::from_secs(5)).unwrap(), 16);
    }

    #[test]
    fn playback_failure_does_not_reach_caller() {
        let (backend, played) = RecordingBackend::new(true);
        let dispatcher = AlertDispatcher::new(backend, SoundHandle::from_bytes(vec![1u8; 4]));

        dispatcher.fire_alert();
        dispatcher.fire_alert();

        assert!(played.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(played.recv_timeout(Duration::from_secs(5)).is_ok());
        assert!(dispatcher.is_audible());
    }

    #[test]
    fn visual_only_dispatch_is_a_no_op() {
        let dispatcher = AlertDispatcher::visual_only();
        dispatcher.fire_alert();
        assert!(!dispatcher.is_audible());
    }

    #[test]
    fn preload_reads_asset_and_reports_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"RIFF....WAVE").unwrap();

        let sound = SoundHandle::preload(file.path()).unwrap();
        assert_eq!(sound.bytes(), b"RIFF....WAVE");

        let missing = SoundHandle::preload("/nonexistent/alert.wav");
        assert!(matches!(missing, Err(PlaybackError::Load { .. })));
    }
}
