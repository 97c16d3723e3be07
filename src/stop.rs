use anyhow::{Context, Result};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Polled stop request shared between the stream loop and its triggers
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stop on Ctrl-C
    pub fn install_ctrlc(&self) -> Result<()> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            tracing::info!("Interrupt received, stopping");
            signal.request_stop();
        })
        .context("Failed to install Ctrl-C handler")
    }

    /// Stop when the operator types `q` on stdin
    pub fn watch_stdin(&self) {
        let signal = self.clone();
        let spawned = std::thread::Builder::new()
            .name("quit-command".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                watch_commands(stdin.lock(), &signal);
            });

        if let Err(e) = spawned {
            tracing::warn!("Quit command unavailable: {}", e);
        }
    }
}

fn watch_commands<R: BufRead>(reader: R, signal: &StopSignal) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if is_quit_command(&line) {
            tracing::info!("Quit command received, stopping");
            signal.request_stop();
            break;
        }
    }
}

fn is_quit_command(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "q" | "quit")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn clones_share_the_flag() {
        let signal = StopSignal::new();
        let other = signal.clone();
        assert!(!signal.is_stopped());
        other.request_stop();
        assert!(signal.is_stopped());
    }

    #[test]
    fn quit_command_stops() {
        let signal = StopSignal::new();
        watch_commands(Cursor::new("hello\n  Q \nignored\n"), &signal);
        assert!(signal.is_stopped());
    }

    #[test]
    fn end_of_input_does_not_stop() {
        let signal = StopSignal::new();
        watch_commands(Cursor::new("status\n"), &signal);
        assert!(!signal.is_stopped());
    }
}
