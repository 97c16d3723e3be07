use super::aggregate::FrameResult;

/// Session-lifetime alert bookkeeping
///
/// Owned by the stream loop and lent to [`CooldownController::should_alert`];
/// the loop is single threaded so no lock is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertState {
    /// Session time of the last scheduled alert, in seconds
    last_alert_time: f64,
}

impl AlertState {
    pub fn new() -> Self {
        Self {
            last_alert_time: f64::NEG_INFINITY,
        }
    }

    pub fn last_alert_time(&self) -> f64 {
        self.last_alert_time
    }
}

impl Default for AlertState {
    fn default() -> Self {
        Self::new()
    }
}

/// Enforces a minimum interval between alert dispatches
#[derive(Debug, Clone)]
pub struct CooldownController {
    cooldown_secs: f64,
}

impl CooldownController {
    pub fn new(cooldown_secs: f64) -> Self {
        Self { cooldown_secs }
    }

    /// Decide whether this frame should raise an alert
    ///
    /// Commits `now` to the state before returning true, so a failed playback
    /// still counts against the cooldown.
    pub fn should_alert(&self, frame: &FrameResult, now: f64, state: &mut AlertState) -> bool {
        if frame.best_confirmed.is_none() {
            return false;
        }
        if now - state.last_alert_time > self.cooldown_secs {
            state.last_alert_time = now;
            true
        } else {
            false
        }
    }
}
