use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which ad format a modal shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdKind {
    /// Skippable; the result is revealed however the modal closes.
    Interstitial,
    /// Pays out only if watched to the end.
    Rewarded,
}

/// How an ad modal ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdCompletion {
    /// Timer ran out.
    Watched,
    /// Interstitial closed early after the confirming tap.
    Skipped,
    /// Rewarded ad closed early; the pending result is lost.
    Forfeited,
}

impl AdCompletion {
    /// Whether the held-back result should be committed.
    pub fn commits(self) -> bool {
        !matches!(self, AdCompletion::Forfeited)
    }
}

/// Result of pressing the modal's close button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseAttempt {
    /// Interstitial wants a second tap before closing.
    ConfirmRequired,
    Closed(AdCompletion),
}

/// Playback state of one ad modal. Time only moves through [`AdModal::advance`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdModal {
    kind: AdKind,
    duration: Duration,
    elapsed: Duration,
    close_armed: bool,
}

impl AdModal {
    pub fn new(kind: AdKind, duration: Duration) -> Self {
        Self {
            kind,
            duration,
            elapsed: Duration::ZERO,
            close_armed: false,
        }
    }

    pub fn kind(&self) -> AdKind {
        self.kind
    }

    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.elapsed)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Let `dt` of playback pass. Returns the completion once the timer ends.
    pub fn advance(&mut self, dt: Duration) -> Option<AdCompletion> {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
        self.is_finished().then_some(AdCompletion::Watched)
    }

    pub fn press_close(&mut self) -> CloseAttempt {
        if self.is_finished() {
            return CloseAttempt::Closed(AdCompletion::Watched);
        }
        match self.kind {
            AdKind::Interstitial if !self.close_armed => {
                self.close_armed = true;
                CloseAttempt::ConfirmRequired
            }
            AdKind::Interstitial => CloseAttempt::Closed(AdCompletion::Skipped),
            AdKind::Rewarded => CloseAttempt::Closed(AdCompletion::Forfeited),
        }
    }
}
