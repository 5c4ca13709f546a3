//! Session rotation / load-shedding strategies
//!
//! A policy only decides *what* to do after a successful page; the
//! orchestrator carries it out. Rotation never affects which page is
//! fetched next.

use crate::infrastructure::config::{DelayRange, SessionConfig};
use std::time::Duration;

/// What to do after a successful page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Keep,
    /// Start a new session, then pause briefly
    Renew { pause: Duration },
    /// Pause long, then start a new session
    LongPause { pause: Duration },
}

pub trait SessionPolicy: Send {
    /// Called after every page that advanced the cursor within its date.
    /// `successful_pages` counts those pages in the current run, from 1.
    fn after_page(&mut self, successful_pages: u32) -> SessionAction;
}

/// Renew every `renew_every` pages, long pause every `long_pause_every` pages.
/// The long pause wins when both intervals hit.
#[derive(Debug, Clone)]
pub struct IntervalSessionPolicy {
    renew_every: u32,
    renew_pause: DelayRange,
    long_pause_every: u32,
    long_pause: DelayRange,
}

impl IntervalSessionPolicy {
    #[must_use]
    pub const fn new(renew_every: u32, renew_pause: DelayRange, long_pause_every: u32, long_pause: DelayRange) -> Self {
        Self {
            renew_every,
            renew_pause,
            long_pause_every,
            long_pause,
        }
    }

    #[must_use]
    pub const fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.renew_every,
            config.renew_pause,
            config.long_pause_every,
            config.long_pause,
        )
    }
}

impl SessionPolicy for IntervalSessionPolicy {
    fn after_page(&mut self, successful_pages: u32) -> SessionAction {
        if self.long_pause_every > 0 && successful_pages % self.long_pause_every == 0 {
            SessionAction::LongPause {
                pause: self.long_pause.sample(),
            }
        } else if self.renew_every > 0 && successful_pages % self.renew_every == 0 {
            SessionAction::Renew {
                pause: self.renew_pause.sample(),
            }
        } else {
            SessionAction::Keep
        }
    }
}

/// Never rotates; one session for the whole run
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSession;

impl SessionPolicy for FixedSession {
    fn after_page(&mut self, _successful_pages: u32) -> SessionAction {
        SessionAction::Keep
    }
}

/// Policy selected by configuration
#[must_use]
pub fn policy_from_config(config: &SessionConfig) -> Box<dyn SessionPolicy> {
    if config.enabled {
        Box::new(IntervalSessionPolicy::from_config(config))
    } else {
        Box::new(FixedSession)
    }
}

impl<P: SessionPolicy + ?Sized> SessionPolicy for Box<P> {
    fn after_page(&mut self, successful_pages: u32) -> SessionAction {
        (**self).after_page(successful_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> IntervalSessionPolicy {
        IntervalSessionPolicy::new(2, DelayRange::new(5, 5), 10, DelayRange::new(60, 60))
    }

    #[test]
    fn renews_every_n_and_long_pauses_every_m() {
        let mut p = policy();
        let actions: Vec<_> = (1..=10).map(|n| p.after_page(n)).collect();

        assert_eq!(actions[0], SessionAction::Keep);
        assert_eq!(actions[1], SessionAction::Renew { pause: Duration::from_millis(5) });
        assert_eq!(actions[2], SessionAction::Keep);
        assert_eq!(actions[3], SessionAction::Renew { pause: Duration::from_millis(5) });
        // page 10 hits both intervals; the long pause takes precedence
        assert_eq!(actions[9], SessionAction::LongPause { pause: Duration::from_millis(60) });
    }

    #[test]
    fn disabled_config_never_rotates() {
        let config = SessionConfig {
            enabled: false,
            ..SessionConfig::default()
        };
        let mut p = policy_from_config(&config);
        assert!((1..=50).all(|n| p.after_page(n) == SessionAction::Keep));
    }

    #[test]
    fn enabled_config_uses_intervals() {
        let mut p = policy_from_config(&SessionConfig::default());
        assert!(matches!(p.after_page(2), SessionAction::Renew { .. }));
    }
}
