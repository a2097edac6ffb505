//! What a monitor remembers between polls.

use std::collections::BTreeSet;

use crate::models::{Game, Notification, NotificationCategory, ScoreSnapshot};
use crate::utils::change_detector::{detect_events, GameEvent};
use crate::utils::notification_builder::build_for_event;

/// State carried from one poll to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTracker {
    /// The previous poll's observation.
    pub last: ScoreSnapshot,
    /// Highest overtime period already notified; starts at regulation.
    pub last_overtime_period: u32,
    /// Whether the underdog was ahead on the previous poll.
    pub underdog_leading: bool,
}

/// Result of comparing one new observation against the tracker.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub events: Vec<GameEvent>,
    pub notifications: Vec<Notification>,
    pub next: PollTracker,
}

impl PollTracker {
    /// Baseline taken when polling begins
    pub fn prime(game: &Game) -> Self {
        Self {
            last: game.snapshot(),
            last_overtime_period: game.regulation_periods,
            underdog_leading: false,
        }
    }

    /// Detect events in `game`, render notifications for the enabled
    /// categories and compute the tracker for the next poll.
    ///
    /// `last` always moves to this observation; its scores differ from the
    /// previous ones exactly when a score change fires. `last_overtime_period`
    /// only advances when an overtime event fired. `underdog_leading` always
    /// follows the current lead, so losing the lead re-arms the underdog alert.
    pub fn evaluate(&self, game: &Game, categories: &BTreeSet<NotificationCategory>) -> PollOutcome {
        let (events, lead) = detect_events(
            &self.last.scores,
            self.last_overtime_period,
            self.underdog_leading,
            game,
        );

        let mut next = self.clone();
        next.last = game.snapshot();
        next.underdog_leading = lead.is_leading;

        let mut notifications = Vec::new();
        for event in &events {
            if let GameEvent::Overtime { period, .. } = event {
                next.last_overtime_period = *period;
            }
            if categories.contains(&event.category()) {
                notifications.push(build_for_event(game, event));
            }
        }

        PollOutcome {
            events,
            notifications,
            next,
        }
    }
}
