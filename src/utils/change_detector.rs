use crate::models::{Game, NotificationCategory, Team};
use std::collections::BTreeMap;

/// A meaningful change between two observations of a game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    ScoreChanged,
    UnderdogTookLead { team: Team },
    Overtime { period: u32, label: String },
}

impl GameEvent {
    /// The notification category that controls whether this event is sent
    pub fn category(&self) -> NotificationCategory {
        match self {
            GameEvent::ScoreChanged => NotificationCategory::ScoreChange,
            GameEvent::UnderdogTookLead { .. } => NotificationCategory::Underdog,
            GameEvent::Overtime { .. } => NotificationCategory::Overtime,
        }
    }
}

/// Whether the underdog is ahead right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnderdogLead {
    pub is_leading: bool,
    pub team: Option<Team>,
}

impl UnderdogLead {
    /// True only on the transition from trailing/tied to leading
    pub fn took_lead(&self, prev_was_leading: bool) -> bool {
        self.is_leading && !prev_was_leading
    }
}

/// True if any team's score differs from the previous observation, or a team
/// wasn't present in it
pub fn score_changed(prev: &BTreeMap<String, String>, curr: &BTreeMap<String, String>) -> bool {
    curr.iter()
        .any(|(team_id, score)| prev.get(team_id) != Some(score))
}

/// Compute whether the designated underdog is strictly ahead. A game without
/// an underdog never reports a lead.
pub fn underdog_took_lead(game: &Game) -> UnderdogLead {
    let Some(underdog) = game.underdog() else {
        return UnderdogLead {
            is_leading: false,
            team: None,
        };
    };
    let opponent = game.opponent_of(&underdog.id);

    let is_leading = match (points(game, &underdog.id), points(game, &opponent.id)) {
        (Some(dog), Some(fav)) => dog > fav,
        _ => false,
    };

    UnderdogLead {
        is_leading,
        team: Some(underdog.clone()),
    }
}

/// Fires when the game is past regulation and in a later period than the one
/// last notified. Returns the overtime label on fire.
pub fn new_overtime_period(
    current_period: u32,
    regulation_periods: u32,
    last_notified_period: u32,
) -> Option<String> {
    if current_period > regulation_periods && current_period > last_notified_period {
        Some(overtime_label(current_period - regulation_periods))
    } else {
        None
    }
}

/// "OT", "Double OT", "Triple OT", then "4th OT" and so on
pub fn overtime_label(overtime_number: u32) -> String {
    match overtime_number {
        0 | 1 => "OT".to_string(),
        2 => "Double OT".to_string(),
        3 => "Triple OT".to_string(),
        n => format!("{} OT", ordinal(n)),
    }
}

/// 1st, 2nd, 3rd, 4th, ..., 11th, 12th, 13th, ..., 21st
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// Compare the previous observation to the current one.
///
/// `prev_scores` and `last_overtime_period` are the tracked values from the
/// last time those events fired; `underdog_was_leading` is the lead state
/// seen on the previous poll.
pub fn detect_events(
    prev_scores: &BTreeMap<String, String>,
    last_overtime_period: u32,
    underdog_was_leading: bool,
    game: &Game,
) -> (Vec<GameEvent>, UnderdogLead) {
    let mut events = Vec::new();

    if score_changed(prev_scores, &game.scores) {
        events.push(GameEvent::ScoreChanged);
    }

    let lead = underdog_took_lead(game);
    if lead.took_lead(underdog_was_leading) {
        if let Some(team) = &lead.team {
            events.push(GameEvent::UnderdogTookLead { team: team.clone() });
        }
    }

    if let Some(label) =
        new_overtime_period(game.current_period, game.regulation_periods, last_overtime_period)
    {
        events.push(GameEvent::Overtime {
            period: game.current_period,
            label,
        });
    }

    (events, lead)
}

fn points(game: &Game, team_id: &str) -> Option<u32> {
    game.scores.get(team_id)?.trim().parse().ok()
}
