use crate::models::{Game, Notification};
use crate::utils::change_detector::{ordinal, GameEvent};

/// Render the period for a sport: "Inning 7", "2nd Period", "Half 1", "Q3"
pub fn period_label(sport: &str, period: u32) -> String {
    match sport {
        "baseball" => format!("Inning {}", period),
        "hockey" => match period {
            1..=3 => format!("{} Period", ordinal(period)),
            n => format!("Period {}", n),
        },
        "soccer" => format!("Half {}", period),
        _ => format!("Q{}", period),
    }
}

/// Score Update!
/// Michigan Wolverines vs Ohio State Buckeyes
/// Score: MICH 14 - OSU 7
/// Q3, 12:34 left on ABC
pub fn build_score_update(game: &Game) -> Notification {
    Notification {
        title: "Score Update!".to_string(),
        message: format!(
            "{} vs {}\n{}\n{}, {} left{}",
            game.home.display_name,
            game.away.display_name,
            score_line(game),
            period_label(&game.sport, game.current_period),
            game.display_clock,
            on_network(game),
        ),
    }
}

/// Team Chaos!
/// UCF Knights are winning in the UCF Knights vs South Florida Bulls game on ESPN!
pub fn build_underdog_alert(game: &Game, leading_team_name: &str) -> Notification {
    Notification {
        title: "Team Chaos!".to_string(),
        message: format!(
            "{} are winning in the {} vs {} game{}! It's currently {} with {} left.\n{}",
            leading_team_name,
            game.home.display_name,
            game.away.display_name,
            on_network(game),
            period_label(&game.sport, game.current_period),
            game.display_clock,
            score_line(game),
        ),
    }
}

/// Double OT!
/// The game between the Michigan Wolverines and the Ohio State Buckeyes is in Double OT on NBC!
pub fn build_overtime_alert(game: &Game, label: &str) -> Notification {
    Notification {
        title: format!("{}!", label),
        message: format!(
            "The game between the {} and the {} is in {}{}!\n{}",
            game.home.display_name,
            game.away.display_name,
            label,
            on_network(game),
            score_line(game),
        ),
    }
}

/// Render the notification for a detected event
pub fn build_for_event(game: &Game, event: &GameEvent) -> Notification {
    match event {
        GameEvent::ScoreChanged => build_score_update(game),
        GameEvent::UnderdogTookLead { team } => build_underdog_alert(game, &team.display_name),
        GameEvent::Overtime { label, .. } => build_overtime_alert(game, label),
    }
}

fn score_line(game: &Game) -> String {
    format!(
        "Score: {} {} - {} {}",
        game.home.abbreviation,
        game.home_score(),
        game.away.abbreviation,
        game.away_score()
    )
}

fn on_network(game: &Game) -> String {
    if game.network.trim().is_empty() {
        String::new()
    } else {
        format!(" on {}", game.network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameStatus, GameUpdate, Team};
    use chrono::Utc;

    fn game(sport: &str, network: &str) -> Game {
        let mut game = Game::new(
            "401520281",
            sport,
            "league",
            Team::new("130", "Michigan Wolverines", "MICH"),
            Team::new("194", "Ohio State Buckeyes", "OSU"),
            Utc::now(),
        );
        game.network = network.to_string();
        game.observe(GameUpdate {
            status: GameStatus::InProgress,
            scores: [("130", "14"), ("194", "7")]
                .iter()
                .map(|(id, s)| (id.to_string(), s.to_string()))
                .collect(),
            current_period: 3,
            display_clock: "12:34".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_period_labels() {
        assert_eq!(period_label("baseball", 7), "Inning 7");
        assert_eq!(period_label("hockey", 1), "1st Period");
        assert_eq!(period_label("hockey", 2), "2nd Period");
        assert_eq!(period_label("hockey", 3), "3rd Period");
        assert_eq!(period_label("hockey", 4), "Period 4");
        assert_eq!(period_label("soccer", 2), "Half 2");
        assert_eq!(period_label("football", 3), "Q3");
        assert_eq!(period_label("basketball", 4), "Q4");
    }

    #[test]
    fn test_score_update() {
        let notification = build_score_update(&game("football", "ABC"));
        assert_eq!(notification.title, "Score Update!");
        assert_eq!(
            notification.message,
            "Michigan Wolverines vs Ohio State Buckeyes\nScore: MICH 14 - OSU 7\nQ3, 12:34 left on ABC"
        );
    }

    #[test]
    fn test_score_update_without_network() {
        let notification = build_score_update(&game("hockey", ""));
        assert!(notification.message.ends_with("3rd Period, 12:34 left"));
    }

    #[test]
    fn test_underdog_alert() {
        let notification = build_underdog_alert(&game("football", "ESPN"), "Michigan Wolverines");
        assert_eq!(notification.title, "Team Chaos!");
        assert!(notification.message.starts_with(
            "Michigan Wolverines are winning in the Michigan Wolverines vs Ohio State Buckeyes game on ESPN!"
        ));
        assert!(notification.message.contains("It's currently Q3 with 12:34 left."));
        assert!(notification.message.ends_with("Score: MICH 14 - OSU 7"));
    }

    #[test]
    fn test_overtime_alert() {
        let notification = build_overtime_alert(&game("football", "NBC"), "Double OT");
        assert_eq!(notification.title, "Double OT!");
        assert_eq!(
            notification.message,
            "The game between the Michigan Wolverines and the Ohio State Buckeyes is in Double OT on NBC!\nScore: MICH 14 - OSU 7"
        );
    }

    #[test]
    fn test_build_for_event() {
        let game = game("football", "FOX");
        let team = game.away.clone();

        assert_eq!(build_for_event(&game, &GameEvent::ScoreChanged).title, "Score Update!");
        assert_eq!(
            build_for_event(&game, &GameEvent::UnderdogTookLead { team }).title,
            "Team Chaos!"
        );
        assert_eq!(
            build_for_event(
                &game,
                &GameEvent::Overtime {
                    period: 5,
                    label: "OT".to_string()
                }
            )
            .title,
            "OT!"
        );
    }
}
