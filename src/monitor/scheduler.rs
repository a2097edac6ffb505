//! Discovers a league's upcoming games and starts a monitor for each.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::api::GameSource;
use crate::error::{FetchError, Result, TrackerError};
use crate::models::{Game, GameStatus, Team, TrackingRequest};
use crate::monitor::registry::{MonitorHandle, MonitorRegistry};

/// What one collection run did
#[derive(Debug, Clone)]
pub struct CollectionReport {
    /// Games matching the request, in discovery order
    pub discovered: Vec<Game>,
    /// Monitors for the games that had not started yet
    pub scheduled: Vec<MonitorHandle>,
}

/// Only games still waiting to start are worth monitoring.
pub fn should_monitor(game: &Game, now: DateTime<Utc>) -> bool {
    game.status == GameStatus::Scheduled && game.start_time > now
}

pub struct CollectionScheduler {
    source: Arc<dyn GameSource>,
    registry: Arc<MonitorRegistry>,
}

impl CollectionScheduler {
    pub fn new(source: Arc<dyn GameSource>, registry: Arc<MonitorRegistry>) -> Self {
        Self { source, registry }
    }

    pub fn registry(&self) -> &Arc<MonitorRegistry> {
        &self.registry
    }

    /// Games for the request: every game of each listed conference, then
    /// every game involving a listed team, deduplicated by id.
    pub async fn discover(&self, request: &TrackingRequest) -> Result<Vec<Game>> {
        request.validate()?;

        let mut seen = HashSet::new();
        let mut games = Vec::new();

        for conference in &request.conferences {
            let found = self
                .scoreboard(&request.sport, &request.league, Some(conference.as_str()))
                .await?;
            debug!(conference = %conference, count = found.len(), "conference games");
            for game in found {
                if seen.insert(game.id.clone()) {
                    games.push(game);
                }
            }
        }

        if !request.teams.is_empty() {
            let found = self.scoreboard(&request.sport, &request.league, None).await?;
            for game in found {
                let involved = request
                    .teams
                    .iter()
                    .any(|team| *team == game.home.id || *team == game.away.id);
                if involved && seen.insert(game.id.clone()) {
                    games.push(game);
                }
            }
        }

        Ok(games)
    }

    /// Every team on the league's current scoreboard, by display name.
    /// Odds flags belong to a game and are cleared.
    pub async fn teams(&self, sport: &str, league: &str) -> Result<Vec<Team>> {
        let games = self.scoreboard(sport, league, None).await?;

        let mut seen = HashSet::new();
        let mut teams: Vec<Team> = games
            .into_iter()
            .flat_map(|game| [game.home, game.away])
            .filter(|team| seen.insert(team.id.clone()))
            .map(|team| {
                Team::new(team.id, team.display_name, team.abbreviation).in_conference(team.conference_id)
            })
            .collect();
        teams.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        Ok(teams)
    }

    async fn scoreboard(&self, sport: &str, league: &str, group: Option<&str>) -> Result<Vec<Game>> {
        let fetch_timeout = self.registry.config().fetch_timeout;
        let fetch = self.source.fetch_scoreboard(sport, league, group);

        match timeout(fetch_timeout, fetch).await {
            Ok(result) => result.map_err(TrackerError::Discovery),
            Err(_) => Err(TrackerError::Discovery(FetchError::Timeout(fetch_timeout))),
        }
    }

    /// Discover games and start a monitor for each one yet to begin.
    pub async fn collect(&self, request: &TrackingRequest) -> Result<CollectionReport> {
        self.collect_at(request, Utc::now()).await
    }

    /// [`collect`](Self::collect) against a fixed "now".
    pub async fn collect_at(&self, request: &TrackingRequest, now: DateTime<Utc>) -> Result<CollectionReport> {
        let discovered = self.discover(request).await?;

        let mut scheduled = Vec::new();
        for game in discovered.iter().filter(|game| should_monitor(game, now)) {
            let handle = self.registry.spawn(game.clone()).await?;
            scheduled.push(handle);
        }

        info!(
            sport = %request.sport,
            league = %request.league,
            discovered = discovered.len(),
            scheduled = scheduled.len(),
            "collection complete"
        );

        Ok(CollectionReport { discovered, scheduled })
    }
}
