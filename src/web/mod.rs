//! HTTP surface over the scheduler and the monitor registry.

mod error;

pub use error::ApiError;

use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::models::{
    conferences_for, leagues_for, supported_sports, ConferenceInfo, Game, LeagueInfo, SportInfo, Team,
    TrackingRequest,
};
use crate::monitor::{CollectionScheduler, MonitorHandle, MonitorRegistry};

mod filters {
    use chrono::{DateTime, Utc};

    pub fn kickoff(start: &DateTime<Utc>) -> ::askama::Result<String> {
        Ok(start.format("%a %b %-d, %H:%M UTC").to_string())
    }
}

#[derive(Clone)]
pub struct AppState {
    scheduler: Arc<CollectionScheduler>,
}

impl AppState {
    pub fn new(scheduler: Arc<CollectionScheduler>) -> Self {
        Self { scheduler }
    }

    fn registry(&self) -> &Arc<MonitorRegistry> {
        self.scheduler.registry()
    }
}

/// A monitor and the game it is watching, as served to clients
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSummary {
    pub identity: String,
    pub state: String,
    pub outcome: Option<String>,
    pub started_at: DateTime<Utc>,
    pub game: Game,
}

impl From<&MonitorHandle> for MonitorSummary {
    fn from(handle: &MonitorHandle) -> Self {
        let state = handle.state();
        Self {
            identity: handle.identity().to_string(),
            state: state.label().to_string(),
            outcome: state.outcome().map(ToString::to_string),
            started_at: handle.started_at(),
            game: handle.game(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub discovered: Vec<Game>,
    pub scheduled: Vec<MonitorSummary>,
}

#[derive(Template)]
#[template(path = "monitors.html")]
struct MonitorsTemplate {
    monitors: Vec<MonitorSummary>,
}

struct HtmlTemplate<T>(T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/sports", get(list_sports))
        .route("/api/leagues/:sport", get(list_leagues))
        .route("/api/teams/:sport/:league", get(list_teams))
        .route("/api/conferences/:sport/:league", get(list_conferences))
        .route("/api/track", post(track))
        .route("/api/monitors", get(list_monitors))
        .route("/api/monitors/:identity", get(get_monitor))
        .route("/api/monitors/:identity/cancel", post(cancel_monitor))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let monitors = state
        .registry()
        .active()
        .await
        .iter()
        .map(MonitorSummary::from)
        .collect();

    HtmlTemplate(MonitorsTemplate { monitors })
}

async fn list_sports() -> Json<Vec<SportInfo>> {
    Json(supported_sports())
}

async fn list_leagues(Path(sport): Path<String>) -> Result<Json<Vec<LeagueInfo>>, ApiError> {
    leagues_for(&sport)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("sport {}", sport)))
}

async fn list_teams(
    State(state): State<AppState>,
    Path((sport, league)): Path<(String, String)>,
) -> Result<Json<Vec<Team>>, ApiError> {
    let teams = state.scheduler.teams(&sport, &league).await?;
    Ok(Json(teams))
}

async fn list_conferences(Path((_sport, league)): Path<(String, String)>) -> Json<Vec<ConferenceInfo>> {
    Json(conferences_for(&league))
}

async fn track(
    State(state): State<AppState>,
    Json(request): Json<TrackingRequest>,
) -> Result<Json<TrackResponse>, ApiError> {
    let report = state.scheduler.collect(&request).await?;
    info!(
        sport = %request.sport,
        league = %request.league,
        scheduled = report.scheduled.len(),
        "tracking request handled"
    );

    Ok(Json(TrackResponse {
        discovered: report.discovered,
        scheduled: report.scheduled.iter().map(MonitorSummary::from).collect(),
    }))
}

async fn list_monitors(State(state): State<AppState>) -> Json<Vec<MonitorSummary>> {
    let active = state.registry().active().await;
    Json(active.iter().map(MonitorSummary::from).collect())
}

async fn find(state: &AppState, identity: &str) -> Result<MonitorHandle, ApiError> {
    state
        .registry()
        .get(identity)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("monitor {}", identity)))
}

async fn get_monitor(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<MonitorSummary>, ApiError> {
    let handle = find(&state, &identity).await?;
    Ok(Json(MonitorSummary::from(&handle)))
}

async fn cancel_monitor(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<MonitorSummary>, ApiError> {
    let handle = find(&state, &identity).await?;
    handle.cancel();
    let outcome = handle.wait().await;
    info!(identity = %identity, outcome = %outcome, "monitor cancelled over http");

    Ok(Json(MonitorSummary::from(&handle)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use crate::monitor::Dispatcher;
    use crate::test_support::{sample_game, FakeSource, RecordingSink};
    use axum_test::TestServer;
    use chrono::Duration as ChronoDuration;
    use serde_json::{json, Value};

    fn server(source: FakeSource) -> TestServer {
        let source = Arc::new(source);
        let config = Arc::new(TrackerConfig::new());
        let dispatcher = Dispatcher::new(config.channels.clone(), config.dispatch_timeout)
            .with_sink("logger", Arc::new(RecordingSink::default()));
        let registry = Arc::new(MonitorRegistry::new(config, source.clone(), Arc::new(dispatcher)));
        let scheduler = Arc::new(CollectionScheduler::new(source, registry));

        TestServer::new(create_router(AppState::new(scheduler))).unwrap()
    }

    fn conference_five() -> FakeSource {
        let now = Utc::now();
        FakeSource::default().with_scoreboard(
            Some("5"),
            vec![
                sample_game("401520281", now + ChronoDuration::hours(2)),
                sample_game("401520282", now + ChronoDuration::hours(3)),
                sample_game("401520280", now - ChronoDuration::hours(20)),
            ],
        )
    }

    fn track_body() -> Value {
        json!({
            "sport": "football",
            "league": "college-football",
            "conferences": ["5"]
        })
    }

    #[tokio::test]
    async fn test_catalog_endpoints() {
        let server = server(FakeSource::default());

        let response = server.get("/api/sports").await;
        response.assert_status_ok();
        let sports: Value = response.json();
        assert_eq!(sports.as_array().unwrap().len(), 5);

        let response = server.get("/api/leagues/hockey").await;
        response.assert_status_ok();
        let leagues: Value = response.json();
        assert_eq!(leagues[0]["id"], "nhl");
        assert_eq!(leagues[0]["regulation_periods"], 3);

        let response = server.get("/api/leagues/curling").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_teams_endpoint() {
        let server = server(FakeSource::default().with_scoreboard(
            None,
            vec![sample_game("401520281", Utc::now() + ChronoDuration::hours(2))],
        ));

        let response = server.get("/api/teams/football/college-football").await;
        response.assert_status_ok();
        let teams: Value = response.json();
        assert_eq!(teams.as_array().unwrap().len(), 2);
        assert_eq!(teams[0]["display_name"], "Michigan Wolverines");
        assert_eq!(teams[1]["abbreviation"], "OSU");
        assert_eq!(teams[1]["is_underdog"], false);
    }

    #[tokio::test]
    async fn test_teams_endpoint_reports_upstream_failure() {
        let server = server(FakeSource::default().failing_group(None));

        let response = server.get("/api/teams/football/college-football").await;

        response.assert_status(StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_conferences_endpoint() {
        let server = server(FakeSource::default());

        let response = server.get("/api/conferences/football/college-football").await;
        response.assert_status_ok();
        let conferences: Value = response.json();
        assert_eq!(conferences.as_array().unwrap().len(), 8);
        assert_eq!(conferences[0], json!({"id": "5", "name": "Big Ten"}));

        let response = server.get("/api/conferences/basketball/nba").await;
        response.assert_status_ok();
        let conferences: Value = response.json();
        assert!(conferences.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_track_schedules_upcoming_games() {
        let server = server(conference_five());

        let response = server.post("/api/track").json(&track_body()).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["discovered"].as_array().unwrap().len(), 3);
        let scheduled = body["scheduled"].as_array().unwrap();
        assert_eq!(scheduled.len(), 2);
        assert_eq!(scheduled[0]["identity"], "game-401520281");
        assert_eq!(scheduled[0]["state"], "waiting");

        // tracking the same request again attaches to the running monitors
        server.post("/api/track").json(&track_body()).await.assert_status_ok();
        let monitors: Value = server.get("/api/monitors").await.json();
        assert_eq!(monitors.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_track_rejects_incomplete_request() {
        let server = server(FakeSource::default());

        let response = server
            .post("/api/track")
            .json(&json!({"sport": "football", "league": ""}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("league"));
    }

    #[tokio::test]
    async fn test_track_reports_upstream_failure() {
        let server = server(FakeSource::default().failing_group(Some("5")));

        let response = server.post("/api/track").json(&track_body()).await;

        response.assert_status(StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_monitor_lookup_and_cancel() {
        let server = server(conference_five());
        server.post("/api/track").json(&track_body()).await.assert_status_ok();

        let response = server.get("/api/monitors/game-401520281").await;
        response.assert_status_ok();
        let monitor: Value = response.json();
        assert_eq!(monitor["game"]["home"]["abbreviation"], "MICH");
        assert!(monitor["outcome"].is_null());

        let response = server.post("/api/monitors/game-401520281/cancel").await;
        response.assert_status_ok();
        let monitor: Value = response.json();
        assert_eq!(monitor["state"], "cancelled");
        assert_eq!(monitor["outcome"], "cancelled");

        let monitors: Value = server.get("/api/monitors").await.json();
        assert_eq!(monitors.as_array().unwrap().len(), 1);

        server
            .get("/api/monitors/game-999")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .post("/api/monitors/game-999/cancel")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_home_page_lists_active_monitors() {
        let server = server(conference_five());

        let empty = server.get("/").await.text();
        assert!(empty.contains("No games are being tracked"));

        server.post("/api/track").json(&track_body()).await.assert_status_ok();
        let page = server.get("/").await.text();
        assert!(page.contains("Ohio State Buckeyes at Michigan Wolverines"));
        assert!(page.contains("game-401520282"));
    }
}
