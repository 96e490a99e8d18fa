//! Google Calendar client: calendars and show sync

use chordline_common::captions::ShowDetails;
use chordline_common::{time, Provider};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::config::ServiceConfig;
use crate::error::{ClientError, Result};

const PROVIDER: Provider = Provider::GoogleCalendar;
const DEFAULT_START: &str = "20:00";
const SHOW_LENGTH_HOURS: i64 = 3;
const SYNC_DELAY: std::time::Duration = std::time::Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub access_role: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarList {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: String,
    pub time_zone: String,
}

/// Event body posted for a show
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEvent {
    pub summary: String,
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub success: usize,
    pub failed: usize,
}

/// Start time as `HH:MM`, `HH:MM:SS` or `9:00 PM`; falls back to 20:00
fn start_time(raw: Option<&str>) -> NaiveTime {
    let raw = raw.unwrap_or(DEFAULT_START).trim();
    ["%H:%M", "%H:%M:%S", "%I:%M %p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .unwrap_or(NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default())
}

/// Calendar event for a show; start times are read as UTC
pub fn event_for_show(show: &ShowDetails) -> NewEvent {
    let start = NaiveDateTime::new(show.date, start_time(show.time.as_deref())).and_utc();
    let end = start + Duration::hours(SHOW_LENGTH_HOURS);
    let venue_name = show.venue_name().unwrap_or("Venue TBD");

    NewEvent {
        summary: show.title.clone(),
        description: format!("Show at {}", venue_name),
        start: EventTime {
            date_time: time::to_iso(&start),
            time_zone: "UTC".to_string(),
        },
        end: EventTime {
            date_time: time::to_iso(&end),
            time_zone: "UTC".to_string(),
        },
        location: match (show.venue_name(), show.venue_city()) {
            (Some(name), Some(city)) => Some(format!("{}, {}", name, city)),
            (Some(name), None) => Some(name.to_string()),
            (None, _) => None,
        },
        status: "confirmed".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    config: ServiceConfig,
}

impl GoogleCalendarClient {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    pub async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>> {
        let list: CalendarList = self
            .config
            .send_json(PROVIDER, Method::GET, "/calendar/v3/users/me/calendarList", |r| r)
            .await?;
        Ok(list.items)
    }

    /// Create an event for `show`, returning the new event id
    pub async fn create_event_from_show(&self, show: &ShowDetails, calendar_id: &str) -> Result<String> {
        let event = event_for_show(show);
        let path = format!("/calendar/v3/calendars/{}/events", calendar_id);
        let created: Value = self
            .config
            .send_json(PROVIDER, Method::POST, &path, |r| r.json(&event))
            .await?;

        created["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::Parse("Created event has no id".to_string()))
    }

    /// Create one event per show, counting successes and failures
    pub async fn sync_shows(&self, shows: &[ShowDetails], calendar_id: &str) -> SyncReport {
        let mut report = SyncReport::default();
        for show in shows {
            match self.create_event_from_show(show, calendar_id).await {
                Ok(id) => {
                    report.success += 1;
                    info!("Synced show '{}' as {}", show.title, id);
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Error syncing show '{}': {}", show.title, e);
                }
            }
            // Real API rate limits
            if !self.config.is_local() {
                tokio::time::sleep(SYNC_DELAY).await;
            }
        }
        report
    }
}
