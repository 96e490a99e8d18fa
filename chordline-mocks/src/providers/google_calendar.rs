//! Google Calendar v3 mock
//!
//! Events live in a process-lifetime store seeded with two entries. Creates,
//! updates and deletes go through the store's write lock; reads take the
//! read lock only for as long as they copy what they need.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chordline_common::{time, Provider};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::auth::require_credential;
use crate::error::{json_body, MockError, MockResult};
use crate::AppState;

const PROVIDER: Provider = Provider::GoogleCalendar;
const TIME_ZONE: &str = "America/Chicago";
const DEFAULT_MAX_RESULTS: usize = 250;

/// Shared, mutable event list
pub type CalendarStore = Arc<RwLock<Vec<CalendarEvent>>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTime {
    #[serde(rename = "dateTime", default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// All-day events carry a bare date instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    fn at(instant: DateTime<Utc>) -> Self {
        Self {
            date_time: Some(time::to_iso(&instant)),
            date: None,
            time_zone: Some(TIME_ZONE.to_string()),
        }
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.date_time
            .as_deref()
            .or(self.date.as_deref())
            .and_then(time::parse_instant)
    }

    /// The value as sent, for echoing back in freeBusy
    fn raw(&self) -> Option<&str> {
        self.date_time.as_deref().or(self.date.as_deref())
    }
}

/// Calendar event; fields the mock does not interpret are kept in `extra`
///
/// Create and update bodies must fit this shape: a non-string `summary` or a
/// `start`/`end` that is not an object is a 400, as with the real API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: String,
    pub kind: String,
    pub etag: String,
    pub created: String,
    pub updated: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CalendarEvent {
    fn start_instant(&self) -> Option<DateTime<Utc>> {
        self.start.as_ref().and_then(EventTime::instant)
    }

    fn end_instant(&self) -> Option<DateTime<Utc>> {
        self.end.as_ref().and_then(EventTime::instant)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: &'static str,
    pub summary: &'static str,
    pub description: &'static str,
    pub time_zone: &'static str,
    pub kind: &'static str,
    pub etag: &'static str,
}

fn calendars() -> [Calendar; 2] {
    [
        Calendar {
            id: "primary",
            summary: "Demo User",
            description: "Primary calendar",
            time_zone: TIME_ZONE,
            kind: "calendar#calendar",
            etag: "\"mock-etag-1\"",
        },
        Calendar {
            id: "band-calendar@example.com",
            summary: "The Midnight Echoes",
            description: "Band events and shows",
            time_zone: TIME_ZONE,
            kind: "calendar#calendar",
            etag: "\"mock-etag-2\"",
        },
    ]
}

fn seed_event(id: &str, summary: &str, description: &str, start: &str, end: &str, location: &str) -> CalendarEvent {
    let at = |dt: &str| EventTime {
        date_time: Some(dt.to_string()),
        date: None,
        time_zone: Some(TIME_ZONE.to_string()),
    };
    CalendarEvent {
        id: id.to_string(),
        summary: Some(summary.to_string()),
        description: Some(description.to_string()),
        start: Some(at(start)),
        end: Some(at(end)),
        location: Some(location.to_string()),
        status: "confirmed".to_string(),
        kind: "calendar#event".to_string(),
        etag: format!("\"mock-event-etag-{}\"", &id["event_".len()..]),
        created: "2024-01-01T12:00:00.000Z".to_string(),
        updated: "2024-01-01T12:00:00.000Z".to_string(),
        extra: Map::new(),
    }
}

/// Store with the two demo events
pub fn seeded_store() -> CalendarStore {
    Arc::new(RwLock::new(vec![
        seed_event(
            "event_1",
            "Show at The Bluebird Cafe",
            "Acoustic set at Nashville's iconic venue",
            "2024-12-15T20:00:00-06:00",
            "2024-12-15T22:00:00-06:00",
            "The Bluebird Cafe, 4104 Hillsboro Pike, Nashville, TN",
        ),
        seed_event(
            "event_2",
            "Rehearsal",
            "Band practice session",
            "2024-12-18T19:00:00-06:00",
            "2024-12-18T21:00:00-06:00",
            "Practice Studio B, 123 Music Row, Nashville, TN",
        ),
    ]))
}

pub fn routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/calendar/v3/users/me/calendarList", get(list_calendars))
        .route("/calendar/v3/calendars/:calendar_id", get(get_calendar))
        .route(
            "/calendar/v3/calendars/:calendar_id/events",
            get(list_events).post(create_event),
        )
        .route(
            "/calendar/v3/calendars/:calendar_id/events/quickAdd",
            post(quick_add),
        )
        .route(
            "/calendar/v3/calendars/:calendar_id/events/:event_id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/calendar/v3/freeBusy", post(free_busy))
        .route_layer(middleware::from_fn_with_state(
            (state.clone(), PROVIDER),
            require_credential,
        ));

    Router::new()
        .merge(protected)
        .route("/oauth2/v4/token", post(issue_token))
}

/// `event_<ms>`, suffixed when another event already has that id
fn unique_id(events: &[CalendarEvent], prefix: &str) -> String {
    let base = format!("{}_{}", prefix, time::now_millis());
    let mut candidate = base.clone();
    let mut n = 1;
    while events.iter().any(|e| e.id == candidate) {
        candidate = format!("{}_{}", base, n);
        n += 1;
    }
    candidate
}

fn fresh_etag(prefix: &str) -> String {
    format!("\"{}-{}\"", prefix, time::now_millis())
}

fn into_event(object: Map<String, Value>) -> MockResult<CalendarEvent> {
    serde_json::from_value(Value::Object(object))
        .map_err(|e| MockError::bad_request(PROVIDER, format!("Invalid event: {}", e)))
}

fn parse_max_results(value: Option<&str>) -> MockResult<usize> {
    match value {
        None | Some("") => Ok(DEFAULT_MAX_RESULTS),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map_err(|_| MockError::bad_request(PROVIDER, format!("Invalid maxResults: {}", raw))),
    }
}

fn parse_bound(name: &str, value: Option<&str>) -> MockResult<Option<DateTime<Utc>>> {
    match value {
        None | Some("") => Ok(None),
        Some(raw) => time::parse_instant(raw)
            .map(Some)
            .ok_or_else(|| MockError::bad_request(PROVIDER, format!("Invalid {}: {}", name, raw))),
    }
}

// ========================================
// Calendars
// ========================================

/// GET /calendar/v3/users/me/calendarList
async fn list_calendars() -> Json<Value> {
    Json(json!({
        "kind": "calendar#calendarList",
        "etag": "\"mock-calendar-list-etag\"",
        "items": calendars(),
    }))
}

/// GET /calendar/v3/calendars/:calendar_id
async fn get_calendar(Path(calendar_id): Path<String>) -> MockResult<Json<Calendar>> {
    calendars()
        .into_iter()
        .find(|c| c.id == calendar_id)
        .map(Json)
        .ok_or_else(|| MockError::not_found(PROVIDER, "Calendar not found"))
}

// ========================================
// Events
// ========================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsQuery {
    time_min: Option<String>,
    time_max: Option<String>,
    max_results: Option<String>,
}

/// GET /calendar/v3/calendars/:calendar_id/events
async fn list_events(
    State(state): State<AppState>,
    Path(calendar_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> MockResult<Json<Value>> {
    let min = parse_bound("timeMin", query.time_min.as_deref())?;
    let max = parse_bound("timeMax", query.time_max.as_deref())?;
    let limit = parse_max_results(query.max_results.as_deref())?;

    let items: Vec<CalendarEvent> = {
        let events = state.calendar.read().await;
        events
            .iter()
            .filter(|event| {
                if min.is_none() && max.is_none() {
                    return true;
                }
                // Events without a usable start never match a time filter
                match event.start_instant() {
                    Some(start) => min.map_or(true, |m| start >= m) && max.map_or(true, |m| start <= m),
                    None => false,
                }
            })
            .take(limit)
            .cloned()
            .collect()
    };
    debug!("Listing {} events for {}", items.len(), calendar_id);

    Ok(Json(json!({
        "kind": "calendar#events",
        "etag": "\"mock-events-etag\"",
        "summary": calendar_id,
        "updated": time::iso_now(),
        "timeZone": TIME_ZONE,
        "items": items,
    })))
}

/// GET /calendar/v3/calendars/:calendar_id/events/:event_id
async fn get_event(
    State(state): State<AppState>,
    Path((_calendar_id, event_id)): Path<(String, String)>,
) -> MockResult<Json<CalendarEvent>> {
    let events = state.calendar.read().await;
    events
        .iter()
        .find(|e| e.id == event_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| MockError::not_found(PROVIDER, "Event not found"))
}

/// POST /calendar/v3/calendars/:calendar_id/events
async fn create_event(
    State(state): State<AppState>,
    Path(_calendar_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> MockResult<impl IntoResponse> {
    let Value::Object(mut object) = json_body(PROVIDER, body)? else {
        return Err(MockError::bad_request(PROVIDER, "Event body must be a JSON object"));
    };

    let mut events = state.calendar.write().await;
    let now = time::iso_now();

    if !matches!(object.get("id"), Some(Value::String(id)) if !id.is_empty()) {
        object.insert("id".to_string(), json!(unique_id(&events, "event")));
    }
    let status_missing = !matches!(object.get("status"), Some(Value::String(s)) if !s.is_empty());
    if status_missing {
        object.insert("status".to_string(), json!("confirmed"));
    }
    object.insert("kind".to_string(), json!("calendar#event"));
    object.insert("etag".to_string(), json!(fresh_etag("mock-event-etag")));
    object.insert("created".to_string(), json!(now));
    object.insert("updated".to_string(), json!(now));

    let event = into_event(object)?;
    info!("Created calendar event {}", event.id);
    events.push(event.clone());

    Ok((StatusCode::CREATED, Json(event)))
}

/// PUT /calendar/v3/calendars/:calendar_id/events/:event_id
async fn update_event(
    State(state): State<AppState>,
    Path((_calendar_id, event_id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> MockResult<Json<CalendarEvent>> {
    let Value::Object(changes) = json_body(PROVIDER, body)? else {
        return Err(MockError::bad_request(PROVIDER, "Event body must be a JSON object"));
    };

    let mut events = state.calendar.write().await;
    let slot = events
        .iter_mut()
        .find(|e| e.id == event_id)
        .ok_or_else(|| MockError::not_found(PROVIDER, "Event not found"))?;

    let mut merged = match serde_json::to_value(&*slot) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    merged.extend(changes);
    merged.insert("updated".to_string(), json!(time::iso_now()));
    merged.insert("etag".to_string(), json!(fresh_etag("mock-event-etag")));

    let updated = into_event(merged)?;
    *slot = updated.clone();
    Ok(Json(updated))
}

/// DELETE /calendar/v3/calendars/:calendar_id/events/:event_id
async fn delete_event(
    State(state): State<AppState>,
    Path((_calendar_id, event_id)): Path<(String, String)>,
) -> MockResult<StatusCode> {
    let mut events = state.calendar.write().await;
    let index = events
        .iter()
        .position(|e| e.id == event_id)
        .ok_or_else(|| MockError::not_found(PROVIDER, "Event not found"))?;
    events.remove(index);
    info!("Deleted calendar event {}", event_id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct QuickAddQuery {
    text: Option<String>,
}

/// POST /calendar/v3/calendars/:calendar_id/events/quickAdd?text=
///
/// No natural-language parsing: the text becomes the summary of a one-hour
/// event starting now.
async fn quick_add(
    State(state): State<AppState>,
    Path(_calendar_id): Path<String>,
    Query(query): Query<QuickAddQuery>,
) -> MockResult<Json<CalendarEvent>> {
    let text = query
        .text
        .filter(|t| !t.is_empty())
        .ok_or_else(|| MockError::bad_request(PROVIDER, "Text parameter is required"))?;

    let mut events = state.calendar.write().await;
    let start = time::now();
    let now = time::to_iso(&start);

    let event = CalendarEvent {
        id: unique_id(&events, "quick_event"),
        summary: Some(text),
        description: None,
        start: Some(EventTime::at(start)),
        end: Some(EventTime::at(start + Duration::hours(1))),
        location: None,
        status: "confirmed".to_string(),
        kind: "calendar#event".to_string(),
        etag: fresh_etag("mock-quick-event-etag"),
        created: now.clone(),
        updated: now,
        extra: Map::new(),
    };
    events.push(event.clone());
    Ok(Json(event))
}

// ========================================
// Free/busy
// ========================================

#[derive(Debug, Serialize)]
struct BusyInterval {
    start: String,
    end: String,
}

#[derive(Debug, Serialize)]
struct CalendarBusy {
    busy: Vec<BusyInterval>,
    errors: Vec<Value>,
}

/// POST /calendar/v3/freeBusy
///
/// Every queried calendar sees the same event list; an event is busy when
/// it overlaps `[timeMin, timeMax)`. Missing bounds are unbounded.
async fn free_busy(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> MockResult<Json<Value>> {
    let body = json_body(PROVIDER, body)?;
    let items = body
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| MockError::bad_request(PROVIDER, "Items parameter is required"))?;

    let time_min = body.get("timeMin").and_then(Value::as_str);
    let time_max = body.get("timeMax").and_then(Value::as_str);
    let min = parse_bound("timeMin", time_min)?;
    let max = parse_bound("timeMax", time_max)?;

    let busy: Vec<(String, String)> = {
        let events = state.calendar.read().await;
        events
            .iter()
            .filter_map(|event| {
                let (start, end) = (event.start_instant()?, event.end_instant()?);
                let overlaps = max.map_or(true, |m| start < m) && min.map_or(true, |m| end > m);
                if !overlaps {
                    return None;
                }
                Some((
                    event.start.as_ref()?.raw()?.to_string(),
                    event.end.as_ref()?.raw()?.to_string(),
                ))
            })
            .collect()
    };

    let calendars: BTreeMap<String, CalendarBusy> = items
        .iter()
        .filter_map(|item| item.get("id").and_then(Value::as_str))
        .map(|id| {
            let intervals = busy
                .iter()
                .map(|(start, end)| BusyInterval { start: start.clone(), end: end.clone() })
                .collect();
            (id.to_string(), CalendarBusy { busy: intervals, errors: Vec::new() })
        })
        .collect();

    Ok(Json(json!({
        "kind": "calendar#freeBusy",
        "timeMin": time_min,
        "timeMax": time_max,
        "calendars": calendars,
    })))
}

// ========================================
// OAuth
// ========================================

/// POST /oauth2/v4/token
///
/// Any grant succeeds; the body is not inspected.
async fn issue_token() -> Json<Value> {
    let ms = time::now_millis();
    Json(json!({
        "access_token": format!("mock_google_token_{}", ms),
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": format!("mock_google_refresh_{}", ms),
        "scope": "https://www.googleapis.com/auth/calendar",
    }))
}
